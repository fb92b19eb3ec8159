use std::time::Duration;

use http::StatusCode;
use rand::Rng;

/// Decides whether and how long to pause before a status-driven retry.
///
/// `reset` is called exactly once per top-level execute, before the first
/// attempt. The other two operations are only consulted for unsuccessful
/// responses the unsuccessful-response handler did not claim.
pub trait BackOffPolicy: Send {
    /// Prepare for a fresh execute loop.
    fn reset(&mut self);

    /// Whether this policy wants to back off for `status` at all.
    fn is_backoff_required(&self, status: StatusCode) -> bool;

    /// Next pause before retrying, or `None` when the policy declines
    /// further retries regardless of the remaining retry budget.
    fn next_backoff(&mut self) -> Option<Duration>;
}

/// Exponentially growing backoff with ratio-bounded jitter.
///
/// Backs off for 500 and 503. Each consultation doubles the base delay up to
/// `max_backoff`; once the sum of produced delays passes
/// `max_cumulative_backoff` the policy gives up and returns `None`.
#[derive(Clone, Debug)]
pub struct ExponentialBackOffPolicy {
    base_backoff: Duration,
    max_backoff: Duration,
    jitter_ratio: f64,
    max_cumulative_backoff: Duration,
    retry_index: usize,
    accumulated: Duration,
}

impl ExponentialBackOffPolicy {
    pub fn standard() -> Self {
        Self {
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(60),
            jitter_ratio: 0.5,
            max_cumulative_backoff: Duration::from_secs(900),
            retry_index: 0,
            accumulated: Duration::ZERO,
        }
    }

    pub fn base_backoff(mut self, base_backoff: Duration) -> Self {
        self.base_backoff = base_backoff.max(Duration::from_millis(1));
        if self.max_backoff < self.base_backoff {
            self.max_backoff = self.base_backoff;
        }
        self
    }

    pub fn max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff.max(self.base_backoff);
        self
    }

    pub fn jitter_ratio(mut self, jitter_ratio: f64) -> Self {
        self.jitter_ratio = jitter_ratio.clamp(0.0, 1.0);
        self
    }

    pub fn max_cumulative_backoff(mut self, max_cumulative_backoff: Duration) -> Self {
        self.max_cumulative_backoff = max_cumulative_backoff;
        self
    }

    fn delay_for_index(&self, retry_index: usize) -> Duration {
        let capped_exponent = retry_index.min(31) as u32;
        let multiplier = 1_u128 << capped_exponent;
        let base_ms = self.base_backoff.as_millis().max(1);
        let max_ms = self.max_backoff.as_millis().max(base_ms);
        let delay_ms = base_ms
            .saturating_mul(multiplier)
            .min(max_ms)
            .min(u64::MAX as u128) as u64;
        self.apply_jitter(Duration::from_millis(delay_ms))
    }

    fn apply_jitter(&self, backoff: Duration) -> Duration {
        if self.jitter_ratio <= f64::EPSILON {
            return backoff;
        }

        let backoff_ms = backoff.as_millis().min(u64::MAX as u128) as u64;
        if backoff_ms <= 1 {
            return backoff;
        }
        let max_backoff_ms = self.max_backoff.as_millis().min(u64::MAX as u128) as u64;

        let jitter_span = ((backoff_ms as f64) * self.jitter_ratio).round().max(1.0) as u64;
        let low = backoff_ms.saturating_sub(jitter_span);
        let high = backoff_ms.saturating_add(jitter_span).max(low);
        let mut rng = rand::rng();
        let sampled_ms = rng.random_range(low..=high).min(max_backoff_ms.max(1));
        Duration::from_millis(sampled_ms)
    }
}

impl Default for ExponentialBackOffPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

impl BackOffPolicy for ExponentialBackOffPolicy {
    fn reset(&mut self) {
        self.retry_index = 0;
        self.accumulated = Duration::ZERO;
    }

    fn is_backoff_required(&self, status: StatusCode) -> bool {
        matches!(
            status,
            StatusCode::INTERNAL_SERVER_ERROR | StatusCode::SERVICE_UNAVAILABLE
        )
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        if self.accumulated >= self.max_cumulative_backoff {
            return None;
        }
        let delay = self.delay_for_index(self.retry_index);
        self.retry_index += 1;
        self.accumulated = self.accumulated.saturating_add(delay);
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use http::StatusCode;

    use super::{BackOffPolicy, ExponentialBackOffPolicy};

    fn jitterless() -> ExponentialBackOffPolicy {
        ExponentialBackOffPolicy::standard()
            .base_backoff(Duration::from_millis(100))
            .max_backoff(Duration::from_millis(400))
            .jitter_ratio(0.0)
    }

    #[test]
    fn delays_double_up_to_the_cap() {
        let mut policy = jitterless();
        policy.reset();
        assert_eq!(policy.next_backoff(), Some(Duration::from_millis(100)));
        assert_eq!(policy.next_backoff(), Some(Duration::from_millis(200)));
        assert_eq!(policy.next_backoff(), Some(Duration::from_millis(400)));
        assert_eq!(policy.next_backoff(), Some(Duration::from_millis(400)));
    }

    #[test]
    fn reset_restarts_the_progression() {
        let mut policy = jitterless();
        policy.reset();
        let _ = policy.next_backoff();
        let _ = policy.next_backoff();
        policy.reset();
        assert_eq!(policy.next_backoff(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn gives_up_after_the_cumulative_budget() {
        let mut policy = jitterless().max_cumulative_backoff(Duration::from_millis(250));
        policy.reset();
        assert!(policy.next_backoff().is_some());
        assert!(policy.next_backoff().is_some());
        assert_eq!(policy.next_backoff(), None);
    }

    #[test]
    fn jittered_delay_never_exceeds_the_configured_max() {
        let mut policy = ExponentialBackOffPolicy::standard()
            .base_backoff(Duration::from_millis(100))
            .max_backoff(Duration::from_millis(120))
            .jitter_ratio(1.0);
        policy.reset();
        for _ in 0..64 {
            let delay = policy.next_backoff().expect("delay within budget");
            assert!(delay <= Duration::from_millis(120));
        }
    }

    #[test]
    fn required_for_server_error_and_service_unavailable_only() {
        let policy = ExponentialBackOffPolicy::standard();
        assert!(policy.is_backoff_required(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(policy.is_backoff_required(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!policy.is_backoff_required(StatusCode::UNAUTHORIZED));
        assert!(!policy.is_backoff_required(StatusCode::MOVED_PERMANENTLY));
    }
}
