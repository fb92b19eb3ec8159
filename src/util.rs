use std::sync::{Mutex, MutexGuard};

use http::HeaderMap;
use http::header::USER_AGENT;

const MAX_ERROR_BODY_LEN: usize = 2048;

pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Suffix the engine appends to every outgoing `User-Agent` unless the
/// request suppresses it. The `(gzip)` token advertises gzip request support.
pub const USER_AGENT_SUFFIX: &str = concat!("reqkit/", env!("CARGO_PKG_VERSION"), " (gzip)");

/// Serialize a header map into wire pairs: lower-cased names, one pair per
/// value in map order, and the engine's `User-Agent` suffix joined onto the
/// caller's value with a single space (or emitted alone when the caller set
/// none).
pub(crate) fn serialize_headers(
    headers: &HeaderMap,
    suppress_user_agent_suffix: bool,
) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(headers.len() + 1);
    let mut user_agent_seen = false;

    for (name, value) in headers {
        let mut text = String::from_utf8_lossy(value.as_bytes()).into_owned();
        if *name == USER_AGENT && !user_agent_seen {
            user_agent_seen = true;
            if !suppress_user_agent_suffix {
                text.push(' ');
                text.push_str(USER_AGENT_SUFFIX);
            }
        }
        pairs.push((name.as_str().to_owned(), text));
    }

    if !user_agent_seen && !suppress_user_agent_suffix {
        pairs.push((USER_AGENT.as_str().to_owned(), USER_AGENT_SUFFIX.to_owned()));
    }

    pairs
}

pub(crate) fn truncate_body(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.chars().count() <= MAX_ERROR_BODY_LEN {
        return text.into_owned();
    }

    let truncated: String = text.chars().take(MAX_ERROR_BODY_LEN).collect();
    format!("{truncated}...(truncated)")
}
