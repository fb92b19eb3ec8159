use crate::request::Request;
use crate::response::Response;

/// Application hook given first refusal on every non-success response.
///
/// Implementations are expected to mutate the request (refresh a credential,
/// rewrite a header) and return `true` when they have made the request worth
/// retrying. Returning `true` claims the retry: backoff and redirect handling
/// are skipped for that response. The return value is independent of whether
/// anything was actually mutated.
pub trait UnsuccessfulResponseHandler: Send + Sync {
    /// `supports_retry` tells the handler whether the engine is still
    /// structurally able to retry (budget remaining, content replayable).
    fn handle_response(
        &self,
        request: &mut Request,
        response: &Response,
        supports_retry: bool,
    ) -> bool;
}
