use http::header::{
    AUTHORIZATION, IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_RANGE, IF_UNMODIFIED_SINCE,
    LOCATION,
};
use http::{HeaderMap, Method, StatusCode};
use url::Url;

use crate::request::Request;
use crate::status::{is_redirect_status, is_see_other_status};

/// Compute the next URL from a `Location` header value.
///
/// An absolute location replaces the current URL outright; anything else is
/// resolved as a relative reference against it (leading `/` restarts at the
/// host root, otherwise the last path segment is replaced, with trailing
/// slashes preserved).
pub fn resolve_location(current: &Url, location: &str) -> Option<Url> {
    current.join(location).ok()
}

/// Headers that are bound to the original target and no longer apply once a
/// redirect moves the request elsewhere.
const REDIRECT_STRIPPED_HEADERS: [http::HeaderName; 6] = [
    AUTHORIZATION,
    IF_MATCH,
    IF_NONE_MATCH,
    IF_MODIFIED_SINCE,
    IF_UNMODIFIED_SINCE,
    IF_RANGE,
];

impl Request {
    /// Rewrite this request to follow a redirect response, returning whether
    /// the redirect was accepted.
    ///
    /// Accepting requires a redirect status and a parseable `Location`
    /// header. On see-other semantics an original POST downgrades to GET and
    /// drops its body. Authorization and conditional-request headers are
    /// stripped in every accepted case.
    pub fn handle_redirect(&mut self, status: StatusCode, response_headers: &HeaderMap) -> bool {
        if !is_redirect_status(status) {
            return false;
        }
        let Some(location) = response_headers
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
        else {
            return false;
        };
        let Some(next_url) = resolve_location(&self.url, location) else {
            return false;
        };

        if is_see_other_status(status) && self.method == Method::POST {
            self.method = Method::GET;
            self.content = None;
        }
        for name in REDIRECT_STRIPPED_HEADERS {
            self.headers.remove(name);
        }
        self.url = next_url;
        true
    }
}
