use std::io::{self, Read};
use std::sync::Arc;

use http::{HeaderMap, Method, StatusCode};
use url::Url;

use crate::content::HttpContent;

/// Content staged for one physical transmission.
///
/// The engine resolves the wire-level type/encoding/length before handing the
/// body to the transport; the transport is responsible for emitting the
/// matching `Content-*` headers and streaming `body` out.
pub struct StagedContent {
    pub media_type: Option<String>,
    pub encoding: Option<String>,
    pub length: Option<u64>,
    pub body: Arc<dyn HttpContent>,
}

/// Outcome of one physical transmission as seen by the transport.
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Option<Box<dyn Read + Send>>,
}

impl RawResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

/// One physical HTTP exchange under construction.
pub trait TransportRequest: Send {
    /// Append one wire header pair. Names arrive lower-cased; repeated names
    /// are distinct pairs and must all be sent.
    fn add_header(&mut self, name: &str, value: &str);

    /// Attach the request body for this attempt.
    fn set_content(&mut self, content: StagedContent);

    /// Perform the exchange. An `Err` is a transport-level failure below the
    /// HTTP layer; an unsuccessful status code is an `Ok` response.
    fn execute(self: Box<Self>) -> io::Result<RawResponse>;
}

/// Pluggable low-level transport: builds one [`TransportRequest`] per
/// physical attempt.
pub trait Transport: Send + Sync {
    /// Whether this transport implements `method`. Every transport supports
    /// GET, PUT, POST and DELETE unconditionally; HEAD and PATCH are opt-in.
    fn supports_method(&self, method: &Method) -> bool {
        matches!(
            *method,
            Method::GET | Method::PUT | Method::POST | Method::DELETE
        )
    }

    fn build_request(&self, method: Method, url: &Url) -> io::Result<Box<dyn TransportRequest>>;
}
