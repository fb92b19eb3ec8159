use std::io::Read;

use http::{HeaderMap, StatusCode};

use crate::Result;
use crate::error::Error;
use crate::status::is_success_status;
use crate::transport::RawResponse;
use crate::util::truncate_body;

/// Snapshot of one physical transmission's outcome.
///
/// The body is a live reader handed through from the transport; the engine
/// does not buffer it. Dropping the response disposes of the body.
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Box<dyn Read + Send>>,
}

impl Response {
    pub(crate) fn new(raw: RawResponse) -> Self {
        Self {
            status: raw.status,
            headers: raw.headers,
            body: raw.body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Success flag derived from the status code (2xx).
    pub fn is_success(&self) -> bool {
        is_success_status(self.status)
    }

    /// Drain the body into a lossily-decoded string. The body can be read
    /// once; subsequent calls return an empty string.
    pub fn text(&mut self) -> Result<String> {
        let Some(mut body) = self.body.take() else {
            return Ok(String::new());
        };
        let mut collected = Vec::new();
        body.read_to_end(&mut collected)
            .map_err(|source| Error::ReadBody { source })?;
        Ok(String::from_utf8_lossy(&collected).into_owned())
    }

    /// Take the raw body reader out of the response.
    pub fn into_body(self) -> Option<Box<dyn Read + Send>> {
        self.body
    }

    /// Best-effort truncated body text for error reporting. Read failures
    /// surface whatever was collected before the failure.
    pub(crate) fn drain_text_truncated(&mut self) -> String {
        let Some(mut body) = self.body.take() else {
            return String::new();
        };
        let mut collected = Vec::new();
        let _ = body.read_to_end(&mut collected);
        truncate_body(&collected)
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &self.body.as_ref().map(|_| "<stream>"))
            .finish()
    }
}
