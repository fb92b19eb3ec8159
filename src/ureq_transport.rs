use std::io::{self, Cursor, Read};

use http::Method;
use url::Url;

use crate::transport::{RawResponse, StagedContent, Transport, TransportRequest};

/// Default blocking transport over a [`ureq::Agent`].
///
/// Transport-level redirect following is disabled and unsuccessful status
/// codes are not errors: the execution engine owns both concerns.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .build();
        Self {
            agent: config.new_agent(),
        }
    }

    /// Wrap a caller-configured agent. The agent should keep redirect
    /// following disabled so the engine sees redirect responses itself.
    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn supports_method(&self, method: &Method) -> bool {
        matches!(
            *method,
            Method::GET
                | Method::PUT
                | Method::POST
                | Method::DELETE
                | Method::HEAD
                | Method::PATCH
        )
    }

    fn build_request(&self, method: Method, url: &Url) -> io::Result<Box<dyn TransportRequest>> {
        Ok(Box::new(UreqRequest {
            agent: self.agent.clone(),
            method,
            url: url.to_string(),
            headers: Vec::new(),
            content: None,
        }))
    }
}

struct UreqRequest {
    agent: ureq::Agent,
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    content: Option<StagedContent>,
}

impl TransportRequest for UreqRequest {
    fn add_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_owned(), value.to_owned()));
    }

    fn set_content(&mut self, content: StagedContent) {
        self.content = Some(content);
    }

    fn execute(self: Box<Self>) -> io::Result<RawResponse> {
        let mut builder = ureq::http::Request::builder()
            .method(self.method.clone())
            .uri(self.url.as_str());
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut body_bytes = Vec::new();
        if let Some(content) = &self.content {
            if let Some(media_type) = &content.media_type {
                builder = builder.header("content-type", media_type.as_str());
            }
            if let Some(encoding) = &content.encoding {
                builder = builder.header("content-encoding", encoding.as_str());
            }
            content.body.write_to(&mut body_bytes)?;
        }

        let request = builder
            .body(body_bytes)
            .map_err(|source| io::Error::new(io::ErrorKind::InvalidInput, source))?;

        let response = self.agent.run(request).map_err(io::Error::other)?;

        let (parts, body) = response.into_parts();
        let mut collected = Vec::new();
        body.into_reader().read_to_end(&mut collected)?;

        Ok(RawResponse {
            status: parts.status,
            headers: parts.headers,
            body: Some(Box::new(Cursor::new(collected))),
        })
    }
}
