use std::sync::Arc;

use http::{HeaderMap, Method};
use url::Url;

use crate::backoff::BackOffPolicy;
use crate::content::HttpContent;
use crate::handler::UnsuccessfulResponseHandler;
use crate::transport::Transport;

const DEFAULT_NUMBER_OF_RETRIES: u32 = 10;
const DEFAULT_CONTENT_LOGGING_LIMIT: usize = 16 * 1024;

/// One logical HTTP request: configuration plus the execution state the
/// retry loop mutates (URL, method and headers under redirects, the retry
/// budget as triggers fire).
///
/// Not for concurrent use; run concurrent calls on independent requests.
pub struct Request {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) method: Method,
    pub(crate) url: Url,
    pub(crate) headers: HeaderMap,
    pub(crate) content: Option<Arc<dyn HttpContent>>,
    pub(crate) number_of_retries: u32,
    pub(crate) backoff_policy: Option<Box<dyn BackOffPolicy>>,
    pub(crate) unsuccessful_response_handler: Option<Box<dyn UnsuccessfulResponseHandler>>,
    pub(crate) follow_redirects: bool,
    pub(crate) retry_on_transport_error: bool,
    pub(crate) error_on_unsuccessful_status: bool,
    pub(crate) suppress_user_agent_suffix: bool,
    pub(crate) enable_gzip_content: bool,
    pub(crate) content_logging_limit: usize,
    pub(crate) logging_enabled: bool,
}

impl Request {
    pub fn new(transport: Arc<dyn Transport>, method: Method, url: Url) -> Self {
        Self {
            transport,
            method,
            url,
            headers: HeaderMap::new(),
            content: None,
            number_of_retries: DEFAULT_NUMBER_OF_RETRIES,
            backoff_policy: None,
            unsuccessful_response_handler: None,
            follow_redirects: true,
            retry_on_transport_error: false,
            error_on_unsuccessful_status: true,
            suppress_user_agent_suffix: false,
            enable_gzip_content: false,
            content_logging_limit: DEFAULT_CONTENT_LOGGING_LIMIT,
            logging_enabled: true,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn set_method(&mut self, method: Method) -> &mut Self {
        self.method = method;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn set_url(&mut self, url: Url) -> &mut Self {
        self.url = url;
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn content(&self) -> Option<&Arc<dyn HttpContent>> {
        self.content.as_ref()
    }

    pub fn set_content(&mut self, content: impl HttpContent + 'static) -> &mut Self {
        self.content = Some(Arc::new(content));
        self
    }

    pub fn clear_content(&mut self) -> &mut Self {
        self.content = None;
        self
    }

    /// Remaining retry budget, shared by every retry trigger. The engine
    /// decrements it during `execute` and never resets it between calls.
    pub fn number_of_retries(&self) -> u32 {
        self.number_of_retries
    }

    pub fn set_number_of_retries(&mut self, number_of_retries: u32) -> &mut Self {
        self.number_of_retries = number_of_retries;
        self
    }

    pub fn set_backoff_policy(&mut self, policy: impl BackOffPolicy + 'static) -> &mut Self {
        self.backoff_policy = Some(Box::new(policy));
        self
    }

    /// Disable backoff entirely.
    pub fn clear_backoff_policy(&mut self) -> &mut Self {
        self.backoff_policy = None;
        self
    }

    pub fn set_unsuccessful_response_handler(
        &mut self,
        handler: impl UnsuccessfulResponseHandler + 'static,
    ) -> &mut Self {
        self.unsuccessful_response_handler = Some(Box::new(handler));
        self
    }

    pub fn set_follow_redirects(&mut self, follow_redirects: bool) -> &mut Self {
        self.follow_redirects = follow_redirects;
        self
    }

    /// Whether transport-level failures consume the retry budget instead of
    /// failing immediately. Off by default.
    pub fn set_retry_on_transport_error(&mut self, retry: bool) -> &mut Self {
        self.retry_on_transport_error = retry;
        self
    }

    /// Whether a final unsuccessful response is surfaced as an error (the
    /// default) or returned for the caller to inspect.
    pub fn set_error_on_unsuccessful_status(&mut self, error: bool) -> &mut Self {
        self.error_on_unsuccessful_status = error;
        self
    }

    pub fn set_suppress_user_agent_suffix(&mut self, suppress: bool) -> &mut Self {
        self.suppress_user_agent_suffix = suppress;
        self
    }

    pub fn set_enable_gzip_content(&mut self, enable: bool) -> &mut Self {
        self.enable_gzip_content = enable;
        self
    }

    /// Cap on logged request-content bytes; zero disables content logging.
    pub fn set_content_logging_limit(&mut self, limit: usize) -> &mut Self {
        self.content_logging_limit = limit;
        self
    }

    pub fn is_logging_enabled(&self) -> bool {
        self.logging_enabled
    }

    pub fn set_logging_enabled(&mut self, enabled: bool) -> &mut Self {
        self.logging_enabled = enabled;
        self
    }
}

/// Builds [`Request`] values over a shared transport.
#[derive(Clone)]
pub struct RequestFactory {
    transport: Arc<dyn Transport>,
}

impl RequestFactory {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn request(&self, method: Method, url: Url) -> Request {
        Request::new(Arc::clone(&self.transport), method, url)
    }

    pub fn get(&self, url: Url) -> Request {
        self.request(Method::GET, url)
    }

    pub fn delete(&self, url: Url) -> Request {
        self.request(Method::DELETE, url)
    }

    pub fn head(&self, url: Url) -> Request {
        self.request(Method::HEAD, url)
    }

    pub fn post(&self, url: Url, content: impl HttpContent + 'static) -> Request {
        let mut request = self.request(Method::POST, url);
        request.set_content(content);
        request
    }

    pub fn put(&self, url: Url, content: impl HttpContent + 'static) -> Request {
        let mut request = self.request(Method::PUT, url);
        request.set_content(content);
        request
    }

    pub fn patch(&self, url: Url, content: impl HttpContent + 'static) -> Request {
        let mut request = self.request(Method::PATCH, url);
        request.set_content(content);
        request
    }
}
