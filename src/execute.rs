use std::sync::Arc;
use std::thread::sleep;

use http::Method;

use crate::Result;
use crate::content::{GzipContent, HttpContent, LoggingContent};
use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::transport::{RawResponse, StagedContent};
use crate::util::serialize_headers;

impl Request {
    /// Run the request until it succeeds, a retry trigger gives up, or the
    /// retry budget is spent.
    ///
    /// Every unsuccessful response is offered — in order, first claim wins —
    /// to the unsuccessful-response handler, the backoff policy, and redirect
    /// handling. All three triggers, plus transport-error retries, share
    /// `number_of_retries` as one budget. The first attempt is always made
    /// regardless of the budget.
    pub fn execute(&mut self) -> Result<Response> {
        self.ensure_method_supported()?;
        if let Some(policy) = self.backoff_policy.as_mut() {
            policy.reset();
        }

        loop {
            let raw = match self.transmit_once() {
                Ok(raw) => Some(raw),
                Err(error) => {
                    if self.retry_on_transport_error && self.number_of_retries > 0 {
                        tracing::debug!(
                            method = %self.method,
                            url = %self.url,
                            retries_remaining = self.number_of_retries,
                            "retrying after transport error"
                        );
                        None
                    } else {
                        return Err(error);
                    }
                }
            };

            if let Some(raw) = raw {
                let response = Response::new(raw);
                if response.is_success() {
                    return Ok(response);
                }
                if !self.consult_retry_triggers(&response) {
                    return self.finish_unsuccessful(response);
                }
            }

            // sole decrement point for every retry trigger
            self.number_of_retries -= 1;
        }
    }

    /// Offer an unsuccessful response to the retry triggers. Returns whether
    /// one of them claimed a retry; callers may then spend one unit of the
    /// budget, which is known to be non-zero when this returns true.
    fn consult_retry_triggers(&mut self, response: &Response) -> bool {
        if self.number_of_retries == 0 {
            return false;
        }

        if let Some(handler) = self.unsuccessful_response_handler.take() {
            let handled = handler.handle_response(self, response, true);
            if self.unsuccessful_response_handler.is_none() {
                self.unsuccessful_response_handler = Some(handler);
            }
            if handled {
                return true;
            }
        }

        let status = response.status();
        if let Some(policy) = self.backoff_policy.as_mut() {
            if policy.is_backoff_required(status) {
                return match policy.next_backoff() {
                    Some(delay) => {
                        tracing::debug!(
                            status = status.as_u16(),
                            delay_ms = delay.as_millis() as u64,
                            "backing off before retry"
                        );
                        sleep(delay);
                        true
                    }
                    // the policy gave up; redirect handling is not consulted
                    None => false,
                };
            }
        }

        self.follow_redirects && self.handle_redirect(status, response.headers())
    }

    fn finish_unsuccessful(&self, mut response: Response) -> Result<Response> {
        if !self.error_on_unsuccessful_status {
            return Ok(response);
        }
        let body = response.drain_text_truncated();
        Err(Error::HttpStatus {
            status: response.status(),
            headers: response.headers().clone(),
            method: self.method.clone(),
            url: self.url.to_string(),
            body,
        })
    }

    /// GET, PUT, POST and DELETE are supported by every transport; HEAD and
    /// PATCH must be probed. Anything else is rejected outright, before any
    /// transmission.
    fn ensure_method_supported(&self) -> Result<()> {
        let supported = match self.method {
            Method::GET | Method::PUT | Method::POST | Method::DELETE => true,
            Method::HEAD | Method::PATCH => self.transport.supports_method(&self.method),
            _ => false,
        };
        if supported {
            Ok(())
        } else {
            Err(Error::UnsupportedMethod {
                method: self.method.clone(),
            })
        }
    }

    /// Stage headers and content, then hand the prepared request to the
    /// transport for one physical attempt.
    fn transmit_once(&self) -> Result<RawResponse> {
        let mut low_level = self
            .transport
            .build_request(self.method.clone(), &self.url)
            .map_err(|source| self.transport_error(source))?;

        for (name, value) in serialize_headers(&self.headers, self.suppress_user_agent_suffix) {
            low_level.add_header(&name, &value);
        }

        if let Some(content) = &self.content {
            let media_type = content.media_type().map(ToOwned::to_owned);
            let mut length = content.length();
            let mut encoding = None;
            let mut body: Arc<dyn HttpContent> = Arc::clone(content);

            if self.logging_enabled
                && self.content_logging_limit > 0
                && tracing::enabled!(tracing::Level::DEBUG)
            {
                body = Arc::new(LoggingContent::new(body, self.content_logging_limit));
            }
            if self.enable_gzip_content {
                body = Arc::new(GzipContent::new(body));
                encoding = Some("gzip".to_owned());
                length = None;
            }

            low_level.set_content(StagedContent {
                media_type,
                encoding,
                length,
                body,
            });
        }

        if self.logging_enabled {
            tracing::debug!(method = %self.method, url = %self.url, "executing request");
        }
        low_level
            .execute()
            .map_err(|source| self.transport_error(source))
    }

    fn transport_error(&self, source: std::io::Error) -> Error {
        Error::Transport {
            method: self.method.clone(),
            url: self.url.to_string(),
            source,
        }
    }
}
