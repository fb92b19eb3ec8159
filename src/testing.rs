//! Test doubles for the execution engine: a scripted transport, observable
//! retry policies, and a manually triggered task runner.

use std::collections::VecDeque;
use std::io::{self, Cursor};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use url::Url;

use crate::backoff::BackOffPolicy;
use crate::future::TaskRunner;
use crate::handler::UnsuccessfulResponseHandler;
use crate::request::Request;
use crate::response::Response;
use crate::transport::{RawResponse, StagedContent, Transport, TransportRequest};
use crate::util::lock_unpoisoned;

/// Scripted response returned by [`MockTransport`].
#[derive(Clone, Debug)]
pub struct MockResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl MockResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

/// One scripted attempt outcome: a response, or a transport-level failure.
#[derive(Clone, Debug)]
pub enum MockOutcome {
    Response(MockResponse),
    TransportError(String),
}

/// What one physical attempt actually put on the wire.
#[derive(Clone, Debug)]
pub struct CapturedRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub content_length: Option<u64>,
    pub body: Option<Vec<u8>>,
}

impl CapturedRequest {
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(header_name, _)| header_name.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }

    pub fn first_header(&self, name: &str) -> Option<&str> {
        self.header_values(name).first().copied()
    }
}

struct MockState {
    outcomes: Mutex<VecDeque<MockOutcome>>,
    captured: Mutex<Vec<CapturedRequest>>,
    calls: AtomicUsize,
}

/// In-memory transport with a scripted outcome queue.
///
/// Attempts pop outcomes in order; once the script runs dry every further
/// attempt gets an empty 200. Every attempt is captured for inspection.
/// HEAD and PATCH are unsupported unless declared via
/// [`MockTransport::supported_methods`].
pub struct MockTransport {
    state: Arc<MockState>,
    supported_methods: Option<Vec<Method>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::scripted([])
    }

    pub fn scripted(outcomes: impl IntoIterator<Item = MockOutcome>) -> Self {
        Self {
            state: Arc::new(MockState {
                outcomes: Mutex::new(outcomes.into_iter().collect()),
                captured: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            }),
            supported_methods: None,
        }
    }

    pub fn with_responses(responses: impl IntoIterator<Item = MockResponse>) -> Self {
        Self::scripted(responses.into_iter().map(MockOutcome::Response))
    }

    /// Replace the supported-method probe answer wholesale.
    pub fn supported_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.supported_methods = Some(methods.into_iter().collect());
        self
    }

    /// Number of physical attempts executed so far.
    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    pub fn captured_requests(&self) -> Vec<CapturedRequest> {
        lock_unpoisoned(&self.state.captured).clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    fn supports_method(&self, method: &Method) -> bool {
        match &self.supported_methods {
            Some(methods) => methods.contains(method),
            None => matches!(
                *method,
                Method::GET | Method::PUT | Method::POST | Method::DELETE
            ),
        }
    }

    fn build_request(&self, method: Method, url: &Url) -> io::Result<Box<dyn TransportRequest>> {
        Ok(Box::new(MockTransportRequest {
            state: Arc::clone(&self.state),
            method,
            url: url.to_string(),
            headers: Vec::new(),
            content: None,
        }))
    }
}

struct MockTransportRequest {
    state: Arc<MockState>,
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    content: Option<StagedContent>,
}

impl TransportRequest for MockTransportRequest {
    fn add_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_owned(), value.to_owned()));
    }

    fn set_content(&mut self, content: StagedContent) {
        self.content = Some(content);
    }

    fn execute(self: Box<Self>) -> io::Result<RawResponse> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);

        let (content_type, content_encoding, content_length, body) = match &self.content {
            Some(staged) => {
                let mut bytes = Vec::new();
                staged.body.write_to(&mut bytes)?;
                (
                    staged.media_type.clone(),
                    staged.encoding.clone(),
                    staged.length,
                    Some(bytes),
                )
            }
            None => (None, None, None, None),
        };
        lock_unpoisoned(&self.state.captured).push(CapturedRequest {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            content_type,
            content_encoding,
            content_length,
            body,
        });

        let outcome = lock_unpoisoned(&self.state.outcomes).pop_front();
        match outcome {
            None => Ok(RawResponse::new(StatusCode::OK)),
            Some(MockOutcome::Response(mock)) => {
                let status = StatusCode::from_u16(mock.status).map_err(io::Error::other)?;
                let mut headers = HeaderMap::new();
                for (name, value) in &mock.headers {
                    let name: HeaderName = name.parse().map_err(io::Error::other)?;
                    let value: HeaderValue = value.parse().map_err(io::Error::other)?;
                    headers.append(name, value);
                }
                let body: Option<Box<dyn io::Read + Send>> = if mock.body.is_empty() {
                    None
                } else {
                    Some(Box::new(Cursor::new(mock.body)))
                };
                Ok(RawResponse {
                    status,
                    headers,
                    body,
                })
            }
            Some(MockOutcome::TransportError(message)) => {
                Err(io::Error::new(io::ErrorKind::ConnectionReset, message))
            }
        }
    }
}

/// Backoff policy that records its invocations through shared counters.
///
/// Backs off for 500 and 503, with a zero-length pause (or STOP when built
/// with [`MockBackOffPolicy::returning_stop`]).
pub struct MockBackOffPolicy {
    reset_calls: Arc<AtomicUsize>,
    backoff_calls: Arc<AtomicUsize>,
    return_stop: bool,
}

impl MockBackOffPolicy {
    pub fn new() -> Self {
        Self {
            reset_calls: Arc::new(AtomicUsize::new(0)),
            backoff_calls: Arc::new(AtomicUsize::new(0)),
            return_stop: false,
        }
    }

    pub fn returning_stop() -> Self {
        Self {
            return_stop: true,
            ..Self::new()
        }
    }

    /// Shared counter of `reset` calls; clone survives moving the policy
    /// into a request.
    pub fn reset_call_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reset_calls)
    }

    /// Shared counter of `next_backoff` calls.
    pub fn backoff_call_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.backoff_calls)
    }
}

impl Default for MockBackOffPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl BackOffPolicy for MockBackOffPolicy {
    fn reset(&mut self) {
        self.reset_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn is_backoff_required(&self, status: StatusCode) -> bool {
        matches!(
            status,
            StatusCode::INTERNAL_SERVER_ERROR | StatusCode::SERVICE_UNAVAILABLE
        )
    }

    fn next_backoff(&mut self) -> Option<Duration> {
        self.backoff_calls.fetch_add(1, Ordering::SeqCst);
        if self.return_stop {
            None
        } else {
            Some(Duration::ZERO)
        }
    }
}

/// Handler that answers with a fixed value and records that it was called.
pub struct MockUnsuccessfulResponseHandler {
    handle_result: bool,
    called: Arc<AtomicBool>,
}

impl MockUnsuccessfulResponseHandler {
    pub fn new(handle_result: bool) -> Self {
        Self {
            handle_result,
            called: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared called-flag; clone survives moving the handler into a request.
    pub fn called_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.called)
    }
}

impl UnsuccessfulResponseHandler for MockUnsuccessfulResponseHandler {
    fn handle_response(
        &self,
        _request: &mut Request,
        _response: &Response,
        _supports_retry: bool,
    ) -> bool {
        self.called.store(true, Ordering::SeqCst);
        self.handle_result
    }
}

/// Task runner that holds submissions until told to run them.
#[derive(Default)]
pub struct ManualTaskRunner {
    pending: Mutex<Vec<Box<dyn FnOnce() + Send + 'static>>>,
}

impl ManualTaskRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_count(&self) -> usize {
        lock_unpoisoned(&self.pending).len()
    }

    /// Run every held task on the calling thread.
    pub fn run_pending(&self) {
        let tasks: Vec<_> = lock_unpoisoned(&self.pending).drain(..).collect();
        for task in tasks {
            task();
        }
    }
}

impl TaskRunner for ManualTaskRunner {
    fn execute(&self, task: Box<dyn FnOnce() + Send + 'static>) {
        lock_unpoisoned(&self.pending).push(task);
    }
}
