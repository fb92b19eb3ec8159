use std::sync::Arc;
use std::sync::atomic::Ordering;

use http::header::{AUTHORIZATION, HeaderValue};
use http::{Method, StatusCode};
use reqkit::testing::{MockBackOffPolicy, MockOutcome, MockResponse, MockTransport, MockUnsuccessfulResponseHandler};
use reqkit::{
    BytesContent, ErrorCode, Request, RequestFactory, Response, USER_AGENT_SUFFIX,
    UnsuccessfulResponseHandler,
};
use url::Url;

fn factory(transport: &Arc<MockTransport>) -> RequestFactory {
    RequestFactory::new(Arc::clone(transport) as Arc<dyn reqkit::Transport>)
}

fn test_url() -> Url {
    Url::parse("http://not.used/").expect("test url parses")
}

fn transport_errors(count: usize) -> Vec<MockOutcome> {
    (0..count)
        .map(|_| MockOutcome::TransportError("connection reset".to_owned()))
        .collect()
}

fn server_errors(count: usize) -> Vec<MockResponse> {
    (0..count)
        .map(|_| MockResponse::new(500).body("INVALID TOKEN"))
        .collect()
}

#[test]
fn basic_methods_run_against_any_transport() {
    let transport = Arc::new(MockTransport::new());
    let factory = factory(&transport);

    for method in [Method::GET, Method::PUT, Method::POST, Method::DELETE] {
        let mut request = factory.request(method, test_url());
        let response = request.execute().expect("basic method executes");
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(transport.calls(), 4);
}

#[test]
fn head_and_patch_require_transport_support() {
    for method in [Method::HEAD, Method::PATCH] {
        let unsupporting = Arc::new(MockTransport::new());
        let mut request = factory(&unsupporting).request(method.clone(), test_url());
        let error = request.execute().expect_err("unprobed method is rejected");
        assert_eq!(error.code(), ErrorCode::UnsupportedMethod);
        assert_eq!(unsupporting.calls(), 0, "no transmission may happen");

        let supporting = Arc::new(MockTransport::new().supported_methods([method.clone()]));
        let mut request = factory(&supporting).request(method, test_url());
        request.execute().expect("declared method executes");
        assert_eq!(supporting.calls(), 1);
    }
}

#[test]
fn transport_errors_retry_until_success() {
    let calls_before_success = 3;
    let transport = Arc::new(MockTransport::scripted(transport_errors(calls_before_success)));
    let mut request = factory(&transport).get(test_url());
    request
        .set_retry_on_transport_error(true)
        .set_number_of_retries(calls_before_success as u32);

    let response = request.execute().expect("retries cover the failures");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(transport.calls(), calls_before_success + 1);
    assert_eq!(request.number_of_retries(), 0);
}

#[test]
fn transport_errors_beyond_the_budget_are_fatal() {
    let calls_before_success = 11;
    let transport = Arc::new(MockTransport::scripted(transport_errors(calls_before_success)));
    let mut request = factory(&transport).get(test_url());
    request
        .set_retry_on_transport_error(true)
        .set_number_of_retries(calls_before_success as u32 - 1);

    let error = request.execute().expect_err("budget runs out first");
    assert_eq!(error.code(), ErrorCode::Transport);
    assert_eq!(transport.calls(), calls_before_success);
}

#[test]
fn transport_errors_are_fatal_by_default() {
    let transport = Arc::new(MockTransport::scripted(transport_errors(1)));
    let mut request = factory(&transport).get(test_url());
    request.set_number_of_retries(5);

    let error = request.execute().expect_err("retry on transport error is off");
    assert_eq!(error.code(), ErrorCode::Transport);
    assert_eq!(error.code().as_str(), "transport");
    assert_eq!(transport.calls(), 1);
    assert_eq!(request.number_of_retries(), 5, "budget is untouched");
}

#[test]
fn transport_error_source_is_preserved_unchanged() {
    let transport = Arc::new(MockTransport::scripted(transport_errors(1)));
    let mut request = factory(&transport).get(test_url());

    let error = request.execute().expect_err("transport failure propagates");
    match error {
        reqkit::Error::Transport { source, .. } => {
            assert_eq!(source.kind(), std::io::ErrorKind::ConnectionReset);
        }
        other => panic!("unexpected error variant: {other}"),
    }
}

#[test]
fn user_agent_suffix_rides_along_on_every_attempt() {
    let transport = Arc::new(MockTransport::scripted(transport_errors(3)));
    let mut request = factory(&transport).get(test_url());
    request
        .set_retry_on_transport_error(true)
        .set_number_of_retries(4);

    let response = request.execute().expect("final attempt succeeds");
    assert_eq!(response.status(), StatusCode::OK);

    let captured = transport.captured_requests();
    assert_eq!(captured.len(), 4);
    for attempt in &captured {
        assert_eq!(attempt.header_values("user-agent"), vec![USER_AGENT_SUFFIX]);
    }
}

#[test]
fn handler_claiming_the_retry_needs_no_backoff_policy() {
    let transport = Arc::new(MockTransport::with_responses([MockResponse::new(401)]));
    let handler = MockUnsuccessfulResponseHandler::new(true);
    let called = handler.called_flag();

    let mut request = factory(&transport).get(test_url());
    request
        .set_unsuccessful_response_handler(handler)
        .clear_backoff_policy();

    let response = request.execute().expect("handler recovers the request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(transport.calls(), 2);
    assert!(called.load(Ordering::SeqCst));
}

#[test]
fn factory_helpers_set_method_and_content() {
    let transport = Arc::new(MockTransport::new());
    let factory = factory(&transport);

    assert_eq!(*factory.get(test_url()).method(), Method::GET);
    assert_eq!(*factory.delete(test_url()).method(), Method::DELETE);
    assert_eq!(*factory.head(test_url()).method(), Method::HEAD);

    let put = factory.put(test_url(), BytesContent::new("x"));
    assert_eq!(*put.method(), Method::PUT);
    assert!(put.content().is_some());

    let patch = factory.patch(test_url(), BytesContent::new("x"));
    assert_eq!(*patch.method(), Method::PATCH);
}

#[test]
fn handler_claiming_the_retry_suppresses_backoff() {
    let transport = Arc::new(MockTransport::with_responses(server_errors(1)));
    let handler = MockUnsuccessfulResponseHandler::new(true);
    let called = handler.called_flag();
    let policy = MockBackOffPolicy::new();
    let resets = policy.reset_call_count();
    let backoffs = policy.backoff_call_count();

    let mut request = factory(&transport).get(test_url());
    request
        .set_unsuccessful_response_handler(handler)
        .set_backoff_policy(policy);

    let response = request.execute().expect("handler recovers the request");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(transport.calls(), 2);
    assert_eq!(resets.load(Ordering::SeqCst), 1);
    assert_eq!(backoffs.load(Ordering::SeqCst), 0);
    assert!(called.load(Ordering::SeqCst));
}

#[test]
fn declined_handler_falls_through_to_backoff() {
    let transport = Arc::new(MockTransport::with_responses(server_errors(1)));
    let handler = MockUnsuccessfulResponseHandler::new(false);
    let called = handler.called_flag();
    let policy = MockBackOffPolicy::new();
    let resets = policy.reset_call_count();
    let backoffs = policy.backoff_call_count();

    let mut request = factory(&transport).get(test_url());
    request
        .set_unsuccessful_response_handler(handler)
        .set_backoff_policy(policy);

    let response = request.execute().expect("backoff retry succeeds");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(transport.calls(), 2);
    assert_eq!(resets.load(Ordering::SeqCst), 1);
    assert_eq!(backoffs.load(Ordering::SeqCst), 1);
    assert!(called.load(Ordering::SeqCst));
}

#[test]
fn backoff_retries_once_per_unsuccessful_response() {
    let calls_before_success = 5;
    let transport = Arc::new(MockTransport::with_responses(server_errors(calls_before_success)));
    let policy = MockBackOffPolicy::new();
    let resets = policy.reset_call_count();
    let backoffs = policy.backoff_call_count();

    let mut request = factory(&transport).get(test_url());
    request.set_backoff_policy(policy);

    let response = request.execute().expect("backoff covers the failures");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(transport.calls(), calls_before_success + 1);
    assert_eq!(resets.load(Ordering::SeqCst), 1);
    assert_eq!(backoffs.load(Ordering::SeqCst), calls_before_success);
}

#[test]
fn backoff_stops_at_the_retry_budget() {
    let calls_before_success = 11;
    let transport = Arc::new(MockTransport::with_responses(server_errors(calls_before_success)));
    let policy = MockBackOffPolicy::new();
    let backoffs = policy.backoff_call_count();

    let mut request = factory(&transport).get(test_url());
    request
        .set_number_of_retries(calls_before_success as u32 - 1)
        .set_backoff_policy(policy);

    let error = request.execute().expect_err("budget runs out first");
    assert_eq!(error.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(transport.calls(), calls_before_success);
    assert_eq!(backoffs.load(Ordering::SeqCst), calls_before_success - 1);
}

#[test]
fn backoff_is_not_consulted_for_unrecognized_status_codes() {
    let transport = Arc::new(MockTransport::with_responses([MockResponse::new(401)]));
    let handler = MockUnsuccessfulResponseHandler::new(false);
    let called = handler.called_flag();
    let policy = MockBackOffPolicy::new();
    let resets = policy.reset_call_count();
    let backoffs = policy.backoff_call_count();

    let mut request = factory(&transport).get(test_url());
    request
        .set_unsuccessful_response_handler(handler)
        .set_backoff_policy(policy);

    let error = request.execute().expect_err("401 terminates the loop");
    assert_eq!(error.status(), Some(StatusCode::UNAUTHORIZED));
    assert_eq!(transport.calls(), 1);
    assert_eq!(resets.load(Ordering::SeqCst), 1);
    assert_eq!(backoffs.load(Ordering::SeqCst), 0);
    assert!(called.load(Ordering::SeqCst));
}

#[test]
fn backoff_stop_sentinel_halts_after_a_single_consultation() {
    let transport = Arc::new(MockTransport::with_responses(server_errors(5)));
    let policy = MockBackOffPolicy::returning_stop();
    let resets = policy.reset_call_count();
    let backoffs = policy.backoff_call_count();

    let mut request = factory(&transport).get(test_url());
    request.set_backoff_policy(policy);

    let error = request.execute().expect_err("policy declines to continue");
    assert_eq!(error.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(transport.calls(), 1);
    assert_eq!(resets.load(Ordering::SeqCst), 1);
    assert_eq!(backoffs.load(Ordering::SeqCst), 1);
}

#[test]
fn unsuccessful_response_is_returned_when_errors_are_disabled() {
    let transport = Arc::new(MockTransport::with_responses([
        MockResponse::new(404).body("missing"),
    ]));
    let mut request = factory(&transport).get(test_url());
    request.set_error_on_unsuccessful_status(false);

    let mut response = request.execute().expect("response comes back as a value");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(!response.is_success());
    assert_eq!(response.text().expect("body reads"), "missing");
}

#[test]
fn http_status_error_carries_the_final_outcome() {
    let transport = Arc::new(MockTransport::with_responses([
        MockResponse::new(503)
            .header("retry-after", "5")
            .body("overloaded"),
    ]));
    let mut request = factory(&transport).get(test_url());

    let error = request.execute().expect_err("503 with no policy is fatal");
    assert_eq!(error.code(), ErrorCode::HttpStatus);
    match error {
        reqkit::Error::HttpStatus {
            status,
            headers,
            body,
            ..
        } => {
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(
                headers.get("retry-after").map(|value| value.as_bytes()),
                Some(b"5".as_slice())
            );
            assert_eq!(body, "overloaded");
        }
        other => panic!("unexpected error variant: {other}"),
    }
}

#[test]
fn retry_budget_survives_across_execute_calls() {
    let transport = Arc::new(MockTransport::with_responses(server_errors(4)));
    let policy = MockBackOffPolicy::new();

    let mut request = factory(&transport).get(test_url());
    request.set_number_of_retries(1).set_backoff_policy(policy);

    let first = request.execute().expect_err("budget of one is not enough");
    assert_eq!(first.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(transport.calls(), 2);
    assert_eq!(request.number_of_retries(), 0);

    // the engine does not replenish the budget between calls
    let second = request.execute().expect_err("no budget left");
    assert_eq!(second.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(transport.calls(), 3);
}

#[test]
fn staged_content_carries_media_type_and_length() {
    let transport = Arc::new(MockTransport::new());
    let factory = factory(&transport);

    let content = BytesContent::new(vec![b' '; 300]).with_media_type("text/plain");
    let mut request = factory.post(test_url(), content);
    request.execute().expect("post executes");

    let captured = transport.captured_requests();
    let attempt = captured.first().expect("one attempt captured");
    assert_eq!(attempt.method, Method::POST);
    assert_eq!(attempt.content_type.as_deref(), Some("text/plain"));
    assert_eq!(attempt.content_length, Some(300));
    assert_eq!(attempt.content_encoding, None);
    assert_eq!(attempt.body.as_deref(), Some(vec![b' '; 300].as_slice()));
}

#[test]
fn gzip_content_is_compressed_and_marked_on_the_wire() {
    use std::io::Read;

    let transport = Arc::new(MockTransport::new());
    let factory = factory(&transport);

    let content = BytesContent::new(vec![b' '; 300]).with_media_type("text/plain");
    let mut request = factory.post(test_url(), content);
    request.set_enable_gzip_content(true);
    request.execute().expect("gzip post executes");

    let captured = transport.captured_requests();
    let attempt = captured.first().expect("one attempt captured");
    assert_eq!(attempt.content_encoding.as_deref(), Some("gzip"));
    assert_eq!(attempt.content_length, None, "compressed length is unknown");

    let compressed = attempt.body.as_deref().expect("body captured");
    let mut decoder = flate2::read::GzDecoder::new(compressed);
    let mut decoded = Vec::new();
    decoder.read_to_end(&mut decoded).expect("body decodes");
    assert_eq!(decoded, vec![b' '; 300]);
}

#[test]
fn multi_valued_headers_reach_the_wire_in_order() {
    let transport = Arc::new(MockTransport::new());
    let mut request = factory(&transport).get(test_url());
    request
        .headers_mut()
        .append("accept", HeaderValue::from_static("text/plain"));
    request
        .headers_mut()
        .append("accept", HeaderValue::from_static("application/json"));
    request.execute().expect("request executes");

    let captured = transport.captured_requests();
    let attempt = captured.first().expect("one attempt captured");
    assert_eq!(
        attempt.header_values("accept"),
        vec!["text/plain", "application/json"]
    );
}

#[test]
fn user_agent_suffix_suppression_matrix() {
    let cases = [
        (None, false, Some(USER_AGENT_SUFFIX.to_owned())),
        (None, true, None),
        (
            Some("Testing"),
            false,
            Some(format!("Testing {USER_AGENT_SUFFIX}")),
        ),
        (Some("Testing"), true, Some("Testing".to_owned())),
    ];

    for (user_agent, suppress, expected) in cases {
        let transport = Arc::new(MockTransport::new());
        let mut request = factory(&transport).get(test_url());
        if let Some(user_agent) = user_agent {
            request
                .headers_mut()
                .insert("user-agent", HeaderValue::from_static(user_agent));
        }
        request.set_suppress_user_agent_suffix(suppress);
        request.execute().expect("request executes");

        let captured = transport.captured_requests();
        let attempt = captured.first().expect("one attempt captured");
        assert_eq!(
            attempt.first_header("user-agent").map(ToOwned::to_owned),
            expected,
            "user_agent={user_agent:?} suppress={suppress}"
        );
    }
}

struct RefreshAuthHandler;

impl UnsuccessfulResponseHandler for RefreshAuthHandler {
    fn handle_response(
        &self,
        request: &mut Request,
        response: &Response,
        _supports_retry: bool,
    ) -> bool {
        if response.status() != StatusCode::UNAUTHORIZED {
            return false;
        }
        request
            .headers_mut()
            .insert(AUTHORIZATION, HeaderValue::from_static("Bearer fresh"));
        true
    }
}

#[test]
fn handler_mutations_reach_the_next_attempt() {
    let transport = Arc::new(MockTransport::with_responses([MockResponse::new(401)]));
    let mut request = factory(&transport).get(test_url());
    request
        .headers_mut()
        .insert(AUTHORIZATION, HeaderValue::from_static("Bearer stale"));
    request.set_unsuccessful_response_handler(RefreshAuthHandler);

    let response = request.execute().expect("refreshed credential succeeds");
    assert_eq!(response.status(), StatusCode::OK);

    let captured = transport.captured_requests();
    assert_eq!(captured.len(), 2);
    assert_eq!(captured[0].first_header("authorization"), Some("Bearer stale"));
    assert_eq!(captured[1].first_header("authorization"), Some("Bearer fresh"));
}
