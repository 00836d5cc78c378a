//! Backend API tests over real HTTP using wiremock.
//!
//! These drive `DebugApiClient` and `StreamController` through
//! `ReqwestHttpClient` against a local mock server.

mod common;

use common::*;
use debugscope::adapters::ReqwestHttpClient;
use debugscope::client::{ClientError, DebugApiClient};
use debugscope::engine::SessionStatus;
use debugscope::stream::{PollStop, StreamController, StreamOutcome};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_token() -> String {
    "test-api-key".to_string()
}

fn api_client(server: &MockServer) -> DebugApiClient {
    DebugApiClient::new(Arc::new(ReqwestHttpClient::new()), &server.uri())
        .with_api_key(Some(test_token()))
}

fn controller(server: &MockServer) -> StreamController {
    StreamController::new(api_client(server), fast_settings())
}

fn sse_body(events: &[serde_json::Value]) -> String {
    events
        .iter()
        .map(|e| sse_frame(e["type"].as_str().unwrap(), e))
        .collect()
}

#[tokio::test]
async fn test_fetch_session_log_sends_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wunder/admin/monitor/s1"))
        .and(header("Authorization", format!("Bearer {}", test_token())))
        .respond_with(ResponseTemplate::new(200).set_body_json(log_json(
            "s1",
            "running",
            &[stored("progress", json!({"stage": "start"}), 0)],
        )))
        .expect(1)
        .mount(&server)
        .await;

    let log = api_client(&server).fetch_session_log("s1").await.unwrap();
    assert_eq!(log.session.session_id.as_deref(), Some("s1"));
    assert_eq!(log.session.status, SessionStatus::Running);
    assert_eq!(log.events.len(), 1);
}

#[tokio::test]
async fn test_fetch_escapes_session_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wunder/admin/monitor/a%20b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(log_json("a b", "finished", &[])))
        .mount(&server)
        .await;

    let log = api_client(&server).fetch_session_log("a b").await.unwrap();
    assert_eq!(log.session.status, SessionStatus::Finished);
}

#[tokio::test]
async fn test_fetch_missing_session_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wunder/admin/monitor/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "not found"})))
        .mount(&server)
        .await;

    let err = api_client(&server)
        .fetch_session_log("gone")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_fetch_unreadable_log() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wunder/admin/monitor/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = api_client(&server)
        .fetch_session_log("s1")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Json(_)));
}

#[tokio::test]
async fn test_cancel_posts_to_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/wunder/admin/monitor/s1/cancel"))
        .and(header("Authorization", format!("Bearer {}", test_token())))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    api_client(&server).cancel("s1").await.unwrap();
}

#[tokio::test]
async fn test_cancel_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/wunder/admin/monitor/s1/cancel"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = api_client(&server).cancel("s1").await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert!(!err.is_not_found());
}

#[tokio::test]
async fn test_live_stream_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/wunder"))
        .and(header("Authorization", format!("Bearer {}", test_token())))
        .and(body_partial_json(json!({"question": "q", "stream": true})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body(&two_round_run()), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut controller = controller(&server);
    let (mut ctx, renderer) = test_context();
    let request = controller.client().request("q");
    let outcome = controller
        .start(&mut ctx, &request, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, StreamOutcome::Completed { final_seen: true });
    assert_eq!(ctx.session().status, SessionStatus::Finished);
    assert_eq!(ctx.stats().token_total, 70);
    assert!(ctx.correlator().is_empty());
    assert_eq!(renderer.log().requests.len(), 3);
}

#[tokio::test]
async fn test_live_stream_rejected_by_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/wunder"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let mut controller = controller(&server);
    let (mut ctx, _) = test_context();
    let request = controller.client().request("q");
    let result = controller
        .start(&mut ctx, &request, CancellationToken::new())
        .await;

    assert!(result.is_err());
    assert_eq!(ctx.session().status, SessionStatus::Error);
    assert!(!ctx.session().streaming);
}

#[tokio::test]
async fn test_single_shot_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/wunder"))
        .and(body_partial_json(json!({"stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "42",
            "session_id": "s9",
            "usage": {"input_tokens": 7, "output_tokens": 3}
        })))
        .mount(&server)
        .await;

    let mut controller = controller(&server);
    let (mut ctx, _) = test_context();
    let request = controller.client().request("q");
    let answer = controller.send_once(&mut ctx, &request).await.unwrap();

    assert_eq!(answer["answer"], "42");
    assert_eq!(ctx.session_id(), Some("s9"));
    assert_eq!(ctx.stats().token_total, 10);
    assert!(ctx.stats().usage_final);
    assert_eq!(ctx.session().status, SessionStatus::Finished);
}

#[tokio::test]
async fn test_poll_follows_log_until_finished() {
    let server = MockServer::start().await;
    let events = two_round_run();
    Mock::given(method("GET"))
        .and(path("/wunder/admin/monitor/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(log_json("s1", "running", &events[..5])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wunder/admin/monitor/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(log_json("s1", "finished", &events)))
        .mount(&server)
        .await;

    let mut controller = controller(&server);
    let (mut ctx, _) = test_context();
    ctx.bind_session("s1");
    ctx.session_mut().status = SessionStatus::Running;
    controller.scheduler_mut().arm();

    let stop = controller.poll(&mut ctx, &CancellationToken::new()).await.unwrap();

    assert_eq!(stop, PollStop::Inactive);
    assert_eq!(ctx.session().status, SessionStatus::Finished);
    assert_eq!(ctx.session().event_cursor, events.len());
    assert_eq!(ctx.stats().token_total, 70);
}

#[tokio::test]
async fn test_cancel_then_settle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/wunder/admin/monitor/s1/cancel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/wunder/admin/monitor/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(log_json(
            "s1",
            "cancelled",
            &[stored("error", json!({"message": "cancelled"}), 0)],
        )))
        .mount(&server)
        .await;

    let mut controller = controller(&server);
    let (mut ctx, _) = test_context();
    ctx.bind_session("s1");
    ctx.session_mut().status = SessionStatus::Running;

    controller.cancel(&mut ctx).await.unwrap();
    assert_eq!(ctx.session().status, SessionStatus::Cancelling);

    assert!(controller.wait_for_cancel_settle(&mut ctx).await);
    assert_eq!(ctx.session().status, SessionStatus::Cancelled);
}
