//! End-to-end scenarios through the public API, live and replayed.

mod common;

use common::*;
use debugscope::engine::SessionStatus;
use debugscope::replay::{apply_full_log, apply_log, ReplayMode};
use debugscope::stream::StreamOutcome;
use serde_json::json;
use tokio_util::sync::CancellationToken;

#[test]
fn test_single_round_from_epoch_seconds() {
    let events = vec![
        json!({"type": "llm_request", "data": {}, "timestamp": 0}),
        json!({
            "type": "llm_output",
            "data": {"content": "hi", "usage": {"input_tokens": 10, "output_tokens": 2}},
            "timestamp": 1
        }),
    ];
    let (mut ctx, renderer) = test_context();
    apply_full_log(&mut ctx, &session_log("s1", "finished", &events));

    assert!(ctx.rounds().round(1).is_some());
    let speed = ctx.metrics().speed;
    assert_eq!(speed.prefill_tokens, Some(10));
    assert_eq!(speed.decode_tokens, Some(2));
    assert!(ctx.correlator().is_empty());

    let log = renderer.log();
    assert_eq!(log.requests.len(), 1);
    assert_eq!(log.durations(log.requests[0].handle), vec!["1.00s".to_string()]);
    assert_eq!(log.responses(log.requests[0].handle), vec!["hi".to_string()]);
}

#[test]
fn test_final_usage_overrides_additive_sum() {
    let events = vec![
        stored("token_usage", json!({"total_tokens": 15}), 0),
        stored("token_usage", json!({"total_tokens": 25}), 100),
        stored("final", json!({"answer": "ok", "usage": {"total_tokens": 50}}), 200),
    ];
    let (mut ctx, _) = test_context();
    apply_full_log(&mut ctx, &session_log("s1", "finished", &events));

    assert_eq!(ctx.stats().token_total, 50);
    assert!(ctx.stats().usage_final);
    assert!(ctx.session().final_seen);
}

#[test]
fn test_final_usage_below_additive_sum_still_wins() {
    let mut events: Vec<_> = (0..6)
        .map(|i| stored("token_usage", json!({"total_tokens": 10}), i * 100))
        .collect();
    events.push(stored("final", json!({"answer": "ok", "usage": {"total_tokens": 50}}), 700));
    events.push(stored("final", json!({"answer": "ok", "usage": {"total_tokens": 20}}), 800));
    let (mut ctx, _) = test_context();
    apply_full_log(&mut ctx, &session_log("s1", "finished", &events));

    assert_eq!(ctx.stats().token_total, 50);
    assert!(ctx.stats().usage_final);
}

#[test]
fn test_rotated_log_forces_full_replay() {
    let (mut ctx, renderer) = test_context();
    let five: Vec<_> = (0..5)
        .map(|i| stored("tool_call", json!({"tool": "t"}), i * 10))
        .collect();
    apply_full_log(&mut ctx, &session_log("s1", "running", &five));
    assert_eq!(ctx.session().event_cursor, 5);

    let three: Vec<_> = (0..3)
        .map(|i| stored("tool_result", json!({"tool": "t"}), i * 10))
        .collect();
    let outcome = apply_log(&mut ctx, &session_log("s1", "finished", &three));

    assert_eq!(outcome.mode, ReplayMode::Full);
    assert_eq!(outcome.dispatched, 3);
    assert_eq!(ctx.session().event_cursor, 3);
    assert_eq!(ctx.session().status, SessionStatus::Finished);
    assert_eq!(ctx.stats().events_processed, 3);
    assert_eq!(ctx.stats().tool_calls_ok, 3);
    assert_eq!(renderer.log().clears, 2);
}

#[test]
fn test_two_round_run_metrics() {
    let (mut ctx, renderer) = test_context();
    let outcome = apply_full_log(&mut ctx, &session_log("s1", "finished", &two_round_run()));
    assert_eq!(outcome.dispatched, 15);
    assert_eq!(outcome.skipped, 0);

    let stats = ctx.stats();
    assert_eq!(stats.events_processed, 15);
    assert_eq!(stats.llm_requests, 2);
    assert_eq!(stats.knowledge_requests, 1);
    assert_eq!(stats.tool_calls_ok, 1);
    // Additive 24 + 36, then the final snapshot of 70
    assert_eq!(stats.token_input, 50);
    assert_eq!(stats.token_output, 10);
    assert_eq!(stats.token_total, 70);
    assert_eq!(stats.elapsed_s(), Some(4.2));

    let speed = ctx.metrics().speed;
    assert_eq!(speed.first_round, Some(1));
    assert_eq!(speed.latest_round, Some(2));
    assert_eq!(speed.prefill_tokens, Some(20));
    assert_eq!(speed.prefill_duration_s, Some(1.0));
    assert_eq!(speed.prefill_speed, Some(20.0));
    assert_eq!(speed.decode_tokens, Some(10));
    assert_eq!(speed.decode_duration_s, Some(3.0));

    // Knowledge lookup answered before the second model call
    let log = renderer.log();
    let handles: Vec<_> = log.requests.iter().map(|r| r.handle).collect();
    assert!(log.requests[1].title.starts_with("Knowledge request"));
    assert_eq!(log.responses(handles[0]), vec!["ab".to_string()]);
    assert_eq!(log.responses(handles[1]), vec!["kb".to_string()]);
    assert_eq!(log.responses(handles[2]), vec!["c".to_string()]);
    assert_eq!(log.durations(handles[0]), vec!["2.00s".to_string()]);
    assert_eq!(log.durations(handles[1]), vec!["0.40s".to_string()]);
    assert_eq!(log.durations(handles[2]), vec!["1.50s".to_string()]);

    // Deltas are counted but never logged
    assert!(log
        .entries
        .iter()
        .all(|e| e.meta.kind.as_str() != "llm_output_delta"));
}

#[test]
fn test_entries_without_timestamp_inherit_previous() {
    let events = vec![
        stored("llm_request", json!({}), 0),
        json!({"type": "llm_output_delta", "data": {"delta": "x"}}),
        stored("llm_output", json!({"content": "x"}), 2000),
    ];
    let (mut ctx, renderer) = test_context();
    apply_full_log(&mut ctx, &session_log("s1", "finished", &events));

    let round = ctx.rounds().round(1).unwrap();
    assert_eq!(round.first_output_ms, Some(ts(0).timestamp_millis()));
    let log = renderer.log();
    assert_eq!(log.durations(log.requests[0].handle), vec!["2.00s".to_string()]);
}

#[test]
fn test_malformed_entries_are_skipped() {
    let events = vec![
        stored("llm_request", json!({}), 0),
        json!("not an event"),
        json!({"data": {"content": "typeless"}}),
        stored("llm_output", json!({"content": "ok"}), 500),
    ];
    let (mut ctx, renderer) = test_context();
    let outcome = apply_full_log(&mut ctx, &session_log("s1", "finished", &events));

    assert_eq!(outcome.dispatched, 2);
    assert_eq!(outcome.skipped, 2);
    assert_eq!(ctx.session().event_cursor, 4);
    assert!(ctx.correlator().is_empty());
    let parse_errors = renderer
        .log()
        .summaries()
        .into_iter()
        .filter(|s| s.starts_with("parse_error"))
        .count();
    assert_eq!(parse_errors, 2);
}

#[tokio::test]
async fn test_live_stream_matches_replay_of_same_events() {
    let events = two_round_run();
    let frames: Vec<String> = events
        .iter()
        .map(|e| sse_frame(e["type"].as_str().unwrap(), e))
        .collect();
    let http = MockHttpConfig::new().with_stream(frames).build();
    let mut controller = test_controller(&http);
    let (mut live, _) = test_context();

    let request = controller.client().request("q");
    let outcome = controller
        .start(&mut live, &request, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome, StreamOutcome::Completed { final_seen: true });
    assert_eq!(live.session().status, SessionStatus::Finished);

    let (mut replayed, _) = test_context();
    apply_full_log(&mut replayed, &session_log("s1", "finished", &events));

    assert_eq!(live.snapshot(), replayed.snapshot());
}

#[tokio::test]
async fn test_live_stream_in_small_chunks() {
    let body: String = two_round_run()
        .iter()
        .map(|e| sse_frame(e["type"].as_str().unwrap(), e))
        .collect();
    // Byte-sized chunks split every line and frame
    let chunks: Vec<String> = body.chars().map(|c| c.to_string()).collect();
    let http = MockHttpConfig::new().with_stream(chunks).build();
    let mut controller = test_controller(&http);
    let (mut ctx, _) = test_context();

    let request = controller.client().request("q");
    controller
        .start(&mut ctx, &request, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(ctx.stats().events_processed, 15);
    assert_eq!(ctx.stats().token_total, 70);
    assert!(ctx.session().final_seen);
}

#[tokio::test]
async fn test_interrupted_run_fails_open_requests() {
    let events = two_round_run();
    // Cut after the second model call is sent
    let frames: Vec<String> = events[..10]
        .iter()
        .map(|e| sse_frame(e["type"].as_str().unwrap(), e))
        .collect();
    let http = MockHttpConfig::new().with_stream(frames).build();
    let mut controller = test_controller(&http);
    let (mut ctx, renderer) = test_context();

    let request = controller.client().request("q");
    let outcome = controller
        .start(&mut ctx, &request, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome, StreamOutcome::Completed { final_seen: false });
    assert_eq!(ctx.session().status, SessionStatus::Error);
    assert!(ctx.correlator().is_empty());

    let log = renderer.log();
    for request in &log.requests[1..] {
        assert_eq!(
            log.responses(request.handle),
            vec!["request error: no response".to_string()]
        );
    }
}

#[tokio::test]
async fn test_reconnect_resumes_from_cursor() {
    let events = two_round_run();
    let http = MockHttpConfig::new()
        .with_log("s1", &log_json("s1", "running", &events[..6]))
        .with_log("s1", &log_json("s1", "finished", &events))
        .build();
    let controller = test_controller(&http);
    let (mut ctx, _) = test_context();
    ctx.bind_session("s1");

    let first = controller.replay_manager().replay(&mut ctx).await.unwrap();
    assert_eq!(first.mode, ReplayMode::Full);
    assert_eq!(ctx.session().status, SessionStatus::Running);

    let second = controller.replay_manager().replay(&mut ctx).await.unwrap();
    assert_eq!(second.mode, ReplayMode::Incremental { from: 6 });
    assert_eq!(second.dispatched, events.len() - 6);
    assert_eq!(ctx.session().status, SessionStatus::Finished);

    let (mut reference, _) = test_context();
    apply_full_log(&mut reference, &session_log("s1", "finished", &events));
    assert_eq!(ctx.snapshot(), reference.snapshot());
}

#[tokio::test]
async fn test_missing_session_clears_cached_id() {
    let http = MockHttpConfig::new()
        .with_status(&log_url("gone"), 404, &json!({"detail": "not found"}))
        .build();
    let controller = test_controller(&http);
    let (mut ctx, _) = test_context();
    ctx.bind_session("gone");

    let err = controller
        .replay_manager()
        .replay(&mut ctx)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(ctx.session_id(), None);
}
