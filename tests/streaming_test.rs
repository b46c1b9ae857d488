//! Streaming-mode classification: token events, terminal events, cancellation

mod support;

use futures_util::StreamExt;
use secdoc::llm::{BackendError, MockResponse};
use secdoc::policy::DecisionStrategy;
use secdoc::stream::collect_tokens;
use secdoc::{ClassificationOutcome, ClassificationRequest, ClassifyError, DecisionStatus, StreamEvent};
use serde_json::Value;
use support::{decision_json, fragments, harness, verdict, Harness, PLAIN_DOCUMENT};
use tokio::sync::mpsc;

async fn stream_all(h: &Harness, request: ClassificationRequest) -> Vec<StreamEvent> {
    h.classifier.stream(request).collect().await
}

fn terminal_events(events: &[StreamEvent]) -> Vec<&StreamEvent> {
    events.iter().filter(|e| e.is_terminal()).collect()
}

fn done_result(events: &[StreamEvent]) -> &ClassificationOutcome {
    match events.last() {
        Some(StreamEvent::Done { result }) => result,
        other => panic!("Expected done as last event, got {:?}", other),
    }
}

/// Concatenated tokens parse to the same verdict the terminal event carries
fn assert_tokens_match_done(events: &[StreamEvent]) {
    let text = collect_tokens(events);
    let parsed: Value = serde_json::from_str(&text).unwrap();
    let result = done_result(events);

    assert_eq!(parsed["is_sensitive"], result.is_sensitive);
    assert_eq!(parsed["confidence"], result.confidence);
}

#[tokio::test]
async fn test_fast_path_emits_single_token_then_done() {
    let h = harness(DecisionStrategy::Model, vec![]);

    let events = stream_all(&h, ClassificationRequest::new("", "本文件为内部参阅材料")).await;

    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], StreamEvent::Token { .. }));
    assert_tokens_match_done(&events);

    let result = done_result(&events);
    assert!(result.is_sensitive);
    assert_eq!(result.confidence, 100);
    assert!(result.evidence.contains("内部参阅"));
    assert_eq!(h.llm.call_count(), 0);
}

#[tokio::test]
async fn test_model_decision_streams_fragments() {
    let reply = decision_json(true, 88, "mentions an unannounced appointment");
    let chunks = fragments(&reply, 7);
    let chunk_count = chunks.len();

    let h = harness(
        DecisionStrategy::Model,
        vec![
            verdict("Sensitive", 70, "a"),
            verdict("Public", 40, "b"),
            MockResponse::chunks(chunks),
        ],
    );

    let events = stream_all(&h, ClassificationRequest::new("人事", PLAIN_DOCUMENT)).await;

    assert_eq!(events.len(), chunk_count + 1);
    assert_eq!(collect_tokens(&events), reply);
    assert_eq!(terminal_events(&events).len(), 1);
    assert_tokens_match_done(&events);

    let result = done_result(&events);
    assert!(result.is_sensitive);
    assert_eq!(result.confidence, 88);
    assert_eq!(result.status, DecisionStatus::Decided);
}

#[tokio::test]
async fn test_rule_hit_emits_single_token() {
    let h = harness(
        DecisionStrategy::Model,
        vec![verdict("Sensitive", 95, "a"), verdict("Public", 99, "b")],
    );

    let events = stream_all(&h, ClassificationRequest::new("", PLAIN_DOCUMENT)).await;

    assert_eq!(events.len(), 2);
    assert_tokens_match_done(&events);
    assert_eq!(done_result(&events).confidence, 95);
    assert_eq!(h.llm.call_count(), 2);
}

#[tokio::test]
async fn test_rules_strategy_streams_weighted_result() {
    let h = harness(
        DecisionStrategy::Rules,
        vec![verdict("NonSensitive", 40, "a"), verdict("Public", 30, "b")],
    );

    let events = stream_all(&h, ClassificationRequest::new("", PLAIN_DOCUMENT)).await;

    assert_tokens_match_done(&events);
    let result = done_result(&events);
    assert!(!result.is_sensitive);
    assert_eq!(result.confidence, 37);
}

#[tokio::test]
async fn test_unparseable_decision_still_ends_with_done() {
    let h = harness(
        DecisionStrategy::Model,
        vec![
            verdict("NonSensitive", 40, "a"),
            verdict("Public", 30, "b"),
            MockResponse::chunks(["Probably ", "not ", "sensitive."]),
        ],
    );

    let events = stream_all(&h, ClassificationRequest::new("", PLAIN_DOCUMENT)).await;

    assert_eq!(collect_tokens(&events), "Probably not sensitive.");
    assert_eq!(terminal_events(&events).len(), 1);
    assert_eq!(done_result(&events).status, DecisionStatus::Inconclusive);
}

#[tokio::test]
async fn test_interrupted_stream_ends_with_error() {
    let h = harness(
        DecisionStrategy::Model,
        vec![
            verdict("NonSensitive", 40, "a"),
            verdict("Public", 30, "b"),
            MockResponse::interrupted(
                ["{\"is_sensitive\": ", "false"],
                BackendError::StreamInterrupted {
                    message: "connection closed".to_string(),
                },
            ),
        ],
    );

    let events = stream_all(&h, ClassificationRequest::new("", PLAIN_DOCUMENT)).await;

    let terminals = terminal_events(&events);
    assert_eq!(terminals.len(), 1);
    match terminals[0] {
        StreamEvent::Error { message } => assert!(message.contains("connection closed")),
        other => panic!("Expected error event, got {:?}", other),
    }
    assert!(matches!(events.last(), Some(StreamEvent::Error { .. })));
    assert_eq!(collect_tokens(&events), "{\"is_sensitive\": false");
}

#[tokio::test]
async fn test_analysis_failure_ends_with_error_and_no_tokens() {
    let h = harness(
        DecisionStrategy::Model,
        vec![MockResponse::error(BackendError::AuthenticationError {
            message: "invalid key".to_string(),
        })],
    );

    let events = stream_all(&h, ClassificationRequest::new("", PLAIN_DOCUMENT)).await;

    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], StreamEvent::Error { .. }));
}

#[tokio::test]
async fn test_invalid_input_ends_with_error() {
    let h = harness(DecisionStrategy::Model, vec![]);

    let events = stream_all(&h, ClassificationRequest::new("标题", " \n ")).await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        StreamEvent::Error { message } => assert!(message.contains("Invalid input")),
        other => panic!("Expected error event, got {:?}", other),
    }
}

#[tokio::test]
async fn test_listener_hang_up_cancels_run() {
    let h = harness(DecisionStrategy::Model, vec![]);
    let (tx, rx) = mpsc::channel(4);
    drop(rx);

    let err = h
        .classifier
        .classify_streaming(ClassificationRequest::new("", "本文件为内部参阅材料"), tx)
        .await
        .unwrap_err();

    assert!(matches!(err, ClassifyError::Cancelled));
}

#[tokio::test]
async fn test_hang_up_stops_at_first_decision_fragment() {
    let h = harness(
        DecisionStrategy::Model,
        vec![
            verdict("NonSensitive", 40, "a"),
            verdict("Public", 30, "b"),
            MockResponse::chunks(["{\"is_sensitive\": false,", " \"confidence\": 60}"]),
        ],
    );
    let (tx, rx) = mpsc::channel(4);
    drop(rx);

    let err = h
        .classifier
        .classify_streaming(ClassificationRequest::new("", PLAIN_DOCUMENT), tx)
        .await
        .unwrap_err();

    assert!(matches!(err, ClassifyError::Cancelled));
    assert_eq!(h.llm.call_count(), 3);
}

#[tokio::test]
async fn test_sse_frames_round_trip() {
    let h = harness(DecisionStrategy::Model, vec![]);

    let events = stream_all(&h, ClassificationRequest::new("", "本文件为内部参阅材料")).await;
    let wire: String = events.iter().map(StreamEvent::to_sse_frame).collect();

    let parsed: Vec<StreamEvent> = wire
        .split("\n\n")
        .filter_map(StreamEvent::from_sse_frame)
        .collect();

    assert_eq!(parsed, events);
    assert!(wire.starts_with("data: {\"type\":\"token\""));
}

#[tokio::test]
async fn test_dropping_stream_stops_delivery() {
    let h = harness(
        DecisionStrategy::Model,
        vec![
            verdict("NonSensitive", 40, "a"),
            verdict("Public", 30, "b"),
            MockResponse::chunks(fragments(&decision_json(false, 70, "x"), 3)),
        ],
    );

    let mut stream = h
        .classifier
        .stream(ClassificationRequest::new("", PLAIN_DOCUMENT));
    let first = stream.next().await;
    assert!(matches!(first, Some(StreamEvent::Token { .. })));
    drop(stream);

    // the classifier remains usable for new runs
    let outcome = h
        .classifier
        .classify(ClassificationRequest::new("", "本文件为内部参阅材料"))
        .await
        .unwrap();
    assert!(outcome.is_sensitive);
}
