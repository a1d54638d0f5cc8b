mod common;

use std::io::Cursor;

use common::{sse_body, FakeServer};
use medrag::{
    build_prompt, relay_stream, AnswerGenerator, Config, Credential, DocumentChunk, RagError,
    SYSTEM_INSTRUCTIONS,
};
use serde_json::Value;

fn chunk(text: &str) -> DocumentChunk {
    DocumentChunk {
        id: "c".to_string(),
        text: text.to_string(),
        metadata: Value::Null,
    }
}

fn generator_for(url: &str) -> AnswerGenerator {
    let cfg = Config {
        chat_url: format!("{}/openai/v1/chat/completions", url),
        ..Config::default()
    };
    AnswerGenerator::new(&cfg, Credential::new("gsk_test"))
}

#[test]
fn user_message_wraps_context_and_question() {
    let chunks = [chunk("Diabetes is a metabolic disease.")];
    let messages = build_prompt("What is diabetes?", &chunks);

    assert_eq!(messages.len(), 4);
    for (message, instruction) in messages.iter().zip(SYSTEM_INSTRUCTIONS) {
        assert_eq!(message.role, "system");
        assert_eq!(message.content, instruction);
    }
    assert_eq!(messages[3].role, "user");
    assert_eq!(
        messages[3].content,
        "Diabetes is a metabolic disease.\n\nQ: What is diabetes?\nA:"
    );
}

#[test]
fn context_joins_chunks_in_order() {
    let chunks = [chunk("first"), chunk("second")];
    let messages = build_prompt("q", &chunks);
    assert_eq!(messages[3].content, "first\nsecond\n\nQ: q\nA:");

    let empty = build_prompt("q", &[]);
    assert_eq!(empty[3].content, "\n\nQ: q\nA:");
}

#[test]
fn system_policy_carries_refusal_text() {
    assert!(SYSTEM_INSTRUCTIONS[0]
        .contains("'I cannot provide an answer based on the available medical dataset.'"));
    assert!(SYSTEM_INSTRUCTIONS[2].starts_with("When comparing two terms or conditions"));
}

#[test]
fn fragments_concatenate_to_the_answer() {
    let body = sse_body(&["Diabetes ", "is a ", "chronic ", "condition."], true);
    let mut seen = Vec::new();
    let answer = relay_stream(Cursor::new(body), |f| seen.push(f.to_string())).expect("stream");

    assert_eq!(seen, vec!["Diabetes ", "is a ", "chronic ", "condition."]);
    assert_eq!(seen.concat(), answer);
}

#[test]
fn truncated_stream_returns_no_answer() {
    let body = sse_body(&["partial"], false);
    let mut seen = Vec::new();
    let err = relay_stream(Cursor::new(body), |f| seen.push(f.to_string()))
        .expect_err("missing [DONE] must fail");
    assert!(matches!(err, RagError::Stream(_)));
    assert_eq!(seen, vec!["partial"]);
}

#[test]
fn generator_posts_fixed_request_and_streams() {
    let body = sse_body(&["Type 1 ", "and type 2."], true);
    let server = FakeServer::start(vec![(200, "text/event-stream", body)]);
    let generator = generator_for(&server.url);

    let mut fragments = Vec::new();
    let answer = generator
        .generate("What is diabetes?", &[chunk("Diabetes text")], |f| {
            fragments.push(f.to_string())
        })
        .expect("generate");
    assert_eq!(answer, "Type 1 and type 2.");
    assert_eq!(fragments.concat(), answer);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(
        request.request_line,
        "POST /openai/v1/chat/completions HTTP/1.1"
    );
    assert_eq!(request.header("authorization"), Some("Bearer gsk_test"));

    let json: Value = serde_json::from_str(&request.body).expect("json body");
    assert_eq!(json["model"], "llama3-70b-8192");
    assert_eq!(json["max_tokens"], 3000);
    assert_eq!(json["stream"], true);
    assert!((json["temperature"].as_f64().expect("temperature") - 0.7).abs() < 1e-6);
    let messages = json["messages"].as_array().expect("messages");
    assert_eq!(messages.len(), 4);
    assert_eq!(
        messages[3]["content"],
        "Diabetes text\n\nQ: What is diabetes?\nA:"
    );
}

#[test]
fn api_error_status_aborts_without_fragments() {
    let server = FakeServer::start(vec![(
        401,
        "application/json",
        r#"{"error":{"message":"Invalid API Key"}}"#.to_string(),
    )]);
    let generator = generator_for(&server.url);

    let mut called = false;
    let err = generator
        .generate("q", &[], |_| called = true)
        .expect_err("401 must fail");
    match err {
        RagError::Completion { status, body } => {
            assert_eq!(status.as_u16(), 401);
            assert!(body.contains("Invalid API Key"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!called);
}
