mod common;

use common::FakeServer;
use medrag::{Config, Embedder, EmbeddingFunction, RagError};

fn embedder(url: &str) -> EmbeddingFunction {
    EmbeddingFunction::from_config(&Config {
        ollama_url: url.to_string(),
        ..Config::default()
    })
}

#[test]
fn batch_endpoint_returns_one_vector_per_text() {
    let server = FakeServer::start(vec![(
        200,
        "application/json",
        r#"{"embeddings":[[1.0,0.0],[0.0,2.0]]}"#.to_string(),
    )]);
    let texts = vec!["diabetes".to_string(), "asthma".to_string()];

    let vectors = embedder(&server.url).embed(&texts).expect("embed");
    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 2.0]]);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].request_line.starts_with("POST /api/embed "));
    let body: serde_json::Value = serde_json::from_str(&requests[0].body).expect("json");
    assert_eq!(body["model"], "bge-large");
    assert_eq!(body["input"][1], "asthma");
    assert_eq!(body["options"]["num_gpu"], 0);
}

#[test]
fn error_status_from_both_endpoints_keeps_the_body() {
    let server = FakeServer::start(vec![
        (404, "text/plain", "404 page not found".to_string()),
        (500, "application/json", r#"{"error":"model not loaded"}"#.to_string()),
    ]);

    let err = embedder(&server.url)
        .embed_query("fracture")
        .expect_err("both endpoints fail");
    match err {
        RagError::HttpStatus {
            method,
            url,
            status,
            body,
        } => {
            assert_eq!(method, "POST");
            assert!(url.ends_with("/api/embeddings"));
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body, r#"{"error":"model not loaded"}"#);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(server.requests().len(), 2);
}
