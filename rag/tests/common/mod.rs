#![allow(dead_code)]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

use medrag::{ChunkRecord, Embedder, RagError};

/// Request captured by [`FakeServer`].
#[derive(Clone, Debug)]
pub struct Captured {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Captured {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// One-shot HTTP/1.1 responder on a local port. Serves the canned
/// responses in order, one per connection, and records every request.
pub struct FakeServer {
    pub url: String,
    pub requests: Arc<Mutex<Vec<Captured>>>,
}

impl FakeServer {
    pub fn start(responses: Vec<(u16, &'static str, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake server");
        let url = format!("http://{}", listener.local_addr().expect("local addr"));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        thread::spawn(move || {
            for (status, content_type, body) in responses {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
                let mut request_line = String::new();
                reader.read_line(&mut request_line).expect("request line");
                let mut headers = Vec::new();
                let mut content_length = 0usize;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).expect("header line");
                    let line = line.trim_end();
                    if line.is_empty() {
                        break;
                    }
                    if let Some((k, v)) = line.split_once(':') {
                        if k.eq_ignore_ascii_case("content-length") {
                            content_length = v.trim().parse().unwrap_or(0);
                        }
                        headers.push((k.trim().to_string(), v.trim().to_string()));
                    }
                }
                let mut body_buf = vec![0u8; content_length];
                reader.read_exact(&mut body_buf).expect("request body");
                seen.lock().expect("lock").push(Captured {
                    request_line: request_line.trim_end().to_string(),
                    headers,
                    body: String::from_utf8_lossy(&body_buf).to_string(),
                });

                let response = format!(
                    "HTTP/1.1 {} X\r\nContent-Type: {}\r\nContent-Length: {}\r\n\
                     Connection: close\r\n\r\n{}",
                    status,
                    content_type,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.flush();
            }
        });

        Self { url, requests }
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.requests.lock().expect("lock").clone()
    }
}

/// Deterministic embedder: each keyword present in the text sets one axis.
pub struct KeywordEmbedder {
    pub keywords: Vec<&'static str>,
}

impl KeywordEmbedder {
    pub fn medical() -> Self {
        Self {
            keywords: vec!["diabetes", "asthma", "fracture"],
        }
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        self.keywords
            .iter()
            .map(|k| if lower.contains(k) { 1.0 } else { 0.0 })
            .collect()
    }

    pub fn record(&self, id: &str, text: &str) -> ChunkRecord {
        ChunkRecord {
            id: id.to_string(),
            document: text.to_string(),
            embedding: self.vector(text),
            metadata: serde_json::Value::Null,
        }
    }
}

impl Embedder for KeywordEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

pub fn sse_body(fragments: &[&str], done: bool) -> String {
    let mut body = String::new();
    body.push_str("data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"}}]}\n\n");
    for fragment in fragments {
        let event = serde_json::json!({
            "choices": [{"index": 0, "delta": {"content": fragment}}]
        });
        body.push_str(&format!("data: {}\n\n", event));
    }
    if done {
        body.push_str("data: [DONE]\n\n");
    }
    body
}
