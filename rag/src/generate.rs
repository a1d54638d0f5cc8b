use std::io::{BufRead, BufReader};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::credential::Credential;
use crate::error::{RagError, Result};
use crate::http::post_stream;
use crate::prompt::{build_prompt, Message};
use crate::store::DocumentChunk;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<Delta>,
}

#[derive(Deserialize)]
struct Delta {
    content: Option<String>,
}

/// One decoded line of a server-sent event stream.
#[derive(Debug, PartialEq, Eq)]
pub enum SseEvent {
    Fragment(String),
    Done,
    Skip,
}

/// Streams chat completions from the hosted endpoint.
#[derive(Clone, Debug)]
pub struct AnswerGenerator {
    url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    credential: Credential,
}

impl AnswerGenerator {
    pub fn new(cfg: &Config, credential: Credential) -> Self {
        Self {
            url: cfg.chat_url.clone(),
            model: cfg.chat_model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            credential,
        }
    }

    /// Sends the fixed policy, `chunks` and `query`, relaying every fragment
    /// to `on_fragment` as it arrives. Returns the full answer only when the
    /// stream completed.
    pub fn generate<F>(
        &self,
        query: &str,
        chunks: &[DocumentChunk],
        on_fragment: F,
    ) -> Result<String>
    where
        F: FnMut(&str),
    {
        let messages = build_prompt(query, chunks);
        self.stream_chat(&messages, on_fragment)
    }

    pub fn stream_chat<F>(&self, messages: &[Message], on_fragment: F) -> Result<String>
    where
        F: FnMut(&str),
    {
        let req = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: true,
        };
        debug!(model = %self.model, messages = messages.len(), "requesting completion");
        let resp = post_stream(&self.url, self.credential.expose(), &req)?;
        let answer = relay_stream(BufReader::new(resp), on_fragment)?;
        info!(chars = answer.len(), "completion finished");
        Ok(answer)
    }
}

/// Reads an SSE body line by line, handing each fragment to `on_fragment`
/// before reading the next one.
///
/// The body must end with `data: [DONE]`; anything else is an error and the
/// partial text is dropped.
pub fn relay_stream<R, F>(reader: R, mut on_fragment: F) -> Result<String>
where
    R: BufRead,
    F: FnMut(&str),
{
    let mut answer = String::new();
    for line in reader.lines() {
        let line = line.map_err(|e| RagError::Stream(e.to_string()))?;
        match parse_sse_line(&line)? {
            SseEvent::Fragment(text) => {
                answer.push_str(&text);
                on_fragment(&text);
            }
            SseEvent::Done => return Ok(answer),
            SseEvent::Skip => {}
        }
    }
    warn!(received = answer.len(), "stream ended before completion marker");
    Err(RagError::Stream(
        "connection closed before the answer was complete".to_string(),
    ))
}

pub fn parse_sse_line(line: &str) -> Result<SseEvent> {
    let line = line.trim_end_matches('\r');
    let Some(data) = line.strip_prefix("data:") else {
        // Blank separators, comments and other SSE fields.
        return Ok(SseEvent::Skip);
    };
    let data = data.trim_start();
    if data == "[DONE]" {
        return Ok(SseEvent::Done);
    }

    let value: Value = serde_json::from_str(data)
        .map_err(|e| RagError::Stream(format!("malformed event: {}", e)))?;
    if let Some(err) = value.get("error") {
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        return Err(RagError::Stream(message));
    }

    let chunk: ChatChunk = serde_json::from_value(value)
        .map_err(|e| RagError::Stream(format!("unexpected event shape: {}", e)))?;
    let content = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta)
        .and_then(|d| d.content)
        .unwrap_or_default();
    if content.is_empty() {
        Ok(SseEvent::Skip)
    } else {
        Ok(SseEvent::Fragment(content))
    }
}
