use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{RagError, Result};
use crate::http::post_json;

/// Turns text into vectors. Corpus and queries must go through the same
/// implementation with the same parameters.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let vecs = self.embed(&[text.to_string()])?;
        vecs.into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("no vector returned for query".to_string()))
    }
}

/// Fixed embedding model served by an Ollama-compatible host.
#[derive(Clone, Debug)]
pub struct EmbeddingFunction {
    pub url: String,
    pub model: String,
    pub device: String,
    pub normalize: bool,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
    options: EmbedOptions,
}

#[derive(Serialize)]
struct EmbedLegacyRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    options: EmbedOptions,
}

#[derive(Serialize, Clone, Copy)]
struct EmbedOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    num_gpu: Option<u32>,
}

impl EmbeddingFunction {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            url: cfg.ollama_url.trim_end_matches('/').to_string(),
            model: cfg.embed_model.clone(),
            device: cfg.embed_device.clone(),
            normalize: cfg.normalize_embeddings,
        }
    }

    fn options(&self) -> EmbedOptions {
        EmbedOptions {
            num_gpu: (self.device == "cpu").then_some(0),
        }
    }

    fn embed_legacy(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/api/embeddings", self.url);
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            let req = EmbedLegacyRequest {
                model: &self.model,
                prompt: text,
                options: self.options(),
            };
            let res = post_json::<Value, _>(&url, &req)?;
            out.extend(parse_embeddings(res)?);
        }
        Ok(out)
    }
}

impl Embedder for EmbeddingFunction {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let url = format!("{}/api/embed", self.url);
        let req = EmbedRequest {
            model: &self.model,
            input: texts,
            options: self.options(),
        };
        let mut vectors = match post_json::<Value, _>(&url, &req) {
            Ok(res) => parse_embeddings(res)?,
            Err(err) => {
                debug!(error = %err, "falling back to legacy embeddings endpoint");
                self.embed_legacy(texts)?
            }
        };
        if vectors.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "expected {} vectors, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        if self.normalize {
            vectors.iter_mut().for_each(|v| normalize(v));
        }
        Ok(vectors)
    }
}

pub fn normalize(vector: &mut [f32]) {
    let magnitude = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 && magnitude.is_finite() {
        vector.iter_mut().for_each(|x| *x /= magnitude);
    }
}

fn parse_embeddings(value: Value) -> Result<Vec<Vec<f32>>> {
    if let Some(embeddings) = value.get("embeddings") {
        return parse_embeddings_value(embeddings);
    }
    if let Some(embedding) = value.get("embedding") {
        return parse_embeddings_value(embedding);
    }
    Err(RagError::Embedding("no embeddings in response".to_string()))
}

fn parse_embeddings_value(value: &Value) -> Result<Vec<Vec<f32>>> {
    let arr = value
        .as_array()
        .ok_or_else(|| RagError::Embedding("invalid embeddings format".to_string()))?;
    if arr.is_empty() {
        return Ok(vec![]);
    }
    if arr[0].is_array() {
        return arr.iter().map(parse_vec).collect();
    }
    Ok(vec![parse_vec(value)?])
}

fn parse_vec(value: &Value) -> Result<Vec<f32>> {
    let arr = value
        .as_array()
        .ok_or_else(|| RagError::Embedding("embedding is not an array".to_string()))?;
    arr.iter()
        .map(|v| {
            v.as_f64()
                .map(|n| n as f32)
                .ok_or_else(|| RagError::Embedding("embedding value is not a number".to_string()))
        })
        .collect()
}
