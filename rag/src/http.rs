use reqwest::blocking::{Client, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::from_str;

use crate::error::{RagError, Result};

// No timeout: a slow host blocks the caller until it answers or drops.
fn client() -> Result<Client> {
    Client::builder()
        .timeout(None)
        .build()
        .map_err(|e| RagError::http("client", e))
}

/// Plain unauthenticated GET. Any non-success status is a download failure.
pub fn get_bytes(url: &str) -> Result<Vec<u8>> {
    let resp = client()?
        .get(url)
        .send()
        .map_err(|e| RagError::http(url, e))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(RagError::Download {
            url: url.to_string(),
            status,
        });
    }
    let bytes = resp.bytes().map_err(|e| RagError::http(url, e))?;
    Ok(bytes.to_vec())
}

pub fn post_json<T: DeserializeOwned, B: Serialize>(url: &str, body: &B) -> Result<T> {
    let resp = client()?
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .json(body)
        .send()
        .map_err(|e| RagError::http(url, e))?;
    let status = resp.status();
    let text = resp.text().map_err(|e| RagError::http(url, e))?;
    if !status.is_success() {
        return Err(RagError::HttpStatus {
            method: "POST",
            url: url.to_string(),
            status,
            body: text,
        });
    }
    from_str::<T>(&text).map_err(|e| RagError::Decode {
        url: url.to_string(),
        reason: format!("{} | {}", e, text),
    })
}

/// Authenticated POST whose body is read incrementally by the caller.
pub fn post_stream<B: Serialize>(url: &str, bearer: &str, body: &B) -> Result<Response> {
    let resp = client()?
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .header(AUTHORIZATION, format!("Bearer {}", bearer))
        .json(body)
        .send()
        .map_err(|e| RagError::http(url, e))?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().map_err(|e| RagError::http(url, e))?;
        return Err(RagError::Completion { status, body });
    }
    Ok(resp)
}
