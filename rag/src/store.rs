//! Persistent similarity index.
//!
//! The index on disk is a JSON Lines snapshot of embedded chunks. A local
//! index is a directory holding [`SNAPSHOT_FILE`]; a remote index is a single
//! snapshot file downloaded once. Opening a snapshot builds an in-memory HNSW
//! graph over the stored vectors using L2 distance, which matches the raw
//! (un-normalized) embeddings the corpus was indexed with.

use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use hnsw_rs::hnsw::{Hnsw, Neighbour};
use hnsw_rs::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::IndexSource;
use crate::error::{RagError, Result};
use crate::http::get_bytes;

pub const SNAPSHOT_FILE: &str = "chunks.jsonl";

const MAX_NB_CONNECTION: usize = 16;
const MAX_LAYER: usize = 16;
const EF_CONSTRUCTION: usize = 200;

/// One stored line of the snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub id: String,
    pub document: String,
    pub embedding: Vec<f32>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

/// Retrieved text. Callers treat it as opaque content.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentChunk {
    pub id: String,
    pub text: String,
    pub metadata: Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    AlreadyPresent,
    Downloaded { bytes: usize },
}

pub struct VectorStore {
    hnsw: Option<Hnsw<'static, f32, DistL2>>,
    chunks: Vec<DocumentChunk>,
    dimensions: usize,
}

impl VectorStore {
    /// Opens the index at `path`, a directory or a snapshot file.
    ///
    /// A missing path fails with [`RagError::IndexNotFound`]. A directory
    /// without a snapshot opens as an empty index.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(RagError::IndexNotFound(path.to_path_buf()));
        }
        let file = snapshot_path(path);
        let records = if path.is_dir() && !file.exists() {
            warn!(path = %path.display(), "index directory has no snapshot; opening empty index");
            Vec::new()
        } else {
            read_snapshot(&file)?
        };
        let store = Self::from_records(path, records)?;
        info!(
            path = %path.display(),
            chunks = store.len(),
            dimensions = store.dimensions,
            "vector store opened"
        );
        Ok(store)
    }

    pub fn from_records(path: &Path, records: Vec<ChunkRecord>) -> Result<Self> {
        let dimensions = records.first().map(|r| r.embedding.len()).unwrap_or(0);
        for (i, record) in records.iter().enumerate() {
            let reason = if record.embedding.len() != dimensions {
                Some(format!(
                    "embedding has {} dimensions, expected {}",
                    record.embedding.len(),
                    dimensions
                ))
            } else if dimensions == 0 {
                Some("embedding is empty".to_string())
            } else if record.embedding.iter().any(|v| !v.is_finite()) {
                Some("embedding contains NaN or infinite values".to_string())
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(RagError::Snapshot {
                    path: path.to_path_buf(),
                    line: i + 1,
                    reason,
                });
            }
        }

        let hnsw = if records.is_empty() {
            None
        } else {
            let mut hnsw: Hnsw<f32, DistL2> = Hnsw::new(
                MAX_NB_CONNECTION,
                records.len(),
                MAX_LAYER,
                EF_CONSTRUCTION,
                DistL2,
            );
            for (id, record) in records.iter().enumerate() {
                hnsw.insert_slice((record.embedding.as_slice(), id));
            }
            hnsw.set_searching_mode(true);
            Some(hnsw)
        };

        let chunks = records
            .into_iter()
            .map(|r| DocumentChunk {
                id: r.id,
                text: r.document,
                metadata: r.metadata,
            })
            .collect();

        Ok(Self {
            hnsw,
            chunks,
            dimensions,
        })
    }

    /// Nearest `k` chunks to `query`, closest first.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<DocumentChunk>> {
        let Some(hnsw) = &self.hnsw else {
            return Ok(vec![]);
        };
        if query.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                expected: self.dimensions,
                got: query.len(),
            });
        }
        let ef_search = (k * 2).max(50);
        let neighbours: Vec<Neighbour> = hnsw.search(query, k, ef_search);
        Ok(neighbours
            .into_iter()
            .take(k)
            .filter_map(|n| self.chunks.get(n.d_id).cloned())
            .collect())
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Snapshot file behind an index path.
pub fn snapshot_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(SNAPSHOT_FILE)
    } else {
        path.to_path_buf()
    }
}

pub fn read_snapshot(file: &Path) -> Result<Vec<ChunkRecord>> {
    let handle = fs::File::open(file)
        .map_err(|e| RagError::io(format!("open {}", file.display()), e))?;
    let mut records = Vec::new();
    for (i, line) in BufReader::new(handle).lines().enumerate() {
        let line = line.map_err(|e| RagError::io(format!("read {}", file.display()), e))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str::<ChunkRecord>(&line).map_err(|e| RagError::Snapshot {
            path: file.to_path_buf(),
            line: i + 1,
            reason: e.to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}

pub fn write_snapshot(file: &Path, records: &[ChunkRecord]) -> Result<()> {
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| RagError::io(format!("create {}", parent.display()), e))?;
    }
    let handle = fs::File::create(file)
        .map_err(|e| RagError::io(format!("create {}", file.display()), e))?;
    let mut out = BufWriter::new(handle);
    for record in records {
        let line = serde_json::to_string(record).map_err(|e| RagError::Snapshot {
            path: file.to_path_buf(),
            line: 0,
            reason: e.to_string(),
        })?;
        writeln!(out, "{}", line)
            .map_err(|e| RagError::io(format!("write {}", file.display()), e))?;
    }
    out.flush()
        .map_err(|e| RagError::io(format!("write {}", file.display()), e))
}

/// Creates an empty local index directory. Nothing is written into it.
pub fn create_index_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| RagError::io(format!("create {}", dir.display()), e))?;
    info!(path = %dir.display(), "created index directory");
    Ok(())
}

/// Downloads `url` into `dest` unless `dest` already exists.
///
/// The body is written verbatim. On a failed request nothing is written.
pub fn fetch_remote_snapshot(url: &str, dest: &Path) -> Result<FetchOutcome> {
    if dest.exists() {
        info!(path = %dest.display(), "remote index already present");
        return Ok(FetchOutcome::AlreadyPresent);
    }
    info!(url, path = %dest.display(), "downloading index");
    let body = get_bytes(url)?;
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| RagError::io(format!("create {}", parent.display()), e))?;
    }
    fs::write(dest, &body).map_err(|e| RagError::io(format!("write {}", dest.display()), e))?;
    Ok(FetchOutcome::Downloaded { bytes: body.len() })
}

/// Path the index should be opened from, downloading it first in remote mode.
pub fn resolve_index_path(source: &IndexSource) -> Result<PathBuf> {
    match source {
        IndexSource::Local { dir } => Ok(dir.clone()),
        IndexSource::Remote { url, dest } => {
            fetch_remote_snapshot(url, dest)?;
            Ok(dest.clone())
        }
    }
}
