use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::info;

use crate::chunk_text::chunk_text;
use crate::config::{Config, IndexSource};
use crate::embed::Embedder;
use crate::error::{RagError, Result};
use crate::scan_files::scan_files;
use crate::store::{write_snapshot, ChunkRecord, SNAPSHOT_FILE};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexReport {
    pub files: usize,
    pub chunks: usize,
    pub snapshot: PathBuf,
}

/// Embeds the corpus under `cfg.source_dir` and rewrites the local snapshot.
pub fn index_corpus(cfg: &Config, embedder: &dyn Embedder) -> Result<IndexReport> {
    let IndexSource::Local { dir } = &cfg.index_source else {
        return Err(RagError::Config(
            "indexing writes a local index; set MED_INDEX_SOURCE=local".to_string(),
        ));
    };
    let source = Path::new(&cfg.source_dir);
    if !source.is_dir() {
        return Err(RagError::Config(format!(
            "corpus directory {} does not exist",
            source.display()
        )));
    }

    let files = scan_files(cfg, source);
    let mut records = Vec::new();
    for (path, text) in &files {
        let chunks = chunk_text(text, cfg.chunk_size, cfg.chunk_overlap);
        if chunks.is_empty() {
            continue;
        }
        let vectors = embedder.embed(&chunks)?;
        let source_name = path.to_string_lossy();
        for (idx, (chunk, embedding)) in chunks.into_iter().zip(vectors).enumerate() {
            records.push(ChunkRecord {
                id: format!("{}#{}", source_name, idx),
                document: chunk,
                embedding,
                metadata: json!({ "source": source_name, "chunk": idx }),
            });
        }
        info!(path = %path.display(), total_chunks = records.len(), "embedded file");
    }

    let snapshot = dir.join(SNAPSHOT_FILE);
    write_snapshot(&snapshot, &records)?;
    info!(
        files = files.len(),
        chunks = records.len(),
        path = %snapshot.display(),
        "index written"
    );
    Ok(IndexReport {
        files: files.len(),
        chunks: records.len(),
        snapshot,
    })
}
