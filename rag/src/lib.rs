mod chunk_text;
mod config;
mod credential;
mod embed;
mod error;
mod generate;
mod http;
mod index;
mod prompt;
mod retrieve;
mod scan_files;
mod session;
mod store;

use std::sync::Arc;

use tracing::info;

pub use chunk_text::chunk_text;
pub use config::{drive_download_url, program_dir, Config, IndexSource};
pub use credential::{provision_key, Credential, KeyOrigin};
pub use embed::{normalize, Embedder, EmbeddingFunction};
pub use error::{RagError, Result};
pub use generate::{parse_sse_line, relay_stream, AnswerGenerator, SseEvent};
pub use index::{index_corpus, IndexReport};
pub use prompt::{build_prompt, format_context, user_message, Message, SYSTEM_INSTRUCTIONS};
pub use retrieve::Retriever;
pub use session::{Banner, Phase, Session};
pub use store::{
    create_index_dir, fetch_remote_snapshot, read_snapshot, resolve_index_path, snapshot_path,
    write_snapshot, ChunkRecord, DocumentChunk, FetchOutcome, VectorStore, SNAPSHOT_FILE,
};

/// Retrieval plus generation for one session.
pub struct Assistant {
    retriever: Retriever,
    generator: AnswerGenerator,
}

impl Assistant {
    pub fn new(retriever: Retriever, generator: AnswerGenerator) -> Self {
        Self {
            retriever,
            generator,
        }
    }

    /// Retrieves context for `query` and streams the answer through
    /// `on_fragment`.
    pub fn answer<F>(&self, query: &str, on_fragment: F) -> Result<String>
    where
        F: FnMut(&str),
    {
        info!(query, "answering query");
        let chunks = self.retriever.retrieve(query)?;
        self.generator.generate(query, &chunks, on_fragment)
    }
}

/// Resolves (and in remote mode downloads) the index, opens it and wires the
/// fixed embedding function and completion client.
pub fn load_assistant(cfg: &Config, credential: Credential) -> Result<Assistant> {
    let embedder: Arc<dyn Embedder> = Arc::new(EmbeddingFunction::from_config(cfg));
    load_assistant_with(cfg, credential, embedder)
}

pub fn load_assistant_with(
    cfg: &Config,
    credential: Credential,
    embedder: Arc<dyn Embedder>,
) -> Result<Assistant> {
    let path = resolve_index_path(&cfg.index_source)?;
    let store = VectorStore::open(&path)?;
    let retriever = Retriever::new(store, embedder, cfg.top_k);
    let generator = AnswerGenerator::new(cfg, credential);
    Ok(Assistant::new(retriever, generator))
}
