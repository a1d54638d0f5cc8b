use std::sync::Arc;

use tracing::debug;

use crate::embed::Embedder;
use crate::error::Result;
use crate::store::{DocumentChunk, VectorStore};

/// Nearest-neighbour lookup over an opened store.
///
/// Queries are embedded with the same [`Embedder`] the corpus was built
/// with; results are neither re-ranked nor filtered.
pub struct Retriever {
    store: VectorStore,
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl Retriever {
    pub fn new(store: VectorStore, embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self {
            store,
            embedder,
            top_k,
        }
    }

    pub fn retrieve(&self, query: &str) -> Result<Vec<DocumentChunk>> {
        if self.store.is_empty() {
            debug!("index is empty; nothing to retrieve");
            return Ok(vec![]);
        }
        let vector = self.embedder.embed_query(query)?;
        let hits = self.store.search(&vector, self.top_k)?;
        debug!(hits = hits.len(), top_k = self.top_k, "retrieved chunks");
        Ok(hits)
    }
}
