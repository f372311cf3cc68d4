use std::sync::Arc;

use kbase_core::docstore::{DocumentStore, HandleMap, KnowledgeArtifact};
use kbase_core::traits::{Embedder, VectorIndex};
use kbase_core::types::{Neighbor, ResultItem};
use kbase_core::{Error, Result};

/// Query-time composition of encoder, vector index and document store.
///
/// Every component is immutable after construction, so one `Retriever` is
/// shared by reference across all concurrent requests without locking.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    store: DocumentStore,
    handles: HandleMap,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, artifact: KnowledgeArtifact) -> Self {
        Self { embedder, index, store: artifact.store, handles: artifact.handles }
    }

    pub fn index_size(&self) -> usize {
        self.index.len()
    }

    pub fn document_count(&self) -> usize {
        self.store.len()
    }

    pub fn model_id(&self) -> &str {
        self.embedder.model_id()
    }

    /// Nearest documents to `text`, best-first, at most `top_k` of them.
    ///
    /// Order and scores are exactly what the index returned. Hits that cannot
    /// be resolved to a document are logged and dropped, so fewer than
    /// `top_k` results is a normal outcome.
    pub async fn query(&self, text: &str, top_k: usize) -> Result<Vec<ResultItem>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let vector = self.encode(text).await?;
        let neighbors = self
            .index
            .search(&vector, top_k)
            .await
            .map_err(|e| Error::Search(format!("{e:#}")))?;
        Ok(self.resolve(&neighbors))
    }

    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let embedder = Arc::clone(&self.embedder);
        let text = text.to_string();
        let vector = tokio::task::spawn_blocking(move || embedder.embed_query(&text))
            .await
            .map_err(|e| Error::Embedding(format!("encoder task failed: {e}")))?
            .map_err(|e| Error::Embedding(format!("{e:#}")))?;
        if vector.len() != self.index.dim() {
            return Err(Error::Embedding(format!(
                "encoder produced {} dims, index expects {}",
                vector.len(),
                self.index.dim()
            )));
        }
        Ok(vector)
    }

    /// Translate index hits into result items, preserving their order.
    pub fn resolve(&self, neighbors: &[Neighbor]) -> Vec<ResultItem> {
        neighbors
            .iter()
            .filter(|n| n.is_match())
            .filter_map(|n| {
                let Some(doc_id) = self.handles.resolve(n.handle) else {
                    tracing::warn!(handle = n.handle, "index handle has no entry in the id map");
                    return None;
                };
                let Some(record) = self.store.get(doc_id) else {
                    tracing::warn!(handle = n.handle, doc_id, "document not found in docstore");
                    return None;
                };
                Some(ResultItem {
                    content: record.content.clone(),
                    metadata: record.metadata.clone(),
                    score: n.distance,
                })
            })
            .collect()
    }
}
