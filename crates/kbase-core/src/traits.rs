use async_trait::async_trait;

use crate::types::Neighbor;

/// Text encoder producing fixed-length f32 vectors.
pub trait Embedder: Send + Sync {
    /// Identifier of the underlying model, used in logs.
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed_query(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for query"))
    }
}

/// Read-only nearest-neighbor index over `len()` vectors of `dim()` floats.
///
/// `search` returns at most `k` neighbors ordered best-first. Slots the
/// index could not fill may carry `NO_MATCH` handles.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn len(&self) -> usize;
    fn dim(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn search(&self, query: &[f32], k: usize) -> anyhow::Result<Vec<Neighbor>>;
}
