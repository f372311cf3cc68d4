//! Query encoders: a candle BERT sentence encoder and a hashing encoder for
//! tests and local development.

use anyhow::Result;

use kbase_core::config::{EmbeddingBackend, EmbeddingSettings};
use kbase_core::traits::Embedder;

mod bert;
pub mod device;
mod hash;
pub mod pool;
pub mod tokenize;

pub use bert::BertEmbedder;
pub use hash::HashEmbedder;
pub use pool::masked_mean_l2;

/// Build the encoder selected by `embedding.backend`. Loading the BERT
/// backend blocks on file I/O and possibly a model download.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    match settings.backend {
        EmbeddingBackend::Hash => {
            tracing::info!(dim = settings.dim, "using hashing encoder");
            Ok(Box::new(HashEmbedder::new(settings.dim)))
        }
        EmbeddingBackend::Bert => Ok(Box::new(BertEmbedder::load(settings)?)),
    }
}
