//! Vector index backends over the persisted LanceDB dataset.

use anyhow::Result;

use kbase_core::config::{IndexMode, IndexSettings};
use kbase_core::traits::VectorIndex;

pub mod flat;
pub mod lance;
pub mod schema;
pub mod table;
pub mod writer;

pub use flat::FlatIndex;
pub use lance::LanceIndex;

/// Open the configured index read-only. In `memory` mode the vectors are
/// copied out of the dataset once and searched in process.
pub async fn open_index(settings: &IndexSettings) -> Result<Box<dyn VectorIndex>> {
    let uri = settings.resolved_uri();
    let lance = LanceIndex::open(&uri, &settings.table).await?;
    match settings.mode {
        IndexMode::Lance => Ok(Box::new(lance)),
        IndexMode::Memory => {
            let flat = lance.to_flat().await?;
            tracing::info!(vectors = flat.len(), "copied vector index into memory");
            Ok(Box::new(flat))
        }
    }
}
