//! Domain types shared by the encoder, index and retrieval layers.

use serde::{Deserialize, Serialize};

pub type DocumentId = String;
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Position of a vector inside the vector index (`0..N`).
pub type Handle = i64;

/// Handle value an index reports for an unfilled result slot.
pub const NO_MATCH: Handle = -1;

/// A stored text chunk and its provenance. Never mutated after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    #[serde(rename = "page_content")]
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// One raw hit from the vector index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub handle: Handle,
    /// Lower is more similar.
    pub distance: f32,
}

impl Neighbor {
    pub fn is_match(&self) -> bool {
        self.handle >= 0
    }
}

/// A resolved search result, in the order the index ranked it.
///
/// `score` is the raw index distance: lower means more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    #[serde(rename = "page_content")]
    pub content: String,
    pub metadata: Metadata,
    pub score: f32,
}
