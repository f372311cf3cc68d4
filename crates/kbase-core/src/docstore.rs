//! Document store and the handle map that joins it to the vector index.
//!
//! Both are persisted together in one JSON artifact:
//!
//! ```json
//! {
//!   "docstore": { "<doc id>": { "page_content": "...", "metadata": { ... } } },
//!   "index_to_docstore_id": { "0": "<doc id>", "1": "<doc id>" }
//! }
//! ```
//!
//! The index only knows positions and the store only knows ids, so every
//! lookup from a search hit goes through [`HandleMap::resolve`] first.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{DocumentId, DocumentRecord, Handle};

#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    docs: HashMap<DocumentId, DocumentRecord>,
}

impl DocumentStore {
    pub fn new(docs: HashMap<DocumentId, DocumentRecord>) -> Self {
        Self { docs }
    }

    pub fn get(&self, id: &str) -> Option<&DocumentRecord> {
        self.docs.get(id)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

/// Index position -> external document id.
#[derive(Debug, Clone, Default)]
pub struct HandleMap {
    ids: HashMap<Handle, DocumentId>,
}

impl HandleMap {
    /// Parse the persisted form, whose keys are decimal positions (`"0"`, `"1"`, ...).
    pub fn from_persisted(raw: HashMap<String, DocumentId>) -> Result<Self> {
        let mut ids = HashMap::with_capacity(raw.len());
        for (key, doc_id) in raw {
            let handle = key
                .parse::<Handle>()
                .ok()
                .filter(|h| *h >= 0)
                .ok_or_else(|| Error::Corrupt(format!("handle map key '{key}' is not a non-negative integer")))?;
            ids.insert(handle, doc_id);
        }
        Ok(Self { ids })
    }

    pub fn resolve(&self, handle: Handle) -> Option<&str> {
        self.ids.get(&handle).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Deserialize)]
struct PersistedArtifact {
    docstore: HashMap<DocumentId, DocumentRecord>,
    index_to_docstore_id: HashMap<String, DocumentId>,
}

/// The loaded docstore artifact plus a content digest for log correlation.
#[derive(Debug, Clone)]
pub struct KnowledgeArtifact {
    pub store: DocumentStore,
    pub handles: HandleMap,
    /// blake3 hex digest of the artifact bytes.
    pub digest: String,
}

impl KnowledgeArtifact {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::NotFound(format!("docstore artifact {}", path.display())));
        }
        let bytes = fs::read(path)
            .map_err(|e| Error::Corrupt(format!("failed to read {}: {e}", path.display())))?;
        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let persisted: PersistedArtifact = serde_json::from_slice(bytes)
            .map_err(|e| Error::Corrupt(format!("unexpected docstore artifact structure: {e}")))?;
        let handles = HandleMap::from_persisted(persisted.index_to_docstore_id)?;
        Ok(Self {
            store: DocumentStore::new(persisted.docstore),
            handles,
            digest: blake3::hash(bytes).to_hex().to_string(),
        })
    }
}
