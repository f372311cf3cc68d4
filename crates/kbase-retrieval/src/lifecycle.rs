//! Startup loading of the three immutable resources.
//!
//! Order is fixed: encoder, vector index, docstore + id map. Any failure is
//! returned to the caller, which must not start serving. A count mismatch
//! between index and docstore is only a warning.

use anyhow::{bail, Context, Result};
use std::sync::Arc;

use kbase_core::config::Settings;
use kbase_core::docstore::KnowledgeArtifact;
use kbase_core::traits::{Embedder, VectorIndex};
use kbase_embed::get_default_embedder;
use kbase_vector::open_index;

use crate::retriever::Retriever;

/// Sizes of the loaded artifacts. All three should be equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegrityReport {
    pub vector_count: usize,
    pub document_count: usize,
    pub handle_count: usize,
}

impl IntegrityReport {
    pub fn is_consistent(&self) -> bool {
        self.vector_count == self.document_count && self.vector_count == self.handle_count
    }

    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.vector_count != self.document_count {
            out.push(format!(
                "vector index size ({}) does not match docstore size ({})",
                self.vector_count, self.document_count
            ));
        }
        if self.vector_count != self.handle_count {
            out.push(format!(
                "vector index size ({}) does not match id map size ({})",
                self.vector_count, self.handle_count
            ));
        }
        out
    }
}

pub async fn load_resources(settings: &Settings) -> Result<Retriever> {
    let embedding = settings.embedding.clone();
    tracing::info!(model = %embedding.model, backend = ?embedding.backend, "loading embedding model");
    let embedder: Arc<dyn Embedder> = tokio::task::spawn_blocking(move || get_default_embedder(&embedding))
        .await
        .context("embedding model loader panicked")?
        .context("failed to load embedding model")?
        .into();
    tracing::info!(model = embedder.model_id(), dim = embedder.dim(), "embedding model loaded");

    let index_uri = settings.index.resolved_uri();
    tracing::info!(uri = %index_uri.display(), table = %settings.index.table, mode = ?settings.index.mode, "loading vector index");
    let index: Arc<dyn VectorIndex> = open_index(&settings.index)
        .await
        .with_context(|| format!("failed to load vector index from {}", index_uri.display()))?
        .into();
    tracing::info!(vectors = index.len(), dim = index.dim(), "vector index loaded");

    let docstore_path = settings.docstore.resolved_path();
    tracing::info!(path = %docstore_path.display(), "loading docstore and id map");
    let artifact = KnowledgeArtifact::load(&docstore_path)
        .with_context(|| format!("failed to load docstore from {}", docstore_path.display()))?;
    tracing::info!(documents = artifact.store.len(), digest = %artifact.digest, "docstore and id map loaded");

    assemble(embedder, index, artifact)
}

/// Cross-check the loaded resources and build the retriever.
pub fn assemble(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, artifact: KnowledgeArtifact) -> Result<Retriever> {
    if embedder.dim() != index.dim() {
        bail!(
            "encoder '{}' produces {} dims but the vector index holds {} dims",
            embedder.model_id(),
            embedder.dim(),
            index.dim()
        );
    }
    let report = IntegrityReport {
        vector_count: index.len(),
        document_count: artifact.store.len(),
        handle_count: artifact.handles.len(),
    };
    tracing::info!(
        documents = report.document_count,
        handles = report.handle_count,
        vectors = report.vector_count,
        "docstore contains {} documents",
        report.document_count
    );
    for warning in report.warnings() {
        tracing::warn!("{warning}");
    }
    Ok(Retriever::new(embedder, index, artifact))
}
