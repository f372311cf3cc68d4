#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use kbase_core::config::{EmbeddingBackend, IndexMode, Settings};
use kbase_core::docstore::KnowledgeArtifact;
use kbase_core::traits::Embedder;
use kbase_embed::HashEmbedder;
use kbase_retrieval::Retriever;
use kbase_vector::writer::create_index_at;
use kbase_vector::FlatIndex;

pub const DIM: usize = 128;

/// (document id, content, source)
pub const CORPUS: &[(&str, &str, &str)] = &[
    ("monster-goblin", "Goblin (Common). Small humanoid, neutral evil. Nimble Escape lets the goblin disengage or hide as a bonus action.", "monsters"),
    ("monster-owlbear", "Owlbear. Large monstrosity. Multiattack with beak and claws.", "monsters"),
    ("spell-fireball", "Fireball. 3rd-level evocation. Each creature in a 20-foot radius takes 8d6 fire damage.", "spells"),
    ("spell-shield", "Shield. 1st-level abjuration. +5 bonus to AC until the start of your next turn.", "spells"),
    ("class-wizard", "Wizard. Spellcasting ability Intelligence. Arcane Recovery restores spell slots on a short rest.", "classes"),
    ("class-rogue", "Rogue. Sneak Attack deals extra damage once per turn. Cunning Action at 2nd level.", "classes"),
    ("background-acolyte", "Acolyte background. Skill proficiencies Insight and Religion.", "backgrounds"),
    ("feat-alert", "Alert feat. +5 bonus to initiative and you cannot be surprised while conscious.", "feats"),
];

pub fn embedder() -> Arc<dyn Embedder> {
    Arc::new(HashEmbedder::new(DIM))
}

pub fn corpus_vectors(embedder: &dyn Embedder) -> Vec<Vec<f32>> {
    let texts: Vec<String> = CORPUS.iter().map(|(_, content, _)| content.to_string()).collect();
    embedder.embed_batch(&texts).expect("embed corpus")
}

/// Docstore artifact whose handle `i` maps to `CORPUS[i]`, after applying
/// `handle_overrides` (position, document id).
pub fn artifact_json(handle_overrides: &[(usize, &str)]) -> Value {
    let mut docstore = Map::new();
    let mut id_map = Map::new();
    for (pos, (id, content, source)) in CORPUS.iter().enumerate() {
        docstore.insert(id.to_string(), json!({ "page_content": content, "metadata": { "source": source, "position": pos } }));
        id_map.insert(pos.to_string(), json!(id));
    }
    for (pos, id) in handle_overrides {
        id_map.insert(pos.to_string(), json!(id));
    }
    json!({ "docstore": docstore, "index_to_docstore_id": id_map })
}

pub fn artifact(handle_overrides: &[(usize, &str)]) -> KnowledgeArtifact {
    let bytes = serde_json::to_vec(&artifact_json(handle_overrides)).expect("serialize artifact");
    KnowledgeArtifact::from_slice(&bytes).expect("valid artifact")
}

pub fn in_memory_retriever(handle_overrides: &[(usize, &str)]) -> Retriever {
    let embedder = embedder();
    let index = FlatIndex::from_vectors(DIM, &corpus_vectors(embedder.as_ref())).expect("flat index");
    Retriever::new(embedder, Arc::new(index), artifact(handle_overrides))
}

/// Write index + docstore artifacts under `dir` and return settings that
/// point at them, using the hashing encoder.
pub async fn write_fixture(dir: &Path, artifact: &Value) -> Settings {
    let index_dir = dir.join("lancedb");
    let vectors = corpus_vectors(embedder().as_ref());
    create_index_at(&index_dir, "vectors", DIM, &vectors).await.expect("write index");
    let docstore_path = dir.join("docstore.json");
    std::fs::write(&docstore_path, serde_json::to_vec(artifact).expect("serialize")).expect("write docstore");

    let mut settings = Settings::default();
    settings.embedding.backend = EmbeddingBackend::Hash;
    settings.embedding.dim = DIM;
    settings.index.uri = index_dir.to_string_lossy().to_string();
    settings.index.table = "vectors".to_string();
    settings.index.mode = IndexMode::Lance;
    settings.docstore.path = docstore_path.to_string_lossy().to_string();
    settings
}
