use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use kbase_core::config::SearchSettings;
use kbase_core::docstore::KnowledgeArtifact;
use kbase_core::traits::{Embedder, VectorIndex};
use kbase_core::types::Neighbor;
use kbase_embed::HashEmbedder;
use kbase_retrieval::{AppState, Retriever};
use kbase_server::{serve, QueryResponse};
use kbase_vector::FlatIndex;

const DIM: usize = 64;

const DOCS: &[(&str, &str)] = &[
    ("Goblin (Common). Small humanoid with Nimble Escape.", "monsters"),
    ("Owlbear. Large monstrosity with beak and claws.", "monsters"),
    ("Fireball. A bright streak that blossoms into 8d6 fire damage.", "spells"),
    ("Wizard. Arcane Recovery and a spellbook.", "classes"),
    ("Rogue. Sneak Attack and Cunning Action.", "classes"),
    ("Sage background. Researcher skill feature.", "backgrounds"),
];

fn artifact() -> KnowledgeArtifact {
    let mut docstore = serde_json::Map::new();
    let mut ids = serde_json::Map::new();
    for (pos, (content, source)) in DOCS.iter().enumerate() {
        let id = format!("doc-{pos}");
        docstore.insert(id.clone(), json!({ "page_content": content, "metadata": { "source": source } }));
        ids.insert(pos.to_string(), json!(id));
    }
    let raw = json!({ "docstore": docstore, "index_to_docstore_id": ids });
    KnowledgeArtifact::from_slice(&serde_json::to_vec(&raw).unwrap()).unwrap()
}

fn ready_state() -> AppState {
    let embedder = HashEmbedder::new(DIM);
    let texts: Vec<String> = DOCS.iter().map(|(c, _)| c.to_string()).collect();
    let index = FlatIndex::from_vectors(DIM, &embedder.embed_batch(&texts).unwrap()).unwrap();
    let retriever = Retriever::new(Arc::new(embedder), Arc::new(index), artifact());
    AppState::ready(Arc::new(retriever), SearchSettings::default())
}

struct BrokenIndex;

#[async_trait]
impl VectorIndex for BrokenIndex {
    fn len(&self) -> usize {
        DOCS.len()
    }

    fn dim(&self) -> usize {
        DIM
    }

    async fn search(&self, _query: &[f32], _k: usize) -> anyhow::Result<Vec<Neighbor>> {
        anyhow::bail!("/srv/kb/lancedb: segment file truncated")
    }
}

struct TestServer {
    base: String,
    client: reqwest::Client,
    stop: Option<oneshot::Sender<()>>,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    async fn start(state: AppState) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(serve(listener, state, async {
            let _ = rx.await;
        }));
        Self { base, client: reqwest::Client::new(), stop: Some(tx), handle }
    }

    async fn post_query(&self, body: Value) -> (StatusCode, Value) {
        let resp = self.client.post(format!("{}/query", self.base)).json(&body).send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }

    async fn health(&self) -> (StatusCode, Value) {
        let resp = self.client.get(format!("{}/health", self.base)).send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }
}

#[tokio::test]
async fn health_reports_index_size_when_ready() {
    let server = TestServer::start(ready_state()).await;
    let (status, body) = server.health().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "index_size": DOCS.len() }));
}

#[tokio::test]
async fn health_is_200_with_error_status_when_unloaded() {
    let server = TestServer::start(AppState::unloaded(SearchSettings::default())).await;
    let (status, body) = server.health().await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "error", "index_size": 0, "detail": "Resources not loaded" }));
}

#[tokio::test]
async fn query_returns_ranked_results() {
    let server = TestServer::start(ready_state()).await;
    let (status, body) = server.post_query(json!({ "query": "Describe a Common, Goblin", "top_k": 3 })).await;
    assert_eq!(status, StatusCode::OK);

    let response: QueryResponse = serde_json::from_value(body.clone()).unwrap();
    assert_eq!(response.results.len(), 3);
    assert!(response.results.iter().any(|r| r.content.to_lowercase().contains("goblin")));
    assert!(response.results.windows(2).all(|w| w[0].score <= w[1].score));

    let first = &body["results"][0];
    assert!(first["page_content"].is_string());
    assert!(first["metadata"]["source"].is_string());
    assert!(first["score"].is_number());
}

#[tokio::test]
async fn top_k_defaults_to_five() {
    let server = TestServer::start(ready_state()).await;
    let (status, body) = server.post_query(json!({ "query": "gibberish-token-xyz-not-in-corpus" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn out_of_range_top_k_is_422() {
    let server = TestServer::start(ready_state()).await;
    for top_k in [0, -1, 21, 50] {
        let (status, body) = server.post_query(json!({ "query": "wizard", "top_k": top_k })).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "top_k={top_k}");
        assert_eq!(body["detail"][0]["loc"], json!(["body", "top_k"]));
    }
    let (status, _) = server.post_query(json!({ "query": "wizard", "top_k": 20 })).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_query_is_422() {
    let server = TestServer::start(ready_state()).await;
    let (status, body) = server.post_query(json!({ "top_k": 3 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"][0]["loc"], json!(["body", "query"]));
}

#[tokio::test]
async fn malformed_json_is_422() {
    let server = TestServer::start(ready_state()).await;
    let resp = server
        .client
        .post(format!("{}/query", server.base))
        .header("content-type", "application/json")
        .body("{\"query\": ")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn validation_runs_before_readiness_check() {
    let server = TestServer::start(AppState::unloaded(SearchSettings::default())).await;
    let (status, _) = server.post_query(json!({ "query": "wizard", "top_k": 21 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = server.post_query(json!({ "query": "wizard" })).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({ "detail": "Knowledge base not loaded." }));
}

#[tokio::test]
async fn index_failure_is_500_without_internals() {
    let retriever = Retriever::new(Arc::new(HashEmbedder::new(DIM)), Arc::new(BrokenIndex), artifact());
    let state = AppState::ready(Arc::new(retriever), SearchSettings::default());
    let server = TestServer::start(state).await;

    let (status, body) = server.post_query(json!({ "query": "fireball" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "detail": "Internal server error while processing the query." }));
    assert!(!body.to_string().contains("lancedb"));
}

#[tokio::test]
async fn concurrent_queries_agree() {
    let server = Arc::new(TestServer::start(ready_state()).await);
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let server = Arc::clone(&server);
        tasks.push(tokio::spawn(async move { server.post_query(json!({ "query": "Sneak Attack", "top_k": 4 })).await }));
    }
    let mut bodies = Vec::new();
    for task in tasks {
        let (status, body) = task.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        bodies.push(body);
    }
    assert!(bodies.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn graceful_shutdown_completes() {
    let mut server = TestServer::start(ready_state()).await;
    let (status, _) = server.health().await;
    assert_eq!(status, StatusCode::OK);

    drop(server.client);
    server.stop.take().unwrap().send(()).unwrap();
    let handle = server.handle;
    tokio::time::timeout(std::time::Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();
}
