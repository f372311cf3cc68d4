use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use kbase_core::types::ResultItem;
use kbase_retrieval::{AppState, HealthReport};

use crate::error::ApiError;

/// Body of `POST /query`. `top_k` is kept raw until checked against the
/// configured limit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<i64>,
}

impl QueryRequest {
    pub fn from_json(body: &Value) -> Result<Self, ApiError> {
        let fields = body
            .as_object()
            .ok_or_else(|| ApiError::invalid(&[], "Input should be a valid dictionary"))?;
        let query = match fields.get("query") {
            Some(Value::String(s)) => s.clone(),
            None => return Err(ApiError::invalid(&["query"], "Field required")),
            Some(_) => return Err(ApiError::invalid(&["query"], "Input should be a valid string")),
        };
        let top_k = match fields.get("top_k") {
            None | Some(Value::Null) => None,
            Some(v) => Some(
                v.as_i64()
                    .ok_or_else(|| ApiError::invalid(&["top_k"], "Input should be a valid integer"))?,
            ),
        };
        Ok(Self { query, top_k })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub results: Vec<ResultItem>,
}

pub async fn query(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(body) = payload.map_err(|rejection| ApiError::invalid(&[], rejection.body_text()))?;
    let request = QueryRequest::from_json(&body)?;
    let top_k = state.search_settings().resolve_top_k(request.top_k)?;
    let retriever = state.retriever()?;

    tracing::info!(query = %request.query, top_k, "received query");
    let results = retriever.query(&request.query, top_k).await?;
    tracing::info!(count = results.len(), "returning results");
    Ok(Json(QueryResponse { results }))
}

pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.health())
}
