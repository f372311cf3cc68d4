use serde::Serialize;
use std::sync::Arc;

use kbase_core::config::SearchSettings;
use kbase_core::{Error, Result};

use crate::retriever::Retriever;

/// Process-wide application state: the loaded retriever (if any) plus the
/// query-size policy. Cheap to clone into every request handler.
#[derive(Clone)]
pub struct AppState {
    retriever: Option<Arc<Retriever>>,
    search: SearchSettings,
}

impl AppState {
    pub fn ready(retriever: Arc<Retriever>, search: SearchSettings) -> Self {
        Self { retriever: Some(retriever), search }
    }

    pub fn unloaded(search: SearchSettings) -> Self {
        Self { retriever: None, search }
    }

    pub fn is_ready(&self) -> bool {
        self.retriever.is_some()
    }

    pub fn retriever(&self) -> Result<&Arc<Retriever>> {
        self.retriever.as_ref().ok_or(Error::NotReady)
    }

    pub fn search_settings(&self) -> &SearchSettings {
        &self.search
    }

    pub fn health(&self) -> HealthReport {
        match &self.retriever {
            Some(r) => HealthReport { status: HealthStatus::Ok, index_size: r.index_size(), detail: None },
            None => HealthReport {
                status: HealthStatus::Error,
                index_size: 0,
                detail: Some("Resources not loaded".to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub index_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
