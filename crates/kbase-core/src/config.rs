//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge compiled-in defaults + `config.toml` +
//! `config.<env>.toml` + `APP_*` env vars (`__` separates nested keys, e.g.
//! `APP_SERVER__PORT=9000`). Provides a helper to expand `~` and `${VAR}` in
//! configured paths.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(&env_name)
    }

    pub fn load_for_env(env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract and validate the full typed settings tree.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub embedding: EmbeddingSettings,
    #[serde(default)]
    pub index: IndexSettings,
    #[serde(default)]
    pub docstore: DocstoreSettings,
    #[serde(default)]
    pub search: SearchSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.search.validate()?;
        if self.embedding.max_len == 0 {
            return Err(Error::InvalidConfig("embedding.max_len must be positive".into()));
        }
        if self.embedding.dim == 0 {
            return Err(Error::InvalidConfig("embedding.dim must be positive".into()));
        }
        if self.index.table.trim().is_empty() {
            return Err(Error::InvalidConfig("index.table must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8080 }
    }
}

impl ServerSettings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Pretrained BERT sentence encoder run through candle.
    Bert,
    /// Deterministic token-hashing encoder; no model files needed.
    Hash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Cpu,
    Cuda,
    Metal,
}

/// Must mirror the configuration the persisted index was built with:
/// same model, same normalization, f32 precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model: String,
    pub backend: EmbeddingBackend,
    pub device: DeviceKind,
    pub model_dir: Option<String>,
    pub normalize: bool,
    pub max_len: usize,
    pub dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            backend: EmbeddingBackend::Bert,
            device: DeviceKind::Cpu,
            model_dir: None,
            normalize: true,
            max_len: 256,
            dim: 384,
        }
    }
}

impl EmbeddingSettings {
    pub fn resolved_model_dir(&self) -> Option<PathBuf> {
        self.model_dir.as_deref().map(expand_path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMode {
    /// Search the LanceDB dataset directly.
    Lance,
    /// Copy all vectors into an in-process exact flat index at startup.
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    pub uri: String,
    pub table: String,
    pub mode: IndexMode,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            uri: "kb_index/lancedb".to_string(),
            table: "vectors".to_string(),
            mode: IndexMode::Lance,
        }
    }
}

impl IndexSettings {
    pub fn resolved_uri(&self) -> PathBuf {
        expand_path(&self.uri)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocstoreSettings {
    pub path: String,
}

impl Default for DocstoreSettings {
    fn default() -> Self {
        Self { path: "kb_index/docstore.json".to_string() }
    }
}

impl DocstoreSettings {
    pub fn resolved_path(&self) -> PathBuf {
        expand_path(&self.path)
    }
}

/// Query-size policy. `max_top_k` is a service limit, not an index limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_top_k: usize,
    pub max_top_k: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { default_top_k: 5, max_top_k: 20 }
    }
}

impl SearchSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_top_k == 0 {
            return Err(Error::InvalidConfig("search.max_top_k must be at least 1".into()));
        }
        if self.default_top_k == 0 || self.default_top_k > self.max_top_k {
            return Err(Error::InvalidConfig(format!(
                "search.default_top_k must be within 1..={} (got {})",
                self.max_top_k, self.default_top_k
            )));
        }
        Ok(())
    }

    /// Apply the default when absent and enforce `1..=max_top_k`.
    pub fn resolve_top_k(&self, requested: Option<i64>) -> Result<usize> {
        let Some(top_k) = requested else {
            return Ok(self.default_top_k);
        };
        match usize::try_from(top_k) {
            Ok(k) if (1..=self.max_top_k).contains(&k) => Ok(k),
            _ => Err(Error::Validation {
                field: "top_k".to_string(),
                message: format!(
                    "Input should be between 1 and {} (got {})",
                    self.max_top_k, top_k
                ),
            }),
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_top_k_applies_default_and_bounds() {
        let search = SearchSettings::default();
        assert_eq!(search.resolve_top_k(None).unwrap(), 5);
        assert_eq!(search.resolve_top_k(Some(1)).unwrap(), 1);
        assert_eq!(search.resolve_top_k(Some(20)).unwrap(), 20);
        for bad in [0, -3, 21, 50] {
            match search.resolve_top_k(Some(bad)) {
                Err(Error::Validation { field, .. }) => assert_eq!(field, "top_k"),
                other => panic!("expected validation error for {bad}, got {other:?}"),
            }
        }
    }

    #[test]
    fn default_top_k_outside_limit_is_invalid() {
        let search = SearchSettings { default_top_k: 30, max_top_k: 20 };
        assert!(matches!(search.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn expand_path_resolves_env_vars() {
        std::env::set_var("KBASE_TEST_EXPAND_ROOT", "/srv/kb");
        assert_eq!(expand_path("${KBASE_TEST_EXPAND_ROOT}/index"), PathBuf::from("/srv/kb/index"));
    }
}
