//! Layered configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nesting levels, e.g. `APP_RETRIEVAL__TOP_K_FINAL=8`).
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    /// Load `config.toml` from the working directory plus the `RUST_ENV` overlay.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("config.toml"))
    }

    /// Load an explicit base file; the env overlay is looked up next to it.
    pub fn load_from(path: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        let dir = path.parent().unwrap_or(Path::new("."));

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file(path));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Ok(Self { figment })
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{}': {}", key, e)))
    }

    /// Extract and validate the full typed settings.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub embedding: EmbeddingSettings,
    pub index: IndexSettings,
    pub data: DataSettings,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chunking: ChunkingSettings::default(),
            retrieval: RetrievalSettings::default(),
            embedding: EmbeddingSettings::default(),
            index: IndexSettings::default(),
            data: DataSettings::default(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Character budget per chunk.
    pub chunk_size: usize,
    /// Characters shared by adjacent chunks of one section.
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { chunk_size: 1000, chunk_overlap: 150 }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k_dense: usize,
    pub top_k_sparse: usize,
    pub top_k_final: usize,
    pub dense_weight: f32,
    pub sparse_weight: f32,
    pub rrf_k: f32,
    pub similarity_threshold: f32,
    /// Drop dense hits below `similarity_threshold` before fusion.
    pub enforce_similarity_threshold: bool,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k_dense: 10,
            top_k_sparse: 10,
            top_k_final: 5,
            dense_weight: 0.6,
            sparse_weight: 0.4,
            rrf_k: 60.0,
            similarity_threshold: 0.3,
            enforce_similarity_threshold: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingProvider {
    /// Deterministic hashed bag-of-words vectors; offline, no model files.
    Hash,
    /// Local BGE-M3 weights (requires the `candle` feature of docsearch-embed).
    BgeM3,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    pub dimension: usize,
    pub batch_size: usize,
    pub model_dir: Option<PathBuf>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { provider: EmbeddingProvider::Hash, dimension: 384, batch_size: 100, model_dir: None }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum VectorBackend {
    /// LanceDB tables under `index.dense_path`.
    #[default]
    Lance,
    /// Brute-force store persisted as `<dense_path>/<collection>.json`.
    Flat,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct IndexSettings {
    pub backend: VectorBackend,
    pub dense_path: PathBuf,
    pub collection: String,
    pub sparse_path: PathBuf,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            backend: VectorBackend::Lance,
            dense_path: PathBuf::from("./index/dense"),
            collection: "documents".to_string(),
            sparse_path: PathBuf::from("./index/bm25_index.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DataSettings {
    pub raw_dir: PathBuf,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { raw_dir: PathBuf::from("./data/raw") }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let c = &self.chunking;
        if c.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be positive".into()));
        }
        if c.chunk_overlap > c.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.chunk_overlap ({}) is larger than chunking.chunk_size ({})",
                c.chunk_overlap, c.chunk_size
            )));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding.batch_size must be positive".into()));
        }
        if self.embedding.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be positive".into()));
        }
        let r = &self.retrieval;
        if r.dense_weight < 0.0 || r.sparse_weight < 0.0 {
            return Err(Error::InvalidConfig("retrieval weights must not be negative".into()));
        }
        if r.dense_weight == 0.0 && r.sparse_weight == 0.0 {
            return Err(Error::InvalidConfig("at least one retrieval weight must be positive".into()));
        }
        if r.rrf_k < 0.0 {
            return Err(Error::InvalidConfig("retrieval.rrf_k must not be negative".into()));
        }
        Ok(())
    }

    /// Expand and anchor every configured path at `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        self.index.dense_path = resolve_with_base(base, self.index.dense_path.to_string_lossy());
        self.index.sparse_path = resolve_with_base(base, self.index.sparse_path.to_string_lossy());
        self.data.raw_dir = resolve_with_base(base, self.data.raw_dir.to_string_lossy());
        if let Some(dir) = self.embedding.model_dir.take() {
            self.embedding.model_dir = Some(resolve_with_base(base, dir.to_string_lossy()));
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_figment_yields_defaults() {
        let config = Config::from_figment(Figment::new());
        let settings = config.settings().expect("defaults are valid");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.chunking.chunk_size, 1000);
        assert_eq!(settings.chunking.chunk_overlap, 150);
        assert_eq!(settings.retrieval.top_k_final, 5);
    }

    #[test]
    fn toml_overrides_single_keys() {
        let figment = Figment::new().merge(Toml::string("[retrieval]\ntop_k_final = 8\n[chunking]\nchunk_size = 400"));
        let settings = Config::from_figment(figment).settings().expect("settings");
        assert_eq!(settings.retrieval.top_k_final, 8);
        assert_eq!(settings.retrieval.top_k_dense, 10);
        assert_eq!(settings.chunking.chunk_size, 400);
        assert_eq!(settings.chunking.chunk_overlap, 150);
    }

    #[test]
    fn vector_backend_defaults_to_lance() {
        assert_eq!(Settings::default().index.backend, VectorBackend::Lance);
        let figment = Figment::new().merge(Toml::string("[index]\nbackend = \"flat\""));
        let settings = Config::from_figment(figment).settings().expect("settings");
        assert_eq!(settings.index.backend, VectorBackend::Flat);
        assert_eq!(settings.index.collection, "documents");
    }

    #[test]
    fn overlap_larger_than_budget_is_rejected() {
        let figment = Figment::new().merge(Toml::string("[chunking]\nchunk_size = 100\nchunk_overlap = 200"));
        let err = Config::from_figment(figment).settings().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn zero_weights_are_rejected() {
        let mut s = Settings::default();
        s.retrieval.dense_weight = 0.0;
        s.retrieval.sparse_weight = 0.0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let mut s = Settings::default();
        s.resolve_paths(Path::new("/srv/app"));
        assert_eq!(s.index.sparse_path, PathBuf::from("/srv/app/./index/bm25_index.json"));
        assert!(s.index.dense_path.is_absolute());
    }
}
