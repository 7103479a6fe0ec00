//! # Provider Registry
//!
//! Collaborators obtain their [`DataProvider`] here. A [`ProviderRegistry`]
//! holds at most one active provider, tagged with the [`BackendKind`] it was
//! built for:
//!
//! | Call | Registry state | Effect |
//! |------|----------------|--------|
//! | `initialize_provider(cfg)` | empty | build + `initialize()` |
//! | `initialize_provider(cfg)` | same kind active | reuse the active provider |
//! | `initialize_provider(cfg)` | other kind active | drop it, then build + `initialize()` |
//! | `current_provider()` | empty | `NotInitialized` |
//!
//! Switching kinds never migrates data; use `export_document` and
//! `import_document` for that. When building or initializing fails the new
//! provider is discarded and the registry stays empty.
//!
//! The registry is a plain value. [`initialize_provider`], [`current_provider`]
//! and [`current_backend_kind`] wrap one process-wide instance for callers that
//! want a singleton.

use crate::error::{BoardzError, Result};
use crate::provider::DataProvider;
use crate::store::board_store::BoardStore;
use crate::store::cached::CachedProvider;
use crate::store::document_backend::DocumentBackend;
use crate::store::indexed_backend::{IndexedBackend, DATABASE_FILE};
use crate::store::remote_backend::RemoteBackend;
use crate::store::slot::FileSlot;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Flat JSON document in a local file.
    Local,
    /// SQLite database in a local file.
    Indexed,
    /// Board server over HTTP.
    Server,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Indexed => "indexed",
            BackendKind::Server => "server",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = BoardzError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "indexed" => Ok(BackendKind::Indexed),
            "server" => Ok(BackendKind::Server),
            other => Err(BoardzError::validation(format!(
                "unknown backend '{}' (expected local, indexed or server)",
                other
            ))),
        }
    }
}

/// What to build. `data_dir` falls back to the OS data directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(rename = "type")]
    pub kind: BackendKind,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub cache: bool,
}

impl ProviderConfig {
    pub fn local(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            kind: BackendKind::Local,
            api_url: None,
            api_token: None,
            data_dir: Some(data_dir.into()),
            cache: false,
        }
    }

    pub fn indexed(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            kind: BackendKind::Indexed,
            ..Self::local(data_dir)
        }
    }

    pub fn server(api_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            kind: BackendKind::Server,
            api_url: Some(api_url.into()),
            api_token: Some(api_token.into()),
            data_dir: None,
            cache: false,
        }
    }

    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.kind == BackendKind::Server {
            let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
            if !present(&self.api_url) {
                return Err(BoardzError::validation("server backend requires apiUrl"));
            }
            if !present(&self.api_token) {
                return Err(BoardzError::validation("server backend requires apiToken"));
            }
        }
        Ok(())
    }

    fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => crate::config::default_data_dir(),
        }
    }
}

fn finish<P: DataProvider + 'static>(provider: P, cache: bool) -> Arc<dyn DataProvider> {
    if cache {
        Arc::new(CachedProvider::new(provider))
    } else {
        Arc::new(provider)
    }
}

/// Builds an uninitialized provider for `config`.
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn DataProvider>> {
    config.validate()?;
    let provider = match config.kind {
        BackendKind::Local => {
            let slot = FileSlot::new(config.data_dir()?);
            finish(BoardStore::with_backend(DocumentBackend::new(slot)), config.cache)
        }
        BackendKind::Indexed => {
            let backend = IndexedBackend::open(config.data_dir()?.join(DATABASE_FILE));
            finish(BoardStore::with_backend(backend), config.cache)
        }
        BackendKind::Server => {
            let backend = RemoteBackend::new(
                config.api_url.clone().unwrap_or_default(),
                config.api_token.clone().unwrap_or_default(),
            );
            finish(BoardStore::with_backend(backend), config.cache)
        }
    };
    Ok(provider)
}

struct ActiveProvider {
    kind: BackendKind,
    provider: Arc<dyn DataProvider>,
}

#[derive(Default)]
pub struct ProviderRegistry {
    active: RwLock<Option<ActiveProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn initialize_provider(
        &self,
        config: &ProviderConfig,
    ) -> Result<Arc<dyn DataProvider>> {
        config.validate()?;
        let mut active = self.active.write().await;

        if let Some(current) = active.as_ref() {
            if current.kind == config.kind {
                return Ok(current.provider.clone());
            }
        }
        if let Some(previous) = active.take() {
            info!(from = %previous.kind, to = %config.kind, "switching data provider");
        }

        let provider = build_provider(config)?;
        if let Err(e) = provider.initialize().await {
            warn!(kind = %config.kind, error = %e, "discarding provider that failed to initialize");
            return Err(e);
        }

        info!(kind = %config.kind, "data provider ready");
        *active = Some(ActiveProvider {
            kind: config.kind,
            provider: provider.clone(),
        });
        Ok(provider)
    }

    pub async fn current_provider(&self) -> Result<Arc<dyn DataProvider>> {
        self.active
            .read()
            .await
            .as_ref()
            .map(|a| a.provider.clone())
            .ok_or(BoardzError::NotInitialized)
    }

    pub async fn current_backend_kind(&self) -> Option<BackendKind> {
        self.active.read().await.as_ref().map(|a| a.kind)
    }

    /// Drops the active provider, if any.
    pub async fn clear(&self) {
        self.active.write().await.take();
    }
}

static GLOBAL: Lazy<ProviderRegistry> = Lazy::new(ProviderRegistry::new);

/// The process-wide registry behind the free functions.
pub fn global_registry() -> &'static ProviderRegistry {
    &GLOBAL
}

pub async fn initialize_provider(config: &ProviderConfig) -> Result<Arc<dyn DataProvider>> {
    GLOBAL.initialize_provider(config).await
}

pub async fn current_provider() -> Result<Arc<dyn DataProvider>> {
    GLOBAL.current_provider().await
}

pub async fn current_backend_kind() -> Option<BackendKind> {
    GLOBAL.current_backend_kind().await
}
