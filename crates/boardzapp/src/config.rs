//! # Configuration
//!
//! Boardz configuration is loaded with [`confique`] from layered sources.
//!
//! ## Storage Hierarchy
//!
//! Configuration is resolved in priority order:
//! 1. **Environment variables**: `BOARDZ_BACKEND`, `BOARDZ_API_URL`, etc.
//! 2. **Config file**: `boardz.toml` in the OS config directory (via `directories`).
//! 3. **Compiled Defaults**: Built-in fallbacks via `#[config(default = ...)]`.
//!
//! The CLI applies its own flags on top of the loaded values.
//!
//! ## Available Settings
//!
//! | Key | Env | Default | Description |
//! |-----|-----|---------|-------------|
//! | `backend` | `BOARDZ_BACKEND` | `local` | `local`, `indexed` or `server` |
//! | `api_url` | `BOARDZ_API_URL` | | Board server base URL |
//! | `api_token` | `BOARDZ_API_TOKEN` | | Bearer token for the server |
//! | `data_dir` | `BOARDZ_DATA_DIR` | OS data dir | Where local files live |
//! | `cache` | `BOARDZ_CACHE` | `false` | Read-through cache in front of the backend |

use crate::error::{BoardzError, Result};
use crate::registry::{BackendKind, ProviderConfig};
use confique::Config;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "boardz.toml";

/// Configuration for boardz, stored in `boardz.toml`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct BoardzConfig {
    /// Storage backend: "local", "indexed" or "server".
    #[config(env = "BOARDZ_BACKEND", default = "local")]
    pub backend: String,

    /// Base URL of the board server (server backend only).
    #[config(env = "BOARDZ_API_URL")]
    pub api_url: Option<String>,

    /// Bearer token for the board server (server backend only).
    #[config(env = "BOARDZ_API_TOKEN")]
    pub api_token: Option<String>,

    /// Directory for the local document or database.
    #[config(env = "BOARDZ_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Put a read-through cache in front of the backend.
    #[config(env = "BOARDZ_CACHE", default = false)]
    pub cache: bool,
}

impl Default for BoardzConfig {
    fn default() -> Self {
        Self {
            backend: "local".to_string(),
            api_url: None,
            api_token: None,
            data_dir: None,
            cache: false,
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "boardz", "boardz")
}

/// `boardz.toml` in the OS config directory.
pub fn default_config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

/// The OS data directory for boardz.
pub fn default_data_dir() -> Result<PathBuf> {
    project_dirs()
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| BoardzError::Config("could not determine a data directory".to_string()))
}

impl BoardzConfig {
    /// Loads environment, then `config_file` (skipped when missing), then defaults.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut builder = Self::builder().env();
        if let Some(path) = config_file {
            builder = builder.file(path);
        }
        builder
            .load()
            .map_err(|e| BoardzError::Config(e.to_string()))
    }

    /// Loads from the environment and the default config file.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_file().as_deref())
    }

    pub fn backend_kind(&self) -> Result<BackendKind> {
        self.backend.parse()
    }

    pub fn provider_config(&self) -> Result<ProviderConfig> {
        let config = ProviderConfig {
            kind: self.backend_kind()?,
            api_url: self.api_url.clone(),
            api_token: self.api_token.clone(),
            data_dir: self.data_dir.clone(),
            cache: self.cache,
        };
        config.validate()?;
        Ok(config)
    }
}
