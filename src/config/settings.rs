//! Application settings.
//!
//! Settings are read from `~/.config/mailsift/settings.json` (or the
//! platform equivalent) when present; every field has a default so the
//! tool runs without any configuration. Command-line flags override
//! settings, and `MAILSIFT_EMBEDDING_BACKEND` participates in backend
//! resolution separately.

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Default database file name, used when nothing else is configured.
const DEFAULT_DB_FILE: &str = "mailsift.db";

/// Top-level application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Index database location.
    pub database: DatabaseSettings,
    /// Embedding configuration for indexing and semantic search.
    pub embedding: EmbeddingSettings,
}

/// Index database location settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Explicit database path. The per-user data directory is used when
    /// unset.
    pub path: Option<PathBuf>,
}

/// Embedding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Master switch for computing embeddings at indexing time.
    pub enabled: bool,
    /// Backend spec, e.g. `hash:256` or a sentence-transformers model
    /// name. Resolution falls back through the environment and the
    /// default model when unset.
    pub backend: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: None,
        }
    }
}

impl Settings {
    /// Loads settings from the user's config directory, falling back to
    /// defaults when the file is missing or unreadable.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        let Ok(contents) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        match serde_json::from_str(&contents) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring malformed settings file");
                Self::default()
            }
        }
    }

    /// Returns the settings file location for this platform.
    pub fn config_path() -> Option<PathBuf> {
        let dirs = ProjectDirs::from("com", "panbanda", "mailsift")?;
        Some(dirs.config_dir().join("settings.json"))
    }

    /// Resolves the database path: explicit setting first, then the
    /// per-user data directory, then the working directory.
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.database.path {
            return path.clone();
        }
        match ProjectDirs::from("com", "panbanda", "mailsift") {
            Some(dirs) => dirs.data_dir().join(DEFAULT_DB_FILE),
            None => PathBuf::from(DEFAULT_DB_FILE),
        }
    }
}
