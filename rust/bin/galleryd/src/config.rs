//! Server configuration, loaded from `/etc/gallery/<name>.toml` or an explicit path.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use gallery_core::{DEFAULT_SEARCH_WINDOW, ServiceConfig, VIEWER_HEADER};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Overrides `{data_dir}/gallery.sqlite`.
    #[serde(default)]
    pub sqlite_path: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            sqlite_path: None,
        }
    }
}

fn default_data_dir() -> String {
    "/var/lib/gallery".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Row window of each search sub-query.
    #[serde(default = "default_window")]
    pub window: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
        }
    }
}

fn default_window() -> usize {
    DEFAULT_SEARCH_WINDOW
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Header carrying the viewer id, set by the upstream auth proxy.
    #[serde(default = "default_viewer_header")]
    pub viewer_header: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            viewer_header: default_viewer_header(),
        }
    }
}

fn default_viewer_header() -> String {
    VIEWER_HEADER.to_string()
}

impl ServerConfig {
    /// A bare context name maps to `/etc/gallery/<name>.toml`; anything
    /// containing `/` or `.` is taken as a path.
    pub fn resolve_path(name_or_path: &str) -> PathBuf {
        if name_or_path.contains('/') || name_or_path.contains('.') {
            PathBuf::from(name_or_path)
        } else {
            PathBuf::from(format!("/etc/gallery/{name_or_path}.toml"))
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read {}: {}", path.display(), e))?;
        let config: ServerConfig = toml::from_str(&content)?;
        if config.search.window == 0 {
            anyhow::bail!("search.window must be positive");
        }
        if config.auth.viewer_header.trim().is_empty() {
            anyhow::bail!("auth.viewer_header must not be empty");
        }
        Ok(config)
    }

    /// Settings for storage and module initialization, listening on `listen`.
    pub fn service_config(&self, listen: &str) -> ServiceConfig {
        ServiceConfig {
            data_dir: Some(PathBuf::from(&self.storage.data_dir)),
            sqlite_path: self.storage.sqlite_path.as_ref().map(PathBuf::from),
            search_window: self.search.window,
            listen: listen.to_string(),
        }
    }
}
