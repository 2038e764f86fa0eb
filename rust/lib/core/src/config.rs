use std::path::PathBuf;

/// Default per-sub-query result window for artwork search.
pub const DEFAULT_SEARCH_WINDOW: usize = 200;

/// Runtime settings handed to storage and module initialization.
///
/// Binaries build this from their own config file and flags.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory holding the service's persistent data.
    pub data_dir: Option<PathBuf>,

    /// Path to the SQLite database file.
    /// Defaults to `{data_dir}/gallery.sqlite` if not specified.
    pub sqlite_path: Option<PathBuf>,

    /// Row window applied to each search sub-query.
    pub search_window: usize,

    /// Listen address for the HTTP server.
    pub listen: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            sqlite_path: None,
            search_window: DEFAULT_SEARCH_WINDOW,
            listen: "0.0.0.0:8080".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Resolve the SQLite database path, falling back to `{data_dir}/gallery.sqlite`.
    pub fn resolve_sqlite_path(&self) -> PathBuf {
        self.sqlite_path
            .clone()
            .unwrap_or_else(|| self.resolve_data_subpath("gallery.sqlite"))
    }

    fn resolve_data_subpath(&self, name: &str) -> PathBuf {
        self.data_dir
            .as_ref()
            .map(|d| d.join(name))
            .unwrap_or_else(|| PathBuf::from(name))
    }
}
