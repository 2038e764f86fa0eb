//! `galleryd`: the gallery server binary.
//!
//! Usage:
//!   galleryd [-c <context-name-or-path>] [--listen <addr>]
//!
//! The context name resolves to `/etc/gallery/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.
//! Without `-c`, built-in defaults are used.

mod config;
mod routes;

use std::sync::Arc;

use clap::Parser;
use gallery::GalleryModule;
use gallery_core::Module;
use tracing::info;

use config::ServerConfig;

/// Gallery server.
#[derive(Parser, Debug)]
#[command(name = "galleryd", about = "Gallery favorites and search server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config")]
    config: Option<String>,

    /// Listen address.
    #[arg(long = "listen", default_value = "0.0.0.0:8080")]
    listen: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let server_config = match &cli.config {
        Some(name) => {
            let path = ServerConfig::resolve_path(name);
            info!("Loading configuration from {}", path.display());
            ServerConfig::load(&path)?
        }
        None => {
            info!("No configuration given, using defaults");
            ServerConfig::default()
        }
    };

    std::fs::create_dir_all(&server_config.storage.data_dir)?;
    let core_config = server_config.service_config(&cli.listen);

    let sqlite_path = core_config.resolve_sqlite_path();
    let sql: Arc<dyn gallery_sql::SQLStore> = Arc::new(
        gallery_sql::SqliteStore::open(&sqlite_path)
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );
    info!("SQL store opened at {}", sqlite_path.display());

    let authenticator: Arc<dyn gallery_core::Authenticator> = Arc::new(
        gallery_core::TrustedHeader::new(server_config.auth.viewer_header.clone()),
    );

    let gallery_module = GalleryModule::new(sql, authenticator, core_config.search_window)
        .map_err(|e| anyhow::anyhow!("failed to initialize gallery module: {}", e))?;
    info!(
        window = core_config.search_window,
        "Gallery module initialized"
    );

    let app = routes::build_router(vec![(gallery_module.name(), gallery_module.routes())]);

    let listener = tokio::net::TcpListener::bind(&core_config.listen).await?;
    info!("Gallery server listening on {}", core_config.listen);
    axum::serve(listener, app).await?;

    Ok(())
}
