//! Tomato Leaf Server
//!
//! HTTP front-end for the tomato leaf disease classifier. Serves an upload
//! form, a result page and a JSON prediction API.

mod app;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use tomato_leaf::backend::backend_name;
use tomato_leaf::utils::logging::{init_logging, LogConfig};
use tomato_leaf::{AppConfig, Pipeline, UploadStore};

use crate::state::AppState;

/// Tomato Leaf Server
#[derive(Parser, Debug)]
#[command(name = "tomato-leaf-server")]
#[command(author = "Warre Snaet")]
#[command(version)]
#[command(about = "HTTP server for tomato leaf disease classification")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "TOMATO_LEAF_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "TOMATO_LEAF_PORT")]
    port: Option<u16>,

    /// Host to bind to (overrides the config file)
    #[arg(long, env = "TOMATO_LEAF_HOST")]
    host: Option<String>,

    /// Trained model record
    #[arg(long, env = "TOMATO_LEAF_MODEL")]
    model: Option<PathBuf>,

    /// Label map JSON
    #[arg(long, env = "TOMATO_LEAF_LABELS")]
    labels: Option<PathBuf>,

    /// Directory uploaded images are stored in
    #[arg(long, env = "TOMATO_LEAF_UPLOAD_DIR")]
    upload_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::production()
    };
    init_logging(&log_config).map_err(anyhow::Error::msg)?;

    // Build configuration
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;

    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(model) = cli.model {
        config.model.path = model;
    }
    if let Some(labels) = cli.labels {
        config.labels.path = labels;
    }
    if let Some(upload_dir) = cli.upload_dir {
        config.uploads.dir = upload_dir;
    }

    info!("Tomato Leaf Server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Backend:     {}", backend_name());
    info!("  Model:       {:?}", config.model.path);
    info!("  Label map:   {:?}", config.labels.path);
    info!("  Upload dir:  {:?}", config.uploads.dir);

    // The server refuses to start without a usable model and label map
    let pipeline = Pipeline::from_config(&config)?;

    let uploads = UploadStore::open(&config.uploads)?;
    if config.uploads.purge_on_startup {
        let removed = uploads.purge()?;
        info!("Purged {} stored uploads", removed);
    } else {
        warn!(
            "Uploads in {:?} are kept until purged (tomato_leaf purge-uploads)",
            uploads.dir()
        );
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let state = Arc::new(AppState::new(config, pipeline, uploads)?);
    let app = app::router(state);

    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
