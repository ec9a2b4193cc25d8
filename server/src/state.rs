//! Application state for the tomato leaf server
//!
//! Everything in here is built once at startup and only read afterwards.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use minijinja::Environment;

use tomato_leaf::{AppConfig, Pipeline, UploadStore};

/// Shared application state
pub struct AppState {
    /// Resolved configuration
    pub config: AppConfig,
    /// Catalog, knowledge base, preprocessor and model
    pub pipeline: Arc<Pipeline>,
    /// Scratch directory for uploaded images
    pub uploads: UploadStore,
    /// HTML templates
    pub templates: Environment<'static>,
    /// Server start time
    pub started_at: Instant,
    pub started_at_utc: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        pipeline: Pipeline,
        uploads: UploadStore,
    ) -> Result<Self, minijinja::Error> {
        Ok(Self {
            config,
            pipeline: Arc::new(pipeline),
            uploads,
            templates: templates()?,
            started_at: Instant::now(),
            started_at_utc: Utc::now(),
        })
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Template environment with the pages compiled into the binary
fn templates() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.add_template("upload.html", include_str!("../templates/upload.html"))?;
    env.add_template("result.html", include_str!("../templates/result.html"))?;
    Ok(env)
}

pub type SharedState = Arc<AppState>;
