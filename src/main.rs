//! Tomato Leaf CLI
//!
//! Terminal front-end for the tomato leaf disease classifier. Shares the
//! pipeline with the HTTP server.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use tomato_leaf::backend::backend_name;
use tomato_leaf::catalog::load_tables;
use tomato_leaf::upload::validate_extension;
use tomato_leaf::utils::format_duration;
use tomato_leaf::utils::logging::{init_logging, LogConfig};
use tomato_leaf::{AppConfig, Pipeline, UploadStore};

/// Tomato leaf disease classification
///
/// Classifies tomato leaf photos with a trained Burn CNN and explains the
/// predicted disease.
#[derive(Parser, Debug)]
#[command(name = "tomato_leaf")]
#[command(version)]
#[command(about = "Tomato leaf disease classification with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// TOML configuration file
    #[arg(short, long, env = "TOMATO_LEAF_CONFIG")]
    config: Option<PathBuf>,

    /// Trained model record (overrides the config file)
    #[arg(long, env = "TOMATO_LEAF_MODEL")]
    model: Option<PathBuf>,

    /// Label map JSON (overrides the config file)
    #[arg(long, env = "TOMATO_LEAF_LABELS")]
    labels: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify a single leaf image
    Predict {
        /// Path to a JPG or PNG image
        #[arg(short, long)]
        input: PathBuf,

        /// Print the result as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// List the known labels and their descriptions
    Labels,

    /// Delete every image stored in the upload directory
    PurgeUploads,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    init_logging(&log_config).map_err(anyhow::Error::msg)?;

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    if let Some(model) = cli.model {
        config.model.path = model;
    }
    if let Some(labels) = cli.labels {
        config.labels.path = labels;
    }

    match cli.command {
        Commands::Predict { input, json } => predict(&config, &input, json),
        Commands::Labels => labels(&config),
        Commands::PurgeUploads => purge_uploads(&config),
    }
}

fn predict(config: &AppConfig, input: &Path, json: bool) -> Result<()> {
    let file_name = input
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("invalid input path {:?}", input))?;
    validate_extension(file_name)?;

    info!("Backend: {}", backend_name());
    let pipeline = Pipeline::from_config(config)?;
    let (result, elapsed) = pipeline
        .classify_path(input)
        .with_context(|| format!("failed to classify {:?}", input))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{}", "Tomato Leaf Classification".green().bold());
    println!("Image: {}", input.display());
    println!("Time:  {}", format_duration(elapsed.as_secs_f64()));
    println!();
    println!("{}", result.display());

    Ok(())
}

fn labels(config: &AppConfig) -> Result<()> {
    let (catalog, knowledge) = load_tables(&config.labels)?;

    println!("{}", format!("{} labels", catalog.len()).green().bold());
    for (index, label) in catalog.iter().enumerate() {
        println!("{:>3}  {}", index, label.bold());
        println!("     {}", knowledge.describe(label));
    }

    Ok(())
}

fn purge_uploads(config: &AppConfig) -> Result<()> {
    let store = UploadStore::open(&config.uploads)?;
    let removed = store.purge()?;
    println!("Removed {} uploads from {}", removed, store.dir().display());
    Ok(())
}
