//! Dataset builder driver
//!
//! Resolves a registered dataset builder, loads its configuration template
//! and loads one split, reporting the resulting dataset and every value the
//! builder published for model construction.
//!
//! # Usage
//!
//! ```bash
//! # Load the train split of the default VQA2 flavor
//! vqa-builder --builder vqa2 --split train
//!
//! # Use a different configuration root
//! vqa-builder --builder vqa2_train_val --split val --config-root /etc/datasets
//!
//! # Override the template with an explicit file
//! vqa-builder --builder vqa2 --split test --config my_vqa2.toml
//!
//! # List registered builders
//! vqa-builder --list
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use builder_core::{DatasetConfig, DatasetSplit, Registry};

/// Dataset builder driver
#[derive(Parser, Debug)]
#[command(name = "vqa-builder")]
#[command(about = "Resolve a registered dataset builder and load one split")]
struct Args {
    /// Registered builder name
    #[arg(short, long, default_value = "vqa2")]
    builder: String,

    /// Split to load (train, val, test)
    #[arg(short, long, default_value = "train")]
    split: String,

    /// Directory the builder's template path is resolved against
    #[arg(long, default_value = ".")]
    config_root: PathBuf,

    /// Configuration file to use instead of the builder's template
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// List registered builders and exit
    #[arg(long)]
    list: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    let filter = tracing_subscriber::filter::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::filter::EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let registry = Registry::with_builtin_builders()?;

    if args.list {
        for name in registry.builders().names() {
            println!("{name}");
        }
        return Ok(());
    }

    let split: DatasetSplit = args.split.parse()?;
    let mut builder = registry.builders().get(&args.builder)?;

    let config = match &args.config {
        Some(path) => DatasetConfig::from_file(path)?,
        None => DatasetConfig::from_template(&args.config_root, builder.config_path())?,
    }
    .with_env_overrides();
    config.validate()?;

    tracing::info!("Loading {} ({})", builder.dataset_name(), split);
    tracing::info!("  Config template: {}", builder.config_path());
    tracing::info!("  Data root: {}", config.data_root_dir.display());

    builder.build(split, &config)?;

    match builder.load(split, &config, registry.state())? {
        Some(dataset) => {
            tracing::info!(
                "Loaded {} examples from {} shards",
                dataset.len(),
                dataset.num_shards()
            );
            for shard in dataset.shards() {
                tracing::info!(
                    "  Shard {}: {} ({} examples)",
                    shard.shard_index(),
                    shard.name(),
                    shard.len()
                );
            }
        }
        None => {
            tracing::warn!("Split {} is not configured for {}", split, builder.dataset_name());
        }
    }

    for (key, value) in registry.state().snapshot() {
        println!("{key} = {value}");
    }

    Ok(())
}
