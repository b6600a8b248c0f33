// rust/builder-core/src/config.rs

//! Dataset configuration.
//!
//! A dataset configuration is a TOML document describing, per split, which
//! index ("imdb") files make up the dataset and which image feature sources
//! belong to each of them. Builders only read it; environment variable
//! overrides and validation happen once, when the document is loaded.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BuilderError, Result};
use crate::split::DatasetSplit;

/// Configuration consumed by dataset builders.
///
/// Keys the builders understand are typed fields; everything else is kept in
/// `extra` and reachable through [`DatasetConfig::get`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Root directory that relative shard, feature and vocab paths resolve against.
    pub data_root_dir: PathBuf,
    /// Ordered shard references per split key.
    pub imdb_files: BTreeMap<String, Vec<String>>,
    /// Comma-joined feature source directories per split key, one entry per shard.
    pub image_features: BTreeMap<String, Vec<String>>,
    pub processors: ProcessorsConfig,
    #[serde(flatten)]
    pub extra: toml::Table,
}

/// Processor section of the dataset configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_processor: Option<ProcessorConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_processor: Option<ProcessorConfig>,
}

// A vocabulary backed processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    // Vocabulary file, one token per line.
    pub vocab_file: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            data_root_dir: PathBuf::from("./data"),
            imdb_files: BTreeMap::new(),
            image_features: BTreeMap::new(),
            processors: ProcessorsConfig::default(),
            extra: toml::Table::new(),
        }
    }
}

impl FromStr for DatasetConfig {
    type Err = BuilderError;

    /// Parse configuration from a TOML string.
    fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s)
            .map_err(|e| BuilderError::config_with_source("failed to parse TOML config", e))
    }
}

impl DatasetConfig {
    // Load configuration from a TOML file.
    //
    // # Errors
    //
    // Returns an error if the file cannot be read, parsed or is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BuilderError::io_with_source(path, "failed to read config file", e)
        })?;
        let config: Self = content.parse()?;
        config.validate()?;
        Ok(config)
    }

    /// Load a builder's default template.
    ///
    /// `config_path` is the relative path a builder reports through
    /// `DatasetBuilder::config_path`; it is joined onto `root`.
    pub fn from_template(root: impl AsRef<Path>, config_path: &str) -> Result<Self> {
        Self::from_file(root.as_ref().join(config_path))
    }

    // Apply environment variable overrides.
    //
    // - `DSB_DATA_ROOT_DIR` overrides `data_root_dir`
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("DSB_DATA_ROOT_DIR") {
            self.data_root_dir = PathBuf::from(val);
        }
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if a split key is unknown, a split's feature list does
    /// not line up with its shard list, or a feature entry is empty.
    pub fn validate(&self) -> Result<()> {
        // Lookups use the canonical key, so aliases such as "validation" would
        // never be found.
        for key in self.imdb_files.keys().chain(self.image_features.keys()) {
            match key.parse::<DatasetSplit>() {
                Ok(split) if split.as_str() == key => {}
                Ok(split) => {
                    return Err(BuilderError::config(format!(
                        "split key '{key}' must be written as '{split}'"
                    )));
                }
                Err(_) => {
                    return Err(BuilderError::config(format!(
                        "unknown split key '{key}'. Expected 'train', 'val' or 'test'"
                    )));
                }
            }
        }

        for (key, features) in &self.image_features {
            if features.iter().any(|f| f.trim().is_empty()) {
                return Err(BuilderError::config(format!(
                    "image_features.{key} must not contain empty entries"
                )));
            }
            if let Some(shards) = self.imdb_files.get(key) {
                if shards.len() != features.len() {
                    return Err(BuilderError::config(format!(
                        "image_features.{key} has {} entries but imdb_files.{key} has {}",
                        features.len(),
                        shards.len()
                    )));
                }
            }
        }

        Ok(())
    }

    /// Returns the shard references configured for `split`, or `None` if the
    /// split is not configured.
    pub fn shard_refs(&self, split: DatasetSplit) -> Option<&[String]> {
        self.imdb_files.get(split.as_str()).map(Vec::as_slice)
    }

    /// Returns the feature sources for one shard of `split`, split on `,`.
    pub fn feature_sources(&self, split: DatasetSplit, shard_index: usize) -> Option<Vec<&str>> {
        self.image_features
            .get(split.as_str())
            .and_then(|entries| entries.get(shard_index))
            .map(|entry| entry.split(',').map(str::trim).collect())
    }

    /// Item-style lookup of an unmodelled key, using `.` to descend into tables.
    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        let mut parts = key.split('.');
        let mut current = self.extra.get(parts.next()?)?;
        for part in parts {
            current = current.as_table()?.get(part)?;
        }
        Some(current)
    }

    /// Resolves a possibly relative path against `data_root_dir`.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_root_dir.join(path)
        }
    }
}
