// rust/builder-core/src/builder.rs

//! Dataset builders.
//!
//! A builder turns a split and a [`DatasetConfig`] into a [`ConcatDataset`]
//! with one shard per configured index file, and publishes the sizes model
//! construction needs into [`SharedState`].
//!
//! # Example
//!
//! ```no_run
//! use builder_core::{DatasetConfig, DatasetSplit, Registry};
//!
//! let registry = Registry::with_builtin_builders().unwrap();
//! let mut builder = registry.builders().get("vqa2").unwrap();
//!
//! let config = DatasetConfig::from_template(".", builder.config_path()).unwrap();
//! builder.build(DatasetSplit::Train, &config).unwrap();
//!
//! if let Some(dataset) = builder.load(DatasetSplit::Train, &config, registry.state()).unwrap() {
//!     println!("{} examples in {} shards", dataset.len(), dataset.num_shards());
//! }
//!
//! let features = registry.state().get("num_image_features");
//! ```

use crate::config::DatasetConfig;
use crate::dataset::{shard_factory, ConcatDataset, ImdbDataset, ShardDataset, ShardFactory};
use crate::error::{BuilderError, Result};
use crate::registry::{keys, BuilderRegistry, SharedState};
use crate::split::DatasetSplit;

/// Name and config template of a builder flavor.
///
/// Flavors of the same dataset share all loading behavior and differ only in
/// this identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderIdentity {
    pub name: &'static str,
    /// Template path relative to the configuration root
    pub config_path: &'static str,
}

pub const VQA2: BuilderIdentity = BuilderIdentity {
    name: "vqa2",
    config_path: "configs/datasets/vqa2/defaults.toml",
};

pub const VQA2_TRAIN_VAL: BuilderIdentity = BuilderIdentity {
    name: "vqa2_train_val",
    config_path: "configs/datasets/vqa2/train_val.toml",
};

/// Turns configuration into a ready-to-use dataset for a split.
pub trait DatasetBuilder: Send + Sync {
    /// Name used as the prefix of the keys this builder publishes.
    fn dataset_name(&self) -> &str;

    /// Default configuration template, relative to the configuration root.
    fn config_path(&self) -> &'static str;

    /// Prepares raw assets before `load`. Builders with nothing to prepare
    /// keep the default.
    fn build(&mut self, split: DatasetSplit, config: &DatasetConfig) -> Result<()> {
        let _ = config;
        tracing::debug!("Nothing to build for {} ({})", self.dataset_name(), split);
        Ok(())
    }

    /// Loads `split`, keeps it as the current dataset and publishes derived
    /// sizes into `state`.
    ///
    /// Returns `Ok(None)` when the split is not configured.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration keys are missing or a
    /// shard cannot be constructed.
    fn load(
        &mut self,
        split: DatasetSplit,
        config: &DatasetConfig,
        state: &SharedState,
    ) -> Result<Option<&ConcatDataset>>;

    /// Builds one shard per `imdb_files[split]` entry and concatenates them
    /// in configuration order.
    ///
    /// Returns `Ok(None)`, after logging a warning, when `split` has no
    /// `imdb_files` entry.
    fn prepare_data_set(
        &self,
        split: DatasetSplit,
        config: &DatasetConfig,
    ) -> Result<Option<ConcatDataset>>;

    /// Publishes vocabulary sizes of the current dataset, for whichever
    /// processors it exposes.
    fn update_registry_for_model(&self, config: &DatasetConfig, state: &SharedState);

    /// Replaces the constructor used for each shard by later loads.
    fn set_dataset_class(&mut self, factory: ShardFactory);

    /// The dataset produced by the last successful `load`.
    fn dataset(&self) -> Option<&ConcatDataset>;
}

/// Builder for VQA2 style datasets: question index files plus image features.
pub struct Vqa2Builder {
    dataset_name: String,
    config_path: &'static str,
    dataset_factory: ShardFactory,
    dataset: Option<ConcatDataset>,
    num_image_features: Option<usize>,
}

impl Vqa2Builder {
    pub fn new() -> Self {
        Self::with_identity(VQA2)
    }

    /// The combined train + val flavor.
    pub fn train_val() -> Self {
        Self::with_identity(VQA2_TRAIN_VAL)
    }

    pub fn with_identity(identity: BuilderIdentity) -> Self {
        Self {
            dataset_name: identity.name.to_string(),
            config_path: identity.config_path,
            dataset_factory: default_shard_factory(),
            dataset: None,
            num_image_features: None,
        }
    }

    /// Overrides the name used for published keys.
    #[must_use]
    pub fn with_dataset_name(mut self, name: impl Into<String>) -> Self {
        self.dataset_name = name.into();
        self
    }

    /// Feature source count published by the last `load`.
    pub fn num_image_features(&self) -> Option<usize> {
        self.num_image_features
    }
}

impl Default for Vqa2Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetBuilder for Vqa2Builder {
    fn dataset_name(&self) -> &str {
        &self.dataset_name
    }

    fn config_path(&self) -> &'static str {
        self.config_path
    }

    fn load(
        &mut self,
        split: DatasetSplit,
        config: &DatasetConfig,
        state: &SharedState,
    ) -> Result<Option<&ConcatDataset>> {
        // The feature count always comes from the train split, whichever
        // split is being loaded.
        let features = config
            .image_features
            .get(DatasetSplit::Train.as_str())
            .and_then(|entries| entries.first())
            .ok_or_else(|| BuilderError::missing_key("image_features.train[0]"))?;
        let num_image_features = features.split(',').count();
        if split != DatasetSplit::Train {
            tracing::debug!(
                "{}: num_image_features taken from the train split while loading {}",
                self.dataset_name,
                split
            );
        }
        state.register(keys::NUM_IMAGE_FEATURES, num_image_features);
        self.num_image_features = Some(num_image_features);

        self.dataset = self.prepare_data_set(split, config)?;
        self.update_registry_for_model(config, state);

        Ok(self.dataset.as_ref())
    }

    fn prepare_data_set(
        &self,
        split: DatasetSplit,
        config: &DatasetConfig,
    ) -> Result<Option<ConcatDataset>> {
        let Some(shard_refs) = config.shard_refs(split) else {
            tracing::warn!(
                "Dataset type {} is not present in imdb_files of dataset config. \
                 Returning None. This dataset won't be used.",
                split
            );
            return Ok(None);
        };

        let shards = (0..shard_refs.len())
            .map(|shard_index| (self.dataset_factory)(split, shard_index, config))
            .collect::<Result<Vec<_>>>()?;
        let dataset = ConcatDataset::new(shards);

        tracing::info!(
            "{}: loaded {} split with {} shards, {} examples",
            self.dataset_name,
            split,
            dataset.num_shards(),
            dataset.len()
        );

        Ok(Some(dataset))
    }

    fn update_registry_for_model(&self, _config: &DatasetConfig, state: &SharedState) {
        let Some(dataset) = self.dataset.as_ref() else {
            return;
        };

        if let Some(text) = dataset.text_processor() {
            state.register(keys::text_vocab_size(&self.dataset_name), text.vocab_size());
        }
        if let Some(answers) = dataset.answer_processor() {
            state.register(keys::num_final_outputs(&self.dataset_name), answers.vocab_size());
        }
    }

    fn set_dataset_class(&mut self, factory: ShardFactory) {
        self.dataset_factory = factory;
    }

    fn dataset(&self) -> Option<&ConcatDataset> {
        self.dataset.as_ref()
    }
}

fn default_shard_factory() -> ShardFactory {
    shard_factory(|split, shard_index, config| {
        let dataset = ImdbDataset::from_config(split, shard_index, config)?;
        Ok(Box::new(dataset) as Box<dyn ShardDataset>)
    })
}

/// Registers every built-in builder flavor.
///
/// # Errors
///
/// Returns `DuplicateBuilder` if one of the names is already taken.
pub fn register_builtin_builders(builders: &BuilderRegistry) -> Result<()> {
    for identity in [VQA2, VQA2_TRAIN_VAL] {
        builders.register(identity.name, move || {
            Box::new(Vqa2Builder::with_identity(identity)) as Box<dyn DatasetBuilder>
        })?;
    }
    Ok(())
}
