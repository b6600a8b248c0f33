// rust/builder-core/src/lib.rs

//! Dataset Builders - Core Library
//!
//! This crate resolves dataset configuration into per-split datasets made of
//! concatenated shards, and passes the derived sizes (image feature sources,
//! text and answer vocabularies) on to model construction through a shared
//! registry.

pub mod config;
pub mod error;
pub mod split;

// Re-export commonly used types for convenience
pub use config::{DatasetConfig, ProcessorConfig, ProcessorsConfig};
pub use error::{BuilderError, Result};
pub use split::DatasetSplit;

pub mod processors;
pub use processors::{VocabProcessor, VocabSized};

pub mod dataset;
pub use dataset::{ConcatDataset, ImdbDataset, ImdbEntry, ShardDataset, ShardFactory};

pub mod registry;
pub use registry::{BuilderRegistry, Registry, RegistryValue, SharedState};

pub mod builder;
pub use builder::{BuilderIdentity, DatasetBuilder, Vqa2Builder, VQA2, VQA2_TRAIN_VAL};
