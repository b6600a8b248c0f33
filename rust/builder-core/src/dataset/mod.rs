// rust/builder-core/src/dataset/mod.rs

//! Shard datasets and their concatenation.
//!
//! A builder turns every shard reference listed for a split into one
//! [`ShardDataset`] through its [`ShardFactory`], then lays the shards end to
//! end in a [`ConcatDataset`].
//!
//! # Example
//!
//! ```no_run
//! use builder_core::dataset::{ConcatDataset, ImdbDataset, ShardDataset};
//! use builder_core::{DatasetConfig, DatasetSplit};
//!
//! let config = DatasetConfig::from_file("configs/datasets/vqa2/defaults.toml").unwrap();
//! let shard = ImdbDataset::from_config(DatasetSplit::Train, 0, &config).unwrap();
//! let dataset = ConcatDataset::new(vec![Box::new(shard) as Box<dyn ShardDataset>]);
//!
//! for entry in dataset.iter() {
//!     println!("{}: {}", entry.question_id, entry.question);
//! }
//! ```

mod concat;
mod imdb;
mod traits;

pub use concat::ConcatDataset;
pub use imdb::ImdbDataset;
pub use traits::{shard_factory, ImdbEntry, ShardDataset, ShardFactory};
