// rust/builder-core/src/dataset/traits.rs

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::DatasetConfig;
use crate::error::Result;
use crate::processors::VocabSized;
use crate::split::DatasetSplit;

/// One question record of an index file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImdbEntry {
    pub question_id: u64,
    pub image_name: String,
    pub question: String,
    #[serde(default)]
    pub answers: Vec<String>,
}

/// A dataset built from a single shard reference of a split.
///
/// Shards are owned by a [`ConcatDataset`](super::ConcatDataset), which lays
/// them end to end under one index space.
pub trait ShardDataset: Send + Sync {
    /// Human readable name, used in logs and errors
    fn name(&self) -> &str;

    fn split(&self) -> DatasetSplit;

    /// Position of this shard in the split's `imdb_files` list
    fn shard_index(&self) -> usize;

    /// Number of examples in this shard
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gets the example at `index`, or `None` when out of range
    fn get(&self, index: usize) -> Option<ImdbEntry>;

    /// Question vocabulary, when this dataset tokenises questions.
    fn text_processor(&self) -> Option<&dyn VocabSized> {
        None
    }

    /// Answer vocabulary, when this dataset scores against a fixed answer set.
    fn answer_processor(&self) -> Option<&dyn VocabSized> {
        None
    }
}

/// Constructs the shard dataset for `(split, shard_index, config)`.
///
/// Builders hold one of these and call it once per configured shard.
pub type ShardFactory = Arc<
    dyn Fn(DatasetSplit, usize, &DatasetConfig) -> Result<Box<dyn ShardDataset>> + Send + Sync,
>;

/// Wraps a constructor function or closure as a [`ShardFactory`].
pub fn shard_factory<F>(f: F) -> ShardFactory
where
    F: Fn(DatasetSplit, usize, &DatasetConfig) -> Result<Box<dyn ShardDataset>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}
