// rust/builder-core/src/split.rs

//! Dataset split tags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BuilderError, Result};

/// A named partition of a dataset.
///
/// The string form (`as_str`) is the key used under `imdb_files` and
/// `image_features` in dataset configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetSplit {
    Train,
    #[serde(alias = "validation")]
    Val,
    Test,
}

impl DatasetSplit {
    pub const ALL: [DatasetSplit; 3] = [DatasetSplit::Train, DatasetSplit::Val, DatasetSplit::Test];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetSplit::Train => "train",
            DatasetSplit::Val => "val",
            DatasetSplit::Test => "test",
        }
    }
}

impl fmt::Display for DatasetSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetSplit {
    type Err = BuilderError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "train" => Ok(DatasetSplit::Train),
            "val" | "validation" | "dev" => Ok(DatasetSplit::Val),
            "test" => Ok(DatasetSplit::Test),
            _ => Err(BuilderError::config(format!(
                "unknown dataset split: '{s}'. Expected 'train', 'val' or 'test'"
            ))),
        }
    }
}
