// rust/builder-core/src/dataset/imdb.rs

//! Default shard dataset: a newline-delimited JSON index file.
//!
//! Each non-blank line of an index ("imdb") file is one [`ImdbEntry`].
//! Image features are not decoded here; the dataset only resolves where the
//! feature files of an entry live, one directory per configured source.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{DatasetConfig, ProcessorConfig};
use crate::error::{BuilderError, Result};
use crate::processors::{VocabProcessor, VocabSized};
use crate::split::DatasetSplit;

use super::traits::{ImdbEntry, ShardDataset};

/// Feature file extension appended to an entry's image name.
const FEATURE_EXTENSION: &str = "npy";

pub struct ImdbDataset {
    name: String,
    split: DatasetSplit,
    shard_index: usize,
    path: PathBuf,
    entries: Vec<ImdbEntry>,
    feature_dirs: Vec<PathBuf>,
    text_processor: Option<Arc<VocabProcessor>>,
    answer_processor: Option<Arc<VocabProcessor>>,
}

impl ImdbDataset {
    /// Builds shard `shard_index` of `split` from the dataset configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the split or shard is not configured, the index
    /// file cannot be read or holds a malformed line, or a configured
    /// vocabulary file cannot be read.
    pub fn from_config(
        split: DatasetSplit,
        shard_index: usize,
        config: &DatasetConfig,
    ) -> Result<Self> {
        let shard_ref = config
            .shard_refs(split)
            .and_then(|refs| refs.get(shard_index))
            .ok_or_else(|| BuilderError::missing_key(format!("imdb_files.{split}[{shard_index}]")))?;

        let path = config.resolve_path(shard_ref);
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| shard_ref.clone());
        let entries = read_entries(&path, &name)?;

        let feature_dirs = config
            .feature_sources(split, shard_index)
            .unwrap_or_default()
            .into_iter()
            .map(|source| config.resolve_path(source))
            .collect();

        let text_processor = load_processor(config, config.processors.text_processor.as_ref())?;
        let answer_processor =
            load_processor(config, config.processors.answer_processor.as_ref())?;

        tracing::debug!(
            "Loaded shard {} of {} from {} ({} entries)",
            shard_index,
            split,
            path.display(),
            entries.len()
        );

        Ok(Self {
            name,
            split,
            shard_index,
            path,
            entries,
            feature_dirs,
            text_processor,
            answer_processor,
        })
    }

    /// Path of the index file this shard was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn feature_dirs(&self) -> &[PathBuf] {
        &self.feature_dirs
    }

    /// Feature file paths for the entry at `index`, one per feature source.
    pub fn feature_paths(&self, index: usize) -> Option<Vec<PathBuf>> {
        let entry = self.entries.get(index)?;
        Some(
            self.feature_dirs
                .iter()
                .map(|dir| dir.join(format!("{}.{FEATURE_EXTENSION}", entry.image_name)))
                .collect(),
        )
    }
}

impl ShardDataset for ImdbDataset {
    fn name(&self) -> &str {
        &self.name
    }

    fn split(&self) -> DatasetSplit {
        self.split
    }

    fn shard_index(&self) -> usize {
        self.shard_index
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get(&self, index: usize) -> Option<ImdbEntry> {
        self.entries.get(index).cloned()
    }

    fn text_processor(&self) -> Option<&dyn VocabSized> {
        self.text_processor.as_deref().map(|p| p as &dyn VocabSized)
    }

    fn answer_processor(&self) -> Option<&dyn VocabSized> {
        self.answer_processor.as_deref().map(|p| p as &dyn VocabSized)
    }
}

impl std::fmt::Debug for ImdbDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImdbDataset")
            .field("name", &self.name)
            .field("split", &self.split)
            .field("shard_index", &self.shard_index)
            .field("path", &self.path)
            .field("len", &self.entries.len())
            .finish()
    }
}

fn read_entries(path: &Path, name: &str) -> Result<Vec<ImdbEntry>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| BuilderError::io_with_source(path, "failed to read imdb file", e))?;

    let mut entries = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let entry: ImdbEntry = serde_json::from_str(line).map_err(|e| {
            BuilderError::dataset(name, format!("malformed entry on line {}: {e}", line_no + 1))
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

fn load_processor(
    config: &DatasetConfig,
    processor: Option<&ProcessorConfig>,
) -> Result<Option<Arc<VocabProcessor>>> {
    processor
        .map(|p| VocabProcessor::from_file(config.resolve_path(&p.vocab_file)).map(Arc::new))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TRAIN_LINES: &str = concat!(
        r#"{"question_id": 1, "image_name": "COCO_1", "question": "what color?", "answers": ["red"]}"#,
        "\n\n",
        r#"{"question_id": 2, "image_name": "COCO_2", "question": "how many?", "answers": ["2", "two"]}"#,
        "\n",
    );

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn config_for(root: &TempDir, extra: &str) -> DatasetConfig {
        let toml = format!(
            r#"
            data_root_dir = "{}"

            [imdb_files]
            train = ["imdb/train.jsonl"]

            [image_features]
            train = ["features/rcnn,features/grid"]
            {extra}
            "#,
            root.path().display()
        );
        toml.parse().unwrap()
    }

    #[test]
    fn test_reads_entries_and_skips_blank_lines() {
        let root = TempDir::new().unwrap();
        write(root.path(), "imdb/train.jsonl", TRAIN_LINES);

        let dataset =
            ImdbDataset::from_config(DatasetSplit::Train, 0, &config_for(&root, "")).unwrap();

        assert_eq!(dataset.name(), "train");
        assert_eq!(dataset.split(), DatasetSplit::Train);
        assert_eq!(dataset.shard_index(), 0);
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.get(1).unwrap().answers, vec!["2", "two"]);
        assert!(dataset.get(2).is_none());
        assert!(dataset.text_processor().is_none());
        assert!(dataset.answer_processor().is_none());
    }

    #[test]
    fn test_feature_paths_per_source() {
        let root = TempDir::new().unwrap();
        write(root.path(), "imdb/train.jsonl", TRAIN_LINES);

        let dataset =
            ImdbDataset::from_config(DatasetSplit::Train, 0, &config_for(&root, "")).unwrap();

        assert_eq!(dataset.feature_dirs().len(), 2);
        assert_eq!(
            dataset.feature_paths(0).unwrap(),
            vec![
                root.path().join("features/rcnn/COCO_1.npy"),
                root.path().join("features/grid/COCO_1.npy"),
            ]
        );
        assert!(dataset.feature_paths(5).is_none());
    }

    #[test]
    fn test_processors_from_config() {
        let root = TempDir::new().unwrap();
        write(root.path(), "imdb/train.jsonl", TRAIN_LINES);
        write(root.path(), "vocabs/questions.txt", "what\ncolor\nhow\nmany\n");
        write(root.path(), "vocabs/answers.txt", "red\n2\n");

        let config = config_for(
            &root,
            r#"
            [processors.text_processor]
            vocab_file = "vocabs/questions.txt"

            [processors.answer_processor]
            vocab_file = "vocabs/answers.txt"
            "#,
        );
        let dataset = ImdbDataset::from_config(DatasetSplit::Train, 0, &config).unwrap();

        assert_eq!(dataset.text_processor().unwrap().vocab_size(), 4);
        assert_eq!(dataset.answer_processor().unwrap().vocab_size(), 2);
    }

    #[test]
    fn test_malformed_line_names_line_number() {
        let root = TempDir::new().unwrap();
        write(
            root.path(),
            "imdb/train.jsonl",
            "{\"question_id\": 1, \"image_name\": \"a\", \"question\": \"q\"}\nnot json\n",
        );

        let err = ImdbDataset::from_config(DatasetSplit::Train, 0, &config_for(&root, ""))
            .unwrap_err();
        assert!(matches!(err, BuilderError::Dataset { .. }));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_missing_index_file() {
        let root = TempDir::new().unwrap();
        let err = ImdbDataset::from_config(DatasetSplit::Train, 0, &config_for(&root, ""))
            .unwrap_err();
        assert!(matches!(err, BuilderError::Io { .. }));
    }

    #[test]
    fn test_unconfigured_shard() {
        let root = TempDir::new().unwrap();
        let err = ImdbDataset::from_config(DatasetSplit::Train, 3, &config_for(&root, ""))
            .unwrap_err();
        assert!(err.to_string().contains("imdb_files.train[3]"));
    }
}
