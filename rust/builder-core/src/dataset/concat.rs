// rust/builder-core/src/dataset/concat.rs

use crate::processors::VocabSized;

use super::traits::{ImdbEntry, ShardDataset};

/// Shard datasets laid end to end under one index space.
///
/// Shard order is the order given to [`ConcatDataset::new`]; nothing is
/// deduplicated or reordered. The composite is immutable once built.
pub struct ConcatDataset {
    shards: Vec<Box<dyn ShardDataset>>,
    // cumulative_lengths[i] is the global index one past the end of shard i
    cumulative_lengths: Vec<usize>,
}

impl ConcatDataset {
    pub fn new(shards: Vec<Box<dyn ShardDataset>>) -> Self {
        let mut cumulative_lengths = Vec::with_capacity(shards.len());
        let mut total = 0;
        for shard in &shards {
            total += shard.len();
            cumulative_lengths.push(total);
        }

        Self {
            shards,
            cumulative_lengths,
        }
    }

    /// Total number of examples across all shards.
    pub fn len(&self) -> usize {
        self.cumulative_lengths.last().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    pub fn shard(&self, shard: usize) -> Option<&dyn ShardDataset> {
        self.shards.get(shard).map(|s| s.as_ref())
    }

    pub fn shards(&self) -> impl Iterator<Item = &dyn ShardDataset> + '_ {
        self.shards.iter().map(|s| s.as_ref())
    }

    /// Maps a global index to `(shard position, index within shard)`.
    pub fn locate(&self, index: usize) -> Option<(usize, usize)> {
        if index >= self.len() {
            return None;
        }

        // Empty shards share their end with the previous shard, so the first
        // shard whose end lies past `index` is the one holding it.
        let shard = self.cumulative_lengths.partition_point(|&end| end <= index);
        let start = if shard == 0 {
            0
        } else {
            self.cumulative_lengths[shard - 1]
        };
        Some((shard, index - start))
    }

    pub fn get(&self, index: usize) -> Option<ImdbEntry> {
        let (shard, local) = self.locate(index)?;
        self.shards[shard].get(local)
    }

    pub fn iter(&self) -> impl Iterator<Item = ImdbEntry> + '_ {
        self.shards
            .iter()
            .flat_map(|shard| (0..shard.len()).filter_map(move |i| shard.get(i)))
    }

    /// Text processor of the first shard.
    ///
    /// All shards of a split are built from the same configuration, so the
    /// first one speaks for the composite.
    pub fn text_processor(&self) -> Option<&dyn VocabSized> {
        self.shards.first().and_then(|s| s.text_processor())
    }

    /// Answer processor of the first shard.
    pub fn answer_processor(&self) -> Option<&dyn VocabSized> {
        self.shards.first().and_then(|s| s.answer_processor())
    }
}

impl std::fmt::Debug for ConcatDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcatDataset")
            .field("shards", &self.shards.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::VocabProcessor;
    use crate::split::DatasetSplit;

    struct VecShard {
        index: usize,
        entries: Vec<ImdbEntry>,
        text: Option<VocabProcessor>,
    }

    impl VecShard {
        fn boxed(index: usize, ids: std::ops::Range<u64>) -> Box<dyn ShardDataset> {
            Box::new(Self {
                index,
                entries: ids.map(entry).collect(),
                text: None,
            })
        }
    }

    impl ShardDataset for VecShard {
        fn name(&self) -> &str {
            "vec"
        }

        fn split(&self) -> DatasetSplit {
            DatasetSplit::Train
        }

        fn shard_index(&self) -> usize {
            self.index
        }

        fn len(&self) -> usize {
            self.entries.len()
        }

        fn get(&self, index: usize) -> Option<ImdbEntry> {
            self.entries.get(index).cloned()
        }

        fn text_processor(&self) -> Option<&dyn VocabSized> {
            self.text.as_ref().map(|t| t as &dyn VocabSized)
        }
    }

    fn entry(id: u64) -> ImdbEntry {
        ImdbEntry {
            question_id: id,
            image_name: format!("img_{id}"),
            question: format!("question {id}"),
            answers: vec![],
        }
    }

    #[test]
    fn test_len_spans_all_shards() {
        let dataset = ConcatDataset::new(vec![
            VecShard::boxed(0, 0..3),
            VecShard::boxed(1, 3..5),
            VecShard::boxed(2, 5..9),
        ]);

        assert_eq!(dataset.len(), 9);
        assert_eq!(dataset.num_shards(), 3);
        assert!(!dataset.is_empty());
    }

    #[test]
    fn test_global_index_crosses_shard_boundaries() {
        let dataset = ConcatDataset::new(vec![
            VecShard::boxed(0, 0..3),
            VecShard::boxed(1, 3..5),
        ]);

        for id in 0..5 {
            assert_eq!(dataset.get(id as usize).unwrap().question_id, id);
        }
        assert!(dataset.get(5).is_none());
        assert_eq!(dataset.locate(3), Some((1, 0)));
        assert_eq!(dataset.locate(2), Some((0, 2)));
    }

    #[test]
    fn test_empty_shards_are_skipped_when_indexing() {
        let dataset = ConcatDataset::new(vec![
            VecShard::boxed(0, 0..0),
            VecShard::boxed(1, 0..2),
            VecShard::boxed(2, 2..2),
            VecShard::boxed(3, 2..3),
        ]);

        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.locate(0), Some((1, 0)));
        assert_eq!(dataset.locate(2), Some((3, 0)));
        let ids: Vec<u64> = dataset.iter().map(|e| e.question_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_no_shards() {
        let dataset = ConcatDataset::new(vec![]);
        assert!(dataset.is_empty());
        assert!(dataset.get(0).is_none());
        assert!(dataset.text_processor().is_none());
    }

    #[test]
    fn test_capabilities_come_from_first_shard() {
        let first = Box::new(VecShard {
            index: 0,
            entries: vec![entry(0)],
            text: Some(VocabProcessor::from_tokens(["a", "b"])),
        });
        let dataset = ConcatDataset::new(vec![first, VecShard::boxed(1, 1..2)]);

        assert_eq!(dataset.text_processor().unwrap().vocab_size(), 2);
        assert!(dataset.answer_processor().is_none());
    }
}
