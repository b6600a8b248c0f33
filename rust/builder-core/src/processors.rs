// rust/builder-core/src/processors.rs

//! Vocabulary backed processors.
//!
//! Datasets expose their text and answer processors through the
//! [`VocabSized`] capability so that model construction can size its
//! embedding and output layers without knowing the processor type.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{BuilderError, Result};

/// Something with a fixed vocabulary.
pub trait VocabSized: Send + Sync {
    /// Number of entries in the vocabulary.
    fn vocab_size(&self) -> usize;
}

/// A processor whose only state is a token vocabulary.
#[derive(Debug, Clone)]
pub struct VocabProcessor {
    tokens: Vec<String>,
    index: HashMap<String, usize>,
    source: Option<PathBuf>,
}

impl VocabProcessor {
    /// Builds a vocabulary from in-memory tokens. Duplicates keep their first index.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocab = Vec::new();
        let mut index = HashMap::new();
        for token in tokens {
            let token = token.into();
            if !index.contains_key(&token) {
                index.insert(token.clone(), vocab.len());
                vocab.push(token);
            }
        }
        Self {
            tokens: vocab,
            index,
            source: None,
        }
    }

    /// Reads a vocabulary file with one token per line.
    ///
    /// Lines are trimmed and blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or holds no tokens.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BuilderError::io_with_source(path, "failed to read vocabulary file", e)
        })?;

        let mut processor = Self::from_tokens(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        );
        if processor.tokens.is_empty() {
            return Err(BuilderError::io(path, "vocabulary file is empty"));
        }
        processor.source = Some(path.to_path_buf());
        Ok(processor)
    }

    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    pub fn token(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    /// The file this vocabulary was read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

impl VocabSized for VocabProcessor {
    fn vocab_size(&self) -> usize {
        self.tokens.len()
    }
}
