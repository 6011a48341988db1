//! Corpus types

use serde::{Deserialize, Serialize};

/// Snapshot of a corpus's cache behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusStats {
    /// Total keys known to the corpus.
    pub known: usize,
    /// Keys currently holding an in-memory message.
    pub resident: usize,
    /// `get` calls served from a resident message.
    pub hits: u64,
    /// `get` calls that missed or had to materialize.
    pub misses: u64,
}
