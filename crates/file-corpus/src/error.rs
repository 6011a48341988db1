//! Error types for the file-backed corpus

use corpus_cache::CorpusError;
use std::fmt;

#[derive(Debug)]
pub enum FileCorpusError {
    /// A failure inside the underlying corpus cache.
    Corpus(CorpusError),
    /// An I/O failure while scanning the corpus directory.
    Io(std::io::Error),
    /// A message key that does not match the corpus filter, rejected
    /// before any I/O happens.
    InvalidKey { key: String, pattern: String },
    /// A malformed glob pattern for the key filter.
    Pattern(glob::PatternError),
}

impl fmt::Display for FileCorpusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileCorpusError::Corpus(err) => write!(f, "Corpus error: {}", err),
            FileCorpusError::Io(err) => write!(f, "I/O error: {}", err),
            FileCorpusError::InvalidKey { key, pattern } => {
                write!(f, "Key '{}' does not match corpus filter '{}'", key, pattern)
            }
            FileCorpusError::Pattern(err) => write!(f, "Invalid filter pattern: {}", err),
        }
    }
}

impl std::error::Error for FileCorpusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileCorpusError::Corpus(err) => Some(err),
            FileCorpusError::Io(err) => Some(err),
            FileCorpusError::Pattern(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CorpusError> for FileCorpusError {
    fn from(err: CorpusError) -> Self {
        FileCorpusError::Corpus(err)
    }
}

impl From<std::io::Error> for FileCorpusError {
    fn from(err: std::io::Error) -> Self {
        FileCorpusError::Io(err)
    }
}

impl From<glob::PatternError> for FileCorpusError {
    fn from(err: glob::PatternError) -> Self {
        FileCorpusError::Pattern(err)
    }
}

pub type Result<T> = std::result::Result<T, FileCorpusError>;
