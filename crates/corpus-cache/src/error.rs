//! Error types for the corpus cache

use std::fmt;

#[derive(Debug)]
pub enum CorpusError {
    /// An I/O failure while loading, storing, or removing a message.
    Io(std::io::Error),
    /// The backing bytes could not be decoded into message text.
    Decode(String),
    /// `store()` was called on a message that has no payload yet.
    MissingPayload(String),
    /// A listener callback failed during add/remove notification.
    Listener(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for CorpusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorpusError::Io(err) => write!(f, "I/O error: {}", err),
            CorpusError::Decode(msg) => write!(f, "Decode error: {}", msg),
            CorpusError::MissingPayload(key) => {
                write!(f, "Message '{}' has no payload to store", key)
            }
            CorpusError::Listener(err) => write!(f, "Listener error: {}", err),
        }
    }
}

impl std::error::Error for CorpusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CorpusError::Io(err) => Some(err),
            CorpusError::Listener(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CorpusError {
    fn from(err: std::io::Error) -> Self {
        CorpusError::Io(err)
    }
}

pub type Result<T> = std::result::Result<T, CorpusError>;
