//! Message, factory, and listener traits
//!
//! A corpus never touches storage directly; everything goes through these
//! seams so the same cache logic serves any persistence backend.

use crate::error::Result;
use chrono::{DateTime, Utc};
use std::path::Path;

/// One keyed unit of training data with a deferred-load payload.
pub trait Message {
    /// The identity of this message within its corpus. Never empty.
    fn key(&self) -> &str;

    /// Whether the payload has been read into memory.
    fn is_loaded(&self) -> bool;

    /// Read the payload from the backing resource.
    ///
    /// Idempotent: a no-op once the message is loaded.
    fn load(&mut self) -> Result<()>;

    /// Write the payload to the backing resource, overwriting any
    /// existing resource at this key. Requires a payload to be present.
    fn store(&mut self) -> Result<()>;

    /// Delete the backing resource.
    ///
    /// An already-missing resource is not an error; anything else is.
    fn remove(&mut self) -> Result<()>;

    /// Creation time of the backing resource, falling back to the current
    /// time when the resource is gone, so expiry scans never fail on a
    /// half-deleted message.
    fn create_timestamp(&self) -> DateTime<Utc>;
}

/// Constructs messages for a corpus, either fresh or lazily bound.
pub trait MessageFactory {
    type Message: Message;

    /// Create a message bound to `key` at `location`.
    ///
    /// With `Some(content)` the payload is set and the message is loaded but
    /// nothing is written to storage; persisting it stays the caller's job
    /// via `store()`. With `None` the message is an unloaded binding whose
    /// payload is fetched on first `load()`.
    fn create(&self, key: &str, location: &Path, content: Option<&str>) -> Self::Message;
}

/// Callback interface notified when a corpus mutates.
///
/// `flags` is an opaque value passed through unchanged from the mutation
/// call site; callers use it to tag events (say, interactive add versus bulk
/// retrain) without the corpus interpreting it. Errors raised here propagate
/// to the mutating caller; side effects already applied are not rolled back.
pub trait CorpusListener<M: Message> {
    fn on_add_message(
        &self,
        message: &M,
        flags: u32,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

    fn on_remove_message(
        &self,
        message: &M,
        flags: u32,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
