//! Bounded, observable message cache
//!
//! A `Corpus` owns the full key space of a message store but keeps only a
//! bounded subset resident in memory. Admission is FIFO: when residency
//! exceeds the configured size, the oldest-admitted key is demoted back to
//! "known, not resident" and its in-memory message is dropped. Eviction
//! never touches the backing store; a later `get` rebuilds the message
//! through the factory.

use crate::error::{CorpusError, Result};
use crate::message::{CorpusListener, Message, MessageFactory};
use crate::types::CorpusStats;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Residency state of a known key.
///
/// Absence from the corpus entirely is a map miss, so together the three
/// states a key can be in are explicit: absent, known, resident.
pub enum Residency<M> {
    /// The message is held in memory.
    Resident(M),
    /// The key belongs to the corpus but the message lives only in the
    /// backing store.
    Known,
}

/// Bounded, observable registry of messages with a pluggable factory.
///
/// Single-writer by construction: every mutating operation takes
/// `&mut self`, so concurrent mutation of one corpus is ruled out at
/// compile time within a process. Callers wanting cross-thread sharing
/// wrap the corpus in their own lock.
pub struct Corpus<F: MessageFactory> {
    factory: F,
    location: PathBuf,
    cache_size: usize,
    entries: HashMap<String, Residency<F::Message>>,
    key_order: Vec<String>,
    resident: VecDeque<String>,
    listeners: Vec<Box<dyn CorpusListener<F::Message>>>,
    hits: u64,
    misses: u64,
}

impl<F: MessageFactory> Corpus<F> {
    /// Create an empty corpus.
    ///
    /// `location` is the storage binding handed to the factory whenever a
    /// message must be materialized. `cache_size` bounds residency, not the
    /// total key count; `0` means unbounded.
    pub fn new(factory: F, location: impl Into<PathBuf>, cache_size: usize) -> Self {
        Self {
            factory,
            location: location.into(),
            cache_size,
            entries: HashMap::new(),
            key_order: Vec::new(),
            resident: VecDeque::new(),
            listeners: Vec::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Record a key as known without materializing its message.
    ///
    /// Used by backends that seed a corpus from an existing store. Already
    /// known keys are left untouched.
    pub fn register_key(&mut self, key: impl Into<String>) {
        let key = key.into();
        if !self.entries.contains_key(&key) {
            self.key_order.push(key.clone());
            self.entries.insert(key, Residency::Known);
        }
    }

    /// Fetch a message by key.
    ///
    /// Unknown keys return `None`; callers supply their own default via
    /// `Option` combinators. A known but non-resident key is materialized
    /// through the factory and promoted, which may evict the oldest
    /// resident. The returned message may still be unloaded.
    pub fn get(&mut self, key: &str) -> Option<&mut F::Message> {
        match self.entries.get(key) {
            None => {
                self.misses += 1;
                return None;
            }
            Some(Residency::Resident(_)) => {
                self.hits += 1;
            }
            Some(Residency::Known) => {
                self.misses += 1;
                let message = self.factory.create(key, &self.location, None);
                self.cache_message(message);
            }
        }

        match self.entries.get_mut(key) {
            Some(Residency::Resident(message)) => Some(message),
            _ => None,
        }
    }

    /// Persist a message and register it with this corpus.
    ///
    /// The write happens first, then the key is admitted to residency, then
    /// listeners are notified. A listener error propagates to the caller
    /// with the write and index update already applied: the add path is
    /// at-least-once-write, at-most-once-notify.
    pub fn add_message(&mut self, mut message: F::Message, flags: u32) -> Result<()> {
        message.store()?;
        let key = message.key().to_string();
        debug!(key = %key, "adding message to corpus");
        self.cache_message(message);

        if let Some(Residency::Resident(message)) = self.entries.get(&key) {
            for listener in &self.listeners {
                listener
                    .on_add_message(message, flags)
                    .map_err(CorpusError::Listener)?;
            }
        }
        Ok(())
    }

    /// Delete a message's backing resource and forget its key entirely.
    ///
    /// Non-resident keys are materialized first so the resource can be
    /// deleted and listeners can see the message. Unknown keys are a no-op
    /// returning `Ok(None)`. If the deletion itself fails the key stays
    /// known and the error surfaces.
    pub fn remove_message(&mut self, key: &str, flags: u32) -> Result<Option<F::Message>> {
        let slot = match self.entries.get_mut(key) {
            None => return Ok(None),
            Some(slot) => slot,
        };
        let mut message = match std::mem::replace(slot, Residency::Known) {
            Residency::Resident(message) => message,
            Residency::Known => self.factory.create(key, &self.location, None),
        };

        if let Err(err) = message.remove() {
            warn!(key = %key, error = %err, "failed to delete message resource");
            self.resident.retain(|k| k != key);
            return Err(err);
        }

        debug!(key = %key, "removing message from corpus");
        self.entries.remove(key);
        self.key_order.retain(|k| k != key);
        self.resident.retain(|k| k != key);

        for listener in &self.listeners {
            listener
                .on_remove_message(&message, flags)
                .map_err(CorpusError::Listener)?;
        }
        Ok(Some(message))
    }

    /// Admit a message into residency.
    ///
    /// The key joins the tail of the FIFO; if residency now exceeds the
    /// bound, the head key is demoted to `Known` and its in-memory message
    /// dropped. The backing store is never touched here.
    pub fn cache_message(&mut self, message: F::Message) {
        let key = message.key().to_string();
        let newly_known = !self.entries.contains_key(&key);
        let was_resident = matches!(self.entries.get(&key), Some(Residency::Resident(_)));

        self.entries.insert(key.clone(), Residency::Resident(message));
        if newly_known {
            self.key_order.push(key.clone());
        }
        if !was_resident {
            self.resident.push_back(key);
        }
        self.evict_over_capacity();
    }

    fn evict_over_capacity(&mut self) {
        if self.cache_size == 0 {
            return;
        }
        while self.resident.len() > self.cache_size {
            if let Some(evicted) = self.resident.pop_front() {
                debug!(key = %evicted, "evicting message from residency");
                if let Some(slot) = self.entries.get_mut(&evicted) {
                    *slot = Residency::Known;
                }
            }
        }
    }

    /// Relocate a message from `source` into this corpus.
    ///
    /// The message is loaded first, then removed from the source (backing
    /// resource included), then added here. After `Ok(true)` the source no
    /// longer knows the key and this corpus serves the loaded message.
    /// Returns `Ok(false)` when the source does not know the key.
    pub fn take_message<S>(&mut self, key: &str, source: &mut Corpus<S>, flags: u32) -> Result<bool>
    where
        S: MessageFactory<Message = F::Message>,
    {
        match source.get(key) {
            None => return Ok(false),
            Some(message) => message.load()?,
        }
        let message = match source.remove_message(key, flags)? {
            None => return Ok(false),
            Some(message) => message,
        };
        self.add_message(message, flags)?;
        Ok(true)
    }

    /// Ask the factory for a message bound to this corpus's location.
    ///
    /// The message is not registered; `add_message` does that once the
    /// caller is done preparing it.
    pub fn make_message(&self, key: &str, content: Option<&str>) -> F::Message {
        self.factory.create(key, &self.location, content)
    }

    /// All known keys in insertion order.
    ///
    /// This is a view of the current index, not a live one; mutating the
    /// corpus while iterating is ruled out by the borrow.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.key_order.iter().map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of known keys, resident or not.
    pub fn len(&self) -> usize {
        self.key_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_order.is_empty()
    }

    /// Register a listener. Listeners are notified in registration order;
    /// there is no removal.
    pub fn add_listener(&mut self, listener: Box<dyn CorpusListener<F::Message>>) {
        self.listeners.push(listener);
    }

    pub fn stats(&self) -> CorpusStats {
        CorpusStats {
            known: self.key_order.len(),
            resident: self.resident.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }

    pub fn cache_size(&self) -> usize {
        self.cache_size
    }

    pub fn location(&self) -> &Path {
        &self.location
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CorpusError;
    use chrono::{DateTime, Utc};
    use std::path::Path;

    #[derive(Debug)]
    struct StubMessage {
        key: String,
        created: DateTime<Utc>,
        loaded: bool,
        stored: bool,
    }

    impl StubMessage {
        fn new(key: &str) -> Self {
            Self {
                key: key.to_string(),
                created: Utc::now(),
                loaded: false,
                stored: false,
            }
        }
    }

    impl Message for StubMessage {
        fn key(&self) -> &str {
            &self.key
        }

        fn is_loaded(&self) -> bool {
            self.loaded
        }

        fn load(&mut self) -> crate::error::Result<()> {
            self.loaded = true;
            Ok(())
        }

        fn store(&mut self) -> crate::error::Result<()> {
            self.stored = true;
            Ok(())
        }

        fn remove(&mut self) -> crate::error::Result<()> {
            Ok(())
        }

        fn create_timestamp(&self) -> DateTime<Utc> {
            self.created
        }
    }

    struct StubFactory;

    impl MessageFactory for StubFactory {
        type Message = StubMessage;

        fn create(&self, key: &str, _location: &Path, content: Option<&str>) -> StubMessage {
            let mut message = StubMessage::new(key);
            if content.is_some() {
                message.loaded = true;
            }
            message
        }
    }

    fn corpus(cache_size: usize) -> Corpus<StubFactory> {
        Corpus::new(StubFactory, "", cache_size)
    }

    struct FailingListener;

    impl CorpusListener<StubMessage> for FailingListener {
        fn on_add_message(
            &self,
            _message: &StubMessage,
            _flags: u32,
        ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Err("add listener failed".into())
        }

        fn on_remove_message(
            &self,
            _message: &StubMessage,
            _flags: u32,
        ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            Err("remove listener failed".into())
        }
    }

    #[test]
    fn test_new_corpus_is_empty() {
        let corpus = corpus(100);
        assert!(corpus.is_empty());
        assert_eq!(corpus.len(), 0);
        assert_eq!(corpus.cache_size(), 100);
        assert_eq!(corpus.stats().resident, 0);
    }

    #[test]
    fn test_get_unknown_key_returns_none() {
        let mut corpus = corpus(100);
        assert!(corpus.get("missing").is_none());
        assert_eq!(corpus.stats().misses, 1);
    }

    #[test]
    fn test_add_then_get() {
        let mut corpus = corpus(100);
        corpus.add_message(StubMessage::new("a"), 0).unwrap();
        let fetched = corpus.get("a").unwrap();
        assert_eq!(fetched.key(), "a");
        assert!(fetched.stored);
        assert_eq!(corpus.stats().hits, 1);
    }

    #[test]
    fn test_remove_makes_key_absent() {
        let mut corpus = corpus(100);
        corpus.add_message(StubMessage::new("a"), 0).unwrap();
        let removed = corpus.remove_message("a", 0).unwrap();
        assert!(removed.is_some());
        assert!(corpus.get("a").is_none());
        assert!(!corpus.contains_key("a"));
    }

    #[test]
    fn test_remove_unknown_key_is_noop() {
        let mut corpus = corpus(100);
        assert!(corpus.remove_message("ghost", 0).unwrap().is_none());
    }

    #[test]
    fn test_remove_never_resident_key() {
        let mut corpus = corpus(100);
        corpus.register_key("cold");
        assert!(corpus.remove_message("cold", 0).unwrap().is_some());
        assert!(corpus.get("cold").is_none());
    }

    #[test]
    fn test_fifo_eviction_at_capacity() {
        let mut corpus = corpus(2);
        corpus.cache_message(StubMessage::new("a"));
        corpus.cache_message(StubMessage::new("b"));
        corpus.cache_message(StubMessage::new("c"));

        let stats = corpus.stats();
        assert_eq!(stats.resident, 2);
        assert_eq!(stats.known, 3);
        assert!(matches!(corpus.entries.get("a"), Some(Residency::Known)));
        assert!(matches!(
            corpus.entries.get("b"),
            Some(Residency::Resident(_))
        ));
        assert!(matches!(
            corpus.entries.get("c"),
            Some(Residency::Resident(_))
        ));
    }

    #[test]
    fn test_eviction_keeps_key_fetchable() {
        let mut corpus = corpus(1);
        corpus.add_message(StubMessage::new("0"), 0).unwrap();
        corpus.add_message(StubMessage::new("1"), 0).unwrap();

        // "0" fell out of residency but is reconstructed on demand.
        assert_eq!(corpus.stats().resident, 1);
        assert!(corpus.get("0").is_some());
        assert_eq!(corpus.stats().resident, 1);
    }

    #[test]
    fn test_recaching_resident_key_does_not_duplicate() {
        let mut corpus = corpus(2);
        corpus.cache_message(StubMessage::new("a"));
        corpus.cache_message(StubMessage::new("a"));
        assert_eq!(corpus.stats().resident, 1);
        assert_eq!(corpus.len(), 1);
    }

    #[test]
    fn test_zero_cache_size_is_unbounded() {
        let mut corpus = corpus(0);
        for i in 0..50 {
            corpus.cache_message(StubMessage::new(&i.to_string()));
        }
        assert_eq!(corpus.stats().resident, 50);
    }

    #[test]
    fn test_keys_in_insertion_order() {
        let mut corpus = corpus(100);
        for key in ["b", "a", "c"] {
            corpus.add_message(StubMessage::new(key), 0).unwrap();
        }
        let keys: Vec<&str> = corpus.keys().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_keys_survive_eviction() {
        let mut corpus = corpus(1);
        corpus.add_message(StubMessage::new("a"), 0).unwrap();
        corpus.add_message(StubMessage::new("b"), 0).unwrap();
        let keys: Vec<&str> = corpus.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_take_message_moves_between_corpora() {
        let mut source = corpus(100);
        let mut destination = corpus(100);
        source.add_message(StubMessage::new("m"), 0).unwrap();

        assert!(destination.take_message("m", &mut source, 0).unwrap());
        assert!(source.get("m").is_none());
        let moved = destination.get("m").unwrap();
        assert!(moved.is_loaded());
    }

    #[test]
    fn test_take_message_unknown_key() {
        let mut source = corpus(100);
        let mut destination = corpus(100);
        assert!(!destination.take_message("m", &mut source, 0).unwrap());
    }

    #[test]
    fn test_listener_error_propagates_from_add() {
        let mut corpus = corpus(100);
        corpus.add_listener(Box::new(FailingListener));
        let err = corpus.add_message(StubMessage::new("a"), 7).unwrap_err();
        assert!(matches!(err, CorpusError::Listener(_)));
        // The write and index update already happened.
        assert!(corpus.contains_key("a"));
    }

    #[test]
    fn test_listener_error_propagates_from_remove() {
        let mut corpus = corpus(100);
        corpus.add_message(StubMessage::new("a"), 0).unwrap();
        corpus.add_listener(Box::new(FailingListener));
        let err = corpus.remove_message("a", 0).unwrap_err();
        assert!(matches!(err, CorpusError::Listener(_)));
        // The delete and index removal already happened.
        assert!(!corpus.contains_key("a"));
    }

    #[test]
    fn test_register_key_is_idempotent() {
        let mut corpus = corpus(100);
        corpus.register_key("a");
        corpus.register_key("a");
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.stats().resident, 0);
    }

    #[test]
    fn test_get_materializes_registered_key() {
        let mut corpus = corpus(100);
        corpus.register_key("a");
        let message = corpus.get("a").unwrap();
        assert_eq!(message.key(), "a");
        assert!(!message.is_loaded());
        assert_eq!(corpus.stats().resident, 1);
    }
}
