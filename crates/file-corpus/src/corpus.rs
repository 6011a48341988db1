//! Directory-backed corpus
//!
//! A `FileCorpus` is a bounded corpus whose key space is one directory,
//! scoped by a glob filter. The directory listing taken at construction is
//! the index: files that appear or disappear through other channels
//! afterward are never observed, so a directory managed by a `FileCorpus`
//! should be managed only through it.

use crate::error::{FileCorpusError, Result};
use crate::filter::KeyFilter;
use crate::message::FileMessage;
use corpus_cache::{Corpus, CorpusListener, CorpusStats, ExpiryPolicy, MessageFactory};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Corpus of message files in a single directory.
pub struct FileCorpus<F: MessageFactory<Message = FileMessage>> {
    corpus: Corpus<F>,
    directory: PathBuf,
    filter: KeyFilter,
}

impl<F: MessageFactory<Message = FileMessage>> FileCorpus<F> {
    /// Open a corpus over an existing directory.
    ///
    /// Every current entry matching the filter becomes a known,
    /// non-resident key. The directory must already exist; creating it
    /// here would mask path misconfiguration.
    pub fn new(
        factory: F,
        directory: impl Into<PathBuf>,
        filter: KeyFilter,
        cache_size: usize,
    ) -> Result<Self> {
        let directory = directory.into();
        let mut corpus = Corpus::new(factory, directory.clone(), cache_size);

        let mut names = Vec::new();
        for entry in fs::read_dir(&directory)? {
            let entry = entry?;
            match entry.file_name().into_string() {
                Ok(name) => {
                    if filter.matches(&name) {
                        names.push(name);
                    }
                }
                Err(name) => {
                    warn!(name = ?name, "skipping non-UTF-8 filename in corpus directory");
                }
            }
        }
        // read_dir order is platform-dependent; sort for a stable index.
        names.sort();
        for name in names {
            corpus.register_key(name);
        }

        info!(
            directory = %directory.display(),
            filter = filter.pattern(),
            keys = corpus.len(),
            "opened file corpus"
        );
        Ok(Self {
            corpus,
            directory,
            filter,
        })
    }

    /// Fetch a message by key, materializing it from the directory binding
    /// when it is not resident. Unknown keys return `None`.
    pub fn get(&mut self, key: &str) -> Option<&mut FileMessage> {
        self.corpus.get(key)
    }

    /// Persist a message into this corpus.
    ///
    /// The key is checked against the filter before any I/O; a mismatch is
    /// an `InvalidKey` error and nothing is written. Accepted messages are
    /// rebound to this corpus's directory, stored, indexed, and announced
    /// to listeners.
    pub fn add_message(&mut self, mut message: FileMessage, flags: u32) -> Result<()> {
        let key = corpus_cache::Message::key(&message);
        if !self.filter.matches(key) {
            return Err(FileCorpusError::InvalidKey {
                key: key.to_string(),
                pattern: self.filter.pattern().to_string(),
            });
        }
        message.set_directory(&self.directory);
        self.corpus.add_message(message, flags)?;
        Ok(())
    }

    /// Delete a message's file and forget the key. Unknown keys are a
    /// no-op returning `Ok(None)`.
    pub fn remove_message(&mut self, key: &str, flags: u32) -> Result<Option<FileMessage>> {
        Ok(self.corpus.remove_message(key, flags)?)
    }

    /// Relocate a message from another file corpus into this one.
    ///
    /// The message is loaded, its file deleted from the source directory,
    /// and a fresh copy written under this corpus's directory. The key is
    /// checked against this corpus's filter up front, before the source is
    /// touched, so a rejected key cannot lose its backing file.
    pub fn take_message<S>(
        &mut self,
        key: &str,
        source: &mut FileCorpus<S>,
        flags: u32,
    ) -> Result<bool>
    where
        S: MessageFactory<Message = FileMessage>,
    {
        if !self.filter.matches(key) {
            return Err(FileCorpusError::InvalidKey {
                key: key.to_string(),
                pattern: self.filter.pattern().to_string(),
            });
        }
        match source.get(key) {
            None => return Ok(false),
            Some(message) => corpus_cache::Message::load(message)?,
        }
        let message = match source.remove_message(key, flags)? {
            None => return Ok(false),
            Some(message) => message,
        };
        self.add_message(message, flags)?;
        Ok(true)
    }

    /// Sweep this corpus with an expiry policy, removing every message at
    /// least `max_age` old along with its file.
    pub fn remove_expired_messages(
        &mut self,
        policy: &ExpiryPolicy,
        flags: u32,
    ) -> Result<Vec<String>> {
        Ok(policy.remove_expired_messages(&mut self.corpus, flags)?)
    }

    /// Build a message bound to this corpus's directory without
    /// registering it.
    pub fn make_message(&self, key: &str, content: Option<&str>) -> FileMessage {
        self.corpus.make_message(key, content)
    }

    /// All known keys, insertion-ordered (directory scan order first, then
    /// add order).
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.corpus.keys()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.corpus.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.corpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corpus.is_empty()
    }

    pub fn add_listener(&mut self, listener: Box<dyn CorpusListener<FileMessage>>) {
        self.corpus.add_listener(listener);
    }

    pub fn stats(&self) -> CorpusStats {
        self.corpus.stats()
    }

    pub fn cache_size(&self) -> usize {
        self.corpus.cache_size()
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn filter(&self) -> &KeyFilter {
        &self.filter
    }
}
