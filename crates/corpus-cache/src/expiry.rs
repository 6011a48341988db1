//! Time-based expiry over a corpus
//!
//! Kept as a capability composed with a corpus rather than a corpus
//! subtype; any corpus can be swept by any policy through the public
//! contract.

use crate::corpus::Corpus;
use crate::error::{CorpusError, Result};
use crate::message::{Message, MessageFactory};
use chrono::{TimeDelta, Utc};
use tracing::{debug, info};

/// Removes messages whose age meets or exceeds a threshold.
#[derive(Debug, Clone)]
pub struct ExpiryPolicy {
    max_age: TimeDelta,
}

impl ExpiryPolicy {
    pub fn new(max_age: TimeDelta) -> Self {
        Self { max_age }
    }

    pub fn max_age(&self) -> TimeDelta {
        self.max_age
    }

    /// Sweep the corpus, removing every message at least `max_age` old.
    ///
    /// Each known key is fetched and loaded in turn, so the sweep itself
    /// cycles messages through residency and may evict unrelated residents
    /// along the way. Keys whose resource vanishes mid-scan are skipped
    /// and left known; expiry removes a message from the corpus entirely,
    /// backing resource included. Returns the removed keys.
    pub fn remove_expired_messages<F: MessageFactory>(
        &self,
        corpus: &mut Corpus<F>,
        flags: u32,
    ) -> Result<Vec<String>> {
        let keys: Vec<String> = corpus.keys().map(str::to_string).collect();
        let mut removed = Vec::new();

        for key in keys {
            let timestamp = match corpus.get(&key) {
                None => continue,
                Some(message) => match message.load() {
                    Ok(()) => message.create_timestamp(),
                    Err(CorpusError::Io(err))
                        if err.kind() == std::io::ErrorKind::NotFound =>
                    {
                        // Half-deleted message: its resource vanished after
                        // the corpus was opened. Leave the key alone and
                        // keep scanning.
                        debug!(key = %key, "message resource gone mid-scan, skipping");
                        continue;
                    }
                    Err(err) => return Err(err),
                },
            };
            let age = Utc::now().signed_duration_since(timestamp);
            if age >= self.max_age {
                debug!(key = %key, age_secs = age.num_seconds(), "expiring message");
                corpus.remove_message(&key, flags)?;
                removed.push(key);
            }
        }

        if !removed.is_empty() {
            info!(count = removed.len(), "expired messages removed from corpus");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::path::Path;

    struct TimedMessage {
        key: String,
        created: DateTime<Utc>,
        loaded: bool,
        vanished: bool,
    }

    impl Message for TimedMessage {
        fn key(&self) -> &str {
            &self.key
        }

        fn is_loaded(&self) -> bool {
            self.loaded
        }

        fn load(&mut self) -> crate::error::Result<()> {
            if self.vanished {
                return Err(CorpusError::Io(std::io::Error::from(
                    std::io::ErrorKind::NotFound,
                )));
            }
            self.loaded = true;
            Ok(())
        }

        fn store(&mut self) -> crate::error::Result<()> {
            Ok(())
        }

        fn remove(&mut self) -> crate::error::Result<()> {
            Ok(())
        }

        fn create_timestamp(&self) -> DateTime<Utc> {
            self.created
        }
    }

    struct TimedFactory;

    impl MessageFactory for TimedFactory {
        type Message = TimedMessage;

        fn create(&self, key: &str, _location: &Path, content: Option<&str>) -> TimedMessage {
            TimedMessage {
                key: key.to_string(),
                created: Utc::now(),
                loaded: content.is_some(),
                vanished: false,
            }
        }
    }

    fn message(key: &str, age: TimeDelta) -> TimedMessage {
        TimedMessage {
            key: key.to_string(),
            created: Utc::now() - age,
            loaded: false,
            vanished: false,
        }
    }

    #[test]
    fn test_removes_only_messages_over_threshold() {
        let mut corpus = Corpus::new(TimedFactory, "", 100);
        corpus
            .add_message(message("old-a", TimeDelta::hours(2)), 0)
            .unwrap();
        corpus
            .add_message(message("old-b", TimeDelta::hours(3)), 0)
            .unwrap();
        corpus
            .add_message(message("young-c", TimeDelta::zero()), 0)
            .unwrap();
        corpus
            .add_message(message("young-d", TimeDelta::zero()), 0)
            .unwrap();

        let policy = ExpiryPolicy::new(TimeDelta::hours(1));
        let removed = policy.remove_expired_messages(&mut corpus, 0).unwrap();

        assert_eq!(removed, vec!["old-a".to_string(), "old-b".to_string()]);
        assert!(!corpus.contains_key("old-a"));
        assert!(!corpus.contains_key("old-b"));
        assert!(corpus.get("young-c").is_some());
        assert!(corpus.get("young-d").is_some());
    }

    #[test]
    fn test_sweep_skips_vanished_message() {
        let mut corpus = Corpus::new(TimedFactory, "", 100);
        corpus
            .add_message(
                TimedMessage {
                    key: "gone".to_string(),
                    created: Utc::now() - TimeDelta::hours(2),
                    loaded: false,
                    vanished: true,
                },
                0,
            )
            .unwrap();
        corpus
            .add_message(message("old", TimeDelta::hours(2)), 0)
            .unwrap();

        let policy = ExpiryPolicy::new(TimeDelta::hours(1));
        let removed = policy.remove_expired_messages(&mut corpus, 0).unwrap();

        // The half-deleted message is left alone; the scan still reaches
        // everything after it.
        assert_eq!(removed, vec!["old".to_string()]);
        assert!(corpus.contains_key("gone"));
    }

    #[test]
    fn test_empty_corpus_sweep() {
        let mut corpus = Corpus::new(TimedFactory, "", 100);
        let policy = ExpiryPolicy::new(TimeDelta::minutes(5));
        assert!(policy
            .remove_expired_messages(&mut corpus, 0)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_sweep_loads_survivors() {
        let mut corpus = Corpus::new(TimedFactory, "", 100);
        corpus
            .add_message(message("keep", TimeDelta::zero()), 0)
            .unwrap();

        let policy = ExpiryPolicy::new(TimeDelta::days(1));
        policy.remove_expired_messages(&mut corpus, 0).unwrap();

        assert!(corpus.get("keep").unwrap().is_loaded());
    }

    #[test]
    fn test_max_age_accessor() {
        let policy = ExpiryPolicy::new(TimeDelta::seconds(30));
        assert_eq!(policy.max_age(), TimeDelta::seconds(30));
    }
}
