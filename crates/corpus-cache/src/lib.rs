//! Bounded, observable cache of keyed training messages
//!
//! A `Corpus` presents a uniform view over messages that physically live in
//! some backing store. It owns the full key space, keeps a FIFO-bounded
//! subset of messages resident in memory, and notifies registered listeners
//! on every add and remove. Storage is pluggable through the `Message` and
//! `MessageFactory` traits; `ExpiryPolicy` layers time-based removal on top
//! of any corpus.
//!
//! Corpora are single-writer: mutating operations take `&mut self` and there
//! is no internal locking, so cross-thread sharing is the caller's problem.

pub mod corpus;
pub mod error;
pub mod expiry;
pub mod message;
pub mod types;

pub use corpus::{Corpus, Residency};
pub use error::{CorpusError, Result};
pub use expiry::ExpiryPolicy;
pub use message::{CorpusListener, Message, MessageFactory};
pub use types::CorpusStats;
