//! Directory-backed message corpus with transparent gzip support
//!
//! The concrete realization of `corpus-cache` for classifier training data
//! that lives as files: one file per message, filename as key, content
//! either plain UTF-8 or a gzip stream of the same text. There is no index
//! or manifest file; the directory listing at construction time is the
//! index.
//!
//! # Example
//!
//! ```no_run
//! use file_corpus::{FileCorpus, FileMessageFactory, KeyFilter};
//!
//! # fn example() -> Result<(), file_corpus::FileCorpusError> {
//! let mut ham = FileCorpus::new(
//!     FileMessageFactory,
//!     "training/ham",
//!     KeyFilter::new("ham*")?,
//!     250,
//! )?;
//!
//! let message = ham.make_message("ham001", Some("Subject: hi\n\nhello\n"));
//! ham.add_message(message, 0)?;
//! # Ok(())
//! # }
//! ```

pub mod corpus;
pub mod error;
pub mod factory;
pub mod filter;
pub mod message;

pub use corpus::FileCorpus;
pub use error::{FileCorpusError, Result};
pub use factory::{FileMessageFactory, GzipFileMessageFactory};
pub use filter::KeyFilter;
pub use message::{FileMessage, StorageFormat};
