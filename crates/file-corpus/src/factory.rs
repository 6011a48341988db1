//! Message factories
//!
//! Two variants, one per storage format. Either way the created message is
//! only a binding; nothing is written until the corpus stores it.

use crate::message::{FileMessage, StorageFormat};
use corpus_cache::MessageFactory;
use std::path::Path;

/// Creates messages that store themselves as plain text.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileMessageFactory;

impl MessageFactory for FileMessageFactory {
    type Message = FileMessage;

    fn create(&self, key: &str, location: &Path, content: Option<&str>) -> FileMessage {
        match content {
            Some(content) => {
                FileMessage::with_content(key, location, StorageFormat::Plain, content)
            }
            None => FileMessage::new(key, location, StorageFormat::Plain),
        }
    }
}

/// Creates messages that store themselves gzip-compressed.
#[derive(Debug, Default, Clone, Copy)]
pub struct GzipFileMessageFactory;

impl MessageFactory for GzipFileMessageFactory {
    type Message = FileMessage;

    fn create(&self, key: &str, location: &Path, content: Option<&str>) -> FileMessage {
        match content {
            Some(content) => {
                FileMessage::with_content(key, location, StorageFormat::Gzip, content)
            }
            None => FileMessage::new(key, location, StorageFormat::Gzip),
        }
    }
}
