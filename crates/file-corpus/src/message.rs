//! File-backed messages
//!
//! One message is one file inside the corpus directory; the filename is the
//! key and the content is the message text, stored either plain or as a
//! gzip stream. Directories routinely hold a historical mixture of both
//! (typically after a format migration), so loading sniffs the format while
//! only storing consults the message's designated format.

use chrono::{DateTime, Utc};
use corpus_cache::{CorpusError, Message, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// How a message writes itself to disk. Loading accepts either format
/// regardless of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageFormat {
    Plain,
    Gzip,
}

/// A training message persisted as a file.
#[derive(Debug)]
pub struct FileMessage {
    key: String,
    directory: PathBuf,
    format: StorageFormat,
    payload: Option<String>,
    loaded: bool,
}

impl FileMessage {
    /// Bind to an existing file without reading it; the payload is fetched
    /// on first `load()`.
    pub fn new(key: impl Into<String>, directory: impl Into<PathBuf>, format: StorageFormat) -> Self {
        Self {
            key: key.into(),
            directory: directory.into(),
            format,
            payload: None,
            loaded: false,
        }
    }

    /// Create a message whose content is already in hand. Nothing is
    /// written until `store()`.
    pub fn with_content(
        key: impl Into<String>,
        directory: impl Into<PathBuf>,
        format: StorageFormat,
        content: &str,
    ) -> Self {
        Self {
            key: key.into(),
            directory: directory.into(),
            format,
            payload: Some(content.to_string()),
            loaded: true,
        }
    }

    /// Path of the backing file: directory joined with the key.
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.key)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Rebind the message to another directory, for migration between
    /// corpora. The next `store()` writes to the new location.
    pub fn set_directory(&mut self, directory: impl Into<PathBuf>) {
        self.directory = directory.into();
    }

    pub fn format(&self) -> StorageFormat {
        self.format
    }

    /// The full message text, loading it on first access.
    ///
    /// With `include_envelope = false`, a leading mbox `"From "` separator
    /// line is omitted from the returned view.
    pub fn as_text(&mut self, include_envelope: bool) -> Result<&str> {
        self.load()?;
        let payload = match self.payload.as_deref() {
            Some(payload) => payload,
            None => return Err(CorpusError::MissingPayload(self.key.clone())),
        };
        if include_envelope {
            Ok(payload)
        } else {
            Ok(strip_envelope(payload))
        }
    }

    /// Look up a header in the message's header block, loading the payload
    /// if necessary. Matching is case-insensitive; continuation lines are
    /// not folded.
    pub fn header(&mut self, name: &str) -> Result<Option<&str>> {
        self.load()?;
        let block = header_block(self.payload.as_deref().unwrap_or(""));
        Ok(block.lines().find_map(|line| {
            let (header, value) = line.split_once(':')?;
            header
                .eq_ignore_ascii_case(name)
                .then(|| value.trim_start())
        }))
    }

    /// Set or replace a header in the message's header block.
    ///
    /// Only the in-memory payload changes; persisting the edit is the
    /// caller's job via `store()`.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        self.load()?;
        let payload = match self.payload.take() {
            Some(payload) => payload,
            None => return Err(CorpusError::MissingPayload(self.key.clone())),
        };

        let (head, body) = match payload.split_once("\n\n") {
            Some((head, body)) => (head, Some(body)),
            None => (payload.as_str(), None),
        };

        let mut lines: Vec<String> = Vec::new();
        let mut replaced = false;
        for line in head.lines() {
            match line.split_once(':') {
                Some((header, _)) if header.eq_ignore_ascii_case(name) => {
                    lines.push(format!("{}: {}", name, value));
                    replaced = true;
                }
                _ => lines.push(line.to_string()),
            }
        }
        if !replaced {
            lines.push(format!("{}: {}", name, value));
        }

        let head = lines.join("\n");
        let rebuilt = match body {
            Some(body) => format!("{}\n\n{}", head, body),
            None => head,
        };
        self.payload = Some(rebuilt);
        Ok(())
    }

    /// Iterate the `(name, value)` pairs of the header block. Yields
    /// nothing while the message is unloaded.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        header_block(self.payload.as_deref().unwrap_or(""))
            .lines()
            .filter_map(|line| {
                let (header, value) = line.split_once(':')?;
                Some((header, value.trim_start()))
            })
    }
}

impl Message for FileMessage {
    fn key(&self) -> &str {
        &self.key
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Read the file, sniffing the storage format.
    ///
    /// A gzip magic prefix means the stream is decompressed and any
    /// decompression failure propagates; anything else is read as plain
    /// UTF-8 text. A missing file is an error here, unlike at `remove()`.
    fn load(&mut self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }

        let path = self.path();
        debug!(key = %self.key, path = %path.display(), "loading message");
        let bytes = fs::read(&path)?;

        let text = if bytes.starts_with(&GZIP_MAGIC) {
            let mut text = String::new();
            GzDecoder::new(bytes.as_slice()).read_to_string(&mut text)?;
            text
        } else {
            String::from_utf8(bytes).map_err(|err| {
                CorpusError::Decode(format!("message '{}' is not valid UTF-8: {}", self.key, err))
            })?
        };

        self.payload = Some(text);
        self.loaded = true;
        Ok(())
    }

    /// Write the payload in the message's designated format, overwriting
    /// any existing file at this key.
    fn store(&mut self) -> Result<()> {
        let payload = match self.payload.as_deref() {
            Some(payload) => payload,
            None => return Err(CorpusError::MissingPayload(self.key.clone())),
        };

        let path = self.path();
        debug!(key = %self.key, path = %path.display(), "storing message");
        match self.format {
            StorageFormat::Plain => fs::write(&path, payload)?,
            StorageFormat::Gzip => {
                let file = fs::File::create(&path)?;
                let mut encoder = GzEncoder::new(file, Compression::default());
                encoder.write_all(payload.as_bytes())?;
                encoder.finish()?;
            }
        }
        Ok(())
    }

    /// Delete the backing file. A file that is already gone is fine;
    /// another process may have cleaned it up first.
    fn remove(&mut self) -> Result<()> {
        let path = self.path();
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(key = %self.key, path = %path.display(), "deleted message file");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(key = %self.key, "message file already gone");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Creation time of the backing file, per filesystem metadata.
    ///
    /// Falls back to the modification time where the filesystem does not
    /// track creation, and to the current time when the file is missing.
    fn create_timestamp(&self) -> DateTime<Utc> {
        fs::metadata(self.path())
            .and_then(|meta| meta.created().or_else(|_| meta.modified()))
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now())
    }
}

fn strip_envelope(payload: &str) -> &str {
    if payload.starts_with("From ") {
        match payload.split_once('\n') {
            Some((_, rest)) => rest,
            None => "",
        }
    } else {
        payload
    }
}

fn header_block(payload: &str) -> &str {
    match payload.split_once("\n\n") {
        Some((head, _)) => head,
        None => payload,
    }
}
