use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

pub const MIB: u64 = 1024 * 1024;

/// Simultaneous item transfers per batch.
pub const DEFAULT_CONCURRENCY: usize = 5;
/// Objects at or above this size move in parts.
pub const DEFAULT_MULTIPART_THRESHOLD: u64 = 50 * MIB;
pub const DEFAULT_PART_SIZE: u64 = 50 * MIB;
/// Simultaneous parts per multipart object.
pub const DEFAULT_PART_CONCURRENCY: usize = 10;
pub const DEFAULT_STORAGE_CLASS: &str = "STANDARD";

/// Tuning for [`TransferManager`](crate::TransferManager) and
/// [`Session`](crate::Session).
///
/// # Examples
///
/// ```
/// use ferry_transfer::{TransferOptions, MIB};
///
/// let options = TransferOptions::default()
///     .concurrency(32)
///     .multipart_threshold(100 * MIB)
///     .part_size(16 * MIB);
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransferOptions {
    /// Upper bound on items in flight at once, regardless of batch length.
    pub concurrency: usize,

    /// Size at which an object switches from a single request to parts.
    pub multipart_threshold: u64,

    /// Size of every part except possibly the last.
    pub part_size: u64,

    /// Upper bound on parts in flight for one object. This bound is per
    /// object and applies inside each worker slot.
    pub part_concurrency: usize,

    /// Storage class hint passed with every upload.
    pub storage_class: String,

    /// Checked before each item starts. Items not yet started when it fires
    /// fail with [`ErrorKind::Cancelled`](crate::ErrorKind::Cancelled).
    #[serde(skip)]
    pub cancel: Option<CancellationToken>,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            concurrency:         DEFAULT_CONCURRENCY,
            multipart_threshold: DEFAULT_MULTIPART_THRESHOLD,
            part_size:           DEFAULT_PART_SIZE,
            part_concurrency:    DEFAULT_PART_CONCURRENCY,
            storage_class:       DEFAULT_STORAGE_CLASS.to_string(),
            cancel:              None,
        }
    }
}

impl TransferOptions {
    #[must_use]
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    #[must_use]
    pub fn multipart_threshold(mut self, threshold: u64) -> Self {
        self.multipart_threshold = threshold;
        self
    }

    #[must_use]
    pub fn part_size(mut self, part_size: u64) -> Self {
        self.part_size = part_size;
        self
    }

    #[must_use]
    pub fn part_concurrency(mut self, part_concurrency: usize) -> Self {
        self.part_concurrency = part_concurrency;
        self
    }

    #[must_use]
    pub fn storage_class(mut self, storage_class: impl Into<String>) -> Self {
        self.storage_class = storage_class.into();
        self
    }

    #[must_use]
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::Config("concurrency must be at least 1".into()));
        }
        if self.part_size == 0 {
            return Err(Error::Config("part size must be greater than 0".into()));
        }
        if self.part_concurrency == 0 {
            return Err(Error::Config("part concurrency must be at least 1".into()));
        }
        Ok(())
    }

    pub fn is_cancelled(&self) -> bool { self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) }

    /// Whether an object of `size` bytes moves in parts.
    pub fn uses_multipart(&self, size: u64) -> bool { size > 0 && size >= self.multipart_threshold }

    pub fn put_options(&self) -> PutOptions {
        PutOptions {
            storage_class: self.storage_class.clone(),
        }
    }
}

/// Per-object hints passed to [`ObjectStore::put`](crate::ObjectStore::put)
/// and multipart initiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOptions {
    pub storage_class: String,
}

impl Default for PutOptions {
    fn default() -> Self {
        Self {
            storage_class: DEFAULT_STORAGE_CLASS.to_string(),
        }
    }
}
