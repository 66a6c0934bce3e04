use std::fmt;
use std::path::PathBuf;

use crate::error::{Error, ErrorKind};

/// Direction of a batch relative to the local filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Upload,
    Download,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Upload => write!(f, "upload"),
            Direction::Download => write!(f, "download"),
        }
    }
}

/// Lifecycle of a single [`TransferItem`].
///
/// `Pending -> InFlight -> Done | Failed`. Rejected items and items skipped
/// by cancellation go straight from `Pending` to `Failed`. There is no way back to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItemStatus {
    #[default]
    Pending,
    InFlight,
    Done,
    Failed,
}

impl ItemStatus {
    pub fn is_terminal(self) -> bool { matches!(self, ItemStatus::Done | ItemStatus::Failed) }
}

/// A remote object as reported by a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub key:  String,
    pub size: u64,
}

impl RemoteObject {
    pub fn new(key: impl Into<String>, size: u64) -> Self {
        Self {
            key: key.into(),
            size,
        }
    }
}

/// Why one item failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFailure {
    pub kind:    ErrorKind,
    pub message: String,
}

impl From<&Error> for TransferFailure {
    fn from(e: &Error) -> Self {
        Self {
            kind:    e.kind(),
            message: e.to_string(),
        }
    }
}

impl fmt::Display for TransferFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Public URL of the uploaded object, or the local path written.
    Success(String),
    Failure(TransferFailure),
}

/// Final result of one item, reported in batch input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    /// Remote key for uploads, local path for downloads.
    pub target:  String,
    pub outcome: TransferOutcome,
}

impl TransferResult {
    pub fn is_success(&self) -> bool { matches!(self.outcome, TransferOutcome::Success(_)) }

    pub fn failure(&self) -> Option<&TransferFailure> {
        match &self.outcome {
            TransferOutcome::Failure(f) => Some(f),
            TransferOutcome::Success(_) => None,
        }
    }
}

/// One object to move between `local_path` and `remote_key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferItem {
    pub local_path: PathBuf,
    pub remote_key: String,
    /// Size at enumeration time.
    pub size_bytes: u64,
    status:         ItemStatus,
    error:          Option<TransferFailure>,
}

impl TransferItem {
    pub fn new(local_path: impl Into<PathBuf>, remote_key: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            local_path: local_path.into(),
            remote_key: remote_key.into(),
            size_bytes,
            status: ItemStatus::Pending,
            error: None,
        }
    }

    /// An item that cannot be moved at all, such as a key that maps outside
    /// the local root. It stays in its batch and fails with `error` when the
    /// batch runs, without touching the store or the filesystem.
    pub fn rejected(local_path: impl Into<PathBuf>, remote_key: impl Into<String>, error: &Error) -> Self {
        Self {
            local_path: local_path.into(),
            remote_key: remote_key.into(),
            size_bytes: 0,
            status:     ItemStatus::Pending,
            error:      Some(TransferFailure::from(error)),
        }
    }

    pub fn status(&self) -> ItemStatus { self.status }

    pub fn error(&self) -> Option<&TransferFailure> { self.error.as_ref() }

    /// The name results are reported under for the given direction.
    pub fn target(&self, direction: Direction) -> String {
        match direction {
            Direction::Upload => self.remote_key.clone(),
            Direction::Download => self.local_path.display().to_string(),
        }
    }

    pub(crate) fn start(&mut self) {
        debug_assert_eq!(self.status, ItemStatus::Pending);
        self.status = ItemStatus::InFlight;
    }

    pub(crate) fn finish(&mut self, outcome: &TransferOutcome) {
        debug_assert!(!self.status.is_terminal());
        match outcome {
            TransferOutcome::Success(_) => self.status = ItemStatus::Done,
            TransferOutcome::Failure(failure) => {
                self.status = ItemStatus::Failed;
                self.error = Some(failure.clone());
            }
        }
    }
}

/// An ordered set of independent items sharing one concurrency bound and
/// one progress tracker.
#[derive(Debug, Clone, Default)]
pub struct TransferBatch {
    items:       Vec<TransferItem>,
    total_bytes: u64,
    concurrency: usize,
    label:       Option<String>,
}

impl TransferBatch {
    pub fn new(items: Vec<TransferItem>, concurrency: usize) -> Self {
        let total_bytes = items.iter().map(|i| i.size_bytes).sum();
        Self {
            items,
            total_bytes,
            concurrency,
            label: None,
        }
    }

    /// Names the batch in progress events.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn items(&self) -> &[TransferItem] { &self.items }

    pub fn total_bytes(&self) -> u64 { self.total_bytes }

    pub fn concurrency(&self) -> usize { self.concurrency }

    pub fn label(&self) -> Option<&str> { self.label.as_deref() }

    pub fn len(&self) -> usize { self.items.len() }

    /// An empty batch is a valid "nothing to do" outcome, not an error.
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn into_items(self) -> Vec<TransferItem> { self.items }
}
