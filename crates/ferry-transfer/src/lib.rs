//! Concurrent bulk transfer between a local filesystem and object storage.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Items, batches, options, results and progress events
//! - [`core`] - Pure transformations: key mapping, part planning, filtering
//! - [`effects`] - I/O behind the [`ObjectStore`] trait
//!
//! # Key Features
//!
//! - **Bounded**: a fixed pool of workers per batch, however many items it holds
//! - **Isolated failures**: one item failing never stops its siblings
//! - **Ordered results**: one [`TransferResult`] per item, in input order
//! - **Multipart**: large objects move as concurrent parts in both directions
//! - **Staged downloads**: nothing appears at a destination until it is complete

pub mod core;
pub mod data;
pub mod effects;
mod error;

pub use self::core::{DEFAULT_MAX_PARTS, ObjectFilter, Part, file_name_key, normalize_prefix, plan_parts, to_local_path, to_remote_key};
pub use data::{
    BatchReport, DEFAULT_CONCURRENCY, DEFAULT_MULTIPART_THRESHOLD, DEFAULT_PART_CONCURRENCY, DEFAULT_PART_SIZE,
    DEFAULT_STORAGE_CLASS, Direction, ItemStatus, MIB, Progress, ProgressObserver, PutOptions, RemoteObject,
    TransferBatch, TransferFailure, TransferItem, TransferOptions, TransferOutcome, TransferResult,
};
pub use effects::{
    BoxStream, ByteStream, ChannelObserver, CompletedPart, FolderEnumerator, ListPage, MemoryStore, ObjectStore,
    PaginatedLister, ProgressAggregator, ProgressHook, ProgressTracker, Session, TransferManager, noop_hook, observe,
    progress_channel,
};
pub use error::{Error, ErrorKind, Result};
