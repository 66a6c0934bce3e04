//! Immutable data types for transfer operations.
//!
//! Items, batches, results, options and progress events. Nothing in here
//! performs I/O.

pub mod item;
pub mod options;
pub mod progress;
pub mod report;

pub use item::{
    Direction, ItemStatus, RemoteObject, TransferBatch, TransferFailure, TransferItem,
    TransferOutcome, TransferResult,
};
pub use options::{
    DEFAULT_CONCURRENCY, DEFAULT_MULTIPART_THRESHOLD, DEFAULT_PART_CONCURRENCY, DEFAULT_PART_SIZE,
    DEFAULT_STORAGE_CLASS, MIB, PutOptions, TransferOptions,
};
pub use progress::{Progress, ProgressObserver};
pub use report::BatchReport;
