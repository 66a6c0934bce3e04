//! I/O: the object store seam, the worker pool and everything that touches
//! files or the network.

mod download;
mod enumerate;
mod lister;
mod manager;
mod memory;
mod progress;
mod session;
mod store;
mod upload;

pub use enumerate::FolderEnumerator;
pub use lister::PaginatedLister;
pub use manager::TransferManager;
pub use memory::MemoryStore;
pub use progress::{ChannelObserver, ProgressAggregator, ProgressTracker, progress_channel};
pub use session::Session;
pub use store::{BoxStream, ByteStream, CompletedPart, ListPage, ObjectStore, ProgressHook, noop_hook, observe};
