use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};

use crate::core::DEFAULT_MAX_PARTS;
use crate::data::{PutOptions, RemoteObject};
use crate::error::Result;

/// A boxed stream type for object bodies and listings.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// An object body, streamed in chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Called with the byte count of every chunk sent or received.
pub type ProgressHook = Arc<dyn Fn(u64) + Send + Sync>;

/// A hook that discards progress.
pub fn noop_hook() -> ProgressHook { Arc::new(|_| {}) }

/// Reports the length of every successful chunk to `progress` as the stream
/// is consumed.
pub fn observe(body: ByteStream, progress: ProgressHook) -> ByteStream {
    Box::pin(body.inspect(move |chunk| {
        if let Ok(chunk) = chunk {
            progress(chunk.len() as u64);
        }
    }))
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPage {
    pub objects:    Vec<RemoteObject>,
    /// Token for the next page; `None` on the last page.
    pub next_token: Option<String>,
}

/// Receipt for one uploaded part, handed back on completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    pub number: u32,
    pub etag:   String,
}

/// Key-addressed blob store holding one bucket.
///
/// Every operation may be called concurrently from any number of tasks.
/// Implementations map their own failures to
/// [`Error::Backend`](crate::Error::Backend); errors yielded by a body
/// stream passed to `put` or `upload_part` are returned unchanged.
///
/// # Implementations
///
/// - [`MemoryStore`](crate::MemoryStore): in-process store for tests and dry runs
/// - `ferry_s3::S3Store`: S3-compatible services over HTTP
pub trait ObjectStore: Send + Sync + 'static {
    /// Smallest size accepted for every multipart part but the last.
    const MIN_PART_SIZE: u64 = 1;

    /// Most parts a single multipart upload may have.
    const MAX_PARTS: u32 = DEFAULT_MAX_PARTS;

    /// Store `body` under `key`. `progress` is invoked as bytes are sent.
    fn put(
        &self,
        key: &str,
        body: ByteStream,
        size_hint: u64,
        options: &PutOptions,
        progress: ProgressHook,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Open the body of `key`. `progress` is invoked as the returned stream
    /// is consumed.
    fn get(&self, key: &str, progress: ProgressHook) -> impl Future<Output = Result<ByteStream>> + Send;

    /// Open `len` bytes of `key` starting at `offset`.
    fn get_range(
        &self,
        key: &str,
        offset: u64,
        len: u64,
        progress: ProgressHook,
    ) -> impl Future<Output = Result<ByteStream>> + Send;

    fn delete(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    /// Fetch one page of objects whose keys start with `prefix`, in key
    /// order, resuming after `continuation` when given.
    fn list_page(&self, prefix: &str, continuation: Option<&str>) -> impl Future<Output = Result<ListPage>> + Send;

    /// A credential-free URL granting read access to `key` for `ttl`.
    fn presign(&self, key: &str, ttl: Duration) -> Result<String>;

    /// The unsigned URL of `key`.
    fn object_url(&self, key: &str) -> String;

    /// Start a multipart upload and return its upload id.
    fn create_multipart(&self, key: &str, options: &PutOptions) -> impl Future<Output = Result<String>> + Send;

    fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: ByteStream,
        len: u64,
        progress: ProgressHook,
    ) -> impl Future<Output = Result<CompletedPart>> + Send;

    /// Assemble the object from `parts`, which must be sorted by number.
    fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> impl Future<Output = Result<()>> + Send;

    /// Discard an unfinished upload and every part stored for it.
    fn abort_multipart(&self, key: &str, upload_id: &str) -> impl Future<Output = Result<()>> + Send;
}
