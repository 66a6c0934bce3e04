//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ferry_transfer::{
    ByteStream, CompletedPart, Error, ListPage, MemoryStore, ObjectStore, ProgressHook, PutOptions, Result,
};

/// A [`MemoryStore`] that can fail chosen keys or listing pages, slow every
/// transfer down, and records how many transfers ran at once.
#[derive(Debug, Default)]
pub struct InstrumentedStore {
    pub inner:      MemoryStore,
    failing_keys:   HashSet<String>,
    fail_list_call: Option<usize>,
    delay:          Duration,
    list_calls:     AtomicUsize,
    in_flight:      AtomicUsize,
    max_in_flight:  AtomicUsize,
}

impl InstrumentedStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    pub fn failing(mut self, keys: &[&str]) -> Self {
        self.failing_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    /// Fail the `n`th call to `list_page` (0-based).
    pub fn failing_list_call(mut self, n: usize) -> Self {
        self.fail_list_call = Some(n);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn max_in_flight(&self) -> usize { self.max_in_flight.load(Ordering::SeqCst) }

    fn check(&self, op: &'static str, key: &str) -> Result<()> {
        if self.failing_keys.contains(key) {
            return Err(Error::backend(op, format!("InternalError: injected failure for {key}")));
        }
        Ok(())
    }

    async fn gauged<T>(&self, work: impl Future<Output = Result<T>>) -> Result<T> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let result = work.await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl ObjectStore for InstrumentedStore {
    async fn put(
        &self,
        key: &str,
        body: ByteStream,
        size_hint: u64,
        options: &PutOptions,
        progress: ProgressHook,
    ) -> Result<()> {
        self.gauged(async {
            self.check("put", key)?;
            self.inner.put(key, body, size_hint, options, progress).await
        })
        .await
    }

    async fn get(&self, key: &str, progress: ProgressHook) -> Result<ByteStream> {
        self.gauged(async {
            self.check("get", key)?;
            self.inner.get(key, progress).await
        })
        .await
    }

    async fn get_range(&self, key: &str, offset: u64, len: u64, progress: ProgressHook) -> Result<ByteStream> {
        self.check("get", key)?;
        self.inner.get_range(key, offset, len, progress).await
    }

    async fn delete(&self, key: &str) -> Result<()> { self.inner.delete(key).await }

    async fn list_page(&self, prefix: &str, continuation: Option<&str>) -> Result<ListPage> {
        let call = self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_list_call == Some(call) {
            return Err(Error::backend("list", "SlowDown: injected listing failure"));
        }
        self.inner.list_page(prefix, continuation).await
    }

    fn presign(&self, key: &str, ttl: Duration) -> Result<String> { self.inner.presign(key, ttl) }

    fn object_url(&self, key: &str) -> String { self.inner.object_url(key) }

    async fn create_multipart(&self, key: &str, options: &PutOptions) -> Result<String> {
        self.inner.create_multipart(key, options).await
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: ByteStream,
        len: u64,
        progress: ProgressHook,
    ) -> Result<CompletedPart> {
        self.check("upload part", key)?;
        self.inner.upload_part(key, upload_id, part_number, body, len, progress).await
    }

    async fn complete_multipart(&self, key: &str, upload_id: &str, parts: &[CompletedPart]) -> Result<()> {
        self.inner.complete_multipart(key, upload_id, parts).await
    }

    async fn abort_multipart(&self, key: &str, upload_id: &str) -> Result<()> {
        self.inner.abort_multipart(key, upload_id).await
    }
}

/// Write `files` (relative path, contents) under `root`.
pub fn write_tree(root: &Path, files: &[(&str, &[u8])]) {
    for (relative, contents) in files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }
}
