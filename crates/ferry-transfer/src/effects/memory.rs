use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::{StreamExt, stream};

use super::store::{ByteStream, CompletedPart, ListPage, ObjectStore, ProgressHook, observe};
use crate::data::{PutOptions, RemoteObject};
use crate::error::{Error, Result};

const DEFAULT_PAGE_SIZE: usize = 1000;
const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
struct StoredObject {
    data:          Bytes,
    storage_class: String,
}

#[derive(Debug)]
struct PendingUpload {
    key:           String,
    storage_class: String,
    parts:         BTreeMap<u32, Bytes>,
}

/// An [`ObjectStore`] held entirely in process memory.
///
/// Listings are paginated like a remote service, `page_size` objects at a
/// time, and bodies are served in `chunk_size` chunks, so the engine runs
/// through the same paths it takes against a real bucket.
#[derive(Debug)]
pub struct MemoryStore {
    bucket:      String,
    objects:     RwLock<BTreeMap<String, StoredObject>>,
    uploads:     Mutex<HashMap<String, PendingUpload>>,
    next_upload: AtomicU64,
    page_size:   usize,
    chunk_size:  usize,
}

impl Default for MemoryStore {
    fn default() -> Self { Self::new("memory") }
}

impl MemoryStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket:      bucket.into(),
            objects:     RwLock::default(),
            uploads:     Mutex::default(),
            next_upload: AtomicU64::new(1),
            page_size:   DEFAULT_PAGE_SIZE,
            chunk_size:  DEFAULT_CHUNK_SIZE,
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Store `data` under `key` directly, bypassing the transfer path.
    pub fn insert(&self, key: impl Into<String>, data: impl Into<Bytes>) {
        self.write_object(key.into(), data.into(), PutOptions::default().storage_class);
    }

    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|o| o.data.clone())
    }

    pub fn storage_class(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .map(|o| o.storage_class.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize { self.objects.read().unwrap_or_else(PoisonError::into_inner).len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Multipart uploads started but neither completed nor aborted.
    pub fn pending_uploads(&self) -> usize { self.uploads.lock().unwrap_or_else(PoisonError::into_inner).len() }

    fn write_object(&self, key: String, data: Bytes, storage_class: String) {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, StoredObject { data, storage_class });
    }

    fn read_object(&self, op: &'static str, key: &str) -> Result<Bytes> {
        self.object(key)
            .ok_or_else(|| Error::backend(op, format!("NoSuchKey: {key}")))
    }

    fn chunked(&self, data: Bytes, progress: ProgressHook) -> ByteStream {
        let chunk_size = self.chunk_size;
        let chunks: Vec<Result<Bytes>> = (0..data.len())
            .step_by(chunk_size)
            .map(|start| Ok(data.slice(start..(start + chunk_size).min(data.len()))))
            .collect();
        observe(Box::pin(stream::iter(chunks)), progress)
    }
}

async fn collect_body(mut body: ByteStream, progress: &ProgressHook) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        progress(chunk.len() as u64);
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

impl ObjectStore for MemoryStore {
    async fn put(
        &self,
        key: &str,
        body: ByteStream,
        _size_hint: u64,
        options: &PutOptions,
        progress: ProgressHook,
    ) -> Result<()> {
        let data = collect_body(body, &progress).await?;
        self.write_object(key.to_string(), data, options.storage_class.clone());
        Ok(())
    }

    async fn get(&self, key: &str, progress: ProgressHook) -> Result<ByteStream> {
        let data = self.read_object("get", key)?;
        Ok(self.chunked(data, progress))
    }

    async fn get_range(&self, key: &str, offset: u64, len: u64, progress: ProgressHook) -> Result<ByteStream> {
        let data = self.read_object("get", key)?;
        let end = offset.checked_add(len).filter(|&end| end <= data.len() as u64).ok_or_else(|| {
            Error::backend("get", format!("InvalidRange: {offset}+{len} of {} bytes in {key}", data.len()))
        })?;
        Ok(self.chunked(data.slice(offset as usize..end as usize), progress))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.write().unwrap_or_else(PoisonError::into_inner).remove(key);
        Ok(())
    }

    async fn list_page(&self, prefix: &str, continuation: Option<&str>) -> Result<ListPage> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        let start = match continuation {
            Some(token) => Bound::Excluded(token),
            None => Bound::Included(prefix),
        };

        let mut matching = objects
            .range::<str, _>((start, Bound::Unbounded))
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| RemoteObject::new(key.clone(), object.data.len() as u64));

        let page: Vec<RemoteObject> = matching.by_ref().take(self.page_size).collect();
        let next_token = match (matching.next(), page.last()) {
            (Some(_), Some(last)) => Some(last.key.clone()),
            _ => None,
        };

        Ok(ListPage {
            objects: page,
            next_token,
        })
    }

    fn presign(&self, key: &str, ttl: Duration) -> Result<String> {
        if ttl.is_zero() {
            return Err(Error::Config("presigned URL lifetime must be positive".into()));
        }
        Ok(format!("{}?expires={}", self.object_url(key), ttl.as_secs()))
    }

    fn object_url(&self, key: &str) -> String { format!("memory://{}/{key}", self.bucket) }

    async fn create_multipart(&self, key: &str, options: &PutOptions) -> Result<String> {
        let upload_id = format!("upload-{}", self.next_upload.fetch_add(1, Ordering::Relaxed));
        self.uploads.lock().unwrap_or_else(PoisonError::into_inner).insert(
            upload_id.clone(),
            PendingUpload {
                key:           key.to_string(),
                storage_class: options.storage_class.clone(),
                parts:         BTreeMap::new(),
            },
        );
        Ok(upload_id)
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
        let data = collect_body(body, &progress).await?;
        if data.len() as u64 != len {
            return Err(Error::backend(
                "upload part",
                format!("IncompleteBody: part {part_number} of {key} sent {} of {len} bytes", data.len()),
            ));
        }

        let mut uploads = self.uploads.lock().unwrap_or_else(PoisonError::into_inner);
        let upload = uploads
            .get_mut(upload_id)
            .filter(|upload| upload.key == key)
            .ok_or_else(|| Error::backend("upload part", format!("NoSuchUpload: {upload_id}")))?;
        upload.parts.insert(part_number, data);

        Ok(CompletedPart {
            number: part_number,
            etag:   format!("\"{upload_id}-{part_number}\""),
        })
    }

    async fn complete_multipart(&self, key: &str, upload_id: &str, parts: &[CompletedPart]) -> Result<()> {
        let mut uploads = self.uploads.lock().unwrap_or_else(PoisonError::into_inner);
        let upload = uploads
            .get(upload_id)
            .filter(|upload| upload.key == key)
            .ok_or_else(|| Error::backend("complete multipart", format!("NoSuchUpload: {upload_id}")))?;

        if parts.is_empty() || parts.windows(2).any(|w| w[0].number >= w[1].number) {
            return Err(Error::backend("complete multipart", "InvalidPartOrder"));
        }

        let mut data = BytesMut::new();
        for part in parts {
            let stored = upload
                .parts
                .get(&part.number)
                .filter(|_| part.etag == format!("\"{upload_id}-{}\"", part.number))
                .ok_or_else(|| Error::backend("complete multipart", format!("InvalidPart: {}", part.number)))?;
            data.extend_from_slice(stored);
        }

        let storage_class = upload.storage_class.clone();
        uploads.remove(upload_id);
        drop(uploads);

        self.write_object(key.to_string(), data.freeze(), storage_class);
        Ok(())
    }

    async fn abort_multipart(&self, _key: &str, upload_id: &str) -> Result<()> {
        self.uploads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(upload_id)
            .map(|_| ())
            .ok_or_else(|| Error::backend("abort multipart", format!("NoSuchUpload: {upload_id}")))
    }
}
