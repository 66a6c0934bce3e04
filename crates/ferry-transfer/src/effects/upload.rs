//! Moving one local file into the store, whole or in parts.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use futures_util::{StreamExt, TryStreamExt, stream};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use super::store::{ByteStream, CompletedPart, ObjectStore, ProgressHook};
use crate::core::{Part, plan_parts};
use crate::data::TransferOptions;
use crate::error::{Error, Result};

/// Upload `local_path` to `key` and return the object's URL.
///
/// The size is read from the file as it is opened, so a file that changed
/// since enumeration is still sent whole.
pub(crate) async fn upload_file<S: ObjectStore>(
    store: &S,
    local_path: &Path,
    key: &str,
    options: &TransferOptions,
    progress: &ProgressHook,
) -> Result<String> {
    let file = File::open(local_path).await.map_err(|e| Error::local_io(local_path, e))?;
    let size = file.metadata().await.map_err(|e| Error::local_io(local_path, e))?.len();

    if options.uses_multipart(size) {
        drop(file);
        upload_parts(store, local_path, key, size, options, progress).await?;
    } else {
        let body = file_stream(file, local_path.to_path_buf(), size);
        store.put(key, body, size, &options.put_options(), progress.clone()).await?;
    }

    Ok(store.object_url(key))
}

async fn upload_parts<S: ObjectStore>(
    store: &S,
    local_path: &Path,
    key: &str,
    size: u64,
    options: &TransferOptions,
    progress: &ProgressHook,
) -> Result<()> {
    let parts = plan_parts(size, options.part_size, S::MAX_PARTS)?;
    let upload_id = store.create_multipart(key, &options.put_options()).await?;
    debug!(key, upload_id = %upload_id, parts = parts.len(), "multipart upload started");

    let result = send_parts(store, local_path, key, &upload_id, parts, options.part_concurrency, progress).await;
    let result = match result {
        Ok(completed) => store.complete_multipart(key, &upload_id, &completed).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        if let Err(abort_err) = store.abort_multipart(key, &upload_id).await {
            warn!(key, upload_id = %upload_id, error = %abort_err, "failed to abort multipart upload");
        }
        return Err(e);
    }

    debug!(key, upload_id = %upload_id, "multipart upload completed");
    Ok(())
}

async fn send_parts<S: ObjectStore>(
    store: &S,
    local_path: &Path,
    key: &str,
    upload_id: &str,
    parts: Vec<Part>,
    part_concurrency: usize,
    progress: &ProgressHook,
) -> Result<Vec<CompletedPart>> {
    let mut completed: Vec<_> = stream::iter(parts)
        .map(|part| async move {
            let body = open_part(local_path, part).await?;
            store
                .upload_part(key, upload_id, part.number, body, part.len, progress.clone())
                .await
        })
        .buffer_unordered(part_concurrency)
        .try_collect()
        .await?;

    // Parts finish in any order; the store wants them by number.
    completed.sort_by_key(|p| p.number);
    Ok(completed)
}

async fn open_part(local_path: &Path, part: Part) -> Result<ByteStream> {
    let mut file = File::open(local_path).await.map_err(|e| Error::local_io(local_path, e))?;
    file.seek(SeekFrom::Start(part.offset))
        .await
        .map_err(|e| Error::local_io(local_path, e))?;
    Ok(file_stream(file, local_path.to_path_buf(), part.len))
}

/// Stream at most `len` bytes of `file` from its current position.
pub(crate) fn file_stream(file: File, path: PathBuf, len: u64) -> ByteStream {
    Box::pin(ReaderStream::new(file.take(len)).map_err(move |e| Error::local_io(&path, e)))
}
