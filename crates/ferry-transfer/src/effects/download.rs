//! Fetching one object to a local path, whole or in ranged parts.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use ferry_fs::StagedFile;
use futures_util::{TryStreamExt, stream};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tracing::debug;

use super::store::{ByteStream, ObjectStore, ProgressHook};
use crate::core::plan_parts;
use crate::data::TransferOptions;
use crate::error::{Error, Result};

/// Download `key` to `local_path`, creating missing parent directories.
///
/// Bytes land in a staging sibling that is renamed into place only once
/// every byte is written and synced; on any failure the staging file is
/// removed and `local_path` is left untouched.
pub(crate) async fn download_file<S: ObjectStore>(
    store: &S,
    key: &str,
    size: u64,
    local_path: &Path,
    options: &TransferOptions,
    progress: &ProgressHook,
) -> Result<PathBuf> {
    let staged = StagedFile::new(local_path);
    staged.prepare()?;

    if options.uses_multipart(size) {
        download_ranges(store, key, size, staged.path(), options, progress).await?;
    } else {
        let body = store.get(key, progress.clone()).await?;
        let mut file = File::create(staged.path())
            .await
            .map_err(|e| Error::local_io(staged.path(), e))?;
        let written = write_body(&mut file, body, staged.path()).await?;
        if written != size {
            return Err(Error::backend("get", format!("{key} returned {written} of {size} bytes")));
        }
        file.sync_all().await.map_err(|e| Error::local_io(staged.path(), e))?;
    }

    Ok(staged.commit()?)
}

async fn download_ranges<S: ObjectStore>(
    store: &S,
    key: &str,
    size: u64,
    staging: &Path,
    options: &TransferOptions,
    progress: &ProgressHook,
) -> Result<()> {
    let parts = plan_parts(size, options.part_size, S::MAX_PARTS)?;
    debug!(key, parts = parts.len(), "ranged download started");

    let file = File::create(staging).await.map_err(|e| Error::local_io(staging, e))?;
    file.set_len(size).await.map_err(|e| Error::local_io(staging, e))?;

    stream::iter(parts.into_iter().map(Ok::<_, Error>))
        .try_for_each_concurrent(options.part_concurrency, |part| async move {
            let body = store.get_range(key, part.offset, part.len, progress.clone()).await?;
            let mut handle = OpenOptions::new()
                .write(true)
                .open(staging)
                .await
                .map_err(|e| Error::local_io(staging, e))?;
            handle
                .seek(SeekFrom::Start(part.offset))
                .await
                .map_err(|e| Error::local_io(staging, e))?;

            let written = write_body(&mut handle, body, staging).await?;
            if written != part.len {
                return Err(Error::backend(
                    "get",
                    format!("part {} of {key} returned {written} of {} bytes", part.number, part.len),
                ));
            }
            Ok(())
        })
        .await?;

    file.sync_all().await.map_err(|e| Error::local_io(staging, e))
}

/// Drain `body` into `file`, returning the number of bytes written.
async fn write_body(file: &mut File, mut body: ByteStream, path: &Path) -> Result<u64> {
    let mut written = 0;
    while let Some(chunk) = body.try_next().await? {
        file.write_all(&chunk).await.map_err(|e| Error::local_io(path, e))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| Error::local_io(path, e))?;
    Ok(written)
}
