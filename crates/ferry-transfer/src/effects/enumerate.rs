use std::path::{Path, PathBuf};

use futures_util::TryStreamExt;
use tracing::{debug, info, warn};

use super::lister::PaginatedLister;
use super::store::ObjectStore;
use crate::core::{ObjectFilter, normalize_prefix, to_local_path, to_remote_key};
use crate::data::{TransferBatch, TransferItem};
use crate::error::{Error, Result};

/// Builds [`TransferBatch`]es from a local directory tree or a remote
/// prefix.
///
/// An unreadable directory or a failed listing page aborts the whole batch
/// before any transfer starts. A single file or key that cannot be mapped is
/// kept as a [rejected](TransferItem::rejected) item and fails on its own.
#[derive(Debug, Clone, Copy)]
pub struct FolderEnumerator {
    concurrency: usize,
}

impl FolderEnumerator {
    pub fn new(concurrency: usize) -> Self { Self { concurrency } }

    /// Every regular file under `local_root`, keyed under `remote_prefix`.
    ///
    /// Symbolic links and special files are skipped. Walks the tree
    /// synchronously; async callers should run it on a blocking thread.
    pub fn upload(&self, local_root: &Path, remote_prefix: &str) -> Result<TransferBatch> {
        let root = std::path::absolute(local_root).map_err(|e| Error::local_io(local_root, e))?;
        let entries = ferry_fs::walk_files(&root)?;

        let items: Vec<_> = entries
            .into_iter()
            .map(|entry| match to_remote_key(&root, &entry.path, remote_prefix) {
                Ok(key) => TransferItem::new(entry.path, key, entry.size),
                Err(e) => {
                    warn!(path = %entry.path.display(), error = %e, "file has no valid key");
                    let relative = entry.path.strip_prefix(&root).unwrap_or(&entry.path);
                    let key = relative.to_string_lossy().into_owned();
                    TransferItem::rejected(entry.path, key, &e)
                }
            })
            .collect();

        if items.is_empty() {
            info!(root = %root.display(), "no files found to upload");
        } else {
            debug!(root = %root.display(), files = items.len(), "enumerated local files");
        }

        Ok(TransferBatch::new(items, self.concurrency).with_label(label(remote_prefix)))
    }

    /// Explicit `(local path, remote key)` pairs.
    ///
    /// Sizes are read now; a file that cannot be read gets size 0 and fails
    /// on its own when the batch runs.
    pub fn files(&self, mappings: impl IntoIterator<Item = (PathBuf, String)>) -> TransferBatch {
        let items = mappings
            .into_iter()
            .map(|(path, key)| {
                let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                TransferItem::new(path, key, size)
            })
            .collect();
        TransferBatch::new(items, self.concurrency).with_label("files")
    }

    /// Every object under `remote_prefix` passing `filter`, mapped under
    /// `local_root`.
    pub async fn download<S: ObjectStore>(
        &self,
        lister: &PaginatedLister<S>,
        remote_prefix: &str,
        local_root: &Path,
        filter: &ObjectFilter,
    ) -> Result<TransferBatch> {
        let root = std::path::absolute(local_root).map_err(|e| Error::local_io(local_root, e))?;
        let list_prefix = match normalize_prefix(remote_prefix) {
            "" => String::new(),
            prefix => format!("{prefix}/"),
        };

        let items = lister
            .list(&list_prefix)
            .try_filter(|object| std::future::ready(filter.matches(object)))
            .map_ok(|object| match to_local_path(remote_prefix, &object.key, &root) {
                Ok(path) => TransferItem::new(path, object.key, object.size),
                Err(e) => {
                    warn!(key = %object.key, error = %e, "key has no valid local path");
                    TransferItem::rejected(PathBuf::from(&object.key), object.key, &e)
                }
            })
            .try_collect::<Vec<_>>()
            .await?;

        if items.is_empty() {
            info!(prefix = remote_prefix, "no objects found to download");
        } else {
            debug!(prefix = remote_prefix, objects = items.len(), "enumerated remote objects");
        }

        Ok(TransferBatch::new(items, self.concurrency).with_label(label(remote_prefix)))
    }
}

fn label(prefix: &str) -> String {
    match normalize_prefix(prefix) {
        "" => "/".to_string(),
        prefix => prefix.to_string(),
    }
}
