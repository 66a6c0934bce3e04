use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::TryStreamExt;
use tracing::info;

use super::download::download_file;
use super::enumerate::FolderEnumerator;
use super::lister::PaginatedLister;
use super::manager::TransferManager;
use super::store::ObjectStore;
use super::upload::upload_file;
use crate::core::{ObjectFilter, file_name_key};
use crate::data::{BatchReport, Direction, ProgressObserver, RemoteObject, TransferOptions};
use crate::error::{Error, Result};

/// Everyday operations against one store: single files, whole folders and
/// listings.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use std::sync::Arc;
/// use ferry_transfer::{MemoryStore, Session, TransferOptions};
///
/// # async fn run() -> ferry_transfer::Result<()> {
/// let session = Session::new(Arc::new(MemoryStore::default()), TransferOptions::default())?;
/// let report = session.upload_folder(Path::new("frames"), "keyframes", 32).await?;
/// println!("{} of {} uploaded", report.succeeded(), report.results.len());
/// # Ok(())
/// # }
/// ```
pub struct Session<S> {
    manager: TransferManager<S>,
    lister:  PaginatedLister<S>,
}

impl<S: ObjectStore> Session<S> {
    pub fn new(store: Arc<S>, options: TransferOptions) -> Result<Self> {
        let lister = PaginatedLister::new(Arc::clone(&store));
        Ok(Self {
            manager: TransferManager::new(store, options)?,
            lister,
        })
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.manager = self.manager.with_observer(observer);
        self
    }

    pub fn manager(&self) -> &TransferManager<S> { &self.manager }

    pub fn lister(&self) -> &PaginatedLister<S> { &self.lister }

    fn store(&self) -> &S { self.manager.store() }

    fn options(&self) -> &TransferOptions { self.manager.options() }

    /// Upload one file, under its base name when `key` is `None`. Returns
    /// the object's URL.
    pub async fn upload_file(&self, local_path: &Path, key: Option<&str>) -> Result<String> {
        let key = match key {
            Some(key) => key.to_string(),
            None => file_name_key(local_path)?,
        };
        let size = tokio::fs::metadata(local_path)
            .await
            .map_err(|e| Error::local_io(local_path, e))?
            .len();

        let tracker = self.manager.aggregator().new_tracker(size, &key);
        let url = upload_file(self.store(), local_path, &key, self.options(), &tracker.hook()).await?;
        info!(key = %key, size, "uploaded file");
        Ok(url)
    }

    /// Upload every regular file under `local_dir`, keyed under `prefix`.
    ///
    /// An unreadable directory fails the call; per-file failures are in
    /// the report.
    pub async fn upload_folder(&self, local_dir: &Path, prefix: &str, concurrency: usize) -> Result<BatchReport> {
        let enumerator = FolderEnumerator::new(concurrency);
        let dir = local_dir.to_path_buf();
        let walk_prefix = prefix.to_string();
        let batch = tokio::task::spawn_blocking(move || enumerator.upload(&dir, &walk_prefix))
            .await
            .map_err(|e| Error::local_io(local_dir, io::Error::other(e)))??;

        Ok(self.manager.run(batch, Direction::Upload).await)
    }

    /// Upload explicit `(local path, key)` pairs as one batch. A missing key
    /// defaults to the file's base name.
    pub async fn upload_many(&self, mappings: Vec<(PathBuf, Option<String>)>, concurrency: usize) -> BatchReport {
        let mappings = mappings.into_iter().map(|(path, key)| {
            let key = key
                .or_else(|| file_name_key(&path).ok())
                .unwrap_or_else(|| path.display().to_string());
            (path, key)
        });
        let batch = FolderEnumerator::new(concurrency).files(mappings);
        self.manager.run(batch, Direction::Upload).await
    }

    /// Download one object to `local_path`.
    pub async fn download_file(&self, key: &str, local_path: &Path) -> Result<PathBuf> {
        let object = self.find(key).await?;
        let tracker = self.manager.aggregator().new_tracker(object.size, key);
        let path = download_file(self.store(), key, object.size, local_path, self.options(), &tracker.hook()).await?;
        info!(key, path = %path.display(), "downloaded file");
        Ok(path)
    }

    /// Download every object under `prefix` that passes `filter`,
    /// recreating the key structure under `local_dir`.
    ///
    /// A failed listing fails the call before anything is downloaded.
    pub async fn download_folder(
        &self,
        prefix: &str,
        local_dir: &Path,
        concurrency: usize,
        filter: &ObjectFilter,
    ) -> Result<BatchReport> {
        let batch = FolderEnumerator::new(concurrency)
            .download(&self.lister, prefix, local_dir, filter)
            .await?;
        Ok(self.manager.run(batch, Direction::Download).await)
    }

    pub async fn list_files(&self, prefix: &str) -> Result<Vec<RemoteObject>> { self.lister.collect(prefix).await }

    pub async fn delete_file(&self, key: &str) -> Result<()> {
        self.store().delete(key).await?;
        info!(key, "deleted object");
        Ok(())
    }

    pub fn presigned_url(&self, key: &str, ttl: Duration) -> Result<String> { self.store().presign(key, ttl) }

    pub fn public_url(&self, key: &str) -> String { self.store().object_url(key) }

    async fn find(&self, key: &str) -> Result<RemoteObject> {
        let mut objects = self.lister.list(key);
        while let Some(object) = objects.try_next().await? {
            if object.key == key {
                return Ok(object);
            }
        }
        Err(Error::backend("get", format!("NoSuchKey: {key}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::memory::MemoryStore;
    use tempfile::tempdir;

    fn session(store: &Arc<MemoryStore>) -> Session<MemoryStore> {
        Session::new(Arc::clone(store), TransferOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn test_upload_file_defaults_to_base_name() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cat.jpg");
        std::fs::write(&path, b"meow").unwrap();

        let store = Arc::new(MemoryStore::new("pics"));
        let url = session(&store).upload_file(&path, None).await.unwrap();
        assert_eq!(url, "memory://pics/cat.jpg");

        session(&store).upload_file(&path, Some("animals/cat.jpg")).await.unwrap();
        assert_eq!(store.keys(), vec!["animals/cat.jpg", "cat.jpg"]);
    }

    #[tokio::test]
    async fn test_download_file_single() {
        let store = Arc::new(MemoryStore::default());
        store.insert("a/b.txt", &b"body"[..]);
        store.insert("a/b.txt.bak", &b"old"[..]);

        let dir = tempdir().unwrap();
        let target = dir.path().join("b.txt");
        session(&store).download_file("a/b.txt", &target).await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"body");

        let err = session(&store).download_file("a/none", &target).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Backend);
    }

    #[tokio::test]
    async fn test_folder_round_trip() {
        let src = tempdir().unwrap();
        std::fs::create_dir_all(src.path().join("L01")).unwrap();
        std::fs::write(src.path().join("L01/001.webp"), b"one").unwrap();
        std::fs::write(src.path().join("L01/002.webp"), b"two").unwrap();
        std::fs::write(src.path().join("notes.txt"), b"skip me").unwrap();

        let store = Arc::new(MemoryStore::default());
        let session = session(&store);
        let uploaded = session.upload_folder(src.path(), "frames", 2).await.unwrap();
        assert_eq!(uploaded.succeeded(), 3);

        let dst = tempdir().unwrap();
        let filter = ObjectFilter::new().extensions(["webp"]);
        let downloaded = session.download_folder("frames", dst.path(), 2, &filter).await.unwrap();
        assert_eq!(downloaded.succeeded(), 2);
        assert_eq!(std::fs::read(dst.path().join("L01/002.webp")).unwrap(), b"two");
        assert!(!dst.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_upload_many_defaults_keys() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.txt");
        std::fs::write(&a, b"a").unwrap();

        let store = Arc::new(MemoryStore::default());
        let report = session(&store)
            .upload_many(
                vec![(a.clone(), None), (a, Some("copies/a.txt".into())), (dir.path().join("gone.txt"), None)],
                2,
            )
            .await;

        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.results[2].target, "gone.txt");
        assert_eq!(store.keys(), vec!["a.txt", "copies/a.txt"]);
    }

    #[tokio::test]
    async fn test_delete_and_urls() {
        let store = Arc::new(MemoryStore::new("b"));
        store.insert("k", &b"x"[..]);
        let session = session(&store);

        assert_eq!(session.public_url("k"), "memory://b/k");
        assert!(session.presigned_url("k", Duration::from_secs(3600)).unwrap().ends_with("expires=3600"));

        session.delete_file("k").await.unwrap();
        assert!(session.list_files("").await.unwrap().is_empty());
    }
}
