use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{self, Error, Result};

/// A regular file discovered by [`walk_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Size in bytes at the time of the walk.
    pub size: u64,
}

/// Recursively collects every regular file under `root`.
///
/// Symbolic links are not followed and, like sockets, FIFOs and device
/// nodes, are left out of the result. Entries are returned in a stable
/// order (sorted by file name at each level). The first unreadable entry
/// aborts the walk.
pub fn walk_files(root: impl AsRef<Path>) -> Result<Vec<FileEntry>> {
    let root = std::path::absolute(root.as_ref()).map_err(|e| error::from_io(root.as_ref(), e))?;

    let meta = std::fs::metadata(&root).map_err(|e| error::from_io(&root, e))?;
    if !meta.is_dir() {
        return Err(Error::NotADirectory { path: root });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
            error::from_io(path, e.into())
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let size = entry
            .metadata()
            .map_err(|e| error::from_io(entry.path(), e.into()))?
            .len();

        files.push(FileEntry {
            path: entry.into_path(),
            size,
        });
    }

    Ok(files)
}
