use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{self, Result};

const STAGING_SUFFIX: &str = ".ferry-part";

/// A write target that only appears at its destination once committed.
///
/// Data is written to a hidden sibling of the destination. [`commit`]
/// renames it into place; dropping an uncommitted `StagedFile` removes the
/// sibling, so an interrupted or failed write never leaves a partial file
/// at the destination.
///
/// [`commit`]: StagedFile::commit
#[derive(Debug)]
pub struct StagedFile {
    staging:     PathBuf,
    destination: PathBuf,
    committed:   bool,
}

impl StagedFile {
    pub fn new(destination: impl AsRef<Path>) -> Self {
        let destination = destination.as_ref().to_path_buf();
        Self {
            staging: staging_path(&destination),
            destination,
            committed: false,
        }
    }

    /// Creates any missing parent directories of the destination.
    pub fn prepare(&self) -> Result<()> {
        if let Some(parent) = self.destination.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| error::from_io(parent, e))?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path { &self.staging }

    pub fn destination(&self) -> &Path { &self.destination }

    pub fn commit(mut self) -> Result<PathBuf> {
        std::fs::rename(&self.staging, &self.destination)
            .map_err(|e| error::from_io(&self.destination, e))?;
        self.committed = true;
        Ok(self.destination.clone())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.staging);
        }
    }
}

fn staging_path(destination: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(destination.file_name().unwrap_or_default());
    name.push(STAGING_SUFFIX);
    destination.with_file_name(name)
}
