use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("path not found: {}", path.display())]
    NotFound {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("permission denied: {}", path.display())]
    PermissionDenied {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

pub fn from_io(path: impl Into<PathBuf>, err: io::Error) -> Error {
    let path = path.into();
    match err.kind() {
        io::ErrorKind::NotFound => Error::NotFound { path, source: err },
        io::ErrorKind::PermissionDenied => Error::PermissionDenied { path, source: err },
        _ => Error::Io { path, source: err },
    }
}

impl Error {
    pub fn path(&self) -> &Path {
        match self {
            Error::NotFound { path, .. }
            | Error::PermissionDenied { path, .. }
            | Error::NotADirectory { path }
            | Error::Io { path, .. } => path,
        }
    }

    /// Splits the error into the failing path and an `io::Error` carrying the
    /// original kind.
    pub fn into_parts(self) -> (PathBuf, io::Error) {
        match self {
            Error::NotFound { path, source }
            | Error::PermissionDenied { path, source }
            | Error::Io { path, source } => (path, source),
            Error::NotADirectory { path } => {
                let source = io::Error::new(io::ErrorKind::NotADirectory, "not a directory");
                (path, source)
            }
        }
    }
}
