//! Error types for ferry-transfer.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing file, permission denied, disk full and friends.
    #[error("local I/O error at {}: {source}", path.display())]
    LocalIo {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    /// Network, authentication, throttling or malformed-response failures
    /// reported by the object store.
    #[error("{op} failed: {message}")]
    Backend { op: &'static str, message: String },

    /// A key or path that does not fall under the expected root or prefix.
    #[error("{path} is not under {root}")]
    InvalidPath { path: String, root: String },

    #[error("cancelled before the transfer started")]
    Cancelled,

    #[error("invalid transfer options: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Cloneable classification of an [`Error`], kept in per-item results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    LocalIo,
    Backend,
    InvalidPath,
    Cancelled,
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::LocalIo => write!(f, "local I/O"),
            ErrorKind::Backend => write!(f, "backend"),
            ErrorKind::InvalidPath => write!(f, "invalid path"),
            ErrorKind::Cancelled => write!(f, "cancelled"),
            ErrorKind::Config => write!(f, "config"),
        }
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::LocalIo { .. } => ErrorKind::LocalIo,
            Error::Backend { .. } => ErrorKind::Backend,
            Error::InvalidPath { .. } => ErrorKind::InvalidPath,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Config(_) => ErrorKind::Config,
        }
    }

    pub fn backend(op: &'static str, message: impl fmt::Display) -> Self {
        Error::Backend {
            op,
            message: message.to_string(),
        }
    }

    pub fn local_io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Error::LocalIo {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn invalid_path(path: impl fmt::Display, root: impl fmt::Display) -> Self {
        Error::InvalidPath {
            path: path.to_string(),
            root: root.to_string(),
        }
    }
}

impl From<ferry_fs::Error> for Error {
    fn from(e: ferry_fs::Error) -> Self {
        let (path, source) = e.into_parts();
        Error::LocalIo { path, source }
    }
}
