//! Local filesystem primitives used by the ferry transfer engine.
//!
//! - [`walk_files`] enumerates the regular files of a directory tree.
//! - [`StagedFile`] writes to a hidden sibling and renames into place on commit.

mod error;
mod staged;
mod walk;

pub use error::{Error, Result, from_io};
pub use staged::StagedFile;
pub use walk::{FileEntry, walk_files};
