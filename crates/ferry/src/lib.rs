//! The `ferry` command line: bulk uploads and downloads between local
//! folders and an S3 bucket.
//!
//! ```text
//! ferry upload-folder ./frames keyframes -j 32     # every file under ./frames
//! ferry download-folder keyframes ./out --ext webp # only non-empty .webp objects
//! ferry upload report.pdf --key docs/report.pdf
//! ferry ls keyframes/                              # public URLs
//! ferry presign docs/report.pdf --expires 12h
//! ```

pub mod cli;
pub mod config;
pub mod ui;
