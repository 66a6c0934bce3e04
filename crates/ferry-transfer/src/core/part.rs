use crate::data::MIB;
use crate::error::{Error, Result};

/// Part count limit of S3 and most compatible services.
pub const DEFAULT_MAX_PARTS: u32 = 10_000;

/// One byte range of a multipart transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Part {
    /// Part number (1-based, as object stores number them)
    pub number: u32,
    /// Starting byte offset
    pub offset: u64,
    /// Length in bytes
    pub len:    u64,
}

impl Part {
    /// Ending byte offset (exclusive)
    pub fn end(&self) -> u64 { self.offset + self.len }
}

/// Split an object of `size` bytes into consecutive parts of `part_size`.
///
/// If that would take more than `max_parts` parts, the part size grows to
/// the smallest whole number of MiB that fits. Every part but the last has
/// the same length. An empty object has no parts.
///
/// # Errors
///
/// Returns [`Error::Config`] if `part_size` or `max_parts` is 0.
pub fn plan_parts(size: u64, part_size: u64, max_parts: u32) -> Result<Vec<Part>> {
    if part_size == 0 {
        return Err(Error::Config("part size must be greater than 0".into()));
    }
    if max_parts == 0 {
        return Err(Error::Config("part limit must be greater than 0".into()));
    }

    let part_size = if size.div_ceil(part_size) > u64::from(max_parts) {
        size.div_ceil(u64::from(max_parts)).div_ceil(MIB) * MIB
    } else {
        part_size
    };

    let mut parts = Vec::with_capacity(size.div_ceil(part_size) as usize);
    let mut offset = 0;
    let mut number = 1;
    while offset < size {
        let len = part_size.min(size - offset);
        parts.push(Part { number, offset, len });
        offset += len;
        number += 1;
    }

    Ok(parts)
}
