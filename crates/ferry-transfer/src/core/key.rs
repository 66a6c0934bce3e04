use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Strips leading and trailing `/` from a prefix. The empty prefix stands
/// for the root of the bucket.
pub fn normalize_prefix(prefix: &str) -> &str { prefix.trim_matches('/') }

/// Maps a local file under `local_root` to its remote key under
/// `remote_prefix`.
///
/// The key is `prefix + "/" + relative path` with `/` separators and no
/// leading slash.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use ferry_transfer::to_remote_key;
///
/// let root = Path::new("/data/frames");
/// let key = to_remote_key(root, &root.join("L01").join("001.webp"), "keyframes/").unwrap();
/// assert_eq!(key, "keyframes/L01/001.webp");
/// ```
pub fn to_remote_key(local_root: &Path, local_path: &Path, remote_prefix: &str) -> Result<String> {
    let invalid = || Error::invalid_path(local_path.display(), local_root.display());

    let relative = local_path.strip_prefix(local_root).map_err(|_| invalid())?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => segments.push(part.to_str().ok_or_else(invalid)?),
            Component::CurDir => {}
            _ => return Err(invalid()),
        }
    }
    if segments.is_empty() {
        return Err(invalid());
    }

    let relative = segments.join("/");
    let prefix = normalize_prefix(remote_prefix);
    if prefix.is_empty() {
        Ok(relative)
    } else {
        Ok(format!("{prefix}/{relative}"))
    }
}

/// Maps a remote key under `remote_prefix` to a path under `local_root`.
///
/// Segments that would escape `local_root` (`..`, `.`, absolute or
/// drive-qualified parts) are rejected.
pub fn to_local_path(remote_prefix: &str, remote_key: &str, local_root: &Path) -> Result<PathBuf> {
    let prefix = normalize_prefix(remote_prefix);
    let root_label = format!("{prefix}/");
    let invalid = || Error::invalid_path(remote_key, &root_label);

    let rest = if prefix.is_empty() {
        remote_key
    } else {
        remote_key
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(invalid)?
    };

    let mut path = local_root.to_path_buf();
    let mut pushed = false;
    for segment in rest.split('/').filter(|s| !s.is_empty()) {
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {
                path.push(segment);
                pushed = true;
            }
            _ => return Err(invalid()),
        }
    }

    if pushed { Ok(path) } else { Err(invalid()) }
}

/// Default key for a single uploaded file: its base name.
pub fn file_name_key(local_path: &Path) -> Result<String> {
    local_path
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_owned)
        .ok_or_else(|| Error::invalid_path(local_path.display(), "a named file"))
}
