// Remote path normalisation. Every path handed to a `RemoteStore` goes
// through `normalize_target` first.

use crate::error::{Result, StorageError};

/// Normalize a remote path: exactly one leading `/`, no trailing `/`,
/// and no empty segments (`//` collapses to `/`).
///
/// `"/"` stays `"/"`. An empty or blank string is rejected rather than
/// silently mapped to the root collection.
pub fn normalize_target(path: &str) -> Result<String> {
    if path.trim().is_empty() {
        return Err(StorageError::InvalidPath("empty remote path".into()));
    }
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    Ok(format!("/{}", segments.join("/")))
}

/// Join a relative path below a remote base and normalize the result.
pub fn join_target(base: &str, relative: &str) -> Result<String> {
    normalize_target(&format!("{}/{}", base, relative))
}

/// Last segment of a normalized remote path (`/a/b/c.txt` -> `c.txt`).
pub fn target_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
