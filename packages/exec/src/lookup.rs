//! Absolute-path executable lookup.
//!
//! The only "find an executable" operation the sandbox supports. There is no
//! search path, and the virtual filesystem has no execute permission bits —
//! presence as a regular file is treated as sufficient.

use toolhost_vfs::VfsStore;

use crate::error::LookupError;

/// Resolve an executable by absolute path.
///
/// A non-absolute name always fails with `NotFound`; a missing path fails
/// with `NotFound`; a directory fails with `IsDirectory`; a regular file is
/// returned verbatim.
pub fn lookup_path(store: &VfsStore, name: &str) -> Result<String, LookupError> {
    if !name.starts_with('/') {
        return Err(LookupError::NotFound {
            path: name.to_string(),
        });
    }
    match store.stat(name) {
        None => Err(LookupError::NotFound {
            path: name.to_string(),
        }),
        Some(meta) if meta.is_dir() => Err(LookupError::IsDirectory {
            path: name.to_string(),
        }),
        Some(_) => Ok(name.to_string()),
    }
}
