//! Blob stores for uploaded images.

mod local;
mod memory;
#[cfg(feature = "media-s3")]
mod s3;

pub use local::{LocalBlobStore, MEDIA_ROUTE};
pub use memory::MemoryBlobStore;
#[cfg(feature = "media-s3")]
pub use s3::S3BlobStore;

/// Rejects storage paths that could escape a user's namespace.
pub(crate) fn is_safe_path(path: &str) -> bool {
    !path.is_empty()
        && !path.starts_with('/')
        && path
            .split('/')
            .all(|seg| !seg.is_empty() && seg != "." && seg != "..")
}

/// Strips `base` and any query string from `url`, yielding the storage path.
pub(crate) fn path_under(base: &str, url: &str) -> Option<String> {
    let rest = url.strip_prefix(base)?.strip_prefix('/')?;
    let path = rest.split(|c| c == '?' || c == '#').next().unwrap_or_default();
    is_safe_path(path).then(|| path.to_string())
}
