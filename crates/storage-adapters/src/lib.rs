//! # storage-adapters
//!
//! Implementations of the storage ports: key/value storage for anonymous
//! profiles, document stores for signed-in users, blob stores for images,
//! and the pre-upload image resizer.

pub mod blob;
pub mod documents;
pub mod kv;
pub mod media;
pub mod signing;

pub use signing::UrlSigner;
