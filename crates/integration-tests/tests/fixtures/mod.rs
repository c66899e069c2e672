//! Shared wiring for the scenario tests: in-memory backends plus a blob store
//! that can be told to fail.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use domains::{Ad, AdId, AdType, BlobError, BlobStore, ProfileId, Session, UserId};
use mime::Mime;
use services::{Backends, ErrorEvents, ImageUploader};
use storage_adapters::blob::MemoryBlobStore;
use storage_adapters::documents::MemoryDocumentStore;
use storage_adapters::kv::MemoryKeyValueStore;

pub const JPEG: &str = "data:image/jpeg;base64,/9j/4AAQ";
pub const PNG: &str = "data:image/png;base64,iVBORw0K";
pub const BLOB_BASE: &str = "https://blobs.test";

/// Delegates to a [`MemoryBlobStore`] but rejects the n-th `put` (1-based).
pub struct FlakyBlobStore {
    inner: MemoryBlobStore,
    fail_on: AtomicUsize,
    puts: AtomicUsize,
    fail_deletes: AtomicBool,
}

impl FlakyBlobStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryBlobStore::new(BLOB_BASE),
            fail_on: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            fail_deletes: AtomicBool::new(false),
        }
    }

    pub fn fail_on_put(&self, n: usize) {
        self.puts.store(0, Ordering::SeqCst);
        self.fail_on.store(n, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.fail_on.store(0, Ordering::SeqCst);
        self.fail_deletes.store(false, Ordering::SeqCst);
    }

    pub fn stored(&self) -> usize {
        self.inner.len()
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.inner
            .locate(url)
            .is_some_and(|path| self.inner.get(&path).is_some())
    }
}

#[async_trait]
impl BlobStore for FlakyBlobStore {
    async fn put(&self, path: &str, data: Bytes, media_type: &Mime) -> Result<String, BlobError> {
        let n = self.puts.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_on.load(Ordering::SeqCst) {
            return Err(BlobError::Backend("injected failure".into()));
        }
        self.inner.put(path, data, media_type).await
    }

    async fn delete(&self, path: &str) -> Result<(), BlobError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(BlobError::Backend("injected failure".into()));
        }
        self.inner.delete(path).await
    }

    fn locate(&self, url: &str) -> Option<String> {
        self.inner.locate(url)
    }
}

pub struct Harness {
    pub backends: Backends,
    pub blobs: Arc<FlakyBlobStore>,
    pub documents: Arc<MemoryDocumentStore>,
}

impl Harness {
    pub fn new() -> Self {
        let blobs = Arc::new(FlakyBlobStore::new());
        let documents = Arc::new(MemoryDocumentStore::new());
        let backends = Backends {
            kv: Arc::new(MemoryKeyValueStore::new()),
            documents: documents.clone(),
            uploader: ImageUploader::new(blobs.clone()),
            events: ErrorEvents::default(),
        };
        Self {
            backends,
            blobs,
            documents,
        }
    }
}

pub fn profile() -> ProfileId {
    ProfileId::new("profile-1").unwrap()
}

pub fn user() -> UserId {
    UserId::new("u1").unwrap()
}

pub fn anonymous() -> Session {
    Session::anonymous(profile())
}

pub fn signed_in() -> Session {
    Session::authenticated(profile(), user())
}

pub fn ad(id: &str, kind: AdType, images: &[&str]) -> Ad {
    Ad::new(
        AdId::new(id).unwrap(),
        "2020 Sedan",
        "Clean title, low miles.",
        kind,
        images.iter().map(|s| s.to_string()).collect(),
    )
}
