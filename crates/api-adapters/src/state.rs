use std::sync::Arc;

use domains::IdentityVerifier;
use services::{Backends, DraftHandoff, GenerationService, MigrationService};
use storage_adapters::blob::LocalBlobStore;

use crate::metrics::Metrics;

/// Shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub backends: Backends,
    pub migrations: Arc<MigrationService>,
    pub generation: GenerationService,
    pub drafts: DraftHandoff,
    pub verifier: Arc<dyn IdentityVerifier>,
    /// Set when images are stored on local disk and served by `/media`.
    pub media: Option<Arc<LocalBlobStore>>,
    pub metrics: Arc<Metrics>,
}
