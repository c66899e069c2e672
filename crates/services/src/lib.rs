//! # services
//!
//! Orchestration over the domain ports: which store an ad goes to, how its
//! images become permanent, and how anonymous ads move to a user on sign-in.

pub mod blob;
pub mod drafts;
pub mod events;
pub mod facade;
pub mod generation;
pub mod local_store;
pub mod migration;
pub mod remote_store;

pub use blob::{ImageUploader, ResolvedImages};
pub use drafts::DraftHandoff;
pub use events::{ErrorEvents, PersistenceEvent};
pub use facade::{AdFacade, AdStore, AdStoreKind, Backends, DeleteReport, ImageCleanupFailure};
pub use generation::GenerationService;
pub use local_store::LocalAdStore;
pub use migration::{MigrationOutcome, MigrationService};
pub use remote_store::RemoteAdStore;
