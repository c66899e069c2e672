//! adcraft/crates/domains/src/lib.rs
//!
//! The central domain model and interface definitions for adcraft.
//! Nothing in here performs I/O; adapters implement the ports.

pub mod errors;
pub mod models;
pub mod ports;
pub mod session;

// Re-exporting for easier access in other crates
pub use errors::*;
pub use models::*;
pub use ports::*;
pub use session::*;
