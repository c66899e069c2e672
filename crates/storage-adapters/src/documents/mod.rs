//! Per-user ad collections.

mod memory;
#[cfg(feature = "db-postgres")]
mod postgres;

pub use memory::MemoryDocumentStore;
#[cfg(feature = "db-postgres")]
pub use postgres::PostgresDocumentStore;

use serde_json::Value;

/// Top-level field merge: keys present in `patch` overwrite, others survive.
pub(crate) fn merge_fields(stored: &mut Value, patch: Value) {
    match (stored, patch) {
        (Value::Object(stored), Value::Object(patch)) => {
            for (key, value) in patch {
                stored.insert(key, value);
            }
        }
        (stored, patch) => *stored = patch,
    }
}
