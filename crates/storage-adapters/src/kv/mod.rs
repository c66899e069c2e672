//! Key/value storage backing local ad lists and draft handoff slots.

mod memory;
#[cfg(feature = "redis")]
mod redis;

pub use memory::MemoryKeyValueStore;
#[cfg(feature = "redis")]
pub use self::redis::RedisKeyValueStore;
