//! # beacon-store
//!
//! Storage contract and backends for the beacon topic registry.
//!
//! The registry keeps sets of identifiers under string keys. Everything
//! beacon needs from storage is atomic add-to-set, remove-from-set, a set
//! read, key deletion, and per-key expiry; the [`SetStore`] trait captures
//! exactly that and nothing more, so any store with native set operations
//! can sit behind it.
//!
//! Two backends ship here:
//!
//! - **MemoryStore** - in-process, suited to tests and single-node dev
//! - **RedisStore** - shared state for fleets of stateless event handlers
//!   (feature `redis`, on by default)

pub mod memory;
pub mod traits;

#[cfg(feature = "redis")]
pub mod redis;

pub use memory::MemoryStore;
pub use traits::{SetStore, StoreError};

#[cfg(feature = "redis")]
pub use redis::RedisStore;
