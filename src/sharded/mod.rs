//! # Sharded Entities
//!
//! This module routes the rows of a logical entity across N physical tables
//! through the `ShardedModel` facade. It provides:
//!
//! - **Deterministic key routing**: integer keys by `|key| % N`, text keys by
//!   unsigned CRC-32 modulo N
//! - **A shard registry** building each `(entity, index)` table handle once
//! - **ORM-style operations**: create, update, filter, filter-update,
//!   update-or-create and guarded delta updates, all scoped to one shard
//!
//! ## Architecture
//!
//! A call resolves its routing key to a shard index with the `Router`, fetches
//! the shard's `ShardHandle` from the `ShardRegistry`, then issues a single
//! primitive against that handle's table through the `StorageEngine`.
//!
//! ## Limitations
//!
//! - **Fixed shard count**: Changing it re-routes keys; there is no resharding
//! - **No cross-shard transactions**: Each call touches exactly one table
//! - **Engine-provided isolation**: Guarantees within a shard are whatever the
//!   storage engine gives a single call

mod model;
mod queryset;
mod registry;
pub mod router;

// Public API exports
pub use model::ShardedModel;
pub use queryset::QuerySet;
pub use registry::{ShardHandle, ShardRegistry};
pub use router::{Router, route, uint_crc32};
