//! # adshard core
//!
//! The shard pass: read the group snapshot, enumerate machines, assign each
//! machine to `prefix + <last hex digit of its digest>` and reconcile
//! membership against the snapshot.
//!
//! * [`inventory`]: stage 1, the read-only [`GroupMembershipIndex`](inventory::GroupMembershipIndex).
//! * [`enumerator`]: stage 2, computer objects across containers.
//! * [`reconciler`]: stage 3, one outcome per machine.
//! * [`shard`]: runs the three stages in order.
//!
//! Directory access goes through [`adshard_common::directory::DirectoryService`];
//! [`memory::InMemoryDirectory`] is a self-contained implementation.

pub mod enumerator;
pub mod error;
pub mod hashing;
pub mod inventory;
pub mod machine;
pub mod memory;
pub mod reconciler;
pub mod shard;

pub use error::ShardError;
pub use shard::ShardService;
