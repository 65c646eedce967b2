//! # orset-kit
//!
//! Add-wins observed-remove sets (OR-Sets) for replicated, eventually
//! consistent state.
//!
//! Each replica owns its own set instance, applies local adds and removes
//! directly, and periodically merges full snapshots received from peers.
//! Merge is commutative, associative and idempotent, so every replica
//! converges to the same state once it has seen the same updates. When an
//! add and a remove of the same value race, the add wins.
//!
//! ## Quick Start
//!
//! ```
//! use orset_kit::prelude::*;
//!
//! let mut a = DottedClockSet::new(0, 2).unwrap();
//! let mut b = DottedClockSet::new(1, 2).unwrap();
//!
//! a.add("milk").unwrap();
//! b.add("eggs").unwrap();
//!
//! a.merge(&b).unwrap();
//! b.merge(&a).unwrap();
//! assert_eq!(a.elements(), b.elements());
//! assert!(a.compare(&b).unwrap() && b.compare(&a).unwrap());
//! ```
//!
//! ## Available Sets
//!
//! - [`TombstoneSet`] - every add mints a random 128-bit tag; removed tags
//!   are kept forever as tombstones. No delivery requirements, unbounded
//!   metadata.
//! - [`DottedClockSet`] - every add is a dot `(value, counter, replica)`;
//!   removals are implied by gaps between the vector clock and the live
//!   dots. Metadata is bounded, but each replica's own counters must be
//!   applied in order.
//!
//! ## The `ReplicatedSet` Trait
//!
//! Both sets implement [`ReplicatedSet`]: `contains`, `elements`, `add`,
//! `remove`, `compare` and `merge`. `Display` renders the internal state
//! for debugging.
//!
//! ## Feature flags
//!
//! - `serde`: `Serialize`/`Deserialize` for both sets and their parts, so a
//!   replication layer can ship snapshots.
//!
//! This crate does not deliver state between replicas. Transport and the
//! causal-delivery guarantee belong to the caller.

#![warn(missing_docs)]

mod crdt;
mod dotted_set;
mod error;
mod tombstone_set;

pub mod clock;
pub mod prelude;

pub use clock::{ReplicaId, VectorClock};
pub use crdt::ReplicatedSet;
pub use dotted_set::{Dot, DottedClockSet};
pub use error::{Error, Result};
pub use tombstone_set::{InstanceId, Tag, TombstoneSet};
