//! Optimized observed-remove set built on dots and a vector clock.
//!
//! Instead of keeping tombstones, every add is identified by a [`Dot`]: the
//! value, the owning replica and that replica's next counter. The vector
//! clock records how far each replica's counter sequence has been observed.
//! A counter that is covered by the clock but has no live dot was removed;
//! merge and compare read removals out of those clock gaps.
//!
//! The trade-off is a delivery precondition: each replica's own counters
//! must be applied exactly once and in order. [`DottedClockSet::add_at`]
//! rejects a gap with [`Error::CausalOrderViolation`]; ordering of remote
//! state is the job of the replication layer that calls
//! [`merge`](ReplicatedSet::merge).

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use crate::clock::{ReplicaId, VectorClock};
use crate::crdt::ReplicatedSet;
use crate::error::{Error, Result};

/// A single add event: `value` added by `replica` at `counter`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Dot<T> {
    /// The element value.
    pub value: T,
    /// Position in the owning replica's counter sequence, starting at 1.
    pub counter: u64,
    /// Replica that issued the add.
    pub replica: ReplicaId,
}

/// An add-wins set whose removals are implied by vector clock gaps.
///
/// Metadata is bounded by the replica count plus one dot per live
/// `(value, replica)` pair.
///
/// # Example
///
/// ```
/// use orset_kit::prelude::*;
///
/// let mut a = DottedClockSet::new(0, 2).unwrap();
/// let mut b = DottedClockSet::new(1, 2).unwrap();
///
/// a.add(1).unwrap();
/// b.merge(&a).unwrap();
/// assert!(b.contains(&1));
/// assert_eq!(b.clock().as_slice(), &[1, 0]);
///
/// a.remove(&1);
/// b.merge(&a).unwrap();
/// assert!(b.is_empty());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(
        try_from = "DottedClockSetRepr<T>",
        bound(deserialize = "T: Eq + Hash + Clone + serde::Deserialize<'de>")
    )
)]
pub struct DottedClockSet<T: Eq + Hash + Clone> {
    replica_id: ReplicaId,
    dots: HashSet<Dot<T>>,
    clock: VectorClock,
}

impl<T: Eq + Hash + Clone> DottedClockSet<T> {
    /// Create an empty set owned by `replica_id` among `replica_count` replicas.
    pub fn new(replica_id: ReplicaId, replica_count: usize) -> Result<Self> {
        if replica_id >= replica_count {
            tracing::debug!(replica_id, replica_count, "rejected replica id");
            return Err(Error::InvalidReplicaId {
                replica_id,
                replica_count,
            });
        }
        Ok(Self {
            replica_id,
            dots: HashSet::new(),
            clock: VectorClock::new(replica_count),
        })
    }

    /// The owning replica.
    #[must_use]
    pub fn replica_id(&self) -> ReplicaId {
        self.replica_id
    }

    /// Number of replicas this set was configured for.
    #[must_use]
    pub fn replica_count(&self) -> usize {
        self.clock.len()
    }

    /// Highest counter observed per replica.
    #[must_use]
    pub fn clock(&self) -> &VectorClock {
        &self.clock
    }

    /// The live dots.
    #[must_use]
    pub fn dots(&self) -> &HashSet<Dot<T>> {
        &self.dots
    }

    /// Iterate the distinct live values.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let mut seen = HashSet::new();
        self.dots
            .iter()
            .map(|dot| &dot.value)
            .filter(move |value| seen.insert(*value))
    }

    /// `(counter, replica)` pairs covered by the clock with no live dot:
    /// the removals this replica knows about.
    ///
    /// Derived on every call from the current dots and clock.
    #[must_use]
    pub fn gaps(&self) -> HashSet<(u64, ReplicaId)> {
        let live: HashSet<(u64, ReplicaId)> =
            self.dots.iter().map(|dot| (dot.counter, dot.replica)).collect();
        self.clock
            .iter()
            .flat_map(|(replica, max)| (1..=max).map(move |counter| (counter, replica)))
            .filter(|key| !live.contains(key))
            .collect()
    }

    /// Apply a local add of `value` using an externally issued `counter`,
    /// e.g. when replaying this replica's own operation log.
    ///
    /// `counter` must be exactly one past the last applied counter of this
    /// replica. On success the replica's previous dot for `value`, if any,
    /// is superseded.
    pub fn add_at(&mut self, value: T, counter: u64) -> Result<()> {
        let replica = self.replica_id;
        let expected = self.clock.get(replica) + 1;
        if counter != expected {
            tracing::debug!(replica, expected, attempted = counter, "out-of-order add");
            return Err(Error::CausalOrderViolation {
                replica,
                expected,
                attempted: counter,
            });
        }

        self.dots
            .retain(|dot| !(dot.replica == replica && dot.counter < counter && dot.value == value));
        self.clock.increment(replica);
        self.dots.insert(Dot {
            value,
            counter,
            replica,
        });
        tracing::trace!(replica, counter, "dotted set add");
        Ok(())
    }

    fn check_replica_count(&self, other: &Self) -> Result<()> {
        if self.replica_count() == other.replica_count() {
            Ok(())
        } else {
            tracing::debug!(
                expected = self.replica_count(),
                found = other.replica_count(),
                "replica count mismatch"
            );
            Err(Error::ConfigurationMismatch {
                expected: self.replica_count(),
                found: other.replica_count(),
            })
        }
    }
}

/// Wire shape of a snapshot, checked before it becomes a replica.
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct DottedClockSetRepr<T> {
    replica_id: ReplicaId,
    dots: Vec<Dot<T>>,
    clock: VectorClock,
}

#[cfg(feature = "serde")]
impl<T: Eq + Hash + Clone> TryFrom<DottedClockSetRepr<T>> for DottedClockSet<T> {
    type Error = Error;

    fn try_from(repr: DottedClockSetRepr<T>) -> Result<Self> {
        let replica_count = repr.clock.len();
        if repr.replica_id >= replica_count {
            return Err(Error::InvalidReplicaId {
                replica_id: repr.replica_id,
                replica_count,
            });
        }

        let mut keys = HashSet::new();
        for dot in &repr.dots {
            if dot.replica >= replica_count {
                return Err(Error::InvalidSnapshot("dot from unknown replica"));
            }
            if dot.counter == 0 || dot.counter > repr.clock.get(dot.replica) {
                return Err(Error::InvalidSnapshot("dot counter not covered by clock"));
            }
            if !keys.insert((&dot.value, dot.replica)) {
                return Err(Error::InvalidSnapshot("several dots for one value and replica"));
            }
        }

        Ok(Self {
            replica_id: repr.replica_id,
            dots: repr.dots.into_iter().collect(),
            clock: repr.clock,
        })
    }
}

impl<T: Eq + Hash + Clone> ReplicatedSet<T> for DottedClockSet<T> {
    fn contains(&self, value: &T) -> bool {
        self.dots.iter().any(|dot| &dot.value == value)
    }

    fn elements(&self) -> HashSet<T> {
        self.dots.iter().map(|dot| dot.value.clone()).collect()
    }

    fn add(&mut self, value: T) -> Result<()> {
        let next = self.clock.get(self.replica_id) + 1;
        self.add_at(value, next)
    }

    fn remove(&mut self, value: &T) -> bool {
        let before = self.dots.len();
        self.dots.retain(|dot| &dot.value != value);
        let removed = before - self.dots.len();
        if removed > 0 {
            tracing::trace!(replica = self.replica_id, dots = removed, "dotted set remove");
        }
        removed > 0
    }

    fn compare(&self, other: &Self) -> Result<bool> {
        self.check_replica_count(other)?;
        if !self.clock.dominated_by(&other.clock)? {
            return Ok(false);
        }
        Ok(self.gaps().is_subset(&other.gaps()))
    }

    fn merge(&mut self, other: &Self) -> Result<()> {
        self.check_replica_count(other)?;
        let before = self.dots.len();

        // Shared dots stay. A dot only one side holds survives when the
        // other side has not yet observed its counter; otherwise the other
        // side removed it.
        let mut union: HashSet<Dot<T>> = self
            .dots
            .iter()
            .filter(|dot| other.dots.contains(*dot) || dot.counter > other.clock.get(dot.replica))
            .cloned()
            .collect();
        union.extend(
            other
                .dots
                .iter()
                .filter(|dot| !self.dots.contains(*dot) && dot.counter > self.clock.get(dot.replica))
                .cloned(),
        );

        // Keep only the newest dot per (value, replica).
        let mut newest: HashMap<(&T, ReplicaId), u64> = HashMap::new();
        for dot in &union {
            let entry = newest.entry((&dot.value, dot.replica)).or_insert(dot.counter);
            *entry = (*entry).max(dot.counter);
        }
        let dots: HashSet<Dot<T>> = union
            .iter()
            .filter(|dot| newest.get(&(&dot.value, dot.replica)) == Some(&dot.counter))
            .cloned()
            .collect();

        self.clock.merge(&other.clock)?;
        self.dots = dots;

        tracing::debug!(
            replica = self.replica_id,
            dots_before = before,
            dots_after = self.dots.len(),
            clock = %self.clock,
            "dotted set merged"
        );
        Ok(())
    }
}

impl<T: Eq + Hash + Clone + fmt::Debug> fmt::Display for DottedClockSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DottedClockSet(dots: {")?;
        for (i, dot) in self.dots.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "({:?}, {}, {})", dot.value, dot.counter, dot.replica)?;
        }
        write!(f, "}}, clock: {})", self.clock)
    }
}
