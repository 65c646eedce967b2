//! Fixed-size vector clock for causal ordering between replicas.
//!
//! Entry `r` holds the highest counter issued by replica `r` that the
//! owner has observed. The number of entries is fixed at construction and
//! must match across every replica that is ever merged together; mixing
//! lengths is reported as [`Error::ConfigurationMismatch`] instead of
//! zero-padding.
//!
//! # Example
//!
//! ```
//! use orset_kit::clock::VectorClock;
//!
//! let mut a = VectorClock::new(2);
//! a.increment(0);
//!
//! let mut b = VectorClock::new(2);
//! b.increment(1);
//!
//! // Concurrent: neither dominates the other.
//! assert!(a.partial_cmp(&b).is_none());
//!
//! a.merge(&b).unwrap();
//! assert_eq!(a.as_slice(), &[1, 1]);
//! assert!(b <= a);
//! ```

use core::cmp::Ordering;
use core::fmt;

use crate::error::{Error, Result};

/// Index of a replica in `0..replica_count`.
pub type ReplicaId = usize;

/// A vector clock with one counter per participating replica.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VectorClock {
    entries: Vec<u64>,
}

impl VectorClock {
    /// Create a clock for `len` replicas with every entry at zero.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            entries: vec![0; len],
        }
    }

    /// Number of replicas this clock tracks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the clock tracks no replicas.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest observed counter for `replica`, or 0 when out of range.
    #[must_use]
    pub fn get(&self, replica: ReplicaId) -> u64 {
        self.entries.get(replica).copied().unwrap_or(0)
    }

    /// Advance the entry for `replica` by one and return the new counter.
    ///
    /// Out-of-range replicas are ignored and report 0.
    pub fn increment(&mut self, replica: ReplicaId) -> u64 {
        match self.entries.get_mut(replica) {
            Some(entry) => {
                *entry += 1;
                *entry
            }
            None => 0,
        }
    }

    /// Raise the entry for `replica` to `counter`. Entries never go backwards.
    pub fn set(&mut self, replica: ReplicaId, counter: u64) {
        if let Some(entry) = self.entries.get_mut(replica) {
            *entry = (*entry).max(counter);
        }
    }

    /// Elementwise maximum with `other`.
    pub fn merge(&mut self, other: &Self) -> Result<()> {
        self.check_len(other)?;
        for (mine, theirs) in self.entries.iter_mut().zip(&other.entries) {
            *mine = (*mine).max(*theirs);
        }
        Ok(())
    }

    /// Returns `true` if every entry of `self` is `<=` the matching entry of
    /// `other`, i.e. `other` has observed everything `self` has.
    pub fn dominated_by(&self, other: &Self) -> Result<bool> {
        self.check_len(other)?;
        Ok(self.entries.iter().zip(&other.entries).all(|(a, b)| a <= b))
    }

    /// Iterate `(replica, counter)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (ReplicaId, u64)> + '_ {
        self.entries.iter().copied().enumerate()
    }

    /// Raw counters indexed by replica id.
    #[must_use]
    pub fn as_slice(&self) -> &[u64] {
        &self.entries
    }

    fn check_len(&self, other: &Self) -> Result<()> {
        if self.entries.len() == other.entries.len() {
            Ok(())
        } else {
            Err(Error::ConfigurationMismatch {
                expected: self.entries.len(),
                found: other.entries.len(),
            })
        }
    }
}

impl PartialOrd for VectorClock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.entries.len() != other.entries.len() {
            return None;
        }
        let mut less = false;
        let mut greater = false;
        for (a, b) in self.entries.iter().zip(&other.entries) {
            match a.cmp(b) {
                Ordering::Less => less = true,
                Ordering::Greater => greater = true,
                Ordering::Equal => {}
            }
        }
        match (less, greater) {
            (false, false) => Some(Ordering::Equal),
            (true, false) => Some(Ordering::Less),
            (false, true) => Some(Ordering::Greater),
            (true, true) => None,
        }
    }
}

impl fmt::Display for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, counter) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{counter}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_clock_is_zero() {
        let clock = VectorClock::new(3);
        assert_eq!(clock.len(), 3);
        assert_eq!(clock.as_slice(), &[0, 0, 0]);
        assert_eq!(clock.get(7), 0);
    }

    #[test]
    fn increment_returns_new_counter() {
        let mut clock = VectorClock::new(2);
        assert_eq!(clock.increment(1), 1);
        assert_eq!(clock.increment(1), 2);
        assert_eq!(clock.as_slice(), &[0, 2]);
    }

    #[test]
    fn set_never_lowers_an_entry() {
        let mut clock = VectorClock::new(1);
        clock.set(0, 4);
        clock.set(0, 2);
        assert_eq!(clock.get(0), 4);
    }

    #[test]
    fn merge_takes_elementwise_max() {
        let mut a = VectorClock::new(3);
        a.set(0, 5);
        a.set(2, 1);
        let mut b = VectorClock::new(3);
        b.set(1, 3);
        b.set(2, 4);

        a.merge(&b).unwrap();
        assert_eq!(a.as_slice(), &[5, 3, 4]);
    }

    #[test]
    fn merge_rejects_length_mismatch() {
        let mut a = VectorClock::new(2);
        let b = VectorClock::new(3);
        assert_eq!(
            a.merge(&b),
            Err(Error::ConfigurationMismatch {
                expected: 2,
                found: 3
            })
        );
        assert_eq!(a.as_slice(), &[0, 0]);
    }

    #[test]
    fn partial_order_detects_concurrency() {
        let mut a = VectorClock::new(2);
        a.increment(0);
        let mut b = VectorClock::new(2);
        b.increment(1);

        assert_eq!(a.partial_cmp(&b), None);
        assert!(!a.dominated_by(&b).unwrap());

        let mut c = a.clone();
        c.merge(&b).unwrap();
        assert!(a < c);
        assert!(b < c);
        assert!(a.dominated_by(&c).unwrap());
        assert_eq!(c.partial_cmp(&c), Some(Ordering::Equal));
    }

    #[test]
    fn display_lists_counters() {
        let mut clock = VectorClock::new(2);
        clock.increment(0);
        assert_eq!(clock.to_string(), "[1, 0]");
    }
}
