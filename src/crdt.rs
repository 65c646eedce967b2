use std::collections::HashSet;
use std::hash::Hash;

use crate::error::Result;

/// Contract shared by every add-wins replicated set in this crate.
///
/// Each replica mutates its own instance with [`add`](Self::add) and
/// [`remove`](Self::remove), and periodically folds in a full snapshot of a
/// peer with [`merge`](Self::merge). Instances are not internally
/// synchronized; a replica is driven by a single thread of control.
///
/// # Properties
///
/// All implementations must satisfy, for states reachable through the
/// public operations:
/// - **Commutativity:** `a.merge(b)` and `b.merge(a)` reach the same state
/// - **Associativity:** merge order across three replicas does not matter
/// - **Idempotency:** `a.merge(a)` leaves `a` unchanged
/// - **Add-wins:** a remove only affects add events the remover observed
pub trait ReplicatedSet<T>
where
    T: Eq + Hash + Clone,
{
    /// Returns `true` if some live instance of `value` exists.
    fn contains(&self, value: &T) -> bool;

    /// Snapshot of the distinct live values.
    fn elements(&self) -> HashSet<T>;

    /// Record a local add of `value`.
    fn add(&mut self, value: T) -> Result<()>;

    /// Remove every live instance of `value` this replica has observed.
    ///
    /// Returns `true` if anything was removed.
    fn remove(&mut self, value: &T) -> bool;

    /// Causal-precedence test: `true` if `other` has observed everything
    /// `self` has, including every removal. Read-only.
    fn compare(&self, other: &Self) -> Result<bool>;

    /// Fold `other`'s state into this replica. Only `self` is mutated.
    fn merge(&mut self, other: &Self) -> Result<()>;

    /// Number of distinct live values.
    fn len(&self) -> usize {
        self.elements().len()
    }

    /// Returns `true` if no value is live.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Non-mutating merge: a copy of `self` with `other` folded in.
    fn merged(&self, other: &Self) -> Result<Self>
    where
        Self: Clone,
    {
        let mut out = self.clone();
        out.merge(other)?;
        Ok(out)
    }
}
