use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use crate::crdt::ReplicatedSet;
use crate::error::Result;

/// Globally unique identifier of a single add event.
///
/// 128 random bits minted locally; no coordination between replicas is
/// needed and collisions are treated as impossible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceId(u128);

impl InstanceId {
    /// Mint a fresh random identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(rand::random())
    }

    /// The raw 128-bit value.
    #[must_use]
    pub fn as_u128(&self) -> u128 {
        self.0
    }
}

impl From<u128> for InstanceId {
    fn from(raw: u128) -> Self {
        Self(raw)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// One element instance: the value plus the id of the add that created it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tag<T> {
    /// The element value.
    pub value: T,
    /// Identifier minted by the add.
    pub id: InstanceId,
}

/// An observed-remove set that keeps every removed instance as a tombstone.
///
/// Every add mints a fresh [`Tag`]. A remove retires the tags the remover
/// can currently see, so a concurrent add elsewhere carries a tag the
/// remove never saw and survives the merge (add-wins). Tombstones are
/// never collected, so metadata grows with the number of removals.
///
/// # Example
///
/// ```
/// use orset_kit::prelude::*;
///
/// let mut a = TombstoneSet::new();
/// a.add("apple").unwrap();
///
/// let mut b = TombstoneSet::new();
/// b.merge(&a).unwrap();
/// assert!(b.contains(&"apple"));
///
/// a.remove(&"apple");
/// b.add("apple").unwrap(); // concurrent re-add on b
///
/// a.merge(&b).unwrap();
/// b.merge(&a).unwrap();
/// assert!(a.contains(&"apple"));
/// assert_eq!(a.elements(), b.elements());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(
        try_from = "TombstoneSetRepr<T>",
        bound(deserialize = "T: Eq + Hash + Clone + serde::Deserialize<'de>")
    )
)]
pub struct TombstoneSet<T: Eq + Hash + Clone> {
    live: HashSet<Tag<T>>,
    tombstones: HashSet<Tag<T>>,
}

impl<T: Eq + Hash + Clone> TombstoneSet<T> {
    /// Create a new empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            live: HashSet::new(),
            tombstones: HashSet::new(),
        }
    }

    /// Currently visible element instances.
    #[must_use]
    pub fn live(&self) -> &HashSet<Tag<T>> {
        &self.live
    }

    /// Permanently retired element instances.
    #[must_use]
    pub fn tombstones(&self) -> &HashSet<Tag<T>> {
        &self.tombstones
    }

    /// Iterate the distinct live values.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let mut seen = HashSet::new();
        self.live
            .iter()
            .map(|tag| &tag.value)
            .filter(move |value| seen.insert(*value))
    }

    /// Strict monotonicity law: `Live ⊆ other.Live` and
    /// `Tombstones ⊆ other.Tombstones`.
    ///
    /// Stronger than [`compare`](ReplicatedSet::compare): it fails when
    /// `other` has since removed a tag that is still live here.
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.live.is_subset(&other.live) && self.tombstones.is_subset(&other.tombstones)
    }

    /// The reference comparison formula, kept for compatibility checks:
    /// `(other.Live ∪ other.Tombstones) ⊆ other.Live` and
    /// `(Live ∪ Tombstones) ⊆ other.Tombstones`.
    ///
    /// Because live tags and tombstones are disjoint this only holds when
    /// `other` has no tombstones and `self` holds no tags at all. Use
    /// [`compare`](ReplicatedSet::compare) for causal precedence.
    #[must_use]
    pub fn compare_reference(&self, other: &Self) -> bool {
        let other_seen_in_live = other
            .live
            .iter()
            .chain(&other.tombstones)
            .all(|tag| other.live.contains(tag));
        let self_seen_in_tombstones = self
            .live
            .iter()
            .chain(&self.tombstones)
            .all(|tag| other.tombstones.contains(tag));
        other_seen_in_live && self_seen_in_tombstones
    }
}

impl<T: Eq + Hash + Clone> Default for TombstoneSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
#[serde(bound(deserialize = "T: Eq + Hash + serde::Deserialize<'de>"))]
struct TombstoneSetRepr<T> {
    live: HashSet<Tag<T>>,
    tombstones: HashSet<Tag<T>>,
}

#[cfg(feature = "serde")]
impl<T: Eq + Hash + Clone> TryFrom<TombstoneSetRepr<T>> for TombstoneSet<T> {
    type Error = crate::Error;

    fn try_from(repr: TombstoneSetRepr<T>) -> Result<Self> {
        if !repr.live.is_disjoint(&repr.tombstones) {
            return Err(crate::Error::InvalidSnapshot("tag is both live and tombstoned"));
        }
        Ok(Self {
            live: repr.live,
            tombstones: repr.tombstones,
        })
    }
}

impl<T: Eq + Hash + Clone> ReplicatedSet<T> for TombstoneSet<T> {
    fn contains(&self, value: &T) -> bool {
        self.live.iter().any(|tag| &tag.value == value)
    }

    fn elements(&self) -> HashSet<T> {
        self.live.iter().map(|tag| tag.value.clone()).collect()
    }

    fn add(&mut self, value: T) -> Result<()> {
        let tag = Tag {
            value,
            id: InstanceId::random(),
        };
        tracing::trace!(id = %tag.id, "tombstone set add");
        self.live.insert(tag);
        let tombstones = &self.tombstones;
        self.live.retain(|tag| !tombstones.contains(tag));
        Ok(())
    }

    fn remove(&mut self, value: &T) -> bool {
        let observed: Vec<Tag<T>> = self
            .live
            .iter()
            .filter(|tag| &tag.value == value)
            .cloned()
            .collect();
        if observed.is_empty() {
            return false;
        }
        tracing::trace!(tags = observed.len(), "tombstone set remove");
        for tag in observed {
            self.live.remove(&tag);
            self.tombstones.insert(tag);
        }
        true
    }

    fn compare(&self, other: &Self) -> Result<bool> {
        let removals_known = self.tombstones.is_subset(&other.tombstones);
        let adds_known = self
            .live
            .iter()
            .all(|tag| other.live.contains(tag) || other.tombstones.contains(tag));
        Ok(removals_known && adds_known)
    }

    fn merge(&mut self, other: &Self) -> Result<()> {
        let before = (self.live.len(), self.tombstones.len());

        self.tombstones.extend(other.tombstones.iter().cloned());
        self.live.extend(other.live.iter().cloned());
        // A tag tombstoned on either side stays dead, so live and
        // tombstones remain disjoint.
        let tombstones = &self.tombstones;
        self.live.retain(|tag| !tombstones.contains(tag));

        tracing::debug!(
            live_before = before.0,
            tombstones_before = before.1,
            live_after = self.live.len(),
            tombstones_after = self.tombstones.len(),
            "tombstone set merged"
        );
        Ok(())
    }
}

impl<T: Eq + Hash + Clone + fmt::Debug> fmt::Display for TombstoneSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TombstoneSet(live: {")?;
        write_tags(f, &self.live)?;
        f.write_str("}, tombstones: {")?;
        write_tags(f, &self.tombstones)?;
        f.write_str("})")
    }
}

fn write_tags<T: fmt::Debug>(f: &mut fmt::Formatter<'_>, tags: &HashSet<Tag<T>>) -> fmt::Result {
    for (i, tag) in tags.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "({:?}, {})", tag.value, tag.id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values<T: Eq + Hash + Clone>(set: &TombstoneSet<T>) -> HashSet<T> {
        set.elements()
    }

    #[test]
    fn new_set_is_empty() {
        let s = TombstoneSet::<String>::new();
        assert!(s.is_empty());
        assert_eq!(s.len(), 0);
        assert!(s.tombstones().is_empty());
    }

    #[test]
    fn add_and_contains() {
        let mut s = TombstoneSet::new();
        s.add("x").unwrap();
        assert!(s.contains(&"x"));
        assert!(!s.contains(&"y"));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn repeated_adds_mint_distinct_tags() {
        let mut s = TombstoneSet::new();
        s.add(1).unwrap();
        s.add(1).unwrap();
        assert_eq!(s.live().len(), 2);
        assert_eq!(s.len(), 1);
        assert_eq!(s.iter().count(), 1);
    }

    #[test]
    fn remove_moves_tags_to_tombstones() {
        let mut s = TombstoneSet::new();
        s.add(1).unwrap();
        s.add(1).unwrap();
        s.add(2).unwrap();

        assert!(s.remove(&1));
        assert!(!s.contains(&1));
        assert_eq!(s.tombstones().len(), 2);
        assert_eq!(values(&s), HashSet::from([2]));
        assert!(s.live().is_disjoint(s.tombstones()));
    }

    #[test]
    fn remove_absent_returns_false() {
        let mut s = TombstoneSet::<i32>::new();
        assert!(!s.remove(&9));
        assert!(s.tombstones().is_empty());
    }

    #[test]
    fn readd_after_remove() {
        let mut s = TombstoneSet::new();
        s.add("x").unwrap();
        s.remove(&"x");
        s.add("x").unwrap();
        assert!(s.contains(&"x"));
        assert_eq!(s.tombstones().len(), 1);
    }

    #[test]
    fn merge_propagates_removal_of_shared_tag() {
        let mut a = TombstoneSet::new();
        a.add(1).unwrap();
        let mut b = TombstoneSet::new();
        b.merge(&a).unwrap();
        assert!(b.contains(&1));

        a.remove(&1);
        b.merge(&a).unwrap();
        assert!(!b.contains(&1));
        assert!(b.live().is_disjoint(b.tombstones()));
    }

    #[test]
    fn concurrent_add_survives_remove() {
        let mut a = TombstoneSet::new();
        a.add("x").unwrap();
        let mut b = a.clone();

        a.remove(&"x");
        b.add("x").unwrap();

        a.merge(&b).unwrap();
        assert!(a.contains(&"x"));
        assert_eq!(a.live().len(), 1);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut a = TombstoneSet::new();
        a.add(1).unwrap();
        a.add(2).unwrap();
        a.remove(&1);

        let snapshot = a.clone();
        a.merge(&snapshot).unwrap();
        assert_eq!(a, snapshot);
    }

    #[test]
    fn merge_is_commutative() {
        let mut a = TombstoneSet::new();
        a.add(1).unwrap();
        a.add(2).unwrap();
        let mut b = a.clone();
        a.remove(&2);
        b.add(3).unwrap();
        b.remove(&1);

        let left = a.merged(&b).unwrap();
        let right = b.merged(&a).unwrap();
        assert_eq!(left, right);
        assert_eq!(values(&left), HashSet::from([3]));
    }

    #[test]
    fn compare_tracks_causal_inclusion() {
        let mut a = TombstoneSet::new();
        let mut b = TombstoneSet::new();
        assert!(a.compare(&b).unwrap());

        a.add(1).unwrap();
        assert!(!a.compare(&b).unwrap());
        b.merge(&a).unwrap();
        assert!(a.compare(&b).unwrap());

        a.remove(&1);
        assert!(!a.compare(&b).unwrap());
        // b has seen less than a: a's removal covers b's live tag.
        assert!(b.compare(&a).unwrap());
        assert!(!b.is_subset(&a));

        b.merge(&a).unwrap();
        assert!(a.compare(&b).unwrap());
        assert!(a.is_subset(&b));
    }

    #[test]
    fn compare_reference_only_holds_for_empty_self() {
        let empty = TombstoneSet::<i32>::new();
        let mut other = TombstoneSet::new();
        other.add(1).unwrap();
        assert!(empty.compare_reference(&other));

        let mut a = TombstoneSet::new();
        a.add(1).unwrap();
        let b = a.clone();
        assert!(!a.compare_reference(&b));
        assert!(a.compare(&b).unwrap());

        other.remove(&1);
        assert!(!empty.compare_reference(&other));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn snapshot_with_live_tombstoned_tag_is_rejected() {
        let tag = r#"{"value":1,"id":42}"#;
        let json = format!(r#"{{"live":[{tag}],"tombstones":[{tag}]}}"#);
        let err = serde_json::from_str::<TombstoneSet<i32>>(&json).unwrap_err();
        assert!(err.to_string().contains("tag is both live and tombstoned"));

        let json = format!(r#"{{"live":[{tag}],"tombstones":[]}}"#);
        let set: TombstoneSet<i32> = serde_json::from_str(&json).unwrap();
        assert!(set.contains(&1));
    }

    #[test]
    fn display_renders_both_sets() {
        let mut s = TombstoneSet::new();
        s.add(7).unwrap();
        let rendered = s.to_string();
        assert!(rendered.starts_with("TombstoneSet(live: {(7, "));
        assert!(rendered.ends_with("}, tombstones: {})"));
    }

    #[test]
    fn instance_id_renders_as_hex() {
        let id = InstanceId::from(0xabcu128);
        assert_eq!(id.to_string(), "00000000000000000000000000000abc");
        assert_ne!(InstanceId::random(), InstanceId::random());
    }
}
