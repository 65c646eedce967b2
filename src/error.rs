//! Error type shared by both set variants.

use crate::clock::ReplicaId;

/// Errors returned by replica construction, merge and compare.
///
/// Every variant is raised before any state is touched, so a failed call
/// leaves the receiving replica exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A replica id outside `0..replica_count` was requested.
    #[error("replica id {replica_id} is out of range for {replica_count} replicas")]
    InvalidReplicaId {
        /// The rejected id.
        replica_id: ReplicaId,
        /// Number of replicas the set was configured for.
        replica_count: usize,
    },

    /// Two replicas configured for a different number of peers met in a
    /// merge or compare.
    #[error("vector clock length mismatch: expected {expected}, found {found}")]
    ConfigurationMismatch {
        /// Clock length of the receiving replica.
        expected: usize,
        /// Clock length of the other replica.
        found: usize,
    },

    /// A local add skipped or replayed a counter of the owning replica.
    #[error("causal order violation on replica {replica}: expected counter {expected}, got {attempted}")]
    CausalOrderViolation {
        /// Replica whose counter sequence was broken.
        replica: ReplicaId,
        /// The only counter that may be applied next.
        expected: u64,
        /// The counter that was offered.
        attempted: u64,
    },

    /// A deserialized snapshot breaks an invariant the operations maintain.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(&'static str),
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_values() {
        let err = Error::InvalidReplicaId {
            replica_id: 3,
            replica_count: 2,
        };
        assert_eq!(
            err.to_string(),
            "replica id 3 is out of range for 2 replicas"
        );

        let err = Error::CausalOrderViolation {
            replica: 0,
            expected: 5,
            attempted: 7,
        };
        assert!(err.to_string().contains("expected counter 5, got 7"));
    }
}
