//! Convenient re-exports for common usage.
//!
//! ```
//! use orset_kit::prelude::*;
//! ```

pub use crate::DottedClockSet;
pub use crate::Error;
pub use crate::ReplicatedSet;
pub use crate::TombstoneSet;
pub use crate::VectorClock;
