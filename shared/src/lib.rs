//! Shared types for the cheevo achievement engine.
//!
//! Holds the numeric value model every condition comparison runs on and the
//! serializable state snapshot exchanged with persistence layers.

pub mod numeric;
pub mod snapshot;

pub use numeric::Numeric;
pub use snapshot::{
    AchievementProgress, ConditionProgress, NumberKind, STATE_SCHEMA_VERSION, StateSnapshot,
    StoredNumber,
};
