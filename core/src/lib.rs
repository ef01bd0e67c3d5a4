//! Cheevo Core - achievement formulas evaluated against console RAM
//!
//! This crate compiles compact achievement formulas into condition lists,
//! evaluates them once per emulated frame, and synthesizes RAM-write plans
//! that prove a formula can be satisfied.
//!
//! # Architecture
//!
//! - [`FormulaCompiler`] - Formula text to [`Condition`] sequence
//! - [`AchievementEngine`] - Per-frame evaluation over triple-buffered RAM snapshots
//! - [`build_plan`] - Condition sequence to [`TestPlan`] of masked byte writes
//! - [`PlanExecutor`] - Applies a plan to a live memory domain and frame stepper

pub mod config;
pub mod executor;
pub mod formula;
pub mod planner;
pub mod ram;
pub mod runtime;
#[cfg(test)]
pub mod test_utils;

pub use config::{CompilerConfig, Config, ConfigError, VerifyConfig};
pub use executor::PlanExecutor;
pub use formula::{
    CompareOp, Condition, ConditionFlag, FormulaCompiler, FormulaWarning, MemoryRef, Modifiers,
    Operand, Prefix, check, decompile,
};
pub use planner::{ByteWrite, Step, TestPlan, build_plan};
pub use ram::{FrameStepper, MemoryDomain, NES_SYSTEM_RAM_SIZE, RamDomain, RamError, SystemRam};
pub use runtime::{Achievement, AchievementEngine};

// Re-export shared types used throughout the public API
pub use cheevo_shared::{Numeric, StateSnapshot};
