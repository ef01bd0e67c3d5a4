//! Achievement runtime
//!
//! Per-achievement state, the per-frame evaluator, the triple-buffered RAM
//! snapshots it reads, and the engine that ties them together.

mod achievement;
mod engine;
mod evaluator;
mod snapshots;
mod state;

pub use achievement::Achievement;
pub use engine::AchievementEngine;
pub use snapshots::RamSnapshots;
