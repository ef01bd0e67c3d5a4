//! Test plan synthesis
//!
//! Turns a compiled condition list into frame-by-frame RAM writes that should
//! unlock it when replayed through [`crate::executor::PlanExecutor`].

mod builder;
mod plan;
mod solver;

pub use builder::build_plan;
pub use plan::{ByteWrite, Step, TestPlan};
