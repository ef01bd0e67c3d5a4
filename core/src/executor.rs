//! Plan execution
//!
//! Replays a [`TestPlan`] against a writable RAM domain one frame at a time,
//! optionally watching an engine for the target achievement to unlock.

use crate::planner::TestPlan;
use crate::ram::{FrameStepper, MemoryDomain};
use crate::runtime::AchievementEngine;

/// Applies plan steps to a console.
#[derive(Default)]
pub struct PlanExecutor<'e> {
    /// Engine to consult after each frame and the id it should unlock.
    watch: Option<(&'e mut AchievementEngine, String)>,
}

impl<'e> PlanExecutor<'e> {
    /// Executor that only applies writes; `run` succeeds once every step ran.
    pub fn new() -> Self {
        Self { watch: None }
    }

    /// Executor that stops as soon as `engine` reports `id` unlocked.
    pub fn with_engine(engine: &'e mut AchievementEngine, id: impl Into<String>) -> Self {
        Self {
            watch: Some((engine, id.into())),
        }
    }

    /// Run `plan` on `console`.
    ///
    /// With an engine attached, returns `true` on the frame the target unlocks
    /// and `false` if the plan finishes without it. Without one, returns `true`
    /// after the last step.
    pub fn run<T>(&mut self, plan: &TestPlan, console: &mut T) -> bool
    where
        T: MemoryDomain + FrameStepper + ?Sized,
    {
        let size = console.size();
        for (index, step) in plan.iter().enumerate() {
            if size > 0 {
                for write in &step.writes {
                    let address = write.address as usize % size;
                    let merged = write.apply(console.peek(address));
                    console.poke(address, merged);
                }
            }
            tracing::debug!(step = index, writes = step.writes.len(), comment = %step.comment, "plan step");
            console.run_frame();

            if let Some((engine, id)) = self.watch.as_mut() {
                let unlocked = engine.evaluate_frame(&*console);
                if unlocked.iter().any(|u| u.eq_ignore_ascii_case(id)) {
                    tracing::info!(id = %id, step = index, "achievement unlocked by plan");
                    return true;
                }
            }
        }

        match &self.watch {
            Some((_, id)) => {
                tracing::debug!(id = %id, steps = plan.len(), "plan finished without unlock");
                false
            }
            None => true,
        }
    }
}
