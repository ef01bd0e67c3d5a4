//! Per-achievement runtime state.

use cheevo_shared::Numeric;

use crate::formula::Condition;

/// A compiled achievement and its mutable progress.
#[derive(Debug, Clone, PartialEq)]
pub struct Achievement {
    pub(crate) id: String,
    pub(crate) formula: String,
    pub(crate) conditions: Vec<Condition>,
    pub(crate) primed: bool,
    /// Sticky; only a power-on reset clears it.
    pub(crate) unlocked: bool,
    pub(crate) remembered: Option<Numeric>,
    pub(crate) measured_current: f64,
    pub(crate) measured_target: f64,
    pub(crate) measured_is_percent: bool,
    pub(crate) measured_active: bool,
}

impl Achievement {
    pub fn new(id: impl Into<String>, formula: impl Into<String>, conditions: Vec<Condition>) -> Self {
        Self {
            id: id.into(),
            formula: formula.into(),
            conditions,
            primed: false,
            unlocked: false,
            remembered: None,
            measured_current: 0.0,
            measured_target: 0.0,
            measured_is_percent: false,
            measured_active: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_primed(&self) -> bool {
        self.primed
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    pub fn remembered(&self) -> Option<Numeric> {
        self.remembered
    }

    pub fn measured_current(&self) -> f64 {
        self.measured_current
    }

    pub fn measured_target(&self) -> f64 {
        self.measured_target
    }

    pub fn measured_is_percent(&self) -> bool {
        self.measured_is_percent
    }

    pub fn measured_active(&self) -> bool {
        self.measured_active
    }

    /// Measured progress in `0.0..=1.0`, if anything is measured.
    pub fn measured_fraction(&self) -> Option<f64> {
        if !self.measured_active || self.measured_target <= 0.0 {
            return None;
        }
        Some((self.measured_current / self.measured_target).clamp(0.0, 1.0))
    }

    /// Effect of a firing ResetIf: hit counters, remembered value and priming.
    pub(crate) fn reset_progress(&mut self) {
        for condition in &mut self.conditions {
            condition.reset();
        }
        self.remembered = None;
        self.primed = false;
    }

    /// Back to power-on defaults, including `unlocked`.
    pub(crate) fn reset_to_power_on(&mut self) {
        self.reset_progress();
        self.unlocked = false;
        self.measured_current = 0.0;
        self.measured_target = 0.0;
        self.measured_is_percent = false;
        self.measured_active = false;
    }
}
