//! Per-frame condition evaluation
//!
//! One call evaluates one achievement against the current snapshots:
//!
//! 1. Any true PauseIf freezes the achievement for the frame.
//! 2. MeasuredIf lines decide whether measured values are published.
//! 3. A left-to-right pass applies resets, accumulators, chains and hit
//!    counters, and collects the priming result.
//! 4. Once primed, triggers accrue hits and decide the unlock.
//! 5. Measured values are published.
//!
//! Condition order is load-bearing: chains, ResetNextIf targets and
//! accumulator reset points are all positional.

use cheevo_shared::Numeric;

use super::achievement::Achievement;
use super::snapshots::RamSnapshots;
use crate::formula::{Condition, ConditionFlag, Operand};

/// Running AddSource/SubSource sum and AddAddress bias.
#[derive(Debug, Clone, Copy, Default)]
struct Accumulators {
    source: Numeric,
    bias: i64,
}

/// Trigger work postponed until the achievement is primed.
#[derive(Debug, Clone, Copy)]
enum Deferred {
    Single {
        index: usize,
        acc: Accumulators,
    },
    Chain {
        start: usize,
        end: usize,
        target: usize,
        acc: Accumulators,
    },
}

#[derive(Debug, Default)]
struct MeasuredTally {
    active: bool,
    percent: bool,
    current: f64,
    target: f64,
}

struct Frame<'a> {
    ram: &'a RamSnapshots,
    remembered: Option<Numeric>,
}

impl Frame<'_> {
    fn operand(&self, operand: &Operand, bias: i64) -> Numeric {
        match operand {
            Operand::Memory(mem) => self.ram.read(mem, bias),
            Operand::Constant(value) => *value,
            Operand::Recall => self.remembered.unwrap_or(Numeric::ZERO),
        }
    }

    /// Left operand with the running source sum folded in.
    fn left(&self, condition: &Condition, acc: Accumulators) -> Numeric {
        self.operand(&condition.left, acc.bias) + acc.source
    }

    fn raw(&self, condition: &Condition, acc: Accumulators) -> bool {
        let left = self.left(condition, acc);
        let right = self.operand(&condition.right, acc.bias);
        condition.op.test(left.compare(&right))
    }

    /// Combined truth of `start..=end`; OR if any member is OrNext.
    fn chain(&self, conditions: &[Condition], start: usize, end: usize, acc: Accumulators) -> bool {
        let members = &conditions[start..=end];
        let mut results = members.iter().map(|c| self.raw(c, acc));
        if members.iter().any(|c| c.flag == ConditionFlag::OrNext) {
            results.any(|truth| truth)
        } else {
            results.all(|truth| truth)
        }
    }
}

/// Evaluate one frame. Returns true when the achievement unlocks on this frame.
pub(crate) fn evaluate(achievement: &mut Achievement, ram: &RamSnapshots) -> bool {
    if achievement.unlocked {
        return false;
    }

    let mut frame = Frame {
        ram,
        remembered: achievement.remembered,
    };
    let conditions = &mut achievement.conditions;
    let zero = Accumulators::default();

    let paused = conditions
        .iter()
        .any(|c| c.flag == ConditionFlag::PauseIf && frame.raw(c, zero));
    if paused {
        achievement.primed = false;
        return false;
    }

    let gate_ok = conditions
        .iter()
        .filter(|c| c.flag == ConditionFlag::MeasuredIf)
        .all(|c| frame.raw(c, zero));

    let count = conditions.len();
    let mut acc = Accumulators::default();
    let mut all_met = true;
    let mut deferred = Vec::new();
    let mut measured = MeasuredTally::default();
    let mut index = 0;

    while index < count {
        let flag = conditions[index].flag;
        match flag {
            ConditionFlag::PauseIf | ConditionFlag::MeasuredIf => {}
            ConditionFlag::ResetNextIf => {
                if frame.raw(&conditions[index], acc) && index + 1 < count {
                    conditions[index + 1].reset();
                }
            }
            ConditionFlag::ResetIf => {
                if frame.raw(&conditions[index], acc) {
                    tracing::debug!(id = %achievement.id, index, "reset");
                    achievement.reset_progress();
                    return false;
                }
            }
            ConditionFlag::AddSource => {
                acc.source = acc.source + frame.operand(&conditions[index].left, 0);
                index += 1;
                continue;
            }
            ConditionFlag::SubSource => {
                acc.source = acc.source - frame.operand(&conditions[index].left, 0);
                index += 1;
                continue;
            }
            ConditionFlag::AddAddress => {
                acc.bias = acc
                    .bias
                    .wrapping_add(frame.operand(&conditions[index].left, 0).as_i64());
                index += 1;
                continue;
            }
            ConditionFlag::AndNext | ConditionFlag::OrNext => {
                let start = index;
                let mut end = index;
                while end < count && conditions[end].flag.is_chain_link() {
                    end += 1;
                }
                let end = end.min(count - 1);
                let target = (start..=end)
                    .find(|&i| conditions[i].hit_target > 0)
                    .unwrap_or(end);

                match conditions[end].flag {
                    ConditionFlag::Trigger => deferred.push(Deferred::Chain {
                        start,
                        end,
                        target,
                        acc,
                    }),
                    ConditionFlag::PauseIf | ConditionFlag::MeasuredIf => {}
                    ConditionFlag::ResetIf => {
                        if frame.chain(conditions, start, end, acc) {
                            tracing::debug!(id = %achievement.id, index = end, "reset");
                            achievement.reset_progress();
                            return false;
                        }
                    }
                    ConditionFlag::ResetNextIf => {
                        if frame.chain(conditions, start, end, acc) && end + 1 < count {
                            conditions[end + 1].reset();
                        }
                    }
                    end_flag => {
                        let truth = frame.chain(conditions, start, end, acc);
                        conditions[target].apply_hits(truth);
                        all_met &= conditions[target].is_met;
                        if end_flag.is_measured() {
                            measured.record(&frame, &conditions[end], acc);
                        }
                    }
                }
                acc = Accumulators::default();
                index = end + 1;
                continue;
            }
            ConditionFlag::AddHits | ConditionFlag::SubHits => {
                if frame.raw(&conditions[index], acc) && index > 0 {
                    conditions[index - 1].adjust_hits(flag == ConditionFlag::AddHits);
                }
            }
            ConditionFlag::Remember => {
                let value = frame.left(&conditions[index], acc);
                frame.remembered = Some(value);
                achievement.remembered = Some(value);
            }
            ConditionFlag::Trigger => deferred.push(Deferred::Single { index, acc }),
            ConditionFlag::None | ConditionFlag::Measured | ConditionFlag::MeasuredPercent => {
                let truth = frame.raw(&conditions[index], acc);
                let condition = &mut conditions[index];
                condition.apply_hits(truth);
                all_met &= condition.is_met;
                if flag.is_measured() {
                    measured.record(&frame, &conditions[index], acc);
                }
            }
        }
        acc = Accumulators::default();
        index += 1;
    }

    achievement.primed = all_met;

    if all_met {
        let mut triggers_met = true;
        for work in &deferred {
            let (target, truth) = match *work {
                Deferred::Single { index, acc } => (index, frame.raw(&conditions[index], acc)),
                Deferred::Chain {
                    start,
                    end,
                    target,
                    acc,
                } => (target, frame.chain(conditions, start, end, acc)),
            };
            conditions[target].apply_hits(truth);
            triggers_met &= conditions[target].is_met;
        }
        if triggers_met {
            achievement.unlocked = true;
            return true;
        }
    }

    achievement.measured_active = measured.active;
    achievement.measured_is_percent = measured.percent;
    if measured.active && gate_ok {
        achievement.measured_current = measured.current;
        achievement.measured_target = if measured.target <= 0.0 {
            1.0
        } else {
            measured.target
        };
    } else {
        achievement.measured_current = 0.0;
        achievement.measured_target = 0.0;
    }
    false
}

impl MeasuredTally {
    fn record(&mut self, frame: &Frame<'_>, condition: &Condition, acc: Accumulators) {
        let target = if condition.hit_target > 0 {
            f64::from(condition.hit_target)
        } else if let Some(value) = condition.right.constant() {
            value.as_f64()
        } else {
            1.0
        };
        let current = frame.left(condition, acc).as_f64();

        self.percent |= condition.flag == ConditionFlag::MeasuredPercent;
        if !self.active {
            self.active = true;
            self.current = current.max(0.0);
            self.target = target;
        } else {
            self.current = self.current.max(current);
            self.target = self.target.max(target);
        }
    }
}
