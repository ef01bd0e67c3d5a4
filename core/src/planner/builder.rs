//! Plan synthesis
//!
//! Builds a [`TestPlan`] that drives a condition list true:
//!
//! 1. Expand AND/OR chains into the conditions that must hold
//! 2. Neutralize PauseIf/ResetIf/ResetNextIf
//! 3. One static step satisfying every non-delta requirement
//! 4. A ramp per "value increased" delta requirement
//! 5. Empty hold steps until static hit targets can be reached
//! 6. A trigger step plus holds for trigger hit targets

use super::plan::{ByteWrite, Step, TestPlan};
use super::solver::{writes_for, writes_for_decoded};
use crate::formula::{CompareOp, Condition, ConditionFlag, MemoryRef, Operand};

/// A condition the plan has to make true.
#[derive(Debug, Clone, Copy)]
struct Requirement<'a> {
    condition: &'a Condition,
    trigger: bool,
}

/// Build a plan that satisfies `conditions`.
pub fn build_plan(conditions: &[Condition]) -> TestPlan {
    let requirements = expand(conditions);
    let mut steps = Vec::new();

    let neutralize: Vec<ByteWrite> = conditions
        .iter()
        .filter(|c| c.flag.is_disruptive())
        .flat_map(|c| writes_for(c, false))
        .collect();
    if !neutralize.is_empty() {
        steps.push(Step::new("Neutralize pause/reset conditions").with_writes(neutralize));
    }

    let (deltas, statics): (Vec<_>, Vec<_>) = requirements
        .iter()
        .filter(|r| !r.trigger)
        .map(|r| r.condition)
        .partition(|c| delta_pattern(c).is_some());

    // `x > d(x)` holds while the previous frame read non-zero, so seed the ramp with 1.
    // A prior ramp seeds 0 and settles one more frame at 0 so it never compares
    // against RAM from before the plan.
    let mut static_writes: Vec<ByteWrite> = statics.iter().flat_map(|c| writes_for(c, true)).collect();
    for condition in &deltas {
        if let Some(mem) = delta_pattern(condition) {
            let seed = if mem_prior_pattern(condition) { 0 } else { 1 };
            static_writes.extend(writes_for_decoded(mem, seed));
        }
    }
    steps.push(Step::new("Satisfy static conditions").with_writes(static_writes));

    let mut ramp_len = 0u32;
    for condition in &deltas {
        let Some(mem) = delta_pattern(condition) else {
            continue;
        };
        let settle = u32::from(mem_prior_pattern(condition));
        let frames = condition.hit_target.max(1) + settle;
        let max = mem.prefix.max_value() as i64;
        for k in 0..frames {
            let value = (1 + i64::from(k) - i64::from(settle)).min(max);
            steps.push(
                Step::new(format!("Ramp {} ({}/{})", mem, k + 1, frames))
                    .with_writes(writes_for_decoded(mem, value)),
            );
        }
        ramp_len += frames;
    }

    let hold = statics
        .iter()
        .map(|c| c.hit_target)
        .max()
        .unwrap_or(0)
        .max(1);
    for _ in 0..hold.saturating_sub(1 + ramp_len) {
        steps.push(Step::new("Hold"));
    }

    let triggers: Vec<&Condition> = requirements
        .iter()
        .filter(|r| r.trigger)
        .map(|r| r.condition)
        .collect();
    if !triggers.is_empty() {
        let writes = triggers.iter().flat_map(|c| writes_for(c, true)).collect();
        steps.push(Step::new("Satisfy triggers").with_writes(writes));
        let trigger_hold = triggers.iter().map(|c| c.hit_target).max().unwrap_or(0);
        for _ in 1..trigger_hold {
            steps.push(Step::new("Hold triggers"));
        }
    }

    tracing::debug!(
        steps = steps.len(),
        deltas = deltas.len(),
        statics = statics.len(),
        triggers = triggers.len(),
        "built test plan"
    );
    TestPlan { steps }
}

/// Conditions that must hold, with chains expanded and non-truth flags dropped.
fn expand(conditions: &[Condition]) -> Vec<Requirement<'_>> {
    let count = conditions.len();
    let mut requirements = Vec::new();
    let mut index = 0;
    while index < count {
        let mut end = index;
        while end < count && conditions[end].flag.is_chain_link() {
            end += 1;
        }
        let end = end.min(count - 1);
        let members = &conditions[index..=end];
        let closing = members[members.len() - 1].flag;

        if is_required(closing) {
            let trigger = closing == ConditionFlag::Trigger;
            if members.iter().any(|c| c.flag == ConditionFlag::OrNext) {
                if let Some(best) = best_alternative(members) {
                    requirements.push(Requirement {
                        condition: best,
                        trigger,
                    });
                }
            } else {
                requirements.extend(members.iter().map(|condition| Requirement { condition, trigger }));
            }
        }
        index = end + 1;
    }
    requirements
}

fn is_required(flag: ConditionFlag) -> bool {
    !matches!(
        flag,
        ConditionFlag::PauseIf
            | ConditionFlag::ResetIf
            | ConditionFlag::ResetNextIf
            | ConditionFlag::AddSource
            | ConditionFlag::SubSource
            | ConditionFlag::AddAddress
            | ConditionFlag::AddHits
            | ConditionFlag::SubHits
            | ConditionFlag::MeasuredIf
            | ConditionFlag::Remember
    )
}

/// Pick the OR member easiest to force; ties keep the first.
fn best_alternative(members: &[Condition]) -> Option<&Condition> {
    let mut best: Option<(&Condition, i32)> = None;
    for condition in members {
        let score = alternative_score(condition);
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((condition, score));
        }
    }
    best.map(|(condition, _)| condition)
}

fn alternative_score(condition: &Condition) -> i32 {
    let mut score = 0;
    if matches!(
        (&condition.left, &condition.right),
        (Operand::Memory(_), Operand::Constant(_))
    ) {
        score += 5;
    }
    if condition.op == CompareOp::Eq {
        score += 2;
    }
    if condition.left.memory().is_some_and(MemoryRef::is_live) {
        score += 1;
    }
    if condition.right.memory().is_some_and(|mem| !mem.is_live()) {
        score -= 1;
    }
    score
}

/// `mem > d(mem)` style "value increased" checks. Returns the live operand.
fn delta_pattern(condition: &Condition) -> Option<&MemoryRef> {
    let (Operand::Memory(left), Operand::Memory(right)) = (&condition.left, &condition.right) else {
        return None;
    };
    let increase = matches!(condition.op, CompareOp::Gt | CompareOp::Ne | CompareOp::Ge);
    (increase && left.is_live() && !right.is_live() && left.same_location(right)).then_some(left)
}

fn mem_prior_pattern(condition: &Condition) -> bool {
    condition
        .right
        .memory()
        .is_some_and(|mem| mem.uses_prior() && !mem.uses_delta())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::FormulaCompiler;

    fn plan(formula: &str) -> TestPlan {
        build_plan(&FormulaCompiler::default().compile(formula))
    }

    fn comments(plan: &TestPlan) -> Vec<&str> {
        plan.iter().map(|step| step.comment.as_str()).collect()
    }

    // ============================================================================
    // Step layout
    // ============================================================================

    #[test]
    fn test_simple_formula() {
        let p = plan("0xH0010=5");
        assert_eq!(comments(&p), vec!["Satisfy static conditions"]);
        assert_eq!(p.steps[0].writes, vec![ByteWrite::new(0x10, 5)]);
    }

    #[test]
    fn test_neutralize_step_first() {
        let p = plan("P:0xH0000=1_R:0xH0001=1_0xH0002=3");
        assert_eq!(p.steps[0].comment, "Neutralize pause/reset conditions");
        assert_eq!(
            p.steps[0].writes,
            vec![ByteWrite::new(0, 0), ByteWrite::new(1, 0)]
        );
        assert_eq!(p.steps[1].writes, vec![ByteWrite::new(2, 3)]);
    }

    #[test]
    fn test_hold_padding_for_hit_targets() {
        let p = plan("0xH0001=1(4)_0xH0002=1(2)");
        assert_eq!(
            comments(&p),
            vec!["Satisfy static conditions", "Hold", "Hold", "Hold"]
        );
    }

    #[test]
    fn test_delta_ramp() {
        let p = plan("0xH0010>d0xH0010(3)");
        assert_eq!(p.len(), 4);
        assert_eq!(p.steps[0].writes, vec![ByteWrite::new(0x10, 1)]);
        for (k, step) in p.steps[1..].iter().enumerate() {
            assert_eq!(step.writes, vec![ByteWrite::new(0x10, 1 + k as u8)]);
        }
    }

    #[test]
    fn test_multi_byte_ramp_zeroes_high_byte() {
        let p = plan("0x 10!=d0x 10");
        assert_eq!(
            p.steps[1].writes,
            vec![ByteWrite::new(0x10, 1), ByteWrite::new(0x11, 0)]
        );
    }

    #[test]
    fn test_ramp_counts_toward_hold() {
        let p = plan("0xH0001=1(5)_0xH0010>d0xH0010(2)");
        // static + 2 ramp + 2 hold = 5 frames for the static hit target
        assert_eq!(p.len(), 5);
        assert_eq!(p.steps[4].comment, "Hold");
    }

    #[test]
    fn test_prior_ramp_settles_at_zero() {
        let p = plan("0xL10>p0xL10(2)");
        assert_eq!(p.len(), 4);
        let values: Vec<_> = p.iter().map(|step| step.writes.clone()).collect();
        assert_eq!(
            values,
            vec![
                vec![ByteWrite::masked(0x10, 0, 0x0F)],
                vec![ByteWrite::masked(0x10, 0, 0x0F)],
                vec![ByteWrite::masked(0x10, 1, 0x0F)],
                vec![ByteWrite::masked(0x10, 2, 0x0F)],
            ]
        );
    }

    #[test]
    fn test_trigger_step_and_hold() {
        let p = plan("0xH0001=1_T:0xH0002=7(3)");
        assert_eq!(
            comments(&p),
            vec![
                "Satisfy static conditions",
                "Satisfy triggers",
                "Hold triggers",
                "Hold triggers"
            ]
        );
        assert_eq!(p.steps[0].writes, vec![ByteWrite::new(1, 1)]);
        assert_eq!(p.steps[1].writes, vec![ByteWrite::new(2, 7)]);
    }

    // ============================================================================
    // Chain expansion
    // ============================================================================

    #[test]
    fn test_and_chain_requires_all_members() {
        let p = plan("N:0xH0001=1_N:0xH0002=2_0xH0003=3");
        assert_eq!(
            p.steps[0].writes,
            vec![
                ByteWrite::new(1, 1),
                ByteWrite::new(2, 2),
                ByteWrite::new(3, 3)
            ]
        );
    }

    #[test]
    fn test_or_chain_picks_best_member() {
        let p = plan("O:0xH0001>d0xH0001_O:0xH0002>3_0xH0003=4");
        assert_eq!(p.steps[0].writes, vec![ByteWrite::new(3, 4)]);

        let tie = plan("O:0xH0001=1_0xH0002=2");
        assert_eq!(tie.steps[0].writes, vec![ByteWrite::new(1, 1)]);
    }

    #[test]
    fn test_non_truth_flags_not_required() {
        let p = plan("A:0xH0001_K:0xH0002_Q:0xH0003=1_C:0xH0004=1_0xH0005=5");
        assert_eq!(p.steps[0].writes, vec![ByteWrite::new(5, 5)]);
    }

    #[test]
    fn test_constant_only_formula() {
        let p = plan("1=1");
        assert_eq!(p.len(), 1);
        assert!(p.steps[0].writes.is_empty());
    }
}
