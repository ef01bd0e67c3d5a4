//! Formula lints.
//!
//! The compiler accepts anything. These checks flag condition lists that
//! compile but are unlikely to mean what the author intended.

use thiserror::Error;

use super::types::{Condition, ConditionFlag, Operand};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaWarning {
    #[error("formula has no conditions")]
    Empty,
    #[error("condition {index}: ResetNextIf has no following condition")]
    ResetNextWithoutTarget { index: usize },
    #[error("condition {index}: {flag:?} chain is not closed")]
    DanglingChain { index: usize, flag: ConditionFlag },
    #[error("condition {index}: {flag:?} has no comparison to feed")]
    DanglingAccumulator { index: usize, flag: ConditionFlag },
    #[error("condition {index}: no memory operand on either side")]
    NoMemoryOperand { index: usize },
}

/// Lint a compiled condition list.
pub fn check(conditions: &[Condition]) -> Vec<FormulaWarning> {
    let Some(last) = conditions.last() else {
        return vec![FormulaWarning::Empty];
    };

    let mut warnings = Vec::new();
    for (index, condition) in conditions.iter().enumerate() {
        let reads_state = [&condition.left, &condition.right]
            .into_iter()
            .any(|operand| !matches!(operand, Operand::Constant(_)));
        if !reads_state && !condition.flag.is_accumulator() {
            warnings.push(FormulaWarning::NoMemoryOperand { index });
        }
    }

    let index = conditions.len() - 1;
    match last.flag {
        ConditionFlag::ResetNextIf => {
            warnings.push(FormulaWarning::ResetNextWithoutTarget { index });
        }
        flag if flag.is_chain_link() => {
            warnings.push(FormulaWarning::DanglingChain { index, flag });
        }
        flag if flag.is_accumulator() => {
            warnings.push(FormulaWarning::DanglingAccumulator { index, flag });
        }
        _ => {}
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::FormulaCompiler;

    fn lint(formula: &str) -> Vec<FormulaWarning> {
        check(&FormulaCompiler::default().compile(formula))
    }

    #[test]
    fn test_clean_formula() {
        assert!(lint("R:0xH0=1_A:0xH1_0xH2>3_N:0xH3=1_0xH4=1").is_empty());
        assert!(lint("K:0xH1_recall>2").is_empty());
    }

    #[test]
    fn test_empty() {
        assert_eq!(lint("__"), vec![FormulaWarning::Empty]);
    }

    #[test]
    fn test_trailing_flags() {
        assert_eq!(
            lint("0xH1=1_Z:0xH2=1"),
            vec![FormulaWarning::ResetNextWithoutTarget { index: 1 }]
        );
        assert_eq!(
            lint("0xH1=1_O:0xH2=1"),
            vec![FormulaWarning::DanglingChain {
                index: 1,
                flag: ConditionFlag::OrNext
            }]
        );
        assert_eq!(
            lint("I:0xH1"),
            vec![FormulaWarning::DanglingAccumulator {
                index: 0,
                flag: ConditionFlag::AddAddress
            }]
        );
    }

    #[test]
    fn test_constant_comparison() {
        assert_eq!(
            lint("0xH1=1_5>3"),
            vec![FormulaWarning::NoMemoryOperand { index: 1 }]
        );
        assert!(lint("A:5_0xH1=7").is_empty());
    }
}
