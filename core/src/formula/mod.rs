//! Achievement formula language
//!
//! Formulas are underscore-delimited condition tokens such as
//! `P:0xH0000=1_0xH0010=5(3)`. This module provides:
//!
//! - Compilation of formula text into an ordered [`Condition`] list
//! - Decompilation back to canonical formula text
//! - Lints for condition lists that compile but look wrong

mod compiler;
mod decompiler;
mod types;
mod validation;

pub use compiler::FormulaCompiler;
pub use decompiler::decompile;
pub use types::{
    CompareOp, Condition, ConditionFlag, MemoryRef, Modifiers, Operand, Prefix,
};
pub use validation::{FormulaWarning, check};
