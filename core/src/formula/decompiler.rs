//! Condition list to formula text.
//!
//! Output is canonical rather than a copy of the source: every comparison is
//! written out in full and hit targets always use the `(N)` form.

use cheevo_shared::Numeric;

use super::types::{Condition, MemoryRef, Modifiers, Operand, Prefix};

/// Render conditions back to formula text.
pub fn decompile(conditions: &[Condition]) -> String {
    conditions
        .iter()
        .map(decompile_condition)
        .collect::<Vec<_>>()
        .join("_")
}

fn decompile_condition(condition: &Condition) -> String {
    let mut out = String::new();
    if let Some(letter) = condition.flag.letter() {
        out.push(letter);
        out.push(':');
    }
    out.push_str(&decompile_operand(&condition.left));
    out.push_str(condition.op.symbol());
    out.push_str(&decompile_operand(&condition.right));
    if condition.hit_target > 0 {
        out.push_str(&format!("({})", condition.hit_target));
    }
    out
}

fn decompile_operand(operand: &Operand) -> String {
    match operand {
        Operand::Memory(mem) => decompile_memory(mem),
        Operand::Constant(Numeric::Integer(v)) => v.to_string(),
        // Debug formatting keeps the decimal point on whole floats
        Operand::Constant(Numeric::Float(v)) => format!("{:?}", v),
        Operand::Recall => "recall".to_string(),
    }
}

fn decompile_memory(mem: &MemoryRef) -> String {
    let mut out = String::new();
    for (letter, flag) in [
        ('d', Modifiers::DELTA),
        ('p', Modifiers::PRIOR),
        ('b', Modifiers::BCD),
        ('~', Modifiers::INVERT),
    ] {
        if mem.modifiers.contains(flag) {
            out.push(letter);
        }
    }
    out.push_str(mem.prefix.tag());
    match mem.prefix {
        Prefix::U16LE | Prefix::None => out.push_str(&format!("{:x}", mem.address)),
        _ => out.push_str(&format!("{:04x}", mem.address)),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::FormulaCompiler;

    fn roundtrip(formula: &str) -> String {
        decompile(&FormulaCompiler::default().compile(formula))
    }

    #[test]
    fn test_canonical_text() {
        assert_eq!(roundtrip("0xH10=5(3)"), "0xH0010=5(3)");
        assert_eq!(roundtrip("P:0xM1"), "P:0xM0001=1");
        assert_eq!(roundtrip("2S0xH6=2"), "0xH0006=2(120)");
        assert_eq!(roundtrip("fF10>1.5"), "fF0010>1.5");
        assert_eq!(roundtrip("K:0xH10_recall<=0xH10"), "K:0xH0010=1_recall<=0xH0010");
    }

    #[test]
    fn test_modifiers_rendered() {
        assert_eq!(roundtrip("~d0xL10>p0xL10"), "d~0xL0010>p0xL0010");
    }

    #[test]
    fn test_u16_stays_memory() {
        assert_eq!(roundtrip("d0x1234=1"), "d0x 1234=1");
        assert_eq!(roundtrip("0x 20=3"), "0x 20=3");
    }

    #[test]
    fn test_recompile_is_stable() {
        let formulas = [
            "R:0xH0=1_N:0xH1=1_O:0xH2>=3(4)_0xX10!=d0xX10",
            "A:0xH1_B:0xH2_I:0xH3_0xH4>10",
            "C:0xH5=1_D:0xH6=1_M:0xW7>=100_Q:0xH8=1_G:0xJ9<3_T:0xKa=2",
            "0x 1234=2_fI20<-2.5_b0xH30=12",
        ];
        let compiler = FormulaCompiler::default();
        for formula in formulas {
            let first = compiler.compile(formula);
            let second = compiler.compile(&decompile(&first));
            assert_eq!(first, second, "formula {}", formula);
        }
    }
}
