//! Value solving: which bytes make a comparison come out a given way.
//!
//! The writable side is always treated as the left operand; a condition whose
//! memory operand is on the right is mirrored first. Targets are computed in
//! the decoded domain and then encoded back through the operand's modifiers
//! and natural width.

use cheevo_shared::Numeric;

use super::plan::ByteWrite;
use crate::formula::{CompareOp, Condition, MemoryRef, Modifiers, Operand, Prefix};

/// Writes that make `condition` evaluate to `desired`. Empty when neither side reads memory.
pub(crate) fn writes_for(condition: &Condition, desired: bool) -> Vec<ByteWrite> {
    let (mem, op, other) = match (&condition.left, &condition.right) {
        (Operand::Memory(mem), other) => (mem, condition.op, other),
        (other, Operand::Memory(mem)) => (mem, condition.op.mirrored(), other),
        _ => return Vec::new(),
    };
    let rhs = other.constant().unwrap_or(Numeric::Integer(1));
    writes_for_compare(mem, op, rhs, desired)
}

/// Writes that make `mem <op> rhs` evaluate to `desired`.
pub(crate) fn writes_for_compare(
    mem: &MemoryRef,
    op: CompareOp,
    rhs: Numeric,
    desired: bool,
) -> Vec<ByteWrite> {
    if mem.prefix.is_float() {
        return float_writes(mem, float_target(op, rhs.as_f64(), desired));
    }
    let value = if mem.prefix.bit_index().is_some() {
        bit_state(mem, op, rhs, desired)
    } else {
        let (lo, hi) = decoded_range(mem);
        int_target(op, rhs.as_i64(), lo, hi, desired)
    };
    writes_for_decoded(mem, value)
}

/// Writes that make an integer operand read back as `value`.
pub(crate) fn writes_for_decoded(mem: &MemoryRef, value: i64) -> Vec<ByteWrite> {
    raw_writes(mem, encode_modifiers(mem, value))
}

fn is_inverted(mem: &MemoryRef) -> bool {
    mem.modifiers.contains(Modifiers::INVERT)
}

/// Decoded value of a single bit in `state`.
fn bit_state(mem: &MemoryRef, op: CompareOp, rhs: Numeric, desired: bool) -> i64 {
    let decoded = |state: i64| if is_inverted(mem) { !state } else { state };
    let holds = |state: i64| op.test(Numeric::Integer(decoded(state)).compare(&rhs));
    // Prefer set when solving for true, clear when solving for false
    let candidates = if desired { [1, 0] } else { [0, 1] };
    let state = candidates
        .into_iter()
        .find(|&state| holds(state) == desired)
        .unwrap_or(candidates[0]);
    decoded(state)
}

fn int_target(op: CompareOp, rhs: i64, lo: i64, hi: i64, desired: bool) -> i64 {
    let r = rhs.clamp(lo, hi);
    match (desired, op) {
        (true, CompareOp::Eq) | (true, CompareOp::Ge) | (true, CompareOp::Le) => r,
        (true, CompareOp::Ne) | (false, CompareOp::Eq) => {
            if r == lo {
                lo + 1
            } else {
                lo
            }
        }
        (true, CompareOp::Gt) | (false, CompareOp::Le) => (r + 1).min(hi),
        (true, CompareOp::Lt) | (false, CompareOp::Ge) => (r - 1).max(lo),
        (false, CompareOp::Ne) | (false, CompareOp::Gt) | (false, CompareOp::Lt) => r,
    }
}

fn float_target(op: CompareOp, r: f64, desired: bool) -> f64 {
    match (desired, op) {
        (true, CompareOp::Eq) | (true, CompareOp::Ge) | (true, CompareOp::Le) => r,
        (true, CompareOp::Ne) | (true, CompareOp::Gt) => r + 1.0,
        (true, CompareOp::Lt) => r - 1.0,
        (false, CompareOp::Eq) | (false, CompareOp::Le) => r + 1.0,
        (false, CompareOp::Ge) => r - 1.0,
        (false, CompareOp::Ne) | (false, CompareOp::Gt) | (false, CompareOp::Lt) => r,
    }
}

fn has_bcd_byte(mem: &MemoryRef) -> bool {
    mem.modifiers.contains(Modifiers::BCD)
        && mem.prefix.bit_index().is_none()
        && !matches!(
            mem.prefix,
            Prefix::LowerNibble | Prefix::UpperNibble | Prefix::BitCount
        )
}

/// Largest raw value the operand can hold once BCD is accounted for.
fn raw_max(mem: &MemoryRef) -> i64 {
    let max = mem.prefix.max_value() as i64;
    if has_bcd_byte(mem) { max.min(99) } else { max }
}

/// Inclusive range of values the operand can decode to.
fn decoded_range(mem: &MemoryRef) -> (i64, i64) {
    let max = raw_max(mem);
    if is_inverted(mem) { (!max, -1) } else { (0, max) }
}

/// Undo invert, then BCD, so the evaluator's decode yields `value`.
fn encode_modifiers(mem: &MemoryRef, value: i64) -> u64 {
    let decoded = if is_inverted(mem) { !value } else { value };
    let mut raw = decoded.clamp(0, raw_max(mem)) as u64;
    if has_bcd_byte(mem) {
        raw = ((raw / 10) << 4) | (raw % 10);
    }
    raw
}

fn raw_writes(mem: &MemoryRef, raw: u64) -> Vec<ByteWrite> {
    let address = mem.address;
    if let Some(bit) = mem.prefix.bit_index() {
        return vec![ByteWrite::masked(address, ((raw & 1) as u8) << bit, 1 << bit)];
    }
    match mem.prefix {
        Prefix::LowerNibble => vec![ByteWrite::masked(address, (raw & 0x0F) as u8, 0x0F)],
        Prefix::UpperNibble => vec![ByteWrite::masked(address, ((raw & 0x0F) as u8) << 4, 0xF0)],
        Prefix::U8 => vec![ByteWrite::new(address, raw as u8)],
        Prefix::BitCount => {
            let set = raw.min(8) as u32;
            vec![ByteWrite::new(address, ((1u16 << set) - 1) as u8)]
        }
        prefix if prefix.is_float() => float_writes(mem, raw as f64),
        prefix => {
            let len = prefix.byte_len();
            (0..len)
                .map(|i| {
                    let shift = if prefix.is_big_endian() { len - 1 - i } else { i };
                    ByteWrite::new(address.wrapping_add(i as u32), (raw >> (8 * shift)) as u8)
                })
                .collect()
        }
    }
}

fn float_writes(mem: &MemoryRef, value: f64) -> Vec<ByteWrite> {
    let bytes = match mem.prefix {
        Prefix::F32LE => (value as f32).to_le_bytes(),
        Prefix::F32BE => (value as f32).to_be_bytes(),
        Prefix::Double32LE => ((value.to_bits() >> 32) as u32).to_le_bytes(),
        Prefix::Double32BE => ((value.to_bits() >> 32) as u32).to_be_bytes(),
        Prefix::MBF32Native => encode_mbf32(value),
        Prefix::MBF32LE => {
            let [a, b, c, d] = encode_mbf32(value);
            [d, c, b, a]
        }
        _ => return Vec::new(),
    };
    bytes
        .into_iter()
        .enumerate()
        .map(|(i, byte)| ByteWrite::new(mem.address.wrapping_add(i as u32), byte))
        .collect()
}

/// Microsoft Binary Format single. Zero, non-finite and out-of-range values encode as zero.
fn encode_mbf32(value: f64) -> [u8; 4] {
    if value == 0.0 || !value.is_finite() {
        return [0; 4];
    }
    let sign = if value < 0.0 { 0x80 } else { 0 };
    let magnitude = value.abs();
    let mut exponent = magnitude.log2().floor() as i32 + 1;
    let mut fraction = magnitude / 2f64.powi(exponent);
    while fraction >= 1.0 {
        fraction /= 2.0;
        exponent += 1;
    }
    while fraction < 0.5 {
        fraction *= 2.0;
        exponent -= 1;
    }
    let biased = exponent + 128;
    if !(1..=255).contains(&biased) {
        return [0; 4];
    }
    let mantissa = ((fraction * 16_777_216.0) as u32).min(0xFF_FFFF);
    [
        biased as u8,
        sign | ((mantissa >> 16) as u8 & 0x7F),
        (mantissa >> 8) as u8,
        mantissa as u8,
    ]
}
