//! Compiled condition types
//!
//! Prefixes, flags and operand kinds are closed sets; every consumer
//! (reader, planner, decompiler) matches them exhaustively.

use std::cmp::Ordering;
use std::fmt;

use cheevo_shared::Numeric;
use serde::{Deserialize, Serialize};

/// Memory size/encoding tag of a memory operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Prefix {
    Bit0,
    Bit1,
    Bit2,
    Bit3,
    Bit4,
    Bit5,
    Bit6,
    Bit7,
    LowerNibble,
    UpperNibble,
    U8,
    U16LE,
    U24LE,
    U32LE,
    U16BE,
    U24BE,
    U32BE,
    BitCount,
    F32LE,
    F32BE,
    Double32LE,
    Double32BE,
    MBF32Native,
    MBF32LE,
    /// Unrecognized tag; reads as 16-bit little-endian.
    None,
}

impl Prefix {
    /// Resolve the letter following `0x`. `None` means no letter (16-bit LE).
    /// Returns `None` for letters that are not integer prefix tags.
    pub fn from_hex_tag(tag: Option<char>) -> Option<Prefix> {
        let Some(tag) = tag else {
            return Some(Prefix::U16LE);
        };
        let prefix = match tag.to_ascii_uppercase() {
            'H' => Prefix::U8,
            'L' => Prefix::LowerNibble,
            'U' => Prefix::UpperNibble,
            'W' => Prefix::U24LE,
            'X' => Prefix::U32LE,
            'I' => Prefix::U16BE,
            'J' => Prefix::U24BE,
            'G' => Prefix::U32BE,
            'K' => Prefix::BitCount,
            'M' => Prefix::Bit0,
            'N' => Prefix::Bit1,
            'O' => Prefix::Bit2,
            'P' => Prefix::Bit3,
            'Q' => Prefix::Bit4,
            'R' => Prefix::Bit5,
            'S' => Prefix::Bit6,
            'T' => Prefix::Bit7,
            _ => return None,
        };
        Some(prefix)
    }

    /// Resolve the letter following `f`.
    pub fn from_float_tag(tag: char) -> Option<Prefix> {
        let prefix = match tag.to_ascii_uppercase() {
            'F' => Prefix::F32LE,
            'B' => Prefix::F32BE,
            'H' => Prefix::Double32LE,
            'I' => Prefix::Double32BE,
            'M' => Prefix::MBF32Native,
            'L' => Prefix::MBF32LE,
            _ => return None,
        };
        Some(prefix)
    }

    /// Formula text for this prefix, without the address.
    pub fn tag(&self) -> &'static str {
        match self {
            Prefix::Bit0 => "0xM",
            Prefix::Bit1 => "0xN",
            Prefix::Bit2 => "0xO",
            Prefix::Bit3 => "0xP",
            Prefix::Bit4 => "0xQ",
            Prefix::Bit5 => "0xR",
            Prefix::Bit6 => "0xS",
            Prefix::Bit7 => "0xT",
            Prefix::LowerNibble => "0xL",
            Prefix::UpperNibble => "0xU",
            Prefix::U8 => "0xH",
            Prefix::U24LE => "0xW",
            Prefix::U32LE => "0xX",
            Prefix::U16BE => "0xI",
            Prefix::U24BE => "0xJ",
            Prefix::U32BE => "0xG",
            Prefix::BitCount => "0xK",
            Prefix::F32LE => "fF",
            Prefix::F32BE => "fB",
            Prefix::Double32LE => "fH",
            Prefix::Double32BE => "fI",
            Prefix::MBF32Native => "fM",
            Prefix::MBF32LE => "fL",
            // A bare `0x` followed by a space keeps the operand out of the hex-literal form.
            Prefix::U16LE | Prefix::None => "0x ",
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(
            self,
            Prefix::F32LE
                | Prefix::F32BE
                | Prefix::Double32LE
                | Prefix::Double32BE
                | Prefix::MBF32Native
                | Prefix::MBF32LE
        )
    }

    /// Bit index for single-bit prefixes.
    pub fn bit_index(&self) -> Option<u8> {
        match self {
            Prefix::Bit0 => Some(0),
            Prefix::Bit1 => Some(1),
            Prefix::Bit2 => Some(2),
            Prefix::Bit3 => Some(3),
            Prefix::Bit4 => Some(4),
            Prefix::Bit5 => Some(5),
            Prefix::Bit6 => Some(6),
            Prefix::Bit7 => Some(7),
            _ => None,
        }
    }

    /// Number of RAM bytes an integer read of this prefix touches.
    pub fn byte_len(&self) -> usize {
        match self {
            Prefix::U16LE | Prefix::U16BE | Prefix::None => 2,
            Prefix::U24LE | Prefix::U24BE => 3,
            Prefix::U32LE
            | Prefix::U32BE
            | Prefix::F32LE
            | Prefix::F32BE
            | Prefix::Double32LE
            | Prefix::Double32BE
            | Prefix::MBF32Native
            | Prefix::MBF32LE => 4,
            _ => 1,
        }
    }

    pub fn is_big_endian(&self) -> bool {
        matches!(self, Prefix::U16BE | Prefix::U24BE | Prefix::U32BE)
    }

    /// Largest value an integer read of this prefix can produce.
    pub fn max_value(&self) -> u64 {
        if self.bit_index().is_some() {
            return 1;
        }
        match self {
            Prefix::LowerNibble | Prefix::UpperNibble => 0xF,
            Prefix::BitCount => 8,
            _ => (1u64 << (8 * self.byte_len() as u32)) - 1,
        }
    }
}

bitflags::bitflags! {
    /// Read modifiers of a memory operand
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        /// Read `now - prev` instead of `now`
        const DELTA = 0b0000_0001;
        /// Read from the two-frames-ago snapshot
        const PRIOR = 0b0000_0010;
        /// Decode the low byte as two BCD digits
        const BCD = 0b0000_0100;
        /// Bitwise complement within the prefix width
        const INVERT = 0b0000_1000;
    }
}

// Manual serde implementation for Modifiers
impl Serialize for Modifiers {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Modifiers {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u8::deserialize(deserializer)?;
        Ok(Modifiers::from_bits_truncate(bits))
    }
}

/// A memory operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryRef {
    pub prefix: Prefix,
    pub address: u32,
    #[serde(default)]
    pub modifiers: Modifiers,
}

impl MemoryRef {
    pub fn new(prefix: Prefix, address: u32) -> Self {
        Self {
            prefix,
            address,
            modifiers: Modifiers::empty(),
        }
    }

    pub fn with(mut self, modifiers: Modifiers) -> Self {
        self.modifiers |= modifiers;
        self
    }

    pub fn uses_delta(&self) -> bool {
        self.modifiers.contains(Modifiers::DELTA)
    }

    pub fn uses_prior(&self) -> bool {
        self.modifiers.contains(Modifiers::PRIOR)
    }

    /// Reads the current snapshot directly (no delta, no prior).
    pub fn is_live(&self) -> bool {
        !self.uses_delta() && !self.uses_prior()
    }

    /// Same address and prefix, ignoring modifiers.
    pub fn same_location(&self, other: &MemoryRef) -> bool {
        self.prefix == other.prefix && self.address == other.address
    }
}

impl fmt::Display for MemoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mem({:?} @0x{:X}", self.prefix, self.address)?;
        for (name, flag) in [
            ("delta", Modifiers::DELTA),
            ("prior", Modifiers::PRIOR),
            ("bcd", Modifiers::BCD),
            ("invert", Modifiers::INVERT),
        ] {
            if self.modifiers.contains(flag) {
                write!(f, " {}", name)?;
            }
        }
        write!(f, ")")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Memory(MemoryRef),
    Constant(Numeric),
    /// The achievement's remembered value (0 when nothing is remembered).
    Recall,
}

impl Operand {
    pub fn memory(&self) -> Option<&MemoryRef> {
        match self {
            Operand::Memory(mem) => Some(mem),
            _ => None,
        }
    }

    pub fn constant(&self) -> Option<Numeric> {
        match self {
            Operand::Constant(value) => Some(*value),
            _ => None,
        }
    }
}

impl Default for Operand {
    fn default() -> Self {
        Operand::Constant(Numeric::ZERO)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Memory(mem) => mem.fmt(f),
            Operand::Constant(value) => write!(f, "Const({})", value),
            Operand::Recall => write!(f, "Recall"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConditionFlag {
    #[default]
    None,
    PauseIf,
    ResetIf,
    ResetNextIf,
    AddSource,
    SubSource,
    AddHits,
    SubHits,
    AddAddress,
    AndNext,
    OrNext,
    Measured,
    MeasuredPercent,
    MeasuredIf,
    Trigger,
    Remember,
}

impl ConditionFlag {
    /// Resolve a flag prefix (the text before `:`); unknown text maps to `None`.
    pub fn from_prefix(text: &str) -> ConditionFlag {
        match text.to_ascii_uppercase().as_str() {
            "P" => ConditionFlag::PauseIf,
            "R" => ConditionFlag::ResetIf,
            "Z" => ConditionFlag::ResetNextIf,
            "A" => ConditionFlag::AddSource,
            "B" => ConditionFlag::SubSource,
            "C" => ConditionFlag::AddHits,
            "D" => ConditionFlag::SubHits,
            "I" => ConditionFlag::AddAddress,
            "N" => ConditionFlag::AndNext,
            "O" => ConditionFlag::OrNext,
            "M" => ConditionFlag::Measured,
            "G" => ConditionFlag::MeasuredPercent,
            "Q" => ConditionFlag::MeasuredIf,
            "T" => ConditionFlag::Trigger,
            "K" => ConditionFlag::Remember,
            _ => ConditionFlag::None,
        }
    }

    pub fn letter(&self) -> Option<char> {
        let letter = match self {
            ConditionFlag::None => return None,
            ConditionFlag::PauseIf => 'P',
            ConditionFlag::ResetIf => 'R',
            ConditionFlag::ResetNextIf => 'Z',
            ConditionFlag::AddSource => 'A',
            ConditionFlag::SubSource => 'B',
            ConditionFlag::AddHits => 'C',
            ConditionFlag::SubHits => 'D',
            ConditionFlag::AddAddress => 'I',
            ConditionFlag::AndNext => 'N',
            ConditionFlag::OrNext => 'O',
            ConditionFlag::Measured => 'M',
            ConditionFlag::MeasuredPercent => 'G',
            ConditionFlag::MeasuredIf => 'Q',
            ConditionFlag::Trigger => 'T',
            ConditionFlag::Remember => 'K',
        };
        Some(letter)
    }

    pub fn is_chain_link(&self) -> bool {
        matches!(self, ConditionFlag::AndNext | ConditionFlag::OrNext)
    }

    /// AddSource, SubSource and AddAddress feed the next comparison.
    pub fn is_accumulator(&self) -> bool {
        matches!(
            self,
            ConditionFlag::AddSource | ConditionFlag::SubSource | ConditionFlag::AddAddress
        )
    }

    pub fn is_measured(&self) -> bool {
        matches!(self, ConditionFlag::Measured | ConditionFlag::MeasuredPercent)
    }

    /// Flags whose truth pauses or resets progress.
    pub fn is_disruptive(&self) -> bool {
        matches!(
            self,
            ConditionFlag::PauseIf | ConditionFlag::ResetIf | ConditionFlag::ResetNextIf
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CompareOp {
    #[default]
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    pub fn test(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }

    /// Operator that holds when the operands are swapped.
    pub fn mirrored(&self) -> CompareOp {
        match self {
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Le => CompareOp::Ge,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Ge => CompareOp::Le,
            other => *other,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CompareOp::Eq => "==",
            other => other.symbol(),
        };
        f.write_str(text)
    }
}

/// One clause of a formula plus its runtime hit state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub flag: ConditionFlag,
    pub left: Operand,
    pub op: CompareOp,
    pub right: Operand,
    /// Required hit count; 0 means the condition is sticky once true.
    pub hit_target: u32,
    #[serde(default)]
    pub hits: u32,
    #[serde(default)]
    pub is_met: bool,
}

impl Condition {
    pub fn new(flag: ConditionFlag, left: Operand, op: CompareOp, right: Operand) -> Self {
        Self {
            flag,
            left,
            op,
            right,
            hit_target: 0,
            hits: 0,
            is_met: false,
        }
    }

    pub fn with_hit_target(mut self, hit_target: u32) -> Self {
        self.hit_target = hit_target;
        self
    }

    /// Clear hit state back to power-on.
    pub fn reset(&mut self) {
        self.hits = 0;
        self.is_met = false;
    }

    /// Accrue one frame of raw truth.
    ///
    /// Without a hit target the condition latches on the first true frame.
    pub fn apply_hits(&mut self, raw: bool) {
        if self.hit_target == 0 {
            if raw {
                self.hits = 1;
            }
            self.is_met = self.hits > 0;
        } else {
            if raw && self.hits < self.hit_target {
                self.hits += 1;
            }
            self.is_met = self.hits >= self.hit_target;
        }
    }

    /// Adjust hits from an AddHits/SubHits line.
    pub fn adjust_hits(&mut self, increment: bool) {
        if increment {
            if self.hit_target == 0 || self.hits < self.hit_target {
                self.hits = self.hits.saturating_add(1);
            }
        } else {
            self.hits = self.hits.saturating_sub(1);
        }
        self.is_met = if self.hit_target == 0 {
            self.hits > 0
        } else {
            self.hits >= self.hit_target
        };
    }

    /// Either side reads memory.
    pub fn has_memory_operand(&self) -> bool {
        self.left.memory().is_some() || self.right.memory().is_some()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.flag != ConditionFlag::None {
            write!(f, "{:?}: ", self.flag)?;
        }
        write!(
            f,
            "{} {} {} hits={}/{}",
            self.left, self.op, self.right, self.hits, self.hit_target
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================================================
    // Hit accrual
    // ============================================================================

    fn cond(hit_target: u32) -> Condition {
        Condition::new(
            ConditionFlag::None,
            Operand::Memory(MemoryRef::new(Prefix::U8, 0)),
            CompareOp::Eq,
            Operand::Constant(Numeric::Integer(1)),
        )
        .with_hit_target(hit_target)
    }

    #[test]
    fn test_sticky_without_target() {
        let mut c = cond(0);
        c.apply_hits(false);
        assert!(!c.is_met);
        c.apply_hits(true);
        c.apply_hits(false);
        assert_eq!(c.hits, 1);
        assert!(c.is_met);
    }

    #[test]
    fn test_hits_clamp_at_target() {
        let mut c = cond(2);
        c.apply_hits(true);
        assert!(!c.is_met);
        c.apply_hits(true);
        c.apply_hits(true);
        assert_eq!(c.hits, 2);
        assert!(c.is_met);
    }

    #[test]
    fn test_adjust_hits_saturates() {
        let mut c = cond(2);
        c.adjust_hits(false);
        assert_eq!(c.hits, 0);
        c.adjust_hits(true);
        c.adjust_hits(true);
        c.adjust_hits(true);
        assert_eq!(c.hits, 2);
        assert!(c.is_met);
        c.adjust_hits(false);
        assert!(!c.is_met);
    }

    // ============================================================================
    // Tags and operators
    // ============================================================================

    #[test]
    fn test_prefix_tags_round_trip() {
        for letter in "HLUWXIJGKMNOPQRST".chars() {
            let prefix = Prefix::from_hex_tag(Some(letter)).unwrap();
            assert_eq!(prefix.tag(), format!("0x{}", letter));
        }
        for letter in "FBHIML".chars() {
            let prefix = Prefix::from_float_tag(letter).unwrap();
            assert_eq!(prefix.tag(), format!("f{}", letter));
        }
        assert_eq!(Prefix::from_hex_tag(None), Some(Prefix::U16LE));
        assert_eq!(Prefix::from_hex_tag(Some('Z')), None);
    }

    #[test]
    fn test_prefix_widths() {
        assert_eq!(Prefix::Bit3.max_value(), 1);
        assert_eq!(Prefix::UpperNibble.max_value(), 15);
        assert_eq!(Prefix::U24BE.max_value(), 0xFF_FFFF);
        assert_eq!(Prefix::None.byte_len(), 2);
        assert!(Prefix::MBF32LE.is_float());
        assert!(!Prefix::U32BE.is_float());
    }

    #[test]
    fn test_flag_letters() {
        assert_eq!(ConditionFlag::from_prefix("p"), ConditionFlag::PauseIf);
        assert_eq!(ConditionFlag::from_prefix("X"), ConditionFlag::None);
        for flag in [
            ConditionFlag::ResetNextIf,
            ConditionFlag::AddAddress,
            ConditionFlag::MeasuredPercent,
            ConditionFlag::Remember,
        ] {
            let letter = flag.letter().unwrap().to_string();
            assert_eq!(ConditionFlag::from_prefix(&letter), flag);
        }
    }

    #[test]
    fn test_compare_ops() {
        assert!(CompareOp::Le.test(Ordering::Equal));
        assert!(!CompareOp::Lt.test(Ordering::Equal));
        assert!(CompareOp::Ne.test(Ordering::Greater));
        assert_eq!(CompareOp::Lt.mirrored(), CompareOp::Gt);
        assert_eq!(CompareOp::Ge.mirrored(), CompareOp::Le);
        assert_eq!(CompareOp::Ne.mirrored(), CompareOp::Ne);
    }

    #[test]
    fn test_condition_display() {
        let c = Condition::new(
            ConditionFlag::PauseIf,
            Operand::Memory(MemoryRef::new(Prefix::U8, 0x10).with(Modifiers::DELTA)),
            CompareOp::Eq,
            Operand::Constant(Numeric::Integer(5)),
        )
        .with_hit_target(3);
        assert_eq!(
            c.to_string(),
            "PauseIf: Mem(U8 @0x10 delta) == Const(5) hits=0/3"
        );
    }

    #[test]
    fn test_modifiers_serde() {
        let json = serde_json::to_string(&(Modifiers::DELTA | Modifiers::BCD)).unwrap();
        assert_eq!(json, "5");
        let back: Modifiers = serde_json::from_str("255").unwrap();
        assert_eq!(back, Modifiers::all());
    }
}
