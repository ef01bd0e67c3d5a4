//! Formula compiler
//!
//! Converts underscore-delimited formula text into an ordered condition list.
//! Compilation never fails: malformed fragments degrade to the most permissive
//! reading (constant 0, `= 1` truth test, flag `None`, 16-bit little-endian).

use std::collections::VecDeque;

use cheevo_shared::Numeric;

use super::types::{CompareOp, Condition, ConditionFlag, MemoryRef, Modifiers, Operand, Prefix};
use crate::config::CompilerConfig;

/// Operators in match precedence.
const OPERATORS: [(&str, CompareOp); 6] = [
    ("!=", CompareOp::Ne),
    (">=", CompareOp::Ge),
    ("<=", CompareOp::Le),
    ("=", CompareOp::Eq),
    (">", CompareOp::Gt),
    ("<", CompareOp::Lt),
];

macro_rules! trace_token {
    ($compiler:expr, $($arg:tt)*) => {
        if $compiler.config.trace {
            tracing::debug!($($arg)*);
        }
    };
}

/// Formula compiler
#[derive(Debug, Clone, Copy, Default)]
pub struct FormulaCompiler {
    config: CompilerConfig,
}

/// A single token compiled into a condition, plus any token split off its right-hand side.
struct CompiledToken {
    condition: Condition,
    extra: Option<String>,
}

impl FormulaCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile a formula into its condition sequence.
    pub fn compile(&self, formula: &str) -> Vec<Condition> {
        let mut pending: VecDeque<String> = formula
            .split('_')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect();

        let mut conditions = Vec::with_capacity(pending.len());
        while let Some(token) = pending.pop_front() {
            let compiled = self.compile_token(&token);
            trace_token!(self, token = %token, condition = %compiled.condition, "compiled token");
            if let Some(extra) = compiled.extra {
                pending.push_front(extra);
            }
            conditions.push(compiled.condition);
        }
        conditions
    }

    fn compile_token(&self, token: &str) -> CompiledToken {
        // Flag prefix
        let (mut flag, mut work) = match token.find(':') {
            Some(pos @ (1 | 2)) => (ConditionFlag::from_prefix(&token[..pos]), &token[pos + 1..]),
            _ => (ConditionFlag::None, token),
        };
        if flag != ConditionFlag::None {
            trace_token!(self, ?flag, "flag prefix");
        }

        // Leading seconds shorthand
        let mut seconds_hits = 0u32;
        if let Some((seconds, _, rest)) = split_seconds(work) {
            seconds_hits = self.seconds_to_frames(seconds);
            trace_token!(self, seconds, frames = seconds_hits, "seconds shorthand");
            work = rest;
        }

        // Embedded right-hand seconds
        let mut extra = None;
        let mut body = work.to_string();
        if let Some((op_pos, op_len, _)) = find_operator(work) {
            let rhs = &work[op_pos + op_len..];
            if let Some((seconds, digits, tail)) = split_seconds(rhs) {
                body = format!("{}{}", &work[..op_pos + op_len], digits);
                let tail = tail.trim_end();
                if tail.is_empty() {
                    seconds_hits = seconds_hits.max(self.seconds_to_frames(seconds));
                } else {
                    extra = Some(format!("{}S{}", seconds, tail));
                    if flag == ConditionFlag::None {
                        flag = ConditionFlag::AndNext;
                    }
                    trace_token!(self, primary = %body, extra = ?extra, "split embedded seconds");
                }
            }
        }

        // Trailing hit counts
        let mut dot_hits = strip_dot_hits(&mut body);
        let paren_hits = strip_paren_hits(&mut body);
        if dot_hits.is_none() {
            dot_hits = strip_dot_hits(&mut body);
        }
        let hit_target = [paren_hits, Some(seconds_hits), dot_hits]
            .into_iter()
            .flatten()
            .find(|&hits| hits > 0)
            .unwrap_or(0);
        if hit_target > 0 {
            trace_token!(self, hit_target, "hit target");
        }

        // Comparison split
        let (left, op, right) = match find_operator(&body) {
            Some((pos, len, op)) => (&body[..pos], op, &body[pos + len..]),
            None => (body.as_str(), CompareOp::Eq, "1"),
        };
        trace_token!(self, left, op = op.symbol(), right, "comparison split");

        let condition = Condition::new(flag, parse_operand(left), op, parse_operand(right))
            .with_hit_target(hit_target);
        CompiledToken { condition, extra }
    }

    fn seconds_to_frames(&self, seconds: u64) -> u32 {
        let fps = u64::from(self.config.frames_per_second.max(1));
        seconds.saturating_mul(fps).min(u64::from(u32::MAX)) as u32
    }
}

/// Split a leading `<digits>S` run, ignoring surrounding whitespace.
///
/// Returns the seconds, their digits and the text after the `S`. Zero seconds is not a shorthand.
fn split_seconds(text: &str) -> Option<(u64, &str, &str)> {
    let text = text.trim_start();
    let digits = text.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    match text.as_bytes().get(digits) {
        Some(b'S' | b's') => {
            let seconds = text[..digits].parse().unwrap_or(u64::MAX);
            (seconds > 0).then(|| (seconds, &text[..digits], text[digits + 1..].trim_start()))
        }
        _ => None,
    }
}

/// Locate the comparison operator: `(byte position, length, operator)`.
fn find_operator(text: &str) -> Option<(usize, usize, CompareOp)> {
    OPERATORS.iter().find_map(|&(symbol, op)| match text.find(symbol) {
        Some(pos) if pos > 0 => Some((pos, symbol.len(), op)),
        _ => None,
    })
}

/// Strip a trailing `.<digits>.` hit count.
fn strip_dot_hits(text: &mut String) -> Option<u32> {
    let body = text.strip_suffix('.')?;
    let digits = body.bytes().rev().take_while(u8::is_ascii_digit).count();
    if digits == 0 || !body[..body.len() - digits].ends_with('.') {
        return None;
    }
    let hits = body[body.len() - digits..].parse().unwrap_or(0);
    if hits == 0 {
        return None;
    }
    let keep = body.len() - digits - 1;
    text.truncate(keep);
    Some(hits)
}

/// Strip a trailing `(...)` hit count. The group is removed even when its contents are not a number.
fn strip_paren_hits(text: &mut String) -> Option<u32> {
    if !text.ends_with(')') {
        return None;
    }
    let open = text.rfind('(')?;
    let hits = text[open + 1..text.len() - 1].trim().parse().ok();
    text.truncate(open);
    hits
}

fn is_number_literal(text: &str) -> bool {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    if let Some(hex) = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        return !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit());
    }
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => ("", unsigned),
    };
    !fraction.is_empty()
        && whole.bytes().all(|b| b.is_ascii_digit())
        && fraction.bytes().all(|b| b.is_ascii_digit())
}

fn parse_constant(text: &str) -> Numeric {
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let value = if let Some(hex) = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        Numeric::Integer(i64::from_str_radix(hex, 16).unwrap_or(0))
    } else if unsigned.contains('.') {
        Numeric::Float(unsigned.parse().unwrap_or(0.0))
    } else {
        Numeric::Integer(unsigned.parse().unwrap_or(0))
    };
    match (negative, value) {
        (true, Numeric::Integer(v)) => Numeric::Integer(v.wrapping_neg()),
        (true, Numeric::Float(v)) => Numeric::Float(-v),
        (false, value) => value,
    }
}

/// Parse one side of a comparison.
pub(crate) fn parse_operand(text: &str) -> Operand {
    let text = text.trim();
    if text.eq_ignore_ascii_case("recall") || text.eq_ignore_ascii_case("{recall}") {
        return Operand::Recall;
    }
    if is_number_literal(text) {
        return Operand::Constant(parse_constant(text));
    }

    let mut modifiers = Modifiers::empty();
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        let modifier = match c.to_ascii_lowercase() {
            'd' => Modifiers::DELTA,
            'p' => Modifiers::PRIOR,
            'b' => Modifiers::BCD,
            '~' => Modifiers::INVERT,
            _ => break,
        };
        modifiers |= modifier;
        rest = &rest[c.len_utf8()..];
    }

    match parse_memory(rest) {
        Some(mem) => Operand::Memory(mem.with(modifiers)),
        None => Operand::Constant(Numeric::Integer(rest.trim().parse().unwrap_or(0))),
    }
}

fn parse_memory(text: &str) -> Option<MemoryRef> {
    let (prefix, address) = if let Some(rest) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        match rest.chars().next() {
            Some(c) if c.is_ascii_alphabetic() && !c.is_ascii_hexdigit() => (
                Prefix::from_hex_tag(Some(c)).unwrap_or(Prefix::U16LE),
                &rest[1..],
            ),
            _ => (Prefix::U16LE, rest),
        }
    } else {
        let rest = text.strip_prefix(['f', 'F'])?;
        let tag = rest.chars().next()?;
        (Prefix::from_float_tag(tag)?, &rest[tag.len_utf8()..])
    };
    let address = u32::from_str_radix(address.trim(), 16).ok()?;
    Some(MemoryRef::new(prefix, address))
}
