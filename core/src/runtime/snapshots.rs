//! Triple-buffered RAM snapshots
//!
//! The engine keeps private copies of the RAM domain for the current frame,
//! the previous frame and the frame before that. Buffers are owned and
//! rotated in place; nothing is shared with the domain.

use cheevo_shared::Numeric;

use crate::formula::{MemoryRef, Modifiers, Prefix};
use crate::ram::{RamDomain, RamError};

#[derive(Debug, Clone, Default)]
pub struct RamSnapshots {
    now: Vec<u8>,
    prev: Vec<u8>,
    prior: Vec<u8>,
}

impl RamSnapshots {
    /// Zero-filled buffers of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            now: vec![0; size],
            prev: vec![0; size],
            prior: vec![0; size],
        }
    }

    /// Buffers sized to `ram` and synced to its contents.
    ///
    /// A domain that cannot be read yields zeroed buffers.
    pub fn capture<R: RamDomain + ?Sized>(ram: &R) -> Self {
        let mut snapshots = Self::new(ram.size());
        if let Err(err) = snapshots.resync(ram) {
            tracing::warn!(%err, "initial RAM sync failed; starting from zeroed snapshots");
        }
        snapshots
    }

    pub fn size(&self) -> usize {
        self.now.len()
    }

    pub fn now(&self) -> &[u8] {
        &self.now
    }

    pub fn prev(&self) -> &[u8] {
        &self.prev
    }

    pub fn prior(&self) -> &[u8] {
        &self.prior
    }

    /// Rotate one frame: prior <- prev, prev <- now, now <- domain.
    ///
    /// On a failed copy `now` keeps the previous frame's contents.
    pub fn advance<R: RamDomain + ?Sized>(&mut self, ram: &R) -> Result<(), RamError> {
        self.ensure_size(ram.size());
        std::mem::swap(&mut self.prior, &mut self.prev);
        std::mem::swap(&mut self.prev, &mut self.now);
        match ram.copy_into(&mut self.now) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.now.copy_from_slice(&self.prev);
                Err(err)
            }
        }
    }

    /// Set all three generations to the domain's current contents.
    ///
    /// On failure every buffer is left untouched.
    pub fn resync<R: RamDomain + ?Sized>(&mut self, ram: &R) -> Result<(), RamError> {
        let mut fresh = vec![0u8; ram.size()];
        ram.copy_into(&mut fresh)?;
        self.prev.clone_from(&fresh);
        self.prior.clone_from(&fresh);
        self.now = fresh;
        Ok(())
    }

    fn ensure_size(&mut self, size: usize) {
        if self.now.len() != size {
            tracing::warn!(
                old = self.now.len(),
                new = size,
                "RAM domain size changed; resizing snapshots"
            );
            for buffer in [&mut self.now, &mut self.prev, &mut self.prior] {
                buffer.resize(size, 0);
            }
        }
    }

    /// Resolve a memory operand. `bias` is added to the address before wrapping.
    ///
    /// Integers take the raw value (or the raw `now - prev` delta), then BCD,
    /// then a full two's complement for invert. Floats ignore both modifiers.
    pub fn read(&self, mem: &MemoryRef, bias: i64) -> Numeric {
        let address = i64::from(mem.address).wrapping_add(bias);
        if mem.prefix.is_float() {
            let at = |buffer: &[u8]| read_float(buffer, mem.prefix, address);
            return Numeric::Float(if mem.uses_delta() {
                at(&self.now) - at(&self.prev)
            } else {
                at(self.generation(mem))
            });
        }

        let at = |buffer: &[u8]| read_int(buffer, mem.prefix, address) as i64;
        let mut value = if mem.uses_delta() {
            at(&self.now).wrapping_sub(at(&self.prev))
        } else {
            at(self.generation(mem))
        };
        if mem.modifiers.contains(Modifiers::BCD) {
            value = ((value >> 4) & 0x0F) * 10 + (value & 0x0F);
        }
        if mem.modifiers.contains(Modifiers::INVERT) {
            value = !value;
        }
        Numeric::Integer(value)
    }

    fn generation(&self, mem: &MemoryRef) -> &[u8] {
        if mem.uses_prior() { &self.prior } else { &self.now }
    }
}

fn byte_at(buffer: &[u8], address: i64, offset: usize) -> u8 {
    if buffer.is_empty() {
        return 0;
    }
    let index = address
        .wrapping_add(offset as i64)
        .rem_euclid(buffer.len() as i64);
    buffer[index as usize]
}

fn bytes_at<const N: usize>(buffer: &[u8], address: i64) -> [u8; N] {
    std::array::from_fn(|offset| byte_at(buffer, address, offset))
}

/// Read an unsigned integer at the prefix's natural width.
fn read_int(buffer: &[u8], prefix: Prefix, address: i64) -> u64 {
    let byte = byte_at(buffer, address, 0);
    if let Some(bit) = prefix.bit_index() {
        return u64::from((byte >> bit) & 1);
    }
    match prefix {
        Prefix::LowerNibble => u64::from(byte & 0x0F),
        Prefix::UpperNibble => u64::from(byte >> 4),
        Prefix::U8 => u64::from(byte),
        Prefix::BitCount => u64::from(byte.count_ones()),
        _ => {
            let len = prefix.byte_len();
            let mut value = 0u64;
            for offset in 0..len {
                let byte = u64::from(byte_at(buffer, address, offset));
                if prefix.is_big_endian() {
                    value = (value << 8) | byte;
                } else {
                    value |= byte << (8 * offset);
                }
            }
            value
        }
    }
}

fn read_float(buffer: &[u8], prefix: Prefix, address: i64) -> f64 {
    let bytes: [u8; 4] = bytes_at(buffer, address);
    match prefix {
        Prefix::F32LE => f64::from(f32::from_le_bytes(bytes)),
        Prefix::F32BE => f64::from(f32::from_be_bytes(bytes)),
        Prefix::Double32LE => f64::from_bits(u64::from(u32::from_le_bytes(bytes)) << 32),
        Prefix::Double32BE => f64::from_bits(u64::from(u32::from_be_bytes(bytes)) << 32),
        Prefix::MBF32Native => decode_mbf32(bytes),
        Prefix::MBF32LE => {
            let [a, b, c, d] = bytes;
            decode_mbf32([d, c, b, a])
        }
        _ => 0.0,
    }
}

/// Microsoft Binary Format single: exponent byte, then sign and 23 mantissa bits.
fn decode_mbf32([exponent, hi, mid, lo]: [u8; 4]) -> f64 {
    if exponent == 0 {
        return 0.0;
    }
    let mantissa = 0x80_0000 | (u32::from(hi & 0x7F) << 16) | (u32::from(mid) << 8) | u32::from(lo);
    let magnitude = f64::from(mantissa) * 2f64.powi(i32::from(exponent) - 152);
    if hi & 0x80 != 0 { -magnitude } else { magnitude }
}
