//! RAM domain collaborators
//!
//! The engine only needs a narrow view of the emulated machine: a fixed-size
//! byte domain it can copy from, a way to poke bytes into it, and a way to
//! advance one video frame.

use thiserror::Error;

/// Size of the console system RAM domain (2 KiB).
pub const NES_SYSTEM_RAM_SIZE: usize = 0x800;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RamError {
    #[error("buffer holds {actual} bytes but the domain has {needed}")]
    BufferTooSmall { needed: usize, actual: usize },
    #[error("RAM domain unavailable: {0}")]
    Unavailable(String),
}

/// Read access to a fixed-size RAM domain.
pub trait RamDomain {
    /// Declared size of the domain in bytes.
    fn size(&self) -> usize;

    /// Fill the first `size()` bytes of `buffer` with the domain's contents.
    fn copy_into(&self, buffer: &mut [u8]) -> Result<(), RamError>;

    /// Read a single byte; `index` wraps to the domain size.
    ///
    /// The default copies the whole domain. Implementors with direct access
    /// should override it.
    fn peek(&self, index: usize) -> u8 {
        let size = self.size();
        if size == 0 {
            return 0;
        }
        let mut scratch = vec![0u8; size];
        match self.copy_into(&mut scratch) {
            Ok(()) => scratch[index % size],
            Err(_) => 0,
        }
    }
}

/// Write access to the same domain the evaluator reads.
pub trait MemoryDomain: RamDomain {
    /// Write a single byte; `index` wraps to the domain size.
    fn poke(&mut self, index: usize, value: u8);
}

/// Advances the emulated machine.
pub trait FrameStepper {
    /// Run exactly one video frame.
    fn run_frame(&mut self);
}

/// Owned, fixed-size RAM domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemRam {
    bytes: Vec<u8>,
}

impl SystemRam {
    /// Zero-filled domain of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
        }
    }

    /// The 2 KiB console system RAM.
    pub fn nes() -> Self {
        Self::new(NES_SYSTEM_RAM_SIZE)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn fill(&mut self, value: u8) {
        self.bytes.fill(value);
    }

    fn wrap(&self, index: usize) -> Option<usize> {
        if self.bytes.is_empty() {
            None
        } else {
            Some(index % self.bytes.len())
        }
    }
}

impl RamDomain for SystemRam {
    fn size(&self) -> usize {
        self.bytes.len()
    }

    fn copy_into(&self, buffer: &mut [u8]) -> Result<(), RamError> {
        let needed = self.bytes.len();
        if buffer.len() < needed {
            return Err(RamError::BufferTooSmall {
                needed,
                actual: buffer.len(),
            });
        }
        buffer[..needed].copy_from_slice(&self.bytes);
        Ok(())
    }

    fn peek(&self, index: usize) -> u8 {
        self.wrap(index).map_or(0, |i| self.bytes[i])
    }
}

impl MemoryDomain for SystemRam {
    fn poke(&mut self, index: usize, value: u8) {
        if let Some(i) = self.wrap(index) {
            self.bytes[i] = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CopyOnly(Vec<u8>);

    impl RamDomain for CopyOnly {
        fn size(&self) -> usize {
            self.0.len()
        }

        fn copy_into(&self, buffer: &mut [u8]) -> Result<(), RamError> {
            buffer[..self.0.len()].copy_from_slice(&self.0);
            Ok(())
        }
    }

    #[test]
    fn test_nes_ram_size() {
        assert_eq!(SystemRam::nes().size(), 2048);
    }

    #[test]
    fn test_poke_and_peek_wrap() {
        let mut ram = SystemRam::new(16);
        ram.poke(0x13, 0xAB);
        assert_eq!(ram.peek(3), 0xAB);
        assert_eq!(ram.peek(0x23), 0xAB);
    }

    #[test]
    fn test_copy_into_short_buffer() {
        let ram = SystemRam::new(8);
        let mut buffer = [0u8; 4];
        assert_eq!(
            ram.copy_into(&mut buffer),
            Err(RamError::BufferTooSmall {
                needed: 8,
                actual: 4
            })
        );
    }

    #[test]
    fn test_default_peek_uses_copy() {
        let domain = CopyOnly(vec![1, 2, 3]);
        assert_eq!(domain.peek(1), 2);
        assert_eq!(domain.peek(4), 2);
    }

    #[test]
    fn test_empty_domain() {
        let mut ram = SystemRam::new(0);
        ram.poke(5, 1);
        assert_eq!(ram.peek(5), 0);
        assert_eq!(CopyOnly(Vec::new()).peek(0), 0);
    }
}
