//! Shared test utilities for unit tests

use crate::ram::{FrameStepper, MemoryDomain, RamDomain, RamError, SystemRam};

// ============================================================================
// Test Console Implementation
// ============================================================================

type FrameHook = Box<dyn FnMut(&mut SystemRam, u64)>;

/// RAM domain plus frame stepper for executor and engine tests.
///
/// The optional hook runs once per frame and may mutate RAM, standing in for
/// the emulated program.
pub struct TestConsole {
    pub ram: SystemRam,
    pub frames: u64,
    hook: Option<FrameHook>,
}

impl TestConsole {
    pub fn new(size: usize) -> Self {
        Self {
            ram: SystemRam::new(size),
            frames: 0,
            hook: None,
        }
    }

    pub fn with_hook(mut self, hook: impl FnMut(&mut SystemRam, u64) + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }
}

impl RamDomain for TestConsole {
    fn size(&self) -> usize {
        self.ram.size()
    }

    fn copy_into(&self, buffer: &mut [u8]) -> Result<(), RamError> {
        self.ram.copy_into(buffer)
    }

    fn peek(&self, index: usize) -> u8 {
        self.ram.peek(index)
    }
}

impl MemoryDomain for TestConsole {
    fn poke(&mut self, index: usize, value: u8) {
        self.ram.poke(index, value);
    }
}

impl FrameStepper for TestConsole {
    fn run_frame(&mut self) {
        self.frames += 1;
        if let Some(hook) = self.hook.as_mut() {
            hook(&mut self.ram, self.frames);
        }
    }
}

// ============================================================================
// Failing RAM
// ============================================================================

/// Domain whose copies always fail.
pub struct FailingRam {
    size: usize,
}

impl FailingRam {
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl RamDomain for FailingRam {
    fn size(&self) -> usize {
        self.size
    }

    fn copy_into(&self, _buffer: &mut [u8]) -> Result<(), RamError> {
        Err(RamError::Unavailable("test domain".into()))
    }
}
