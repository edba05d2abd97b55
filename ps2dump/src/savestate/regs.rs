/*!
Emotion Engine register set.
*/

/// Number of general purpose registers.
pub const GPR_COUNT: usize = 32;

/// Number of coprocessor 0 registers.
pub const CP0_COUNT: usize = 32;

/// General purpose register indices with a fixed meaning.
pub mod gpr {
    pub const ZERO: usize = 0;
    pub const K0: usize = 26;
    pub const K1: usize = 27;
    pub const SP: usize = 29;
    pub const RA: usize = 31;
}

/// Coprocessor 0 register indices.
pub mod cp0 {
    pub const BAD_VADDR: usize = 8;
    pub const STATUS: usize = 12;
    pub const CAUSE: usize = 13;
}

/// CPU state of one execution context.
///
/// The emulator keeps 128-bit general purpose and HI/LO slots, only the lower 64 bits are kept.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegisterSet {
    pub gpr: [u64; GPR_COUNT],
    pub hi: u64,
    pub lo: u64,
    pub cp0: [u32; CP0_COUNT],
    /// Shift amount register.
    pub sa: u32,
    pub isds: u32,
    pub pc: u32,
}

impl RegisterSet {
    /// Returns the stack pointer.
    pub fn sp(&self) -> u64 {
        self.gpr[gpr::SP]
    }

    /// Returns the return address register.
    pub fn ra(&self) -> u64 {
        self.gpr[gpr::RA]
    }
}
