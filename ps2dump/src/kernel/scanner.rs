/*!
Locates the kernel thread table by scanning low memory for a known code sequence.

The kernel initializes its thread list with a store through `$v0` followed by two
`nop`s. A few instructions later it loads the table address with a 16 bit
displacement relative to the kernel data segment, which is where the table base
is taken from.
*/

use std::convert::TryInto;

use log::{debug, trace};

use crate::types::size;

/// Number of bytes at the start of memory searched for the signature.
pub const SCAN_RANGE: usize = size::kb(64);

/// `sw $v0, 0($v0)`
pub const SW_V0_0_V0: u32 = 0xac42_0000;

/// `sll $zero, $zero, 0`
pub const NOP: u32 = 0;

/// Position of the displacement relative to the signature.
pub const DISPLACEMENT_OFFSET: usize = 24;

/// Bytes that must be readable at a candidate position.
pub const WINDOW_LEN: usize = DISPLACEMENT_OFFSET + 4;

/// Base the displacement is applied to.
pub const KERNEL_DATA_BASE: u32 = 0x20000;

/// Where the thread table was found.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ThreadTableLocation {
    /// Offset of the matched signature in memory.
    pub signature_offset: usize,
    pub displacement: i16,
    /// Address of the first table entry.
    pub base: u32,
}

fn word(mem: &[u8], offset: usize) -> Option<u32> {
    let bytes = mem.get(offset..offset.checked_add(4)?)?;
    bytes.try_into().ok().map(u32::from_le_bytes)
}

fn half(mem: &[u8], offset: usize) -> Option<i16> {
    let bytes = mem.get(offset..offset.checked_add(2)?)?;
    bytes.try_into().ok().map(i16::from_le_bytes)
}

/// Returns the offset of the first signature match.
pub fn find_signature(mem: &[u8]) -> Option<usize> {
    let end = mem.len().min(SCAN_RANGE);
    (0..end)
        .step_by(4)
        .filter(|&off| off + WINDOW_LEN <= mem.len())
        .find(|&off| {
            word(mem, off) == Some(SW_V0_0_V0)
                && word(mem, off + 4) == Some(NOP)
                && word(mem, off + 8) == Some(NOP)
        })
}

/// Scans `mem` for the thread table.
///
/// Returns `None` if the signature is not present, which happens when the savestate was
/// taken before the kernel initialized or with a different kernel revision.
pub fn find_thread_table(mem: &[u8]) -> Option<ThreadTableLocation> {
    let signature_offset = find_signature(mem)?;
    trace!("thread table signature at {:#x}", signature_offset);

    let displacement = half(mem, signature_offset + DISPLACEMENT_OFFSET)?;
    let base = KERNEL_DATA_BASE
        .wrapping_add(displacement as i32 as u32)
        .wrapping_sub(8);

    debug!(
        "thread table displacement {} resolves to {:#x}",
        displacement, base
    );

    Some(ThreadTableLocation {
        signature_offset,
        displacement,
        base,
    })
}
