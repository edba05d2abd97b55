/*!
Minimal ELF core file writer.

Only what a debugger needs to load a core is produced: the file header, one note
segment with process and thread status notes and load segments for memory.
*/

pub mod header;
pub mod note;
pub mod writer;

use goblin::elf::program_header::{PF_R, PF_W, PF_X};

#[doc(hidden)]
pub use writer::CoreFile;

/// Readable, writable and executable.
pub const PF_RWX: u32 = PF_R | PF_W | PF_X;

/// `e_flags` of the Emotion Engine: `EF_MIPS_NOREORDER | EF_MIPS_32BITMODE`, the R5900
/// machine extension and the o32 ABI.
pub const EE_ELF_FLAGS: u32 = 0x2092_0021;
