/*!
Core file notes in the Linux MIPS o32 layout.
*/

use dataview::Pod;
use goblin::elf::note::{NT_PRPSINFO, NT_PRSTATUS};

use crate::savestate::regs::{cp0, RegisterSet, GPR_COUNT};
use crate::types::{to_le, ByteSwap};

/// Owner name of process and thread notes.
pub const NOTE_NAME: &[u8] = b"CORE\0";

pub const NOTE_ALIGN: usize = 4;

/// Size of the register block inside `NT_PRSTATUS`.
pub const REGISTER_RECORD_SIZE: usize = 364;
pub const PRPSINFO_SIZE: usize = 128;
pub const PRSTATUS_SIZE: usize = 440;

/// Placeholder user and group id.
pub const CORE_UID: u32 = 1000;
pub const CORE_GID: u32 = 1000;
/// Placeholder pid of the process and its parent.
pub const CORE_PID: u32 = 1;

/// Process name reported by the debugger.
pub const CORE_FNAME: &[u8] = b"ps2-executable";

/// Rounds `len` up to the note alignment.
pub const fn align_note(len: usize) -> usize {
    (len + NOTE_ALIGN - 1) & !(NOTE_ALIGN - 1)
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod)]
pub struct NoteHeader {
    pub n_namesz: u32, // 0x00
    pub n_descsz: u32, // 0x04
    pub n_type: u32,   // 0x08
}

crate::impl_byte_swap!(NoteHeader {
    n_namesz,
    n_descsz,
    n_type
});

/// Register block of a thread, every slot 8 bytes little endian.
#[repr(C)]
#[derive(Copy, Clone, Pod)]
pub struct RegisterRecord {
    pub gpr: [[u8; 8]; GPR_COUNT], // 0x000
    pub lo: [u8; 8],               // 0x100
    pub hi: [u8; 8],               // 0x108
    pub pc: [u8; 8],               // 0x110
    pub badvaddr: [u8; 8],         // 0x118
    pub status: [u8; 8],           // 0x120
    pub cause: [u8; 8],            // 0x128
    pub reserved: [u8; 60],        // 0x130
} // size: 0x16c

impl RegisterRecord {
    /// Encodes `regs`. HI and LO are only reported for the primary context.
    pub fn new(regs: &RegisterSet, primary: bool) -> Self {
        let mut record: Self = dataview::zeroed();

        for (dst, reg) in record.gpr.iter_mut().zip(regs.gpr.iter()) {
            *dst = reg.to_le_bytes();
        }
        if primary {
            record.lo = regs.lo.to_le_bytes();
            record.hi = regs.hi.to_le_bytes();
        }
        record.pc = u64::from(regs.pc).to_le_bytes();
        record.badvaddr = u64::from(regs.cp0[cp0::BAD_VADDR]).to_le_bytes();
        record.status = u64::from(regs.cp0[cp0::STATUS]).to_le_bytes();
        record.cause = u64::from(regs.cp0[cp0::CAUSE]).to_le_bytes();

        record
    }
}

crate::impl_byte_swap!(RegisterRecord {});

/// `elf_prpsinfo`
#[repr(C)]
#[derive(Copy, Clone, Pod)]
pub struct PrPsInfo {
    pub pr_state: u8,        // 0x00
    pub pr_sname: u8,        // 0x01
    pub pr_zomb: u8,         // 0x02
    pub pr_nice: u8,         // 0x03
    pub pr_flag: u32,        // 0x04
    pub pr_uid: u32,         // 0x08
    pub pr_gid: u32,         // 0x0c
    pub pr_pid: u32,         // 0x10
    pub pr_ppid: u32,        // 0x14
    pub pr_pgrp: u32,        // 0x18
    pub pr_sid: u32,         // 0x1c
    pub pr_fname: [u8; 16],  // 0x20
    pub pr_psargs: [u8; 80], // 0x30
} // size: 0x80

crate::impl_byte_swap!(PrPsInfo {
    pr_flag,
    pr_uid,
    pr_gid,
    pr_pid,
    pr_ppid,
    pr_pgrp,
    pr_sid,
});

impl PrPsInfo {
    pub fn new() -> Self {
        let mut info: Self = dataview::zeroed();
        info.pr_uid = CORE_UID;
        info.pr_gid = CORE_GID;
        info.pr_pid = CORE_PID;
        info.pr_ppid = CORE_PID;
        info.pr_pgrp = CORE_PID;
        info.pr_sid = CORE_PID;
        info.pr_fname[..CORE_FNAME.len()].copy_from_slice(CORE_FNAME);
        info
    }
}

impl Default for PrPsInfo {
    fn default() -> Self {
        Self::new()
    }
}

/// `elf_prstatus`
#[repr(C)]
#[derive(Copy, Clone, Pod)]
pub struct PrStatus {
    pub si_signo: u32,          // 0x00
    pub si_code: u32,           // 0x04
    pub si_errno: u32,          // 0x08
    pub pr_cursig: u16,         // 0x0c
    pub pr_pad: u16,            // 0x0e
    pub pr_sigpend: u32,        // 0x10
    pub pr_sighold: u32,        // 0x14
    pub pr_pid: u32,            // 0x18
    pub pr_ppid: u32,           // 0x1c
    pub pr_pgrp: u32,           // 0x20
    pub pr_sid: u32,            // 0x24
    pub pr_time: [u32; 8],      // 0x28 utime, stime, cutime, cstime
    pub pr_reg: RegisterRecord, // 0x48
    pub pr_fpvalid: u32,        // 0x1b4
} // size: 0x1b8

crate::impl_byte_swap!(PrStatus {
    si_signo,
    si_code,
    si_errno,
    pr_cursig,
    pr_pad,
    pr_sigpend,
    pr_sighold,
    pr_pid,
    pr_ppid,
    pr_pgrp,
    pr_sid,
    pr_time,
    pr_reg,
    pr_fpvalid,
});

impl PrStatus {
    /// Creates the status of thread `tid`, reported as pid `tid + 1`.
    pub fn new(regs: &RegisterSet, tid: u32, primary: bool) -> Self {
        let mut status: Self = dataview::zeroed();
        status.pr_pid = tid.wrapping_add(1);
        status.pr_ppid = CORE_PID;
        status.pr_pgrp = CORE_PID;
        status.pr_sid = CORE_PID;
        status.pr_reg = RegisterRecord::new(regs, primary);
        status
    }
}

/// Appends a note with the given type and descriptor to `out`.
pub fn write_note<T: Pod + ByteSwap>(out: &mut Vec<u8>, n_type: u32, desc: T) {
    let desc = to_le(desc);
    let desc = dataview::bytes(&desc);

    let header = to_le(NoteHeader {
        n_namesz: NOTE_NAME.len() as u32,
        n_descsz: desc.len() as u32,
        n_type,
    });
    out.extend_from_slice(dataview::bytes(&header));

    out.extend_from_slice(NOTE_NAME);
    out.resize(out.len() + align_note(NOTE_NAME.len()) - NOTE_NAME.len(), 0);

    out.extend_from_slice(desc);
    out.resize(out.len() + align_note(desc.len()) - desc.len(), 0);
}

/// Size of a wrapped note carrying `desc_len` bytes.
pub const fn note_size(desc_len: usize) -> usize {
    std::mem::size_of::<NoteHeader>() + align_note(NOTE_NAME.len()) + align_note(desc_len)
}

/// Size of the notes emitted for every context.
pub const THREAD_NOTES_SIZE: usize = note_size(PRPSINFO_SIZE) + note_size(PRSTATUS_SIZE);

/// Appends the process info and status notes of one context.
pub fn write_thread_notes(out: &mut Vec<u8>, regs: &RegisterSet, tid: u32, primary: bool) {
    write_note(out, NT_PRPSINFO, PrPsInfo::new());
    write_note(out, NT_PRSTATUS, PrStatus::new(regs, tid, primary));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    fn offset_of<T, F>(base: &T, field: &F) -> usize {
        field as *const _ as usize - base as *const _ as usize
    }

    fn u32_at(buf: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
    }

    fn u64_at(buf: &[u8], at: usize) -> u64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&buf[at..at + 8]);
        u64::from_le_bytes(raw)
    }

    #[test]
    fn test_struct_sizes() {
        assert_eq!(size_of::<NoteHeader>(), 12);
        assert_eq!(size_of::<RegisterRecord>(), REGISTER_RECORD_SIZE);
        assert_eq!(size_of::<PrPsInfo>(), PRPSINFO_SIZE);
        assert_eq!(size_of::<PrStatus>(), PRSTATUS_SIZE);
        assert_eq!(note_size(PRPSINFO_SIZE), 148);
        assert_eq!(note_size(PRSTATUS_SIZE), 460);
        assert_eq!(THREAD_NOTES_SIZE, 608);
    }

    #[test]
    fn test_struct_members() {
        let info = PrPsInfo::new();
        assert_eq!(offset_of(&info, &info.pr_uid), 0x08);
        assert_eq!(offset_of(&info, &info.pr_fname), 0x20);
        assert_eq!(offset_of(&info, &info.pr_psargs), 0x30);

        let status: PrStatus = dataview::zeroed();
        assert_eq!(offset_of(&status, &status.pr_pid), 0x18);
        assert_eq!(offset_of(&status, &status.pr_time), 0x28);
        assert_eq!(offset_of(&status, &status.pr_reg), 0x48);
        assert_eq!(offset_of(&status, &status.pr_fpvalid), 0x1b4);
    }

    #[test]
    fn register_record_offsets() {
        let mut regs = RegisterSet::default();
        regs.gpr[0] = 0x1;
        regs.lo = 0x2;
        regs.hi = 0x3;
        regs.pc = 0x40_0000;
        regs.cp0[cp0::BAD_VADDR] = 0x5;
        regs.cp0[cp0::STATUS] = 0x6;
        regs.cp0[cp0::CAUSE] = 0x7;

        let record = RegisterRecord::new(&regs, true);
        let bytes = dataview::bytes(&record);
        assert_eq!(u64_at(bytes, 0), 0x1);
        assert_eq!(u64_at(bytes, 256), 0x2);
        assert_eq!(u64_at(bytes, 264), 0x3);
        assert_eq!(u64_at(bytes, 272), 0x40_0000);
        assert_eq!(u64_at(bytes, 280), 0x5);
        assert_eq!(u64_at(bytes, 288), 0x6);
        assert_eq!(u64_at(bytes, 296), 0x7);
        assert!(bytes[304..].iter().all(|&b| b == 0));
    }

    #[test]
    fn secondary_hides_lo_hi() {
        let mut regs = RegisterSet::default();
        regs.gpr[4] = 0xffff_ffff_8000_0000;
        regs.lo = 0x2;
        regs.hi = 0x3;

        let record = RegisterRecord::new(&regs, false);
        let bytes = dataview::bytes(&record);
        assert_eq!(u64_at(bytes, 4 * 8), 0xffff_ffff_8000_0000);
        assert_eq!(u64_at(bytes, 256), 0);
        assert_eq!(u64_at(bytes, 264), 0);
    }

    #[test]
    fn note_wrapping() {
        let mut out = Vec::new();
        write_note(&mut out, NT_PRPSINFO, PrPsInfo::new());
        assert_eq!(out.len(), 148);
        assert_eq!(u32_at(&out, 0), 5);
        assert_eq!(u32_at(&out, 4), 128);
        assert_eq!(u32_at(&out, 8), NT_PRPSINFO);
        assert_eq!(&out[12..20], b"CORE\0\0\0\0");
        // uid, gid
        assert_eq!(u32_at(&out, 20 + 8), 1000);
        assert_eq!(u32_at(&out, 20 + 12), 1000);
        assert_eq!(&out[20 + 32..20 + 48], b"ps2-executable\0\0");
    }

    #[test]
    fn thread_notes() {
        let mut regs = RegisterSet::default();
        regs.pc = 0x0010_0000;

        let mut out = Vec::new();
        write_thread_notes(&mut out, &regs, 4, false);
        assert_eq!(out.len(), THREAD_NOTES_SIZE);

        let status = &out[148..];
        assert_eq!(u32_at(status, 4), 440);
        assert_eq!(u32_at(status, 8), NT_PRSTATUS);
        // pid follows the six signal words
        assert_eq!(u32_at(status, 20 + 24), 5);
        assert_eq!(u32_at(status, 20 + 28), 1);
        assert_eq!(u64_at(status, 20 + 72 + 272), 0x0010_0000);
    }
}
