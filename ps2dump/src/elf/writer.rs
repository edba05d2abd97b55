/*!
Serialization of core files.

A [`CoreFile`] collects register notes and memory blocks and lays them out as a single
`PT_NOTE` segment followed by one `PT_LOAD` segment per memory block. Segment contents
are placed back to back after the program header table. A core file without any
execution context has no `PT_NOTE` segment.
*/

use std::borrow::Cow;
use std::convert::TryFrom;
use std::io::Write;

use goblin::elf::program_header::{PT_LOAD, PT_NOTE};
use log::debug;

use super::header::{FileHeader32, ProgramHeader32, EHDR_PADDED_SIZE, PHDR_SIZE};
use super::note::write_thread_notes;
use crate::error::{Error, ErrorKind, ErrorOrigin, Result};
use crate::savestate::regs::RegisterSet;
use crate::types::to_le;

struct LoadSegment<'a> {
    vaddr: u32,
    paddr: u32,
    flags: u32,
    data: Cow<'a, [u8]>,
}

/// Builder for a 32 bit little endian core file.
pub struct CoreFile<'a> {
    machine: u16,
    flags: u32,
    entry: u32,
    notes: Vec<u8>,
    loads: Vec<LoadSegment<'a>>,
}

impl<'a> CoreFile<'a> {
    pub fn new(machine: u16, flags: u32) -> Self {
        Self {
            machine,
            flags,
            entry: 0,
            notes: Vec::new(),
            loads: Vec::new(),
        }
    }

    /// Sets `e_entry`.
    pub fn entry(mut self, entry: u32) -> Self {
        self.entry = entry;
        self
    }

    /// Adds the notes describing one execution context.
    pub fn add_thread_note(&mut self, regs: &RegisterSet, tid: u32, primary: bool) -> &mut Self {
        debug!(
            "adding notes for thread {} (primary={}, pc={:#010x})",
            tid, primary, regs.pc
        );
        write_thread_notes(&mut self.notes, regs, tid, primary);
        self
    }

    /// Adds a memory block mapped at `vaddr` / `paddr`.
    pub fn add_mem_block<D: Into<Cow<'a, [u8]>>>(
        &mut self,
        vaddr: u32,
        paddr: u32,
        flags: u32,
        data: D,
    ) -> &mut Self {
        let data = data.into();
        debug!(
            "adding memory block at {:#010x} ({:#x} bytes)",
            vaddr,
            data.len()
        );
        self.loads.push(LoadSegment {
            vaddr,
            paddr,
            flags,
            data,
        });
        self
    }

    /// Returns the size of the note segment.
    pub fn notes_len(&self) -> usize {
        self.notes.len()
    }

    /// Returns the number of program headers that will be written.
    pub fn phnum(&self) -> usize {
        usize::from(!self.notes.is_empty()) + self.loads.len()
    }

    /// Returns the program headers in file order.
    pub fn program_headers(&self) -> Result<Vec<ProgramHeader32>> {
        let mut offset = EHDR_PADDED_SIZE + PHDR_SIZE * self.phnum();
        let mut headers = Vec::with_capacity(self.phnum());

        if !self.notes.is_empty() {
            headers.push(ProgramHeader32 {
                p_type: PT_NOTE,
                p_offset: to_u32(offset)?,
                p_vaddr: 0,
                p_paddr: 0,
                p_filesz: to_u32(self.notes.len())?,
                p_memsz: 0,
                p_flags: 0,
                p_align: 0,
            });
            offset += self.notes.len();
        }

        for load in self.loads.iter() {
            let len = to_u32(load.data.len())?;
            headers.push(ProgramHeader32 {
                p_type: PT_LOAD,
                p_offset: to_u32(offset)?,
                p_vaddr: load.vaddr,
                p_paddr: load.paddr,
                p_filesz: len,
                p_memsz: len,
                p_flags: load.flags,
                p_align: 0,
            });
            offset += load.data.len();
        }

        Ok(headers)
    }

    /// Writes the complete core file to `out`.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<()> {
        let headers = self.program_headers()?;
        let phnum = u16::try_from(headers.len()).map_err(|_| {
            Error(ErrorOrigin::ElfWriter, ErrorKind::OutOfBounds)
                .log_error("too many program headers")
        })?;

        let header = to_le(FileHeader32::core(
            self.machine,
            self.flags,
            self.entry,
            phnum,
        ));
        write_all(out, dataview::bytes(&header))?;

        for phdr in headers.into_iter() {
            write_all(out, dataview::bytes(&to_le(phdr)))?;
        }

        write_all(out, &self.notes)?;
        for load in self.loads.iter() {
            write_all(out, &load.data)?;
        }

        Ok(())
    }

    /// Serializes the core file into a byte vector.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let len = EHDR_PADDED_SIZE
            + PHDR_SIZE * self.phnum()
            + self.notes.len()
            + self.loads.iter().map(|l| l.data.len()).sum::<usize>();

        let mut out = Vec::with_capacity(len);
        self.write_to(&mut out)?;
        Ok(out)
    }
}

fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        Error(ErrorOrigin::ElfWriter, ErrorKind::OutOfBounds)
            .log_error(format!("{:#x} does not fit into a 32 bit offset", value))
    })
}

fn write_all<W: Write>(out: &mut W, buf: &[u8]) -> Result<()> {
    out.write_all(buf)
        .map_err(|err| Error(ErrorOrigin::ElfWriter, ErrorKind::UnableToWriteFile).log_error(err))
}
