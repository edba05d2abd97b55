/*!
Savestate to core file translation.
*/

use std::fs;
use std::path::Path;

use goblin::elf::header::EM_MIPS;
use log::info;

use crate::archive::{SavestateArchive, ZipSavestate};
use crate::elf::{CoreFile, EE_ELF_FLAGS, PF_RWX};
use crate::error::{Error, ErrorKind, ErrorOrigin, Result};
use crate::savestate::memory::BIOS_SIZE;
use crate::savestate::{Savestate, SavestateReader};

/// Settings of a translation run.
///
/// The defaults produce a core file for the Emotion Engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DumpConfig {
    pub machine: u16,
    pub flags: u32,
    pub entry: u32,
    pub bios_size: usize,
    pub recover_threads: bool,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            machine: EM_MIPS,
            flags: EE_ELF_FLAGS,
            entry: 0,
            bios_size: BIOS_SIZE,
            recover_threads: true,
        }
    }
}

impl DumpConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `e_machine`.
    pub fn machine(mut self, machine: u16) -> Self {
        self.machine = machine;
        self
    }

    /// Sets `e_flags`.
    pub fn flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// Sets `e_entry`.
    pub fn entry(mut self, entry: u32) -> Self {
        self.entry = entry;
        self
    }

    /// Sets the size of the kernel region, user RAM is mapped right after it.
    pub fn bios_size(mut self, bios_size: usize) -> Self {
        self.bios_size = bios_size;
        self
    }

    /// Enables or disables thread recovery.
    pub fn recover_threads(mut self, recover_threads: bool) -> Self {
        self.recover_threads = recover_threads;
        self
    }
}

/// Outcome of a successful translation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DumpSummary {
    pub version: u32,
    /// Number of contexts written, including the executing one.
    pub contexts: usize,
    pub core_size: usize,
}

/// Reads a savestate from any archive.
pub fn read_savestate<A: SavestateArchive>(archive: A, config: &DumpConfig) -> Result<Savestate> {
    SavestateReader::new(archive)
        .recover_threads(config.recover_threads)
        .bios_size(config.bios_size)
        .parse()
}

/// Builds the core file for a decoded savestate.
pub fn build_core<'a>(state: &'a Savestate, config: &DumpConfig) -> CoreFile<'a> {
    let mut core = CoreFile::new(config.machine, config.flags).entry(config.entry);

    core.add_thread_note(&state.registers, state.primary_thread_id(), true);
    for thread in state.threads.iter() {
        core.add_thread_note(&thread.registers, thread.id, false);
    }

    for segment in state.memory.segments().iter() {
        core.add_mem_block(segment.address, segment.address, PF_RWX, segment.data);
    }

    core
}

/// Translates the savestate at `input` into a core file at `output` with default settings.
pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> Result<DumpSummary> {
    run_with_config(input, output, &DumpConfig::default())
}

/// Translates the savestate at `input` into a core file at `output`.
///
/// Nothing is written unless the savestate was decoded completely.
pub fn run_with_config<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    config: &DumpConfig,
) -> Result<DumpSummary> {
    let archive = ZipSavestate::open(input.as_ref())?;
    let state = read_savestate(archive, config)?;

    let bytes = build_core(&state, config).serialize()?;

    fs::write(output.as_ref(), &bytes).map_err(|err| {
        Error(ErrorOrigin::Output, ErrorKind::UnableToWriteFile).log_error(format!(
            "{}: {}",
            output.as_ref().display(),
            err
        ))
    })?;

    info!(
        "wrote {} ({:#x} bytes, {} contexts)",
        output.as_ref().display(),
        bytes.len(),
        state.threads.len() + 1
    );

    Ok(DumpSummary {
        version: state.version,
        contexts: state.threads.len() + 1,
        core_size: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::MemoryArchive;
    use crate::elf::note::THREAD_NOTES_SIZE;
    use crate::savestate::schema::{marker_bytes, schema_len, INTERNAL_STRUCTURES};
    use crate::savestate::{EE_MEMORY_ENTRY, INTERNAL_STRUCTURES_ENTRY, VERSION_ENTRY};

    fn archive() -> MemoryArchive {
        let mut blob = vec![0u8; schema_len(INTERNAL_STRUCTURES)];
        blob[..32].copy_from_slice(&marker_bytes("BIOS", 32));
        blob[292..324].copy_from_slice(&marker_bytes("cpuRegs", 32));

        MemoryArchive::new()
            .with_entry(VERSION_ENTRY, 0x8b43_0000_u32.to_le_bytes().to_vec())
            .with_entry(INTERNAL_STRUCTURES_ENTRY, blob)
            .with_entry(EE_MEMORY_ENTRY, vec![0u8; 0x3000])
    }

    #[test]
    fn config_builder() {
        let config = DumpConfig::new()
            .entry(0x0010_0008)
            .bios_size(0x1000)
            .recover_threads(false);
        assert_eq!(config.machine, EM_MIPS);
        assert_eq!(config.flags, 0x2092_0021);
        assert_eq!(config.entry, 0x0010_0008);
        assert_eq!(config.bios_size, 0x1000);
        assert!(!config.recover_threads);
    }

    #[test]
    fn core_without_threads() {
        let config = DumpConfig::new().bios_size(0x1000);
        let state = read_savestate(archive(), &config).unwrap();
        let core = build_core(&state, &config);

        assert_eq!(core.notes_len(), THREAD_NOTES_SIZE);
        let headers = core.program_headers().unwrap();
        assert_eq!(headers.len(), 3);
        assert_eq!(headers[1].p_vaddr, 0);
        assert_eq!(headers[1].p_filesz, 0x1000);
        assert_eq!(headers[2].p_vaddr, 0x1000);
        assert_eq!(headers[2].p_paddr, 0x1000);
        assert_eq!(headers[2].p_filesz, 0x2000);
    }

    #[test]
    fn missing_input() {
        let err = run("/nonexistent/savestate.p2s", "/nonexistent/out.core")
            .err()
            .unwrap();
        assert_eq!(err.1, ErrorKind::UnableToOpenFile);
    }
}
