/*!
Decoding of PCSX2 savestates.

[`SavestateReader`] validates the container, decodes the CPU registers from the internal
structures blob, loads the EE memory image and, unless disabled, recovers the kernel
thread table from memory.
*/

pub mod cursor;
pub mod memory;
pub mod regs;
pub mod schema;

use log::{info, warn};

use crate::archive::SavestateArchive;
use crate::error::{Error, ErrorKind, ErrorOrigin, Result};
use crate::kernel::{find_thread_table, read_thread_table, ThreadDescriptor, ThreadList};

use cursor::{le_u32, BlobCursor};
use memory::{MemoryImage, BIOS_SIZE};
use regs::RegisterSet;

pub const VERSION_ENTRY: &str = "PCSX2 Savestate Version.id";
pub const INTERNAL_STRUCTURES_ENTRY: &str = "PCSX2 Internal Structures.dat";
pub const EE_MEMORY_ENTRY: &str = "eeMemory.bin";

/// Oldest savestate major version with a known layout.
pub const VERSION_FLOOR: u32 = 0x8b43;

/// Returns the major part of a savestate version.
pub const fn version_major(version: u32) -> u32 {
    version >> 16
}

/// Fails unless `version` is recent enough to be decoded.
pub fn check_version(version: u32) -> Result<()> {
    if version_major(version) < VERSION_FLOOR {
        return Err(
            Error(ErrorOrigin::Savestate, ErrorKind::VersionMismatch).log_error(format!(
                "version {:#010x} is older than {:#06x}",
                version, VERSION_FLOOR
            )),
        );
    }
    Ok(())
}

/// Decodes the version entry.
pub fn parse_version(data: &[u8]) -> Result<u32> {
    if data.len() < 4 {
        return Err(Error(ErrorOrigin::Savestate, ErrorKind::InvalidVersion)
            .log_error(format!("version entry is {} bytes long", data.len())));
    }
    Ok(le_u32(data))
}

/// Everything recovered from a savestate.
#[derive(Clone, Debug)]
pub struct Savestate {
    pub version: u32,
    /// Registers of the context that was executing.
    pub registers: RegisterSet,
    /// Id of the running thread, if the thread table was found.
    pub running_thread: Option<u32>,
    pub threads: Vec<ThreadDescriptor>,
    pub memory: MemoryImage,
}

impl Savestate {
    /// Thread id to report for the executing context.
    pub fn primary_thread_id(&self) -> u32 {
        self.running_thread.unwrap_or(0)
    }
}

/// Builder-style reader for savestates.
///
/// # Examples
///
/// ```no_run
/// use ps2dump::archive::ZipSavestate;
/// use ps2dump::savestate::SavestateReader;
///
/// let archive = ZipSavestate::open("game.p2s").unwrap();
/// let state = SavestateReader::new(archive)
///     .recover_threads(false)
///     .parse()
///     .unwrap();
/// println!("pc = {:#x}", state.registers.pc);
/// ```
pub struct SavestateReader<A> {
    archive: A,
    recover_threads: bool,
    bios_size: usize,
}

impl<A: SavestateArchive> SavestateReader<A> {
    pub fn new(archive: A) -> Self {
        Self {
            archive,
            recover_threads: true,
            bios_size: BIOS_SIZE,
        }
    }

    /// Enables or disables the thread table scan.
    pub fn recover_threads(mut self, recover: bool) -> Self {
        self.recover_threads = recover;
        self
    }

    /// Sets where the memory image is split into the kernel region and user RAM.
    pub fn bios_size(mut self, size: usize) -> Self {
        self.bios_size = size;
        self
    }

    fn require_entries(&self) -> Result<()> {
        let names = self.archive.entry_names();
        for entry in [VERSION_ENTRY, INTERNAL_STRUCTURES_ENTRY, EE_MEMORY_ENTRY].iter() {
            if !names.iter().any(|n| n == entry) {
                return Err(Error(ErrorOrigin::Savestate, ErrorKind::EntryNotFound)
                    .log_error(format!("missing entry {:?}", entry)));
            }
        }
        Ok(())
    }

    /// Reads and decodes the savestate.
    pub fn parse(mut self) -> Result<Savestate> {
        self.require_entries()?;

        let version = parse_version(&self.archive.read_entry(VERSION_ENTRY)?)?;
        info!(
            "savestate version {:#010x} (major {:#06x})",
            version,
            version_major(version)
        );
        check_version(version)?;

        let blob = self.archive.read_entry(INTERNAL_STRUCTURES_ENTRY)?;
        let mut cursor = BlobCursor::new(&blob);
        let registers = schema::decode(schema::INTERNAL_STRUCTURES, &mut cursor)?;
        info!(
            "cpu registers: pc={:#010x} sp={:#x} ra={:#x}",
            registers.pc,
            registers.sp(),
            registers.ra()
        );

        let memory =
            MemoryImage::with_split(self.archive.read_entry(EE_MEMORY_ENTRY)?, self.bios_size);
        info!("ee memory: {:#x} bytes", memory.len());

        let list = if self.recover_threads {
            match find_thread_table(memory.as_bytes()) {
                Some(loc) => {
                    info!("thread table at {:#x}", loc.base);
                    read_thread_table(&memory, loc.base)?
                }
                None => {
                    warn!("thread table not found, only the executing context is recovered");
                    ThreadList::default()
                }
            }
        } else {
            ThreadList::default()
        };

        Ok(Savestate {
            version,
            registers,
            running_thread: list.running,
            threads: list.threads,
            memory,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::schema::{marker_bytes, schema_len, INTERNAL_STRUCTURES, MARKER_WIDTH};
    use super::*;
    use crate::archive::MemoryArchive;

    fn blob() -> Vec<u8> {
        let mut blob = vec![0u8; schema_len(INTERNAL_STRUCTURES)];
        blob[..MARKER_WIDTH].copy_from_slice(&marker_bytes("BIOS", MARKER_WIDTH));
        blob[292..292 + MARKER_WIDTH].copy_from_slice(&marker_bytes("cpuRegs", MARKER_WIDTH));
        let pc_at = blob.len() - 4;
        blob[pc_at..].copy_from_slice(&0x0010_0008_u32.to_le_bytes());
        blob
    }

    fn archive(version: u32) -> MemoryArchive {
        MemoryArchive::new()
            .with_entry(VERSION_ENTRY, version.to_le_bytes().to_vec())
            .with_entry(INTERNAL_STRUCTURES_ENTRY, blob())
            .with_entry(EE_MEMORY_ENTRY, vec![0u8; 0x2000])
    }

    #[test]
    fn version_floor() {
        assert!(check_version(0x8b43_0000).is_ok());
        assert!(check_version(0x9a0d_0000).is_ok());
        assert_eq!(
            check_version(0x8b42_ffff).err().unwrap().1,
            ErrorKind::VersionMismatch
        );
    }

    #[test]
    fn short_version_entry() {
        assert_eq!(
            parse_version(&[0x43, 0x8b]).err().unwrap().1,
            ErrorKind::InvalidVersion
        );
        assert_eq!(
            parse_version(&[0, 0, 0x43, 0x8b, 0xff]).unwrap(),
            0x8b43_0000
        );
    }

    #[test]
    fn parse_without_thread_table() {
        let state = SavestateReader::new(archive(0x8b43_0000)).parse().unwrap();
        assert_eq!(state.version, 0x8b43_0000);
        assert_eq!(state.registers.pc, 0x0010_0008);
        assert_eq!(state.running_thread, None);
        assert!(state.threads.is_empty());
        assert_eq!(state.primary_thread_id(), 0);
        assert_eq!(state.memory.len(), 0x2000);
    }

    #[test]
    fn old_version() {
        let err = SavestateReader::new(archive(0x8b42_0000))
            .parse()
            .err()
            .unwrap();
        assert_eq!(err.1, ErrorKind::VersionMismatch);
    }

    #[test]
    fn missing_entries() {
        for entry in [VERSION_ENTRY, INTERNAL_STRUCTURES_ENTRY, EE_MEMORY_ENTRY].iter() {
            let mut archive = archive(0x8b43_0000);
            archive.remove(entry);
            let err = SavestateReader::new(archive).parse().err().unwrap();
            assert_eq!(err, Error(ErrorOrigin::Savestate, ErrorKind::EntryNotFound));
        }
    }

    #[test]
    fn bios_split() {
        let state = SavestateReader::new(archive(0x8b43_0000))
            .bios_size(0x1000)
            .parse()
            .unwrap();
        assert_eq!(state.memory.bios().len(), 0x1000);
        assert_eq!(state.memory.user_ram().len(), 0x1000);
    }
}
