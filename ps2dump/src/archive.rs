/*!
Access to the savestate container.

A savestate is a zip archive of named entries. The reader only ever needs to list the
entry names and read a whole entry into memory, which is what [`SavestateArchive`]
exposes. [`ZipSavestate`] is the on-disk implementation, [`MemoryArchive`] holds the
entries in memory.
*/

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use log::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{Error, ErrorKind, ErrorOrigin, Result};

/// A container of named entries.
pub trait SavestateArchive {
    /// Returns the names of all entries in the container.
    fn entry_names(&self) -> Vec<String>;

    /// Reads the entire contents of the entry `name`.
    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>>;

    /// Returns true if an entry called `name` exists.
    fn contains_entry(&self, name: &str) -> bool {
        self.entry_names().iter().any(|n| n == name)
    }
}

impl<T: SavestateArchive + ?Sized> SavestateArchive for &mut T {
    fn entry_names(&self) -> Vec<String> {
        (**self).entry_names()
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        (**self).read_entry(name)
    }

    fn contains_entry(&self, name: &str) -> bool {
        (**self).contains_entry(name)
    }
}

/// Zip backed savestate container.
pub struct ZipSavestate<R> {
    archive: ZipArchive<R>,
}

impl ZipSavestate<File> {
    /// Opens the zip archive at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|err| {
            Error(ErrorOrigin::Archive, ErrorKind::UnableToOpenFile).log_error(err)
        })?;
        debug!("opened savestate {}", path.as_ref().display());
        Self::from_reader(file)
    }
}

impl<R: Read + Seek> ZipSavestate<R> {
    /// Wraps any seekable reader containing a zip archive.
    pub fn from_reader(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader)
            .map_err(|err| Error(ErrorOrigin::Archive, ErrorKind::InvalidArchive).log_error(err))?;
        Ok(Self { archive })
    }
}

impl<R: Read + Seek> SavestateArchive for ZipSavestate<R> {
    fn entry_names(&self) -> Vec<String> {
        self.archive.file_names().map(String::from).collect()
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => {
                return Err(Error(ErrorOrigin::Archive, ErrorKind::EntryNotFound).log_error(name))
            }
            Err(err) => {
                return Err(Error(ErrorOrigin::Archive, ErrorKind::InvalidArchive).log_error(err))
            }
        };

        let mut buf = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut buf).map_err(|err| {
            Error(ErrorOrigin::Archive, ErrorKind::UnableToReadFile).log_error(err)
        })?;
        debug!("read archive entry '{}' ({:#x} bytes)", name, buf.len());

        Ok(buf)
    }
}

/// In-memory savestate container.
///
/// # Examples
///
/// ```
/// use ps2dump::archive::{MemoryArchive, SavestateArchive};
///
/// let mut archive = MemoryArchive::new().with_entry("eeMemory.bin", vec![0; 16]);
/// assert!(archive.contains_entry("eeMemory.bin"));
/// assert_eq!(archive.read_entry("eeMemory.bin").unwrap().len(), 16);
/// ```
#[derive(Clone, Debug, Default)]
pub struct MemoryArchive {
    entries: BTreeMap<String, Vec<u8>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry and returns the archive.
    pub fn with_entry<S: Into<String>>(mut self, name: S, data: Vec<u8>) -> Self {
        self.insert(name, data);
        self
    }

    /// Adds or replaces an entry.
    pub fn insert<S: Into<String>>(&mut self, name: S, data: Vec<u8>) {
        self.entries.insert(name.into(), data);
    }

    /// Removes an entry, returning its contents if it existed.
    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.entries.remove(name)
    }
}

impl SavestateArchive for MemoryArchive {
    fn entry_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    fn read_entry(&mut self, name: &str) -> Result<Vec<u8>> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| Error(ErrorOrigin::Archive, ErrorKind::EntryNotFound).log_error(name))
    }

    fn contains_entry(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}
