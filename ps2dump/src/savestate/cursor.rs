/*!
Forward-only cursor over the internal structures blob.

The blob has no length prefixes: every field sits at a position implied by the fields
before it. The cursor only moves forward and reading past the end is an error.
*/

use log::trace;

use crate::error::{Error, ErrorKind, ErrorOrigin, Result};

pub struct BlobCursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> BlobCursor<'a> {
    /// Creates a new cursor positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Returns the current position of the cursor.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the number of bytes left after the current position.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Consumes `len` bytes and returns them.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                Error(ErrorOrigin::Savestate, ErrorKind::OutOfBounds).log_error(format!(
                    "reading {:#x} bytes at {:#x} past the end of the blob ({:#x} bytes)",
                    len,
                    self.offset,
                    self.data.len()
                ))
            })?;

        let slice = &self.data[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    /// Consumes `len` bytes without looking at them.
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(|_| ())
    }

    /// Consumes `marker.len()` bytes and verifies they equal `marker`.
    pub fn expect(&mut self, marker: &[u8]) -> Result<()> {
        let offset = self.offset;
        let data = self.take(marker.len())?;
        if data != marker {
            return Err(
                Error(ErrorOrigin::Savestate, ErrorKind::MarkerMismatch).log_error(format!(
                    "expected {:?} at {:#x}, found {:?}",
                    String::from_utf8_lossy(marker),
                    offset,
                    String::from_utf8_lossy(data)
                )),
            );
        }
        trace!(
            "marker {:?} verified at {:#x}",
            String::from_utf8_lossy(marker),
            offset
        );
        Ok(())
    }

    /// Consumes a little endian u32.
    pub fn read_u32(&mut self) -> Result<u32> {
        self.take(4).map(le_u32)
    }
}

/// Decodes the first 4 bytes of `buf` as little endian.
///
/// # Panics
///
/// Panics if `buf` is shorter than 4 bytes.
pub(crate) fn le_u32(buf: &[u8]) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[..4]);
    u32::from_le_bytes(raw)
}

/// Decodes the first 8 bytes of `buf` as little endian.
///
/// # Panics
///
/// Panics if `buf` is shorter than 8 bytes.
pub(crate) fn le_u64(buf: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[..8]);
    u64::from_le_bytes(raw)
}
