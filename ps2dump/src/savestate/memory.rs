/*!
The flat EE memory image stored in `eeMemory.bin`.
*/

use std::fmt;

use dataview::{DataView, Pod};

use crate::error::{Error, ErrorKind, ErrorOrigin, Result};
use crate::types::{from_le, size, ByteSwap};

/// Mask turning a kernel segment address (kseg0/kseg1) into an offset into physical memory.
pub const EE_PHYS_MASK: u32 = 0x1fff_ffff;

/// Size of the low memory region reserved for the kernel.
pub const BIOS_SIZE: usize = size::mb(1);

/// A contiguous piece of the memory image and the address it is mapped at.
#[derive(Copy, Clone)]
pub struct MemorySegment<'a> {
    pub address: u32,
    pub data: &'a [u8],
}

impl fmt::Debug for MemorySegment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MemorySegment")
            .field("address", &format_args!("{:#x}", self.address))
            .field("len", &format_args!("{:#x}", self.data.len()))
            .finish()
    }
}

/// The EE RAM contents, split into the kernel region and user RAM.
#[derive(Clone, PartialEq, Eq)]
pub struct MemoryImage {
    bytes: Vec<u8>,
    split: usize,
}

impl fmt::Debug for MemoryImage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("MemoryImage")
            .field("len", &format_args!("{:#x}", self.bytes.len()))
            .field("split", &format_args!("{:#x}", self.split))
            .finish()
    }
}

impl MemoryImage {
    /// Wraps `bytes` using the default 1 MiB kernel region.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self::with_split(bytes, BIOS_SIZE)
    }

    /// Wraps `bytes` with a custom kernel region size.
    pub fn with_split(bytes: Vec<u8>, split: usize) -> Self {
        Self { bytes, split }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the kernel region starting at address 0.
    ///
    /// When the image is smaller than the split point the whole image is returned.
    pub fn bios(&self) -> &[u8] {
        &self.bytes[..self.split.min(self.bytes.len())]
    }

    /// Returns user RAM, everything after the kernel region.
    pub fn user_ram(&self) -> &[u8] {
        &self.bytes[self.split.min(self.bytes.len())..]
    }

    /// Returns both regions with the address they are mapped at.
    pub fn segments(&self) -> [MemorySegment<'_>; 2] {
        [
            MemorySegment {
                address: 0,
                data: self.bios(),
            },
            MemorySegment {
                address: self.split as u32,
                data: self.user_ram(),
            },
        ]
    }

    /// Returns `len` bytes at the EE address `addr`.
    pub fn slice(&self, addr: u32, len: usize) -> Result<&[u8]> {
        let start = (addr & EE_PHYS_MASK) as usize;
        start
            .checked_add(len)
            .and_then(|end| self.bytes.get(start..end))
            .ok_or_else(|| {
                Error(ErrorOrigin::MemoryImage, ErrorKind::OutOfMemoryRange).log_error(format!(
                    "{:#x} bytes at {:#010x} (image is {:#x} bytes)",
                    len,
                    addr,
                    self.bytes.len()
                ))
            })
    }

    /// Reads a little endian record at the EE address `addr`.
    pub fn read<T: Pod + ByteSwap>(&self, addr: u32) -> Result<T> {
        let data = self.slice(addr, std::mem::size_of::<T>())?;
        DataView::from(data)
            .try_read::<T>(0)
            .map(from_le)
            .ok_or(Error(ErrorOrigin::MemoryImage, ErrorKind::OutOfMemoryRange))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> MemoryImage {
        let mut bytes = vec![0u8; 0x100];
        bytes[0x10..0x14].copy_from_slice(&0xdead_beef_u32.to_le_bytes());
        bytes[0x20..0x22].copy_from_slice(&(-8i16).to_le_bytes());
        MemoryImage::with_split(bytes, 0x80)
    }

    #[test]
    fn regions() {
        let mem = image();
        assert_eq!(mem.bios().len(), 0x80);
        assert_eq!(mem.user_ram().len(), 0x80);

        let segments = mem.segments();
        assert_eq!(segments[0].address, 0);
        assert_eq!(segments[1].address, 0x80);
        assert_eq!(segments[1].data.len(), 0x80);
    }

    #[test]
    fn short_image_has_empty_user_ram() {
        let mem = MemoryImage::new(vec![0u8; 0x1000]);
        assert_eq!(mem.bios().len(), 0x1000);
        assert!(mem.user_ram().is_empty());
        assert_eq!(mem.segments()[1].address, 0x10_0000);
    }

    #[test]
    fn typed_reads() {
        let mem = image();
        assert_eq!(mem.read::<u32>(0x10).unwrap(), 0xdead_beef);
        assert_eq!(mem.read::<i16>(0x20).unwrap(), -8);
        // kseg0 addresses resolve to the same physical memory
        assert_eq!(mem.read::<u32>(0x8000_0010).unwrap(), 0xdead_beef);
    }

    #[test]
    fn out_of_range() {
        let mem = image();
        assert_eq!(
            mem.read::<u32>(0xfe).err().unwrap(),
            Error(ErrorOrigin::MemoryImage, ErrorKind::OutOfMemoryRange)
        );
        assert!(mem.slice(0x100, 0).is_ok());
        assert!(mem.slice(0x100, 1).is_err());
    }
}
