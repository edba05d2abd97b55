use dataview::Pod;
use goblin::elf::header::{
    EI_CLASS, EI_DATA, EI_VERSION, ELFCLASS32, ELFDATA2LSB, ELFMAG, ET_CORE, EV_CURRENT, SELFMAG,
    SIZEOF_IDENT,
};

/// Size of the ELF32 file header as recorded in `e_ehsize`.
pub const EHDR_SIZE: u16 = 52;

/// Size of the file header as written, the ELF32 header zero padded.
pub const EHDR_PADDED_SIZE: usize = 64;

/// Size of a single ELF32 program header.
pub const PHDR_SIZE: usize = 32;

/// ELF32 file header, followed by padding up to the program header table.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod)]
pub struct FileHeader32 {
    pub e_ident: [u8; SIZEOF_IDENT], // 0x00
    pub e_type: u16,                 // 0x10
    pub e_machine: u16,              // 0x12
    pub e_version: u32,              // 0x14
    pub e_entry: u32,                // 0x18
    pub e_phoff: u32,                // 0x1c
    pub e_shoff: u32,                // 0x20
    pub e_flags: u32,                // 0x24
    pub e_ehsize: u16,               // 0x28
    pub e_phentsize: u16,            // 0x2a
    pub e_phnum: u16,                // 0x2c
    pub e_shentsize: u16,            // 0x2e
    pub e_shnum: u16,                // 0x30
    pub e_shstrndx: u16,             // 0x32
    pub reserved: [u8; 12],          // 0x34
} // size: 0x40

crate::impl_byte_swap!(FileHeader32 {
    e_type,
    e_machine,
    e_version,
    e_entry,
    e_phoff,
    e_shoff,
    e_flags,
    e_ehsize,
    e_phentsize,
    e_phnum,
    e_shentsize,
    e_shnum,
    e_shstrndx,
});

impl FileHeader32 {
    /// Creates the header of a little endian 32 bit core file without section headers.
    pub fn core(machine: u16, flags: u32, entry: u32, phnum: u16) -> Self {
        let mut e_ident = [0u8; SIZEOF_IDENT];
        e_ident[..SELFMAG].copy_from_slice(ELFMAG);
        e_ident[EI_CLASS] = ELFCLASS32;
        e_ident[EI_DATA] = ELFDATA2LSB;
        e_ident[EI_VERSION] = EV_CURRENT;

        Self {
            e_ident,
            e_type: ET_CORE,
            e_machine: machine,
            e_version: EV_CURRENT as u32,
            e_entry: entry,
            e_phoff: EHDR_PADDED_SIZE as u32,
            e_shoff: 0,
            e_flags: flags,
            e_ehsize: EHDR_SIZE,
            e_phentsize: PHDR_SIZE as u16,
            e_phnum: phnum,
            e_shentsize: 0,
            e_shnum: 0,
            e_shstrndx: 0,
            reserved: [0u8; 12],
        }
    }
}

/// ELF32 program header.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod)]
pub struct ProgramHeader32 {
    pub p_type: u32,   // 0x00
    pub p_offset: u32, // 0x04
    pub p_vaddr: u32,  // 0x08
    pub p_paddr: u32,  // 0x0c
    pub p_filesz: u32, // 0x10
    pub p_memsz: u32,  // 0x14
    pub p_flags: u32,  // 0x18
    pub p_align: u32,  // 0x1c
} // size: 0x20

crate::impl_byte_swap!(ProgramHeader32 {
    p_type,
    p_offset,
    p_vaddr,
    p_paddr,
    p_filesz,
    p_memsz,
    p_flags,
    p_align,
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    fn offset_of<T, F>(base: &T, field: &F) -> usize {
        field as *const _ as usize - base as *const _ as usize
    }

    #[test]
    fn test_struct_sizes() {
        assert_eq!(size_of::<FileHeader32>(), EHDR_PADDED_SIZE);
        assert_eq!(size_of::<ProgramHeader32>(), PHDR_SIZE);
    }

    #[test]
    fn test_struct_members() {
        let header = FileHeader32::core(8, 0, 0, 1);
        assert_eq!(offset_of(&header, &header.e_type), 0x10);
        assert_eq!(offset_of(&header, &header.e_entry), 0x18);
        assert_eq!(offset_of(&header, &header.e_flags), 0x24);
        assert_eq!(offset_of(&header, &header.e_phnum), 0x2c);
        assert_eq!(offset_of(&header, &header.e_shstrndx), 0x32);
        assert_eq!(offset_of(&header, &header.reserved), EHDR_SIZE as usize);

        let phdr: ProgramHeader32 = dataview::zeroed();
        assert_eq!(offset_of(&phdr, &phdr.p_filesz), 0x10);
        assert_eq!(offset_of(&phdr, &phdr.p_align), 0x1c);
    }

    #[test]
    fn test_core_header() {
        let header = FileHeader32::core(8, 0x2092_0021, 0x0010_0008, 3);
        assert_eq!(&header.e_ident[..4], b"\x7fELF");
        assert_eq!(header.e_ident[4], 1);
        assert_eq!(header.e_ident[5], 1);
        assert_eq!(header.e_ident[6], 1);
        assert_eq!(header.e_type, 4);
        assert_eq!(header.e_version, 1);
        assert_eq!(header.e_phoff, 64);
        assert_eq!(header.e_phentsize, 32);
        assert_eq!(header.e_shoff, 0);
    }
}
