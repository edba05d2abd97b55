/*!
Layout of the `PCSX2 Internal Structures.dat` blob.

The blob is a sequence of zero padded ASCII markers, each followed by fixed size fields.
The positions of the fields are implied by their order, so the whole layout is described
by [`INTERNAL_STRUCTURES`] and executed by [`decode`]. Markers are verified byte for
byte: a mismatch means the savestate revision has a different layout.
*/

use log::debug;

use super::cursor::{le_u32, le_u64, BlobCursor};
use super::regs::{RegisterSet, CP0_COUNT, GPR_COUNT};
use crate::error::{Error, ErrorKind, ErrorOrigin, Result};

/// Width of every section marker.
pub const MARKER_WIDTH: usize = 32;

/// Width of a 128-bit register slot.
pub const SLOT_128: usize = 16;

/// Decodes slot `index` of a field from `data` into the register set.
pub type DecodeFn = fn(&mut RegisterSet, usize, &[u8]);

/// A single step of the blob layout.
#[derive(Copy, Clone)]
pub enum Step {
    /// ASCII name zero padded to `width` bytes.
    Marker { name: &'static str, width: usize },
    /// Bytes consumed without interpretation.
    Skip { what: &'static str, len: usize },
    /// `count` consecutive slots of `width` bytes.
    Field {
        name: &'static str,
        width: usize,
        count: usize,
        decode: DecodeFn,
    },
}

impl Step {
    /// Returns the number of bytes this step consumes.
    pub const fn len(&self) -> usize {
        match self {
            Step::Marker { width, .. } => *width,
            Step::Skip { len, .. } => *len,
            Step::Field { width, count, .. } => *width * *count,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Step::Marker { name, .. } => *name,
            Step::Skip { what, .. } => *what,
            Step::Field { name, .. } => *name,
        }
    }
}

fn decode_gpr(regs: &mut RegisterSet, index: usize, data: &[u8]) {
    regs.gpr[index] = le_u64(data);
}

fn decode_hi(regs: &mut RegisterSet, _: usize, data: &[u8]) {
    regs.hi = le_u64(data);
}

fn decode_lo(regs: &mut RegisterSet, _: usize, data: &[u8]) {
    regs.lo = le_u64(data);
}

fn decode_cp0(regs: &mut RegisterSet, index: usize, data: &[u8]) {
    regs.cp0[index] = le_u32(data);
}

fn decode_sa(regs: &mut RegisterSet, _: usize, data: &[u8]) {
    regs.sa = le_u32(data);
}

fn decode_isds(regs: &mut RegisterSet, _: usize, data: &[u8]) {
    regs.isds = le_u32(data);
}

fn decode_pc(regs: &mut RegisterSet, _: usize, data: &[u8]) {
    regs.pc = le_u32(data);
}

/// Everything from the start of the blob up to and including the EE register block.
pub const INTERNAL_STRUCTURES: &[Step] = &[
    Step::Marker {
        name: "BIOS",
        width: MARKER_WIDTH,
    },
    Step::Skip {
        what: "bios checksum and description",
        len: 4 + 256,
    },
    Step::Marker {
        name: "cpuRegs",
        width: MARKER_WIDTH,
    },
    Step::Field {
        name: "gpr",
        width: SLOT_128,
        count: GPR_COUNT,
        decode: decode_gpr,
    },
    Step::Field {
        name: "hi",
        width: SLOT_128,
        count: 1,
        decode: decode_hi,
    },
    Step::Field {
        name: "lo",
        width: SLOT_128,
        count: 1,
        decode: decode_lo,
    },
    Step::Field {
        name: "cp0",
        width: 4,
        count: CP0_COUNT,
        decode: decode_cp0,
    },
    Step::Field {
        name: "sa",
        width: 4,
        count: 1,
        decode: decode_sa,
    },
    Step::Field {
        name: "isds",
        width: 4,
        count: 1,
        decode: decode_isds,
    },
    Step::Field {
        name: "pc",
        width: 4,
        count: 1,
        decode: decode_pc,
    },
];

/// Returns the total number of bytes consumed by `schema`.
pub fn schema_len(schema: &[Step]) -> usize {
    schema.iter().map(Step::len).sum()
}

/// Returns the zero padded marker bytes for `name`.
pub fn marker_bytes(name: &str, width: usize) -> Vec<u8> {
    let mut marker = name.as_bytes().to_vec();
    marker.resize(width, 0);
    marker
}

/// Runs `schema` against the cursor and returns the decoded registers.
pub fn decode(schema: &[Step], cursor: &mut BlobCursor) -> Result<RegisterSet> {
    let mut regs = RegisterSet::default();

    for step in schema.iter() {
        debug!(
            "{:#06x}: {} ({:#x} bytes)",
            cursor.offset(),
            step.name(),
            step.len()
        );

        match *step {
            Step::Marker { name, width } => {
                if name.len() > width {
                    return Err(Error(ErrorOrigin::Savestate, ErrorKind::Configuration)
                        .log_error(format!("marker {:?} wider than {} bytes", name, width)));
                }
                cursor.expect(&marker_bytes(name, width))?;
            }
            Step::Skip { len, .. } => cursor.skip(len)?,
            Step::Field {
                width,
                count,
                decode,
                ..
            } => {
                for index in 0..count {
                    let data = cursor
                        .take(width)
                        .map_err(|err| Error(ErrorOrigin::CpuRegisters, err.1))?;
                    decode(&mut regs, index, data);
                }
            }
        }
    }

    Ok(regs)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a blob matching `INTERNAL_STRUCTURES` with recognizable register values.
    fn sample_blob() -> Vec<u8> {
        let mut blob = marker_bytes("BIOS", MARKER_WIDTH);
        blob.extend_from_slice(&[0xaa; 4 + 256]);
        blob.extend(marker_bytes("cpuRegs", MARKER_WIDTH));
        for i in 0..32u64 {
            blob.extend_from_slice(&(0x1000 + i).to_le_bytes());
            blob.extend_from_slice(&0xdead_beef_u64.to_le_bytes());
        }
        blob.extend_from_slice(&0x1111_u64.to_le_bytes());
        blob.extend_from_slice(&[0xff; 8]);
        blob.extend_from_slice(&0x2222_u64.to_le_bytes());
        blob.extend_from_slice(&[0xff; 8]);
        for i in 0..32u32 {
            blob.extend_from_slice(&(0x100 + i).to_le_bytes());
        }
        blob.extend_from_slice(&0x33_u32.to_le_bytes());
        blob.extend_from_slice(&0x44_u32.to_le_bytes());
        blob.extend_from_slice(&0x0010_0008_u32.to_le_bytes());
        blob
    }

    #[test]
    fn schema_size() {
        assert_eq!(
            schema_len(INTERNAL_STRUCTURES),
            32 + 260 + 32 + 32 * 16 + 16 + 16 + 32 * 4 + 4 + 4 + 4
        );
        assert_eq!(schema_len(INTERNAL_STRUCTURES), sample_blob().len());
    }

    #[test]
    fn schema_markers() {
        let markers = INTERNAL_STRUCTURES
            .iter()
            .filter_map(|s| match s {
                Step::Marker { name, width } => Some((*name, *width)),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(markers, vec![("BIOS", 32), ("cpuRegs", 32)]);
    }

    #[test]
    fn decode_registers() {
        let blob = sample_blob();
        let mut cursor = BlobCursor::new(&blob);
        let regs = decode(INTERNAL_STRUCTURES, &mut cursor).unwrap();

        assert_eq!(cursor.remaining(), 0);
        assert_eq!(regs.gpr[0], 0x1000);
        assert_eq!(regs.gpr[31], 0x101f);
        assert_eq!(regs.hi, 0x1111);
        assert_eq!(regs.lo, 0x2222);
        assert_eq!(regs.cp0[0], 0x100);
        assert_eq!(regs.cp0[12], 0x10c);
        assert_eq!(regs.sa, 0x33);
        assert_eq!(regs.isds, 0x44);
        assert_eq!(regs.pc, 0x0010_0008);
    }

    #[test]
    fn decode_leaves_trailing_data() {
        let mut blob = sample_blob();
        blob.extend_from_slice(b"VU0 regs");
        let mut cursor = BlobCursor::new(&blob);
        decode(INTERNAL_STRUCTURES, &mut cursor).unwrap();
        assert_eq!(cursor.remaining(), 8);
    }

    #[test]
    fn every_marker_byte_is_checked() {
        let blob = sample_blob();
        let cpu_regs_at = 32 + 260;
        for offset in (0..32).chain(cpu_regs_at..cpu_regs_at + 32) {
            let mut broken = blob.clone();
            broken[offset] ^= 0x01;
            let mut cursor = BlobCursor::new(&broken);
            let err = decode(INTERNAL_STRUCTURES, &mut cursor).err().unwrap();
            assert_eq!(
                err,
                Error(ErrorOrigin::Savestate, ErrorKind::MarkerMismatch),
                "mutation at {:#x} was not detected",
                offset
            );
        }
    }

    #[test]
    fn truncated_registers() {
        let blob = sample_blob();
        let truncated = &blob[..blob.len() - 2];
        let mut cursor = BlobCursor::new(truncated);
        let err = decode(INTERNAL_STRUCTURES, &mut cursor).err().unwrap();
        assert_eq!(
            err,
            Error(ErrorOrigin::CpuRegisters, ErrorKind::OutOfBounds)
        );
    }
}
