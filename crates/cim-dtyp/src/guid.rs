//! [`Guid`]: a Windows `GUID`, used to name a region set's sibling region files.

use binrw::prelude::*;
use std::fmt;

/// A 128-bit Windows GUID, stored in its native mixed-endian wire form:
/// the first three fields are little-endian, the last two are a plain
/// big-endian byte sequence.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Guid {
    data1: u32,
    data2: u16,
    data3: u16,
    data4: [u8; 8],
}

impl Guid {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Guid {
            data1: u32::from_le_bytes(bytes[0..4].try_into().unwrap()),
            data2: u16::from_le_bytes(bytes[4..6].try_into().unwrap()),
            data3: u16::from_le_bytes(bytes[6..8].try_into().unwrap()),
            data4: bytes[8..16].try_into().unwrap(),
        }
    }
}

/// Renders in the canonical hyphenated form, e.g.
/// `d7e5f102-4a3b-4c9e-9a1a-0c1e2f3a4b5c`, which is how region set IDs are
/// embedded in sibling file names (`region_<guid>_<i>`).
impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.data1,
            self.data2,
            self.data3,
            self.data4[0],
            self.data4[1],
            self.data4[2],
            self.data4[3],
            self.data4[4],
            self.data4[5],
            self.data4[6],
            self.data4[7],
        )
    }
}
