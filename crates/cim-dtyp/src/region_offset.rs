//! [`RegionOffset`]: the tagged pointer used throughout a CIM image.

use binrw::{Endian, prelude::*};
use std::io::{Read, Seek, Write};

/// A 64-bit tagged pointer into a CIM image's region set.
///
/// The high 16 bits select a region by index; the low 48 bits are a byte
/// offset within that region's file. The all-zero value is reserved to mean
/// "null / absent" and is never a valid pointer, since region 0 offset 0 is
/// always inside a region's header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RegionOffset(u64);

const OFFSET_MASK: u64 = 0x0000_FFFF_FFFF_FFFF;

impl RegionOffset {
    /// The null / absent pointer.
    pub const NULL: RegionOffset = RegionOffset(0);

    /// Builds a `RegionOffset` from a region index and a byte offset within it.
    ///
    /// Panics if `offset` does not fit in 48 bits; callers construct these
    /// only from values already known to come from a 48-bit field.
    pub fn new(region_index: u16, offset: u64) -> Self {
        assert!(offset <= OFFSET_MASK, "region offset out of range");
        RegionOffset(((region_index as u64) << 48) | offset)
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn region_index(self) -> u16 {
        (self.0 >> 48) as u16
    }

    pub fn byte_offset(self) -> u64 {
        self.0 & OFFSET_MASK
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl BinRead for RegionOffset {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _: Self::Args<'_>,
    ) -> BinResult<Self> {
        let value = u64::read_options(reader, endian, ())?;
        Ok(RegionOffset(value))
    }
}

impl BinWrite for RegionOffset {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        _: Self::Args<'_>,
    ) -> BinResult<()> {
        self.0.write_options(writer, endian, ())
    }
}
