//! [`FileAttributes`]: the flag bits carried by a CIM `File` record.

use binrw::{Endian, prelude::*};
use modular_bitfield::prelude::*;
use std::io::{Read, Seek, Write};

/// Attributes of a file or directory stored in a CIM image.
///
/// Unlike the full Windows `FILE_ATTRIBUTE_*` set, a CIM only carries the
/// subset the writer actually persists.
#[bitfield(bits = 16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileAttributes {
    pub read_only: bool,
    pub hidden: bool,
    pub system: bool,
    #[skip]
    __: bool,

    pub archive: bool,
    pub sparse: bool,
    #[skip]
    __: B10,
}

impl BinRead for FileAttributes {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _: Self::Args<'_>,
    ) -> BinResult<Self> {
        let raw = u16::read_options(reader, endian, ())?;
        Ok(FileAttributes::from_bytes(raw.to_le_bytes()))
    }
}

impl BinWrite for FileAttributes {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        _: Self::Args<'_>,
    ) -> BinResult<()> {
        let raw = u16::from_le_bytes(self.into_bytes());
        raw.write_options(writer, endian, ())
    }
}
