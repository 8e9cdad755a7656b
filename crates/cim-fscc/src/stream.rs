//! [`Stream`]: the 16-byte descriptor attached to every file.

use binrw::{Endian, prelude::*};
use cim_dtyp::RegionOffset;
use modular_bitfield::prelude::*;
use std::io::{Read, Seek, Write};

/// What a [`Stream`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    /// Ordinary byte content.
    Data,
    /// A directory's contents: the stream's data decodes as a [`crate::LinkTable`].
    LinkTable,
    /// A page-aligned view over a sector-aligned PE image: the stream's data
    /// decodes as a [`crate::PeImage`].
    PeImage,
    Unknown(u8),
}

impl From<u8> for StreamType {
    fn from(value: u8) -> Self {
        match value {
            0 => StreamType::Data,
            1 => StreamType::LinkTable,
            2 => StreamType::PeImage,
            other => StreamType::Unknown(other),
        }
    }
}

impl From<StreamType> for u8 {
    fn from(value: StreamType) -> Self {
        match value {
            StreamType::Data => 0,
            StreamType::LinkTable => 1,
            StreamType::PeImage => 2,
            StreamType::Unknown(v) => v,
        }
    }
}

/// The packed 64-bit word following a stream's data pointer: 48 bits of
/// size, 8 bits of type, a sparse flag, and 7 reserved bits.
#[bitfield(bits = 64)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StreamWord {
    size: B48,
    stream_type: B8,
    sparse: bool,
    #[skip]
    __: B7,
}

/// A file's default stream, or an entry in its alternate-stream table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stream {
    /// Pointer to the stream's data, or (for [`StreamType::PeImage`]) to its
    /// [`crate::PeImage`] descriptor.
    pub data_offset: RegionOffset,
    word: StreamWord,
}

impl Stream {
    pub fn size(&self) -> u64 {
        self.word.size()
    }

    pub fn stream_type(&self) -> StreamType {
        StreamType::from(self.word.stream_type())
    }

    pub fn is_sparse(&self) -> bool {
        self.word.sparse()
    }

    /// Builds a descriptor directly from its logical fields, bypassing the
    /// packed-word decode. Used by test fixtures in this workspace (no
    /// on-disk image produces a `Stream` any other way than via `BinRead`).
    pub fn new(data_offset: RegionOffset, size: u64, stream_type: StreamType, sparse: bool) -> Self {
        let word = StreamWord::new()
            .with_size(size)
            .with_stream_type(stream_type.into())
            .with_sparse(sparse);
        Stream { data_offset, word }
    }
}

impl BinRead for Stream {
    type Args<'a> = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        _: Self::Args<'_>,
    ) -> BinResult<Self> {
        let data_offset = RegionOffset::read_options(reader, endian, ())?;
        let raw = u64::read_options(reader, endian, ())?;
        let word = StreamWord::from_bytes(raw.to_le_bytes());
        Ok(Stream { data_offset, word })
    }
}

impl BinWrite for Stream {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        _: Self::Args<'_>,
    ) -> BinResult<()> {
        self.data_offset.write_options(writer, endian, ())?;
        let raw = u64::from_le_bytes(self.word.into_bytes());
        raw.write_options(writer, endian, ())
    }
}
