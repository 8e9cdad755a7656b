//! Bounds-checked decoding of the objects a `RegionOffset` can point to.

use std::io::Cursor;

use binrw::BinRead;
use cim_dtyp::RegionOffset;

use crate::error::{Error, FormatError};
use crate::region::Region;

/// Decodes fixed-size records and length-prefixed buffers out of an image's
/// region files, rejecting a null pointer and any read that would run past
/// the end of the region it targets.
#[derive(Clone, Copy)]
pub struct ObjectDecoder<'a> {
    regions: &'a [Region],
}

impl<'a> ObjectDecoder<'a> {
    pub fn new(regions: &'a [Region]) -> Self {
        ObjectDecoder { regions }
    }

    fn region(&self, index: u16) -> Result<&Region, Error> {
        self.regions
            .get(index as usize)
            .ok_or(Error::Format(FormatError::BadRegionOffset {
                region_index: index,
                byte_offset: 0,
            }))
    }

    /// Reads `len` raw bytes at `offset`.
    pub fn read_bytes(&self, offset: RegionOffset, len: usize) -> Result<Vec<u8>, Error> {
        if offset.is_null() {
            return Err(Error::Format(FormatError::BadRegionOffset {
                region_index: 0,
                byte_offset: 0,
            }));
        }
        let region = self.region(offset.region_index())?;
        let start = offset.byte_offset();
        let end = start.checked_add(len as u64).ok_or(Error::Format(
            FormatError::BadRegionOffset {
                region_index: offset.region_index(),
                byte_offset: start,
            },
        ))?;
        if end > region.length {
            return Err(Error::Format(FormatError::BadRegionOffset {
                region_index: offset.region_index(),
                byte_offset: start,
            }));
        }
        let mut buf = vec![0u8; len];
        region.read_at(start, &mut buf)?;
        Ok(buf)
    }

    /// Decodes a fixed-size record of `size` bytes at `offset` (the header
    /// type whose layout is known statically by the caller).
    pub fn decode_fixed<T>(&self, offset: RegionOffset, size: usize) -> Result<T, Error>
    where
        T: BinRead,
        for<'b> T::Args<'b>: Default,
    {
        let bytes = self.read_bytes(offset, size)?;
        T::read_le(&mut Cursor::new(bytes)).map_err(|_| Error::Format(FormatError::BadName))
    }

    /// Reads a `u32`-length-prefixed buffer: a length prefix followed by
    /// that many bytes (used for security descriptors, extended attributes,
    /// and reparse buffers).
    pub fn decode_counted_u32(&self, offset: RegionOffset) -> Result<Vec<u8>, Error> {
        self.decode_counted(offset, 4, |b| u32::from_le_bytes(b.try_into().unwrap()) as usize)
    }

    fn decode_counted(
        &self,
        offset: RegionOffset,
        prefix_len: usize,
        parse_len: impl Fn(&[u8]) -> usize,
    ) -> Result<Vec<u8>, Error> {
        let prefix = self.read_bytes(offset, prefix_len)?;
        let payload_len = parse_len(&prefix);
        let payload_offset =
            RegionOffset::new(offset.region_index(), offset.byte_offset() + prefix_len as u64);
        self.read_bytes(payload_offset, payload_len)
    }

    /// Reads a link table's bytes: a `u32 total_size` header followed by
    /// `total_size` bytes total, the header itself included.
    pub fn decode_link_table_bytes(&self, offset: RegionOffset) -> Result<Vec<u8>, Error> {
        let header = self.read_bytes(offset, 4)?;
        let total_size = u32::from_le_bytes(header.try_into().unwrap()) as usize;
        self.read_bytes(offset, total_size)
    }
}
