//! [`PeImage`]: the page-aligned view over a sector-aligned PE executable.

use binrw::prelude::*;
use cim_dtyp::RegionOffset;

/// Bit 63 of `data_length` is reserved and must be cleared before use.
const DATA_LENGTH_RESERVED_BIT: u64 = 1 << 63;

/// One piecewise-constant mapping entry: at logical offset `>= file_offset`,
/// physical offset = logical + `delta`. Mappings are sorted by `file_offset`
/// and the first covers offset 0.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeImageMapping {
    pub file_offset: u32,
    pub delta: u32,
}

/// Descriptor that turns a sector-aligned on-disk PE file into a
/// page-aligned logical byte stream.
#[derive(BinRead, BinWrite, Debug, Clone, PartialEq, Eq)]
pub struct PeImage {
    /// Pointer to the backing (sector-aligned) PE file data.
    pub data_offset: RegionOffset,
    /// Total backing data length; bit 63 is reserved, use
    /// [`PeImage::data_length`] rather than this field directly.
    raw_data_length: u64,
    pub image_length: u32,
    pub mapping_count: u16,
    pub flags: u16,
    #[br(count = mapping_count)]
    pub mappings: Vec<PeImageMapping>,
}

impl PeImage {
    /// Total backing data length with the reserved top bit masked off.
    pub fn data_length(&self) -> u64 {
        self.raw_data_length & !DATA_LENGTH_RESERVED_BIT
    }

    /// Finds the mapping covering logical offset `o`: the largest entry
    /// with `file_offset <= o`. Mappings must be sorted and the first must
    /// cover offset 0; callers that have not validated this on a foreign
    /// image should not rely on a meaningful result.
    pub fn mapping_for(&self, logical_offset: u64) -> Option<(&PeImageMapping, Option<u64>)> {
        let idx = self
            .mappings
            .partition_point(|m| (m.file_offset as u64) <= logical_offset)
            .checked_sub(1)?;
        let next_boundary = self.mappings.get(idx + 1).map(|m| m.file_offset as u64);
        Some((&self.mappings[idx], next_boundary))
    }

    #[cfg(test)]
    pub fn new_for_test(
        data_offset: RegionOffset,
        data_length: u64,
        image_length: u32,
        mappings: Vec<PeImageMapping>,
    ) -> Self {
        PeImage {
            data_offset,
            raw_data_length: data_length,
            image_length,
            mapping_count: mappings.len() as u16,
            flags: 0,
            mappings,
        }
    }
}
