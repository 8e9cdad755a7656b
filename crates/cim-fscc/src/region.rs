//! Region and region-set records.

use binrw::prelude::*;
use cim_dtyp::{CommonHeader, Guid};

/// The three kinds of region a CIM file can hold. The reader treats this
/// only as a sanity check — it may read any type through the object decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionType {
    /// Holds fixed-size records (file table pages, etc).
    Metadata,
    /// Large file payloads, 4096-byte aligned.
    AlignedData,
    /// Short payloads, 8-byte aligned.
    SmallData,
    Unknown(u8),
}

impl From<u8> for RegionType {
    fn from(value: u8) -> Self {
        match value {
            0 => RegionType::Metadata,
            1 => RegionType::AlignedData,
            2 => RegionType::SmallData,
            other => RegionType::Unknown(other),
        }
    }
}

/// Alignment (in bytes) required of offsets into a region of this type.
/// Metadata regions carry no alignment requirement beyond natural field
/// alignment.
impl RegionType {
    pub fn alignment(self) -> u64 {
        match self {
            RegionType::AlignedData => 4096,
            RegionType::SmallData => 8,
            RegionType::Metadata | RegionType::Unknown(_) => 1,
        }
    }
}

/// Header at the start of every region file.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionHeader {
    pub common: CommonHeader,
    pub index: u16,
    pub region_type: u8,
    #[br(temp)]
    #[bw(calc = 0)]
    _reserved0: u8,
    #[br(temp)]
    #[bw(calc = 0)]
    _reserved1: u32,
}

impl RegionHeader {
    pub fn region_type(&self) -> RegionType {
        RegionType::from(self.region_type)
    }
}

/// Identifies a set of region files belonging to one filesystem (either the
/// local set, or one of the inherited parent sets).
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionSet {
    pub id: Guid,
    pub count: u16,
    #[br(temp)]
    #[bw(calc = 0)]
    _reserved0: u16,
    #[br(temp)]
    #[bw(calc = 0)]
    _reserved1: u32,
}
