//! Filesystem header and root `Filesystem` record.

use binrw::prelude::*;
use cim_dtyp::{CommonHeader, RegionOffset};

use crate::region::RegionSet;

/// The top-level entry point of a CIM image: the `.cim` filesystem file's
/// header, naming the local region set, any inherited parent region sets,
/// and a pointer to the [`Filesystem`] record.
#[derive(BinRead, BinWrite, Debug, Clone, PartialEq, Eq)]
pub struct FilesystemHeader {
    pub common: CommonHeader,
    pub local_regions: RegionSet,
    pub filesystem_offset: RegionOffset,
    #[br(temp)]
    #[bw(calc = 0)]
    _reserved0: u32,
    #[br(temp)]
    #[bw(calc = 0)]
    _reserved1: u16,
    pub parent_count: u16,
    #[br(count = parent_count)]
    pub parents: Vec<RegionSet>,
}

/// The root `Filesystem` record pointed to by [`FilesystemHeader::filesystem_offset`].
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filesystem {
    pub upcase_offset: RegionOffset,
    pub file_table_directory_offset: RegionOffset,
    pub file_table_directory_length: u32,
    pub root_file_id: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use cim_dtyp::Guid;
    use std::io::Cursor;

    #[test]
    fn decodes_header_with_parents() {
        let mut bytes = Vec::new();
        // CommonHeader: 8 + 4 + 1 + 1 + 2 + 8 + 8 = 32 bytes
        bytes.extend_from_slice(&cim_dtyp::CIM_MAGIC);
        bytes.extend_from_slice(&32u32.to_le_bytes());
        bytes.push(0); // file_type = image
        bytes.push(0);
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u64.to_le_bytes());
        // local_regions: RegionSet 16+2+2+4=24
        bytes.extend_from_slice(&[0u8; 16]);
        bytes.extend_from_slice(&3u16.to_le_bytes()); // count
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        // filesystem_offset
        bytes.extend_from_slice(&0u64.to_le_bytes());
        // reserved u32, u16
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        // parent_count = 1
        bytes.extend_from_slice(&1u16.to_le_bytes());
        // one parent RegionSet
        bytes.extend_from_slice(&[1u8; 16]);
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());

        let header = FilesystemHeader::read(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(header.local_regions.count, 3);
        assert_eq!(header.parent_count, 1);
        assert_eq!(header.parents.len(), 1);
        assert_eq!(header.parents[0].count, 2);
        assert_eq!(header.parents[0].id, Guid::from_bytes([1u8; 16]));
    }
}
