//! The file table: [`FileTableDirectoryEntry`] pages and the [`File`] record
//! itself.

use std::io::Cursor;

use binrw::prelude::*;
use cim_dtyp::{FileAttributes, FileTime, RegionOffset};

use crate::stream::Stream;

/// Number of `File` records per file-table page.
pub const FILES_PER_TABLE: u32 = 1024;

/// The current on-disk size of a [`File`] record. A page's declared
/// `entry_size` may be smaller (older writer) or larger (newer writer) than
/// this; see [`File::from_record_bytes`].
pub const FILE_RECORD_SIZE: usize = 96;

/// Identifies a file within an image's file-table directory. `0` is
/// reserved and never denotes a valid file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl FileId {
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Decomposes `self` into `(table, slot)`, or `None` if `self` is the
    /// reserved zero id.
    pub fn table_and_slot(self) -> Option<(u32, u32)> {
        if self.0 == 0 {
            return None;
        }
        let key = self.0 - 1;
        Some((key / FILES_PER_TABLE, key % FILES_PER_TABLE))
    }
}

/// One entry in the file-table directory: points at one page of up to
/// [`FILES_PER_TABLE`] [`File`] records.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileTableDirectoryEntry {
    pub offset: RegionOffset,
    pub count: u16,
    pub entry_size: u16,
    #[br(temp)]
    #[bw(calc = 0)]
    _reserved: u32,
}

/// A decoded file record.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq)]
pub struct File {
    pub attributes: FileAttributes,
    pub ea_length: u16,
    pub reparse_tag: u32,
    pub creation_time: FileTime,
    pub last_write_time: FileTime,
    pub change_time: FileTime,
    pub last_access_time: FileTime,
    pub default_stream: Stream,
    pub sd_offset: RegionOffset,
    pub ea_offset: RegionOffset,
    pub reparse_offset: RegionOffset,
    pub stream_table_offset: RegionOffset,
    pub parent_file_id: u32,
    pub base_region_index: u16,
    #[br(temp)]
    #[bw(calc = 0)]
    _reserved: u16,
}

impl File {
    /// Decodes a `File` record from `raw`, which may be shorter than
    /// [`FILE_RECORD_SIZE`] (older writer; trailing fields decode as zero)
    /// or longer (newer writer; trailing bytes are ignored).
    pub fn from_record_bytes(raw: &[u8]) -> BinResult<Self> {
        let mut fixed = [0u8; FILE_RECORD_SIZE];
        let n = raw.len().min(FILE_RECORD_SIZE);
        fixed[..n].copy_from_slice(&raw[..n]);
        File::read_le(&mut Cursor::new(fixed))
    }

    pub fn parent_file_id(&self) -> FileId {
        FileId(self.parent_file_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamType;

    fn sample_bytes() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0u16.to_le_bytes()); // attributes
        buf.extend_from_slice(&0u16.to_le_bytes()); // ea_length
        buf.extend_from_slice(&0u32.to_le_bytes()); // reparse_tag
        for _ in 0..4 {
            buf.extend_from_slice(&0u64.to_le_bytes()); // timestamps
        }
        // default_stream: RegionOffset + packed word
        buf.extend_from_slice(&0u64.to_le_bytes());
        buf.extend_from_slice(&0u64.to_le_bytes());
        for _ in 0..4 {
            buf.extend_from_slice(&0u64.to_le_bytes()); // sd/ea/reparse/stream_table offsets
        }
        buf.extend_from_slice(&7u32.to_le_bytes()); // parent_file_id
        buf.extend_from_slice(&0u16.to_le_bytes()); // base_region_index
        buf.extend_from_slice(&0u16.to_le_bytes()); // reserved
        buf
    }

    #[test]
    fn decodes_full_size_record() {
        let bytes = sample_bytes();
        assert_eq!(bytes.len(), FILE_RECORD_SIZE);
        let file = File::from_record_bytes(&bytes).unwrap();
        assert_eq!(file.parent_file_id(), FileId(7));
        assert_eq!(file.default_stream.stream_type(), StreamType::Data);
    }

    #[test]
    fn short_record_zero_extends() {
        let bytes = sample_bytes();
        let short = &bytes[..64]; // advertises entry_size=64, smaller than 96
        let file = File::from_record_bytes(short).unwrap();
        assert_eq!(file.stream_table_offset, RegionOffset::NULL);
        assert_eq!(file.parent_file_id(), FileId(0));
    }

    #[test]
    fn long_record_is_truncated() {
        let mut bytes = sample_bytes();
        bytes.extend_from_slice(&[0xAA; 32]); // newer, larger record
        let file = File::from_record_bytes(&bytes).unwrap();
        assert_eq!(file.parent_file_id(), FileId(7));
    }

    #[test]
    fn file_id_decomposition() {
        let id = FileId(1025);
        assert_eq!(id.table_and_slot(), Some((1, 0)));
        assert_eq!(FileId(0).table_and_slot(), None);
    }
}
