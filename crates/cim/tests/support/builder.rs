//! Assembles raw bytes for a minimal CIM image, directly from the §6 byte
//! layout, for this crate's integration tests. Not a writer implementation:
//! no public API outside `#[cfg(test)]`, and it only produces the handful of
//! shapes the fixture scenarios below need.

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use binrw::prelude::*;
use cim_dtyp::upcase::UPCASE_TABLE_LEN;
use cim_dtyp::{CIM_MAGIC, CommonHeader, FileAttributes, FileTime, Guid, RegionOffset, Version};
use cim_fscc::{
    File, FileTableDirectoryEntry, Filesystem, FilesystemHeader, LinkTableKind, RegionHeader,
    RegionSet, Stream, StreamType,
};

const REGION_HEADER_LEN: u64 = 40;
const FILE_RECORD_SIZE: usize = 96;

fn common_header(file_type: u8) -> CommonHeader {
    CommonHeader {
        magic: CIM_MAGIC,
        header_length: 32,
        file_type,
        version: Version { major: 2, minor: 0 },
    }
}

fn write_le<T>(value: &T) -> Vec<u8>
where
    T: BinWrite,
    for<'a> T::Args<'a>: Default,
{
    let mut buf = Vec::new();
    value.write_le(&mut Cursor::new(&mut buf)).unwrap();
    buf
}

/// A no-op timestamp; none of the fixture scenarios assert on `FileTime`
/// values, only that `stat()` can convert whatever is stored.
pub fn zero_time() -> FileTime {
    FileTime::from(0u64)
}

/// Appends data to a single in-memory region and hands back `RegionOffset`s
/// into it. Call [`RegionBuilder::finish`] to materialize it as a region file
/// behind `CommonHeader`/`RegionHeader`.
pub struct RegionBuilder {
    data: Vec<u8>,
}

impl RegionBuilder {
    pub fn new() -> Self {
        RegionBuilder { data: Vec::new() }
    }

    fn alloc(&mut self, bytes: &[u8]) -> RegionOffset {
        let offset = REGION_HEADER_LEN + self.data.len() as u64;
        self.data.extend_from_slice(bytes);
        RegionOffset::new(0, offset)
    }

    /// Allocates an identity-like upcase table: ASCII lowercase folds to
    /// uppercase, everything else is unchanged. Matches the table the unit
    /// tests elsewhere in this workspace use.
    pub fn alloc_upcase_table(&mut self) -> RegionOffset {
        let mut raw = vec![0u8; UPCASE_TABLE_LEN * 2];
        for cp in 0..UPCASE_TABLE_LEN {
            let folded = if (0x61..=0x7A).contains(&cp) {
                cp - 0x20
            } else {
                cp
            };
            let bytes = (folded as u16).to_le_bytes();
            raw[cp * 2] = bytes[0];
            raw[cp * 2 + 1] = bytes[1];
        }
        self.alloc(&raw)
    }

    pub fn alloc_bytes(&mut self, bytes: &[u8]) -> RegionOffset {
        self.alloc(bytes)
    }

    pub fn alloc_fixed<T>(&mut self, value: &T) -> RegionOffset
    where
        T: BinWrite,
        for<'a> T::Args<'a>: Default,
    {
        self.alloc(&write_le(value))
    }

    /// A `u32`-length-prefixed buffer, as used for SD/EA/reparse blobs.
    pub fn alloc_counted_u32(&mut self, payload: &[u8]) -> RegionOffset {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        buf.extend_from_slice(payload);
        self.alloc(&buf)
    }

    /// Builds and allocates a link table: `entries` is `(name, entry stride
    /// bytes)`, already in the order the caller wants stored (i.e. the
    /// caller is responsible for upcase-fold sort order in scenarios where
    /// that matters). Returns the table's offset and its total byte size,
    /// the latter needed by the caller to fill in the owning `Stream`'s
    /// `size` field.
    pub fn alloc_link_table(
        &mut self,
        kind: LinkTableKind,
        entries: &[(&str, Vec<u8>)],
    ) -> (RegionOffset, u64) {
        let stride = kind.entry_stride();
        let header_len = 8usize;
        let entries_len = entries.len() * stride;
        let name_offsets_len = entries.len() * 4;

        let mut name_pool = Vec::new();
        let mut name_offsets = Vec::new();
        for (name, _) in entries {
            let units: Vec<u16> = name.encode_utf16().collect();
            let name_off = header_len + entries_len + name_offsets_len + name_pool.len();
            name_offsets.push(name_off as u32);
            name_pool.extend_from_slice(&(units.len() as u16).to_le_bytes());
            for u in units {
                name_pool.extend_from_slice(&u.to_le_bytes());
            }
        }
        let total_size = header_len + entries_len + name_offsets_len + name_pool.len();

        let mut buf = Vec::new();
        buf.extend_from_slice(&(total_size as u32).to_le_bytes());
        buf.extend_from_slice(&(entries.len() as u32).to_le_bytes());
        for (_, entry_bytes) in entries {
            buf.extend_from_slice(entry_bytes);
        }
        for off in &name_offsets {
            buf.extend_from_slice(&off.to_le_bytes());
        }
        buf.extend_from_slice(&name_pool);
        let size = buf.len() as u64;
        (self.alloc(&buf), size)
    }

    /// Allocates a page of file records, all sharing one `entry_size`.
    /// `records` may each be shorter than [`FILE_RECORD_SIZE`] to exercise
    /// the short-record tolerance.
    pub fn alloc_file_table_page(
        &mut self,
        entry_size: u16,
        records: &[Vec<u8>],
    ) -> FileTableDirectoryEntry {
        let mut buf = Vec::new();
        for record in records {
            assert_eq!(record.len(), entry_size as usize);
            buf.extend_from_slice(record);
        }
        let offset = self.alloc(&buf);
        FileTableDirectoryEntry {
            offset,
            count: records.len() as u16,
            entry_size,
        }
    }

    pub fn finish(self, guid: Guid) -> Vec<u8> {
        let header = RegionHeader {
            common: common_header(1),
            index: 0,
            region_type: 0,
        };
        let mut bytes = write_le(&header);
        bytes.extend_from_slice(&self.data);
        bytes
    }
}

/// A full 96-byte [`File`] record, encoded and optionally truncated to
/// simulate an older writer's shorter `entry_size`.
pub fn file_record(
    attributes: FileAttributes,
    default_stream: Stream,
    sd_offset: RegionOffset,
    ea_offset: RegionOffset,
    reparse_offset: RegionOffset,
    stream_table_offset: RegionOffset,
    parent_file_id: u32,
) -> Vec<u8> {
    let file = File {
        attributes,
        ea_length: 0,
        reparse_tag: 0,
        creation_time: zero_time(),
        last_write_time: zero_time(),
        change_time: zero_time(),
        last_access_time: zero_time(),
        default_stream,
        sd_offset,
        ea_offset,
        reparse_offset,
        stream_table_offset,
        parent_file_id,
        base_region_index: 0,
    };
    let bytes = write_le(&file);
    assert_eq!(bytes.len(), FILE_RECORD_SIZE);
    bytes
}

pub fn data_stream(data_offset: RegionOffset, size: u64) -> Stream {
    Stream::new(data_offset, size, StreamType::Data, false)
}

pub fn sparse_stream(size: u64) -> Stream {
    Stream::new(RegionOffset::NULL, size, StreamType::Data, true)
}

pub fn link_table_stream(data_offset: RegionOffset, size: u64) -> Stream {
    Stream::new(data_offset, size, StreamType::LinkTable, false)
}

pub fn pe_image_stream(data_offset: RegionOffset, size: u64) -> Stream {
    Stream::new(data_offset, size, StreamType::PeImage, false)
}

static FIXTURE_COUNTER: AtomicU32 = AtomicU32::new(0);

/// A materialized fixture image on disk: a primary filesystem file plus its
/// one sibling region file, in a fresh temp directory removed on drop.
pub struct Fixture {
    dir: PathBuf,
    pub primary_path: PathBuf,
    pub region_path: PathBuf,
}

impl Fixture {
    /// Writes `region_bytes` as the image's sole region file (region set
    /// `guid`, index 0) and `filesystem_header` as the primary file.
    pub fn new(guid: Guid, region_bytes: Vec<u8>, filesystem_header: &FilesystemHeader) -> Self {
        let n = FIXTURE_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!("cim-reader-fixture-{}-{n}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create fixture dir");

        let region_path = dir.join(format!("region_{guid}_0"));
        std::fs::write(&region_path, &region_bytes).expect("write region file");

        let primary_path = dir.join("image.cim");
        std::fs::write(&primary_path, write_le(filesystem_header)).expect("write primary file");

        Fixture { dir, primary_path, region_path }
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

pub fn filesystem_header(guid: Guid, filesystem_offset: RegionOffset) -> FilesystemHeader {
    FilesystemHeader {
        common: common_header(0),
        local_regions: RegionSet { id: guid, count: 1 },
        filesystem_offset,
        parent_count: 0,
        parents: Vec::new(),
    }
}

pub fn filesystem_record(
    upcase_offset: RegionOffset,
    file_table_directory_offset: RegionOffset,
    file_table_directory_length: u32,
    root_file_id: u32,
) -> Filesystem {
    Filesystem {
        upcase_offset,
        file_table_directory_offset,
        file_table_directory_length,
        root_file_id,
    }
}

pub const FIXTURE_GUID: [u8; 16] = [0x42; 16];
