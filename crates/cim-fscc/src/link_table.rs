//! [`LinkTable`]: the sorted, binary-searchable table behind every directory
//! listing and every file's alternate-stream table.

use std::cmp::Ordering;
use std::io::Cursor;

use binrw::prelude::*;
use cim_dtyp::UpcaseTable;
use cim_dtyp::upcase::{compare_stored_names, compare_upcase_folded};

use crate::file_table::FileId;
use crate::stream::Stream;

const HEADER_LEN: usize = 8;
const NAME_OFFSET_ENTRY_LEN: usize = 4;

/// What a link table's fixed-size entries hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTableKind {
    /// A directory's children: each entry is a [`FileId`].
    Directory,
    /// A file's alternate-stream table: each entry is an embedded [`Stream`].
    StreamTable,
}

impl LinkTableKind {
    pub fn entry_stride(self) -> usize {
        match self {
            LinkTableKind::Directory => 4,
            LinkTableKind::StreamTable => 16,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LinkTableError {
    #[error("link table buffer of {0} bytes is smaller than the 8-byte header")]
    TooSmall(usize),
    #[error("link table declares size {size} but the buffer is only {buffer_len} bytes")]
    SizeExceedsBuffer { size: u32, buffer_len: usize },
    #[error("link table declares count {count}, which exceeds the capacity implied by size {size}")]
    CountExceedsCapacity { count: u32, size: u32 },
    #[error("link table entry {index} has a name offset ({offset}) outside the buffer")]
    NameOffsetOutOfBounds { index: u32, offset: u32 },
    #[error("link table entry {index}'s name would read past the end of the buffer")]
    NameLengthOutOfBounds { index: u32 },
    #[error("link table names are not strictly increasing at index {index}")]
    NotMonotonic { index: u32 },
}

/// A decoded link table: a sorted array of (name, entry) pairs stored in a
/// single contiguous buffer.
#[derive(Debug)]
pub struct LinkTable {
    bytes: Vec<u8>,
    kind: LinkTableKind,
    count: u32,
}

impl LinkTable {
    /// Parses and validates a link table's structural invariants: the
    /// header, the declared size against the buffer, and the declared count
    /// against the capacity implied by that size. Does *not* check name
    /// ordering — see [`LinkTable::validate_monotonic`].
    pub fn parse(bytes: Vec<u8>, kind: LinkTableKind) -> Result<Self, LinkTableError> {
        if bytes.len() < HEADER_LEN {
            return Err(LinkTableError::TooSmall(bytes.len()));
        }
        let total_size = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let count = u32::from_le_bytes(bytes[4..8].try_into().unwrap());

        if (total_size as usize) < HEADER_LEN {
            return Err(LinkTableError::TooSmall(total_size as usize));
        }
        if total_size as usize > bytes.len() {
            return Err(LinkTableError::SizeExceedsBuffer {
                size: total_size,
                buffer_len: bytes.len(),
            });
        }
        let stride = kind.entry_stride() as u32;
        let capacity = (total_size - HEADER_LEN as u32) / (stride + NAME_OFFSET_ENTRY_LEN as u32);
        if count > capacity {
            return Err(LinkTableError::CountExceedsCapacity {
                count,
                size: total_size,
            });
        }

        Ok(LinkTable { bytes, kind, count })
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn entries_offset(&self) -> usize {
        HEADER_LEN
    }

    fn name_offsets_offset(&self) -> usize {
        self.entries_offset() + self.count as usize * self.kind.entry_stride()
    }

    fn entry_bytes(&self, index: u32) -> &[u8] {
        let stride = self.kind.entry_stride();
        let start = self.entries_offset() + index as usize * stride;
        &self.bytes[start..start + stride]
    }

    /// Returns the raw UTF-16LE bytes of the name at `index` (no length
    /// prefix). Validates that the name-offset and length-prefixed run both
    /// land inside the buffer.
    pub fn name_bytes(&self, index: u32) -> Result<&[u8], LinkTableError> {
        let name_offset_pos = self.name_offsets_offset() + index as usize * NAME_OFFSET_ENTRY_LEN;
        let offset = u32::from_le_bytes(
            self.bytes[name_offset_pos..name_offset_pos + 4]
                .try_into()
                .unwrap(),
        ) as usize;

        let len_bytes = self
            .bytes
            .get(offset..offset + 2)
            .ok_or(LinkTableError::NameOffsetOutOfBounds {
                index,
                offset: offset as u32,
            })?;
        let len_units = u16::from_le_bytes(len_bytes.try_into().unwrap()) as usize;
        let start = offset + 2;
        let end = start + len_units * 2;
        self.bytes
            .get(start..end)
            .ok_or(LinkTableError::NameLengthOutOfBounds { index })
    }

    /// Decodes entry `index` as a directory child [`FileId`]. Only
    /// meaningful when [`LinkTable::kind`] is [`LinkTableKind::Directory`].
    pub fn file_id(&self, index: u32) -> FileId {
        let bytes = self.entry_bytes(index);
        FileId(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    /// Decodes entry `index` as an embedded [`Stream`]. Only meaningful when
    /// [`LinkTable::kind`] is [`LinkTableKind::StreamTable`].
    pub fn stream(&self, index: u32) -> Stream {
        let bytes = self.entry_bytes(index);
        Stream::read_le(&mut Cursor::new(bytes)).expect("fixed 16-byte stream entry")
    }

    pub fn kind(&self) -> LinkTableKind {
        self.kind
    }

    /// Binary searches for `name` under the image's upcase-folded order.
    /// Returns the matching index, or `None` on a clean miss.
    pub fn binary_search(
        &self,
        name: &str,
        upcase: &UpcaseTable,
    ) -> Result<Option<u32>, LinkTableError> {
        if self.count == 0 {
            return Ok(None);
        }
        let mut lo: i64 = 0;
        let mut hi: i64 = self.count as i64 - 1;
        while lo <= hi {
            let mid = lo + (hi - lo) / 2;
            let stored = self.name_bytes(mid as u32)?;
            match compare_upcase_folded(upcase, name, stored) {
                Ordering::Equal => return Ok(Some(mid as u32)),
                Ordering::Less => hi = mid - 1,
                Ordering::Greater => lo = mid + 1,
            }
        }
        Ok(None)
    }

    /// Checks that names strictly increase under the upcase-folded order.
    /// Intended for `strict_link_tables` mode; the lenient default never
    /// calls this.
    pub fn validate_monotonic(&self, upcase: &UpcaseTable) -> Result<(), LinkTableError> {
        for i in 1..self.count {
            let prev = self.name_bytes(i - 1)?;
            let cur = self.name_bytes(i)?;
            if compare_stored_names(upcase, prev, cur) != Ordering::Less {
                return Err(LinkTableError::NotMonotonic { index: i });
            }
        }
        Ok(())
    }

    /// Names in stored (sorted) order, decoded as UTF-8 with invalid UTF-16
    /// (lone surrogates) replaced by U+FFFD.
    pub fn names(&self) -> Result<Vec<String>, LinkTableError> {
        let mut out = Vec::with_capacity(self.count as usize);
        for i in 0..self.count {
            let bytes = self.name_bytes(i)?;
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect();
            out.push(String::from_utf16_lossy(&units));
        }
        Ok(out)
    }
}
