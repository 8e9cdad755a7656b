//! Inode cache and lazy file-table page loading.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use cim_dtyp::UpcaseTable;
use cim_fscc::{FileId, FileTableDirectoryEntry, StreamType};

use crate::error::{Error, FormatError};
use crate::object::ObjectDecoder;

/// A decoded file-table record plus its lazily-filled directory/stream
/// tables. Value-equal once installed, so a benign duplicate decode during
/// a cache race is harmless.
pub struct Inode {
    pub id: FileId,
    pub file: cim_fscc::File,
    pub(crate) link_table: OnceLock<cim_fscc::LinkTable>,
    pub(crate) stream_table: OnceLock<cim_fscc::LinkTable>,
}

impl Inode {
    pub fn is_directory(&self) -> bool {
        self.file.default_stream.stream_type() == StreamType::LinkTable
    }
}

/// One loaded file-table page: `entry_size`-strided raw bytes for up to
/// [`cim_fscc::FILES_PER_TABLE`] records.
struct FileTablePage {
    bytes: Vec<u8>,
    entry_size: usize,
}

impl FileTablePage {
    fn record(&self, slot: u32) -> &[u8] {
        let start = slot as usize * self.entry_size;
        &self.bytes[start..start + self.entry_size]
    }
}

/// Loads file-table pages on demand and caches decoded inodes by [`FileId`].
///
/// Holds no borrow of the reader's regions: every method takes the
/// [`ObjectDecoder`] to use as a parameter, so the reader that owns both the
/// regions and this table never needs to borrow itself.
pub struct FileTable {
    directory: Vec<FileTableDirectoryEntry>,
    pages: Mutex<HashMap<u32, Arc<FileTablePage>>>,
    inodes: Mutex<HashMap<FileId, Arc<Inode>>>,
}

impl FileTable {
    pub fn new(directory: Vec<FileTableDirectoryEntry>) -> Self {
        FileTable {
            directory,
            pages: Mutex::new(HashMap::new()),
            inodes: Mutex::new(HashMap::new()),
        }
    }

    fn page(&self, decoder: &ObjectDecoder<'_>, table: u32) -> Result<Arc<FileTablePage>, Error> {
        if let Some(page) = self.pages.lock().unwrap().get(&table) {
            return Ok(page.clone());
        }
        let entry = self
            .directory
            .get(table as usize)
            .ok_or(Error::Format(FormatError::InvalidFileId))?;
        let entry_size = entry.entry_size as usize;
        let len = entry.count as usize * entry_size;
        let bytes = decoder.read_bytes(entry.offset, len)?;
        let page = Arc::new(FileTablePage { bytes, entry_size });

        let mut pages = self.pages.lock().unwrap();
        Ok(pages.entry(table).or_insert(page).clone())
    }

    /// Decodes and caches the inode for `id`, per the lookup sequence:
    /// range-check, lazily load the owning page, decode the (possibly
    /// short or long) record, validate the default stream type, and install.
    pub fn get_inode(&self, decoder: &ObjectDecoder<'_>, id: FileId) -> Result<Arc<Inode>, Error> {
        let (table, slot) = id
            .table_and_slot()
            .ok_or(Error::Format(FormatError::InvalidFileId))?;

        if let Some(inode) = self.inodes.lock().unwrap().get(&id) {
            return Ok(inode.clone());
        }

        let entry = self
            .directory
            .get(table as usize)
            .ok_or(Error::Format(FormatError::InvalidFileId))?;
        if slot >= entry.count as u32 {
            return Err(Error::Format(FormatError::InvalidFileId));
        }

        let page = self.page(decoder, table)?;
        let file = cim_fscc::File::from_record_bytes(page.record(slot))
            .map_err(|_| Error::Format(FormatError::InvalidFileId))?;

        match file.default_stream.stream_type() {
            StreamType::Data | StreamType::LinkTable | StreamType::PeImage => {}
            StreamType::Unknown(_) => return Err(Error::Format(FormatError::UnsupportedStreamType)),
        }

        let inode = Arc::new(Inode {
            id,
            file,
            link_table: OnceLock::new(),
            stream_table: OnceLock::new(),
        });

        let mut inodes = self.inodes.lock().unwrap();
        Ok(inodes.entry(id).or_insert(inode).clone())
    }

    /// Returns this inode's directory link table, decoding and installing it
    /// on first use.
    ///
    /// When `strict` is set, validates name-ordering monotonicity (invariant
    /// 6) the first time this table is loaded, surfacing `BadLinkTable`
    /// instead of letting a corrupt table silently mis-answer binary search.
    pub fn directory_link_table<'i>(
        &self,
        decoder: &ObjectDecoder<'_>,
        inode: &'i Inode,
        upcase: &UpcaseTable,
        strict: bool,
    ) -> Result<&'i cim_fscc::LinkTable, Error> {
        if let Some(table) = inode.link_table.get() {
            return Ok(table);
        }
        let bytes = decoder.decode_link_table_bytes(inode.file.default_stream.data_offset)?;
        let table = cim_fscc::LinkTable::parse(bytes, cim_fscc::LinkTableKind::Directory)
            .map_err(|e| Error::Format(FormatError::BadLinkTable(e)))?;
        if strict {
            table
                .validate_monotonic(upcase)
                .map_err(|e| Error::Format(FormatError::BadLinkTable(e)))?;
        }
        Ok(inode.link_table.get_or_init(|| table))
    }

    /// Returns this inode's alternate-stream table, decoding and installing
    /// it on first use. An inode with no stream table (null offset) has an
    /// empty one.
    pub fn stream_link_table<'i>(
        &self,
        decoder: &ObjectDecoder<'_>,
        inode: &'i Inode,
        upcase: &UpcaseTable,
        strict: bool,
    ) -> Result<&'i cim_fscc::LinkTable, Error> {
        if let Some(table) = inode.stream_table.get() {
            return Ok(table);
        }
        let table = if inode.file.stream_table_offset.is_null() {
            let mut empty = Vec::new();
            empty.extend_from_slice(&8u32.to_le_bytes());
            empty.extend_from_slice(&0u32.to_le_bytes());
            cim_fscc::LinkTable::parse(empty, cim_fscc::LinkTableKind::StreamTable)
                .map_err(|e| Error::Format(FormatError::BadLinkTable(e)))?
        } else {
            let bytes = decoder.decode_link_table_bytes(inode.file.stream_table_offset)?;
            cim_fscc::LinkTable::parse(bytes, cim_fscc::LinkTableKind::StreamTable)
                .map_err(|e| Error::Format(FormatError::BadLinkTable(e)))?
        };
        if strict {
            table
                .validate_monotonic(upcase)
                .map_err(|e| Error::Format(FormatError::BadLinkTable(e)))?;
        }
        Ok(inode.stream_table.get_or_init(|| table))
    }
}
