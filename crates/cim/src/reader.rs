//! The public reader surface: [`Reader`], [`File`], [`Stream`], and
//! [`OpenOptions`]. Everything else in this crate exists to serve these four
//! types.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use binrw::prelude::*;
use cim_dtyp::{FileAttributes, RegionOffset, UpcaseTable};
use cim_fscc::{FileId, Filesystem, FileTableDirectoryEntry, StreamType};
use time::OffsetDateTime;

use crate::error::{Error, FormatError, LookupError, OpenError, PathError, StreamError};
use crate::inode::{FileTable, Inode};
use crate::object::ObjectDecoder;
use crate::region::{self, Region};
use crate::stream_reader::StreamReader;

/// Configuration knob for [`Reader::open`].
///
/// Mirrors `spec.md` §9's first Open Question: the reader trusts a writer's
/// link tables to be sorted by default, since that is the documented writer
/// contract; setting `strict_link_tables` validates that contract the first
/// time each link table is loaded, trading a bit of CPU for a `BadLinkTable`
/// error instead of a silently wrong binary search on a foreign or corrupt
/// image.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenOptions {
    pub strict_link_tables: bool,
}

/// Shared state behind every `Reader`, `File`, and `Stream` handle. Handles
/// hold an `Arc` to this rather than to the `Reader` itself, so none of them
/// borrow — they only ever need a moment's borrow of `regions` to build an
/// [`ObjectDecoder`] for a single call.
struct ReaderInner {
    path: PathBuf,
    regions: Vec<Region>,
    upcase: UpcaseTable,
    file_table: FileTable,
    root: FileId,
    options: OpenOptions,
    security_descriptors: Mutex<HashMap<RegionOffset, Arc<[u8]>>>,
}

impl ReaderInner {
    fn decoder(&self) -> ObjectDecoder<'_> {
        ObjectDecoder::new(&self.regions)
    }

    /// Reads and caches a security-descriptor blob by its `RegionOffset`, as
    /// described in `spec.md` §3's entity-lifecycle note.
    fn security_descriptor(&self, offset: RegionOffset) -> Result<Arc<[u8]>, Error> {
        if let Some(blob) = self.security_descriptors.lock().unwrap().get(&offset) {
            return Ok(blob.clone());
        }
        let bytes: Arc<[u8]> = self.decoder().decode_counted_u32(offset)?.into();
        let mut cache = self.security_descriptors.lock().unwrap();
        Ok(cache.entry(offset).or_insert(bytes).clone())
    }
}

/// A read-only handle onto one CIM image. Cheap to clone (an `Arc` bump);
/// every `File`/`Stream` obtained from it keeps the image open as long as it
/// lives.
#[derive(Clone)]
pub struct Reader {
    inner: Arc<ReaderInner>,
}

/// Fixed on-wire size of a [`Filesystem`] record: two `RegionOffset`s plus
/// two `u32`s.
const FILESYSTEM_RECORD_SIZE: usize = 8 + 8 + 4 + 4;

/// On-wire size of a [`FileTableDirectoryEntry`]: an 8-byte `RegionOffset`,
/// two `u16`s, and 4 reserved bytes.
const DIRECTORY_ENTRY_SIZE: usize = 16;

impl Reader {
    /// Opens the image rooted at `primary_path`, loading its region set(s)
    /// (component A), its upcase table, and its file-table directory.
    ///
    /// Validates invariants 1–3 and 7 eagerly: a corrupt header, an
    /// out-of-range region count, or a short upcase table all fail here
    /// rather than on first traversal. Any region handles already opened are
    /// released before returning an error.
    pub fn open(primary_path: impl AsRef<Path>, options: OpenOptions) -> Result<Reader, OpenError> {
        let primary_path = primary_path.as_ref();
        Self::open_inner(primary_path, options).map_err(|cause| OpenError {
            path: primary_path.to_path_buf(),
            cause,
        })
    }

    fn open_inner(primary_path: &Path, options: OpenOptions) -> Result<Reader, Error> {
        let (header, regions) = region::open_region_set(primary_path).map_err(|e| e.cause)?;
        let decoder = ObjectDecoder::new(&regions);

        let filesystem: Filesystem =
            decoder.decode_fixed(header.filesystem_offset, FILESYSTEM_RECORD_SIZE)?;

        let upcase_bytes = decoder.read_bytes(
            filesystem.upcase_offset,
            cim_dtyp::upcase::UPCASE_TABLE_LEN * 2,
        )?;
        // Reading exactly UPCASE_TABLE_LEN * 2 bytes (or failing with
        // BadRegionOffset above) is what makes invariant 7 eager: the table
        // can never be decoded at the wrong length.
        let upcase = UpcaseTable::from_le_bytes(&upcase_bytes).ok_or(Error::Format(FormatError::BadName))?;

        let directory_bytes = decoder.read_bytes(
            filesystem.file_table_directory_offset,
            filesystem.file_table_directory_length as usize * DIRECTORY_ENTRY_SIZE,
        )?;
        let mut directory = Vec::with_capacity(filesystem.file_table_directory_length as usize);
        let mut cursor = std::io::Cursor::new(&directory_bytes);
        for _ in 0..filesystem.file_table_directory_length {
            let entry = FileTableDirectoryEntry::read_le(&mut cursor)
                .map_err(|_| Error::Format(FormatError::BadName))?;
            directory.push(entry);
        }

        log::debug!(
            "opened CIM image {primary_path:?}: {} regions, {} file-table pages, root file id {}",
            regions.len(),
            directory.len(),
            filesystem.root_file_id
        );

        let inner = ReaderInner {
            path: primary_path.to_path_buf(),
            regions,
            upcase,
            file_table: FileTable::new(directory),
            root: FileId(filesystem.root_file_id),
            options,
            security_descriptors: Mutex::new(HashMap::new()),
        };

        Ok(Reader { inner: Arc::new(inner) })
    }

    /// The path this image was opened from.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// A handle to the image's root directory.
    pub fn root(&self) -> File {
        File {
            reader: self.inner.clone(),
            id: self.inner.root,
            path: "\\".to_string(),
            default_stream: None,
        }
    }
}

/// Size, attributes, timestamps, and optional blobs for a file or
/// directory, as returned by [`File::stat`].
///
/// Timestamps are converted from the on-disk `FILETIME` ticks to
/// [`OffsetDateTime`] here, in the public surface; [`cim_fscc::File`] keeps
/// the raw [`cim_dtyp::FileTime`] since the lower crate does not depend on
/// `time`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub size: u64,
    pub attributes: FileAttributes,
    pub creation_time: OffsetDateTime,
    pub last_write_time: OffsetDateTime,
    pub change_time: OffsetDateTime,
    pub last_access_time: OffsetDateTime,
    /// Opaque security-descriptor bytes; this reader does not parse a
    /// Windows security descriptor any further than handing back its bytes.
    pub security_descriptor: Option<Vec<u8>>,
    pub extended_attributes: Option<Vec<u8>>,
    pub reparse_buffer: Option<Vec<u8>>,
}

fn join_display_path(base: &str, rel: &str) -> String {
    if rel.starts_with('\\') {
        rel.to_string()
    } else if base == "\\" {
        format!("\\{rel}")
    } else {
        format!("{base}\\{rel}")
    }
}

/// A handle to one file or directory inside an open [`Reader`]. Dropping it
/// has no I/O effect; it only releases its `Arc` reference to the reader.
pub struct File {
    reader: Arc<ReaderInner>,
    id: FileId,
    path: String,
    default_stream: Option<StreamReader>,
}

impl File {
    fn decoder(&self) -> ObjectDecoder<'_> {
        self.reader.decoder()
    }

    fn inode(&self) -> Result<Arc<Inode>, Error> {
        self.reader.file_table.get_inode(&self.decoder(), self.id)
    }

    fn err(&self, op: &'static str, cause: Error) -> PathError {
        PathError {
            image: self.reader.path.clone(),
            op,
            path: self.path.clone(),
            cause,
        }
    }

    /// Resolves `path` (component-by-component, case-insensitively) starting
    /// from this file. A path beginning with `\` restarts at the image root.
    /// An empty path (or one of only separators) returns a handle to this
    /// same file, regardless of whether it is a directory.
    pub fn open_at(&self, path: &str) -> Result<File, PathError> {
        let decoder = self.decoder();
        let resolved = crate::path::resolve(
            &self.reader.file_table,
            &decoder,
            &self.reader.upcase,
            self.reader.root,
            self.id,
            path,
            self.reader.options.strict_link_tables,
        )
        .map_err(|e| self.err("open_at", e))?;

        Ok(File {
            reader: self.reader.clone(),
            id: resolved,
            path: join_display_path(&self.path, path),
            default_stream: None,
        })
    }

    /// Returns size, attributes, timestamps, and the optional
    /// security-descriptor/EA/reparse blobs for this file, as opaque bytes
    /// (this reader does not interpret a Windows security descriptor).
    pub fn stat(&self) -> Result<FileInfo, PathError> {
        let inode = self.inode().map_err(|e| self.err("stat", e))?;
        let f = &inode.file;

        let security_descriptor = if f.sd_offset.is_null() {
            None
        } else {
            Some(
                self.reader
                    .security_descriptor(f.sd_offset)
                    .map_err(|e| self.err("stat", e))?
                    .to_vec(),
            )
        };
        let extended_attributes = if f.ea_offset.is_null() {
            None
        } else {
            Some(
                self.decoder()
                    .decode_counted_u32(f.ea_offset)
                    .map_err(|e| self.err("stat", e))?,
            )
        };
        let reparse_buffer = if f.reparse_offset.is_null() {
            None
        } else {
            Some(
                self.decoder()
                    .decode_counted_u32(f.reparse_offset)
                    .map_err(|e| self.err("stat", e))?,
            )
        };

        Ok(FileInfo {
            size: f.default_stream.size(),
            attributes: f.attributes,
            creation_time: f.creation_time.to_offset_date_time(),
            last_write_time: f.last_write_time.to_offset_date_time(),
            change_time: f.change_time.to_offset_date_time(),
            last_access_time: f.last_access_time.to_offset_date_time(),
            security_descriptor,
            extended_attributes,
            reparse_buffer,
        })
    }

    /// Reads from this file's default stream at the handle's current
    /// position, advancing it. `IsADirectory` if this file's default stream
    /// is a link table.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, PathError> {
        let inode = self.inode().map_err(|e| self.err("read", e))?;
        if inode.is_directory() {
            return Err(self.err("read", Error::Lookup(LookupError::IsADirectory)));
        }
        if self.default_stream.is_none() {
            self.default_stream = Some(StreamReader::new(inode.file.default_stream));
        }
        let decoder = self.decoder();
        self.default_stream
            .as_mut()
            .unwrap()
            .read(&decoder, buf)
            .map_err(|e| self.err("read", e))
    }

    /// Lists this directory's children, in the upcase-folded sort order they
    /// are stored in. `NotADirectory` if this file's default stream is not a
    /// link table.
    pub fn readdir(&self) -> Result<Vec<String>, PathError> {
        let decoder = self.decoder();
        let inode = self.inode().map_err(|e| self.err("readdir", e))?;
        if !inode.is_directory() {
            return Err(self.err("readdir", Error::Lookup(LookupError::NotADirectory)));
        }
        let table = self
            .reader
            .file_table
            .directory_link_table(
                &decoder,
                &inode,
                &self.reader.upcase,
                self.reader.options.strict_link_tables,
            )
            .map_err(|e| self.err("readdir", e))?;
        table
            .names()
            .map_err(|e| self.err("readdir", Error::Format(FormatError::BadLinkTable(e))))
    }

    /// Lists this file's alternate-stream names.
    pub fn read_streams(&self) -> Result<Vec<String>, PathError> {
        let decoder = self.decoder();
        let inode = self.inode().map_err(|e| self.err("read_streams", e))?;
        let table = self
            .reader
            .file_table
            .stream_link_table(
                &decoder,
                &inode,
                &self.reader.upcase,
                self.reader.options.strict_link_tables,
            )
            .map_err(|e| self.err("read_streams", e))?;
        table
            .names()
            .map_err(|e| self.err("read_streams", Error::Format(FormatError::BadLinkTable(e))))
    }

    /// Opens a named alternate stream. Only `Data`-typed streams can be
    /// opened; anything else is `UnsupportedStreamType`.
    pub fn open_stream(&self, name: &str) -> Result<Stream, PathError> {
        let decoder = self.decoder();
        let inode = self.inode().map_err(|e| self.err("open_stream", e))?;
        let table = self
            .reader
            .file_table
            .stream_link_table(
                &decoder,
                &inode,
                &self.reader.upcase,
                self.reader.options.strict_link_tables,
            )
            .map_err(|e| self.err("open_stream", e))?;
        let index = table
            .binary_search(name, &self.reader.upcase)
            .map_err(|e| self.err("open_stream", Error::Format(FormatError::BadLinkTable(e))))?
            .ok_or_else(|| self.err("open_stream", Error::Lookup(LookupError::FileNotFound)))?;
        let descriptor = table.stream(index);
        if descriptor.stream_type() != StreamType::Data {
            return Err(self.err(
                "open_stream",
                Error::Format(FormatError::UnsupportedStreamType),
            ));
        }

        Ok(Stream {
            reader: self.reader.clone(),
            path: self.path.clone(),
            name: Some(name.to_string()),
            state: StreamReader::new(descriptor),
        })
    }
}

/// A handle to one stream's bytes: a file's default stream (via
/// [`File::read`]) or a named alternate stream opened with
/// [`File::open_stream`]. Not `Send`-shareable across concurrent readers of
/// the same handle — each `Stream` owns its own offset.
pub struct Stream {
    reader: Arc<ReaderInner>,
    path: String,
    name: Option<String>,
    state: StreamReader,
}

impl Stream {
    /// The stream's declared size in bytes.
    pub fn len(&self) -> u64 {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.len() == 0
    }

    /// The handle's current read position.
    pub fn position(&self) -> u64 {
        self.state.position()
    }

    /// Reads into `buf` from the current position, advancing it. Returns
    /// `0` at end-of-stream.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, StreamError> {
        let decoder = self.reader.decoder();
        self.state.read(&decoder, buf).map_err(|cause| StreamError {
            image: self.reader.path.clone(),
            path: self.path.clone(),
            stream: self.name.clone(),
            op: "read",
            cause,
        })
    }
}
