//! On-disk record definitions for the CIM format: region and filesystem
//! headers, the file table, streams, PE-image remapping, and link tables.

mod file_table;
mod filesystem;
mod link_table;
mod pe_image;
mod region;
mod stream;

pub use file_table::{FILE_RECORD_SIZE, FILES_PER_TABLE, File, FileId, FileTableDirectoryEntry};
pub use filesystem::{Filesystem, FilesystemHeader};
pub use link_table::{LinkTable, LinkTableError, LinkTableKind};
pub use pe_image::{PeImage, PeImageMapping};
pub use region::{RegionHeader, RegionSet, RegionType};
pub use stream::{Stream, StreamType};
