//! The reader's layered error taxonomy.

use std::path::PathBuf;

/// Errors that indicate a corrupt or foreign image. Never recovered from
/// internally.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("not a CIM image (magic mismatch)")]
    NotACim,
    #[error(
        "unsupported CIM major version {major}.{minor} (reader supports major {})",
        cim_dtyp::SUPPORTED_MAJOR_VERSION
    )]
    UnsupportedVersion { major: u32, minor: u32 },
    #[error("region file was truncated while reading its header")]
    TruncatedRegion,
    #[error("region count {0} is outside the valid range [1, 65536]")]
    TooManyRegions(usize),
    #[error("region offset points outside its region: region {region_index}, offset {byte_offset}")]
    BadRegionOffset { region_index: u16, byte_offset: u64 },
    #[error("invalid link table: {0}")]
    BadLinkTable(#[from] cim_fscc::LinkTableError),
    #[error("invalid or unterminated name encoding")]
    BadName,
    #[error("invalid file id")]
    InvalidFileId,
    #[error("unsupported stream type")]
    UnsupportedStreamType,
}

/// Ordinary, user-visible lookup failures.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("file not found")]
    FileNotFound,
    #[error("not a directory")]
    NotADirectory,
    #[error("is a directory")]
    IsADirectory,
}

/// An I/O failure reading a region file.
#[derive(Debug, thiserror::Error)]
#[error("failed to {op} region file {path}")]
pub struct RegionIoError {
    pub path: PathBuf,
    pub op: &'static str,
    #[source]
    pub source: std::io::Error,
}

/// The reader's unified error type. Most callers match on the outer
/// envelope ([`OpenError`], [`PathError`], [`StreamError`]) and inspect this
/// as the `cause`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    RegionIo(#[from] RegionIoError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Returned by [`crate::Reader::open`]. Construction failures release any
/// region handles already acquired.
#[derive(Debug, thiserror::Error)]
#[error("failed to open CIM image {path}: {cause}")]
pub struct OpenError {
    pub path: PathBuf,
    #[source]
    pub cause: Error,
}

/// Returned by path-taking operations (`open_at`, `stat`, `read`,
/// `readdir`, `read_streams`, `open_stream`).
#[derive(Debug, thiserror::Error)]
#[error("{op} failed on {image:?} at {path:?}: {cause}")]
pub struct PathError {
    pub image: PathBuf,
    pub op: &'static str,
    pub path: String,
    #[source]
    pub cause: Error,
}

/// Returned by reads on an open [`crate::Stream`] handle.
#[derive(Debug, thiserror::Error)]
#[error("{op} failed on stream {stream:?} of {image:?} at {path:?}: {cause}")]
pub struct StreamError {
    pub image: PathBuf,
    pub path: String,
    pub stream: Option<String>,
    pub op: &'static str,
    #[source]
    pub cause: Error,
}
