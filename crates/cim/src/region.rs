//! Opens an image's filesystem file and the region files it references.

use std::fs::File as StdFile;
use std::path::{Path, PathBuf};

use binrw::prelude::*;
use cim_dtyp::Guid;
use cim_fscc::{FilesystemHeader, RegionHeader};

use crate::error::{Error, FormatError, OpenError, RegionIoError};

/// Positional reads with no shared seek cursor, so multiple threads can read
/// the same region file concurrently.
pub trait ReadAt: Send + Sync {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize>;
    fn len(&self) -> std::io::Result<u64>;
}

impl ReadAt for StdFile {
    #[cfg(unix)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(self, buf, offset)
    }

    #[cfg(windows)]
    fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
        std::os::windows::fs::FileExt::seek_read(self, buf, offset)
    }

    fn len(&self) -> std::io::Result<u64> {
        Ok(self.metadata()?.len())
    }
}

/// One opened, validated region file.
pub struct Region {
    pub index: u16,
    pub path: PathBuf,
    pub length: u64,
    file: Box<dyn ReadAt>,
}

impl Region {
    /// Reads `buf.len()` bytes starting at `offset` within this region.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<(), Error> {
        self.file
            .read_at(buf, offset)
            .map_err(|source| {
                Error::RegionIo(RegionIoError {
                    path: self.path.clone(),
                    op: "read",
                    source,
                })
            })
            .and_then(|n| {
                if n == buf.len() {
                    Ok(())
                } else {
                    Err(Error::RegionIo(RegionIoError {
                        path: self.path.clone(),
                        op: "read",
                        source: std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            "short read from region file",
                        ),
                    }))
                }
            })
    }

    #[cfg(test)]
    pub fn from_backing(index: u16, path: PathBuf, length: u64, file: Box<dyn ReadAt>) -> Self {
        Region { index, path, length, file }
    }
}

/// Maximum number of regions (local + inherited parents) a valid image may
/// carry.
pub const MAX_REGIONS: usize = 65_536;

fn region_file_name(region_set_id: Guid, index: u16) -> String {
    format!("region_{region_set_id}_{index}")
}

/// On-wire size of a [`RegionHeader`]: a 32-byte [`CommonHeader`] plus 8
/// bytes of region-specific fields.
const REGION_HEADER_WIRE_SIZE: usize = 40;

fn open_region_header(path: &Path) -> Result<(StdFile, RegionHeader), Error> {
    let file = StdFile::open(path).map_err(|source| {
        Error::RegionIo(RegionIoError {
            path: path.to_path_buf(),
            op: "open",
            source,
        })
    })?;

    let length = (&file as &dyn ReadAt).len().map_err(|source| {
        Error::RegionIo(RegionIoError {
            path: path.to_path_buf(),
            op: "stat",
            source,
        })
    })?;
    if length < REGION_HEADER_WIRE_SIZE as u64 {
        return Err(Error::Format(FormatError::TruncatedRegion));
    }

    let mut header_bytes = [0u8; REGION_HEADER_WIRE_SIZE];
    (&file as &dyn ReadAt)
        .read_at(&mut header_bytes, 0)
        .map_err(|source| {
            Error::RegionIo(RegionIoError {
                path: path.to_path_buf(),
                op: "read header of",
                source,
            })
        })?;

    let region_header = RegionHeader::read_le(&mut std::io::Cursor::new(&header_bytes))
        .map_err(|_| Error::Format(FormatError::TruncatedRegion))?;

    if !region_header.common.is_magic_valid() {
        return Err(Error::Format(FormatError::NotACim));
    }
    if !region_header.common.is_version_supported() {
        return Err(Error::Format(FormatError::UnsupportedVersion {
            major: region_header.common.version.major,
            minor: region_header.common.version.minor,
        }));
    }

    Ok((file, region_header))
}

/// Opens the image's filesystem file, validates its header, and opens every
/// region file of every inherited parent region set followed by the local
/// region set, in that order — matching their flat on-wire index.
///
/// Returns the parsed [`FilesystemHeader`] and the flattened region array.
pub fn open_region_set(primary_path: &Path) -> Result<(FilesystemHeader, Vec<Region>), OpenError> {
    open_region_set_inner(primary_path).map_err(|cause| OpenError {
        path: primary_path.to_path_buf(),
        cause,
    })
}

fn open_region_set_inner(primary_path: &Path) -> Result<(FilesystemHeader, Vec<Region>), Error> {
    let bytes = std::fs::read(primary_path).map_err(|source| {
        Error::RegionIo(RegionIoError {
            path: primary_path.to_path_buf(),
            op: "open",
            source,
        })
    })?;

    let header = FilesystemHeader::read_le(&mut std::io::Cursor::new(&bytes))
        .map_err(|_| Error::Format(FormatError::TruncatedRegion))?;

    if !header.common.is_magic_valid() {
        return Err(Error::Format(FormatError::NotACim));
    }
    if !header.common.is_version_supported() {
        return Err(Error::Format(FormatError::UnsupportedVersion {
            major: header.common.version.major,
            minor: header.common.version.minor,
        }));
    }

    let total_regions: usize = header
        .parents
        .iter()
        .chain(std::iter::once(&header.local_regions))
        .map(|rs| rs.count as usize)
        .sum();
    if total_regions == 0 || total_regions > MAX_REGIONS {
        return Err(Error::Format(FormatError::TooManyRegions(total_regions)));
    }

    let dir = primary_path.parent().unwrap_or_else(|| Path::new("."));
    let mut regions = Vec::with_capacity(total_regions);

    // Parents first, local last — this fixes each region's flat, on-wire index.
    for region_set in header.parents.iter().chain(std::iter::once(&header.local_regions)) {
        for i in 0..region_set.count {
            let path = dir.join(region_file_name(region_set.id, i));
            let result = open_region_header(&path);
            match result {
                Ok((file, region_header)) => {
                    let length = (&file as &dyn ReadAt).len().map_err(|source| {
                        Error::RegionIo(RegionIoError {
                            path: path.clone(),
                            op: "stat",
                            source,
                        })
                    })?;
                    log::trace!(
                        "opened region {} ({path:?}), {length} bytes, type {:?}",
                        region_header.index,
                        region_header.region_type()
                    );
                    regions.push(Region {
                        index: regions.len() as u16,
                        path,
                        length,
                        file: Box::new(file),
                    });
                }
                Err(e) => {
                    // Release everything opened so far before propagating.
                    drop(regions);
                    return Err(e);
                }
            }
        }
    }

    Ok((header, regions))
}
