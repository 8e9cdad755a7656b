//! A read-only reader for the Container Image Mount (CIM) format: a
//! content-addressed, write-once layered filesystem image used to store
//! container image layers.
//!
//! This crate implements only the read path (component A–E of the CIM
//! design): opening an image's region set, decoding its file table and
//! directory link tables, resolving case-insensitive paths, and serving
//! byte-range reads of a file's default or alternate streams, including the
//! page-aligned remapping of a PE-image stream. Writing or modifying a CIM
//! is out of scope; see [`cim_fscc`] for the on-disk record definitions and
//! [`cim_dtyp`] for the shared wire primitives both crates build on.
//!
//! ```no_run
//! use cim::{OpenOptions, Reader};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = Reader::open("image.cim", OpenOptions::default())?;
//! let root = reader.root();
//! for name in root.readdir()? {
//!     println!("{name}");
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod inode;
mod object;
mod path;
mod reader;
mod region;
mod stream_reader;

pub use error::{
    Error, FormatError, LookupError, OpenError, PathError, RegionIoError, Result, StreamError,
};
pub use reader::{File, FileInfo, OpenOptions, Reader, Stream};
