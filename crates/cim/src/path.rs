//! Splits a Windows-style path and walks it through the directory tree.

use cim_dtyp::UpcaseTable;
use cim_fscc::FileId;

use crate::error::{Error, FormatError, LookupError};
use crate::inode::FileTable;
use crate::object::ObjectDecoder;

/// Resolves `path` against `start` (or the image root, if `path` begins
/// with `\`), returning the `FileId` it names.
///
/// Empty components from consecutive separators are skipped. An empty path
/// (or one consisting only of separators) resolves to its starting point
/// without requiring that point to be a directory.
pub fn resolve(
    file_table: &FileTable,
    decoder: &ObjectDecoder<'_>,
    upcase: &UpcaseTable,
    root: FileId,
    start: FileId,
    path: &str,
    strict_link_tables: bool,
) -> Result<FileId, Error> {
    let mut current = if path.starts_with('\\') { root } else { start };

    for component in path.split('\\').filter(|c| !c.is_empty()) {
        let inode = file_table.get_inode(decoder, current)?;
        if !inode.is_directory() {
            return Err(Error::Lookup(LookupError::NotADirectory));
        }
        let table =
            file_table.directory_link_table(decoder, &inode, upcase, strict_link_tables)?;
        let index = table
            .binary_search(component, upcase)
            .map_err(|e| Error::Format(FormatError::BadLinkTable(e)))?
            .ok_or(Error::Lookup(LookupError::FileNotFound))?;
        current = table.file_id(index);
    }

    Ok(current)
}
