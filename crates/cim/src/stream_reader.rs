//! Reads the byte content of a file's data, sparse, or PE-image stream.

use std::io::Cursor;

use binrw::prelude::*;
use cim_dtyp::RegionOffset;
use cim_fscc::{PeImage, Stream, StreamType};

use crate::error::{Error, FormatError};
use crate::object::ObjectDecoder;

fn decode_pe_image(decoder: &ObjectDecoder<'_>, offset: RegionOffset) -> Result<PeImage, Error> {
    const FIXED_HEADER_LEN: usize = 24; // data_offset(8) + data_length(8) + image_length(4) + mapping_count(2) + flags(2)
    let header = decoder.read_bytes(offset, FIXED_HEADER_LEN)?;
    let mapping_count = u16::from_le_bytes(header[20..22].try_into().unwrap());
    let total_len = FIXED_HEADER_LEN + mapping_count as usize * 8;
    let bytes = decoder.read_bytes(offset, total_len)?;
    PeImage::read_le(&mut Cursor::new(bytes)).map_err(|_| Error::Format(FormatError::BadName))
}

/// A cursor over one stream's logical bytes.
///
/// Takes the [`ObjectDecoder`] it needs as a parameter on every read rather
/// than storing one, so it never borrows the reader that owns it — the same
/// discipline [`crate::inode::FileTable`] uses. Not `Sync`-shareable on
/// purpose: the offset it owns must not be mutated by two threads at once.
pub struct StreamReader {
    descriptor: Stream,
    offset: u64,
    pe_image: Option<PeImage>,
}

impl StreamReader {
    pub fn new(descriptor: Stream) -> Self {
        StreamReader {
            descriptor,
            offset: 0,
            pe_image: None,
        }
    }

    pub fn len(&self) -> u64 {
        self.descriptor.size()
    }

    pub fn position(&self) -> u64 {
        self.offset
    }

    /// Reads into `buf`, returning the number of bytes read (`0` at
    /// end-of-stream). A short read at a PE-image mapping boundary is not
    /// end-of-stream; only `offset == size` is.
    pub fn read(&mut self, decoder: &ObjectDecoder<'_>, buf: &mut [u8]) -> Result<usize, Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        let size = self.descriptor.size();
        let remaining = size - self.offset;
        if remaining == 0 {
            return Ok(0);
        }

        if self.descriptor.is_sparse() {
            let n = (buf.len() as u64).min(remaining) as usize;
            buf[..n].fill(0);
            self.offset += n as u64;
            return Ok(n);
        }

        match self.descriptor.stream_type() {
            StreamType::Data => {
                let n = (buf.len() as u64).min(remaining) as usize;
                let base = self.descriptor.data_offset;
                let physical = RegionOffset::new(base.region_index(), base.byte_offset() + self.offset);
                let bytes = decoder.read_bytes(physical, n)?;
                buf[..n].copy_from_slice(&bytes);
                self.offset += n as u64;
                Ok(n)
            }
            StreamType::PeImage => {
                if self.pe_image.is_none() {
                    self.pe_image = Some(decode_pe_image(decoder, self.descriptor.data_offset)?);
                }
                let pe = self.pe_image.as_ref().unwrap();
                let base = pe.data_offset;
                let (mapping, next_boundary) = pe.mapping_for(self.offset).ok_or(Error::Format(
                    FormatError::BadRegionOffset {
                        region_index: base.region_index(),
                        byte_offset: self.offset,
                    },
                ))?;
                let boundary = next_boundary
                    .unwrap_or_else(|| pe.data_length().saturating_sub(mapping.delta as u64));
                let want = (buf.len() as u64)
                    .min(remaining)
                    .min(boundary.saturating_sub(self.offset));
                let n = want as usize;
                let physical = RegionOffset::new(
                    base.region_index(),
                    base.byte_offset() + self.offset + mapping.delta as u64,
                );
                let bytes = decoder.read_bytes(physical, n)?;
                buf[..n].copy_from_slice(&bytes);
                self.offset += n as u64;
                Ok(n)
            }
            StreamType::LinkTable | StreamType::Unknown(_) => {
                Err(Error::Format(FormatError::UnsupportedStreamType))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::{ReadAt, Region};
    use std::sync::Mutex;

    struct MemRegion(Mutex<Vec<u8>>);

    impl ReadAt for MemRegion {
        fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
            let data = self.0.lock().unwrap();
            let start = offset as usize;
            let n = buf.len().min(data.len().saturating_sub(start));
            buf[..n].copy_from_slice(&data[start..start + n]);
            Ok(n)
        }

        fn len(&self) -> std::io::Result<u64> {
            Ok(self.0.lock().unwrap().len() as u64)
        }
    }

    fn region_with(bytes: Vec<u8>) -> Region {
        Region::from_backing(0, "mem".into(), bytes.len() as u64, Box::new(MemRegion(Mutex::new(bytes))))
    }

    #[test]
    fn sparse_stream_reads_zeros_then_eof() {
        let regions = vec![region_with(vec![0xFF; 16])];
        let decoder = ObjectDecoder::new(&regions);
        let descriptor = Stream::new(RegionOffset::NULL, 8, StreamType::Data, true);
        let mut reader = StreamReader::new(descriptor);

        let mut buf = [0xAAu8; 8];
        let n = reader.read(&decoder, &mut buf).unwrap();
        assert_eq!(n, 8);
        assert_eq!(buf, [0u8; 8]);
        assert_eq!(reader.read(&decoder, &mut [0u8; 1]).unwrap(), 0);
    }

    #[test]
    fn data_stream_reads_backing_bytes() {
        let regions = vec![region_with(b"foobar test data".to_vec())];
        let decoder = ObjectDecoder::new(&regions);
        let descriptor = Stream::new(RegionOffset::new(0, 0), 16, StreamType::Data, false);
        let mut reader = StreamReader::new(descriptor);

        let mut buf = [0u8; 16];
        let n = reader.read(&decoder, &mut buf).unwrap();
        assert_eq!(n, 16);
        assert_eq!(&buf, b"foobar test data");
        assert_eq!(reader.read(&decoder, &mut [0u8; 1]).unwrap(), 0);
    }

    #[test]
    fn pe_image_stream_remaps_across_mapping_boundary() {
        // A non-power-of-two period so an offset miscomputed by a
        // power-of-two amount (e.g. using the PE descriptor's own region
        // offset instead of its backing data pointer) shows up as a
        // mismatch rather than aliasing back to the same byte values.
        let mut backing = vec![0u8; 0x3000];
        for (i, b) in backing.iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }

        // PeImage header at offset 0x2000: data_offset points back into the
        // same region at 0, data_length = 0x2600, image_length = 0x2000,
        // two mappings.
        let mut pe_bytes = Vec::new();
        pe_bytes.extend_from_slice(&RegionOffset::new(0, 0).raw().to_le_bytes());
        pe_bytes.extend_from_slice(&0x2600u64.to_le_bytes());
        pe_bytes.extend_from_slice(&0x2000u32.to_le_bytes());
        pe_bytes.extend_from_slice(&2u16.to_le_bytes());
        pe_bytes.extend_from_slice(&0u16.to_le_bytes());
        pe_bytes.extend_from_slice(&0u32.to_le_bytes()); // mapping 0: file_offset
        pe_bytes.extend_from_slice(&0x200u32.to_le_bytes()); // delta
        pe_bytes.extend_from_slice(&0x1000u32.to_le_bytes()); // mapping 1: file_offset
        pe_bytes.extend_from_slice(&0x600u32.to_le_bytes()); // delta
        backing[0x2000..0x2000 + pe_bytes.len()].copy_from_slice(&pe_bytes);

        let regions = vec![region_with(backing.clone())];
        let decoder = ObjectDecoder::new(&regions);
        let descriptor = Stream::new(RegionOffset::new(0, 0x2000), 0x2000, StreamType::PeImage, false);
        let mut reader = StreamReader::new(descriptor);

        let mut out = Vec::new();
        let mut buf = [0u8; 0x800];
        loop {
            let n = reader.read(&decoder, &mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }

        let mut expected = Vec::new();
        expected.extend_from_slice(&backing[0x200..0x1000]);
        expected.extend_from_slice(&backing[0x1600..0x2600]);
        assert_eq!(out, expected);
    }

    #[test]
    fn pe_image_tail_mapping_does_not_read_past_data_length() {
        // Mirrors a `.bss`-bearing executable: the stream's declared
        // logical size exceeds what the final mapping's backing data can
        // satisfy (`data_length - delta`), so reads must stop there instead
        // of wandering into whatever bytes sit after the PE data region.
        let mut backing = vec![0u8; 0x3000];
        for (i, b) in backing.iter_mut().enumerate() {
            *b = (i % 251) as u8;
        }

        // data_length = 0x1800, last mapping delta = 0x600, so the tail
        // mapping can only back logical offsets up to 0x1200 even though
        // the declared stream size below is much larger.
        let mut pe_bytes = Vec::new();
        pe_bytes.extend_from_slice(&RegionOffset::new(0, 0).raw().to_le_bytes());
        pe_bytes.extend_from_slice(&0x1800u64.to_le_bytes());
        pe_bytes.extend_from_slice(&0x1e00u32.to_le_bytes());
        pe_bytes.extend_from_slice(&2u16.to_le_bytes());
        pe_bytes.extend_from_slice(&0u16.to_le_bytes());
        pe_bytes.extend_from_slice(&0u32.to_le_bytes()); // mapping 0: file_offset
        pe_bytes.extend_from_slice(&0x200u32.to_le_bytes()); // delta
        pe_bytes.extend_from_slice(&0x1000u32.to_le_bytes()); // mapping 1: file_offset
        pe_bytes.extend_from_slice(&0x600u32.to_le_bytes()); // delta
        backing[0x2000..0x2000 + pe_bytes.len()].copy_from_slice(&pe_bytes);

        let regions = vec![region_with(backing.clone())];
        let decoder = ObjectDecoder::new(&regions);
        // Declared logical size (0x1e00) outlives the tail mapping's
        // backing data (which only covers up to logical offset 0x1200).
        let descriptor = Stream::new(RegionOffset::new(0, 0x2000), 0x1e00, StreamType::PeImage, false);
        let mut reader = StreamReader::new(descriptor);

        let mut out = Vec::new();
        let mut buf = [0u8; 0x800];
        loop {
            let n = reader.read(&decoder, &mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }

        let mut expected = Vec::new();
        expected.extend_from_slice(&backing[0x200..0x1200]);
        expected.extend_from_slice(&backing[0x1600..0x1800]);
        assert_eq!(out, expected);
    }
}
