//! Cursor over a chunked byte stream.
//!
//! Each chunk is a 2-byte little-endian id followed by a 4-byte little-endian
//! total length that includes the 6-byte header itself. Payload bytes may be
//! nested child chunks up to `start + total_length`. The reader decodes
//! fixed-width primitives, length-prefixed headers, and null-terminated
//! strings, and skips unrecognized chunks by declared length.

use glam::Vec3;
use rootcause::Report;
use thiserror::Error;
use winnow::Parser;
use winnow::binary::{le_f32, le_i16, le_i32, le_u8, le_u16, le_u32};
use winnow::error::{ContextError, ErrMode};

use crate::options::UpAxis;

/// Size of a chunk header: 2-byte id + 4-byte total length.
pub const HEADER_SIZE: usize = 6;

/// Structural errors in the chunk stream. Any of these aborts the load.
#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("truncated chunk data: need {need} bytes at offset 0x{offset:X}, have {have}")]
    Truncated {
        offset: usize,
        need: usize,
        have: usize,
    },
    #[error("chunk at 0x{offset:X} declares total size {size}, smaller than its 6-byte header")]
    BadHeaderSize { offset: usize, size: u32 },
    #[error("unterminated string at offset 0x{offset:X}")]
    UnterminatedString { offset: usize },
}

/// A decoded chunk header.
#[derive(Clone, Copy, Debug)]
pub struct ChunkHeader {
    /// Raw 2-byte chunk id.
    pub id: u16,
    /// Total chunk length, header included.
    pub size: u32,
    /// Offset of the header's first byte within the stream.
    pub start: usize,
}

impl ChunkHeader {
    /// Offset one past the last byte of this chunk. A well-formed reader
    /// never reads at or beyond this offset while inside the chunk.
    pub fn end(&self) -> usize {
        self.start + self.size as usize
    }
}

/// Cursor over one in-memory chunk stream.
///
/// The up-axis remap is applied by [`ChunkReader::read_vec3`] so that every
/// vector entering the neutral model is already in the internal frame.
pub struct ChunkReader<'a> {
    data: &'a [u8],
    pos: usize,
    up_axis: UpAxis,
}

impl<'a> ChunkReader<'a> {
    pub fn new(data: &'a [u8], up_axis: UpAxis) -> Self {
        ChunkReader {
            data,
            pos: 0,
            up_axis,
        }
    }

    /// Current cursor offset from the start of the stream.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes left between the cursor and the end of the stream.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn truncated(&self, need: usize) -> Report<ChunkError> {
        Report::new(ChunkError::Truncated {
            offset: self.pos,
            need,
            have: self.remaining(),
        })
    }

    /// Read the next 6-byte chunk header.
    ///
    /// The declared size must cover at least the header itself; a size below
    /// 6 would make skip loops run backwards and is rejected here.
    pub fn read_header(&mut self) -> Result<ChunkHeader, Report<ChunkError>> {
        let start = self.pos;
        if self.remaining() < HEADER_SIZE {
            return Err(self.truncated(HEADER_SIZE));
        }
        let id = self.read_u16()?;
        let size = self.read_u32()?;
        if (size as usize) < HEADER_SIZE {
            return Err(Report::new(ChunkError::BadHeaderSize {
                offset: start,
                size,
            }));
        }
        Ok(ChunkHeader { id, size, start })
    }

    pub fn read_u8(&mut self) -> Result<u8, Report<ChunkError>> {
        let input = &mut &self.data[self.pos..];
        let v = le_u8
            .parse_next(input)
            .map_err(|_: ErrMode<ContextError>| self.truncated(1))?;
        self.pos += 1;
        Ok(v)
    }

    pub fn read_u16(&mut self) -> Result<u16, Report<ChunkError>> {
        let input = &mut &self.data[self.pos..];
        let v = le_u16
            .parse_next(input)
            .map_err(|_: ErrMode<ContextError>| self.truncated(2))?;
        self.pos += 2;
        Ok(v)
    }

    pub fn read_i16(&mut self) -> Result<i16, Report<ChunkError>> {
        let input = &mut &self.data[self.pos..];
        let v = le_i16
            .parse_next(input)
            .map_err(|_: ErrMode<ContextError>| self.truncated(2))?;
        self.pos += 2;
        Ok(v)
    }

    pub fn read_u32(&mut self) -> Result<u32, Report<ChunkError>> {
        let input = &mut &self.data[self.pos..];
        let v = le_u32
            .parse_next(input)
            .map_err(|_: ErrMode<ContextError>| self.truncated(4))?;
        self.pos += 4;
        Ok(v)
    }

    pub fn read_i32(&mut self) -> Result<i32, Report<ChunkError>> {
        let input = &mut &self.data[self.pos..];
        let v = le_i32
            .parse_next(input)
            .map_err(|_: ErrMode<ContextError>| self.truncated(4))?;
        self.pos += 4;
        Ok(v)
    }

    pub fn read_f32(&mut self) -> Result<f32, Report<ChunkError>> {
        let input = &mut &self.data[self.pos..];
        let v = le_f32
            .parse_next(input)
            .map_err(|_: ErrMode<ContextError>| self.truncated(4))?;
        self.pos += 4;
        Ok(v)
    }

    /// Read three floats and remap them into the internal frame.
    ///
    /// Source files are authored Z-up; the internal model is Y-up, so the
    /// default remap is `(x, y, z) -> (x, z, -y)`.
    pub fn read_vec3(&mut self) -> Result<Vec3, Report<ChunkError>> {
        let x = self.read_f32()?;
        let y = self.read_f32()?;
        let z = self.read_f32()?;
        Ok(match self.up_axis {
            UpAxis::YUp => Vec3::new(x, z, -y),
            UpAxis::ZUp => Vec3::new(x, y, z),
        })
    }

    /// Read a null-terminated string, lossily decoded as UTF-8.
    ///
    /// The terminator must appear before the end of the stream.
    pub fn read_cstring(&mut self) -> Result<String, Report<ChunkError>> {
        self.read_cstring_within(self.data.len())
    }

    /// Read a null-terminated string bounded by `end`, lossily decoded as
    /// UTF-8.
    ///
    /// The terminator must appear before `end`; a string missing its
    /// terminator cannot consume sibling-chunk bytes as content.
    pub fn read_cstring_within(&mut self, end: usize) -> Result<String, Report<ChunkError>> {
        let end = end.min(self.data.len()).max(self.pos);
        let rest = &self.data[self.pos..end];
        let nul = rest.iter().position(|&b| b == 0).ok_or_else(|| {
            Report::new(ChunkError::UnterminatedString { offset: self.pos })
        })?;
        let s = String::from_utf8_lossy(&rest[..nul]).into_owned();
        self.pos += nul + 1;
        Ok(s)
    }

    /// Move the cursor to `end`, clamped to the stream length. Used both to
    /// skip unrecognized chunks and to realign after a handler finishes a
    /// recognized scope. The cursor never moves backwards.
    pub fn skip_to(&mut self, end: usize) {
        let end = end.min(self.data.len());
        if end > self.pos {
            self.pos = end;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: u16, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&id.to_le_bytes());
        out.extend_from_slice(&((payload.len() + HEADER_SIZE) as u32).to_le_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn header_decode_and_end() {
        let data = chunk(0x4D4D, &[1, 2, 3, 4]);
        let mut r = ChunkReader::new(&data, UpAxis::YUp);
        let hdr = r.read_header().unwrap();
        assert_eq!(hdr.id, 0x4D4D);
        assert_eq!(hdr.size, 10);
        assert_eq!(hdr.start, 0);
        assert_eq!(hdr.end(), data.len());
    }

    #[test]
    fn skip_advances_by_declared_size_minus_header() {
        let mut data = chunk(0x7777, &[0u8; 20]);
        data.extend_from_slice(&chunk(0x4D4D, &[]));
        let mut r = ChunkReader::new(&data, UpAxis::YUp);
        let hdr = r.read_header().unwrap();
        let after_header = r.pos();
        r.skip_to(hdr.end());
        assert_eq!(r.pos() - after_header, hdr.size as usize - HEADER_SIZE);
        // The next header starts exactly where the skipped chunk ends.
        let next = r.read_header().unwrap();
        assert_eq!(next.id, 0x4D4D);
    }

    #[test]
    fn truncated_header_is_an_error() {
        let data = [0x4D, 0x4D, 0x0A];
        let mut r = ChunkReader::new(&data, UpAxis::YUp);
        assert!(r.read_header().is_err());
    }

    #[test]
    fn undersized_chunk_is_an_error() {
        let mut data = Vec::new();
        data.extend_from_slice(&0x4D4Du16.to_le_bytes());
        data.extend_from_slice(&2u32.to_le_bytes());
        let mut r = ChunkReader::new(&data, UpAxis::YUp);
        assert!(r.read_header().is_err());
    }

    #[test]
    fn cstring_stops_at_terminator() {
        let data = b"mesh01\0rest";
        let mut r = ChunkReader::new(data, UpAxis::YUp);
        assert_eq!(r.read_cstring().unwrap(), "mesh01");
        assert_eq!(r.pos(), 7);
    }

    #[test]
    fn bounded_cstring_never_reads_past_its_chunk() {
        // Terminator exists in the stream but beyond the chunk boundary.
        let data = b"mesh01\0";
        let mut r = ChunkReader::new(data, UpAxis::YUp);
        assert!(r.read_cstring_within(4).is_err());
        assert_eq!(r.pos(), 0);
        assert_eq!(r.read_cstring_within(data.len()).unwrap(), "mesh01");
    }

    #[test]
    fn unterminated_cstring_is_an_error() {
        let data = b"mesh01";
        let mut r = ChunkReader::new(data, UpAxis::YUp);
        assert!(r.read_cstring().is_err());
    }

    #[test]
    fn vec3_remaps_z_up_to_y_up() {
        let mut data = Vec::new();
        for f in [1.0f32, 2.0, 3.0] {
            data.extend_from_slice(&f.to_le_bytes());
        }
        let mut r = ChunkReader::new(&data, UpAxis::YUp);
        assert_eq!(r.read_vec3().unwrap(), Vec3::new(1.0, 3.0, -2.0));

        let mut r = ChunkReader::new(&data, UpAxis::ZUp);
        assert_eq!(r.read_vec3().unwrap(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn skip_never_rewinds() {
        let data = chunk(0x4D4D, &[0u8; 8]);
        let mut r = ChunkReader::new(&data, UpAxis::YUp);
        let _ = r.read_header().unwrap();
        let pos = r.pos();
        r.skip_to(0);
        assert_eq!(r.pos(), pos);
    }
}
