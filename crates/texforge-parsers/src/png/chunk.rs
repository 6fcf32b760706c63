//! PNG chunk walking
//!
//! A chunk is `length (u32 BE) | tag (4 ASCII bytes) | body | crc (u32)`.
//! Only the first few body bytes are read; the rest is skipped with a seek.

use std::borrow::Cow;
use std::io::{ErrorKind, Read, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};

use crate::traits::{ParseError, ParseResult};

/// The fixed 8-byte signature every PNG starts with
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Body bytes kept per chunk; covers the IHDR colour-type byte at offset 9
pub const MAX_CHUNK_HEAD: usize = 12;

/// Well-known chunk tags
pub mod tags {
    pub const IHDR: [u8; 4] = *b"IHDR";
    pub const PLTE: [u8; 4] = *b"PLTE";
    pub const TRNS: [u8; 4] = *b"tRNS";
    pub const IDAT: [u8; 4] = *b"IDAT";
    pub const IEND: [u8; 4] = *b"IEND";
}

/// Length and tag of one chunk, plus where it starts in the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub length: u32,
    pub tag: [u8; 4],
    pub offset: u64,
}

impl ChunkHeader {
    /// Tag as text (lossy for non-ASCII garbage)
    pub fn tag_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.tag)
    }

    pub fn is(&self, tag: &[u8; 4]) -> bool {
        &self.tag == tag
    }
}

/// A chunk header with the leading bytes of its body
#[derive(Debug, Clone)]
pub struct Chunk {
    pub header: ChunkHeader,
    /// At most [`MAX_CHUNK_HEAD`] bytes
    pub head: Vec<u8>,
}

/// Sequential chunk reader over a seekable PNG stream
///
/// Stops after yielding `IEND`.
pub struct PngChunkReader<R> {
    reader: R,
    offset: u64,
    finished: bool,
}

impl<R: Read + Seek> PngChunkReader<R> {
    /// Check the signature and position the reader on the first chunk
    pub fn new(mut reader: R) -> ParseResult<Self> {
        let mut signature = [0u8; 8];
        reader.read_exact(&mut signature).map_err(|e| eof_to_corrupt(e, 0))?;

        if signature != PNG_SIGNATURE {
            return Err(ParseError::InvalidMagic {
                expected: PNG_SIGNATURE.to_vec(),
                found: signature.to_vec(),
            });
        }

        Ok(Self {
            reader,
            offset: PNG_SIGNATURE.len() as u64,
            finished: false,
        })
    }

    /// Read the next chunk, `None` once `IEND` has been consumed
    pub fn next_chunk(&mut self) -> ParseResult<Option<Chunk>> {
        if self.finished {
            return Ok(None);
        }

        let offset = self.offset;
        let length = self
            .reader
            .read_u32::<BigEndian>()
            .map_err(|e| eof_to_corrupt(e, offset))?;
        let mut tag = [0u8; 4];
        self.reader
            .read_exact(&mut tag)
            .map_err(|e| eof_to_corrupt(e, offset + 4))?;

        let head_len = (length as usize).min(MAX_CHUNK_HEAD);
        let mut head = vec![0u8; head_len];
        self.reader
            .read_exact(&mut head)
            .map_err(|e| eof_to_corrupt(e, offset + 8))?;

        // remaining body plus the CRC
        let skip = i64::from(length.saturating_sub(MAX_CHUNK_HEAD as u32)) + 4;
        self.reader.seek(SeekFrom::Current(skip))?;

        self.offset = offset + 12 + u64::from(length);
        let header = ChunkHeader { length, tag, offset };
        tracing::trace!(tag = %header.tag_str(), length, offset, "PNG chunk");

        if header.is(&tags::IEND) {
            self.finished = true;
        }

        Ok(Some(Chunk { header, head }))
    }
}

impl<R: Read + Seek> Iterator for PngChunkReader<R> {
    type Item = ParseResult<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_chunk() {
            Ok(chunk) => chunk.map(Ok),
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

fn eof_to_corrupt(err: std::io::Error, offset: u64) -> ParseError {
    if err.kind() == ErrorKind::UnexpectedEof {
        ParseError::CorruptedData {
            offset,
            message: "unexpected end of file before IEND".to_string(),
        }
    } else {
        ParseError::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn raw_chunk(tag: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = (body.len() as u32).to_be_bytes().to_vec();
        out.extend_from_slice(tag);
        out.extend_from_slice(body);
        out.extend_from_slice(&[0, 0, 0, 0]);
        out
    }

    #[test]
    fn test_rejects_bad_signature() {
        let result = PngChunkReader::new(Cursor::new(b"GIF89a\0\0".to_vec()));
        assert!(matches!(result, Err(ParseError::InvalidMagic { .. })));
    }

    #[test]
    fn test_walks_chunks_and_keeps_only_head() {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend(raw_chunk(b"tEXt", &[7u8; 40]));
        data.extend(raw_chunk(b"IEND", &[]));

        let mut reader = PngChunkReader::new(Cursor::new(data)).unwrap();

        let text = reader.next_chunk().unwrap().unwrap();
        assert_eq!(text.header.tag_str(), "tEXt");
        assert_eq!(text.header.length, 40);
        assert_eq!(text.header.offset, 8);
        assert_eq!(text.head.len(), MAX_CHUNK_HEAD);

        let end = reader.next_chunk().unwrap().unwrap();
        assert!(end.header.is(&tags::IEND));
        assert_eq!(end.header.offset, 8 + 12 + 40);

        assert!(reader.next_chunk().unwrap().is_none());
    }

    #[test]
    fn test_truncated_stream_is_corrupt() {
        let mut data = PNG_SIGNATURE.to_vec();
        data.extend(raw_chunk(b"tEXt", b"abc"));

        let chunks: Vec<_> = PngChunkReader::new(Cursor::new(data)).unwrap().collect();
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].is_ok());
        assert!(matches!(chunks[1], Err(ParseError::CorruptedData { .. })));
    }
}
