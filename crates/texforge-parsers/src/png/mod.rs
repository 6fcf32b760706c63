//! PNG alpha inspection
//!
//! Decides whether a PNG carries transparency by looking at chunk headers
//! only: an IHDR colour type with an alpha channel (4 or 6), or the presence
//! of a `tRNS` chunk. Pixels are never decoded.

mod chunk;

pub use chunk::{tags, Chunk, ChunkHeader, PngChunkReader, MAX_CHUNK_HEAD, PNG_SIGNATURE};

use std::io::{Read, Seek};
use std::path::Path;

use crate::logging::instrument_parse;
use crate::traits::{ParseError, ParseResult, Parser};

/// IHDR colour type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorType {
    Grayscale,
    Rgb,
    Indexed,
    GrayscaleAlpha,
    Rgba,
    Unknown(u8),
}

impl ColorType {
    pub fn from_byte(value: u8) -> Self {
        match value {
            0 => ColorType::Grayscale,
            2 => ColorType::Rgb,
            3 => ColorType::Indexed,
            4 => ColorType::GrayscaleAlpha,
            6 => ColorType::Rgba,
            other => ColorType::Unknown(other),
        }
    }

    /// Colour types 4 and 6 store a per-pixel alpha sample
    pub fn has_alpha_channel(&self) -> bool {
        matches!(self, ColorType::GrayscaleAlpha | ColorType::Rgba)
    }
}

/// What the chunk walk found
#[derive(Debug, Clone, Default)]
pub struct PngAlphaInfo {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub color_type: Option<ColorType>,
    pub has_alpha_channel: bool,
    pub has_transparency_chunk: bool,
    /// Every chunk up to and including `IEND`
    pub chunks: Vec<ChunkHeader>,
}

impl PngAlphaInfo {
    pub fn has_alpha(&self) -> bool {
        self.has_alpha_channel || self.has_transparency_chunk
    }
}

/// PNG chunk inspector
pub struct PngParser;

impl PngParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PngParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser for PngParser {
    type Output = PngAlphaInfo;

    fn extensions(&self) -> &[&str] {
        &["png"]
    }

    fn name(&self) -> &str {
        "PNG Chunk Inspector"
    }

    fn parse<R: Read + Seek>(&self, reader: R) -> ParseResult<Self::Output> {
        let mut info = PngAlphaInfo::default();

        for chunk in PngChunkReader::new(reader)? {
            let Chunk { header, head } = chunk?;

            if header.is(&tags::IHDR) {
                // width(4) height(4) depth(1) colour type(1) ...
                if head.len() < 10 {
                    return Err(ParseError::CorruptedData {
                        offset: header.offset,
                        message: format!("IHDR body is {} bytes, expected 13", header.length),
                    });
                }
                info.width = Some(u32::from_be_bytes([head[0], head[1], head[2], head[3]]));
                info.height = Some(u32::from_be_bytes([head[4], head[5], head[6], head[7]]));
                let color_type = ColorType::from_byte(head[9]);
                info.color_type = Some(color_type);
                if color_type.has_alpha_channel() {
                    info.has_alpha_channel = true;
                }
            }
            if header.is(&tags::TRNS) {
                info.has_transparency_chunk = true;
            }

            info.chunks.push(header);
        }

        Ok(info)
    }
}

/// Inspect a PNG file, naming the file in any error
pub fn inspect(path: &Path) -> ParseResult<PngAlphaInfo> {
    instrument_parse("png", || PngParser::new().parse_file(path))
        .map_err(|e| e.with_context(format!("Couldn't read PNG file {}", path.display())))
}

/// Whether the PNG at `path` has an alpha channel or a transparency table
pub fn has_alpha(path: &Path) -> ParseResult<bool> {
    let info = inspect(path)?;
    tracing::debug!(
        path = %path.display(),
        color_type = ?info.color_type,
        trns = info.has_transparency_chunk,
        "Inspected PNG alpha"
    );
    Ok(info.has_alpha())
}
