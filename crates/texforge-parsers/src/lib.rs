//! texforge-parsers
//!
//! Lightweight inspection of image container formats. Only what the export
//! pipeline needs is parsed; pixel data is never decoded here.
//!
//! # Supported Formats
//!
//! | Format | Extension | Description |
//! |--------|-----------|-------------|
//! | PNG    | `.png`    | Chunk walk for alpha / transparency detection |
//!
//! # Example
//!
//! ```rust,ignore
//! use texforge_parsers::{PngParser, Parser};
//!
//! let info = PngParser::new().parse_file("Icon.png".as_ref())?;
//! println!("alpha: {}", info.has_alpha());
//! ```

pub mod logging;
pub mod png;
pub mod traits;

// Re-export main types
pub use traits::{Parser, ParseError, ParseResult};

pub use png::{has_alpha, ChunkHeader, ColorType, PngAlphaInfo, PngChunkReader, PngParser};
