//! Core traits defining the parser interface for inspected file formats.

use std::io::{Read, Seek};
use std::path::Path;

use thiserror::Error;

/// Errors that can occur during parsing operations
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid magic bytes: expected {expected:?}, found {found:?}")]
    InvalidMagic { expected: Vec<u8>, found: Vec<u8> },

    #[error("Corrupted data at offset {offset}: {message}")]
    CorruptedData { offset: u64, message: String },

    #[error("{context}: {source}")]
    Nested {
        context: String,
        #[source]
        source: Box<ParseError>,
    },
}

impl ParseError {
    /// Wrap this error with additional context
    #[must_use]
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ParseError::Nested {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;

/// Core trait for all file format parsers
pub trait Parser: Send + Sync {
    /// The parsed output type
    type Output: Send + Sync;

    /// Returns the file extensions this parser handles (e.g., ["png"])
    fn extensions(&self) -> &[&str];

    /// Returns a human-readable name for this parser
    fn name(&self) -> &str;

    /// Parse from a reader
    fn parse<R: Read + Seek>(&self, reader: R) -> ParseResult<Self::Output>;

    /// Parse from a file path
    fn parse_file(&self, path: &Path) -> ParseResult<Self::Output> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        self.parse(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_context_message() {
        let err = ParseError::CorruptedData {
            offset: 16,
            message: "IHDR too short".into(),
        }
        .with_context("Couldn't read PNG file a.png");
        let message = err.to_string();
        assert!(message.starts_with("Couldn't read PNG file a.png"));
        assert!(message.contains("IHDR too short"));
    }
}
