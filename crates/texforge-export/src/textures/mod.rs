//! Texture export
//!
//! Leaves first: the host image capability ([`HostImage`]) and its
//! `image`-crate backed adapter, the transactional [`ImageCodec`], alpha
//! classification, generated-image packing, and the [`TextureExporter`]
//! that drives them per image.

mod alpha;
mod codec;
mod exporter;
mod generated;
mod host;
mod inline;
mod settings;

pub use alpha::AlphaClassifier;
pub use codec::ImageCodec;
pub use exporter::{ExportOptions, TextureExporter, UsedData};
pub use generated::pack_generated_images;
pub use host::{HostImage, RasterImage, DEFAULT_JPEG_QUALITY};
pub use inline::{data_uri, file_to_data_uri, inline_small_entries, DEFAULT_INLINE_MAX_SIZE};
pub use settings::{find_settings, parse_lod_levels, resolve_lod_levels};

use std::path::PathBuf;

use texforge_core::SourceKind;
use texforge_parsers::ParseError;
use thiserror::Error;

/// Texture export errors
///
/// None of these are retried; any of them aborts the whole export.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Core(#[from] texforge_core::Error),

    /// PNG chunk walk failed; the message names the file
    #[error(transparent)]
    Png(#[from] ParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(
        "There are several textures with settings for image {image}: {first} and {second}. \
         Please remove settings from one of them"
    )]
    ConflictingSettings {
        image: String,
        first: String,
        second: String,
    },

    #[error("Invalid lod_levels on texture {texture}: {reason}")]
    InvalidLodLevels { texture: String, reason: String },

    #[error("Image {image} is a render result used as texture, please save it as image first")]
    RenderResult { image: String },

    #[error("Image source not supported: {image} source: {kind}")]
    UnsupportedSource { image: String, kind: SourceKind },

    #[error("Image not found: {image} path: {}", .path.display())]
    MissingFile { image: String, path: PathBuf },

    #[error("Destination path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Image {image} has no pixel data loaded")]
    NotLoaded { image: String },

    #[error("Image {image} is not packed")]
    NotPacked { image: String },
}

impl TextureError {
    /// Conflicting or unparsable texture settings
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            TextureError::ConflictingSettings { .. } | TextureError::InvalidLodLevels { .. }
        )
    }

    /// Source kinds the exporter refuses
    pub fn is_unsupported_source(&self) -> bool {
        matches!(
            self,
            TextureError::RenderResult { .. } | TextureError::UnsupportedSource { .. }
        )
    }
}

pub type TextureResult<T> = Result<T, TextureError>;
