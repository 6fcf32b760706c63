//! texforge Export Pipeline
//!
//! Turns the images referenced by a scene into engine-ready texture assets:
//! - format selection (JPEG, or PNG when the image needs alpha)
//! - LOD variants, embedded as data URIs
//! - byte-for-byte copies when no conversion is needed
//! - inlining of small outputs
//! - JSON description of every exported artifact

pub mod json;
pub mod scene;
pub mod textures;

pub use json::{JsonExportOptions, JsonExporter};
pub use scene::{GeneratedFill, ImageSpec, SceneManifest};
pub use textures::{
    AlphaClassifier, ExportOptions, HostImage, ImageCodec, RasterImage, TextureError,
    TextureExporter, TextureResult, UsedData,
};
