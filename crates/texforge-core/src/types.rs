//! Common types used across texforge
//!
//! The scene side (images, texture references) and the export side
//! (per-format entries, one record per image) of the texture pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Where an image's pixels come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceKind {
    /// Backed by a file on disk, or embedded in the scene
    File,
    /// Procedurally generated or rendered, no source file
    Generated,
    /// A video file
    Movie,
    /// A live render result
    Viewer,
}

impl SourceKind {
    /// Name as used in scene manifests and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::File => "FILE",
            SourceKind::Generated => "GENERATED",
            SourceKind::Movie => "MOVIE",
            SourceKind::Viewer => "VIEWER",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "FILE" => Ok(SourceKind::File),
            "GENERATED" => Ok(SourceKind::Generated),
            "MOVIE" => Ok(SourceKind::Movie),
            "VIEWER" => Ok(SourceKind::Viewer),
            _ => Err(Error::UnknownSource {
                source_kind: s.to_string(),
            }),
        }
    }
}

/// Stored encoding of an image
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FileFormat {
    Png,
    Jpeg,
    Tiff,
    Targa,
    Bmp,
    Webp,
    Hdr,
    OpenExr,
    /// Anything the pipeline only ever copies (movie containers and the like)
    Other(String),
}

impl FileFormat {
    /// Upper-case format name (`"PNG"`, `"JPEG"`, ...)
    pub fn name(&self) -> &str {
        match self {
            FileFormat::Png => "PNG",
            FileFormat::Jpeg => "JPEG",
            FileFormat::Tiff => "TIFF",
            FileFormat::Targa => "TARGA",
            FileFormat::Bmp => "BMP",
            FileFormat::Webp => "WEBP",
            FileFormat::Hdr => "HDR",
            FileFormat::OpenExr => "OPEN_EXR",
            FileFormat::Other(name) => name,
        }
    }

    /// Key used in the `formats` map of an export record
    pub fn key(&self) -> String {
        self.name().to_lowercase()
    }

    /// File extension written for this format
    pub fn extension(&self) -> String {
        match self {
            FileFormat::Jpeg => "jpg".to_string(),
            FileFormat::Tiff => "tif".to_string(),
            FileFormat::Targa => "tga".to_string(),
            FileFormat::OpenExr => "exr".to_string(),
            other => other.name().to_lowercase(),
        }
    }

    /// Guess the format from a file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "png" => FileFormat::Png,
            "jpg" | "jpeg" => FileFormat::Jpeg,
            "tif" | "tiff" => FileFormat::Tiff,
            "tga" => FileFormat::Targa,
            "bmp" => FileFormat::Bmp,
            "webp" => FileFormat::Webp,
            "hdr" => FileFormat::Hdr,
            "exr" => FileFormat::OpenExr,
            other => FileFormat::Other(other.to_uppercase()),
        }
    }

    /// Formats that cannot store an alpha channel
    pub fn is_alpha_incapable(&self) -> bool {
        matches!(self, FileFormat::Jpeg | FileFormat::Tiff)
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FileFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        Ok(match upper.as_str() {
            "" => return Err(Error::invalid_data("empty image format name")),
            "PNG" => FileFormat::Png,
            "JPEG" | "JPG" => FileFormat::Jpeg,
            "TIFF" => FileFormat::Tiff,
            "TARGA" => FileFormat::Targa,
            "BMP" => FileFormat::Bmp,
            "WEBP" => FileFormat::Webp,
            "HDR" => FileFormat::Hdr,
            "OPEN_EXR" => FileFormat::OpenExr,
            _ => FileFormat::Other(upper),
        })
    }
}

impl TryFrom<String> for FileFormat {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FileFormat> for String {
    fn from(value: FileFormat) -> Self {
        value.name().to_string()
    }
}

/// Pixel dimensions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn square(side: u32) -> Self {
        Self::new(side, side)
    }

    /// Longer of the two sides
    pub fn max_dimension(&self) -> u32 {
        self.width.max(self.height)
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<(u32, u32)> for ImageSize {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

/// One requested level of detail
///
/// A bare integer is a square; a two element array is `[width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LodLevel {
    Square(u32),
    Rect(u32, u32),
}

impl LodLevel {
    pub fn size(&self) -> ImageSize {
        match *self {
            LodLevel::Square(side) => ImageSize::square(side),
            LodLevel::Rect(width, height) => ImageSize::new(width, height),
        }
    }
}

/// The `lod_levels` setting as found on a texture reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LodSetting {
    /// Native sequence
    Levels(Vec<LodLevel>),
    /// JSON-encoded sequence, e.g. `"[64, [128, 256]]"`
    Encoded(String),
}

/// A texture-like object referencing an image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lod_levels: Option<LodSetting>,
}

impl TextureRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lod_levels: None,
        }
    }

    pub fn with_lod_levels(mut self, setting: LodSetting) -> Self {
        self.lod_levels = Some(setting);
        self
    }

    pub fn has_lod_levels(&self) -> bool {
        self.lod_levels.is_some()
    }
}

/// Where an exported artifact lives: exactly one of a file or a data URI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryLocation {
    File { file_name: String },
    Embedded { data_uri: String },
}

/// One produced raster in one format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedFormatEntry {
    pub width: u32,
    pub height: u32,
    pub file_size: u64,
    #[serde(flatten)]
    pub location: EntryLocation,
}

impl ExportedFormatEntry {
    pub fn file(size: ImageSize, file_size: u64, file_name: impl Into<String>) -> Self {
        Self {
            width: size.width,
            height: size.height,
            file_size,
            location: EntryLocation::File {
                file_name: file_name.into(),
            },
        }
    }

    pub fn embedded(size: ImageSize, file_size: u64, data_uri: impl Into<String>) -> Self {
        Self {
            width: size.width,
            height: size.height,
            file_size,
            location: EntryLocation::Embedded {
                data_uri: data_uri.into(),
            },
        }
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width, self.height)
    }

    pub fn file_name(&self) -> Option<&str> {
        match &self.location {
            EntryLocation::File { file_name } => Some(file_name),
            EntryLocation::Embedded { .. } => None,
        }
    }

    pub fn data_uri(&self) -> Option<&str> {
        match &self.location {
            EntryLocation::Embedded { data_uri } => Some(data_uri),
            EntryLocation::File { .. } => None,
        }
    }
}

/// Type tag of an export record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordKind {
    #[default]
    Texture,
}

/// Description of everything exported for one image
///
/// `wrap`, `filter` and `use_mipmap` are always `null` here; the material
/// exporter fills them in downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageExportRecord {
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub name: String,
    /// Lower-cased format name to entries, low to high quality
    pub formats: BTreeMap<String, Vec<ExportedFormatEntry>>,
    pub wrap: Option<String>,
    pub filter: Option<String>,
    pub use_mipmap: Option<bool>,
}

impl ImageExportRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            kind: RecordKind::Texture,
            name: name.into(),
            formats: BTreeMap::new(),
            wrap: None,
            filter: None,
            use_mipmap: None,
        }
    }

    /// Append an entry under the given format's key
    pub fn push(&mut self, format: &FileFormat, entry: ExportedFormatEntry) {
        self.formats.entry(format.key()).or_default().push(entry);
    }

    /// Entries for one format key, empty if none
    pub fn entries(&self, key: &str) -> &[ExportedFormatEntry] {
        self.formats.get(key).map_or(&[], Vec::as_slice)
    }

    pub fn entry_count(&self) -> usize {
        self.formats.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_extensions() {
        assert_eq!(FileFormat::Jpeg.extension(), "jpg");
        assert_eq!(FileFormat::Tiff.extension(), "tif");
        assert_eq!(FileFormat::Targa.extension(), "tga");
        assert_eq!(FileFormat::Png.extension(), "png");
        assert_eq!(FileFormat::Other("FFMPEG".into()).extension(), "ffmpeg");
    }

    #[test]
    fn test_format_parse_and_key() {
        assert_eq!("jpeg".parse::<FileFormat>().unwrap(), FileFormat::Jpeg);
        assert_eq!("PNG".parse::<FileFormat>().unwrap(), FileFormat::Png);
        assert_eq!(FileFormat::Jpeg.key(), "jpeg");
        assert!("".parse::<FileFormat>().is_err());
        assert_eq!(FileFormat::from_extension("MP4"), FileFormat::Other("MP4".into()));
    }

    #[test]
    fn test_source_kind_roundtrip() {
        assert_eq!("viewer".parse::<SourceKind>().unwrap(), SourceKind::Viewer);
        assert!("SEQUENCE".parse::<SourceKind>().is_err());
        assert_eq!(serde_json::to_value(SourceKind::Generated).unwrap(), json!("GENERATED"));
    }

    #[test]
    fn test_lod_setting_accepts_both_shapes() {
        let native: LodSetting = serde_json::from_value(json!([64, [128, 32]])).unwrap();
        assert_eq!(
            native,
            LodSetting::Levels(vec![LodLevel::Square(64), LodLevel::Rect(128, 32)])
        );

        let encoded: LodSetting = serde_json::from_value(json!("[64]")).unwrap();
        assert_eq!(encoded, LodSetting::Encoded("[64]".into()));
    }

    #[test]
    fn test_entry_serializes_exactly_one_location() {
        let entry = ExportedFormatEntry::file(ImageSize::square(512), 1234, "Wood.jpg");
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            value,
            json!({"width": 512, "height": 512, "file_size": 1234, "file_name": "Wood.jpg"})
        );

        let entry =
            ExportedFormatEntry::embedded(ImageSize::square(16), 99, "data:image/png;base64,AA");
        let value = serde_json::to_value(&entry).unwrap();
        assert!(value.get("file_name").is_none());
        assert_eq!(value["data_uri"], "data:image/png;base64,AA");
    }

    #[test]
    fn test_record_shape() {
        let mut record = ImageExportRecord::new("Wood");
        record.push(
            &FileFormat::Jpeg,
            ExportedFormatEntry::file(ImageSize::square(512), 10, "Wood.jpg"),
        );

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["type"], "TEXTURE");
        assert_eq!(value["name"], "Wood");
        assert!(value["wrap"].is_null());
        assert!(value["filter"].is_null());
        assert!(value["use_mipmap"].is_null());
        assert_eq!(value["formats"]["jpeg"][0]["file_name"], "Wood.jpg");
        assert_eq!(record.entry_count(), 1);
        assert!(record.entries("png").is_empty());
    }
}
