//! JSON manifest export
//!
//! Writes the exported texture records, in export order, as the manifest
//! the engine loads alongside the texture files.

use serde_json::json;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use texforge_core::ImageExportRecord;
use thiserror::Error;

/// File name of the manifest inside the destination directory
pub const MANIFEST_FILE_NAME: &str = "textures.json";

/// JSON export errors
#[derive(Error, Debug)]
pub enum JsonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type JsonResult<T> = Result<T, JsonError>;

/// JSON export options
#[derive(Debug, Clone)]
pub struct JsonExportOptions {
    /// Use pretty-print formatting
    pub pretty: bool,

    /// Wrap the records with counts
    pub include_metadata: bool,
}

impl Default for JsonExportOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            include_metadata: false,
        }
    }
}

/// Texture manifest exporter
pub struct JsonExporter {
    options: JsonExportOptions,
}

impl JsonExporter {
    /// Create new exporter with default options
    pub fn new() -> Self {
        Self {
            options: JsonExportOptions::default(),
        }
    }

    /// Create exporter with custom options
    pub fn with_options(options: JsonExportOptions) -> Self {
        Self { options }
    }

    /// Manifest document for `records`
    ///
    /// A bare array unless metadata is requested.
    pub fn to_value(&self, records: &[ImageExportRecord]) -> JsonResult<serde_json::Value> {
        let list = serde_json::to_value(records)?;
        if !self.options.include_metadata {
            return Ok(list);
        }

        let entries: usize = records.iter().map(ImageExportRecord::entry_count).sum();
        let embedded = records
            .iter()
            .flat_map(|record| record.formats.values().flatten())
            .filter(|entry| entry.data_uri().is_some())
            .count();

        Ok(json!({
            "metadata": {
                "image_count": records.len(),
                "entry_count": entries,
                "embedded_count": embedded,
            },
            "images": list,
        }))
    }

    /// Write the manifest to `output_path`
    pub fn export_records(
        &self,
        records: &[ImageExportRecord],
        output_path: impl AsRef<Path>,
    ) -> JsonResult<()> {
        let output_path = output_path.as_ref();
        let value = self.to_value(records)?;
        let file = File::create(output_path)?;
        self.write_json(&value, BufWriter::new(file))?;
        tracing::debug!(
            path = %output_path.display(),
            records = records.len(),
            "Wrote texture manifest"
        );
        Ok(())
    }

    /// Write the manifest as `textures.json` inside `dest`
    pub fn export_to_dir(
        &self,
        records: &[ImageExportRecord],
        dest: impl AsRef<Path>,
    ) -> JsonResult<()> {
        self.export_records(records, dest.as_ref().join(MANIFEST_FILE_NAME))
    }

    /// Write the manifest to any writer (stdout in the CLI)
    pub fn export_to_writer<W: Write>(
        &self,
        records: &[ImageExportRecord],
        writer: W,
    ) -> JsonResult<()> {
        let value = self.to_value(records)?;
        self.write_json(&value, writer)
    }

    fn write_json<W: Write>(&self, value: &serde_json::Value, mut writer: W) -> JsonResult<()> {
        if self.options.pretty {
            serde_json::to_writer_pretty(&mut writer, value)?;
        } else {
            serde_json::to_writer(&mut writer, value)?;
        }
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}

impl Default for JsonExporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use texforge_core::{ExportedFormatEntry, FileFormat, ImageSize};

    fn wood() -> ImageExportRecord {
        let mut record = ImageExportRecord::new("Wood");
        let lod = ImageSize::square(64);
        record.push(
            &FileFormat::Jpeg,
            ExportedFormatEntry::embedded(lod, 100, "data:image/jpeg;base64,AAAA"),
        );
        let full = ExportedFormatEntry::file(ImageSize::square(512), 9000, "Wood.jpg");
        record.push(&FileFormat::Jpeg, full);
        record
    }

    #[test]
    fn test_bare_array() {
        let value = JsonExporter::new().to_value(&[wood()]).unwrap();
        let list = value.as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["type"], "TEXTURE");
        assert_eq!(list[0]["formats"]["jpeg"][1]["file_name"], "Wood.jpg");
        assert!(list[0]["formats"]["jpeg"][0].get("file_name").is_none());
    }

    #[test]
    fn test_metadata_counts() {
        let exporter = JsonExporter::with_options(JsonExportOptions {
            include_metadata: true,
            ..Default::default()
        });
        let value = exporter.to_value(&[wood(), ImageExportRecord::new("Empty")]).unwrap();
        assert_eq!(value["metadata"]["image_count"], 2);
        assert_eq!(value["metadata"]["entry_count"], 2);
        assert_eq!(value["metadata"]["embedded_count"], 1);
        assert_eq!(value["images"][1]["name"], "Empty");
    }

    #[test]
    fn test_pretty_vs_compact() {
        let mut pretty = Vec::new();
        JsonExporter::new().export_to_writer(&[wood()], &mut pretty).unwrap();

        let mut compact = Vec::new();
        JsonExporter::with_options(JsonExportOptions {
            pretty: false,
            ..Default::default()
        })
        .export_to_writer(&[wood()], &mut compact)
        .unwrap();

        assert!(pretty.len() > compact.len());
        assert_eq!(compact.iter().filter(|&&b| b == b'\n').count(), 1);
        let a: serde_json::Value = serde_json::from_slice(&pretty).unwrap();
        let b: serde_json::Value = serde_json::from_slice(&compact).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_export_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        JsonExporter::new().export_to_dir(&[wood()], dir.path()).unwrap();

        let text = std::fs::read_to_string(dir.path().join(MANIFEST_FILE_NAME)).unwrap();
        let records: Vec<ImageExportRecord> = serde_json::from_str(&text).unwrap();
        assert_eq!(records, vec![wood()]);
    }
}
