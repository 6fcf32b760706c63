//! Transactional save/resize over a [`HostImage`]
//!
//! Saving redirects the image's path and format, so every exit path puts
//! them back. Embedded images are unpacked to a temporary file first and
//! re-embedded from it afterwards.

use std::path::{Path, PathBuf};

use tempfile::TempPath;
use texforge_core::{FileFormat, ImageSize};

use super::host::HostImage;
use super::TextureResult;

/// Loads, resizes and saves host images
#[derive(Debug, Clone)]
pub struct ImageCodec {
    temp_dir: PathBuf,
}

impl ImageCodec {
    /// Codec using the process temporary directory
    pub fn new() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
        }
    }

    /// Codec placing its temporary files in `dir`
    pub fn with_temp_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            temp_dir: dir.into(),
        }
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Reserve a process-unique temporary file; it is deleted when dropped
    pub fn temp_file(&self, stem: &str, extension: &str) -> TextureResult<TempPath> {
        let file = tempfile::Builder::new()
            .prefix(&format!("{}-", sanitize(stem)))
            .suffix(&format!(".{extension}"))
            .tempfile_in(&self.temp_dir)?;
        Ok(file.into_temp_path())
    }

    /// Encode `image` to `destination` as `format`
    ///
    /// On return, success or not, the image has its original path, format
    /// and embedded state.
    pub fn save<I: HostImage>(
        &self,
        image: &mut I,
        destination: &Path,
        format: &FileFormat,
    ) -> TextureResult<()> {
        let old_path = image.filepath().to_path_buf();
        let old_format = image.file_format().clone();

        let unpacked = if image.is_packed() {
            let temp = self.temp_file(image.name(), &old_format.extension())?;
            image.set_filepath(&temp);
            if let Err(e) = image.unpack_original() {
                image.set_filepath(&old_path);
                return Err(e);
            }
            tracing::debug!(
                image = %image.name(),
                temp = %temp.display(),
                "Unpacked for conversion"
            );
            Some(temp)
        } else {
            None
        };

        let saved = Self::save_as(image, destination, format);

        image.set_file_format(old_format);
        let repacked = match &unpacked {
            Some(temp) => {
                image.set_filepath(temp);
                image.pack()
            }
            None => Ok(()),
        };
        image.set_filepath(&old_path);
        let cleaned = unpacked.map_or(Ok(()), TempPath::close);

        saved?;
        repacked?;
        cleaned?;
        Ok(())
    }

    fn save_as<I: HostImage>(
        image: &mut I,
        destination: &Path,
        format: &FileFormat,
    ) -> TextureResult<()> {
        // pixels must be resident before the path stops pointing at the source
        image.ensure_loaded()?;
        image.set_filepath(destination);
        image.set_file_format(format.clone());
        image.save()
    }

    /// Independent duplicate of `image` scaled to `size`
    ///
    /// The caller releases it once its output has been captured.
    pub fn resize_copy<I: HostImage>(&self, image: &mut I, size: ImageSize) -> TextureResult<I> {
        tracing::debug!(image = %image.name(), %size, "Resizing copy");
        image.resized_copy(size)
    }
}

impl Default for ImageCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn sanitize(stem: &str) -> String {
    stem.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
