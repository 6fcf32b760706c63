//! Host image capability
//!
//! The exporter never owns scene images; it reads them and transiently
//! redirects their path and format through this trait. [`RasterImage`] is
//! the in-process implementation backed by the `image` crate.

use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use texforge_core::{FileFormat, ImageSize, SourceKind};

use super::{TextureError, TextureResult};

/// JPEG quality used when none is configured
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Operations the export pipeline needs from a scene image
pub trait HostImage {
    /// Unique name within one export run
    fn name(&self) -> &str;

    fn source(&self) -> SourceKind;

    fn set_source(&mut self, source: SourceKind);

    /// Current file path; empty when the image has none
    fn filepath(&self) -> &Path;

    fn set_filepath(&mut self, path: &Path);

    /// Stored (on-disk or embedded) encoding
    fn file_format(&self) -> &FileFormat;

    fn set_file_format(&mut self, format: FileFormat);

    /// Whether the encoded bytes are embedded in the scene
    fn is_packed(&self) -> bool;

    /// Write the embedded bytes, unchanged, to the current file path and
    /// stop treating the image as embedded
    fn unpack_original(&mut self) -> TextureResult<()>;

    /// Embed the file at the current file path
    fn pack(&mut self) -> TextureResult<()>;

    /// Make sure decoded pixels are resident
    fn ensure_loaded(&mut self) -> TextureResult<()>;

    /// Encode the resident pixels to the current path in the current format
    fn save(&mut self) -> TextureResult<()>;

    /// Independent duplicate scaled to `size`
    fn resized_copy(&mut self, size: ImageSize) -> TextureResult<Self>
    where
        Self: Sized;

    /// Reclaim a transient duplicate
    fn release(self)
    where
        Self: Sized,
    {
    }

    /// Declared alpha usage
    fn use_alpha(&self) -> bool;

    /// Known pixel dimensions
    fn size(&self) -> ImageSize;

    /// Extension the image was last exported with
    fn exported_extension(&self) -> Option<&str>;

    fn set_exported_extension(&mut self, extension: &str);
}

/// Scene image held in memory
#[derive(Debug, Clone)]
pub struct RasterImage {
    name: String,
    source: SourceKind,
    filepath: PathBuf,
    file_format: FileFormat,
    packed: Option<Vec<u8>>,
    pixels: Option<DynamicImage>,
    size: ImageSize,
    use_alpha: bool,
    jpeg_quality: u8,
    exported_extension: Option<String>,
}

impl RasterImage {
    fn bare(
        name: impl Into<String>,
        source: SourceKind,
        filepath: PathBuf,
        file_format: FileFormat,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            filepath,
            file_format,
            packed: None,
            pixels: None,
            size: ImageSize::default(),
            use_alpha: true,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            exported_extension: None,
        }
    }

    /// File-backed image
    ///
    /// When the file exists its format is sniffed from the content, falling
    /// back to the extension, and its dimensions are read from the header.
    pub fn from_file(name: impl Into<String>, path: impl Into<PathBuf>) -> TextureResult<Self> {
        let path = path.into();
        let mut format = format_from_path(&path);
        let mut size = ImageSize::default();

        if path.is_file() {
            let reader = ImageReader::open(&path)?.with_guessed_format()?;
            if let Some(guessed) = reader.format() {
                format = file_format_from_image(guessed);
            }
            let (width, height) = reader.into_dimensions()?;
            size = ImageSize::new(width, height);
        }

        let mut image = Self::bare(name, SourceKind::File, path, format);
        image.size = size;
        Ok(image)
    }

    /// Image embedded in the scene; `label` is the path it was packed from
    pub fn packed(
        name: impl Into<String>,
        label: impl Into<PathBuf>,
        bytes: Vec<u8>,
    ) -> TextureResult<Self> {
        let reader = ImageReader::new(Cursor::new(bytes.as_slice())).with_guessed_format()?;
        let format = reader
            .format()
            .map_or(FileFormat::Png, file_format_from_image);
        let (width, height) = reader.into_dimensions()?;

        let mut image = Self::bare(name, SourceKind::File, label.into(), format);
        image.size = ImageSize::new(width, height);
        image.packed = Some(bytes);
        Ok(image)
    }

    /// Procedurally generated image with no source file
    pub fn generated(name: impl Into<String>, pixels: DynamicImage) -> Self {
        let mut image = Self::bare(name, SourceKind::Generated, PathBuf::new(), FileFormat::Png);
        image.size = ImageSize::new(pixels.width(), pixels.height());
        image.pixels = Some(pixels);
        image
    }

    /// Video file; only ever copied, so dimensions are taken as given
    pub fn movie(name: impl Into<String>, path: impl Into<PathBuf>, size: ImageSize) -> Self {
        let path = path.into();
        let format = format_from_path(&path);
        let mut image = Self::bare(name, SourceKind::Movie, path, format);
        image.size = size;
        image
    }

    /// Live render result
    pub fn viewer(name: impl Into<String>) -> Self {
        Self::bare(name, SourceKind::Viewer, PathBuf::new(), FileFormat::Png)
    }

    pub fn with_use_alpha(mut self, use_alpha: bool) -> Self {
        self.use_alpha = use_alpha;
        self
    }

    pub fn with_file_format(mut self, format: FileFormat) -> Self {
        self.file_format = format;
        self
    }

    pub fn with_size(mut self, size: ImageSize) -> Self {
        self.size = size;
        self
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Embedded bytes, if packed
    pub fn packed_bytes(&self) -> Option<&[u8]> {
        self.packed.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.pixels.is_some()
    }
}

impl HostImage for RasterImage {
    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> SourceKind {
        self.source
    }

    fn set_source(&mut self, source: SourceKind) {
        self.source = source;
    }

    fn filepath(&self) -> &Path {
        &self.filepath
    }

    fn set_filepath(&mut self, path: &Path) {
        self.filepath = path.to_path_buf();
    }

    fn file_format(&self) -> &FileFormat {
        &self.file_format
    }

    fn set_file_format(&mut self, format: FileFormat) {
        self.file_format = format;
    }

    fn is_packed(&self) -> bool {
        self.packed.is_some()
    }

    fn unpack_original(&mut self) -> TextureResult<()> {
        let bytes = self.packed.as_ref().ok_or_else(|| TextureError::NotPacked {
            image: self.name.clone(),
        })?;
        fs::write(&self.filepath, bytes)?;
        self.packed = None;
        Ok(())
    }

    fn pack(&mut self) -> TextureResult<()> {
        self.packed = Some(fs::read(&self.filepath)?);
        Ok(())
    }

    fn ensure_loaded(&mut self) -> TextureResult<()> {
        if self.pixels.is_some() {
            return Ok(());
        }

        let pixels = match &self.packed {
            Some(bytes) => image::load_from_memory(bytes)?,
            None => ImageReader::open(&self.filepath)?.with_guessed_format()?.decode()?,
        };
        self.size = ImageSize::new(pixels.width(), pixels.height());
        self.pixels = Some(pixels);
        Ok(())
    }

    fn save(&mut self) -> TextureResult<()> {
        let pixels = self.pixels.as_ref().ok_or_else(|| TextureError::NotLoaded {
            image: self.name.clone(),
        })?;

        match &self.file_format {
            FileFormat::Jpeg => {
                let mut writer = BufWriter::new(File::create(&self.filepath)?);
                JpegEncoder::new_with_quality(&mut writer, self.jpeg_quality)
                    .encode_image(&pixels.to_rgb8())?;
                writer.flush()?;
            }
            FileFormat::Png => {
                // 8 bits per channel, keeping alpha only if the buffer has it
                let normalized = if pixels.color().has_alpha() {
                    DynamicImage::ImageRgba8(pixels.to_rgba8())
                } else {
                    DynamicImage::ImageRgb8(pixels.to_rgb8())
                };
                normalized.save_with_format(&self.filepath, image::ImageFormat::Png)?;
            }
            other => {
                let format = image_format(other)?;
                pixels.save_with_format(&self.filepath, format)?;
            }
        }

        tracing::trace!(
            image = %self.name,
            path = %self.filepath.display(),
            format = %self.file_format,
            "Saved image"
        );
        Ok(())
    }

    fn resized_copy(&mut self, size: ImageSize) -> TextureResult<Self> {
        self.ensure_loaded()?;
        let pixels = self.pixels.as_ref().ok_or_else(|| TextureError::NotLoaded {
            image: self.name.clone(),
        })?;

        let resized = pixels.resize_exact(size.width, size.height, FilterType::CatmullRom);

        let mut copy = Self::bare(
            format!("{}-{}", self.name, size),
            self.source,
            self.filepath.clone(),
            self.file_format.clone(),
        );
        copy.size = size;
        copy.pixels = Some(resized);
        copy.use_alpha = self.use_alpha;
        copy.jpeg_quality = self.jpeg_quality;
        Ok(copy)
    }

    fn use_alpha(&self) -> bool {
        self.use_alpha
    }

    fn size(&self) -> ImageSize {
        self.size
    }

    fn exported_extension(&self) -> Option<&str> {
        self.exported_extension.as_deref()
    }

    fn set_exported_extension(&mut self, extension: &str) {
        self.exported_extension = Some(extension.to_string());
    }
}

fn format_from_path(path: &Path) -> FileFormat {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(FileFormat::Png, FileFormat::from_extension)
}

fn file_format_from_image(format: image::ImageFormat) -> FileFormat {
    match format {
        image::ImageFormat::Png => FileFormat::Png,
        image::ImageFormat::Jpeg => FileFormat::Jpeg,
        image::ImageFormat::Tiff => FileFormat::Tiff,
        image::ImageFormat::Tga => FileFormat::Targa,
        image::ImageFormat::Bmp => FileFormat::Bmp,
        image::ImageFormat::WebP => FileFormat::Webp,
        image::ImageFormat::Hdr => FileFormat::Hdr,
        image::ImageFormat::OpenExr => FileFormat::OpenExr,
        other => FileFormat::Other(format!("{other:?}").to_uppercase()),
    }
}

/// Encoder for a stored format, if the `image` crate can write it
fn image_format(format: &FileFormat) -> TextureResult<image::ImageFormat> {
    Ok(match format {
        FileFormat::Png => image::ImageFormat::Png,
        FileFormat::Jpeg => image::ImageFormat::Jpeg,
        FileFormat::Tiff => image::ImageFormat::Tiff,
        FileFormat::Targa => image::ImageFormat::Tga,
        FileFormat::Bmp => image::ImageFormat::Bmp,
        FileFormat::Webp => image::ImageFormat::WebP,
        FileFormat::Hdr => image::ImageFormat::Hdr,
        FileFormat::OpenExr => image::ImageFormat::OpenExr,
        FileFormat::Other(name) => return Err(TextureError::UnsupportedFormat(name.clone())),
    })
}
