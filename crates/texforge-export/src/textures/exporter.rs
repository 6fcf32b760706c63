//! Texture exporter
//!
//! Per image: resolve settings, pick the output format, then for every LOD
//! level plus the native size either copy the source, convert it, or write
//! a resized variant. Small outputs are inlined before the record is kept.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use texforge_core::{
    ExportedFormatEntry, FileFormat, ImageExportRecord, ImageSize, SourceKind, TextureRef,
};

use super::alpha::AlphaClassifier;
use super::codec::ImageCodec;
use super::generated::pack_generated_images;
use super::host::HostImage;
use super::inline::{file_to_data_uri, inline_small_entries, DEFAULT_INLINE_MAX_SIZE};
use super::settings::resolve_lod_levels;
use super::{TextureError, TextureResult};

/// Texture export options
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Legacy scene flag: copy sources as-is and skip alpha inspection
    pub skip_texture_conversion: bool,

    /// Outputs whose longer side is at most this many pixels are inlined
    pub inline_max_size: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            skip_texture_conversion: false,
            inline_max_size: DEFAULT_INLINE_MAX_SIZE,
        }
    }
}

/// Images referenced by a scene, and who references them
#[derive(Debug, Clone)]
pub struct UsedData<I> {
    /// In export order
    pub images: Vec<I>,
    /// Image name to the texture references using it
    pub image_users: HashMap<String, Vec<TextureRef>>,
}

impl<I: HostImage> UsedData<I> {
    pub fn new(images: Vec<I>) -> Self {
        Self {
            images,
            image_users: HashMap::new(),
        }
    }

    /// Register a texture reference to `image`
    pub fn add_user(&mut self, image: impl Into<String>, texture: TextureRef) {
        self.image_users.entry(image.into()).or_default().push(texture);
    }

    pub fn users(&self, image: &str) -> &[TextureRef] {
        self.image_users.get(image).map_or(&[], Vec::as_slice)
    }
}

/// Texture exporter
pub struct TextureExporter {
    options: ExportOptions,
    codec: ImageCodec,
}

impl TextureExporter {
    /// Create new exporter with default options
    pub fn new() -> Self {
        Self::with_options(ExportOptions::default())
    }

    /// Create exporter with custom options
    pub fn with_options(options: ExportOptions) -> Self {
        Self {
            options,
            codec: ImageCodec::new(),
        }
    }

    /// Use a specific codec (e.g. one with its own temporary directory)
    pub fn with_codec(mut self, codec: ImageCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Export every image in `used` into `dest`
    ///
    /// Returns one record per image, in input order. The first failure
    /// aborts the run; files already written for earlier images stay.
    pub fn export<I: HostImage>(
        &self,
        dest: &Path,
        used: &mut UsedData<I>,
    ) -> TextureResult<Vec<ImageExportRecord>> {
        prepare_destination(dest)?;

        let UsedData { images, image_users } = used;

        pack_generated_images(&self.codec, images)?;
        let classifier = AlphaClassifier::new(&self.codec, self.options.skip_texture_conversion);
        let non_alpha = classifier.non_alpha_images(images)?;

        let mut records = Vec::with_capacity(images.len());
        for image in images.iter_mut() {
            let users = image_users.get(image.name()).map_or(&[][..], Vec::as_slice);
            let uses_alpha = !non_alpha.contains(image.name());
            records.push(self.export_image(dest, image, users, uses_alpha)?);
        }

        tracing::info!(images = records.len(), dest = %dest.display(), "Texture export complete");
        Ok(records)
    }

    fn export_image<I: HostImage>(
        &self,
        dest: &Path,
        image: &mut I,
        users: &[TextureRef],
        uses_alpha: bool,
    ) -> TextureResult<ImageExportRecord> {
        if image.source() == SourceKind::Viewer {
            return Err(TextureError::RenderResult {
                image: image.name().to_string(),
            });
        }

        let lod_levels = resolve_lod_levels(image.name(), users)?;

        tracing::info!(image = %image.name(), users = users.len(), "Exporting image");
        if uses_alpha {
            tracing::info!(image = %image.name(), "Image is using alpha channel");
        }
        if !lod_levels.is_empty() {
            tracing::info!(image = %image.name(), levels = ?lod_levels, "Image has lod_levels");
        }

        let mut record = ImageExportRecord::new(image.name());
        // embedded bytes win over whatever sits at the label path
        let path_exists = !image.is_packed() && image.filepath().is_file();

        match image.source() {
            SourceKind::File => {
                if !path_exists && !image.is_packed() {
                    return Err(TextureError::MissingFile {
                        image: image.name().to_string(),
                        path: image.filepath().to_path_buf(),
                    });
                }
                let out_format = if uses_alpha { FileFormat::Png } else { FileFormat::Jpeg };
                self.export_file_image(
                    dest,
                    image,
                    &lod_levels,
                    &out_format,
                    path_exists,
                    &mut record,
                )?;
            }
            SourceKind::Movie if path_exists => {
                copy_movie(dest, image, &mut record)?;
            }
            kind => {
                return Err(TextureError::UnsupportedSource {
                    image: image.name().to_string(),
                    kind,
                });
            }
        }

        let inlined = inline_small_entries(&mut record, dest, self.options.inline_max_size)?;
        if inlined > 0 {
            tracing::debug!(image = %record.name, inlined, "Embedded small outputs");
        }

        Ok(record)
    }

    fn export_file_image<I: HostImage>(
        &self,
        dest: &Path,
        image: &mut I,
        lod_levels: &[ImageSize],
        out_format: &FileFormat,
        path_exists: bool,
        record: &mut ImageExportRecord,
    ) -> TextureResult<()> {
        let out_ext = out_format.extension();
        let levels = lod_levels.iter().copied().map(Some).chain(std::iter::once(None));

        for level in levels {
            image.set_exported_extension(&out_ext);

            match level {
                Some(size) => {
                    let file_name =
                        format!("{}-{}x{}.{}", image.name(), size.width, size.height, out_ext);
                    let path = dest.join(&file_name);

                    let mut resized = self.codec.resize_copy(image, size)?;
                    let saved = self.codec.save(&mut resized, &path, out_format);
                    resized.release();
                    saved?;

                    let data_uri = file_to_data_uri(&path, &out_format.key())?;
                    let file_size = file_size(&path)?;
                    fs::remove_file(&path)?;
                    record.push(
                        out_format,
                        ExportedFormatEntry::embedded(size, file_size, data_uri),
                    );

                    tracing::info!(
                        image = %image.name(),
                        %size,
                        format = %out_format,
                        "Image resized and embedded"
                    );
                }
                None if path_exists
                    && (image.file_format() == out_format
                        || self.options.skip_texture_conversion) =>
                {
                    let source_ext =
                        source_extension(image.filepath()).unwrap_or_else(|| out_ext.clone());
                    let ext = if self.options.skip_texture_conversion {
                        &source_ext
                    } else {
                        &out_ext
                    };
                    let file_name = format!("{}.{}", image.name(), ext);
                    let path = dest.join(&file_name);

                    fs::copy(image.filepath(), &path)?;
                    image.set_exported_extension(&source_ext);
                    record.push(
                        out_format,
                        ExportedFormatEntry::file(image.size(), file_size(&path)?, file_name),
                    );

                    tracing::info!(image = %image.name(), "Copied original image");
                }
                None => {
                    let file_name = format!("{}.{}", image.name(), out_ext);
                    let path = dest.join(&file_name);

                    self.codec.save(image, &path, out_format)?;
                    record.push(
                        out_format,
                        ExportedFormatEntry::file(image.size(), file_size(&path)?, file_name),
                    );

                    tracing::info!(image = %image.name(), format = %out_format, "Image exported");
                }
            }
        }

        Ok(())
    }
}

impl Default for TextureExporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Videos are copied verbatim under their stored format's key
fn copy_movie<I: HostImage>(
    dest: &Path,
    image: &mut I,
    record: &mut ImageExportRecord,
) -> TextureResult<()> {
    let format = image.file_format().clone();
    let ext = source_extension(image.filepath()).unwrap_or_else(|| format.extension());
    let file_name = format!("{}.{}", image.name(), ext);
    let path = dest.join(&file_name);

    fs::copy(image.filepath(), &path)?;
    image.set_exported_extension(&ext);
    let entry = ExportedFormatEntry::file(image.size(), file_size(&path)?, file_name);
    record.push(&format, entry);

    tracing::info!(image = %image.name(), "Copied original video");
    Ok(())
}

/// Create `dest` if missing; refuse anything that is not a directory
fn prepare_destination(dest: &Path) -> TextureResult<()> {
    if !dest.exists() {
        fs::create_dir_all(dest)?;
    } else if !dest.is_dir() {
        return Err(TextureError::NotADirectory(dest.to_path_buf()));
    }
    Ok(())
}

fn source_extension(path: &Path) -> Option<String> {
    path.extension().and_then(OsStr::to_str).map(str::to_string)
}

fn file_size(path: &Path) -> TextureResult<u64> {
    Ok(fs::metadata(path)?.len())
}
