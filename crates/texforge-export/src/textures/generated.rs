//! Packing of generated images
//!
//! Generated (or rendered) images have no source file. Before anything else
//! runs they are saved as PNG, embedded from that file, and from then on
//! handled like any other embedded file image.

use texforge_core::{FileFormat, SourceKind};

use super::codec::ImageCodec;
use super::host::HostImage;
use super::TextureResult;

/// Embed every generated image as PNG; returns how many were packed
pub fn pack_generated_images<I: HostImage>(
    codec: &ImageCodec,
    images: &mut [I],
) -> TextureResult<usize> {
    let mut packed = 0;

    for image in images.iter_mut().filter(|image| image.source() == SourceKind::Generated) {
        tracing::info!(image = %image.name(), "Generated image will be packed as png");

        let old_path = image.filepath().to_path_buf();
        let old_format = image.file_format().clone();

        let temp = codec.temp_file(image.name(), "png")?;
        codec.save(image, &temp, &FileFormat::Png)?;

        image.set_filepath(&temp);
        image.set_file_format(FileFormat::Png);
        let embedded = image.pack();
        image.set_filepath(&old_path);
        if embedded.is_err() {
            image.set_file_format(old_format);
        }
        let cleaned = temp.close();

        embedded?;
        cleaned?;
        image.set_source(SourceKind::File);
        packed += 1;
    }

    Ok(packed)
}
