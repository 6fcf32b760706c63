//! Alpha classification
//!
//! Decides, once per image, whether its colour data needs an alpha channel
//! in the export. Precedence:
//! 1. declared "does not use alpha" wins
//! 2. the legacy `skip_texture_conversion` flag trusts the declaration
//! 3. formats that cannot hold alpha (JPEG, TIFF) trust the declaration
//!    and so do movies and viewers, which are never decoded
//! 4. a PNG on disk is inspected directly
//! 5. anything else readable is rendered to a temporary PNG and inspected

use std::collections::HashSet;

use texforge_core::{FileFormat, SourceKind};
use texforge_parsers::png;

use super::codec::ImageCodec;
use super::host::HostImage;
use super::TextureResult;

/// Per-image alpha policy
pub struct AlphaClassifier<'a> {
    codec: &'a ImageCodec,
    skip_texture_conversion: bool,
}

impl<'a> AlphaClassifier<'a> {
    pub fn new(codec: &'a ImageCodec, skip_texture_conversion: bool) -> Self {
        Self {
            codec,
            skip_texture_conversion,
        }
    }

    /// Whether `image` needs an alpha channel when exported
    pub fn needs_alpha<I: HostImage>(&self, image: &mut I) -> TextureResult<bool> {
        if !image.use_alpha() {
            return Ok(false);
        }
        if self.skip_texture_conversion {
            return Ok(true);
        }
        if image.file_format().is_alpha_incapable() || image.source() != SourceKind::File {
            return Ok(true);
        }

        let path = image.filepath().to_path_buf();
        // embedded bytes win over whatever sits at the label path
        let on_disk = !image.is_packed() && path.is_file();

        if *image.file_format() == FileFormat::Png && on_disk {
            return Ok(png::has_alpha(&path)?);
        }

        if image.is_packed() || on_disk {
            let temp = self.codec.temp_file(image.name(), "png")?;
            self.codec.save(image, &temp, &FileFormat::Png)?;
            let alpha = png::has_alpha(&temp)?;
            temp.close()?;
            return Ok(alpha);
        }

        // nothing to inspect
        Ok(true)
    }

    /// Names of the images that do not need alpha
    pub fn non_alpha_images<I: HostImage>(
        &self,
        images: &mut [I],
    ) -> TextureResult<HashSet<String>> {
        let mut non_alpha = HashSet::new();
        for image in images.iter_mut() {
            if !self.needs_alpha(image)? {
                non_alpha.insert(image.name().to_string());
            }
        }
        Ok(non_alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::textures::RasterImage;
    use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;
    use std::path::Path;

    fn write_rgb_png(path: &Path) {
        RgbImage::from_pixel(4, 4, Rgb([1, 2, 3])).save(path).unwrap();
    }

    fn write_rgba_png(path: &Path) {
        RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 128])).save(path).unwrap();
    }

    #[test]
    fn test_declared_non_alpha_short_circuits() {
        let codec = ImageCodec::new();
        let mut image = RasterImage::from_file("x", "/does/not/matter.png")
            .unwrap()
            .with_use_alpha(false);
        assert!(!AlphaClassifier::new(&codec, false).needs_alpha(&mut image).unwrap());
        assert!(!AlphaClassifier::new(&codec, true).needs_alpha(&mut image).unwrap());
    }

    #[test]
    fn test_skip_conversion_trusts_declaration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opaque.png");
        write_rgb_png(&path);

        let codec = ImageCodec::with_temp_dir(dir.path());
        let mut image = RasterImage::from_file("opaque", &path).unwrap();
        assert!(AlphaClassifier::new(&codec, true).needs_alpha(&mut image).unwrap());
        assert!(!AlphaClassifier::new(&codec, false).needs_alpha(&mut image).unwrap());
    }

    #[test]
    fn test_alpha_incapable_formats_trust_declaration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        RgbImage::new(4, 4).save(&path).unwrap();

        let codec = ImageCodec::with_temp_dir(dir.path());
        let mut jpeg = RasterImage::from_file("photo", &path).unwrap();
        let mut tiff = RasterImage::from_file("scan", "/nowhere/scan.tif").unwrap();
        let classifier = AlphaClassifier::new(&codec, false);

        assert!(classifier.needs_alpha(&mut jpeg).unwrap());
        assert!(classifier.needs_alpha(&mut tiff).unwrap());
    }

    #[test]
    fn test_png_on_disk_is_inspected() {
        let dir = tempfile::tempdir().unwrap();
        let rgb = dir.path().join("rgb.png");
        let rgba = dir.path().join("rgba.png");
        write_rgb_png(&rgb);
        write_rgba_png(&rgba);

        let codec = ImageCodec::with_temp_dir(dir.path());
        let classifier = AlphaClassifier::new(&codec, false);
        let mut images = vec![
            RasterImage::from_file("rgb", &rgb).unwrap(),
            RasterImage::from_file("rgba", &rgba).unwrap(),
        ];

        let non_alpha = classifier.non_alpha_images(&mut images).unwrap();
        assert!(non_alpha.contains("rgb"));
        assert!(!non_alpha.contains("rgba"));
    }

    #[test]
    fn test_packed_image_goes_through_temp_png() {
        let scratch = tempfile::tempdir().unwrap();
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0])))
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let codec = ImageCodec::with_temp_dir(scratch.path());
        let mut image = RasterImage::packed("packed", "packed.png", bytes).unwrap();
        assert!(AlphaClassifier::new(&codec, false).needs_alpha(&mut image).unwrap());

        assert!(image.is_packed());
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_packed_bytes_win_over_label_file() {
        let dir = tempfile::tempdir().unwrap();
        let label = dir.path().join("label.png");
        write_rgba_png(&label);

        let mut opaque = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(2, 2))
            .write_to(&mut Cursor::new(&mut opaque), image::ImageFormat::Png)
            .unwrap();

        let scratch = tempfile::tempdir().unwrap();
        let codec = ImageCodec::with_temp_dir(scratch.path());
        let mut image = RasterImage::packed("packed", &label, opaque).unwrap();
        assert!(!AlphaClassifier::new(&codec, false).needs_alpha(&mut image).unwrap());
    }

    #[test]
    fn test_non_png_on_disk_goes_through_temp_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opaque.bmp");
        RgbImage::from_pixel(3, 3, Rgb([9, 9, 9])).save(&path).unwrap();

        let scratch = tempfile::tempdir().unwrap();
        let codec = ImageCodec::with_temp_dir(scratch.path());
        let mut image = RasterImage::from_file("opaque", &path).unwrap();
        assert!(!AlphaClassifier::new(&codec, false).needs_alpha(&mut image).unwrap());
        assert_eq!(image.file_format(), &FileFormat::Bmp);
    }

    #[test]
    fn test_movies_are_not_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"not really a video").unwrap();

        let codec = ImageCodec::with_temp_dir(dir.path());
        let mut movie = RasterImage::movie("clip", &path, texforge_core::ImageSize::new(4, 4));
        assert!(AlphaClassifier::new(&codec, false).needs_alpha(&mut movie).unwrap());
    }

    #[test]
    fn test_unreadable_image_keeps_declaration() {
        let codec = ImageCodec::new();
        let mut image = RasterImage::from_file("ghost", "/nowhere/ghost.png").unwrap();
        assert!(AlphaClassifier::new(&codec, false).needs_alpha(&mut image).unwrap());
    }
}
