//! Scene manifest
//!
//! JSON description of the images a scene uses and the texture references
//! pointing at them. Relative paths resolve against the manifest's
//! directory; packed images have their bytes read at load time.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use texforge_core::{Error, FileFormat, ImageSize, ResultExt, SourceKind, TextureRef};

use crate::textures::{HostImage, RasterImage, TextureResult, UsedData};

/// Scene-level input to an export run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneManifest {
    /// Legacy flag: copy sources verbatim
    #[serde(default)]
    pub skip_texture_conversion: bool,

    /// Quality for every JPEG written; defaults to 90
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jpeg_quality: Option<u8>,

    #[serde(default)]
    pub images: Vec<ImageSpec>,

    #[serde(default)]
    pub image_users: HashMap<String, Vec<TextureRef>>,
}

/// One image of the scene
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSpec {
    pub name: String,
    pub source: SourceKind,
    #[serde(default)]
    pub filepath: PathBuf,
    /// Overrides the format guessed from the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_format: Option<FileFormat>,
    #[serde(default = "default_use_alpha")]
    pub use_alpha: bool,
    /// Embed the file's bytes instead of referencing it
    #[serde(default)]
    pub packed: bool,
    /// Required for movies, whose frames are never decoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<(u32, u32)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<GeneratedFill>,
}

fn default_use_alpha() -> bool {
    true
}

/// Solid fill used to synthesise a generated image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFill {
    pub width: u32,
    pub height: u32,
    #[serde(default = "opaque_black")]
    pub color: [u8; 4],
}

fn opaque_black() -> [u8; 4] {
    [0, 0, 0, 255]
}

impl GeneratedFill {
    pub fn render(&self) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(self.width, self.height, Rgba(self.color)))
    }
}

impl SceneManifest {
    /// Parse a manifest from JSON text
    pub fn from_json(text: &str) -> TextureResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a manifest file
    pub fn from_file(path: impl AsRef<Path>) -> TextureResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(Error::from)
            .with_context(|| format!("Couldn't read scene manifest {}", path.display()))?;
        Self::from_json(&text)
    }

    /// Build the host images, resolving relative paths against `base_dir`
    pub fn load_images(&self, base_dir: &Path) -> TextureResult<Vec<RasterImage>> {
        self.images
            .iter()
            .map(|spec| {
                let image = spec.to_image(base_dir)?;
                Ok(match self.jpeg_quality {
                    Some(quality) => image.with_jpeg_quality(quality),
                    None => image,
                })
            })
            .collect()
    }

    /// Images plus their users, ready for the exporter
    pub fn into_used_data(self, base_dir: &Path) -> TextureResult<UsedData<RasterImage>> {
        let images = self.load_images(base_dir)?;
        Ok(UsedData {
            images,
            image_users: self.image_users,
        })
    }
}

impl ImageSpec {
    pub fn to_image(&self, base_dir: &Path) -> TextureResult<RasterImage> {
        let path = resolve(base_dir, &self.filepath);

        let image = match self.source {
            SourceKind::File if self.packed => {
                let bytes = fs::read(&path).map_err(Error::from).with_context(|| {
                    format!("Couldn't read packed image {} from {}", self.name, path.display())
                })?;
                // label stays resolved so nothing depends on the working directory
                RasterImage::packed(&self.name, path, bytes)?
            }
            SourceKind::File => RasterImage::from_file(&self.name, path)?,
            SourceKind::Generated => {
                let fill = self.generated.ok_or_else(|| {
                    Error::invalid_config(format!(
                        "Generated image {} has no `generated` fill",
                        self.name
                    ))
                })?;
                RasterImage::generated(&self.name, fill.render())
            }
            SourceKind::Movie => {
                let size = self.size.map(ImageSize::from).unwrap_or_default();
                RasterImage::movie(&self.name, path, size)
            }
            SourceKind::Viewer => RasterImage::viewer(&self.name),
        };

        let image = match &self.file_format {
            Some(format) => image.with_file_format(format.clone()),
            None => image,
        };
        let image = match (self.source, self.size) {
            (SourceKind::File, Some(size)) if image.size() == ImageSize::default() => {
                image.with_size(size.into())
            }
            _ => image,
        };

        Ok(image.with_use_alpha(self.use_alpha))
    }
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.as_os_str().is_empty() || path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use texforge_core::LodSetting;

    const SCENE: &str = r#"{
        "skip_texture_conversion": false,
        "jpeg_quality": 75,
        "images": [
            { "name": "Wood", "source": "FILE", "filepath": "wood.png", "use_alpha": false },
            {
                "name": "Grid",
                "source": "GENERATED",
                "generated": { "width": 4, "height": 2, "color": [255, 0, 0, 255] }
            },
            { "name": "Clip", "source": "MOVIE", "filepath": "/abs/clip.mp4", "size": [320, 240] },
            { "name": "Render Result", "source": "VIEWER" }
        ],
        "image_users": {
            "Wood": [ { "name": "WoodDiffuse", "lod_levels": [64, 256] }, { "name": "WoodBump" } ]
        }
    }"#;

    #[test]
    fn test_parse_manifest() {
        let scene = SceneManifest::from_json(SCENE).unwrap();
        assert_eq!(scene.images.len(), 4);
        assert_eq!(scene.jpeg_quality, Some(75));
        assert!(scene.images[1].use_alpha);
        assert!(!scene.images[0].use_alpha);

        let users = &scene.image_users["Wood"];
        assert!(matches!(users[0].lod_levels, Some(LodSetting::Levels(ref l)) if l.len() == 2));
        assert!(users[1].lod_levels.is_none());
    }

    #[test]
    fn test_load_images_resolves_paths() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::from_pixel(8, 8, Rgb([1, 1, 1])).save(dir.path().join("wood.png")).unwrap();

        let used = SceneManifest::from_json(SCENE).unwrap().into_used_data(dir.path()).unwrap();
        let images = &used.images;

        assert_eq!(images[0].filepath(), dir.path().join("wood.png"));
        assert_eq!(images[0].size(), ImageSize::square(8));
        assert!(!images[0].use_alpha());

        assert_eq!(images[1].source(), SourceKind::Generated);
        assert_eq!(images[1].size(), ImageSize::new(4, 2));

        assert_eq!(images[2].filepath(), Path::new("/abs/clip.mp4"));
        assert_eq!(images[2].size(), ImageSize::new(320, 240));

        assert_eq!(images[3].source(), SourceKind::Viewer);
        assert_eq!(used.users("Wood").len(), 2);
        assert!(used.users("Grid").is_empty());
    }

    #[test]
    fn test_packed_image_reads_bytes() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::new(3, 5).save(dir.path().join("p.png")).unwrap();
        let spec: ImageSpec = serde_json::from_str(
            r#"{ "name": "P", "source": "FILE", "filepath": "p.png", "packed": true }"#,
        )
        .unwrap();

        let image = spec.to_image(dir.path()).unwrap();
        assert!(image.is_packed());
        assert_eq!(image.filepath(), dir.path().join("p.png"));
        assert_eq!(image.size(), ImageSize::new(3, 5));
    }

    #[test]
    fn test_generated_without_fill_is_rejected() {
        let spec: ImageSpec =
            serde_json::from_str(r#"{ "name": "G", "source": "GENERATED" }"#).unwrap();
        let err = spec.to_image(Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("G"));
    }

    #[test]
    fn test_missing_manifest_names_path() {
        let err = SceneManifest::from_file("/nonexistent/scene.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/scene.json"));
    }
}
