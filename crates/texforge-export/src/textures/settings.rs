//! Per-image texture settings
//!
//! Images carry no custom settings of their own; they are read from the
//! texture references that use the image. At most one reference per image
//! may carry `lod_levels`.

use texforge_core::{ImageSize, LodLevel, LodSetting, TextureRef};

use super::{TextureError, TextureResult};

/// The single reference carrying `lod_levels`, if any
pub fn find_settings<'a>(
    image: &str,
    users: &'a [TextureRef],
) -> TextureResult<Option<&'a TextureRef>> {
    let mut with_settings: Option<&TextureRef> = None;

    for texture in users.iter().filter(|t| t.has_lod_levels()) {
        if let Some(first) = with_settings {
            return Err(TextureError::ConflictingSettings {
                image: image.to_string(),
                first: first.name.clone(),
                second: texture.name.clone(),
            });
        }
        with_settings = Some(texture);
    }

    Ok(with_settings)
}

/// Parse a reference's `lod_levels` into sizes, in declaration order
pub fn parse_lod_levels(texture: &TextureRef) -> TextureResult<Vec<ImageSize>> {
    let levels = match &texture.lod_levels {
        None => return Ok(Vec::new()),
        Some(LodSetting::Levels(levels)) => levels.clone(),
        Some(LodSetting::Encoded(json)) => {
            serde_json::from_str::<Vec<LodLevel>>(json).map_err(|e| TextureError::InvalidLodLevels {
                texture: texture.name.clone(),
                reason: e.to_string(),
            })?
        }
    };

    levels
        .iter()
        .map(|level| {
            let size = level.size();
            if size.width == 0 || size.height == 0 {
                return Err(TextureError::InvalidLodLevels {
                    texture: texture.name.clone(),
                    reason: format!("level {size} has a zero dimension"),
                });
            }
            Ok(size)
        })
        .collect()
}

/// LOD sizes requested for `image` by its users
pub fn resolve_lod_levels(image: &str, users: &[TextureRef]) -> TextureResult<Vec<ImageSize>> {
    match find_settings(image, users)? {
        Some(texture) => parse_lod_levels(texture),
        None => Ok(Vec::new()),
    }
}
