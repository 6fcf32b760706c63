//! Data URI embedding
//!
//! Small PNG/JPEG outputs are cheaper to ship inside the record than as
//! separate files.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use texforge_core::{EntryLocation, ImageExportRecord};

use super::TextureResult;

/// Longest side, in pixels, of an output that gets inlined
pub const DEFAULT_INLINE_MAX_SIZE: u32 = 64;

/// Format keys eligible for inlining
const INLINE_FORMATS: [&str; 2] = ["png", "jpeg"];

/// `data:image/<format>;base64,<payload>` with no line breaks
pub fn data_uri(bytes: &[u8], format_key: &str) -> String {
    format!("data:image/{};base64,{}", format_key.to_lowercase(), STANDARD.encode(bytes))
}

pub fn file_to_data_uri(path: &Path, format_key: &str) -> TextureResult<String> {
    Ok(data_uri(&fs::read(path)?, format_key))
}

/// Replace small on-disk entries of `record` with data URIs
///
/// Files are deleted once every entry has been rewritten. Returns how many
/// entries were inlined.
pub fn inline_small_entries(
    record: &mut ImageExportRecord,
    dest: &Path,
    max_size: u32,
) -> TextureResult<usize> {
    let mut files_to_delete = BTreeSet::new();
    let mut inlined = 0;

    for (format, entries) in record
        .formats
        .iter_mut()
        .filter(|(format, _)| INLINE_FORMATS.contains(&format.as_str()))
    {
        for entry in entries.iter_mut().filter(|e| e.size().max_dimension() <= max_size) {
            let EntryLocation::File { file_name } = &entry.location else {
                continue;
            };
            let path = dest.join(file_name);
            entry.location = EntryLocation::Embedded {
                data_uri: file_to_data_uri(&path, format)?,
            };
            files_to_delete.insert(path);
            inlined += 1;
        }
    }

    for path in files_to_delete {
        tracing::debug!(path = %path.display(), "Removing inlined file");
        fs::remove_file(&path)?;
    }

    Ok(inlined)
}
