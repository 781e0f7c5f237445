//! Output descriptors from a finalized build directory.

use super::{ManifestError, OutputDescriptor, OutputKind, WORKER_FILE_NAME};
use std::path::Path;
use walkdir::WalkDir;

/// Extensions treated as compiled code rather than copied assets.
const CHUNK_EXTENSIONS: &[&str] = &["js", "mjs", "css"];

/// Walk a build output directory and describe every file in it.
///
/// Paths are relative to `dir` with `/` separators, sorted for stable
/// output. The worker script at the root is skipped since it is the file
/// being generated.
pub fn scan_dist(dir: &Path) -> Result<Vec<OutputDescriptor>, ManifestError> {
    let mut outputs = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|err| ManifestError::Io {
            path: err.path().unwrap_or(dir).display().to_string(),
            source: err.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(dir) else {
            continue;
        };
        let file_name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if file_name == WORKER_FILE_NAME {
            continue;
        }

        let kind = match entry.path().extension().and_then(|e| e.to_str()) {
            Some(ext) if CHUNK_EXTENSIONS.contains(&ext) => OutputKind::Chunk,
            _ => OutputKind::Asset,
        };
        outputs.push(OutputDescriptor { file_name, kind });
    }

    outputs.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    tracing::debug!(outputs = outputs.len(), dir = %dir.display(), "scanned build output");
    Ok(outputs)
}
