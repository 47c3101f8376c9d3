//! Source folder discovery

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Extensions (lowercase, without dot) that are picked up for conversion
const SUPPORTED_EXTENSIONS: &[&str] = &["m4a", "mp4", "wav", "flac", "aac", "ogg", "wma"];

/// A discovered source file paired with its conversion target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanItem {
    pub source_path: PathBuf,
    /// Always `dest_folder/<source stem>.mp3`
    pub dest_path: PathBuf,
    /// Source file name, used in progress labels
    pub display_name: String,
    /// File name of `dest_path`
    pub output_name: String,
    pub byte_size: u64,
    /// Whether `dest_path` existed when the scan ran
    pub already_exists: bool,
}

/// Supported source extensions, with leading dot
pub fn supported_extensions() -> Vec<String> {
    SUPPORTED_EXTENSIONS
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect()
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Recursively find convertible audio files under `source_folder`
///
/// Subdirectory structure is flattened: every target lands directly in
/// `dest_folder`. A missing source folder yields an empty list.
pub fn scan(source_folder: &Path, dest_folder: &Path) -> Vec<ScanItem> {
    if !source_folder.exists() {
        debug!("Source folder {} does not exist", source_folder.display());
        return Vec::new();
    }

    let mut items = Vec::new();

    for entry in WalkDir::new(source_folder).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        let path = entry.path();
        if !path.is_file() || !is_supported(path) {
            continue;
        }

        let Some(stem) = path.file_stem() else {
            continue;
        };

        let output_name = format!("{}.mp3", stem.to_string_lossy());
        let dest_path = dest_folder.join(&output_name);
        let byte_size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        let already_exists = dest_path.exists();

        items.push(ScanItem {
            source_path: path.to_path_buf(),
            display_name: entry.file_name().to_string_lossy().to_string(),
            output_name,
            dest_path,
            byte_size,
            already_exists,
        });
    }

    debug!(
        "Found {} convertible files in {}",
        items.len(),
        source_folder.display()
    );
    items
}
