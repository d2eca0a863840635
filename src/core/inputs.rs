use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::BatchError;
use crate::models::ConfigError;

/// One file queued for processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub path: PathBuf,
    /// File name, used for logging and output naming
    pub name: String,
}

impl InputFile {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name }
    }
}

/// Check a path against the extension allow-list (case-insensitive)
///
/// An empty allow-list accepts every file.
pub fn has_allowed_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext)),
        None => false,
    }
}

/// List eligible input files, sorted by file name
pub fn list_input_files(input_dir: &Path, extensions: &[String]) -> Result<Vec<InputFile>, BatchError> {
    if !input_dir.is_dir() {
        return Err(ConfigError::InputDirNotFound(input_dir.to_path_buf()).into());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(input_dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if has_allowed_extension(&path, extensions) {
            files.push(InputFile::new(path));
        } else {
            debug!("Skipping {} (extension not allowed)", path.display());
        }
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    info!("Discovered {} input files in {}", files.len(), input_dir.display());
    Ok(files)
}
