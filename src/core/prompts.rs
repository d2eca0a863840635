//! Prompt sources and the combined system prompt
//!
//! All prompt sources are read once at startup and joined into a single
//! system prompt that is sent with every input file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::ConfigError;

/// File name of the prompt used when none is requested
pub const DEFAULT_PROMPT_FILE: &str = "standard_prompt.txt";

/// Text written to the default prompt file when it is missing
pub const DEFAULT_PROMPT: &str = "You are a helpful assistant. \
Provide clear and concise answers to the user's queries.";

/// Separator placed between prompt chunks
pub const PROMPT_SEPARATOR: &str = "\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptSourceKind {
    File,
    Directory,
}

/// One resolved origin of instruction text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSource {
    pub path: PathBuf,
    pub kind: PromptSourceKind,
}

impl PromptSource {
    /// Files contributing text, in the order they are appended
    fn files(&self) -> Result<Vec<PathBuf>, ConfigError> {
        match self.kind {
            PromptSourceKind::File => Ok(vec![self.path.clone()]),
            PromptSourceKind::Directory => {
                let read_err = |e| ConfigError::PromptRead(self.path.clone(), e);
                let mut files = Vec::new();
                for entry in fs::read_dir(&self.path).map_err(read_err)? {
                    let path = entry.map_err(read_err)?.path();
                    if path.is_file() {
                        files.push(path);
                    }
                }
                files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
                Ok(files)
            }
        }
    }
}

/// The system prompt shared by every request of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedPrompt {
    text: Arc<str>,
    /// Number of files that contributed text
    chunks: usize,
}

impl CombinedPrompt {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Cheap shared handle for per-task requests
    pub fn shared(&self) -> Arc<str> {
        Arc::clone(&self.text)
    }

    pub fn chunks(&self) -> usize {
        self.chunks
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Resolve requested prompt paths into prompt sources
///
/// A path is used as given when it exists; a relative path that does not
/// exist is then looked up under `prompts_dir`.
pub fn resolve_sources(paths: &[PathBuf], prompts_dir: &Path) -> Result<Vec<PromptSource>, ConfigError> {
    if paths.is_empty() {
        return Err(ConfigError::NoPrompt);
    }

    paths
        .iter()
        .map(|requested| {
            let path = if requested.exists() {
                requested.clone()
            } else if requested.is_relative() && prompts_dir.join(requested).exists() {
                prompts_dir.join(requested)
            } else {
                return Err(ConfigError::PromptNotFound(requested.clone()));
            };

            let kind = if path.is_dir() {
                PromptSourceKind::Directory
            } else {
                PromptSourceKind::File
            };
            debug!("Prompt source {} ({:?})", path.display(), kind);
            Ok(PromptSource { path, kind })
        })
        .collect()
}

/// Concatenate prompt sources into one combined prompt
pub fn combine_prompts(sources: &[PromptSource]) -> Result<CombinedPrompt, ConfigError> {
    let mut chunks = Vec::new();
    for source in sources {
        for file in source.files()? {
            let text = fs::read_to_string(&file).map_err(|e| ConfigError::PromptRead(file.clone(), e))?;
            debug!("Loaded prompt {} ({} bytes)", file.display(), text.len());
            chunks.push(text);
        }
    }

    if chunks.is_empty() {
        return Err(ConfigError::NoPrompt);
    }

    let text = chunks.join(PROMPT_SEPARATOR);
    info!("Combined {} prompt file(s) into {} bytes", chunks.len(), text.len());

    Ok(CombinedPrompt {
        text: Arc::from(text),
        chunks: chunks.len(),
    })
}

/// Create the default prompt file if it does not exist, returning its path
pub fn ensure_default_prompt(prompts_dir: &Path) -> std::io::Result<PathBuf> {
    let path = prompts_dir.join(DEFAULT_PROMPT_FILE);
    if !path.is_file() {
        fs::create_dir_all(prompts_dir)?;
        fs::write(&path, DEFAULT_PROMPT)?;
        info!("Created default prompt file: {}", path.display());
    }
    Ok(path)
}
