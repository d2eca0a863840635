use std::path::{Path, PathBuf};
use tracing::debug;

/// Output path for an input: `<output_dir>/<stem>.<extension>`
pub fn output_path_for(input: &Path, output_dir: &Path, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output_dir.join(format!("{}.{}", stem, extension.trim_start_matches('.')))
}

/// Write a response, replacing any previous file at `path`
pub async fn write_result(path: &Path, text: &str) -> std::io::Result<()> {
    tokio::fs::write(path, text).await?;
    debug!("Wrote {} bytes to {}", text.len(), path.display());
    Ok(())
}
