use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::BatchError;
use crate::models::{Config, ConfigError, ConfigOverrides};

/// Config file picked up from the project directory when `--config` is absent
pub const CONFIG_FILE_NAME: &str = "promptbatch.yaml";

/// Dotenv file read from the project directory
pub const DOTENV_FILE_NAME: &str = ".env";

/// Load configuration with environment and CLI overrides
///
/// Layers, lowest first: defaults, config file, environment, CLI flags.
/// A `.env` file in the project directory fills in variables missing from
/// the process environment.
pub fn load_config(
    project_root: &Path,
    config_path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<Config, BatchError> {
    load_config_with_env(project_root, config_path, overrides, |name| std::env::var(name).ok())
}

/// [`load_config`] with an explicit environment lookup
pub fn load_config_with_env<F>(
    project_root: &Path,
    config_path: Option<&Path>,
    overrides: ConfigOverrides,
    env: F,
) -> Result<Config, BatchError>
where
    F: Fn(&str) -> Option<String>,
{
    let config = match config_file(project_root, config_path)? {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            Config::load_from_file(&path)?
        }
        None => Config::default().relative_to(project_root),
    };

    let dotenv = read_dotenv(&project_root.join(DOTENV_FILE_NAME));
    let lookup = |name: &str| env(name).or_else(|| dotenv.get(name).cloned());

    let config = config.apply_env(lookup).with_overrides(overrides);
    config.validate()?;

    info!(
        "Configuration loaded: model={}, temperature={}, max_tokens={}, workers={}",
        config.openai.model, config.openai.temperature, config.openai.max_tokens, config.batch.max_concurrent
    );

    Ok(config)
}

/// The config file to read, if any
fn config_file(project_root: &Path, explicit: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    match explicit {
        Some(path) if path.is_file() => Ok(Some(path.to_path_buf())),
        Some(path) => Err(ConfigError::NotFound(path.to_path_buf())),
        None => {
            let default = project_root.join(CONFIG_FILE_NAME);
            Ok(default.is_file().then_some(default))
        }
    }
}

/// Variables from a dotenv file; a missing file yields none
fn read_dotenv(path: &Path) -> HashMap<String, String> {
    if !path.is_file() {
        return HashMap::new();
    }

    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(e) => {
            warn!("Ignoring {}: {}", path.display(), e);
            return HashMap::new();
        }
    };

    let vars: HashMap<String, String> = iter
        .filter_map(|item| match item {
            Ok(pair) => Some(pair),
            Err(e) => {
                warn!("Skipping malformed line in {}: {}", path.display(), e);
                None
            }
        })
        .collect();
    debug!("Read {} variables from {}", vars.len(), path.display());
    vars
}
