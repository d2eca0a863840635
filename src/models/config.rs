use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable holding the API credential
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Value written by `init` until the user supplies a real key
pub const API_KEY_PLACEHOLDER: &str = "YOUR_OPENAI_API_KEY";

/// Configuration loaded from promptbatch.yaml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Folder used to resolve bare prompt names
    #[serde(default = "default_prompts_dir")]
    pub prompts_dir: PathBuf,
    /// Folder holding the files to process
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,
    /// Folder receiving one response file per input
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Prompt files or directories, combined in order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts: Option<Vec<PathBuf>>,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompts_dir: default_prompts_dir(),
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            prompts: None,
            openai: OpenAiConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

fn default_prompts_dir() -> PathBuf {
    PathBuf::from("prompts")
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("input")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

/// Completion API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key; `OPENAI_API_KEY` takes precedence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model name to use
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Timeout in seconds for a single completion request
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1500
}

fn default_timeout() -> u64 {
    120
}

/// Batch dispatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Size of the worker pool
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Input extensions to process (empty = every file)
    #[serde(default = "default_input_extensions")]
    pub input_extensions: Vec<String>,
    /// Extension given to response files
    #[serde(default = "default_output_extension")]
    pub output_extension: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            input_extensions: default_input_extensions(),
            output_extension: default_output_extension(),
        }
    }
}

fn default_max_concurrent() -> usize {
    5
}

fn default_input_extensions() -> Vec<String> {
    vec!["txt".to_string()]
}

fn default_output_extension() -> String {
    "txt".to_string()
}

/// Command-line values that win over the config file and the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub prompts: Option<Vec<PathBuf>>,
    pub input_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub max_concurrent: Option<usize>,
    pub timeout: Option<u64>,
    pub input_extensions: Option<Vec<String>>,
    pub output_extension: Option<String>,
}

impl Config {
    /// Load config from a YAML file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e))?;
        // An empty file is a valid "all defaults" config
        let config: Config = if contents.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&contents).map_err(|e| ConfigError::ParseError(path.to_path_buf(), e))?
        };

        match path.parent() {
            Some(base) if !base.as_os_str().is_empty() => Ok(config.relative_to(base)),
            _ => Ok(config),
        }
    }

    /// Resolve relative directories against `base`
    ///
    /// A relative `prompts` entry is rebased when it exists under `base`.
    /// Other entries stay bare so they can still be found in `prompts_dir`.
    pub fn relative_to(mut self, base: &Path) -> Self {
        self.prompts_dir = base.join(&self.prompts_dir);
        self.input_dir = base.join(&self.input_dir);
        self.output_dir = base.join(&self.output_dir);
        if let Some(prompts) = self.prompts.as_mut() {
            for prompt in prompts.iter_mut().filter(|p| p.is_relative()) {
                let rebased = base.join(&*prompt);
                if rebased.exists() {
                    *prompt = rebased;
                }
            }
        }
        self
    }

    /// Merge environment values into the config
    pub fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.openai.api_key = Some(key);
        }
        self
    }

    /// Merge CLI overrides into the config
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(p) = overrides.prompts {
            self.prompts = Some(p);
        }
        if let Some(d) = overrides.input_dir {
            self.input_dir = d;
        }
        if let Some(d) = overrides.output_dir {
            self.output_dir = d;
        }
        if let Some(m) = overrides.model {
            self.openai.model = m;
        }
        if let Some(t) = overrides.temperature {
            self.openai.temperature = t;
        }
        if let Some(t) = overrides.max_tokens {
            self.openai.max_tokens = t;
        }
        if let Some(n) = overrides.max_concurrent {
            self.batch.max_concurrent = n;
        }
        if let Some(t) = overrides.timeout {
            self.openai.timeout_seconds = t;
        }
        if let Some(e) = overrides.input_extensions {
            self.batch.input_extensions = e;
        }
        if let Some(e) = overrides.output_extension {
            self.batch.output_extension = e;
        }
        self
    }

    /// Check value ranges once all layers are merged
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.openai.temperature) {
            return Err(ConfigError::InvalidValue {
                field: "temperature",
                message: format!("{} is outside 0.0..=2.0", self.openai.temperature),
            });
        }
        if self.openai.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_tokens",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.batch.max_concurrent == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_concurrent",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.openai.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_seconds",
                message: "must be greater than zero".to_string(),
            });
        }
        let ext = self.batch.output_extension.trim_start_matches('.');
        if ext.is_empty() || ext.contains(|c| c == '/' || c == '\\') {
            return Err(ConfigError::InvalidValue {
                field: "output_extension",
                message: format!("'{}' is not a file extension", self.batch.output_extension),
            });
        }
        if same_dir(&self.input_dir, &self.output_dir) {
            return Err(ConfigError::InvalidValue {
                field: "output_dir",
                message: format!(
                    "{} is also the input directory; responses would overwrite the inputs",
                    self.output_dir.display()
                ),
            });
        }
        Ok(())
    }

    /// The API key, or `MissingApiKey` when unset or still the placeholder
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        match self.openai.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() && key != API_KEY_PLACEHOLDER => Ok(key),
            _ => Err(ConfigError::MissingApiKey),
        }
    }
}

/// Compare directories by canonical path, falling back to the paths as given
fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    ReadError(PathBuf, std::io::Error),
    #[error("Failed to parse config file {0}: {1}")]
    ParseError(PathBuf, serde_yaml::Error),
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("No prompt specified")]
    NoPrompt,
    #[error("Prompt source not found: {0}")]
    PromptNotFound(PathBuf),
    #[error("Failed to read prompt {0}: {1}")]
    PromptRead(PathBuf, std::io::Error),
    #[error("Input directory not found: {0}")]
    InputDirNotFound(PathBuf),
    #[error("API key not found. Set the {API_KEY_ENV} environment variable or openai.api_key in the config file")]
    MissingApiKey,
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}
