use std::fs;
use std::io::IsTerminal;
use std::path::Path;
use tracing::info;

use dialoguer::{theme::ColorfulTheme, Password};

use crate::core::{CONFIG_FILE_NAME, DEFAULT_PROMPT, DEFAULT_PROMPT_FILE};
use crate::error::BatchError;
use crate::models::{Config, API_KEY_PLACEHOLDER};

/// Init options
#[derive(Debug, Default)]
pub struct InitOptions {
    /// Key to write into the config file
    pub api_key: Option<String>,
    /// Never ask on the terminal
    pub no_input: bool,
}

/// Create the project layout: prompt/input/output folders, default prompt and config
pub fn init_project(project_root: &Path, options: InitOptions) -> Result<(), BatchError> {
    let config = Config::default();

    for dir in [&config.prompts_dir, &config.input_dir, &config.output_dir] {
        let path = project_root.join(dir);
        if !path.exists() {
            fs::create_dir_all(&path)?;
            info!("Created directory: {}", path.display());
        } else {
            info!("Directory already exists: {}", path.display());
        }
    }

    create_file_if_not_exists(
        &project_root.join(&config.prompts_dir).join(DEFAULT_PROMPT_FILE),
        DEFAULT_PROMPT,
    )?;

    let config_path = project_root.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        let api_key = match options.api_key {
            Some(key) => key,
            None if !options.no_input && std::io::stdin().is_terminal() => prompt_for_api_key()?,
            None => String::new(),
        };
        create_file_if_not_exists(&config_path, &render_config(api_key)?)?;
    } else {
        info!("File already exists: {}", config_path.display());
    }

    print_next_steps(project_root);
    Ok(())
}

/// YAML for a fresh project; an empty key becomes the placeholder
fn render_config(api_key: String) -> Result<String, BatchError> {
    let mut config = Config::default();
    config.openai.api_key = Some(if api_key.trim().is_empty() {
        API_KEY_PLACEHOLDER.to_string()
    } else {
        api_key.trim().to_string()
    });
    serde_yaml::to_string(&config).map_err(|e| BatchError::Init(format!("Failed to render config: {}", e)))
}

fn prompt_for_api_key() -> Result<String, BatchError> {
    Password::with_theme(&ColorfulTheme::default())
        .with_prompt("OpenAI API key (leave empty to set it later)")
        .allow_empty_password(true)
        .interact()
        .map_err(|e| BatchError::Init(format!("Failed to get user input: {}", e)))
}

fn create_file_if_not_exists(path: &Path, content: &str) -> Result<(), BatchError> {
    if !path.exists() {
        fs::write(path, content)?;
        info!("Created file: {}", path.display());
    } else {
        info!("File already exists: {}", path.display());
    }
    Ok(())
}

fn print_next_steps(project_root: &Path) {
    println!("promptbatch project initialized at {}", project_root.display());
    println!("\nNext steps:");
    println!("1. Edit prompts/{} or add more prompt files", DEFAULT_PROMPT_FILE);
    println!("2. Set OPENAI_API_KEY or openai.api_key in {}", CONFIG_FILE_NAME);
    println!("3. Put .txt files to process in input/");
    println!("4. Run 'promptbatch' (or 'promptbatch --prompt <file>...') to process them");
}
