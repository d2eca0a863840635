use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::core::{
    combine_prompts, ensure_default_prompt, list_input_files, load_config, load_config_with_env, output_path_for,
    resolve_sources,
    CombinedPrompt, CompletionClient, DispatchOptions, Dispatcher, InputFile, OpenAiClient,
};
use crate::error::BatchError;
use crate::models::{Config, ConfigOverrides, GenerationParams, Outcome, RunSummary};

/// Run options
#[derive(Debug, Default)]
pub struct RunOptions {
    /// Explicit config file
    pub config_path: Option<PathBuf>,
    /// Values given on the command line
    pub overrides: ConfigOverrides,
    /// Show what would be processed without calling the API
    pub dry_run: bool,
}

/// Prompt and inputs resolved before any dispatch
#[derive(Debug)]
pub struct BatchPlan {
    pub prompt: CombinedPrompt,
    pub files: Vec<InputFile>,
}

/// Resolve the combined prompt and the input files
///
/// Everything here is fatal on error and runs before any API call.
pub fn prepare_batch(config: &Config) -> Result<BatchPlan, BatchError> {
    config.validate()?;
    let requested = match &config.prompts {
        Some(paths) => paths.clone(),
        None => vec![ensure_default_prompt(&config.prompts_dir)?],
    };
    let sources = resolve_sources(&requested, &config.prompts_dir)?;
    let prompt = combine_prompts(&sources)?;
    let files = list_input_files(&config.input_dir, &config.batch.input_extensions)?;
    Ok(BatchPlan { prompt, files })
}

/// Load configuration and process every input file
pub async fn run_batch(project_root: &Path, options: RunOptions) -> Result<RunSummary, BatchError> {
    run_batch_with_env(project_root, options, |name| std::env::var(name).ok()).await
}

/// [`run_batch`] with an explicit environment lookup
pub async fn run_batch_with_env<F>(project_root: &Path, options: RunOptions, env: F) -> Result<RunSummary, BatchError>
where
    F: Fn(&str) -> Option<String>,
{
    let config = load_config_with_env(project_root, options.config_path.as_deref(), options.overrides, env)?;
    let api_key = config.require_api_key()?;
    let client = OpenAiClient::new(&config.openai, api_key)?;
    run_with_client(&config, Arc::new(client)).await
}

/// Process every input file of `config` through `client`
pub async fn run_with_client(config: &Config, client: Arc<dyn CompletionClient>) -> Result<RunSummary, BatchError> {
    let plan = prepare_batch(config)?;

    if !config.output_dir.exists() {
        fs::create_dir_all(&config.output_dir)?;
        info!("Created output directory: {}", config.output_dir.display());
    }

    let dispatcher = Dispatcher::new(client, DispatchOptions::from_config(config));
    let params = GenerationParams::from_config(config);
    Ok(dispatcher.run(&plan.prompt, &params, plan.files).await)
}

/// Print what a run would do, without requiring a credential
pub fn preview_batch(project_root: &Path, options: RunOptions) -> Result<(), BatchError> {
    let config = load_config(project_root, options.config_path.as_deref(), options.overrides)?;
    let plan = prepare_batch(&config)?;

    println!("=== DRY RUN ===\n");
    println!("Model:       {}", config.openai.model);
    println!("Temperature: {}", config.openai.temperature);
    println!("Max tokens:  {}", config.openai.max_tokens);
    println!("Workers:     {}", config.batch.max_concurrent);
    println!(
        "Prompt:      {} bytes from {} file(s)",
        plan.prompt.len(),
        plan.prompt.chunks()
    );
    println!(
        "API key:     {}",
        if config.require_api_key().is_ok() { "found" } else { "MISSING" }
    );
    println!("\nInput files ({}):", plan.files.len());
    for file in &plan.files {
        let output = output_path_for(&file.path, &config.output_dir, &config.batch.output_extension);
        println!("  {} -> {}", file.name, output.display());
    }
    println!("\nRun without --dry_run to execute.");
    Ok(())
}

/// Print the per-file results and the final summary line
pub fn print_summary(summary: &RunSummary) {
    println!("\n=== Run Summary ===");
    if !summary.results.is_empty() {
        println!("Results:");
        for result in &summary.results {
            match &result.outcome {
                Outcome::Succeeded { output, chars } => {
                    println!("  {} [OK] -> {} ({} chars)", result.input_name(), output.display(), chars)
                }
                Outcome::Failed { error } => println!("  {} [FAIL]: {}", result.input_name(), error),
            }
        }
    }
    let elapsed = summary
        .elapsed_secs()
        .map(|s| format!(" in {:.1}s", s))
        .unwrap_or_default();
    println!(
        "Succeeded: {}  Failed: {}  Total: {}{}",
        summary.succeeded,
        summary.failed,
        summary.total(),
        elapsed
    );
}
