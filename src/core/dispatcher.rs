//! Bounded fan-out of one completion task per input file
//!
//! Each input file becomes a tokio task gated by a semaphore of
//! `max_concurrent` permits. A task reads its file, calls the completion
//! client and writes the response; whatever happens, it settles into exactly
//! one [`GenerationResult`]. The dispatcher is the only owner of the
//! [`RunSummary`] and folds results into it as tasks finish.

use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::core::{output_path_for, write_result, CombinedPrompt, CompletionClient, InputFile};
use crate::error::{ApiError, TaskError};
use crate::models::{Config, GenerationParams, GenerationRequest, GenerationResult, RunSummary, TaskState};

/// Dispatcher settings
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Worker pool size
    pub max_concurrent: usize,
    /// Upper bound for a single completion call
    pub timeout: Duration,
    pub output_dir: PathBuf,
    pub output_extension: String,
}

impl DispatchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_concurrent: config.batch.max_concurrent,
            timeout: Duration::from_secs(config.openai.timeout_seconds),
            output_dir: config.output_dir.clone(),
            output_extension: config.batch.output_extension.clone(),
        }
    }
}

/// Runs one task per input file through a bounded worker pool
pub struct Dispatcher {
    client: Arc<dyn CompletionClient>,
    options: DispatchOptions,
}

/// Everything a single task needs, owned by that task
struct FileTask {
    input: InputFile,
    output: PathBuf,
    prompt: Arc<str>,
    params: GenerationParams,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn CompletionClient>, options: DispatchOptions) -> Self {
        Self { client, options }
    }

    /// Process every file and wait for all tasks to settle
    ///
    /// Files are taken in name order, which decides who keeps a contested output path.
    pub async fn run(
        &self,
        prompt: &CombinedPrompt,
        params: &GenerationParams,
        mut files: Vec<InputFile>,
    ) -> RunSummary {
        let mut summary = RunSummary::new();
        if files.is_empty() {
            info!("No input files found");
            summary.finish();
            return summary;
        }

        let total = files.len();
        let workers = self.options.max_concurrent.max(1).min(total);
        info!("Processing {} files with {} workers", total, workers);

        let semaphore = Arc::new(Semaphore::new(workers));
        files.sort_by(|a, b| a.name.cmp(&b.name));
        let (accepted, collisions) =
            plan_outputs(files, &self.options.output_dir, &self.options.output_extension);

        for (input, err) in collisions {
            // Pending -> Failed without ever taking a worker slot
            warn!("Skipping {}: {}", input.name, err);
            summary.record(GenerationResult::failed(input.path, err.to_string()));
        }

        let mut pending = FuturesUnordered::new();
        for (input, output) in accepted {
            let task = FileTask {
                input,
                output,
                prompt: prompt.shared(),
                params: params.clone(),
                timeout: self.options.timeout,
            };
            let input_path = task.input.path.clone();
            let span = info_span!("file", name = %task.input.name);
            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);

            let handle = tokio::spawn(
                async move {
                    // Only fails on a closed semaphore
                    let permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(e) => return GenerationResult::failed(task.input.path, e.to_string()),
                    };
                    let result = run_task(task, client.as_ref()).await;
                    drop(permit);
                    result
                }
                .instrument(span),
            );

            pending.push(async move { (input_path, handle.await) });
        }

        while let Some((input_path, joined)) = pending.next().await {
            let result = match joined {
                Ok(result) => result,
                Err(e) => {
                    error!("Task for {} did not complete: {}", input_path.display(), e);
                    GenerationResult::failed(input_path, TaskError::Panicked(e.to_string()).to_string())
                }
            };
            summary.record(result);
            debug!("{}/{} files settled", summary.total(), total);
        }

        summary.finish();
        info!(
            "Batch complete: {} succeeded, {} failed, {} total",
            summary.succeeded,
            summary.failed,
            summary.total()
        );
        summary
    }
}

/// Assign output paths, failing every input whose output is already claimed
///
/// Expects inputs sorted by name, so the first file in that order keeps the path.
fn plan_outputs(
    files: Vec<InputFile>,
    output_dir: &Path,
    extension: &str,
) -> (Vec<(InputFile, PathBuf)>, Vec<(InputFile, TaskError)>) {
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();
    let mut accepted = Vec::new();
    let mut collisions = Vec::new();

    for input in files {
        let output = output_path_for(&input.path, output_dir, extension);
        match claimed.get(&output) {
            Some(owner) => {
                let err = TaskError::OutputCollision {
                    output,
                    claimed_by: owner.clone(),
                };
                collisions.push((input, err));
            }
            None => {
                claimed.insert(output.clone(), input.path.clone());
                accepted.push((input, output));
            }
        }
    }

    (accepted, collisions)
}

/// Run one file from Running to a terminal state
async fn run_task(task: FileTask, client: &dyn CompletionClient) -> GenerationResult {
    let mut state = TaskState::Pending;
    state = state.advance(TaskState::Running).unwrap_or(state);
    debug!("Started {} ({:?})", task.input.name, state);

    let input_path = task.input.path.clone();
    let outcome = process_file(task, client).await;

    let next = if outcome.is_ok() { TaskState::Succeeded } else { TaskState::Failed };
    state = state.advance(next).unwrap_or(state);

    match outcome {
        Ok((output, chars)) => {
            debug!("Finished ({:?}): wrote {} chars to {}", state, chars, output.display());
            GenerationResult::succeeded(input_path, output, chars)
        }
        Err(e) => {
            match e.hint() {
                Some(hint) => warn!("Failed ({:?}): {} ({})", state, e, hint),
                None => warn!("Failed ({:?}): {}", state, e),
            }
            GenerationResult::failed(input_path, e.to_string())
        }
    }
}

async fn process_file(task: FileTask, client: &dyn CompletionClient) -> Result<(PathBuf, usize), TaskError> {
    let path = &task.input.path;
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| TaskError::Read(path.clone(), e))?;

    if content.trim().is_empty() {
        return Err(TaskError::EmptyInput(path.clone()));
    }

    let request = GenerationRequest::new(task.prompt, content, task.params);
    let response = match tokio::time::timeout(task.timeout, client.complete(&request)).await {
        Ok(response) => response?,
        Err(_) => return Err(ApiError::Timeout(task.timeout).into()),
    };

    let output = task.output;
    let chars = response.chars().count();
    write_result(&output, &response)
        .await
        .map_err(|e| TaskError::Write(output.clone(), e))?;
    Ok((output, chars))
}
