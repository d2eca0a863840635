//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

use promptbatch::core::CompletionClient;
use promptbatch::error::ApiError;
use promptbatch::models::{Config, GenerationRequest};

/// Create a test project with prompts/, input/ and output/ folders
pub fn create_test_project() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let project_root = temp_dir.path().to_path_buf();

    for dir in ["prompts", "input", "output"] {
        fs::create_dir_all(project_root.join(dir)).expect("Failed to create project dir");
    }

    (temp_dir, project_root)
}

/// Write a prompt file under prompts/ and return its path
pub fn create_prompt(project_root: &Path, name: &str, content: &str) -> PathBuf {
    let path = project_root.join("prompts").join(name);
    fs::write(&path, content).expect("Failed to write prompt file");
    path
}

/// Write an input file under input/
pub fn create_input(project_root: &Path, name: &str, content: &str) -> PathBuf {
    let path = project_root.join("input").join(name);
    fs::write(&path, content).expect("Failed to write input file");
    path
}

/// Config rooted at the project with the given prompt files
pub fn test_config(project_root: &Path, prompts: Vec<PathBuf>) -> Config {
    let mut config = Config::default().relative_to(project_root);
    config.prompts = Some(prompts);
    config.openai.api_key = Some("sk-test".to_string());
    config
}

/// Names of the files in output/, sorted
pub fn output_files(project_root: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(project_root.join("output"))
        .expect("Failed to read output dir")
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub fn read_output(project_root: &Path, name: &str) -> String {
    fs::read_to_string(project_root.join("output").join(name)).expect("Failed to read output file")
}

/// Mock completion client
///
/// Answers `<summary of CONTENT>` unless a failure, panic or delay is
/// registered for the trimmed content of the input file.
#[derive(Default)]
pub struct MockClient {
    failures: HashMap<String, ApiError>,
    panics: Vec<String>,
    delays: HashMap<String, Duration>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(mut self, content: &str, error: ApiError) -> Self {
        self.failures.insert(content.to_string(), error);
        self
    }

    pub fn panic_on(mut self, content: &str) -> Self {
        self.panics.push(content.to_string());
        self
    }

    pub fn delay_on(mut self, content: &str, delay: Duration) -> Self {
        self.delays.insert(content.to_string(), delay);
        self
    }

    /// Delay applied to every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// System prompts received, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for MockClient {
    async fn complete(&self, request: &GenerationRequest) -> Result<String, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let content = request.content.trim().to_string();
        let delay = self.delays.get(&content).copied().unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panics.contains(&content) {
            panic!("mock client asked to panic on {}", content);
        }
        match self.failures.get(&content) {
            Some(err) => Err(err.clone()),
            None => Ok(format!("<summary of {}>", content)),
        }
    }
}
