use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lifecycle of one input file's task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Submitted, waiting for a worker slot
    Pending,
    /// Holding a worker slot
    Running,
    Succeeded,
    Failed,
}

impl TaskState {
    /// Check if this state is final
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Failed)
    }

    /// Check whether moving to `next` is allowed
    ///
    /// Terminal states never move again, so a finished task cannot be re-run.
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (TaskState::Pending, TaskState::Running)
                | (TaskState::Pending, TaskState::Failed)
                | (TaskState::Running, TaskState::Succeeded)
                | (TaskState::Running, TaskState::Failed)
        )
    }

    /// Move to `next`, returning the new state or `None` if the move is invalid
    pub fn advance(self, next: TaskState) -> Option<TaskState> {
        self.can_transition_to(next).then_some(next)
    }
}

/// Terminal outcome for one input file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded {
        output: PathBuf,
        /// Length of the response text in characters
        chars: usize,
    },
    Failed {
        error: String,
    },
}

/// Result of processing one input file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub input: PathBuf,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl GenerationResult {
    pub fn succeeded(input: PathBuf, output: PathBuf, chars: usize) -> Self {
        Self {
            input,
            outcome: Outcome::Succeeded { output, chars },
        }
    }

    pub fn failed(input: PathBuf, error: impl Into<String>) -> Self {
        Self {
            input,
            outcome: Outcome::Failed { error: error.into() },
        }
    }

    pub fn state(&self) -> TaskState {
        match self.outcome {
            Outcome::Succeeded { .. } => TaskState::Succeeded,
            Outcome::Failed { .. } => TaskState::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.state() == TaskState::Succeeded
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Failed { error } => Some(error),
            Outcome::Succeeded { .. } => None,
        }
    }

    /// Input file name for display
    pub fn input_name(&self) -> String {
        self.input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input.display().to_string())
    }
}

/// Summary of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<GenerationResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            succeeded: 0,
            failed: 0,
            results: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Record a settled task
    pub fn record(&mut self, result: GenerationResult) {
        if result.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.results.push(result);
    }

    /// Mark the summary complete and order results by input path
    pub fn finish(&mut self) {
        self.results.sort_by(|a, b| a.input.cmp(&b.input));
        self.finished_at = Some(Utc::now());
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Process exit status for this run
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &GenerationResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    pub fn elapsed_secs(&self) -> Option<f64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds() as f64 / 1000.0)
    }
}
