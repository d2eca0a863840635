use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::Config;

/// Generation parameters shared by every request of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GenerationParams {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.openai.model.clone(),
            temperature: config.openai.temperature,
            max_tokens: config.openai.max_tokens,
        }
    }
}

/// One completion request, built and owned by a single task
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Combined instruction, shared read-only across tasks
    pub prompt: Arc<str>,
    /// Text of the input file
    pub content: String,
    pub params: GenerationParams,
}

impl GenerationRequest {
    pub fn new(prompt: Arc<str>, content: String, params: GenerationParams) -> Self {
        Self { prompt, content, params }
    }
}
