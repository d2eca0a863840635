//! promptbatch - send batches of text files through a chat-completion API
//!
//! Every file in the input folder is sent, together with one system prompt
//! combined from the configured prompt sources, to an OpenAI-compatible chat
//! completion endpoint. Each response is written to the output folder.
//!
//! # Architecture
//!
//! - **commands**: CLI command implementations (run, init)
//! - **core**: Core functionality (config loading, prompt combiner, input
//!   enumeration, completion client, batch dispatcher, result writer)
//! - **models**: Data structures (config, requests, results)
//! - **error**: Error types

pub mod commands;
pub mod core;
pub mod error;
pub mod models;

pub use error::{ApiError, BatchError, Result, TaskError};
