pub mod client;
pub mod config;
pub mod dispatcher;
pub mod inputs;
pub mod openai;
pub mod prompts;
pub mod writer;

pub use client::*;
pub use config::*;
pub use dispatcher::*;
pub use inputs::*;
pub use openai::*;
pub use prompts::*;
pub use writer::*;
