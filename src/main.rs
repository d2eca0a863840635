use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use promptbatch::commands::{init_project, preview_batch, print_summary, run_batch, InitOptions, RunOptions};
use promptbatch::error::BatchError;
use promptbatch::models::ConfigOverrides;

/// promptbatch - send text files through a chat-completion API with a combined prompt
#[derive(Parser)]
#[command(name = "promptbatch")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also append log output to this file
    #[arg(long = "log_file", alias = "log-file", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the prompts/, input/ and output/ folders, a default prompt and a config file
    Init {
        /// Project directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// API key to store in the config file
        #[arg(long = "api_key", alias = "api-key")]
        api_key: Option<String>,

        /// Do not ask for the API key interactively
        #[arg(long = "no_input", alias = "no-input")]
        no_input: bool,
    },
}

/// Options of the default (run) invocation
#[derive(Args)]
struct RunArgs {
    /// Path to a YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Prompt files or directories, combined in the given order
    #[arg(long, num_args = 1..)]
    prompt: Option<Vec<PathBuf>>,

    /// Directory of input files [default: ./input]
    #[arg(long = "input_dir", alias = "input-dir")]
    input_dir: Option<PathBuf>,

    /// Directory for response files [default: ./output]
    #[arg(long = "output_dir", alias = "output-dir")]
    output_dir: Option<PathBuf>,

    /// Model to use [default: gpt-4]
    #[arg(long)]
    model: Option<String>,

    /// Sampling temperature [default: 0.7]
    #[arg(long)]
    temperature: Option<f32>,

    /// Maximum tokens per response [default: 1500]
    #[arg(long = "max_tokens", alias = "max-tokens")]
    max_tokens: Option<u32>,

    /// Maximum concurrent requests [default: 5]
    #[arg(long = "max_concurrent", alias = "max-concurrent")]
    max_concurrent: Option<usize>,

    /// Request timeout in seconds [default: 120]
    #[arg(long)]
    timeout: Option<u64>,

    /// Input extensions to process, comma separated [default: txt]
    #[arg(long, value_delimiter = ',')]
    extensions: Option<Vec<String>>,

    /// Extension of response files [default: txt]
    #[arg(long = "output_extension", alias = "output-extension")]
    output_extension: Option<String>,

    /// Show what would be processed without calling the API
    #[arg(long = "dry_run", alias = "dry-run")]
    dry_run: bool,
}

impl RunArgs {
    fn into_options(self) -> RunOptions {
        RunOptions {
            config_path: self.config,
            overrides: ConfigOverrides {
                prompts: self.prompt,
                input_dir: self.input_dir,
                output_dir: self.output_dir,
                model: self.model,
                temperature: self.temperature,
                max_tokens: self.max_tokens,
                max_concurrent: self.max_concurrent,
                timeout: self.timeout,
                input_extensions: self.extensions,
                output_extension: self.output_extension,
            },
            dry_run: self.dry_run,
        }
    }
}

/// Console logging, plus an optional plain-text log file
fn init_logging(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let console = fmt::layer()
        .with_target(false)
        .without_time()
        .with_filter(filter());

    let file = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(filter()),
            )
        }
        None => None,
    };

    tracing_subscriber::registry().with(console).with(file).init();
    Ok(())
}

async fn run(project_root: &Path, args: RunArgs) -> Result<i32, BatchError> {
    let options = args.into_options();
    if options.dry_run {
        preview_batch(project_root, options)?;
        return Ok(0);
    }

    let summary = run_batch(project_root, options).await?;
    print_summary(&summary);
    Ok(summary.exit_code())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    let project_root = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Error: cannot determine current directory: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Init { path, api_key, no_input }) => {
            let root = path.unwrap_or_else(|| project_root.clone());
            init_project(&root, InitOptions { api_key, no_input }).map(|_| 0)
        }
        None => run(&project_root, cli.run).await,
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
