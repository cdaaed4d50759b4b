//! WASI Runner Command-Line Interface
//!
//! This CLI provides tools for:
//! - Running a WASI module against a single text input
//! - Inspecting a module's exports before running it
//! - Printing the default runner configuration
//!
//! Guest stdout is printed to stdout on success; guest stderr or the trap
//! description is printed to stderr on failure.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use wasi_runner::{ExecutionOutcome, GuestFailure, RunnerConfig, Sandbox, WasiRunner};

/// Exit status for a guest that reported an error or trapped
const EXIT_GUEST_FAILURE: i32 = 1;
/// Exit status for errors before the guest ran
const EXIT_SETUP_ERROR: i32 = 2;
/// Exit status for a cancelled or timed out run
const EXIT_CANCELLED: i32 = 130;

#[derive(Parser)]
#[command(name = "wasi-run")]
#[command(author, version, about = "Run a WASI module against a text input", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a module with a message on its stdin
    Run {
        /// Path to the .wasm (or .wat) module
        module: PathBuf,

        /// Message to write to the guest's stdin
        #[arg(short, long, conflicts_with = "input")]
        message: Option<String>,

        /// File whose contents are written to the guest's stdin (- for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Cancel the run after this many milliseconds (0 = no timeout)
        #[arg(long, default_value = "0")]
        timeout_ms: u64,

        /// Entry point export to call (repeat to give fallbacks)
        #[arg(long = "entry")]
        entry_points: Vec<String>,

        /// Interrupt the guest when the run is cancelled
        #[arg(long)]
        interrupt_on_cancel: bool,

        /// JSON runner configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Compile a module and list its exported functions
    Inspect {
        /// Path to the .wasm (or .wat) module
        module: PathBuf,

        /// Entry point export to look for (repeat to give fallbacks)
        #[arg(long = "entry")]
        entry_points: Vec<String>,

        /// JSON runner configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the default runner configuration as JSON
    Config,
}

fn load_config(
    path: Option<&Path>,
    entry_points: Vec<String>,
    interrupt_on_cancel: bool,
) -> Result<RunnerConfig> {
    let mut config = match path {
        Some(path) => RunnerConfig::from_json_file(path)?,
        None => RunnerConfig::default(),
    };

    if !entry_points.is_empty() {
        config = config.entry_points(entry_points);
    }
    if interrupt_on_cancel {
        config = config.interrupt_on_cancel(true);
    }

    Ok(config)
}

fn read_message(message: Option<String>, input: Option<PathBuf>) -> Result<String> {
    if let Some(message) = message {
        return Ok(message);
    }

    match input {
        Some(path) if path.as_path() != Path::new("-") => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read input file {:?}", path)),
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read message from stdin")?;
            Ok(buf)
        }
    }
}

fn cmd_run(
    module: PathBuf,
    message: Option<String>,
    input: Option<PathBuf>,
    timeout_ms: u64,
    entry_points: Vec<String>,
    interrupt_on_cancel: bool,
    config: Option<PathBuf>,
) -> Result<i32> {
    let config = load_config(config.as_deref(), entry_points, interrupt_on_cancel)?;
    let bytes = std::fs::read(&module)
        .with_context(|| format!("Failed to read module {:?}", module))?;
    let message = read_message(message, input)?;

    info!(
        "Running {:?} ({} bytes) with {} byte message",
        module,
        bytes.len(),
        message.len()
    );

    let token = CancellationToken::new();
    let ctrlc_token = token.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nCancelling run...");
        ctrlc_token.cancel();
    })
    .context("Failed to set Ctrl+C handler")?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let runner = WasiRunner::new(config);

    let result = runtime.block_on(async {
        if timeout_ms > 0 {
            runner
                .run_with_timeout(&bytes, &message, Duration::from_millis(timeout_ms), &token)
                .await
        } else {
            runner.run(&bytes, &message, &token).await
        }
    });

    // A cancelled guest may still hold a worker thread; do not join it
    runtime.shutdown_background();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(EXIT_SETUP_ERROR);
        }
    };

    Ok(match outcome {
        ExecutionOutcome::Success(output) => {
            print!("{}", output);
            0
        }
        ExecutionOutcome::Failure(GuestFailure::Reported(text)) => {
            eprint!("{}", text);
            EXIT_GUEST_FAILURE
        }
        ExecutionOutcome::Failure(failure) => {
            eprintln!("{}", failure);
            EXIT_GUEST_FAILURE
        }
        ExecutionOutcome::Cancelled => {
            warn!("Run cancelled before the guest finished");
            eprintln!("cancelled");
            EXIT_CANCELLED
        }
    })
}

fn cmd_inspect(
    module: PathBuf,
    entry_points: Vec<String>,
    config: Option<PathBuf>,
) -> Result<i32> {
    let bytes = std::fs::read(&module)
        .with_context(|| format!("Failed to read module {:?}", module))?;
    let config = load_config(config.as_deref(), entry_points, false)?.optimize(0);

    let listing = match export_listing(&bytes, &config) {
        Ok(listing) => listing,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(EXIT_SETUP_ERROR);
        }
    };

    println!("Module: {:?} ({} bytes)", module, bytes.len());
    println!("Exported functions:");
    for line in listing {
        println!("  {}", line);
    }

    Ok(0)
}

/// Exported function names, marking the one a run would call.
fn export_listing(bytes: &[u8], config: &RunnerConfig) -> wasi_runner::Result<Vec<String>> {
    let sandbox = Sandbox::provision(bytes, config)?;
    let entry = sandbox.entry_point();

    Ok(sandbox
        .exports()
        .map(|name| {
            if Some(name) == entry {
                format!("{} (entry point)", name)
            } else {
                name.to_string()
            }
        })
        .collect())
}

fn cmd_config() -> Result<i32> {
    let json = serde_json::to_string_pretty(&RunnerConfig::default())
        .context("Failed to serialize default config")?;
    println!("{}", json);
    Ok(0)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging (stderr, stdout carries guest output)
    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let code = match cli.command {
        Commands::Run {
            module,
            message,
            input,
            timeout_ms,
            entry_points,
            interrupt_on_cancel,
            config,
        } => cmd_run(
            module,
            message,
            input,
            timeout_ms,
            entry_points,
            interrupt_on_cancel,
            config,
        )?,

        Commands::Inspect {
            module,
            entry_points,
            config,
        } => cmd_inspect(module, entry_points, config)?,

        Commands::Config => cmd_config()?,
    };

    std::process::exit(code);
}
