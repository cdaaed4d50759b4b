//! # WASI Runner
//!
//! Single-shot execution of untrusted WebAssembly/WASI modules.
//!
//! Given module bytes, an input message and a cancellation token, the runner
//! builds a fresh sandbox, writes the message to the guest's stdin, runs the
//! guest's entry point and classifies the result from what it wrote:
//!
//! | Guest behaviour | Outcome |
//! |-----------------|---------|
//! | returns, stderr empty | `Success(stdout)` |
//! | returns, stderr non-empty | `Failure(Reported(stderr))` |
//! | traps | `Failure(Trap(description))` |
//! | token fires first | `Cancelled` |
//!
//! Malformed modules, missing imports or a missing entry point are reported as
//! [`RunnerError`] before any guest code runs.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use wasi_runner::{RunnerConfig, WasiRunner};
//!
//! let runner = WasiRunner::new(RunnerConfig::interruptible());
//! let outcome = runner
//!     .run_with_timeout(&bytes, "hello", Duration::from_secs(5), &CancellationToken::new())
//!     .await?;
//! let reply = outcome.into_result()?;
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod wasm;

// Re-export main types
pub use error::{Result, RunnerError};
pub use wasm::{
    execute, run_module, ExecutionOutcome, GuestFailure, RunnerConfig, Sandbox, WasiRunner,
    WiredSandbox,
};

pub use tokio_util::sync::CancellationToken;
