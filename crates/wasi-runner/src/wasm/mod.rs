//! WebAssembly execution of untrusted WASI modules.
//!
//! Each call provisions a fresh wasmtime engine, store and WASI-only linker,
//! redirects the guest's stdio to in-memory pipes, and races the guest's entry
//! point against a cancellation token.
//!
//! ## Security Model
//!
//! - **Memory isolation**: Each module runs in its own linear memory and store
//! - **Capability-based**: Only WASI preview1 is linked; stdio is the sole grant
//! - **No filesystem side effects**: stdin/stdout/stderr are memory pipes
//! - **Single use**: Nothing is cached or shared between calls
//!
//! ## Cancellation
//!
//! Guest code is not preemptible by default. Cancelling returns
//! [`ExecutionOutcome::Cancelled`] to the caller immediately, but the guest keeps
//! its worker thread until it returns; its sandbox is dropped then. Set
//! [`RunnerConfig::interrupt_on_cancel`] to make the guest trap instead.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tokio_util::sync::CancellationToken;
//! use wasi_runner::{run_module, ExecutionOutcome};
//!
//! let token = CancellationToken::new();
//! match run_module(&bytes, "hello", &token).await? {
//!     ExecutionOutcome::Success(out) => println!("{out}"),
//!     ExecutionOutcome::Failure(failure) => eprintln!("{failure}"),
//!     ExecutionOutcome::Cancelled => eprintln!("cancelled"),
//! }
//! ```

mod config;
mod outcome;
mod race;
mod runner;
mod sandbox;
mod stdio;

pub use config::RunnerConfig;
pub use outcome::{ExecutionOutcome, GuestFailure};
pub use runner::{execute, run_module, WasiRunner};
pub use sandbox::{build_engine, GuestState, InterruptHandle, Sandbox, WiredSandbox};
pub use stdio::StdioChannels;

#[cfg(test)]
mod tests;
