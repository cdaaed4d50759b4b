//! Single-shot execution: provision, wire, race, classify.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use super::config::RunnerConfig;
use super::outcome::{ExecutionOutcome, GuestFailure};
use super::race::{race_blocking, RaceResult};
use super::sandbox::{build_engine, InterruptHandle, Sandbox, WiredSandbox};
use crate::error::Result;

/// Runs WASI modules against a text input, one fresh sandbox per call.
#[derive(Debug, Clone, Default)]
pub struct WasiRunner {
    config: RunnerConfig,
}

impl WasiRunner {
    /// Create a runner with the given configuration.
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run `bytes` with `input` on stdin until it finishes or `cancel` fires.
    ///
    /// Compilation, instantiation (including the module's start function) and
    /// the entry point all run on one blocking worker raced against `cancel`.
    /// Setup failures are returned as `Err`; guest results come back as an
    /// [`ExecutionOutcome`]. If `cancel` fires first the result is `Cancelled`,
    /// even while setup is still in progress.
    pub async fn run(
        &self,
        bytes: &[u8],
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<ExecutionOutcome> {
        let engine = build_engine(&self.config)?;
        let interrupt = self
            .config
            .interrupt_on_cancel
            .then(|| InterruptHandle::new(&engine));

        let bytes = bytes.to_vec();
        let input = input.to_string();
        let config = self.config.clone();
        let token = cancel.clone();
        let start = Instant::now();

        let work = move || -> Result<ExecutionOutcome> {
            let sandbox = Sandbox::provision_on(engine, &bytes, &config)?;
            // The epoch deadline is armed now; skip instantiation if already cancelled
            if token.is_cancelled() {
                return Ok(ExecutionOutcome::Cancelled);
            }
            let wired = sandbox.wire(&input)?;
            if token.is_cancelled() {
                return Ok(ExecutionOutcome::Cancelled);
            }
            Ok(wired.run_to_completion())
        };

        let outcome = match race_blocking(work, cancel).await {
            RaceResult::Finished(result) => result?,
            RaceResult::Panicked(e) => panicked(e),
            RaceResult::Cancelled => cancelled(interrupt.as_ref(), "module"),
        };

        tracing::info!(
            outcome = outcome.kind(),
            elapsed = ?start.elapsed(),
            "run settled"
        );

        Ok(outcome)
    }

    /// Like [`run`](Self::run), additionally cancelling after `timeout`.
    ///
    /// The deadline drives a child of `cancel`, so cancelling the parent still
    /// ends the run early and the parent is never cancelled by the timer.
    pub async fn run_with_timeout(
        &self,
        bytes: &[u8],
        input: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ExecutionOutcome> {
        let deadline = cancel.child_token();
        let timer = {
            let deadline = deadline.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                deadline.cancel();
            })
        };

        let result = self.run(bytes, input, &deadline).await;
        timer.abort();
        result
    }
}

/// Run `bytes` with the default configuration.
pub async fn run_module(
    bytes: &[u8],
    input: &str,
    cancel: &CancellationToken,
) -> Result<ExecutionOutcome> {
    WasiRunner::default().run(bytes, input, cancel).await
}

/// Race the guest's entry point against `cancel`.
///
/// The guest runs on the blocking pool. If `cancel` wins, this returns
/// [`ExecutionOutcome::Cancelled`] at once; the guest is not stopped unless
/// the sandbox was built with `interrupt_on_cancel`, and its sandbox is dropped
/// on the worker thread whenever the entry point returns.
pub async fn execute(wired: WiredSandbox, cancel: &CancellationToken) -> ExecutionOutcome {
    let interrupt = wired.interrupt_handle();
    let entry = wired.entry_name().to_string();
    let start = Instant::now();

    let outcome = match race_blocking(move || wired.run_to_completion(), cancel).await {
        RaceResult::Finished(outcome) => outcome,
        RaceResult::Panicked(e) => panicked(e),
        RaceResult::Cancelled => cancelled(interrupt.as_ref(), &entry),
    };

    tracing::info!(
        entry = %entry,
        outcome = outcome.kind(),
        elapsed = ?start.elapsed(),
        "run settled"
    );

    outcome
}

fn panicked(e: tokio::task::JoinError) -> ExecutionOutcome {
    ExecutionOutcome::Failure(GuestFailure::Trap(format!("guest worker panicked: {}", e)))
}

fn cancelled(interrupt: Option<&InterruptHandle>, guest: &str) -> ExecutionOutcome {
    match interrupt {
        Some(handle) => {
            handle.interrupt();
            tracing::warn!(guest = %guest, "run cancelled, guest interrupted");
        }
        None => {
            tracing::warn!(
                guest = %guest,
                "run cancelled, guest left running until it returns"
            );
        }
    }
    ExecutionOutcome::Cancelled
}
