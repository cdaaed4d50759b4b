//! Execution outcomes and their classification.

use std::fmt;

use wasmtime::Trap;
use wasmtime_wasi::I32Exit;

use super::stdio::StdioChannels;
use crate::error::RunnerError;

/// Result of a single guest run. Exactly one is produced per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The guest finished without writing to stderr; holds its stdout
    Success(String),
    /// The guest reported an error or faulted
    Failure(GuestFailure),
    /// The cancellation signal fired before the guest finished
    Cancelled,
}

/// Why a guest run failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuestFailure {
    /// Text the guest wrote to stderr
    Reported(String),
    /// Runtime fault description
    Trap(String),
}

impl ExecutionOutcome {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionOutcome::Success(_) => "success",
            ExecutionOutcome::Failure(GuestFailure::Reported(_)) => "reported_error",
            ExecutionOutcome::Failure(GuestFailure::Trap(_)) => "trap",
            ExecutionOutcome::Cancelled => "cancelled",
        }
    }

    /// Whether the run succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success(_))
    }

    /// Flatten into the runner error taxonomy.
    pub fn into_result(self) -> Result<String, RunnerError> {
        match self {
            ExecutionOutcome::Success(output) => Ok(output),
            ExecutionOutcome::Failure(GuestFailure::Reported(text)) => {
                Err(RunnerError::GuestReportedError(text))
            }
            ExecutionOutcome::Failure(GuestFailure::Trap(text)) => Err(RunnerError::GuestTrap(text)),
            ExecutionOutcome::Cancelled => Err(RunnerError::Cancelled),
        }
    }
}

impl fmt::Display for GuestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuestFailure::Reported(text) => f.write_str(text),
            GuestFailure::Trap(text) => write!(f, "trap: {}", text),
        }
    }
}

/// Classify the entry point's return against what the guest wrote.
///
/// Output past a configured cap fails the run whatever the guest returned.
/// Otherwise any stderr text wins over stdout and `proc_exit(0)` counts as a
/// normal return.
pub(crate) fn classify(result: wasmtime::Result<()>, channels: &StdioChannels) -> ExecutionOutcome {
    if let Some((stream, limit)) = channels.overflow() {
        return ExecutionOutcome::Failure(GuestFailure::Trap(format!(
            "{} exceeded capacity of {} bytes",
            stream, limit
        )));
    }

    let error = match result {
        Ok(()) => return from_streams(channels),
        Err(e) => e,
    };

    match error.downcast_ref::<I32Exit>() {
        Some(I32Exit(0)) => from_streams(channels),
        Some(I32Exit(status)) => {
            let stderr = channels.stderr_text();
            if stderr.is_empty() {
                ExecutionOutcome::Failure(GuestFailure::Trap(format!(
                    "guest exited with status {}",
                    status
                )))
            } else {
                ExecutionOutcome::Failure(GuestFailure::Reported(stderr))
            }
        }
        None => ExecutionOutcome::Failure(GuestFailure::Trap(describe_trap(&error))),
    }
}

fn from_streams(channels: &StdioChannels) -> ExecutionOutcome {
    let stderr = channels.stderr_text();
    if !stderr.is_empty() {
        return ExecutionOutcome::Failure(GuestFailure::Reported(stderr));
    }
    ExecutionOutcome::Success(channels.stdout_text())
}

fn describe_trap(error: &wasmtime::Error) -> String {
    match error.downcast_ref::<Trap>() {
        Some(trap) => trap.to_string(),
        None => format!("{:#}", error),
    }
}
