//! Configuration for the WASI runner.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, RunnerError};

/// Configuration for a single-shot module run.
///
/// Every run builds a fresh engine from this configuration; nothing here is
/// cached between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Exported function names tried in order as the guest entry point.
    /// Each must have the signature `() -> ()`.
    pub entry_points: Vec<String>,

    /// Optional cap on stdout in bytes (`None` = unbounded).
    /// Output past the cap fails the run instead of being truncated.
    pub stdout_capacity: Option<usize>,

    /// Optional cap on stderr in bytes (`None` = unbounded)
    pub stderr_capacity: Option<usize>,

    /// Cranelift optimization level (0-2)
    pub optimization_level: u8,

    /// Enable SIMD support
    pub enable_simd: bool,

    /// Interrupt the guest through epoch interruption when the run is cancelled.
    ///
    /// When disabled, cancellation only stops the caller from waiting and the
    /// guest keeps running on its worker thread until it returns on its own.
    pub interrupt_on_cancel: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            entry_points: vec!["run".to_string(), "_start".to_string()],
            stdout_capacity: None,
            stderr_capacity: None,
            optimization_level: 2,
            enable_simd: true,
            interrupt_on_cancel: false,
        }
    }
}

impl RunnerConfig {
    /// Create config for development/debugging
    pub fn development() -> Self {
        Self {
            optimization_level: 0, // Faster compilation
            ..Default::default()
        }
    }

    /// Create config that stops the guest when the run is cancelled
    pub fn interruptible() -> Self {
        Self {
            interrupt_on_cancel: true,
            ..Default::default()
        }
    }

    /// Parse a config from JSON. Missing fields take their default values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| RunnerError::Config(format!("invalid runner config: {}", e)))
    }

    /// Load a config from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            RunnerError::Config(format!("failed to read config {:?}: {}", path, e))
        })?;
        Self::from_json_str(&json)
    }

    /// Builder: replace the entry point candidates with a single name
    pub fn entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry_points = vec![name.into()];
        self
    }

    /// Builder: set entry point candidates
    pub fn entry_points<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entry_points = names.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: cap stdout
    pub fn stdout_capacity(mut self, bytes: usize) -> Self {
        self.stdout_capacity = Some(bytes);
        self
    }

    /// Builder: cap stderr
    pub fn stderr_capacity(mut self, bytes: usize) -> Self {
        self.stderr_capacity = Some(bytes);
        self
    }

    /// Builder: set optimization level
    pub fn optimize(mut self, level: u8) -> Self {
        self.optimization_level = level.min(2);
        self
    }

    /// Builder: enable SIMD
    pub fn simd(mut self, enable: bool) -> Self {
        self.enable_simd = enable;
        self
    }

    /// Builder: interrupt the guest on cancellation
    pub fn interrupt_on_cancel(mut self, enable: bool) -> Self {
        self.interrupt_on_cancel = enable;
        self
    }
}
