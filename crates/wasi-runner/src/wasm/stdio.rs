//! In-memory stdio channels for a guest run.

use std::io;

use wasmtime_wasi::pipe::{MemoryInputPipe, MemoryOutputPipe};
use wasmtime_wasi::preview1::WasiP1Ctx;
use wasmtime_wasi::WasiCtxBuilder;

use super::config::RunnerConfig;
use crate::error::Result;

/// The three standard streams of one guest run.
///
/// Stdin is seeded in full at allocation time and never touched again. Stdout
/// and stderr are written by the guest and must only be drained after the
/// entry point has returned.
pub struct StdioChannels {
    stdin: MemoryInputPipe,
    stdout: MemoryOutputPipe,
    stderr: MemoryOutputPipe,
    input_len: usize,
    stdout_limit: Option<usize>,
    stderr_limit: Option<usize>,
}

impl StdioChannels {
    /// Allocate channels and seed stdin with `input`.
    pub fn allocate(input: &str, config: &RunnerConfig) -> Result<Self> {
        if config.stdout_capacity == Some(0) {
            return Err(no_space("stdout"));
        }
        if config.stderr_capacity == Some(0) {
            return Err(no_space("stderr"));
        }

        let bytes = input.as_bytes().to_vec();
        let input_len = bytes.len();

        Ok(Self {
            stdin: MemoryInputPipe::new(bytes),
            stdout: output_pipe(config.stdout_capacity),
            stderr: output_pipe(config.stderr_capacity),
            input_len,
            stdout_limit: config.stdout_capacity,
            stderr_limit: config.stderr_capacity,
        })
    }

    /// Number of bytes seeded into stdin.
    pub fn input_len(&self) -> usize {
        self.input_len
    }

    /// Build a WASI preview1 context whose stdio is redirected to these channels.
    ///
    /// Nothing else is granted: no preopened directories, env vars, args or sockets.
    pub(crate) fn wasi_context(&self) -> WasiP1Ctx {
        let mut builder = WasiCtxBuilder::new();
        builder
            .stdin(self.stdin.clone())
            .stdout(self.stdout.clone())
            .stderr(self.stderr.clone());
        builder.build_p1()
    }

    /// Contents written to stdout so far.
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout.contents()).into_owned()
    }

    /// Contents written to stderr so far.
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr.contents()).into_owned()
    }

    /// The first stream the guest wrote past its configured cap, with the cap.
    pub fn overflow(&self) -> Option<(&'static str, usize)> {
        exceeded(&self.stdout, self.stdout_limit)
            .map(|limit| ("stdout", limit))
            .or_else(|| exceeded(&self.stderr, self.stderr_limit).map(|limit| ("stderr", limit)))
    }
}

/// One byte of headroom past the cap, so a full pipe means the guest overflowed.
fn output_pipe(limit: Option<usize>) -> MemoryOutputPipe {
    MemoryOutputPipe::new(limit.map_or(usize::MAX, |limit| limit.saturating_add(1)))
}

fn exceeded(pipe: &MemoryOutputPipe, limit: Option<usize>) -> Option<usize> {
    limit.filter(|&limit| pipe.contents().len() > limit)
}

fn no_space(stream: &str) -> crate::error::RunnerError {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("{} channel has zero capacity", stream),
    )
    .into()
}
