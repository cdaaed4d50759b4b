//! Sandbox provisioning and stdio wiring using wasmtime.
//!
//! Uses wasmtime-wasi preview1 for compatibility with standard WASI modules.

use super::config::RunnerConfig;
use super::outcome::{classify, ExecutionOutcome};
use super::stdio::StdioChannels;
use crate::error::{Result, RunnerError};

use std::time::Instant;

use wasmtime::*;
use wasmtime_wasi::preview1::WasiP1Ctx;

/// Host state for the store, containing the WASI preview1 context.
pub struct GuestState {
    wasi: WasiP1Ctx,
}

impl GuestState {
    /// State with every stdio stream closed, used until channels are wired.
    fn detached() -> Self {
        Self {
            wasi: wasmtime_wasi::WasiCtxBuilder::new().build_p1(),
        }
    }

    fn wasi(&mut self) -> &mut WasiP1Ctx {
        &mut self.wasi
    }
}

/// A freshly provisioned, single-use sandbox: engine, compiled module, isolated
/// store and a linker exposing only WASI.
pub struct Sandbox {
    engine: Engine,
    module: Module,
    store: Store<GuestState>,
    linker: Linker<GuestState>,
    config: RunnerConfig,
}

/// A sandbox with stdio attached and the module instantiated, ready to run.
pub struct WiredSandbox {
    store: Store<GuestState>,
    entry: TypedFunc<(), ()>,
    entry_name: String,
    channels: StdioChannels,
    interrupt: Option<InterruptHandle>,
}

/// Stops a running guest at its next epoch check.
#[derive(Clone)]
pub struct InterruptHandle {
    engine: Engine,
}

impl InterruptHandle {
    /// Handle for sandboxes provisioned on `engine`.
    pub fn new(engine: &Engine) -> Self {
        Self {
            engine: engine.clone(),
        }
    }

    /// Bump the engine epoch past the store deadline so the guest traps.
    pub fn interrupt(&self) {
        self.engine.increment_epoch();
    }
}

impl Sandbox {
    /// Compile `bytes` and build an isolated store and WASI-only linker.
    pub fn provision(bytes: &[u8], config: &RunnerConfig) -> Result<Self> {
        Self::provision_on(build_engine(config)?, bytes, config)
    }

    /// Like [`provision`](Self::provision), on an engine from [`build_engine`].
    ///
    /// Lets the caller hold an [`InterruptHandle`] before compilation and
    /// instantiation start, so a looping start function can be interrupted too.
    pub fn provision_on(engine: Engine, bytes: &[u8], config: &RunnerConfig) -> Result<Self> {
        let module = Module::new(&engine, bytes)
            .map_err(|e| RunnerError::InvalidModule(format!("{:#}", e)))?;

        let mut store = Store::new(&engine, GuestState::detached());

        // Trap at the first epoch bump; only the cancellation branch bumps it
        if config.interrupt_on_cancel {
            store.set_epoch_deadline(1);
        }

        let mut linker: Linker<GuestState> = Linker::new(&engine);
        wasmtime_wasi::preview1::add_to_linker_sync(&mut linker, |state| state.wasi())
            .map_err(|e| RunnerError::Config(format!("WASI link failed: {}", e)))?;

        tracing::debug!(
            module_bytes = bytes.len(),
            imports = module.imports().len(),
            exports = module.exports().len(),
            "sandbox provisioned"
        );

        Ok(Self {
            engine,
            module,
            store,
            linker,
            config: config.clone(),
        })
    }

    /// Get exported function names of the compiled module.
    pub fn exports(&self) -> impl Iterator<Item = &str> {
        self.module.exports().filter_map(|e| {
            if matches!(e.ty(), ExternType::Func(_)) {
                Some(e.name())
            } else {
                None
            }
        })
    }

    /// First configured entry point candidate exported as `() -> ()`.
    ///
    /// Resolved statically from the module's export types; [`wire`](Self::wire)
    /// picks the same export.
    pub fn entry_point(&self) -> Option<&str> {
        self.config.entry_points.iter().map(String::as_str).find(|name| {
            matches!(
                self.module.get_export(name),
                Some(ExternType::Func(ty)) if ty.params().len() == 0 && ty.results().len() == 0
            )
        })
    }

    /// Attach stdio channels seeded with `input`, instantiate the module and
    /// resolve its entry point.
    pub fn wire(mut self, input: &str) -> Result<WiredSandbox> {
        let channels = StdioChannels::allocate(input, &self.config)?;

        // Stdin is fully seeded before the guest can observe it
        self.store.data_mut().wasi = channels.wasi_context();

        let instance = self
            .linker
            .instantiate(&mut self.store, &self.module)
            .map_err(|e| RunnerError::InstantiationFailed(format!("{:#}", e)))?;

        let (entry_name, entry) =
            resolve_entry(&instance, &mut self.store, &self.config.entry_points)?;

        tracing::debug!(entry = %entry_name, input_bytes = channels.input_len(), "sandbox wired");

        let interrupt = self
            .config
            .interrupt_on_cancel
            .then(|| InterruptHandle::new(&self.engine));

        Ok(WiredSandbox {
            store: self.store,
            entry,
            entry_name,
            channels,
            interrupt,
        })
    }
}

impl WiredSandbox {
    /// Name of the resolved entry point.
    pub fn entry_name(&self) -> &str {
        &self.entry_name
    }

    /// Handle for interrupting the guest, present when `interrupt_on_cancel` is set.
    pub fn interrupt_handle(&self) -> Option<InterruptHandle> {
        self.interrupt.clone()
    }

    /// Run the entry point on the current thread and classify the result.
    ///
    /// Blocks until the guest returns or traps. Consumes the sandbox, which is
    /// dropped once the channels have been drained.
    pub fn run_to_completion(mut self) -> ExecutionOutcome {
        let start = Instant::now();
        let result = self.entry.call(&mut self.store, ());
        let outcome = classify(result, &self.channels);

        tracing::debug!(
            entry = %self.entry_name,
            elapsed = ?start.elapsed(),
            outcome = outcome.kind(),
            "guest returned"
        );

        outcome
    }
}

/// Build the per-call engine described by `config`.
pub fn build_engine(config: &RunnerConfig) -> Result<Engine> {
    let mut engine_config = Config::new();

    engine_config.cranelift_opt_level(match config.optimization_level {
        0 => OptLevel::None,
        1 => OptLevel::Speed,
        _ => OptLevel::SpeedAndSize,
    });

    engine_config.wasm_simd(config.enable_simd);

    if config.interrupt_on_cancel {
        engine_config.epoch_interruption(true);
    }

    Engine::new(&engine_config)
        .map_err(|e| RunnerError::Config(format!("engine creation failed: {}", e)))
}

/// Look up the first entry point candidate exported as `() -> ()`.
fn resolve_entry(
    instance: &Instance,
    store: &mut Store<GuestState>,
    candidates: &[String],
) -> Result<(String, TypedFunc<(), ()>)> {
    let mut last_error = None;

    for name in candidates {
        match instance.get_typed_func::<(), ()>(&mut *store, name) {
            Ok(func) => return Ok((name.clone(), func)),
            Err(e) => last_error = Some(format!("'{}': {}", name, e)),
        }
    }

    Err(RunnerError::InstantiationFailed(match last_error {
        Some(detail) => format!(
            "no entry point found (tried {}); last error {}",
            candidates.join(", "),
            detail
        ),
        None => "no entry point candidates configured".to_string(),
    }))
}
