use std::path::Path;

use tracing::{error, warn};

pub mod asm;
pub mod contract;
pub mod engine;
pub mod programs;
pub mod trace;

pub use asm::{Assembly, EncodingError, Instruction, IntoWord, Opcode};
pub use contract::{Code, Contract};
pub use engine::{ExecutionEngine, ExecutionError, TraceConfig, revm::RevmEngine};
pub use revm::primitives::{Address, Bytes, U256, hex};
pub use trace::{OutputError, Outcome, StepRecord, Trace};

/// Runs contracts on an [`ExecutionEngine`] with a fixed configuration.
#[derive(Debug, Default)]
pub struct Tracer<E: ExecutionEngine> {
    engine: E,
    config: TraceConfig,
}

impl<E: ExecutionEngine> Tracer<E> {
    pub fn new(engine: E, config: TraceConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    pub fn trace(
        &mut self,
        target: Address,
        caller: Option<Address>,
        contracts: &[Contract],
    ) -> Result<Trace, ExecutionError> {
        self.engine.trace(target, caller, &self.config, contracts)
    }

    /// Traces `target` and writes the step records to `out_path` as pretty JSON.
    ///
    /// An engine failure is logged and does not stop the file from being written, it then holds an
    /// empty list and `None` is returned. Only a failure to produce the file is an error.
    pub fn trace_to_file(
        &mut self,
        target: Address,
        caller: Option<Address>,
        contracts: &[Contract],
        out_path: impl AsRef<Path>,
    ) -> Result<Option<Trace>, OutputError> {
        let trace = match self.trace(target, caller, contracts) {
            Ok(trace) => {
                if !trace.outcome.is_success() {
                    warn!(
                        outcome = ?trace.outcome,
                        steps = trace.steps.len(),
                        "execution did not succeed"
                    );
                }
                Some(trace)
            }
            Err(e) => {
                error!("{e}");
                None
            }
        };

        let steps = trace
            .as_ref()
            .map(|trace| trace.steps.as_slice())
            .unwrap_or_default();
        trace::write_json(steps, out_path)?;

        Ok(trace)
    }
}
