use std::convert::Infallible;

use ::revm::primitives::{Address, Bytes, EVMError, SpecId, U256};

use crate::{contract::Contract, trace::Trace};

pub mod revm;

/// Gas given to contract code when nothing else is configured.
pub const DEFAULT_GAS_LIMIT: u64 = 30_000_000;

#[derive(Debug, Clone)]
pub struct TraceConfig {
    /// Gas available to the contract's code. Transaction overhead is not taken out of it.
    pub gas_limit: u64,
    pub spec: SpecId,
    pub value: U256,
    pub calldata: Bytes,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
            spec: SpecId::CANCUN,
            value: U256::ZERO,
            calldata: Bytes::new(),
        }
    }
}

impl TraceConfig {
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    pub fn with_spec(mut self, spec: SpecId) -> Self {
        self.spec = spec;
        self
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    pub fn with_calldata(mut self, calldata: impl Into<Bytes>) -> Self {
        self.calldata = calldata.into();
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("no contract is installed at {0}")]
    MissingTarget(Address),
    #[error("execution engine failed: {0}")]
    Engine(#[from] EVMError<Infallible>),
}

/// A virtual machine that runs contract code and records every step it takes.
pub trait ExecutionEngine {
    /// Installs `contracts`, calls `target` from `caller` (the zero address when `None`) and
    /// returns the recorded steps.
    ///
    /// Reverts and exceptional halts are not errors, they are reported in [`Trace::outcome`].
    fn trace(
        &mut self,
        target: Address,
        caller: Option<Address>,
        config: &TraceConfig,
        contracts: &[Contract],
    ) -> Result<Trace, ExecutionError>;
}
