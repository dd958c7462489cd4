use revm::{
    Database, Evm, EvmContext, Inspector,
    db::{CacheDB, EmptyDB},
    inspector_handle_register,
    interpreter::{Interpreter, gas::validate_initial_tx_gas},
    primitives::{AccountInfo, Address, Bytecode, Bytes, ExecutionResult, SpecId, TxKind, U256},
};
use tracing::{debug, info};

use crate::{
    contract::Contract,
    engine::{ExecutionEngine, ExecutionError, TraceConfig},
    trace::{Outcome, StepRecord, Trace},
};

/// [`ExecutionEngine`] backed by revm.
///
/// Each call starts from an empty in-memory state holding only the given contracts, and runs a
/// plain call transaction against the target.
#[derive(Debug, Default)]
pub struct RevmEngine;

impl ExecutionEngine for RevmEngine {
    fn trace(
        &mut self,
        target: Address,
        caller: Option<Address>,
        config: &TraceConfig,
        contracts: &[Contract],
    ) -> Result<Trace, ExecutionError> {
        if !contracts.iter().any(|contract| contract.address == target) {
            return Err(ExecutionError::MissingTarget(target));
        }

        let caller = caller.unwrap_or(Address::ZERO);
        let db = genesis(caller, config.value, contracts);

        // revm charges the intrinsic cost out of the transaction's gas before the first
        // instruction runs, the code itself should see exactly `gas_limit`
        let intrinsic = intrinsic_gas(config.spec, &config.calldata);
        let tx_gas_limit = config.gas_limit.saturating_add(intrinsic);

        debug!(
            %target,
            %caller,
            gas_limit = config.gas_limit,
            intrinsic,
            spec = ?config.spec,
            "starting execution"
        );

        let mut evm = Evm::builder()
            .with_db(db)
            .with_external_context(StepRecorder::default())
            .with_spec_id(config.spec)
            .modify_tx_env(|tx| {
                tx.caller = caller;
                tx.transact_to = TxKind::Call(target);
                tx.gas_limit = tx_gas_limit;
                tx.value = config.value;
                tx.data = config.calldata.clone();
            })
            .append_handler_register(inspector_handle_register)
            .build();

        let result = evm.transact()?;
        let steps = std::mem::take(&mut evm.context.external.steps);

        let (outcome, gas_used, output) = match result.result {
            ExecutionResult::Success {
                gas_used, output, ..
            } => (Outcome::Success, gas_used, output.into_data()),
            ExecutionResult::Revert { gas_used, output } => (Outcome::Revert, gas_used, output),
            ExecutionResult::Halt { reason, gas_used } => (
                Outcome::Halt {
                    reason: format!("{reason:?}"),
                },
                gas_used,
                Bytes::new(),
            ),
        };
        let gas_used = gas_used.saturating_sub(intrinsic);

        info!(steps = steps.len(), gas_used, ?outcome, "execution finished");

        Ok(Trace {
            steps,
            outcome,
            gas_used,
            output,
        })
    }
}

fn genesis(caller: Address, value: U256, contracts: &[Contract]) -> CacheDB<EmptyDB> {
    let mut db = CacheDB::new(EmptyDB::default());

    for contract in contracts {
        let code = Bytecode::new_raw(Bytes::from(contract.bytecode().to_vec()));
        let balance = if contract.address == caller {
            value
        } else {
            U256::ZERO
        };

        debug!(address = %contract.address, size = contract.bytecode().len(), "installing contract");
        db.insert_account_info(
            contract.address,
            AccountInfo::new(balance, 0, code.hash_slow(), code),
        );
    }

    if !value.is_zero() && !contracts.iter().any(|contract| contract.address == caller) {
        db.insert_account_info(
            caller,
            AccountInfo {
                balance: value,
                ..Default::default()
            },
        );
    }

    db
}

/// Gas a plain call with `calldata` costs before its first instruction runs under `spec`.
fn intrinsic_gas(spec: SpecId, calldata: &[u8]) -> u64 {
    validate_initial_tx_gas(spec, calldata, false, &[], 0)
}

/// Inspector that snapshots the interpreter before every instruction.
#[derive(Debug, Default)]
struct StepRecorder {
    steps: Vec<StepRecord>,
    gas_before: u64,
}

impl<DB: Database> Inspector<DB> for StepRecorder {
    fn step(&mut self, interp: &mut Interpreter, context: &mut EvmContext<DB>) {
        self.gas_before = interp.gas.remaining();

        self.steps.push(StepRecord {
            pc: interp.program_counter(),
            op: interp.current_opcode(),
            gas: self.gas_before,
            gas_cost: 0,
            depth: context.journaled_state.depth(),
            stack: interp.stack.data().clone(),
            memory: interp.shared_memory.context_memory().to_vec(),
        });
    }

    fn step_end(&mut self, interp: &mut Interpreter, _context: &mut EvmContext<DB>) {
        if let Some(step) = self.steps.last_mut() {
            step.gas_cost = self.gas_before.saturating_sub(interp.gas.remaining());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intrinsic_cost_of_calldata() {
        assert_eq!(intrinsic_gas(SpecId::CANCUN, &[]), 21_000);
        assert_eq!(
            intrinsic_gas(SpecId::CANCUN, &[0x00, 0x01, 0xff]),
            21_000 + 4 + 16 + 16
        );
    }

    #[test]
    fn intrinsic_cost_follows_hardfork() {
        assert_eq!(
            intrinsic_gas(SpecId::PETERSBURG, &[0x00, 0xff]),
            21_000 + 4 + 68
        );
        assert_eq!(intrinsic_gas(SpecId::ISTANBUL, &[0x00, 0xff]), 21_000 + 4 + 16);
    }

    #[test]
    fn caller_funded_for_value() {
        let caller = Address::from([0x11u8; 20]);
        let contracts = [Contract::new(Address::from([0x22u8; 20]), vec![0x00u8])];

        let db = genesis(caller, U256::from(5u64), &contracts);
        assert_eq!(db.accounts[&caller].info.balance, U256::from(5u64));
        assert!(db.accounts[&contracts[0].address].info.balance.is_zero());

        let db = genesis(caller, U256::ZERO, &contracts);
        assert!(!db.accounts.contains_key(&caller));
    }
}
