use std::fs;

use std::error::Error;

use asmtrace::{
    Address, Assembly, Contract, ExecutionError, Opcode, Outcome, RevmEngine, Trace, TraceConfig,
    Tracer, U256, programs,
};
use revm::primitives::SpecId;
use pretty_assertions::assert_eq;

fn target() -> Address {
    Address::with_last_byte(0xff)
}

fn traces(code: impl Into<asmtrace::Code>, gas_limit: u64) -> Trace {
    traces_with(code, TraceConfig::default().with_gas_limit(gas_limit))
}

fn traces_with(code: impl Into<asmtrace::Code>, config: TraceConfig) -> Trace {
    let contracts = [Contract::new(target(), code)];
    let mut tracer = Tracer::new(RevmEngine, config);

    tracer.trace(target(), None, &contracts).unwrap()
}

fn opcodes(trace: &Trace) -> Vec<Opcode> {
    trace
        .steps
        .iter()
        .map(|step| step.opcode().unwrap())
        .collect()
}

#[test]
fn add_sub() {
    let trace = traces(programs::add_sub().unwrap(), 100);

    assert_eq!(trace.outcome, Outcome::Success);
    assert_eq!(
        opcodes(&trace),
        vec![
            Opcode::Push4,
            Opcode::Push4,
            Opcode::Add,
            Opcode::Push4,
            Opcode::Push4,
            Opcode::Sub,
            Opcode::Stop,
        ]
    );

    assert_eq!(trace.steps[0].gas, 100);
    assert!(trace.last_gas().unwrap() < 100);
    assert_eq!(trace.gas_used, 6 * 3);

    let add = trace.steps_of(Opcode::Add).next().unwrap();
    assert_eq!(
        add.stack,
        vec![U256::from(0xcafeb0ba_u32), U256::from(0xdeadbeef_u32)]
    );
    assert_eq!(add.gas_cost, 3);

    let stop = trace.steps.last().unwrap();
    assert_eq!(
        stop.stack,
        vec![
            U256::from(0xdeadbeef_u64 + 0xcafeb0ba_u64),
            U256::from(0xfaceb00c_u32 - 0xb0bacafe_u32),
        ]
    );
}

#[test]
fn mstore_mload() {
    let trace = traces(programs::mstore_mload().unwrap(), 100);

    assert_eq!(trace.outcome, Outcome::Success);
    assert_eq!(trace.steps.len(), 6);

    let (idx, mload) = trace
        .steps
        .iter()
        .enumerate()
        .rev()
        .find(|(_, step)| step.opcode() == Some(Opcode::MLoad))
        .unwrap();

    assert_eq!(mload.stack_top(), Some(U256::from(0x40u64)));
    assert_eq!(mload.memory_word(0x40), Some(U256::from(0x80u64)));

    let after = &trace.steps[idx + 1];
    assert_eq!(after.stack_top(), Some(U256::from(0x80u64)));
    assert_eq!(after.memory.len(), 0x60);
}

#[test]
fn gas_limit_is_exact_on_older_hardforks() {
    for spec in [SpecId::PETERSBURG, SpecId::ISTANBUL, SpecId::CANCUN] {
        let config = TraceConfig::default()
            .with_gas_limit(100)
            .with_spec(spec)
            .with_calldata(vec![0x00, 0xff, 0xff]);
        let trace = traces_with(programs::add_sub().unwrap(), config);

        assert_eq!(trace.outcome, Outcome::Success, "{spec:?}");
        assert_eq!(trace.steps.len(), 7, "{spec:?}");
        assert_eq!(trace.steps[0].gas, 100, "{spec:?}");
        assert_eq!(trace.gas_used, 6 * 3, "{spec:?}");
    }
}

#[test]
fn out_of_gas_keeps_steps() {
    let trace = traces(programs::add_sub().unwrap(), 10);

    assert!(matches!(trace.outcome, Outcome::Halt { .. }));
    assert_eq!(trace.steps.len(), 4);
    assert!(trace.last_gas().unwrap() < 10);
}

#[test]
fn raw_bytecode() {
    // PUSH1 0x2a PUSH1 0x00 MSTORE PUSH1 0x20 PUSH1 0x00 RETURN
    let code = vec![0x60u8, 0x2a, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3];
    let trace = traces(code, 1_000);

    assert_eq!(trace.outcome, Outcome::Success);
    assert_eq!(trace.steps.len(), 6);
    assert_eq!(trace.output.len(), 32);
    assert_eq!(trace.output[31], 0x2a);
}

#[test]
fn revert_is_reported() {
    let mut asm = Assembly::new();
    asm.revert(0, 0).unwrap();

    let trace = traces(asm, 1_000);
    assert_eq!(trace.outcome, Outcome::Revert);
    assert_eq!(opcodes(&trace).last(), Some(&Opcode::Revert));
}

#[test]
fn missing_target() {
    let contracts = [Contract::new(Address::with_last_byte(0x01), vec![0x00u8])];
    let mut tracer = Tracer::new(RevmEngine, TraceConfig::default());

    let err = tracer.trace(target(), None, &contracts).unwrap_err();
    assert!(matches!(err, ExecutionError::MissingTarget(address) if address == target()));
}

#[test]
fn engine_error_keeps_its_source() {
    // a caller with deployed code is rejected before any instruction runs
    let contracts = [Contract::new(target(), vec![0x00u8])];
    let mut tracer = Tracer::new(RevmEngine, TraceConfig::default());

    let err = tracer.trace(target(), Some(target()), &contracts).unwrap_err();
    assert!(matches!(err, ExecutionError::Engine(_)));
    assert!(err.source().is_some());
}

#[test]
fn writes_json_even_without_trace() {
    let dir = std::env::temp_dir().join(format!("asmtrace-scenarios-{}", std::process::id()));
    let mut tracer = Tracer::new(RevmEngine, TraceConfig::default().with_gas_limit(100));

    let contracts = [Contract::new(target(), programs::mstore_mload().unwrap())];
    let path = dir.join("mstore_mload.json");
    let trace = tracer
        .trace_to_file(target(), None, &contracts, &path)
        .unwrap()
        .unwrap();

    let json = fs::read_to_string(&path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&json).unwrap();
    let steps = json.as_array().unwrap();
    assert_eq!(steps.len(), trace.steps.len());
    assert_eq!(steps[4]["opName"], "MLOAD");
    assert_eq!(steps[5]["stack"][0], "0x80");

    let path = dir.join("missing.json");
    let trace = tracer
        .trace_to_file(Address::ZERO, None, &contracts, &path)
        .unwrap();
    assert!(trace.is_none());
    assert_eq!(fs::read_to_string(&path).unwrap(), "[]");

    fs::remove_dir_all(dir).unwrap();
}
