use std::{
    borrow::Cow,
    fs, io,
    path::{Path, PathBuf},
};

use revm::primitives::{Bytes, U256, hex};
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::asm::{Opcode, operand::WORD_BYTES};

/// State of the machine right before one instruction executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub pc: usize,
    pub op: u8,
    /// Gas left before the instruction.
    pub gas: u64,
    pub gas_cost: u64,
    pub depth: u64,
    /// Bottom of the stack first.
    pub stack: Vec<U256>,
    pub memory: Vec<u8>,
}

impl StepRecord {
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::from_byte(self.op)
    }

    pub fn op_name(&self) -> Cow<'static, str> {
        Opcode::name_of(self.op)
    }

    pub fn stack_top(&self) -> Option<U256> {
        self.stack.last().copied()
    }

    /// The 32-byte word at `offset`, or `None` when it reaches past the active memory.
    pub fn memory_word(&self, offset: usize) -> Option<U256> {
        let word = self.memory.get(offset..offset.checked_add(WORD_BYTES)?)?;
        Some(U256::from_be_slice(word))
    }

    /// Memory split into 32-byte words, hex encoded.
    pub fn memory_words(&self) -> Vec<String> {
        self.memory
            .chunks(WORD_BYTES)
            .map(|chunk| format!("{:0<64}", hex::encode(chunk)))
            .collect()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StepData {
    pc: usize,
    op: u8,
    op_name: Cow<'static, str>,
    gas: u64,
    gas_cost: u64,
    depth: u64,
    stack: Vec<String>,
    memory: Vec<String>,
}

impl Serialize for StepRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        StepData {
            pc: self.pc,
            op: self.op,
            op_name: self.op_name(),
            gas: self.gas,
            gas_cost: self.gas_cost,
            depth: self.depth,
            stack: self.stack.iter().map(|v| format!("{v:#x}")).collect(),
            memory: self.memory_words(),
        }
        .serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Revert,
    /// Exceptional halt, e.g. out of gas or an invalid jump.
    Halt { reason: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Everything the engine reports about one execution.
#[derive(Debug, Clone)]
pub struct Trace {
    pub steps: Vec<StepRecord>,
    pub outcome: Outcome,
    /// Gas spent by the contract code, without the transaction's intrinsic cost.
    pub gas_used: u64,
    pub output: Bytes,
}

impl Trace {
    pub fn last_gas(&self) -> Option<u64> {
        self.steps.last().map(|step| step.gas)
    }

    pub fn steps_of(&self, opcode: Opcode) -> impl Iterator<Item = &StepRecord> + '_ {
        self.steps.iter().filter(move |step| step.op == opcode as u8)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("couldn't serialize trace")]
    Serialize(#[from] serde_json::Error),
    #[error("couldn't write trace to {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub fn to_json(steps: &[StepRecord]) -> Result<String, OutputError> {
    Ok(serde_json::to_string_pretty(steps)?)
}

/// Writes `steps` as indented JSON to `path`, creating missing parent directories.
pub fn write_json(steps: &[StepRecord], path: impl AsRef<Path>) -> Result<(), OutputError> {
    let path = path.as_ref();
    let json = to_json(steps)?;

    let io_error = |source| OutputError::Io {
        path: path.to_owned(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    fs::write(path, json).map_err(io_error)?;
    debug!(path = %path.display(), steps = steps.len(), "wrote trace");

    Ok(())
}
