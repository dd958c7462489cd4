use std::fmt;

use derive_more::{Deref, From};
use revm::primitives::U256;

use crate::asm::opcode::Opcode;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("byte {byte:#04x} at offset {offset} is not an instruction")]
    UnknownOpcode { offset: usize, byte: u8 },
    #[error("{opcode} at offset {offset} needs {width} bytes but only {available} remain")]
    TruncatedPush {
        offset: usize,
        opcode: Opcode,
        width: usize,
        available: usize,
    },
}

/// A single instruction read back out of a byte sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstruction {
    pub offset: usize,
    pub opcode: Opcode,
    /// Payload of `PUSH1`..`PUSH32`.
    pub immediate: Option<U256>,
}

impl fmt::Display for DecodedInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}: {}", self.offset, self.opcode)?;
        if let Some(value) = self.immediate {
            write!(f, " {value:#x}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, From)]
pub struct Disassembly(Vec<DecodedInstruction>);

impl Disassembly {
    pub fn into_inner(self) -> Vec<DecodedInstruction> {
        self.0
    }

    /// Values of every push, in code order.
    pub fn immediates(&self) -> impl Iterator<Item = U256> + '_ {
        self.0.iter().filter_map(|instr| instr.immediate)
    }
}

impl fmt::Display for Disassembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instr in &self.0 {
            writeln!(f, "{instr}")?;
        }
        Ok(())
    }
}

pub fn disassemble(code: &[u8]) -> Result<Disassembly, DecodeError> {
    let mut decoded = Vec::new();
    let mut offset = 0;

    while let Some(&byte) = code.get(offset) {
        let Some(opcode) = Opcode::from_byte(byte) else {
            return Err(DecodeError::UnknownOpcode { offset, byte });
        };

        let width = opcode.push_width();
        let start = offset + 1;
        let available = code.len() - start;
        if width > available {
            return Err(DecodeError::TruncatedPush {
                offset,
                opcode,
                width,
                available,
            });
        }

        let immediate = (width > 0).then(|| U256::from_be_slice(&code[start..start + width]));

        decoded.push(DecodedInstruction {
            offset,
            opcode,
            immediate,
        });

        offset = start + width;
    }

    Ok(Disassembly(decoded))
}
