use revm::primitives::U256;
use tracing::trace;

pub mod disasm;
pub mod opcode;
pub mod operand;

pub use disasm::{DecodeError, DecodedInstruction, Disassembly, disassemble};
pub use opcode::Opcode;
pub use operand::{EncodingError, IntoWord, encode_push};

/// One symbolic operation together with the values it pushes beforehand.
///
/// Operands are kept in argument order. They are pushed last to first so that the first operand
/// ends up on top of the stack, which is the order the EVM documents for its inputs: `SUB a b`
/// computes `a - b` and `MSTORE offset value` expects the offset on top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// A lone push of the minimal width for the value.
    Push(U256),
    Op { opcode: Opcode, operands: Vec<U256> },
}

impl Instruction {
    pub fn op(opcode: Opcode, operands: Vec<U256>) -> Self {
        Self::Op { opcode, operands }
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Push(value) => {
                Opcode::push(operand::push_width(*value)).unwrap_or(Opcode::Push32)
            }
            Self::Op { opcode, .. } => *opcode,
        }
    }

    pub fn operands(&self) -> &[U256] {
        match self {
            Self::Push(value) => std::slice::from_ref(value),
            Self::Op { operands, .. } => operands,
        }
    }

    /// Appends the canonical encoding of this instruction to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Self::Push(value) => encode_push(*value, out),
            Self::Op { opcode, operands } => {
                for &operand in operands.iter().rev() {
                    encode_push(operand, out);
                }

                out.push(*opcode as u8);
            }
        }
    }
}

/// Fluent EVM bytecode builder.
///
/// ```
/// # use asmtrace::Assembly;
/// let mut asm = Assembly::new();
/// asm.mstore(0x40, 0x80)?.mload(0x40)?;
///
/// assert_eq!(asm.bytecode(), [0x60, 0x80, 0x60, 0x40, 0x52, 0x60, 0x40, 0x51]);
/// # Ok::<(), asmtrace::EncodingError>(())
/// ```
///
/// Every call converts its operands before touching the buffer, so a call that fails with an
/// [`EncodingError`] leaves the assembly exactly as it was.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    instructions: Vec<Instruction>,
    bytecode: Vec<u8>,
}

macro_rules! binary_ops {
    ($($(#[$attr:meta])* $name:ident => $opcode:ident,)*) => {
        $(
            $(#[$attr])*
            pub fn $name(
                &mut self,
                a: impl IntoWord,
                b: impl IntoWord,
            ) -> Result<&mut Self, EncodingError> {
                self.binary(Opcode::$opcode, a, b)
            }
        )*
    };
}

impl Assembly {
    pub fn new() -> Self {
        Self::default()
    }

    /// The encoded program, in append order.
    pub fn bytecode(&self) -> &[u8] {
        &self.bytecode
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytecode
    }

    /// Length of the encoded program in bytes. This is also the offset of the next instruction.
    pub fn len(&self) -> usize {
        self.bytecode.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytecode.is_empty()
    }

    /// Appends a bare opcode. Immediates are not written, so this is meant for operations that
    /// take all their inputs from the stack.
    pub fn op(&mut self, opcode: Opcode) -> &mut Self {
        self.emit(Instruction::op(opcode, Vec::new()))
    }

    pub fn push(&mut self, value: impl IntoWord) -> Result<&mut Self, EncodingError> {
        let value = value.into_word()?;
        Ok(self.emit(Instruction::Push(value)))
    }

    binary_ops! {
        add => Add,
        mul => Mul,
        /// `a - b`
        sub => Sub,
        /// `a / b`, zero when `b` is zero
        div => Div,
        sdiv => SDiv,
        /// `a % b` (MOD)
        rem => Mod,
        smod => SMod,
        /// `a ** b`
        exp => Exp,
        /// Sign-extends `b` from byte `a`.
        signextend => SignExtend,
        lt => Lt,
        gt => Gt,
        slt => SLt,
        sgt => SGt,
        eq => Eq,
        and => And,
        or => Or,
        xor => Xor,
        /// Byte `a` of `b`, counted from the most significant.
        byte => Byte,
        /// `b << a`
        shl => Shl,
        /// `b >> a`
        shr => Shr,
        sar => Sar,
    }

    pub fn iszero(&mut self, a: impl IntoWord) -> Result<&mut Self, EncodingError> {
        self.unary(Opcode::IsZero, a)
    }

    pub fn not(&mut self, a: impl IntoWord) -> Result<&mut Self, EncodingError> {
        self.unary(Opcode::Not, a)
    }

    /// Stores the 32-byte `value` at memory `offset`.
    pub fn mstore(
        &mut self,
        offset: impl IntoWord,
        value: impl IntoWord,
    ) -> Result<&mut Self, EncodingError> {
        self.binary(Opcode::MStore, offset, value)
    }

    /// Stores the low byte of `value` at memory `offset`.
    pub fn mstore8(
        &mut self,
        offset: impl IntoWord,
        value: impl IntoWord,
    ) -> Result<&mut Self, EncodingError> {
        self.binary(Opcode::MStore8, offset, value)
    }

    /// Loads the word at memory `offset` onto the stack.
    pub fn mload(&mut self, offset: impl IntoWord) -> Result<&mut Self, EncodingError> {
        self.unary(Opcode::MLoad, offset)
    }

    pub fn sstore(
        &mut self,
        key: impl IntoWord,
        value: impl IntoWord,
    ) -> Result<&mut Self, EncodingError> {
        self.binary(Opcode::SStore, key, value)
    }

    pub fn sload(&mut self, key: impl IntoWord) -> Result<&mut Self, EncodingError> {
        self.unary(Opcode::SLoad, key)
    }

    pub fn jump(&mut self, dest: impl IntoWord) -> Result<&mut Self, EncodingError> {
        self.unary(Opcode::Jump, dest)
    }

    /// Jumps to `dest` when `cond` is non-zero.
    pub fn jumpi(
        &mut self,
        dest: impl IntoWord,
        cond: impl IntoWord,
    ) -> Result<&mut Self, EncodingError> {
        self.binary(Opcode::JumpI, dest, cond)
    }

    /// Halts and returns `size` bytes of memory starting at `offset` (RETURN).
    pub fn ret(
        &mut self,
        offset: impl IntoWord,
        size: impl IntoWord,
    ) -> Result<&mut Self, EncodingError> {
        self.binary(Opcode::Return, offset, size)
    }

    pub fn revert(
        &mut self,
        offset: impl IntoWord,
        size: impl IntoWord,
    ) -> Result<&mut Self, EncodingError> {
        self.binary(Opcode::Revert, offset, size)
    }

    pub fn pop(&mut self) -> &mut Self {
        self.op(Opcode::Pop)
    }

    pub fn stop(&mut self) -> &mut Self {
        self.op(Opcode::Stop)
    }

    pub fn jumpdest(&mut self) -> &mut Self {
        self.op(Opcode::JumpDest)
    }

    /// `DUPn`, `n` in `1..=16`.
    pub fn dup(&mut self, n: u8) -> Result<&mut Self, EncodingError> {
        let opcode = Opcode::dup(n).ok_or(EncodingError::InvalidStackIndex(n))?;
        Ok(self.op(opcode))
    }

    /// `SWAPn`, `n` in `1..=16`.
    pub fn swap(&mut self, n: u8) -> Result<&mut Self, EncodingError> {
        let opcode = Opcode::swap(n).ok_or(EncodingError::InvalidStackIndex(n))?;
        Ok(self.op(opcode))
    }
}

/// Internals
impl Assembly {
    fn unary(&mut self, opcode: Opcode, a: impl IntoWord) -> Result<&mut Self, EncodingError> {
        let a = a.into_word()?;
        Ok(self.emit(Instruction::op(opcode, vec![a])))
    }

    fn binary(
        &mut self,
        opcode: Opcode,
        a: impl IntoWord,
        b: impl IntoWord,
    ) -> Result<&mut Self, EncodingError> {
        let a = a.into_word()?;
        let b = b.into_word()?;
        Ok(self.emit(Instruction::op(opcode, vec![a, b])))
    }

    fn emit(&mut self, instr: Instruction) -> &mut Self {
        trace!(
            offset = self.bytecode.len(),
            opcode = %instr.opcode(),
            operands = ?instr.operands(),
            "emit"
        );

        instr.encode(&mut self.bytecode);
        self.instructions.push(instr);
        self
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn encoded(opcode: Opcode, operands: &[u64]) -> Vec<u8> {
        let mut out = Vec::new();
        Instruction::op(opcode, operands.iter().map(|&v| U256::from(v)).collect())
            .encode(&mut out);
        out
    }

    #[test]
    fn add_sub_bytes() {
        let mut asm = Assembly::new();
        asm.add(0xdeadbeef_u32, 0xcafeb0ba_u32)
            .unwrap()
            .sub(0xfaceb00c_u32, 0xb0bacafe_u32)
            .unwrap();

        #[rustfmt::skip]
        let expected = vec![
            0x63, 0xca, 0xfe, 0xb0, 0xba,
            0x63, 0xde, 0xad, 0xbe, 0xef,
            0x01,
            0x63, 0xb0, 0xba, 0xca, 0xfe,
            0x63, 0xfa, 0xce, 0xb0, 0x0c,
            0x03,
        ];
        assert_eq!(asm.bytecode(), expected.as_slice());
    }

    #[test]
    fn chained_calls_concatenate() {
        let mut asm = Assembly::new();
        asm.add(1, 2).unwrap().sub(0x0300, 4).unwrap();

        let mut expected = encoded(Opcode::Add, &[1, 2]);
        expected.extend(encoded(Opcode::Sub, &[0x0300, 4]));

        assert_eq!(asm.bytecode(), expected.as_slice());
        assert_eq!(asm.instructions().len(), 2);
        assert_eq!(asm.instructions()[1].opcode(), Opcode::Sub);
    }

    #[test]
    fn memory_operand_order() {
        let mut asm = Assembly::new();
        asm.mstore(0x40, 0x80).unwrap().mload(0x40).unwrap();

        // value pushed first, offset ends on top
        assert_eq!(
            asm.bytecode(),
            [0x60, 0x80, 0x60, 0x40, 0x52, 0x60, 0x40, 0x51]
        );
    }

    #[test]
    fn failed_call_leaves_assembly_untouched() {
        let mut asm = Assembly::new();
        asm.push(1).unwrap();
        let before = asm.bytecode().to_vec();

        let err = asm.add(7, vec![0x01u8; 33]).unwrap_err();
        assert_eq!(err, EncodingError::OperandTooWide(33));
        assert_eq!(asm.bytecode(), before.as_slice());
        assert_eq!(asm.instructions(), [Instruction::Push(U256::from(1u64))]);

        assert!(asm.mstore(-1, 0).is_err());
        assert_eq!(asm.len(), 2);
    }

    #[test]
    fn stack_ops() {
        let mut asm = Assembly::new();
        asm.dup(1).unwrap().swap(16).unwrap().pop().jumpdest().stop();

        assert_eq!(asm.bytecode(), [0x80, 0x9f, 0x50, 0x5b, 0x00]);
        assert_eq!(asm.dup(0).unwrap_err(), EncodingError::InvalidStackIndex(0));
        assert_eq!(asm.swap(17).unwrap_err(), EncodingError::InvalidStackIndex(17));
    }

    #[test]
    fn control_flow() {
        let mut asm = Assembly::new();
        asm.jumpi(6, 1).unwrap().stop().jumpdest().ret(0, 0x20).unwrap();

        assert_eq!(
            asm.bytecode(),
            [0x60, 0x01, 0x60, 0x06, 0x57, 0x00, 0x5b, 0x60, 0x20, 0x60, 0x00, 0xf3]
        );
    }

    #[test]
    fn wide_operands() {
        let mut asm = Assembly::new();
        asm.push(U256::MAX).unwrap();
        assert_eq!(asm.len(), 33);

        asm.push("0x0102030405060708090a0b0c0d0e0f10").unwrap();
        assert_eq!(asm.bytecode()[33], Opcode::Push16 as u8);
    }
}
