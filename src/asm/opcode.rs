use std::borrow::Cow;

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// One-byte EVM instruction identifiers (Cancun).
///
/// The mnemonic is the upper-cased variant name, so `Opcode::MStore` displays as `MSTORE` and
/// `"mstore".parse::<Opcode>()` yields it back.
#[repr(u8)]
#[derive(
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
    FromPrimitive,
    ToPrimitive,
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Opcode {
    // stop and arithmetic
    Stop = 0x00,
    Add = 0x01,
    Mul = 0x02,
    Sub = 0x03,
    Div = 0x04,
    SDiv = 0x05,
    Mod = 0x06,
    SMod = 0x07,
    AddMod = 0x08,
    MulMod = 0x09,
    Exp = 0x0a,
    SignExtend = 0x0b,

    // comparison and bitwise logic
    Lt = 0x10,
    Gt = 0x11,
    SLt = 0x12,
    SGt = 0x13,
    Eq = 0x14,
    IsZero = 0x15,
    And = 0x16,
    Or = 0x17,
    Xor = 0x18,
    Not = 0x19,
    Byte = 0x1a,
    Shl = 0x1b,
    Shr = 0x1c,
    Sar = 0x1d,

    Keccak256 = 0x20,

    // environment
    Address = 0x30,
    Balance = 0x31,
    Origin = 0x32,
    Caller = 0x33,
    CallValue = 0x34,
    CallDataLoad = 0x35,
    CallDataSize = 0x36,
    CallDataCopy = 0x37,
    CodeSize = 0x38,
    CodeCopy = 0x39,
    GasPrice = 0x3a,
    ExtCodeSize = 0x3b,
    ExtCodeCopy = 0x3c,
    ReturnDataSize = 0x3d,
    ReturnDataCopy = 0x3e,
    ExtCodeHash = 0x3f,

    // block
    BlockHash = 0x40,
    Coinbase = 0x41,
    Timestamp = 0x42,
    Number = 0x43,
    PrevRandao = 0x44,
    GasLimit = 0x45,
    ChainId = 0x46,
    SelfBalance = 0x47,
    BaseFee = 0x48,
    BlobHash = 0x49,
    BlobBaseFee = 0x4a,

    // stack, memory, storage and flow
    Pop = 0x50,
    MLoad = 0x51,
    MStore = 0x52,
    MStore8 = 0x53,
    SLoad = 0x54,
    SStore = 0x55,
    Jump = 0x56,
    JumpI = 0x57,
    Pc = 0x58,
    MSize = 0x59,
    Gas = 0x5a,
    JumpDest = 0x5b,
    TLoad = 0x5c,
    TStore = 0x5d,
    MCopy = 0x5e,

    Push0 = 0x5f,
    Push1 = 0x60,
    Push2 = 0x61,
    Push3 = 0x62,
    Push4 = 0x63,
    Push5 = 0x64,
    Push6 = 0x65,
    Push7 = 0x66,
    Push8 = 0x67,
    Push9 = 0x68,
    Push10 = 0x69,
    Push11 = 0x6a,
    Push12 = 0x6b,
    Push13 = 0x6c,
    Push14 = 0x6d,
    Push15 = 0x6e,
    Push16 = 0x6f,
    Push17 = 0x70,
    Push18 = 0x71,
    Push19 = 0x72,
    Push20 = 0x73,
    Push21 = 0x74,
    Push22 = 0x75,
    Push23 = 0x76,
    Push24 = 0x77,
    Push25 = 0x78,
    Push26 = 0x79,
    Push27 = 0x7a,
    Push28 = 0x7b,
    Push29 = 0x7c,
    Push30 = 0x7d,
    Push31 = 0x7e,
    Push32 = 0x7f,

    Dup1 = 0x80,
    Dup2 = 0x81,
    Dup3 = 0x82,
    Dup4 = 0x83,
    Dup5 = 0x84,
    Dup6 = 0x85,
    Dup7 = 0x86,
    Dup8 = 0x87,
    Dup9 = 0x88,
    Dup10 = 0x89,
    Dup11 = 0x8a,
    Dup12 = 0x8b,
    Dup13 = 0x8c,
    Dup14 = 0x8d,
    Dup15 = 0x8e,
    Dup16 = 0x8f,

    Swap1 = 0x90,
    Swap2 = 0x91,
    Swap3 = 0x92,
    Swap4 = 0x93,
    Swap5 = 0x94,
    Swap6 = 0x95,
    Swap7 = 0x96,
    Swap8 = 0x97,
    Swap9 = 0x98,
    Swap10 = 0x99,
    Swap11 = 0x9a,
    Swap12 = 0x9b,
    Swap13 = 0x9c,
    Swap14 = 0x9d,
    Swap15 = 0x9e,
    Swap16 = 0x9f,

    Log0 = 0xa0,
    Log1 = 0xa1,
    Log2 = 0xa2,
    Log3 = 0xa3,
    Log4 = 0xa4,

    // system
    Create = 0xf0,
    Call = 0xf1,
    CallCode = 0xf2,
    Return = 0xf3,
    DelegateCall = 0xf4,
    Create2 = 0xf5,
    StaticCall = 0xfa,
    Revert = 0xfd,
    Invalid = 0xfe,
    SelfDestruct = 0xff,
}

impl Opcode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::from_u8(byte)
    }

    /// `PUSHn` for `n` in `0..=32`.
    pub fn push(n: usize) -> Option<Self> {
        if n > 32 {
            return None;
        }

        Self::from_u8(Opcode::Push0 as u8 + n as u8)
    }

    /// `DUPn` for `n` in `1..=16`.
    pub fn dup(n: u8) -> Option<Self> {
        if !(1..=16).contains(&n) {
            return None;
        }

        Self::from_u8(Opcode::Dup1 as u8 + (n - 1))
    }

    /// `SWAPn` for `n` in `1..=16`.
    pub fn swap(n: u8) -> Option<Self> {
        if !(1..=16).contains(&n) {
            return None;
        }

        Self::from_u8(Opcode::Swap1 as u8 + (n - 1))
    }

    /// Number of immediate bytes following this opcode in the code. Zero for everything except
    /// `PUSH1` through `PUSH32`.
    pub fn push_width(self) -> usize {
        let byte = self as u8;
        if (Opcode::Push1 as u8..=Opcode::Push32 as u8).contains(&byte) {
            (byte - Opcode::Push0 as u8) as usize
        } else {
            0
        }
    }

    pub fn mnemonic(self) -> &'static str {
        self.into()
    }

    /// Mnemonic for a raw code byte, `0xNN` when the byte names no instruction.
    pub fn name_of(byte: u8) -> Cow<'static, str> {
        match Self::from_byte(byte) {
            Some(opcode) => Cow::Borrowed(opcode.mnemonic()),
            None => Cow::Owned(format!("{byte:#04x}")),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(opcode: Opcode) -> Self {
        opcode as u8
    }
}
