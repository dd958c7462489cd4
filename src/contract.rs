use derive_more::From;
use revm::primitives::{Address, Bytes};

use crate::asm::Assembly;

const ADDRESS_BYTES: usize = 20;

/// The code installed at a contract address.
///
/// Either the assembly the code was built from, or raw bytes from elsewhere. There is exactly one
/// of the two, so there is no question of which one is executed.
#[derive(Debug, Clone, From)]
pub enum Code {
    Assembly(Assembly),
    Bytecode(Bytes),
}

impl Code {
    pub fn bytes(&self) -> &[u8] {
        match self {
            Code::Assembly(asm) => asm.bytecode(),
            Code::Bytecode(bytes) => &bytes[..],
        }
    }
}

impl From<Vec<u8>> for Code {
    fn from(bytes: Vec<u8>) -> Self {
        Code::Bytecode(bytes.into())
    }
}

#[derive(Debug, Clone)]
pub struct Contract {
    pub address: Address,
    pub code: Code,
}

impl Contract {
    pub fn new(address: Address, code: impl Into<Code>) -> Self {
        Self {
            address,
            code: code.into(),
        }
    }

    pub fn bytecode(&self) -> &[u8] {
        self.code.bytes()
    }
}

/// Address whose trailing bytes are `bytes`, left-padded with zeros. `None` when `bytes` is longer
/// than an address.
pub fn address_from_bytes(bytes: &[u8]) -> Option<Address> {
    let mut raw = [0u8; ADDRESS_BYTES];
    let start = raw.len().checked_sub(bytes.len())?;
    raw[start..].copy_from_slice(bytes);

    Some(Address::from(raw))
}
