use revm::primitives::{U256, hex};

use crate::asm::opcode::Opcode;

/// Width of an EVM stack word in bytes.
pub const WORD_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("operand needs {0} bytes but an EVM word holds {max}", max = WORD_BYTES)]
    OperandTooWide(usize),
    #[error("negative operand {0} has no unsigned encoding")]
    NegativeOperand(i128),
    #[error("invalid hex operand {0:?}")]
    InvalidHex(String),
    #[error("stack index {0} is outside 1..=16")]
    InvalidStackIndex(u8),
}

/// Conversion of an instruction argument into a 256-bit stack word.
pub trait IntoWord {
    fn into_word(self) -> Result<U256, EncodingError>;
}

macro_rules! unsigned_words {
    ($($ty:ty),*) => {
        $(
            impl IntoWord for $ty {
                fn into_word(self) -> Result<U256, EncodingError> {
                    Ok(U256::from(self))
                }
            }
        )*
    };
}

// Unsuffixed integer literals fall back to i32, so signed types are accepted as long as they are
// not negative.
macro_rules! signed_words {
    ($($ty:ty),*) => {
        $(
            impl IntoWord for $ty {
                fn into_word(self) -> Result<U256, EncodingError> {
                    u128::try_from(self)
                        .map(U256::from)
                        .map_err(|_| EncodingError::NegativeOperand(self as i128))
                }
            }
        )*
    };
}

unsigned_words!(u8, u16, u32, u64, u128, usize);
signed_words!(i8, i16, i32, i64, i128, isize);

impl IntoWord for U256 {
    fn into_word(self) -> Result<U256, EncodingError> {
        Ok(self)
    }
}

impl IntoWord for &[u8] {
    fn into_word(self) -> Result<U256, EncodingError> {
        word_from_be_bytes(self)
    }
}

impl<const N: usize> IntoWord for [u8; N] {
    fn into_word(self) -> Result<U256, EncodingError> {
        word_from_be_bytes(&self)
    }
}

impl IntoWord for Vec<u8> {
    fn into_word(self) -> Result<U256, EncodingError> {
        word_from_be_bytes(&self)
    }
}

impl IntoWord for &str {
    fn into_word(self) -> Result<U256, EncodingError> {
        let digits = self.strip_prefix("0x").unwrap_or(self);
        if digits.is_empty() {
            return Err(EncodingError::InvalidHex(self.to_owned()));
        }

        // odd-length literals like "0x80f" are read as if zero-padded
        let bytes = if digits.len() % 2 == 1 {
            hex::decode(format!("0{digits}"))
        } else {
            hex::decode(digits)
        }
        .map_err(|_| EncodingError::InvalidHex(self.to_owned()))?;

        word_from_be_bytes(&bytes)
    }
}

impl IntoWord for String {
    fn into_word(self) -> Result<U256, EncodingError> {
        self.as_str().into_word()
    }
}

/// Reads a big-endian value. Leading zero bytes are not significant, so a 40 byte slice that holds
/// a small number is still accepted.
pub fn word_from_be_bytes(bytes: &[u8]) -> Result<U256, EncodingError> {
    let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    let significant = &bytes[first..];

    if significant.len() > WORD_BYTES {
        return Err(EncodingError::OperandTooWide(significant.len()));
    }

    U256::try_from_be_slice(significant).ok_or(EncodingError::OperandTooWide(significant.len()))
}

/// Minimum number of payload bytes needed to push `value`. Zero still takes one byte.
pub fn push_width(value: U256) -> usize {
    value.bit_len().div_ceil(8).max(1)
}

/// Appends `PUSHn` followed by the `n` big-endian bytes of `value`, `n` being [`push_width`].
pub fn encode_push(value: U256, out: &mut Vec<u8>) {
    let width = push_width(value);
    let bytes = value.to_be_bytes::<WORD_BYTES>();

    let push = Opcode::push(width).unwrap_or(Opcode::Push32);
    out.push(push as u8);
    out.extend_from_slice(&bytes[WORD_BYTES - width..]);
}
