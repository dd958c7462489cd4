//! The reference programs that the command line can trace by name.

use crate::asm::{Assembly, EncodingError};

/// `ADD` then `SUB` on four 32-bit constants.
pub fn add_sub() -> Result<Assembly, EncodingError> {
    let mut asm = Assembly::new();
    asm.add(0xdeadbeef_u32, 0xcafeb0ba_u32)?
        .sub(0xfaceb00c_u32, 0xb0bacafe_u32)?;
    Ok(asm)
}

/// Stores `0x80` at memory offset `0x40` and loads it back.
pub fn mstore_mload() -> Result<Assembly, EncodingError> {
    let mut asm = Assembly::new();
    asm.mstore(0x40, 0x80)?.mload(0x40)?;
    Ok(asm)
}
