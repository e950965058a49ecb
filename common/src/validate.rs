use crate::asm::{Reg, RawIns, Shape};

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InvalidEncoding {
    #[error("Bad opcode {opcode} in {word:#06x}")]
    BadOpcode { opcode: u8, word: u16 },

    #[error("Space selector {0} without an addressing mode")]
    StraySpace(u8),

    #[error("Bad pointer register {0}")]
    BadPointerReg(u8),

    #[error("Bad immediate width {0}")]
    BadImmWidth(u8),

    #[error("Bad displacement width {0}")]
    BadDispWidth(u8),

    #[error("Wrong reserved bits {found:#04x}, expected {expected:#04x}")]
    ReservedBits { found: u8, expected: u8 },

    #[error("Bad special instruction {0:#06x}")]
    BadSpecial(u16),

    #[error("Memory to memory store without a preceding load")]
    StoreWithoutLoad,

    #[error("Memory to memory load not followed by its store")]
    LoadWithoutStore,
}

const VALID_WIDTH_SELECT: std::ops::RangeInclusive<u8> = 1..=2;

/// Checks an instruction word against its opcode's descriptor. Catches
/// structural problems only, nothing that depends on machine state.
pub fn validate(raw: RawIns) -> Result<(), InvalidEncoding> {
    let desc = raw.descriptor();
    let shape = desc.shape;

    if desc.is_invalid() {
        return Err(InvalidEncoding::BadOpcode { opcode: raw.opcode(), word: raw.0 });
    }

    if !shape.contains(Shape::AA) && raw.mm() != 0 {
        return Err(InvalidEncoding::StraySpace(raw.mm()));
    }

    if shape.contains(Shape::PPP) && Reg::from_ppp(raw.rrr()).is_none() {
        return Err(InvalidEncoding::BadPointerReg(raw.rrr()));
    }

    if shape.contains(Shape::WB) && !VALID_WIDTH_SELECT.contains(&raw.wb()) {
        return Err(InvalidEncoding::BadImmWidth(raw.wb()));
    }

    if shape.contains(Shape::DD) && !VALID_WIDTH_SELECT.contains(&raw.wb()) {
        return Err(InvalidEncoding::BadDispWidth(raw.wb()));
    }

    // Several opcodes use bits they have no operand in as part of the opcode.
    let found = raw.low() & !shape.operand_bits();
    if found != desc.extra {
        return Err(InvalidEncoding::ReservedBits { found, expected: desc.extra });
    }

    Ok(())
}
