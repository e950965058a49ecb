use common::validate::InvalidEncoding;

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Unsupported {
    #[error("translate mode transfer")]
    Translate,

    #[error("transfer without a byte count, mask/compare or single termination")]
    Unterminated,
}

/// Why a step stopped short. A halt is not an error; see `ExecRet::Halt`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StepError {
    #[error(transparent)]
    InvalidEncoding(#[from] InvalidEncoding),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(Unsupported),

    #[error("No way to execute opcode {opcode} ({word:#06x})")]
    UnknownOpcode { opcode: u8, word: u16 },
}

impl From<Unsupported> for StepError {
    fn from(feature: Unsupported) -> Self {
        StepError::UnsupportedFeature(feature)
    }
}
