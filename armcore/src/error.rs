use thiserror::Error;

use crate::cpu::cpu_modes::Mode;

/// Terminal failure of a single instruction. The CPU state is left as it
/// was when the failing handler gave up; emulation must not resume.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("unimplemented {detail} (instruction 0x{raw:08X})")]
    Unimplemented { raw: u32, detail: String },

    #[error("invalid encoding 0x{raw:08X}: transfer offset shifted by a register")]
    InvalidEncoding { raw: u32 },

    #[error("undefined instruction 0x{raw:08X}")]
    UndefinedInstruction { raw: u32 },

    #[error("SPSR accessed in {mode} mode")]
    SpsrUnavailable { mode: Mode },

    #[error("THUMB state is not supported (PC=0x{address:08X})")]
    ThumbUnsupported { address: u32 },
}

impl ExecutionError {
    pub(crate) fn unimplemented(raw: u32, detail: impl Into<String>) -> Self {
        Self::Unimplemented {
            raw,
            detail: detail.into(),
        }
    }
}
