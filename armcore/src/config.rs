use serde::{Deserialize, Serialize};

use crate::cpu::cpu_modes::Mode;

/// What happens when an architecturally undefined encoding is executed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedPolicy {
    /// Stop with [`ExecutionError::UndefinedInstruction`](crate::ExecutionError::UndefinedInstruction).
    #[default]
    Abort,

    /// Take the undefined-instruction exception (vector 0x04, Undefined mode).
    Trap,
}

/// Construction-time knobs of an [`Arm7tdmi`](crate::cpu::arm7tdmi::Arm7tdmi).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuConfig {
    pub undefined_policy: UndefinedPolicy,

    /// Mode after reset. The BIOS entry point runs in Supervisor.
    pub initial_mode: Mode,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            undefined_policy: UndefinedPolicy::default(),
            initial_mode: Mode::Supervisor,
        }
    }
}
