//! ARM7TDMI core executing ARM-state (32-bit) instructions.
//!
//! Instructions are decoded through a 4096-entry table indexed by bits 27-20
//! and 7-4 of the instruction word, then run against the CPU registers and a
//! [`Bus`].
//!
//! ```
//! use armcore::{Arm7tdmi, FlatMemory};
//!
//! // MOV R0, #1 ; ADD R1, R0, #2
//! let bus = FlatMemory::with_program(0x100, &[0xE3A0_0001, 0xE280_1002]);
//! let mut cpu = Arm7tdmi::new(bus);
//!
//! cpu.step().unwrap();
//! cpu.step().unwrap();
//! assert_eq!(cpu.register_at(1), 3);
//! ```

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_possible_wrap)]
pub mod bitwise;

#[allow(clippy::missing_panics_doc)]
#[allow(clippy::cast_lossless)]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::unreadable_literal)]
pub mod bus;
pub mod config;
pub mod cpu;

#[allow(clippy::module_name_repetitions)]
pub mod error;

pub use bus::{Bus, FlatMemory};
pub use config::{CpuConfig, UndefinedPolicy};
pub use cpu::arm7tdmi::Arm7tdmi;
pub use error::ExecutionError;
