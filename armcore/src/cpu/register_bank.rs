//! # Banked registers
//!
//! Storage for the registers that are swapped out when the CPU changes mode.
//! Each exception mode has its own R13, R14 and SPSR; FIQ additionally banks
//! R8-R12. User and System share the base set.

use serde::{Deserialize, Serialize};

use crate::cpu::cpu_modes::Mode;
use crate::cpu::psr::Psr;
use crate::cpu::registers::Registers;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterBank {
    /// User/System R8-R14, parked here while another mode owns them.
    pub user: [u32; 7],

    /// FIQ R8-R14.
    pub fiq: [u32; 7],

    /// R13-R14 of the remaining exception modes.
    pub svc: [u32; 2],
    pub abt: [u32; 2],
    pub irq: [u32; 2],
    pub und: [u32; 2],

    pub spsr_fiq: Psr,
    pub spsr_svc: Psr,
    pub spsr_abt: Psr,
    pub spsr_irq: Psr,
    pub spsr_und: Psr,
}

impl RegisterBank {
    #[must_use]
    pub const fn spsr(&self, mode: Mode) -> Option<Psr> {
        match mode {
            Mode::User | Mode::System => None,
            Mode::Fiq => Some(self.spsr_fiq),
            Mode::Irq => Some(self.spsr_irq),
            Mode::Supervisor => Some(self.spsr_svc),
            Mode::Abort => Some(self.spsr_abt),
            Mode::Undefined => Some(self.spsr_und),
        }
    }

    pub fn spsr_mut(&mut self, mode: Mode) -> Option<&mut Psr> {
        match mode {
            Mode::User | Mode::System => None,
            Mode::Fiq => Some(&mut self.spsr_fiq),
            Mode::Irq => Some(&mut self.spsr_irq),
            Mode::Supervisor => Some(&mut self.spsr_svc),
            Mode::Abort => Some(&mut self.spsr_abt),
            Mode::Undefined => Some(&mut self.spsr_und),
        }
    }

    /// R13-R14 slot of a non-FIQ mode.
    fn stack_and_link_mut(&mut self, mode: Mode) -> &mut [u32] {
        match mode {
            Mode::User | Mode::System => self.user.split_at_mut(5).1,
            Mode::Fiq => self.fiq.split_at_mut(5).1,
            Mode::Supervisor => &mut self.svc,
            Mode::Abort => &mut self.abt,
            Mode::Irq => &mut self.irq,
            Mode::Undefined => &mut self.und,
        }
    }

    /// Saves the registers owned by `mode` out of the visible set.
    /// Must run while `mode` is still the current one.
    pub fn store(&mut self, mode: Mode, registers: &Registers) {
        if mode == Mode::Fiq {
            for (slot, reg) in self.fiq.iter_mut().zip(8..=14) {
                *slot = registers.register_at(reg);
            }
            return;
        }

        for (slot, reg) in self.user.iter_mut().zip(8..=12) {
            *slot = registers.register_at(reg);
        }
        for (slot, reg) in self.stack_and_link_mut(mode).iter_mut().zip(13..=14) {
            *slot = registers.register_at(reg);
        }
    }

    /// Loads the registers owned by `mode` into the visible set.
    pub fn restore(&mut self, mode: Mode, registers: &mut Registers) {
        if mode == Mode::Fiq {
            for (value, reg) in self.fiq.iter().zip(8..=14) {
                registers.set_register_at(reg, *value);
            }
            return;
        }

        for (value, reg) in self.user.iter().zip(8..=12) {
            registers.set_register_at(reg, *value);
        }
        for (value, reg) in self.stack_and_link_mut(mode).iter().zip(13..=14) {
            registers.set_register_at(reg, *value);
        }
    }
}
