use crate::bitwise::Bits;
use crate::bus::Bus;
use crate::config::CpuConfig;
use crate::cpu::arm::lut::handler_for;
use crate::cpu::arm::opcode::ArmModeOpcode;
use crate::cpu::cpu_modes::Mode;
use crate::cpu::psr::{CpuState, Psr};
use crate::cpu::register_bank::RegisterBank;
use crate::cpu::registers::{REG_LR, REG_PROGRAM_COUNTER, Registers};
use crate::error::ExecutionError;

pub const SIZE_OF_INSTRUCTION: u32 = 4;

/// Address the CPU jumps to when it takes the undefined-instruction exception.
pub const UNDEFINED_VECTOR: u32 = 0x0000_0004;

/// ARM7TDMI core state plus the bus it executes from.
///
/// R15 always holds the executing address + 8, as the three-stage pipeline
/// makes it visible to ARM code. Writing R15 through
/// [`set_register_at`](Self::set_register_at) flushes the pipeline.
pub struct Arm7tdmi<B: Bus> {
    pub cpsr: Psr,
    pub registers: Registers,
    pub register_bank: RegisterBank,
    pub bus: B,
    config: CpuConfig,
}

impl<B: Bus + Default> Default for Arm7tdmi<B> {
    fn default() -> Self {
        Self::new(B::default())
    }
}

impl<B: Bus> Arm7tdmi<B> {
    pub fn new(bus: B) -> Self {
        Self::with_config(bus, CpuConfig::default())
    }

    pub fn with_config(bus: B, config: CpuConfig) -> Self {
        let mut cpu = Self {
            cpsr: Psr::from(config.initial_mode),
            registers: Registers::default(),
            register_bank: RegisterBank::default(),
            bus,
            config,
        };

        cpu.cpsr.set_cpu_state(CpuState::Arm);
        cpu.set_register_at(REG_PROGRAM_COUNTER, 0);

        cpu
    }

    #[must_use]
    pub const fn config(&self) -> &CpuConfig {
        &self.config
    }

    #[must_use]
    pub const fn register_at(&self, reg: usize) -> u32 {
        self.registers.register_at(reg)
    }

    /// Writes a register of the current bank. Writing R15 is a jump.
    pub fn set_register_at(&mut self, reg: usize, value: u32) {
        self.registers.set_register_at(reg, value);

        if reg == REG_PROGRAM_COUNTER {
            self.flush_pipeline();
        }
    }

    /// Aligns R15 to the current state and refills the pipeline so that the
    /// next instruction executed is the one at the written address.
    pub fn flush_pipeline(&mut self) {
        let mut pc = self.registers.program_counter();

        match self.cpsr.cpu_state() {
            CpuState::Arm => {
                pc.set_bit_off(0);
                pc.set_bit_off(1);
                self.registers.set_program_counter(pc.wrapping_add(8));
            }
            CpuState::Thumb => {
                pc.set_bit_off(0);
                self.registers.set_program_counter(pc.wrapping_add(4));
            }
        }
    }

    pub const fn step_program_counter(&mut self) {
        self.registers.advance_program_counter(SIZE_OF_INSTRUCTION);
    }

    /// Address of the instruction being executed (R15 - 8).
    #[must_use]
    pub const fn current_instruction_address(&self) -> u32 {
        self.registers.program_counter().wrapping_sub(8)
    }

    pub fn spsr(&self) -> Result<Psr, ExecutionError> {
        let mode = self.cpsr.mode();
        self.register_bank
            .spsr(mode)
            .ok_or(ExecutionError::SpsrUnavailable { mode })
    }

    pub fn spsr_mut(&mut self) -> Result<&mut Psr, ExecutionError> {
        let mode = self.cpsr.mode();
        self.register_bank
            .spsr_mut(mode)
            .ok_or(ExecutionError::SpsrUnavailable { mode })
    }

    /// Changes mode and the register bank with it. Flags and control bits
    /// other than the mode are left alone.
    pub fn swap_mode(&mut self, new_mode: Mode) {
        let old_mode = self.cpsr.mode();

        if old_mode != new_mode {
            self.register_bank.store(old_mode, &self.registers);
            self.register_bank.restore(new_mode, &mut self.registers);
        }

        self.cpsr.set_mode(new_mode);
    }

    /// CPSR = SPSR of the current mode, switching bank if the mode changes.
    pub fn restore_cpsr_from_spsr(&mut self) -> Result<(), ExecutionError> {
        let spsr = self.spsr()?;
        let mode = spsr.mode();

        self.swap_mode(mode);
        self.cpsr = spsr;
        self.cpsr.set_mode(mode);

        Ok(())
    }

    /// Slot in `register_bank.user` that holds the User copy of `reg`, when
    /// the current mode hides it.
    fn hidden_user_slot(&self, reg: usize) -> Option<usize> {
        let hidden = match self.cpsr.mode() {
            Mode::User | Mode::System => false,
            Mode::Fiq => (8..=14).contains(&reg),
            _ => (13..=14).contains(&reg),
        };

        hidden.then(|| reg - 8)
    }

    /// Reads `reg` as User mode sees it (LDM/STM with the S bit).
    #[must_use]
    pub fn user_register_at(&self, reg: usize) -> u32 {
        self.hidden_user_slot(reg).map_or_else(
            || self.registers.register_at(reg),
            |slot| self.register_bank.user[slot],
        )
    }

    pub fn set_user_register_at(&mut self, reg: usize, value: u32) {
        match self.hidden_user_slot(reg) {
            Some(slot) => self.register_bank.user[slot] = value,
            None => self.set_register_at(reg, value),
        }
    }

    /// Executes one ARM instruction word.
    ///
    /// A failed condition only advances the program counter. Otherwise the
    /// table entry for the instruction's discriminant runs it.
    pub fn execute_arm(&mut self, op_code: u32) -> Result<(), ExecutionError> {
        let op_code = ArmModeOpcode::from(op_code);
        let condition = op_code.condition();

        if !self.cpsr.can_execute(condition) {
            tracing::debug!("{op_code} skipped, condition {condition:?} not met");
            self.step_program_counter();
            return Ok(());
        }

        let handler = handler_for(op_code.discriminant());
        tracing::trace!(
            "0x{:08X}: {op_code} -> {handler:?}",
            self.current_instruction_address()
        );

        handler
            .execute(self, op_code)
            .inspect_err(|error| tracing::error!("{error}"))
    }

    /// Fetches the instruction at R15 - 8 and executes it.
    pub fn step(&mut self) -> Result<(), ExecutionError> {
        match self.cpsr.cpu_state() {
            CpuState::Thumb => {
                let error = ExecutionError::ThumbUnsupported {
                    address: self.registers.program_counter().wrapping_sub(4),
                };
                tracing::error!("{error}");
                Err(error)
            }
            CpuState::Arm => {
                let op_code = self.bus.read_word(self.current_instruction_address());
                self.execute_arm(op_code)
            }
        }
    }

    /// Takes the undefined-instruction exception for the executing instruction.
    pub(crate) fn enter_undefined_trap(&mut self) {
        let saved = self.cpsr;
        let return_address = self
            .current_instruction_address()
            .wrapping_add(SIZE_OF_INSTRUCTION);

        self.swap_mode(Mode::Undefined);
        self.register_bank.spsr_und = saved;
        self.registers.set_register_at(REG_LR, return_address);
        self.cpsr.set_irq_disable(true);
        self.cpsr.set_cpu_state(CpuState::Arm);
        self.set_register_at(REG_PROGRAM_COUNTER, UNDEFINED_VECTOR);
    }
}
