use crate::bitwise::Bits;
use crate::bus::Bus;
use crate::config::UndefinedPolicy;
use crate::cpu::arm::alu_instruction::{
    AluInstructionKind, ArmModeAluInstruction, PsrKind, ShiftResult, add_inner_op,
    rotated_immediate, shift_immediate, shift_register, sub_inner_op,
};
use crate::cpu::arm::lut::PsrOpKind;
use crate::cpu::arm::opcode::ArmModeOpcode;
use crate::cpu::arm7tdmi::{Arm7tdmi, SIZE_OF_INSTRUCTION};
use crate::cpu::cpu_modes::Mode;
use crate::cpu::flags::{
    HalfwordTransferKind, Indexing, LoadStoreKind, Offsetting, OperandKind, ReadWriteKind,
    ShiftKind,
};
use crate::cpu::psr::{PSR_CONTROL_MASK, PSR_FLAGS_MASK, Psr};
use crate::cpu::registers::{REG_LR, REG_PROGRAM_COUNTER};
use crate::error::ExecutionError;

impl<B: Bus> Arm7tdmi<B> {
    pub fn data_processing(
        &mut self,
        op_code: ArmModeOpcode,
        alu_instruction: ArmModeAluInstruction,
        operand_kind: OperandKind,
        set_conditions: bool,
    ) -> Result<(), ExecutionError> {
        use ArmModeAluInstruction::{
            Adc, Add, And, Bic, Cmn, Cmp, Eor, Mov, Mvn, Orr, Rsb, Rsc, Sbc, Sub, Teq, Tst,
        };

        let rn = op_code.register(16);
        let rd = op_code.register(12);
        let shift_by_register = operand_kind == OperandKind::Register && op_code.get_bit(4);

        let op1 = self.alu_register_operand(rn, shift_by_register);
        let op2 = self.operand2(op_code, operand_kind);

        let arithmetic = match alu_instruction {
            Add => Some(add_inner_op(op1, op2.value)),
            Sub | Cmp => Some(sub_inner_op(op1, op2.value)),
            And | Tst | Eor | Orr | Mov => None,
            Rsb | Adc | Sbc | Rsc | Teq | Cmn | Bic | Mvn => {
                return Err(ExecutionError::unimplemented(
                    op_code.raw(),
                    format!("data processing {alu_instruction}"),
                ));
            }
        };

        let result = match (alu_instruction, &arithmetic) {
            (_, Some(r)) => r.result,
            (And | Tst, None) => op1 & op2.value,
            (Eor, None) => op1 ^ op2.value,
            (Orr, None) => op1 | op2.value,
            _ => op2.value,
        };

        let writes_result = !alu_instruction.is_test();

        if set_conditions {
            if writes_result && rd == REG_PROGRAM_COUNTER && self.cpsr.mode().has_spsr() {
                // MOVS PC, LR and friends: return from exception.
                self.restore_cpsr_from_spsr()?;
            } else {
                match (alu_instruction.kind(), arithmetic) {
                    (AluInstructionKind::Arithmetic, Some(r)) => self.cpsr.set_flags(&r),
                    _ => {
                        self.cpsr.set_sign_and_zero(result);
                        self.cpsr.set_carry_flag(op2.carry);
                    }
                }
            }
        }

        if writes_result {
            self.set_register_at(rd, result);
        }

        // Test instructions never write Rd, so they step even with Rd == R15.
        if !(writes_result && rd == REG_PROGRAM_COUNTER) {
            self.step_program_counter();
        }

        Ok(())
    }

    /// Reads `reg` as an ALU operand. When the shift amount comes from a
    /// register the instruction takes one more cycle and R15 reads as X+12.
    fn alu_register_operand(&self, reg: usize, shift_by_register: bool) -> u32 {
        let value = self.register_at(reg);

        if reg == REG_PROGRAM_COUNTER && shift_by_register {
            value.wrapping_add(4)
        } else {
            value
        }
    }

    /// Operand 2 of a data-processing instruction and the shifter carry-out.
    fn operand2(&self, op_code: ArmModeOpcode, operand_kind: OperandKind) -> ShiftResult {
        let carry = self.cpsr.carry_flag();

        match operand_kind {
            OperandKind::Immediate => rotated_immediate(*op_code, carry),
            OperandKind::Register => {
                // bit [4] - is Shift by Register Flag (0=Immediate, 1=Register)
                let shift_by_register = op_code.get_bit(4);
                let rm = self.alu_register_operand(op_code.register(0), shift_by_register);
                let shift_kind = ShiftKind::from(op_code.get_bits(5..=6));

                if shift_by_register {
                    // Only the bottom byte of Rs is used.
                    let amount = self.register_at(op_code.register(8)) & 0xFF;
                    shift_register(shift_kind, amount, rm, carry)
                } else {
                    shift_immediate(shift_kind, op_code.get_bits(7..=11), rm, carry)
                }
            }
        }
    }

    pub fn psr_transfer(
        &mut self,
        op_code: ArmModeOpcode,
        kind: PsrOpKind,
    ) -> Result<(), ExecutionError> {
        match kind {
            PsrOpKind::Mrs { psr } => {
                let rd = op_code.register(12);
                let value = match psr {
                    PsrKind::Cpsr => self.cpsr,
                    PsrKind::Spsr => self.spsr()?,
                };

                self.set_register_at(rd, value.into());

                if rd != REG_PROGRAM_COUNTER {
                    self.step_program_counter();
                }
            }
            PsrOpKind::Msr { psr, operand_kind } => {
                let value = match operand_kind {
                    OperandKind::Immediate => {
                        rotated_immediate(*op_code, self.cpsr.carry_flag()).value
                    }
                    OperandKind::Register => self.register_at(op_code.register(0)),
                };

                let mut mask = 0;
                if op_code.get_bit(19) {
                    mask |= PSR_FLAGS_MASK;
                }
                if op_code.get_bit(16) {
                    mask |= PSR_CONTROL_MASK;
                }

                match psr {
                    PsrKind::Cpsr => self.write_cpsr_masked(value, mask),
                    PsrKind::Spsr => {
                        let spsr = self.spsr_mut()?;
                        *spsr = Psr::from((u32::from(*spsr) & !mask) | (value & mask));
                    }
                }

                self.step_program_counter();
            }
        }

        Ok(())
    }

    fn write_cpsr_masked(&mut self, value: u32, mask: u32) {
        // User mode can only write the flags.
        let mask = if self.cpsr.mode() == Mode::User {
            mask & PSR_FLAGS_MASK
        } else {
            mask
        };

        let mut new_cpsr = Psr::from((u32::from(self.cpsr) & !mask) | (value & mask));

        if new_cpsr.state_bit() != self.cpsr.state_bit() {
            tracing::warn!(
                "MSR is switching ARM/THUMB state, CPSR=0x{:08X}",
                u32::from(new_cpsr)
            );
        }

        let mode = Mode::try_from(new_cpsr.mode_bits()).unwrap_or_else(|bits| {
            tracing::warn!(
                "MSR wrote invalid mode bits 0b{bits:05b}, staying in {}",
                self.cpsr.mode()
            );
            self.cpsr.mode()
        });

        self.swap_mode(mode);
        new_cpsr.set_mode(mode);
        self.cpsr = new_cpsr;
    }

    pub fn multiply(&mut self, op_code: ArmModeOpcode, accumulate: bool, set_conditions: bool) {
        let rd = op_code.register(16);
        let rm = self.register_at(op_code.register(0));
        let rs = self.register_at(op_code.register(8));

        let mut result = rm.wrapping_mul(rs);
        if accumulate {
            result = result.wrapping_add(self.register_at(op_code.register(12)));
        }

        // C is left as is, V is unaffected.
        if set_conditions {
            self.cpsr.set_sign_and_zero(result);
        }

        self.set_register_at(rd, result);

        if rd != REG_PROGRAM_COUNTER {
            self.step_program_counter();
        }
    }

    pub fn branch(&mut self, is_link: bool, offset: u32) {
        let offset = (offset << 2).sign_extended(26);
        let old_pc = self.registers.program_counter();

        if is_link {
            self.set_register_at(REG_LR, old_pc.wrapping_sub(SIZE_OF_INSTRUCTION));
        }

        self.set_register_at(REG_PROGRAM_COUNTER, old_pc.wrapping_add(offset));
    }

    pub fn branch_and_exchange(&mut self, register: usize) {
        let target = self.register_at(register);

        self.cpsr.set_cpu_state(target.get_bit(0).into());
        self.set_register_at(REG_PROGRAM_COUNTER, target);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn single_data_transfer(
        &mut self,
        op_code: ArmModeOpcode,
        operand_kind: OperandKind,
        indexing: Indexing,
        offsetting: Offsetting,
        quantity: ReadWriteKind,
        write_back: bool,
        load_store: LoadStoreKind,
    ) -> Result<(), ExecutionError> {
        let rn = op_code.register(16);
        let rd = op_code.register(12);

        let amount = match operand_kind {
            OperandKind::Immediate => op_code.get_bits(0..=11),
            OperandKind::Register => {
                // Guard only: the table sends these encodings to `undefined`.
                if op_code.get_bit(4) {
                    return Err(ExecutionError::InvalidEncoding { raw: op_code.raw() });
                }

                let rm = self.register_at(op_code.register(0));
                let shift_kind = ShiftKind::from(op_code.get_bits(5..=6));
                shift_immediate(
                    shift_kind,
                    op_code.get_bits(7..=11),
                    rm,
                    self.cpsr.carry_flag(),
                )
                .value
            }
        };

        let base = self.register_at(rn);
        let offset_address = offsetting.apply(base, amount);
        let address = match indexing {
            Indexing::Pre => offset_address,
            Indexing::Post => base,
        };

        match load_store {
            LoadStoreKind::Store => {
                let value = self.stored_register_value(rd);
                match quantity {
                    ReadWriteKind::Word => self.bus.write_word(address, value),
                    ReadWriteKind::Byte => self.bus.write_byte(address, value as u8),
                }

                self.transfer_write_back(rn, offset_address, indexing, write_back);
                self.step_program_counter();
            }
            LoadStoreKind::Load => {
                let value = match quantity {
                    ReadWriteKind::Word => self.bus.read_rotate_word(address),
                    ReadWriteKind::Byte => u32::from(self.bus.read_byte(address)),
                };

                self.finish_load(rn, rd, value, offset_address, indexing, write_back);
            }
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn half_word_data_transfer(
        &mut self,
        op_code: ArmModeOpcode,
        indexing: Indexing,
        offsetting: Offsetting,
        immediate_offset: bool,
        write_back: bool,
        load_store: LoadStoreKind,
        transfer_kind: HalfwordTransferKind,
    ) -> Result<(), ExecutionError> {
        let rn = op_code.register(16);
        let rd = op_code.register(12);

        let amount = if immediate_offset {
            (op_code.get_bits(8..=11) << 4) | op_code.get_bits(0..=3)
        } else {
            self.register_at(op_code.register(0))
        };

        let base = self.register_at(rn);
        let offset_address = offsetting.apply(base, amount);
        let address = match indexing {
            Indexing::Pre => offset_address,
            Indexing::Post => base,
        };

        let unsupported = || {
            ExecutionError::unimplemented(
                op_code.raw(),
                format!("halfword transfer {load_store:?} with SH={transfer_kind}"),
            )
        };

        match load_store {
            LoadStoreKind::Store => {
                if transfer_kind != HalfwordTransferKind::UnsignedHalfwords {
                    return Err(unsupported());
                }

                let value = self.stored_register_value(rd);
                self.bus.write_half_word(address, value as u16);

                self.transfer_write_back(rn, offset_address, indexing, write_back);
                self.step_program_counter();
            }
            LoadStoreKind::Load => {
                let value = match transfer_kind {
                    HalfwordTransferKind::UnsignedHalfwords => {
                        self.bus.read_rotate_half_word(address)
                    }
                    HalfwordTransferKind::SignedByte => {
                        u32::from(self.bus.read_byte(address)).sign_extended(8)
                    }
                    // LDRSH from an odd address loads the byte alone.
                    HalfwordTransferKind::SignedHalfwords if address.get_bit(0) => {
                        u32::from(self.bus.read_byte(address)).sign_extended(8)
                    }
                    HalfwordTransferKind::SignedHalfwords => {
                        u32::from(self.bus.read_half_word(address)).sign_extended(16)
                    }
                    HalfwordTransferKind::Swap => return Err(unsupported()),
                };

                self.finish_load(rn, rd, value, offset_address, indexing, write_back);
            }
        }

        Ok(())
    }

    /// Value a store puts on the bus for `reg`. R15 is one instruction
    /// further ahead than its usual +8.
    fn stored_register_value(&self, reg: usize) -> u32 {
        let value = self.register_at(reg);

        if reg == REG_PROGRAM_COUNTER {
            value.wrapping_add(4)
        } else {
            value
        }
    }

    fn transfer_write_back(
        &mut self,
        rn: usize,
        offset_address: u32,
        indexing: Indexing,
        write_back: bool,
    ) {
        // Post-indexed transfers always write back.
        if indexing == Indexing::Pre && !write_back {
            return;
        }

        if rn == REG_PROGRAM_COUNTER {
            tracing::warn!("write-back to R15 ignored");
            return;
        }

        self.set_register_at(rn, offset_address);
    }

    /// Common tail of LDR/LDRH/LDRSB/LDRSH: write-back, destination, PC.
    fn finish_load(
        &mut self,
        rn: usize,
        rd: usize,
        value: u32,
        offset_address: u32,
        indexing: Indexing,
        write_back: bool,
    ) {
        // The loaded value wins over the write-back.
        if rd != rn {
            self.transfer_write_back(rn, offset_address, indexing, write_back);
        }

        self.set_register_at(rd, value);

        if rd != REG_PROGRAM_COUNTER {
            self.step_program_counter();
        }
    }

    pub fn block_data_transfer(
        &mut self,
        op_code: ArmModeOpcode,
        indexing: Indexing,
        offsetting: Offsetting,
        psr_or_user: bool,
        write_back: bool,
        load_store: LoadStoreKind,
    ) -> Result<(), ExecutionError> {
        let rn = op_code.register(16);
        let mut reg_list = op_code.get_bits(0..=15);

        // An empty list transfers R15 only, but the base moves as if
        // all sixteen registers had been transferred.
        let transfer_count = if reg_list == 0 {
            reg_list.set_bit_on(15);
            16
        } else {
            reg_list.count_ones()
        };

        let loads_pc = load_store == LoadStoreKind::Load && reg_list.is_bit_on(15);
        let user_bank = psr_or_user && !loads_pc;
        let restore_spsr = psr_or_user && loads_pc;
        let write_back = write_back
            && !(load_store == LoadStoreKind::Load && reg_list.is_bit_on(rn as u8));

        if restore_spsr {
            self.spsr()?;
        }

        let base = self.register_at(rn);
        let span = transfer_count * 4;

        // Registers always go in ascending order from the lowest address.
        let (lowest, final_base) = match offsetting {
            Offsetting::Up => (base, base.wrapping_add(span)),
            Offsetting::Down => (base.wrapping_sub(span), base.wrapping_sub(span)),
        };
        let mut address = match (offsetting, indexing) {
            (Offsetting::Up, Indexing::Pre) | (Offsetting::Down, Indexing::Post) => {
                lowest.wrapping_add(4)
            }
            _ => lowest,
        };

        let mut loaded_pc = None;

        let registers = (0..=15_u8).filter(|reg| reg_list.is_bit_on(*reg));
        for (idx, reg) in registers.map(usize::from).enumerate() {
            match load_store {
                LoadStoreKind::Store => {
                    let value = if reg == REG_PROGRAM_COUNTER {
                        self.stored_register_value(reg)
                    } else if user_bank {
                        self.user_register_at(reg)
                    } else {
                        self.register_at(reg)
                    };

                    self.bus.write_word(address, value);
                }
                LoadStoreKind::Load => {
                    let value = self.bus.read_word(address);

                    if reg == REG_PROGRAM_COUNTER {
                        loaded_pc = Some(value);
                    } else if user_bank {
                        self.set_user_register_at(reg, value);
                    } else {
                        self.set_register_at(reg, value);
                    }
                }
            }

            // The base is updated once, right after the first transfer.
            if idx == 0 && write_back {
                if rn == REG_PROGRAM_COUNTER {
                    tracing::warn!("write-back to R15 ignored");
                } else {
                    self.set_register_at(rn, final_base);
                }
            }

            address = address.wrapping_add(4);
        }

        // R15 goes last, after the base of the current bank is written back.
        match loaded_pc {
            Some(value) => {
                if restore_spsr {
                    self.restore_cpsr_from_spsr()?;
                }
                self.set_register_at(REG_PROGRAM_COUNTER, value);
            }
            None => self.step_program_counter(),
        }

        Ok(())
    }

    pub fn undefined(&mut self, op_code: ArmModeOpcode) -> Result<(), ExecutionError> {
        match self.config().undefined_policy {
            UndefinedPolicy::Abort => Err(ExecutionError::UndefinedInstruction {
                raw: op_code.raw(),
            }),
            UndefinedPolicy::Trap => {
                tracing::debug!("undefined instruction {op_code}, taking the trap");
                self.enter_undefined_trap();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::FlatMemory;
    use crate::cpu::psr::CpuState;

    use pretty_assertions::assert_eq;
    use tracing_subscriber::EnvFilter;

    /// A CPU executing at 0x100 (R15 = 0x108) over 64 KiB of RAM.
    fn cpu() -> Arm7tdmi<FlatMemory> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let mut cpu = Arm7tdmi::new(FlatMemory::default());
        cpu.set_register_at(15, 0x100);
        cpu
    }

    #[test]
    fn check_movs_immediate_zero() {
        for carry in [false, true] {
            let mut cpu = cpu();
            cpu.set_register_at(0, 0xFFFF);
            cpu.cpsr.set_sign_flag(true);
            cpu.cpsr.set_carry_flag(carry);

            // MOVS R0, #0
            cpu.execute_arm(0xE3B0_0000).unwrap();

            assert_eq!(cpu.register_at(0), 0);
            assert!(cpu.cpsr.zero_flag());
            assert!(!cpu.cpsr.sign_flag());
            assert_eq!(cpu.cpsr.carry_flag(), carry);
            assert_eq!(cpu.current_instruction_address(), 0x104);
        }
    }

    #[test]
    fn check_mov_register_lsr_32() {
        let mut cpu = cpu();
        cpu.set_register_at(1, 0x8000_0000);

        // MOVS R0, R1, LSR #32 (encoded as LSR #0)
        cpu.execute_arm(0xE1B0_0021).unwrap();

        assert_eq!(cpu.register_at(0), 0);
        assert!(cpu.cpsr.zero_flag());
        assert!(cpu.cpsr.carry_flag());
    }

    #[test]
    fn check_logical_carry_from_shifter() {
        let mut cpu = cpu();
        cpu.set_register_at(1, 0xFFFF_FFFF);
        cpu.set_register_at(2, 0x8000_0001);
        cpu.cpsr.set_overflow_flag(true);

        // ANDS R0, R1, R2, LSL #1
        cpu.execute_arm(0xE011_0082).unwrap();

        assert_eq!(cpu.register_at(0), 2);
        assert!(cpu.cpsr.carry_flag());
        assert!(!cpu.cpsr.zero_flag());
        assert!(cpu.cpsr.overflow_flag());
    }

    #[test]
    fn check_eor_orr() {
        let mut cpu = cpu();
        cpu.set_register_at(1, 0x0F0F);
        cpu.set_register_at(2, 0x8000_0000);

        // EOR R0, R1, #0xFF
        cpu.execute_arm(0xE221_00FF).unwrap();
        assert_eq!(cpu.register_at(0), 0x0FF0);

        // ORRS R0, R1, R2
        cpu.execute_arm(0xE191_0002).unwrap();
        assert_eq!(cpu.register_at(0), 0x8000_0F0F);
        assert!(cpu.cpsr.sign_flag());
        assert_eq!(cpu.current_instruction_address(), 0x108);
    }

    #[test]
    fn check_add_sub_flags() {
        let mut cpu = cpu();
        cpu.set_register_at(1, 0xFFFF_FFFF);
        cpu.set_register_at(2, 1);

        // ADDS R0, R1, R2
        cpu.execute_arm(0xE091_0002).unwrap();
        assert_eq!(cpu.register_at(0), 0);
        assert!(cpu.cpsr.zero_flag());
        assert!(cpu.cpsr.carry_flag());
        assert!(!cpu.cpsr.overflow_flag());

        cpu.set_register_at(1, 1);
        cpu.set_register_at(2, 2);

        // SUBS R0, R1, R2
        cpu.execute_arm(0xE051_0002).unwrap();
        assert_eq!(cpu.register_at(0), 0xFFFF_FFFF);
        assert!(cpu.cpsr.sign_flag());
        assert!(!cpu.cpsr.carry_flag());
        assert!(!cpu.cpsr.zero_flag());
    }

    #[test]
    fn check_cmp_and_tst_never_write() {
        let mut cpu = cpu();
        cpu.set_register_at(0, 5);

        // CMP R0, #5
        cpu.execute_arm(0xE350_0005).unwrap();
        assert!(cpu.cpsr.zero_flag());
        assert!(cpu.cpsr.carry_flag());
        assert_eq!(cpu.register_at(0), 5);

        cpu.set_register_at(0, 2);

        // TST R0, #1 with the Rd field set to R15: still steps.
        cpu.execute_arm(0xE310_F001).unwrap();
        assert!(cpu.cpsr.zero_flag());
        assert_eq!(cpu.current_instruction_address(), 0x108);
    }

    #[test]
    fn check_add_pc_operand_shift_register() {
        let mut cpu = cpu();
        cpu.set_register_at(1, 0);
        cpu.set_register_at(2, 0);

        // ADD R0, PC, R1, LSL R2
        cpu.execute_arm(0xE08F_0211).unwrap();

        assert_eq!(cpu.register_at(0), 0x10C);
    }

    #[test]
    fn check_mov_pc_does_not_step() {
        let mut cpu = cpu();

        // MOV PC, #0x2000
        cpu.execute_arm(0xE3A0_FA02).unwrap();

        assert_eq!(cpu.current_instruction_address(), 0x2000);
        assert_eq!(cpu.register_at(15), 0x2008);
    }

    #[test]
    fn check_movs_pc_returns_from_exception() {
        let mut cpu = cpu();
        cpu.swap_mode(Mode::Irq);
        cpu.register_bank.spsr_irq = Psr::from(0x2000_001F);
        cpu.set_register_at(14, 0x3000);

        // MOVS PC, LR
        cpu.execute_arm(0xE1B0_F00E).unwrap();

        assert_eq!(cpu.cpsr.mode(), Mode::System);
        assert!(cpu.cpsr.carry_flag());
        assert_eq!(cpu.current_instruction_address(), 0x3000);
    }

    #[test]
    fn check_unimplemented_data_processing() {
        let mut cpu = cpu();

        // RSB R0, R1, R2
        let result = cpu.execute_arm(0xE061_0002);

        assert!(matches!(
            result,
            Err(ExecutionError::Unimplemented { raw: 0xE061_0002, .. })
        ));
        assert_eq!(cpu.current_instruction_address(), 0x100);
    }

    #[test]
    fn check_multiply() {
        let mut cpu = cpu();
        cpu.set_register_at(1, 3);
        cpu.set_register_at(2, 4);

        // MUL R0, R1, R2
        cpu.execute_arm(0xE000_0291).unwrap();
        assert_eq!(cpu.register_at(0), 12);
        assert!(!cpu.cpsr.zero_flag());

        cpu.set_register_at(3, (-12_i32) as u32);

        // MLAS R0, R1, R2, R3
        cpu.execute_arm(0xE030_3291).unwrap();
        assert_eq!(cpu.register_at(0), 0);
        assert!(cpu.cpsr.zero_flag());
        assert_eq!(cpu.current_instruction_address(), 0x108);
    }

    #[test]
    fn check_branch() {
        let mut cpu = cpu();

        // B +60
        cpu.execute_arm(0xEA00_000F).unwrap();
        assert_eq!(cpu.current_instruction_address(), 0x108 + 60);

        // BL -36
        let mut cpu = self::cpu();
        cpu.execute_arm(0xEBFF_FFF7).unwrap();
        assert_eq!(cpu.register_at(14), 0x104);
        assert_eq!(cpu.current_instruction_address(), 0x108 - 36);
    }

    #[test]
    fn check_branch_and_exchange() {
        let mut cpu = cpu();
        cpu.set_register_at(0, 0x2001);

        // BX R0
        cpu.execute_arm(0xE12F_FF10).unwrap();

        assert_eq!(cpu.cpsr.cpu_state(), CpuState::Thumb);
        assert_eq!(cpu.register_at(15), 0x2004);

        let mut cpu = self::cpu();
        cpu.set_register_at(14, 0x2000);

        // BX LR
        cpu.execute_arm(0xE12F_FF1E).unwrap();
        assert_eq!(cpu.cpsr.cpu_state(), CpuState::Arm);
        assert_eq!(cpu.current_instruction_address(), 0x2000);
    }

    #[test]
    fn check_ldr() {
        {
            // LDR R1, [PC, #4]
            let mut cpu = cpu();
            cpu.bus.write_word(0x10C, 0xCAFE_BABE);
            cpu.execute_arm(0xE59F_1004).unwrap();

            assert_eq!(cpu.register_at(1), 0xCAFE_BABE);
            assert_eq!(cpu.current_instruction_address(), 0x104);
        }
        {
            // LDR R1, [R0], #4
            let mut cpu = cpu();
            cpu.bus.write_word(0x2000, 0x1234_5678);
            cpu.set_register_at(0, 0x2000);
            cpu.execute_arm(0xE490_1004).unwrap();

            assert_eq!(cpu.register_at(1), 0x1234_5678);
            assert_eq!(cpu.register_at(0), 0x2004);
        }
        {
            // LDR R1, [R0] from a misaligned address rotates the word.
            let mut cpu = cpu();
            cpu.bus.write_word(0x2000, 0x1122_3344);
            cpu.set_register_at(0, 0x2001);
            cpu.execute_arm(0xE590_1000).unwrap();

            assert_eq!(cpu.register_at(1), 0x4411_2233);
        }
        {
            // LDR PC, [R0]
            let mut cpu = cpu();
            cpu.bus.write_word(0x2000, 0x3000);
            cpu.set_register_at(0, 0x2000);
            cpu.execute_arm(0xE590_F000).unwrap();

            assert_eq!(cpu.current_instruction_address(), 0x3000);
        }
    }

    #[test]
    fn check_ldr_write_back_suppressed() {
        let mut cpu = cpu();
        cpu.bus.write_word(0x2004, 0xDEAD_BEEF);
        cpu.set_register_at(0, 0x2000);

        // LDR R0, [R0, #4]!
        cpu.execute_arm(0xE5B0_0004).unwrap();

        assert_eq!(cpu.register_at(0), 0xDEAD_BEEF);
    }

    #[test]
    fn check_str() {
        {
            // STR PC, [R0]
            let mut cpu = cpu();
            cpu.set_register_at(0, 0x2000);
            cpu.execute_arm(0xE580_F000).unwrap();

            assert_eq!(cpu.bus.read_word(0x2000), 0x10C);
        }
        {
            // STRB R1, [R0]
            let mut cpu = cpu();
            cpu.set_register_at(0, 0x2000);
            cpu.set_register_at(1, 0x1234_5678);
            cpu.execute_arm(0xE5C0_1000).unwrap();

            assert_eq!(cpu.bus.read_word(0x2000), 0x78);
        }
        {
            // STR R1, [R0, -R2, LSL #2]
            let mut cpu = cpu();
            cpu.set_register_at(0, 0x2010);
            cpu.set_register_at(1, 0xAABB_CCDD);
            cpu.set_register_at(2, 4);
            cpu.execute_arm(0xE700_1102).unwrap();

            assert_eq!(cpu.bus.read_word(0x2000), 0xAABB_CCDD);
            assert_eq!(cpu.register_at(0), 0x2010);
        }
    }

    #[test]
    fn check_transfer_handler_rejects_register_shift() {
        // Called directly, dispatch never reaches the handler with bit 4 set.
        let mut cpu = cpu();
        cpu.set_register_at(0, 0x2000);

        let result = cpu.single_data_transfer(
            ArmModeOpcode::from(0xE790_0011),
            OperandKind::Register,
            Indexing::Pre,
            Offsetting::Up,
            ReadWriteKind::Word,
            true,
            LoadStoreKind::Load,
        );

        assert_eq!(
            result,
            Err(ExecutionError::InvalidEncoding { raw: 0xE790_0011 })
        );
        assert_eq!(cpu.register_at(0), 0x2000);
        assert_eq!(cpu.current_instruction_address(), 0x100);
    }

    #[test]
    fn check_store_halfword() {
        {
            // STRH R0, [R1]
            let mut cpu = cpu();
            cpu.set_register_at(0, 0x0101_0101);
            cpu.set_register_at(1, 0x2000);
            cpu.execute_arm(0xE1C1_00B0).unwrap();

            assert_eq!(cpu.bus.read_byte(0x2000), 1);
            assert_eq!(cpu.bus.read_byte(0x2001), 1);
            // because we store halfword = 16bit
            assert_eq!(cpu.bus.read_byte(0x2002), 0);
            assert_eq!(cpu.bus.read_byte(0x2003), 0);
        }
        {
            // STRH PC, [R1]
            let mut cpu = cpu();
            cpu.set_register_at(1, 0x2000);
            cpu.execute_arm(0xE1C1_F0B0).unwrap();

            assert_eq!(cpu.bus.read_half_word(0x2000), 0x10C);
        }
        {
            // STRSB does not exist on ARMv4.
            let mut cpu = cpu();
            cpu.set_register_at(1, 0x2000);
            let result = cpu.execute_arm(0xE1C1_00D0);

            assert!(matches!(result, Err(ExecutionError::Unimplemented { .. })));
            assert_eq!(cpu.current_instruction_address(), 0x100);
        }
    }

    #[test]
    fn check_load_halfword_and_signed() {
        let mut cpu = cpu();
        cpu.bus.write_word(0x2000, 0x8000_0080);
        cpu.bus.write_byte(0x2005, 0xFF);
        cpu.set_register_at(1, 0x2000);

        // LDRH R0, [R1, #2]
        cpu.execute_arm(0xE1D1_00B2).unwrap();
        assert_eq!(cpu.register_at(0), 0x8000);

        // LDRSB R0, [R1]
        cpu.execute_arm(0xE1D1_00D0).unwrap();
        assert_eq!(cpu.register_at(0), 0xFFFF_FF80);

        // LDRSH R0, [R1]
        cpu.bus.write_half_word(0x2000, 0x8000);
        cpu.execute_arm(0xE1D1_00F0).unwrap();
        assert_eq!(cpu.register_at(0), 0xFFFF_8000);

        // LDRSH R0, [R1] from an odd address sign-extends a byte.
        cpu.set_register_at(1, 0x2005);
        cpu.execute_arm(0xE1D1_00F0).unwrap();
        assert_eq!(cpu.register_at(0), 0xFFFF_FFFF);
    }

    #[test]
    fn check_halfword_write_back() {
        {
            // LDRH R0, [R1], R2
            let mut cpu = cpu();
            cpu.bus.write_half_word(0x2000, 0xBEEF);
            cpu.set_register_at(1, 0x2000);
            cpu.set_register_at(2, 6);
            cpu.execute_arm(0xE091_00B2).unwrap();

            assert_eq!(cpu.register_at(0), 0xBEEF);
            assert_eq!(cpu.register_at(1), 0x2006);
        }
        {
            // LDRH R1, [R1, #2]!
            let mut cpu = cpu();
            cpu.bus.write_half_word(0x2002, 0x1234);
            cpu.set_register_at(1, 0x2000);
            cpu.execute_arm(0xE1F1_10B2).unwrap();

            assert_eq!(cpu.register_at(1), 0x1234);
        }
    }

    #[test]
    fn check_block_data_transfer() {
        {
            // LDM with post-increment
            let op_code = 0b1110_100_0_1_0_1_1_1101_0000000010100010;
            let mut cpu = cpu();

            cpu.set_register_at(13, 0x1000);
            cpu.bus.write_word(0x1000, 1);
            cpu.bus.write_word(0x1004, 5);
            cpu.bus.write_word(0x1008, 7);
            cpu.execute_arm(op_code).unwrap();

            assert_eq!(cpu.register_at(1), 1);
            assert_eq!(cpu.register_at(5), 5);
            assert_eq!(cpu.register_at(7), 7);
            assert_eq!(cpu.register_at(13), 0x100C);
        }
        {
            // LDM with pre-increment
            let op_code = 0b1110_100_1_1_0_1_1_1101_0000000010100010;
            let mut cpu = cpu();

            cpu.set_register_at(13, 0x1000);
            cpu.bus.write_word(0x1004, 1);
            cpu.bus.write_word(0x1008, 5);
            cpu.bus.write_word(0x100C, 7);
            cpu.execute_arm(op_code).unwrap();

            assert_eq!(cpu.register_at(1), 1);
            assert_eq!(cpu.register_at(5), 5);
            assert_eq!(cpu.register_at(7), 7);
            assert_eq!(cpu.register_at(13), 0x100C);
        }
        {
            // LDM with post-decrement
            let op_code = 0b1110_100_0_0_0_1_1_1101_0000000010100010;
            let mut cpu = cpu();

            cpu.set_register_at(13, 0x1000);
            cpu.bus.write_word(0x1000, 7);
            cpu.bus.write_word(0x0FFC, 5);
            cpu.bus.write_word(0x0FF8, 1);
            cpu.execute_arm(op_code).unwrap();

            assert_eq!(cpu.register_at(1), 1);
            assert_eq!(cpu.register_at(5), 5);
            assert_eq!(cpu.register_at(7), 7);
            assert_eq!(cpu.register_at(13), 0x0FF4);
        }
        {
            // LDM with pre-decrement
            let op_code = 0b1110_100_1_0_0_1_1_1101_0000000010100010;
            let mut cpu = cpu();

            cpu.set_register_at(13, 0x1000);
            cpu.bus.write_word(0x0FFC, 7);
            cpu.bus.write_word(0x0FF8, 5);
            cpu.bus.write_word(0x0FF4, 1);
            cpu.execute_arm(op_code).unwrap();

            assert_eq!(cpu.register_at(1), 1);
            assert_eq!(cpu.register_at(5), 5);
            assert_eq!(cpu.register_at(7), 7);
            assert_eq!(cpu.register_at(13), 0x0FF4);
        }
        {
            // STM with post-increment
            let op_code = 0b1110_100_0_1_0_1_0_1101_0000000010100010;
            let mut cpu = cpu();

            for r in 0..15 {
                cpu.set_register_at(r, r as u32);
            }
            cpu.set_register_at(13, 0x1000);
            cpu.execute_arm(op_code).unwrap();

            assert_eq!(cpu.bus.read_word(0x1000), 1);
            assert_eq!(cpu.bus.read_word(0x1004), 5);
            assert_eq!(cpu.bus.read_word(0x1008), 7);
            assert_eq!(cpu.register_at(13), 0x100C);
        }
        {
            // STM with pre-increment
            let op_code = 0b1110_100_1_1_0_1_0_1101_0000000010100010;
            let mut cpu = cpu();

            for r in 0..15 {
                cpu.set_register_at(r, r as u32);
            }
            cpu.set_register_at(13, 0x1000);
            cpu.execute_arm(op_code).unwrap();

            assert_eq!(cpu.bus.read_word(0x1000), 0);
            assert_eq!(cpu.bus.read_word(0x1004), 1);
            assert_eq!(cpu.bus.read_word(0x1008), 5);
            assert_eq!(cpu.bus.read_word(0x100C), 7);
            assert_eq!(cpu.register_at(13), 0x100C);
        }
        {
            // STM with post-decrement
            let op_code = 0b1110_100_0_0_0_1_0_1101_0000000010100010;
            let mut cpu = cpu();

            for r in 0..15 {
                cpu.set_register_at(r, r as u32);
            }
            cpu.set_register_at(13, 0x1000);
            cpu.execute_arm(op_code).unwrap();

            assert_eq!(cpu.bus.read_word(0x1000), 7);
            assert_eq!(cpu.bus.read_word(0x0FFC), 5);
            assert_eq!(cpu.bus.read_word(0x0FF8), 1);
            assert_eq!(cpu.register_at(13), 0x0FF4);
        }
        {
            // STM with pre-decrement and storing R15
            let op_code = 0b1110_100_1_0_0_1_0_1101_1000000010100010;
            let mut cpu = cpu();

            for r in 0..15 {
                cpu.set_register_at(r, r as u32);
            }
            cpu.set_register_at(13, 0x1000);
            cpu.execute_arm(op_code).unwrap();

            assert_eq!(cpu.bus.read_word(0x1000), 0);
            assert_eq!(cpu.bus.read_word(0x0FFC), 0x10C);
            assert_eq!(cpu.bus.read_word(0x0FF8), 7);
            assert_eq!(cpu.bus.read_word(0x0FF4), 5);
            assert_eq!(cpu.bus.read_word(0x0FF0), 1);
            assert_eq!(cpu.register_at(13), 0x0FF0);
        }
    }

    #[test]
    fn check_block_empty_list() {
        {
            // LDMIA R0!, {}
            let mut cpu = cpu();
            cpu.bus.write_word(0x2000, 0x3000);
            cpu.set_register_at(0, 0x2000);
            cpu.execute_arm(0xE8B0_0000).unwrap();

            assert_eq!(cpu.current_instruction_address(), 0x3000);
            assert_eq!(cpu.register_at(0), 0x2040);
        }
        {
            // STMIA R0!, {}
            let mut cpu = cpu();
            cpu.set_register_at(0, 0x2000);
            cpu.execute_arm(0xE8A0_0000).unwrap();

            assert_eq!(cpu.bus.read_word(0x2000), 0x10C);
            assert_eq!(cpu.bus.read_word(0x2004), 0);
            assert_eq!(cpu.register_at(0), 0x2040);
            assert_eq!(cpu.current_instruction_address(), 0x104);
        }
    }

    #[test]
    fn check_block_base_in_list() {
        {
            // LDMIA R0!, {R0, R1}: the loaded base wins.
            let mut cpu = cpu();
            cpu.bus.write_word(0x2000, 0xAAAA);
            cpu.bus.write_word(0x2004, 0xBBBB);
            cpu.set_register_at(0, 0x2000);
            cpu.execute_arm(0xE8B0_0003).unwrap();

            assert_eq!(cpu.register_at(0), 0xAAAA);
            assert_eq!(cpu.register_at(1), 0xBBBB);
        }
        {
            // STMIA R1!, {R0, R1}: R1 is stored after the write-back.
            let mut cpu = cpu();
            cpu.set_register_at(0, 0x1111);
            cpu.set_register_at(1, 0x2000);
            cpu.execute_arm(0xE8A1_0003).unwrap();

            assert_eq!(cpu.bus.read_word(0x2000), 0x1111);
            assert_eq!(cpu.bus.read_word(0x2004), 0x2008);
            assert_eq!(cpu.register_at(1), 0x2008);
        }
    }

    #[test]
    fn check_block_user_bank() {
        let mut cpu = cpu();
        cpu.swap_mode(Mode::User);
        cpu.set_register_at(8, 0x88);
        cpu.set_register_at(13, 0x0300_7F00);
        cpu.swap_mode(Mode::Fiq);
        cpu.set_register_at(0, 0x2000);
        cpu.set_register_at(8, 0xF8);
        cpu.set_register_at(13, 0xFD);

        // STMIA R0, {R8, SP}^
        cpu.execute_arm(0xE8C0_2100).unwrap();

        assert_eq!(cpu.bus.read_word(0x2000), 0x88);
        assert_eq!(cpu.bus.read_word(0x2004), 0x0300_7F00);
    }

    #[test]
    fn check_block_load_pc_restores_cpsr() {
        let mut cpu = cpu();
        cpu.swap_mode(Mode::Irq);
        cpu.register_bank.spsr_irq = Psr::from(0x4000_001F);
        cpu.set_register_at(13, 0x2000);
        cpu.bus.write_word(0x2000, 0x0000_0800);

        // LDMFD SP!, {PC}^
        cpu.execute_arm(0xE8FD_8000).unwrap();

        assert_eq!(cpu.cpsr.mode(), Mode::System);
        assert!(cpu.cpsr.zero_flag());
        assert_eq!(cpu.current_instruction_address(), 0x800);
        assert_eq!(cpu.register_bank.irq[0], 0x2004);
    }

    #[test]
    fn check_mrs() {
        {
            // MRS R0, CPSR in User mode
            let mut cpu = cpu();
            cpu.swap_mode(Mode::User);
            cpu.cpsr.set_carry_flag(true);
            cpu.cpsr.set_overflow_flag(true);
            cpu.cpsr.set_zero_flag(true);
            cpu.cpsr.set_sign_flag(true);
            cpu.execute_arm(0xE10F_0000).unwrap();

            assert_eq!(cpu.register_at(0), 0xF000_0010);
        }
        {
            // MRS R1, SPSR has no SPSR to read in User mode
            let mut cpu = cpu();
            cpu.swap_mode(Mode::User);
            let result = cpu.execute_arm(0xE14F_1000);

            assert_eq!(
                result,
                Err(ExecutionError::SpsrUnavailable { mode: Mode::User })
            );
            assert_eq!(cpu.current_instruction_address(), 0x100);
        }
        {
            // MRS PC, CPSR jumps instead of stepping
            let mut cpu = cpu();
            cpu.execute_arm(0xE10F_F000).unwrap();

            assert_eq!(cpu.current_instruction_address(), 0x10);
        }
    }

    #[test]
    fn check_msr_cpsr() {
        {
            // MSR CPSR_fc, R0 switches mode and bank
            let mut cpu = cpu();
            cpu.set_register_at(13, 0x0300_7FE0);
            cpu.set_register_at(0, 0xF000_001F);
            cpu.execute_arm(0xE129_F000).unwrap();

            assert_eq!(u32::from(cpu.cpsr), 0xF000_001F);
            assert_eq!(cpu.cpsr.mode(), Mode::System);
            assert_eq!(cpu.register_at(13), 0);
            assert_eq!(cpu.register_bank.svc[0], 0x0300_7FE0);
        }
        {
            // User mode only reaches the flags
            let mut cpu = cpu();
            cpu.swap_mode(Mode::User);
            cpu.set_register_at(0, 0xF000_001F);
            cpu.execute_arm(0xE129_F000).unwrap();

            assert_eq!(u32::from(cpu.cpsr), 0xF000_0010);
        }
        {
            // MSR CPSR_f, #0xF0000000 keeps mode and T
            let mut cpu = cpu();
            cpu.execute_arm(0xE328_F20F).unwrap();

            assert_eq!(u32::from(cpu.cpsr), 0xF000_0013);
            assert_eq!(cpu.current_instruction_address(), 0x104);
        }
        {
            // Invalid mode bits leave the mode alone
            let mut cpu = cpu();
            cpu.set_register_at(0, 0x0000_0000);
            // MSR CPSR_c, R0
            cpu.execute_arm(0xE121_F000).unwrap();

            assert_eq!(cpu.cpsr.mode(), Mode::Supervisor);
        }
    }

    #[test]
    fn check_msr_mrs_round_trip() {
        let mut cpu = cpu();

        // MSR SPSR_fc, R0 ; MRS R1, SPSR
        cpu.set_register_at(0, 0xA000_00D1);
        cpu.execute_arm(0xE169_F000).unwrap();
        cpu.execute_arm(0xE14F_1000).unwrap();
        assert_eq!(cpu.register_at(1), 0xA000_00D1);

        // MSR SPSR_f, R0 ; MRS R2, SPSR
        cpu.set_register_at(0, 0x5FFF_FF00);
        cpu.execute_arm(0xE168_F000).unwrap();
        cpu.execute_arm(0xE14F_2000).unwrap();
        assert_eq!(cpu.register_at(2), 0x5F00_00D1);

        // MSR CPSR_f, R0 ; MRS R3, CPSR
        cpu.execute_arm(0xE128_F000).unwrap();
        cpu.execute_arm(0xE10F_3000).unwrap();
        assert_eq!(cpu.register_at(3) & PSR_FLAGS_MASK, 0x5F00_0000);
        assert_eq!(cpu.register_at(3) & PSR_CONTROL_MASK, 0x13);
    }

    #[test]
    fn check_unimplemented_families() {
        for (raw, detail) in [
            (0xEF00_0000, "software interrupt #0x000000"),
            (0xE081_0392, "multiply long (signed=false, accumulate=false)"),
            (0xE102_0091, "single data swap (byte=false)"),
            (0xEE00_0000, "coprocessor p0 operation"),
        ] {
            let mut cpu = cpu();
            assert_eq!(
                cpu.execute_arm(raw),
                Err(ExecutionError::Unimplemented {
                    raw,
                    detail: detail.to_string()
                })
            );
            assert_eq!(cpu.current_instruction_address(), 0x100);
        }
    }

    #[test]
    fn check_test_opcode_without_s_only_steps() {
        // TST R0, R0 (S=0, shift by register) / CMP R0, #5 (S=0)
        for raw in [0xE100_0010, 0xE340_0005] {
            let mut cpu = cpu();
            cpu.set_register_at(0, 5);
            cpu.cpsr.set_sign_flag(true);
            cpu.cpsr.set_carry_flag(true);
            cpu.cpsr.set_overflow_flag(true);

            let cpsr = cpu.cpsr;
            let mut registers = cpu.registers.clone();
            registers.advance_program_counter(SIZE_OF_INSTRUCTION);

            assert_eq!(cpu.execute_arm(raw), Ok(()));
            assert_eq!(cpu.cpsr, cpsr);
            assert_eq!(cpu.registers, registers);
            assert_eq!(cpu.current_instruction_address(), 0x104);
        }
    }
}
