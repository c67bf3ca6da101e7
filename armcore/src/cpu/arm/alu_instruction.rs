use std::fmt::Display;

use crate::bitwise::Bits;
use crate::cpu::flags::ShiftKind;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ArmModeAluInstruction {
    And = 0x0,
    Eor = 0x1,
    Sub = 0x2,
    Rsb = 0x3,
    Add = 0x4,
    Adc = 0x5,
    Sbc = 0x6,
    Rsc = 0x7,
    Tst = 0x8,
    Teq = 0x9,
    Cmp = 0xA,
    Cmn = 0xB,
    Orr = 0xC,
    Mov = 0xD,
    Bic = 0xE,
    Mvn = 0xF,
}

impl Display for ArmModeAluInstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => f.write_str("AND"),
            Self::Eor => f.write_str("EOR"),
            Self::Sub => f.write_str("SUB"),
            Self::Rsb => f.write_str("RSB"),
            Self::Add => f.write_str("ADD"),
            Self::Adc => f.write_str("ADC"),
            Self::Sbc => f.write_str("SBC"),
            Self::Rsc => f.write_str("RSC"),
            Self::Tst => f.write_str("TST"),
            Self::Teq => f.write_str("TEQ"),
            Self::Cmp => f.write_str("CMP"),
            Self::Cmn => f.write_str("CMN"),
            Self::Orr => f.write_str("ORR"),
            Self::Mov => f.write_str("MOV"),
            Self::Bic => f.write_str("BIC"),
            Self::Mvn => f.write_str("MVN"),
        }
    }
}

#[derive(Eq, PartialEq, Debug)]
pub enum AluInstructionKind {
    Logical,
    Arithmetic,
}

impl ArmModeAluInstruction {
    /// Logical operations take C from the shifter, arithmetic ones from the adder.
    #[must_use]
    pub const fn kind(self) -> AluInstructionKind {
        use ArmModeAluInstruction::{
            Adc, Add, And, Bic, Cmn, Cmp, Eor, Mov, Mvn, Orr, Rsb, Rsc, Sbc, Sub, Teq, Tst,
        };
        match self {
            And | Eor | Tst | Teq | Orr | Mov | Bic | Mvn => AluInstructionKind::Logical,
            Sub | Rsb | Add | Adc | Sbc | Rsc | Cmp | Cmn => AluInstructionKind::Arithmetic,
        }
    }

    /// TST, TEQ, CMP and CMN only produce flags, Rd is never written.
    #[must_use]
    pub const fn is_test(self) -> bool {
        matches!(self, Self::Tst | Self::Teq | Self::Cmp | Self::Cmn)
    }
}

impl From<u32> for ArmModeAluInstruction {
    /// Only the low nibble is considered.
    fn from(alu_op_code: u32) -> Self {
        use ArmModeAluInstruction::{
            Adc, Add, And, Bic, Cmn, Cmp, Eor, Mov, Mvn, Orr, Rsb, Rsc, Sbc, Sub, Teq, Tst,
        };
        match alu_op_code.get_bits(0..=3) {
            0x0 => And,
            0x1 => Eor,
            0x2 => Sub,
            0x3 => Rsb,
            0x4 => Add,
            0x5 => Adc,
            0x6 => Sbc,
            0x7 => Rsc,
            0x8 => Tst,
            0x9 => Teq,
            0xA => Cmp,
            0xB => Cmn,
            0xC => Orr,
            0xD => Mov,
            0xE => Bic,
            _ => Mvn,
        }
    }
}

/// Selects CPSR or SPSR in MRS/MSR (bit 22).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum PsrKind {
    Cpsr,
    Spsr,
}

impl From<bool> for PsrKind {
    fn from(value: bool) -> Self {
        if value { Self::Spsr } else { Self::Cpsr }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ArithmeticOpResult {
    pub result: u32,
    pub carry: bool,
    pub overflow: bool,
    pub sign: bool,
    pub zero: bool,
}

/// Barrel shifter output: the operand and the shifter carry-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftResult {
    pub value: u32,
    pub carry: bool,
}

impl ShiftResult {
    const fn new(value: u32, carry: bool) -> Self {
        Self { value, carry }
    }
}

/// Shift with the amount encoded in bits 7-11.
///
/// An amount of 0 is special for every kind but LSL: `LSR #0` and `ASR #0`
/// encode a shift by 32 and `ROR #0` encodes RRX.
#[must_use]
pub fn shift_immediate(kind: ShiftKind, amount: u32, rm: u32, carry: bool) -> ShiftResult {
    debug_assert!(amount < 32);
    match (kind, amount) {
        // LSL#0: No shift performed, the C flag is NOT affected.
        (ShiftKind::Lsl, 0) => ShiftResult::new(rm, carry),
        (ShiftKind::Lsl, n) => ShiftResult::new(rm << n, rm.get_bit((32 - n) as u8)),
        (ShiftKind::Lsr, 0) => ShiftResult::new(0, rm.get_bit(31)),
        (ShiftKind::Lsr, n) => ShiftResult::new(rm >> n, rm.get_bit((n - 1) as u8)),
        (ShiftKind::Asr, 0) => ShiftResult::new(((rm as i32) >> 31) as u32, rm.get_bit(31)),
        (ShiftKind::Asr, n) => {
            ShiftResult::new(((rm as i32) >> n) as u32, rm.get_bit((n - 1) as u8))
        }
        // RRX: 33-bit rotation through carry.
        (ShiftKind::Ror, 0) => {
            ShiftResult::new((u32::from(carry) << 31) | (rm >> 1), rm.get_bit(0))
        }
        (ShiftKind::Ror, n) => ShiftResult::new(rm.rotate_right(n), rm.get_bit((n - 1) as u8)),
    }
}

/// Shift with the amount taken from the bottom byte of Rs.
///
/// Here 0 always means "no shift, carry untouched" and amounts of 32 and
/// above saturate instead of wrapping.
#[must_use]
pub fn shift_register(kind: ShiftKind, amount: u32, rm: u32, carry: bool) -> ShiftResult {
    let amount = amount & 0xFF;
    if amount == 0 {
        return ShiftResult::new(rm, carry);
    }

    match kind {
        ShiftKind::Lsl => match amount {
            1..=31 => ShiftResult::new(rm << amount, rm.get_bit((32 - amount) as u8)),
            32 => ShiftResult::new(0, rm.get_bit(0)),
            _ => ShiftResult::new(0, false),
        },
        ShiftKind::Lsr => match amount {
            1..=31 => ShiftResult::new(rm >> amount, rm.get_bit((amount - 1) as u8)),
            32 => ShiftResult::new(0, rm.get_bit(31)),
            _ => ShiftResult::new(0, false),
        },
        ShiftKind::Asr => match amount {
            1..=31 => ShiftResult::new(
                ((rm as i32) >> amount) as u32,
                rm.get_bit((amount - 1) as u8),
            ),
            _ => ShiftResult::new(((rm as i32) >> 31) as u32, rm.get_bit(31)),
        },
        ShiftKind::Ror => match amount % 32 {
            0 => ShiftResult::new(rm, rm.get_bit(31)),
            n => ShiftResult::new(rm.rotate_right(n), rm.get_bit((n - 1) as u8)),
        },
    }
}

/// Immediate operand 2: `imm8` rotated right by twice the 4-bit rotate field.
/// A zero rotation leaves the carry as it was.
#[must_use]
pub fn rotated_immediate(operand: u32, carry: bool) -> ShiftResult {
    let imm = operand.get_bits(0..=7);
    let rotate = operand.get_bits(8..=11) * 2;

    if rotate == 0 {
        ShiftResult::new(imm, carry)
    } else {
        let value = imm.rotate_right(rotate);
        ShiftResult::new(value, value.get_bit(31))
    }
}

#[must_use]
pub fn add_inner_op(first_op: u32, second_op: u32) -> ArithmeticOpResult {
    let (result, carry) = first_op.overflowing_add(second_op);

    // overflow only occurs when operands have the same sign and result has the opposite one
    let sign_op1 = first_op.get_bit(31);
    let same_sign = sign_op1 == second_op.get_bit(31);

    ArithmeticOpResult {
        result,
        carry,
        overflow: same_sign && sign_op1 != result.get_bit(31),
        sign: result.get_bit(31),
        zero: result == 0,
    }
}

/// `first_op - second_op`. ARM stores NOT borrow in C.
#[must_use]
pub fn sub_inner_op(first_op: u32, second_op: u32) -> ArithmeticOpResult {
    let result = first_op.wrapping_sub(second_op);

    let sign_op1 = first_op.get_bit(31);
    let different_sign = sign_op1 != second_op.get_bit(31);

    ArithmeticOpResult {
        result,
        carry: first_op >= second_op,
        overflow: different_sign && sign_op1 != result.get_bit(31),
        sign: result.get_bit(31),
        zero: result == 0,
    }
}
