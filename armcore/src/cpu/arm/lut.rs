//! # Dispatch table
//!
//! Bits 27-20 and 7-4 of an ARM instruction are enough to tell every
//! instruction class apart, and they also carry most of the per-class flags
//! (P, U, B/S, W, L, opcode, SH). The table maps those 12 bits to an
//! [`ArmHandler`] with the flags already decoded, so executing an instruction
//! is a single indexed load plus a `match`.
//!
//! The table is computed on first use and shared by every CPU instance.
//!
//! Each entry is classified on a skeleton instruction, the discriminant put
//! back in place with every other bit cleared, by testing mask/match pairs
//! in priority order. The first match wins:
//!
//! | #  | Class                  | Mask          | Match         |
//! |----|------------------------|---------------|---------------|
//! | 1  | Multiply               | `0x0FC0_00F0` | `0x0000_0090` |
//! | 2  | Multiply long          | `0x0F80_00F0` | `0x0080_0090` |
//! | 3  | Single data swap       | `0x0FB0_00F0` | `0x0100_0090` |
//! | 4  | Branch and exchange    | `0x0FF0_00F0` | `0x0120_0010` |
//! | 5  | Halfword transfer      | `0x0E00_0090` | `0x0000_0090` |
//! | 6  | Undefined              | `0x0E00_0010` | `0x0600_0010` |
//! | 7  | Single data transfer   | `0x0C00_0000` | `0x0400_0000` |
//! | 8  | Block data transfer    | `0x0E00_0000` | `0x0800_0000` |
//! | 9  | Branch                 | `0x0E00_0000` | `0x0A00_0000` |
//! | 10 | Coprocessor            | `0x0E00_0000` | `0x0C00_0000` |
//! |    |                        | `0x0F00_0000` | `0x0E00_0000` |
//! | 11 | Software interrupt     | `0x0F00_0000` | `0x0F00_0000` |
//! | 12 | MRS                    | `0x0FB0_00F0` | `0x0100_0000` |
//! |    | MSR (register)         | `0x0FB0_00F0` | `0x0120_0000` |
//! |    | MSR (immediate)        | `0x0FB0_0000` | `0x0320_0000` |
//! | 13 | Data processing        | `0x0C00_0000` | `0x0000_0000` |

use std::sync::OnceLock;

use crate::bitwise::Bits;
use crate::bus::Bus;
use crate::cpu::arm::alu_instruction::{ArmModeAluInstruction, PsrKind};
use crate::cpu::arm::opcode::ArmModeOpcode;
use crate::cpu::arm7tdmi::Arm7tdmi;
use crate::cpu::flags::{
    HalfwordTransferKind, Indexing, LoadStoreKind, Offsetting, OperandKind, ReadWriteKind,
};
use crate::error::ExecutionError;

/// Number of distinct discriminants (12 bits).
pub const LUT_SIZE: usize = 4096;

/// MRS or MSR, with the fields that are fixed by the discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsrOpKind {
    Mrs { psr: PsrKind },
    Msr { psr: PsrKind, operand_kind: OperandKind },
}

/// One table entry: an instruction class plus its discriminant-bound flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmHandler {
    Multiply {
        accumulate: bool,
        set_conditions: bool,
    },
    MultiplyLong,
    SingleDataSwap,
    BranchAndExchange,
    HalfwordDataTransfer {
        indexing: Indexing,
        offsetting: Offsetting,
        immediate_offset: bool,
        write_back: bool,
        load_store: LoadStoreKind,
        transfer_kind: HalfwordTransferKind,
    },
    Undefined,
    SingleDataTransfer {
        operand_kind: OperandKind,
        indexing: Indexing,
        offsetting: Offsetting,
        quantity: ReadWriteKind,
        write_back: bool,
        load_store: LoadStoreKind,
    },
    BlockDataTransfer {
        indexing: Indexing,
        offsetting: Offsetting,
        psr_or_user: bool,
        write_back: bool,
        load_store: LoadStoreKind,
    },
    Branch {
        link: bool,
    },
    Coprocessor,
    SoftwareInterrupt,
    PsrTransfer(PsrOpKind),
    DataProcessing {
        alu_instruction: ArmModeAluInstruction,
        operand_kind: OperandKind,
        set_conditions: bool,
    },
    /// Fallback for encodings no rule claims.
    Unimplemented,
}

impl ArmHandler {
    /// Runs the bound handler. Each handler advances the program counter
    /// itself unless it wrote R15.
    pub fn execute<B: Bus>(
        self,
        cpu: &mut Arm7tdmi<B>,
        op_code: ArmModeOpcode,
    ) -> Result<(), ExecutionError> {
        match self {
            Self::Multiply {
                accumulate,
                set_conditions,
            } => {
                cpu.multiply(op_code, accumulate, set_conditions);
                Ok(())
            }
            Self::MultiplyLong => Err(ExecutionError::unimplemented(
                op_code.raw(),
                format!(
                    "multiply long (signed={}, accumulate={})",
                    op_code.get_bit(22),
                    op_code.get_bit(21)
                ),
            )),
            Self::SingleDataSwap => Err(ExecutionError::unimplemented(
                op_code.raw(),
                format!("single data swap (byte={})", op_code.get_bit(22)),
            )),
            Self::BranchAndExchange => {
                cpu.branch_and_exchange(op_code.register(0));
                Ok(())
            }
            Self::HalfwordDataTransfer {
                indexing,
                offsetting,
                immediate_offset,
                write_back,
                load_store,
                transfer_kind,
            } => cpu.half_word_data_transfer(
                op_code,
                indexing,
                offsetting,
                immediate_offset,
                write_back,
                load_store,
                transfer_kind,
            ),
            Self::Undefined => cpu.undefined(op_code),
            Self::SingleDataTransfer {
                operand_kind,
                indexing,
                offsetting,
                quantity,
                write_back,
                load_store,
            } => cpu.single_data_transfer(
                op_code,
                operand_kind,
                indexing,
                offsetting,
                quantity,
                write_back,
                load_store,
            ),
            Self::BlockDataTransfer {
                indexing,
                offsetting,
                psr_or_user,
                write_back,
                load_store,
            } => cpu.block_data_transfer(
                op_code,
                indexing,
                offsetting,
                psr_or_user,
                write_back,
                load_store,
            ),
            Self::Branch { link } => {
                cpu.branch(link, op_code.get_bits(0..=23));
                Ok(())
            }
            Self::Coprocessor => Err(ExecutionError::unimplemented(
                op_code.raw(),
                format!("coprocessor p{} operation", op_code.get_bits(8..=11)),
            )),
            Self::SoftwareInterrupt => Err(ExecutionError::unimplemented(
                op_code.raw(),
                format!("software interrupt #0x{:06X}", op_code.get_bits(0..=23)),
            )),
            Self::PsrTransfer(kind) => cpu.psr_transfer(op_code, kind),
            Self::DataProcessing {
                alu_instruction,
                operand_kind,
                set_conditions,
            } => cpu.data_processing(op_code, alu_instruction, operand_kind, set_conditions),
            Self::Unimplemented => Err(ExecutionError::unimplemented(
                op_code.raw(),
                format!("encoding (discriminant 0x{:03X})", op_code.discriminant()),
            )),
        }
    }
}

/// The shared table, built on first call.
pub fn lookup_table() -> &'static [ArmHandler; LUT_SIZE] {
    static LUT: OnceLock<[ArmHandler; LUT_SIZE]> = OnceLock::new();
    LUT.get_or_init(build_lookup_table)
}

#[must_use]
pub fn handler_for(discriminant: usize) -> ArmHandler {
    lookup_table()[discriminant % LUT_SIZE]
}

fn build_lookup_table() -> [ArmHandler; LUT_SIZE] {
    tracing::debug!("building ARM dispatch table ({LUT_SIZE} entries)");
    std::array::from_fn(decode_discriminant)
}

/// Rebuilds an instruction with the discriminant bits in place and zeros elsewhere.
const fn skeleton(discriminant: usize) -> u32 {
    let d = discriminant as u32;
    ((d & 0xFF0) << 16) | ((d & 0xF) << 4)
}

const fn matches(op: u32, mask: u32, pattern: u32) -> bool {
    op & mask == pattern
}

/// Classifies one discriminant. Pure: depends on nothing but its argument.
#[must_use]
pub fn decode_discriminant(discriminant: usize) -> ArmHandler {
    let op = skeleton(discriminant);

    let indexing = Indexing::from(op.get_bit(24));
    let offsetting = Offsetting::from(op.get_bit(23));
    let write_back = op.get_bit(21);
    let load_store = LoadStoreKind::from(op.get_bit(20));

    if matches(op, 0x0FC0_00F0, 0x0000_0090) {
        ArmHandler::Multiply {
            accumulate: op.get_bit(21),
            set_conditions: op.get_bit(20),
        }
    } else if matches(op, 0x0F80_00F0, 0x0080_0090) {
        ArmHandler::MultiplyLong
    } else if matches(op, 0x0FB0_00F0, 0x0100_0090) {
        ArmHandler::SingleDataSwap
    } else if matches(op, 0x0FF0_00F0, 0x0120_0010) {
        ArmHandler::BranchAndExchange
    } else if matches(op, 0x0E00_0090, 0x0000_0090) {
        ArmHandler::HalfwordDataTransfer {
            indexing,
            offsetting,
            immediate_offset: op.get_bit(22),
            write_back,
            load_store,
            transfer_kind: HalfwordTransferKind::from(op.get_bits(5..=6)),
        }
    } else if matches(op, 0x0E00_0010, 0x0600_0010) {
        ArmHandler::Undefined
    } else if matches(op, 0x0C00_0000, 0x0400_0000) {
        ArmHandler::SingleDataTransfer {
            // I=1 selects a register offset here.
            operand_kind: if op.get_bit(25) {
                OperandKind::Register
            } else {
                OperandKind::Immediate
            },
            indexing,
            offsetting,
            quantity: ReadWriteKind::from(op.get_bit(22)),
            write_back,
            load_store,
        }
    } else if matches(op, 0x0E00_0000, 0x0800_0000) {
        ArmHandler::BlockDataTransfer {
            indexing,
            offsetting,
            psr_or_user: op.get_bit(22),
            write_back,
            load_store,
        }
    } else if matches(op, 0x0E00_0000, 0x0A00_0000) {
        ArmHandler::Branch {
            link: op.get_bit(24),
        }
    } else if matches(op, 0x0E00_0000, 0x0C00_0000) || matches(op, 0x0F00_0000, 0x0E00_0000) {
        ArmHandler::Coprocessor
    } else if matches(op, 0x0F00_0000, 0x0F00_0000) {
        ArmHandler::SoftwareInterrupt
    } else if matches(op, 0x0FB0_00F0, 0x0100_0000) {
        ArmHandler::PsrTransfer(PsrOpKind::Mrs {
            psr: PsrKind::from(op.get_bit(22)),
        })
    } else if matches(op, 0x0FB0_00F0, 0x0120_0000) || matches(op, 0x0FB0_0000, 0x0320_0000) {
        ArmHandler::PsrTransfer(PsrOpKind::Msr {
            psr: PsrKind::from(op.get_bit(22)),
            operand_kind: OperandKind::from(op.get_bit(25)),
        })
    } else if matches(op, 0x0C00_0000, 0x0000_0000) {
        // Test opcodes with S=0 land here too: they neither write Rd nor flags.
        ArmHandler::DataProcessing {
            alu_instruction: ArmModeAluInstruction::from(op.get_bits(21..=24)),
            operand_kind: OperandKind::from(op.get_bit(25)),
            set_conditions: op.get_bit(20),
        }
    } else {
        ArmHandler::Unimplemented
    }
}
