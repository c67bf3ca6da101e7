//! # ARM Instruction Set (32-bit)
//!
//! Every instruction is conditional and 32 bits wide.
//!
//! ## Decoding
//!
//! Bits 27-20 and bits 7-4 of an instruction form a 12-bit discriminant.
//! It indexes a 4096-entry table, built once, whose entries name the handler
//! family and carry the flags it needs (indexing, write-back, ALU opcode, ...).
//!
//! ```text
//! 31-28   27-20         19-8      7-4      3-0
//! [Cond] [discriminant] [.....] [discr.]  [...]
//! ```
//!
//! ## Instruction Categories
//!
//! | Bits 27-25 | Category              | Examples                    |
//! |------------|-----------------------|-----------------------------|
//! | 00x        | Data Processing       | AND, ADD, CMP, MOV          |
//! | 000        | Multiply/Swap/BX      | MUL, SWP, BX                |
//! | 000        | Halfword Transfer     | LDRH, STRH, LDRSB, LDRSH    |
//! | 00x        | PSR Transfer          | MRS, MSR                    |
//! | 01x        | Single Data Transfer  | LDR, STR                    |
//! | 100        | Block Data Transfer   | LDM, STM                    |
//! | 101        | Branch                | B, BL                       |
//! | 11x        | Coprocessor           | CDP, LDC, MRC               |
//! | 1111       | Software Interrupt    | SWI                         |
//!
//! ## Submodules
//!
//! - [`lut`] - Discriminant table and handler dispatch
//! - [`opcode`] - Raw instruction word
//! - [`operations`] - Execution
//! - [`alu_instruction`] - ALU ops and barrel shifter

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_possible_wrap)]
#[allow(clippy::cast_lossless)]
pub mod alu_instruction;

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::unreadable_literal)]
pub mod lut;

#[allow(clippy::cast_possible_truncation)]
pub mod opcode;

#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_possible_wrap)]
#[allow(clippy::cast_lossless)]
#[allow(clippy::similar_names)]
#[allow(clippy::unreadable_literal)]
pub mod operations;
