//! CIL instructions and the opcode table.
//!
//! Method bodies handled by this crate are sequences of [`Instruction`]s whose operands are
//! symbolic (instruction indices and typed references). The [`opcodes`] table provides the
//! encoding metadata needed to compute instruction sizes and byte offsets.
//!
//! # Key Components
//!
//! - [`Instruction`] - One instruction with opcode metadata and a typed [`Operand`]
//! - [`OpCode`] - Encoding, mnemonic, operand kind and flow of an opcode
//! - [`opcodes`] - Constants for every ECMA-335 opcode

mod instruction;
pub mod opcodes;

pub use instruction::{FlowType, Immediate, Instruction, Operand, OperandType};
pub use opcodes::OpCode;
