//! CIL instruction representation and operand types.
//!
//! Instructions are kept in a symbolic form: branch targets are instruction indices and member
//! operands are typed references rather than raw tokens. This lets a method body move between
//! modules and have its operands rewritten without re-encoding anything; byte offsets are derived
//! from the opcode table on demand, see [`crate::metadata::method::MethodBody::recompute_offsets`].
//!
//! # Key Components
//!
//! - [`Instruction`] - One instruction with its opcode metadata and operand
//! - [`Operand`] - Typed operand representation
//! - [`Immediate`] - Immediate value types with conversions
//! - [`OperandType`] - Encoded operand kinds and their sizes
//! - [`FlowType`] - Control flow behavior classification

use std::{
    fmt::{self, UpperHex},
    sync::Arc,
};

use crate::{
    assembly::opcodes::OpCode,
    metadata::{
        signatures::MethodSignature,
        token::Token,
        typesystem::{FieldRef, MethodRef, TypeRef},
    },
};

/// Types of operands for CIL instructions.
///
/// Each variant corresponds to a specific data type and size used in the .NET instruction set.
///
/// # Examples
///
/// ```rust
/// use codesurgeon::assembly::OperandType;
///
/// assert_eq!(OperandType::None.size(), Some(0));
/// assert_eq!(OperandType::Int8.size(), Some(1));
/// assert_eq!(OperandType::Token.size(), Some(4));
/// assert_eq!(OperandType::Switch.size(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    /// No operand present
    None,
    /// Signed 8-bit integer
    Int8,
    /// Unsigned 8-bit integer
    UInt8,
    /// Signed 16-bit integer
    Int16,
    /// Unsigned 16-bit integer
    UInt16,
    /// Signed 32-bit integer
    Int32,
    /// Unsigned 32-bit integer
    UInt32,
    /// Signed 64-bit integer
    Int64,
    /// Unsigned 64-bit integer
    UInt64,
    /// 32-bit floating point
    Float32,
    /// 64-bit floating point
    Float64,
    /// Metadata token reference
    Token,
    /// Switch table operand
    Switch,
}

impl OperandType {
    /// Returns the size in bytes of this operand type, or `None` for the variable-size switch
    /// table.
    #[must_use]
    pub const fn size(&self) -> Option<usize> {
        match self {
            OperandType::None => Some(0),
            OperandType::Int8 | OperandType::UInt8 => Some(1),
            OperandType::Int16 | OperandType::UInt16 => Some(2),
            OperandType::Int32
            | OperandType::UInt32
            | OperandType::Float32
            | OperandType::Token => Some(4),
            OperandType::Int64 | OperandType::UInt64 | OperandType::Float64 => Some(8),
            OperandType::Switch => None,
        }
    }
}

/// Immediate values embedded in CIL instructions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Immediate {
    /// Signed 8-bit immediate value
    Int8(i8),
    /// Unsigned 8-bit immediate value
    UInt8(u8),
    /// Signed 16-bit immediate value
    Int16(i16),
    /// Unsigned 16-bit immediate value
    UInt16(u16),
    /// Signed 32-bit immediate value
    Int32(i32),
    /// Unsigned 32-bit immediate value
    UInt32(u32),
    /// Signed 64-bit immediate value
    Int64(i64),
    /// Unsigned 64-bit immediate value
    UInt64(u64),
    /// 32-bit floating point immediate value
    Float32(f32),
    /// 64-bit floating point immediate value
    Float64(f64),
}

impl UpperHex for Immediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Immediate::Int8(value) => write!(f, "{value:02X}"),
            Immediate::UInt8(value) => write!(f, "{value:02X}"),
            Immediate::Int16(value) => write!(f, "{value:04X}"),
            Immediate::UInt16(value) => write!(f, "{value:04X}"),
            Immediate::Int32(value) => write!(f, "{value:08X}"),
            Immediate::UInt32(value) => write!(f, "{value:08X}"),
            Immediate::Int64(value) => write!(f, "{value:016X}"),
            Immediate::UInt64(value) => write!(f, "{value:016X}"),
            Immediate::Float32(value) => write!(f, "{:08X}", value.to_bits()),
            Immediate::Float64(value) => write!(f, "{:016X}", value.to_bits()),
        }
    }
}

#[allow(clippy::cast_sign_loss)]
impl From<Immediate> for u64 {
    fn from(immediate: Immediate) -> Self {
        match immediate {
            Immediate::Int8(value) => value as u64,
            Immediate::UInt8(value) => u64::from(value),
            Immediate::Int16(value) => value as u64,
            Immediate::UInt16(value) => u64::from(value),
            Immediate::Int32(value) => value as u64,
            Immediate::UInt32(value) => u64::from(value),
            Immediate::Int64(value) => value as u64,
            Immediate::UInt64(value) => value,
            Immediate::Float32(value) => u64::from(value.to_bits()),
            Immediate::Float64(value) => value.to_bits(),
        }
    }
}

/// Control flow behavior of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowType {
    /// Normal execution continues to next instruction
    Sequential,
    /// Conditional branch to another location
    ConditionalBranch,
    /// Always branches to another location (unconditional jump)
    UnconditionalBranch,
    /// Call to another method
    Call,
    /// Returns from current method
    Return,
    /// Multi-way branch (switch statement)
    Switch,
    /// Exception throwing
    Throw,
    /// End of finally block
    EndFinally,
    /// Leave protected region (try/catch/finally)
    Leave,
}

/// The operand of an instruction.
///
/// Branch targets and switch tables index into the owning body's instruction list.
#[derive(Debug, Clone)]
pub enum Operand {
    /// No operand
    None,
    /// Numeric constant
    Immediate(Immediate),
    /// User string, for `ldstr`
    String(String),
    /// Branch target instruction index
    Target(usize),
    /// Switch target instruction indices
    Switch(Vec<usize>),
    /// Local variable index
    Local(u16),
    /// Argument index
    Argument(u16),
    /// A type, for `box`, `newarr`, `ldtoken`, ...
    Type(TypeRef),
    /// A field, for `ldfld`, `stsfld`, ...
    Field(FieldRef),
    /// A method, for `call`, `newobj`, `ldftn`, ...
    Method(MethodRef),
    /// A member token that may name a type, a field or a method (`ldtoken`), resolved against
    /// the module the body was read from
    Token(Token),
    /// Stand-alone call site signature, for `calli`
    Signature(Arc<MethodSignature>),
}

/// A CIL instruction with its opcode metadata.
#[derive(Debug, Clone)]
pub struct Instruction {
    /// Byte offset from the start of the method body
    pub offset: u32,
    /// Opcode byte (the second byte for `0xFE`-prefixed opcodes)
    pub opcode: u8,
    /// Prefix byte (0 if no prefix)
    pub prefix: u8,
    /// Human-readable instruction mnemonic (e.g., "add", "ldloc.s", "ret")
    pub mnemonic: &'static str,
    /// Encoded operand kind
    pub operand_type: OperandType,
    /// How this instruction affects control flow
    pub flow_type: FlowType,
    /// The operand data for this instruction
    pub operand: Operand,
}

impl Instruction {
    /// Creates an instruction for `opcode` with `operand`, at offset 0
    #[must_use]
    pub fn new(opcode: &OpCode, operand: Operand) -> Self {
        Instruction {
            offset: 0,
            opcode: opcode.value,
            prefix: opcode.prefix,
            mnemonic: opcode.mnemonic,
            operand_type: opcode.operand_type,
            flow_type: opcode.flow,
            operand,
        }
    }

    /// Creates an instruction without operand
    #[must_use]
    pub fn simple(opcode: &OpCode) -> Self {
        Self::new(opcode, Operand::None)
    }

    /// Encoded size in bytes
    #[must_use]
    pub fn size(&self) -> usize {
        let opcode_size = if self.prefix == 0 { 1 } else { 2 };
        let operand_size = match (&self.operand_type, &self.operand) {
            (OperandType::Switch, Operand::Switch(targets)) => 4 + 4 * targets.len(),
            (OperandType::Switch, _) => 4,
            (operand_type, _) => operand_type.size().unwrap_or(0),
        };
        opcode_size + operand_size
    }

    /// Returns `true` if this instruction can jump to another instruction of the body
    #[must_use]
    pub fn is_branch(&self) -> bool {
        matches!(
            self.flow_type,
            FlowType::ConditionalBranch
                | FlowType::UnconditionalBranch
                | FlowType::Switch
                | FlowType::Leave
        )
    }

    /// Returns `true` if this instruction ends a basic block
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.flow_type,
            FlowType::ConditionalBranch
                | FlowType::UnconditionalBranch
                | FlowType::Return
                | FlowType::Switch
                | FlowType::Throw
                | FlowType::Leave
        )
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04X}: {}", self.offset, self.mnemonic)?;
        match &self.operand {
            Operand::None => Ok(()),
            Operand::Immediate(value) => write!(f, " 0x{value:X}"),
            Operand::String(value) => write!(f, " {value:?}"),
            Operand::Target(index) => write!(f, " #{index}"),
            Operand::Switch(targets) => write!(f, " {targets:?}"),
            Operand::Local(index) => write!(f, " V_{index}"),
            Operand::Argument(index) => write!(f, " A_{index}"),
            Operand::Type(type_ref) => write!(f, " {}", type_ref.full_name()),
            Operand::Field(field) => write!(f, " {}", field.full_name()),
            Operand::Method(method) => write!(f, " {}", method.full_name()),
            Operand::Token(token) => write!(f, " {token}"),
            Operand::Signature(signature) => write!(f, " {signature}"),
        }
    }
}
