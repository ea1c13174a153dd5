//! Method bodies: locals, instructions and exception handlers.

use crate::{
    assembly::Instruction,
    metadata::{method::ExceptionHandler, signatures::LocalVariable},
};

/// The executable body of a method.
#[derive(Debug, Clone, Default)]
pub struct MethodBody {
    /// Maximum evaluation stack depth
    pub max_stack: u16,
    /// Zero-initialize locals on entry
    pub init_locals: bool,
    /// Local variables
    pub locals: Vec<LocalVariable>,
    /// Instructions in execution layout order
    pub instructions: Vec<Instruction>,
    /// Exception handling clauses, boundaries as instruction indices
    pub exception_handlers: Vec<ExceptionHandler>,
}

impl MethodBody {
    /// Creates a body from instructions, with offsets computed
    #[must_use]
    pub fn new(max_stack: u16, instructions: Vec<Instruction>) -> Self {
        let mut body = MethodBody {
            max_stack,
            init_locals: false,
            locals: Vec::new(),
            instructions,
            exception_handlers: Vec::new(),
        };
        body.recompute_offsets();
        body
    }

    /// Reassigns every instruction offset from the instruction sizes
    #[allow(clippy::cast_possible_truncation)]
    pub fn recompute_offsets(&mut self) {
        let mut offset = 0u32;
        for instruction in &mut self.instructions {
            instruction.offset = offset;
            offset += instruction.size() as u32;
        }
    }

    /// Size of the encoded instruction stream in bytes
    #[must_use]
    pub fn code_size(&self) -> usize {
        self.instructions.iter().map(Instruction::size).sum()
    }

    /// Byte offset of the instruction at `index`; an index equal to the instruction count maps to
    /// the end of the code
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn offset_of(&self, index: usize) -> Option<u32> {
        match self.instructions.get(index) {
            Some(instruction) => Some(instruction.offset),
            None if index == self.instructions.len() => Some(self.code_size() as u32),
            None => None,
        }
    }
}
