//! Bytecode model for the stack VM: opcodes, operands, the two-pass program
//! builder, the decoder and the symbol table used to name labels.

mod builder;
mod decode;
mod error;
mod instruction;
pub mod opcode;
mod operand;
mod program;
mod symbol_table;

pub use builder::{Label, ProgramBuilder, MAX_LABELS};
pub use decode::{DecodedInstruction, Decoder};
pub use error::ContainerError;
pub use instruction::Instruction;
pub use opcode::Opcode;
pub use operand::{Operand, OperandWidth};
pub use program::Program;
pub use symbol_table::{fnv1, SymbolEntry, SymbolTable};
