//! Error types for assembly.

use std::fmt;

use stackvm_container::{ContainerError, Opcode, OperandWidth};

/// A position in the assembler source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Location {
    /// Byte offset from the start of the source.
    pub offset: usize,
    /// One-based line number.
    pub line: usize,
    /// One-based column, counted in characters.
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Errors that can occur while assembling source text.
#[derive(Debug)]
pub enum AssembleError {
    /// A token does not name any instruction.
    UnknownInstruction { name: String, at: Location },
    /// The source ends inside a string literal.
    UnterminatedString { at: Location },
    /// A string literal was required but something else was found.
    ExpectedString { found: char, at: Location },
    /// A numeric operand is not a decimal or `0x` hexadecimal integer.
    InvalidNumber { literal: String, at: Location },
    /// A numeric operand does not fit the width of the instruction's operand.
    OperandOutOfRange {
        value: u64,
        width: OperandWidth,
        at: Location,
    },
    /// The source ends where an instruction still expects an operand.
    MissingOperand { opcode: Opcode, at: Location },
    /// A character that cannot start or end a token here.
    UnexpectedCharacter { found: char, at: Location },
    /// A label is referenced but never defined.
    UndefinedLabel { name: String, at: Location },
    /// The program builder rejected the program.
    Build(ContainerError),
}

impl AssembleError {
    /// Returns the source location of the error, if it has one.
    pub fn location(&self) -> Option<Location> {
        match self {
            AssembleError::UnknownInstruction { at, .. }
            | AssembleError::UnterminatedString { at }
            | AssembleError::ExpectedString { at, .. }
            | AssembleError::InvalidNumber { at, .. }
            | AssembleError::OperandOutOfRange { at, .. }
            | AssembleError::MissingOperand { at, .. }
            | AssembleError::UnexpectedCharacter { at, .. }
            | AssembleError::UndefinedLabel { at, .. } => Some(*at),
            AssembleError::Build(_) => None,
        }
    }
}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssembleError::UnknownInstruction { name, at } => {
                write!(f, "{at}: unknown instruction `{name}`")
            }
            AssembleError::UnterminatedString { at } => {
                write!(f, "{at}: string literal is not closed")
            }
            AssembleError::ExpectedString { found, at } => {
                write!(f, "{at}: expected a string literal starting with \", found `{found}`")
            }
            AssembleError::InvalidNumber { literal, at } => {
                write!(f, "{at}: invalid numeric operand `{literal}`")
            }
            AssembleError::OperandOutOfRange { value, width, at } => {
                write!(
                    f,
                    "{at}: operand {value} does not fit in {} byte(s)",
                    width.bytes()
                )
            }
            AssembleError::MissingOperand { opcode, at } => {
                write!(f, "{at}: missing operand for {opcode}")
            }
            AssembleError::UnexpectedCharacter { found, at } => {
                write!(f, "{at}: unexpected character `{found}`")
            }
            AssembleError::UndefinedLabel { name, at } => {
                write!(f, "{at}: label `{name}` is never defined")
            }
            AssembleError::Build(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for AssembleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssembleError::Build(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ContainerError> for AssembleError {
    fn from(e: ContainerError) -> Self {
        AssembleError::Build(e)
    }
}
