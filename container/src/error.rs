use std::fmt;

use crate::opcode::Opcode;

/// Errors that can occur when building, encoding or decoding a program.
#[derive(Debug)]
pub enum ContainerError {
    /// An I/O error occurred during reading or writing.
    Io(std::io::Error),
    /// More labels were requested than a single builder can address.
    TooManyLabels,
    /// A label was used that this builder never created.
    UnknownLabel(u8),
    /// A label was referenced but never linked to a position.
    UndefinedLabel(u8),
    /// A program byte does not name any opcode.
    InvalidOpcode { offset: usize, byte: u8 },
    /// The program ends in the middle of an instruction.
    Truncated { offset: usize },
    /// Memory for a table or buffer could not be allocated.
    AllocationFailed,
    /// The symbol table has no free bucket left.
    SymbolTableFull,
    /// The operands of an instruction do not have the widths its opcode reads.
    OperandMismatch { opcode: Opcode },
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerError::Io(e) => write!(f, "I/O error: {e}"),
            ContainerError::TooManyLabels => write!(f, "label limit exceeded"),
            ContainerError::UnknownLabel(id) => write!(f, "unknown label: {id}"),
            ContainerError::UndefinedLabel(id) => write!(f, "undefined label: {id}"),
            ContainerError::InvalidOpcode { offset, byte } => {
                write!(f, "invalid opcode 0x{byte:02X} at 0x{offset:04X}")
            }
            ContainerError::Truncated { offset } => {
                write!(f, "truncated instruction at 0x{offset:04X}")
            }
            ContainerError::AllocationFailed => write!(f, "allocation failed"),
            ContainerError::SymbolTableFull => write!(f, "symbol table has no free bucket"),
            ContainerError::OperandMismatch { opcode } => {
                write!(f, "operands do not match the encoding of {opcode}")
            }
        }
    }
}

impl std::error::Error for ContainerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ContainerError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ContainerError {
    fn from(e: std::io::Error) -> Self {
        ContainerError::Io(e)
    }
}
