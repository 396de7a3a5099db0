use std::fmt;
use std::io;

use stackvm_container::Opcode;

use crate::vm::FaultContext;

/// Runtime traps that halt VM execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Trap {
    DivideByZero,
    StackOverflow,
    StackUnderflow,
    /// A pop or peek would reach below the floor of the current call frame.
    OutOfFrame { height: usize, floor: usize },
    CallStackOverflow,
    /// A return was executed with no call to return from.
    CallStackUnderflow,
    InvalidInstruction(u8),
    /// The opcode is known but the VM does not execute it.
    Unimplemented(Opcode),
    /// The program ends inside an instruction's operands.
    TruncatedOperand,
    InvalidStringIndex(u64),
    /// A multi-cell copy whose source overlaps the copied cells.
    InvalidSize { offset: usize, count: usize },
    /// TKS asked for cells the caller does not own, or ran after the callee
    /// pushed its own cells.
    ArgumentsUnavailable,
    OutputFailed(io::ErrorKind),
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trap::DivideByZero => write!(f, "divide by zero"),
            Trap::StackOverflow => write!(f, "stack overflow"),
            Trap::StackUnderflow => write!(f, "stack underflow"),
            Trap::OutOfFrame { height, floor } => write!(
                f,
                "access out of stack frame bounds (height {height}, frame floor {floor})"
            ),
            Trap::CallStackOverflow => write!(f, "call stack overflow"),
            Trap::CallStackUnderflow => write!(f, "call stack underflow"),
            Trap::InvalidInstruction(op) => write!(f, "invalid instruction: 0x{op:02X}"),
            Trap::Unimplemented(op) => write!(f, "unimplemented instruction: {op}"),
            Trap::TruncatedOperand => write!(f, "truncated operand"),
            Trap::InvalidStringIndex(i) => write!(f, "invalid string index: {i}"),
            Trap::InvalidSize { offset, count } => {
                write!(f, "invalid copy of {count} cells from offset {offset}")
            }
            Trap::ArgumentsUnavailable => write!(f, "arguments unavailable to callee"),
            Trap::OutputFailed(kind) => write!(f, "output failed: {kind}"),
        }
    }
}

impl std::error::Error for Trap {}

/// Errors produced by running a program to completion.
#[derive(Debug)]
pub enum VmError {
    /// A runtime trap occurred during execution.
    Fault(FaultContext),
    /// The output could not be flushed after the program finished.
    Output(io::Error),
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::Fault(ctx) => write!(f, "trap: {ctx}"),
            VmError::Output(e) => write!(f, "output error: {e}"),
        }
    }
}

impl std::error::Error for VmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VmError::Fault(ctx) => Some(&ctx.trap),
            VmError::Output(e) => Some(e),
        }
    }
}

impl From<FaultContext> for VmError {
    fn from(ctx: FaultContext) -> Self {
        VmError::Fault(ctx)
    }
}

impl From<io::Error> for VmError {
    fn from(e: io::Error) -> Self {
        VmError::Output(e)
    }
}
