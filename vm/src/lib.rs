//! Virtual machine for stackvm programs.
//!
//! The VM moves through typed states: [`Vm`] loads a program into a
//! [`VmReady`], which starts a [`VmRunning`]. A running VM ends as a
//! [`VmStopped`] or, on a trap, a [`VmFaulted`].
//!
//! ```
//! use stackvm_container::{Opcode, ProgramBuilder};
//!
//! let mut b = ProgramBuilder::new();
//! b.emit_push(7);
//! b.emit_plain(Opcode::Debug);
//! let program = b.finalize().unwrap();
//!
//! let mut out = Vec::new();
//! stackvm_vm::execute(&program, &mut out).unwrap();
//! assert_eq!(out, b"7");
//! ```

use std::io::Write;

use stackvm_container::Program;

pub mod error;
mod frame;
mod options;
mod stack;
mod strings;
mod value;
mod vm;

pub use error::{Trap, VmError};
pub use frame::StackFrame;
pub use options::{StringMode, VmOptions};
pub use strings::{StringEntry, StringTable};
pub use value::Slot;
pub use vm::{
    Exit, FaultContext, Step, StopHandle, Vm, VmFaulted, VmReady, VmRunning, VmStopped,
};

/// Runs `program` to completion with default options, writing its output
/// to `out`.
pub fn execute(program: &Program, out: &mut impl Write) -> Result<(), VmError> {
    execute_with(program, VmOptions::default(), out)
}

/// Runs `program` to completion, writing its output to `out`.
///
/// `out` is flushed whether or not the program faults.
pub fn execute_with(
    program: &Program,
    options: VmOptions,
    out: &mut impl Write,
) -> Result<(), VmError> {
    let result = Vm::new(options).load(program).start(&mut *out).run();
    let flushed = out.flush();
    result?;
    flushed?;
    Ok(())
}
