//! Text assembler for stackvm.
//!
//! Turns line-oriented assembler source into a relocated [`Program`] by
//! driving a [`ProgramBuilder`]. Label names are interned in a
//! [`SymbolTable`] and may be referenced before they are defined.
//!
//! # Example
//!
//! ```
//! use stackvm_assembler::assemble;
//!
//! let program = assemble("psh 3 psh 4 add dbg ext").unwrap();
//! assert_eq!(program.len(), 21);
//! ```
//!
//! [`Program`]: stackvm_container::Program
//! [`ProgramBuilder`]: stackvm_container::ProgramBuilder
//! [`SymbolTable`]: stackvm_container::SymbolTable

mod assemble;
mod error;
mod scanner;

pub use assemble::{assemble, Assembler};
pub use error::{AssembleError, Location};
