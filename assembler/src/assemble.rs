//! Assembles source text into a program.
//!
//! The syntax is a stream of whitespace separated tokens:
//!
//! - `name:` defines a label at the next instruction. Defining a label again
//!   moves it.
//! - `#` starts a comment that runs to the end of the line.
//! - Any other token is an instruction mnemonic, matched without regard to
//!   case. `PSH` takes a number or a `'name` label reference, `STR` takes a
//!   string literal, and `PS4`, `PS8`, `DRPZ`, `DUPZ` and `SWPZ` take numbers.
//!
//! Numbers are decimal or `0x` hexadecimal.

use std::collections::HashMap;

use log::{debug, trace};
use stackvm_container::{
    ContainerError, Label, Opcode, Operand, OperandWidth, Program, ProgramBuilder, SymbolTable,
};

use crate::error::{AssembleError, Location};
use crate::scanner::Scanner;

/// Assembles `source` into a program.
pub fn assemble(source: &str) -> Result<Program, AssembleError> {
    Assembler::new(source)?.assemble()
}

/// Translates one source text into instructions on a [`ProgramBuilder`].
pub struct Assembler<'a> {
    scanner: Scanner<'a>,
    /// Label names to label identifiers.
    labels: SymbolTable,
    /// Where each label was first mentioned.
    first_use: HashMap<u8, Location>,
}

impl<'a> Assembler<'a> {
    pub fn new(source: &'a str) -> Result<Self, AssembleError> {
        Ok(Assembler {
            scanner: Scanner::new(source),
            labels: SymbolTable::new()?,
            first_use: HashMap::new(),
        })
    }

    /// Assembles the whole source and relocates it into a program.
    pub fn assemble(mut self) -> Result<Program, AssembleError> {
        let mut builder = ProgramBuilder::new();
        self.assemble_into(&mut builder)?;
        let program = builder.finalize().map_err(|e| self.describe(e))?;
        debug!(
            "Assembled {} instructions into {} bytes with {} labels",
            builder.len(),
            program.len(),
            self.labels.len()
        );
        Ok(program)
    }

    /// Emits the instructions of the source into `builder` without
    /// finalizing it.
    pub fn assemble_into(&mut self, builder: &mut ProgramBuilder) -> Result<(), AssembleError> {
        loop {
            self.scanner.skip_spaces();
            if self.scanner.is_at_end() {
                return Ok(());
            }

            let start = self.scanner.pos();
            let word = self.scanner.read_word();

            if self.scanner.peek() == Some(b':') {
                if word.is_empty() {
                    return Err(AssembleError::UnexpectedCharacter {
                        found: ':',
                        at: self.scanner.location(start),
                    });
                }
                self.scanner.bump();
                let label = self.label(builder, word, start)?;
                builder.link_label(label)?;
                continue;
            }

            self.resolve_instruction(builder, word, start)?;
        }
    }

    /// Returns the label names seen so far and their identifiers.
    pub fn labels(&self) -> &SymbolTable {
        &self.labels
    }

    fn resolve_instruction(
        &mut self,
        builder: &mut ProgramBuilder,
        word: &str,
        start: usize,
    ) -> Result<(), AssembleError> {
        let opcode = Opcode::from_name(word).ok_or_else(|| AssembleError::UnknownInstruction {
            name: word.to_owned(),
            at: self.scanner.location(start),
        })?;
        trace!("Found instruction {opcode} at {}", self.scanner.location(start));

        match opcode {
            Opcode::Push => {
                self.expect_operand(opcode)?;
                if self.scanner.peek() == Some(b'\'') {
                    let at = self.scanner.pos();
                    self.scanner.bump();
                    let name = self.scanner.read_word();
                    if name.is_empty() {
                        return Err(self.unexpected_character());
                    }
                    let label = self.label(builder, name, at)?;
                    builder.emit_push_label(label)?;
                } else {
                    let value = self.scanner.read_number()?;
                    builder.emit_push(value);
                }
            }
            Opcode::Str => {
                self.expect_operand(opcode)?;
                let text = self.scanner.read_string_literal()?;
                builder.emit_string(text);
            }
            _ => {
                let widths = opcode.operand_widths();
                let mut operands = Vec::with_capacity(widths.len());
                for &width in widths {
                    operands.push(self.sized_operand(opcode, width)?);
                }
                builder.emit_with_operands(opcode, operands)?;
            }
        }
        Ok(())
    }

    /// Skips to the next operand, which must exist.
    fn expect_operand(&mut self, opcode: Opcode) -> Result<(), AssembleError> {
        self.scanner.skip_spaces();
        if self.scanner.is_at_end() {
            return Err(AssembleError::MissingOperand {
                opcode,
                at: self.scanner.location(self.scanner.pos()),
            });
        }
        Ok(())
    }

    fn sized_operand(
        &mut self,
        opcode: Opcode,
        width: OperandWidth,
    ) -> Result<Operand, AssembleError> {
        self.expect_operand(opcode)?;
        let at = self.scanner.location(self.scanner.pos());
        let value = self.scanner.read_number()?;
        Operand::with_width(width, value)
            .ok_or(AssembleError::OperandOutOfRange { value, width, at })
    }

    /// Returns the label bound to `name`, creating it on first mention.
    fn label(
        &mut self,
        builder: &mut ProgramBuilder,
        name: &str,
        offset: usize,
    ) -> Result<Label, AssembleError> {
        if let Some(id) = self.labels.find(name) {
            let id = u8::try_from(id).map_err(|_| ContainerError::TooManyLabels)?;
            return Ok(Label::new(id));
        }

        let label = builder.create_label()?;
        self.labels.insert(name, label.id() as u64)?;
        self.first_use
            .insert(label.id(), self.scanner.location(offset));
        debug!("Created label `{name}` as {}", label.id());
        Ok(label)
    }

    fn unexpected_character(&self) -> AssembleError {
        AssembleError::UnexpectedCharacter {
            found: self.scanner.peek_char().unwrap_or(' '),
            at: self.scanner.location(self.scanner.pos()),
        }
    }

    /// Attaches the label name to an undefined label reported by the builder.
    fn describe(&self, e: ContainerError) -> AssembleError {
        match e {
            ContainerError::UndefinedLabel(id) => {
                match self.labels.iter().find(|entry| entry.value == id as u64) {
                    Some(entry) => AssembleError::UndefinedLabel {
                        name: entry.key().to_owned(),
                        at: self.first_use.get(&id).copied().unwrap_or_default(),
                    },
                    None => AssembleError::Build(e),
                }
            }
            other => AssembleError::Build(other),
        }
    }
}
