use log::debug;

use crate::instruction::Instruction;
use crate::opcode::Opcode;
use crate::operand::Operand;
use crate::program::Program;
use crate::ContainerError;

/// Maximum number of labels a single builder can create.
pub const MAX_LABELS: usize = 256;

/// Identifier of a jump or call target.
///
/// A label is created unbound and becomes bound with
/// [`ProgramBuilder::link_label`]. It may be referenced before it is bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Label(u8);

impl Label {
    pub fn new(id: u8) -> Self {
        Label(id)
    }

    pub fn id(self) -> u8 {
        self.0
    }
}

/// Accumulates symbolic instructions and relocates them into a [`Program`].
pub struct ProgramBuilder {
    instructions: Vec<Instruction>,
    /// Instruction index each label was last linked to, indexed by label id.
    labels: Vec<Option<usize>>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        ProgramBuilder {
            instructions: Vec::new(),
            labels: Vec::new(),
        }
    }

    /// Creates a new, unbound label.
    pub fn create_label(&mut self) -> Result<Label, ContainerError> {
        if self.labels.len() >= MAX_LABELS {
            return Err(ContainerError::TooManyLabels);
        }
        let label = Label(self.labels.len() as u8);
        self.labels.push(None);
        Ok(label)
    }

    /// Binds the label to the next instruction to be emitted.
    ///
    /// Linking an already linked label moves it; the last link wins.
    pub fn link_label(&mut self, label: Label) -> Result<(), ContainerError> {
        let position = self.instructions.len();
        let slot = self
            .labels
            .get_mut(label.0 as usize)
            .ok_or(ContainerError::UnknownLabel(label.0))?;
        *slot = Some(position);
        Ok(())
    }

    /// Emits an instruction without operands.
    ///
    /// An opcode that takes operands is rejected by [`finalize`](Self::finalize).
    pub fn emit_plain(&mut self, opcode: Opcode) {
        self.instructions.push(Instruction::plain(opcode));
    }

    /// Emits an instruction with the given literal operands.
    ///
    /// The operands must have exactly the widths `opcode` is decoded with,
    /// otherwise nothing is emitted and `OperandMismatch` is returned.
    pub fn emit_with_operands(
        &mut self,
        opcode: Opcode,
        operands: Vec<Operand>,
    ) -> Result<(), ContainerError> {
        let inst = Instruction::with_operands(opcode, operands);
        if !inst.has_valid_operands() {
            return Err(ContainerError::OperandMismatch { opcode });
        }
        self.instructions.push(inst);
        Ok(())
    }

    /// Emits PSH with a full-width literal.
    pub fn emit_push(&mut self, value: u64) {
        self.instructions.push(Instruction::with_operands(
            Opcode::Push,
            vec![Operand::U64(value)],
        ));
    }

    /// Emits the narrowest push instruction (PS8, PS4 or PSH) that holds `value`.
    pub fn emit_push_sized(&mut self, value: u64) {
        let operand = Operand::fitting(value);
        let opcode = match operand {
            Operand::U8(_) => Opcode::Push8,
            Operand::U32(_) => Opcode::Push4,
            Operand::U64(_) => Opcode::Push,
        };
        self.instructions
            .push(Instruction::with_operands(opcode, vec![operand]));
    }

    /// Emits PSH whose operand becomes the address of `label` on finalize.
    pub fn emit_push_label(&mut self, label: Label) -> Result<(), ContainerError> {
        self.check_label(label)?;
        self.instructions
            .push(Instruction::with_label(Opcode::Push, label));
        Ok(())
    }

    /// Emits STR: a u64 length followed by the raw bytes of `text`.
    pub fn emit_string(&mut self, text: impl AsRef<[u8]>) {
        let bytes = text.as_ref();
        let mut operands = Vec::with_capacity(bytes.len() + 1);
        operands.push(Operand::U64(bytes.len() as u64));
        operands.extend(bytes.iter().copied().map(Operand::U8));
        self.instructions
            .push(Instruction::with_operands(Opcode::Str, operands));
    }

    /// Emits an instruction with a single u64 size operand (DRPZ, SWPZ).
    pub fn emit_sized(&mut self, opcode: Opcode, size: u64) -> Result<(), ContainerError> {
        self.emit_with_operands(opcode, vec![Operand::U64(size)])
    }

    /// Emits an unconditional jump to `label`.
    pub fn emit_jump(&mut self, label: Label) -> Result<(), ContainerError> {
        self.emit_push_label(label)?;
        self.emit_plain(Opcode::Jmp);
        Ok(())
    }

    /// Emits a jump to `label` taken when the condition on the stack is non-zero.
    pub fn emit_jump_if_true(&mut self, label: Label) -> Result<(), ContainerError> {
        self.emit_push_label(label)?;
        self.emit_plain(Opcode::JmpIfTrue);
        Ok(())
    }

    /// Emits a jump to `label` taken when the condition on the stack is zero.
    pub fn emit_jump_if_false(&mut self, label: Label) -> Result<(), ContainerError> {
        self.emit_push_label(label)?;
        self.emit_plain(Opcode::JmpIfFalse);
        Ok(())
    }

    /// Emits a call to the subroutine at `label`.
    pub fn emit_call(&mut self, label: Label) -> Result<(), ContainerError> {
        self.emit_push_label(label)?;
        self.emit_plain(Opcode::Call);
        Ok(())
    }

    /// Returns the number of instructions emitted so far.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Returns the number of labels created so far.
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Relocates the instructions into a flat [`Program`].
    ///
    /// Every label operand is replaced by the byte address of the instruction
    /// its label was last linked to. A label linked after the last
    /// instruction resolves to the program size.
    pub fn finalize(&self) -> Result<Program, ContainerError> {
        // Pass 1: operand shapes, then the byte address of every instruction
        // plus the end address.
        let mut addresses = Vec::with_capacity(self.instructions.len() + 1);
        let mut offset = 0usize;
        for inst in &self.instructions {
            if !inst.has_valid_operands() {
                return Err(ContainerError::OperandMismatch {
                    opcode: inst.opcode(),
                });
            }
            addresses.push(offset);
            offset += inst.size();
        }
        addresses.push(offset);
        let total_size = offset;

        // Pass 2: resolve label operands to addresses.
        let mut resolved = Vec::with_capacity(self.instructions.len());
        for inst in &self.instructions {
            let address = match inst.label() {
                Some(label) => {
                    let index = self
                        .labels
                        .get(label.0 as usize)
                        .copied()
                        .flatten()
                        .ok_or(ContainerError::UndefinedLabel(label.0))?;
                    Some(addresses[index] as u64)
                }
                None => None,
            };
            resolved.push(address);
        }

        // Pass 3: encode into a buffer of exactly the computed size.
        let mut code = Vec::new();
        code.try_reserve_exact(total_size)
            .map_err(|_| ContainerError::AllocationFailed)?;
        for (inst, address) in self.instructions.iter().zip(resolved) {
            inst.encode(address, &mut code);
        }
        debug_assert_eq!(code.len(), total_size);

        debug!(
            "Relocated {} instructions and {} labels into {} bytes",
            self.instructions.len(),
            self.labels.len(),
            total_size
        );

        Ok(Program::from_bytes(code))
    }

    fn check_label(&self, label: Label) -> Result<(), ContainerError> {
        if (label.0 as usize) < self.labels.len() {
            Ok(())
        } else {
            Err(ContainerError::UnknownLabel(label.0))
        }
    }
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}
