use crate::builder::Label;
use crate::opcode::Opcode;
use crate::operand::{Operand, OperandWidth};

/// A symbolic instruction held by the [`ProgramBuilder`](crate::ProgramBuilder)
/// before relocation.
///
/// When `label_operand` is set the instruction carries exactly one `U64`
/// operand whose value is a label identifier rather than an address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    opcode: Opcode,
    operands: Vec<Operand>,
    label_operand: bool,
}

impl Instruction {
    /// Creates an instruction without operands.
    pub fn plain(opcode: Opcode) -> Self {
        Instruction {
            opcode,
            operands: Vec::new(),
            label_operand: false,
        }
    }

    /// Creates an instruction carrying literal operands.
    pub fn with_operands(opcode: Opcode, operands: Vec<Operand>) -> Self {
        Instruction {
            opcode,
            operands,
            label_operand: false,
        }
    }

    /// Creates an instruction whose single operand refers to a label.
    pub fn with_label(opcode: Opcode, label: Label) -> Self {
        Instruction {
            opcode,
            operands: vec![Operand::U64(label.id() as u64)],
            label_operand: true,
        }
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    /// Returns the referenced label when this instruction has a label operand.
    pub fn label(&self) -> Option<Label> {
        if !self.label_operand {
            return None;
        }
        // Label ids are minted below 256 so the narrowing never truncates.
        self.operands
            .first()
            .map(|operand| Label::new(operand.value() as u8))
    }

    /// Checks that the operands have the widths the opcode is decoded with.
    ///
    /// STR takes a u64 length followed by exactly that many byte operands.
    pub fn has_valid_operands(&self) -> bool {
        if self.opcode.has_payload() {
            return match self.operands.split_first() {
                Some((Operand::U64(len), payload)) => {
                    *len == payload.len() as u64
                        && payload.iter().all(|o| o.width() == OperandWidth::U8)
                }
                _ => false,
            };
        }
        let widths = self.opcode.operand_widths();
        self.operands.len() == widths.len()
            && self
                .operands
                .iter()
                .zip(widths)
                .all(|(operand, &width)| operand.width() == width)
    }

    /// Returns the encoded size: one opcode byte plus every operand's width.
    pub fn size(&self) -> usize {
        1 + self
            .operands
            .iter()
            .map(|operand| operand.width().bytes())
            .sum::<usize>()
    }

    /// Appends the opcode byte followed by the operand bytes.
    ///
    /// `address` replaces the label identifier of a label operand.
    pub(crate) fn encode(&self, address: Option<u64>, out: &mut Vec<u8>) {
        out.push(self.opcode as u8);
        match address {
            Some(address) if self.label_operand => Operand::U64(address).write_le(out),
            _ => {
                for operand in &self.operands {
                    operand.write_le(out);
                }
            }
        }
    }
}
