//! Instruction decoder over relocated program bytes.

use crate::opcode::Opcode;
use crate::operand::{Operand, OperandWidth};
use crate::ContainerError;

/// One decoded instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedInstruction<'a> {
    /// Byte offset of the opcode.
    pub offset: usize,
    pub opcode: Opcode,
    /// Fixed operands; for STR this is the length operand.
    pub operands: Vec<Operand>,
    /// String bytes of a STR instruction, empty otherwise.
    pub payload: &'a [u8],
}

impl DecodedInstruction<'_> {
    /// Returns the encoded size of the instruction.
    pub fn size(&self) -> usize {
        1 + self
            .operands
            .iter()
            .map(|operand| operand.width().bytes())
            .sum::<usize>()
            + self.payload.len()
    }
}

/// Iterator over the instructions of a program.
///
/// Stops after the first error.
pub struct Decoder<'a> {
    code: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> Decoder<'a> {
    pub fn new(code: &'a [u8]) -> Self {
        Decoder {
            code,
            offset: 0,
            failed: false,
        }
    }

    fn decode_at(&self, offset: usize) -> Result<DecodedInstruction<'a>, ContainerError> {
        let byte = self.code[offset];
        let opcode =
            Opcode::from_u8(byte).ok_or(ContainerError::InvalidOpcode { offset, byte })?;

        let mut cursor = offset + 1;
        let mut operands = Vec::new();
        let widths: &[OperandWidth] = if opcode.has_payload() {
            &[OperandWidth::U64]
        } else {
            opcode.operand_widths()
        };
        for &width in widths {
            let operand = self
                .code
                .get(cursor..)
                .and_then(|rest| Operand::read_le(width, rest))
                .ok_or(ContainerError::Truncated { offset })?;
            cursor += width.bytes();
            operands.push(operand);
        }

        let mut payload: &[u8] = &[];
        if opcode.has_payload() {
            let len = usize::try_from(operands[0].value())
                .map_err(|_| ContainerError::Truncated { offset })?;
            payload = cursor
                .checked_add(len)
                .and_then(|end| self.code.get(cursor..end))
                .ok_or(ContainerError::Truncated { offset })?;
        }

        Ok(DecodedInstruction {
            offset,
            opcode,
            operands,
            payload,
        })
    }
}

impl<'a> Iterator for Decoder<'a> {
    type Item = Result<DecodedInstruction<'a>, ContainerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.code.len() {
            return None;
        }
        match self.decode_at(self.offset) {
            Ok(inst) => {
                self.offset += inst.size();
                Some(Ok(inst))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
