use std::io::{Read, Write};

use crate::decode::Decoder;
use crate::ContainerError;

/// A relocated program: opcode bytes interleaved with their operand bytes.
///
/// This is the whole persisted format. There is no header; a program file is
/// exactly the bytes returned by [`Program::as_bytes`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    code: Vec<u8>,
}

impl Program {
    /// Wraps raw program bytes, for example a previously saved program.
    pub fn from_bytes(code: Vec<u8>) -> Self {
        Program { code }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.code
    }

    /// Returns the size of the program in bytes.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Decodes the program instruction by instruction.
    pub fn decode(&self) -> Decoder<'_> {
        Decoder::new(&self.code)
    }

    /// Writes the program bytes to the given writer.
    pub fn write_to(&self, w: &mut impl Write) -> Result<(), ContainerError> {
        w.write_all(&self.code)?;
        Ok(())
    }

    /// Reads a whole program from the given reader.
    pub fn read_from(r: &mut impl Read) -> Result<Self, ContainerError> {
        let mut code = Vec::new();
        r.read_to_end(&mut code)?;
        Ok(Program { code })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn program_write_read_when_bytes_then_identical() {
        let program = Program::from_bytes(vec![0x01, 7, 0, 0, 0, 0, 0, 0, 0, 0x52, 0xFF]);

        let mut buf = Vec::new();
        program.write_to(&mut buf).unwrap();
        let loaded = Program::read_from(&mut Cursor::new(&buf)).unwrap();

        assert_eq!(buf, program.as_bytes());
        assert_eq!(loaded, program);
    }
}
