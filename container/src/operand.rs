/// Encoded size of an operand in bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OperandWidth {
    U8 = 1,
    U32 = 4,
    U64 = 8,
}

impl OperandWidth {
    /// Returns the number of bytes an operand of this width occupies.
    pub fn bytes(self) -> usize {
        self as usize
    }

    /// Returns the largest value representable at this width.
    pub fn max_value(self) -> u64 {
        match self {
            OperandWidth::U8 => u8::MAX as u64,
            OperandWidth::U32 => u32::MAX as u64,
            OperandWidth::U64 => u64::MAX,
        }
    }
}

/// A literal operand carried by an instruction. The variant is the width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operand {
    U8(u8),
    U32(u32),
    U64(u64),
}

impl Operand {
    /// Creates an operand of the given width, or `None` if the value does not fit.
    pub fn with_width(width: OperandWidth, value: u64) -> Option<Operand> {
        match width {
            OperandWidth::U8 => u8::try_from(value).ok().map(Operand::U8),
            OperandWidth::U32 => u32::try_from(value).ok().map(Operand::U32),
            OperandWidth::U64 => Some(Operand::U64(value)),
        }
    }

    /// Creates the narrowest operand that holds `value`.
    pub fn fitting(value: u64) -> Operand {
        if let Ok(v) = u8::try_from(value) {
            Operand::U8(v)
        } else if let Ok(v) = u32::try_from(value) {
            Operand::U32(v)
        } else {
            Operand::U64(value)
        }
    }

    pub fn width(&self) -> OperandWidth {
        match self {
            Operand::U8(_) => OperandWidth::U8,
            Operand::U32(_) => OperandWidth::U32,
            Operand::U64(_) => OperandWidth::U64,
        }
    }

    /// Returns the value zero-extended to 64 bits.
    pub fn value(&self) -> u64 {
        match *self {
            Operand::U8(v) => v as u64,
            Operand::U32(v) => v as u64,
            Operand::U64(v) => v,
        }
    }

    /// Appends the little-endian encoding of this operand.
    pub fn write_le(&self, out: &mut Vec<u8>) {
        match *self {
            Operand::U8(v) => out.push(v),
            Operand::U32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Operand::U64(v) => out.extend_from_slice(&v.to_le_bytes()),
        }
    }

    /// Decodes an operand of the given width from the start of `bytes`.
    pub fn read_le(width: OperandWidth, bytes: &[u8]) -> Option<Operand> {
        let raw = bytes.get(..width.bytes())?;
        let operand = match width {
            OperandWidth::U8 => Operand::U8(raw[0]),
            OperandWidth::U32 => Operand::U32(u32::from_le_bytes(raw.try_into().ok()?)),
            OperandWidth::U64 => Operand::U64(u64::from_le_bytes(raw.try_into().ok()?)),
        };
        Some(operand)
    }
}
