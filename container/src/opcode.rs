//! Bytecode opcode definitions shared between the builder, the assembler and
//! the VM.
//!
//! Each opcode is one byte in the relocated program. Operands, when present,
//! follow the opcode byte immediately and are little-endian.

use crate::operand::OperandWidth;

macro_rules! opcodes {
    ($( $(#[$doc:meta])* $variant:ident = $code:literal, $name:literal; )*) => {
        /// Operation tag of a single instruction.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum Opcode {
            $( $(#[$doc])* $variant = $code, )*
        }

        impl Opcode {
            /// Every opcode, in encoding order.
            pub const ALL: &'static [Opcode] = &[$(Opcode::$variant,)*];

            /// Returns the mnemonic used by the assembler and disassembler.
            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $name,)*
                }
            }

            /// Decodes an opcode byte.
            pub fn from_u8(byte: u8) -> Option<Opcode> {
                match byte {
                    $($code => Some(Opcode::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

opcodes! {
    /// Does nothing.
    Nop = 0x00, "NOP";
    /// Pushes a 64-bit literal. Operand: u64 (may be a relocated label address).
    Push = 0x01, "PSH";
    /// Pushes a zero-extended 32-bit literal. Operand: u32.
    Push4 = 0x02, "PS4";
    /// Pushes a zero-extended 8-bit literal. Operand: u8.
    Push8 = 0x03, "PS8";
    /// Interns a string literal and pushes its string table index.
    /// Payload: u64 length followed by that many raw bytes.
    Str = 0x04, "STR";

    /// Drops the top cell.
    Drop = 0x10, "DRP";
    /// Duplicates the top cell.
    Dup = 0x11, "DUP";
    /// Swaps the top two cells.
    Swap = 0x12, "SWP";
    /// Brings the third cell from the top to the top: `[c b a] -> [b a c]`.
    Rot = 0x13, "ROT";
    /// Copies the second cell from the top onto the top: `[b a] -> [b a b]`.
    Over = 0x14, "OVR";
    /// Drops `n` cells. Operand: u64 n.
    DropN = 0x15, "DRPZ";
    /// Pushes a copy of `n` cells that start `offset` cells below the top.
    /// Operands: u64 offset, u64 n.
    DupN = 0x16, "DUPZ";
    /// Swaps the top two groups of `n` cells. Operand: u64 n.
    SwapN = 0x17, "SWPZ";

    /// Pops a then b, pushes `b + a` (wrapping).
    Add = 0x20, "ADD";
    /// Pops a then b, pushes `b - a` (wrapping).
    Sub = 0x21, "SUB";
    /// Pops a then b, pushes `b * a` (wrapping).
    Mul = 0x22, "MUL";
    /// Pops a then b, pushes `b / a`. Traps when a is zero.
    Div = 0x23, "DIV";
    /// Pops a then b, pushes `b % a`. Traps when a is zero.
    Mod = 0x24, "MOD";
    /// Increments the top cell (wrapping).
    Inc = 0x25, "INC";
    /// Decrements the top cell (wrapping).
    Dec = 0x26, "DEC";

    /// Pops a then b, pushes 1 if `b == a`, else 0.
    Eq = 0x30, "EQU";
    /// Pops a then b, pushes 1 if `b < a`, else 0.
    Lt = 0x31, "LT";
    /// Pops a then b, pushes 1 if `b > a`, else 0.
    Gt = 0x32, "GT";
    /// Pops a, pushes 1 if a is zero, else 0.
    Not = 0x33, "NOT";
    /// Pops a then b, pushes 1 if either is non-zero, else 0.
    Or = 0x34, "OR";

    /// Pops a target address and jumps to it.
    Jmp = 0x40, "JMP";
    /// Pops a target address then a condition; jumps if the condition is non-zero.
    JmpIfTrue = 0x41, "JPT";
    /// Pops a target address then a condition; jumps if the condition is zero.
    JmpIfFalse = 0x42, "JPF";
    /// Pops a target address, pushes a call frame and jumps to the target.
    Call = 0x43, "CLL";
    /// Pops the current call frame and resumes at its return site.
    Ret = 0x44, "RET";
    /// Pops `n` and adopts the caller's top `n` cells into the current frame.
    TakeArgs = 0x45, "TKS";

    /// Pops a string table index and writes the string bytes.
    PrintStr = 0x50, "PTS";
    /// Pops a cell and writes its low byte.
    PrintChar = 0x51, "PTC";
    /// Pops a cell and writes it in decimal.
    Debug = 0x52, "DBG";

    /// Register load. Reserved, not implemented by the VM.
    Load = 0x60, "LDR";
    /// Raw 64-bit dereference. Reserved, not implemented by the VM.
    Deref = 0x61, "REF";
    /// Raw 8-bit dereference. Reserved, not implemented by the VM.
    Deref8 = 0x62, "RF8";

    /// Dumps the operand stack and the call stack.
    Breakpoint = 0xFE, "BKP";
    /// Ends execution by moving the program counter to the end of the program.
    Exit = 0xFF, "EXT";
}

impl Opcode {
    /// Looks up an opcode by mnemonic, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Opcode> {
        Opcode::ALL
            .iter()
            .copied()
            .find(|op| op.name().eq_ignore_ascii_case(name))
    }

    /// Returns the fixed operands that follow the opcode byte.
    ///
    /// The string instruction is not described here; see [`Opcode::has_payload`].
    pub fn operand_widths(self) -> &'static [OperandWidth] {
        match self {
            Opcode::Push | Opcode::DropN | Opcode::SwapN => &[OperandWidth::U64],
            Opcode::Push4 => &[OperandWidth::U32],
            Opcode::Push8 => &[OperandWidth::U8],
            Opcode::DupN => &[OperandWidth::U64, OperandWidth::U64],
            _ => &[],
        }
    }

    /// True for the string instruction, whose u64 length operand is followed
    /// by a variable-length byte payload.
    pub fn has_payload(self) -> bool {
        self == Opcode::Str
    }

    /// False for opcodes the VM recognizes but does not execute.
    pub fn is_implemented(self) -> bool {
        !matches!(self, Opcode::Load | Opcode::Deref | Opcode::Deref8)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
