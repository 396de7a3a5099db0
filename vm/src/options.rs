/// How STR instructions store their bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StringMode {
    /// Refer to the bytes inside the program.
    #[default]
    Borrow,
    /// Keep a private copy of the bytes.
    Copy,
}

/// Limits and behavior of a VM instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VmOptions {
    /// Maximum number of cells on the operand stack.
    pub max_stack_depth: usize,
    /// Maximum number of call frames, including the top-level frame.
    pub max_call_depth: usize,
    pub string_mode: StringMode,
}

impl VmOptions {
    /// 2 MiB of 8-byte cells.
    pub const DEFAULT_MAX_STACK_DEPTH: usize = 262_144;
    pub const DEFAULT_MAX_CALL_DEPTH: usize = 10_240;
}

impl Default for VmOptions {
    fn default() -> Self {
        VmOptions {
            max_stack_depth: Self::DEFAULT_MAX_STACK_DEPTH,
            max_call_depth: Self::DEFAULT_MAX_CALL_DEPTH,
            string_mode: StringMode::Borrow,
        }
    }
}
