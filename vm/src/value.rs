use std::fmt;

/// A 64-bit operand stack cell.
///
/// Numbers, booleans, code addresses and string table indices all occupy
/// one cell. Booleans are 0 or 1; any non-zero cell counts as true.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Slot(u64);

impl Slot {
    pub fn new(value: u64) -> Self {
        Slot(value)
    }

    pub fn from_bool(value: bool) -> Self {
        Slot(value as u64)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn is_true(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
