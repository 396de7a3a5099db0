use std::collections::HashMap;
use std::ops::Range;

use crate::error::Trap;
use crate::options::StringMode;

/// A string known to the VM.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StringEntry {
    /// Bytes that live in the program itself.
    Borrowed { offset: usize, len: usize },
    /// A private copy of the bytes.
    Owned(Vec<u8>),
}

/// Strings pushed by STR, addressed by index.
///
/// Each STR instruction is interned once; executing it again yields the same
/// index.
#[derive(Default)]
pub struct StringTable {
    entries: Vec<StringEntry>,
    by_site: HashMap<usize, u64>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the index of the string the instruction at `site` carries in
    /// `payload`, adding it on first use. `payload` must lie within `code`.
    pub fn intern(
        &mut self,
        site: usize,
        payload: Range<usize>,
        code: &[u8],
        mode: StringMode,
    ) -> u64 {
        if let Some(&index) = self.by_site.get(&site) {
            return index;
        }
        let entry = match mode {
            StringMode::Borrow => StringEntry::Borrowed {
                offset: payload.start,
                len: payload.len(),
            },
            StringMode::Copy => StringEntry::Owned(code[payload].to_vec()),
        };
        let index = self.entries.len() as u64;
        self.entries.push(entry);
        self.by_site.insert(site, index);
        index
    }

    pub fn entry(&self, index: u64) -> Option<&StringEntry> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.entries.get(i))
    }

    /// Returns the bytes of the string at `index`.
    pub fn get<'a>(&'a self, index: u64, code: &'a [u8]) -> Result<&'a [u8], Trap> {
        match self.entry(index) {
            Some(StringEntry::Borrowed { offset, len }) => code
                .get(*offset..*offset + *len)
                .ok_or(Trap::InvalidStringIndex(index)),
            Some(StringEntry::Owned(bytes)) => Ok(bytes.as_slice()),
            None => Err(Trap::InvalidStringIndex(index)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CODE: &[u8] = b"..Fizz..Buzz";

    #[test]
    fn intern_when_borrow_then_points_into_code() {
        let mut strings = StringTable::new();

        let index = strings.intern(0, 2..6, CODE, StringMode::Borrow);

        assert_eq!(
            strings.entry(index),
            Some(&StringEntry::Borrowed { offset: 2, len: 4 })
        );
        assert_eq!(strings.get(index, CODE).unwrap(), b"Fizz");
    }

    #[test]
    fn intern_when_copy_then_owns_bytes() {
        let mut strings = StringTable::new();

        let index = strings.intern(0, 8..12, CODE, StringMode::Copy);

        assert_eq!(strings.get(index, &[]).unwrap(), b"Buzz");
    }

    #[test]
    fn intern_when_same_site_twice_then_same_index() {
        let mut strings = StringTable::new();

        let first = strings.intern(0, 2..6, CODE, StringMode::Borrow);
        let second = strings.intern(0, 2..6, CODE, StringMode::Borrow);
        let other = strings.intern(6, 8..12, CODE, StringMode::Borrow);

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(strings.len(), 2);
    }

    #[test]
    fn get_when_unknown_index_then_invalid_string_index() {
        let strings = StringTable::new();

        assert_eq!(strings.get(3, CODE), Err(Trap::InvalidStringIndex(3)));
    }
}
