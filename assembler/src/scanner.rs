//! Byte cursor over assembler source.

use crate::error::{AssembleError, Location};

pub(crate) struct Scanner<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Scanner { source, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    pub fn peek(&self) -> Option<u8> {
        self.source.as_bytes().get(self.pos).copied()
    }

    /// Returns the character at the cursor, for error reporting.
    pub fn peek_char(&self) -> Option<char> {
        self.source.get(self.pos..).and_then(|rest| rest.chars().next())
    }

    pub fn bump(&mut self) {
        self.pos += 1;
    }

    /// Skips whitespace and comments.
    pub fn skip_spaces(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_ascii_whitespace() {
                self.bump();
            } else if c == b'#' {
                self.skip_comment();
            } else {
                break;
            }
        }
    }

    /// Skips from `#` up to, not including, the end of the line.
    pub fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == b'\n' {
                break;
            }
            self.bump();
        }
    }

    /// Reads a token up to whitespace, a comment or a `:`.
    pub fn read_word(&mut self) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_whitespace() || c == b'#' || c == b':' {
                break;
            }
            self.bump();
        }
        &self.source[start..self.pos]
    }

    /// Reads a decimal or `0x` hexadecimal integer token.
    pub fn read_number(&mut self) -> Result<u64, AssembleError> {
        let at = self.location(self.pos);
        let literal = self.read_word();
        let parsed = match literal
            .strip_prefix("0x")
            .or_else(|| literal.strip_prefix("0X"))
        {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => literal.parse::<u64>(),
        };
        parsed.map_err(|_| AssembleError::InvalidNumber {
            literal: literal.to_owned(),
            at,
        })
    }

    /// Reads a `"`-delimited string literal and returns its bytes.
    ///
    /// `\n` and `\r` are translated; any other escaped byte stands for itself.
    pub fn read_string_literal(&mut self) -> Result<Vec<u8>, AssembleError> {
        let start = self.location(self.pos);
        match self.peek() {
            Some(b'"') => self.bump(),
            Some(_) => {
                return Err(AssembleError::ExpectedString {
                    found: self.peek_char().unwrap_or('\u{FFFD}'),
                    at: start,
                })
            }
            None => return Err(AssembleError::UnterminatedString { at: start }),
        }

        let mut bytes = Vec::new();
        loop {
            let c = self
                .peek()
                .ok_or(AssembleError::UnterminatedString { at: start })?;
            self.bump();
            match c {
                b'"' => return Ok(bytes),
                b'\\' => {
                    let escaped = self
                        .peek()
                        .ok_or(AssembleError::UnterminatedString { at: start })?;
                    self.bump();
                    bytes.push(match escaped {
                        b'n' => b'\n',
                        b'r' => b'\r',
                        other => other,
                    });
                }
                other => bytes.push(other),
            }
        }
    }

    /// Converts a byte offset into a line and column.
    pub fn location(&self, offset: usize) -> Location {
        let before = self.source.get(..offset).unwrap_or(self.source);
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        Location {
            offset,
            line: before.matches('\n').count() + 1,
            column: before[line_start..].chars().count() + 1,
        }
    }
}
