//! Text codec for atoms, values and association lists.
//!
//! The format is a small s-expression dialect:
//!
//! ```text
//! ((PredicateNode "weight") . (FloatValue 0.5 2))((ConceptNode "tag") . (StringValue "x"))
//! ```
//!
//! Every decoder takes a [Cursor] by exclusive reference and leaves it just
//! past the form it consumed, so callers can keep decoding siblings from the
//! same text. Nesting deeper than [MAX_DEPTH] is rejected as malformed.

mod alist;
mod atom;
mod value;

pub use alist::{decode_alist, decode_pairs, encode_alist};
pub use atom::decode_atom;
pub use value::decode_value;

use crate::error::DecodeError;

/// Deepest nesting of atoms, or of values, a decoder accepts.
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone)]
/// Parser state: the source text, the current byte offset into it and the
/// current nesting depth.
pub struct Cursor<'a> {
    text: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Cursor::at(text, 0)
    }

    /// Start at `pos`, which must lie on a char boundary.
    pub fn at(text: &'a str, pos: usize) -> Self {
        Cursor {
            text,
            pos: pos.min(text.len()),
            depth: 0,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The text that was not consumed yet.
    pub fn rest(&self) -> &'a str {
        self.text.get(self.pos..).unwrap_or("")
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn advance(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.text.len());
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if !b.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
    }

    /// Consume `expected` after optional whitespace.
    fn eat(&mut self, expected: u8) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Offset of the next `needle` at or after the cursor.
    fn find(&self, needle: u8) -> Option<usize> {
        self.text.as_bytes()[self.pos..]
            .iter()
            .position(|b| *b == needle)
            .map(|i| self.pos + i)
    }

    /// Run `decode` one nesting level deeper, or return `None` if that would
    /// exceed [MAX_DEPTH].
    fn nested<T>(&mut self, decode: impl FnOnce(&mut Self) -> T) -> Option<T> {
        if self.depth >= MAX_DEPTH {
            return None;
        }

        self.depth += 1;
        let out = decode(self);
        self.depth -= 1;

        Some(out)
    }

    /// Next whitespace or paren delimited token, consumed.
    fn token(&mut self) -> &'a str {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() || b == b'(' || b == b')' {
                break;
            }
            self.pos += 1;
        }

        &self.text[start..self.pos]
    }

    fn float(&mut self) -> Option<f64> {
        let token = self.token();
        if token.is_empty() {
            return None;
        }

        token.parse().ok()
    }

    fn malformed(&self, kind: &'static str, start: usize) -> DecodeError {
        DecodeError::MalformedValue {
            kind,
            text: self.text.get(start..).unwrap_or("").to_string(),
        }
    }
}
