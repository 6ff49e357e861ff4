// Heavily inspired and referenced from `rustc_lexer` and adapted to suit the project.
// See https://doc.rust-lang.org/beta/nightly-rustc/src/rustc_lexer/cursor.rs.html

use std::str::Chars;

use crate::symbol::{Span, SrcOffset};

/// Peekable iterator over the chars of one source line.
pub struct Cursor<'a> {
    /// The line being lexed
    input: &'a str,
    /// Offset of the line inside the whole program
    base: usize,
    /// Iterator over chars in a &str
    chars: Chars<'a>,
}

pub(crate) const EOF_CHAR: char = '\0';

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str, base: usize) -> Cursor<'a> {
        Cursor {
            input,
            base,
            chars: input.chars(),
        }
    }

    /// Peek the next char without consuming it, `EOF_CHAR` at the end of the line.
    pub fn first(&self) -> char {
        self.chars.clone().next().unwrap_or(EOF_CHAR)
    }

    pub fn is_eof(&self) -> bool {
        self.chars.as_str().is_empty()
    }

    pub fn bump(&mut self) -> Option<char> {
        self.chars.next()
    }

    pub fn take_while(&mut self, mut predicate: impl FnMut(char) -> bool) {
        while predicate(self.first()) && !self.is_eof() {
            self.bump();
        }
    }

    /// Position within the line
    pub fn pos(&self) -> usize {
        self.input.len() - self.chars.as_str().len()
    }

    /// Rest of the line starting at the current position
    #[cfg(test)]
    pub fn rest(&self) -> &'a str {
        self.chars.as_str()
    }

    /// Slice of the line between `start` and the current position
    pub fn slice_from(&self, start: usize) -> &'a str {
        &self.input[start..self.pos()]
    }

    /// Span relative to the whole program
    pub fn span_from(&self, start: usize) -> Span {
        Span::new(SrcOffset(self.base + start), self.pos() - start)
    }

    pub fn span_at(&self, start: usize, len: usize) -> Span {
        Span::new(SrcOffset(self.base + start), len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_chars() {
        let mut cur = Cursor::new("ab c", 10);
        assert_eq!(cur.first(), 'a');
        cur.take_while(|c| c.is_ascii_alphabetic());
        assert_eq!(cur.pos(), 2);
        assert_eq!(cur.slice_from(0), "ab");
        assert_eq!(cur.span_from(0).range(), 10..12);
        assert_eq!(cur.rest(), " c");
        cur.bump();
        cur.bump();
        assert!(cur.is_eof());
        assert_eq!(cur.first(), EOF_CHAR);
    }
}
