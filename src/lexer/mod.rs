//! Splits a line of assembly into its five optional fields.
//!
//! ```text
//! label:  MNEMONIC  operand1, operand2  ; comment
//! ```
//!
//! Operands are one of: a bare word (register, number or label, optionally prefixed with
//! `$`, `+` or `-`), a bracketed indirect form `[...]`, a `"string"` or a `'c'`haracter.

use miette::Result;

use crate::error;
use crate::lexer::cursor::Cursor;
use crate::symbol::Span;

pub mod cursor;

/// Slice of source text with its absolute location.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Token<'a> {
    pub text: &'a str,
    pub span: Span,
}

/// The fields recognised on one source line. Every field is optional.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Line<'a> {
    pub label: Option<Token<'a>>,
    pub instruction: Option<Token<'a>>,
    pub operand1: Option<Token<'a>>,
    pub operand2: Option<Token<'a>>,
    pub comment: Option<Token<'a>>,
}

impl Line<'_> {
    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.instruction.is_none()
    }
}

/// Lex a single line on its own, with spans relative to the line.
pub fn interpret_line(line: &str) -> Result<Line<'_>> {
    lex_line(line, 0)
}

/// Iterate over `(index, offset, text)` for every line of a program. `offset` is the
/// byte offset of the line inside `src`; trailing carriage returns are stripped.
pub fn lines(src: &str) -> impl Iterator<Item = (usize, usize, &str)> + '_ {
    let mut offset = 0;
    src.split('\n').enumerate().map(move |(index, text)| {
        let start = offset;
        offset += text.len() + 1;
        (index, start, text.strip_suffix('\r').unwrap_or(text))
    })
}

/// Lex one line located at `base` inside the whole program.
pub fn lex_line(line: &str, base: usize) -> Result<Line<'_>> {
    let mut cur = Cursor::new(line, base);
    let mut out = Line::default();

    cur.skip_whitespace();
    if cur.first().is_ascii_alphabetic() {
        let start = cur.pos();
        cur.take_while(is_word);
        let word = cur.token_from(start);
        if cur.first() == ':' {
            cur.bump();
            out.label = Some(word);
            cur.skip_whitespace();
            if cur.first().is_ascii_alphabetic() {
                let start = cur.pos();
                cur.take_while(is_word);
                out.instruction = Some(cur.token_from(start));
            }
        } else {
            out.instruction = Some(word);
        }
    }

    if out.instruction.is_some() {
        cur.skip_whitespace();
        if !matches!(cur.first(), ';' | ',') && !cur.is_eof() {
            out.operand1 = Some(cur.lex_operand()?);
            cur.skip_whitespace();
            if cur.first() == ',' {
                let comma = cur.pos();
                cur.bump();
                cur.skip_whitespace();
                if matches!(cur.first(), ';') || cur.is_eof() {
                    return Err(error::lex_missing_operand(cur.span_at(comma, 1)));
                }
                out.operand2 = Some(cur.lex_operand()?);
            }
        }
    }

    cur.skip_whitespace();
    match cur.first() {
        ';' => {
            let start = cur.pos();
            cur.take_while(|_| true);
            out.comment = Some(cur.token_from(start));
        }
        _ if cur.is_eof() => {}
        c => return Err(error::lex_unexpected_char(cur.span_at(cur.pos(), c.len_utf8()), c)),
    }

    Ok(out)
}

/// Test if a character may continue a word.
pub(crate) fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl<'a> Cursor<'a> {
    fn skip_whitespace(&mut self) {
        self.take_while(|c| c.is_whitespace());
    }

    fn token_from(&self, start: usize) -> Token<'a> {
        Token {
            text: self.slice_from(start),
            span: self.span_from(start),
        }
    }

    fn lex_operand(&mut self) -> Result<Token<'a>> {
        let start = self.pos();
        match self.first() {
            '[' => self.lex_delimited(start, ']')?,
            quote @ ('"' | '\'') => {
                self.lex_delimited(start, quote)?;
                if self.pos() - start == 2 {
                    return Err(error::lex_empty_literal(self.span_from(start)));
                }
            }
            '$' | '+' | '-' => {
                self.bump();
                self.take_while(is_word);
            }
            c if is_word(c) => self.take_while(is_word),
            c => return Err(error::lex_unexpected_char(self.span_at(start, c.len_utf8()), c)),
        }
        Ok(self.token_from(start))
    }

    /// Consume an opening delimiter and everything up to and including `close`.
    fn lex_delimited(&mut self, start: usize, close: char) -> Result<()> {
        self.bump();
        self.take_while(|c| c != close);
        if self.bump() != Some(close) {
            return Err(error::lex_unterminated(self.span_from(start), close));
        }
        Ok(())
    }
}
