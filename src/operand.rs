//! Classification of operand tokens into typed operands.

use miette::Result;

use crate::error;
use crate::isa::{Arity, OperandKind};
use crate::lexer::Token;
use crate::symbol::{LabelRef, Register, Span, SrcOffset};

/// A byte that may only be known once labels are resolved.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Value {
    Byte(u8),
    Label(LabelRef),
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Operand {
    /// Placeholder for an absent operand.
    None,
    /// Immediate value or label offset.
    Number(Value),
    Char(u8),
    String(Vec<u8>),
    /// Direct memory address.
    Address(Value),
    Register(Register),
    /// Register holding a memory address.
    RegAddress(Register),
}

impl Operand {
    pub fn kind(&self) -> OperandKind {
        match self {
            Operand::None => OperandKind::None,
            Operand::Number(_) => OperandKind::Number,
            Operand::Char(_) => OperandKind::Char,
            Operand::String(_) => OperandKind::String,
            Operand::Address(_) => OperandKind::Address,
            Operand::Register(_) => OperandKind::Register,
            Operand::RegAddress(_) => OperandKind::RegAddress,
        }
    }
}

/// Classify one operand token.
pub fn get_value(text: &str, span: Span) -> Result<Operand> {
    if let Some(inner) = text.strip_prefix('[') {
        let inner = inner.strip_suffix(']').unwrap_or(inner);
        let inner_span = Span::new(SrcOffset(span.offs() + 1), inner.len());
        return Ok(if let Some(reg) = parse_register(inner) {
            Operand::RegAddress(reg)
        } else if is_label(inner) {
            Operand::Address(Value::Label(LabelRef::new(inner, inner_span)))
        } else {
            Operand::Address(Value::Byte(parse_number(inner, inner_span)?))
        });
    }
    if let Some(inner) = text.strip_prefix('"') {
        let inner = inner.strip_suffix('"').unwrap_or(inner);
        return inner
            .chars()
            .map(|c| char_byte(c, span))
            .collect::<Result<Vec<_>>>()
            .map(Operand::String);
    }
    if let Some(inner) = text.strip_prefix('\'') {
        let inner = inner.strip_suffix('\'').unwrap_or(inner);
        let mut chars = inner.chars();
        return match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Operand::Char(char_byte(c, span)?)),
            (Some(_), Some(_)) => Err(error::operand_char_too_long(span)),
            (None, _) => Err(error::lex_empty_literal(span)),
        };
    }

    Ok(if let Some(reg) = parse_register(text) {
        Operand::Register(reg)
    } else if is_label(text) {
        Operand::Number(Value::Label(LabelRef::new(text, span)))
    } else {
        Operand::Number(Value::Byte(parse_number(text, span)?))
    })
}

fn char_byte(c: char, span: Span) -> Result<u8> {
    u8::try_from(u32::from(c)).map_err(|_| error::operand_char_range(span, c))
}

/// Test for `^[A-Za-z]\w*$`.
fn is_label(text: &str) -> bool {
    let mut chars = text.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Case-insensitive register lookup. `None` is not an error.
pub fn parse_register(name: &str) -> Option<Register> {
    Register::parse(name)
}

/// Parse a numeric literal into a byte.
///
/// Recognised forms, tried in order: `0x`/`$` hexadecimal, trailing `b` binary,
/// trailing `o` octal, trailing `d` decimal, plain decimal. Non-prefixed forms may carry a
/// sign, but only values in `0..=255` are accepted.
pub fn parse_number(text: &str, span: Span) -> Result<u8> {
    let (digits, radix) = if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix('$'))
    {
        (hex, 16)
    } else if let Some(bin) = text.strip_suffix(['b', 'B']) {
        (bin, 2)
    } else if let Some(oct) = text.strip_suffix(['o', 'O']) {
        (oct, 8)
    } else if let Some(dec) = text.strip_suffix(['d', 'D']) {
        (dec, 10)
    } else {
        (text, 10)
    };

    let (negative, magnitude) = match digits.as_bytes().first() {
        Some(b'-') => (true, &digits[1..]),
        Some(b'+') => (false, &digits[1..]),
        _ => (false, digits),
    };
    if magnitude.is_empty() || !magnitude.chars().all(|c| c.is_digit(radix)) {
        return Err(error::operand_bad_number(span, text));
    }

    let value = u64::from_str_radix(magnitude, radix)
        .map_err(|e| error::operand_number_parse(span, text, &e))?;
    if negative && value != 0 {
        return Err(error::operand_number_range(span, text));
    }
    u8::try_from(value).map_err(|_| error::operand_number_range(span, text))
}

/// Enforce the arity of an instruction and classify its operands.
///
/// Absent operands come back as [`Operand::None`].
pub fn get_arguments(
    instruction: &Token,
    arity: Arity,
    operand1: Option<&Token>,
    operand2: Option<&Token>,
) -> Result<(Operand, Operand)> {
    let found = usize::from(operand1.is_some()) + usize::from(operand2.is_some());
    let arity_error = || {
        let span = operand2.or(operand1).map_or(instruction.span, |t| t.span);
        error::operand_arity(span, instruction.text, arity.count(), found)
    };

    match (arity, operand1, operand2) {
        (Arity::Nullary, None, None) => Ok((Operand::None, Operand::None)),
        (Arity::Unary, Some(op1), None) => Ok((get_value(op1.text, op1.span)?, Operand::None)),
        (Arity::Binary, Some(op1), Some(op2)) => Ok((
            get_value(op1.text, op1.span)?,
            get_value(op2.text, op2.span)?,
        )),
        _ => Err(arity_error()),
    }
}
