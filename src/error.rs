use std::num::ParseIntError;

use miette::{miette, LabeledSpan, Report, Severity};

use crate::isa::{Mnemonic, Opcode, OperandKind};
use crate::symbol::Span;

// Lexer errors

pub fn lex_unexpected_char(span: Span, found: char) -> Report {
    miette!(
        severity = Severity::Error,
        code = "lex::unexpected_char",
        help = "a line is `label: INSTR op1, op2 ; comment`, every part optional",
        labels = vec![LabeledSpan::at(span, "unexpected character")],
        "Encountered an unexpected character {found:?}",
    )
}

pub fn lex_unterminated(span: Span, close: char) -> Report {
    miette!(
        severity = Severity::Error,
        code = "lex::unterminated",
        help = format!("close the operand with a {close:?} on the same line"),
        labels = vec![LabeledSpan::at(span, "unterminated operand")],
        "Encountered an unterminated operand",
    )
}

pub fn lex_empty_literal(span: Span) -> Report {
    miette!(
        severity = Severity::Error,
        code = "lex::empty_literal",
        help = "string and character constants need at least one character",
        labels = vec![LabeledSpan::at(span, "empty literal")],
        "Encountered an empty literal",
    )
}

pub fn lex_missing_operand(span: Span) -> Report {
    miette!(
        severity = Severity::Error,
        code = "lex::unexpected_char",
        help = "remove the trailing comma or add the second operand",
        labels = vec![LabeledSpan::at(span, "expected operand")],
        "Expected an operand after ','",
    )
}

// Operand errors

pub fn operand_bad_number(span: Span, text: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "operand::bad_number",
        help = "numbers are written 200, 200d, 0xC8, $C8, 310o or 11001000b",
        labels = vec![LabeledSpan::at(span, "not a number")],
        "Invalid number format {text:?}",
    )
}

pub fn operand_number_range(span: Span, text: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "operand::number_range",
        help = "values range from 0 to 255; negative numbers are not supported",
        labels = vec![LabeledSpan::at(span, "out-of-range literal")],
        "Number {text} does not fit in a byte",
    )
}

pub fn operand_number_parse(span: Span, text: &str, e: &ParseIntError) -> Report {
    use std::num::IntErrorKind;
    match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => operand_number_range(span, text),
        _ => operand_bad_number(span, text),
    }
}

pub fn operand_char_too_long(span: Span) -> Report {
    miette!(
        severity = Severity::Error,
        code = "operand::char_too_long",
        help = "use a string constant in double quotes for several characters",
        labels = vec![LabeledSpan::at(span, "more than one character")],
        "Character constant too long",
    )
}

pub fn operand_char_range(span: Span, ch: char) -> Report {
    miette!(
        severity = Severity::Error,
        code = "operand::char_range",
        help = "only characters with codes up to 255 fit in a byte",
        labels = vec![LabeledSpan::at(span, "character out of range")],
        "Character {ch:?} does not fit in a byte",
    )
}

pub fn operand_arity(span: Span, name: &str, expected: usize, found: usize) -> Report {
    let name = name.to_ascii_uppercase();
    let plural = if expected == 1 { "" } else { "s" };
    miette!(
        severity = Severity::Error,
        code = "operand::arity",
        help = format!("{name} takes {expected} operand{plural}"),
        labels = vec![LabeledSpan::at(span, "wrong number of operands")],
        "{name} expects {expected} operand{plural}, found {found}",
    )
}

// Assembler errors

pub fn asm_unknown_instruction(span: Span, name: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::unknown_instruction",
        help = "check the list of supported instructions in the documentation",
        labels = vec![LabeledSpan::at(span, "unknown instruction")],
        "Invalid instruction: {name}",
    )
}

pub fn asm_unsupported_operands(
    span: Span,
    mnemonic: Mnemonic,
    first: OperandKind,
    second: OperandKind,
) -> Report {
    let shapes = Opcode::shapes_of(mnemonic)
        .map(|(a, b)| match (a, b) {
            (OperandKind::None, _) => "no operands".to_string(),
            (a, OperandKind::None) => a.to_string(),
            (a, b) => format!("{a}, {b}"),
        })
        .collect::<Vec<_>>()
        .join("; ");
    let found = match (first, second) {
        (OperandKind::None, _) => "none".to_string(),
        (a, OperandKind::None) => a.to_string(),
        (a, b) => format!("{a}, {b}"),
    };
    miette!(
        severity = Severity::Error,
        code = "asm::unsupported_operands",
        help = format!("{mnemonic} accepts: {shapes}"),
        labels = vec![LabeledSpan::at(span, format!("found {found}"))],
        "{mnemonic} does not support these operands",
    )
}

pub fn asm_db_operand(span: Span, found: OperandKind) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::unsupported_operands",
        help = "DB accepts a number, a character or a string",
        labels = vec![LabeledSpan::at(span, format!("found {found}"))],
        "DB does not support these operands",
    )
}

pub fn asm_duplicate_label(span: Span, name: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::duplicate_label",
        help = "labels can only be declared once per program",
        labels = vec![LabeledSpan::at(span, "duplicate label")],
        "Duplicate label: {name}",
    )
}

pub fn asm_reserved_label(span: Span, name: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::reserved_label",
        help = "A, B, C, D and SP name registers and cannot be used as labels",
        labels = vec![LabeledSpan::at(span, "register name")],
        "Label contains keyword: {}",
        name.to_ascii_uppercase(),
    )
}

pub fn asm_undefined_label(span: Span, name: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::undefined_label",
        help = "declare the label with `name:` somewhere in the program",
        labels = vec![LabeledSpan::at(span, "undefined label")],
        "Undefined label: {name}",
    )
}

pub fn asm_label_range(span: Span, name: &str, offset: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::label_range",
        help = "labels must point inside the 256 byte address space",
        labels = vec![LabeledSpan::at(span, format!("resolves to {offset}"))],
        "Label {name} is outside addressable memory",
    )
}

pub fn image_too_large(len: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "asm::too_large",
        help = "programs and their data must fit in 256 bytes",
        "Program is {len} bytes long and does not fit in memory",
    )
}

// Runtime errors

pub fn mem_out_of_range(addr: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "mem::out_of_range",
        help = "valid addresses range from 0 to 255",
        "Memory access violation. Address: {addr}",
    )
}

pub fn cpu_invalid_opcode(opcode: u8, pc: u8) -> Report {
    miette!(
        severity = Severity::Error,
        code = "cpu::invalid_opcode",
        help = "execution ran into data or a corrupted instruction stream",
        "Invalid op code {opcode:#04x} at address {pc:#04x}",
    )
}

pub fn cpu_invalid_register(index: u8, pc: u8) -> Report {
    miette!(
        severity = Severity::Error,
        code = "cpu::invalid_register",
        help = "register operands range from 0 (A) to 4 (SP)",
        "Invalid register index {index} in instruction at address {pc:#04x}",
    )
}

pub fn cpu_stack_overflow(pc: u8) -> Report {
    miette!(
        severity = Severity::Error,
        code = "cpu::stack_overflow",
        help = "the stack grows down from 231 and cannot go below address 0",
        "Stack overflow in instruction at address {pc:#04x}",
    )
}

pub fn cpu_stack_underflow(pc: u8) -> Report {
    miette!(
        severity = Severity::Error,
        code = "cpu::stack_underflow",
        help = "more values were popped than the address space holds",
        "Stack underflow in instruction at address {pc:#04x}",
    )
}

pub fn cpu_pc_overflow() -> Report {
    miette!(
        severity = Severity::Error,
        code = "cpu::pc_overflow",
        help = "the program ran past the end of memory without reaching HLT",
        "Program counter moved past address 0xff",
    )
}

// Machine errors

pub fn machine_no_program() -> Report {
    miette!(
        severity = Severity::Error,
        code = "machine::no_program",
        help = "assemble a program before setting breakpoints",
        "No program is loaded",
    )
}

pub fn machine_no_instruction(line: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "machine::no_instruction_on_line",
        help = "breakpoints can only be placed on lines holding an instruction",
        "Line {} holds no instruction",
        line + 1,
    )
}

/// Stable diagnostic code of a report, or an empty string.
pub fn code(report: &Report) -> String {
    report
        .code()
        .map(|code| code.to_string())
        .unwrap_or_default()
}
