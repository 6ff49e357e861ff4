//! Two pass assembler.
//!
//! The first pass lexes every line, registers labels at the current image offset and
//! emits opcodes and operand slots into an [`Air`]. Label references are left as slots
//! until the second pass, [`Air::backpatch`], replaces them with their offsets. Forward
//! references are therefore legal anywhere an operand may name a label.

use miette::Result;
use tracing::debug;

use crate::air::{Air, Slot};
use crate::error;
use crate::isa::{Mnemonic, Opcode};
use crate::lexer::{self, Line, Token};
use crate::operand::{self, Operand};
use crate::symbol::{new_map, LabelTable, LineMapping, Register};

/// Output of a successful assembly.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Assembly {
    /// Image to be loaded at address 0.
    pub code: Vec<u8>,
    pub labels: LabelTable,
    /// Image offset of each instruction -> 0-based source line.
    pub mapping: LineMapping,
}

#[derive(Debug)]
pub struct Assembler {
    air: Air,
    labels: LabelTable,
    mapping: LineMapping,
}

impl Assembler {
    pub fn new() -> Self {
        Assembler {
            air: Air::new(),
            labels: new_map(),
            mapping: new_map(),
        }
    }

    /// Drop all state from a previous assembly.
    pub fn reset(&mut self) {
        self.air.clear();
        self.labels.clear();
        self.mapping.clear();
    }

    /// Assemble a complete program. Stops at the first error, which is returned with the
    /// program text attached for rendering.
    pub fn assemble(&mut self, src: &str) -> Result<Assembly> {
        self.reset();
        let code = self
            .first_pass(src)
            .and_then(|()| self.air.backpatch(&self.labels))
            .map_err(|e| e.with_source_code(src.to_string()))?;

        debug!(
            bytes = code.len(),
            labels = self.labels.len(),
            instructions = self.mapping.len(),
            "assembled program"
        );
        Ok(Assembly {
            code,
            labels: self.labels.clone(),
            mapping: self.mapping.clone(),
        })
    }

    fn first_pass(&mut self, src: &str) -> Result<()> {
        for (index, offset, text) in lexer::lines(src) {
            let line = lexer::lex_line(text, offset)?;
            self.assemble_line(index, &line)?;
        }
        Ok(())
    }

    fn assemble_line(&mut self, index: usize, line: &Line) -> Result<()> {
        if let Some(label) = &line.label {
            self.declare_label(label)?;
        }
        let Some(instr) = &line.instruction else {
            return Ok(());
        };

        let mnemonic = Mnemonic::parse(instr.text)
            .ok_or_else(|| error::asm_unknown_instruction(instr.span, instr.text))?;
        let (first, second) = operand::get_arguments(
            instr,
            mnemonic.arity(),
            line.operand1.as_ref(),
            line.operand2.as_ref(),
        )?;
        self.mapping.insert(self.air.len(), index);

        if mnemonic == Mnemonic::Db {
            return self.emit_data(line.operand1.as_ref().unwrap_or(instr), first);
        }

        let opcode = Opcode::select(mnemonic, first.kind(), second.kind()).ok_or_else(|| {
            error::asm_unsupported_operands(instr.span, mnemonic, first.kind(), second.kind())
        })?;
        self.air.push_byte(opcode.byte());
        self.emit_operand(first);
        self.emit_operand(second);
        Ok(())
    }

    fn declare_label(&mut self, label: &Token) -> Result<()> {
        if Register::parse(label.text).is_some() {
            return Err(error::asm_reserved_label(label.span, label.text));
        }
        if self.labels.contains_key(label.text) {
            return Err(error::asm_duplicate_label(label.span, label.text));
        }
        self.labels.insert(label.text.to_string(), self.air.len());
        Ok(())
    }

    /// `DB` emits raw bytes and no opcode.
    fn emit_data(&mut self, token: &Token, operand: Operand) -> Result<()> {
        match operand {
            Operand::Number(value) => self.air.push(value.into()),
            Operand::Char(byte) => self.air.push_byte(byte),
            Operand::String(bytes) => self.air.extend_bytes(&bytes),
            other => return Err(error::asm_db_operand(token.span, other.kind())),
        }
        Ok(())
    }

    fn emit_operand(&mut self, operand: Operand) {
        let slot = match operand {
            Operand::None => return,
            Operand::Number(value) | Operand::Address(value) => value.into(),
            Operand::Register(reg) | Operand::RegAddress(reg) => Slot::Byte(reg.index()),
            Operand::Char(byte) => Slot::Byte(byte),
            Operand::String(bytes) => {
                self.air.extend_bytes(&bytes);
                return;
            }
        };
        self.air.push(slot);
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Assembler::new()
    }
}

/// Assemble `src` with a fresh [`Assembler`].
pub fn assemble(src: &str) -> Result<Assembly> {
    Assembler::new().assemble(src)
}
