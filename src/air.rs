use miette::Result;

use crate::error;
use crate::memory::MEMORY_SIZE;
use crate::operand::Value;
use crate::symbol::{LabelRef, LabelTable};

/// Assembly intermediate representation: the code image as emitted by the first pass,
/// with label references left in place until every label offset is known.
#[derive(Debug, Default)]
pub struct Air {
    slots: Vec<Slot>,
}

/// Single byte of the code image.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Slot {
    Byte(u8),
    Label(LabelRef),
}

impl From<Value> for Slot {
    fn from(value: Value) -> Self {
        match value {
            Value::Byte(byte) => Slot::Byte(byte),
            Value::Label(label) => Slot::Label(label),
        }
    }
}

impl Air {
    pub fn new() -> Self {
        Air { slots: Vec::new() }
    }

    pub fn push(&mut self, slot: Slot) {
        self.slots.push(slot)
    }

    pub fn push_byte(&mut self, byte: u8) {
        self.slots.push(Slot::Byte(byte))
    }

    pub fn extend_bytes(&mut self, bytes: &[u8]) {
        self.slots.extend(bytes.iter().copied().map(Slot::Byte))
    }

    /// Offset of the next slot to be emitted.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear()
    }

    /// Resolve every label slot against `labels` and produce the final image.
    pub fn backpatch(&self, labels: &LabelTable) -> Result<Vec<u8>> {
        if self.slots.len() > MEMORY_SIZE {
            return Err(error::image_too_large(self.slots.len()));
        }
        self.slots
            .iter()
            .map(|slot| match slot {
                Slot::Byte(byte) => Ok(*byte),
                Slot::Label(label) => {
                    let Some(&offset) = labels.get(&label.name) else {
                        return Err(error::asm_undefined_label(label.span, &label.name));
                    };
                    u8::try_from(offset)
                        .map_err(|_| error::asm_label_range(label.span, &label.name, offset))
                }
            })
            .collect()
    }
}
