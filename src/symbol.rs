use std::fmt;
use std::ops::Range;

use fxhash::FxBuildHasher;
use indexmap::IndexMap;
use miette::SourceSpan;

pub type FxMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Label name -> byte offset in the code image, in declaration order.
pub type LabelTable = FxMap<String, usize>;

/// Code image offset of an instruction's first byte -> 0-based source line.
pub type LineMapping = FxMap<usize, usize>;

pub(crate) fn new_map<K, V>() -> FxMap<K, V> {
    IndexMap::with_hasher(FxBuildHasher::default())
}

/// Location within source
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Span {
    offs: SrcOffset,
    len: usize,
}

impl Span {
    pub fn new(offs: SrcOffset, len: usize) -> Self {
        Span { offs, len }
    }

    pub fn dummy() -> Self {
        Span {
            offs: SrcOffset(0),
            len: 0,
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.offs.0..self.offs.0 + self.len
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn offs(&self) -> usize {
        self.offs.0
    }

    #[cfg(test)]
    pub fn end(&self) -> usize {
        self.offs.0 + self.len
    }
}

impl From<Span> for SourceSpan {
    fn from(value: Span) -> Self {
        SourceSpan::new(value.offs().into(), value.len())
    }
}

impl From<Span> for Range<usize> {
    fn from(value: Span) -> Self {
        value.range()
    }
}

/// Used to refer to offsets from the start of a source file.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct SrcOffset(pub usize);

/// Registers that can be named in assembly.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Register {
    A = 0,
    B,
    C,
    D,
    /// Stack pointer. Only addressable by name, it is not one of the four general registers.
    SP,
}

impl Register {
    /// Case-insensitive lookup. `None` means "not a register", which callers use to
    /// disambiguate between registers, labels and literals.
    pub fn parse(name: &str) -> Option<Register> {
        match name.to_ascii_uppercase().as_str() {
            "A" => Some(Register::A),
            "B" => Some(Register::B),
            "C" => Some(Register::C),
            "D" => Some(Register::D),
            "SP" => Some(Register::SP),
            _ => None,
        }
    }

    pub fn from_index(index: u8) -> Option<Register> {
        match index {
            0 => Some(Register::A),
            1 => Some(Register::B),
            2 => Some(Register::C),
            3 => Some(Register::D),
            4 => Some(Register::SP),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Register::A => "A",
            Register::B => "B",
            Register::C => "C",
            Register::D => "D",
            Register::SP => "SP",
        };
        f.write_str(name)
    }
}

/// Reference to a label that is resolved during backpatching.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LabelRef {
    pub name: String,
    pub span: Span,
}

impl LabelRef {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        LabelRef {
            name: name.into(),
            span,
        }
    }
}
