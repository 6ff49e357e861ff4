// Assembling
pub mod air;
pub mod assembler;
pub use assembler::{assemble, Assembler, Assembly};
pub mod isa;
pub mod lexer;
pub mod operand;

// Running
pub mod alu;
pub mod cpu;
pub use cpu::{Cpu, Flags};
pub mod memory;
pub use memory::Memory;
pub mod runtime;
pub use runtime::{Machine, Stop};

pub mod symbol;
pub use symbol::Register;

pub mod error;

pub mod env;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 4;
