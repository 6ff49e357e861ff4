//! Instruction set of the machine.
//!
//! Every opcode is one byte and stands for a mnemonic together with the kinds of its
//! operands. [`for_each_opcode!`] holds the one canonical table; the assembler encodes
//! through [`Opcode::select`] and the CPU decodes through [`Opcode::decode`], so both
//! directions are generated from the same rows.
//!
//! # Encoding
//!
//! ```text
//! opcode [operand1] [operand2]
//! ```
//!
//! Each operand is a single byte: a register index, an immediate, or an address.

use std::fmt;

/// Invokes a callback macro with the complete opcode table.
///
/// Rows read `Name = byte, "NAME", Mnemonic => [operand kinds]`.
macro_rules! for_each_opcode {
    ($callback:ident) => {
        $callback! {
            /// HLT ; stop the machine
            Hlt = 0x00, "NONE", Hlt => [],

            // =========================
            // Move
            // =========================
            MovRegToReg = 0x01, "MOV_REG_TO_REG", Mov => [Register, Register],
            MovRegToAddr = 0x02, "MOV_REG_TO_ADDR", Mov => [Address, Register],
            MovRegToRegAddr = 0x03, "MOV_REG_TO_REGADDR", Mov => [RegAddress, Register],
            MovAddrToReg = 0x04, "MOV_ADDR_TO_REG", Mov => [Register, Address],
            MovRegAddrToReg = 0x05, "MOV_REGADDR_TO_REG", Mov => [Register, RegAddress],
            MovNumToReg = 0x06, "MOV_NUM_TO_REG", Mov => [Register, Number],
            MovNumToAddr = 0x07, "MOV_NUM_TO_ADDR", Mov => [Address, Number],
            MovNumToRegAddr = 0x08, "MOV_NUM_TO_REGADDR", Mov => [RegAddress, Number],

            // =========================
            // Arithmetic
            // =========================
            AddRegToReg = 0x09, "ADD_REG_TO_REG", Add => [Register, Register],
            AddAddrToReg = 0x0A, "ADD_ADDR_TO_REG", Add => [Register, Address],
            AddRegAddrToReg = 0x0B, "ADD_REGADDR_TO_REG", Add => [Register, RegAddress],
            AddNumToReg = 0x0C, "ADD_NUM_TO_REG", Add => [Register, Number],
            SubtRegFromReg = 0x0D, "SUBT_REG_FROM_REG", Subt => [Register, Register],
            SubtAddrFromReg = 0x0E, "SUBT_ADDR_FROM_REG", Subt => [Register, Address],
            SubtRegAddrFromReg = 0x0F, "SUBT_REGADDR_FROM_REG", Subt => [Register, RegAddress],
            SubtNumFromReg = 0x10, "SUBT_NUM_FROM_REG", Subt => [Register, Number],
            IncReg = 0x11, "INC_REG", Inc => [Register],
            DecReg = 0x12, "DEC_REG", Dec => [Register],

            // =========================
            // Comparison
            // =========================
            CmpRegToReg = 0x13, "CMP_REG_TO_REG", Cmp => [Register, Register],
            CmpAddrToReg = 0x14, "CMP_ADDR_TO_REG", Cmp => [Register, Address],
            CmpRegAddrToReg = 0x15, "CMP_REGADDR_TO_REG", Cmp => [Register, RegAddress],
            CmpNumToReg = 0x16, "CMP_NUM_TO_REG", Cmp => [Register, Number],

            // =========================
            // Jumps
            // =========================
            JmpAddr = 0x17, "JMP_ADDR", Jmp => [Number],
            JmpRegAddr = 0x18, "JMP_REGADDR", Jmp => [RegAddress],
            JcAddr = 0x19, "JC_ADDR", Jc => [Number],
            JcRegAddr = 0x1A, "JC_REGADDR", Jc => [RegAddress],
            JncAddr = 0x1B, "JNC_ADDR", Jnc => [Number],
            JncRegAddr = 0x1C, "JNC_REGADDR", Jnc => [RegAddress],
            JzAddr = 0x1D, "JZ_ADDR", Jz => [Number],
            JzRegAddr = 0x1E, "JZ_REGADDR", Jz => [RegAddress],
            JnzAddr = 0x1F, "JNZ_ADDR", Jnz => [Number],
            JnzRegAddr = 0x20, "JNZ_REGADDR", Jnz => [RegAddress],
            JaAddr = 0x21, "JA_ADDR", Ja => [Number],
            JaRegAddr = 0x22, "JA_REGADDR", Ja => [RegAddress],
            JnaAddr = 0x23, "JNA_ADDR", Jna => [Number],
            JnaRegAddr = 0x24, "JNA_REGADDR", Jna => [RegAddress],

            // =========================
            // Subroutines
            // =========================
            CallAddr = 0x2F, "CALL_ADDR", Call => [Number],
            CallRegAddr = 0x30, "CALL_REGADDR", Call => [RegAddress],
            Ret = 0x31, "RET", Ret => [],

            // =========================
            // Stack
            // =========================
            PushReg = 0x32, "PUSH_REG", Push => [Register],
            PushAddr = 0x33, "PUSH_ADDR", Push => [Address],
            PushRegAddr = 0x34, "PUSH_REGADDR", Push => [RegAddress],
            PushNum = 0x35, "PUSH_NUM", Push => [Number],
            PopReg = 0x36, "POP_REG", Pop => [Register],

            // =========================
            // Bitwise
            // =========================
            AndRegToReg = 0x37, "AND_REG_TO_REG", And => [Register, Register],
            AndAddrToReg = 0x38, "AND_ADDR_TO_REG", And => [Register, Address],
            AndRegAddrToReg = 0x39, "AND_REGADDR_TO_REG", And => [Register, RegAddress],
            AndNumToReg = 0x3A, "AND_NUM_TO_REG", And => [Register, Number],
            OrRegToReg = 0x3B, "OR_REG_TO_REG", Or => [Register, Register],
            OrAddrToReg = 0x3C, "OR_ADDR_TO_REG", Or => [Register, Address],
            OrRegAddrToReg = 0x3D, "OR_REGADDR_TO_REG", Or => [Register, RegAddress],
            OrNumToReg = 0x3E, "OR_NUM_TO_REG", Or => [Register, Number],
            XorRegToReg = 0x3F, "XOR_REG_TO_REG", Xor => [Register, Register],
            XorAddrToReg = 0x40, "XOR_ADDR_TO_REG", Xor => [Register, Address],
            XorRegAddrToReg = 0x41, "XOR_REGADDR_TO_REG", Xor => [Register, RegAddress],
            XorNumToReg = 0x42, "XOR_NUM_TO_REG", Xor => [Register, Number],
            ShlRegToReg = 0x43, "SHL_REG_TO_REG", Shl => [Register, Register],
            ShlAddrToReg = 0x44, "SHL_ADDR_TO_REG", Shl => [Register, Address],
            ShlRegAddrToReg = 0x45, "SHL_REGADDR_TO_REG", Shl => [Register, RegAddress],
            ShlNumToReg = 0x46, "SHL_NUM_TO_REG", Shl => [Register, Number],
            ShrRegToReg = 0x47, "SHR_REG_TO_REG", Shr => [Register, Register],
            ShrAddrToReg = 0x48, "SHR_ADDR_TO_REG", Shr => [Register, Address],
            ShrRegAddrToReg = 0x49, "SHR_REGADDR_TO_REG", Shr => [Register, RegAddress],
            ShrNumToReg = 0x4A, "SHR_NUM_TO_REG", Shr => [Register, Number],
            NotReg = 0x4B, "NOT_REG", Not => [Register],
        }
    };
}

macro_rules! define_opcodes {
    (@shape) => { (OperandKind::None, OperandKind::None) };
    (@shape $a:ident) => { (OperandKind::$a, OperandKind::None) };
    (@shape $a:ident, $b:ident) => { (OperandKind::$a, OperandKind::$b) };

    (
        $(
            $(#[$doc:meta])*
            $name:ident = $byte:literal, $display:literal, $mnemonic:ident => [
                $( $kind:ident ),* $(,)?
            ]
        ),* $(,)?
    ) => {
        /// One byte operation code selecting both a mnemonic and its operand shape.
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        #[repr(u8)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name = $byte,
            )*
        }

        impl Opcode {
            /// Every opcode, in table order.
            pub const ALL: &'static [Opcode] = &[ $( Opcode::$name, )* ];

            /// Decode a byte fetched from memory. `None` for bytes outside the table.
            pub const fn decode(byte: u8) -> Option<Opcode> {
                match byte {
                    $( $byte => Some(Opcode::$name), )*
                    _ => None,
                }
            }

            pub const fn mnemonic(self) -> Mnemonic {
                match self {
                    $( Opcode::$name => Mnemonic::$mnemonic, )*
                }
            }

            /// Operand kinds, `OperandKind::None` padded.
            pub const fn shape(self) -> (OperandKind, OperandKind) {
                match self {
                    $( Opcode::$name => define_opcodes!(@shape $($kind),*), )*
                }
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $( Opcode::$name => $display, )*
                }
            }
        }
    };
}

for_each_opcode!(define_opcodes);

impl Opcode {
    /// Pick the opcode for a mnemonic applied to operands of the given kinds.
    pub fn select(mnemonic: Mnemonic, first: OperandKind, second: OperandKind) -> Option<Opcode> {
        Opcode::ALL
            .iter()
            .copied()
            .find(|op| op.mnemonic() == mnemonic && op.shape() == (first, second))
    }

    /// All operand shapes a mnemonic can be encoded with.
    pub fn shapes_of(mnemonic: Mnemonic) -> impl Iterator<Item = (OperandKind, OperandKind)> {
        Opcode::ALL
            .iter()
            .filter(move |op| op.mnemonic() == mnemonic)
            .map(|op| op.shape())
    }

    pub fn byte(self) -> u8 {
        self as u8
    }

    /// Encoded length in bytes, opcode included.
    #[cfg(test)]
    pub fn encoded_len(self) -> usize {
        match self.shape() {
            (OperandKind::None, _) => 1,
            (_, OperandKind::None) => 2,
            _ => 3,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of a classified operand.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum OperandKind {
    None,
    Number,
    Char,
    String,
    Address,
    Register,
    RegAddress,
}

impl fmt::Display for OperandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperandKind::None => "nothing",
            OperandKind::Number => "number",
            OperandKind::Char => "char",
            OperandKind::String => "string",
            OperandKind::Address => "address",
            OperandKind::Register => "register",
            OperandKind::RegAddress => "register address",
        };
        f.write_str(name)
    }
}

/// Number of operands an instruction takes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Arity {
    Nullary,
    Unary,
    Binary,
}

impl Arity {
    pub fn is_unary(self) -> bool {
        self == Arity::Unary
    }

    pub fn is_binary(self) -> bool {
        self == Arity::Binary
    }

    pub fn count(self) -> usize {
        match self {
            Arity::Nullary => 0,
            Arity::Unary => 1,
            Arity::Binary => 2,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Mnemonic {
    /// Pseudo instruction declaring raw data bytes. Never encodes an opcode.
    Db,
    Hlt,
    Mov,
    Add,
    Subt,
    Inc,
    Dec,
    Cmp,
    Jmp,
    Jc,
    Jnc,
    Jz,
    Jnz,
    Ja,
    Jna,
    Push,
    Pop,
    Call,
    Ret,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Not,
}

impl Mnemonic {
    /// Lookup by name, ignoring case.
    pub fn parse(name: &str) -> Option<Mnemonic> {
        let mnemonic = match name.to_ascii_uppercase().as_str() {
            "DB" => Mnemonic::Db,
            "HLT" => Mnemonic::Hlt,
            "MOV" => Mnemonic::Mov,
            "ADD" => Mnemonic::Add,
            "SUBT" => Mnemonic::Subt,
            "INC" => Mnemonic::Inc,
            "DEC" => Mnemonic::Dec,
            "CMP" => Mnemonic::Cmp,
            "JMP" => Mnemonic::Jmp,
            "JC" => Mnemonic::Jc,
            "JNC" => Mnemonic::Jnc,
            "JZ" => Mnemonic::Jz,
            "JNZ" => Mnemonic::Jnz,
            "JA" => Mnemonic::Ja,
            "JNA" => Mnemonic::Jna,
            "PUSH" => Mnemonic::Push,
            "POP" => Mnemonic::Pop,
            "CALL" => Mnemonic::Call,
            "RET" => Mnemonic::Ret,
            "AND" => Mnemonic::And,
            "OR" => Mnemonic::Or,
            "XOR" => Mnemonic::Xor,
            "SHL" => Mnemonic::Shl,
            "SHR" => Mnemonic::Shr,
            "NOT" => Mnemonic::Not,
            _ => return None,
        };
        Some(mnemonic)
    }

    pub fn arity(self) -> Arity {
        use Mnemonic::*;
        match self {
            Hlt | Ret => Arity::Nullary,
            Db | Inc | Dec | Jmp | Jc | Jnc | Jz | Jnz | Ja | Jna | Push | Pop | Call | Not => {
                Arity::Unary
            }
            Mov | Add | Subt | Cmp | And | Or | Xor | Shl | Shr => Arity::Binary,
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Mnemonic::*;
        let name = match self {
            Db => "DB",
            Hlt => "HLT",
            Mov => "MOV",
            Add => "ADD",
            Subt => "SUBT",
            Inc => "INC",
            Dec => "DEC",
            Cmp => "CMP",
            Jmp => "JMP",
            Jc => "JC",
            Jnc => "JNC",
            Jz => "JZ",
            Jnz => "JNZ",
            Ja => "JA",
            Jna => "JNA",
            Push => "PUSH",
            Pop => "POP",
            Call => "CALL",
            Ret => "RET",
            And => "AND",
            Or => "OR",
            Xor => "XOR",
            Shl => "SHL",
            Shr => "SHR",
            Not => "NOT",
        };
        f.write_str(name)
    }
}
