//! Fetch/execute engine.
//!
//! Every memory access goes through MAR and MBR so both registers reflect the last
//! transfer after each step. The helpers below still return the transferred byte so
//! instructions read as a sequence of explicit steps.

use miette::{Report, Result};
use tracing::trace;

use crate::alu::{self, AluOperation, AluResult};
use crate::error;
use crate::isa::{Mnemonic, Opcode, OperandKind};
use crate::memory::Memory;
use crate::symbol::Register;

/// Initial stack pointer. The stack grows down from here.
pub const STACK_TOP: u8 = 231;

/// Condition flags. `carry` is never set by any instruction.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Flags {
    pub zero: bool,
    pub carry: bool,
    pub overflow: bool,
    pub negative: bool,
}

/// Register file and memory of the machine.
#[derive(Debug)]
pub struct Cpu {
    pc: u8,
    sp: u8,
    mar: u8,
    mbr: u8,
    ir: u8,
    gpr: [u8; 4],
    flags: Flags,
    halt: bool,
    /// Address of the instruction being executed
    start: u8,
    memory: Memory,
}

impl Cpu {
    pub fn new(memory: Memory) -> Self {
        Cpu {
            pc: 0,
            sp: STACK_TOP,
            mar: 0,
            mbr: 0,
            ir: 0,
            gpr: [0; 4],
            flags: Flags::default(),
            halt: false,
            start: 0,
            memory,
        }
    }

    /// Reset every register. Memory is left untouched.
    pub fn reset(&mut self) {
        self.pc = 0;
        self.sp = STACK_TOP;
        self.mar = 0;
        self.mbr = 0;
        self.ir = 0;
        self.gpr = [0; 4];
        self.flags = Flags::default();
        self.halt = false;
        self.start = 0;
    }

    /// MAR ← PC, MBR ← M[MAR], IR ← MBR. PC is not advanced.
    pub fn fetch(&mut self) -> Result<()> {
        self.start = self.pc;
        self.ir = self.fetch_memory(self.pc)?;
        Ok(())
    }

    /// Execute the instruction in IR. Returns `false` once the machine halts.
    pub fn execute(&mut self) -> Result<bool> {
        let opcode = Opcode::decode(self.ir).ok_or_else(|| self.malformed())?;
        trace!(pc = self.start, sp = self.sp, %opcode, "execute");

        let (first, second) = opcode.shape();
        match opcode.mnemonic() {
            Mnemonic::Hlt => {
                self.halt = true;
                return Ok(false);
            }
            Mnemonic::Mov => self.mov(first, second)?,
            Mnemonic::Add => self.binary(alu::add, second, true)?,
            Mnemonic::Subt => self.binary(alu::sub, second, true)?,
            Mnemonic::Cmp => self.binary(alu::sub, second, false)?,
            Mnemonic::And => self.binary(alu::and, second, true)?,
            Mnemonic::Or => self.binary(alu::or, second, true)?,
            Mnemonic::Xor => self.binary(alu::xor, second, true)?,
            Mnemonic::Shl => self.binary(alu::shl, second, true)?,
            Mnemonic::Shr => self.binary(alu::shr, second, true)?,
            Mnemonic::Inc => self.unary(|value| alu::add(value, 1))?,
            Mnemonic::Dec => self.unary(|value| alu::sub(value, 1))?,
            Mnemonic::Not => self.unary(alu::not)?,
            Mnemonic::Jmp => self.jump(true, first)?,
            Mnemonic::Jc => self.jump(self.flags.carry, first)?,
            Mnemonic::Jnc => self.jump(!self.flags.carry, first)?,
            Mnemonic::Jz => self.jump(self.flags.zero, first)?,
            Mnemonic::Jnz => self.jump(!self.flags.zero, first)?,
            Mnemonic::Ja => self.jump(!self.flags.carry && !self.flags.zero, first)?,
            Mnemonic::Jna => self.jump(self.flags.carry && self.flags.zero, first)?,
            Mnemonic::Call => self.call(first)?,
            Mnemonic::Ret => self.pc = self.pop()?,
            Mnemonic::Push => self.push_operand(first)?,
            Mnemonic::Pop => self.pop_register()?,
            Mnemonic::Db => return Err(self.malformed()),
        }
        Ok(true)
    }

    pub fn pc(&self) -> u8 {
        self.pc
    }

    pub fn sp(&self) -> u8 {
        self.sp
    }

    pub fn mar(&self) -> u8 {
        self.mar
    }

    pub fn mbr(&self) -> u8 {
        self.mbr
    }

    pub fn ir(&self) -> u8 {
        self.ir
    }

    pub fn gpr(&self) -> &[u8; 4] {
        &self.gpr
    }

    pub fn reg(&self, reg: Register) -> u8 {
        match reg {
            Register::SP => self.sp,
            other => self.gpr[usize::from(other.index())],
        }
    }

    pub fn set_reg(&mut self, reg: Register, value: u8) {
        match reg {
            Register::SP => self.sp = value,
            other => self.gpr[usize::from(other.index())] = value,
        }
    }

    pub fn set_pc(&mut self, pc: u8) {
        self.pc = pc;
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn is_halted(&self) -> bool {
        self.halt
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    // Instructions

    fn mov(&mut self, dest: OperandKind, src: OperandKind) -> Result<()> {
        let target = self.fetch_operand()?;
        let value = self.fetch_source(src)?;
        match dest {
            OperandKind::Register => self.write_register(target, value)?,
            OperandKind::Address => self.store(target, value)?,
            OperandKind::RegAddress => {
                let addr = self.read_register(target)?;
                self.store(addr, value)?
            }
            _ => return Err(self.malformed()),
        }
        self.advance()
    }

    /// Apply `op` to a register and a source operand. The result is written back unless
    /// only the flags are wanted.
    fn binary(&mut self, op: AluOperation, src: OperandKind, write_back: bool) -> Result<()> {
        let reg = self.fetch_operand()?;
        let value = self.fetch_source(src)?;
        let res = op(self.read_register(reg)?, value);
        self.set_flags(res);
        if write_back {
            self.write_register(reg, res.sum)?;
        }
        self.advance()
    }

    fn unary(&mut self, op: impl Fn(u8) -> AluResult) -> Result<()> {
        let reg = self.fetch_operand()?;
        let res = op(self.read_register(reg)?);
        self.set_flags(res);
        self.write_register(reg, res.sum)?;
        self.advance()
    }

    /// A jump that is not taken still moves past its operand.
    fn jump(&mut self, taken: bool, kind: OperandKind) -> Result<()> {
        let target = self.fetch_target(kind)?;
        if taken {
            self.pc = target;
            Ok(())
        } else {
            self.advance()
        }
    }

    fn call(&mut self, kind: OperandKind) -> Result<()> {
        let target = self.fetch_target(kind)?;
        self.advance()?;
        self.push(self.pc)?;
        self.pc = target;
        Ok(())
    }

    fn push_operand(&mut self, kind: OperandKind) -> Result<()> {
        let value = self.fetch_source(kind)?;
        self.push(value)?;
        self.advance()
    }

    fn pop_register(&mut self) -> Result<()> {
        let reg = self.fetch_operand()?;
        let value = self.pop()?;
        self.write_register(reg, value)?;
        self.advance()
    }

    // Micro-operations

    fn set_flags(&mut self, res: AluResult) {
        self.flags.zero = res.is_zero;
        self.flags.overflow = res.is_overflow;
        self.flags.negative = res.is_negative;
    }

    /// PC ← PC + 1
    fn advance(&mut self) -> Result<()> {
        self.pc = self.pc.checked_add(1).ok_or_else(error::cpu_pc_overflow)?;
        Ok(())
    }

    /// PC ← PC + 1, MAR ← PC, MBR ← M[MAR]
    fn fetch_operand(&mut self) -> Result<u8> {
        self.advance()?;
        self.fetch_memory(self.pc)
    }

    /// MAR ← addr, MBR ← M[MAR]
    fn fetch_memory(&mut self, addr: u8) -> Result<u8> {
        self.mar = addr;
        self.mbr = self.memory.read(usize::from(self.mar))?;
        Ok(self.mbr)
    }

    /// MAR ← GPR[reg], MBR ← M[MAR]
    fn fetch_memory_from(&mut self, reg: u8) -> Result<u8> {
        let addr = self.read_register(reg)?;
        self.fetch_memory(addr)
    }

    /// MAR ← addr, MBR ← value, M[MAR] ← MBR
    fn store(&mut self, addr: u8, value: u8) -> Result<()> {
        self.mar = addr;
        self.mbr = value;
        self.memory.write(usize::from(self.mar), i32::from(self.mbr))
    }

    /// Fetch the next operand byte and resolve it to a value according to its kind.
    fn fetch_source(&mut self, kind: OperandKind) -> Result<u8> {
        let byte = self.fetch_operand()?;
        match kind {
            OperandKind::Register => self.read_register(byte),
            OperandKind::Address => self.fetch_memory(byte),
            OperandKind::RegAddress => self.fetch_memory_from(byte),
            OperandKind::Number | OperandKind::Char => Ok(byte),
            OperandKind::None | OperandKind::String => Err(self.malformed()),
        }
    }

    /// Jump and call targets are immediate or read through a register.
    fn fetch_target(&mut self, kind: OperandKind) -> Result<u8> {
        let byte = self.fetch_operand()?;
        match kind {
            OperandKind::RegAddress => self.fetch_memory_from(byte),
            _ => Ok(byte),
        }
    }

    /// MAR ← SP, SP ← SP - 1, M[MAR] ← value
    fn push(&mut self, value: u8) -> Result<()> {
        let next = self
            .sp
            .checked_sub(1)
            .ok_or_else(|| error::cpu_stack_overflow(self.start))?;
        self.store(self.sp, value)?;
        self.sp = next;
        Ok(())
    }

    /// SP ← SP + 1, MAR ← SP, MBR ← M[MAR]
    fn pop(&mut self) -> Result<u8> {
        self.sp = self
            .sp
            .checked_add(1)
            .ok_or_else(|| error::cpu_stack_underflow(self.start))?;
        self.fetch_memory(self.sp)
    }

    /// Register operand by index. Index 4 is the stack pointer.
    fn read_register(&self, index: u8) -> Result<u8> {
        let reg = Register::from_index(index)
            .ok_or_else(|| error::cpu_invalid_register(index, self.start))?;
        Ok(self.reg(reg))
    }

    fn write_register(&mut self, index: u8, value: u8) -> Result<()> {
        let reg = Register::from_index(index)
            .ok_or_else(|| error::cpu_invalid_register(index, self.start))?;
        self.set_reg(reg, value);
        Ok(())
    }

    fn malformed(&self) -> Report {
        error::cpu_invalid_opcode(self.ir, self.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;
    use crate::error::code;

    fn boot(src: &str) -> Cpu {
        let asm = assemble(src).unwrap();
        let mut memory = Memory::new();
        memory.load(&asm.code).unwrap();
        Cpu::new(memory)
    }

    fn step(cpu: &mut Cpu) -> Result<bool> {
        cpu.fetch()?;
        cpu.execute()
    }

    fn run(src: &str) -> Cpu {
        let mut cpu = boot(src);
        for _ in 0..10_000 {
            if !step(&mut cpu).unwrap() {
                return cpu;
            }
        }
        panic!("program did not halt");
    }

    #[test]
    fn fresh_state() {
        let cpu = Cpu::new(Memory::new());
        assert_eq!(cpu.pc(), 0);
        assert_eq!(cpu.sp(), 231);
        assert_eq!(cpu.gpr(), &[0; 4]);
        assert_eq!(cpu.flags(), Flags::default());
        assert!(!cpu.is_halted());
    }

    #[test]
    fn mov_immediate_single_step() {
        let mut cpu = boot("MOV A, 10");
        assert!(step(&mut cpu).unwrap());
        assert_eq!(cpu.gpr()[0], 10);
        assert_eq!(cpu.pc(), 3);
    }

    #[test]
    fn halt_keeps_pc() {
        let mut cpu = boot("HLT");
        assert!(!step(&mut cpu).unwrap());
        assert!(cpu.is_halted());
        assert_eq!(cpu.pc(), 0);
        assert_eq!(cpu.ir(), 0x00);
    }

    #[test]
    fn compare_flags() {
        let cpu = run("MOV A, 0\nCMP A, 0\nHLT");
        assert_eq!((cpu.flags().zero, cpu.flags().overflow, cpu.flags().negative), (true, false, false));
        let cpu = run("MOV A, 0\nCMP A, 1\nHLT");
        assert_eq!((cpu.flags().zero, cpu.flags().overflow, cpu.flags().negative), (false, true, true));
        assert_eq!(cpu.gpr()[0], 0);
        let cpu = run("MOV A, 1\nCMP A, 0\nHLT");
        assert_eq!((cpu.flags().zero, cpu.flags().overflow, cpu.flags().negative), (false, false, false));
        assert!(!cpu.flags().carry);
    }

    #[test]
    fn arithmetic_wraps() {
        let cpu = run("MOV A, 0xFF\nADD A, 5\nHLT");
        assert_eq!(cpu.gpr()[0], 0x04);
        assert!(!cpu.flags().overflow);
        let cpu = run("MOV A, 0\nSUBT A, 5\nHLT");
        assert_eq!(cpu.gpr()[0], 0xFB);
        assert!(cpu.flags().negative);
        let cpu = run("MOV A, 0x7F\nINC A\nHLT");
        assert_eq!(cpu.gpr()[0], 0x80);
        assert!(cpu.flags().overflow);
        let cpu = run("DEC B\nHLT");
        assert_eq!(cpu.gpr()[1], 0xFF);
    }

    #[test]
    fn source_operand_kinds() {
        let cpu = run("MOV B, 3\nMOV C, 0x20\nMOV [0x20], 4\nADD A, B\nADD A, [0x20]\nADD A, [C]\nADD A, 1\nHLT");
        assert_eq!(cpu.gpr()[0], 3 + 4 + 4 + 1);
    }

    #[test]
    fn mov_variants() {
        let cpu = run("MOV A, 7\nMOV B, A\nMOV [0x40], B\nMOV C, [0x40]\nMOV D, 0x41\nMOV [D], 9\nMOV A, [D]\nHLT");
        assert_eq!(cpu.gpr(), &[9, 7, 7, 0x41]);
        assert_eq!(cpu.memory().read(0x40).unwrap(), 7);
        assert_eq!(cpu.memory().read(0x41).unwrap(), 9);
    }

    #[test]
    fn mov_to_register_address() {
        let cpu = run("MOV A, 0x1A\nMOV B, 0x1B\nMOV C, 0x1C\nMOV D, 0x1D\nMOV [A], A\nMOV [B], B\nMOV [C], C\nMOV [D], D\nHLT");
        for addr in 0x1A..=0x1D {
            assert_eq!(cpu.memory().read(addr).unwrap(), addr as u8);
        }
    }

    #[test]
    fn data_through_labels() {
        let cpu = run("JMP start\nx: DB 5\nstart: MOV A, [x]\nHLT");
        assert_eq!(cpu.gpr()[0], 5);
        assert_eq!(cpu.pc(), 6);
    }

    #[test]
    fn jumps() {
        let cpu = run("JMP 0x5\nHLT\nDB 0\nDB 0\nDB 0\nHLT");
        assert_eq!(cpu.pc(), 5);
        let cpu = run("JMP start\nHLT\nstart:");
        assert_eq!(cpu.pc(), 3);
    }

    #[test]
    fn jump_not_taken_skips_operand() {
        let cpu = run("MOV A, 1\nCMP A, 0\nJZ skip\nMOV B, 1\nskip: HLT");
        assert_eq!(cpu.gpr()[1], 1);
        let cpu = run("JC skip\nMOV B, 1\nskip: HLT");
        assert_eq!(cpu.gpr()[1], 1);
        let cpu = run("JA skip\nMOV B, 1\nskip: HLT");
        assert_eq!(cpu.gpr()[1], 0);
        let cpu = run("JNA skip\nMOV B, 1\nskip: HLT");
        assert_eq!(cpu.gpr()[1], 1);
    }

    #[test]
    fn register_indirect_jump_reads_memory() {
        // Target is the byte stored at the address held in B
        let cpu = run("MOV B, ptr\nJMP [B]\nHLT\nptr: DB end\nend: MOV A, 1\nHLT");
        assert_eq!(cpu.gpr()[0], 1);
    }

    #[test]
    fn register_indirect_jump_not_taken() {
        let mut cpu = boot("MOV A, 1\nCMP A, 0\nMOV B, 0x30\nJZ [B]\nMOV C, 7\nHLT");
        for _ in 0..4 {
            step(&mut cpu).unwrap();
        }
        assert_eq!(cpu.pc(), 11);
        while step(&mut cpu).unwrap() {}
        assert_eq!(cpu.gpr()[2], 7);
    }

    #[test]
    fn register_indirect_call() {
        let src = "MOV B, ptr\nCALL [B]\nMOV C, A\nHLT\nptr: DB sub\nsub: MOV A, 9\nRET";
        let mut cpu = boot(src);
        step(&mut cpu).unwrap();
        step(&mut cpu).unwrap();
        // Return point is the byte after `CALL [B]`
        assert_eq!(cpu.pc(), 10);
        assert_eq!(cpu.sp(), STACK_TOP - 1);
        assert_eq!(cpu.memory().read(usize::from(STACK_TOP)).unwrap(), 5);

        while step(&mut cpu).unwrap() {}
        assert_eq!(cpu.gpr()[2], 9);
        assert_eq!(cpu.sp(), STACK_TOP);
        assert_eq!(cpu.pc(), 8);
    }

    #[test]
    fn push_writes_below_stack_top() {
        let cpu = run("PUSH 0x5\nHLT");
        assert_eq!(cpu.memory().read(0xE7).unwrap(), 5);
        assert_eq!(cpu.sp(), 0xE6);
        let cpu = run("PUSH 0x5\nPUSH 0x6\nHLT");
        assert_eq!(cpu.memory().read(0xE7).unwrap(), 5);
        assert_eq!(cpu.memory().read(0xE6).unwrap(), 6);
    }

    #[test]
    fn stack_is_lifo() {
        let cpu = run("MOV A, 1\nMOV [0x50], 3\nMOV C, 0x50\nPUSH A\nPUSH 2\nPUSH [0x50]\nPUSH [C]\nPOP D\nPOP C\nPOP B\nPOP A\nHLT");
        assert_eq!(cpu.gpr(), &[1, 2, 3, 3]);
        assert_eq!(cpu.sp(), STACK_TOP);
    }

    #[test]
    fn call_and_return() {
        let cpu = run("CALL start\nADD A, 5\nHLT\nstart:\nMOV A, 5\nRET");
        assert_eq!(cpu.gpr()[0], 10);
        assert_eq!(cpu.sp(), 0xE7);
    }

    #[test]
    fn loops() {
        let cpu = run("CALL loop\nHLT\nloop:\nINC A\nCMP A, 0xA\nJNZ loop\nRET");
        assert_eq!(cpu.gpr()[0], 10);
        let cpu = run("MOV A, 0xA\nCALL loop\nHLT\nloop:\nDEC A\nCMP A, 0\nJNZ loop\nRET");
        assert_eq!(cpu.gpr()[0], 0);
    }

    #[test]
    fn bitwise() {
        let cpu = run("MOV A, 0x55\nNOT A\nHLT");
        assert_eq!(cpu.gpr()[0], 0xAA);
        let cpu = run("MOV A, 0x0F\nAND A, 0x3C\nMOV B, 0x0F\nOR B, 0x30\nMOV C, 0xFF\nXOR C, 0x0F\nHLT");
        assert_eq!(&cpu.gpr()[..3], &[0x0C, 0x3F, 0xF0]);
        let cpu = run("MOV A, 1\nSHL A, 4\nMOV B, 0x80\nSHR B, 7\nHLT");
        assert_eq!(&cpu.gpr()[..2], &[0x10, 0x01]);
    }

    #[test]
    fn stack_pointer_as_register() {
        let cpu = run("MOV A, SP\nHLT");
        assert_eq!(cpu.gpr()[0], STACK_TOP);
        let cpu = run("MOV SP, 0x80\nPUSH 1\nHLT");
        assert_eq!(cpu.memory().read(0x80).unwrap(), 1);
    }

    #[test]
    fn invalid_opcode() {
        let mut cpu = boot("DB 0x25");
        let err = step(&mut cpu).unwrap_err();
        assert_eq!(code(&err), "cpu::invalid_opcode");
    }

    #[test]
    fn invalid_register() {
        let mut cpu = boot("DB 0x11\nDB 9");
        let err = step(&mut cpu).unwrap_err();
        assert_eq!(code(&err), "cpu::invalid_register");
    }

    #[test]
    fn stack_limits() {
        let mut cpu = boot("RET");
        cpu.set_reg(Register::SP, 0xFF);
        assert_eq!(code(&step(&mut cpu).unwrap_err()), "cpu::stack_underflow");

        let mut cpu = boot("PUSH 1");
        cpu.set_reg(Register::SP, 0);
        assert_eq!(code(&step(&mut cpu).unwrap_err()), "cpu::stack_overflow");
    }

    #[test]
    fn pc_overflow() {
        let mut cpu = boot("INC A");
        cpu.set_pc(0xFF);
        cpu.memory_mut().write(0xFF, 0x11).unwrap();
        assert_eq!(code(&step(&mut cpu).unwrap_err()), "cpu::pc_overflow");

        // Effects land before the final advance fails
        let mut cpu = boot("HLT");
        for (addr, byte) in [(0xFD, 0x06), (0xFE, 0x00), (0xFF, 0x01)] {
            cpu.memory_mut().write(addr, byte).unwrap();
        }
        cpu.set_pc(0xFD);
        assert_eq!(code(&step(&mut cpu).unwrap_err()), "cpu::pc_overflow");
        assert_eq!(cpu.gpr()[0], 1);
    }

    #[test]
    fn reset_keeps_memory() {
        let mut cpu = run("MOV A, 3\nPUSH A\nHLT");
        cpu.reset();
        assert_eq!(cpu.pc(), 0);
        assert_eq!(cpu.sp(), STACK_TOP);
        assert_eq!(cpu.gpr(), &[0; 4]);
        assert!(!cpu.is_halted());
        assert_eq!(cpu.memory().read(0xE7).unwrap(), 3);
    }
}
