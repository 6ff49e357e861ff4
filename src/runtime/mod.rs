//! Driver pairing one [`Cpu`] with its program.
//!
//! The core never loops on its own; [`Machine::run`] alternates `fetch`/`execute` until
//! the program halts, a breakpoint is reached or the step budget runs out.

use miette::Result;
use tracing::debug;

use crate::assembler::{Assembler, Assembly};
use crate::cpu::Cpu;
use crate::error;
use crate::memory::Memory;

mod breakpoint;

pub use self::breakpoint::{Breakpoint, Breakpoints};

/// Why [`Machine::run`] returned.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Stop {
    Halted,
    /// Paused before executing the instruction at `address`.
    Breakpoint { line: usize, address: u8 },
    StepLimit,
}

pub struct Machine {
    cpu: Cpu,
    assembler: Assembler,
    /// Image copied into memory on every reset
    image: Option<Vec<u8>>,
    assembly: Option<Assembly>,
    breakpoints: Breakpoints,
    /// Used to allow breakpoint to be passed on second attempt.
    current_breakpoint: Option<u8>,
    steps: u64,
}

impl Machine {
    pub fn new() -> Self {
        Machine {
            cpu: Cpu::new(Memory::new()),
            assembler: Assembler::new(),
            image: None,
            assembly: None,
            breakpoints: Breakpoints::default(),
            current_breakpoint: None,
            steps: 0,
        }
    }

    /// Assemble `src` and load the image at address 0.
    pub fn assemble(&mut self, src: &str) -> Result<&Assembly> {
        let assembly = self.assembler.assemble(src)?;
        self.load(&assembly.code)?;
        Ok(&*self.assembly.insert(assembly))
    }

    /// Load a raw image at address 0, dropping the previous program and its breakpoints.
    pub fn load(&mut self, image: &[u8]) -> Result<()> {
        let memory = self.cpu.memory_mut();
        memory.reset();
        memory.load(image)?;
        debug!(bytes = image.len(), "loaded image");

        self.image = Some(image.to_vec());
        self.assembly = None;
        self.breakpoints.clear();
        self.restart();
        Ok(())
    }

    /// Zero memory, reload the current program and reset the CPU.
    pub fn reset(&mut self) -> Result<()> {
        let memory = self.cpu.memory_mut();
        memory.reset();
        if let Some(image) = &self.image {
            memory.load(image)?;
        }
        self.restart();
        Ok(())
    }

    fn restart(&mut self) {
        self.cpu.reset();
        self.current_breakpoint = None;
        self.steps = 0;
    }

    /// Execute a single instruction. Returns `false` once the machine halts.
    pub fn step(&mut self) -> Result<bool> {
        self.cpu.fetch()?;
        let running = self.cpu.execute()?;
        self.steps += 1;
        Ok(running)
    }

    /// Run until `HLT`, a breakpoint, or `max_steps` executed instructions.
    pub fn run(&mut self, max_steps: usize) -> Result<Stop> {
        for _ in 0..max_steps {
            let pc = self.cpu.pc();
            // Remember if previous run paused on the same breakpoint. If so, don't break now.
            if let Some(breakpoint) = self
                .breakpoints
                .get(pc)
                .filter(|_| self.current_breakpoint != Some(pc))
            {
                debug!(line = breakpoint.line, address = pc, "reached breakpoint");
                self.current_breakpoint = Some(pc);
                return Ok(Stop::Breakpoint {
                    line: breakpoint.line,
                    address: pc,
                });
            }
            self.current_breakpoint = None;

            if !self.step()? {
                debug!(steps = self.steps, pc, "halted");
                return Ok(Stop::Halted);
            }
        }
        debug!(steps = self.steps, "step limit reached");
        Ok(Stop::StepLimit)
    }

    /// Break before the instruction assembled from `line` (0-based).
    pub fn set_breakpoint(&mut self, line: usize) -> Result<Breakpoint> {
        let address = self.address_of(line)?;
        let breakpoint = Breakpoint { address, line };
        self.breakpoints.insert(breakpoint);
        Ok(breakpoint)
    }

    /// Returns whether a breakpoint existed on `line`.
    pub fn remove_breakpoint(&mut self, line: usize) -> Result<bool> {
        let address = self.address_of(line)?;
        Ok(self.breakpoints.remove(address))
    }

    fn address_of(&self, line: usize) -> Result<u8> {
        let assembly = self.assembly.as_ref().ok_or_else(error::machine_no_program)?;
        assembly
            .mapping
            .iter()
            .find(|(_, l)| **l == line)
            .and_then(|(offset, _)| u8::try_from(*offset).ok())
            .ok_or_else(|| error::machine_no_instruction(line))
    }

    /// Source line of the instruction starting at `address`, if the program was assembled.
    pub fn line_of(&self, address: u8) -> Option<usize> {
        self.assembly
            .as_ref()?
            .mapping
            .get(&usize::from(address))
            .copied()
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn assembly(&self) -> Option<&Assembly> {
        self.assembly.as_ref()
    }

    pub fn breakpoints(&self) -> &Breakpoints {
        &self.breakpoints
    }

    /// Instructions executed since the last load or reset.
    pub fn steps(&self) -> u64 {
        self.steps
    }
}

impl Default for Machine {
    fn default() -> Self {
        Machine::new()
    }
}
