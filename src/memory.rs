use miette::Result;

use crate::error;

/// The machine addresses a single page of 256 bytes.
pub const MEMORY_SIZE: usize = 0x100;

/// Byte addressable main memory.
pub struct Memory {
    data: Box<[u8; MEMORY_SIZE]>,
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            data: Box::new([0; MEMORY_SIZE]),
        }
    }

    pub fn capacity(&self) -> usize {
        MEMORY_SIZE
    }

    /// Zero every cell.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    pub fn read(&self, addr: usize) -> Result<u8> {
        self.check_range(addr)?;
        Ok(self.data[addr])
    }

    /// Store the low 8 bits of `value`. Wider values wrap silently.
    pub fn write(&mut self, addr: usize, value: i32) -> Result<()> {
        self.check_range(addr)?;
        self.data[addr] = (value & 0xFF) as u8;
        Ok(())
    }

    /// Copy an assembled image to the start of memory.
    pub fn load(&mut self, image: &[u8]) -> Result<()> {
        if image.len() > MEMORY_SIZE {
            return Err(error::image_too_large(image.len()));
        }
        self.data[..image.len()].copy_from_slice(image);
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data[..]
    }

    fn check_range(&self, addr: usize) -> Result<()> {
        if addr >= MEMORY_SIZE {
            return Err(error::mem_out_of_range(addr));
        }
        Ok(())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Memory::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memory")
            .field("capacity", &MEMORY_SIZE)
            .finish_non_exhaustive()
    }
}
