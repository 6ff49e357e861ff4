/// Breakpoints in the order they were set.
#[derive(Debug, Default)]
pub struct Breakpoints(Vec<Breakpoint>);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Breakpoint {
    pub address: u8,
    /// 0-based source line of the instruction at `address`
    pub line: usize,
}

impl Breakpoints {
    pub fn get(&self, address: u8) -> Option<Breakpoint> {
        self.0.iter().find(|bp| bp.address == address).copied()
    }

    pub fn contains(&self, address: u8) -> bool {
        self.0.iter().any(|bp| bp.address == address)
    }

    /// Returns `false` if a breakpoint already exists at the same address.
    pub fn insert(&mut self, breakpoint: Breakpoint) -> bool {
        if self.contains(breakpoint.address) {
            return false;
        }
        self.0.push(breakpoint);
        true
    }

    /// Removes every breakpoint with given address
    ///
    /// Returns whether any breakpoint was found with given address
    pub fn remove(&mut self, address: u8) -> bool {
        let initial_len = self.0.len();
        self.0.retain(|bp| bp.address != address);
        initial_len != self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Breakpoint> {
        self.0.iter()
    }
}
