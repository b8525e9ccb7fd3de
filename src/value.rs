use std::collections::HashMap;

use crate::error::VmError;

/// A single memory cell.
pub type Word = i64;

/// What a slot reads as before it is first written, and after it is popped.
pub const UNSET: Word = -1;

/// Flat addressable memory shared by the value stack and activation frames.
/// Only written addresses take space.
#[derive(Default)]
pub struct Memory {
    cells: HashMap<usize, Word>,
}

impl Memory {
    pub fn load(&self, addr: Word) -> Result<Word, VmError> {
        let i = index(addr)?;
        Ok(self.cells.get(&i).copied().unwrap_or(UNSET))
    }

    pub fn store(&mut self, addr: Word, v: Word) -> Result<(), VmError> {
        self.cells.insert(index(addr)?, v);
        Ok(())
    }

    /// Cells `0..=top`, the part of memory the trace shows.
    pub fn snapshot(&self, top: Word) -> Vec<Word> {
        let Ok(top) = usize::try_from(top) else {
            return Vec::new();
        };
        (0..=top)
            .map(|i| self.cells.get(&i).copied().unwrap_or(UNSET))
            .collect()
    }
}

fn index(addr: Word) -> Result<usize, VmError> {
    usize::try_from(addr).map_err(|_| VmError::InvalidAddress(addr))
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut cells: Vec<_> = self.cells.iter().collect();
        cells.sort_unstable();
        f.debug_map().entries(cells).finish()
    }
}
