//! Bump allocated variable memory.
use std::fmt::{self, Write};

use crate::error::{StrandError, StrandResult};

/// Region of arena memory owned by a single variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handle {
    offset: usize,
    size: usize,
}

impl Handle {
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }
}

/// Single block of memory that all variable storage is carved from.
///
/// Allocation only moves the caret forward. Nothing is freed until
/// the arena itself is dropped at the end of the run.
pub struct Arena {
    memory: Box<[u8]>,
    /// Offset of the next free byte.
    caret: usize,
}

impl Arena {
    /// Reserve the whole block up front.
    pub fn new(size: usize) -> Self {
        Self {
            memory: vec![0; size].into_boxed_slice(),
            caret: 0,
        }
    }

    /// Take `size` bytes from the free end of the arena.
    pub fn alloc(&mut self, size: usize) -> StrandResult<Handle> {
        match self.caret.checked_add(size) {
            Some(end) if end <= self.memory.len() => {
                let handle = Handle {
                    offset: self.caret,
                    size,
                };
                self.caret = end;
                Ok(handle)
            }
            _ => Err(StrandError::exhausted("arena memory")),
        }
    }

    #[inline]
    pub fn bytes(&self, handle: Handle) -> &[u8] {
        &self.memory[handle.offset..handle.offset + handle.size]
    }

    #[inline]
    pub fn bytes_mut(&mut self, handle: Handle) -> &mut [u8] {
        &mut self.memory[handle.offset..handle.offset + handle.size]
    }

    /// Number of bytes handed out so far.
    #[inline]
    pub fn used(&self) -> usize {
        self.caret
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.memory.len()
    }

    /// Hex listing of the allocated part of the arena, 16 bytes per row.
    pub fn dump(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();

        for (row, chunk) in self.memory[..self.caret].chunks(16).enumerate() {
            write!(buf, "{:08X} ", row * 16)?;
            for byte in chunk {
                write!(buf, " {byte:02X}")?;
            }
            writeln!(buf)?;
        }

        Ok(buf)
    }
}
