use crate::pool::Pool;

/// Most global slots a table can hand out: slots are one-byte operands.
pub const MAX_SYMBOLS: usize = u8::MAX as usize + 1;

#[derive(Debug, thiserror::Error)]
#[error("symbol table is full ({} names)", MAX_SYMBOLS)]
pub struct SymbolTableFull;

/// Names of toplevel globals, indexed by the global slot they occupy.
/// Lookups are linear; a session rarely holds more than a handful of names.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    names: Pool<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable { names: Pool::new() }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Slot for `name`, claiming the next free one if it is new.
    pub fn define(&mut self, name: &str) -> Result<u8, SymbolTableFull> {
        if let Some(slot) = self.resolve(name) {
            return Ok(slot);
        }
        if self.names.len() >= MAX_SYMBOLS {
            return Err(SymbolTableFull);
        }
        let slot = self.names.append(name.to_string());
        Ok(slot as u8)
    }

    pub fn resolve(&self, name: &str) -> Option<u8> {
        self.names.iter().position(|n| n == name).map(|i| i as u8)
    }

    pub fn name(&self, slot: u8) -> Option<&str> {
        self.names.get(slot as usize).map(String::as_str)
    }
}
