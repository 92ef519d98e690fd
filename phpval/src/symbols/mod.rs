//! Process-wide variable bindings
//!
//! The symbol table maps global variable names to values. Some entries are
//! not plain values but bindings into storage owned by an executing frame
//! (compiled variables): the frame and the table see the same cell. Deleting
//! such an entry must empty the cell rather than drop the table entry,
//! otherwise the frame would keep a value the table no longer shows.
//!
//! Instead of an ambient global, the table is an explicit context object the
//! caller owns and passes around.

use crate::array::{Array, Iter, Slot, SlotMut};
use crate::config::Config;
use crate::error::Result;
use crate::key::{IntoKey, Key};
use crate::value::{Reference, Value};

/// Variable-binding table with its own deletion path
#[derive(Debug)]
pub struct SymbolTable {
    table: Array,
    config: Config,
}

impl SymbolTable {
    pub fn new(config: Config) -> Self {
        SymbolTable {
            table: Array::with_capacity(config.symbol_table_capacity),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Coerce `name`, following references up to the configured depth
    fn key(&self, name: impl IntoKey) -> Result<Key> {
        name.into_key_with(self.config.max_reference_depth)
    }

    /// Declare a frame variable bound to `name`.
    ///
    /// Returns the cell the frame should use. An existing binding is reused;
    /// an existing plain value moves into the new cell.
    pub fn declare(&mut self, name: impl IntoKey) -> Result<Reference> {
        let key = self.key(name)?;
        let cell = match self.table.slot(&key) {
            Some(Slot::Indirect(cell)) => return Ok(cell.clone()),
            Some(Slot::Value(value)) => Reference::new(value.clone()),
            None => Reference::undefined(),
        };
        self.table.bind_key(key, cell.clone());
        Ok(cell)
    }

    /// Bind `name` to a cell owned by an execution frame
    pub fn bind(&mut self, name: impl IntoKey, cell: &Reference) -> Result<()> {
        let key = self.key(name)?;
        log::trace!("binding global {key} to frame storage");
        self.table.bind_key(key, cell.clone());
        Ok(())
    }

    /// Current value of `name`, with references followed up to the
    /// configured depth
    pub fn get(&self, name: impl IntoKey) -> Result<Option<Value>> {
        let key = self.key(name)?;
        match self.table.get_key(&key) {
            Some(value) => Ok(Some(
                value.dereferenced_with(self.config.max_reference_depth)?,
            )),
            None => Ok(None),
        }
    }

    /// Assign `value` to `name`, writing through a binding when there is one
    pub fn set(&mut self, name: impl IntoKey, value: impl Into<Value>) -> Result<()> {
        let key = self.key(name)?;
        self.table.at_key(key).assign(value);
        Ok(())
    }

    /// Mutable access to the slot for `name`, creating it as null if absent
    pub fn at(&mut self, name: impl IntoKey) -> Result<SlotMut<'_>> {
        let key = self.key(name)?;
        Ok(self.table.at_key(key))
    }

    pub fn contains(&self, name: impl IntoKey) -> Result<bool> {
        let key = self.key(name)?;
        Ok(self.table.contains_key(&key))
    }

    /// Delete `name`.
    ///
    /// A binding is emptied in place and stays attached to its frame; a
    /// plain entry is removed. Unknown names are ignored.
    pub fn unset(&mut self, name: impl IntoKey) -> Result<()> {
        let key = self.key(name)?;
        if self.table.unset_binding(&key) {
            log::debug!("unset global {key}");
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> Iter<'_> {
        self.table.iter()
    }

    /// Read-only view of the underlying table
    pub fn as_array(&self) -> &Array {
        &self.table
    }

    /// Detached copy with every binding replaced by its current value.
    /// Unset bindings are left out.
    pub fn to_array(&self) -> Array {
        let mut snapshot = Array::with_capacity(self.table.len());
        for (key, value) in self.table.iter() {
            snapshot.insert_key(key.clone(), (*value).clone());
        }
        snapshot
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
