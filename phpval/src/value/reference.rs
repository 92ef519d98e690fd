//! Reference cells
//!
//! A `Reference` lets several slots alias one storage location. Cloning the
//! handle shares the cell; writing through any handle is seen by all.

use super::Value;
use super::recursion::Visit;
use crate::error::Result;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

/// Shared, mutable storage location
#[derive(Clone)]
pub struct Reference(Rc<RefCell<Value>>);

impl Reference {
    pub fn new(value: impl Into<Value>) -> Self {
        Reference(Rc::new(RefCell::new(value.into())))
    }

    /// A cell that has been declared but never written
    pub fn undefined() -> Self {
        Reference::new(Value::Undefined)
    }

    /// Copy of the current content (O(1) for shared payloads)
    pub fn get(&self) -> Value {
        self.0.borrow().clone()
    }

    /// Overwrite the content, returning the previous one
    pub fn set(&self, value: impl Into<Value>) -> Value {
        self.0.replace(value.into())
    }

    pub fn borrow(&self) -> Ref<'_, Value> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, Value> {
        self.0.borrow_mut()
    }

    /// Run `f` with mutable access to the content
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Value) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }

    pub fn is_undefined(&self) -> bool {
        matches!(*self.0.borrow(), Value::Undefined)
    }

    /// Follow this cell (and any cells it points to) to a non-reference
    /// value, giving up after `limit` cells
    pub fn resolve(&self, limit: usize) -> Result<Value> {
        Value::Reference(self.clone()).dereferenced_with(limit)
    }

    /// Number of slots aliasing this cell
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub fn ptr_eq(&self, other: &Reference) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Identity of the cell, for cycle detection
    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

/// References compare by identity: two cells are equal only when they are
/// the same cell.
impl PartialEq for Reference {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(_visit) = Visit::enter(self.addr()) else {
            return write!(f, "*RECURSION*");
        };
        match self.0.try_borrow() {
            Ok(inner) => write!(f, "&{:?}", &*inner),
            Err(_) => write!(f, "&<borrowed>"),
        }
    }
}
