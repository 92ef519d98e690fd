//! Slot handles and iteration
//!
//! A table slot holds a value directly or aliases a binding owned by another
//! scope. The handles below hide that difference behind `Deref<Target =
//! Value>`.

use crate::key::Key;
use crate::value::{Reference, Value};
use std::cell::RefMut;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Storage behind one key
#[derive(Debug, Clone)]
pub(crate) enum Slot {
    Value(Value),
    /// Binding owned by an execution scope (symbol table only)
    Indirect(Reference),
}

impl Slot {
    /// An indirect binding whose target has been unset. The key stays in
    /// the table so the binding remains attached, but it is not observable.
    pub(crate) fn is_vacant(&self) -> bool {
        match self {
            Slot::Value(_) => false,
            Slot::Indirect(cell) => cell.is_undefined(),
        }
    }

    pub(crate) fn is_indirect(&self) -> bool {
        matches!(self, Slot::Indirect(_))
    }

    /// Read-only copy of the content. Uninitialized slots read as null.
    pub(crate) fn load(&self) -> Option<Value> {
        match self {
            Slot::Value(Value::Undefined) => Some(Value::Null),
            Slot::Value(value) => Some(value.clone()),
            Slot::Indirect(cell) => match cell.get() {
                Value::Undefined => None,
                value => Some(value),
            },
        }
    }
}

/// Mutable handle to an array slot.
///
/// Obtained from [`Array::at`](crate::Array::at) and
/// [`Array::append`](crate::Array::append), after the table has been
/// separated and the slot materialized.
pub enum SlotMut<'a> {
    Direct(&'a mut Value),
    /// The binding's cell and its borrowed content
    Bound(&'a Reference, RefMut<'a, Value>),
}

impl<'a> SlotMut<'a> {
    /// Turn an uninitialized slot (or unset binding) into null and hand out
    /// a handle to it
    pub(crate) fn materialize(slot: &'a mut Slot) -> SlotMut<'a> {
        match slot {
            Slot::Value(value) => {
                if value.is_undefined() {
                    *value = Value::Null;
                }
                SlotMut::Direct(value)
            }
            Slot::Indirect(cell) => {
                let cell: &'a Reference = cell;
                let mut target = cell.borrow_mut();
                if target.is_undefined() {
                    *target = Value::Null;
                }
                SlotMut::Bound(cell, target)
            }
        }
    }

    /// Assign with the host's semantics: when the slot holds a reference,
    /// the referenced cell is written instead of the slot.
    pub fn assign(&mut self, value: impl Into<Value>) {
        self.replace(value.into());
    }

    /// Like [`assign`](Self::assign), returning the overwritten value.
    ///
    /// A binding whose cell holds a reference to itself is overwritten in
    /// place, which breaks the cycle.
    pub fn replace(&mut self, value: Value) -> Value {
        let bound = match &*self {
            SlotMut::Bound(cell, _) => Some(*cell),
            SlotMut::Direct(_) => None,
        };
        let target: &mut Value = self;
        if let Value::Reference(cell) = target {
            if !bound.is_some_and(|own| own.ptr_eq(cell)) {
                return cell.set(value);
            }
        }
        std::mem::replace(target, value)
    }

    /// Whether the slot aliases a binding owned by another scope
    pub fn is_bound(&self) -> bool {
        matches!(self, SlotMut::Bound(..))
    }
}

impl Deref for SlotMut<'_> {
    type Target = Value;

    fn deref(&self) -> &Value {
        match self {
            SlotMut::Direct(value) => value,
            SlotMut::Bound(_, value) => value,
        }
    }
}

impl DerefMut for SlotMut<'_> {
    fn deref_mut(&mut self) -> &mut Value {
        match self {
            SlotMut::Direct(value) => value,
            SlotMut::Bound(_, value) => value,
        }
    }
}

impl fmt::Debug for SlotMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

/// Shared handle to an array slot, produced by iteration.
///
/// Bound cells are read by value, so a frame may keep writing its cell
/// while the table is being iterated.
pub enum SlotRef<'a> {
    Direct(&'a Value),
    /// Content of a bound cell at the time it was visited, or null for an
    /// uninitialized slot
    Owned(Value),
}

impl<'a> SlotRef<'a> {
    pub(crate) fn observe(slot: &'a Slot) -> Option<SlotRef<'a>> {
        match slot {
            Slot::Value(Value::Undefined) => Some(SlotRef::Owned(Value::Null)),
            Slot::Value(value) => Some(SlotRef::Direct(value)),
            Slot::Indirect(cell) => match cell.get() {
                Value::Undefined => None,
                value => Some(SlotRef::Owned(value)),
            },
        }
    }
}

impl Deref for SlotRef<'_> {
    type Target = Value;

    fn deref(&self) -> &Value {
        match self {
            SlotRef::Direct(value) => value,
            SlotRef::Owned(value) => value,
        }
    }
}

impl fmt::Debug for SlotRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

/// Iterator over `(key, value)` pairs in insertion order
pub struct Iter<'a> {
    pub(crate) inner: indexmap::map::Iter<'a, Key, Slot>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a Key, SlotRef<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        for (key, slot) in self.inner.by_ref() {
            if let Some(value) = SlotRef::observe(slot) {
                return Some((key, value));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.inner.size_hint().1)
    }
}
