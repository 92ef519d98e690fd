//! Copy-on-write ordered arrays
//!
//! An `Array` is a handle to a reference-counted table of `(Key, slot)`
//! pairs kept in insertion order. Cloning the handle is O(1): both handles
//! share the table until one of them writes. Every mutating operation goes
//! through a separation step, which clones the table when it is shared so
//! that the writer becomes its sole holder before anything changes.
//!
//! Keys are normalized on the way in, at insertion and lookup alike, so
//! `"42"` and `42` address the same slot while `"042"` does not.

mod slot;

pub use slot::{Iter, SlotMut, SlotRef};
pub(crate) use slot::Slot;

use crate::error::{Result, ValueError};
use crate::key::{IntoKey, Key, parse_canonical_int};
use crate::value::{Reference, Value};
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

type Entries = IndexMap<Key, Slot, FxBuildHasher>;

/// Shared table storage
struct Table {
    entries: Entries,
    /// One past the largest non-negative integer key, `None` once
    /// `i64::MAX` is in use
    next_free: Option<i64>,
    /// Number of indirect slots, vacant ones included
    indirect: usize,
}

impl Table {
    fn with_capacity(capacity: usize) -> Self {
        Table {
            entries: IndexMap::with_capacity_and_hasher(capacity, FxBuildHasher),
            next_free: Some(0),
            indirect: 0,
        }
    }

    fn len(&self) -> usize {
        if self.indirect == 0 {
            self.entries.len()
        } else {
            self.entries.values().filter(|slot| !slot.is_vacant()).count()
        }
    }

    fn lookup(&self, key: &Key) -> Option<&Slot> {
        self.entries.get(key).filter(|slot| !slot.is_vacant())
    }

    /// Insert a key known to be absent, returning its position
    fn insert_new(&mut self, key: Key, slot: Slot) -> usize {
        if let Key::Int(n) = key {
            self.note_int_key(n);
        }
        if slot.is_indirect() {
            self.indirect += 1;
        }
        let (index, _) = self.entries.insert_full(key, slot);
        index
    }

    fn note_int_key(&mut self, n: i64) {
        if n < 0 {
            return;
        }
        if let Some(next) = self.next_free {
            if n >= next {
                self.next_free = n.checked_add(1);
            }
        }
    }

    fn remove(&mut self, key: &Key) -> Option<Slot> {
        let slot = self.entries.shift_remove(key)?;
        if slot.is_indirect() {
            self.indirect -= 1;
        }
        if let Key::Int(n) = key {
            let was_highest = match self.next_free {
                Some(next) => *n >= 0 && n.checked_add(1) == Some(next),
                None => *n == i64::MAX,
            };
            if was_highest {
                self.recompute_next_free();
            }
        }
        Some(slot)
    }

    fn recompute_next_free(&mut self) {
        let highest = self
            .entries
            .keys()
            .filter_map(Key::as_int)
            .filter(|n| *n >= 0)
            .max();
        self.next_free = match highest {
            Some(n) => n.checked_add(1),
            None => Some(0),
        };
    }
}

/// A copy never inherits bindings: each one is replaced by the current
/// content of its cell, and unset bindings are left out.
impl Clone for Table {
    fn clone(&self) -> Self {
        if self.indirect == 0 {
            return Table {
                entries: self.entries.clone(),
                next_free: self.next_free,
                indirect: 0,
            };
        }

        let mut entries: Entries =
            IndexMap::with_capacity_and_hasher(self.entries.len(), FxBuildHasher);
        for (key, slot) in &self.entries {
            let value = match slot {
                Slot::Value(value) => value.clone(),
                Slot::Indirect(cell) => match cell.get() {
                    Value::Undefined => continue,
                    value => value,
                },
            };
            entries.insert(key.clone(), Slot::Value(value));
        }

        let dropped = entries.len() != self.entries.len();
        let mut table = Table {
            entries,
            next_free: self.next_free,
            indirect: 0,
        };
        if dropped {
            table.recompute_next_free();
        }
        table
    }
}

/// Ordered associative array with copy-on-write storage
pub struct Array {
    table: Rc<Table>,
}

/// O(1) for ordinary arrays. A table holding bindings is copied eagerly so
/// that its bindings stay with the scope that owns it.
impl Clone for Array {
    fn clone(&self) -> Self {
        if self.table.indirect > 0 {
            log::trace!("detaching copy of a table with {} binding(s)", self.table.indirect);
            return Array {
                table: Rc::new(Table::clone(&self.table)),
            };
        }
        Array {
            table: Rc::clone(&self.table),
        }
    }
}

/// Resolve a possibly hand-built string key to the integer key space
fn canonical(key: &Key) -> Cow<'_, Key> {
    match key {
        Key::Str(s) => match parse_canonical_int(s.as_bytes()) {
            Some(n) => Cow::Owned(Key::Int(n)),
            None => Cow::Borrowed(key),
        },
        Key::Int(_) => Cow::Borrowed(key),
    }
}

impl Array {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Array {
            table: Rc::new(Table::with_capacity(capacity)),
        }
    }

    /// Share the storage of an array-shaped value, or convert any other value
    /// the way the host's array cast does
    pub fn from_value(value: &Value) -> Result<Array> {
        value.clone().into_array()
    }

    /// Build an array from pairs whose keys may fail to coerce
    pub fn from_pairs<K, V, I>(pairs: I) -> Result<Array>
    where
        K: IntoKey,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut array = Array::new();
        for (key, value) in pairs {
            array.insert_key(key.into_key()?, value.into());
        }
        Ok(array)
    }

    /// Number of observable elements
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Alias of [`len`](Self::len)
    pub fn size(&self) -> usize {
        self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of handles sharing this storage
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.table)
    }

    pub fn is_shared(&self) -> bool {
        self.ref_count() > 1
    }

    pub fn ptr_eq(&self, other: &Array) -> bool {
        Rc::ptr_eq(&self.table, &other.table)
    }

    /// Key the next [`append`](Self::append) will use, `None` when the
    /// integer key space is exhausted
    pub fn next_index(&self) -> Option<i64> {
        self.table.next_free
    }

    /// Whether the keys are exactly `0..len` in order
    pub fn is_list(&self) -> bool {
        self.keys()
            .enumerate()
            .all(|(i, key)| key.as_int() == i64::try_from(i).ok())
    }

    // ── Reads (never separate) ───────────────────────────────────────────────

    pub fn contains(&self, key: impl IntoKey) -> Result<bool> {
        let key = key.into_key()?;
        Ok(self.contains_key(&key))
    }

    pub fn contains_key(&self, key: &Key) -> bool {
        self.table.lookup(&canonical(key)).is_some()
    }

    /// Copy of the value stored under `key`; uninitialized slots read as null
    pub fn get(&self, key: impl IntoKey) -> Result<Option<Value>> {
        let key = key.into_key()?;
        Ok(self.get_key(&key))
    }

    pub fn get_key(&self, key: &Key) -> Option<Value> {
        self.table.lookup(&canonical(key)).and_then(Slot::load)
    }

    pub(crate) fn slot(&self, key: &Key) -> Option<&Slot> {
        self.table.entries.get(canonical(key).as_ref())
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.table.entries.iter(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> + '_ {
        self.iter().map(|(key, _)| key)
    }

    pub fn values(&self) -> impl Iterator<Item = SlotRef<'_>> + '_ {
        self.iter().map(|(_, value)| value)
    }

    // ── Writes (separate first) ──────────────────────────────────────────────

    /// Become the sole holder of the table, cloning it if it is shared
    fn separate(&mut self) -> &mut Table {
        if Rc::strong_count(&self.table) > 1 {
            log::trace!(
                "separating array table shared by {} handles ({} slots)",
                Rc::strong_count(&self.table),
                self.table.entries.len()
            );
        }
        Rc::make_mut(&mut self.table)
    }

    /// Mutable access to the slot for `key`, creating it if absent.
    ///
    /// Uninitialized slots and unset bindings are materialized to null before
    /// the handle is returned.
    pub fn at(&mut self, key: impl IntoKey) -> Result<SlotMut<'_>> {
        let key = key.into_key()?;
        Ok(self.at_key(key))
    }

    pub fn at_key(&mut self, key: Key) -> SlotMut<'_> {
        let key = key.normalize();
        let table = self.separate();
        let index = match table.entries.get_index_of(&key) {
            Some(index) => index,
            None => table.insert_new(key, Slot::Value(Value::Null)),
        };
        SlotMut::materialize(&mut table.entries[index])
    }

    /// Insert a null at the next free integer key and return a handle to it
    pub fn append(&mut self) -> Result<SlotMut<'_>> {
        let index = self.table.next_free.ok_or(ValueError::SlotOccupied)?;
        let key = Key::Int(index);
        if self.table.entries.contains_key(&key) {
            log::warn!("next array index {index} is already occupied");
            return Err(ValueError::SlotOccupied);
        }
        let table = self.separate();
        let position = table.insert_new(key, Slot::Value(Value::Null));
        Ok(SlotMut::materialize(&mut table.entries[position]))
    }

    /// Append `value`, returning the key it was stored under
    pub fn push(&mut self, value: impl Into<Value>) -> Result<i64> {
        let index = self.table.next_free.ok_or(ValueError::SlotOccupied)?;
        self.append()?.assign(value);
        Ok(index)
    }

    /// Assign `value` to `key`, returning the previous value if the key was
    /// present
    pub fn insert(&mut self, key: impl IntoKey, value: impl Into<Value>) -> Result<Option<Value>> {
        let key = key.into_key()?;
        Ok(self.insert_key(key, value.into()))
    }

    pub fn insert_key(&mut self, key: Key, value: Value) -> Option<Value> {
        let key = key.normalize();
        let table = self.separate();
        match table.entries.get_mut(&key) {
            Some(slot) => {
                let was_vacant = slot.is_vacant();
                let previous = SlotMut::materialize(slot).replace(value);
                (!was_vacant).then_some(previous)
            }
            None => {
                table.insert_new(key, Slot::Value(value));
                None
            }
        }
    }

    /// Remove `key` if present. Removing an absent key is not an error.
    pub fn unset(&mut self, key: impl IntoKey) -> Result<()> {
        let key = key.into_key()?;
        self.unset_key(&key);
        Ok(())
    }

    /// Remove `key`, reporting whether anything was removed
    pub fn unset_key(&mut self, key: &Key) -> bool {
        let key = canonical(key);
        if !self.table.entries.contains_key(key.as_ref()) {
            return false;
        }
        self.separate().remove(key.as_ref()).is_some()
    }

    /// Drop every element. The shared table, if any, is left to the other
    /// holders.
    pub fn clear(&mut self) {
        self.table = Rc::new(Table::with_capacity(0));
    }

    // ── Symbol table support ─────────────────────────────────────────────────

    /// Attach `cell` under `key` as an indirect binding
    pub(crate) fn bind_key(&mut self, key: Key, cell: Reference) {
        let key = key.normalize();
        let table = self.separate();
        match table.entries.get_mut(&key) {
            Some(slot) => {
                if !slot.is_indirect() {
                    table.indirect += 1;
                }
                *slot = Slot::Indirect(cell);
            }
            None => {
                table.insert_new(key, Slot::Indirect(cell));
            }
        }
    }

    /// Deletion path for tables holding indirect bindings: a binding is
    /// emptied in place so the scope that owns it stays attached, any other
    /// slot is removed.
    pub(crate) fn unset_binding(&mut self, key: &Key) -> bool {
        let bound = match self.slot(key) {
            None => return false,
            Some(Slot::Value(_)) => None,
            Some(Slot::Indirect(cell)) => Some(cell.clone()),
        };
        let Some(cell) = bound else {
            return self.unset_key(key);
        };
        if cell.is_undefined() {
            return false;
        }
        // The table itself is untouched, only the bound cell changes
        drop(cell.set(Value::Undefined));
        true
    }
}

impl Default for Array {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a Array {
    type Item = (&'a Key, SlotRef<'a>);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// Ordered comparison of key/value pairs
impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|((ka, va), (kb, vb))| ka == kb && *va == *vb)
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<T: Into<Value>> From<Vec<T>> for Array {
    fn from(items: Vec<T>) -> Self {
        let mut array = Array::with_capacity(items.len());
        let table = array.separate();
        for (i, item) in (0i64..).zip(items) {
            table.insert_new(Key::Int(i), Slot::Value(item.into()));
        }
        array
    }
}

impl<K: Into<Key>, V: Into<Value>> FromIterator<(K, V)> for Array {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut array = Array::new();
        array.extend(iter);
        array
    }
}

impl<K: Into<Key>, V: Into<Value>> Extend<(K, V)> for Array {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert_key(key.into(), value.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::string::ZString;
    use crate::value::{Object, Type};

    #[test]
    fn test_empty() {
        let a = Array::new();
        assert_eq!(a.len(), 0);
        assert!(a.is_empty());
        assert_eq!(a.next_index(), Some(0));
        assert!(a.is_list());
    }

    #[test]
    fn test_at_creates_null_slot() {
        let mut a = Array::new();
        assert!(a.at("k").unwrap().is_null());
        assert_eq!(a.len(), 1);
        assert_eq!(a.get("k").unwrap(), Some(Value::Null));
    }

    #[test]
    fn test_write_through_at() {
        let mut a = Array::new();
        *a.at("x").unwrap() = Value::from(30);
        a.at(1).unwrap().assign("one");
        assert_eq!(a.get("x").unwrap(), Some(Value::Int(30)));
        assert_eq!(a.get("1").unwrap(), Some(Value::from("one")));
    }

    #[test]
    fn test_numeric_string_keys_share_slot() {
        let mut a = Array::new();
        a.insert("42", "str").unwrap();
        assert!(a.contains(42).unwrap());
        a.insert(7, "int").unwrap();
        assert!(a.contains("7").unwrap());
        assert_eq!(a.len(), 2);
        assert_eq!(a.keys().cloned().collect::<Vec<_>>(), vec![Key::Int(42), Key::Int(7)]);
    }

    #[test]
    fn test_non_canonical_strings_stay_strings() {
        let mut a = Array::new();
        a.insert("042", 1).unwrap();
        a.insert("-0", 2).unwrap();
        assert!(!a.contains(42).unwrap());
        assert!(!a.contains(0).unwrap());
        assert!(a.contains("042").unwrap());
        assert!(a.contains("-0").unwrap());
    }

    #[test]
    fn test_hand_built_string_key_is_normalized() {
        let mut a = Array::new();
        a.insert_key(Key::Str(ZString::from("5")), Value::Int(1));
        assert!(a.contains_key(&Key::Int(5)));
        assert!(a.contains_key(&Key::Str(ZString::from("5"))));
        assert!(a.unset_key(&Key::Str(ZString::from("5"))));
        assert!(a.is_empty());
    }

    #[test]
    fn test_append_sequence() {
        let mut a = Array::new();
        assert_eq!(a.push(10).unwrap(), 0);
        assert_eq!(a.push(20).unwrap(), 1);
        a.insert(10, "ten").unwrap();
        assert_eq!(a.push(30).unwrap(), 11);
        a.insert(-5, "neg").unwrap();
        assert_eq!(a.push(40).unwrap(), 12);
    }

    #[test]
    fn test_append_does_not_reuse_holes() {
        let mut a = Array::new();
        for v in 0..3 {
            a.push(v).unwrap();
        }
        a.unset(1).unwrap();
        assert_eq!(a.push("next").unwrap(), 3);
        assert!(!a.contains(1).unwrap());
    }

    #[test]
    fn test_append_after_removing_highest_key() {
        let mut a = Array::new();
        a.push(0).unwrap();
        a.push(1).unwrap();
        a.unset(1).unwrap();
        assert_eq!(a.next_index(), Some(1));
        a.unset(0).unwrap();
        assert_eq!(a.next_index(), Some(0));
    }

    #[test]
    fn test_only_negative_keys_append_at_zero() {
        let mut a = Array::new();
        a.insert(-3, "a").unwrap();
        assert_eq!(a.push("b").unwrap(), 0);
    }

    #[test]
    fn test_append_exhausted_key_space() {
        let mut a = Array::new();
        a.insert(i64::MAX, 1).unwrap();
        assert_eq!(a.next_index(), None);
        assert_eq!(a.append().unwrap_err(), ValueError::SlotOccupied);
        assert_eq!(a.push(2).unwrap_err(), ValueError::SlotOccupied);
        assert_eq!(a.len(), 1);
        a.unset(i64::MAX).unwrap();
        assert_eq!(a.next_index(), Some(0));
    }

    #[test]
    fn test_reinserted_key_moves_to_tail() {
        let mut a = Array::new();
        a.insert("a", 1).unwrap();
        a.insert("b", 2).unwrap();
        a.insert("c", 3).unwrap();
        a.unset("a").unwrap();
        a.insert("a", 4).unwrap();
        let keys: Vec<String> = a.keys().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_overwrite_keeps_position() {
        let mut a = Array::new();
        a.insert("a", 1).unwrap();
        a.insert("b", 2).unwrap();
        assert_eq!(a.insert("a", 3).unwrap(), Some(Value::Int(1)));
        assert_eq!(a.keys().next(), Some(&Key::from("a")));
    }

    #[test]
    fn test_unset_absent_is_noop() {
        let mut a = Array::from(vec![1]);
        let copy = a.clone();
        a.unset("missing").unwrap();
        a.unset(99).unwrap();
        assert_eq!(a.len(), 1);
        // Nothing was written, so nothing was separated
        assert!(a.ptr_eq(&copy));
    }

    #[test]
    fn test_illegal_keys() {
        let mut a = Array::new();
        let bad = Value::from(Array::new());
        assert_eq!(a.contains(&bad).unwrap_err(), ValueError::illegal_key(Type::Array));
        assert!(a.at(&bad).is_err());
        assert!(a.unset(&bad).is_err());
        let obj = Value::from(Object::new("C"));
        assert_eq!(a.insert(&obj, 1).unwrap_err(), ValueError::illegal_key(Type::Object));
        assert!(a.is_empty());
    }

    #[test]
    fn test_value_keys() {
        let mut a = Array::new();
        a.insert(&Value::from(1.9), "double").unwrap();
        a.insert(&Value::from(true), "true").unwrap();
        a.insert(&Value::Null, "null").unwrap();
        assert_eq!(a.get(1).unwrap(), Some(Value::from("true")));
        assert_eq!(a.get("").unwrap(), Some(Value::from("null")));
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_copy_is_constant_time_until_write() {
        let a = Array::from(vec![1, 2, 3]);
        let mut b = a.clone();
        assert!(a.ptr_eq(&b));
        assert_eq!(a.ref_count(), 2);

        b.push(4).unwrap();
        assert!(!a.ptr_eq(&b));
        assert_eq!(a.ref_count(), 1);
        assert_eq!(b.ref_count(), 1);
        assert_eq!(a.len(), 3);
        assert_eq!(b.len(), 4);
    }

    #[test]
    fn test_separation_shares_nested_payloads() {
        let inner = Array::from(vec!["deep"]);
        let a = Array::from(vec![Value::from(inner.clone())]);
        assert_eq!(inner.ref_count(), 2);
        let mut b = a.clone();
        b.push(1).unwrap();
        // Shallow copy: the nested array is shared by both tables
        assert_eq!(inner.ref_count(), 3);
        drop(b);
        assert_eq!(inner.ref_count(), 2);
    }

    #[test]
    fn test_reads_do_not_separate() {
        let a = Array::from(vec![1, 2]);
        let b = a.clone();
        assert!(b.contains(0).unwrap());
        assert_eq!(b.get(1).unwrap(), Some(Value::Int(2)));
        assert_eq!(b.iter().count(), 2);
        assert!(a.ptr_eq(&b));
    }

    #[test]
    fn test_assign_through_reference_slot() {
        let cell = Reference::new(1);
        let mut a = Array::new();
        a.insert("r", Value::Reference(cell.clone())).unwrap();
        a.at("r").unwrap().assign(2);
        assert_eq!(cell.get(), Value::Int(2));
        assert!(a.get("r").unwrap().unwrap().is_reference());
    }

    #[test]
    fn test_uninitialized_slot_reads_as_null() {
        let mut a = Array::new();
        a.insert("u", Value::Undefined).unwrap();
        assert_eq!(a.get("u").unwrap(), Some(Value::Null));
        let (_, v) = a.iter().next().unwrap();
        assert!(v.is_null());
        assert!(a.at("u").unwrap().is_null());
    }

    #[test]
    fn test_clear_leaves_shared_copy() {
        let mut a = Array::from(vec![1, 2]);
        let b = a.clone();
        a.clear();
        assert!(a.is_empty());
        assert_eq!(b.len(), 2);
        assert_eq!(a.next_index(), Some(0));
    }

    #[test]
    fn test_from_pairs_and_collect() {
        let a = Array::from_pairs([("a", 1), ("7", 2)]).unwrap();
        assert_eq!(a.get(7).unwrap(), Some(Value::Int(2)));

        let b: Array = vec![(Key::from("x"), 1), (Key::Int(3), 2)].into_iter().collect();
        assert_eq!(b.next_index(), Some(4));
        assert!(!b.is_list());

        let err = Array::from_pairs([(Value::from(Array::new()), 1)]).unwrap_err();
        assert_eq!(err.kind(), "IllegalKeyType");
    }

    #[test]
    fn test_from_value_shares_storage() {
        let original = Array::from(vec![1]);
        let shared = Array::from_value(&Value::from(original.clone())).unwrap();
        assert!(shared.ptr_eq(&original));
        let converted = Array::from_value(&Value::from(5)).unwrap();
        assert_eq!(converted.get(0).unwrap(), Some(Value::Int(5)));
    }

    #[test]
    fn test_copy_of_bound_table_is_detached() {
        let cell = Reference::new(1);
        let empty = Reference::undefined();
        let mut bound = Array::new();
        bound.bind_key(Key::from("v"), cell.clone());
        bound.bind_key(Key::Int(3), empty.clone());

        let mut copy = bound.clone();
        assert!(!copy.ptr_eq(&bound));
        assert_eq!(copy.len(), 1);
        assert_eq!(copy.next_index(), Some(0));

        copy.insert("v", 99).unwrap();
        copy.at(3).unwrap().assign("revived");
        assert_eq!(cell.get(), Value::Int(1));
        assert!(empty.is_undefined());
        assert_eq!(bound.get("v").unwrap(), Some(Value::Int(1)));
        assert!(!bound.contains(3).unwrap());
        assert_eq!(bound.next_index(), Some(4));
    }

    #[test]
    fn test_debug_format() {
        let mut a = Array::new();
        a.push(1).unwrap();
        a.insert("k", "v").unwrap();
        assert_eq!(format!("{a:?}"), r#"{0: Int(1), "k": String("v")}"#);
    }
}
