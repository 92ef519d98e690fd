//! Immutable reference-counted byte strings
//!
//! `ZString` is the string payload of [`Value`](crate::Value) and the string
//! half of [`Key`](crate::Key). Cloning is O(1). The empty string and every
//! single-byte string are interned per thread, so the most common short
//! literals never allocate. Interning is invisible to equality, hashing and
//! ordering, which all go by content.

use std::borrow::Borrow;
use std::fmt;
use std::rc::Rc;

/// Immutable, content-compared, reference-counted byte string
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZString(Rc<[u8]>);

struct Interned {
    empty: Rc<[u8]>,
    chars: Vec<Rc<[u8]>>,
}

impl Interned {
    fn new() -> Self {
        Interned {
            empty: Rc::from(&[][..]),
            chars: (0..=u8::MAX).map(|b| Rc::from(&[b][..])).collect(),
        }
    }

    fn lookup(&self, bytes: &[u8]) -> Option<Rc<[u8]>> {
        match bytes {
            [] => Some(Rc::clone(&self.empty)),
            [b] => Some(Rc::clone(&self.chars[*b as usize])),
            _ => None,
        }
    }
}

thread_local! {
    static INTERNED: Interned = Interned::new();
}

impl ZString {
    /// Create a string from raw bytes, reusing an interned buffer when one
    /// exists
    pub fn new(bytes: impl AsRef<[u8]>) -> Self {
        let bytes = bytes.as_ref();
        match INTERNED.with(|table| table.lookup(bytes)) {
            Some(shared) => ZString(shared),
            None => ZString(Rc::from(bytes)),
        }
    }

    /// The interned empty string
    pub fn empty() -> Self {
        ZString(INTERNED.with(|table| Rc::clone(&table.empty)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow as `&str` when the bytes are valid UTF-8
    pub fn to_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }

    /// Whether this buffer is one of the per-thread interned literals
    pub fn is_interned(&self) -> bool {
        INTERNED.with(|table| match table.lookup(&self.0) {
            Some(shared) => Rc::ptr_eq(&shared, &self.0),
            None => false,
        })
    }

    /// Number of live handles to this buffer
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub fn ptr_eq(&self, other: &ZString) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for ZString {
    fn default() -> Self {
        Self::empty()
    }
}

impl AsRef<[u8]> for ZString {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Borrow<[u8]> for ZString {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for ZString {
    fn from(s: &str) -> Self {
        ZString::new(s)
    }
}

impl From<String> for ZString {
    fn from(s: String) -> Self {
        ZString::new(s)
    }
}

impl From<&String> for ZString {
    fn from(s: &String) -> Self {
        ZString::new(s)
    }
}

impl From<&[u8]> for ZString {
    fn from(bytes: &[u8]) -> Self {
        ZString::new(bytes)
    }
}

impl From<Vec<u8>> for ZString {
    fn from(bytes: Vec<u8>) -> Self {
        ZString::new(bytes)
    }
}

impl PartialEq<str> for ZString {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for ZString {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl fmt::Display for ZString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for ZString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.0))
    }
}
