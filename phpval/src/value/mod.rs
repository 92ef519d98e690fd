//! Dynamic values
//!
//! `Value` is a closed tagged union. Scalars are stored inline and copied;
//! strings, arrays, objects, resources and reference cells are `Rc` handles,
//! so cloning a `Value` only bumps a count. Arrays add copy-on-write on top
//! of that (see [`Array`]).

mod codec;
mod object;
mod recursion;
mod reference;

pub use object::{Object, Resource};
pub use reference::Reference;

use crate::array::Array;
use crate::config::DEFAULT_MAX_REFERENCE_DEPTH;
use crate::error::{Result, ValueError};
use crate::key::Key;
use crate::string::ZString;
use std::fmt;

/// Discriminant of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    Undefined,
    Null,
    Bool,
    Int,
    Double,
    String,
    Array,
    Object,
    Resource,
    Reference,
}

impl Type {
    pub fn name(self) -> &'static str {
        match self {
            Type::Undefined => "undefined",
            Type::Null => "null",
            Type::Bool => "bool",
            Type::Int => "int",
            Type::Double => "double",
            Type::String => "string",
            Type::Array => "array",
            Type::Object => "object",
            Type::Resource => "resource",
            Type::Reference => "reference",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runtime value
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Declared but never written
    Undefined,
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(ZString),
    Array(Array),
    Object(Object),
    Resource(Resource),
    Reference(Reference),
}

/// Convert a double to an integer the way the host does for array offsets:
/// truncate toward zero, wrap modulo 2^64 when out of range, and map NaN and
/// infinities to 0.
pub fn double_to_long(d: f64) -> i64 {
    const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
    const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

    if !d.is_finite() {
        return 0;
    }
    if (-TWO_POW_63..TWO_POW_63).contains(&d) {
        return d as i64;
    }

    let mut dmod = d % TWO_POW_64;
    if dmod < 0.0 {
        dmod += TWO_POW_64;
    }
    (dmod as u64) as i64
}

// ── Type checks ──────────────────────────────────────────────────────────────

impl Value {
    /// The discriminant, without following references
    pub fn type_of(&self) -> Type {
        match self {
            Value::Undefined => Type::Undefined,
            Value::Null => Type::Null,
            Value::Bool(_) => Type::Bool,
            Value::Int(_) => Type::Int,
            Value::Double(_) => Type::Double,
            Value::String(_) => Type::String,
            Value::Array(_) => Type::Array,
            Value::Object(_) => Type::Object,
            Value::Resource(_) => Type::Resource,
            Value::Reference(_) => Type::Reference,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Value::Reference(_))
    }

    /// Whether the payload is shared through a reference count
    pub fn is_refcounted(&self) -> bool {
        self.ref_count().is_some()
    }

    /// Holder count of a sharable payload; `None` for scalars
    pub fn ref_count(&self) -> Option<usize> {
        match self {
            Value::String(s) => Some(s.ref_count()),
            Value::Array(a) => Some(a.ref_count()),
            Value::Object(o) => Some(o.ref_count()),
            Value::Resource(r) => Some(r.ref_count()),
            Value::Reference(r) => Some(r.ref_count()),
            _ => None,
        }
    }
}

// ── Extraction ───────────────────────────────────────────────────────────────

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_zstring(&self) -> Option<&ZString> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// String payload as `&str` when it is valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        self.as_zstring().and_then(ZString::to_str)
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            Value::Resource(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Value::Reference(r) => Some(r),
            _ => None,
        }
    }

    /// Borrow the array payload or fail with `TypeMismatch`
    pub fn expect_array(&self) -> Result<&Array> {
        match self {
            Value::Array(a) => Ok(a),
            other => Err(ValueError::type_mismatch(Type::Array, other.type_of())),
        }
    }

    /// Mutable access to the array payload.
    ///
    /// A reference cell cannot hand out a plain `&mut`; go through
    /// [`Reference::with_mut`] for arrays stored behind a reference.
    pub fn expect_array_mut(&mut self) -> Result<&mut Array> {
        match self {
            Value::Array(a) => Ok(a),
            other => Err(ValueError::type_mismatch(Type::Array, other.type_of())),
        }
    }
}

// ── Dereference and key coercion ─────────────────────────────────────────────

impl Value {
    /// Follow reference cells to the aliased value
    pub fn dereferenced(&self) -> Result<Value> {
        self.dereferenced_with(DEFAULT_MAX_REFERENCE_DEPTH)
    }

    /// Follow at most `limit` reference cells. A longer chain (in practice a
    /// cycle) fails with `ReferenceDepth`.
    pub fn dereferenced_with(&self, limit: usize) -> Result<Value> {
        let Value::Reference(cell) = self else {
            return Ok(self.clone());
        };
        if limit == 0 {
            return Err(ValueError::reference_depth(limit));
        }

        let mut current = cell.get();
        let mut depth = 1;
        while let Value::Reference(next) = &current {
            if depth >= limit {
                log::warn!("reference chain exceeds {limit} levels, giving up");
                return Err(ValueError::reference_depth(limit));
            }
            let target = next.get();
            current = target;
            depth += 1;
        }
        Ok(current)
    }

    /// Coerce into an array key
    pub fn to_key(&self) -> Result<Key> {
        self.to_key_with(DEFAULT_MAX_REFERENCE_DEPTH)
    }

    /// Coerce into an array key, following at most `limit` reference cells.
    ///
    /// Coercion always looks at the fully dereferenced value.
    pub fn to_key_with(&self, limit: usize) -> Result<Key> {
        let target = self.dereferenced_with(limit)?;
        match &target {
            Value::String(s) => Ok(Key::from_zstring(s.clone())),
            Value::Int(n) => Ok(Key::Int(*n)),
            Value::Double(d) => Ok(Key::Int(double_to_long(*d))),
            Value::Bool(b) => Ok(Key::Int(i64::from(*b))),
            Value::Null | Value::Undefined => Ok(Key::Str(ZString::empty())),
            Value::Resource(r) => Ok(Key::Int(r.handle())),
            Value::Array(_) | Value::Object(_) | Value::Reference(_) => {
                Err(ValueError::illegal_key(target.type_of()))
            }
        }
    }

    /// Convert into an array the way the host's array cast does: null and
    /// undefined become empty, arrays are shared as-is, objects expose their
    /// properties, anything else becomes `[0 => value]`.
    pub fn into_array(self) -> Result<Array> {
        let value = match self {
            Value::Reference(_) => self.dereferenced()?,
            other => other,
        };
        Ok(match value {
            Value::Undefined | Value::Null => Array::new(),
            Value::Array(a) => a,
            Value::Object(o) => o.properties(),
            scalar => Array::from(vec![scalar]),
        })
    }
}

// ── Equality and display ─────────────────────────────────────────────────────

/// Strict comparison: same type and same content. Objects and references
/// compare by identity, arrays by ordered key/value pairs.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Resource(a), Value::Resource(b)) => a == b,
            (Value::Reference(a), Value::Reference(b)) => a == b,
            _ => false,
        }
    }
}

/// String conversion as the host performs it
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined | Value::Null => Ok(()),
            Value::Bool(true) => write!(f, "1"),
            Value::Bool(false) => Ok(()),
            Value::Int(n) => write!(f, "{n}"),
            Value::Double(d) if d.is_nan() => write!(f, "NAN"),
            Value::Double(d) if d.is_infinite() => {
                write!(f, "{}INF", if *d < 0.0 { "-" } else { "" })
            }
            Value::Double(d) => write!(f, "{d}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Array(_) => write!(f, "Array"),
            Value::Object(_) => write!(f, "Object"),
            Value::Resource(r) => write!(f, "Resource id #{}", r.handle()),
            Value::Reference(_) => match self.dereferenced() {
                Ok(target) => write!(f, "{target}"),
                Err(_) => write!(f, "*RECURSION*"),
            },
        }
    }
}

// ── Construction ─────────────────────────────────────────────────────────────

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! int_into_value {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Int(i64::from(n))
                }
            }
        )*
    };
}

int_into_value!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(ZString::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(ZString::from(s))
    }
}

impl From<ZString> for Value {
    fn from(s: ZString) -> Self {
        Value::String(s)
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Self {
        Value::Array(a)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<Resource> for Value {
    fn from(r: Resource) -> Self {
        Value::Resource(r)
    }
}

impl From<Reference> for Value {
    fn from(r: Reference) -> Self {
        Value::Reference(r)
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        key.to_value()
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(Array::from(items))
    }
}
