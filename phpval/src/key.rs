//! Array keys and key-space normalization
//!
//! An array has two key spaces, integers and strings, but a string that is
//! the exact decimal form of an `i64` is always stored as the integer. The
//! rule has to match the host interpreter bit for bit: `"0"` and `"-7"` are
//! integers, while `"08"`, `"-0"`, `"+1"` and `" 1"` stay strings.

use crate::error::Result;
use crate::string::ZString;
use crate::value::Value;
use std::fmt;

/// Normalized array key
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Int(i64),
    /// Never holds a canonical integer string once normalized
    Str(ZString),
}

/// Parse `bytes` as a canonical integer string.
///
/// Accepts `-?[1-9][0-9]*` and the literal `"0"` when the value fits in an
/// `i64` (so `"-9223372036854775808"` is accepted and one past either end is
/// not).
pub fn parse_canonical_int(bytes: &[u8]) -> Option<i64> {
    let (negative, digits) = match bytes {
        [b'-', rest @ ..] => (true, rest),
        _ => (false, bytes),
    };

    match digits {
        [] => return None,
        [b'0'] if !negative => return Some(0),
        [b'0', ..] => return None,
        _ => {}
    }

    let mut magnitude: u64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return None;
        }
        magnitude = magnitude
            .checked_mul(10)?
            .checked_add(u64::from(b - b'0'))?;
    }

    if negative {
        if magnitude > i64::MAX as u64 + 1 {
            return None;
        }
        Some((magnitude as i64).wrapping_neg())
    } else {
        i64::try_from(magnitude).ok()
    }
}

impl Key {
    /// Build a key from string bytes, redirecting canonical integers
    pub fn from_zstring(s: ZString) -> Key {
        match parse_canonical_int(s.as_bytes()) {
            Some(n) => Key::Int(n),
            None => Key::Str(s),
        }
    }

    /// Re-run normalization on a key that may have been built by hand
    pub fn normalize(self) -> Key {
        match self {
            Key::Str(s) => Key::from_zstring(s),
            int => int,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Key::Int(n) => Some(*n),
            Key::Str(_) => None,
        }
    }

    pub fn as_zstring(&self) -> Option<&ZString> {
        match self {
            Key::Str(s) => Some(s),
            Key::Int(_) => None,
        }
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Key::Int(_))
    }

    /// Key as a Value (`Int` or `String`)
    pub fn to_value(&self) -> Value {
        match self {
            Key::Int(n) => Value::Int(*n),
            Key::Str(s) => Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(n) => write!(f, "{n}"),
            Key::Str(s) => write!(f, "{s}"),
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(n) => write!(f, "{n}"),
            Key::Str(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Int(n)
    }
}

impl From<ZString> for Key {
    fn from(s: ZString) -> Self {
        Key::from_zstring(s)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::from_zstring(ZString::from(s))
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::from_zstring(ZString::from(s))
    }
}

/// Anything that can be coerced into a normalized array key.
///
/// Only value-typed sources can fail (`IllegalKeyType` for arrays and
/// objects, `ReferenceDepth` for reference cycles).
pub trait IntoKey: Sized {
    fn into_key(self) -> Result<Key>;

    /// Like [`into_key`](Self::into_key), following at most `limit`
    /// reference cells. Only value-typed sources have cells to follow.
    fn into_key_with(self, limit: usize) -> Result<Key> {
        let _ = limit;
        self.into_key()
    }
}

impl IntoKey for Key {
    fn into_key(self) -> Result<Key> {
        Ok(self.normalize())
    }
}

impl IntoKey for &Key {
    fn into_key(self) -> Result<Key> {
        Ok(self.clone().normalize())
    }
}

macro_rules! int_into_key {
    ($($t:ty),*) => {
        $(
            impl IntoKey for $t {
                fn into_key(self) -> Result<Key> {
                    Ok(Key::Int(i64::from(self)))
                }
            }
        )*
    };
}

int_into_key!(i8, i16, i32, i64, u8, u16, u32);

impl IntoKey for &str {
    fn into_key(self) -> Result<Key> {
        Ok(Key::from(self))
    }
}

impl IntoKey for String {
    fn into_key(self) -> Result<Key> {
        Ok(Key::from(self))
    }
}

impl IntoKey for &String {
    fn into_key(self) -> Result<Key> {
        Ok(Key::from(self.as_str()))
    }
}

impl IntoKey for ZString {
    fn into_key(self) -> Result<Key> {
        Ok(Key::from_zstring(self))
    }
}

impl IntoKey for &ZString {
    fn into_key(self) -> Result<Key> {
        Ok(Key::from_zstring(self.clone()))
    }
}

impl IntoKey for &Value {
    fn into_key(self) -> Result<Key> {
        self.to_key()
    }

    fn into_key_with(self, limit: usize) -> Result<Key> {
        self.to_key_with(limit)
    }
}

impl IntoKey for Value {
    fn into_key(self) -> Result<Key> {
        self.to_key()
    }

    fn into_key_with(self, limit: usize) -> Result<Key> {
        self.to_key_with(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_integers() {
        assert_eq!(parse_canonical_int(b"0"), Some(0));
        assert_eq!(parse_canonical_int(b"42"), Some(42));
        assert_eq!(parse_canonical_int(b"-7"), Some(-7));
        assert_eq!(
            parse_canonical_int(b"9223372036854775807"),
            Some(i64::MAX)
        );
        assert_eq!(
            parse_canonical_int(b"-9223372036854775808"),
            Some(i64::MIN)
        );
    }

    #[test]
    fn test_non_canonical_strings() {
        for s in [
            "", "-", "08", "042", "-0", "-01", "+1", " 1", "1 ", "1.0", "1e3", "0x1", "abc",
            "9223372036854775808", "-9223372036854775809", "99999999999999999999",
        ] {
            assert_eq!(parse_canonical_int(s.as_bytes()), None, "{s:?}");
        }
    }

    #[test]
    fn test_key_normalization() {
        assert_eq!(Key::from("42"), Key::Int(42));
        assert_eq!(Key::from("-0"), Key::Str(ZString::from("-0")));
        assert_eq!(Key::Str(ZString::from("17")).normalize(), Key::Int(17));
    }

    #[test]
    fn test_into_key_for_primitives() {
        assert_eq!(3i32.into_key().unwrap(), Key::Int(3));
        assert_eq!(7u8.into_key().unwrap(), Key::Int(7));
        assert_eq!("x".into_key().unwrap(), Key::Str(ZString::from("x")));
        assert_eq!(String::from("5").into_key().unwrap(), Key::Int(5));
    }

    #[test]
    fn test_into_key_with_limit() {
        use crate::error::ValueError;
        use crate::value::Reference;

        let chain = Value::Reference(Reference::new(Value::Reference(Reference::new("k"))));
        assert_eq!(chain.clone().into_key_with(2).unwrap(), Key::from("k"));
        assert_eq!((&chain).into_key_with(1), Err(ValueError::reference_depth(1)));
        assert_eq!("k".into_key_with(0).unwrap(), Key::from("k"));
    }

    #[test]
    fn test_key_display() {
        assert_eq!(Key::Int(-3).to_string(), "-3");
        assert_eq!(Key::from("name").to_string(), "name");
    }

    #[test]
    fn test_key_to_value() {
        assert_eq!(Key::Int(1).to_value(), Value::Int(1));
        assert_eq!(Key::from("a").to_value(), Value::from("a"));
    }
}
