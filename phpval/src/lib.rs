//! phpval: dynamic values for embedding in a host interpreter
//!
//! Reference-counted values with copy-on-write arrays whose integer and
//! string key spaces are unified the way the host's arrays are.

pub mod array;
pub mod config;
pub mod error;
pub mod function;
pub mod key;
pub mod string;
pub mod symbols;
pub mod value;

pub use array::{Array, Iter, SlotMut, SlotRef};
pub use config::Config;
pub use error::{ConfigError, Result, ValueError};
pub use function::Function;
pub use key::{IntoKey, Key, parse_canonical_int};
pub use string::ZString;
pub use symbols::SymbolTable;
pub use value::{Object, Reference, Resource, Type, Value, double_to_long};
