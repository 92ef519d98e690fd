//! Object and resource payloads
//!
//! Objects are handles: copying a `Value` that holds an object shares the
//! same instance, there is no copy-on-write. Resources are opaque host
//! handles identified by an integer.

use crate::array::Array;
use crate::error::Result;
use crate::key::IntoKey;
use crate::string::ZString;
use super::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

struct ObjectData {
    class_name: ZString,
    properties: RefCell<Array>,
}

/// Shared object instance
#[derive(Clone)]
pub struct Object(Rc<ObjectData>);

impl Object {
    pub fn new(class_name: impl Into<ZString>) -> Self {
        Self::with_properties(class_name, Array::new())
    }

    pub fn with_properties(class_name: impl Into<ZString>, properties: Array) -> Self {
        Object(Rc::new(ObjectData {
            class_name: class_name.into(),
            properties: RefCell::new(properties),
        }))
    }

    pub fn class_name(&self) -> &ZString {
        &self.0.class_name
    }

    pub fn get(&self, name: impl IntoKey) -> Result<Option<Value>> {
        self.0.properties.borrow().get(name)
    }

    /// Assign a property, returning the previous value
    pub fn set(&self, name: impl IntoKey, value: impl Into<Value>) -> Result<Option<Value>> {
        self.0.properties.borrow_mut().insert(name, value)
    }

    pub fn unset(&self, name: impl IntoKey) -> Result<()> {
        self.0.properties.borrow_mut().unset(name)
    }

    /// Copy-on-write view of the property table
    pub fn properties(&self) -> Array {
        self.0.properties.borrow().clone()
    }

    pub fn property_count(&self) -> usize {
        self.0.properties.borrow().len()
    }

    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Identity of the instance, for cycle detection
    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({})", self.0.class_name)
    }
}

struct ResourceData {
    handle: i64,
    kind: ZString,
}

/// Opaque host resource (file handle, connection, ...)
#[derive(Clone)]
pub struct Resource(Rc<ResourceData>);

impl Resource {
    pub fn new(handle: i64, kind: impl Into<ZString>) -> Self {
        Resource(Rc::new(ResourceData {
            handle,
            kind: kind.into(),
        }))
    }

    pub fn handle(&self) -> i64 {
        self.0.handle
    }

    pub fn kind(&self) -> &ZString {
        &self.0.kind
    }

    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.0.handle == other.0.handle
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Resource(#{} {})", self.0.handle, self.0.kind)
    }
}
