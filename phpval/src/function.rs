//! Native function shape
//!
//! Registration layers only need one stable signature from this crate: a
//! handler receives the call arguments as an [`Array`] and produces a
//! [`Value`].

use crate::array::Array;
use crate::error::Result;
use crate::string::ZString;
use crate::value::Value;
use std::fmt;
use std::rc::Rc;

/// Handler signature for native functions
pub type Handler = dyn Fn(&Array) -> Result<Value>;

/// Named native function
#[derive(Clone)]
pub struct Function {
    name: ZString,
    handler: Rc<Handler>,
}

impl Function {
    pub fn new(
        name: impl Into<ZString>,
        handler: impl Fn(&Array) -> Result<Value> + 'static,
    ) -> Self {
        Function {
            name: name.into(),
            handler: Rc::new(handler),
        }
    }

    pub fn name(&self) -> &ZString {
        &self.name
    }

    pub fn call(&self, args: &Array) -> Result<Value> {
        log::trace!("calling {} with {} argument(s)", self.name, args.len());
        (self.handler)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({})", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValueError;
    use crate::value::Type;

    fn count(args: &Array) -> Result<Value> {
        let first = args.get(0)?.unwrap_or_default();
        let array = first.expect_array()?;
        Ok(Value::from(array.len() as i64))
    }

    #[test]
    fn test_call() {
        let f = Function::new("count", count);
        let args = Array::from(vec![Value::from(vec![1, 2, 3])]);
        assert_eq!(f.call(&args).unwrap(), Value::Int(3));
        assert_eq!(f.name(), "count");
    }

    #[test]
    fn test_call_propagates_errors() {
        let f = Function::new("count", count);
        let args = Array::from(vec!["not an array"]);
        assert_eq!(
            f.call(&args).unwrap_err(),
            ValueError::type_mismatch(Type::Array, Type::String)
        );
    }

    #[test]
    fn test_closure_handler() {
        let greeting = Value::from("hello");
        let f = Function::new("greet", move |_| Ok(greeting.clone()));
        assert_eq!(f.call(&Array::new()).unwrap(), Value::from("hello"));
        assert_eq!(format!("{f:?}"), "Function(greet)");
    }
}
