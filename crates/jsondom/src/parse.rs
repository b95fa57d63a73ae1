//! Building [`Value`] trees from parser events.

use jsondom_alloc::ResourceHandle;

use crate::array::Array;
use crate::error::{Error, Result};
use crate::object::Object;
use crate::parser::{Handler, ParseOptions, Parser};
use crate::string;
use crate::value::Value;

enum Node {
    Array(Array),
    Object {
        object: Object,
        pending_key: Option<std::string::String>,
    },
}

/// An event handler that assembles a [`Value`] tree on a chosen resource.
///
/// Containers nest through an explicit stack; strings and keys accumulate
/// their `*_part` prefixes in a scratch buffer until the completing event
/// arrives. Duplicate object keys are resolved first-occurrence-wins.
pub struct ValueBuilder {
    handle: ResourceHandle,
    stack: Vec<Node>,
    scratch: std::string::String,
    root: Option<Value>,
}

impl ValueBuilder {
    pub fn new(handle: ResourceHandle) -> Self {
        Self {
            handle,
            stack: Vec::new(),
            scratch: std::string::String::new(),
            root: None,
        }
    }

    /// The finished document. Fails with [`Error::Incomplete`] when no
    /// complete top-level value was delivered.
    pub fn into_value(self) -> Result<Value> {
        self.root.ok_or(Error::Incomplete)
    }

    fn place(&mut self, value: Value) -> Result<()> {
        match self.stack.last_mut() {
            None => self.root = Some(value),
            Some(Node::Array(array)) => array.push(value)?,
            Some(Node::Object {
                object,
                pending_key,
            }) => {
                let key = pending_key.take().ok_or(Error::Syntax)?;
                // keep the first occurrence, drop the newcomer
                object.try_insert(&key, value)?;
            }
        }
        Ok(())
    }
}

impl Handler for ValueBuilder {
    fn on_object_begin(&mut self) -> Result<()> {
        self.stack.push(Node::Object {
            object: Object::new_in(self.handle.clone()),
            pending_key: None,
        });
        Ok(())
    }

    fn on_object_end(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Node::Object { object, .. }) => self.place(Value::from(object)),
            _ => Err(Error::Syntax),
        }
    }

    fn on_array_begin(&mut self) -> Result<()> {
        self.stack.push(Node::Array(Array::new_in(self.handle.clone())));
        Ok(())
    }

    fn on_array_end(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Node::Array(array)) => self.place(Value::from(array)),
            _ => Err(Error::Syntax),
        }
    }

    fn on_key_part(&mut self, key: &str) -> Result<()> {
        self.scratch.push_str(key);
        Ok(())
    }

    fn on_key(&mut self, key: &str) -> Result<()> {
        self.scratch.push_str(key);
        let full = std::mem::take(&mut self.scratch);
        match self.stack.last_mut() {
            Some(Node::Object { pending_key, .. }) => {
                *pending_key = Some(full);
                Ok(())
            }
            _ => Err(Error::Syntax),
        }
    }

    fn on_string_part(&mut self, value: &str) -> Result<()> {
        self.scratch.push_str(value);
        Ok(())
    }

    fn on_string(&mut self, value: &str) -> Result<()> {
        self.scratch.push_str(value);
        let s = string::String::from_str_in(&self.scratch, self.handle.clone())?;
        self.scratch.clear();
        self.place(Value::from(s))
    }

    fn on_int64(&mut self, value: i64) -> Result<()> {
        self.place(Value::int64_in(value, self.handle.clone()))
    }

    fn on_uint64(&mut self, value: u64) -> Result<()> {
        self.place(Value::uint64_in(value, self.handle.clone()))
    }

    fn on_double(&mut self, value: f64) -> Result<()> {
        self.place(Value::float64_in(value, self.handle.clone()))
    }

    fn on_bool(&mut self, value: bool) -> Result<()> {
        self.place(Value::bool_in(value, self.handle.clone()))
    }

    fn on_null(&mut self) -> Result<()> {
        self.place(Value::null_in(self.handle.clone()))
    }
}

/// Parse a complete document on the default resource.
pub fn parse(input: impl AsRef<[u8]>) -> Result<Value> {
    parse_in(input, ResourceHandle::default())
}

/// Parse a complete document, allocating everything from `handle`.
pub fn parse_in(input: impl AsRef<[u8]>, handle: ResourceHandle) -> Result<Value> {
    parse_with_options(input, handle, ParseOptions::default())
}

/// Parse a complete document with explicit [`ParseOptions`].
pub fn parse_with_options(
    input: impl AsRef<[u8]>,
    handle: ResourceHandle,
    options: ParseOptions,
) -> Result<Value> {
    let mut parser = Parser::with_options(ValueBuilder::new(handle), options);
    parser.write_some(input.as_ref())?;
    parser.finish()?;
    parser.into_handler().into_value()
}
