//! The tagged value at the heart of the document model.

use std::fmt;

use jsondom_alloc::ResourceHandle;
use num_cmp::NumCmp;

use crate::array::Array;
use crate::error::{Error, Result};
use crate::object::Object;
use crate::string;

/// The dynamic type tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Bool,
    Int64,
    UInt64,
    Float64,
    String,
    Array,
    Object,
}

/// A JSON value: exactly one of the eight kinds at all times.
///
/// Every value — scalars included — carries the [`ResourceHandle`] it was
/// constructed with, and all heap children allocated by the value use that
/// same handle. Moving a `Value` is a plain bitwise move; copying across
/// resources is the explicit, fallible [`clone_in`](Value::clone_in).
pub struct Value {
    inner: Inner,
}

enum Inner {
    Null(ResourceHandle),
    Bool(bool, ResourceHandle),
    Int64(i64, ResourceHandle),
    UInt64(u64, ResourceHandle),
    Float64(f64, ResourceHandle),
    String(string::String),
    Array(Array),
    Object(Object),
}

/// Borrowed view of a value's payload, used by the serializer and the
/// comparison code so they can match without touching handles.
pub(crate) enum Repr<'a> {
    Null,
    Bool(bool),
    Int64(i64),
    UInt64(u64),
    Float64(f64),
    String(&'a string::String),
    Array(&'a Array),
    Object(&'a Object),
}

impl Value {
    /// A null value on the default resource.
    pub fn null() -> Self {
        Self::null_in(ResourceHandle::default())
    }

    /// A null value on the given resource.
    pub fn null_in(handle: ResourceHandle) -> Self {
        Self {
            inner: Inner::Null(handle),
        }
    }

    pub fn bool_in(value: bool, handle: ResourceHandle) -> Self {
        Self {
            inner: Inner::Bool(value, handle),
        }
    }

    pub fn int64_in(value: i64, handle: ResourceHandle) -> Self {
        Self {
            inner: Inner::Int64(value, handle),
        }
    }

    pub fn uint64_in(value: u64, handle: ResourceHandle) -> Self {
        Self {
            inner: Inner::UInt64(value, handle),
        }
    }

    pub fn float64_in(value: f64, handle: ResourceHandle) -> Self {
        Self {
            inner: Inner::Float64(value, handle),
        }
    }

    /// Copy `text` into a string value on `handle`.
    pub fn string_in(text: &str, handle: ResourceHandle) -> Result<Self> {
        Ok(Self::from(string::String::from_str_in(text, handle)?))
    }

    pub fn kind(&self) -> Kind {
        match &self.inner {
            Inner::Null(_) => Kind::Null,
            Inner::Bool(..) => Kind::Bool,
            Inner::Int64(..) => Kind::Int64,
            Inner::UInt64(..) => Kind::UInt64,
            Inner::Float64(..) => Kind::Float64,
            Inner::String(_) => Kind::String,
            Inner::Array(_) => Kind::Array,
            Inner::Object(_) => Kind::Object,
        }
    }

    /// The resource this value (and every heap child of it) allocates from.
    pub fn storage(&self) -> &ResourceHandle {
        match &self.inner {
            Inner::Null(handle)
            | Inner::Bool(_, handle)
            | Inner::Int64(_, handle)
            | Inner::UInt64(_, handle)
            | Inner::Float64(_, handle) => handle,
            Inner::String(s) => s.storage(),
            Inner::Array(a) => a.storage(),
            Inner::Object(o) => o.storage(),
        }
    }

    pub(crate) fn repr(&self) -> Repr<'_> {
        match &self.inner {
            Inner::Null(_) => Repr::Null,
            Inner::Bool(b, _) => Repr::Bool(*b),
            Inner::Int64(v, _) => Repr::Int64(*v),
            Inner::UInt64(v, _) => Repr::UInt64(*v),
            Inner::Float64(v, _) => Repr::Float64(*v),
            Inner::String(s) => Repr::String(s),
            Inner::Array(a) => Repr::Array(a),
            Inner::Object(o) => Repr::Object(o),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self.inner, Inner::Null(_))
    }

    pub fn is_bool(&self) -> bool {
        matches!(self.inner, Inner::Bool(..))
    }

    pub fn is_i64(&self) -> bool {
        matches!(self.inner, Inner::Int64(..))
    }

    pub fn is_u64(&self) -> bool {
        matches!(self.inner, Inner::UInt64(..))
    }

    pub fn is_f64(&self) -> bool {
        matches!(self.inner, Inner::Float64(..))
    }

    pub fn is_number(&self) -> bool {
        matches!(
            self.inner,
            Inner::Int64(..) | Inner::UInt64(..) | Inner::Float64(..)
        )
    }

    pub fn is_string(&self) -> bool {
        matches!(self.inner, Inner::String(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.inner, Inner::Array(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self.inner, Inner::Object(_))
    }

    /// Nothing, or [`Error::NotNull`] for any other kind.
    pub fn as_null(&self) -> Result<()> {
        match self.inner {
            Inner::Null(_) => Ok(()),
            _ => Err(Error::NotNull),
        }
    }

    /// The bool payload, or [`Error::NotBool`].
    pub fn as_bool(&self) -> Result<bool> {
        match self.inner {
            Inner::Bool(b, _) => Ok(b),
            _ => Err(Error::NotBool),
        }
    }

    /// The `i64` payload, or [`Error::NotNumber`] for any other kind.
    pub fn as_i64(&self) -> Result<i64> {
        match self.inner {
            Inner::Int64(v, _) => Ok(v),
            _ => Err(Error::NotNumber),
        }
    }

    /// The `u64` payload, or [`Error::NotNumber`] for any other kind.
    pub fn as_u64(&self) -> Result<u64> {
        match self.inner {
            Inner::UInt64(v, _) => Ok(v),
            _ => Err(Error::NotNumber),
        }
    }

    /// The `f64` payload, or [`Error::NotNumber`] for any other kind.
    pub fn as_f64(&self) -> Result<f64> {
        match self.inner {
            Inner::Float64(v, _) => Ok(v),
            _ => Err(Error::NotNumber),
        }
    }

    pub fn as_string(&self) -> Result<&string::String> {
        match &self.inner {
            Inner::String(s) => Ok(s),
            _ => Err(Error::NotString),
        }
    }

    pub fn as_string_mut(&mut self) -> Result<&mut string::String> {
        match &mut self.inner {
            Inner::String(s) => Ok(s),
            _ => Err(Error::NotString),
        }
    }

    pub fn as_array(&self) -> Result<&Array> {
        match &self.inner {
            Inner::Array(a) => Ok(a),
            _ => Err(Error::NotArray),
        }
    }

    pub fn as_array_mut(&mut self) -> Result<&mut Array> {
        match &mut self.inner {
            Inner::Array(a) => Ok(a),
            _ => Err(Error::NotArray),
        }
    }

    pub fn as_object(&self) -> Result<&Object> {
        match &self.inner {
            Inner::Object(o) => Ok(o),
            _ => Err(Error::NotObject),
        }
    }

    pub fn as_object_mut(&mut self) -> Result<&mut Object> {
        match &mut self.inner {
            Inner::Object(o) => Ok(o),
            _ => Err(Error::NotObject),
        }
    }

    /// Widening integer read: either integer kind, checked into `i64`.
    pub fn to_i64(&self) -> Result<i64> {
        match self.inner {
            Inner::Int64(v, _) => Ok(v),
            Inner::UInt64(v, _) => i64::try_from(v).map_err(|_| Error::IntegerOverflow),
            _ => Err(Error::NotNumber),
        }
    }

    /// Widening integer read: either integer kind, checked into `u64`.
    pub fn to_u64(&self) -> Result<u64> {
        match self.inner {
            Inner::UInt64(v, _) => Ok(v),
            Inner::Int64(v, _) => u64::try_from(v).map_err(|_| Error::IntegerOverflow),
            _ => Err(Error::NotNumber),
        }
    }

    /// Numeric read as a double; integer kinds convert (possibly lossily).
    pub fn to_f64(&self) -> Result<f64> {
        match self.inner {
            Inner::Float64(v, _) => Ok(v),
            Inner::Int64(v, _) => Ok(v as f64),
            Inner::UInt64(v, _) => Ok(v as f64),
            _ => Err(Error::NotNumber),
        }
    }

    /// Exchange the contents of two values, handles included.
    pub fn swap(&mut self, other: &mut Value) {
        std::mem::swap(self, other);
    }

    /// Deep copy onto another resource.
    pub fn clone_in(&self, handle: ResourceHandle) -> Result<Value> {
        Ok(match &self.inner {
            Inner::Null(_) => Value::null_in(handle),
            Inner::Bool(b, _) => Value::bool_in(*b, handle),
            Inner::Int64(v, _) => Value::int64_in(*v, handle),
            Inner::UInt64(v, _) => Value::uint64_in(*v, handle),
            Inner::Float64(v, _) => Value::float64_in(*v, handle),
            Inner::String(s) => Value::from(s.clone_in(handle)?),
            Inner::Array(a) => Value::from(a.clone_in(handle)?),
            Inner::Object(o) => Value::from(o.clone_in(handle)?),
        })
    }

    /// Deep copy on the same resource.
    pub fn try_clone(&self) -> Result<Value> {
        self.clone_in(self.storage().clone())
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::null()
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::bool_in(value, ResourceHandle::default())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::int64_in(value, ResourceHandle::default())
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::uint64_in(value, ResourceHandle::default())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::float64_in(value, ResourceHandle::default())
    }
}

impl From<string::String> for Value {
    /// Adopts the string together with its resource.
    fn from(value: string::String) -> Self {
        Self {
            inner: Inner::String(value),
        }
    }
}

impl From<Array> for Value {
    /// Adopts the array together with its resource.
    fn from(value: Array) -> Self {
        Self {
            inner: Inner::Array(value),
        }
    }
}

impl From<Object> for Value {
    /// Adopts the object together with its resource.
    fn from(value: Object) -> Self {
        Self {
            inner: Inner::Object(value),
        }
    }
}

impl PartialEq for Value {
    /// Structural equality. The two integer kinds compare numerically with
    /// each other; `f64` compares only with `f64`; arrays are ordered,
    /// objects are not.
    fn eq(&self, other: &Self) -> bool {
        match (self.repr(), other.repr()) {
            (Repr::Null, Repr::Null) => true,
            (Repr::Bool(a), Repr::Bool(b)) => a == b,
            (Repr::Int64(a), Repr::Int64(b)) => a == b,
            (Repr::UInt64(a), Repr::UInt64(b)) => a == b,
            (Repr::Int64(a), Repr::UInt64(b)) => NumCmp::num_eq(a, b),
            (Repr::UInt64(a), Repr::Int64(b)) => NumCmp::num_eq(a, b),
            (Repr::Float64(a), Repr::Float64(b)) => a == b,
            (Repr::String(a), Repr::String(b)) => a == b,
            (Repr::Array(a), Repr::Array(b)) => a == b,
            (Repr::Object(a), Repr::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr() {
            Repr::Null => f.write_str("null"),
            Repr::Bool(b) => fmt::Debug::fmt(&b, f),
            Repr::Int64(v) => fmt::Debug::fmt(&v, f),
            Repr::UInt64(v) => fmt::Debug::fmt(&v, f),
            Repr::Float64(v) => fmt::Debug::fmt(&v, f),
            Repr::String(s) => fmt::Debug::fmt(s, f),
            Repr::Array(a) => fmt::Debug::fmt(a, f),
            Repr::Object(o) => fmt::Debug::fmt(o, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsondom_alloc::MonotonicResource;

    #[test]
    fn kind_is_stable_after_construction() {
        assert_eq!(Value::null().kind(), Kind::Null);
        assert_eq!(Value::from(true).kind(), Kind::Bool);
        assert_eq!(Value::from(-1i64).kind(), Kind::Int64);
        assert_eq!(Value::from(1u64).kind(), Kind::UInt64);
        assert_eq!(Value::from(1.5f64).kind(), Kind::Float64);
    }

    #[test]
    fn integer_kinds_compare_numerically() {
        assert_eq!(Value::from(5i64), Value::from(5u64));
        assert_eq!(Value::from(5u64), Value::from(5i64));
        assert_ne!(Value::from(-5i64), Value::from(5u64));
        // A value fitting both kinds still reports what it was built as.
        assert!(Value::from(5i64).is_i64());
        assert!(!Value::from(5i64).is_u64());
    }

    #[test]
    fn doubles_compare_only_with_doubles() {
        assert_ne!(Value::from(1.0f64), Value::from(1i64));
        assert_eq!(Value::from(1.5f64), Value::from(1.5f64));
    }

    #[test]
    fn accessors_report_kind_mismatches() {
        let v = Value::from(true);
        assert_eq!(v.as_i64(), Err(Error::NotNumber));
        assert_eq!(v.as_bool(), Ok(true));
        assert_eq!(v.as_object().err(), Some(Error::NotObject));
        assert_eq!(Value::null().as_string().err(), Some(Error::NotString));
        assert_eq!(v.as_null(), Err(Error::NotNull));
        assert_eq!(Value::null().as_null(), Ok(()));
    }

    #[test]
    fn widening_reads_check_for_overflow() {
        assert_eq!(Value::from(u64::MAX).to_i64(), Err(Error::IntegerOverflow));
        assert_eq!(Value::from(-1i64).to_u64(), Err(Error::IntegerOverflow));
        assert_eq!(Value::from(7u64).to_i64(), Ok(7));
        assert_eq!(Value::from(7i64).to_u64(), Ok(7));
        assert_eq!(Value::from(true).to_f64(), Err(Error::NotNumber));
    }

    #[test]
    fn swap_exchanges_payload_and_handle() {
        let arena = ResourceHandle::new(MonotonicResource::new());
        let mut a = Value::int64_in(1, arena.clone());
        let mut b = Value::null();
        a.swap(&mut b);
        assert!(a.is_null());
        assert_eq!(b.as_i64(), Ok(1));
        assert_eq!(b.storage(), &arena);
        assert!(a.storage().is_default());
    }

    #[test]
    fn clone_in_rebinds_every_child() {
        let arena = ResourceHandle::new(MonotonicResource::new());
        let mut arr = Array::new_in(arena.clone());
        arr.push(Value::string_in("spilling well past the inline buffer", arena.clone()).unwrap())
            .unwrap();
        let tree = Value::from(arr);
        let copy = tree.clone_in(ResourceHandle::default()).unwrap();
        assert_eq!(copy, tree);
        assert!(copy.storage().is_default());
        assert!(copy.as_array().unwrap()[0].storage().is_default());
    }
}
