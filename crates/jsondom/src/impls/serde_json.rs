//! Conversion and comparison against `serde_json::Value`.

use jsondom_alloc::ResourceHandle;
use serde_json::Value as SerdeValue;

use crate::array::Array;
use crate::error::{Error, Result};
use crate::object::Object;
use crate::string;
use crate::value::{Repr, Value};

impl Value {
    /// Deep-convert a `serde_json::Value`, allocating from `handle`.
    ///
    /// Numbers keep their kind: unsigned 64-bit integers that do not fit
    /// `i64` become `u64`, everything else integral becomes `i64`, the rest
    /// become doubles.
    pub fn from_serde_in(value: &SerdeValue, handle: ResourceHandle) -> Result<Value> {
        Ok(match value {
            SerdeValue::Null => Value::null_in(handle),
            SerdeValue::Bool(b) => Value::bool_in(*b, handle),
            SerdeValue::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Value::int64_in(v, handle)
                } else if let Some(v) = n.as_u64() {
                    Value::uint64_in(v, handle)
                } else if let Some(v) = n.as_f64() {
                    Value::float64_in(v, handle)
                } else {
                    return Err(Error::NotNumber);
                }
            }
            SerdeValue::String(s) => Value::from(string::String::from_str_in(s, handle)?),
            SerdeValue::Array(items) => {
                let mut array = Array::with_capacity_in(items.len(), handle)?;
                for item in items {
                    let converted = Value::from_serde_in(item, array.storage().clone())?;
                    array.push(converted)?;
                }
                Value::from(array)
            }
            SerdeValue::Object(map) => {
                let mut object = Object::with_capacity_in(map.len(), handle)?;
                for (key, item) in map {
                    let converted = Value::from_serde_in(item, object.storage().clone())?;
                    object.try_insert(key, converted)?;
                }
                Value::from(object)
            }
        })
    }
}

impl TryFrom<&SerdeValue> for Value {
    type Error = Error;

    fn try_from(value: &SerdeValue) -> Result<Value> {
        Value::from_serde_in(value, ResourceHandle::default())
    }
}

impl PartialEq<SerdeValue> for Value {
    fn eq(&self, other: &SerdeValue) -> bool {
        eq(self, other)
    }
}

impl PartialEq<Value> for SerdeValue {
    fn eq(&self, other: &Value) -> bool {
        eq(other, self)
    }
}

fn eq(lhs: &Value, rhs: &SerdeValue) -> bool {
    match (lhs.repr(), rhs) {
        (Repr::Null, SerdeValue::Null) => true,
        (Repr::Bool(l), SerdeValue::Bool(r)) => l == *r,
        (Repr::Int64(l), SerdeValue::Number(r)) => r.as_i64() == Some(l),
        (Repr::UInt64(l), SerdeValue::Number(r)) => r.as_u64() == Some(l),
        (Repr::Float64(l), SerdeValue::Number(r)) => r.is_f64() && r.as_f64() == Some(l),
        (Repr::String(l), SerdeValue::String(r)) => l.as_bytes() == r.as_bytes(),
        (Repr::Array(l), SerdeValue::Array(r)) => {
            l.len() == r.len() && l.iter().zip(r.iter()).all(|(lv, rv)| eq(lv, rv))
        }
        (Repr::Object(l), SerdeValue::Object(r)) => {
            l.len() == r.len()
                && l.iter()
                    .all(|(key, lv)| r.get(key).is_some_and(|rv| eq(lv, rv)))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!(null); "null")]
    #[test_case(json!(true); "bool")]
    #[test_case(json!(42); "positive int")]
    #[test_case(json!(-42); "negative int")]
    #[test_case(json!(18446744073709551615u64); "u64 range int")]
    #[test_case(json!(3.25); "double")]
    #[test_case(json!("text"); "string")]
    #[test_case(json!([1, [2, "x"], null]); "array")]
    #[test_case(json!({"a": 1, "b": {"c": [true]}}); "object")]
    fn conversion_round_trips_structurally(source: SerdeValue) {
        let converted = Value::try_from(&source).unwrap();
        assert_eq!(converted, source);
        assert_eq!(source, converted);
    }

    #[test]
    fn kind_mismatches_do_not_compare_equal() {
        assert_ne!(Value::from(1.0f64), json!(1));
        assert_ne!(Value::from(1i64), json!(1.0));
        assert_ne!(Value::from(true), json!(1));
    }

    #[test]
    fn parsed_documents_agree_with_serde_json() {
        let doc = r#"{"nums":[0, -7, 1.5e3],"s":"é","deep":{"empty":{}}}"#;
        let ours = crate::parse(doc).unwrap();
        let theirs: SerdeValue = serde_json::from_str(doc).unwrap();
        assert_eq!(ours, theirs);
    }
}
