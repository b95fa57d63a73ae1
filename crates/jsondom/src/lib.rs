//! # jsondom
//!
//! A JSON document model with an incremental parser, a pull-mode
//! serializer, and pluggable memory resources.
//!
//! The in-memory model is a tagged [`Value`] over null, bool, `i64`, `u64`,
//! `f64`, [`String`], [`Array`] and [`Object`]. Objects keep their entries
//! in insertion order while answering keyed lookups in expected constant
//! time through a hashed index. Every value carries a [`ResourceHandle`]
//! deciding where its memory comes from: the process-wide heap by default,
//! or a user resource such as the [`MonotonicResource`] arena, which frees
//! everything at once when dropped.
//!
//! Bytes flow in through the resumable [`Parser`], which can be fed any
//! number of chunks and emits structural events to a [`Handler`];
//! [`ValueBuilder`] is the handler that assembles a document. Bytes flow
//! out through the [`Serializer`], which fills caller-supplied buffers on
//! demand. The one-shot [`parse`] and [`to_string`] front-ends compose the
//! two.
//!
//! ```
//! use jsondom::{parse_in, to_string, MonotonicResource, ResourceHandle};
//!
//! # fn main() -> jsondom::Result<()> {
//! let arena = ResourceHandle::new(MonotonicResource::new());
//! let doc = parse_in(r#"{"pi": 3.14, "tags": ["a", "b"]}"#, arena)?;
//! assert_eq!(doc.as_object()?["tags"].as_array()?.len(), 2);
//! assert_eq!(to_string(&doc)?, r#"{"pi":3.14,"tags":["a","b"]}"#);
//! # Ok(())
//! # }
//! ```

mod array;
mod error;
mod impls;
mod object;
mod parse;
mod parser;
mod serializer;
mod string;
mod value;

pub use jsondom_alloc::{
    AllocError, HeapResource, MemoryResource, MonotonicResource, ResourceHandle,
};

pub use array::Array;
pub use error::{Error, Result};
pub use object::{Iter as ObjectIter, IterMut as ObjectIterMut, KeyValuePair, Object};
pub use parse::{parse, parse_in, parse_with_options, ValueBuilder};
pub use parser::{Handler, ParseOptions, Parser};
pub use serializer::{to_string, to_vec, Serializer};
pub use string::String;
pub use value::{Kind, Value};
