use std::fmt;

use jsondom_alloc::AllocError;

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error codes produced by parsing, serialization, and document mutation.
///
/// This is a closed set: every failure in the library maps to exactly one of
/// these codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Error {
    /// The input is not valid JSON.
    Syntax,
    /// Non-whitespace bytes followed the top-level value.
    ExtraData,
    /// The input ended before the document was complete.
    Incomplete,
    /// Reserved.
    MantissaOverflow,
    /// A number literal overflows the double range.
    NumberTooLarge,
    /// A comma or closing bracket was required.
    ExpectedComma,
    /// A colon was required after an object key.
    ExpectedColon,
    /// A string was required.
    ExpectedQuotes,
    /// A `\u` escape contained a non-hex digit.
    ExpectedHexDigit,
    /// A trailing surrogate escape had to follow, and did not.
    ExpectedUtf16Escape,
    /// An unescaped control character appeared inside a string.
    IllegalControlChar,
    /// A code unit that cannot open a surrogate pair appeared in leading
    /// position.
    IllegalLeadingSurrogate,
    /// A code unit that cannot close a surrogate pair appeared in trailing
    /// position.
    IllegalTrailingSurrogate,
    /// An unknown character followed a backslash.
    IllegalEscapeChar,
    /// Nesting exceeded the configured depth limit.
    TooDeep,
    /// The value is not a number of the requested kind.
    NotNumber,
    /// The value is not a string.
    NotString,
    /// The value is not an object.
    NotObject,
    /// The value is not an array.
    NotArray,
    /// The value is not a bool.
    NotBool,
    /// The value is not null.
    NotNull,
    /// A numeric conversion does not fit the target type.
    IntegerOverflow,
    /// An object key exceeds the maximum key size.
    KeyTooLarge,
    /// An object exceeds the maximum number of entries.
    ObjectTooLarge,
    /// An array exceeds the maximum number of elements.
    ArrayTooLarge,
    /// A string exceeds the maximum size.
    StringTooLarge,
    /// The memory resource refused an allocation.
    AllocationFailure,
}

impl Error {
    fn message(self) -> &'static str {
        match self {
            Error::Syntax => "syntax error",
            Error::ExtraData => "extra data",
            Error::Incomplete => "incomplete JSON",
            Error::MantissaOverflow => "mantissa overflow",
            Error::NumberTooLarge => "number too large",
            Error::ExpectedComma => "expected comma",
            Error::ExpectedColon => "expected colon",
            Error::ExpectedQuotes => "expected quotes",
            Error::ExpectedHexDigit => "expected hex digit",
            Error::ExpectedUtf16Escape => "expected utf16 escape",
            Error::IllegalControlChar => "illegal control character",
            Error::IllegalLeadingSurrogate => "illegal leading surrogate",
            Error::IllegalTrailingSurrogate => "illegal trailing surrogate",
            Error::IllegalEscapeChar => "illegal escape character",
            Error::TooDeep => "too deep",
            Error::NotNumber => "not a number",
            Error::NotString => "not a string",
            Error::NotObject => "not an object",
            Error::NotArray => "not an array",
            Error::NotBool => "not a bool",
            Error::NotNull => "not null",
            Error::IntegerOverflow => "integer overflow",
            Error::KeyTooLarge => "key too large",
            Error::ObjectTooLarge => "object too large",
            Error::ArrayTooLarge => "array too large",
            Error::StringTooLarge => "string too large",
            Error::AllocationFailure => "allocation failure",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for Error {}

impl From<AllocError> for Error {
    fn from(_: AllocError) -> Self {
        Error::AllocationFailure
    }
}
