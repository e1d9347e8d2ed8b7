//! The error channel. spec.md §4.8, §7.
//!
//! Every operation that can fail returns a value of the same width as a
//! normal value: a plain [`Value`] or an *error reference* wrapping a
//! thrown payload plus an abort flag. `JsResult<T>` is the Rust-level
//! shorthand for that — `Ok` for a normal completion, `Err(JsError)` for a
//! thrown-or-aborted one — the same shape nova_vm's `JsResult<T> =
//! Result<T, JsError>` uses, generalized to also carry the abort bit this
//! spec requires and the interpreter-internal kinds that never cross the
//! API boundary at all.

use crate::arena::CompressedPointer;
use crate::value::Value;

pub type ErrorRefPtr = CompressedPointer<ExtendedPrimitiveData>;

/// A refcounted heap cell used for thrown values and (in `crate::promise`)
/// promise reactions. spec.md §3 "Extended primitive".
#[derive(Debug, Clone, Copy)]
pub struct ExtendedPrimitiveData {
    pub payload: Value,
    pub is_abort: bool,
}

/// `std::result::Result`-compatible error type threaded through every
/// fallible engine operation. Wraps an error reference pointer, not a bare
/// `Value`, so `get_value_from_error` and `value_is_abort` have something
/// to dereference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsError(pub ErrorRefPtr);

pub type JsResult<T> = Result<T, JsError>;

/// The fixed enumeration of standard Error subtypes. spec.md §4.8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionType {
    Common,
    EvalError,
    RangeError,
    ReferenceError,
    SyntaxError,
    TypeError,
    UriError,
    AggregateError,
}

impl ExceptionType {
    pub fn name(self) -> &'static str {
        match self {
            ExceptionType::Common => "Error",
            ExceptionType::EvalError => "EvalError",
            ExceptionType::RangeError => "RangeError",
            ExceptionType::ReferenceError => "ReferenceError",
            ExceptionType::SyntaxError => "SyntaxError",
            ExceptionType::TypeError => "TypeError",
            ExceptionType::UriError => "URIError",
            ExceptionType::AggregateError => "AggregateError",
        }
    }
}

/// Host-fatal kinds (spec.md §7): never observable to script, never
/// returned across the API boundary. A host encountering one of these
/// calls its `fatal` port and the process does not return from that call;
/// this enum exists purely so the engine has something concrete to pass
/// to that port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalKind {
    OutOfMemory,
    RefCountLimit,
    DisabledByteCode,
    InternalAssert,
}

impl std::fmt::Display for FatalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            FatalKind::OutOfMemory => "out of memory",
            FatalKind::RefCountLimit => "reference count limit exceeded",
            FatalKind::DisabledByteCode => "execution of disabled bytecode",
            FatalKind::InternalAssert => "internal assertion failure",
        };
        f.write_str(text)
    }
}

impl std::error::Error for FatalKind {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exception_type_names_match_ecmascript() {
        assert_eq!(ExceptionType::TypeError.name(), "TypeError");
        assert_eq!(ExceptionType::AggregateError.name(), "AggregateError");
    }
}
