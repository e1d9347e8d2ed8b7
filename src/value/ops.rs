//! Abstract operations over `Value`. spec.md §3 (Value word), §4.2.

use crate::context::Context;
use crate::error::JsResult;
use crate::object::property::PropertyKey;
use crate::object::{get, ObjectData, ObjectKind};
use crate::value::bigint::BigIntHeapData;
use crate::value::number::{js_string_to_number, number_to_js_string, to_integer, to_int32 as number_to_int32, to_uint32 as number_to_uint32};
use crate::value::string::Encoding;
use crate::value::Value;

/// No-op call sites for a would-be refcounted `Value`. See the module doc
/// comment on `crate::value::Value` and `crate::gc` for why this crate's
/// collector traces instead of counting.
pub fn clone_value(value: Value) -> Value {
    value
}

pub fn drop_value(_value: Value) {}

/// `ToBoolean`. Total, never throws.
pub fn to_boolean(cx: &Context, value: Value) -> bool {
    match value {
        Value::Undefined | Value::Null | Value::Empty => false,
        Value::Boolean(b) => b,
        Value::Integer(i) => i != 0,
        Value::Float(ptr) => {
            let n = *cx.heap.numbers.get(ptr);
            !(n == 0.0 || n.is_nan())
        }
        Value::String(ptr) => !cx.heap.string_bytes(ptr).is_empty(),
        Value::BigInt(ptr) => !cx.heap.bigints.get(ptr).0.eq(&num_bigint::BigInt::from(0)),
        Value::Symbol(_) | Value::Object(_) => true,
        Value::Error(_) => true,
    }
}

/// `ToPrimitive`, defaulting to "number" hint unless `prefer_string` is
/// set (the one case the engine core calls with `"string"`: array/date
/// join-style coercions performed by built-ins layered on this crate).
/// Tries `valueOf` then `toString` (or the reverse order under the
/// string hint), matching `OrdinaryToPrimitive`.
pub fn to_primitive(cx: &mut Context, value: Value, prefer_string: bool) -> JsResult<Value> {
    let Value::Object(obj) = value else { return Ok(value) };
    let order: [&str; 2] = if prefer_string { ["toString", "valueOf"] } else { ["valueOf", "toString"] };
    for name in order {
        let key = PropertyKey::String(cx.heap.create_string(name.as_bytes(), Encoding::Utf8));
        let method = get(cx, obj, key, value)?;
        if cx.heap.objects.get(match method {
            Value::Object(o) => o,
            _ => continue,
        }).is_callable() {
            let result = crate::object::call(cx, method, value, &[])?;
            if !result.is_object() {
                return Ok(result);
            }
        }
    }
    Err(cx.throw(crate::error::ExceptionType::TypeError, "cannot convert object to primitive value"))
}

/// `ToNumber`.
pub fn to_number(cx: &mut Context, value: Value) -> JsResult<f64> {
    Ok(match value {
        Value::Undefined => f64::NAN,
        Value::Null | Value::Empty => 0.0,
        Value::Boolean(b) => if b { 1.0 } else { 0.0 },
        Value::Integer(i) => i as f64,
        Value::Float(ptr) => *cx.heap.numbers.get(ptr),
        Value::String(ptr) => {
            let bytes = cx.heap.string_bytes(ptr).to_vec();
            let text = String::from_utf8_lossy(&bytes);
            js_string_to_number(&text)
        }
        Value::BigInt(_) => return Err(cx.throw(crate::error::ExceptionType::TypeError, "cannot convert a BigInt to a number")),
        Value::Symbol(_) => return Err(cx.throw(crate::error::ExceptionType::TypeError, "cannot convert a Symbol to a number")),
        Value::Object(_) => {
            let prim = to_primitive(cx, value, false)?;
            return to_number(cx, prim);
        }
        Value::Error(_) => f64::NAN,
    })
}

/// `ToString`. BigInt/Symbol rules differ (Symbol throws, BigInt renders
/// in decimal) from plain `Number::toString`.
pub fn to_string(cx: &mut Context, value: Value) -> JsResult<String> {
    Ok(match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Empty => String::new(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Float(ptr) => number_to_js_string(*cx.heap.numbers.get(ptr)),
        Value::String(ptr) => String::from_utf8_lossy(cx.heap.string_bytes(ptr)).into_owned(),
        Value::BigInt(ptr) => cx.heap.bigints.get(ptr).to_js_string(),
        Value::Symbol(_) => return Err(cx.throw(crate::error::ExceptionType::TypeError, "cannot convert a Symbol to a string")),
        Value::Object(_) => {
            let prim = to_primitive(cx, value, true)?;
            return to_string(cx, prim);
        }
        Value::Error(_) => "[object Error]".to_string(),
    })
}

/// `ToObject`: wraps a primitive in the matching class object; objects
/// pass through unchanged; nullish values throw.
pub fn to_object(cx: &mut Context, value: Value) -> JsResult<crate::object::ObjectPtr> {
    match value {
        Value::Object(obj) => Ok(obj),
        Value::Undefined | Value::Null | Value::Empty => Err(cx.throw(crate::error::ExceptionType::TypeError, "cannot convert undefined or null to object")),
        Value::Boolean(b) => Ok(wrap_class(cx, crate::object::ClassId::Boolean, crate::object::ClassPayload::Boolean(b))),
        Value::Integer(i) => Ok(wrap_class(cx, crate::object::ClassId::Number, crate::object::ClassPayload::Number(i as f64))),
        Value::Float(ptr) => {
            let n = *cx.heap.numbers.get(ptr);
            Ok(wrap_class(cx, crate::object::ClassId::Number, crate::object::ClassPayload::Number(n)))
        }
        Value::String(ptr) => Ok(wrap_class(cx, crate::object::ClassId::String, crate::object::ClassPayload::String(ptr))),
        Value::Symbol(ptr) => Ok(wrap_class(cx, crate::object::ClassId::Symbol, crate::object::ClassPayload::Symbol(ptr))),
        Value::BigInt(ptr) => Ok(wrap_class(cx, crate::object::ClassId::BigInt, crate::object::ClassPayload::BigInt(ptr))),
        Value::Error(_) => Err(cx.throw(crate::error::ExceptionType::TypeError, "cannot convert an error reference to object")),
    }
}

fn wrap_class(cx: &mut Context, class_id: crate::object::ClassId, payload: crate::object::ClassPayload) -> crate::object::ObjectPtr {
    cx.heap.objects.alloc(ObjectData {
        prototype: None,
        extensible: true,
        properties: crate::object::property::PropertyTable::new(),
        internal: None,
        kind: ObjectKind::Class(crate::object::ClassObject { class_id, payload }),
    })
}

pub fn to_int32(cx: &mut Context, value: Value) -> JsResult<i32> {
    Ok(number_to_int32(to_number(cx, value)?))
}

pub fn to_uint32(cx: &mut Context, value: Value) -> JsResult<u32> {
    Ok(number_to_uint32(to_number(cx, value)?))
}

/// `ToBigInt`, the narrow slice this crate needs: numbers and booleans
/// convert when integral, strings parse as decimal integers, everything
/// else is a `TypeError` (matching the abstract operation's shape without
/// hex/octal/binary string literal support, which belongs to the parser).
pub fn to_big_int(cx: &mut Context, value: Value) -> JsResult<num_bigint::BigInt> {
    match value {
        Value::BigInt(ptr) => Ok(cx.heap.bigints.get(ptr).0.clone()),
        Value::Boolean(b) => Ok(num_bigint::BigInt::from(if b { 1 } else { 0 })),
        Value::Integer(i) => Ok(num_bigint::BigInt::from(i)),
        Value::String(ptr) => {
            let bytes = cx.heap.string_bytes(ptr).to_vec();
            let text = String::from_utf8_lossy(&bytes);
            text.trim()
                .parse::<num_bigint::BigInt>()
                .map_err(|_| cx.throw(crate::error::ExceptionType::SyntaxError, "cannot convert string to a BigInt"))
        }
        _ => Err(cx.throw(crate::error::ExceptionType::TypeError, "cannot convert value to a BigInt")),
    }
}

/// `IsStrictlyEqual`. Objects compare by identity (`CompressedPointer`'s
/// derived `PartialEq`); numbers compare by value, not by cell identity.
pub fn strict_equals(cx: &Context, a: Value, b: Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) | (Value::Empty, Value::Empty) => true,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Integer(x), Value::Integer(y)) => x == y,
        (Value::Integer(x), Value::Float(y)) | (Value::Float(y), Value::Integer(x)) => x as f64 == *cx.heap.numbers.get(y),
        (Value::Float(x), Value::Float(y)) => *cx.heap.numbers.get(x) == *cx.heap.numbers.get(y),
        (Value::String(x), Value::String(y)) => x == y || cx.heap.string_bytes(x) == cx.heap.string_bytes(y),
        (Value::Symbol(x), Value::Symbol(y)) => x == y,
        (Value::BigInt(x), Value::BigInt(y)) => cx.heap.bigints.get(x).0 == cx.heap.bigints.get(y).0,
        (Value::Object(x), Value::Object(y)) => x == y,
        _ => false,
    }
}

/// `IsLooselyEqual` (`==`), the non-object-coercing cases plus one round
/// of `ToPrimitive` when exactly one side is an object.
pub fn loose_equals(cx: &mut Context, a: Value, b: Value) -> JsResult<bool> {
    if std::mem::discriminant(&a) == std::mem::discriminant(&b) {
        return Ok(strict_equals(cx, a, b));
    }
    match (a, b) {
        (Value::Null, Value::Undefined) | (Value::Undefined, Value::Null) => Ok(true),
        (Value::Integer(_) | Value::Float(_), Value::String(_)) => {
            let x = to_number(cx, a)?;
            let y = to_number(cx, b)?;
            Ok(x == y)
        }
        (Value::String(_), Value::Integer(_) | Value::Float(_)) => loose_equals(cx, b, a),
        (Value::Boolean(_), _) => {
            let x = to_number(cx, a)?;
            loose_equals(cx, Value::Integer(x as i32), b)
        }
        (_, Value::Boolean(_)) => loose_equals(cx, b, a),
        (Value::Object(_), Value::Integer(_) | Value::Float(_) | Value::String(_) | Value::BigInt(_)) => {
            let prim = to_primitive(cx, a, false)?;
            loose_equals(cx, prim, b)
        }
        (Value::Integer(_) | Value::Float(_) | Value::String(_) | Value::BigInt(_), Value::Object(_)) => loose_equals(cx, b, a),
        _ => Ok(false),
    }
}

/// `Addition`: numeric add if neither operand is (or coerces away from)
/// a string, else concatenation — the one operator with built-in
/// string/number polymorphism.
pub fn add(cx: &mut Context, a: Value, b: Value) -> JsResult<Value> {
    let a_prim = to_primitive(cx, a, false)?;
    let b_prim = to_primitive(cx, b, false)?;
    if a_prim.is_string() || b_prim.is_string() {
        let mut left = to_string(cx, a_prim)?;
        let right = to_string(cx, b_prim)?;
        left.push_str(&right);
        return Ok(Value::String(cx.heap.create_string(left.as_bytes(), Encoding::Utf8)));
    }
    if a_prim.is_bigint() || b_prim.is_bigint() {
        if !a_prim.is_bigint() || !b_prim.is_bigint() {
            return Err(cx.throw(crate::error::ExceptionType::TypeError, "cannot mix BigInt and other types in addition"));
        }
        let sum = to_big_int(cx, a_prim)?.clone() + to_big_int(cx, b_prim)?;
        return Ok(Value::BigInt(cx.heap.bigints.alloc(BigIntHeapData(sum))));
    }
    let sum = to_number(cx, a_prim)? + to_number(cx, b_prim)?;
    Ok(number_value(cx, sum))
}

/// Packs an `f64` into the narrowest `Value` variant that represents it
/// exactly: `Integer` when it round-trips through `i32`, `Float`
/// otherwise.
pub fn number_value(cx: &mut Context, n: f64) -> Value {
    if n.fract() == 0.0 && n >= i32::MIN as f64 && n <= i32::MAX as f64 && to_integer(n) == n {
        Value::Integer(n as i32)
    } else {
        Value::Float(cx.heap.create_number(n))
    }
}
