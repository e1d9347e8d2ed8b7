//! TypedArray views over an ArrayBuffer. spec.md §3 "TypedArray", §4.5.

use std::rc::Rc;

use super::array_buffer::{ArrayBufferData, ArrayBufferError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
    BigInt64,
    BigUint64,
}

impl ElementType {
    /// log2 of the element's byte size, per spec.md §4.5.
    pub fn size_shift(self) -> u32 {
        match self {
            ElementType::Int8 | ElementType::Uint8 | ElementType::Uint8Clamped => 0,
            ElementType::Int16 | ElementType::Uint16 => 1,
            ElementType::Int32 | ElementType::Uint32 | ElementType::Float32 => 2,
            ElementType::Float64 | ElementType::BigInt64 | ElementType::BigUint64 => 3,
        }
    }

    pub fn element_size(self) -> usize {
        1 << self.size_shift()
    }

    pub fn is_bigint(self) -> bool {
        matches!(self, ElementType::BigInt64 | ElementType::BigUint64)
    }
}

/// A typed value accepted by / produced from a typed-array element write.
#[derive(Debug, Clone, Copy)]
pub enum ElementValue {
    Number(f64),
    BigInt(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypedArrayError {
    Detached,
    OutOfRange,
    WrongValueKind,
}

impl From<ArrayBufferError> for TypedArrayError {
    fn from(e: ArrayBufferError) -> Self {
        match e {
            ArrayBufferError::Detached => TypedArrayError::Detached,
            ArrayBufferError::OutOfRange => TypedArrayError::OutOfRange,
        }
    }
}

/// `(element type, offset, length)` triple backed by an ArrayBuffer.
/// spec.md GLOSSARY "Typed array view".
#[derive(Debug)]
pub struct TypedArrayData {
    pub buffer: Rc<ArrayBufferData>,
    pub element_type: ElementType,
    pub byte_offset: usize,
    pub length: usize,
}

impl TypedArrayData {
    /// Creates a view, rejecting it with `OutOfRange` if `byte_offset +
    /// length*element_size` exceeds the buffer at construction time, and
    /// with `Detached` if the buffer is already detached (spec.md §4.5:
    /// "creating new views with explicit offset/length fails ... creating
    /// a zero-length view over a detached buffer likewise fails").
    pub fn new(
        buffer: Rc<ArrayBufferData>,
        element_type: ElementType,
        byte_offset: usize,
        length: usize,
    ) -> Result<Self, TypedArrayError> {
        if buffer.is_detached() {
            return Err(TypedArrayError::Detached);
        }
        let byte_len = length << element_type.size_shift();
        if byte_offset + byte_len > buffer.byte_length() {
            return Err(TypedArrayError::OutOfRange);
        }
        Ok(Self {
            buffer,
            element_type,
            byte_offset,
            length,
        })
    }

    pub fn byte_length(&self) -> usize {
        self.length << self.element_type.size_shift()
    }

    fn element_offset(&self, index: usize) -> Result<usize, TypedArrayError> {
        if index >= self.length {
            return Err(TypedArrayError::OutOfRange);
        }
        Ok(self.byte_offset + (index << self.element_type.size_shift()))
    }

    pub fn get(&self, index: usize) -> Result<ElementValue, TypedArrayError> {
        let offset = self.element_offset(index)?;
        let bytes = self.buffer.read(offset, self.element_type.element_size())?;
        Ok(decode_element(self.element_type, &bytes))
    }

    /// Writes one element, applying the per-type coercion rules of
    /// spec.md §4.5: `Uint8Clamped` saturates with round-half-to-even;
    /// out-of-range float writes that coerce to NaN store `0`; BigInt
    /// views reject `Number` values outright.
    pub fn set(&mut self, index: usize, value: ElementValue) -> Result<(), TypedArrayError> {
        let offset = self.element_offset(index)?;
        let bytes = encode_element(self.element_type, value)?;
        self.buffer.write(offset, &bytes)?;
        Ok(())
    }
}

fn decode_element(ty: ElementType, bytes: &[u8]) -> ElementValue {
    match ty {
        ElementType::Int8 => ElementValue::Number(bytes[0] as i8 as f64),
        ElementType::Uint8 | ElementType::Uint8Clamped => ElementValue::Number(bytes[0] as f64),
        ElementType::Int16 => ElementValue::Number(i16::from_le_bytes([bytes[0], bytes[1]]) as f64),
        ElementType::Uint16 => ElementValue::Number(u16::from_le_bytes([bytes[0], bytes[1]]) as f64),
        ElementType::Int32 => {
            ElementValue::Number(i32::from_le_bytes(bytes.try_into().unwrap()) as f64)
        }
        ElementType::Uint32 => {
            ElementValue::Number(u32::from_le_bytes(bytes.try_into().unwrap()) as f64)
        }
        ElementType::Float32 => {
            ElementValue::Number(f32::from_le_bytes(bytes.try_into().unwrap()) as f64)
        }
        ElementType::Float64 => ElementValue::Number(f64::from_le_bytes(bytes.try_into().unwrap())),
        ElementType::BigInt64 => ElementValue::BigInt(i64::from_le_bytes(bytes.try_into().unwrap())),
        ElementType::BigUint64 => {
            ElementValue::BigInt(u64::from_le_bytes(bytes.try_into().unwrap()) as i64)
        }
    }
}

fn encode_element(ty: ElementType, value: ElementValue) -> Result<Vec<u8>, TypedArrayError> {
    if ty.is_bigint() != matches!(value, ElementValue::BigInt(_)) {
        return Err(TypedArrayError::WrongValueKind);
    }
    Ok(match (ty, value) {
        (ElementType::Int8, ElementValue::Number(n)) => vec![coerce_int(n, i8::MIN as f64, i8::MAX as f64) as u8],
        (ElementType::Uint8, ElementValue::Number(n)) => vec![coerce_int(n, 0.0, u8::MAX as f64) as u8],
        (ElementType::Uint8Clamped, ElementValue::Number(n)) => vec![clamp_u8(n)],
        (ElementType::Int16, ElementValue::Number(n)) => {
            (coerce_int(n, i16::MIN as f64, i16::MAX as f64) as i16).to_le_bytes().to_vec()
        }
        (ElementType::Uint16, ElementValue::Number(n)) => {
            (coerce_int(n, 0.0, u16::MAX as f64) as u16).to_le_bytes().to_vec()
        }
        (ElementType::Int32, ElementValue::Number(n)) => {
            crate::value::number::to_int32(n).to_le_bytes().to_vec()
        }
        (ElementType::Uint32, ElementValue::Number(n)) => {
            crate::value::number::to_uint32(n).to_le_bytes().to_vec()
        }
        (ElementType::Float32, ElementValue::Number(n)) => (n as f32).to_le_bytes().to_vec(),
        (ElementType::Float64, ElementValue::Number(n)) => n.to_le_bytes().to_vec(),
        (ElementType::BigInt64, ElementValue::BigInt(n)) => n.to_le_bytes().to_vec(),
        (ElementType::BigUint64, ElementValue::BigInt(n)) => (n as u64).to_le_bytes().to_vec(),
        _ => return Err(TypedArrayError::WrongValueKind),
    })
}

fn coerce_int(n: f64, min: f64, max: f64) -> i64 {
    if n.is_nan() {
        0
    } else {
        n.trunc().clamp(min, max) as i64
    }
}

/// Round-half-to-even clamp to `[0, 255]`, per spec.md §4.5.
fn clamp_u8(n: f64) -> u8 {
    if n.is_nan() || n <= 0.0 {
        return 0;
    }
    if n >= 255.0 {
        return 255;
    }
    let floor = n.floor();
    let diff = n - floor;
    let rounded = if diff < 0.5 {
        floor
    } else if diff > 0.5 {
        floor + 1.0
    } else if (floor as u64) % 2 == 0 {
        floor
    } else {
        floor + 1.0
    };
    rounded as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint8_clamped_saturates_and_rounds_half_to_even() {
        assert_eq!(clamp_u8(-5.0), 0);
        assert_eq!(clamp_u8(300.0), 255);
        assert_eq!(clamp_u8(2.5), 2);
        assert_eq!(clamp_u8(3.5), 4);
        assert_eq!(clamp_u8(f64::NAN), 0);
    }

    #[test]
    fn bigint_view_rejects_number_value() {
        let buf = ArrayBufferData::new_inline(8);
        let mut view = TypedArrayData::new(buf, ElementType::BigInt64, 0, 1).unwrap();
        let err = view.set(0, ElementValue::Number(1.0)).unwrap_err();
        assert_eq!(err, TypedArrayError::WrongValueKind);
    }

    #[test]
    fn byte_length_must_not_exceed_buffer_remaining_bytes() {
        let buf = ArrayBufferData::new_inline(4);
        assert!(TypedArrayData::new(buf.clone(), ElementType::Int32, 0, 2).is_err());
        assert!(TypedArrayData::new(buf, ElementType::Int32, 0, 1).is_ok());
    }

    #[test]
    fn view_over_detached_buffer_fails() {
        let buf = ArrayBufferData::new_inline(4);
        buf.detach().unwrap();
        let err = TypedArrayData::new(buf, ElementType::Int8, 0, 0).unwrap_err();
        assert_eq!(err, TypedArrayError::Detached);
    }

    #[test]
    fn get_set_roundtrip_int32() {
        let buf = ArrayBufferData::new_inline(8);
        let mut view = TypedArrayData::new(buf, ElementType::Int32, 0, 2).unwrap();
        view.set(1, ElementValue::Number(-7.0)).unwrap();
        match view.get(1).unwrap() {
            ElementValue::Number(n) => assert_eq!(n, -7.0),
            _ => panic!("expected number"),
        }
    }
}
