//! DataView: byte-granular, type-punning access to an ArrayBuffer region.
//! spec.md §3 "DataView", §4.5.

use std::rc::Rc;

use super::array_buffer::ArrayBufferData;
use super::typed_array::{ElementType, TypedArrayError};

#[derive(Debug)]
pub struct DataViewData {
    pub buffer: Rc<ArrayBufferData>,
    pub byte_offset: usize,
    pub byte_length: usize,
}

impl DataViewData {
    pub fn new(buffer: Rc<ArrayBufferData>, byte_offset: usize, byte_length: usize) -> Result<Self, TypedArrayError> {
        if buffer.is_detached() {
            return Err(TypedArrayError::Detached);
        }
        if byte_offset + byte_length > buffer.byte_length() {
            return Err(TypedArrayError::OutOfRange);
        }
        Ok(Self { buffer, byte_offset, byte_length })
    }

    /// Per-type getter with an explicit little-endian flag. Out-of-range
    /// offsets raise a range error (`OutOfRange`), per spec.md §4.5.
    pub fn get_f64(&self, offset: usize, little_endian: bool) -> Result<f64, TypedArrayError> {
        let bytes = self.read(offset, ElementType::Float64.element_size())?;
        let arr: [u8; 8] = bytes.try_into().unwrap();
        Ok(if little_endian { f64::from_le_bytes(arr) } else { f64::from_be_bytes(arr) })
    }

    pub fn set_f64(&self, offset: usize, value: f64, little_endian: bool) -> Result<(), TypedArrayError> {
        let bytes = if little_endian { value.to_le_bytes() } else { value.to_be_bytes() };
        self.write(offset, &bytes)
    }

    pub fn get_i32(&self, offset: usize, little_endian: bool) -> Result<i32, TypedArrayError> {
        let bytes = self.read(offset, 4)?;
        let arr: [u8; 4] = bytes.try_into().unwrap();
        Ok(if little_endian { i32::from_le_bytes(arr) } else { i32::from_be_bytes(arr) })
    }

    pub fn set_i32(&self, offset: usize, value: i32, little_endian: bool) -> Result<(), TypedArrayError> {
        let bytes = if little_endian { value.to_le_bytes() } else { value.to_be_bytes() };
        self.write(offset, &bytes)
    }

    fn read(&self, offset: usize, size: usize) -> Result<Vec<u8>, TypedArrayError> {
        if offset + size > self.byte_length {
            return Err(TypedArrayError::OutOfRange);
        }
        Ok(self.buffer.read(self.byte_offset + offset, size)?)
    }

    fn write(&self, offset: usize, bytes: &[u8]) -> Result<(), TypedArrayError> {
        if offset + bytes.len() > self.byte_length {
            return Err(TypedArrayError::OutOfRange);
        }
        Ok(self.buffer.write(self.byte_offset + offset, bytes)?)
    }
}
