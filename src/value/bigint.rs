//! Heap BigInt cells. spec.md §3 "Value word" / BigInt tag.

use crate::arena::CompressedPointer;
use num_bigint::BigInt as NumBigInt;

pub type BigIntPtr = CompressedPointer<BigIntHeapData>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigIntHeapData(pub NumBigInt);

impl BigIntHeapData {
    pub fn from_i64(v: i64) -> Self {
        Self(NumBigInt::from(v))
    }

    pub fn to_js_string(&self) -> String {
        self.0.to_string()
    }

    /// `ToBigInt64`: reduce modulo 2^64, reinterpreted as signed.
    pub fn to_big_int64(&self) -> i64 {
        let (_, bytes) = self.0.to_bytes_le();
        let mut buf = [0u8; 8];
        for (i, b) in bytes.iter().take(8).enumerate() {
            buf[i] = *b;
        }
        let unsigned = u64::from_le_bytes(buf);
        unsigned as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_js_string_matches_decimal_repr() {
        let b = BigIntHeapData::from_i64(-123);
        assert_eq!(b.to_js_string(), "-123");
    }
}
