//! Heap-allocated `f64`s, and the number↔string conversions the abstract
//! operations in [`crate::value::ops`] are built on. spec.md §3, §4.2.
//!
//! nova_vm uses `lexical`/`fast-float` for string→float parsing and
//! `ryu-js` for the ECMAScript-specific float→string formatting (shortest
//! round-tripping decimal, no trailing `.0` for integral values); this
//! module keeps exactly that split.

use crate::arena::CompressedPointer;

pub type NumberPtr = CompressedPointer<f64>;

/// `ToString` applied to a Number, per the ECMAScript Number::toString
/// algorithm's decimal rendering (radix 10 only — other radixes are a
/// `Number.prototype.toString` concern, not a core abstract operation).
pub fn number_to_js_string(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    ryu_js::Buffer::new().format(value).to_string()
}

/// `StringToNumber`: parse a trimmed JS numeric-string literal. Returns
/// `NaN` (never an error) for anything that doesn't parse, matching
/// `ToNumber`'s total behaviour over strings.
pub fn js_string_to_number(text: &str) -> f64 {
    let trimmed = text.trim_matches(is_js_whitespace);
    if trimmed.is_empty() {
        return 0.0;
    }
    if trimmed == "Infinity" || trimmed == "+Infinity" {
        return f64::INFINITY;
    }
    if trimmed == "-Infinity" {
        return f64::NEG_INFINITY;
    }
    if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map(|v| v as f64).unwrap_or(f64::NAN);
    }
    if let Some(oct) = trimmed.strip_prefix("0o").or_else(|| trimmed.strip_prefix("0O")) {
        return u64::from_str_radix(oct, 8).map(|v| v as f64).unwrap_or(f64::NAN);
    }
    if let Some(bin) = trimmed.strip_prefix("0b").or_else(|| trimmed.strip_prefix("0B")) {
        return u64::from_str_radix(bin, 2).map(|v| v as f64).unwrap_or(f64::NAN);
    }
    fast_float::parse(trimmed).unwrap_or(f64::NAN)
}

fn is_js_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\u{000B}' | '\u{000C}' | '\u{00A0}' | '\u{FEFF}') || c.is_whitespace()
}

/// `ToInt32`. spec.md §4.2, §8: "NaN→0, ±∞→0, modulo-2³²".
pub fn to_int32(value: f64) -> i32 {
    to_uint32(value) as i32
}

/// `ToUint32`.
pub fn to_uint32(value: f64) -> u32 {
    if value.is_nan() || value.is_infinite() || value == 0.0 {
        return 0;
    }
    let truncated = value.trunc();
    // Reduce modulo 2^32 on an f64 without overflow by first reducing
    // modulo 2^32 as a float (the ECMAScript algorithm's "modulo").
    let modulo = truncated.rem_euclid(4294967296.0);
    modulo as u64 as u32
}

/// `ToInteger` per spec.md §4.2: `NaN → 0`, `±∞ → ±∞` (unchanged).
pub fn to_integer(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else if value.is_infinite() {
        value
    } else {
        value.trunc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_int32_handles_nan_and_infinity() {
        assert_eq!(to_int32(f64::NAN), 0);
        assert_eq!(to_int32(f64::INFINITY), 0);
        assert_eq!(to_int32(f64::NEG_INFINITY), 0);
    }

    #[test]
    fn to_int32_wraps_modulo_2_32() {
        assert_eq!(to_int32(4294967296.0), 0);
        assert_eq!(to_int32(4294967297.0), 1);
        assert_eq!(to_int32(-1.0), -1);
    }

    #[test]
    fn to_integer_matches_spec_table() {
        assert_eq!(to_integer(f64::NAN), 0.0);
        assert_eq!(to_integer(f64::INFINITY), f64::INFINITY);
        assert_eq!(to_integer(f64::NEG_INFINITY), f64::NEG_INFINITY);
        assert_eq!(to_integer(4.7), 4.0);
    }

    #[test]
    fn number_to_js_string_matches_common_cases() {
        assert_eq!(number_to_js_string(0.0), "0");
        assert_eq!(number_to_js_string(f64::NAN), "NaN");
        assert_eq!(number_to_js_string(f64::INFINITY), "Infinity");
        assert_eq!(number_to_js_string(-1.5), "-1.5");
    }

    #[test]
    fn string_to_number_parses_hex_and_whitespace() {
        assert_eq!(js_string_to_number("  42  "), 42.0);
        assert_eq!(js_string_to_number("0x2A"), 42.0);
        assert!(js_string_to_number("not a number").is_nan());
        assert_eq!(js_string_to_number(""), 0.0);
    }
}
