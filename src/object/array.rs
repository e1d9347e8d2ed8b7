//! Fast and generic arrays. spec.md §3 "Array", §4.5.

use crate::value::Value;

/// An array's element storage. `Fast` is a contiguous vector with holes
/// represented by [`Value::Empty`] and no per-index property metadata;
/// `Generic` falls back to the object's ordinary [`super::property::PropertyTable`]
/// for every integer index, the way a non-default-attribute index must be
/// represented once attributes diverge from "writable/enumerable/configurable
/// all true".
///
/// The transition `Fast -> Generic` is one-way for the lifetime of the
/// array (spec.md §3: "irreversible ... for the purpose of property
/// definition"); nothing in this module ever converts a `Generic` array
/// back to `Fast`.
#[derive(Debug, Clone)]
pub enum ArrayStorage {
    Fast(Vec<Value>),
    Generic,
}

/// Arrays promote to `Generic` once grown past this many elements in one
/// `Array.prototype.push`-style extension, to bound the cost of a single
/// fast-array growth. Mirrors the "growth limit" named in spec.md §4.4.
pub const FAST_ARRAY_GROWTH_LIMIT: usize = 1 << 20;

impl ArrayStorage {
    pub fn new_fast() -> Self {
        ArrayStorage::Fast(Vec::new())
    }

    pub fn is_fast(&self) -> bool {
        matches!(self, ArrayStorage::Fast(_))
    }

    pub fn fast_len(&self) -> Option<usize> {
        match self {
            ArrayStorage::Fast(v) => Some(v.len()),
            ArrayStorage::Generic => None,
        }
    }

    /// Attempt a fast-path indexed get. Returns `None` for out-of-range
    /// indices (the caller falls back to `Empty`/prototype lookup) and for
    /// generic storage (caller falls back to the property table).
    pub fn fast_get(&self, index: u32) -> Option<Value> {
        match self {
            ArrayStorage::Fast(v) => v.get(index as usize).copied(),
            ArrayStorage::Generic => None,
        }
    }

    /// Attempt a fast-path indexed set with default attributes
    /// (writable/enumerable/configurable). Returns `Ok(true)` if handled
    /// in place, `Ok(false)` if the caller must promote to `Generic`
    /// because the index is beyond the growth limit, and leaves `self`
    /// untouched in that case so the caller can swap the storage kind.
    pub fn fast_set(&mut self, index: u32, value: Value) -> bool {
        match self {
            ArrayStorage::Fast(v) => {
                let index = index as usize;
                if index < v.len() {
                    v[index] = value;
                    true
                } else if index - v.len() < FAST_ARRAY_GROWTH_LIMIT {
                    v.resize(index, Value::Empty);
                    v.push(value);
                    true
                } else {
                    false
                }
            }
            ArrayStorage::Generic => false,
        }
    }

    pub fn length(&self) -> Option<u32> {
        self.fast_len().map(|l| l as u32)
    }

    /// `length` is writable; shrinking it truncates (spec.md §4.4). Growing
    /// the reported length without any backing writes is also legal and
    /// just pads with holes.
    pub fn set_length(&mut self, new_len: u32) {
        if let ArrayStorage::Fast(v) = self {
            v.resize(new_len as usize, Value::Empty);
        }
    }
}
