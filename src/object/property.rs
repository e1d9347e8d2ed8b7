//! Property keys, property storage and the Property Descriptor
//! specification type. spec.md §3 "Property", §4.4.

use hashbrown::HashMap;

use crate::value::Value;
use crate::value::string::StringPtr;
use crate::value::symbol::SymbolPtr;

/// Named properties are keyed by interned string or symbol; integer keys
/// up to 2³²−2 are represented numerically (never re-encoded as a string
/// unless a filter option asks for it — see [`OwnKeysFilter`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(StringPtr),
    Symbol(SymbolPtr),
    Integer(u32),
}

impl PropertyKey {
    pub const MAX_ARRAY_INDEX: u32 = u32::MAX - 1;

    pub fn is_array_index(&self) -> bool {
        matches!(self, PropertyKey::Integer(i) if *i <= Self::MAX_ARRAY_INDEX)
    }
}

/// Internal descriptor used by `[[DefineOwnProperty]]`: always fully
/// resolved into either a data or an accessor property, unlike the API
/// [`PropertyDescriptor`] which tracks "defined" bits per field.
#[derive(Debug, Clone)]
pub enum PropertyData {
    Data { value: Value, writable: bool },
    Accessor { get: Option<Value>, set: Option<Value> },
}

impl PropertyData {
    pub fn is_accessor(&self) -> bool {
        matches!(self, PropertyData::Accessor { .. })
    }
}

#[derive(Debug, Clone)]
pub struct PropertySlot {
    pub key: PropertyKey,
    pub data: PropertyData,
    pub enumerable: bool,
    pub configurable: bool,
}

/// The API-facing "descriptor struct with flag mask" form: each of
/// value/writable/get/set/enumerable/configurable is independently
/// "defined or not". spec.md §3 "Property descriptor (API object)".
///
/// Combining `writable`-defined with `get`/`set`-defined is invalid;
/// [`PropertyDescriptor::validate`] is what call sites use to reject that
/// combination with a type error, per spec.md §4.4.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyDescriptor {
    pub value: Option<Value>,
    pub writable: Option<bool>,
    pub get: Option<Value>,
    pub set: Option<Value>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidPropertyDescriptor;

impl PropertyDescriptor {
    pub fn new_data_descriptor(value: Value) -> Self {
        Self {
            value: Some(value),
            writable: Some(true),
            enumerable: Some(true),
            configurable: Some(true),
            ..Default::default()
        }
    }

    /// 6.2.6.1 IsAccessorDescriptor.
    pub fn is_accessor_descriptor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    /// 6.2.6.2 IsDataDescriptor.
    pub fn is_data_descriptor(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    /// 6.2.6.3 IsGenericDescriptor.
    pub fn is_generic_descriptor(&self) -> bool {
        !self.is_accessor_descriptor() && !self.is_data_descriptor()
    }

    pub fn has_fields(&self) -> bool {
        self.value.is_some()
            || self.writable.is_some()
            || self.get.is_some()
            || self.set.is_some()
            || self.enumerable.is_some()
            || self.configurable.is_some()
    }

    /// Rejects `writable`-defined combined with an accessor field, and
    /// `get`/`set` combined with `value`/`writable`. spec.md §3, §4.4:
    /// "the spec code must reject such combinations with a type error".
    pub fn validate(&self) -> Result<(), InvalidPropertyDescriptor> {
        if self.is_accessor_descriptor() && (self.value.is_some() || self.writable.is_some()) {
            return Err(InvalidPropertyDescriptor);
        }
        Ok(())
    }

    /// 6.2.6.6 CompletePropertyDescriptor: fills every unset field with the
    /// data-property defaults (or accessor defaults, if this is or will be
    /// an accessor descriptor).
    pub fn complete(&mut self) {
        if self.is_generic_descriptor() || self.is_data_descriptor() {
            self.value.get_or_insert(Value::Undefined);
            self.writable.get_or_insert(false);
        } else {
            self.get.get_or_insert(Value::Undefined);
            self.set.get_or_insert(Value::Undefined);
        }
        self.enumerable.get_or_insert(false);
        self.configurable.get_or_insert(false);
    }

    /// Converts a fully-resolved internal [`PropertyData`] + attributes
    /// into descriptor form, the way `[[GetOwnProperty]]` hands results
    /// back across the API boundary.
    pub fn from_property_data(data: &PropertyData, enumerable: bool, configurable: bool) -> Self {
        let mut desc = match data {
            PropertyData::Data { value, writable } => Self {
                value: Some(*value),
                writable: Some(*writable),
                ..Default::default()
            },
            PropertyData::Accessor { get, set } => Self {
                get: *get,
                set: *set,
                ..Default::default()
            },
        };
        desc.enumerable = Some(enumerable);
        desc.configurable = Some(configurable);
        desc
    }

    /// Converts a complete descriptor into the internal resolved form used
    /// by `[[DefineOwnProperty]]`. Caller must have validated and
    /// completed the descriptor first.
    pub fn to_property_data(&self) -> PropertyData {
        if self.is_accessor_descriptor() {
            PropertyData::Accessor {
                get: self.get,
                set: self.set,
            }
        } else {
            PropertyData::Data {
                value: self.value.unwrap_or(Value::Undefined),
                writable: self.writable.unwrap_or(false),
            }
        }
    }
}

/// Ordering filter bits for `[[OwnPropertyKeys]]` / `GetOwnPropertyDescriptors`
/// / `object_get_property_names`. spec.md §4.4.
///
/// The original C API spells the exclude variants "EXLCUDE" (a typo);
/// spec.md §9 explicitly calls out the corrected spelling as the one to
/// use here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OwnKeysFilter {
    pub exclude_strings: bool,
    pub exclude_symbols: bool,
    pub exclude_integer_indices: bool,
    pub integer_indices_as_number: bool,
    pub traverse_prototype_chain: bool,
    pub exclude_non_configurable: bool,
    pub exclude_non_enumerable: bool,
    pub exclude_non_writable: bool,
}

/// Either a data property (value+attrs) or an accessor (get/set+attrs),
/// keyed and stored in insertion order: the "singly-linked list of
/// property pairs" of spec.md §3, represented as an append-only `Vec`
/// (insertion order is free) plus a hash index for O(1) lookup, with
/// tombstoned holes reused by subsequent inserts.
#[derive(Debug, Default)]
pub struct PropertyTable {
    slots: Vec<Option<PropertySlot>>,
    index: HashMap<PropertyKey, usize>,
}

impl PropertyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: PropertyKey) -> Option<&PropertySlot> {
        self.index.get(&key).and_then(|&i| self.slots[i].as_ref())
    }

    pub fn get_mut(&mut self, key: PropertyKey) -> Option<&mut PropertySlot> {
        if let Some(&i) = self.index.get(&key) {
            self.slots[i].as_mut()
        } else {
            None
        }
    }

    pub fn has(&self, key: PropertyKey) -> bool {
        self.index.contains_key(&key)
    }

    /// Insert or overwrite, preserving original insertion position on
    /// overwrite (property redefinition never moves a key in enumeration
    /// order).
    pub fn set(&mut self, slot: PropertySlot) {
        if let Some(&i) = self.index.get(&slot.key) {
            self.slots[i] = Some(slot);
        } else {
            let i = self.slots.len();
            self.index.insert(slot.key, i);
            self.slots.push(Some(slot));
        }
    }

    /// `[[Delete]]`: removes the slot (leaving a tombstone) and returns
    /// whether a property existed.
    pub fn delete(&mut self, key: PropertyKey) -> bool {
        if let Some(i) = self.index.remove(&key) {
            self.slots[i] = None;
            true
        } else {
            false
        }
    }

    /// Own keys, filtered then ordered per 9.1.12 OrdinaryOwnPropertyKeys:
    /// integer indices ascending, then strings in insertion order, then
    /// symbols in insertion order. Not yet merged with a prototype walk
    /// (callers handle `traverse_prototype_chain` and first-appearance
    /// dedup themselves, since that spans objects).
    pub fn own_keys(&self, filter: OwnKeysFilter) -> Vec<PropertyKey> {
        let filtered: Vec<&PropertySlot> = self
            .slots
            .iter()
            .flatten()
            .filter(|slot| {
                if filter.exclude_strings && matches!(slot.key, PropertyKey::String(_)) {
                    return false;
                }
                if filter.exclude_symbols && matches!(slot.key, PropertyKey::Symbol(_)) {
                    return false;
                }
                if filter.exclude_integer_indices && slot.key.is_array_index() {
                    return false;
                }
                if filter.exclude_non_configurable && !slot.configurable {
                    return false;
                }
                if filter.exclude_non_enumerable && !slot.enumerable {
                    return false;
                }
                if filter.exclude_non_writable {
                    let writable = match &slot.data {
                        PropertyData::Data { writable, .. } => *writable,
                        PropertyData::Accessor { .. } => true,
                    };
                    if !writable {
                        return false;
                    }
                }
                true
            })
            .collect();

        let mut indices: Vec<u32> = filtered
            .iter()
            .filter_map(|slot| match slot.key {
                PropertyKey::Integer(i) => Some(i),
                _ => None,
            })
            .collect();
        indices.sort_unstable();

        let mut keys: Vec<PropertyKey> = indices.into_iter().map(PropertyKey::Integer).collect();
        keys.extend(filtered.iter().filter(|slot| matches!(slot.key, PropertyKey::String(_))).map(|slot| slot.key));
        keys.extend(filtered.iter().filter(|slot| matches!(slot.key, PropertyKey::Symbol(_))).map(|slot| slot.key));
        keys
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// All live slots, for the GC mark pass — every property value (and
    /// accessor get/set function value) is a trace root. See spec.md §4.7.
    pub fn iter(&self) -> impl Iterator<Item = &PropertySlot> {
        self.slots.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_writable_and_accessor_together() {
        let desc = PropertyDescriptor {
            writable: Some(true),
            get: Some(Value::Undefined),
            ..Default::default()
        };
        assert_eq!(desc.validate(), Err(InvalidPropertyDescriptor));
    }

    #[test]
    fn complete_fills_data_defaults() {
        let mut desc = PropertyDescriptor {
            value: Some(Value::Integer(1)),
            ..Default::default()
        };
        desc.complete();
        assert_eq!(desc.writable, Some(false));
        assert_eq!(desc.enumerable, Some(false));
        assert_eq!(desc.configurable, Some(false));
    }

    #[test]
    fn round_trip_through_from_and_to_property_data() {
        let data = PropertyData::Data {
            value: Value::Integer(5),
            writable: true,
        };
        let desc = PropertyDescriptor::from_property_data(&data, true, false);
        let restored = desc.to_property_data();
        match restored {
            PropertyData::Data { value, writable } => {
                assert_eq!(value, Value::Integer(5));
                assert!(writable);
            }
            _ => panic!("expected data descriptor"),
        }
    }

    #[test]
    fn table_preserves_insertion_order_on_redefine() {
        let mut table = PropertyTable::new();
        table.set(PropertySlot {
            key: PropertyKey::Integer(0),
            data: PropertyData::Data { value: Value::Integer(1), writable: true },
            enumerable: true,
            configurable: true,
        });
        table.set(PropertySlot {
            key: PropertyKey::Integer(1),
            data: PropertyData::Data { value: Value::Integer(2), writable: true },
            enumerable: true,
            configurable: true,
        });
        // Redefine key 0; it must stay first in `own_keys`.
        table.set(PropertySlot {
            key: PropertyKey::Integer(0),
            data: PropertyData::Data { value: Value::Integer(99), writable: true },
            enumerable: true,
            configurable: true,
        });
        let keys = table.own_keys(OwnKeysFilter::default());
        assert_eq!(keys, vec![PropertyKey::Integer(0), PropertyKey::Integer(1)]);
    }

    #[test]
    fn own_keys_orders_integers_ascending_before_strings() {
        let mut table = PropertyTable::new();
        table.set(PropertySlot {
            key: PropertyKey::Integer(5),
            data: PropertyData::Data { value: Value::Integer(0), writable: true },
            enumerable: true,
            configurable: true,
        });
        table.set(PropertySlot {
            key: PropertyKey::Integer(1),
            data: PropertyData::Data { value: Value::Integer(0), writable: true },
            enumerable: true,
            configurable: true,
        });
        let keys = table.own_keys(OwnKeysFilter::default());
        assert_eq!(keys, vec![PropertyKey::Integer(1), PropertyKey::Integer(5)]);
    }

    #[test]
    fn delete_then_has_is_false() {
        let mut table = PropertyTable::new();
        let key = PropertyKey::Integer(0);
        table.set(PropertySlot {
            key,
            data: PropertyData::Data { value: Value::Integer(1), writable: true },
            enumerable: true,
            configurable: true,
        });
        assert!(table.delete(key));
        assert!(!table.has(key));
    }
}
