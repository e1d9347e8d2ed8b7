//! End-to-end scenarios driven straight through the public engine API.
//! There is no parser in this crate, so each test builds by hand the same
//! object/value graph a parsed script would have produced and drives it
//! through the same engine operations a bytecode interpreter would call.

use std::cell::RefCell;
use std::rc::Rc;

use ecma_runtime::host::HostHooks;
use ecma_runtime::module::{module_user_value, ModuleRecord, ModuleRecordPtr};
use ecma_runtime::object::array::ArrayStorage;
use ecma_runtime::object::array_buffer::{ArrayBufferData, ArrayBufferError};
use ecma_runtime::object::property::{OwnKeysFilter, PropertyDescriptor, PropertyKey};
use ecma_runtime::object::typed_array::{ElementType, TypedArrayData, TypedArrayError};
use ecma_runtime::object::{self, BytecodeHandle, ClassId, ClassObject, ClassPayload};
use ecma_runtime::promise::{new_promise, perform_then, reject_promise, resolve_promise, run_all_enqueued_jobs, PromiseState};
use ecma_runtime::value::ops;
use ecma_runtime::value::string::Encoding;
use ecma_runtime::{Context, ContextOptions, DefaultHostHooks, ExceptionType, ObjectData, ObjectKind, ObjectPtr, Value};

fn new_cx() -> Context {
    Context::new(ContextOptions::default(), Rc::new(DefaultHostHooks))
}

fn promise_state(cx: &Context, promise: ObjectPtr) -> PromiseState {
    match &cx.heap.objects.get(promise).kind {
        ObjectKind::Class(ClassObject { payload: ClassPayload::Promise(data), .. }) => data.state,
        _ => panic!("not a promise object"),
    }
}

#[test]
fn primitive_round_trip_number() {
    let mut cx = new_cx();
    let n = ops::number_value(&mut cx, 42.5);
    assert_eq!(ops::to_number(&mut cx, n).unwrap(), 42.5);
}

#[test]
fn object_property_set_get_delete() {
    let mut cx = new_cx();
    let obj = cx.heap.objects.alloc(ObjectData::new_ordinary(None));
    let key = PropertyKey::String(cx.heap.create_string(b"k", Encoding::Utf8));

    object::set(&mut cx, obj, key, Value::Integer(123), Value::Object(obj)).unwrap();
    assert!(object::has_property(&mut cx, obj, key).unwrap());
    assert_eq!(object::get(&mut cx, obj, key, Value::Object(obj)).unwrap(), Value::Integer(123));
    assert!(object::delete_property(&mut cx, obj, key).unwrap());
    assert!(!object::has_property(&mut cx, obj, key).unwrap());
}

/// array(0); push 7 at index 0 (stays fast); define-own-property at index 1
/// with only `enumerable=false` set (a generic descriptor, completed to
/// `value: undefined, writable: false`), which is not a plain default-
/// attribute write and forces promotion to generic storage.
#[test]
fn fast_array_promotion_preserves_entry_count_and_hides_non_enumerable_index() {
    let mut cx = new_cx();
    let arr = cx.heap.objects.alloc(ObjectData::new_array(None));

    object::define_own_property(&mut cx, arr, PropertyKey::Integer(0), PropertyDescriptor::new_data_descriptor(Value::Integer(7))).unwrap();
    assert!(matches!(cx.heap.objects.get(arr).kind, ObjectKind::Array(ArrayStorage::Fast(_))));

    let desc = PropertyDescriptor {
        enumerable: Some(false),
        ..Default::default()
    };
    object::define_own_property(&mut cx, arr, PropertyKey::Integer(1), desc).unwrap();
    assert!(matches!(cx.heap.objects.get(arr).kind, ObjectKind::Array(ArrayStorage::Generic)));

    // "still reports length 2": two own indices survive the promotion.
    let all_keys = object::own_property_keys(&mut cx, arr, OwnKeysFilter::default()).unwrap();
    assert_eq!(all_keys.len(), 2);

    // get(1) == undefined-equivalent, since the completed descriptor never set a value.
    assert_eq!(object::get(&mut cx, arr, PropertyKey::Integer(1), Value::Object(arr)).unwrap(), Value::Undefined);

    let visible = object::own_property_keys(
        &mut cx,
        arr,
        OwnKeysFilter { exclude_non_enumerable: true, ..Default::default() },
    )
    .unwrap();
    assert_eq!(visible, vec![PropertyKey::Integer(0)]);
}

/// `(new Promise(function(rs,rj){rs(30)})).then(function(v){return v+1})`:
/// the executor settles `p` synchronously, so by the time `.then` runs `p`
/// is already fulfilled and only enqueues its reaction; the derived promise
/// stays pending until the queue is drained.
#[test]
fn promise_then_drains_with_incremented_value() {
    let mut cx = new_cx();
    let p = new_promise(&mut cx);
    resolve_promise(&mut cx, p, Value::Integer(30));

    let handler = cx.heap.objects.alloc(ObjectData::new_function(
        None,
        None,
        ecma_runtime::object::FunctionPayload::Native(Rc::new(|cx, _this, args| ops::add(cx, args[0], Value::Integer(1)))),
    ));
    let derived = perform_then(&mut cx, p, Some(Value::Object(handler)), None);

    assert!(matches!(promise_state(&cx, derived), PromiseState::Pending));
    run_all_enqueued_jobs(&mut cx).unwrap();
    assert_eq!(promise_state(&cx, derived), PromiseState::Fulfilled(Value::Integer(31)));
}

#[test]
fn external_array_buffer_detach_then_typed_array_view_fails() {
    let mut cx = new_cx();
    let mut backing = vec![0u8; 1];
    let ptr = backing.as_mut_ptr();
    let freed = Rc::new(RefCell::new(false));
    let freed_clone = freed.clone();
    let buf = ArrayBufferData::new_external(
        ptr,
        1,
        Some(Box::new(move || {
            *freed_clone.borrow_mut() = true;
        })),
    );

    let obj = cx.heap.objects.alloc(ObjectData {
        prototype: None,
        extensible: true,
        properties: ecma_runtime::object::property::PropertyTable::new(),
        internal: None,
        kind: ObjectKind::Class(ClassObject {
            class_id: ClassId::ArrayBuffer,
            payload: ClassPayload::ArrayBuffer(buf),
        }),
    });
    let buf = match &cx.heap.objects.get(obj).kind {
        ObjectKind::Class(ClassObject { payload: ClassPayload::ArrayBuffer(b), .. }) => b.clone(),
        _ => unreachable!(),
    };

    assert!(buf.is_detachable());
    buf.detach().unwrap();
    assert!(*freed.borrow());
    assert_eq!(buf.detach(), Err(ArrayBufferError::Detached));

    let err = TypedArrayData::new(buf, ElementType::Int8, 0, 0).unwrap_err();
    assert_eq!(err, TypedArrayError::Detached);

    std::mem::drop(backing);
}

/// The host's `dynamic_import` callback for a script parsed with
/// `HAS_USER_VALUE` set to `U`: the callback observes the specifier and `U`,
/// then settles the capability with a rejected `RangeError`, which a
/// `then(resolve, reject)` registered against it must see on drain.
struct CaptureImportHooks {
    captured: RefCell<Option<(String, Value, ObjectPtr)>>,
}

impl HostHooks for CaptureImportHooks {
    fn dynamic_import(&self, specifier: &str, _referrer: Option<ModuleRecordPtr>, user_value: Value, capability: ObjectPtr) {
        *self.captured.borrow_mut() = Some((specifier.to_string(), user_value, capability));
    }
}

#[test]
fn dynamic_import_sees_specifier_and_user_value_then_rejects_through_then() {
    let hooks = Rc::new(CaptureImportHooks { captured: RefCell::new(None) });
    let mut cx = Context::new(ContextOptions::default(), hooks.clone());

    let user_object = cx.heap.objects.alloc(ObjectData::new_ordinary(None));
    let user_value = Value::Object(user_object);
    cx.modules.push(
        ModuleRecord::new_source("main.mjs".to_string(), BytecodeHandle(0), Vec::new()).with_user_value(user_value),
    );
    let referrer = ModuleRecordPtr(0);
    let specifier = "x.mjs";
    let capability = new_promise(&mut cx);

    let looked_up = module_user_value(&cx, referrer).unwrap();
    cx.host_hooks.clone().dynamic_import(specifier, Some(referrer), looked_up, capability);

    let (seen_specifier, seen_user_value, seen_capability) = hooks.captured.borrow().clone().unwrap();
    assert_eq!(seen_specifier, specifier);
    assert_eq!(seen_user_value, user_value);
    assert_eq!(seen_capability, capability);

    let thrown = cx.throw(ExceptionType::RangeError, "module not found");
    let reason = cx.get_value_from_error(thrown);
    reject_promise(&mut cx, seen_capability, reason);

    let seen_reject = Rc::new(RefCell::new(None));
    let seen_reject_clone = seen_reject.clone();
    let on_reject = cx.heap.objects.alloc(ObjectData::new_function(
        None,
        None,
        ecma_runtime::object::FunctionPayload::Native(Rc::new(move |_, _, args| {
            *seen_reject_clone.borrow_mut() = Some(args[0]);
            Ok(Value::Undefined)
        })),
    ));
    perform_then(&mut cx, seen_capability, None, Some(Value::Object(on_reject)));
    run_all_enqueued_jobs(&mut cx).unwrap();
    assert_eq!(*seen_reject.borrow(), Some(reason));
}
