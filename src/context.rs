//! The embedding's entry point: heap aggregation, host hook storage, realm
//! and exception state, and the init/cleanup lifecycle. spec.md §4.1, §4.11.

use std::collections::VecDeque;
use std::rc::Rc;

use crate::arena::Arena;
use crate::error::{ErrorRefPtr, ExceptionType, ExtendedPrimitiveData, JsError};
use crate::host::HostHooks;
use crate::module::ModuleRecord;
use crate::object::{ObjectData, ObjectPtr};
use crate::promise::Job;
use crate::value::bigint::BigIntHeapData;
use crate::value::string::{Encoding, MagicStringId, StringHeapData, StringPtr, MagicStrings};
use crate::value::symbol::{SymbolHeapData, SymbolRegistry};
use crate::value::Value;

/// Rust-side equivalent of `jerry_init_flags_t`. API-availability is not a
/// flag here — it's the difference between having a `Context` and not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextOptions {
    pub disable_gc: bool,
    pub print_internals: bool,
    pub show_opcodes: bool,
    pub show_regexp_opcodes: bool,
    pub mem_stats: bool,
    pub mem_stats_separate: bool,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            disable_gc: false,
            print_internals: false,
            show_opcodes: false,
            show_regexp_opcodes: false,
            mem_stats: false,
            mem_stats_separate: false,
        }
    }
}

/// Aggregate allocated/peak byte accounting across every arena, the way
/// `jerry_heap_stats` reports it. spec.md §2 "Supplemented features".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeapStats {
    pub size: usize,
    pub allocated: usize,
    pub peak_allocated: usize,
}

/// One arena per heap cell kind, plus the two name-indexed stores
/// (magic strings, symbol registry) everything else shares.
pub struct Heap {
    pub objects: Arena<ObjectData>,
    pub strings: Arena<StringHeapData>,
    pub symbols: Arena<SymbolHeapData>,
    pub numbers: Arena<f64>,
    pub bigints: Arena<BigIntHeapData>,
    pub errors: Arena<ExtendedPrimitiveData>,
    pub magic: MagicStrings,
    pub symbol_registry: SymbolRegistry,
    magic_cache: Vec<Option<StringPtr>>,
}

const MAGIC_STRING_COUNT: usize = 30;

impl Heap {
    pub fn new() -> Self {
        Self {
            objects: Arena::new(),
            strings: Arena::new(),
            symbols: Arena::new(),
            numbers: Arena::new(),
            bigints: Arena::new(),
            errors: Arena::new(),
            magic: MagicStrings::new(),
            symbol_registry: SymbolRegistry::new(),
            magic_cache: vec![None; MAGIC_STRING_COUNT],
        }
    }

    pub fn create_string(&mut self, bytes: &[u8], encoding: Encoding) -> StringPtr {
        let cesu8 = match encoding {
            Encoding::Cesu8 => bytes.to_vec(),
            Encoding::Utf8 => crate::value::string::utf8_to_cesu8(bytes),
        };
        self.strings.alloc(StringHeapData::Owned(Rc::from(cesu8.into_boxed_slice())))
    }

    /// Returns the (lazily interned) `StringPtr` for a magic string id,
    /// allocating the backing cell on first use and caching it thereafter
    /// so repeated builtin property lookups never re-allocate.
    pub fn magic_string(&mut self, id: MagicStringId) -> StringPtr {
        let slot = id as usize;
        if let Some(existing) = self.magic_cache[slot] {
            return existing;
        }
        let ptr = self.strings.alloc(StringHeapData::Magic(id));
        self.magic_cache[slot] = Some(ptr);
        ptr
    }

    pub fn string_bytes(&self, ptr: StringPtr) -> &[u8] {
        self.strings.get(ptr).as_bytes(&self.magic)
    }

    /// Boxes an `f64` that can't live in `Value::Integer` directly (NaN,
    /// infinities, non-integral, or out of `i32` range).
    pub fn create_number(&mut self, value: f64) -> crate::value::number::NumberPtr {
        self.numbers.alloc(value)
    }

    pub fn stats(&self) -> HeapStats {
        let kinds = [
            self.objects.stats(),
            self.strings.stats(),
            self.symbols.stats(),
            self.numbers.stats(),
            self.bigints.stats(),
            self.errors.stats(),
        ];
        let size: usize = kinds.iter().map(|s| s.live_cells).sum();
        let peak: usize = kinds.iter().map(|s| s.peak_live_cells).sum();
        HeapStats {
            size,
            allocated: size,
            peak_allocated: peak,
        }
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

/// The running context: one `Heap`, one set of host hooks, the currently
/// active realm (global object), the pending exception slot, the
/// microtask-style job queue, and the module registry. spec.md calls this
/// an "Agent"/"Context" interchangeably; this crate follows nova_vm's
/// naming and calls it `Context`.
pub struct Context {
    pub heap: Heap,
    pub host_hooks: Rc<dyn HostHooks>,
    pub options: ContextOptions,
    pub current_realm: Option<ObjectPtr>,
    pub exception: Option<Value>,
    pub new_target: Option<ObjectPtr>,
    pub job_queue: VecDeque<Job>,
    pub modules: Vec<ModuleRecord>,
    context_data: Vec<Box<dyn std::any::Any>>,
}

impl Context {
    /// `jerry_init`: builds a fresh heap and installs the given hooks.
    /// There is no separate "init flags" step — `options` is the flags.
    pub fn new(options: ContextOptions, host_hooks: Rc<dyn HostHooks>) -> Self {
        Self {
            heap: Heap::new(),
            host_hooks,
            options,
            current_realm: None,
            exception: None,
            new_target: None,
            job_queue: VecDeque::new(),
            modules: Vec::new(),
            context_data: Vec::new(),
        }
    }

    /// `jerry_cleanup`: deinit (drop every live heap cell's native data,
    /// running free callbacks) followed by finalize (drop the arenas
    /// themselves). Consuming `self` gives us "API unavailable after
    /// cleanup" for free — there is no `Context` left to call methods on.
    pub fn cleanup(self) {
        // Arena/Rc Drop impls run every registered free callback
        // (ExternalString, ArrayBuffer::Backing::External) as part of the
        // ordinary drop glide here; no separate deinit pass is needed.
    }

    /// Swaps in a new realm (global object), returning the previous one so
    /// the caller can restore it — nova_vm's `Agent::run_in_realm` shape,
    /// without the scope-guard machinery that needs rooting.
    pub fn set_realm(&mut self, realm: Option<ObjectPtr>) -> Option<ObjectPtr> {
        std::mem::replace(&mut self.current_realm, realm)
    }

    pub fn heap_stats(&self) -> HeapStats {
        self.heap.stats()
    }

    /// Builds a thrown-value error reference and records it as the pending
    /// exception slot, returning the `JsError` handle to it. Every
    /// internal-method helper in `crate::object` that needs to raise a
    /// `TypeError`/`RangeError` goes through this.
    pub fn throw(&mut self, kind: ExceptionType, message: &str) -> JsError {
        let msg = self.heap.create_string(message.as_bytes(), Encoding::Utf8);
        let error_obj = self.heap.objects.alloc(ObjectData {
            prototype: None,
            extensible: true,
            properties: crate::object::property::PropertyTable::new(),
            internal: None,
            kind: crate::object::ObjectKind::Class(crate::object::ClassObject {
                class_id: crate::object::ClassId::Error,
                payload: crate::object::ClassPayload::Error { kind, message: Some(msg) },
            }),
        });
        let value = Value::Object(error_obj);
        let ptr: ErrorRefPtr = self.heap.errors.alloc(ExtendedPrimitiveData { payload: value, is_abort: false });
        self.exception = Some(value);
        JsError(ptr)
    }

    /// Builds an abort (spec.md §4.8 "exit or abort request"), distinct
    /// from an ordinary thrown value only through [`crate::error::value_is_abort`].
    pub fn throw_abort(&mut self, value: Value) -> JsError {
        let ptr = self.heap.errors.alloc(ExtendedPrimitiveData { payload: value, is_abort: true });
        self.exception = Some(value);
        JsError(ptr)
    }

    pub fn get_value_from_error(&self, err: JsError) -> Value {
        self.heap.errors.get(err.0).payload
    }

    pub fn value_is_abort(&self, err: JsError) -> bool {
        self.heap.errors.get(err.0).is_abort
    }

    /// Registers an opaque per-context value, retrievable later by the
    /// same `TypeId` the host registered it under. spec.md §4.1
    /// "context-data manager".
    pub fn set_context_data<T: 'static>(&mut self, value: T) {
        self.context_data.retain(|existing| !existing.is::<T>());
        self.context_data.push(Box::new(value));
    }

    pub fn get_context_data<T: 'static>(&self) -> Option<&T> {
        self.context_data.iter().find_map(|v| v.downcast_ref::<T>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::DefaultHostHooks;

    #[test]
    fn heap_stats_reflects_allocations() {
        let mut cx = Context::new(ContextOptions::default(), Rc::new(DefaultHostHooks));
        cx.heap.objects.alloc(ObjectData::new_ordinary(None));
        assert_eq!(cx.heap_stats().size, 1);
    }

    #[test]
    fn throw_records_pending_exception() {
        let mut cx = Context::new(ContextOptions::default(), Rc::new(DefaultHostHooks));
        let err = cx.throw(ExceptionType::TypeError, "bad");
        assert!(!cx.value_is_abort(err));
        assert!(cx.exception.is_some());
    }

    #[test]
    fn context_data_roundtrips_by_type() {
        let mut cx = Context::new(ContextOptions::default(), Rc::new(DefaultHostHooks));
        cx.set_context_data(42u32);
        cx.set_context_data("hello");
        assert_eq!(cx.get_context_data::<u32>(), Some(&42));
        assert_eq!(cx.get_context_data::<&str>(), Some(&"hello"));
    }
}
