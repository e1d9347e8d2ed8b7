//! The host <-> engine boundary. spec.md §6 "Host hooks", §1 "external
//! collaborators".
//!
//! Every port the embedder can override lives on one trait so a test or a
//! minimal embedding can construct a `Context` without implementing ports
//! it never exercises — each has a reasonable default.

use std::rc::Rc;

use crate::context::Context;
use crate::error::{FatalKind, JsResult};
use crate::module::ModuleRecordPtr;
use crate::object::{BytecodeHandle, ObjectPtr};
use crate::value::Value;

/// Feature gates the host can disable at build/init time. spec.md §4.11;
/// the full list this crate tracks (BigInt/Proxy/Promise/... through
/// Logging/GlobalThis) mirrors `jerry_feature_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureId {
    BigInt,
    Proxy,
    Promise,
    Symbol,
    TypedArray,
    DataView,
    Regexp,
    Date,
    Realms,
    Modules,
    WeakRef,
    Containers,
    Debugger,
    SnapshotSave,
    SnapshotExec,
    LineInfo,
    Parser,
    MemStats,
    ParserDump,
    RegexpDump,
    VmStop,
    ErrorMessages,
    Logging,
    GlobalThis,
}

/// spec.md §2 "Supplemented features": the `Reject`/`Handle` tracker ops
/// `default-promise.c` reports, beyond the created/resolved/rejected triad
/// named in spec.md §4.9's prose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseRejectionOp {
    Reject,
    Handle,
}

/// The event mask `jerry_promise_event_filter_t` exposes: every point in a
/// promise's lifecycle a host diagnostic hook might care about. spec.md
/// §4.9.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseEventKind {
    Created,
    Resolved,
    Rejected,
    ReactionEnqueued,
    UnhandledRejection,
    HandlerAddedAfterRejection,
}

/// A fixed-export-list module the host resolves by name rather than by
/// parsing source text. spec.md §6 "native module", `default-module.c`.
pub struct NativeModuleDescriptor {
    pub exports: Vec<String>,
    pub evaluate: Rc<dyn Fn(&mut Context, ModuleRecordPtr) -> JsResult<()>>,
}

pub trait HostHooks {
    /// Calls into the (external) bytecode interpreter to run a script
    /// function's body. There is no in-crate default: a `Context` built
    /// without an interpreter installed can still build and manipulate
    /// objects, it just can't execute script-backed functions.
    fn execute_script_function(
        &self,
        cx: &mut Context,
        handle: BytecodeHandle,
        this: Value,
        args: &[Value],
    ) -> JsResult<Value> {
        let _ = (handle, this, args);
        Err(cx.throw(crate::error::ExceptionType::TypeError, "no bytecode interpreter installed"))
    }

    /// Resolves an `import` specifier relative to a referencing module.
    /// Returns `None` when the host has no such module (mapped to a
    /// `SyntaxError` by the module linker).
    fn resolve_module(&self, _specifier: &str, _referrer: Option<ModuleRecordPtr>) -> Option<ModuleRecordPtr> {
        None
    }

    /// Fires on every module state transition (spec.md §4.10).
    fn module_state_changed(&self, _module: ModuleRecordPtr, _new_state: crate::module::ModuleState) {}

    /// `import()`: the host resolves and links `specifier`, then calls
    /// back to fulfil or reject `capability`. `user_value` is the
    /// referring script's parse-time user value (spec.md §4.10,
    /// `module::module_user_value`), `Value::Undefined` when none was set.
    ///
    /// This hook only receives `&self`: settling `capability` from a
    /// synchronous override requires the caller to do it through a
    /// separate re-entrant call with a `&mut Context` in hand (the same
    /// shape `jerry_resolve_or_reject_promise` has relative to
    /// `jerry_module_on_import` in the original C API) rather than from
    /// inside this method body.
    fn dynamic_import(&self, _specifier: &str, _referrer: Option<ModuleRecordPtr>, _user_value: Value, _capability: ObjectPtr) {}

    /// Fires on promise lifecycle events (created/resolved/rejected/
    /// reaction-enqueued/unhandled-rejection/handler-added-after-rejection).
    fn promise_event(&self, _promise: ObjectPtr, _kind: PromiseEventKind) {}

    /// Polled by the (external) interpreter between bytecode dispatches;
    /// returning `true` aborts the running script. Always `false` with no
    /// interpreter installed.
    fn vm_exec_stop(&self) -> bool {
        false
    }

    /// Lets the host decorate a freshly constructed Error object (e.g.
    /// attach a stack trace) before it is thrown. spec.md §4.8.
    fn decorate_error_object(&self, _cx: &mut Context, _error: ObjectPtr) {}

    /// Diagnostic sink. No-op by default — see SPEC_FULL.md §1.2.
    fn log(&self, _message: &str) {}

    /// A host-fatal condition (spec.md §7). The default panics, since a
    /// host that hasn't overridden this has no better recovery strategy
    /// than the process terminating.
    fn fatal(&self, kind: FatalKind) -> ! {
        panic!("engine fatal: {kind}")
    }

    fn current_time_ms(&self) -> f64 {
        0.0
    }

    fn local_tza_minutes(&self, _time_ms: f64) -> i32 {
        0
    }

    fn read_source(&self, _path: &str) -> Option<Vec<u8>> {
        None
    }

    fn sleep_ms(&self, _ms: u32) {}

    fn track_promise_rejection(&self, _promise: ObjectPtr, _op: PromiseRejectionOp) {}

    fn resolve_native_module(&self, _name: &str) -> Option<NativeModuleDescriptor> {
        None
    }

    fn feature_enabled(&self, _feature: FeatureId) -> bool {
        true
    }
}

/// The hook set a bare `Context::new` test fixture reaches for: every port
/// left at its default (no-op / `None` / `false`).
pub struct DefaultHostHooks;

impl HostHooks for DefaultHostHooks {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_feature_gate_is_permissive() {
        let hooks = DefaultHostHooks;
        assert!(hooks.feature_enabled(FeatureId::Proxy));
    }
}
