//! ES module records, the linker state machine, and native (non-source)
//! modules. spec.md §3 "Module", §4.10.

use std::rc::Rc;

use crate::context::Context;
use crate::error::JsResult;
use crate::host::NativeModuleDescriptor;
use crate::object::property::{PropertyDescriptor, PropertyKey};
use crate::object::{BytecodeHandle, ObjectData, ObjectPtr};
use crate::value::string::Encoding;
use crate::value::Value;

/// One entry in a module's import list: the specifier it imports from plus
/// the local binding name the importing module's scope binds it under.
/// spec.md §3/§4.10 "per-import local binding names".
#[derive(Debug, Clone)]
pub struct ImportEntry {
    pub specifier: String,
    pub local_name: String,
}

impl ImportEntry {
    pub fn new(specifier: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self { specifier: specifier.into(), local_name: local_name.into() }
    }
}

/// Index into `Context::modules`. Not a compressed pointer into a
/// `crate::arena::Arena` — modules are never collected independently of
/// the context that registered them, so a plain `Vec` index is enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleRecordPtr(pub usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModuleState {
    Unlinked,
    Linking,
    Linked,
    Evaluating,
    Evaluated,
    Error,
}

pub enum ModuleKind {
    Source {
        body: BytecodeHandle,
    },
    Native {
        descriptor: Rc<NativeModuleDescriptor>,
        exported_values: hashbrown::HashMap<String, Value>,
    },
}

pub struct ModuleRecord {
    pub specifier: String,
    pub state: ModuleState,
    pub imports: Vec<ImportEntry>,
    pub resolved_dependencies: Vec<ModuleRecordPtr>,
    pub kind: ModuleKind,
    pub error: Option<Value>,
    /// The `user_value` the host passed to the parse call that produced this
    /// module's script, surfaced back to it on `import()` (spec.md §4.10,
    /// §4.11 "HAS_USER_VALUE").
    pub user_value: Option<Value>,
    /// Names this module exports, declared up front. spec.md §3/§4.10
    /// "local exports list".
    pub local_exports: Vec<String>,
    /// Lexical scope object holding this module's declared bindings
    /// (including imported ones, once linked). spec.md §3/§4.10 "lexical
    /// scope object for declared bindings".
    pub scope: Option<ObjectPtr>,
    /// Namespace object, lazily created once `state >= Linked` by
    /// [`module_namespace`]. spec.md §3/§4.10 "namespace object (lazily
    /// created once state ≥ linked)".
    pub namespace: Option<ObjectPtr>,
}

impl ModuleRecord {
    pub fn new_source(specifier: String, body: BytecodeHandle, imports: Vec<ImportEntry>) -> Self {
        Self {
            specifier,
            state: ModuleState::Unlinked,
            imports,
            resolved_dependencies: Vec::new(),
            kind: ModuleKind::Source { body },
            error: None,
            user_value: None,
            local_exports: Vec::new(),
            scope: None,
            namespace: None,
        }
    }

    pub fn new_native(specifier: String, descriptor: Rc<NativeModuleDescriptor>) -> Self {
        let local_exports = descriptor.exports.clone();
        Self {
            specifier,
            state: ModuleState::Unlinked,
            imports: Vec::new(),
            resolved_dependencies: Vec::new(),
            kind: ModuleKind::Native { descriptor, exported_values: hashbrown::HashMap::new() },
            error: None,
            user_value: None,
            local_exports,
            scope: None,
            namespace: None,
        }
    }

    pub fn with_user_value(mut self, user_value: Value) -> Self {
        self.user_value = Some(user_value);
        self
    }

    pub fn with_local_exports(mut self, local_exports: Vec<String>) -> Self {
        self.local_exports = local_exports;
        self
    }
}

fn get(cx: &Context, module: ModuleRecordPtr) -> &ModuleRecord {
    &cx.modules[module.0]
}

fn get_mut(cx: &mut Context, module: ModuleRecordPtr) -> &mut ModuleRecord {
    &mut cx.modules[module.0]
}

fn set_state(cx: &mut Context, module: ModuleRecordPtr, state: ModuleState) {
    get_mut(cx, module).state = state;
    cx.host_hooks.module_state_changed(module, state);
}

/// DFS link: a module already `Linking` (a cycle) is treated as already
/// satisfied, matching spec.md's module linker state machine (§4.10).
pub fn module_link(cx: &mut Context, module: ModuleRecordPtr) -> JsResult<()> {
    match get(cx, module).state {
        ModuleState::Unlinked => {}
        _ => return Ok(()),
    }
    set_state(cx, module, ModuleState::Linking);
    let imports = get(cx, module).imports.clone();
    let mut resolved = Vec::with_capacity(imports.len());
    let scope = cx.heap.objects.alloc(ObjectData::new_ordinary(None));
    for import in &imports {
        let dep = cx
            .host_hooks
            .resolve_module(&import.specifier, Some(module))
            .ok_or_else(|| cx.throw(crate::error::ExceptionType::SyntaxError, "module not found"))?;
        module_link(cx, dep)?;
        resolved.push(dep);
        let binding = module_namespace(cx, dep)?;
        let key = PropertyKey::String(cx.heap.create_string(import.local_name.as_bytes(), Encoding::Utf8));
        crate::object::define_own_property(cx, scope, key, PropertyDescriptor::new_data_descriptor(Value::Object(binding)))?;
    }
    get_mut(cx, module).resolved_dependencies = resolved;
    get_mut(cx, module).scope = Some(scope);
    set_state(cx, module, ModuleState::Linked);
    Ok(())
}

/// Lexical scope object holding this module's declared bindings. Allocated
/// during [`module_link`]; `None` before linking. spec.md §3/§4.10.
pub fn module_scope(cx: &Context, module: ModuleRecordPtr) -> Option<ObjectPtr> {
    get(cx, module).scope
}

/// Namespace object, lazily created once `state >= Linked`. One own data
/// property per declared local export, resolved through the module's
/// scope object (source modules) or `exported_values` (native modules).
/// spec.md §3/§4.10 "namespace object (lazily created once state ≥
/// linked)".
pub fn module_namespace(cx: &mut Context, module: ModuleRecordPtr) -> JsResult<ObjectPtr> {
    if let Some(ns) = get(cx, module).namespace {
        return Ok(ns);
    }
    if matches!(get(cx, module).state, ModuleState::Unlinked | ModuleState::Linking) {
        return Err(cx.throw(crate::error::ExceptionType::Common, "module namespace requested before linking"));
    }
    let ns = cx.heap.objects.alloc(ObjectData::new_ordinary(None));
    let names = get(cx, module).local_exports.clone();
    for name in &names {
        let value = match &get(cx, module).kind {
            ModuleKind::Native { .. } => native_module_get_export(cx, module, name).unwrap_or(Value::Undefined),
            ModuleKind::Source { .. } => match get(cx, module).scope {
                Some(scope) => {
                    let key = PropertyKey::String(cx.heap.create_string(name.as_bytes(), Encoding::Utf8));
                    crate::object::get(cx, scope, key, Value::Object(scope))?
                }
                None => Value::Undefined,
            },
        };
        let key = PropertyKey::String(cx.heap.create_string(name.as_bytes(), Encoding::Utf8));
        crate::object::define_own_property(cx, ns, key, PropertyDescriptor::new_data_descriptor(value))?;
    }
    get_mut(cx, module).namespace = Some(ns);
    Ok(ns)
}

/// Post-order DAG evaluation. A module already `Evaluating` (a cycle) is
/// treated as satisfied without re-entering it, per spec.md §4.10.
pub fn module_evaluate(cx: &mut Context, module: ModuleRecordPtr) -> JsResult<Value> {
    match get(cx, module).state {
        ModuleState::Evaluated => return Ok(Value::Undefined),
        ModuleState::Evaluating => return Ok(Value::Undefined),
        ModuleState::Linked => {}
        ModuleState::Error => {
            return Err(crate::error::JsError(cx.heap.errors.alloc(crate::error::ExtendedPrimitiveData {
                payload: get(cx, module).error.unwrap_or(Value::Undefined),
                is_abort: false,
            })));
        }
        _ => return Err(cx.throw(crate::error::ExceptionType::Common, "module is not linked")),
    }
    set_state(cx, module, ModuleState::Evaluating);
    let deps = get(cx, module).resolved_dependencies.clone();
    for dep in deps {
        if let Err(err) = module_evaluate(cx, dep) {
            let payload = cx.get_value_from_error(err);
            get_mut(cx, module).error = Some(payload);
            set_state(cx, module, ModuleState::Error);
            return Err(cx.throw_abort(payload));
        }
    }
    let result = match &get(cx, module).kind {
        ModuleKind::Source { body } => {
            let body = *body;
            cx.host_hooks.clone().execute_script_function(cx, body, Value::Undefined, &[])
        }
        ModuleKind::Native { descriptor, .. } => {
            let descriptor = descriptor.clone();
            (descriptor.evaluate)(cx, module).map(|_| Value::Undefined)
        }
    };
    match result {
        Ok(v) => {
            set_state(cx, module, ModuleState::Evaluated);
            Ok(v)
        }
        Err(err) => {
            let payload = cx.get_value_from_error(err);
            get_mut(cx, module).error = Some(payload);
            set_state(cx, module, ModuleState::Error);
            Err(err)
        }
    }
}

/// The referring script's `user_value`, surfaced to a `dynamic_import` host
/// callback alongside the specifier (spec.md §4.10).
pub fn module_user_value(cx: &Context, module: ModuleRecordPtr) -> Option<Value> {
    get(cx, module).user_value
}

/// Reads a named export from a native module. Returns `None` if the name
/// wasn't declared in the module's fixed export list, or hasn't been set
/// yet. spec.md §6 "native module".
pub fn native_module_get_export(cx: &Context, module: ModuleRecordPtr, name: &str) -> Option<Value> {
    match &get(cx, module).kind {
        ModuleKind::Native { exported_values, .. } => exported_values.get(name).copied(),
        ModuleKind::Source { .. } => None,
    }
}

/// Writes a named export. Only legal while the module is `Evaluating` and
/// only for a name present in the descriptor's fixed export list —
/// spec.md §4.10 "exports can only be set during evaluate".
pub fn native_module_set_export(cx: &mut Context, module: ModuleRecordPtr, name: &str, value: Value) -> JsResult<()> {
    if get(cx, module).state != ModuleState::Evaluating {
        return Err(cx.throw(crate::error::ExceptionType::Common, "native module exports can only be set during evaluate"));
    }
    let declared = match &get(cx, module).kind {
        ModuleKind::Native { descriptor, .. } => descriptor.exports.iter().any(|e| e == name),
        ModuleKind::Source { .. } => false,
    };
    if !declared {
        return Err(cx.throw(crate::error::ExceptionType::ReferenceError, "export not declared by this native module"));
    }
    if let ModuleKind::Native { exported_values, .. } = &mut get_mut(cx, module).kind {
        exported_values.insert(name.to_string(), value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, ContextOptions};
    use crate::host::DefaultHostHooks;
    use std::rc::Rc;

    fn new_cx() -> Context {
        Context::new(ContextOptions::default(), Rc::new(DefaultHostHooks))
    }

    #[test]
    fn native_module_export_lifecycle() {
        let mut cx = new_cx();
        let descriptor = Rc::new(NativeModuleDescriptor {
            exports: vec!["value".to_string()],
            evaluate: Rc::new(|cx, module| native_module_set_export(cx, module, "value", Value::Integer(7))),
        });
        cx.modules.push(ModuleRecord::new_native("native:test".to_string(), descriptor));
        let handle = ModuleRecordPtr(0);
        set_state(&mut cx, handle, ModuleState::Linked);
        module_evaluate(&mut cx, handle).unwrap();
        assert_eq!(native_module_get_export(&cx, handle, "value"), Some(Value::Integer(7)));
        assert_eq!(get(&cx, handle).state, ModuleState::Evaluated);
    }

    #[test]
    fn set_export_before_evaluating_fails() {
        let mut cx = new_cx();
        let descriptor = Rc::new(NativeModuleDescriptor {
            exports: vec!["value".to_string()],
            evaluate: Rc::new(|_, _| Ok(())),
        });
        cx.modules.push(ModuleRecord::new_native("native:test".to_string(), descriptor));
        let handle = ModuleRecordPtr(0);
        assert!(native_module_set_export(&mut cx, handle, "value", Value::Integer(1)).is_err());
    }

    #[test]
    fn linking_unresolvable_specifier_is_syntax_error() {
        let mut cx = Context::new(ContextOptions::default(), Rc::new(DefaultHostHooks));
        cx.modules.push(ModuleRecord::new_source("a".to_string(), BytecodeHandle(0), vec![ImportEntry::new("b", "b")]));
        assert!(module_link(&mut cx, ModuleRecordPtr(0)).is_err());
    }

    #[test]
    fn namespace_object_exposes_native_export_after_link() {
        let mut cx = new_cx();
        let descriptor = Rc::new(NativeModuleDescriptor {
            exports: vec!["value".to_string()],
            evaluate: Rc::new(|cx, module| native_module_set_export(cx, module, "value", Value::Integer(7))),
        });
        cx.modules.push(ModuleRecord::new_native("native:test".to_string(), descriptor));
        let handle = ModuleRecordPtr(0);
        set_state(&mut cx, handle, ModuleState::Linked);
        module_evaluate(&mut cx, handle).unwrap();
        let ns = module_namespace(&mut cx, handle).unwrap();
        let key = PropertyKey::String(cx.heap.create_string(b"value", Encoding::Utf8));
        assert_eq!(crate::object::get(&mut cx, ns, key, Value::Object(ns)).unwrap(), Value::Integer(7));
    }

    #[test]
    fn namespace_before_linking_is_an_error() {
        let mut cx = new_cx();
        let descriptor = Rc::new(NativeModuleDescriptor {
            exports: Vec::new(),
            evaluate: Rc::new(|_, _| Ok(())),
        });
        cx.modules.push(ModuleRecord::new_native("native:test".to_string(), descriptor));
        assert!(module_namespace(&mut cx, ModuleRecordPtr(0)).is_err());
    }
}
