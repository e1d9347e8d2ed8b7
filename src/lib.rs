//! An embeddable ECMAScript engine core: the tagged value representation,
//! object model, garbage collector, promise job queue and module linker.
//! spec.md §1 "Overview".
//!
//! This crate is the engine core only. Parsing source text into bytecode,
//! executing that bytecode, regular expressions, `Date`, and JSON are all
//! external collaborators reached through [`host::HostHooks`] — see that
//! trait's doc comment and SPEC_FULL.md §0 for what's deliberately left
//! outside this crate's boundary.

pub mod arena;
pub mod context;
pub mod error;
pub mod gc;
pub mod host;
pub mod module;
pub mod object;
pub mod promise;
pub mod value;

pub use context::{Context, ContextOptions, Heap, HeapStats};
pub use error::{ExceptionType, FatalKind, JsError, JsResult};
pub use host::{DefaultHostHooks, FeatureId, HostHooks, NativeModuleDescriptor, PromiseEventKind, PromiseRejectionOp};
pub use module::{ImportEntry, ModuleKind, ModuleRecord, ModuleRecordPtr, ModuleState};
pub use object::{ObjectData, ObjectKind, ObjectPtr};
pub use promise::{PromiseData, PromiseState};
pub use value::Value;
