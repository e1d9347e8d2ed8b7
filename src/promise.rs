//! Promises and the FIFO job queue. spec.md §3 "Promise", §4.9.

use crate::context::Context;
use crate::error::JsResult;
use crate::host::{PromiseEventKind, PromiseRejectionOp};
use crate::object::{call, ClassId, ClassObject, ClassPayload, ObjectData, ObjectKind, ObjectPtr};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PromiseState {
    Pending,
    Fulfilled(Value),
    Rejected(Value),
}

/// One registered `.then`/`.catch` reaction: a handler (or "identity"/
/// "thrower" passthrough when the corresponding argument to `then` was
/// omitted) plus the promise capability it settles in turn.
#[derive(Debug, Clone)]
pub struct PromiseReaction {
    pub handler: Option<Value>,
    pub derived_promise: ObjectPtr,
}

#[derive(Debug)]
pub struct PromiseData {
    pub state: PromiseState,
    pub fulfill_reactions: Vec<PromiseReaction>,
    pub reject_reactions: Vec<PromiseReaction>,
    pub is_handled: bool,
}

impl PromiseData {
    pub fn new() -> Self {
        Self {
            state: PromiseState::Pending,
            fulfill_reactions: Vec::new(),
            reject_reactions: Vec::new(),
            is_handled: false,
        }
    }
}

impl Default for PromiseData {
    fn default() -> Self {
        Self::new()
    }
}

/// One entry in the microtask-style job queue: a promise reaction job or a
/// host-scheduled continuation, boxed so the queue can hold either. `roots`
/// lists every value the closure captures and still needs once it runs —
/// a boxed `FnOnce` is opaque to the collector, so anything it alone keeps
/// alive (e.g. a derived promise nothing else references yet) must be
/// listed here explicitly or a `collect()` between enqueue and drain can
/// sweep it out from under the still-pending job (spec.md §4.7 "the
/// Promise job queue" is a GC root).
pub struct Job {
    pub run: Box<dyn FnOnce(&mut Context) -> JsResult<()>>,
    pub roots: Vec<Value>,
}

impl Job {
    pub fn new(roots: Vec<Value>, run: impl FnOnce(&mut Context) -> JsResult<()> + 'static) -> Self {
        Self { run: Box::new(run), roots }
    }
}

pub fn new_promise(cx: &mut Context) -> ObjectPtr {
    let ptr = cx.heap.objects.alloc(ObjectData {
        prototype: None,
        extensible: true,
        properties: crate::object::property::PropertyTable::new(),
        internal: None,
        kind: ObjectKind::Class(ClassObject {
            class_id: ClassId::Promise,
            payload: ClassPayload::Promise(PromiseData::new()),
        }),
    });
    cx.host_hooks.promise_event(ptr, PromiseEventKind::Created);
    ptr
}

fn data_mut(cx: &mut Context, promise: ObjectPtr) -> &mut PromiseData {
    match &mut cx.heap.objects.get_mut(promise).kind {
        ObjectKind::Class(ClassObject { payload: ClassPayload::Promise(data), .. }) => data,
        _ => panic!("not a promise object"),
    }
}

/// `FulfillPromise` / `RejectPromise`: moves a pending promise to a
/// settled state, enqueueing every registered reaction as a job and
/// dropping the reaction lists (spec.md §4.9: settling is one-shot).
fn settle(cx: &mut Context, promise: ObjectPtr, state: PromiseState) {
    let data = data_mut(cx, promise);
    if !matches!(data.state, PromiseState::Pending) {
        return;
    }
    data.state = state;
    let reactions = match state {
        PromiseState::Fulfilled(_) => std::mem::take(&mut data.fulfill_reactions),
        PromiseState::Rejected(_) => std::mem::take(&mut data.reject_reactions),
        PromiseState::Pending => unreachable!(),
    };
    data.reject_reactions.clear();
    data.fulfill_reactions.clear();
    cx.host_hooks.promise_event(
        promise,
        if matches!(state, PromiseState::Rejected(_)) {
            PromiseEventKind::Rejected
        } else {
            PromiseEventKind::Resolved
        },
    );
    for reaction in reactions {
        enqueue_reaction_job(cx, reaction, state);
    }
    if matches!(state, PromiseState::Rejected(_)) {
        let handled = data_mut(cx, promise).is_handled;
        cx.host_hooks.track_promise_rejection(promise, PromiseRejectionOp::Reject);
        if !handled {
            cx.host_hooks.promise_event(promise, PromiseEventKind::UnhandledRejection);
        }
    }
}

pub fn resolve_promise(cx: &mut Context, promise: ObjectPtr, value: Value) {
    settle(cx, promise, PromiseState::Fulfilled(value));
}

pub fn reject_promise(cx: &mut Context, promise: ObjectPtr, reason: Value) {
    settle(cx, promise, PromiseState::Rejected(reason));
}

fn enqueue_reaction_job(cx: &mut Context, reaction: PromiseReaction, state: PromiseState) {
    let value = match state {
        PromiseState::Fulfilled(v) | PromiseState::Rejected(v) => v,
        PromiseState::Pending => unreachable!(),
    };
    let is_rejection = matches!(state, PromiseState::Rejected(_));
    let mut roots = vec![value, Value::Object(reaction.derived_promise)];
    if let Some(handler) = reaction.handler {
        roots.push(handler);
    }
    cx.job_queue.push_back(Job::new(roots, move |cx| {
        let outcome = match reaction.handler {
            Some(handler) => call(cx, handler, Value::Undefined, &[value]),
            // No handler registered for this branch: `then` without a
            // fulfill/reject callback passes the value/reason through.
            None if is_rejection => Err(cx.throw_abort(value)),
            None => Ok(value),
        };
        match outcome {
            Ok(result) => resolve_promise(cx, reaction.derived_promise, result),
            Err(err) => {
                let reason = cx.get_value_from_error(err);
                reject_promise(cx, reaction.derived_promise, reason);
            }
        }
        Ok(())
    }));
}

/// `PerformPromiseThen`: registers reactions against `promise`'s current
/// state (enqueueing immediately if already settled) and returns the
/// derived promise `.then` produces.
pub fn perform_then(cx: &mut Context, promise: ObjectPtr, on_fulfilled: Option<Value>, on_rejected: Option<Value>) -> ObjectPtr {
    let derived = new_promise(cx);
    let was_handled = data_mut(cx, promise).is_handled;
    data_mut(cx, promise).is_handled = true;
    let state = data_mut(cx, promise).state;
    let fulfill_reaction = PromiseReaction { handler: on_fulfilled, derived_promise: derived };
    let reject_reaction = PromiseReaction { handler: on_rejected, derived_promise: derived };
    match state {
        PromiseState::Pending => {
            data_mut(cx, promise).fulfill_reactions.push(fulfill_reaction);
            data_mut(cx, promise).reject_reactions.push(reject_reaction);
        }
        PromiseState::Fulfilled(_) => enqueue_reaction_job(cx, fulfill_reaction, state),
        PromiseState::Rejected(_) => {
            if !was_handled {
                cx.host_hooks.promise_event(promise, PromiseEventKind::HandlerAddedAfterRejection);
                cx.host_hooks.track_promise_rejection(promise, PromiseRejectionOp::Handle);
            }
            enqueue_reaction_job(cx, reject_reaction, state);
        }
    }
    cx.host_hooks.promise_event(promise, PromiseEventKind::ReactionEnqueued);
    derived
}

/// Drains the job queue FIFO. Stops (and leaves remaining jobs queued) on
/// the first job that returns an error, mirroring spec.md §4.9's "a job
/// that throws does not prevent later enqueued jobs from eventually
/// running on a subsequent drain call".
pub fn run_all_enqueued_jobs(cx: &mut Context) -> JsResult<()> {
    while let Some(job) = cx.job_queue.pop_front() {
        (job.run)(cx)?;
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
    fn resolve_before_then_enqueues_immediately() {
        let mut cx = new_cx();
        let p = new_promise(&mut cx);
        resolve_promise(&mut cx, p, Value::Integer(1));
        let seen = std::rc::Rc::new(std::cell::RefCell::new(None));
        let seen_clone = seen.clone();
        let handler = cx.heap.objects.alloc(ObjectData::new_function(
            None,
            None,
            crate::object::FunctionPayload::Native(Rc::new(move |_, _, args| {
                *seen_clone.borrow_mut() = Some(args[0]);
                Ok(Value::Undefined)
            })),
        ));
        perform_then(&mut cx, p, Some(Value::Object(handler)), None);
        run_all_enqueued_jobs(&mut cx).unwrap();
        assert_eq!(*seen.borrow(), Some(Value::Integer(1)));
    }

    #[test]
    fn then_before_resolve_enqueues_on_settle() {
        let mut cx = new_cx();
        let p = new_promise(&mut cx);
        let seen = std::rc::Rc::new(std::cell::RefCell::new(false));
        let seen_clone = seen.clone();
        let handler = cx.heap.objects.alloc(ObjectData::new_function(
            None,
            None,
            crate::object::FunctionPayload::Native(Rc::new(move |_, _, _| {
                *seen_clone.borrow_mut() = true;
                Ok(Value::Undefined)
            })),
        ));
        perform_then(&mut cx, p, Some(Value::Object(handler)), None);
        assert!(cx.job_queue.is_empty());
        resolve_promise(&mut cx, p, Value::Undefined);
        run_all_enqueued_jobs(&mut cx).unwrap();
        assert!(*seen.borrow());
    }

    #[test]
    fn double_settle_is_ignored() {
        let mut cx = new_cx();
        let p = new_promise(&mut cx);
        resolve_promise(&mut cx, p, Value::Integer(1));
        reject_promise(&mut cx, p, Value::Integer(2));
        match data_mut(&mut cx, p).state {
            PromiseState::Fulfilled(Value::Integer(1)) => {}
            _ => panic!("second settle should be a no-op"),
        }
    }
}
