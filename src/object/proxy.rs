//! Proxy exotic objects. spec.md §3 "Proxy", §4.6.

use super::ObjectPtr;

/// Left open by spec.md §9: whether a proxy can be constructed with trap
/// results taken on trust, skipping the invariant checks ordinarily run
/// against a non-extensible target's non-configurable properties.
/// Resolved in DESIGN.md: off by default, opt-in per proxy, matching how
/// every other engine-level validation in this crate defaults to strict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProxyOptions {
    pub skip_result_validation: bool,
}

/// `target`/`handler` are `None` once the proxy has been revoked; every
/// trap dispatch checks this first and raises a type error instead of
/// forwarding to a dangling reference. spec.md §4.6 "Proxy revocation".
#[derive(Debug, Clone, Copy)]
pub struct ProxyData {
    pub target: Option<ObjectPtr>,
    pub handler: Option<ObjectPtr>,
    pub options: ProxyOptions,
}

impl ProxyData {
    pub fn new(target: ObjectPtr, handler: ObjectPtr, options: ProxyOptions) -> Self {
        Self {
            target: Some(target),
            handler: Some(handler),
            options,
        }
    }

    pub fn is_revoked(&self) -> bool {
        self.target.is_none()
    }

    pub fn revoke(&mut self) {
        self.target = None;
        self.handler = None;
    }
}

// Exercised alongside the rest of the object model in `super::tests`,
// where a real `Arena<ObjectData>` is available to mint `ObjectPtr`s from.
