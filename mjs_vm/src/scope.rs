use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use mjs_heap::{JsObjectData, ObjectHandle, TrackedHandle};

/// A linked activation record: an activation object plus a parent scope.
/// The activation object is held through a [`TrackedHandle`] so the scope
/// chain is found automatically by the garbage collector's root
/// enumeration without the evaluator needing to thread it through as an
/// explicit root on every collection.
#[derive(Clone)]
pub struct Scope(Rc<ScopeInner>);

struct ScopeInner {
    activation: TrackedHandle<JsObjectData>,
    parent: Option<Scope>,
    /// Names of function declarations already hoisted into this block: a
    /// function definition that appears first wins, and later
    /// re-declarations of the same name are skipped on replay.
    active_function_definitions: RefCell<HashSet<Rc<str>>>,
}

impl Scope {
    pub fn new(activation: TrackedHandle<JsObjectData>, parent: Option<Scope>) -> Self {
        Scope(Rc::new(ScopeInner {
            activation,
            parent,
            active_function_definitions: RefCell::new(HashSet::new()),
        }))
    }

    pub fn activation(&self) -> ObjectHandle {
        ObjectHandle::new(self.0.activation.position())
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.0.parent.as_ref()
    }

    /// Records that `name`'s function declaration has already been bound
    /// in this block; returns `true` the first time a given name is seen
    /// (the caller should (re)bind the activation property only then).
    pub fn mark_function_definition_active(&self, name: &str) -> bool {
        self.0.active_function_definitions.borrow_mut().insert(Rc::from(name))
    }

    /// Walks outward from `self`, calling `f` on each scope in turn until
    /// it returns `Some`.
    pub fn find<T>(&self, mut f: impl FnMut(&Scope) -> Option<T>) -> Option<T> {
        let mut current = Some(self);
        while let Some(scope) = current {
            if let Some(result) = f(scope) {
                return Some(result);
            }
            current = scope.parent();
        }
        None
    }
}
