use std::rc::Rc;

use mjs_ast::{SourceExtend, Version};
use mjs_heap::{Heap, JsObjectData, ObjectHandle, Root, TrackedHandle, Value};

use crate::builtins::Intrinsics;
use crate::error::{ErrorKind, JsError, JsResult};
use crate::scope::Scope;

/// Per-statement trace hook: called with the source extend of every
/// statement the evaluator is about to execute, letting an embedder
/// implement tracing or a debugger without the core depending on any
/// particular I/O story.
pub type StatementTraceFn = Box<dyn FnMut(&SourceExtend)>;

pub struct InterpreterConfig {
    pub heap_capacity_slots: u32,
    pub version: Version,
    pub trace_statements: Option<StatementTraceFn>,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            heap_capacity_slots: 1 << 20,
            version: Version::Es5,
            trace_statements: None,
        }
    }
}

/// How many statements the GC cool-down counter decays from after a
/// collection. A collection only runs once this reaches zero and the heap
/// is mostly full, keeping GC off the hot path of most statements.
const GC_COOLDOWN_STATEMENTS: u32 = 1000;
const GC_TRIGGER_USE_PERCENTAGE: f64 = 90.0;

/// The evaluator's top-level owner object: the heap, the global object,
/// the active scope chain, strict-mode flag, a diagnostics stack of source
/// extends, the GC cool-down counter, the pending label set, and the "in a
/// direct `eval` call" flag. Named `Agent` after the teacher's identical
/// concept (`ecmascript::execution::Agent`).
pub struct Agent {
    pub(crate) heap: Heap,
    pub(crate) version: Version,
    pub(crate) intrinsics: Intrinsics,
    global_object: TrackedHandle<JsObjectData>,
    pub(crate) global_scope: Scope,
    pub(crate) scope: Scope,
    pub(crate) strict_mode: bool,
    pub(crate) extend_stack: Vec<SourceExtend>,
    gc_cooldown: u32,
    pub(crate) label_set: Vec<Rc<str>>,
    pub(crate) in_direct_eval: bool,
    trace_statements: Option<StatementTraceFn>,
}

impl Agent {
    pub fn new(config: InterpreterConfig) -> Self {
        let mut heap = Heap::new(config.heap_capacity_slots);
        let (intrinsics, global_handle) = Intrinsics::bootstrap(&mut heap, config.version);
        let global_object = heap.track_object(global_handle);
        let global_scope = Scope::new(heap.track_object(global_handle), None);
        Agent {
            heap,
            version: config.version,
            intrinsics,
            global_object,
            global_scope: global_scope.clone(),
            scope: global_scope,
            strict_mode: false,
            extend_stack: Vec::new(),
            gc_cooldown: GC_COOLDOWN_STATEMENTS,
            label_set: Vec::new(),
            in_direct_eval: false,
            trace_statements: config.trace_statements,
        }
    }

    pub fn global_object(&self) -> ObjectHandle {
        ObjectHandle::new(self.global_object.position())
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// `mjs_vm::Interpreter::define_global`: installs (or overwrites) a
    /// writable, enumerable, configurable own property on the global
    /// object.
    pub fn define_global(&mut self, name: &str, value: Value) {
        let key = mjs_heap::property_key(name);
        let repr = value.to_representation();
        self.heap
            .define_own_property(
                self.global_object(),
                key,
                mjs_heap::PropertySlot::data(repr, mjs_heap::Attributes::writable_enumerable_configurable()),
            )
            .ok();
    }

    /// Source position tracking for diagnostics: every nested construct
    /// that pushes one of these scoped-state stacks restores it on every
    /// exit path — including an in-flight `JsResult::Err` — by wrapping
    /// the nested evaluation in a closure rather than an unwind-based
    /// `Drop` guard, since JS exceptions are ordinary `Result::Err` values
    /// here, not Rust panics.
    pub(crate) fn with_extend<T>(&mut self, extend: SourceExtend, f: impl FnOnce(&mut Agent) -> T) -> T {
        self.extend_stack.push(extend);
        let result = f(self);
        self.extend_stack.pop();
        result
    }

    pub(crate) fn with_strict_mode<T>(&mut self, strict: bool, f: impl FnOnce(&mut Agent) -> T) -> T {
        let previous = self.strict_mode;
        self.strict_mode = strict;
        let result = f(self);
        self.strict_mode = previous;
        result
    }

    pub(crate) fn with_scope<T>(&mut self, scope: Scope, f: impl FnOnce(&mut Agent) -> T) -> T {
        let previous = std::mem::replace(&mut self.scope, scope);
        let result = f(self);
        self.scope = previous;
        result
    }

    pub(crate) fn with_labels<T>(&mut self, labels: Vec<Rc<str>>, f: impl FnOnce(&mut Agent) -> T) -> T {
        let previous_len = self.label_set.len();
        self.label_set.extend(labels);
        let result = f(self);
        self.label_set.truncate(previous_len);
        result
    }

    pub(crate) fn scope(&self) -> &Scope {
        &self.scope
    }

    pub(crate) fn current_extend(&self) -> Option<&SourceExtend> {
        self.extend_stack.last()
    }

    /// Renders the current call stack: every call pushes the call-site
    /// extend, and `throw` captures the current chain as a string.
    pub(crate) fn capture_stack_trace(&self) -> String {
        self.extend_stack
            .iter()
            .rev()
            .map(|e| format!("  at {e}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Decays the GC cool-down counter by one (called once per evaluated
    /// statement) and runs a collection if it has reached zero and the
    /// heap is more than 90% used. GC never runs mid-expression because
    /// this is only called between full statement evaluations. `protect`
    /// roots values that are live on the Rust stack at the call site but
    /// not yet reachable through the scope chain (e.g. a completion's
    /// result still propagating outward).
    pub(crate) fn maybe_collect(&mut self, protect: &mut [&mut Value]) {
        if self.gc_cooldown > 0 {
            self.gc_cooldown -= 1;
            return;
        }
        if self.heap.use_percentage() > GC_TRIGGER_USE_PERCENTAGE {
            let mut roots: Vec<&mut dyn Root> = protect.iter_mut().map(|v| *v as &mut dyn Root).collect();
            self.heap.garbage_collect(&mut roots);
        }
        self.gc_cooldown = GC_COOLDOWN_STATEMENTS;
    }

    pub(crate) fn trace_statement(&mut self, extend: &SourceExtend) {
        if let Some(trace) = &mut self.trace_statements {
            trace(extend);
        }
    }

    /// Constructs a native error object of the given kind, with `message`
    /// and the current call-stack trace attached.
    pub(crate) fn make_error(&mut self, kind: ErrorKind, message: impl Into<String>) -> Value {
        let stack = self.capture_stack_trace();
        crate::builtins::error::construct_error(self, kind, message.into(), stack)
    }

    pub(crate) fn throw_error(&mut self, kind: ErrorKind, message: impl Into<String>) -> JsError {
        JsError::new(self.make_error(kind, message))
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// `GetValue` (ECMA-262 8.7.1): a plain value passes through
    /// unchanged; an unresolvable identifier raises `ReferenceError`; a
    /// property reference boxes its base (a no-op if it's already an
    /// object) and reads through the prototype chain.
    pub fn get_value(&mut self, result: crate::reference::EvalResult) -> JsResult<Value> {
        match result {
            crate::reference::EvalResult::Value(v) => Ok(v),
            crate::reference::EvalResult::Ref(crate::reference::Reference::Unresolvable { name, .. }) => {
                Err(self.throw_error(ErrorKind::Reference, format!("{name} is not defined")))
            }
            crate::reference::EvalResult::Ref(crate::reference::Reference::Property { base, name, .. }) => {
                let obj = self.to_object(base)?;
                self.get_property(obj, &name, base)
            }
        }
    }

    /// `PutValue` (ECMA-262 8.7.2): an unresolvable identifier creates a
    /// property on the global object in non-strict code, or raises
    /// `ReferenceError` in strict code (ES5 §10.2.1's implicit-global ban).
    pub fn put_value(&mut self, reference: crate::reference::Reference, value: Value) -> JsResult<()> {
        match reference {
            crate::reference::Reference::Unresolvable { name, strict } => {
                if strict {
                    return Err(self.throw_error(ErrorKind::Reference, format!("{name} is not defined")));
                }
                let global = self.global_object();
                self.put_property(global, name, value, Value::Object(global), false)
            }
            crate::reference::Reference::Property { base, name, strict } => {
                let obj = self.to_object(base)?;
                self.put_property(obj, name, value, base, strict)
            }
        }
    }

    /// Resolves an identifier against the active scope chain (ECMA-262
    /// 10.1.4): the innermost activation object whose own-or-inherited
    /// properties include `name` wins; falls through to `Unresolvable` if
    /// no scope (including the global object) has it.
    pub(crate) fn resolve_identifier(&self, name: &str) -> crate::reference::Reference {
        let key = mjs_heap::property_key(name);
        let found = self.scope.find(|scope| {
            let activation = scope.activation();
            self.heap.find_property(activation, &key).map(|_| activation)
        });
        match found {
            Some(activation) => crate::reference::Reference::Property {
                base: Value::Object(activation),
                name: key,
                strict: self.strict_mode,
            },
            None => crate::reference::Reference::Unresolvable {
                name: key,
                strict: self.strict_mode,
            },
        }
    }
}

pub type AgentJsResult<T> = JsResult<T>;
