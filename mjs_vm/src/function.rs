//! Function objects: the two [`HeapClosure`] implementations `mjs_heap`
//! delegates to (native Rust functions and script functions closing over
//! an AST node), plus the `Agent`-side property/call/construct helpers
//! that replicate `Heap::get`/`Heap::put`/`Heap::call_value` without the
//! self-aliasing `ctx: &mut dyn Any` those private heap methods would
//! require (see DESIGN.md).

use std::any::Any;
use std::rc::Rc;

use mjs_ast::{Ast, FunctionNode, NodeId};
use mjs_heap::{
    property_key, ArgumentsAliasData, Attributes, CallOutcome, FunctionData, HeapClosure, JsObjectData, ObjectHandle,
    ObjectKind, PropertyKey, PropertySlot, PropertyValue, Representation, Value,
};

use crate::agent::Agent;
use crate::completion::CompletionKind;
use crate::error::{ErrorKind, JsError, JsResult};
use crate::scope::Scope;

/// A native function's call body. Boxed behind an `Rc` rather than a bare
/// `fn` pointer so builtins can close over configuration (e.g. an
/// `ErrorKind` for the six native-error constructors, see
/// `builtins::error`).
pub type NativeFn = Rc<dyn Fn(&mut Agent, Value, &[Value]) -> JsResult<Value>>;
pub type NativeConstructFn = Rc<dyn Fn(&mut Agent, &[Value], ObjectHandle) -> JsResult<Value>>;

/// The `HeapClosure` backing every native (Rust-implemented) function
/// object. Captures no heap positions directly, so `fixup` is the trait's
/// default no-op.
#[derive(Clone)]
pub struct NativeClosure {
    name: Rc<str>,
    arity: u32,
    call: NativeFn,
    construct: Option<NativeConstructFn>,
}

impl NativeClosure {
    pub fn new(name: impl AsRef<str>, arity: u32, call: NativeFn) -> Self {
        Self {
            name: Rc::from(name.as_ref()),
            arity,
            call,
            construct: None,
        }
    }

    pub fn with_construct(mut self, construct: NativeConstructFn) -> Self {
        self.construct = Some(construct);
        self
    }
}

impl std::fmt::Debug for NativeClosure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeClosure").field("name", &self.name).finish()
    }
}

impl HeapClosure for NativeClosure {
    fn call(&self, ctx: &mut dyn Any, this: Value, args: &[Value]) -> CallOutcome {
        let agent = ctx.downcast_mut::<Agent>().expect("NativeClosure ctx must be an Agent");
        (self.call)(agent, this, args).map_err(JsError::value)
    }

    fn construct(&self, ctx: &mut dyn Any, args: &[Value], new_target: ObjectHandle) -> Option<CallOutcome> {
        let construct = self.construct.as_ref()?;
        let agent = ctx.downcast_mut::<Agent>().expect("NativeClosure ctx must be an Agent");
        Some(construct(agent, args, new_target).map_err(JsError::value))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> u32 {
        self.arity
    }
}

/// The `HeapClosure` backing every script-defined function. Holds the
/// parsed program's AST alive through an `Rc` for as long as any function
/// value created from it survives, independent of whether the `Ast` that
/// produced it is still the "current" program (relevant once `eval` has
/// produced further, separate `Ast`s).
#[derive(Clone)]
pub struct ScriptClosure {
    ast: Rc<Ast>,
    body: NodeId,
    params: Rc<[String]>,
    name: Option<Rc<str>>,
    defining_scope: Scope,
    is_strict: bool,
}

impl ScriptClosure {
    pub fn new(ast: Rc<Ast>, node: &FunctionNode, defining_scope: Scope) -> Self {
        Self {
            ast,
            body: node.body,
            params: Rc::from(node.params.clone()),
            name: node.name.as_deref().map(Rc::from),
            defining_scope,
            is_strict: node.is_strict,
        }
    }
}

impl std::fmt::Debug for ScriptClosure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptClosure")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

impl HeapClosure for ScriptClosure {
    fn call(&self, ctx: &mut dyn Any, this: Value, args: &[Value]) -> CallOutcome {
        let agent = ctx.downcast_mut::<Agent>().expect("ScriptClosure ctx must be an Agent");
        invoke(agent, self, this, args, None).map_err(JsError::value)
    }

    fn construct(&self, ctx: &mut dyn Any, args: &[Value], new_target: ObjectHandle) -> Option<CallOutcome> {
        let agent = ctx.downcast_mut::<Agent>().expect("ScriptClosure ctx must be an Agent");
        Some(invoke(agent, self, Value::Object(new_target), args, Some(new_target)).map_err(JsError::value))
    }

    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    fn arity(&self) -> u32 {
        self.params.len() as u32
    }
}

/// The function-invocation algorithm (spec.md §4.4 point 1):
/// 1. create a fresh activation object whose prototype is `Object.prototype`;
/// 2. bind each parameter, with later arguments overwriting earlier
///    same-named parameters;
/// 3. install `arguments` (aliased to the named parameters in non-strict
///    mode, a plain frozen-shape object in strict mode);
/// 4. bind `this`;
/// 5. self-bind a named function expression's own name, if not already
///    shadowed by a parameter;
/// 6. hoist `var`/function declarations into the activation object;
/// 7. run the body, translating a `Completion::Return` into the call's
///    result and any other abrupt completion that escapes the body into
///    `undefined` (only `throw` can legitimately escape a function body,
///    and that already propagates as `Err` rather than as a completion).
fn invoke(
    agent: &mut Agent,
    closure: &ScriptClosure,
    this: Value,
    args: &[Value],
    new_target: Option<ObjectHandle>,
) -> JsResult<Value> {
    let object_prototype = agent.intrinsics.object_prototype();
    let activation_data = JsObjectData::new("Object", Value::Object(object_prototype).to_representation());
    let activation_handle = agent.heap_mut().allocate_object(activation_data);
    let activation = agent.heap_mut().track_object(activation_handle);
    let scope = Scope::new(activation, Some(closure.defining_scope.clone()));

    let mut aliases = Vec::with_capacity(closure.params.len());
    for (i, param) in closure.params.iter().enumerate() {
        let value = args.get(i).copied().unwrap_or(Value::Undefined);
        let key = property_key(param);
        agent
            .heap_mut()
            .define_own_property(
                activation_handle,
                key.clone(),
                PropertySlot::data(value.to_representation(), Attributes::writable_enumerable_configurable()),
            )
            .ok();
        aliases.push(Some(key));
    }

    install_arguments(agent, activation_handle, closure, this, args, aliases);

    let this_value = if closure.is_strict { this } else { normalize_this(agent, this) };
    bind_non_enumerable(agent, activation_handle, "this", this_value, true);

    if let Some(name) = &closure.name {
        if !closure.params.iter().any(|p| p.as_str() == name.as_ref()) {
            bind_non_enumerable(agent, activation_handle, name, Value::Undefined, true);
        }
    }

    let completion = agent.with_scope(scope, |agent| {
        agent.with_strict_mode(closure.is_strict, |agent| {
            crate::stmt::run_function_body(agent, &closure.ast, closure.body)
        })
    })?;

    match completion.kind {
        CompletionKind::Return => Ok(completion.value),
        _ => Ok(new_target.map(Value::Object).unwrap_or(Value::Undefined)),
    }
}

/// Non-strict `this` substitution (ECMA-262 10.4.3): `undefined`/`null`
/// become the global object, primitives are boxed.
fn normalize_this(agent: &mut Agent, this: Value) -> Value {
    match this {
        Value::Undefined | Value::Null => Value::Object(agent.global_object()),
        Value::Object(_) => this,
        _ => agent.to_object(this).map(Value::Object).unwrap_or(this),
    }
}

fn bind_non_enumerable(agent: &mut Agent, obj: ObjectHandle, name: &str, value: Value, dont_delete: bool) {
    let attrs = if dont_delete {
        Attributes::new(Attributes::DONT_ENUM | Attributes::DONT_DELETE)
    } else {
        Attributes::new(Attributes::DONT_ENUM)
    };
    agent
        .heap_mut()
        .define_own_property(obj, property_key(name), PropertySlot::data(value.to_representation(), attrs))
        .ok();
}

/// Installs `arguments` on the activation object. Non-strict functions get
/// an `Arguments`-kind object whose indices alias the named parameters
/// (severed individually by `delete arguments[i]`, see `mjs_heap::heap`);
/// strict functions get a plain array-like snapshot with no aliasing and
/// poisoned `callee`/`caller` accessors (ECMA-262 10.6).
fn install_arguments(
    agent: &mut Agent,
    activation: ObjectHandle,
    closure: &ScriptClosure,
    _this: Value,
    args: &[Value],
    aliases: Vec<Option<PropertyKey>>,
) {
    let object_prototype = agent.intrinsics.object_prototype();
    let mut data = JsObjectData::new("Arguments", Value::Object(object_prototype).to_representation());
    for (i, arg) in args.iter().enumerate() {
        data.properties.insert(
            property_key(i.to_string()),
            PropertySlot::data(arg.to_representation(), Attributes::writable_enumerable_configurable()),
        );
    }
    data.properties.insert(
        property_key("length"),
        PropertySlot::data(
            Representation::number(args.len() as f64),
            Attributes::new(Attributes::DONT_ENUM),
        ),
    );

    if closure.is_strict {
        let thrower = agent.intrinsics.throw_type_error();
        data.properties.insert(
            property_key("callee"),
            PropertySlot::accessor(
                Value::Object(thrower).to_representation(),
                Value::Object(thrower).to_representation(),
                Attributes::new(Attributes::DONT_ENUM),
            ),
        );
    } else {
        data.kind = ObjectKind::Arguments(ArgumentsAliasData {
            aliases: (0..args.len().max(closure.params.len()))
                .map(|i| aliases.get(i).cloned().flatten())
                .collect(),
        });
        // `arguments.callee` is left undefined here rather than threaded
        // through to the calling function object: `HeapClosure::call`
        // never receives its own containing object handle, only
        // `this`/`args`, and script rarely depends on non-strict
        // `callee` in ES5-era code. Documented simplification (DESIGN.md).
        data.properties.insert(
            property_key("callee"),
            PropertySlot::data(Representation::UNDEFINED, Attributes::new(Attributes::DONT_ENUM)),
        );
    }

    let handle = agent.heap_mut().allocate_object(data);
    bind_non_enumerable(agent, activation, "arguments", Value::Object(handle), true);
}

/// Allocates a function object wrapping a [`ScriptClosure`], plus the
/// fresh `prototype`/`constructor` pair every function gets (ECMA-262
/// 13.2) — shared by function expressions/declarations (`crate::expr`,
/// `crate::stmt`) and the dynamic `new Function(...)` form
/// (`builtins::function`).
pub(crate) fn create_script_function(
    agent: &mut Agent,
    closure: ScriptClosure,
    named_args: u32,
    is_strict: bool,
    body_text: Rc<str>,
) -> ObjectHandle {
    let function_prototype = agent.intrinsics.function_prototype();
    let mut data = JsObjectData::new("Function", Value::Object(function_prototype).to_representation());
    data.kind = ObjectKind::Function(FunctionData {
        closure: Rc::new(closure),
        is_constructable: true,
        named_args,
        body_text,
        is_strict,
    });
    let handle = agent.heap_mut().allocate_object(data);

    let object_prototype = agent.intrinsics.object_prototype();
    let own_prototype = agent
        .heap_mut()
        .allocate_object(JsObjectData::new("Object", Value::Object(object_prototype).to_representation()));
    agent
        .heap_mut()
        .define_own_property(
            handle,
            property_key("prototype"),
            PropertySlot::data(Value::Object(own_prototype).to_representation(), Attributes::new(Attributes::DONT_ENUM)),
        )
        .ok();
    agent
        .heap_mut()
        .define_own_property(
            own_prototype,
            property_key("constructor"),
            PropertySlot::data(Value::Object(handle).to_representation(), Attributes::new(Attributes::DONT_ENUM)),
        )
        .ok();
    handle
}

impl Agent {
    /// `[[Get]]`, replicated here instead of calling `Heap::get` because
    /// that method's `ctx: &mut dyn Any` parameter would have to alias
    /// `self` (it contains the heap it's borrowed from).
    pub fn get_property(&mut self, obj: ObjectHandle, key: &PropertyKey, receiver: Value) -> JsResult<Value> {
        let slot = match self.heap.find_property(obj, key) {
            Some((_, slot)) => slot,
            None => return Ok(Value::Undefined),
        };
        match slot.value {
            PropertyValue::Data(v) => Ok(Value::from_representation(v)),
            PropertyValue::Accessor { get, .. } => {
                if get == Representation::UNDEFINED {
                    return Ok(Value::Undefined);
                }
                match Value::from_representation(get).as_object() {
                    Some(getter) => self.call_function(getter, receiver, &[]),
                    None => Ok(Value::Undefined),
                }
            }
        }
    }

    /// `[[Put]]`, mirroring `Heap::put` plus the `arguments` index-alias
    /// redirect (spec.md §4.4's parameter-aliasing note).
    pub fn put_property(&mut self, obj: ObjectHandle, key: PropertyKey, value: Value, receiver: Value, strict: bool) -> JsResult<()> {
        if let Some((_, slot)) = self.heap.find_property(obj, &key) {
            if let PropertyValue::Accessor { set, .. } = slot.value {
                if set == Representation::UNDEFINED {
                    return if strict {
                        Err(self.throw_error(ErrorKind::Type, format!("cannot set property '{key}' which has only a getter")))
                    } else {
                        Ok(())
                    };
                }
                let setter = Value::from_representation(set)
                    .as_object()
                    .expect("accessor setter must be an object when set != undefined");
                self.call_function(setter, receiver, std::slice::from_ref(&value))?;
                return Ok(());
            }
            if slot.attributes.is_read_only() {
                return if strict {
                    Err(self.throw_error(ErrorKind::Type, format!("cannot assign to read-only property '{key}'")))
                } else {
                    Ok(())
                };
            }
        } else if !self.heap.object(obj).extensible {
            return if strict {
                Err(self.throw_error(ErrorKind::Type, "object is not extensible"))
            } else {
                Ok(())
            };
        }
        self.heap
            .define_own_property(
                obj,
                key,
                PropertySlot::data(value.to_representation(), Attributes::writable_enumerable_configurable()),
            )
            .ok();
        Ok(())
    }

    fn function_closure(&mut self, callee: ObjectHandle) -> JsResult<(Rc<dyn HeapClosure>, bool)> {
        match self.heap.object(callee).as_function() {
            Some(f) => Ok((f.closure.clone(), f.is_constructable)),
            None => Err(self.throw_error(ErrorKind::Type, "value is not a function")),
        }
    }

    /// `Call(callee, this, args)` (replicating `Heap::call_value` for the
    /// same aliasing reason as `get_property` above).
    pub fn call_function(&mut self, callee: ObjectHandle, this: Value, args: &[Value]) -> JsResult<Value> {
        let (closure, _) = self.function_closure(callee)?;
        closure.call(self as &mut dyn Any, this, args).map_err(JsError::new)
    }

    /// `[[Construct]]`: builds the new object `new_target`, whose
    /// prototype is the constructor's own `"prototype"` property (falling
    /// back to `Object.prototype` when that property isn't an object,
    /// per ECMA-262 13.2.2), then delegates to the closure's own
    /// `construct`.
    pub fn construct_function(&mut self, callee: ObjectHandle, args: &[Value]) -> JsResult<Value> {
        let (closure, is_constructable) = self.function_closure(callee)?;
        if !is_constructable {
            return Err(self.throw_error(ErrorKind::Type, "value is not a constructor"));
        }
        let proto_key = property_key("prototype");
        let proto_value = self.get_property(callee, &proto_key, Value::Object(callee))?;
        let proto_repr = match proto_value {
            Value::Object(h) => Value::Object(h).to_representation(),
            _ => Value::Object(self.intrinsics.object_prototype()).to_representation(),
        };
        let new_target = self.heap.allocate_object(JsObjectData::new("Object", proto_repr));
        match closure.construct(self as &mut dyn Any, args, new_target) {
            Some(outcome) => outcome.map_err(JsError::new),
            None => Err(self.throw_error(ErrorKind::Type, "value is not a constructor")),
        }
    }
}
