//! The `Error` object family (ECMA-262 15.11): `Error` plus the six native
//! subtypes (`EvalError`, `RangeError`, `ReferenceError`, `SyntaxError`,
//! `TypeError`, `URIError`) and the `AssertionError` kind SPEC_FULL §4.4
//! adds for the evaluator's own internal assertion failures.

use mjs_heap::{property_key, Attributes, Heap, JsObjectData, JsStringData, ObjectHandle, PropertySlot, Value};

use super::{define_constructor, install_native_function, make_constructable_function, Intrinsics};
use crate::agent::Agent;
use crate::error::{ErrorKind, JsResult};

pub fn install_error_prototype_members(heap: &mut Heap, prototype: ObjectHandle, name: &str) {
    let name_handle = heap.allocate_string(JsStringData::from_str(name));
    heap.define_own_property(
        prototype,
        property_key("name"),
        PropertySlot::data(Value::String(name_handle).to_representation(), Attributes::new(Attributes::DONT_ENUM)),
    )
    .ok();
    let message_handle = heap.allocate_string(JsStringData::from_str(""));
    heap.define_own_property(
        prototype,
        property_key("message"),
        PropertySlot::data(Value::String(message_handle).to_representation(), Attributes::new(Attributes::DONT_ENUM)),
    )
    .ok();
    install_native_function(heap, prototype, "toString", 0, |agent, this, _args| {
        let obj = agent.to_object(this)?;
        let name = agent.get_property(obj, &property_key("name"), this)?;
        let name = agent.to_js_string(name)?;
        let message = agent.get_property(obj, &property_key("message"), this)?;
        let message = agent.to_js_string(message)?;
        let text = match (name.as_str(), message.as_str()) {
            (n, "") => n.to_string(),
            ("", m) => m.to_string(),
            (n, m) => format!("{n}: {m}"),
        };
        let handle = agent.heap_mut().allocate_string(JsStringData::from_str(&text));
        Ok(Value::String(handle))
    });
}

pub fn install_error_constructors(heap: &mut Heap, intrinsics: &Intrinsics, global: ObjectHandle) {
    for kind in [
        ErrorKind::Generic,
        ErrorKind::Eval,
        ErrorKind::Range,
        ErrorKind::Reference,
        ErrorKind::Syntax,
        ErrorKind::Type,
        ErrorKind::Uri,
        ErrorKind::Assertion,
    ] {
        let prototype = intrinsics.error_prototype(kind);
        let name = kind.constructor_name();
        let ctor = make_constructable_function(
            heap,
            intrinsics.function_prototype(),
            name,
            1,
            move |agent, _this, args| Ok(Value::Object(new_error(agent, kind, args)?)),
            move |agent, args, new_target| {
                populate_error(agent, new_target, args)?;
                Ok(Value::Object(new_target))
            },
        );
        define_constructor(heap, global, name, ctor, prototype);
    }
}

/// Builds a fresh native error object of `kind`, used both by `Agent::make_error`
/// (internal throws) and the `Error(...)`/`TypeError(...)` call forms.
pub fn construct_error(agent: &mut Agent, kind: ErrorKind, message: String, stack: String) -> Value {
    let prototype = agent.intrinsics.error_prototype(kind);
    let mut data = JsObjectData::new("Error", Value::Object(prototype).to_representation());
    let message_handle = agent.heap_mut().allocate_string(JsStringData::from_str(&message));
    data.properties.insert(
        property_key("message"),
        PropertySlot::data(Value::String(message_handle).to_representation(), Attributes::writable_enumerable_configurable()),
    );
    let stack_handle = agent.heap_mut().allocate_string(JsStringData::from_str(&stack));
    data.properties.insert(
        property_key("stack"),
        PropertySlot::data(Value::String(stack_handle).to_representation(), Attributes::new(Attributes::DONT_ENUM)),
    );
    let handle = agent.heap_mut().allocate_object(data);
    Value::Object(handle)
}

fn new_error(agent: &mut Agent, kind: ErrorKind, args: &[Value]) -> JsResult<ObjectHandle> {
    let message = match args.first() {
        Some(Value::Undefined) | None => String::new(),
        Some(v) => agent.to_js_string(*v)?,
    };
    let stack = agent.capture_stack_trace();
    match construct_error(agent, kind, message, stack) {
        Value::Object(handle) => Ok(handle),
        _ => unreachable!("construct_error always returns an object"),
    }
}

fn populate_error(agent: &mut Agent, target: ObjectHandle, args: &[Value]) -> JsResult<()> {
    if let Some(message) = args.first().filter(|v| !matches!(v, Value::Undefined)) {
        let message = agent.to_js_string(*message)?;
        let handle = agent.heap_mut().allocate_string(JsStringData::from_str(&message));
        agent
            .heap_mut()
            .define_own_property(
                target,
                property_key("message"),
                PropertySlot::data(Value::String(handle).to_representation(), Attributes::writable_enumerable_configurable()),
            )
            .ok();
    }
    Ok(())
}
