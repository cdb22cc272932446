//! `Object` constructor and `Object.prototype` (ECMA-262 15.2, bounded to
//! the members this interpreter's testable scenarios need: `toString`,
//! `valueOf`, `hasOwnProperty`, `isPrototypeOf`, `propertyIsEnumerable`).

use mjs_heap::{Heap, JsObjectData, JsStringData, ObjectHandle, Value};

use super::{define_constructor, install_native_function, make_constructable_function, Intrinsics};
use crate::agent::Agent;
use crate::error::JsResult;

pub fn install_object_prototype_members(heap: &mut Heap, prototype: ObjectHandle) {
    install_native_function(heap, prototype, "toString", 0, |agent, this, _args| {
        let class = match this {
            Value::Undefined => "Undefined".to_string(),
            Value::Null => "Null".to_string(),
            _ => {
                let obj = agent.to_object(this)?;
                agent.heap().object(obj).class_name.to_string()
            }
        };
        let handle = agent.heap_mut().allocate_string(JsStringData::from_str(&format!("[object {class}]")));
        Ok(Value::String(handle))
    });
    install_native_function(heap, prototype, "valueOf", 0, |agent, this, _args| {
        Ok(Value::Object(agent.to_object(this)?))
    });
    install_native_function(heap, prototype, "hasOwnProperty", 1, |agent, this, args| {
        let obj = agent.to_object(this)?;
        let key = agent.to_property_key(args.first().copied().unwrap_or(Value::Undefined))?;
        Ok(Value::Boolean(agent.heap().get_own_property(obj, &key).is_some()))
    });
    install_native_function(heap, prototype, "isPrototypeOf", 1, |agent, this, args| {
        let Some(candidate) = args.first().and_then(|v| v.as_object()) else {
            return Ok(Value::Boolean(false));
        };
        let obj = agent.to_object(this)?;
        let mut current = agent.heap().prototype_of(candidate);
        while let Some(p) = current {
            if p == obj {
                return Ok(Value::Boolean(true));
            }
            current = agent.heap().prototype_of(p);
        }
        Ok(Value::Boolean(false))
    });
    install_native_function(heap, prototype, "propertyIsEnumerable", 1, |agent, this, args| {
        let obj = agent.to_object(this)?;
        let key = agent.to_property_key(args.first().copied().unwrap_or(Value::Undefined))?;
        Ok(Value::Boolean(
            agent.heap().get_own_property(obj, &key).is_some_and(|s| !s.attributes.is_dont_enum()),
        ))
    });
}

pub fn install_object_constructor(heap: &mut Heap, intrinsics: &Intrinsics, global: ObjectHandle) {
    let prototype = intrinsics.object_prototype();
    let ctor = make_constructable_function(
        heap,
        intrinsics.function_prototype(),
        "Object",
        1,
        |agent, _this, args| call_object(agent, args),
        |agent, args, new_target| construct_object(agent, args, new_target),
    );
    define_constructor(heap, global, "Object", ctor, prototype);
}

fn call_object(agent: &mut Agent, args: &[Value]) -> JsResult<Value> {
    match args.first().copied() {
        None | Some(Value::Undefined) | Some(Value::Null) => Ok(Value::Object(new_plain_object(agent))),
        Some(v) => Ok(Value::Object(agent.to_object(v)?)),
    }
}

fn construct_object(agent: &mut Agent, args: &[Value], new_target: ObjectHandle) -> JsResult<Value> {
    match args.first().copied() {
        None | Some(Value::Undefined) | Some(Value::Null) => Ok(Value::Object(new_target)),
        Some(v) => Ok(Value::Object(agent.to_object(v)?)),
    }
}

fn new_plain_object(agent: &mut Agent) -> ObjectHandle {
    let proto = Value::Object(agent.intrinsics.object_prototype()).to_representation();
    agent.heap_mut().allocate_object(JsObjectData::new("Object", proto))
}
