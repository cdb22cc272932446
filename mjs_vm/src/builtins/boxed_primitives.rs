//! `Boolean`, `Number` and `String` constructors and their prototype
//! `valueOf`/`toString` members (ECMA-262 15.6/15.7/15.8, bounded to the
//! members spec.md §8's scenarios exercise).

use mjs_heap::{Heap, JsStringData, ObjectHandle, Value};

use super::{define_constructor, install_native_function, make_constructable_function, Intrinsics};
use crate::agent::Agent;
use crate::error::{ErrorKind, JsResult};

/// Accepts either the bare primitive (`this` inside a function called with
/// a primitive receiver in non-strict code stays unboxed here since these
/// natives never force `this`-boxing themselves) or a matching boxed
/// wrapper object.
fn unwrap_boxed(agent: &Agent, this: Value, class_name: &str) -> Option<Value> {
    match this {
        Value::Boolean(_) if class_name == "Boolean" => Some(this),
        Value::Number(_) if class_name == "Number" => Some(this),
        Value::String(_) if class_name == "String" => Some(this),
        Value::Object(obj) => {
            let data = agent.heap().object(obj);
            (data.class_name.as_ref() == class_name).then(|| Value::from_representation(data.internal_value))
        }
        _ => None,
    }
}

fn require_boxed(agent: &mut Agent, this: Value, class_name: &str) -> JsResult<Value> {
    unwrap_boxed(agent, this, class_name)
        .ok_or_else(|| agent.throw_error(ErrorKind::Type, format!("not a {class_name}")))
}

pub fn install_boolean_constructor(heap: &mut Heap, intrinsics: &Intrinsics, global: ObjectHandle) {
    let prototype = intrinsics.boolean_prototype();
    heap.object_mut(prototype).internal_value = Value::Boolean(false).to_representation();
    install_native_function(heap, prototype, "valueOf", 0, |agent, this, _args| {
        require_boxed(agent, this, "Boolean")
    });
    install_native_function(heap, prototype, "toString", 0, |agent, this, _args| {
        let v = require_boxed(agent, this, "Boolean")?;
        let text = if matches!(v, Value::Boolean(true)) { "true" } else { "false" };
        let handle = agent.heap_mut().allocate_string(JsStringData::from_str(text));
        Ok(Value::String(handle))
    });
    let ctor = make_constructable_function(
        heap,
        intrinsics.function_prototype(),
        "Boolean",
        1,
        |agent, _this, args| Ok(Value::Boolean(agent.to_boolean(args.first().copied().unwrap_or(Value::Undefined)))),
        |agent, args, new_target| {
            let b = agent.to_boolean(args.first().copied().unwrap_or(Value::Undefined));
            agent.heap_mut().object_mut(new_target).internal_value = Value::Boolean(b).to_representation();
            Ok(Value::Object(new_target))
        },
    );
    define_constructor(heap, global, "Boolean", ctor, prototype);
}

pub fn install_number_constructor(heap: &mut Heap, intrinsics: &Intrinsics, global: ObjectHandle) {
    let prototype = intrinsics.number_prototype();
    heap.object_mut(prototype).internal_value = Value::Number(0.0).to_representation();
    install_native_function(heap, prototype, "valueOf", 0, |agent, this, _args| {
        require_boxed(agent, this, "Number")
    });
    install_native_function(heap, prototype, "toString", 0, |agent, this, _args| {
        let v = require_boxed(agent, this, "Number")?;
        let Value::Number(n) = v else { unreachable!() };
        let handle = agent.heap_mut().allocate_string(JsStringData::from_str(&crate::conversion::number_to_string(n)));
        Ok(Value::String(handle))
    });
    let ctor = make_constructable_function(
        heap,
        intrinsics.function_prototype(),
        "Number",
        1,
        |agent, _this, args| match args.first() {
            Some(v) => Ok(Value::Number(agent.to_number(*v)?)),
            None => Ok(Value::Number(0.0)),
        },
        |agent, args, new_target| {
            let n = match args.first() {
                Some(v) => agent.to_number(*v)?,
                None => 0.0,
            };
            agent.heap_mut().object_mut(new_target).internal_value = Value::Number(n).to_representation();
            Ok(Value::Object(new_target))
        },
    );
    define_constructor(heap, global, "Number", ctor, prototype);
}

pub fn install_string_constructor(heap: &mut Heap, intrinsics: &Intrinsics, global: ObjectHandle) {
    let prototype = intrinsics.string_prototype();
    let empty = heap.allocate_string(JsStringData::from_str(""));
    heap.object_mut(prototype).internal_value = Value::String(empty).to_representation();
    install_native_function(heap, prototype, "valueOf", 0, |agent, this, _args| {
        require_boxed(agent, this, "String")
    });
    install_native_function(heap, prototype, "toString", 0, |agent, this, _args| {
        require_boxed(agent, this, "String")
    });
    install_native_function(heap, prototype, "charAt", 1, |agent, this, args| {
        let s = agent.to_js_string(this)?;
        let index = match args.first() {
            Some(v) => agent.to_number(*v)? as i64,
            None => 0,
        };
        let units: Vec<u16> = s.encode_utf16().collect();
        let ch = (index >= 0 && (index as usize) < units.len())
            .then(|| String::from_utf16_lossy(&units[index as usize..index as usize + 1]))
            .unwrap_or_default();
        let handle = agent.heap_mut().allocate_string(JsStringData::from_str(&ch));
        Ok(Value::String(handle))
    });
    install_native_function(heap, prototype, "indexOf", 1, |agent, this, args| {
        let s = agent.to_js_string(this)?;
        let needle = match args.first() {
            Some(v) => agent.to_js_string(*v)?,
            None => "undefined".to_string(),
        };
        let index = s.find(&needle).map(|byte_index| s[..byte_index].encode_utf16().count() as f64).unwrap_or(-1.0);
        Ok(Value::Number(index))
    });
    let ctor = make_constructable_function(
        heap,
        intrinsics.function_prototype(),
        "String",
        1,
        |agent, _this, args| match args.first() {
            Some(v) => {
                let s = agent.to_js_string(*v)?;
                let handle = agent.heap_mut().allocate_string(JsStringData::from_str(&s));
                Ok(Value::String(handle))
            }
            None => {
                let handle = agent.heap_mut().allocate_string(JsStringData::from_str(""));
                Ok(Value::String(handle))
            }
        },
        |agent, args, new_target| {
            let s = match args.first() {
                Some(v) => agent.to_js_string(*v)?,
                None => String::new(),
            };
            let handle = agent.heap_mut().allocate_string(JsStringData::from_str(&s));
            agent.heap_mut().object_mut(new_target).internal_value = Value::String(handle).to_representation();
            Ok(Value::Object(new_target))
        },
    );
    define_constructor(heap, global, "String", ctor, prototype);
}
