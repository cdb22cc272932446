//! `Array` constructor and the handful of `Array.prototype` members this
//! interpreter implements (`toString`, `join`, `length` intentionally
//! left as the heap's own fast-path property rather than a prototype
//! accessor). `push`/`slice`/`map`/etc. are out of scope (spec.md §1).

use mjs_heap::{property_key, Heap, JsObjectData, JsStringData, ObjectHandle, ObjectKind, Value};

use super::{define_constructor, install_native_function, make_constructable_function, Intrinsics};
use crate::agent::Agent;
use crate::error::JsResult;

pub fn make_array_prototype(heap: &mut Heap, prototype: ObjectHandle) {
    heap.object_mut(prototype).kind = ObjectKind::Array(mjs_heap::ArrayData::default());
    install_native_function(heap, prototype, "toString", 0, |agent, this, _args| join(agent, this, ","));
    install_native_function(heap, prototype, "join", 1, |agent, this, args| {
        let separator = match args.first() {
            Some(Value::Undefined) | None => ",".to_string(),
            Some(v) => agent.to_js_string(*v)?,
        };
        join(agent, this, &separator)
    });
}

fn join(agent: &mut Agent, this: Value, separator: &str) -> JsResult<Value> {
    let obj = agent.to_object(this)?;
    let length = match agent.heap().object(obj).as_array() {
        Some(arr) => arr.length,
        None => {
            let len_value = agent.get_property(obj, &property_key("length"), this)?;
            agent.to_number(len_value)? as u32
        }
    };
    let mut parts = Vec::with_capacity(length as usize);
    for i in 0..length {
        let element = agent.get_property(obj, &property_key(i.to_string()), this)?;
        parts.push(match element {
            Value::Undefined | Value::Null => String::new(),
            v => agent.to_js_string(v)?,
        });
    }
    let handle = agent.heap_mut().allocate_string(JsStringData::from_str(&parts.join(separator)));
    Ok(Value::String(handle))
}

pub fn install_array_constructor(heap: &mut Heap, intrinsics: &Intrinsics, global: ObjectHandle) {
    let prototype = intrinsics.array_prototype();
    let ctor = make_constructable_function(
        heap,
        intrinsics.function_prototype(),
        "Array",
        1,
        |agent, _this, args| Ok(Value::Object(new_array(agent, args)?)),
        |agent, args, _new_target| Ok(Value::Object(new_array(agent, args)?)),
    );
    define_constructor(heap, global, "Array", ctor, prototype);
}

/// `new Array(n)` with a single number argument pre-sizes an empty array
/// of length `n`; any other argument list becomes the array's elements.
fn new_array(agent: &mut Agent, args: &[Value]) -> JsResult<ObjectHandle> {
    let prototype_repr = Value::Object(agent.intrinsics.array_prototype()).to_representation();
    let mut data = JsObjectData::new("Array", prototype_repr);
    let mut array = mjs_heap::ArrayData::default();
    if let [Value::Number(n)] = args {
        if n.fract() == 0.0 && *n >= 0.0 && *n <= u32::MAX as f64 {
            array.truncate(*n as u32);
        } else {
            return Err(agent.throw_error(crate::error::ErrorKind::Range, "invalid array length"));
        }
    } else {
        for (i, arg) in args.iter().enumerate() {
            array.set(i as u32, arg.to_representation());
        }
    }
    data.kind = ObjectKind::Array(array);
    Ok(agent.heap_mut().allocate_object(data))
}
