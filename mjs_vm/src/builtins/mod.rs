//! Builtins hosting (spec.md §4.5): the `Intrinsics` table of long-lived
//! prototype/constructor objects, and the bootstrap routine that
//! populates a freshly created heap with the global object and the
//! bounded builtin surface this interpreter implements (Object, Function,
//! Array, Boolean, Number, String, the `Error` family, and the global
//! `eval`/`parseInt`/`parseFloat`/`isNaN`/`isFinite`/`print` functions).
//! `Math`/`Date`/`JSON`/a real `RegExp` matching engine and most
//! `Array.prototype` methods are out of scope (spec.md §1) and are not
//! installed here.

mod array;
mod boxed_primitives;
pub mod error;
mod function;
mod global;
mod object;

use std::collections::HashMap;
use std::rc::Rc;

use mjs_ast::Version;
use mjs_heap::{
    property_key, Attributes, Heap, JsObjectData, ObjectHandle, PropertySlot, Representation, TrackedHandle, Value,
};

use crate::error::ErrorKind;
use crate::function::NativeClosure;

/// Every long-lived prototype/constructor the evaluator refers to by
/// identity, kept as [`TrackedHandle`]s (not bare [`ObjectHandle`]s)
/// because a compacting collection would otherwise leave them pointing at
/// stale positions — exactly the same reason `Agent::global_object` is a
/// `TrackedHandle` (see DESIGN.md).
pub struct Intrinsics {
    object_prototype: TrackedHandle<JsObjectData>,
    function_prototype: TrackedHandle<JsObjectData>,
    array_prototype: TrackedHandle<JsObjectData>,
    boolean_prototype: TrackedHandle<JsObjectData>,
    number_prototype: TrackedHandle<JsObjectData>,
    string_prototype: TrackedHandle<JsObjectData>,
    native_error_prototypes: HashMap<ErrorKind, TrackedHandle<JsObjectData>>,
    throw_type_error: TrackedHandle<JsObjectData>,
    global_eval: TrackedHandle<JsObjectData>,
}

macro_rules! intrinsic_accessor {
    ($name:ident, $field:ident) => {
        pub fn $name(&self) -> ObjectHandle {
            ObjectHandle::new(self.$field.position())
        }
    };
}

impl Intrinsics {
    intrinsic_accessor!(object_prototype, object_prototype);
    intrinsic_accessor!(function_prototype, function_prototype);
    intrinsic_accessor!(array_prototype, array_prototype);
    intrinsic_accessor!(boolean_prototype, boolean_prototype);
    intrinsic_accessor!(number_prototype, number_prototype);
    intrinsic_accessor!(string_prototype, string_prototype);
    intrinsic_accessor!(throw_type_error, throw_type_error);
    intrinsic_accessor!(global_eval, global_eval);

    pub fn error_prototype(&self, kind: ErrorKind) -> ObjectHandle {
        let handle = self
            .native_error_prototypes
            .get(&kind)
            .or_else(|| self.native_error_prototypes.get(&ErrorKind::Generic))
            .expect("Generic error prototype always present");
        ObjectHandle::new(handle.position())
    }

    /// Builds the global object and every intrinsic it reaches, in the
    /// order each depends on the last: `Object.prototype` first (the root
    /// of every prototype chain), then `Function.prototype` (itself a
    /// callable object whose own prototype is `Object.prototype`), then
    /// every other prototype, then the global object and its properties.
    pub fn bootstrap(heap: &mut Heap, version: Version) -> (Intrinsics, ObjectHandle) {
        let object_prototype = heap.allocate_object(JsObjectData::new("Object", Representation::NULL));
        let object_prototype = heap.track_object(object_prototype);
        let op = ObjectHandle::new(object_prototype.position());

        let function_prototype = heap.allocate_object(JsObjectData::new("Function", Value::Object(op).to_representation()));
        install_native_function(heap, function_prototype, "", 0, |_agent, _this, _args| Ok(Value::Undefined));
        let function_prototype = heap.track_object(function_prototype);
        let fp = ObjectHandle::new(function_prototype.position());

        let array_prototype = heap.allocate_object(JsObjectData::new("Array", Value::Object(op).to_representation()));
        array::make_array_prototype(heap, array_prototype);
        let array_prototype = heap.track_object(array_prototype);

        let boolean_prototype = heap.allocate_object(JsObjectData::new("Boolean", Value::Object(op).to_representation()));
        let boolean_prototype = heap.track_object(boolean_prototype);

        let number_prototype = heap.allocate_object(JsObjectData::new("Number", Value::Object(op).to_representation()));
        let number_prototype = heap.track_object(number_prototype);

        let string_prototype = heap.allocate_object(JsObjectData::new("String", Value::Object(op).to_representation()));
        let string_prototype = heap.track_object(string_prototype);

        let throw_type_error = heap.allocate_object(JsObjectData::new("Function", Value::Object(fp).to_representation()));
        install_native_function(heap, throw_type_error, "", 0, |agent, _this, _args| {
            Err(agent.throw_error(ErrorKind::Type, "'caller'/'callee' may not be accessed in strict mode"))
        });
        let throw_type_error = heap.track_object(throw_type_error);

        let mut native_error_prototypes = HashMap::new();
        let generic_error_prototype = heap.allocate_object(JsObjectData::new("Error", Value::Object(op).to_representation()));
        error::install_error_prototype_members(heap, generic_error_prototype, "Error");
        native_error_prototypes.insert(ErrorKind::Generic, heap.track_object(generic_error_prototype));
        for kind in [
            ErrorKind::Eval,
            ErrorKind::Range,
            ErrorKind::Reference,
            ErrorKind::Syntax,
            ErrorKind::Type,
            ErrorKind::Uri,
            ErrorKind::Assertion,
        ] {
            let proto = heap.allocate_object(JsObjectData::new(
                "Error",
                Value::Object(ObjectHandle::new(native_error_prototypes[&ErrorKind::Generic].position())).to_representation(),
            ));
            error::install_error_prototype_members(heap, proto, kind.constructor_name());
            native_error_prototypes.insert(kind, heap.track_object(proto));
        }

        object::install_object_prototype_members(heap, ObjectHandle::new(object_prototype.position()));

        let global_handle = heap.allocate_object(JsObjectData::new("global", Value::Object(op).to_representation()));

        let mut intrinsics = Intrinsics {
            object_prototype,
            function_prototype,
            array_prototype,
            boolean_prototype,
            number_prototype,
            string_prototype,
            native_error_prototypes,
            throw_type_error,
            global_eval: heap.track_object(global_handle), // placeholder, replaced below
        };

        object::install_object_constructor(heap, &intrinsics, global_handle);
        function::install_function_constructor(heap, &intrinsics, global_handle);
        array::install_array_constructor(heap, &intrinsics, global_handle);
        boxed_primitives::install_boolean_constructor(heap, &intrinsics, global_handle);
        boxed_primitives::install_number_constructor(heap, &intrinsics, global_handle);
        boxed_primitives::install_string_constructor(heap, &intrinsics, global_handle);
        error::install_error_constructors(heap, &intrinsics, global_handle);
        let global_eval = global::install_globals(heap, &intrinsics, global_handle, version);
        intrinsics.global_eval = heap.track_object(global_eval);

        install_self_this(heap, global_handle);

        (intrinsics, global_handle)
    }
}

/// Installs the global object's own, non-enumerable, non-deletable,
/// read-only `this` property pointing back at itself, so that evaluating
/// `Node::This` at top-level scope reduces to an ordinary identifier
/// lookup through the scope chain with no special-casing required.
fn install_self_this(heap: &mut Heap, global: ObjectHandle) {
    heap.define_own_property(
        global,
        property_key("this"),
        PropertySlot::data(Value::Object(global).to_representation(), Attributes::sealed()),
    )
    .ok();
}

/// Allocates a callable native-function object and installs it as an own
/// property of `target` with the standard writable/non-enumerable/
/// configurable attributes ECMA-262 gives builtin function properties.
pub(crate) fn install_native_function(
    heap: &mut Heap,
    target: ObjectHandle,
    name: &str,
    arity: u32,
    call: impl Fn(&mut crate::agent::Agent, Value, &[Value]) -> crate::error::JsResult<Value> + 'static,
) -> ObjectHandle {
    let handle = make_native_function(heap, name, arity, call);
    heap.define_own_property(
        target,
        property_key(name),
        PropertySlot::data(
            Value::Object(handle).to_representation(),
            Attributes::new(Attributes::DONT_ENUM),
        ),
    )
    .ok();
    handle
}

/// Allocates a bare native-function object without installing it anywhere
/// (used for constructors, which the caller installs under a capitalized
/// name distinct from the function's own display name).
pub(crate) fn make_native_function(
    heap: &mut Heap,
    name: &str,
    arity: u32,
    call: impl Fn(&mut crate::agent::Agent, Value, &[Value]) -> crate::error::JsResult<Value> + 'static,
) -> ObjectHandle {
    let mut data = JsObjectData::new("Function", Representation::NULL);
    data.kind = mjs_heap::ObjectKind::Function(mjs_heap::FunctionData {
        closure: Rc::new(NativeClosure::new(name, arity, Rc::new(call))),
        is_constructable: false,
        named_args: arity,
        body_text: Rc::from(format!("function {name}() {{ [native code] }}")),
        is_strict: false,
    });
    heap.allocate_object(data)
}

pub(crate) fn make_constructable_function(
    heap: &mut Heap,
    function_prototype: ObjectHandle,
    name: &str,
    arity: u32,
    call: impl Fn(&mut crate::agent::Agent, Value, &[Value]) -> crate::error::JsResult<Value> + 'static,
    construct: impl Fn(&mut crate::agent::Agent, &[Value], ObjectHandle) -> crate::error::JsResult<Value> + 'static,
) -> ObjectHandle {
    let mut data = JsObjectData::new("Function", Value::Object(function_prototype).to_representation());
    data.kind = mjs_heap::ObjectKind::Function(mjs_heap::FunctionData {
        closure: Rc::new(NativeClosure::new(name, arity, Rc::new(call)).with_construct(Rc::new(construct))),
        is_constructable: true,
        named_args: arity,
        body_text: Rc::from(format!("function {name}() {{ [native code] }}")),
        is_strict: false,
    });
    heap.allocate_object(data)
}

/// Installs a constructor function under `name` on `target`, plus the
/// reciprocal `constructor`/`prototype` links (ECMA-262 15.x pattern
/// shared by every builtin constructor). Grounded on `original_source`'s
/// `global_object.cpp` `put_native_function` helper (SPEC_FULL §4.5).
pub(crate) fn define_constructor(
    heap: &mut Heap,
    target: ObjectHandle,
    name: &str,
    ctor: ObjectHandle,
    prototype: ObjectHandle,
) {
    heap.define_own_property(
        ctor,
        property_key("prototype"),
        PropertySlot::data(
            Value::Object(prototype).to_representation(),
            Attributes::sealed(),
        ),
    )
    .ok();
    heap.define_own_property(
        prototype,
        property_key("constructor"),
        PropertySlot::data(Value::Object(ctor).to_representation(), Attributes::new(Attributes::DONT_ENUM)),
    )
    .ok();
    heap.define_own_property(
        target,
        property_key(name),
        PropertySlot::data(Value::Object(ctor).to_representation(), Attributes::new(Attributes::DONT_ENUM)),
    )
    .ok();
}
