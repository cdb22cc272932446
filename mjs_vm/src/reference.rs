use mjs_heap::{property_key, ObjectHandle, PropertyKey, Value};

/// An unresolved property access: the transient result of evaluating a
/// member expression or an identifier, resolved to an ordinary value via
/// [`crate::agent::Agent::get_value`]/[`crate::agent::Agent::put_value`].
/// Never stored in a container — expression evaluation returns
/// [`EvalResult`] precisely so a bare `Reference` can never leak into a
/// place a `Value` is expected.
#[derive(Debug, Clone)]
pub enum Reference {
    /// `base.name` / `base[name]`, or an identifier that resolved to some
    /// activation object (or the global object) in the scope chain.
    Property {
        base: Value,
        name: PropertyKey,
        strict: bool,
    },
    /// An identifier that resolved to no binding anywhere in the scope
    /// chain. `get_value` raises `ReferenceError`; `typeof` on an
    /// unresolvable reference instead yields `"undefined"`; `put_value`
    /// creates the binding on the global object unless strict.
    Unresolvable { name: PropertyKey, strict: bool },
}

impl Reference {
    pub fn property(base: Value, name: impl AsRef<str>, strict: bool) -> Self {
        Reference::Property {
            base,
            name: property_key(name),
            strict,
        }
    }

    pub fn is_strict(&self) -> bool {
        match self {
            Reference::Property { strict, .. } => *strict,
            Reference::Unresolvable { strict, .. } => *strict,
        }
    }

    pub fn base_object(&self) -> Option<ObjectHandle> {
        match self {
            Reference::Property { base, .. } => base.as_object(),
            Reference::Unresolvable { .. } => None,
        }
    }

    pub fn name(&self) -> &PropertyKey {
        match self {
            Reference::Property { name, .. } => name,
            Reference::Unresolvable { name, .. } => name,
        }
    }
}

/// The result of evaluating an expression: either a plain value, or a
/// reference awaiting `get_value`/`put_value` resolution.
#[derive(Debug, Clone)]
pub enum EvalResult {
    Value(Value),
    Ref(Reference),
}

impl EvalResult {
    pub fn value(v: Value) -> Self {
        EvalResult::Value(v)
    }

    pub fn reference(r: Reference) -> Self {
        EvalResult::Ref(r)
    }
}

impl From<Value> for EvalResult {
    fn from(v: Value) -> Self {
        EvalResult::Value(v)
    }
}
