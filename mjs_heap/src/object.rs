use std::rc::Rc;

use indexmap::IndexMap;

use crate::closure::{HeapClosure, ObjectHandle};
use crate::property::{PropertyKey, PropertySlot};
use crate::repr::Representation;

/// The dense storage backing an array object (spec.md §3.5): a `length`
/// plus parallel "is this index present" storage, folded here into
/// `Vec<Option<Representation>>` (absent entries are holes, e.g. `[1,,3]`).
/// Integer-string names within `0..length` are served from here; anything
/// else (negative, non-integer, or out-of-range names) falls through to
/// the object's ordinary property map.
#[derive(Debug, Clone, Default)]
pub struct ArrayData {
    pub length: u32,
    pub dense: Vec<Option<Representation>>,
}

impl ArrayData {
    pub fn get(&self, index: u32) -> Option<Representation> {
        self.dense.get(index as usize).copied().flatten()
    }

    pub fn set(&mut self, index: u32, value: Representation) {
        if index as usize >= self.dense.len() {
            self.dense.resize(index as usize + 1, None);
        }
        self.dense[index as usize] = Some(value);
        if index >= self.length {
            self.length = index + 1;
        }
    }

    pub fn delete(&mut self, index: u32) {
        if let Some(slot) = self.dense.get_mut(index as usize) {
            *slot = None;
        }
    }

    /// `length = n` truncates every entry at index `>= n` (spec.md §3.5).
    pub fn truncate(&mut self, new_length: u32) {
        if (new_length as usize) < self.dense.len() {
            self.dense.truncate(new_length as usize);
        }
        self.length = new_length;
    }

    pub fn present_indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.dense
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|_| i as u32))
    }
}

/// A native object's fixed getter/setter table (spec.md §3.6): reads and
/// writes to a name in this table are served from a native field instead of
/// the ordinary property list. Used for primitive-boxing internals such as
/// `Boolean`/`Number`/`String`/`Date` wrapper objects.
pub type NativeGetter = fn(&JsObjectData) -> Representation;
pub type NativeSetter = fn(&mut JsObjectData, Representation);

#[derive(Clone)]
pub struct NativeField {
    pub name: &'static str,
    pub get: NativeGetter,
    pub set: Option<NativeSetter>,
}

impl std::fmt::Debug for NativeField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeField").field("name", &self.name).finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct NativeData {
    pub fields: Vec<NativeField>,
}

/// A function object's own data (spec.md §3.7): the call/construct
/// closure, arity, a `toString`-displayable body text, and the strict-mode
/// flag carried by the function's own body.
#[derive(Clone)]
pub struct FunctionData {
    pub closure: Rc<dyn HeapClosure>,
    pub is_constructable: bool,
    pub named_args: u32,
    pub body_text: Rc<str>,
    pub is_strict: bool,
}

impl std::fmt::Debug for FunctionData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionData")
            .field("name", &self.closure.name())
            .field("named_args", &self.named_args)
            .field("is_constructable", &self.is_constructable)
            .field("is_strict", &self.is_strict)
            .finish()
    }
}

/// The non-strict `arguments` object's index-to-parameter-name aliasing
/// table (spec.md §4.4's hoisting/invocation notes, and the Open Question
/// resolved in SPEC_FULL §9): reading/writing `arguments[i]` for `i` in
/// this table is redirected to the named parameter property instead of a
/// private slot, implementing the observable aliasing without a doubly
/// wide storage cell.
#[derive(Debug, Clone, Default)]
pub struct ArgumentsAliasData {
    /// `aliases[i] == Some(name)` iff `arguments[i]` still aliases the
    /// parameter `name` (aliasing is severed for index `i` once `delete
    /// arguments[i]` removes the own property, per ECMA-262 semantics).
    pub aliases: Vec<Option<PropertyKey>>,
}

#[derive(Debug, Clone)]
pub enum ObjectKind {
    Ordinary,
    Array(ArrayData),
    Function(FunctionData),
    Native(NativeData),
    /// Non-strict `arguments` objects carry an alias table; strict-mode
    /// `arguments` objects (no aliasing, accessor `callee`/`caller`) use
    /// `Ordinary` plus ordinary accessor properties instead.
    Arguments(ArgumentsAliasData),
}

/// An `object` (spec.md §3.4): class name, prototype link, boxed-primitive
/// internal value, the ordered property map, the ES5 extensible flag, and
/// a kind tag selecting the array/function/native/arguments specializations
/// of spec.md §3.5–§3.7.
#[derive(Debug, Clone)]
pub struct JsObjectData {
    pub class_name: Rc<str>,
    pub prototype: Representation,
    pub internal_value: Representation,
    pub properties: IndexMap<PropertyKey, PropertySlot>,
    pub extensible: bool,
    pub kind: ObjectKind,
}

impl JsObjectData {
    pub fn new(class_name: impl AsRef<str>, prototype: Representation) -> Self {
        Self {
            class_name: Rc::from(class_name.as_ref()),
            prototype,
            internal_value: Representation::UNDEFINED,
            properties: IndexMap::new(),
            extensible: true,
            kind: ObjectKind::Ordinary,
        }
    }

    pub fn prototype_handle(&self) -> Option<ObjectHandle> {
        self.prototype.embedded_position().map(ObjectHandle::new)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.kind, ObjectKind::Function(_))
    }

    pub fn is_constructable(&self) -> bool {
        matches!(&self.kind, ObjectKind::Function(f) if f.is_constructable)
    }

    pub fn as_array(&self) -> Option<&ArrayData> {
        match &self.kind {
            ObjectKind::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut ArrayData> {
        match &mut self.kind {
            ObjectKind::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionData> {
        match &self.kind {
            ObjectKind::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Visits every embedded `Representation`/position field so the GC can
    /// fix them up after a move. Property *keys* are plain `Rc<str>` (see
    /// `property.rs`) and never need fixing up.
    pub(crate) fn for_each_embedded_position_mut(&mut self, f: &mut dyn FnMut(u32) -> u32) {
        rewrite_repr(&mut self.prototype, f);
        rewrite_repr(&mut self.internal_value, f);
        for slot in self.properties.values_mut() {
            match &mut slot.value {
                crate::property::PropertyValue::Data(v) => rewrite_repr(v, f),
                crate::property::PropertyValue::Accessor { get, set } => {
                    rewrite_repr(get, f);
                    rewrite_repr(set, f);
                }
            }
        }
        if let ObjectKind::Array(arr) = &mut self.kind {
            for slot in arr.dense.iter_mut().flatten() {
                rewrite_repr(slot, f);
            }
        }
        if let ObjectKind::Function(func) = &mut self.kind {
            func.closure.fixup(f);
        }
    }
}

fn rewrite_repr(repr: &mut Representation, f: &mut dyn FnMut(u32) -> u32) {
    if let Some(pos) = repr.embedded_position() {
        if pos != crate::position::NULL_POSITION {
            *repr = repr.with_embedded_position(f(pos));
        }
    }
}
