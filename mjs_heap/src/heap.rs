use std::any::Any;
use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::closure::{CallOutcome, ObjectHandle};
use crate::handle::{Slot, TrackedHandle, WeakHandle};
use crate::object::{JsObjectData, ObjectKind};
use crate::position::{Position, NULL_POSITION};
use crate::property::{Attributes, PropertyKey, PropertySlot, PropertyValue};
use crate::repr::Representation;
use crate::string::JsStringData;
use crate::value::Value;

pub type StringHandle = crate::handle::UntrackedHandle<JsStringData>;

/// One allocation in the heap's slot arena: either of the two GC-managed
/// heap-resident container kinds, strings and objects — arrays, functions
/// and natives are `object` variants, not distinct allocation kinds.
/// `Tombstone` only ever appears transiently, at position 0 (the reserved
/// "no object" sentinel) and while an allocation is mid-move during
/// collection.
#[derive(Debug, Clone)]
pub(crate) enum HeapValue {
    Tombstone,
    String(JsStringData),
    Object(JsObjectData),
}

impl HeapValue {
    fn for_each_embedded_position_mut(&mut self, f: &mut dyn FnMut(u32) -> u32) {
        match self {
            HeapValue::Tombstone => {}
            HeapValue::String(_) => {}
            HeapValue::Object(obj) => obj.for_each_embedded_position_mut(f),
        }
    }
}

/// A type that exposes embedded heap positions for the duration of a single
/// [`Heap::garbage_collect`] call. The heap's own `TrackedHandle`/`WeakHandle` registries
/// are walked automatically and do not need this trait — it exists for
/// transient Rust-stack values (a completion's result bubbling up through
/// nested statement evaluation, say) that must survive a collection
/// triggered mid-propagation without having been wrapped in a
/// `TrackedHandle` ahead of time.
pub trait Root {
    fn trace_positions(&mut self, f: &mut dyn FnMut(Position) -> Position);
}

impl Root for Value {
    fn trace_positions(&mut self, f: &mut dyn FnMut(Position) -> Position) {
        let repr = self.to_representation();
        if let Some(pos) = repr.embedded_position() {
            if pos != NULL_POSITION {
                *self = Value::from_representation(repr.with_embedded_position(f(pos)));
            }
        }
    }
}

impl Root for ObjectHandle {
    fn trace_positions(&mut self, f: &mut dyn FnMut(Position) -> Position) {
        let pos = self.position();
        if pos != NULL_POSITION {
            self.set_position(f(pos));
        }
    }
}

/// Bounds the BFS worklist used by the copy-then-fixup sweep (see
/// [`Heap::garbage_collect`]) against unbounded growth from a corrupt
/// graph, since the sweep is iterative rather than a literal call stack —
/// a representational choice recorded in DESIGN.md.
const MAX_GC_WORKLIST_ITERATIONS: u32 = 1 << 20;

/// The compacting, single-space garbage-collected heap: a slot arena
/// holding `String`/`Object` allocations, plus the tracked and weak handle
/// registries used for root discovery.
pub struct Heap {
    capacity: u32,
    slots: Vec<HeapValue>,
    tracked: Vec<Weak<Cell<Position>>>,
    weak: Vec<Weak<Cell<Position>>>,
}

impl Heap {
    pub fn new(capacity_slots: u32) -> Self {
        // Position 0 is the reserved null sentinel (`NULL_POSITION`); seed
        // it with a tombstone so indexing never has to special-case it.
        Self {
            capacity: capacity_slots,
            slots: vec![HeapValue::Tombstone],
            tracked: Vec::new(),
            weak: Vec::new(),
        }
    }

    // ---- allocation -----------------------------------------------------

    fn allocate(&mut self, value: HeapValue) -> Position {
        if self.slots.len() as u32 >= self.capacity {
            // Fatal: the heap does not resize once constructed.
            panic!(
                "mjs_heap: out of memory (capacity {} slots exhausted)",
                self.capacity
            );
        }
        let pos = self.slots.len() as Position;
        self.slots.push(value);
        pos
    }

    pub fn allocate_string(&mut self, data: JsStringData) -> StringHandle {
        let pos = self.allocate(HeapValue::String(data));
        StringHandle::new(pos)
    }

    pub fn allocate_object(&mut self, data: JsObjectData) -> ObjectHandle {
        let pos = self.allocate(HeapValue::Object(data));
        ObjectHandle::new(pos)
    }

    pub fn string(&self, handle: StringHandle) -> &JsStringData {
        match &self.slots[handle.position() as usize] {
            HeapValue::String(s) => s,
            _ => panic!("mjs_heap: handle does not point at a string"),
        }
    }

    pub fn object(&self, handle: ObjectHandle) -> &JsObjectData {
        match &self.slots[handle.position() as usize] {
            HeapValue::Object(o) => o,
            _ => panic!("mjs_heap: handle does not point at an object"),
        }
    }

    pub fn object_mut(&mut self, handle: ObjectHandle) -> &mut JsObjectData {
        match &mut self.slots[handle.position() as usize] {
            HeapValue::Object(o) => o,
            _ => panic!("mjs_heap: handle does not point at an object"),
        }
    }

    // ---- handles ----------------------------------------------------------

    fn track_position(&mut self, pos: Position) -> Slot {
        let slot: Slot = Rc::new(Cell::new(pos));
        self.tracked.push(Rc::downgrade(&slot));
        slot
    }

    pub fn track<T>(&mut self, handle: crate::handle::UntrackedHandle<T>) -> TrackedHandle<T> {
        TrackedHandle::from_slot(self.track_position(handle.position()))
    }

    pub fn track_object(&mut self, handle: ObjectHandle) -> TrackedHandle<JsObjectData> {
        self.track(handle)
    }

    pub fn weaken<T>(&mut self, handle: crate::handle::UntrackedHandle<T>) -> WeakHandle<T> {
        let slot: Slot = Rc::new(Cell::new(handle.position()));
        self.weak.push(Rc::downgrade(&slot));
        WeakHandle::from_slot(slot)
    }

    // ---- introspection ------------------------------------------------

    /// Number of occupied slots, counted as allocations rather than bytes
    /// since this heap is a `Vec<HeapValue>` rather than a literal
    /// byte-slab — see DESIGN.md.
    pub fn calc_used(&self) -> u32 {
        self.slots.len() as u32 - 1
    }

    pub fn use_percentage(&self) -> f64 {
        (self.calc_used() as f64 / self.capacity as f64) * 100.0
    }

    // ---- garbage collection --------------------------------------------

    /// Mark-by-copy over a single semispace: walk every live root, copy
    /// reachable objects into a fresh slot vector, rewrite every embedded
    /// position via the old→new mapping built along the way, and finally
    /// zero any weak handle whose target did not survive.
    ///
    /// Implemented as two passes (copy, then fixup) rather than a single
    /// recursive move: the BFS worklist in pass one discovers every
    /// reachable position and assigns it a new slot without needing the
    /// new object's fields to be valid yet, so pass two can rewrite every
    /// embedded position in one uniform sweep using a completed mapping.
    /// This keeps the sweep iterative, with no call-stack recursion at
    /// all; see DESIGN.md for the tradeoff this resolves.
    pub fn garbage_collect(&mut self, extra_roots: &mut [&mut dyn Root]) {
        debug!(used = self.calc_used(), capacity = self.capacity, "gc: starting collection");
        let mut mapping: HashMap<Position, Position> = HashMap::new();
        let mut new_slots: Vec<HeapValue> = vec![HeapValue::Tombstone];
        let mut worklist: VecDeque<Position> = VecDeque::new();

        self.tracked.retain(|w| w.upgrade().is_some());
        for w in &self.tracked {
            if let Some(cell) = w.upgrade() {
                let pos = cell.get();
                if pos != NULL_POSITION {
                    worklist.push_back(pos);
                }
            }
        }
        for root in extra_roots.iter_mut() {
            root.trace_positions(&mut |pos| {
                worklist.push_back(pos);
                pos
            });
        }

        let mut iterations = 0u32;
        while let Some(old_pos) = worklist.pop_front() {
            iterations += 1;
            if iterations > MAX_GC_WORKLIST_ITERATIONS {
                panic!("mjs_heap: gc worklist exceeded the recursion bound");
            }
            if mapping.contains_key(&old_pos) {
                continue;
            }
            let val = std::mem::replace(&mut self.slots[old_pos as usize], HeapValue::Tombstone);
            let new_pos = new_slots.len() as Position;
            mapping.insert(old_pos, new_pos);
            let mut val = val;
            val.for_each_embedded_position_mut(&mut |child_pos| {
                if child_pos != NULL_POSITION {
                    worklist.push_back(child_pos);
                }
                child_pos
            });
            new_slots.push(val);
        }

        // Pass two: every live object has a slot now; rewrite embedded
        // positions using the completed mapping.
        for val in new_slots.iter_mut().skip(1) {
            val.for_each_embedded_position_mut(&mut |child_pos| {
                *mapping.get(&child_pos).unwrap_or(&NULL_POSITION)
            });
        }

        // Roots: rewrite tracked handles and the caller's extra roots in
        // place. Dead handles (pos not in mapping) are impossible here
        // since we just seeded the worklist from them.
        for w in &self.tracked {
            if let Some(cell) = w.upgrade() {
                let pos = cell.get();
                if pos != NULL_POSITION {
                    cell.set(*mapping.get(&pos).unwrap_or(&NULL_POSITION));
                }
            }
        }
        for root in extra_roots.iter_mut() {
            root.trace_positions(&mut |pos| *mapping.get(&pos).unwrap_or(&NULL_POSITION));
        }

        // Weak handles: survivors are rewritten to their new position;
        // everything else (not reachable from any root) is zeroed.
        self.weak.retain(|w| w.upgrade().is_some());
        for w in &self.weak {
            if let Some(cell) = w.upgrade() {
                let pos = cell.get();
                cell.set(*mapping.get(&pos).unwrap_or(&NULL_POSITION));
            }
        }

        let reclaimed = self.slots.len() - new_slots.len();
        trace!(reclaimed, survivors = new_slots.len() - 1, "gc: collection complete");
        self.slots = new_slots;
    }

    // ---- object model: internal methods --------------------------------
    //
    // These mirror ECMA-262's ordinary [[GetOwnProperty]]/[[DefineOwnProperty]]/
    // [[Delete]]/[[Get]]/[[Set]] internal methods. Methods that can invoke
    // an accessor's closure take a type-erased `ctx` threaded through to
    // `HeapClosure::call` (see `closure.rs`) so `mjs_vm`'s evaluator can
    // re-enter statement execution from inside a property read/write.

    pub fn prototype_of(&self, obj: ObjectHandle) -> Option<ObjectHandle> {
        self.object(obj).prototype_handle()
    }

    /// Own-property lookup honouring the array/native fast paths before
    /// falling back to the ordinary property map.
    pub fn get_own_property(&self, obj: ObjectHandle, key: &PropertyKey) -> Option<PropertySlot> {
        let data = self.object(obj);
        if let ObjectKind::Array(arr) = &data.kind {
            if key.as_ref() == "length" {
                return Some(PropertySlot::data(
                    Representation::number(arr.length as f64),
                    Attributes::new(Attributes::DONT_ENUM | Attributes::DONT_DELETE),
                ));
            }
            if let Ok(index) = key.parse::<u32>() {
                if index.to_string() == key.as_ref() {
                    return arr
                        .get(index)
                        .map(|v| PropertySlot::data(v, Attributes::writable_enumerable_configurable()));
                }
            }
        }
        if let Some(aliased_key) = self.arguments_alias(obj, key) {
            return self.get_own_property(
                ObjectHandle::new(data.internal_value.embedded_position().unwrap()),
                &aliased_key,
            );
        }
        // fall through to the ordinary properties map below: once
        // `delete_own_property` severs an index's alias, reads of that
        // index should see whatever was (or wasn't) separately defined.
        if let ObjectKind::Native(native) = &data.kind {
            if let Some(field) = native.fields.iter().find(|f| f.name == key.as_ref()) {
                return Some(PropertySlot::data(
                    (field.get)(data),
                    Attributes::new(Attributes::DONT_ENUM),
                ));
            }
        }
        data.properties.get(key).cloned()
    }

    /// Non-strict `arguments` index aliasing: `arguments[i]` redirects to
    /// the named parameter it was bound from, as long as nothing has
    /// severed that alias (see `delete_own_property`).
    fn arguments_alias(&self, obj: ObjectHandle, key: &PropertyKey) -> Option<PropertyKey> {
        let data = self.object(obj);
        let ObjectKind::Arguments(alias) = &data.kind else {
            return None;
        };
        let index: u32 = key.parse().ok()?;
        if index.to_string() != key.as_ref() {
            return None;
        }
        alias.aliases.get(index as usize).cloned().flatten()
    }

    /// Walks the prototype chain, bounded against a cyclic or runaway
    /// chain, looking for an own property, returning both the slot and
    /// the object that owns it (needed so accessor invocation can ignore
    /// the receiver when deciding *which* getter/setter to call, while
    /// still passing the original receiver as `this`).
    pub fn find_property(&self, obj: ObjectHandle, key: &PropertyKey) -> Option<(ObjectHandle, PropertySlot)> {
        let mut current = Some(obj);
        let mut hops = 0;
        while let Some(o) = current {
            hops += 1;
            if hops > 4096 {
                panic!("mjs_heap: prototype chain exceeded the bounded-hop invariant");
            }
            if let Some(slot) = self.get_own_property(o, key) {
                return Some((o, slot));
            }
            current = self.prototype_of(o);
        }
        None
    }

    pub fn has_property(&self, obj: ObjectHandle, key: &PropertyKey) -> bool {
        self.find_property(obj, key).is_some()
    }

    /// The ordinary `[[Get]]` internal method: resolves data and accessor
    /// properties along the prototype chain, invoking an accessor's getter
    /// with `receiver` as `this` when found.
    pub fn get(&mut self, ctx: &mut dyn Any, obj: ObjectHandle, key: &PropertyKey, receiver: Value) -> CallOutcome {
        match self.find_property(obj, key) {
            None => Ok(Value::Undefined),
            Some((_, slot)) => match slot.value {
                PropertyValue::Data(v) => Ok(Value::from_representation(v)),
                PropertyValue::Accessor { get, .. } => {
                    if get == Representation::UNDEFINED {
                        return Ok(Value::Undefined);
                    }
                    let getter = Value::from_representation(get);
                    self.call_value(ctx, getter, receiver, &[])
                }
            },
        }
    }

    /// The ordinary `[[Set]]` internal method. `strict` selects strict-mode
    /// failure semantics: rejecting a write to a read-only property, or to
    /// a non-extensible object, raises instead of silently doing nothing.
    pub fn put(
        &mut self,
        ctx: &mut dyn Any,
        obj: ObjectHandle,
        key: PropertyKey,
        value: Value,
        receiver: Value,
        strict: bool,
        throw_type_error: impl FnOnce() -> Value,
    ) -> CallOutcome {
        if let Some(aliased_key) = self.arguments_alias(obj, &key) {
            let activation = ObjectHandle::new(self.object(obj).internal_value.embedded_position().unwrap());
            return self.put(ctx, activation, aliased_key, value, receiver, strict, throw_type_error);
        }
        if let Some((_owner, slot)) = self.find_property(obj, &key) {
            if let PropertyValue::Accessor { set, .. } = slot.value {
                if set == Representation::UNDEFINED {
                    return if strict { Err(throw_type_error()) } else { Ok(Value::Undefined) };
                }
                let setter = Value::from_representation(set);
                return self.call_value(ctx, setter, receiver, std::slice::from_ref(&value));
            }
            if slot.attributes.is_read_only() {
                return if strict { Err(throw_type_error()) } else { Ok(Value::Undefined) };
            }
        } else if !self.object(obj).extensible {
            return if strict { Err(throw_type_error()) } else { Ok(Value::Undefined) };
        }
        self.define_own_property(
            obj,
            key,
            PropertySlot::data(value.to_representation(), Attributes::writable_enumerable_configurable()),
        )
        .ok();
        Ok(Value::Undefined)
    }

    fn call_value(&mut self, ctx: &mut dyn Any, callee: Value, this: Value, args: &[Value]) -> CallOutcome {
        let handle = match callee.as_object() {
            Some(h) if self.object(h).is_callable() => h,
            _ => return Ok(Value::Undefined),
        };
        let closure = match &self.object(handle).kind {
            ObjectKind::Function(f) => f.closure.clone(),
            _ => return Ok(Value::Undefined),
        };
        closure.call(ctx, this, args)
    }

    /// `[[DefineOwnProperty]]`: installs or overwrites an own property
    /// directly (no accessor invocation), enforcing `extensible` for new
    /// properties and the accessor invariant. Returns
    /// `Err(())` if the object is sealed against this write; callers
    /// decide whether that becomes a silent no-op or a `TypeError`.
    pub fn define_own_property(&mut self, obj: ObjectHandle, key: PropertyKey, slot: PropertySlot) -> Result<(), ()> {
        if !slot.invariant_holds() {
            return Err(());
        }
        if let ObjectKind::Array(arr) = &mut self.object_mut(obj).kind {
            if key.as_ref() == "length" {
                if let PropertyValue::Data(v) = slot.value {
                    if let Some(n) = v.as_f64() {
                        arr.truncate(n as u32);
                        return Ok(());
                    }
                }
            } else if let Ok(index) = key.parse::<u32>() {
                if index.to_string() == key.as_ref() {
                    if let PropertyValue::Data(v) = slot.value {
                        arr.set(index, v);
                        return Ok(());
                    }
                }
            }
        }
        let data = self.object_mut(obj);
        if let Some(existing) = data.properties.get(&key) {
            if existing.attributes.is_read_only() && !existing.attributes.is_accessor() {
                return Err(());
            }
        } else if !data.extensible {
            return Err(());
        }
        data.properties.insert(key, slot);
        Ok(())
    }

    /// `[[Delete]]`: removes an own property unless `dont_delete`/`internal`
    /// forbids it.
    pub fn delete_own_property(&mut self, obj: ObjectHandle, key: &PropertyKey) -> bool {
        if let ObjectKind::Array(arr) = &mut self.object_mut(obj).kind {
            if let Ok(index) = key.parse::<u32>() {
                if index.to_string() == key.as_ref() {
                    arr.delete(index);
                    return true;
                }
            }
        }
        if let ObjectKind::Arguments(alias) = &mut self.object_mut(obj).kind {
            if let Ok(index) = key.parse::<u32>() {
                if index.to_string() == key.as_ref() {
                    if let Some(slot) = alias.aliases.get_mut(index as usize) {
                        *slot = None;
                    }
                    return true;
                }
            }
        }
        let data = self.object_mut(obj);
        match data.properties.get(key) {
            Some(slot) if slot.attributes.is_dont_delete() || slot.attributes.is_internal() => false,
            Some(_) => {
                data.properties.shift_remove(key);
                true
            }
            None => true,
        }
    }

    /// Own enumerable keys in observable iteration order: present array
    /// indices in ascending numeric order, then ordinary properties in
    /// insertion order, skipping `dont_enum`/`internal` slots.
    pub fn own_enumerable_keys(&self, obj: ObjectHandle) -> Vec<PropertyKey> {
        let data = self.object(obj);
        let mut keys = Vec::new();
        if let ObjectKind::Array(arr) = &data.kind {
            for i in arr.present_indices() {
                keys.push(crate::property::property_key(i.to_string()));
            }
        }
        for (key, slot) in &data.properties {
            if !slot.attributes.is_dont_enum() && !slot.attributes.is_internal() {
                keys.push(key.clone());
            }
        }
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_object_heap() -> Heap {
        Heap::new(1024)
    }

    #[test]
    fn allocate_then_collect_with_no_roots_frees_everything() {
        let mut heap = new_object_heap();
        let obj = JsObjectData::new("Object", Representation::NULL);
        heap.allocate_object(obj);
        assert!(heap.calc_used() > 0);
        heap.garbage_collect(&mut []);
        assert_eq!(heap.calc_used(), 0);
    }

    #[test]
    fn tracked_root_survives_and_is_rewritten() {
        let mut heap = new_object_heap();
        let handle = heap.allocate_object(JsObjectData::new("Object", Representation::NULL));
        let tracked = heap.track_object(handle);
        heap.allocate_object(JsObjectData::new("Garbage", Representation::NULL));
        assert_eq!(heap.calc_used(), 2);
        heap.garbage_collect(&mut []);
        // The garbage object is gone; the tracked root is the only survivor
        // and was rewritten to point at its new (compacted) position.
        assert_eq!(heap.calc_used(), 1);
        assert_eq!(tracked.position(), 1);
        assert_eq!(heap.object(handle_at(tracked.position())).class_name.as_ref(), "Object");
    }

    fn handle_at(pos: Position) -> ObjectHandle {
        ObjectHandle::new(pos)
    }

    #[test]
    fn weak_handle_to_dead_object_becomes_null() {
        let mut heap = new_object_heap();
        let handle = heap.allocate_object(JsObjectData::new("Object", Representation::NULL));
        let weak = heap.weaken(handle);
        assert!(weak.get().is_some());
        heap.garbage_collect(&mut []);
        assert!(weak.get().is_none());
    }

    #[test]
    fn weak_handle_to_survivor_remains_valid() {
        let mut heap = new_object_heap();
        let handle = heap.allocate_object(JsObjectData::new("Object", Representation::NULL));
        let tracked = heap.track_object(handle);
        let weak = heap.weaken(handle);
        heap.garbage_collect(&mut []);
        assert!(weak.get().is_some());
        let _ = tracked;
    }

    #[test]
    fn idempotent_collection_yields_same_used_count() {
        let mut heap = new_object_heap();
        let handle = heap.allocate_object(JsObjectData::new("Object", Representation::NULL));
        let tracked = heap.track_object(handle);
        heap.garbage_collect(&mut []);
        let first = heap.calc_used();
        heap.garbage_collect(&mut []);
        assert_eq!(first, heap.calc_used());
        let _ = tracked;
    }

    #[test]
    fn define_then_get_own_property_round_trips() {
        let mut heap = new_object_heap();
        let handle = heap.allocate_object(JsObjectData::new("Object", Representation::NULL));
        let key = crate::property::property_key("x");
        heap.define_own_property(
            handle,
            key.clone(),
            PropertySlot::data(Representation::number(42.0), Attributes::writable_enumerable_configurable()),
        )
        .unwrap();
        let slot = heap.get_own_property(handle, &key).unwrap();
        assert_eq!(slot.value, PropertyValue::Data(Representation::number(42.0)));
    }

    #[test]
    fn array_length_tracks_dense_writes_and_truncates() {
        let mut heap = new_object_heap();
        let mut data = JsObjectData::new("Array", Representation::NULL);
        data.kind = ObjectKind::Array(Default::default());
        let handle = heap.allocate_object(data);
        heap.define_own_property(
            handle,
            crate::property::property_key("2"),
            PropertySlot::data(Representation::number(1.0), Attributes::writable_enumerable_configurable()),
        )
        .unwrap();
        let len_key = crate::property::property_key("length");
        let len = heap.get_own_property(handle, &len_key).unwrap();
        assert_eq!(len.value, PropertyValue::Data(Representation::number(3.0)));
        heap.define_own_property(
            handle,
            len_key.clone(),
            PropertySlot::data(Representation::number(1.0), Attributes::writable_enumerable_configurable()),
        )
        .unwrap();
        let idx2 = crate::property::property_key("2");
        assert!(heap.get_own_property(handle, &idx2).is_none());
    }

    #[test]
    fn dont_delete_property_survives_delete() {
        let mut heap = new_object_heap();
        let handle = heap.allocate_object(JsObjectData::new("Object", Representation::NULL));
        let key = crate::property::property_key("x");
        heap.define_own_property(
            handle,
            key.clone(),
            PropertySlot::data(
                Representation::number(1.0),
                Attributes::new(Attributes::DONT_DELETE),
            ),
        )
        .unwrap();
        assert!(!heap.delete_own_property(handle, &key));
        assert!(heap.get_own_property(handle, &key).is_some());
    }
}
