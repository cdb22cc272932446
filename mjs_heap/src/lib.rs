//! The compacting, precise garbage-collected heap underlying the mjs
//! interpreter (spec.md §3, §4.1): the slot arena and its three handle
//! flavors, the NaN-boxed `Representation`, heap-resident strings, and the
//! prototype-based object model (ordinary/array/function/native variants)
//! together with its `[[Get]]`/`[[Put]]`/`[[Delete]]`/`[[DefineOwnProperty]]`
//! internal methods.

mod closure;
mod handle;
mod heap;
mod object;
mod position;
mod property;
mod repr;
mod string;
mod value;

pub use closure::{CallOutcome, HeapClosure, ObjectHandle};
pub use handle::{TrackedHandle, UntrackedHandle, WeakHandle};
pub use heap::{Heap, Root};
pub use object::{
    ArgumentsAliasData, ArrayData, FunctionData, JsObjectData, NativeData, NativeField, NativeGetter,
    NativeSetter, ObjectKind,
};
pub use position::{Position, NULL_POSITION};
pub use property::{property_key, Attributes, PropertyKey, PropertySlot, PropertyValue};
pub use repr::{Representation, ReprKind, CANONICAL_NAN_BITS};
pub use string::JsStringData;
pub use value::{StringHandle, Value};
