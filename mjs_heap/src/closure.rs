use std::any::Any;
use std::fmt;

use crate::handle::UntrackedHandle;
use crate::object::JsObjectData;
use crate::value::Value;

pub type ObjectHandle = UntrackedHandle<JsObjectData>;

/// The outcome of invoking a [`HeapClosure`]: either the produced value, or
/// a thrown value propagating as an exception (spec.md §4.4, §7).
pub type CallOutcome = Result<Value, Value>;

/// A heap-allocated function body, native or script. Per the rewrite
/// strategy in spec.md §9 ("heap-allocated closure objects that expose a
/// single `call(this, args) -> value` method and declare their own
/// move/fixup for captured heap references"), `mjs_heap` only knows about
/// this trait; `mjs_vm` supplies the two concrete implementations (native
/// Rust functions, and script functions closing over an AST node + scope).
///
/// `ctx` is a type-erased handle to whatever the embedder's evaluator needs
/// (in this repo, `mjs_vm::Agent`); closures downcast it with
/// `ctx.downcast_mut`. This keeps `mjs_heap` free of any dependency on the
/// evaluator crate while still letting a script closure re-enter full
/// statement evaluation.
pub trait HeapClosure: fmt::Debug {
    fn call(&self, ctx: &mut dyn Any, this: Value, args: &[Value]) -> CallOutcome;

    /// `None` if this closure cannot be used as a constructor (spec.md
    /// §3.7 distinguishes `call` and `construct` closures; most native
    /// functions only implement one).
    fn construct(&self, ctx: &mut dyn Any, args: &[Value], new_target: ObjectHandle) -> Option<CallOutcome> {
        let _ = (ctx, args, new_target);
        None
    }

    /// Rewrites any heap positions this closure captured directly (rather
    /// than through a [`crate::handle::TrackedHandle`], which is fixed up
    /// automatically). The default is a no-op: every closure in this repo
    /// captures its environment through tracked handles, so none need a
    /// manual fixup — see DESIGN.md.
    fn fixup(&self, _rewrite: &mut dyn FnMut(u32) -> u32) {}

    fn name(&self) -> &str;

    fn arity(&self) -> u32;
}
