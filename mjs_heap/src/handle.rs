use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use crate::position::{Position, NULL_POSITION};

/// Three handle flavors over the same `Position` address space, per
/// spec.md §4.1. They differ only in how (and whether) they participate in
/// root discovery during collection:
///
/// - [`TrackedHandle`] registers itself in the heap's handle set on
///   construction and is found automatically during root enumeration.
/// - [`UntrackedHandle`] is a bare position; its owner must thread it
///   through its own `for_each_embedded_position_mut` so the GC can fix it
///   up as an embedded field of a live object.
/// - [`WeakHandle`] is registered in a separate weak list: it does not keep
///   its target alive, and is zeroed out if the target does not survive a
///   collection.

/// A bare heap position with no tracking obligations of its own. Safe to
/// embed inside another heap object's data as long as that object's
/// `for_each_embedded_position_mut` visits it.
pub struct UntrackedHandle<T> {
    pos: Position,
    _marker: PhantomData<fn() -> T>,
}

impl<T> UntrackedHandle<T> {
    pub fn new(pos: Position) -> Self {
        Self {
            pos,
            _marker: PhantomData,
        }
    }

    pub fn null() -> Self {
        Self::new(NULL_POSITION)
    }

    pub fn is_null(&self) -> bool {
        self.pos == NULL_POSITION
    }

    pub fn position(&self) -> Position {
        self.pos
    }

    pub fn set_position(&mut self, pos: Position) {
        self.pos = pos;
    }
}

impl<T> Clone for UntrackedHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for UntrackedHandle<T> {}
impl<T> PartialEq for UntrackedHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos
    }
}
impl<T> Eq for UntrackedHandle<T> {}
impl<T> std::hash::Hash for UntrackedHandle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.pos.hash(state);
    }
}
impl<T> fmt::Debug for UntrackedHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UntrackedHandle({})", self.pos)
    }
}

/// A registered slot shared between a handle and the heap's root list.
/// Kept as `Rc<Cell<Position>>` rather than a raw pointer so that dropping
/// every clone of a [`TrackedHandle`] automatically stops it from being
/// discovered as a root on the next collection (the heap only holds a
/// [`Weak`] reference into this cell).
pub(crate) type Slot = Rc<Cell<Position>>;

/// A handle registered in the heap's root set: found automatically during
/// root enumeration, and updated in place when its target moves. Dropping
/// the last clone removes it from consideration (the heap prunes dead
/// [`Weak`] entries lazily, on the next collection).
pub struct TrackedHandle<T> {
    slot: Slot,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TrackedHandle<T> {
    pub(crate) fn from_slot(slot: Slot) -> Self {
        Self {
            slot,
            _marker: PhantomData,
        }
    }

    pub(crate) fn slot(&self) -> &Slot {
        &self.slot
    }

    pub(crate) fn weak(&self) -> Weak<Cell<Position>> {
        Rc::downgrade(&self.slot)
    }

    pub fn position(&self) -> Position {
        self.slot.get()
    }

    pub fn is_null(&self) -> bool {
        self.position() == NULL_POSITION
    }
}

impl<T> Clone for TrackedHandle<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            _marker: PhantomData,
        }
    }
}
impl<T> fmt::Debug for TrackedHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrackedHandle({})", self.position())
    }
}

/// A handle that does not keep its target alive. Registered in the heap's
/// weak list; after a collection it either points at the survivor's new
/// position, or has been rewritten to [`NULL_POSITION`] if the target was
/// unreachable from any root.
pub struct WeakHandle<T> {
    slot: Slot,
    _marker: PhantomData<fn() -> T>,
}

impl<T> WeakHandle<T> {
    pub(crate) fn from_slot(slot: Slot) -> Self {
        Self {
            slot,
            _marker: PhantomData,
        }
    }

    pub(crate) fn weak(&self) -> Weak<Cell<Position>> {
        Rc::downgrade(&self.slot)
    }

    /// Returns `None` if the target did not survive the most recent
    /// collection.
    pub fn get(&self) -> Option<Position> {
        let pos = self.slot.get();
        if pos == NULL_POSITION {
            None
        } else {
            Some(pos)
        }
    }
}

impl<T> Clone for WeakHandle<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            _marker: PhantomData,
        }
    }
}
impl<T> fmt::Debug for WeakHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakHandle({:?})", self.get())
    }
}
