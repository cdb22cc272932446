use std::rc::Rc;

use crate::repr::Representation;

/// Property attributes (spec.md §3.4). `internal` is the SPEC_FULL §3
/// addition used only by builtins hosting to hide bookkeeping slots from
/// script entirely (never enumerable, deletable, or overwritable, and
/// invisible to the `for-in` prototype walk); it is never one of the four
/// script-visible attribute names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Attributes(u8);

impl Attributes {
    pub const NONE: u8 = 0;
    pub const READ_ONLY: u8 = 1 << 0;
    pub const DONT_ENUM: u8 = 1 << 1;
    pub const DONT_DELETE: u8 = 1 << 2;
    pub const ACCESSOR: u8 = 1 << 3;
    pub const INTERNAL: u8 = 1 << 4;

    pub fn new(bits: u8) -> Self {
        Attributes(bits)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn has(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    pub fn with(self, flag: u8) -> Self {
        Attributes(self.0 | flag)
    }

    pub fn without(self, flag: u8) -> Self {
        Attributes(self.0 & !flag)
    }

    pub fn is_read_only(self) -> bool {
        self.has(Self::READ_ONLY)
    }

    pub fn is_dont_enum(self) -> bool {
        self.has(Self::DONT_ENUM)
    }

    pub fn is_dont_delete(self) -> bool {
        self.has(Self::DONT_DELETE)
    }

    pub fn is_accessor(self) -> bool {
        self.has(Self::ACCESSOR)
    }

    pub fn is_internal(self) -> bool {
        self.has(Self::INTERNAL)
    }

    /// Default attributes for a plain data property created by ordinary
    /// assignment (`{read_only: false, dont_enum: false, dont_delete:
    /// false}`), per spec.md §3.4.
    pub fn writable_enumerable_configurable() -> Self {
        Attributes(Self::NONE)
    }

    pub fn sealed() -> Self {
        Attributes(Self::READ_ONLY | Self::DONT_ENUM | Self::DONT_DELETE)
    }
}

/// The stored payload of a property: either an ordinary value, or (when
/// `Attributes::ACCESSOR` is set on the owning slot) a pair of function
/// values invoked on read/write. spec.md §3.4 models the accessor pair as
/// a distinct heap-resident "accessor object"; SPEC_FULL collapses that
/// into an inline enum variant (see DESIGN.md) since nothing besides the
/// owning property ever observes it as an object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyValue {
    Data(Representation),
    Accessor {
        get: Representation,
        set: Representation,
    },
}

impl PropertyValue {
    pub fn data(repr: Representation) -> Self {
        PropertyValue::Data(repr)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertySlot {
    pub value: PropertyValue,
    pub attributes: Attributes,
}

impl PropertySlot {
    pub fn data(value: Representation, attributes: Attributes) -> Self {
        Self {
            value: PropertyValue::Data(value),
            attributes,
        }
    }

    pub fn accessor(get: Representation, set: Representation, attributes: Attributes) -> Self {
        Self {
            value: PropertyValue::Accessor { get, set },
            attributes: attributes.with(Attributes::ACCESSOR),
        }
    }

    pub fn invariant_holds(&self) -> bool {
        // "A property whose attributes contain `accessor` and whose set is
        // undefined must also have `read_only`" (spec.md §3.4).
        if let PropertyValue::Accessor { set, .. } = self.value {
            if set == Representation::UNDEFINED && !self.attributes.is_read_only() {
                return false;
            }
        }
        true
    }
}

/// Property keys are interned `Rc<str>` rather than heap-GC-managed
/// strings (see DESIGN.md): this keeps the ordered property map cheap to
/// hash/compare and, crucially, means a collection never needs to rebuild
/// every object's key set — only property *values* are heap positions that
/// need fixing up.
pub type PropertyKey = Rc<str>;

pub fn property_key(name: impl AsRef<str>) -> PropertyKey {
    Rc::from(name.as_ref())
}
