/// A heap-resident, immutable UTF-16 string (spec.md §3.1, §3.9). Stored as
/// code units rather than `String` because ECMAScript string indexing and
/// `.length` are defined over UTF-16 code units, not Unicode scalar values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsStringData {
    units: Box<[u16]>,
}

impl JsStringData {
    pub fn from_str(s: &str) -> Self {
        Self {
            units: s.encode_utf16().collect(),
        }
    }

    pub fn from_units(units: Vec<u16>) -> Self {
        Self {
            units: units.into_boxed_slice(),
        }
    }

    pub fn len(&self) -> u32 {
        self.units.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> &[u16] {
        &self.units
    }

    pub fn to_string_lossy(&self) -> String {
        String::from_utf16_lossy(&self.units)
    }

    pub fn concat(&self, other: &JsStringData) -> Self {
        let mut units = Vec::with_capacity(self.units.len() + other.units.len());
        units.extend_from_slice(&self.units);
        units.extend_from_slice(&other.units);
        Self::from_units(units)
    }

    /// No embedded heap positions: strings never reference other heap
    /// objects, so `for_each_embedded_position_mut` in `heap.rs` is a no-op
    /// for this type.
    pub fn has_no_embedded_positions() -> bool {
        true
    }
}

impl std::hash::Hash for JsStringData {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.units.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_ascii() {
        let s = JsStringData::from_str("hello");
        assert_eq!(s.len(), 5);
        assert_eq!(s.to_string_lossy(), "hello");
    }

    #[test]
    fn concat_joins_units() {
        let a = JsStringData::from_str("foo");
        let b = JsStringData::from_str("bar");
        assert_eq!(a.concat(&b).to_string_lossy(), "foobar");
    }
}
