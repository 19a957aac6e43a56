//! Pick-id assignment and decoding.
//!
//! A picking pass writes a `u32` id per pixel instead of a color. Each knot
//! drawn in the pass owns a contiguous id range, one id per object of its
//! layer, so a read-back id maps to `(knot, object)` with a binary search.

use serde::{Deserialize, Serialize};

/// Id written by pixels that no geometry covered.
pub const BACKGROUND_ID: u32 = 0;

/// Result of resolving a screen position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickResult {
    pub knot: String,
    /// Object index within the knot's layer.
    pub object: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PickRange {
    /// Ids `base + 1 ..= base + count` belong to this knot.
    base: u32,
    count: u32,
    knot: String,
}

/// Id ranges handed out for one picking pass.
///
/// Ordering contract:
/// - Ranges are assigned in registration order and never overlap.
/// - Id `0` is never assigned; it always decodes to "nothing hit".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PickTable {
    ranges: Vec<PickRange>,
    next_base: u32,
}

impl PickTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve ids for `object_count` objects of `knot`; returns the base id.
    ///
    /// Object `i` of the knot is encoded as `base + 1 + i`. A knot with no
    /// objects still reserves one id so the knot itself stays pickable.
    /// Returns `None` once the `u32` id space is exhausted.
    pub fn register(&mut self, knot: impl Into<String>, object_count: u32) -> Option<u32> {
        let count = object_count.max(1);
        let base = self.next_base;
        self.next_base = base.checked_add(count)?;
        self.ranges.push(PickRange {
            base,
            count,
            knot: knot.into(),
        });
        Some(base)
    }

    pub fn encode(base: u32, object: u32) -> u32 {
        base + 1 + object
    }

    /// Map a read-back id to the knot and object it encodes.
    pub fn decode(&self, id: u32) -> Option<PickResult> {
        if id == BACKGROUND_ID {
            return None;
        }
        // First range whose base is >= id, minus one, owns it.
        let slot = self.ranges.partition_point(|r| r.base < id);
        let range = self.ranges.get(slot.checked_sub(1)?)?;
        let object = id - range.base - 1;
        if object >= range.count {
            return None;
        }
        Some(PickResult {
            knot: range.knot.clone(),
            object: Some(object),
        })
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Total ids assigned so far.
    pub fn id_count(&self) -> u32 {
        self.next_base
    }
}

/// Pack a pick id into little-endian RGBA8.
pub fn id_to_rgba(id: u32) -> [u8; 4] {
    id.to_le_bytes()
}

pub fn rgba_to_id(rgba: [u8; 4]) -> u32 {
    u32::from_le_bytes(rgba)
}

#[cfg(test)]
mod tests {
    use super::{BACKGROUND_ID, PickResult, PickTable, id_to_rgba, rgba_to_id};

    fn hit(knot: &str, object: u32) -> Option<PickResult> {
        Some(PickResult {
            knot: knot.into(),
            object: Some(object),
        })
    }

    #[test]
    fn ranges_are_contiguous_and_disjoint() {
        let mut t = PickTable::new();
        let a = t.register("a", 3).unwrap();
        let b = t.register("b", 2).unwrap();
        assert_eq!((a, b), (0, 3));
        assert_eq!(t.id_count(), 5);

        assert_eq!(t.decode(PickTable::encode(a, 0)), hit("a", 0));
        assert_eq!(t.decode(PickTable::encode(a, 2)), hit("a", 2));
        assert_eq!(t.decode(PickTable::encode(b, 0)), hit("b", 0));
        assert_eq!(t.decode(PickTable::encode(b, 1)), hit("b", 1));
    }

    #[test]
    fn background_and_unassigned_ids_miss() {
        let mut t = PickTable::new();
        t.register("a", 2);
        assert_eq!(t.decode(BACKGROUND_ID), None);
        assert_eq!(t.decode(3), None);
        assert_eq!(PickTable::new().decode(1), None);
    }

    #[test]
    fn empty_layers_still_reserve_an_id() {
        let mut t = PickTable::new();
        let base = t.register("empty", 0).unwrap();
        t.register("next", 1);
        assert_eq!(t.decode(PickTable::encode(base, 0)), hit("empty", 0));
        assert_eq!(t.decode(2), hit("next", 0));
    }

    #[test]
    fn id_space_exhaustion_is_reported() {
        let mut t = PickTable::new();
        assert!(t.register("huge", u32::MAX).is_some());
        assert!(t.register("more", 1).is_none());
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn rgba_packing_is_little_endian() {
        assert_eq!(id_to_rgba(0x0403_0201), [1, 2, 3, 4]);
        assert_eq!(rgba_to_id([0, 0, 0, 0]), BACKGROUND_ID);
        assert_eq!(rgba_to_id(id_to_rgba(70_000)), 70_000);
    }
}
