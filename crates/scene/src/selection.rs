use std::collections::BTreeMap;

use crate::picking::PickResult;

/// Set of object indices backed by a bitset.
///
/// Ordering contract:
/// - Iteration yields indices in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    words: Vec<u64>,
    len: usize,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.words.clear();
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, index: u32) -> bool {
        let (word, bit) = word_bit(index);
        self.words
            .get(word)
            .is_some_and(|w| (w & (1u64 << bit)) != 0)
    }

    /// Returns `true` if the set changed.
    pub fn insert(&mut self, index: u32) -> bool {
        let (word, bit) = word_bit(index);
        if self.words.len() <= word {
            self.words.resize(word + 1, 0);
        }
        let mask = 1u64 << bit;
        let w = &mut self.words[word];
        if (*w & mask) != 0 {
            return false;
        }
        *w |= mask;
        self.len += 1;
        true
    }

    /// Returns `true` if the set changed.
    pub fn remove(&mut self, index: u32) -> bool {
        let (word, bit) = word_bit(index);
        let Some(w) = self.words.get_mut(word) else {
            return false;
        };
        let mask = 1u64 << bit;
        if (*w & mask) == 0 {
            return false;
        }
        *w &= !mask;
        self.len -= 1;
        true
    }

    pub fn union_in_place(&mut self, other: &Self) {
        if self.words.len() < other.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (w, ow) in self.words.iter_mut().zip(&other.words) {
            *w |= ow;
        }
        self.recount_len();
    }

    /// Set difference: `self \ other`.
    pub fn diff_in_place(&mut self, other: &Self) {
        for (w, ow) in self.words.iter_mut().zip(&other.words) {
            *w &= !ow;
        }
        self.recount_len();
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &word)| {
            let base = wi as u32 * 64;
            BitIter(word).map(move |bit| base + bit)
        })
    }

    fn recount_len(&mut self) {
        self.len = self.words.iter().map(|w| w.count_ones() as usize).sum();
    }
}

impl FromIterator<u32> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut s = Self::new();
        for i in iter {
            s.insert(i);
        }
        s
    }
}

fn word_bit(index: u32) -> (usize, u32) {
    ((index / 64) as usize, index % 64)
}

struct BitIter(u64);

impl Iterator for BitIter {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.0 == 0 {
            return None;
        }
        let tz = self.0.trailing_zeros();
        self.0 &= self.0 - 1;
        Some(tz)
    }
}

/// Objects drawn with the highlight color on the next display pass.
///
/// Setting the picked object replaces the whole highlight; brushing adds
/// to it. Both are idempotent and never touch layer geometry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Highlight {
    per_knot: BTreeMap<String, SelectionSet>,
}

impl Highlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highlight exactly one object.
    pub fn set_picked(&mut self, knot: &str, object: u32) {
        self.per_knot.clear();
        self.per_knot
            .entry(knot.to_string())
            .or_default()
            .insert(object);
    }

    /// Add every brushed hit to the highlight.
    pub fn brush<'a>(&mut self, hits: impl IntoIterator<Item = &'a PickResult>) {
        for hit in hits {
            if let Some(object) = hit.object {
                self.per_knot
                    .entry(hit.knot.clone())
                    .or_default()
                    .insert(object);
            }
        }
    }

    pub fn clear(&mut self) {
        self.per_knot.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.per_knot.values().all(SelectionSet::is_empty)
    }

    pub fn contains(&self, knot: &str, object: u32) -> bool {
        self.per_knot.get(knot).is_some_and(|s| s.contains(object))
    }

    pub fn objects(&self, knot: &str) -> Option<&SelectionSet> {
        self.per_knot.get(knot)
    }

    /// Drop a knot's highlight, for example when the knot is removed.
    pub fn forget_knot(&mut self, knot: &str) {
        self.per_knot.remove(knot);
    }
}
