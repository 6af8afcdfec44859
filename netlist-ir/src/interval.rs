//! A non-overlapping interval map keyed by [`BitRange`].
//!
//! No crate in the retrieved corpus (the teacher, its siblings, or
//! `other_examples/`) supplies a ranged map of this shape — the teacher
//! reaches for `petgraph`/`smallvec`/`linked-hash-map` for adjacency and
//! ordering, not interval structures — so this is hand-rolled directly over
//! `std::collections::BTreeMap`, keyed by lower bound, which gives the
//! "iteration ordered by ascending lower bound" invariant from spec §4.2 for
//! free. The shape mirrors the original `IntervalMapUtils.hpp`'s two-pointer
//! `difference` algorithm, translated from raw pointer/allocator plumbing to
//! an owned `BTreeMap`.

use std::collections::BTreeMap;

use crate::bitrange::BitRange;

#[derive(Clone, Debug)]
pub struct IntervalMap<V> {
    // Keyed by lower bound; value carries the upper bound alongside the
    // caller's payload so a single BTreeMap lookup recovers the whole
    // interval.
    entries: BTreeMap<u32, (u32, V)>,
}

impl<V> Default for IntervalMap<V> {
    fn default() -> Self {
        IntervalMap {
            entries: BTreeMap::new(),
        }
    }
}

impl<V> IntervalMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Store `range -> value`. The caller is responsible for ensuring this
    /// does not overlap any interval already present (spec §4.2's
    /// "overlap handling is the caller's responsibility").
    pub fn insert(&mut self, range: BitRange, value: V) {
        debug_assert!(
            self.find_overlaps(range).next().is_none(),
            "IntervalMap::insert violated pairwise-disjointness"
        );
        self.entries.insert(range.lo, (range.hi, value));
    }

    /// Remove the entry whose bounds are exactly `range`, if present.
    pub fn remove_exact(&mut self, range: BitRange) -> Option<V> {
        match self.entries.get(&range.lo) {
            Some(&(hi, _)) if hi == range.hi => self.entries.remove(&range.lo).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Remove and return one interval overlapping `range`, along with its
    /// bounds, or `None` if no stored interval overlaps. Repeated calls
    /// drain every overlap one at a time, mirroring the original's
    /// `for (it = map.find(bounds); it != end();)` loop that erases and
    /// re-queries on each iteration.
    pub fn remove_one_overlap(&mut self, range: BitRange) -> Option<(BitRange, V)> {
        let lo = self
            .entries
            .range(..=range.hi)
            .find(|(_, &(hi, _))| hi >= range.lo)
            .map(|(&lo, _)| lo)?;
        let (hi, v) = self.entries.remove(&lo).expect("just located");
        Some((BitRange::new(lo, hi), v))
    }

    /// All stored intervals overlapping `range`, ascending by lower bound.
    pub fn find_overlaps(&self, range: BitRange) -> impl Iterator<Item = (BitRange, &V)> {
        self.entries
            .range(..=range.hi)
            .filter(move |(_, &(hi, _))| hi >= range.lo)
            .map(|(&lo, (hi, v))| (BitRange::new(lo, *hi), v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (BitRange, &V)> {
        self.entries.iter().map(|(&lo, (hi, v))| (BitRange::new(lo, *hi), v))
    }

    pub fn get_exact(&self, range: BitRange) -> Option<&V> {
        self.entries
            .get(&range.lo)
            .filter(|&&(hi, _)| hi == range.hi)
            .map(|(_, v)| v)
    }

    pub fn get_exact_mut(&mut self, range: BitRange) -> Option<&mut V> {
        self.entries
            .get_mut(&range.lo)
            .filter(|&&mut (hi, _)| hi == range.hi)
            .map(|(_, v)| v)
    }
}

impl<V: Clone> IntervalMap<V> {
    /// Return the intervals present in `self` but not covered by `other`,
    /// partitioned at `other`'s boundaries; values carry over from `self`.
    ///
    /// This realizes spec §4.2's `difference(A, B)` with Open Question 3
    /// resolved (see `DESIGN.md`): only the left-operand's remainder is
    /// produced, matching `IntervalMapUtils.hpp`'s behaviour exactly.
    pub fn difference<W>(&self, other: &IntervalMap<W>) -> IntervalMap<V> {
        let mut result = IntervalMap::new();
        for (lo_a, (hi_a, val)) in self.entries.iter() {
            let a = BitRange::new(*lo_a, *hi_a);
            let mut cursor = a.lo;
            for (lo_b, (hi_b, _)) in other.entries.range(..=a.hi) {
                if *hi_b < cursor {
                    continue;
                }
                if *lo_b > a.hi {
                    break;
                }
                if *lo_b > cursor {
                    result.insert(BitRange::new(cursor, lo_b - 1), val.clone());
                }
                if *hi_b >= a.hi {
                    cursor = a.hi + 1;
                    break;
                }
                cursor = hi_b + 1;
            }
            if cursor <= a.hi {
                result.insert(BitRange::new(cursor, a.hi), val.clone());
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_find_overlaps() {
        let mut m = IntervalMap::new();
        m.insert(BitRange::new(0, 3), "a");
        m.insert(BitRange::new(5, 7), "b");
        let hits: Vec<_> = m.find_overlaps(BitRange::new(2, 6)).collect();
        assert_eq!(hits, vec![(BitRange::new(0, 3), &"a"), (BitRange::new(5, 7), &"b")]);
    }

    #[test]
    fn iteration_is_ascending() {
        let mut m = IntervalMap::new();
        m.insert(BitRange::new(10, 12), "later");
        m.insert(BitRange::new(0, 3), "earlier");
        let order: Vec<_> = m.iter().map(|(r, _)| r.lo).collect();
        assert_eq!(order, vec![0, 10]);
    }

    #[test]
    fn remove_one_overlap_drains_all() {
        let mut m = IntervalMap::new();
        m.insert(BitRange::new(0, 1), "a");
        m.insert(BitRange::new(2, 3), "b");
        let mut got = vec![];
        while let Some((r, v)) = m.remove_one_overlap(BitRange::new(0, 3)) {
            got.push((r, v));
        }
        assert_eq!(got.len(), 2);
        assert!(m.is_empty());
    }

    #[test]
    fn difference_partitions_at_boundaries() {
        let mut a = IntervalMap::new();
        a.insert(BitRange::new(0, 9), "a");
        let mut b = IntervalMap::new();
        b.insert(BitRange::new(3, 5), "b");
        let diff = a.difference(&b);
        let got: Vec<_> = diff.iter().map(|(r, v)| (r, *v)).collect();
        assert_eq!(
            got,
            vec![(BitRange::new(0, 2), "a"), (BitRange::new(6, 9), "a")]
        );
    }

    #[test]
    fn difference_with_no_overlap_is_identity() {
        let mut a = IntervalMap::new();
        a.insert(BitRange::new(0, 3), "a");
        let b: IntervalMap<()> = IntervalMap::new();
        let diff = a.difference(&b);
        let got: Vec<_> = diff.iter().map(|(r, _)| r).collect();
        assert_eq!(got, vec![BitRange::new(0, 3)]);
    }
}
