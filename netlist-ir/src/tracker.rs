//! The value/driver tracker (spec §4.4) — the arithmetic heart of the core.
//! Owns the slot table and the per-symbol interval maps, and implements the
//! six-case overlap-splitting algorithm for `add` (overwrite) and `merge`
//! (additive) semantics.
//!
//! `DriverTracker.cpp`'s real `addDriver` overlap logic is entirely
//! commented out and `mergeDriver` is a bare `// TODO`, so spec §4.4's
//! prose is authoritative here, not a port of that file. The prose's six
//! named cases use strict inequalities that do not, read literally,
//! partition every boundary configuration (e.g. an existing interval
//! flush-aligned on one side with the new range is neither "strictly
//! contains" nor "left/right-overlaps" under a literal reading). This
//! implementation generalizes the "contains" cases to non-strict
//! containment with *conditional* remainder emission (only emit a
//! left/right remainder when it is actually non-empty), which is exactly
//! the shape of the original's own (commented-out) logic — e.g.
//! `if (itBounds.first < bounds.first) { ...insert left... }` guarding the
//! left split. See `DESIGN.md` for the full reasoning; the four resulting
//! branches (E-contains-N, N-contains-E, E-left-overlaps-N,
//! E-right-overlaps-N) are a strict superset of spec's six cases — exact
//! match is case 1's zero-remainder degenerate instance.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::bitrange::BitRange;
use crate::driver_store::{DriverStore, Handle};
use crate::graph::NodeId;
use crate::interval::IntervalMap;
use crate::surface::{symbol_key, Expr, ValueSymbol};

/// A `(graph-node, lsp)` pair identifying a driver of a bit range (spec
/// §3's "Driver record").
#[derive(Clone, Copy, Debug)]
pub struct DriverRecord<'ast> {
    pub node: NodeId,
    pub lsp: Option<&'ast Expr<'ast>>,
}

/// A set of driver records for a single interval. `smallvec`-backed since
/// the overwhelmingly common case is one or two drivers, matching the
/// teacher's pervasive use of `smallvec` for structural collections.
pub type DriverList<'ast> = SmallVec<[DriverRecord<'ast>; 2]>;

fn singleton<'ast>(node: NodeId, lsp: Option<&'ast Expr<'ast>>) -> DriverList<'ast> {
    let mut v = SmallVec::new();
    v.push(DriverRecord { node, lsp });
    v
}

fn with_added<'ast>(
    existing: &DriverList<'ast>,
    node: NodeId,
    lsp: Option<&'ast Expr<'ast>>,
) -> DriverList<'ast> {
    let mut v = existing.clone();
    v.push(DriverRecord { node, lsp });
    v
}

/// A bijection between value symbols and dense, append-only integer slots
/// (spec §3's "Slot table"), mirroring `DriverTracker`'s
/// `symbolToSlot`/`slotToSymbol` pair. The symbol reference itself (not
/// just its address) is kept in `slot_to_symbol` so that two independently
/// built trackers (e.g. the two sides of a conditional branch) can be
/// merged symbol-by-symbol without the caller re-supplying every symbol by
/// hand.
#[derive(Clone, Default)]
struct SlotTable<'ast> {
    symbol_to_slot: HashMap<usize, u32>,
    slot_to_symbol: Vec<&'ast dyn ValueSymbol>,
}

impl<'ast> SlotTable<'ast> {
    fn slot_for(&mut self, symbol: &'ast dyn ValueSymbol) -> u32 {
        let key = symbol_key(symbol);
        if let Some(&slot) = self.symbol_to_slot.get(&key) {
            slot
        } else {
            let slot = self.slot_to_symbol.len() as u32;
            self.symbol_to_slot.insert(key, slot);
            self.slot_to_symbol.push(symbol);
            slot
        }
    }

    fn existing_slot(&self, symbol: &dyn ValueSymbol) -> Option<u32> {
        self.symbol_to_slot.get(&symbol_key(symbol)).copied()
    }
}

/// Owns the slot table, the per-symbol interval maps, and the driver-list
/// arena backing them. `Clone`-able so per-branch analysis state can be
/// snapshotted before a conditional/case descends into its arms (spec
/// §4.6's branch-local driver-map copies).
#[derive(Clone)]
pub struct DriverTracker<'ast> {
    slots: SlotTable<'ast>,
    maps: Vec<IntervalMap<Handle>>,
    store: DriverStore<DriverList<'ast>>,
}

impl<'ast> Default for DriverTracker<'ast> {
    fn default() -> Self {
        DriverTracker {
            slots: SlotTable::default(),
            maps: Vec::new(),
            store: DriverStore::new(),
        }
    }
}

impl<'ast> DriverTracker<'ast> {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_slot(&mut self, slot: u32) {
        if slot as usize >= self.maps.len() {
            self.maps.resize_with(slot as usize + 1, IntervalMap::new);
        }
    }

    /// Overwriting semantics: after this call, `get(symbol, range)` yields
    /// exactly `{node}` for every sub-range of `range` (spec Testable
    /// Property 4).
    pub fn add(
        &mut self,
        symbol: &dyn ValueSymbol,
        lsp: Option<&'ast Expr<'ast>>,
        range: BitRange,
        node: NodeId,
    ) {
        self.insert(symbol, lsp, range, node, true);
    }

    /// Additive semantics: existing drivers of overlapping sub-ranges are
    /// retained alongside `node`.
    pub fn merge(
        &mut self,
        symbol: &dyn ValueSymbol,
        lsp: Option<&'ast Expr<'ast>>,
        range: BitRange,
        node: NodeId,
    ) {
        self.insert(symbol, lsp, range, node, false);
    }

    fn insert(
        &mut self,
        symbol: &dyn ValueSymbol,
        lsp: Option<&'ast Expr<'ast>>,
        range: BitRange,
        node: NodeId,
        overwrite: bool,
    ) {
        let slot = self.slots.slot_for(symbol);
        self.ensure_slot(slot);
        let mut map = std::mem::take(&mut self.maps[slot as usize]);
        let mut remaining = Some(range);

        while let Some(n) = remaining {
            let Some((e, handle)) = map.remove_one_overlap(n) else {
                break;
            };
            let d_e: DriverList<'ast> = self.store.erase(handle).expect("valid driver handle");

            if e.contains(&n) {
                // Case 1 (generalized): E contains N, possibly flush on
                // one or both sides. Exact match is the zero-remainder
                // instance of this branch.
                if e.lo < n.lo {
                    let h = self.store.allocate(d_e.clone());
                    map.insert(BitRange::new(e.lo, n.lo - 1), h);
                }
                if n.hi < e.hi {
                    let h = self.store.allocate(d_e.clone());
                    map.insert(BitRange::new(n.hi + 1, e.hi), h);
                }
                let mid = if overwrite {
                    singleton(node, lsp)
                } else {
                    with_added(&d_e, node, lsp)
                };
                let h = self.store.allocate(mid);
                map.insert(n, h);
                remaining = None;
            } else if n.contains(&e) {
                // Case 2 (generalized): N contains E.
                if overwrite {
                    // Drop E's interval entirely; N is unchanged and keeps
                    // scanning for further overlaps.
                    remaining = Some(n);
                } else {
                    let merged = with_added(&d_e, node, lsp);
                    let h = self.store.allocate(merged);
                    map.insert(e, h);
                    if n.lo < e.lo {
                        let h = self.store.allocate(singleton(node, lsp));
                        map.insert(BitRange::new(n.lo, e.lo - 1), h);
                    }
                    remaining = (e.hi < n.hi).then(|| BitRange::new(e.hi + 1, n.hi));
                }
            } else if e.lo <= n.lo {
                // Case 3: E left-overlaps N (e.hi < n.hi is implied, since
                // containment was ruled out above).
                if e.lo < n.lo {
                    let h = self.store.allocate(d_e.clone());
                    map.insert(BitRange::new(e.lo, n.lo - 1), h);
                }
                let overlap = if overwrite {
                    singleton(node, lsp)
                } else {
                    with_added(&d_e, node, lsp)
                };
                let h = self.store.allocate(overlap);
                map.insert(BitRange::new(n.lo, e.hi), h);
                remaining = (e.hi < n.hi).then(|| BitRange::new(e.hi + 1, n.hi));
            } else {
                // Case 4: E right-overlaps N (n.lo < e.lo and e.hi >= n.hi
                // are implied).
                if overwrite {
                    if n.hi < e.hi {
                        let h = self.store.allocate(d_e.clone());
                        map.insert(BitRange::new(n.hi + 1, e.hi), h);
                    }
                    let h = self.store.allocate(singleton(node, lsp));
                    map.insert(n, h);
                } else {
                    let h = self.store.allocate(singleton(node, lsp));
                    map.insert(BitRange::new(n.lo, e.lo - 1), h);
                    let mid = with_added(&d_e, node, lsp);
                    let h = self.store.allocate(mid);
                    map.insert(BitRange::new(e.lo, n.hi), h);
                    if n.hi < e.hi {
                        let h = self.store.allocate(d_e.clone());
                        map.insert(BitRange::new(n.hi + 1, e.hi), h);
                    }
                }
                remaining = None;
            }
        }

        if let Some(n) = remaining {
            let h = self.store.allocate(singleton(node, lsp));
            map.insert(n, h);
        }

        self.maps[slot as usize] = map;
    }

    /// The union of driver lists for every stored interval `E` such that
    /// `E ⊆ range` or `range ⊆ E` — the inclusive partial-overlap policy
    /// spec §4.4/§9 documents as the (deliberately kept) source behaviour.
    pub fn get(&self, symbol: &dyn ValueSymbol, range: BitRange) -> DriverList<'ast> {
        let mut result = DriverList::new();
        let Some(slot) = self.slots.existing_slot(symbol) else {
            return result;
        };
        let Some(map) = self.maps.get(slot as usize) else {
            return result;
        };
        for (e, handle) in map.find_overlaps(range) {
            if e.contains(&range) || range.contains(&e) {
                if let Ok(list) = self.store.get(*handle) {
                    result.extend(list.iter().copied());
                }
            }
        }
        result
    }

    /// All intervals currently stored for `symbol`, for consumers that
    /// need the raw fragmentation (the builder's `merge-procedural-drivers`
    /// walks this).
    pub fn intervals(&self, symbol: &dyn ValueSymbol) -> Vec<(BitRange, DriverList<'ast>)> {
        let Some(slot) = self.slots.existing_slot(symbol) else {
            return Vec::new();
        };
        let Some(map) = self.maps.get(slot as usize) else {
            return Vec::new();
        };
        map.iter()
            .filter_map(|(r, h)| self.store.get(*h).ok().map(|l| (r, l.clone())))
            .collect()
    }

    /// Every symbol this tracker has ever recorded a slot for, in
    /// first-touched order. Used by the DFA's join/meet to enumerate the
    /// union of symbols touched by two independently built trackers.
    pub fn iter_symbols(&self) -> impl Iterator<Item = &'ast dyn ValueSymbol> + '_ {
        self.slots.slot_to_symbol.iter().copied()
    }

    /// Install `drivers` verbatim as the sole content of `range` in
    /// `symbol`'s map. Unlike `add`/`merge`, this performs no
    /// overlap-splitting: the caller must guarantee `range` does not
    /// overlap anything already stored for `symbol`. Used when
    /// reconstructing a merged driver map from two branch-local trackers,
    /// where the disjoint partition has already been computed by the
    /// caller.
    pub fn install(&mut self, symbol: &'ast dyn ValueSymbol, range: BitRange, drivers: DriverList<'ast>) {
        let slot = self.slots.slot_for(symbol);
        self.ensure_slot(slot);
        let handle = self.store.allocate(drivers);
        self.maps[slot as usize].insert(range, handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Sym;
    impl ValueSymbol for Sym {
        fn bit_width(&self) -> u32 {
            8
        }
        fn hierarchical_path(&self) -> &str {
            "t"
        }
    }

    fn nid(i: u32) -> NodeId {
        // Build distinct NodeIds via a throwaway graph; identity is all
        // that matters for these tests.
        let mut g: crate::graph::Graph<u32, ()> = crate::graph::Graph::new();
        for _ in 0..i {
            g.add_node(0);
        }
        g.add_node(0)
    }

    #[test]
    fn add_overwrites_exact_range() {
        let sym = Sym;
        let mut t = DriverTracker::new();
        let n0 = nid(0);
        t.add(&sym, None, BitRange::new(0, 7), n0);
        let got = t.get(&sym, BitRange::new(0, 7));
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].node, n0);
    }

    #[test]
    fn merge_unions_drivers() {
        let sym = Sym;
        let mut t = DriverTracker::new();
        let n0 = nid(0);
        let n1 = nid(1);
        t.add(&sym, None, BitRange::new(0, 7), n0);
        t.merge(&sym, None, BitRange::new(0, 7), n1);
        let got = t.get(&sym, BitRange::new(0, 7));
        let nodes: Vec<_> = got.iter().map(|d| d.node).collect();
        assert!(nodes.contains(&n0));
        assert!(nodes.contains(&n1));
    }

    #[test]
    fn driver_map_stays_disjoint_after_overlapping_adds() {
        let sym = Sym;
        let mut t = DriverTracker::new();
        let n0 = nid(0);
        let n1 = nid(1);
        t.add(&sym, None, BitRange::new(2, 3), n0);
        t.add(&sym, None, BitRange::new(0, 2), n1);

        let intervals = t.intervals(&sym);
        for w in intervals.windows(2) {
            assert!(w[0].0.hi < w[1].0.lo, "intervals must be pairwise disjoint");
        }
    }

    #[test]
    fn second_blocking_write_owns_the_overlap_boundary() {
        // spec §8 "Driver overlap" scenario: t[3:2] = a[1:0]; t[2:0] =
        // a[2:0]; in one block. Bit 3 keeps the first assignment's driver;
        // bits 2..0 belong entirely to the second, because blocking
        // assignments overwrite. We assert the query-level contract
        // (Testable Property 4), not the internal fragment count, which
        // is not part of the documented contract.
        let sym = Sym;
        let mut t = DriverTracker::new();
        let first = nid(0);
        let second = nid(1);
        t.add(&sym, None, BitRange::new(2, 3), first);
        t.add(&sym, None, BitRange::new(0, 2), second);

        let top_bit = t.get(&sym, BitRange::new(3, 3));
        assert_eq!(top_bit.len(), 1);
        assert_eq!(top_bit[0].node, first);

        let low_bits = t.get(&sym, BitRange::new(0, 2));
        assert!(low_bits.iter().all(|d| d.node == second));
        assert!(!low_bits.is_empty());
    }

    #[test]
    fn get_is_empty_for_unknown_symbol() {
        let sym = Sym;
        let t: DriverTracker = DriverTracker::new();
        assert!(t.get(&sym, BitRange::new(0, 0)).is_empty());
    }
}
