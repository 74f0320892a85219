//! Wires and nets.
//!
//! A wire joins two pins. A net is a connected component of pins under
//! the wire relation; all pins of a net share one signal. Nets are always
//! rebuilt from scratch from the full wire list, which keeps the result a
//! pure function of (pins, wires).

use std::collections::{BTreeMap, BTreeSet};

use crate::node::{NodeId, PinRef};

/// An undirected wire between two pins, stored with `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Wire {
    a: PinRef,
    b: PinRef,
}

impl Wire {
    /// Returns `None` for a wire from a pin to itself.
    pub fn new(x: PinRef, y: PinRef) -> Option<Self> {
        match x.cmp(&y) {
            std::cmp::Ordering::Less => Some(Wire { a: x, b: y }),
            std::cmp::Ordering::Greater => Some(Wire { a: y, b: x }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn ends(&self) -> (PinRef, PinRef) {
        (self.a, self.b)
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.a.node == node || self.b.node == node
    }
}

/// The set of wires in a circuit.
#[derive(Debug, Clone, Default)]
pub struct WireList {
    wires: BTreeSet<Wire>,
}

impl WireList {
    pub fn new() -> Self {
        WireList::default()
    }

    /// Returns `false` if the wire already existed.
    pub fn insert(&mut self, wire: Wire) -> bool {
        self.wires.insert(wire)
    }

    /// Returns `false` if the wire did not exist.
    pub fn remove(&mut self, wire: &Wire) -> bool {
        self.wires.remove(wire)
    }

    /// Drop every wire touching `node`. Returns how many were removed.
    pub fn remove_node(&mut self, node: NodeId) -> usize {
        let before = self.wires.len();
        self.wires.retain(|w| !w.touches(node));
        before - self.wires.len()
    }

    pub fn contains(&self, wire: &Wire) -> bool {
        self.wires.contains(wire)
    }

    pub fn len(&self) -> usize {
        self.wires.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wires.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Wire> {
        self.wires.iter()
    }
}

// ── Union-find ───────────────────────────────────────────────────────

struct DisjointSets {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSets {
    fn new(len: usize) -> Self {
        DisjointSets {
            parent: (0..len).collect(),
            rank: vec![0; len],
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, x: usize, y: usize) {
        let (rx, ry) = (self.find(x), self.find(y));
        if rx == ry {
            return;
        }
        match self.rank[rx].cmp(&self.rank[ry]) {
            std::cmp::Ordering::Less => self.parent[rx] = ry,
            std::cmp::Ordering::Greater => self.parent[ry] = rx,
            std::cmp::Ordering::Equal => {
                self.parent[ry] = rx;
                self.rank[rx] += 1;
            }
        }
    }
}

/// Group `pins` into nets.
///
/// Every pin lands in exactly one net; unwired pins form singleton nets.
/// Wires whose ends are not in `pins` are ignored. Each net is sorted and
/// nets are ordered by their lowest pin, so the output is deterministic.
pub fn build_nets<I>(pins: I, wires: &WireList) -> Vec<Vec<PinRef>>
where
    I: IntoIterator<Item = PinRef>,
{
    let index: BTreeMap<PinRef, usize> = pins
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .enumerate()
        .map(|(i, p)| (p, i))
        .collect();

    let mut sets = DisjointSets::new(index.len());
    for wire in wires.iter() {
        if let (Some(&x), Some(&y)) = (index.get(&wire.a), index.get(&wire.b)) {
            sets.union(x, y);
        }
    }

    // Pins are visited in ascending order, so each root's group is
    // created at its lowest pin and filled in sorted order.
    let mut groups: BTreeMap<usize, Vec<PinRef>> = BTreeMap::new();
    let mut order: Vec<usize> = Vec::new();
    for (pin, i) in &index {
        let root = sets.find(*i);
        groups
            .entry(root)
            .or_insert_with(|| {
                order.push(root);
                Vec::new()
            })
            .push(*pin);
    }
    order
        .into_iter()
        .filter_map(|root| groups.remove(&root))
        .collect()
}
