//! DiGraph: directed graph that keeps outgoing and incoming adjacency per
//! vertex.
//!
//! Vertices live in a slot map and are found by value through a hash index
//! that stores only slot keys and their precomputed hashes. Each slot owns
//! two ordered, duplicate-free neighbour lists. Edge `u -> v` exists exactly
//! when `v` is in `u.outgoing` and `u` is in `v.incoming`; every mutation
//! updates both lists together.
//!
//! Vertices are never removed, so slot order is insertion order and
//! [`DiGraph::vertices`] reports vertices in the order they were added.
//!
//! A [`VertexId`] carries the id of the graph that issued it. Handle-based
//! operations treat a handle from another graph like a missing vertex.

use crate::reentry::ReentryCheck;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::iter::FusedIterator;
use hashbrown::hash_table::Entry as IndexEntry;
use hashbrown::HashTable;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
struct GraphId(u64);

impl GraphId {
    fn next() -> Self {
        GraphId(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Stable handle to a vertex of a [`DiGraph`]. Only meaningful in the graph
/// that issued it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct VertexId {
    owner: GraphId,
    key: DefaultKey,
}

impl VertexId {
    pub fn vertex<'a, V, S>(&self, graph: &'a DiGraph<V, S>) -> Option<&'a V> {
        graph.vertex(*self)
    }
}

#[derive(Debug)]
struct Slot<V> {
    vertex: V,
    hash: u64,
    outgoing: Vec<DefaultKey>,
    incoming: Vec<DefaultKey>,
}

impl<V> Slot<V> {
    fn new(vertex: V, hash: u64) -> Self {
        Slot {
            vertex,
            hash,
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }
    }
}

pub struct DiGraph<V, S = RandomState> {
    id: GraphId,
    hasher: S,
    index: HashTable<DefaultKey>,
    slots: SlotMap<DefaultKey, Slot<V>>,
    edges: usize,
    reentry: ReentryCheck,
}

impl<V> DiGraph<V>
where
    V: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    pub fn with_capacity(vertices: usize) -> Self {
        Self::with_capacity_and_hasher(vertices, Default::default())
    }
}

impl<V> Default for DiGraph<V>
where
    V: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V, S> DiGraph<V, S> {
    pub fn vertex_count(&self) -> usize {
        self.slots.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// All vertices in insertion order.
    pub fn vertices(&self) -> Vertices<'_, V> {
        Vertices {
            it: self.slots.iter(),
        }
    }

    pub fn vertex_ids(&self) -> impl Iterator<Item = VertexId> + '_ {
        let owner = self.id;
        self.slots.keys().map(move |key| VertexId { owner, key })
    }

    fn handle(&self, key: DefaultKey) -> VertexId {
        VertexId {
            owner: self.id,
            key,
        }
    }

    // Slot behind `id`, or `None` for a handle issued by another graph.
    fn slot(&self, id: VertexId) -> Option<&Slot<V>> {
        if id.owner != self.id {
            return None;
        }
        self.slots.get(id.key)
    }

    pub fn vertex(&self, id: VertexId) -> Option<&V> {
        self.slot(id).map(|s| &s.vertex)
    }

    pub fn outgoing_of(&self, id: VertexId) -> Neighbors<'_, V> {
        let ids = self.slot(id).map_or(&[][..], |s| s.outgoing.as_slice());
        Neighbors::new(ids, self)
    }

    pub fn incoming_of(&self, id: VertexId) -> Neighbors<'_, V> {
        let ids = self.slot(id).map_or(&[][..], |s| s.incoming.as_slice());
        Neighbors::new(ids, self)
    }

    /// Records `from -> to` between existing vertices.
    ///
    /// Returns `true` if the edge was new; `false` if it already existed or
    /// either handle was not issued by this graph.
    pub fn add_edge_ids(&mut self, from: VertexId, to: VertexId) -> bool {
        if self.slot(from).is_none() || self.slot(to).is_none() {
            return false;
        }
        let (a, b) = (from.key, to.key);
        let Some(src) = self.slots.get_mut(a) else {
            return false;
        };
        if src.outgoing.contains(&b) {
            return false;
        }
        src.outgoing.push(b);
        let dst = &mut self.slots[b];
        debug_assert!(!dst.incoming.contains(&a));
        dst.incoming.push(a);
        self.edges += 1;
        trace!(edges = self.edges, "added edge");
        true
    }

    /// Removes `from -> to`. Returns `false` if there was no such edge.
    pub fn remove_edge_ids(&mut self, from: VertexId, to: VertexId) -> bool {
        if self.slot(from).is_none() || self.slot(to).is_none() {
            return false;
        }
        let (a, b) = (from.key, to.key);
        let Some(src) = self.slots.get_mut(a) else {
            return false;
        };
        let Some(pos) = src.outgoing.iter().position(|&k| k == b) else {
            return false;
        };
        src.outgoing.remove(pos);
        let dst = &mut self.slots[b];
        if let Some(pos) = dst.incoming.iter().position(|&k| k == a) {
            dst.incoming.remove(pos);
        }
        self.edges -= 1;
        trace!(edges = self.edges, "removed edge");
        true
    }

    pub fn has_edge_ids(&self, from: VertexId, to: VertexId) -> bool {
        if self.slot(to).is_none() {
            return false;
        }
        self.slot(from)
            .map(|s| s.outgoing.contains(&to.key))
            .unwrap_or(false)
    }
}

impl<V, S> DiGraph<V, S>
where
    V: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_capacity_and_hasher(0, hasher)
    }

    pub fn with_capacity_and_hasher(vertices: usize, hasher: S) -> Self {
        debug!(capacity = vertices, "created digraph");
        Self {
            id: GraphId::next(),
            hasher,
            index: HashTable::with_capacity(vertices),
            slots: SlotMap::with_capacity_and_key(vertices),
            edges: 0,
            reentry: ReentryCheck::new(),
        }
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    fn find_key<Q>(&self, q: &Q) -> Option<DefaultKey>
    where
        V: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let hash = self.make_hash(q);
        self.index
            .find(hash, |&k| {
                self.slots
                    .get(k)
                    .map(|s| s.vertex.borrow() == q)
                    .unwrap_or(false)
            })
            .copied()
    }

    pub fn find<Q>(&self, q: &Q) -> Option<VertexId>
    where
        V: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentry.enter();
        self.find_key(q).map(|k| self.handle(k))
    }

    pub fn contains_vertex<Q>(&self, q: &Q) -> bool
    where
        V: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).is_some()
    }

    /// Adds `vertex` unless an equal one is present. Either way returns the
    /// handle of the stored vertex; an equal duplicate is dropped.
    pub fn add_vertex(&mut self, vertex: V) -> VertexId {
        let _g = self.reentry.enter();
        let hash = self.make_hash(&vertex);
        match self.index.entry(
            hash,
            |&k| {
                self.slots
                    .get(k)
                    .map(|s| s.vertex == vertex)
                    .unwrap_or(false)
            },
            |&k| self.slots.get(k).map(|s| s.hash).unwrap_or(0),
        ) {
            IndexEntry::Occupied(o) => VertexId {
                owner: self.id,
                key: *o.get(),
            },
            IndexEntry::Vacant(v) => {
                let k = self.slots.insert(Slot::new(vertex, hash));
                let _ = v.insert(k);
                trace!(vertices = self.slots.len(), "added vertex");
                VertexId {
                    owner: self.id,
                    key: k,
                }
            }
        }
    }

    /// Adds both endpoints if needed, then records `from -> to`.
    /// Returns `true` if the edge was new.
    pub fn add_edge(&mut self, from: V, to: V) -> bool {
        let a = self.add_vertex(from);
        let b = self.add_vertex(to);
        self.add_edge_ids(a, b)
    }

    /// Removes `from -> to` if present; missing vertices or edges are a
    /// no-op returning `false`.
    pub fn remove_edge<Q>(&mut self, from: &Q, to: &Q) -> bool
    where
        V: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let (Some(a), Some(b)) = (self.find(from), self.find(to)) else {
            return false;
        };
        self.remove_edge_ids(a, b)
    }

    pub fn has_edge<Q>(&self, from: &Q, to: &Q) -> bool
    where
        V: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        match (self.find(from), self.find(to)) {
            (Some(a), Some(b)) => self.has_edge_ids(a, b),
            _ => false,
        }
    }

    /// Vertices `q` points to, in the order the edges were added. Empty when
    /// `q` is absent.
    pub fn outgoing<Q>(&self, q: &Q) -> Neighbors<'_, V>
    where
        V: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        match self.find(q) {
            Some(id) => self.outgoing_of(id),
            None => Neighbors::new(&[], self),
        }
    }

    /// Vertices pointing to `q`, in the order the edges were added. Empty
    /// when `q` is absent.
    pub fn incoming<Q>(&self, q: &Q) -> Neighbors<'_, V>
    where
        V: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        match self.find(q) {
            Some(id) => self.incoming_of(id),
            None => Neighbors::new(&[], self),
        }
    }

    pub fn out_degree<Q>(&self, q: &Q) -> usize
    where
        V: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.outgoing(q).len()
    }

    pub fn in_degree<Q>(&self, q: &Q) -> usize
    where
        V: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.incoming(q).len()
    }
}

impl<V: fmt::Debug, S> fmt::Debug for DiGraph<V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.slots
                    .values()
                    .map(|s| (&s.vertex, Neighbors::new(&s.outgoing, self))),
            )
            .finish()
    }
}

/// Ordered neighbour list of one vertex.
pub struct Neighbors<'a, V> {
    ids: core::slice::Iter<'a, DefaultKey>,
    slots: &'a SlotMap<DefaultKey, Slot<V>>,
    owner: GraphId,
}

impl<'a, V> Neighbors<'a, V> {
    fn new<S>(ids: &'a [DefaultKey], graph: &'a DiGraph<V, S>) -> Self {
        Neighbors {
            ids: ids.iter(),
            slots: &graph.slots,
            owner: graph.id,
        }
    }

    /// Handles of the remaining neighbours.
    pub fn ids(&self) -> impl ExactSizeIterator<Item = VertexId> + 'a {
        let owner = self.owner;
        self.ids.clone().map(move |&key| VertexId { owner, key })
    }
}

impl<V> Clone for Neighbors<'_, V> {
    fn clone(&self) -> Self {
        Neighbors {
            ids: self.ids.clone(),
            slots: self.slots,
            owner: self.owner,
        }
    }
}

impl<'a, V> Iterator for Neighbors<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        let slots = self.slots;
        self.ids.next().map(|&k| &slots[k].vertex)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

impl<V> DoubleEndedIterator for Neighbors<'_, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let slots = self.slots;
        self.ids.next_back().map(|&k| &slots[k].vertex)
    }
}

impl<V> ExactSizeIterator for Neighbors<'_, V> {}
impl<V> FusedIterator for Neighbors<'_, V> {}

impl<V: fmt::Debug> fmt::Debug for Neighbors<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

/// Iterator over the vertices of a [`DiGraph`] in insertion order.
pub struct Vertices<'a, V> {
    it: slotmap::basic::Iter<'a, DefaultKey, Slot<V>>,
}

impl<'a, V> Iterator for Vertices<'a, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, s)| &s.vertex)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::hash::Hasher;

    fn names<'a>(it: impl Iterator<Item = &'a String>) -> Vec<&'a str> {
        it.map(String::as_str).collect()
    }

    /// Invariant: an edge shows up on both sides and disappears from both
    /// sides on removal.
    #[test]
    fn add_and_remove_edge_updates_both_sides() {
        let mut g: DiGraph<String> = DiGraph::new();
        g.add_vertex("Alice".to_string());
        g.add_vertex("Bob".to_string());
        assert!(g.add_edge("Alice".to_string(), "Bob".to_string()));

        assert_eq!(names(g.outgoing("Alice")), ["Bob"]);
        assert_eq!(names(g.incoming("Bob")), ["Alice"]);
        assert!(g.outgoing("Bob").next().is_none());
        assert!(g.incoming("Alice").next().is_none());
        assert!(g.has_edge("Alice", "Bob"));
        assert!(!g.has_edge("Bob", "Alice"));
        assert_eq!(g.edge_count(), 1);

        assert!(g.remove_edge("Alice", "Bob"));
        assert_eq!(g.outgoing("Alice").len(), 0);
        assert_eq!(g.incoming("Bob").len(), 0);
        assert!(!g.has_edge("Alice", "Bob"));
        assert_eq!(g.edge_count(), 0);
        assert_eq!(g.vertex_count(), 2);
    }

    /// Invariant: adding the same edge twice records it once.
    #[test]
    fn add_edge_is_idempotent() {
        let mut g: DiGraph<&str> = DiGraph::new();
        assert!(g.add_edge("a", "b"));
        assert!(!g.add_edge("a", "b"));
        assert_eq!(g.outgoing("a").collect::<Vec<_>>(), [&"b"]);
        assert_eq!(g.incoming("b").collect::<Vec<_>>(), [&"a"]);
        assert_eq!(g.edge_count(), 1);
    }

    /// Invariant: adding a present vertex changes nothing and hands back the
    /// existing handle.
    #[test]
    fn add_vertex_is_idempotent() {
        let mut g: DiGraph<String> = DiGraph::new();
        let a1 = g.add_vertex("a".to_string());
        let b = g.add_vertex("b".to_string());
        let a2 = g.add_vertex("a".to_string());
        assert_eq!(a1, a2);
        assert_ne!(a1, b);
        assert_eq!(g.vertex_count(), 2);
        assert_eq!(g.vertices().count(), 2);
        assert_eq!(a1.vertex(&g).map(String::as_str), Some("a"));
        assert_eq!(g.find("a"), Some(a1));
        assert_eq!(g.find("z"), None);
    }

    /// Invariant: edges create missing endpoints; vertices keep insertion order.
    #[test]
    fn edges_create_vertices_in_order() {
        let mut g: DiGraph<u32> = DiGraph::new();
        g.add_vertex(7);
        g.add_edge(3, 7);
        g.add_edge(5, 1);
        assert_eq!(g.vertices().copied().collect::<Vec<_>>(), [7, 3, 5, 1]);
        assert!(g.contains_vertex(&1));
        assert!(!g.contains_vertex(&2));
        let ids: Vec<_> = g.vertex_ids().collect();
        assert_eq!(ids.len(), 4);
        assert_eq!(g.vertex(ids[1]), Some(&3));
    }

    /// Invariant: neighbour lists keep edge insertion order, and removal in
    /// the middle preserves the order of the rest.
    #[test]
    fn neighbour_order_survives_removal() {
        let mut g: DiGraph<char> = DiGraph::new();
        for to in ['b', 'c', 'd', 'e'] {
            g.add_edge('a', to);
        }
        assert!(g.remove_edge(&'a', &'c'));
        assert_eq!(g.outgoing(&'a').copied().collect::<String>(), "bde");
        assert_eq!(g.outgoing(&'a').rev().copied().collect::<String>(), "edb");
        assert_eq!(g.out_degree(&'a'), 3);
        assert_eq!(g.in_degree(&'c'), 0);
    }

    /// Invariant: removing a missing edge or touching missing vertices is a
    /// no-op.
    #[test]
    fn missing_edges_and_vertices_are_noops() {
        let mut g: DiGraph<&str> = DiGraph::new();
        g.add_edge("a", "b");
        assert!(!g.remove_edge("b", "a"));
        assert!(!g.remove_edge("a", "zz"));
        assert!(!g.remove_edge("zz", "a"));
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.outgoing("zz").len(), 0);
        assert_eq!(g.incoming("zz").len(), 0);
        assert!(!g.has_edge("zz", "a"));
    }

    /// Invariant: a self-loop appears in both lists of its vertex and is
    /// removed from both.
    #[test]
    fn self_loop_is_symmetric() {
        let mut g: DiGraph<&str> = DiGraph::new();
        assert!(g.add_edge("a", "a"));
        assert_eq!(g.outgoing("a").collect::<Vec<_>>(), [&"a"]);
        assert_eq!(g.incoming("a").collect::<Vec<_>>(), [&"a"]);
        assert!(g.remove_edge("a", "a"));
        assert_eq!(g.out_degree("a"), 0);
        assert_eq!(g.in_degree("a"), 0);
    }

    /// Invariant: handles from another graph are rejected, not misapplied.
    #[test]
    fn foreign_handles_are_rejected() {
        let mut g: DiGraph<&str> = DiGraph::new();
        let mut other: DiGraph<&str> = DiGraph::new();
        let a = g.add_vertex("a");
        other.add_vertex("x");
        other.add_vertex("y");
        let foreign = other.add_vertex("z");
        assert!(!g.add_edge_ids(a, foreign));
        assert!(!g.add_edge_ids(foreign, a));
        assert!(!g.remove_edge_ids(foreign, a));
        assert_eq!(g.outgoing_of(foreign).len(), 0);
        assert_eq!(g.edge_count(), 0);
    }

    /// Invariant: a foreign handle is rejected even when its slot exists in
    /// this graph.
    #[test]
    fn foreign_handles_with_live_slots_are_rejected() {
        let mut g: DiGraph<&str> = DiGraph::new();
        let mut other: DiGraph<&str> = DiGraph::new();
        let (a, b) = (g.add_vertex("a"), g.add_vertex("b"));
        let (x, y) = (other.add_vertex("x"), other.add_vertex("y"));

        assert!(!g.add_edge_ids(x, y));
        assert!(!g.has_edge("a", "b"));
        assert_eq!(g.edge_count(), 0);
        assert_eq!(x.vertex(&g), None);
        assert_eq!(g.vertex(y), None);

        assert!(g.add_edge_ids(a, b));
        assert!(!g.has_edge_ids(x, y));
        assert!(!g.remove_edge_ids(x, y));
        assert!(g.has_edge("a", "b"));
        assert_eq!(g.outgoing_of(x).len(), 0);
        assert_eq!(g.incoming_of(y).len(), 0);
        assert_eq!(x.vertex(&other), Some(&"x"));

        // Handles reported by the graph stay usable in it.
        let from: Vec<_> = g.incoming_of(b).ids().collect();
        assert_eq!(from, [a]);
        assert!(g.vertex_ids().all(|id| g.vertex(id).is_some()));
    }

    /// Invariant: neighbour handles resolve to the same vertices.
    #[test]
    fn neighbour_ids_resolve() {
        let mut g: DiGraph<&str> = DiGraph::new();
        g.add_edge("a", "b");
        g.add_edge("c", "b");
        let b = g.find("b").unwrap();
        let from: Vec<_> = g
            .incoming_of(b)
            .ids()
            .map(|id| *id.vertex(&g).unwrap())
            .collect();
        assert_eq!(from, ["a", "c"]);
    }

    #[test]
    fn debug_renders_adjacency() {
        let mut g: DiGraph<&str> = DiGraph::new();
        g.add_edge("a", "b");
        assert_eq!(format!("{:?}", g), r#"{"a": ["b"], "b": []}"#);
    }

    /// Invariant: lookups resolve by equality under full hash collisions.
    #[test]
    fn collision_handling_with_const_hasher() {
        #[derive(Clone, Default)]
        struct ConstBuildHasher;
        struct ConstHasher;
        impl BuildHasher for ConstBuildHasher {
            type Hasher = ConstHasher;
            fn build_hasher(&self) -> Self::Hasher {
                ConstHasher
            }
        }
        impl Hasher for ConstHasher {
            fn write(&mut self, _bytes: &[u8]) {}
            fn finish(&self) -> u64 {
                0
            }
        }

        let mut g: DiGraph<String, ConstBuildHasher> = DiGraph::with_hasher(ConstBuildHasher);
        g.add_edge("a".to_string(), "b".to_string());
        g.add_edge("b".to_string(), "c".to_string());
        assert_eq!(g.vertex_count(), 3);
        assert_ne!(g.find("a"), g.find("b"));
        assert_eq!(names(g.outgoing("b")), ["c"]);
        assert_eq!(names(g.incoming("b")), ["a"]);
    }

    /// Invariant (debug-only): re-entering the graph from a vertex's `Eq`
    /// during a probe panics.
    #[cfg(debug_assertions)]
    #[test]
    fn reentrancy_panics_from_eq_during_find() {
        #[derive(Clone, Default)]
        struct ConstBuildHasher;
        struct ConstHasher;
        impl BuildHasher for ConstBuildHasher {
            type Hasher = ConstHasher;
            fn build_hasher(&self) -> Self::Hasher {
                ConstHasher
            }
        }
        impl Hasher for ConstHasher {
            fn write(&mut self, _bytes: &[u8]) {}
            fn finish(&self) -> u64 {
                0
            }
        }

        struct ReentryVertex {
            id: &'static str,
            graph: *const DiGraph<ReentryVertex, ConstBuildHasher>,
            trigger: bool,
        }
        impl PartialEq for ReentryVertex {
            fn eq(&self, other: &Self) -> bool {
                if self.id == other.id {
                    return true;
                }
                if other.trigger {
                    unsafe {
                        let g = &*other.graph;
                        let _ = g.contains_vertex(self.id);
                    }
                }
                false
            }
        }
        impl Eq for ReentryVertex {}
        impl Hash for ReentryVertex {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.id.hash(state);
            }
        }
        impl Borrow<str> for ReentryVertex {
            fn borrow(&self) -> &str {
                self.id
            }
        }

        let mut g: DiGraph<ReentryVertex, ConstBuildHasher> =
            DiGraph::with_hasher(ConstBuildHasher);
        let stored = ReentryVertex {
            id: "a",
            graph: &g as *const _,
            trigger: false,
        };
        g.add_vertex(stored);

        let query = ReentryVertex {
            id: "b",
            graph: &g as *const _,
            trigger: true,
        };
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = g.find(&query);
        }));
        assert!(res.is_err(), "expected reentrancy to panic in debug builds");
    }
}
