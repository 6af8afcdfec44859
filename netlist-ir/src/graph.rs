//! A generic directed graph with stable node/edge identity.
//!
//! Grounded on `calyx_opt::analysis::GraphAnalysis` (which wraps a plain
//! `petgraph::graph::DiGraph<RRC<ir::Port>, ()>`) and on the original's
//! hand-rolled `DirectedGraph<NodeType, EdgeType>` (`DirectedGraph.hpp`),
//! whose `shared_ptr`-edge / `vector<unique_ptr<Node>>` ownership model the
//! Design Notes ask us to re-architect as "arena + integer indices; no
//! cycles in ownership." `StableDiGraph` is used rather than a plain
//! `DiGraph` so node/edge indices already handed out to the builder and DFA
//! never dangle across a `remove_node`/`remove_edge`.

use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use netlist_utils::{Error, Result};

/// Identity of a node: stable across insertion/removal of other nodes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(petgraph::graph::NodeIndex);

/// Identity of an edge: stable across insertion/removal of other edges.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct EdgeId(petgraph::graph::EdgeIndex);

/// A directed multigraph-free graph over arbitrary node and edge payloads.
///
/// Node and edge equality is identity equality by construction: `NodeId`
/// and `EdgeId` are newtypes over the arena index, never derived from the
/// payload.
pub struct Graph<N, E> {
    inner: StableDiGraph<N, E>,
}

impl<N, E> Default for Graph<N, E> {
    fn default() -> Self {
        Graph {
            inner: StableDiGraph::new(),
        }
    }
}

impl<N, E> Graph<N, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, payload: N) -> NodeId {
        NodeId(self.inner.add_node(payload))
    }

    pub fn node(&self, id: NodeId) -> &N {
        &self.inner[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut N {
        &mut self.inner[id.0]
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.inner.contains_node(id.0)
    }

    /// Add an edge `src -> dst`. If an edge between these two endpoints
    /// already exists, its id is returned unchanged and `payload` is
    /// dropped; this is the idempotent "never duplicates" contract in
    /// spec §4.1.
    pub fn add_edge(&mut self, src: NodeId, dst: NodeId, payload: E) -> EdgeId {
        if let Some(existing) = self.inner.find_edge(src.0, dst.0) {
            return EdgeId(existing);
        }
        EdgeId(self.inner.add_edge(src.0, dst.0, payload))
    }

    pub fn edge(&self, id: EdgeId) -> &E {
        &self.inner[id.0]
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> &mut E {
        &mut self.inner[id.0]
    }

    pub fn edge_endpoints(&self, id: EdgeId) -> Option<(NodeId, NodeId)> {
        self.inner
            .edge_endpoints(id.0)
            .map(|(a, b)| (NodeId(a), NodeId(b)))
    }

    /// Remove `n` and every edge incident on it.
    pub fn remove_node(&mut self, n: NodeId) -> Result<N> {
        self.inner
            .remove_node(n.0)
            .ok_or_else(|| Error::not_found("node"))
    }

    /// Remove the unique edge `a -> b`, or report its absence.
    pub fn remove_edge(&mut self, a: NodeId, b: NodeId) -> Result<E> {
        let edge = self
            .inner
            .find_edge(a.0, b.0)
            .ok_or_else(|| Error::not_found("edge"))?;
        Ok(self.inner.remove_edge(edge).expect("edge index just found"))
    }

    pub fn in_degree(&self, n: NodeId) -> usize {
        self.inner.edges_directed(n.0, Direction::Incoming).count()
    }

    pub fn out_degree(&self, n: NodeId) -> usize {
        self.inner.edges_directed(n.0, Direction::Outgoing).count()
    }

    pub fn iter_out_edges(&self, n: NodeId) -> impl Iterator<Item = (EdgeId, NodeId, &E)> {
        self.inner
            .edges_directed(n.0, Direction::Outgoing)
            .map(|e| (EdgeId(e.id()), NodeId(e.target()), e.weight()))
    }

    pub fn iter_in_edges(&self, n: NodeId) -> impl Iterator<Item = (EdgeId, NodeId, &E)> {
        self.inner
            .edges_directed(n.0, Direction::Incoming)
            .map(|e| (EdgeId(e.id()), NodeId(e.source()), e.weight()))
    }

    pub fn iter_nodes(&self) -> impl Iterator<Item = (NodeId, &N)> {
        self.inner.node_indices().map(|i| (NodeId(i), &self.inner[i]))
    }

    pub fn iter_edges(&self) -> impl Iterator<Item = (EdgeId, NodeId, NodeId, &E)> {
        self.inner
            .edge_references()
            .map(|e| (EdgeId(e.id()), NodeId(e.source()), NodeId(e.target()), e.weight()))
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    pub fn is_cyclic(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.inner)
    }

    /// True if there is a path from `from` to `to` (inclusive of `from ==
    /// to` only when a cycle actually routes back through it).
    pub fn has_path(&self, from: NodeId, to: NodeId) -> bool {
        petgraph::algo::has_path_connecting(&self.inner, from.0, to.0, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_edge_is_idempotent() {
        let mut g: Graph<&str, ()> = Graph::new();
        let a = g.add_node("a");
        let b = g.add_node("b");
        let e1 = g.add_edge(a, b, ());
        let e2 = g.add_edge(a, b, ());
        assert_eq!(e1, e2);
        assert_eq!(g.out_degree(a), 1);
        assert_eq!(g.in_degree(b), 1);
    }

    #[test]
    fn adjacency_is_symmetric() {
        let mut g: Graph<&str, ()> = Graph::new();
        let a = g.add_node("a");
        let b = g.add_node("b");
        g.add_edge(a, b, ());
        let out: Vec<_> = g.iter_out_edges(a).map(|(_, n, _)| n).collect();
        let inn: Vec<_> = g.iter_in_edges(b).map(|(_, n, _)| n).collect();
        assert_eq!(out, vec![b]);
        assert_eq!(inn, vec![a]);
    }

    #[test]
    fn remove_node_drops_incident_edges() {
        let mut g: Graph<&str, ()> = Graph::new();
        let a = g.add_node("a");
        let b = g.add_node("b");
        g.add_edge(a, b, ());
        g.remove_node(b).unwrap();
        assert_eq!(g.out_degree(a), 0);
    }

    #[test]
    fn remove_edge_reports_absence() {
        let mut g: Graph<&str, ()> = Graph::new();
        let a = g.add_node("a");
        let b = g.add_node("b");
        assert!(g.remove_edge(a, b).is_err());
    }

    #[test]
    fn ids_remain_stable_across_unrelated_removal() {
        let mut g: Graph<&str, ()> = Graph::new();
        let a = g.add_node("a");
        let b = g.add_node("b");
        let c = g.add_node("c");
        g.add_edge(a, c, ());
        g.remove_node(b).unwrap();
        assert!(g.contains_node(a));
        assert!(g.contains_node(c));
        assert_eq!(g.iter_out_edges(a).next().map(|(_, n, _)| n), Some(c));
    }
}
