//! The typed netlist graph (spec §3 / §4.8's component 5): a tagged-variant
//! node type with an out-of-line payload per variant, directly realizing
//! the Design Notes' re-architecture of the original's `NodeKind` enum +
//! single-inheritance class hierarchy + `as<T>()` downcast helper
//! (`NetlistNode.hpp`). Downcasts become exhaustive `match`es; node
//! identity is the arena id (`NodeId`), never structural equality, matching
//! "node equality remains identity equality by id."
//!
//! The variant shapes mirror `calyx_ir::Control`'s `Seq`/`Par`/`If`/... one
//! payload struct per tag.

use std::collections::HashMap;

use crate::bitrange::BitRange;
use crate::graph::{EdgeId, Graph, NodeId};
use crate::surface::{Direction, Expr, ValueSymbol};

#[derive(Debug)]
pub struct PortNode<'ast> {
    pub symbol: &'ast dyn ValueSymbol,
    pub direction: Direction,
    pub range: BitRange,
}

#[derive(Debug)]
pub struct VariableNode<'ast> {
    pub symbol: &'ast dyn ValueSymbol,
    pub range: BitRange,
}

#[derive(Debug)]
pub struct AssignmentNode<'ast> {
    pub lhs: &'ast Expr<'ast>,
    pub rhs: &'ast Expr<'ast>,
    pub blocking: bool,
}

#[derive(Debug)]
pub struct ConditionalNode<'ast> {
    pub guard: &'ast Expr<'ast>,
}

#[derive(Debug)]
pub struct CaseNode<'ast> {
    pub selector: &'ast Expr<'ast>,
}

#[derive(Debug)]
pub struct StateNode<'ast> {
    pub symbol: &'ast dyn ValueSymbol,
    pub range: BitRange,
}

/// A graph node variant (spec §3's "Graph node variants").
#[derive(Debug)]
pub enum NetlistNode<'ast> {
    Port(PortNode<'ast>),
    Variable(VariableNode<'ast>),
    Assignment(AssignmentNode<'ast>),
    Conditional(ConditionalNode<'ast>),
    Case(CaseNode<'ast>),
    /// A control-flow join where mutually-exclusive branches produced
    /// distinct drivers of the same range. Carries no payload of its own.
    Merge,
    State(StateNode<'ast>),
}

impl<'ast> NetlistNode<'ast> {
    pub fn kind_name(&self) -> &'static str {
        match self {
            NetlistNode::Port(_) => "Port",
            NetlistNode::Variable(_) => "Variable",
            NetlistNode::Assignment(_) => "Assignment",
            NetlistNode::Conditional(_) => "Conditional",
            NetlistNode::Case(_) => "Case",
            NetlistNode::Merge => "Merge",
            NetlistNode::State(_) => "State",
        }
    }

    pub fn as_port(&self) -> Option<&PortNode<'ast>> {
        match self {
            NetlistNode::Port(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_state(&self) -> Option<&StateNode<'ast>> {
        match self {
            NetlistNode::State(s) => Some(s),
            _ => None,
        }
    }
}

/// `(source-node -> target-node)` plus an optional `(symbol, bit-range)`
/// label and a `disabled` flag consumers use to prune traversal (spec §3).
#[derive(Clone, Debug)]
pub struct NetlistEdge<'ast> {
    pub label: Option<(&'ast dyn ValueSymbol, BitRange)>,
    pub disabled: bool,
}

impl<'ast> NetlistEdge<'ast> {
    fn plain() -> Self {
        NetlistEdge {
            label: None,
            disabled: false,
        }
    }

    fn labeled(symbol: &'ast dyn ValueSymbol, range: BitRange) -> Self {
        NetlistEdge {
            label: Some((symbol, range)),
            disabled: false,
        }
    }
}

pub struct NetlistGraph<'ast> {
    graph: Graph<NetlistNode<'ast>, NetlistEdge<'ast>>,
    by_name: HashMap<String, NodeId>,
}

impl<'ast> Default for NetlistGraph<'ast> {
    fn default() -> Self {
        NetlistGraph {
            graph: Graph::new(),
            by_name: HashMap::new(),
        }
    }
}

impl<'ast> NetlistGraph<'ast> {
    pub fn new() -> Self {
        Self::default()
    }

    fn register_name(&mut self, symbol: &'ast dyn ValueSymbol, id: NodeId) {
        self.by_name
            .entry(symbol.hierarchical_path().to_string())
            .or_insert(id);
    }

    pub fn create_port(
        &mut self,
        symbol: &'ast dyn ValueSymbol,
        direction: Direction,
        range: BitRange,
    ) -> NodeId {
        let id = self.graph.add_node(NetlistNode::Port(PortNode {
            symbol,
            direction,
            range,
        }));
        self.register_name(symbol, id);
        id
    }

    pub fn create_variable(&mut self, symbol: &'ast dyn ValueSymbol, range: BitRange) -> NodeId {
        let id = self
            .graph
            .add_node(NetlistNode::Variable(VariableNode { symbol, range }));
        self.register_name(symbol, id);
        id
    }

    pub fn create_assignment(
        &mut self,
        lhs: &'ast Expr<'ast>,
        rhs: &'ast Expr<'ast>,
        blocking: bool,
    ) -> NodeId {
        self.graph.add_node(NetlistNode::Assignment(AssignmentNode {
            lhs,
            rhs,
            blocking,
        }))
    }

    pub fn create_conditional(&mut self, guard: &'ast Expr<'ast>) -> NodeId {
        self.graph
            .add_node(NetlistNode::Conditional(ConditionalNode { guard }))
    }

    pub fn create_case(&mut self, selector: &'ast Expr<'ast>) -> NodeId {
        self.graph.add_node(NetlistNode::Case(CaseNode { selector }))
    }

    pub fn create_merge(&mut self) -> NodeId {
        self.graph.add_node(NetlistNode::Merge)
    }

    pub fn create_state(&mut self, symbol: &'ast dyn ValueSymbol, range: BitRange) -> NodeId {
        self.graph
            .add_node(NetlistNode::State(StateNode { symbol, range }))
    }

    pub fn node(&self, id: NodeId) -> &NetlistNode<'ast> {
        self.graph.node(id)
    }

    fn edge_between(&self, src: NodeId, dst: NodeId) -> Option<EdgeId> {
        self.graph.iter_out_edges(src).find(|(_, n, _)| *n == dst).map(|(e, _, _)| e)
    }

    /// A plain, unlabeled dependency edge.
    pub fn add_dependency(&mut self, src: NodeId, dst: NodeId) -> EdgeId {
        self.graph.add_edge(src, dst, NetlistEdge::plain())
    }

    /// An edge labeled with the symbol/range it carries. If an edge between
    /// these endpoints already exists (e.g. a prior unlabeled
    /// `add_dependency`), its label is filled in if absent rather than
    /// creating a second edge — spec §3 forbids multi-edges between the
    /// same endpoints even when their labels would differ.
    pub fn add_labeled_edge(
        &mut self,
        src: NodeId,
        dst: NodeId,
        symbol: &'ast dyn ValueSymbol,
        range: BitRange,
    ) -> EdgeId {
        if let Some(id) = self.edge_between(src, dst) {
            let edge = self.graph.edge_mut(id);
            if edge.label.is_none() {
                edge.label = Some((symbol, range));
            }
            id
        } else {
            self.graph.add_edge(src, dst, NetlistEdge::labeled(symbol, range))
        }
    }

    pub fn lookup(&self, hierarchical_name: &str) -> Option<NodeId> {
        self.by_name.get(hierarchical_name).copied()
    }

    pub fn iter_nodes(&self) -> impl Iterator<Item = (NodeId, &NetlistNode<'ast>)> {
        self.graph.iter_nodes()
    }

    pub fn iter_edges(&self) -> impl Iterator<Item = (EdgeId, NodeId, NodeId, &NetlistEdge<'ast>)> {
        self.graph.iter_edges()
    }

    pub fn iter_out_edges(&self, n: NodeId) -> impl Iterator<Item = (EdgeId, NodeId, &NetlistEdge<'ast>)> {
        self.graph.iter_out_edges(n)
    }

    pub fn iter_in_edges(&self, n: NodeId) -> impl Iterator<Item = (EdgeId, NodeId, &NetlistEdge<'ast>)> {
        self.graph.iter_in_edges(n)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn has_path(&self, from: NodeId, to: NodeId) -> bool {
        self.graph.has_path(from, to)
    }

    pub fn is_cyclic(&self) -> bool {
        self.graph.is_cyclic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::ExternalDriver;

    #[derive(Debug)]
    struct Sym {
        path: &'static str,
        width: u32,
    }
    impl ValueSymbol for Sym {
        fn bit_width(&self) -> u32 {
            self.width
        }
        fn hierarchical_path(&self) -> &str {
            self.path
        }
    }
    fn _unused(_: ExternalDriver) {}

    #[test]
    fn lookup_resolves_created_port() {
        let a = Sym { path: "top.a", width: 1 };
        let mut g: NetlistGraph = NetlistGraph::new();
        let id = g.create_port(&a, Direction::In, BitRange::new(0, 0));
        assert_eq!(g.lookup("top.a"), Some(id));
        assert_eq!(g.lookup("top.b"), None);
    }

    #[test]
    fn labeled_edge_fills_in_plain_edge() {
        let a = Sym { path: "top.a", width: 1 };
        let mut g: NetlistGraph = NetlistGraph::new();
        let p = g.create_port(&a, Direction::In, BitRange::new(0, 0));
        let asn = g.create_assignment(
            &Expr::NamedValue { symbol: &a },
            &Expr::NamedValue { symbol: &a },
            true,
        );
        let e1 = g.add_dependency(p, asn);
        let e2 = g.add_labeled_edge(p, asn, &a, BitRange::new(0, 0));
        assert_eq!(e1, e2);
        assert!(g.iter_out_edges(p).next().unwrap().2.label.is_some());
    }
}
