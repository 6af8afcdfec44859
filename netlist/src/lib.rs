//! Netlist dataflow graph construction from an elaborated HDL AST.
//!
//! This crate is a thin facade over the workspace's representation and
//! analysis crates, the way `calyx_ir`/`calyx_opt` are consumed together
//! by downstream passes without each caller depending on both directly:
//!
//! - [`netlist_utils`] — shared id/error plumbing.
//! - [`netlist_ir`] — the arena graph, the typed netlist node/edge shapes,
//!   the driver tracker, and the external AST surface a host implements.
//! - [`netlist_analysis`] — the longest-static-prefix extractor, the
//!   per-region data-flow analysis, the module-level builder, and the AST
//!   walker that drives them.
//!
//! A host elaborator implements [`netlist_ir::surface`]'s traits against
//! its own AST, then drives [`netlist_analysis::walker::NetlistVisitor`]
//! over its module hierarchy to obtain a finished [`netlist_ir::NetlistGraph`].

pub use netlist_analysis as analysis;
pub use netlist_ir as ir;
pub use netlist_utils as utils;

pub use netlist_ir::{
    BitRange, DriverList, DriverRecord, DriverStore, DriverTracker, EdgeId, Graph, Handle,
    NetlistEdge, NetlistGraph, NetlistNode, NodeId,
};
pub use netlist_analysis::{
    determine_edge_kind, visit_lsps, AnalysisState, Config, DataFlowAnalysis, MergeEdgeKind,
    NetlistBuilder, NetlistVisitor,
};
