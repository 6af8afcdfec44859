//! The netlist intermediate representation: a generic arena graph, the
//! typed netlist node/edge shapes built on top of it, the driver tracker,
//! and the external AST surface the rest of the workspace consumes.
//!
//! Layered the way `calyx_ir` separates its generic `Context`/component
//! arena from `calyx_opt`'s analyses: this crate owns representation only,
//! no traversal policy (that is `netlist-analysis`'s job).

pub mod bitrange;
pub mod driver_store;
pub mod graph;
pub mod interval;
pub mod netlist_graph;
pub mod surface;
pub mod tracker;

pub use bitrange::BitRange;
pub use driver_store::{DriverStore, Handle};
pub use graph::{EdgeId, Graph, NodeId};
pub use interval::IntervalMap;
pub use netlist_graph::{
    AssignmentNode, CaseNode, ConditionalNode, NetlistEdge, NetlistGraph, NetlistNode, PortNode,
    StateNode, VariableNode,
};
pub use surface::{
    symbol_key, AnalysisManager, ContinuousAssign, Direction, DriverKind, EdgeKind, EvalContext,
    Expr, ExternalDriver, GenerateBlock, Instance, InterfaceVariable, LspBounds, Member,
    PortConnection, PortDecl, ProceduralBlock, ProceduralBlockKind, Scope, Stmt, TimingControl,
    ValueSymbol,
};
pub use tracker::{DriverList, DriverRecord, DriverTracker};
