//! Traversal policy over `netlist-ir`'s representation: the longest static
//! prefix extractor, the per-region data-flow analysis, the module-level
//! builder, and the AST walker that drives them. Mirrors `calyx_opt`'s
//! split from `calyx_ir`: representation lives one crate down, analysis
//! passes live here.

pub mod builder;
pub mod config;
pub mod dfa;
pub mod lsp;
pub mod walker;

#[cfg(test)]
mod testutil;

pub use builder::{MergeEdgeKind, NetlistBuilder};
pub use config::Config;
pub use dfa::{AnalysisState, DataFlowAnalysis, PendingNonBlocking, PendingRvalue};
pub use lsp::visit_lsps;
pub use walker::{determine_edge_kind, NetlistVisitor};
