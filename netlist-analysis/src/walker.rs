//! The AST walker (spec §4.8): drives the builder and the per-region DFA
//! over a flattened `Scope` tree, mirroring `NetlistVisitor`'s
//! `ast::ASTVisitor` dispatch (`NetlistVisitor.cpp`/`.hpp`) member-kind by
//! member-kind. Where the original relies on `slang`'s visitor machinery to
//! reach every symbol kind in a compilation, this walker recurses
//! explicitly over `Scope::members` in declaration order, matching spec
//! §5's "graph's node-creation order is the AST traversal order."

use netlist_ir::{
    symbol_key, AnalysisManager, BitRange, Direction, DriverKind, EdgeKind, EvalContext,
    GenerateBlock, Instance, LspBounds, Member, ProceduralBlock, ProceduralBlockKind, Scope, Stmt,
    TimingControl, ValueSymbol,
};

use crate::builder::{MergeEdgeKind, NetlistBuilder};
use crate::config::Config;
use crate::dfa::DataFlowAnalysis;
use crate::lsp::visit_lsps;

/// Direct translation of `NetlistVisitor::determineEdgeKind` (spec §4.8):
/// only `always`/`always_ff` blocks can be clocked. A single-signal event
/// control takes that signal's edge; a multi-signal event list is clocked
/// only if every listed signal carries an explicit edge, matching the
/// original's documented limitation that a mixed edge-ful/edge-less event
/// list risks misclassifying a genuinely combinational-loop-prone block as
/// clocked (`NetlistVisitor.cpp`'s own comment on this point, carried
/// forward rather than resolved here).
pub fn determine_edge_kind(block: &ProceduralBlock) -> EdgeKind {
    if !matches!(
        block.kind,
        ProceduralBlockKind::Always | ProceduralBlockKind::AlwaysFf
    ) {
        return EdgeKind::None;
    }
    match &block.timing {
        Some(TimingControl::SignalEvent(edge)) => *edge,
        Some(TimingControl::EventList(events)) => {
            let mut result = EdgeKind::None;
            for edge in events {
                result = *edge;
                if result == EdgeKind::None {
                    break;
                }
            }
            result
        }
        None => EdgeKind::None,
    }
}

/// A sequential block whose sole statement is a concurrent assertion
/// carries no driver information and is ignored outright (spec §4.8).
fn sole_body_is_concurrent_assertion(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::ConcurrentAssertion => true,
        Stmt::Block { statements } if statements.len() == 1 => {
            matches!(statements[0], Stmt::ConcurrentAssertion)
        }
        _ => false,
    }
}

/// Drives the builder over one elaborated hierarchy, holding the host
/// collaborators the DFA and LSP extractor need (spec §6): an
/// `EvalContext`, an `LspBounds` query and an `AnalysisManager` for
/// externally-known drivers. Mirrors `NetlistVisitor`'s constructor
/// parameters (`compilation`, `analysisManager`, `builder`) one-for-one,
/// minus `compilation` itself, which this crate has no use for beyond the
/// original's diagnostic-location formatting (out of scope here).
pub struct NetlistVisitor<'a, 'ast> {
    builder: &'a mut NetlistBuilder<'ast>,
    ctx: &'a dyn EvalContext,
    bounds: &'a dyn LspBounds<'ast>,
    analysis: &'a dyn AnalysisManager<'ast>,
    config: Config,
}

impl<'a, 'ast> NetlistVisitor<'a, 'ast> {
    pub fn new(
        builder: &'a mut NetlistBuilder<'ast>,
        ctx: &'a dyn EvalContext,
        bounds: &'a dyn LspBounds<'ast>,
        analysis: &'a dyn AnalysisManager<'ast>,
        config: Config,
    ) -> Self {
        builder.set_config(config);
        NetlistVisitor {
            builder,
            ctx,
            bounds,
            analysis,
            config,
        }
    }

    /// Walk a top-level scope (a module body) and finalise the builder
    /// once every member has been visited (spec §4.7 "Finalisation
    /// order").
    pub fn run(&mut self, top: &'ast Scope<'ast>) {
        self.walk_scope(top);
        self.builder.finalize();
    }

    fn walk_scope(&mut self, scope: &'ast Scope<'ast>) {
        for member in &scope.members {
            self.visit_member(member);
        }
    }

    fn visit_member(&mut self, member: &'ast Member<'ast>) {
        match member {
            Member::Port(port) => self.handle_port(port),
            Member::InterfaceVariable(var) => self.handle_interface_variable(var),
            Member::ProceduralBlock(block) => self.handle_procedural_block(block),
            Member::ContinuousAssign(assign) => self.handle_continuous_assign(assign),
            Member::Instance(inst) => self.handle_instance(inst),
            Member::GenerateBlock(gen) => self.handle_generate_block(gen),
        }
    }

    /// `handle(PortSymbol)`: one `Port` node per bit range the host reports
    /// as externally driven, installing it as a driver of the internal
    /// value when the port is an input.
    fn handle_port(&mut self, port: &netlist_ir::PortDecl<'ast>) {
        let Some(internal) = port.internal_symbol else {
            return;
        };
        for driver in self.analysis.get_drivers(internal) {
            if !self.config.quiet {
                log::trace!(
                    "port {} driven range [{}:{}]",
                    internal.hierarchical_path(),
                    driver.range.lo,
                    driver.range.hi
                );
            }
            self.builder
                .add_port(port.symbol, internal, port.direction, driver.kind, driver.range);
        }
    }

    /// `handle(VariableSymbol)` restricted to interface-body variables
    /// (spec §4.8's "Variable symbol inside an interface body"): one
    /// `Variable` node per driven range.
    fn handle_interface_variable(&mut self, var: &netlist_ir::InterfaceVariable<'ast>) {
        for driver in self.analysis.get_drivers(var.symbol) {
            self.builder.add_variable(var.symbol, driver.range);
        }
    }

    /// `handle(ProceduralBlockSymbol)`: run the DFA over the block body,
    /// then fold the region into the module-level graph with the block's
    /// derived edge kind.
    fn handle_procedural_block(&mut self, block: &'ast ProceduralBlock<'ast>) {
        if sole_body_is_concurrent_assertion(block.body) {
            return;
        }

        let edge_kind = determine_edge_kind(block);
        let merge_kind = if edge_kind.is_edge() {
            MergeEdgeKind::Clocked
        } else {
            MergeEdgeKind::Combinational
        };

        let mut dfa =
            DataFlowAnalysis::new(self.builder.graph_mut(), self.ctx, self.bounds, self.config);
        dfa.run(block.body);
        let (state, pending) = dfa.finalize();
        self.builder.merge_procedural_drivers(state, pending, merge_kind);
    }

    /// `handle(ContinuousAssignSymbol)`: always combinational, always
    /// effectively a blocking assignment.
    fn handle_continuous_assign(&mut self, assign: &'ast netlist_ir::ContinuousAssign<'ast>) {
        let mut dfa =
            DataFlowAnalysis::new(self.builder.graph_mut(), self.ctx, self.bounds, self.config);
        dfa.run_assignment(assign.lhs, assign.rhs, true);
        let (state, pending) = dfa.finalize();
        self.builder
            .merge_procedural_drivers(state, pending, MergeEdgeKind::Combinational);
    }

    /// `handle(InstanceSymbol)`: recurse into the instance body first (so
    /// its own port nodes exist), then wire each port connection's
    /// expression against those nodes.
    fn handle_instance(&mut self, inst: &'ast Instance<'ast>) {
        if inst.uninstantiated {
            return;
        }

        self.walk_scope(inst.body);

        for conn in &inst.port_connections {
            let Some(expr) = conn.expr else {
                // Empty port hookup (spec §4.8).
                continue;
            };
            let Some(port_node) = self.builder.graph().lookup(conn.port_symbol.hierarchical_path())
            else {
                continue;
            };

            match conn.direction {
                Direction::In => {
                    let mut events = Vec::new();
                    visit_lsps(
                        expr,
                        self.ctx,
                        self.bounds,
                        false,
                        self.config.quiet,
                        &mut |s, l, r, _| {
                            events.push((s, l, r));
                        },
                    );
                    for (symbol, lsp, range) in events {
                        self.builder.add_rvalue(symbol, Some(lsp), range, port_node);
                    }
                }
                Direction::Out | Direction::InOut => {
                    let mut events = Vec::new();
                    visit_lsps(
                        expr,
                        self.ctx,
                        self.bounds,
                        true,
                        self.config.quiet,
                        &mut |s, l, r, _| {
                            events.push((s, l, r));
                        },
                    );
                    for (symbol, lsp, range) in events {
                        self.builder.merge_driver(symbol, Some(lsp), range, port_node);
                    }
                    if conn.direction == Direction::InOut {
                        let mut rvalue_events = Vec::new();
                        visit_lsps(
                            expr,
                            self.ctx,
                            self.bounds,
                            false,
                            self.config.quiet,
                            &mut |s, l, r, _| {
                                rvalue_events.push((s, l, r));
                            },
                        );
                        for (symbol, lsp, range) in rvalue_events {
                            self.builder.add_rvalue(symbol, Some(lsp), range, port_node);
                        }
                    }
                }
            }
        }
    }

    /// `handle(GenerateBlockSymbol)`: recurse only into instantiated
    /// blocks.
    fn handle_generate_block(&mut self, gen: &'ast GenerateBlock<'ast>) {
        if gen.instantiated {
            self.walk_scope(gen.body);
        }
    }
}

/// A stable key for a symbol, re-exported for callers building their own
/// `AnalysisManager` fixtures that need to index by value-symbol identity
/// the same way the builder's `output_hookups` table does.
pub fn port_symbol_key(symbol: &dyn netlist_ir::ValueSymbol) -> usize {
    symbol_key(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{Ctx, FixedBounds, FixtureManager, Sym};
    use netlist_ir::{ContinuousAssign, Direction as Dir, DriverKind, Expr, ExternalDriver, PortDecl};

    #[test]
    fn pass_through_wires_input_port_to_output_port_via_continuous_assign() {
        // module top(input a, output z); assign z = a; endmodule
        let a = Sym("top.a", 1);
        let z = Sym("top.z", 1);
        let manager = FixtureManager::new();
        manager.register("top.a", ExternalDriver { kind: DriverKind::InputPort, range: BitRange::new(0, 0) });
        manager.register("top.z", ExternalDriver { kind: DriverKind::Continuous, range: BitRange::new(0, 0) });

        let port_a = PortDecl {
            symbol: &a,
            direction: Dir::In,
            internal_symbol: Some(&a),
        };
        let port_z = PortDecl {
            symbol: &z,
            direction: Dir::Out,
            internal_symbol: Some(&z),
        };
        let lhs = Expr::NamedValue { symbol: &z };
        let rhs = Expr::NamedValue { symbol: &a };
        let assign = ContinuousAssign { lhs: &lhs, rhs: &rhs };

        let scope = Scope {
            members: vec![
                Member::Port(port_a),
                Member::Port(port_z),
                Member::ContinuousAssign(assign),
            ],
        };

        let mut builder = NetlistBuilder::new();
        let ctx = Ctx;
        let bounds = FixedBounds;
        {
            let mut visitor =
                NetlistVisitor::new(&mut builder, &ctx, &bounds, &manager, Config::default());
            visitor.run(&scope);
        }

        let z_port = builder.graph().lookup("top.z").unwrap();
        let a_port = builder.graph().lookup("top.a").unwrap();
        assert!(builder.graph().has_path(a_port, z_port));
    }

    #[test]
    fn clocked_always_ff_interposes_a_state_node_before_the_output_port() {
        // module top(input clk, input d, output q);
        //   always_ff @(posedge clk) q <= d;
        // endmodule
        let d = Sym("top.d", 1);
        let q = Sym("top.q", 1);
        let manager = FixtureManager::new();
        manager.register("top.d", ExternalDriver { kind: DriverKind::InputPort, range: BitRange::new(0, 0) });
        manager.register("top.q", ExternalDriver { kind: DriverKind::Procedural, range: BitRange::new(0, 0) });

        let port_d = PortDecl {
            symbol: &d,
            direction: Dir::In,
            internal_symbol: Some(&d),
        };
        let port_q = PortDecl {
            symbol: &q,
            direction: Dir::Out,
            internal_symbol: Some(&q),
        };
        let lhs = Expr::NamedValue { symbol: &q };
        let rhs = Expr::NamedValue { symbol: &d };
        let nb_assign = Stmt::Assignment {
            lhs: &lhs,
            rhs: &rhs,
            blocking: false,
        };
        let block = ProceduralBlock {
            kind: ProceduralBlockKind::AlwaysFf,
            timing: Some(TimingControl::SignalEvent(EdgeKind::Pos)),
            body: &nb_assign,
        };

        let scope = Scope {
            members: vec![
                Member::Port(port_d),
                Member::Port(port_q),
                Member::ProceduralBlock(block),
            ],
        };

        let mut builder = NetlistBuilder::new();
        let ctx = Ctx;
        let bounds = FixedBounds;
        {
            let mut visitor =
                NetlistVisitor::new(&mut builder, &ctx, &bounds, &manager, Config::default());
            visitor.run(&scope);
        }

        let q_port = builder.graph().lookup("top.q").unwrap();
        let has_state_predecessor = builder
            .graph()
            .iter_in_edges(q_port)
            .any(|(_, src, _)| matches!(builder.graph().node(src), netlist_ir::NetlistNode::State(_)));
        assert!(has_state_predecessor);
    }
}
