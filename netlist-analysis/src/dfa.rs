//! The per-procedure forward data-flow analysis (spec §4.6): the core
//! transfer rules over structured control flow, with join/meet realized
//! as direct structural recursion rather than a generic fixpoint-solver
//! trait. Grounded on `ProceduralAnalysis.hpp`'s `mergeStates`/
//! `joinState`/`meetState`, whose loop-handling branch the original left
//! as `// TODO: for overlapping intervals...` — spec §4.6 is authoritative
//! for that case, not a port of the stub.

use netlist_ir::{
    BitRange, DriverList, DriverRecord, DriverTracker, EvalContext, Expr, LspBounds, NetlistGraph,
    NodeId, Stmt, ValueSymbol,
};

use crate::config::Config;
use crate::lsp::visit_lsps;

/// A driver-tracker entry awaiting the end of the enclosing region: a
/// non-blocking assignment's lvalue must not be visible to reads inside
/// the same region (spec §4.6 `handle-lvalue`).
pub struct PendingNonBlocking<'ast> {
    pub symbol: &'ast dyn ValueSymbol,
    pub lsp: Option<&'ast Expr<'ast>>,
    pub range: BitRange,
    pub node: NodeId,
}

/// An rvalue reference whose range was not (fully) covered by any driver
/// known at the time it was walked; resolved once module-level drivers
/// exist (spec §4.6 `handle-rvalue`, §4.7 `process-pending-rvalues`).
#[derive(Clone)]
pub struct PendingRvalue<'ast> {
    pub symbol: &'ast dyn ValueSymbol,
    pub lsp: Option<&'ast Expr<'ast>>,
    pub range: BitRange,
    pub node: NodeId,
}

/// The analysis state threaded through one procedural region: the
/// region-local driver map, the most recently materialised operation node,
/// the enclosing branch node (if any), and reachability (spec §4.6).
#[derive(Clone)]
pub struct AnalysisState<'ast> {
    pub tracker: DriverTracker<'ast>,
    pub node: Option<NodeId>,
    pub condition: Option<NodeId>,
    pub reachable: bool,
}

impl<'ast> AnalysisState<'ast> {
    /// The empty, reachable state a region starts in.
    pub fn top() -> Self {
        AnalysisState {
            tracker: DriverTracker::new(),
            node: None,
            condition: None,
            reachable: true,
        }
    }

    /// The empty, unreachable state a statically-dead branch starts in.
    pub fn unreachable() -> Self {
        AnalysisState {
            tracker: DriverTracker::new(),
            node: None,
            condition: None,
            reachable: false,
        }
    }
}

pub struct DataFlowAnalysis<'a, 'ast> {
    graph: &'a mut NetlistGraph<'ast>,
    ctx: &'a dyn EvalContext,
    bounds: &'a dyn LspBounds<'ast>,
    config: Config,
    state: AnalysisState<'ast>,
    pending_non_blocking: Vec<PendingNonBlocking<'ast>>,
    pending_rvalues: Vec<PendingRvalue<'ast>>,
}

impl<'a, 'ast> DataFlowAnalysis<'a, 'ast> {
    pub fn new(
        graph: &'a mut NetlistGraph<'ast>,
        ctx: &'a dyn EvalContext,
        bounds: &'a dyn LspBounds<'ast>,
        config: Config,
    ) -> Self {
        DataFlowAnalysis {
            graph,
            ctx,
            bounds,
            config,
            state: AnalysisState::top(),
            pending_non_blocking: Vec::new(),
            pending_rvalues: Vec::new(),
        }
    }

    /// Run the analysis over a region's body.
    pub fn run(&mut self, body: &'ast Stmt<'ast>) {
        self.visit_stmt(body, false);
    }

    /// Run the analysis over a single continuous assignment, which the host
    /// surface models as a bare `(lhs, rhs)` pair rather than wrapping it in
    /// a `Stmt::Assignment` (spec §4.8, `ContinuousAssignSymbol` handling).
    pub fn run_assignment(&mut self, lhs: &'ast Expr<'ast>, rhs: &'ast Expr<'ast>, blocking: bool) {
        self.visit_assignment(lhs, rhs, blocking, false);
    }

    /// Drain the pending non-blocking queue into the region's final state,
    /// realizing end-of-block non-blocking update semantics, and return
    /// everything the builder needs to merge into the module (spec §4.6
    /// "Finalisation").
    pub fn finalize(mut self) -> (AnalysisState<'ast>, Vec<PendingRvalue<'ast>>) {
        for p in std::mem::take(&mut self.pending_non_blocking) {
            self.state.tracker.add(p.symbol, p.lsp, p.range, p.node);
        }
        (self.state, self.pending_rvalues)
    }

    fn visit_stmt(&mut self, stmt: &'ast Stmt<'ast>, suppress_lvalue: bool) {
        if !self.state.reachable {
            return;
        }
        match stmt {
            Stmt::Assignment { lhs, rhs, blocking } => {
                self.visit_assignment(lhs, rhs, *blocking, suppress_lvalue)
            }
            Stmt::Conditional { arms } => self.visit_conditional(arms),
            Stmt::Case { selector, arms } => self.visit_case(selector, arms),
            Stmt::Force { inner } => self.visit_stmt(inner, true),
            Stmt::Block { statements } => {
                for s in statements {
                    self.visit_stmt(s, suppress_lvalue);
                    if !self.state.reachable {
                        break;
                    }
                }
            }
            Stmt::Loop { body } => self.visit_loop(body, suppress_lvalue),
            Stmt::ConcurrentAssertion => {}
        }
    }

    fn visit_assignment(
        &mut self,
        lhs: &'ast Expr<'ast>,
        rhs: &'ast Expr<'ast>,
        blocking: bool,
        suppress_lvalue: bool,
    ) {
        let node = self.graph.create_assignment(lhs, rhs, blocking);
        if let Some(cond) = self.state.condition {
            self.graph.add_dependency(cond, node);
        }
        self.state.node = Some(node);

        if !suppress_lvalue {
            let mut events = Vec::new();
            visit_lsps(
                lhs,
                self.ctx,
                self.bounds,
                true,
                self.config.quiet,
                &mut |s, l, r, _| {
                    events.push((s, l, r));
                },
            );
            for (symbol, lsp, range) in events {
                self.handle_lvalue(symbol, Some(lsp), range, node, blocking);
            }
        }

        let mut events = Vec::new();
        visit_lsps(
            rhs,
            self.ctx,
            self.bounds,
            false,
            self.config.quiet,
            &mut |s, l, r, _| {
                events.push((s, l, r));
            },
        );
        for (symbol, lsp, range) in events {
            self.handle_rvalue(symbol, Some(lsp), range, node);
        }
    }

    fn handle_lvalue(
        &mut self,
        symbol: &'ast dyn ValueSymbol,
        lsp: Option<&'ast Expr<'ast>>,
        range: BitRange,
        node: NodeId,
        blocking: bool,
    ) {
        if blocking {
            if self.config.trace_drivers {
                log::trace!(
                    "DriverTracker::add {} [{}:{}]",
                    symbol.hierarchical_path(),
                    range.lo,
                    range.hi
                );
            }
            self.state.tracker.add(symbol, lsp, range, node);
        } else {
            self.pending_non_blocking.push(PendingNonBlocking {
                symbol,
                lsp,
                range,
                node,
            });
        }
    }

    fn handle_rvalue(
        &mut self,
        symbol: &'ast dyn ValueSymbol,
        lsp: Option<&'ast Expr<'ast>>,
        range: BitRange,
        node: NodeId,
    ) {
        let mut covered = DriverTracker::new();
        for (e, drivers) in self.state.tracker.intervals(symbol) {
            if let Some(overlap) = e.intersection(&range) {
                for d in &drivers {
                    self.graph.add_labeled_edge(d.node, node, symbol, overlap);
                }
                covered.install(symbol, overlap, drivers.clone());
            }
        }
        for residual in uncovered_fragments(range, &covered, symbol) {
            self.pending_rvalues.push(PendingRvalue {
                symbol,
                lsp,
                range: residual,
                node,
            });
        }
    }

    fn visit_conditional(&mut self, arms: &'ast [(Option<&'ast Expr<'ast>>, &'ast Stmt<'ast>)]) {
        let all_const = arms
            .iter()
            .all(|(g, _)| g.map_or(true, |g| self.bounds.is_constant(g, self.ctx)));

        if all_const {
            for (guard, body) in arms {
                let taken = match guard {
                    None => true,
                    Some(g) => self.bounds.eval_bool(g, self.ctx),
                };
                if taken {
                    self.visit_stmt(body, false);
                    return;
                }
            }
            return;
        }

        let cond_node = self.graph.create_conditional(
            arms[0]
                .0
                .expect("a conditional's first arm carries the if's own guard"),
        );
        if let Some(outer) = self.state.condition {
            self.graph.add_dependency(outer, cond_node);
        }
        let outer_condition = self.state.condition;
        let incoming = self.state.clone();

        let mut merged: Option<AnalysisState<'ast>> = None;
        for (guard, body) in arms {
            let mut branch = incoming.clone();
            branch.condition = Some(cond_node);
            if let Some(g) = guard {
                if self.bounds.is_constant(g, self.ctx) && !self.bounds.eval_bool(g, self.ctx) {
                    branch.reachable = false;
                }
            }
            self.state = branch;
            self.visit_stmt(body, false);
            let result = std::mem::replace(&mut self.state, AnalysisState::unreachable());
            merged = Some(match merged {
                None => result,
                Some(acc) => join(self.graph, acc, result),
            });
        }

        self.state = merged.unwrap_or(incoming);
        self.state.condition = outer_condition;
    }

    fn visit_case(
        &mut self,
        selector: &'ast Expr<'ast>,
        arms: &'ast [(Option<&'ast Expr<'ast>>, &'ast Stmt<'ast>)],
    ) {
        let case_node = self.graph.create_case(selector);
        if let Some(outer) = self.state.condition {
            self.graph.add_dependency(outer, case_node);
        }
        let outer_condition = self.state.condition;
        let incoming = self.state.clone();

        let mut merged: Option<AnalysisState<'ast>> = None;
        for (_, body) in arms {
            let mut branch = incoming.clone();
            branch.condition = Some(case_node);
            self.state = branch;
            self.visit_stmt(body, false);
            let result = std::mem::replace(&mut self.state, AnalysisState::unreachable());
            merged = Some(match merged {
                None => result,
                Some(acc) => join(self.graph, acc, result),
            });
        }

        self.state = merged.unwrap_or(incoming);
        self.state.condition = outer_condition;
    }

    fn visit_loop(&mut self, body: &'ast Stmt<'ast>, suppress_lvalue: bool) {
        loop {
            let before = self.state.clone();
            self.visit_stmt(body, suppress_lvalue);
            let after = std::mem::replace(&mut self.state, AnalysisState::unreachable());
            let next = meet(self.graph, before.clone(), after);
            let stable = symbol_sets_equal(&before.tracker, &next.tracker)
                && before.node == next.node
                && before.reachable == next.reachable;
            self.state = next;
            if stable {
                break;
            }
        }
    }
}

fn symbol_sets_equal<'ast>(a: &DriverTracker<'ast>, b: &DriverTracker<'ast>) -> bool {
    let mut a_syms: Vec<_> = a.iter_symbols().map(netlist_ir::symbol_key).collect();
    let mut b_syms: Vec<_> = b.iter_symbols().map(netlist_ir::symbol_key).collect();
    a_syms.sort_unstable();
    b_syms.sort_unstable();
    if a_syms != b_syms {
        return false;
    }
    a.iter_symbols().all(|s| {
        let ai = a.intervals(s);
        let bi = b.intervals(s);
        ai.len() == bi.len()
            && ai.iter().zip(bi.iter()).all(|((ra, da), (rb, db))| {
                ra == rb && node_set(da) == node_set(db)
            })
    })
}

fn node_set(list: &DriverList<'_>) -> Vec<NodeId> {
    let mut v: Vec<_> = list.iter().map(|d| d.node).collect();
    v.sort_unstable();
    v
}

/// The sub-ranges of `range` not covered by any interval of `symbol`
/// already installed in `covered`.
fn uncovered_fragments<'ast>(
    range: BitRange,
    covered: &DriverTracker<'ast>,
    symbol: &'ast dyn ValueSymbol,
) -> Vec<BitRange> {
    let mut intervals = covered.intervals(symbol);
    intervals.sort_by_key(|(r, _)| r.lo);
    let mut cursor = range.lo;
    let mut out = Vec::new();
    for (r, _) in intervals {
        if r.hi < cursor {
            continue;
        }
        if r.lo > range.hi {
            break;
        }
        if r.lo > cursor {
            out.push(BitRange::new(cursor, r.lo - 1));
        }
        cursor = r.hi + 1;
        if cursor > range.hi {
            break;
        }
    }
    if cursor <= range.hi {
        out.push(BitRange::new(cursor, range.hi));
    }
    out
}

/// Join two mutually-exclusive branch states at their confluence point
/// (spec §4.6 "join"): unreachable sides are adopted verbatim; where both
/// sides are reachable, driver maps are unioned, materialising a `Merge`
/// node wherever the two sides drove the same range with different nodes.
fn join<'ast>(
    graph: &mut NetlistGraph<'ast>,
    a: AnalysisState<'ast>,
    b: AnalysisState<'ast>,
) -> AnalysisState<'ast> {
    combine(graph, a, b)
}

/// Sequential composition of two states (spec §4.6 "meet"): identical
/// shape to `join` except conceptually applied to a "before" and "after"
/// pair of the same control path rather than two mutually exclusive arms.
fn meet<'ast>(
    graph: &mut NetlistGraph<'ast>,
    a: AnalysisState<'ast>,
    b: AnalysisState<'ast>,
) -> AnalysisState<'ast> {
    combine(graph, a, b)
}

fn combine<'ast>(
    graph: &mut NetlistGraph<'ast>,
    a: AnalysisState<'ast>,
    b: AnalysisState<'ast>,
) -> AnalysisState<'ast> {
    if !a.reachable && !b.reachable {
        return AnalysisState::unreachable();
    }
    if !a.reachable {
        return b;
    }
    if !b.reachable {
        return a;
    }

    let mut tracker = DriverTracker::new();
    let mut symbols: Vec<&'ast dyn ValueSymbol> = a.tracker.iter_symbols().collect();
    for s in b.tracker.iter_symbols() {
        if !symbols.iter().any(|t| netlist_ir::symbol_key(*t) == netlist_ir::symbol_key(s)) {
            symbols.push(s);
        }
    }

    for symbol in symbols {
        overlay_symbol(graph, &mut tracker, symbol, &a.tracker, &b.tracker);
    }

    let node = combine_node_ptr(graph, a.node, b.node);

    AnalysisState {
        tracker,
        node,
        condition: a.condition,
        reachable: true,
    }
}

fn combine_node_ptr<'ast>(
    graph: &mut NetlistGraph<'ast>,
    a: Option<NodeId>,
    b: Option<NodeId>,
) -> Option<NodeId> {
    match (a, b) {
        (None, x) | (x, None) => x,
        (Some(x), Some(y)) if x == y => Some(x),
        (Some(x), Some(y)) => {
            let m = graph.create_merge();
            graph.add_dependency(x, m);
            graph.add_dependency(y, m);
            Some(m)
        }
    }
}

fn overlay_symbol<'ast>(
    graph: &mut NetlistGraph<'ast>,
    out: &mut DriverTracker<'ast>,
    symbol: &'ast dyn ValueSymbol,
    a: &DriverTracker<'ast>,
    b: &DriverTracker<'ast>,
) {
    let a_intervals = a.intervals(symbol);
    let b_intervals = b.intervals(symbol);

    let mut boundaries: Vec<u32> = Vec::new();
    for (r, _) in a_intervals.iter().chain(b_intervals.iter()) {
        boundaries.push(r.lo);
        boundaries.push(r.hi + 1);
    }
    boundaries.sort_unstable();
    boundaries.dedup();

    for w in boundaries.windows(2) {
        let (lo, hi) = (w[0], w[1] - 1);
        if lo > hi {
            continue;
        }
        let sub = BitRange::new(lo, hi);
        let from_a = a_intervals.iter().find(|(r, _)| r.contains(&sub)).map(|(_, d)| d);
        let from_b = b_intervals.iter().find(|(r, _)| r.contains(&sub)).map(|(_, d)| d);

        match (from_a, from_b) {
            (Some(da), None) => out.install(symbol, sub, da.clone()),
            (None, Some(db)) => out.install(symbol, sub, db.clone()),
            (Some(da), Some(db)) => {
                if node_set(da) == node_set(db) {
                    out.install(symbol, sub, da.clone());
                } else {
                    let m = graph.create_merge();
                    let mut seen = Vec::new();
                    for d in da.iter().chain(db.iter()) {
                        if !seen.contains(&d.node) {
                            graph.add_labeled_edge(d.node, m, symbol, sub);
                            seen.push(d.node);
                        }
                    }
                    let mut drivers: DriverList<'ast> = DriverList::new();
                    drivers.push(DriverRecord { node: m, lsp: None });
                    out.install(symbol, sub, drivers);
                }
            }
            (None, None) => {}
        }
    }
}
