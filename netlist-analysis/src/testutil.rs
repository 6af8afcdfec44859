//! `#[cfg(test)]`-only fixture implementations of the `netlist_ir::surface`
//! contract, used to build the literal-input scenario graphs from spec §8
//! (e.g. "Pass-through", "Clocked flop", "Combinational loop"). A real
//! frontend implements these traits against its own AST; this module is
//! the minimal stand-in the original's own unit tests play against
//! `tests/Test.hpp`'s `NetlistTestHelper` fixture.

#![cfg(test)]

use std::cell::RefCell;

use netlist_ir::{
    AnalysisManager, BitRange, EvalContext, Expr, ExternalDriver, LspBounds, ValueSymbol,
};

/// A named, fixed-width value symbol.
#[derive(Debug)]
pub struct Sym(pub &'static str, pub u32);

impl ValueSymbol for Sym {
    fn bit_width(&self) -> u32 {
        self.1
    }
    fn hierarchical_path(&self) -> &str {
        self.0
    }
}

/// An inert evaluation context: the fixtures never need binding state.
pub struct Ctx;
impl EvalContext for Ctx {}

/// An `LspBounds` fixture resolving every LSP to `[0, width-1]` and
/// treating every guard as non-constant — the common case for scenario
/// tests that care about branch/merge structure rather than constant
/// folding.
pub struct FixedBounds;
impl<'ast> LspBounds<'ast> for FixedBounds {
    fn bounds(
        &self,
        _lsp: &Expr<'ast>,
        _ctx: &dyn EvalContext,
        symbol: &dyn ValueSymbol,
    ) -> Option<BitRange> {
        Some(BitRange::new(0, symbol.bit_width() - 1))
    }
    fn is_constant(&self, _expr: &Expr<'ast>, _ctx: &dyn EvalContext) -> bool {
        false
    }
    fn eval_bool(&self, _expr: &Expr<'ast>, _ctx: &dyn EvalContext) -> bool {
        false
    }
}

/// An `AnalysisManager` fixture that returns whatever driver list was
/// registered for a symbol's hierarchical path. Real hosts key by address;
/// this is good enough for the small, hand-built scenario fixtures where
/// paths are unique by construction.
pub struct FixtureManager {
    drivers: RefCell<Vec<(&'static str, ExternalDriver)>>,
}

impl FixtureManager {
    pub fn new() -> Self {
        FixtureManager {
            drivers: RefCell::new(Vec::new()),
        }
    }

    pub fn register(&self, path: &'static str, driver: ExternalDriver) {
        self.drivers.borrow_mut().push((path, driver));
    }
}

impl Default for FixtureManager {
    fn default() -> Self {
        Self::new()
    }
}

impl<'ast> AnalysisManager<'ast> for FixtureManager {
    fn get_drivers(&self, symbol: &'ast dyn ValueSymbol) -> Vec<ExternalDriver> {
        self.drivers
            .borrow()
            .iter()
            .filter(|(p, _)| *p == symbol.hierarchical_path())
            .map(|(_, d)| *d)
            .collect()
    }
}
