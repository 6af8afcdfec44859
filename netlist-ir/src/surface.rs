//! The external AST query surface (spec §6): everything this crate
//! *consumes* from an elaborator/frontend, never owns, and must outlive the
//! analysis. Value-symbol identity is host-opaque (a trait object, `'ast`
//! borrowed), exactly as the original's `ast::ValueSymbol const *` fields
//! are raw, unowned pointers into the host's AST arena; expressions and
//! statements, by contrast, are a *closed* set of shapes the DFA and LSP
//! extractor pattern-match exhaustively (§4.5/§4.6), so they are modelled
//! as borrowing enums rather than an open trait hierarchy — there is
//! nothing here for a host to subclass, only to construct, the same way
//! `calyx_frontend::ast` is a concrete enum tree that `calyx_ir::from_ast`
//! translates into the IR proper.
//!
//! A real frontend would supply its own adapter translating its native
//! parse tree into this shape (out of scope here, as the upstream HDL
//! parser/elaborator is out of scope of the whole specification); this
//! crate ships no such adapter, only the trait/enum contract and a
//! `#[cfg(test)]`-only fixture builder (`netlist-analysis::testutil`) used
//! to exercise the scenario tests in spec §8.

use crate::bitrange::BitRange;

/// An externally-provided identity for a named declared value. Stable
/// address, carries a type (opaque here), a hierarchical name and a
/// bit-width. Equality is by address (`symbol_key`), never by name: two
/// value symbols may share a hierarchical name in different scopes.
pub trait ValueSymbol: std::fmt::Debug {
    fn bit_width(&self) -> u32;
    fn hierarchical_path(&self) -> &str;

    /// `Some` when this symbol is itself a modport port: the connection
    /// expression the modport ultimately projects through to reach an
    /// interface-internal variable (spec §4.7 "Modport / interface
    /// resolution"). An ordinary value symbol is never a modport port and
    /// keeps the default `None`.
    fn modport_connection(&self) -> Option<&Expr<'_>> {
        None
    }
}

/// A stable, hashable key for a value symbol's identity, used to index the
/// slot table (spec §3's "Slot table"). Two references to the same
/// underlying symbol produce the same key; this is pointer identity, not a
/// derived hash of the symbol's contents.
pub fn symbol_key(sym: &dyn ValueSymbol) -> usize {
    sym as *const dyn ValueSymbol as *const () as usize
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    In,
    Out,
    InOut,
}

/// The kind of an externally-known driver of a value symbol, as reported by
/// the host's driver-enumeration query (spec §6).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DriverKind {
    Continuous,
    Procedural,
    InputPort,
}

#[derive(Clone, Copy, Debug)]
pub struct ExternalDriver {
    pub kind: DriverKind,
    pub range: BitRange,
}

/// The constant evaluation context, used to resolve constant selects and
/// trivially-constant conditions (spec §6). Opaque: the host decides what
/// state it needs to carry (e.g. a binding environment for generate-loop
/// variables); this crate treats it as an inert token handed back into the
/// host's own `is_constant`/`evaluate_bool` queries.
pub trait EvalContext {}

/// Edge sensitivity of a single signal in a `@(...)` event control.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EdgeKind {
    None,
    Pos,
    Neg,
    Both,
}

impl EdgeKind {
    pub fn is_edge(&self) -> bool {
        !matches!(self, EdgeKind::None)
    }
}

#[derive(Clone, Debug)]
pub enum TimingControl {
    SignalEvent(EdgeKind),
    EventList(Vec<EdgeKind>),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ProceduralBlockKind {
    Always,
    AlwaysFf,
    AlwaysComb,
    AlwaysLatch,
    Initial,
    Final,
}

/// An expression in the host's elaborated AST, narrowed to the shapes the
/// longest-static-prefix extractor and DFA need to recognise (spec §4.5).
/// Anything else the host's expression grammar contains (arithmetic,
/// reductions, concatenations that are not themselves LSP roots, ...) is
/// `Opaque` from this crate's point of view — consumed only as an
/// rvalue-bearing subtree to recurse into, never specially interpreted.
#[derive(Debug)]
pub enum Expr<'ast> {
    NamedValue {
        symbol: &'ast dyn ValueSymbol,
    },
    HierarchicalValue {
        symbol: &'ast dyn ValueSymbol,
    },
    ElementSelect {
        base: &'ast Expr<'ast>,
        selector: &'ast Expr<'ast>,
        selector_is_constant: bool,
    },
    RangeSelect {
        base: &'ast Expr<'ast>,
        endpoints_constant: bool,
    },
    /// Member access on a class handle, covergroup, or void: LSPs do not
    /// cross the handle (spec §4.5).
    MemberAccessClass {
        base: &'ast Expr<'ast>,
        member: &'ast dyn ValueSymbol,
    },
    /// Member access on a packed aggregate: the base may extend a
    /// currently-open LSP.
    MemberAccessAggregate {
        base: &'ast Expr<'ast>,
        member: &'ast dyn ValueSymbol,
    },
    Conversion {
        inner: &'ast Expr<'ast>,
    },
    /// A binary/unary/concatenation/literal operator irrelevant to LSP
    /// extraction beyond recursing into its operands.
    Opaque {
        operands: Vec<&'ast Expr<'ast>>,
    },
}

/// A statement in the host's elaborated AST, narrowed to the control-flow
/// shapes the DFA transfer rules dispatch on (spec §4.6).
#[derive(Debug)]
pub enum Stmt<'ast> {
    Assignment {
        lhs: &'ast Expr<'ast>,
        rhs: &'ast Expr<'ast>,
        blocking: bool,
    },
    /// `if`/ternary. `arms` lists `(guard, body)` in source order; a final
    /// `None` guard is the unconditional `else`.
    Conditional {
        arms: Vec<(Option<&'ast Expr<'ast>>, &'ast Stmt<'ast>)>,
    },
    /// `case`. `arms` lists `(label, body)`; a `None` label is the
    /// `default` arm. Label-vs-selector constant matching is the host's
    /// responsibility to have already resolved into which arm is taken
    /// when the selector is constant.
    Case {
        selector: &'ast Expr<'ast>,
        arms: Vec<(Option<&'ast Expr<'ast>>, &'ast Stmt<'ast>)>,
    },
    /// `force`/`release`-style procedural force: lvalue recording is
    /// suppressed for the nested assignment, but rvalues still flow.
    Force {
        inner: &'ast Stmt<'ast>,
    },
    Block {
        statements: Vec<&'ast Stmt<'ast>>,
    },
    /// A procedural loop (`while`/`for`/`repeat`/`forever`) whose bound is
    /// not necessarily statically known. The DFA reaches a fixpoint over
    /// the body rather than unrolling it (spec §4.6).
    Loop {
        body: &'ast Stmt<'ast>,
    },
    /// A concurrent assertion appearing as a sequential block's sole body;
    /// the walker ignores such blocks entirely (spec §4.8).
    ConcurrentAssertion,
}

#[derive(Debug)]
pub struct PortDecl<'ast> {
    pub symbol: &'ast dyn ValueSymbol,
    pub direction: Direction,
    pub internal_symbol: Option<&'ast dyn ValueSymbol>,
}

#[derive(Debug)]
pub struct ProceduralBlock<'ast> {
    pub kind: ProceduralBlockKind,
    pub timing: Option<TimingControl>,
    pub body: &'ast Stmt<'ast>,
}

#[derive(Debug)]
pub struct ContinuousAssign<'ast> {
    pub lhs: &'ast Expr<'ast>,
    pub rhs: &'ast Expr<'ast>,
}

#[derive(Debug)]
pub struct PortConnection<'ast> {
    pub port_symbol: &'ast dyn ValueSymbol,
    pub direction: Direction,
    pub internal_symbol: Option<&'ast dyn ValueSymbol>,
    /// `None` for an unconnected (empty) port hookup.
    pub expr: Option<&'ast Expr<'ast>>,
}

#[derive(Debug)]
pub struct Instance<'ast> {
    pub body: &'ast Scope<'ast>,
    pub port_connections: Vec<PortConnection<'ast>>,
    pub uninstantiated: bool,
}

#[derive(Debug)]
pub struct GenerateBlock<'ast> {
    pub instantiated: bool,
    pub body: &'ast Scope<'ast>,
}

/// A variable declared inside an interface body (spec §4.8's "Variable
/// symbol inside an interface body").
#[derive(Debug)]
pub struct InterfaceVariable<'ast> {
    pub symbol: &'ast dyn ValueSymbol,
}

#[derive(Debug)]
pub enum Member<'ast> {
    Port(PortDecl<'ast>),
    InterfaceVariable(InterfaceVariable<'ast>),
    ProceduralBlock(ProceduralBlock<'ast>),
    ContinuousAssign(ContinuousAssign<'ast>),
    Instance(Instance<'ast>),
    GenerateBlock(GenerateBlock<'ast>),
}

/// A flat list of design elements at one level of hierarchy (a module body,
/// an instance body, a generate block body); the AST walker (spec §4.8)
/// iterates this in declaration order.
#[derive(Debug, Default)]
pub struct Scope<'ast> {
    pub members: Vec<Member<'ast>>,
}

/// Resolves an LSP expression to a bit range under an evaluation context, or
/// reports "cannot determine" as `None` (spec §6's *LSP bounds query*).
pub trait LspBounds<'ast> {
    fn bounds(
        &self,
        lsp: &Expr<'ast>,
        ctx: &dyn EvalContext,
        symbol: &dyn ValueSymbol,
    ) -> Option<BitRange>;

    /// Whether `expr` is compile-time-constant under `ctx` (used to decide
    /// trivially-constant guards and constant selectors).
    fn is_constant(&self, expr: &Expr<'ast>, ctx: &dyn EvalContext) -> bool;

    /// Evaluate a known-constant boolean expression (a guard already
    /// reported constant by `is_constant`).
    fn eval_bool(&self, expr: &Expr<'ast>, ctx: &dyn EvalContext) -> bool;
}

/// The host's driver-enumeration query: for a value symbol, its set of
/// externally-known drivers (spec §6).
pub trait AnalysisManager<'ast> {
    fn get_drivers(&self, symbol: &'ast dyn ValueSymbol) -> Vec<ExternalDriver>;
}
