//! The longest-static-prefix extractor (spec §4.5): walks an expression
//! tree and reports `(symbol, lsp, bit-range, is-lvalue)` events through a
//! callback, mirroring `LSPUtilities::visitLSPs`'s callback-based
//! traversal in the original (see `NetlistVisitor.cpp`'s
//! `handlePortConnection`, which drives it with a closure) rather than
//! building an intermediate `Vec` of events.

use netlist_ir::{BitRange, EvalContext, Expr, LspBounds, ValueSymbol};

/// `FnMut(symbol, lsp, bounds, is_lvalue)`.
pub type LspEvent<'a, 'ast> =
    dyn FnMut(&'ast dyn ValueSymbol, &'ast Expr<'ast>, BitRange, bool) + 'a;

/// Entry point: walk `expr`, reporting one event per LSP root encountered.
/// `is_lvalue` is the flag carried from the assignment side the caller is
/// walking (`true` on the LHS, `false` on the RHS), and is itself
/// suppressed locally per the rules below (selectors, cross-handle member
/// bases).
pub fn visit_lsps<'ast>(
    expr: &'ast Expr<'ast>,
    ctx: &dyn EvalContext,
    bounds: &dyn LspBounds<'ast>,
    is_lvalue: bool,
    quiet: bool,
    on_event: &mut LspEvent<'_, 'ast>,
) {
    walk(expr, None, ctx, bounds, is_lvalue, quiet, on_event);
}

fn emit<'ast>(
    symbol: &'ast dyn ValueSymbol,
    lsp: &'ast Expr<'ast>,
    ctx: &dyn EvalContext,
    bounds: &dyn LspBounds<'ast>,
    is_lvalue: bool,
    quiet: bool,
    on_event: &mut LspEvent<'_, 'ast>,
) {
    match bounds.bounds(lsp, ctx, symbol) {
        Some(range) => on_event(symbol, lsp, range, is_lvalue),
        // Unresolvable LSP bounds are a silent skip (spec §7); the
        // elaborator is responsible for the underlying diagnostic.
        None if !quiet => {
            log::trace!("lsp bounds unresolved for {}", symbol.hierarchical_path())
        }
        None => {}
    }
}

fn walk<'ast>(
    expr: &'ast Expr<'ast>,
    current_lsp: Option<&'ast Expr<'ast>>,
    ctx: &dyn EvalContext,
    bounds: &dyn LspBounds<'ast>,
    is_lvalue: bool,
    quiet: bool,
    on_event: &mut LspEvent<'_, 'ast>,
) {
    match expr {
        Expr::NamedValue { symbol } | Expr::HierarchicalValue { symbol } => {
            let lsp = current_lsp.unwrap_or(expr);
            emit(*symbol, lsp, ctx, bounds, is_lvalue, quiet, on_event);
        }
        Expr::ElementSelect {
            base,
            selector,
            selector_is_constant,
        } => {
            if *selector_is_constant {
                let lsp = current_lsp.unwrap_or(expr);
                walk(base, Some(lsp), ctx, bounds, is_lvalue, quiet, on_event);
            } else {
                walk(base, None, ctx, bounds, is_lvalue, quiet, on_event);
            }
            walk(selector, None, ctx, bounds, false, quiet, on_event);
        }
        Expr::RangeSelect {
            base,
            endpoints_constant,
        } => {
            if *endpoints_constant {
                let lsp = current_lsp.unwrap_or(expr);
                walk(base, Some(lsp), ctx, bounds, is_lvalue, quiet, on_event);
            } else {
                walk(base, None, ctx, bounds, is_lvalue, quiet, on_event);
            }
        }
        Expr::MemberAccessClass { base, member } => {
            // LSPs do not cross a class/covergroup/void handle: the member
            // reference is itself terminal.
            emit(*member, expr, ctx, bounds, is_lvalue, quiet, on_event);
            walk(base, None, ctx, bounds, false, quiet, on_event);
        }
        Expr::MemberAccessAggregate { base, .. } => {
            let lsp = current_lsp.unwrap_or(expr);
            walk(base, Some(lsp), ctx, bounds, is_lvalue, quiet, on_event);
        }
        Expr::Conversion { inner } => {
            walk(inner, current_lsp, ctx, bounds, is_lvalue, quiet, on_event);
        }
        Expr::Opaque { operands } => {
            for operand in operands {
                walk(operand, None, ctx, bounds, is_lvalue, quiet, on_event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Sym(&'static str, u32);
    impl ValueSymbol for Sym {
        fn bit_width(&self) -> u32 {
            self.1
        }
        fn hierarchical_path(&self) -> &str {
            self.0
        }
    }

    struct Ctx;
    impl EvalContext for Ctx {}

    struct FixedBounds;
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

    #[test]
    fn named_value_emits_one_event() {
        let a = Sym("a", 8);
        let e = Expr::NamedValue { symbol: &a };
        let mut seen = vec![];
        visit_lsps(&e, &Ctx, &FixedBounds, false, false, &mut |s, _, r, lv| {
            seen.push((s.hierarchical_path().to_string(), r, lv));
        });
        assert_eq!(seen, vec![("a".to_string(), BitRange::new(0, 7), false)]);
    }

    #[test]
    fn constant_element_select_keeps_select_as_lsp() {
        let t = Sym("t", 4);
        let idx = Sym("idx_const", 1);
        let base = Expr::NamedValue { symbol: &t };
        let sel = Expr::NamedValue { symbol: &idx };
        let select = Expr::ElementSelect {
            base: &base,
            selector: &sel,
            selector_is_constant: true,
        };
        let mut seen = vec![];
        visit_lsps(&select, &Ctx, &FixedBounds, true, false, &mut |s, lsp, _, lv| {
            seen.push((s.hierarchical_path().to_string(), std::ptr::eq(lsp, &select), lv));
        });
        // Two events: the selected value (lvalue, lsp == the select) and the
        // selector itself (lvalue suppressed, its own lsp).
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], ("t".to_string(), true, true));
        assert_eq!(seen[1].0, "idx_const");
        assert!(!seen[1].2);
    }

    #[test]
    fn member_access_class_does_not_cross_handle() {
        let handle = Sym("h", 1);
        let member = Sym("h.m", 8);
        let base = Expr::NamedValue { symbol: &handle };
        let access = Expr::MemberAccessClass {
            base: &base,
            member: &member,
        };
        let mut seen = vec![];
        visit_lsps(&access, &Ctx, &FixedBounds, false, false, &mut |s, _, _, _| {
            seen.push(s.hierarchical_path().to_string());
        });
        assert_eq!(seen, vec!["h.m", "h"]);
    }
}
