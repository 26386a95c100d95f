//! Closure capture analysis.
//!
//! A recursive walk over a function body that collects name references
//! which are neither global nor bound in the analysed function's own scope.
//! The walk carries the anonymous-function nesting depth as a parameter;
//! references found at depth > 0 are only recorded when inner bodies are
//! searched.

use indexmap::IndexSet;

use netpolicy_core::{Expr, ExprKind, IdentId, Scope, Span, Stmt, StmtKind};
use netpolicy_registry::SymbolTable;

use crate::context::BindContext;

struct OuterRefs<'a> {
    scope: &'a Scope,
    symbols: &'a SymbolTable,
    search_inner_lambdas: bool,
    found: Vec<(IdentId, Span)>,
}

impl OuterRefs<'_> {
    fn stmt(&mut self, stmt: &Stmt, depth: usize) {
        match &stmt.kind {
            StmtKind::Expr(e) | StmtKind::Event(e) => self.expr(e, depth),
            StmtKind::Return(e) => {
                if let Some(e) = e {
                    self.expr(e, depth);
                }
            }
            StmtKind::Print(es) => self.exprs(es, depth),
            StmtKind::List(stmts) => {
                for s in stmts {
                    self.stmt(s, depth);
                }
            }
            StmtKind::If {
                cond,
                then,
                otherwise,
            } => {
                self.expr(cond, depth);
                self.stmt(then, depth);
                if let Some(s) = otherwise {
                    self.stmt(s, depth);
                }
            }
            StmtKind::While { cond, body } => {
                self.expr(cond, depth);
                self.stmt(body, depth);
            }
            StmtKind::For { iter, body, .. } => {
                self.expr(iter, depth);
                self.stmt(body, depth);
            }
            StmtKind::Null | StmtKind::Init(_) | StmtKind::Next | StmtKind::Break => {}
        }
    }

    fn exprs(&mut self, exprs: &[Expr], depth: usize) {
        for e in exprs {
            self.expr(e, depth);
        }
    }

    fn expr(&mut self, expr: &Expr, depth: usize) {
        match &expr.kind {
            ExprKind::Name { id, .. } => self.name(*id, expr.span, depth),
            ExprKind::Const(_) => {}
            ExprKind::List(items)
            | ExprKind::VectorConstructor { elements: items }
            | ExprKind::SetConstructor {
                elements: items, ..
            }
            | ExprKind::TableConstructor { entries: items, .. } => self.exprs(items, depth),
            ExprKind::Assign { lhs, rhs, .. } | ExprKind::Binary { lhs, rhs, .. } => {
                self.expr(lhs, depth);
                self.expr(rhs, depth);
            }
            ExprKind::Index { base, index } => {
                self.expr(base, depth);
                self.exprs(index, depth);
            }
            ExprKind::Field { base, .. } => self.expr(base, depth),
            ExprKind::Call { func, args } => {
                self.expr(func, depth);
                self.exprs(args, depth);
            }
            ExprKind::Unary { operand, .. } => self.expr(operand, depth),
            ExprKind::Lambda { body, .. } => self.stmt(body, depth + 1),
            ExprKind::RecordConstructor { fields } => {
                for (_, e) in fields {
                    self.expr(e, depth);
                }
            }
            ExprKind::RecordCoerce { expr, .. } => self.expr(expr, depth),
        }
    }

    fn name(&mut self, id: IdentId, span: Span, depth: usize) {
        if depth > 0 && !self.search_inner_lambdas {
            return;
        }
        let ident = self.symbols.get(id);
        if ident.is_global() || self.scope.lookup(ident.name()).is_some() {
            return;
        }
        self.found.push((id, span));
    }
}

/// Every occurrence of an outer reference in `body`, in walk order.
pub(crate) fn outer_id_references(
    scope: &Scope,
    body: &Stmt,
    symbols: &SymbolTable,
    search_inner_lambdas: bool,
) -> Vec<(IdentId, Span)> {
    let mut walker = OuterRefs {
        scope,
        symbols,
        search_inner_lambdas,
        found: Vec::new(),
    };
    walker.stmt(body, 0);
    walker.found
}

/// The distinct identifiers `body` references that are neither global
/// nor bound in `scope`, in first-reference order.
pub fn gather_outer_ids(
    scope: &Scope,
    body: &Stmt,
    symbols: &SymbolTable,
    search_inner_lambdas: bool,
) -> IndexSet<IdentId> {
    outer_id_references(scope, body, symbols, search_inner_lambdas)
        .into_iter()
        .map(|(id, _)| id)
        .collect()
}

impl BindContext {
    /// Capture set of `body` relative to `scope`, honouring the context's
    /// inner-lambda policy.
    pub fn gather_outer_ids(&self, scope: &Scope, body: &Stmt) -> IndexSet<IdentId> {
        gather_outer_ids(scope, body, &self.symbols, self.options.search_inner_lambdas)
    }
}
