//! The AST fragments the binder consumes.
//!
//! Parsing happens elsewhere; this is only the contract. Name references
//! carry the [`IdentId`] the parser resolved them to, so the binder and the
//! capture analysis never re-resolve names.

use std::rc::Rc;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::attrs::Attributes;
use crate::ident::IdentId;
use crate::span::Span;
use crate::types::TypeRef;
use crate::value::Value;

/// How an initializer combines with an existing value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum InitClass {
    /// No initializer operator.
    #[default]
    None = 0,
    /// `=`
    Full = 1,
    /// `+=`
    Extra = 2,
    /// `-=`
    Remove = 3,
}

impl InitClass {
    pub fn op(&self) -> &'static str {
        match self {
            InitClass::None => "",
            InitClass::Full => "=",
            InitClass::Extra => "+=",
            InitClass::Remove => "-=",
        }
    }
}

/// Declaration qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum DeclKind {
    #[default]
    Regular = 0,
    Redef = 1,
    Const = 2,
    Option = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
    Size,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Gt,
    And,
    Or,
    In,
}

/// An expression node.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Const(Value),
    Name {
        id: IdentId,
        in_const_decl: bool,
    },
    List(Vec<Expr>),
    Assign {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        /// Pre-computed value (loop-variable binding).
        val: Option<Value>,
        attrs: Option<Attributes>,
    },
    Index {
        base: Box<Expr>,
        index: Vec<Expr>,
    },
    Field {
        base: Box<Expr>,
        field: String,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Anonymous function. `id` is the lambda's own temporary identifier.
    Lambda {
        id: IdentId,
        body: Rc<Stmt>,
    },
    /// `table([k] = v, ...)`; entries are `Assign` nodes with a `List` lhs.
    TableConstructor {
        entries: Vec<Expr>,
        attrs: Option<Attributes>,
        ty: Option<TypeRef>,
    },
    SetConstructor {
        elements: Vec<Expr>,
        attrs: Option<Attributes>,
        ty: Option<TypeRef>,
    },
    RecordConstructor {
        fields: Vec<(String, Expr)>,
    },
    VectorConstructor {
        elements: Vec<Expr>,
    },
    /// Coerce a record-ish initializer into a specific record type.
    RecordCoerce {
        expr: Box<Expr>,
        ty: TypeRef,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn constant(v: Value) -> Self {
        Self::new(ExprKind::Const(v), Span::default())
    }

    pub fn name(id: IdentId) -> Self {
        Self::new(
            ExprKind::Name {
                id,
                in_const_decl: false,
            },
            Span::default(),
        )
    }

    pub fn list(items: Vec<Expr>) -> Self {
        Self::new(ExprKind::List(items), Span::default())
    }

    pub fn assign(lhs: Expr, rhs: Expr) -> Self {
        Self::new(
            ExprKind::Assign {
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                val: None,
                attrs: None,
            },
            Span::default(),
        )
    }

    pub fn call(func: Expr, args: Vec<Expr>) -> Self {
        Self::new(
            ExprKind::Call {
                func: Box::new(func),
                args,
            },
            Span::default(),
        )
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Self::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            Span::default(),
        )
    }

    pub fn lambda(id: IdentId, body: Stmt) -> Self {
        Self::new(
            ExprKind::Lambda {
                id,
                body: Rc::new(body),
            },
            Span::default(),
        )
    }

    pub fn set_ctor(elements: Vec<Expr>, attrs: Option<Attributes>) -> Self {
        Self::new(
            ExprKind::SetConstructor {
                elements,
                attrs,
                ty: None,
            },
            Span::default(),
        )
    }

    /// `table([k1] = v1, ...)` from key/value pairs.
    pub fn table_ctor(pairs: Vec<(Expr, Expr)>, attrs: Option<Attributes>) -> Self {
        let entries = pairs
            .into_iter()
            .map(|(k, v)| Expr::assign(Expr::list(vec![k]), v))
            .collect();
        Self::new(
            ExprKind::TableConstructor {
                entries,
                attrs,
                ty: None,
            },
            Span::default(),
        )
    }

    pub fn record_ctor(fields: Vec<(&str, Expr)>) -> Self {
        Self::new(
            ExprKind::RecordConstructor {
                fields: fields
                    .into_iter()
                    .map(|(n, e)| (n.to_string(), e))
                    .collect(),
            },
            Span::default(),
        )
    }

    pub fn vector_ctor(elements: Vec<Expr>) -> Self {
        Self::new(ExprKind::VectorConstructor { elements }, Span::default())
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Constructor attributes that propagate to a declared identifier.
    pub fn ctor_attrs(&self) -> Option<&Attributes> {
        match &self.kind {
            ExprKind::TableConstructor { attrs, .. } | ExprKind::SetConstructor { attrs, .. } => {
                attrs.as_ref()
            }
            _ => None,
        }
    }

    pub fn is_assign(&self) -> bool {
        matches!(self.kind, ExprKind::Assign { .. })
    }

    pub fn tag_name(&self) -> &'static str {
        match &self.kind {
            ExprKind::Const(_) => "constant",
            ExprKind::Name { .. } => "name",
            ExprKind::List(_) => "list",
            ExprKind::Assign { .. } => "assignment",
            ExprKind::Index { .. } => "index",
            ExprKind::Field { .. } => "field access",
            ExprKind::Call { .. } => "call",
            ExprKind::Unary { .. } => "unary expression",
            ExprKind::Binary { .. } => "binary expression",
            ExprKind::Lambda { .. } => "anonymous function",
            ExprKind::TableConstructor { .. } => "table constructor",
            ExprKind::SetConstructor { .. } => "set constructor",
            ExprKind::RecordConstructor { .. } => "record constructor",
            ExprKind::VectorConstructor { .. } => "vector constructor",
            ExprKind::RecordCoerce { .. } => "record coercion",
        }
    }
}

/// A statement node.
#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Expr(Expr),
    /// Placeholder left where a local was declared without an initializer.
    Null,
    List(Vec<Stmt>),
    If {
        cond: Expr,
        then: Box<Stmt>,
        otherwise: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    For {
        vars: Vec<IdentId>,
        iter: Expr,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
    Print(Vec<Expr>),
    Event(Expr),
    /// Default-initialize the listed locals.
    Init(Vec<IdentId>),
    Next,
    Break,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn null() -> Self {
        Self::new(StmtKind::Null, Span::default())
    }

    pub fn expr(e: Expr) -> Self {
        let span = e.span;
        Self::new(StmtKind::Expr(e), span)
    }

    pub fn list(stmts: Vec<Stmt>) -> Self {
        Self::new(StmtKind::List(stmts), Span::default())
    }

    pub fn ret(e: Option<Expr>) -> Self {
        Self::new(StmtKind::Return(e), Span::default())
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, StmtKind::Null)
    }

    /// The expression of an expression statement.
    pub fn as_expr(&self) -> Option<&Expr> {
        match &self.kind {
            StmtKind::Expr(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_codes() {
        assert_eq!(InitClass::try_from(2u8), Ok(InitClass::Extra));
        assert_eq!(u8::from(DeclKind::Option), 3);
        assert!(DeclKind::try_from(9u8).is_err());
        assert_eq!(InitClass::Remove.op(), "-=");
    }

    #[test]
    fn table_ctor_builds_assign_entries() {
        let e = Expr::table_ctor(
            vec![(Expr::constant(Value::Count(1)), Expr::constant(Value::string("a")))],
            None,
        );
        match &e.kind {
            ExprKind::TableConstructor { entries, .. } => {
                assert_eq!(entries.len(), 1);
                assert!(entries[0].is_assign());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn ctor_attrs_only_on_constructors() {
        let attrs = Attributes::new();
        assert!(Expr::set_ctor(vec![], Some(attrs)).ctor_attrs().is_some());
        assert!(Expr::constant(Value::Bool(true)).ctor_attrs().is_none());
    }

    #[test]
    fn expr_stmt_keeps_span() {
        let span = Span::new(3, 4, 1);
        let s = Stmt::expr(Expr::constant(Value::Int(1)).at(span));
        assert_eq!(s.span, span);
        assert!(s.as_expr().is_some());
    }
}
