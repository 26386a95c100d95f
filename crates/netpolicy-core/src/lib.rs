//! Core data model for the netpolicy declaration binder.
//!
//! This crate holds the leaf types every other crate shares: spans, names,
//! types, attributes, values, the AST contract, identifiers and the error
//! and diagnostic types.

pub mod ast;
pub mod attrs;
pub mod diagnostics;
pub mod error;
pub mod ident;
pub mod qualified_name;
pub mod scope;
pub mod span;
pub mod type_hash;
pub mod types;
pub mod value;

pub use ast::{BinaryOp, DeclKind, Expr, ExprKind, InitClass, Stmt, StmtKind, UnaryOp};
pub use attrs::{Attr, AttrContext, AttrProblem, AttrTag, Attributes, find_attr};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{BindError, EvalError, FatalError, Severity, TypeError, ValueError};
pub use ident::{IdentFlags, IdentId, Identifier};
pub use qualified_name::{GLOBAL_MODULE_NAME, QualifiedName, make_full_var_name};
pub use scope::Scope;
pub use span::{FileId, Span};
pub use type_hash::TypeHash;
pub use types::{
    BaseKind, EnumType, FuncFlavor, FuncType, RecordType, TableType, Type, TypeDecl, TypeKind,
    TypeRef, same_param_types, same_type, same_yield,
};
pub use value::{
    FuncBody, FuncVal, OverloadImpl, PortVal, RecordRef, RecordVal, TableRef, TableVal,
    TransportProto, Value, VectorRef, VectorVal,
};
