//! # netpolicy
//!
//! Declaration binding for a statically typed network-policy scripting
//! language. A loader feeds parsed declarations into a [`BindContext`] one
//! at a time; the context type-checks them against the process-wide symbol
//! table and reports problems through its [`Diagnostics`] channel.
//!
//! ```
//! use netpolicy::prelude::*;
//!
//! let mut ctx = BindContext::with_defaults();
//! let id = ctx.global("local_nets");
//! ctx.bind_global(id, VarDecl::typed(Type::set(vec![Type::base(BaseKind::Subnet)])));
//!
//! let (summary, _functions) = netpolicy::finish(ctx).unwrap();
//! assert!(summary.is_clean());
//! ```

mod error;
mod tracing_config;

pub use error::LoadError;
pub use tracing_config::{LogFormat, init_tracing};

pub use netpolicy_binder::{
    ANONYMOUS_FUNCTION_NAME, BindContext, BindOptions, Evaluator, FunctionArena,
    FunctionIngredients, LiteralEvaluator, LoadSummary, VarDecl, gather_outer_ids,
    transfer_arg_defaults,
};
pub use netpolicy_core::{BindError, Diagnostic, DiagnosticKind, Diagnostics, FatalError};
pub use netpolicy_registry::{EventHandler, EventRegistry, HandlerRef, SymbolTable, TypeRegistry};

pub mod prelude {
    pub use netpolicy_binder::{BindContext, BindOptions, Evaluator, LiteralEvaluator, VarDecl};
    pub use netpolicy_registry::SymbolTable;
    pub use netpolicy_core::{
        Attr, AttrTag, Attributes, BaseKind, BindError, DeclKind, EvalError, Expr, ExprKind,
        FatalError, FuncFlavor, GLOBAL_MODULE_NAME, IdentId, InitClass, Scope, Span, Stmt, Type,
        TypeDecl, TypeRef, Value,
    };
}

/// End a load session, failing if any declaration was rejected.
///
/// Function metadata is returned even though the context is consumed; it
/// has to stay alive for as long as the runtime does.
pub fn finish(ctx: BindContext) -> Result<(LoadSummary, FunctionArena), LoadError> {
    let (summary, arena) = ctx.finish();
    if summary.is_clean() {
        return Ok((summary, arena));
    }
    Err(LoadError::Rejected {
        errors: summary.diagnostics.error_count(),
        warnings: summary.diagnostics.warning_count(),
        diagnostics: summary.diagnostics,
    })
}
