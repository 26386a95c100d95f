//! Declaration binding for policy scripts.
//!
//! Every operation hangs off [`BindContext`], which owns the symbol table,
//! the type registry, the open scope stack and the diagnostics of one load
//! session:
//!
//! - [`BindContext::bind_global`], [`BindContext::bind_local`] and
//!   [`BindContext::bind_and_assign_local`] bind variables.
//! - [`BindContext::declare_type`] names types.
//! - [`BindContext::begin_function`] / [`BindContext::end_function`] bind
//!   function, event and hook definitions against their overload sets.
//! - [`BindContext::lookup_required`] and friends fetch built-in globals.
//!
//! ```
//! use netpolicy_binder::{BindContext, VarDecl};
//! use netpolicy_core::{BaseKind, Expr, Type, Value};
//!
//! let mut ctx = BindContext::with_defaults();
//! let id = ctx.global("max_files");
//! assert!(ctx.bind_global(
//!     id,
//!     VarDecl::typed(Type::base(BaseKind::Count)).init(Expr::constant(Value::Count(10))),
//! ));
//! assert_eq!(ctx.lookup_optional_count("max_files"), Ok(10));
//! ```

mod arena;
mod capture;
mod context;
mod eval;
mod func;
mod internal;
mod options;
mod type_decl;
mod var;

pub use arena::{FunctionArena, FunctionIngredients};
pub use capture::gather_outer_ids;
pub use context::{BindContext, LoadSummary};
pub use eval::{Evaluator, LiteralEvaluator};
pub use func::{ANONYMOUS_FUNCTION_NAME, transfer_arg_defaults};
pub use options::BindOptions;
pub use var::VarDecl;
