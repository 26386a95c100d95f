//! Function, event and hook binding.
//!
//! A function definition is bound in two halves. [`BindContext::begin_function`]
//! resolves the header against the identifier's overload set, opens a scope
//! and installs the parameters; the caller then binds the body's locals and
//! hands the finished body to [`BindContext::end_function`], which closes the
//! scope and attaches the body to the overload chosen by the header.
//!
//! ```text
//! Unbound --begin--> HeaderBound(overload) --end--> BodyBound
//! ```

use std::rc::Rc;

use tracing::{debug, trace};

use netpolicy_core::{
    Attr, AttrContext, AttrTag, Attributes, BindError, FatalError, FuncBody, FuncFlavor, FuncVal,
    IdentId, RecordType, Scope, Span, Stmt, TypeRef, Value, same_yield,
};

use crate::arena::FunctionIngredients;
use crate::capture::outer_id_references;
use crate::context::BindContext;

/// Name every anonymous function is bound under.
pub const ANONYMOUS_FUNCTION_NAME: &str = "anonymous-function";

/// Copy `&default` parameter attributes from an earlier declaration of an
/// overload onto a redeclaration that omits them.
///
/// Parameters that already have a default keep their own.
pub fn transfer_arg_defaults(from: &RecordType, into: &RecordType) {
    if std::ptr::eq(from, into) {
        return;
    }

    let defaults: Vec<(usize, Attr)> = from
        .fields()
        .iter()
        .enumerate()
        .filter_map(|(i, f)| Some((i, f.find_attr(AttrTag::Default)?.clone())))
        .collect();

    for (i, default) in defaults {
        into.with_field_mut(i, |field| {
            let attrs = field.attrs.get_or_insert_with(Attributes::new);
            if !attrs.has(AttrTag::Default) {
                attrs.add_attr(default);
            }
        });
    }
}

impl BindContext {
    /// Bind a function header and open its body scope.
    ///
    /// Returns the overload index the body will be attached to. Header
    /// problems are reported as diagnostics and binding carries on, so the
    /// caller can always pair this with [`BindContext::end_function`].
    #[tracing::instrument(level = "debug", skip(self, ty, attrs, span))]
    #[cfg_attr(feature = "profiling", profiling::function)]
    #[allow(clippy::too_many_arguments)]
    pub fn begin_function(
        &mut self,
        id: IdentId,
        module: &str,
        flavor: FuncFlavor,
        is_redef: bool,
        ty: TypeRef,
        attrs: Option<Vec<Attr>>,
        span: Span,
    ) -> Result<usize, FatalError> {
        let name = self.symbols.get(id).name().to_string();
        let ft = ty
            .as_func()
            .map_err(|_| FatalError::NotAFunctionType { name: name.clone() })?;

        if flavor == FuncFlavor::Event {
            if ft.yield_type().is_some_and(|yt| !yt.is_void()) {
                self.report(BindError::EventYieldsValue {
                    name: name.clone(),
                    span,
                });
            }
            ft.clear_yield_type(flavor);
        }

        let mut id = id;
        let overload_idx = match self.symbols.get(id).ty().cloned() {
            Some(existing) => match existing.as_func() {
                Ok(eft) => {
                    if !same_yield(eft.yield_type().as_deref(), ft.yield_type().as_deref()) {
                        self.report(BindError::FunctionReturnTypeMismatch {
                            name: name.clone(),
                            span,
                        });
                        0
                    } else {
                        let args = ft.args();
                        match eft.overload_index(&args) {
                            Some(idx) => {
                                if let Some(prev) = eft.overload(idx) {
                                    transfer_arg_defaults(&prev, &args);
                                }
                                idx
                            }
                            None => eft.add_overload(args),
                        }
                    }
                }
                Err(_) => {
                    // Bind the body under a detached identifier so the
                    // existing non-function binding stays intact.
                    self.report(BindError::RedefinitionTypeMismatch {
                        name: name.clone(),
                        span,
                    });
                    id = self.generate_temporary(&name);
                    self.symbols.get_mut(id).set_type(ty.clone());
                    0
                }
            },
            None => {
                if is_redef {
                    self.report(BindError::RedefOfUndeclared {
                        name: name.clone(),
                        span,
                    });
                }
                self.symbols.get_mut(id).set_type(ty.clone());
                0
            }
        };

        if let Some(current) = self.symbols.get(id).value().cloned() {
            let Value::Func(f) = current else {
                return Err(FatalError::InvalidFunctionFlavor { name });
            };

            if f.flavor() != flavor {
                self.report(BindError::InconsistentFunctionFlavor {
                    name: name.clone(),
                    span,
                });
            }

            match f.flavor() {
                FuncFlavor::Event | FuncFlavor::Hook => {
                    if is_redef {
                        trace!(name = %name, "redef clears existing handlers");
                        self.symbols.get_mut(id).set_val(None);
                    }
                }
                FuncFlavor::Function => {
                    if !self.symbols.get(id).is_redefinable() && f.has_overload(overload_idx) {
                        self.report(BindError::AlreadyDefined {
                            name: name.clone(),
                            span,
                        });
                    }
                }
            }
        }

        let header_attrs = match attrs {
            Some(list) => {
                let (set, problems) = Attributes::checked(
                    list,
                    &ty,
                    AttrContext {
                        in_record: false,
                        is_global: true,
                    },
                );
                for problem in problems {
                    self.report(BindError::InvalidAttribute {
                        name: name.clone(),
                        tag: problem.tag,
                        reason: problem.reason,
                        span,
                    });
                }
                Some(set)
            }
            None => None,
        };

        if let Some(depr) = header_attrs.as_ref().and_then(|a| a.find(AttrTag::Deprecated)) {
            let message = depr
                .const_value()
                .and_then(|v| v.as_str().ok())
                .map(str::to_string);
            self.symbols.get_mut(id).make_deprecated(message);
        }

        self.push_scope(Scope::new(Some(id), overload_idx, header_attrs));

        let params: Vec<(String, TypeRef)> = ft
            .args()
            .fields()
            .iter()
            .map(|f| (f.id.clone(), f.ty.clone()))
            .collect();
        for (param, pty) in params {
            if let Some(prior) = self.lookup_id(&param, module, false, false)
                && !self.symbols.get(prior).is_global()
            {
                self.report(BindError::ArgumentNameCollision {
                    name: param.clone(),
                    span,
                });
            }
            let pid = self.install_id(&param, module, false, false)?;
            self.symbols.get_mut(pid).set_type(pty);
        }

        debug!(name = %name, overload = overload_idx, "function header bound");
        Ok(overload_idx)
    }

    /// Open an anonymous function. Each one gets its own identifier.
    pub fn begin_lambda(
        &mut self,
        module: &str,
        ty: TypeRef,
        attrs: Option<Vec<Attr>>,
        span: Span,
    ) -> Result<IdentId, FatalError> {
        let id = self.generate_temporary(ANONYMOUS_FUNCTION_NAME);
        self.begin_function(id, module, FuncFlavor::Function, false, ty, attrs, span)?;
        Ok(id)
    }

    /// Close the innermost function scope and attach `body`.
    ///
    /// Returns the identifier the body was bound to.
    #[tracing::instrument(level = "debug", skip_all)]
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn end_function(&mut self, body: Stmt) -> Result<IdentId, FatalError> {
        let scope = self.pop_scope()?;
        let id = scope.func_id().ok_or(FatalError::NoOpenScope)?;
        let name = self.symbols.get(id).name().to_string();

        if name == ANONYMOUS_FUNCTION_NAME {
            let refs = outer_id_references(
                &scope,
                &body,
                &self.symbols,
                self.options.search_inner_lambdas,
            );
            for (outer, ref_span) in refs {
                let outer_name = self.symbols.get(outer).name().to_string();
                self.report(BindError::UnsupportedOuterCapture {
                    name: outer_name,
                    span: ref_span,
                });
            }
        }

        let overload_idx = scope.overload_index();
        let priority = scope
            .find_attr(AttrTag::Priority)
            .and_then(|a| a.const_value())
            .and_then(|v| match v {
                Value::Int(i) => Some(*i),
                Value::Count(c) => i64::try_from(*c).ok(),
                _ => None,
            })
            .unwrap_or(0);
        let inits = scope.inits().to_vec();
        let frame_size = scope.len();
        let body = Rc::new(body);
        let scope = Rc::new(scope);

        let compiled = FuncBody {
            stmt: body.clone(),
            inits: inits.clone(),
            frame_size,
            priority,
        };

        let func = match self.symbols.get(id).value() {
            Some(Value::Func(f)) => {
                f.add_body(overload_idx, compiled);
                f.clone()
            }
            Some(_) => return Err(FatalError::InvalidFunctionFlavor { name }),
            None => {
                let flavor = self
                    .symbols
                    .get(id)
                    .ty()
                    .and_then(|t| t.as_func().ok())
                    .map_or(FuncFlavor::Function, |ft| ft.flavor());
                let f = Rc::new(FuncVal::new(name.clone(), flavor));
                f.add_body(overload_idx, compiled);
                let ident = self.symbols.get_mut(id);
                ident.set_val(Some(Value::Func(f.clone())));
                ident.set_const();
                f
            }
        };
        func.set_scope(scope.clone());

        if func.flavor() == FuncFlavor::Event {
            self.handlers.register(&name).set_local(id);
        }

        self.functions.retain(FunctionIngredients {
            id,
            name: name.clone(),
            overload_index: overload_idx,
            body,
            scope,
            inits,
            frame_size,
            priority,
        });

        debug!(
            name = %name,
            overload = overload_idx,
            frame_size,
            priority,
            "function body bound"
        );
        Ok(id)
    }
}
