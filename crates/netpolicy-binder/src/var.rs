//! Variable declarations: globals, locals and loop-variable bindings.
//!
//! All three entry points funnel into `make_var`, which resolves the type,
//! enforces the redefinition rules, attaches attributes and (for globals)
//! builds the initial value. A failing step reports one diagnostic and
//! abandons the declaration, leaving the identifier in its prior state or
//! marked with the error type.

use std::rc::Rc;

use tracing::{debug, trace};

use netpolicy_core::{
    Attr, AttrContext, AttrTag, Attributes, BindError, DeclKind, Expr, ExprKind, FuncFlavor,
    FuncVal, IdentId, InitClass, Span, Stmt, StmtKind, Type, TypeKind, TypeRef, Value,
    same_type, same_yield,
};

use crate::context::BindContext;

/// A parsed variable declaration.
///
/// ```
/// use netpolicy_binder::VarDecl;
/// use netpolicy_core::{BaseKind, DeclKind, Expr, InitClass, Type, Value};
///
/// let decl = VarDecl::typed(Type::base(BaseKind::Count))
///     .with_init(InitClass::Full, Expr::constant(Value::Count(5)))
///     .constant();
/// assert_eq!(decl.kind, DeclKind::Const);
/// ```
#[derive(Debug, Clone, Default)]
pub struct VarDecl {
    pub ty: Option<TypeRef>,
    pub init_class: InitClass,
    pub init: Option<Expr>,
    pub attrs: Option<Vec<Attr>>,
    pub kind: DeclKind,
    pub span: Span,
}

impl VarDecl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn typed(ty: TypeRef) -> Self {
        Self {
            ty: Some(ty),
            ..Self::default()
        }
    }

    pub fn with_init(mut self, class: InitClass, init: Expr) -> Self {
        self.init_class = class;
        self.init = Some(init);
        self
    }

    /// Shorthand for `= init`.
    pub fn init(self, init: Expr) -> Self {
        self.with_init(InitClass::Full, init)
    }

    pub fn with_attrs(mut self, attrs: Vec<Attr>) -> Self {
        self.attrs = Some(attrs);
        self
    }

    pub fn kind(mut self, kind: DeclKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn redef(self) -> Self {
        self.kind(DeclKind::Redef)
    }

    pub fn constant(self) -> Self {
        self.kind(DeclKind::Const)
    }

    pub fn option(self) -> Self {
        self.kind(DeclKind::Option)
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

impl BindContext {
    /// Declare or redefine a global. Returns `true` when the declaration
    /// bound without errors.
    #[tracing::instrument(level = "debug", skip(self, decl), fields(ident = %id, kind = ?decl.kind))]
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn bind_global(&mut self, id: IdentId, decl: VarDecl) -> bool {
        self.make_var(id, &decl, true)
    }

    /// Declare a local.
    ///
    /// No value is produced now. With an initializer the returned statement
    /// assigns it when the declaration runs; without one the local is
    /// registered for frame-entry initialization and a null statement is
    /// returned.
    #[tracing::instrument(level = "debug", skip(self, decl), fields(ident = %id))]
    pub fn bind_local(&mut self, id: IdentId, decl: VarDecl) -> Stmt {
        self.make_var(id, &decl, false);

        let Some(init) = decl.init else {
            if let Some(scope) = self.scopes.last_mut() {
                scope.add_init(id);
            }
            return Stmt::null();
        };

        if decl.init_class != InitClass::Full {
            let name = self.symbols.get(id).name().to_string();
            self.report(BindError::LocalInitClass {
                name,
                span: init.span,
            });
        }

        let span = init.span;
        let lhs = Expr::new(
            ExprKind::Name {
                id,
                in_const_decl: decl.kind == DeclKind::Const,
            },
            span,
        );
        let assign = Expr::new(
            ExprKind::Assign {
                lhs: Box::new(lhs),
                rhs: Box::new(init),
                val: None,
                attrs: self.symbols.get(id).attrs().cloned(),
            },
            span,
        );
        Stmt::new(StmtKind::Expr(assign), span)
    }

    /// Declare a local bound by destructuring (loop variables) and return
    /// the assignment that binds it.
    pub fn bind_and_assign_local(&mut self, id: IdentId, init: Expr, val: Option<Value>) -> Expr {
        let decl = VarDecl::new().init(init.clone()).at(init.span);
        self.make_var(id, &decl, false);

        let span = init.span;
        Expr::new(
            ExprKind::Assign {
                lhs: Box::new(Expr::name(id).at(span)),
                rhs: Box::new(init),
                val,
                attrs: None,
            },
            span,
        )
    }

    pub(crate) fn make_var(&mut self, id: IdentId, decl: &VarDecl, do_init: bool) -> bool {
        let name = self.symbols.get(id).name().to_string();
        let span = decl.span;
        let kind = decl.kind;
        let mut t = decl.ty.clone();
        let mut init = decl.init.clone();
        let mut ok = true;

        let existing = self.symbols.get(id).ty().cloned();
        let redefinable = self.symbols.get(id).is_redefinable();

        if let Some(existing_ty) = &existing {
            let has_init = init.is_some();
            let has_attrs = decl.attrs.is_some();

            let accepted = if self.options.strict_redef {
                redefinable || (!has_init && has_attrs)
            } else {
                redefinable || has_init || has_attrs
            };

            if accepted {
                if kind != DeclKind::Redef && self.options.warn_missing_redef {
                    self.report(BindError::MissingRedefQualifier {
                        name: name.clone(),
                        span,
                    });
                }
            } else if !existing_ty.is_func() {
                self.report(BindError::AlreadyDefined { name, span });
                return false;
            }
        }

        if kind == DeclKind::Redef {
            let Some(existing_ty) = &existing else {
                self.report(BindError::RedefOfUndeclared { name, span });
                return false;
            };
            if t.is_none() {
                t = Some(existing_ty.clone());
            }
        }

        if let Some(existing_ty) = existing.as_ref().filter(|e| !e.is_error() && !e.is_func()) {
            if kind != DeclKind::Redef {
                if t.is_none()
                    && let Some(e) = &init
                {
                    t = self.evaluator.init_type(e, &self.symbols);
                }
                let derived = t.is_some();
                if init.is_none() || !do_init || !derived {
                    self.report(BindError::AlreadyDefined { name, span });
                    return false;
                }
            }

            if let Some(new_ty) = &t
                && !same_type(new_ty, existing_ty)
            {
                self.report(BindError::RedefinitionTypeMismatch { name, span });
                return false;
            }
        }

        if let Some(TypeKind::Table(table)) = t.as_ref().map(|t| &t.kind)
            && let Some(elements) = &table.elements
        {
            if init.is_some() {
                self.report(BindError::DoubleInitialization { name, span });
                return false;
            }
            init = Some(elements.clone());
        }

        let t = match t {
            Some(t) => t,
            None => {
                let derived = init
                    .as_ref()
                    .and_then(|e| self.evaluator.init_type(e, &self.symbols));
                match derived {
                    Some(t) => t,
                    None => {
                        if init.is_some() {
                            self.symbols.get_mut(id).set_type(Type::error());
                        }
                        self.report(BindError::NoTypeDerivable { name, span });
                        return false;
                    }
                }
            }
        };

        if let Some(existing_ty) = existing.as_ref().filter(|e| e.is_func()) {
            if !self.add_function_type_overload(&name, existing_ty, &t, span) {
                return false;
            }
        } else {
            self.symbols.get_mut(id).set_type(t.clone());
        }

        if let Some(list) = &decl.attrs {
            let is_global = self.symbols.get(id).is_global();
            let (attrs, problems) = Attributes::checked(
                list.iter().cloned(),
                &t,
                AttrContext {
                    in_record: false,
                    is_global,
                },
            );
            for problem in problems {
                ok = false;
                self.report(BindError::InvalidAttribute {
                    name: name.clone(),
                    tag: problem.tag,
                    reason: problem.reason,
                    span,
                });
            }
            self.symbols.get_mut(id).add_attrs(&attrs);
        }

        if let Some(ctor_attrs) = init.as_ref().and_then(|e| e.ctor_attrs()) {
            self.symbols.get_mut(id).add_attrs(ctor_attrs);
        }

        if do_init && !self.initialize(id, &name, &t, decl, init.as_ref()) {
            return false;
        }

        match kind {
            DeclKind::Const => {
                if init.is_none() && !self.symbols.get(id).is_redefinable() {
                    ok = false;
                    self.report(BindError::ConstWithoutInitializer {
                        name: name.clone(),
                        span,
                    });
                }
                self.symbols.get_mut(id).set_const();
            }
            DeclKind::Option => {
                if init.is_none() {
                    ok = false;
                    self.report(BindError::OptionWithoutInitializer {
                        name: name.clone(),
                        span,
                    });
                }
                self.symbols.get_mut(id).set_option();
            }
            DeclKind::Regular | DeclKind::Redef => {}
        }

        self.symbols.get(id).update_val_attrs();

        if let TypeKind::Func(ft) = &t.kind
            && matches!(ft.flavor(), FuncFlavor::Event | FuncFlavor::Hook)
            && !self.symbols.get(id).has_val()
        {
            // Forward declaration: make the identifier callable before any
            // body exists.
            let placeholder = FuncVal::placeholder(name.clone(), ft.flavor());
            self.symbols
                .get_mut(id)
                .set_val(Some(Value::Func(Rc::new(placeholder))));
            trace!(name = %name, flavor = ?ft.flavor(), "bound body-less function value");
        }

        debug!(name = %name, ty = %t, ok, "variable bound");
        ok
    }

    /// Function-typed redeclaration: register the new signature as an
    /// additional overload of the existing function type.
    fn add_function_type_overload(
        &mut self,
        name: &str,
        existing: &TypeRef,
        new_ty: &TypeRef,
        span: Span,
    ) -> bool {
        let (Ok(existing_ft), Ok(new_ft)) = (existing.as_func(), new_ty.as_func()) else {
            self.report(BindError::RedefinitionTypeMismatch {
                name: name.to_string(),
                span,
            });
            return false;
        };

        if !same_yield(
            existing_ft.yield_type().as_deref(),
            new_ft.yield_type().as_deref(),
        ) {
            self.report(BindError::FunctionReturnTypeMismatch {
                name: name.to_string(),
                span,
            });
            return false;
        }

        let args = new_ft.args();
        if existing_ft.overload_index(&args).is_some() {
            self.report(BindError::DuplicateOverloadSignature {
                name: name.to_string(),
                span,
            });
            return false;
        }

        let idx = existing_ft.add_overload(args);
        trace!(name, overload = idx, "overload added by declaration");
        true
    }

    /// Build and install the initial value of a global.
    fn initialize(
        &mut self,
        id: IdentId,
        name: &str,
        t: &TypeRef,
        decl: &VarDecl,
        init: Option<&Expr>,
    ) -> bool {
        let span = decl.span;
        let mut class = decl.init_class;

        // `redef t["x"] = 1` extends the table rather than replacing it.
        if class == InitClass::None
            && decl.kind == DeclKind::Redef
            && t.is_table()
            && init.is_some_and(Expr::is_assign)
        {
            class = InitClass::Extra;
        }

        let hook_tag = match class {
            InitClass::Extra => Some(AttrTag::AddFunc),
            InitClass::Remove => Some(AttrTag::DelFunc),
            InitClass::None | InitClass::Full => None,
        };
        let hook = hook_tag
            .and_then(|tag| self.symbols.get(id).find_attr(tag))
            .and_then(|a| a.expr.clone());

        if let (Some(init), Some(hook)) = (init, hook) {
            let current = self.symbols.get(id).value().cloned();
            return match self
                .evaluator
                .apply_update(&hook, current.as_ref(), init, t, &self.symbols)
            {
                Ok(v) => {
                    self.symbols.get_mut(id).set_val(Some(v));
                    true
                }
                Err(e) => {
                    self.report(BindError::InitializationFailed {
                        name: name.to_string(),
                        reason: e.to_string(),
                        span,
                    });
                    false
                }
            };
        }

        if decl.kind == DeclKind::Redef && init.is_none() && decl.attrs.is_some() {
            // Attribute-only redef: keep the current value.
            return true;
        }

        let aggr = Value::empty_aggregate(t, self.symbols.get(id).attrs());

        let mut produced = None;
        if let Some(init) = init {
            let coerced;
            let init = if t.is_record() {
                coerced = Expr::new(
                    ExprKind::RecordCoerce {
                        expr: Box::new(init.clone()),
                        ty: t.clone(),
                    },
                    init.span,
                );
                &coerced
            } else {
                init
            };

            match self
                .evaluator
                .init_val(init, t, aggr.as_ref(), &self.symbols)
            {
                Ok(v) => produced = Some(v),
                Err(e) => {
                    self.report(BindError::InitializationFailed {
                        name: name.to_string(),
                        reason: e.to_string(),
                        span,
                    });
                    return false;
                }
            }
        }

        let Some(value) = aggr.or(produced) else {
            return true;
        };

        if let Err(e) = self.symbols.get_mut(id).set_val_with_class(value, class) {
            self.report(BindError::AggregateUpdate {
                name: name.to_string(),
                op: class.op(),
                reason: e.to_string(),
                span,
            });
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netpolicy_core::{BaseKind, DiagnosticKind, TypeDecl};

    fn count() -> TypeRef {
        Type::base(BaseKind::Count)
    }

    fn c(n: u64) -> Expr {
        Expr::constant(Value::Count(n))
    }

    fn first_error(ctx: &BindContext) -> &BindError {
        &ctx.diagnostics()
            .errors()
            .next()
            .expect("an error was reported")
            .error
    }

    #[test]
    fn plain_global_binds() {
        let mut ctx = BindContext::with_defaults();
        let x = ctx.global("x");
        assert!(ctx.bind_global(x, VarDecl::typed(count())));
        assert!(ctx.diagnostics().is_empty());
        assert!(ctx.ident(x).value().is_none());
    }

    #[test]
    fn redeclaration_without_anything_fails() {
        let mut ctx = BindContext::with_defaults();
        let x = ctx.global("x");
        ctx.bind_global(x, VarDecl::typed(count()));
        assert!(!ctx.bind_global(x, VarDecl::typed(count())));
        assert!(matches!(first_error(&ctx), BindError::AlreadyDefined { .. }));
    }

    #[test]
    fn redeclaration_with_init_warns() {
        let mut ctx = BindContext::with_defaults();
        let x = ctx.global("x");
        ctx.bind_global(x, VarDecl::typed(count()));
        assert!(ctx.bind_global(x, VarDecl::typed(count()).init(c(3))));
        assert!(ctx.diagnostics().has_warnings());
        assert!(!ctx.diagnostics().has_errors());
        assert_eq!(ctx.ident(x).value(), Some(&Value::Count(3)));
    }

    #[test]
    fn warning_can_be_disabled() {
        let mut ctx = BindContext::new(
            crate::BindOptions::default().with_warn_missing_redef(false),
            crate::LiteralEvaluator,
        );
        let x = ctx.global("x");
        ctx.bind_global(x, VarDecl::typed(count()));
        ctx.bind_global(x, VarDecl::typed(count()).init(c(3)));
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn strict_redef_rejects_initializing_non_redefinable() {
        let mut ctx = BindContext::new(
            crate::BindOptions::default().with_strict_redef(true),
            crate::LiteralEvaluator,
        );
        let x = ctx.global("x");
        ctx.bind_global(x, VarDecl::typed(count()).init(c(1)));
        assert!(!ctx.bind_global(x, VarDecl::new().init(c(2)).redef()));
        assert!(matches!(first_error(&ctx), BindError::AlreadyDefined { .. }));
        assert_eq!(ctx.ident(x).value(), Some(&Value::Count(1)));
    }

    #[test]
    fn redef_of_undeclared() {
        let mut ctx = BindContext::with_defaults();
        let x = ctx.global("x");
        assert!(!ctx.bind_global(x, VarDecl::new().init(c(1)).redef()));
        assert!(matches!(first_error(&ctx), BindError::RedefOfUndeclared { .. }));
        assert!(ctx.ident(x).ty().is_none());
    }

    #[test]
    fn type_inferred_from_initializer() {
        let mut ctx = BindContext::with_defaults();
        let x = ctx.global("x");
        assert!(ctx.bind_global(x, VarDecl::new().init(Expr::constant(Value::string("hi")))));
        assert_eq!(ctx.ident(x).ty().unwrap().to_string(), "string");
    }

    #[test]
    fn no_type_and_no_init() {
        let mut ctx = BindContext::with_defaults();
        let x = ctx.global("x");
        assert!(!ctx.bind_global(x, VarDecl::new()));
        assert!(matches!(first_error(&ctx), BindError::NoTypeDerivable { .. }));
    }

    #[test]
    fn underivable_init_assigns_error_type() {
        let mut ctx = BindContext::with_defaults();
        let x = ctx.global("x");
        let call = Expr::call(c(0), vec![]);
        assert!(!ctx.bind_global(x, VarDecl::new().init(call)));
        assert!(ctx.ident(x).ty().unwrap().is_error());
    }

    #[test]
    fn set_elements_become_initializer() {
        let mut ctx = BindContext::with_defaults();
        let s = ctx.global("s");
        let ty = Type::set_with_elements(vec![count()], Expr::list(vec![c(1), c(2)]));
        assert!(ctx.bind_global(s, VarDecl::typed(ty)));
        let v = ctx.ident(s).value().unwrap().as_table().unwrap().borrow().len();
        assert_eq!(v, 2);
    }

    #[test]
    fn set_elements_and_initializer_conflict() {
        let mut ctx = BindContext::with_defaults();
        let s = ctx.global("s");
        let ty = Type::set_with_elements(vec![count()], Expr::list(vec![c(1)]));
        assert!(!ctx.bind_global(s, VarDecl::typed(ty).init(Expr::set_ctor(vec![c(2)], None))));
        assert!(matches!(first_error(&ctx), BindError::DoubleInitialization { .. }));
    }

    #[test]
    fn redef_table_assign_defaults_to_extra() {
        let mut ctx = BindContext::with_defaults();
        let t = ctx.global("t");
        let ty = Type::table(vec![count()], Type::base(BaseKind::String));
        let redef_attr = vec![Attr::new(AttrTag::Redef)];
        ctx.bind_global(
            t,
            VarDecl::typed(ty)
                .init(Expr::table_ctor(vec![(c(1), Expr::constant(Value::string("a")))], None))
                .with_attrs(redef_attr),
        );

        // redef t[2] = "b";
        let entry = Expr::assign(Expr::list(vec![c(2)]), Expr::constant(Value::string("b")));
        let decl = VarDecl {
            init: Some(entry),
            kind: DeclKind::Redef,
            ..VarDecl::default()
        };
        assert!(ctx.bind_global(t, decl));

        let table = ctx.ident(t).value().unwrap().as_table().unwrap().borrow();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn const_without_init() {
        let mut ctx = BindContext::with_defaults();
        let x = ctx.global("x");
        assert!(!ctx.bind_global(x, VarDecl::typed(count()).constant()));
        assert!(matches!(first_error(&ctx), BindError::ConstWithoutInitializer { .. }));
        assert!(ctx.ident(x).is_const());
    }

    #[test]
    fn const_with_redef_attr_needs_no_init() {
        let mut ctx = BindContext::with_defaults();
        let x = ctx.global("x");
        assert!(ctx.bind_global(
            x,
            VarDecl::typed(count())
                .with_attrs(vec![Attr::new(AttrTag::Redef)])
                .constant()
        ));
    }

    #[test]
    fn option_without_init() {
        let mut ctx = BindContext::with_defaults();
        let x = ctx.global("x");
        assert!(!ctx.bind_global(x, VarDecl::typed(count()).option()));
        assert!(matches!(first_error(&ctx), BindError::OptionWithoutInitializer { .. }));
        assert!(ctx.ident(x).is_option());
    }

    #[test]
    fn invalid_attribute_is_reported_and_dropped() {
        let mut ctx = BindContext::with_defaults();
        let x = ctx.global("x");
        assert!(!ctx.bind_global(
            x,
            VarDecl::typed(count()).with_attrs(vec![Attr::new(AttrTag::Optional)])
        ));
        assert!(matches!(
            first_error(&ctx),
            BindError::InvalidAttribute {
                tag: AttrTag::Optional,
                ..
            }
        ));
        assert!(ctx.ident(x).find_attr(AttrTag::Optional).is_none());
    }

    #[test]
    fn ctor_attrs_propagate() {
        let mut ctx = BindContext::with_defaults();
        let t = ctx.global("t");
        let attrs = Attributes::from_attrs([Attr::with_expr(AttrTag::Default, c(0))]);
        let init = Expr::table_ctor(vec![(c(1), c(10))], Some(attrs));
        assert!(ctx.bind_global(t, VarDecl::new().init(init)));
        assert!(ctx.ident(t).find_attr(AttrTag::Default).is_some());

        let table = ctx.ident(t).value().unwrap().as_table().unwrap().borrow();
        assert_eq!(table.lookup(&[Value::Count(99)]), Some(Value::Count(0)));
    }

    #[test]
    fn record_global_gets_aggregate() {
        let mut ctx = BindContext::with_defaults();
        let r = ctx.global("r");
        let ty = Type::record(vec![TypeDecl::new("n", count())]);
        assert!(ctx.bind_global(r, VarDecl::typed(ty.clone())));
        assert!(matches!(ctx.ident(r).value(), Some(Value::Record(_))));

        let r2 = ctx.global("r2");
        let init = Expr::record_ctor(vec![("n", c(4))]);
        assert!(ctx.bind_global(r2, VarDecl::typed(ty).init(init)));
        let rec = ctx.ident(r2).value().unwrap().as_record().unwrap().borrow();
        assert_eq!(rec.get_by_name("n"), Some(&Value::Count(4)));
    }

    #[test]
    fn failed_initializer_is_reported() {
        let mut ctx = BindContext::with_defaults();
        let x = ctx.global("x");
        let bad = Expr::constant(Value::string("nope"));
        assert!(!ctx.bind_global(x, VarDecl::typed(count()).init(bad)));
        assert!(matches!(first_error(&ctx), BindError::InitializationFailed { .. }));
        assert!(ctx.ident(x).value().is_none());
    }

    #[test]
    fn record_initializer_of_another_type_is_rejected() {
        let mut ctx = BindContext::with_defaults();
        let b = ctx.global("b");
        let s_ty = Type::record(vec![TypeDecl::new("s", Type::base(BaseKind::String))]);
        assert!(ctx.bind_global(
            b,
            VarDecl::typed(s_ty).init(Expr::record_ctor(vec![("s", Expr::constant(Value::string("oops")))]))
        ));

        let a = ctx.global("a");
        let n_ty = Type::record(vec![TypeDecl::new("n", count())]);
        assert!(!ctx.bind_global(a, VarDecl::typed(n_ty.clone()).init(Expr::name(b))));
        assert!(matches!(first_error(&ctx), BindError::InitializationFailed { .. }));
        assert!(ctx.ident(a).value().is_none());

        let src = ctx.global("src");
        ctx.bind_global(src, VarDecl::typed(n_ty.clone()).init(Expr::record_ctor(vec![("n", c(4))])));
        let copy = ctx.global("copy");
        assert!(ctx.bind_global(copy, VarDecl::typed(n_ty).init(Expr::name(src))));
        let rec = ctx.ident(copy).value().unwrap().as_record().unwrap().borrow();
        assert_eq!(rec.get_by_name("n"), Some(&Value::Count(4)));
    }

    #[test]
    fn set_initializer_of_another_index_type_is_rejected() {
        let mut ctx = BindContext::with_defaults();
        let src = ctx.global("src");
        ctx.bind_global(
            src,
            VarDecl::typed(Type::set(vec![Type::base(BaseKind::String)]))
                .init(Expr::set_ctor(vec![Expr::constant(Value::string("x"))], None)),
        );

        let dst = ctx.global("dst");
        assert!(!ctx.bind_global(dst, VarDecl::typed(Type::set(vec![count()])).init(Expr::name(src))));
        assert!(matches!(first_error(&ctx), BindError::InitializationFailed { .. }));
        assert!(ctx.ident(dst).value().is_none());
    }

    #[test]
    fn count_too_large_for_int_is_rejected() {
        let mut ctx = BindContext::with_defaults();
        let x = ctx.global("x");
        let big = Expr::constant(Value::Count(u64::MAX));
        assert!(!ctx.bind_global(x, VarDecl::typed(Type::base(BaseKind::Int)).init(big)));
        assert!(matches!(first_error(&ctx), BindError::InitializationFailed { .. }));
        assert!(ctx.ident(x).value().is_none());

        let y = ctx.global("y");
        assert!(ctx.bind_global(y, VarDecl::typed(Type::base(BaseKind::Int)).init(c(7))));
        assert_eq!(ctx.ident(y).value(), Some(&Value::Int(7)));
    }

    #[test]
    fn event_declaration_binds_placeholder() {
        let mut ctx = BindContext::with_defaults();
        let e = ctx.global("connection_seen");
        let ty = Type::func(FuncFlavor::Event, vec![TypeDecl::new("c", count())], None);
        assert!(ctx.bind_global(e, VarDecl::typed(ty)));
        let f = ctx.ident(e).value().unwrap().as_func().unwrap().clone();
        assert_eq!(f.flavor(), FuncFlavor::Event);
        assert_eq!(f.total_bodies(), 0);
    }

    #[test]
    fn function_type_redeclaration_adds_overload() {
        let mut ctx = BindContext::with_defaults();
        let f = ctx.global("f");
        let by_count = Type::func(FuncFlavor::Function, vec![TypeDecl::new("x", count())], None);
        let by_addr = Type::func(
            FuncFlavor::Function,
            vec![TypeDecl::new("x", Type::base(BaseKind::Addr))],
            None,
        );
        ctx.bind_global(f, VarDecl::typed(by_count.clone()));
        assert!(ctx.bind_global(f, VarDecl::typed(by_addr)));
        assert_eq!(ctx.ident(f).ty().unwrap().as_func().unwrap().num_overloads(), 2);

        assert!(!ctx.bind_global(f, VarDecl::typed(by_count)));
        assert!(matches!(first_error(&ctx), BindError::DuplicateOverloadSignature { .. }));
    }

    #[test]
    fn local_with_init_returns_assignment() {
        let mut ctx = BindContext::with_defaults();
        ctx.push_scope(netpolicy_core::Scope::default());
        let x = ctx.local("x").unwrap();
        let stmt = ctx.bind_local(x, VarDecl::typed(count()).init(c(1)));
        assert!(matches!(
            stmt.as_expr().map(|e| &e.kind),
            Some(ExprKind::Assign { .. })
        ));
        assert!(ctx.ident(x).value().is_none());
        assert!(ctx.current_scope().unwrap().inits().is_empty());
    }

    #[test]
    fn local_without_init_registers_frame_init() {
        let mut ctx = BindContext::with_defaults();
        ctx.push_scope(netpolicy_core::Scope::default());
        let x = ctx.local("x").unwrap();
        let stmt = ctx.bind_local(x, VarDecl::typed(count()));
        assert!(stmt.is_null());
        assert_eq!(ctx.current_scope().unwrap().inits(), &[x]);
    }

    #[test]
    fn local_additive_init_rejected() {
        let mut ctx = BindContext::with_defaults();
        ctx.push_scope(netpolicy_core::Scope::default());
        let x = ctx.local("x").unwrap();
        ctx.bind_local(
            x,
            VarDecl::typed(Type::set(vec![count()])).with_init(InitClass::Extra, Expr::set_ctor(vec![c(1)], None)),
        );
        assert!(matches!(first_error(&ctx), BindError::LocalInitClass { .. }));
    }

    #[test]
    fn local_redeclaration_is_already_defined() {
        let mut ctx = BindContext::with_defaults();
        ctx.push_scope(netpolicy_core::Scope::default());
        let x = ctx.local("x").unwrap();
        ctx.bind_local(x, VarDecl::typed(count()));
        ctx.bind_local(x, VarDecl::typed(count()).init(c(2)));
        let kinds: Vec<_> = ctx.diagnostics().iter().map(|d| d.kind).collect();
        assert!(kinds.contains(&DiagnosticKind::Error));
        assert!(matches!(first_error(&ctx), BindError::AlreadyDefined { .. }));
    }

    #[test]
    fn loop_variable_binding() {
        let mut ctx = BindContext::with_defaults();
        ctx.push_scope(netpolicy_core::Scope::default());
        let i = ctx.local("i").unwrap();
        let e = ctx.bind_and_assign_local(i, c(0), Some(Value::Count(0)));
        assert!(e.is_assign());
        assert_eq!(ctx.ident(i).ty().unwrap().to_string(), "count");
    }
}
