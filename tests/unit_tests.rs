//! End-to-end tests for the binder through the `netpolicy` facade.
//!
//! Each section drives a `BindContext` the way a loader would: one
//! declaration at a time, with AST fragments built by hand instead of
//! parsed from source.

use std::rc::Rc;

use netpolicy::prelude::*;
use netpolicy::{Diagnostics, LoadError};

fn count() -> TypeRef {
    Type::base(BaseKind::Count)
}

fn addr() -> TypeRef {
    Type::base(BaseKind::Addr)
}

fn c(n: u64) -> Expr {
    Expr::constant(Value::Count(n))
}

fn sig(flavor: FuncFlavor, params: Vec<(&str, TypeRef)>) -> TypeRef {
    Type::func(
        flavor,
        params
            .into_iter()
            .map(|(n, t)| TypeDecl::new(n, t))
            .collect(),
        None,
    )
}

fn define(ctx: &mut BindContext, id: IdentId, flavor: FuncFlavor, ty: TypeRef, body: Stmt) {
    ctx.begin_function(id, GLOBAL_MODULE_NAME, flavor, false, ty, None, Span::default())
        .expect("function header binds");
    ctx.end_function(body).expect("function scope closes");
}

fn error_kinds(diagnostics: &Diagnostics) -> Vec<&BindError> {
    diagnostics.errors().map(|d| &d.error).collect()
}

/// Sums counts for `&add_func` hooks; defers everything else to the
/// literal evaluator.
struct SummingEvaluator;

impl Evaluator for SummingEvaluator {
    fn init_type(&self, init: &Expr, symbols: &SymbolTable) -> Option<TypeRef> {
        LiteralEvaluator.init_type(init, symbols)
    }

    fn init_val(
        &self,
        init: &Expr,
        ty: &TypeRef,
        aggr: Option<&Value>,
        symbols: &SymbolTable,
    ) -> Result<Value, EvalError> {
        LiteralEvaluator.init_val(init, ty, aggr, symbols)
    }

    fn apply_update(
        &self,
        _hook: &Expr,
        current: Option<&Value>,
        update: &Expr,
        _ty: &TypeRef,
        _symbols: &SymbolTable,
    ) -> Result<Value, EvalError> {
        let base = match current {
            Some(Value::Count(n)) => *n,
            _ => 0,
        };
        match &update.kind {
            ExprKind::Const(Value::Count(n)) => Ok(Value::Count(base + n)),
            _ => Err(EvalError::Unsupported("non-count update")),
        }
    }
}

// =============================================================================
// Global declarations
// =============================================================================

#[test]
fn test_fresh_globals_bind_and_plain_redeclaration_fails() {
    let mut ctx = BindContext::with_defaults();
    for name in ["a", "b", "c"] {
        let id = ctx.global(name);
        assert!(ctx.bind_global(id, VarDecl::typed(count())));
    }
    assert!(ctx.diagnostics().is_empty());

    let b = ctx.global("b");
    assert!(!ctx.bind_global(b, VarDecl::typed(count())));
    assert!(matches!(
        error_kinds(ctx.diagnostics())[..],
        [BindError::AlreadyDefined { .. }]
    ));
}

#[test]
fn test_redef_with_equal_type_updates_value() {
    let mut ctx = BindContext::with_defaults();
    let x = ctx.global("watch_limit");
    ctx.bind_global(
        x,
        VarDecl::typed(count())
            .init(c(10))
            .with_attrs(vec![Attr::new(AttrTag::Redef)]),
    );
    assert!(ctx.bind_global(x, VarDecl::typed(count()).init(c(25)).redef()));
    assert_eq!(ctx.ident(x).value(), Some(&Value::Count(25)));
    assert!(ctx.diagnostics().is_empty());
}

#[test]
fn test_type_mismatch_fails_with_or_without_redef() {
    let mut ctx = BindContext::with_defaults();
    let x = ctx.global("x");
    ctx.bind_global(
        x,
        VarDecl::typed(count())
            .init(c(1))
            .with_attrs(vec![Attr::new(AttrTag::Redef)]),
    );

    let other = Expr::constant(Value::string("nope"));
    assert!(!ctx.bind_global(
        x,
        VarDecl::typed(Type::base(BaseKind::String)).init(other.clone()).redef()
    ));
    assert!(!ctx.bind_global(
        x,
        VarDecl::typed(Type::base(BaseKind::String)).init(other)
    ));

    let mismatches = error_kinds(ctx.diagnostics())
        .into_iter()
        .filter(|e| matches!(e, BindError::RedefinitionTypeMismatch { .. }))
        .count();
    assert_eq!(mismatches, 2);
    assert_eq!(ctx.ident(x).value(), Some(&Value::Count(1)));
}

#[test]
fn test_const_requires_initializer_and_blocks_assignment() {
    let mut ctx = BindContext::with_defaults();
    let bare = ctx.global("bare");
    assert!(!ctx.bind_global(bare, VarDecl::typed(count()).constant()));
    assert!(matches!(
        error_kinds(ctx.diagnostics())[..],
        [BindError::ConstWithoutInitializer { .. }]
    ));

    let fixed = ctx.global("fixed");
    assert!(ctx.bind_global(fixed, VarDecl::typed(count()).init(c(3)).constant()));
    let err = ctx
        .symbols_mut()
        .assign(fixed, Value::Count(4), Span::new(9, 1, 1))
        .unwrap_err();
    assert!(matches!(err, BindError::AssignToConst { .. }));
    assert_eq!(ctx.ident(fixed).value(), Some(&Value::Count(3)));
}

#[test]
fn test_aggregates_exist_after_binding() {
    let mut ctx = BindContext::with_defaults();
    let rec_ty = Type::record(vec![TypeDecl::new("hits", count())]);

    let r = ctx.global("r");
    let t = ctx.global("t");
    let v = ctx.global("v");
    assert!(ctx.bind_global(r, VarDecl::typed(rec_ty.clone())));
    assert!(ctx.bind_global(t, VarDecl::typed(Type::table(vec![addr()], count()))));
    assert!(ctx.bind_global(v, VarDecl::typed(Type::vector(count()))));
    assert!(matches!(ctx.ident(r).value(), Some(Value::Record(_))));
    assert!(matches!(ctx.ident(t).value(), Some(Value::Table(_))));
    assert!(matches!(ctx.ident(v).value(), Some(Value::Vector(_))));

    let filled = ctx.global("filled");
    assert!(ctx.bind_global(
        filled,
        VarDecl::typed(Type::vector(count())).init(Expr::vector_ctor(vec![c(1), c(2), c(3)]))
    ));
    let values: Vec<Value> = ctx
        .ident(filled)
        .value()
        .unwrap()
        .as_vector()
        .unwrap()
        .borrow()
        .iter()
        .cloned()
        .collect();
    assert_eq!(values, vec![Value::Count(1), Value::Count(2), Value::Count(3)]);

    let rec = ctx.global("rec");
    assert!(ctx.bind_global(
        rec,
        VarDecl::typed(rec_ty).init(Expr::record_ctor(vec![("hits", c(7))]))
    ));
    let hits = ctx
        .ident(rec)
        .value()
        .unwrap()
        .as_record()
        .unwrap()
        .borrow()
        .get_by_name("hits")
        .cloned();
    assert_eq!(hits, Some(Value::Count(7)));
}

#[test]
fn test_additive_redef_runs_hook() {
    let mut ctx = BindContext::new(BindOptions::default(), SummingEvaluator);
    let hook = ctx.global("sum_hook");
    let x = ctx.global("budget");
    assert!(ctx.bind_global(
        x,
        VarDecl::typed(count()).init(c(1)).with_attrs(vec![
            Attr::new(AttrTag::Redef),
            Attr::with_expr(AttrTag::AddFunc, Expr::name(hook)),
        ])
    ));

    // redef budget += 5;
    assert!(ctx.bind_global(x, VarDecl::new().with_init(InitClass::Extra, c(5)).redef()));
    assert_eq!(ctx.ident(x).value(), Some(&Value::Count(6)));
    assert!(ctx.diagnostics().is_empty());
}

#[test]
fn test_additive_redef_merges_into_set() {
    let mut ctx = BindContext::with_defaults();
    let s = ctx.global("ports");
    ctx.bind_global(
        s,
        VarDecl::typed(Type::set(vec![count()]))
            .init(Expr::set_ctor(vec![c(22)], None))
            .with_attrs(vec![Attr::new(AttrTag::Redef)]),
    );
    assert!(ctx.bind_global(
        s,
        VarDecl::new()
            .with_init(InitClass::Extra, Expr::set_ctor(vec![c(80), c(443)], None))
            .redef()
    ));
    assert_eq!(ctx.lookup_list("ports").unwrap().len(), 3);

    assert!(ctx.bind_global(
        s,
        VarDecl::new()
            .with_init(InitClass::Remove, Expr::set_ctor(vec![c(22)], None))
            .redef()
    ));
    assert_eq!(
        ctx.lookup_list("ports").unwrap(),
        vec![Value::Count(80), Value::Count(443)]
    );
}

#[test]
fn test_module_qualified_globals() {
    let mut ctx = BindContext::with_defaults();
    ctx.set_current_module("Site");
    let id = ctx.global("threshold");
    ctx.bind_global(id, VarDecl::typed(count()).init(c(5)));
    assert_eq!(ctx.ident(id).name(), "Site::threshold");

    assert_eq!(ctx.lookup_optional_count("Site::threshold"), Ok(5));
    assert_eq!(ctx.lookup_optional("threshold"), None);
    assert_eq!(ctx.lookup_id("threshold", "Site", false, false), Some(id));
}

// =============================================================================
// Functions, events and hooks
// =============================================================================

#[test]
fn test_overloads_by_parameter_type() {
    let mut ctx = BindContext::with_defaults();
    let f = ctx.global("describe");
    let body = Stmt::ret(None);
    define(&mut ctx, f, FuncFlavor::Function, sig(FuncFlavor::Function, vec![("x", count())]), body.clone());
    define(&mut ctx, f, FuncFlavor::Function, sig(FuncFlavor::Function, vec![("x", addr())]), body.clone());
    assert!(ctx.diagnostics().is_empty());

    let val = ctx.lookup_func("describe").unwrap();
    assert_eq!(val.num_overloads(), 2);
    assert!(val.has_body(0) && val.has_body(1));

    define(&mut ctx, f, FuncFlavor::Function, sig(FuncFlavor::Function, vec![("y", count())]), body);
    assert!(matches!(
        error_kinds(ctx.diagnostics())[..],
        [BindError::AlreadyDefined { .. }]
    ));
}

#[test]
fn test_defaults_survive_redeclaration() {
    let mut ctx = BindContext::with_defaults();
    let f = ctx.global("scan");
    let dflt = Attributes::from_attrs([Attr::with_expr(AttrTag::Default, c(30))]);
    let proto = Type::func(
        FuncFlavor::Function,
        vec![
            TypeDecl::new("host", addr()),
            TypeDecl::new("timeout", count()).with_attrs(dflt),
        ],
        None,
    );
    assert!(ctx.bind_global(f, VarDecl::typed(proto)));

    let header = sig(FuncFlavor::Function, vec![("h", addr()), ("t", count())]);
    define(&mut ctx, f, FuncFlavor::Function, header.clone(), Stmt::null());

    let args = header.as_func().unwrap().args();
    let fields = args.fields();
    let kept = fields[1].find_attr(AttrTag::Default).unwrap();
    assert_eq!(kept.const_value(), Some(&Value::Count(30)));
}

#[test]
fn test_forward_declared_event_receives_body() {
    let mut ctx = BindContext::with_defaults();
    let e = ctx.global("connection_established");
    let ty = sig(FuncFlavor::Event, vec![("c", count())]);
    assert!(ctx.bind_global(e, VarDecl::typed(ty.clone())));

    let forward = ctx.lookup_func("connection_established").unwrap();
    assert_eq!(forward.total_bodies(), 0);
    let globals_before = ctx.symbols().num_globals();

    define(&mut ctx, e, FuncFlavor::Event, ty, Stmt::null());
    let bound = ctx.lookup_func("connection_established").unwrap();
    assert!(Rc::ptr_eq(&forward, &bound));
    assert_eq!(bound.total_bodies(), 1);
    assert_eq!(ctx.symbols().num_globals(), globals_before);
    assert!(ctx.handlers().unused_handlers().contains(&"connection_established".to_string()));
}

#[test]
fn test_lambda_capture_is_reported_per_reference() {
    let mut ctx = BindContext::with_defaults();
    let g = ctx.global("site_name");
    ctx.bind_global(g, VarDecl::typed(Type::base(BaseKind::String)));

    let outer = ctx.global("outer");
    ctx.begin_function(
        outer,
        GLOBAL_MODULE_NAME,
        FuncFlavor::Function,
        false,
        sig(FuncFlavor::Function, vec![("conn", count())]),
        None,
        Span::default(),
    )
    .unwrap();
    let conn = ctx.lookup_id("conn", GLOBAL_MODULE_NAME, false, false).unwrap();

    let lambda = ctx
        .begin_lambda(GLOBAL_MODULE_NAME, sig(FuncFlavor::Function, vec![]), None, Span::default())
        .unwrap();
    let body = Stmt::list(vec![
        Stmt::expr(Expr::name(conn).at(Span::new(12, 3, 1))),
        Stmt::expr(Expr::name(g).at(Span::new(13, 3, 1))),
    ]);
    ctx.end_function(body).unwrap();
    ctx.end_function(Stmt::expr(Expr::lambda(lambda, Stmt::null()))).unwrap();

    let captures: Vec<Span> = ctx
        .diagnostics()
        .errors()
        .filter(|d| matches!(d.error, BindError::UnsupportedOuterCapture { .. }))
        .map(|d| d.error.span())
        .collect();
    assert_eq!(captures, vec![Span::new(12, 3, 1)]);

    let sibling = ctx.global("sibling");
    assert!(ctx.bind_global(sibling, VarDecl::typed(count()).init(c(1))));
    assert_eq!(ctx.diagnostics().error_count(), 1);
}

// =============================================================================
// Runtime lookups and session lifecycle
// =============================================================================

#[test]
fn test_optional_versus_required_lookup() {
    let ctx = BindContext::with_defaults();
    assert_eq!(ctx.lookup_optional("udp_inactivity_timeout"), None);
    assert_eq!(
        ctx.lookup_required("udp_inactivity_timeout"),
        Err(FatalError::RequiredGlobalMissing {
            name: "udp_inactivity_timeout".into()
        })
    );
}

#[test]
fn test_record_extension_reaches_lookup_type() {
    let mut ctx = BindContext::with_defaults();
    let id = ctx.global("conn_info");
    ctx.declare_type(id, Type::record(vec![TypeDecl::new("uid", count())]), None);

    let opt = Attributes::from_attrs([Attr::new(AttrTag::Optional)]);
    assert!(ctx.redef_record(
        "conn_info",
        vec![TypeDecl::new("service", Type::base(BaseKind::String)).with_attrs(opt)],
        Span::default()
    ));
    let ty = ctx.lookup_type("conn_info").unwrap();
    assert_eq!(ty.as_record().unwrap().num_fields(), 2);
}

#[test]
fn test_clean_session_finishes() {
    let mut ctx = BindContext::with_defaults();
    let f = ctx.global("helper");
    define(&mut ctx, f, FuncFlavor::Function, sig(FuncFlavor::Function, vec![]), Stmt::null());

    let (summary, functions) = netpolicy::finish(ctx).unwrap();
    assert!(summary.is_clean());
    assert_eq!(summary.functions_retained, 1);
    assert_eq!(functions.len(), 1);
}

#[test]
fn test_rejected_session_keeps_diagnostics() {
    let mut ctx = BindContext::with_defaults();
    let x = ctx.global("x");
    ctx.bind_global(x, VarDecl::typed(count()));
    ctx.bind_global(x, VarDecl::typed(count()));

    match netpolicy::finish(ctx) {
        Err(LoadError::Rejected {
            errors,
            diagnostics,
            ..
        }) => {
            assert_eq!(errors, 1);
            let mut out = Vec::new();
            diagnostics.emit(&mut out).unwrap();
            let text = String::from_utf8(out).unwrap();
            assert!(text.contains("'x' already defined"));
        }
        other => panic!("expected a rejected load, got {other:?}"),
    }
}

#[test]
fn test_options_from_lookup() {
    let opts = BindOptions::from_lookup(|key| match key {
        "NETPOLICY_STRICT_REDEF" => Some("true".into()),
        "NETPOLICY_INNER_LAMBDAS" => Some("0".into()),
        _ => None,
    });
    assert!(opts.strict_redef);
    assert!(!opts.search_inner_lambdas);
}
