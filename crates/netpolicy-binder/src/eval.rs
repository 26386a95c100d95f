//! The initializer-evaluation seam.
//!
//! The binder never evaluates expressions itself. It asks an [`Evaluator`]
//! for the static type of an initializer and for the value it produces,
//! and treats any [`EvalError`] as "no value produced".
//!
//! [`LiteralEvaluator`] covers constants, names and constructor literals,
//! which is everything a load-time declaration normally needs. Embedders
//! with a full interpreter plug in their own implementation.

use netpolicy_core::{
    EvalError, Expr, ExprKind, RecordRef, Type, TypeDecl, TypeKind, TypeRef, Value,
};
use netpolicy_core::types::BaseKind;
use netpolicy_registry::SymbolTable;

/// Evaluates initializer expressions on behalf of the binder.
pub trait Evaluator {
    /// Static type of `init`, if it can be derived.
    fn init_type(&self, init: &Expr, symbols: &SymbolTable) -> Option<TypeRef>;

    /// Value of `init` coerced to `ty`.
    ///
    /// When `aggr` is given the initializer's contents are written into that
    /// aggregate, which is then returned.
    fn init_val(
        &self,
        init: &Expr,
        ty: &TypeRef,
        aggr: Option<&Value>,
        symbols: &SymbolTable,
    ) -> Result<Value, EvalError>;

    /// Run an `&add_func`/`&del_func` hook: `hook(current, update)`.
    fn apply_update(
        &self,
        hook: &Expr,
        current: Option<&Value>,
        update: &Expr,
        ty: &TypeRef,
        symbols: &SymbolTable,
    ) -> Result<Value, EvalError>;
}

/// Evaluator for literal initializers. Performs no arithmetic.
#[derive(Debug, Default, Clone, Copy)]
pub struct LiteralEvaluator;

impl Evaluator for LiteralEvaluator {
    fn init_type(&self, init: &Expr, symbols: &SymbolTable) -> Option<TypeRef> {
        match &init.kind {
            ExprKind::Const(v) => value_type(v),
            ExprKind::Name { id, .. } | ExprKind::Lambda { id, .. } => {
                symbols.get(*id).ty().cloned()
            }
            ExprKind::List(items) if items.len() == 1 => self.init_type(&items[0], symbols),
            ExprKind::SetConstructor { ty: Some(t), .. }
            | ExprKind::TableConstructor { ty: Some(t), .. } => Some(t.clone()),
            ExprKind::SetConstructor { elements, .. } => {
                let first = elements.first()?;
                Some(Type::set(self.index_types(first, symbols)?))
            }
            ExprKind::TableConstructor { entries, .. } => {
                let ExprKind::Assign { lhs, rhs, .. } = &entries.first()?.kind else {
                    return None;
                };
                let indices = self.index_types(lhs, symbols)?;
                Some(Type::table(indices, self.init_type(rhs, symbols)?))
            }
            ExprKind::VectorConstructor { elements } => {
                Some(Type::vector(self.init_type(elements.first()?, symbols)?))
            }
            ExprKind::RecordConstructor { fields } => {
                let decls = fields
                    .iter()
                    .map(|(name, e)| Some(TypeDecl::new(name.clone(), self.init_type(e, symbols)?)))
                    .collect::<Option<Vec<_>>>()?;
                Some(Type::record(decls))
            }
            ExprKind::RecordCoerce { ty, .. } => Some(ty.clone()),
            _ => None,
        }
    }

    fn init_val(
        &self,
        init: &Expr,
        ty: &TypeRef,
        aggr: Option<&Value>,
        symbols: &SymbolTable,
    ) -> Result<Value, EvalError> {
        match &init.kind {
            ExprKind::Const(v) => place(v, ty, aggr),
            ExprKind::Name { id, .. } | ExprKind::Lambda { id, .. } => {
                let ident = symbols.get(*id);
                let v = ident
                    .value()
                    .ok_or_else(|| EvalError::Unset(ident.name().to_string()))?;
                place(v, ty, aggr)
            }
            ExprKind::List(items)
            | ExprKind::SetConstructor {
                elements: items, ..
            }
            | ExprKind::TableConstructor { entries: items, .. }
            | ExprKind::VectorConstructor { elements: items } => {
                if !ty.is_aggregate() {
                    return match items.as_slice() {
                        [single] => self.init_val(single, ty, None, symbols),
                        _ => Err(EvalError::TypeClash(format!(
                            "list initializer for non-aggregate type {ty}"
                        ))),
                    };
                }
                let target = target_aggregate(ty, aggr, init)?;
                self.fill(items, ty, &target, symbols)?;
                Ok(target)
            }
            ExprKind::RecordConstructor { fields } => {
                let rt = ty
                    .as_record()
                    .map_err(|e| EvalError::TypeClash(e.to_string()))?;
                let mut values = Vec::with_capacity(fields.len());
                for (name, e) in fields {
                    let idx = rt
                        .field_index(name)
                        .ok_or_else(|| EvalError::TypeClash(format!("no field '{name}' in {ty}")))?;
                    let fty = rt
                        .field_type(idx)
                        .ok_or_else(|| EvalError::TypeClash(format!("no field '{name}' in {ty}")))?;
                    values.push((idx, self.init_val(e, &fty, None, symbols)?));
                }
                let target = target_aggregate(ty, aggr, init)?;
                let rec = target.as_record()?;
                let mut rec = rec.borrow_mut();
                for (idx, v) in values {
                    rec.set(idx, Some(v));
                }
                drop(rec);
                Ok(target)
            }
            ExprKind::RecordCoerce { expr, ty: rt } => self.init_val(expr, rt, aggr, symbols),
            // `redef t[k] = v`
            ExprKind::Assign { .. } if ty.is_table() => {
                let target = target_aggregate(ty, aggr, init)?;
                self.fill(std::slice::from_ref(init), ty, &target, symbols)?;
                Ok(target)
            }
            _ => Err(EvalError::Unsupported(init.tag_name())),
        }
    }

    fn apply_update(
        &self,
        _hook: &Expr,
        _current: Option<&Value>,
        _update: &Expr,
        _ty: &TypeRef,
        _symbols: &SymbolTable,
    ) -> Result<Value, EvalError> {
        Err(EvalError::Unsupported("&add_func/&del_func hook call"))
    }
}

impl LiteralEvaluator {
    fn index_types(&self, key: &Expr, symbols: &SymbolTable) -> Option<Vec<TypeRef>> {
        match &key.kind {
            ExprKind::List(items) => items.iter().map(|i| self.init_type(i, symbols)).collect(),
            _ => Some(vec![self.init_type(key, symbols)?]),
        }
    }

    fn key_of(
        &self,
        key: &Expr,
        indices: &[TypeRef],
        symbols: &SymbolTable,
    ) -> Result<Vec<Value>, EvalError> {
        let parts: Vec<&Expr> = match &key.kind {
            ExprKind::List(items) => items.iter().collect(),
            _ => vec![key],
        };
        if parts.len() != indices.len() {
            return Err(EvalError::TypeClash(format!(
                "index has {} components, table expects {}",
                parts.len(),
                indices.len()
            )));
        }
        parts
            .into_iter()
            .zip(indices)
            .map(|(p, t)| self.init_val(p, t, None, symbols))
            .collect()
    }

    /// Write list items into an aggregate of type `ty`.
    fn fill(
        &self,
        items: &[Expr],
        ty: &TypeRef,
        target: &Value,
        symbols: &SymbolTable,
    ) -> Result<(), EvalError> {
        match &ty.kind {
            TypeKind::Table(tt) => {
                let mut entries = Vec::with_capacity(items.len());
                for item in items {
                    match (&tt.yield_type, &item.kind) {
                        (None, _) => entries.push((self.key_of(item, &tt.indices, symbols)?, None)),
                        (Some(yt), ExprKind::Assign { lhs, rhs, .. }) => {
                            let key = self.key_of(lhs, &tt.indices, symbols)?;
                            entries.push((key, Some(self.init_val(rhs, yt, None, symbols)?)));
                        }
                        (Some(_), _) => {
                            return Err(EvalError::TypeClash(
                                "table initializer entries must be [index] = value".into(),
                            ));
                        }
                    }
                }
                let mut table = target.as_table()?.borrow_mut();
                for (key, yield_val) in entries {
                    table.insert(key, yield_val);
                }
                Ok(())
            }
            TypeKind::Vector(elem) => {
                let values = items
                    .iter()
                    .map(|i| self.init_val(i, elem, None, symbols))
                    .collect::<Result<Vec<_>, _>>()?;
                let mut vector = target.as_vector()?.borrow_mut();
                for v in values {
                    vector.push(v);
                }
                Ok(())
            }
            TypeKind::Record(_) => {
                for item in items {
                    self.init_val(item, ty, Some(target), symbols)?;
                }
                Ok(())
            }
            _ => Err(EvalError::TypeClash(format!("cannot fill {ty}"))),
        }
    }
}

fn target_aggregate(ty: &TypeRef, aggr: Option<&Value>, init: &Expr) -> Result<Value, EvalError> {
    match aggr {
        Some(a) => Ok(a.clone()),
        None => Value::empty_aggregate(ty, init.ctor_attrs())
            .ok_or_else(|| EvalError::TypeClash(format!("{ty} is not an aggregate type"))),
    }
}

/// Coerce an existing value to `ty`, copying aggregates into `aggr`.
fn place(v: &Value, ty: &Type, aggr: Option<&Value>) -> Result<Value, EvalError> {
    if !v.conforms_to(ty) {
        return Err(EvalError::TypeClash(format!(
            "{} value for {} target",
            v.kind_name(),
            ty
        )));
    }

    match (aggr, v) {
        (Some(target), Value::Record(src)) => {
            copy_record(src, target.as_record()?);
            Ok(target.clone())
        }
        (Some(target), Value::Table(_) | Value::Vector(_)) => {
            v.add_to(target)?;
            Ok(target.clone())
        }
        _ => widen(v, ty),
    }
}

fn copy_record(src: &RecordRef, dst: &RecordRef) {
    if std::rc::Rc::ptr_eq(src, dst) {
        return;
    }
    let src = src.borrow();
    let mut dst = dst.borrow_mut();
    for i in 0..src.num_fields() {
        if let Some(v) = src.get(i) {
            dst.set(i, Some(v.clone()));
        }
    }
}

fn widen(v: &Value, ty: &Type) -> Result<Value, EvalError> {
    Ok(match (&ty.kind, v) {
        (TypeKind::Base(BaseKind::Int), Value::Count(c)) => {
            let i = i64::try_from(*c)
                .map_err(|_| EvalError::TypeClash(format!("count {c} does not fit in int")))?;
            Value::Int(i)
        }
        (TypeKind::Base(BaseKind::Double), Value::Count(c)) => Value::double(*c as f64),
        (TypeKind::Base(BaseKind::Double), Value::Int(i)) => Value::double(*i as f64),
        _ => v.clone(),
    })
}

/// Static type of a constant.
fn value_type(v: &Value) -> Option<TypeRef> {
    let base = match v {
        Value::Bool(_) => BaseKind::Bool,
        Value::Int(_) => BaseKind::Int,
        Value::Count(_) => BaseKind::Count,
        Value::Double(_) => BaseKind::Double,
        Value::Time(_) => BaseKind::Time,
        Value::Interval(_) => BaseKind::Interval,
        Value::String(_) => BaseKind::String,
        Value::Pattern(_) => BaseKind::Pattern,
        Value::Port(_) => BaseKind::Port,
        Value::Addr(_) => BaseKind::Addr,
        Value::Subnet(..) => BaseKind::Subnet,
        Value::Record(r) => return Some(r.borrow().ty().clone()),
        Value::Table(t) => return Some(t.borrow().ty().clone()),
        Value::Vector(vv) => return Some(vv.borrow().ty().clone()),
        Value::Enum { .. } | Value::Func(_) => return None,
    };
    Some(Type::base(base))
}
