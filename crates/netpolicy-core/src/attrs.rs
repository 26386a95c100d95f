//! Declaration attributes (`&default`, `&redef`, `&add_func`, ...).
//!
//! An [`Attributes`] set is attached to identifiers, record fields and
//! function parameters. Lookup by tag returns the first match; sets keep at
//! most one attribute per tag because [`Attributes::add_attr`] replaces an
//! existing attribute of the same tag.

use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::ast::{Expr, ExprKind};
use crate::types::{Type, TypeKind, TypeRef};
use crate::value::Value;

/// Attribute tag.
///
/// The discriminants are the codes an external parser hands over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum AttrTag {
    Optional = 0,
    Default = 1,
    Redef = 2,
    AddFunc = 3,
    DelFunc = 4,
    ExpireFunc = 5,
    ReadExpire = 6,
    WriteExpire = 7,
    CreateExpire = 8,
    RawOutput = 9,
    Priority = 10,
    Log = 11,
    ErrorHandler = 12,
    TypeColumn = 13,
    Deprecated = 14,
}

impl AttrTag {
    /// Script spelling of the attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            AttrTag::Optional => "&optional",
            AttrTag::Default => "&default",
            AttrTag::Redef => "&redef",
            AttrTag::AddFunc => "&add_func",
            AttrTag::DelFunc => "&del_func",
            AttrTag::ExpireFunc => "&expire_func",
            AttrTag::ReadExpire => "&read_expire",
            AttrTag::WriteExpire => "&write_expire",
            AttrTag::CreateExpire => "&create_expire",
            AttrTag::RawOutput => "&raw_output",
            AttrTag::Priority => "&priority",
            AttrTag::Log => "&log",
            AttrTag::ErrorHandler => "&error_handler",
            AttrTag::TypeColumn => "&type_column",
            AttrTag::Deprecated => "&deprecated",
        }
    }
}

impl fmt::Display for AttrTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single attribute with its optional payload expression.
#[derive(Debug, Clone)]
pub struct Attr {
    pub tag: AttrTag,
    pub expr: Option<Expr>,
}

impl Attr {
    pub fn new(tag: AttrTag) -> Self {
        Self { tag, expr: None }
    }

    pub fn with_expr(tag: AttrTag, expr: Expr) -> Self {
        Self {
            tag,
            expr: Some(expr),
        }
    }

    /// The payload if it is a constant.
    pub fn const_value(&self) -> Option<&Value> {
        match self.expr.as_ref().map(|e| &e.kind) {
            Some(ExprKind::Const(v)) => Some(v),
            _ => None,
        }
    }
}

/// Where an attribute list is being attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttrContext {
    /// Attached to a record field (or function parameter).
    pub in_record: bool,
    /// Attached to a global identifier.
    pub is_global: bool,
}

/// An attribute rejected during validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrProblem {
    pub tag: AttrTag,
    pub reason: String,
}

/// Ordered attribute set, unique per tag.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    attrs: Vec<Attr>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build without validation (parser-synthesised sets, copies).
    pub fn from_attrs(list: impl IntoIterator<Item = Attr>) -> Self {
        let mut set = Self::new();
        for attr in list {
            set.add_attr(attr);
        }
        set
    }

    /// Build a set, validating every attribute against `ty`.
    ///
    /// Invalid attributes are dropped and returned as problems.
    pub fn checked(
        list: impl IntoIterator<Item = Attr>,
        ty: &TypeRef,
        ctx: AttrContext,
    ) -> (Self, Vec<AttrProblem>) {
        let mut set = Self::new();
        let mut problems = Vec::new();
        for attr in list {
            match check_attr(&attr, ty, ctx) {
                Ok(()) => set.add_attr(attr),
                Err(reason) => problems.push(AttrProblem {
                    tag: attr.tag,
                    reason,
                }),
            }
        }
        (set, problems)
    }

    /// Add an attribute, replacing any existing one with the same tag.
    pub fn add_attr(&mut self, attr: Attr) {
        self.remove(attr.tag);
        self.attrs.push(attr);
    }

    /// Merge another set in; its attributes win on tag collisions.
    pub fn merge(&mut self, other: &Attributes) {
        for attr in &other.attrs {
            self.add_attr(attr.clone());
        }
    }

    /// First attribute with `tag`.
    pub fn find(&self, tag: AttrTag) -> Option<&Attr> {
        self.attrs.iter().find(|a| a.tag == tag)
    }

    pub fn has(&self, tag: AttrTag) -> bool {
        self.find(tag).is_some()
    }

    pub fn remove(&mut self, tag: AttrTag) -> Option<Attr> {
        let pos = self.attrs.iter().position(|a| a.tag == tag)?;
        Some(self.attrs.remove(pos))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attr> {
        self.attrs.iter()
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

/// Lookup a tag in an optional raw attribute list.
pub fn find_attr(list: Option<&[Attr]>, tag: AttrTag) -> Option<&Attr> {
    list?.iter().find(|a| a.tag == tag)
}

fn check_attr(attr: &Attr, ty: &TypeRef, ctx: AttrContext) -> Result<(), String> {
    match attr.tag {
        AttrTag::Optional => {
            if !ctx.in_record {
                return Err("only valid for record fields".into());
            }
        }
        AttrTag::AddFunc | AttrTag::DelFunc => {
            if !ctx.is_global {
                return Err("only valid for global identifiers".into());
            }
            if attr.expr.is_none() {
                return Err("requires a function argument".into());
            }
        }
        AttrTag::Default => {
            let Some(expr) = &attr.expr else {
                return Err("requires a value".into());
            };
            check_default(expr, ty)?;
        }
        AttrTag::Deprecated => {
            if let Some(expr) = &attr.expr
                && !matches!(&expr.kind, ExprKind::Const(Value::String(_)))
            {
                return Err("deprecation message must be a string constant".into());
            }
        }
        AttrTag::Redef => {
            if attr.expr.is_some() {
                return Err("takes no argument".into());
            }
        }
        AttrTag::Priority => {
            if let Some(v) = attr.const_value()
                && !matches!(v, Value::Int(_) | Value::Count(_))
            {
                return Err("priority must be an integer".into());
            }
        }
        AttrTag::ExpireFunc
        | AttrTag::ReadExpire
        | AttrTag::WriteExpire
        | AttrTag::CreateExpire => {
            if !ty.is_table() {
                return Err("expiration only applies to tables and sets".into());
            }
        }
        AttrTag::RawOutput | AttrTag::Log | AttrTag::ErrorHandler | AttrTag::TypeColumn => {}
    }
    Ok(())
}

fn check_default(expr: &Expr, ty: &TypeRef) -> Result<(), String> {
    let target: &Type = match &ty.kind {
        TypeKind::Table(table) => match &table.yield_type {
            Some(yield_type) => yield_type,
            None => return Err("&default is not valid for sets".into()),
        },
        _ => ty,
    };

    if let ExprKind::Const(value) = &expr.kind
        && !value.conforms_to(target)
    {
        return Err(format!(
            "&default value has inconsistent type ({} vs {})",
            value.kind_name(),
            target
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BaseKind;

    fn default_of(v: Value) -> Attr {
        Attr::with_expr(AttrTag::Default, Expr::constant(v))
    }

    #[test]
    fn add_attr_replaces_same_tag() {
        let mut attrs = Attributes::new();
        attrs.add_attr(default_of(Value::Count(1)));
        attrs.add_attr(default_of(Value::Count(2)));
        assert_eq!(attrs.len(), 1);
        assert_eq!(
            attrs.find(AttrTag::Default).and_then(Attr::const_value),
            Some(&Value::Count(2))
        );
    }

    #[test]
    fn optional_only_in_records() {
        let ty = Type::base(BaseKind::Count);
        let (set, problems) = Attributes::checked(
            [Attr::new(AttrTag::Optional)],
            &ty,
            AttrContext::default(),
        );
        assert!(set.is_empty());
        assert_eq!(problems[0].tag, AttrTag::Optional);

        let (set, problems) = Attributes::checked(
            [Attr::new(AttrTag::Optional)],
            &ty,
            AttrContext {
                in_record: true,
                is_global: false,
            },
        );
        assert!(set.has(AttrTag::Optional));
        assert!(problems.is_empty());
    }

    #[test]
    fn add_func_requires_global_and_payload() {
        let ty = Type::set(vec![Type::base(BaseKind::Addr)]);
        let local = AttrContext::default();
        let (_, problems) = Attributes::checked([Attr::new(AttrTag::AddFunc)], &ty, local);
        assert_eq!(problems.len(), 1);

        let global = AttrContext {
            in_record: false,
            is_global: true,
        };
        let (_, problems) = Attributes::checked([Attr::new(AttrTag::AddFunc)], &ty, global);
        assert!(problems[0].reason.contains("function"));
    }

    #[test]
    fn default_checks_table_yield_type() {
        let table = Type::table(
            vec![Type::base(BaseKind::Addr)],
            Type::base(BaseKind::Count),
        );
        let ctx = AttrContext::default();

        let (set, problems) = Attributes::checked([default_of(Value::Count(0))], &table, ctx);
        assert!(set.has(AttrTag::Default));
        assert!(problems.is_empty());

        let (_, problems) = Attributes::checked([default_of(Value::string("x"))], &table, ctx);
        assert!(problems[0].reason.contains("inconsistent"));
    }

    #[test]
    fn redef_takes_no_payload() {
        let ty = Type::base(BaseKind::Bool);
        let ctx = AttrContext::default();
        let (set, problems) = Attributes::checked([Attr::new(AttrTag::Redef)], &ty, ctx);
        assert!(set.has(AttrTag::Redef));
        assert!(problems.is_empty());
    }

    #[test]
    fn raw_tag_codes_round_trip() {
        assert_eq!(AttrTag::try_from(14u8), Ok(AttrTag::Deprecated));
        assert!(AttrTag::try_from(200u8).is_err());
        assert_eq!(u8::from(AttrTag::Default), 1);
    }

    #[test]
    fn find_attr_in_raw_list() {
        let list = vec![Attr::new(AttrTag::Redef), Attr::new(AttrTag::Log)];
        assert!(find_attr(Some(&list), AttrTag::Log).is_some());
        assert!(find_attr(Some(&list), AttrTag::Default).is_none());
        assert!(find_attr(None, AttrTag::Log).is_none());
    }
}
