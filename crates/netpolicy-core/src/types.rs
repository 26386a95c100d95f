//! Policy-language types.
//!
//! Types are shared: many identifiers, fields and overloads hold the same
//! [`TypeRef`]. Record, enum and function types carry interior mutability so
//! a canonical named type can be extended in place (`redef record`,
//! `redef enum`, new overloads) without invalidating the handles that
//! already point at it.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::ast::Expr;
use crate::attrs::{AttrTag, Attributes};
use crate::error::TypeError;
use crate::type_hash::TypeHash;

/// Shared handle to a type.
pub type TypeRef = Rc<Type>;

/// Scalar kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseKind {
    Void,
    Bool,
    Int,
    Count,
    Double,
    Time,
    Interval,
    String,
    Pattern,
    Port,
    Addr,
    Subnet,
    Any,
}

impl BaseKind {
    /// Every base kind, in seeding order.
    pub const ALL: [BaseKind; 13] = [
        BaseKind::Void,
        BaseKind::Bool,
        BaseKind::Int,
        BaseKind::Count,
        BaseKind::Double,
        BaseKind::Time,
        BaseKind::Interval,
        BaseKind::String,
        BaseKind::Pattern,
        BaseKind::Port,
        BaseKind::Addr,
        BaseKind::Subnet,
        BaseKind::Any,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BaseKind::Void => "void",
            BaseKind::Bool => "bool",
            BaseKind::Int => "int",
            BaseKind::Count => "count",
            BaseKind::Double => "double",
            BaseKind::Time => "time",
            BaseKind::Interval => "interval",
            BaseKind::String => "string",
            BaseKind::Pattern => "pattern",
            BaseKind::Port => "port",
            BaseKind::Addr => "addr",
            BaseKind::Subnet => "subnet",
            BaseKind::Any => "any",
        }
    }
}

/// Function kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum FuncFlavor {
    Function = 0,
    Event = 1,
    Hook = 2,
}

impl FuncFlavor {
    pub fn name(&self) -> &'static str {
        match self {
            FuncFlavor::Function => "function",
            FuncFlavor::Event => "event",
            FuncFlavor::Hook => "hook",
        }
    }
}

/// A named, typed slot: record field or function parameter.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub id: String,
    pub ty: TypeRef,
    pub attrs: Option<Attributes>,
}

impl TypeDecl {
    pub fn new(id: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            id: id.into(),
            ty,
            attrs: None,
        }
    }

    pub fn with_attrs(mut self, attrs: Attributes) -> Self {
        self.attrs = Some(attrs);
        self
    }

    pub fn find_attr(&self, tag: AttrTag) -> Option<&crate::attrs::Attr> {
        self.attrs.as_ref()?.find(tag)
    }
}

/// Ordered named fields. Also used for function parameter lists.
#[derive(Debug, Default)]
pub struct RecordType {
    fields: RefCell<Vec<TypeDecl>>,
}

impl RecordType {
    pub fn new(fields: Vec<TypeDecl>) -> Self {
        Self {
            fields: RefCell::new(fields),
        }
    }

    pub fn fields(&self) -> Ref<'_, Vec<TypeDecl>> {
        self.fields.borrow()
    }

    pub fn num_fields(&self) -> usize {
        self.fields.borrow().len()
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.borrow().iter().position(|f| f.id == name)
    }

    pub fn field_type(&self, i: usize) -> Option<TypeRef> {
        self.fields.borrow().get(i).map(|f| f.ty.clone())
    }

    /// Extend in place (`redef record R += { ... }`).
    pub fn add_fields(&self, extra: Vec<TypeDecl>) {
        self.fields.borrow_mut().extend(extra);
    }

    /// Mutate a single field declaration.
    pub fn with_field_mut<R>(&self, i: usize, f: impl FnOnce(&mut TypeDecl) -> R) -> Option<R> {
        self.fields.borrow_mut().get_mut(i).map(f)
    }

    fn deep_copy(&self) -> RecordType {
        RecordType::new(self.fields.borrow().clone())
    }
}

/// Table or set. A set has no yield type.
#[derive(Debug, Clone)]
pub struct TableType {
    pub indices: Vec<TypeRef>,
    pub yield_type: Option<TypeRef>,
    /// Explicit elements of a `set[...]` type literal.
    pub elements: Option<Expr>,
}

/// A function, event or hook type with its overload list.
///
/// Overload 0 is the parameter list the type was created with. Indices are
/// append-only.
#[derive(Debug)]
pub struct FuncType {
    flavor: Cell<FuncFlavor>,
    yield_type: RefCell<Option<TypeRef>>,
    overloads: RefCell<Vec<Rc<RecordType>>>,
}

impl FuncType {
    pub fn flavor(&self) -> FuncFlavor {
        self.flavor.get()
    }

    pub fn yield_type(&self) -> Option<TypeRef> {
        self.yield_type.borrow().clone()
    }

    /// Drop the yield type and force `flavor` (event headers).
    pub fn clear_yield_type(&self, flavor: FuncFlavor) {
        *self.yield_type.borrow_mut() = None;
        self.flavor.set(flavor);
    }

    /// Parameters of overload 0.
    pub fn args(&self) -> Rc<RecordType> {
        self.overloads.borrow()[0].clone()
    }

    pub fn num_overloads(&self) -> usize {
        self.overloads.borrow().len()
    }

    pub fn overload(&self, idx: usize) -> Option<Rc<RecordType>> {
        self.overloads.borrow().get(idx).cloned()
    }

    /// Index of the overload whose parameter types equal `args`.
    pub fn overload_index(&self, args: &RecordType) -> Option<usize> {
        let wanted = params_hash(args);
        self.overloads
            .borrow()
            .iter()
            .position(|o| params_hash(o) == wanted && same_param_types(o, args))
    }

    /// Append an overload and return its index.
    pub fn add_overload(&self, args: Rc<RecordType>) -> usize {
        let mut overloads = self.overloads.borrow_mut();
        overloads.push(args);
        overloads.len() - 1
    }
}

/// Enumeration labels in declaration order.
#[derive(Debug, Default)]
pub struct EnumType {
    labels: RefCell<IndexMap<String, i64>>,
    next: Cell<i64>,
}

impl EnumType {
    pub fn new<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Self {
        let e = EnumType::default();
        for label in labels {
            e.add_label(label, None);
        }
        e
    }

    /// Add a label; returns its value. Existing labels keep theirs.
    pub fn add_label(&self, label: impl Into<String>, value: Option<i64>) -> i64 {
        let label = label.into();
        if let Some(v) = self.labels.borrow().get(&label) {
            return *v;
        }
        let v = value.unwrap_or_else(|| self.next.get());
        self.next.set(self.next.get().max(v + 1));
        self.labels.borrow_mut().insert(label, v);
        v
    }

    pub fn lookup(&self, label: &str) -> Option<i64> {
        self.labels.borrow().get(label).copied()
    }

    pub fn labels(&self) -> Vec<String> {
        self.labels.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.labels.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.borrow().is_empty()
    }
}

/// Type variants.
#[derive(Debug)]
pub enum TypeKind {
    Base(BaseKind),
    Record(RecordType),
    Table(TableType),
    Vector(TypeRef),
    Func(FuncType),
    Enum(EnumType),
    Error,
}

/// A type, optionally carrying the name it was declared under.
#[derive(Debug)]
pub struct Type {
    pub kind: TypeKind,
    name: RefCell<Option<String>>,
}

impl Type {
    pub fn new(kind: TypeKind) -> TypeRef {
        Rc::new(Type {
            kind,
            name: RefCell::new(None),
        })
    }

    pub fn base(kind: BaseKind) -> TypeRef {
        Type::new(TypeKind::Base(kind))
    }

    pub fn void() -> TypeRef {
        Type::base(BaseKind::Void)
    }

    pub fn error() -> TypeRef {
        Type::new(TypeKind::Error)
    }

    pub fn record(fields: Vec<TypeDecl>) -> TypeRef {
        Type::new(TypeKind::Record(RecordType::new(fields)))
    }

    pub fn table(indices: Vec<TypeRef>, yield_type: TypeRef) -> TypeRef {
        Type::new(TypeKind::Table(TableType {
            indices,
            yield_type: Some(yield_type),
            elements: None,
        }))
    }

    pub fn set(indices: Vec<TypeRef>) -> TypeRef {
        Type::new(TypeKind::Table(TableType {
            indices,
            yield_type: None,
            elements: None,
        }))
    }

    /// `set[...]` type literal with explicit elements.
    pub fn set_with_elements(indices: Vec<TypeRef>, elements: Expr) -> TypeRef {
        Type::new(TypeKind::Table(TableType {
            indices,
            yield_type: None,
            elements: Some(elements),
        }))
    }

    pub fn vector(elem: TypeRef) -> TypeRef {
        Type::new(TypeKind::Vector(elem))
    }

    pub fn func(flavor: FuncFlavor, params: Vec<TypeDecl>, yield_type: Option<TypeRef>) -> TypeRef {
        Type::new(TypeKind::Func(FuncType {
            flavor: Cell::new(flavor),
            yield_type: RefCell::new(yield_type),
            overloads: RefCell::new(vec![Rc::new(RecordType::new(params))]),
        }))
    }

    pub fn enumeration<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> TypeRef {
        Type::new(TypeKind::Enum(EnumType::new(labels)))
    }

    pub fn name(&self) -> Option<String> {
        self.name.borrow().clone()
    }

    pub fn has_name(&self) -> bool {
        self.name.borrow().is_some()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.borrow_mut() = Some(name.into());
    }

    /// Short tag used in diagnostics and accessor errors.
    pub fn tag_name(&self) -> &'static str {
        match &self.kind {
            TypeKind::Base(b) => b.name(),
            TypeKind::Record(_) => "record",
            TypeKind::Table(t) if t.yield_type.is_none() => "set",
            TypeKind::Table(_) => "table",
            TypeKind::Vector(_) => "vector",
            TypeKind::Func(f) => f.flavor().name(),
            TypeKind::Enum(_) => "enum",
            TypeKind::Error => "error",
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(self.kind, TypeKind::Table(_))
    }

    pub fn is_set(&self) -> bool {
        matches!(&self.kind, TypeKind::Table(t) if t.yield_type.is_none())
    }

    pub fn is_record(&self) -> bool {
        matches!(self.kind, TypeKind::Record(_))
    }

    pub fn is_vector(&self) -> bool {
        matches!(self.kind, TypeKind::Vector(_))
    }

    pub fn is_func(&self) -> bool {
        matches!(self.kind, TypeKind::Func(_))
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.kind, TypeKind::Enum(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, TypeKind::Error)
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind, TypeKind::Base(BaseKind::Void))
    }

    /// Record, table or vector.
    pub fn is_aggregate(&self) -> bool {
        self.is_record() || self.is_table() || self.is_vector()
    }

    pub fn as_record(&self) -> Result<&RecordType, TypeError> {
        match &self.kind {
            TypeKind::Record(r) => Ok(r),
            _ => Err(self.wrong("record")),
        }
    }

    pub fn as_table(&self) -> Result<&TableType, TypeError> {
        match &self.kind {
            TypeKind::Table(t) => Ok(t),
            _ => Err(self.wrong("table")),
        }
    }

    pub fn as_func(&self) -> Result<&FuncType, TypeError> {
        match &self.kind {
            TypeKind::Func(f) => Ok(f),
            _ => Err(self.wrong("function")),
        }
    }

    pub fn as_enum(&self) -> Result<&EnumType, TypeError> {
        match &self.kind {
            TypeKind::Enum(e) => Ok(e),
            _ => Err(self.wrong("enum")),
        }
    }

    pub fn vector_elem(&self) -> Result<&TypeRef, TypeError> {
        match &self.kind {
            TypeKind::Vector(t) => Ok(t),
            _ => Err(self.wrong("vector")),
        }
    }

    fn wrong(&self, expected: &'static str) -> TypeError {
        TypeError::WrongVariant {
            expected,
            found: self.tag_name(),
        }
    }

    /// A distinct type object with the same structure and name.
    ///
    /// Record and enum contents are copied, so extending the clone does not
    /// extend the original. Element types stay shared.
    pub fn shallow_clone(&self) -> TypeRef {
        let kind = match &self.kind {
            TypeKind::Base(b) => TypeKind::Base(*b),
            TypeKind::Record(r) => TypeKind::Record(r.deep_copy()),
            TypeKind::Table(t) => TypeKind::Table(t.clone()),
            TypeKind::Vector(e) => TypeKind::Vector(e.clone()),
            TypeKind::Func(f) => TypeKind::Func(FuncType {
                flavor: Cell::new(f.flavor()),
                yield_type: RefCell::new(f.yield_type()),
                overloads: RefCell::new(f.overloads.borrow().clone()),
            }),
            TypeKind::Enum(e) => {
                let copy = EnumType::default();
                for (label, v) in e.labels.borrow().iter() {
                    copy.add_label(label.clone(), Some(*v));
                }
                TypeKind::Enum(copy)
            }
            TypeKind::Error => TypeKind::Error,
        };
        Rc::new(Type {
            kind,
            name: RefCell::new(self.name()),
        })
    }

    /// Structural hash consistent with [`same_type`]: equal types hash equal.
    pub fn signature_hash(&self) -> TypeHash {
        match &self.kind {
            TypeKind::Base(b) => TypeHash::from_tag(b.name()),
            TypeKind::Record(r) => {
                let parts: Vec<_> = r
                    .fields()
                    .iter()
                    .flat_map(|f| [TypeHash::from_name(&f.id), f.ty.signature_hash()])
                    .collect();
                TypeHash::from_tag("record").combine(&parts)
            }
            TypeKind::Table(t) => {
                let mut parts: Vec<_> = t.indices.iter().map(|i| i.signature_hash()).collect();
                if let Some(y) = &t.yield_type {
                    parts.push(y.signature_hash());
                }
                TypeHash::from_tag(self.tag_name()).combine(&parts)
            }
            TypeKind::Vector(e) => TypeHash::from_tag("vector").combine(&[e.signature_hash()]),
            TypeKind::Func(f) => {
                let yield_hash = f
                    .yield_type()
                    .filter(|y| !y.is_void())
                    .map_or(TypeHash::EMPTY, |y| y.signature_hash());
                TypeHash::from_tag(f.flavor().name()).combine(&[yield_hash, params_hash(&f.args())])
            }
            // Unnamed enums compare by labels, so only the tag is safe here.
            TypeKind::Enum(_) => TypeHash::from_tag("enum"),
            TypeKind::Error => TypeHash::from_tag("error"),
        }
    }
}

fn params_hash(params: &RecordType) -> TypeHash {
    let parts: Vec<_> = params.fields().iter().map(|f| f.ty.signature_hash()).collect();
    TypeHash::from_tag("params").combine(&parts)
}

/// Recursive structural type equality.
pub fn same_type(t1: &Type, t2: &Type) -> bool {
    if std::ptr::eq(t1, t2) {
        return true;
    }

    match (&t1.kind, &t2.kind) {
        (TypeKind::Base(a), TypeKind::Base(b)) => a == b,
        (TypeKind::Error, TypeKind::Error) => true,
        (TypeKind::Enum(a), TypeKind::Enum(b)) => match (t1.name(), t2.name()) {
            (Some(n1), Some(n2)) => n1 == n2,
            _ => a.labels() == b.labels(),
        },
        (TypeKind::Table(a), TypeKind::Table(b)) => {
            a.indices.len() == b.indices.len()
                && a.indices.iter().zip(&b.indices).all(|(x, y)| same_type(x, y))
                && same_opt_type(a.yield_type.as_deref(), b.yield_type.as_deref())
        }
        (TypeKind::Vector(a), TypeKind::Vector(b)) => same_type(a, b),
        (TypeKind::Record(a), TypeKind::Record(b)) => {
            let (fa, fb) = (a.fields(), b.fields());
            fa.len() == fb.len()
                && fa
                    .iter()
                    .zip(fb.iter())
                    .all(|(x, y)| x.id == y.id && same_type(&x.ty, &y.ty))
        }
        (TypeKind::Func(a), TypeKind::Func(b)) => {
            a.flavor() == b.flavor()
                && same_yield(a.yield_type().as_deref(), b.yield_type().as_deref())
                && same_param_types(&a.args(), &b.args())
        }
        _ => false,
    }
}

fn same_opt_type(a: Option<&Type>, b: Option<&Type>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => same_type(x, y),
        _ => false,
    }
}

/// Return-type equality where an absent yield and `void` are the same.
pub fn same_yield(a: Option<&Type>, b: Option<&Type>) -> bool {
    let a = a.filter(|t| !t.is_void());
    let b = b.filter(|t| !t.is_void());
    same_opt_type(a, b)
}

/// Parameter lists equal by type and order; names are ignored.
pub fn same_param_types(a: &RecordType, b: &RecordType) -> bool {
    let (fa, fb) = (a.fields(), b.fields());
    fa.len() == fb.len() && fa.iter().zip(fb.iter()).all(|(x, y)| same_type(&x.ty, &y.ty))
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.name.borrow().as_deref()
            && !matches!(self.kind, TypeKind::Base(_))
        {
            return f.write_str(name);
        }

        match &self.kind {
            TypeKind::Base(b) => f.write_str(b.name()),
            TypeKind::Record(r) => {
                write!(f, "record {{")?;
                for field in r.fields().iter() {
                    write!(f, " {}: {};", field.id, field.ty)?;
                }
                write!(f, " }}")
            }
            TypeKind::Table(t) => {
                write!(f, "{}[", self.tag_name())?;
                for (i, idx) in t.indices.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{idx}")?;
                }
                write!(f, "]")?;
                if let Some(y) = &t.yield_type {
                    write!(f, " of {y}")?;
                }
                Ok(())
            }
            TypeKind::Vector(e) => write!(f, "vector of {e}"),
            TypeKind::Func(func) => {
                write!(f, "{}(", func.flavor().name())?;
                for (i, p) in func.args().fields().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", p.id, p.ty)?;
                }
                write!(f, ")")?;
                if let Some(y) = func.yield_type().filter(|y| !y.is_void()) {
                    write!(f, ": {y}")?;
                }
                Ok(())
            }
            TypeKind::Enum(e) => write!(f, "enum {{ {} }}", e.labels().join(", ")),
            TypeKind::Error => f.write_str("error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count() -> TypeRef {
        Type::base(BaseKind::Count)
    }

    fn addr() -> TypeRef {
        Type::base(BaseKind::Addr)
    }

    #[test]
    fn base_types_compare_by_kind() {
        assert!(same_type(&count(), &count()));
        assert!(!same_type(&count(), &addr()));
    }

    #[test]
    fn records_compare_field_names_and_types() {
        let a = Type::record(vec![TypeDecl::new("n", count())]);
        let b = Type::record(vec![TypeDecl::new("n", count())]);
        let c = Type::record(vec![TypeDecl::new("m", count())]);
        assert!(same_type(&a, &b));
        assert!(!same_type(&a, &c));
        assert_eq!(a.signature_hash(), b.signature_hash());
    }

    #[test]
    fn tables_and_sets_differ() {
        let t = Type::table(vec![addr()], count());
        let s = Type::set(vec![addr()]);
        assert!(!same_type(&t, &s));
        assert!(s.is_set());
        assert!(t.is_table() && !t.is_set());
        assert_eq!(t.to_string(), "table[addr] of count");
        assert_eq!(s.to_string(), "set[addr]");
    }

    #[test]
    fn param_lists_ignore_names() {
        let a = RecordType::new(vec![TypeDecl::new("x", count())]);
        let b = RecordType::new(vec![TypeDecl::new("y", count())]);
        let c = RecordType::new(vec![TypeDecl::new("x", addr())]);
        assert!(same_param_types(&a, &b));
        assert!(!same_param_types(&a, &c));
    }

    #[test]
    fn overloads_are_append_only() {
        let f = Type::func(FuncFlavor::Function, vec![TypeDecl::new("x", count())], None);
        let ft = f.as_func().unwrap();
        assert_eq!(ft.num_overloads(), 1);

        let other = Rc::new(RecordType::new(vec![TypeDecl::new("a", addr())]));
        assert_eq!(ft.overload_index(&other), None);
        assert_eq!(ft.add_overload(other.clone()), 1);
        assert_eq!(ft.overload_index(&other), Some(1));

        let renamed = RecordType::new(vec![TypeDecl::new("renamed", count())]);
        assert_eq!(ft.overload_index(&renamed), Some(0));
    }

    #[test]
    fn absent_yield_equals_void() {
        assert!(same_yield(None, Some(&Type::void())));
        assert!(!same_yield(None, Some(&count())));
    }

    #[test]
    fn event_clear_yield() {
        let f = Type::func(FuncFlavor::Event, vec![], Some(count()));
        let ft = f.as_func().unwrap();
        ft.clear_yield_type(FuncFlavor::Event);
        assert!(ft.yield_type().is_none());
    }

    #[test]
    fn record_extends_in_place() {
        let r = Type::record(vec![TypeDecl::new("a", count())]);
        let alias = r.clone();
        r.as_record()
            .unwrap()
            .add_fields(vec![TypeDecl::new("b", addr())]);
        assert_eq!(alias.as_record().unwrap().num_fields(), 2);
        assert_eq!(alias.as_record().unwrap().field_index("b"), Some(1));
    }

    #[test]
    fn shallow_clone_is_distinct() {
        let r = Type::record(vec![TypeDecl::new("a", count())]);
        r.set_name("R");
        let c = r.shallow_clone();
        assert!(!Rc::ptr_eq(&r, &c));
        assert_eq!(c.name().as_deref(), Some("R"));
        c.as_record()
            .unwrap()
            .add_fields(vec![TypeDecl::new("b", addr())]);
        assert_eq!(r.as_record().unwrap().num_fields(), 1);
    }

    #[test]
    fn enum_labels_number_sequentially() {
        let e = Type::enumeration(["A", "B"]);
        let et = e.as_enum().unwrap();
        assert_eq!(et.lookup("B"), Some(1));
        assert_eq!(et.add_label("C", Some(10)), 10);
        assert_eq!(et.add_label("D", None), 11);
        assert_eq!(et.add_label("A", None), 0);
    }

    #[test]
    fn wrong_variant_accessor() {
        let err = count().as_record().unwrap_err();
        assert_eq!(
            err,
            TypeError::WrongVariant {
                expected: "record",
                found: "count"
            }
        );
    }
}
