//! Runtime values bound to identifiers.
//!
//! Scalars are plain data. Records, tables and vectors are shared mutable
//! aggregates (`Rc<RefCell<_>>`): an identifier owns the handle, and the same
//! aggregate may be aliased into containers. Aggregates and function values
//! compare and hash by identity.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;
use std::rc::Rc;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;

use crate::ast::Stmt;
use crate::attrs::{AttrTag, Attributes};
use crate::error::ValueError;
use crate::ident::IdentId;
use crate::scope::Scope;
use crate::types::{BaseKind, FuncFlavor, Type, TypeKind, TypeRef, same_type};

pub type RecordRef = Rc<RefCell<RecordVal>>;
pub type TableRef = Rc<RefCell<TableVal>>;
pub type VectorRef = Rc<RefCell<VectorVal>>;

/// Transport protocol of a port value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportProto {
    Tcp,
    Udp,
    Icmp,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortVal {
    pub number: u16,
    pub proto: TransportProto,
}

impl fmt::Display for PortVal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let proto = match self.proto {
            TransportProto::Tcp => "tcp",
            TransportProto::Udp => "udp",
            TransportProto::Icmp => "icmp",
            TransportProto::Unknown => "unknown",
        };
        write!(f, "{}/{}", self.number, proto)
    }
}

/// A value.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Count(u64),
    Double(OrderedFloat<f64>),
    Time(OrderedFloat<f64>),
    Interval(OrderedFloat<f64>),
    String(Rc<str>),
    Pattern(Rc<str>),
    Port(PortVal),
    Addr(IpAddr),
    Subnet(IpAddr, u8),
    Enum { label: Rc<str>, value: i64 },
    Record(RecordRef),
    Table(TableRef),
    Vector(VectorRef),
    Func(Rc<FuncVal>),
}

impl Value {
    pub fn string(s: &str) -> Value {
        Value::String(Rc::from(s))
    }

    pub fn double(d: f64) -> Value {
        Value::Double(OrderedFloat(d))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Count(_) => "count",
            Value::Double(_) => "double",
            Value::Time(_) => "time",
            Value::Interval(_) => "interval",
            Value::String(_) => "string",
            Value::Pattern(_) => "pattern",
            Value::Port(_) => "port",
            Value::Addr(_) => "addr",
            Value::Subnet(..) => "subnet",
            Value::Enum { .. } => "enum",
            Value::Record(_) => "record",
            Value::Table(_) => "table",
            Value::Vector(_) => "vector",
            Value::Func(_) => "func",
        }
    }

    /// A fresh empty aggregate for record, table and vector types.
    pub fn empty_aggregate(ty: &TypeRef, attrs: Option<&Attributes>) -> Option<Value> {
        match &ty.kind {
            TypeKind::Record(_) => Some(Value::Record(Rc::new(RefCell::new(RecordVal::new(ty))))),
            TypeKind::Table(_) => Some(Value::Table(Rc::new(RefCell::new(TableVal::new(
                ty.clone(),
                attrs.cloned(),
            ))))),
            TypeKind::Vector(_) => Some(Value::Vector(Rc::new(RefCell::new(VectorVal::new(
                ty.clone(),
            ))))),
            _ => None,
        }
    }

    /// Whether this value may be stored under `ty` without coercion
    /// beyond numeric widening. Aggregates must have a structurally equal
    /// type.
    pub fn conforms_to(&self, ty: &Type) -> bool {
        match (&ty.kind, self) {
            (TypeKind::Base(BaseKind::Any), _) => true,
            (TypeKind::Base(base), v) => match (base, v) {
                (BaseKind::Bool, Value::Bool(_)) => true,
                (BaseKind::Int, Value::Int(_) | Value::Count(_)) => true,
                (BaseKind::Count, Value::Count(_)) => true,
                (BaseKind::Double, Value::Double(_) | Value::Int(_) | Value::Count(_)) => true,
                (BaseKind::Time, Value::Time(_)) => true,
                (BaseKind::Interval, Value::Interval(_)) => true,
                (BaseKind::String, Value::String(_)) => true,
                (BaseKind::Pattern, Value::Pattern(_)) => true,
                (BaseKind::Port, Value::Port(_)) => true,
                (BaseKind::Addr, Value::Addr(_)) => true,
                (BaseKind::Subnet, Value::Subnet(..)) => true,
                _ => false,
            },
            (TypeKind::Enum(e), Value::Enum { label, .. }) => e.lookup(label).is_some(),
            (TypeKind::Record(_), Value::Record(r)) => same_type(r.borrow().ty(), ty),
            (TypeKind::Table(_), Value::Table(t)) => same_type(t.borrow().ty(), ty),
            (TypeKind::Vector(_), Value::Vector(v)) => same_type(v.borrow().ty(), ty),
            (TypeKind::Func(_), Value::Func(_)) => true,
            _ => false,
        }
    }

    fn wrong(&self, expected: &'static str) -> ValueError {
        ValueError::WrongVariant {
            expected,
            found: self.kind_name(),
        }
    }

    pub fn as_bool(&self) -> Result<bool, ValueError> {
        match self {
            Value::Bool(b) => Ok(*b),
            _ => Err(self.wrong("bool")),
        }
    }

    pub fn as_int(&self) -> Result<i64, ValueError> {
        match self {
            Value::Int(i) => Ok(*i),
            Value::Enum { value, .. } => Ok(*value),
            _ => Err(self.wrong("int")),
        }
    }

    pub fn as_count(&self) -> Result<u64, ValueError> {
        match self {
            Value::Count(c) => Ok(*c),
            Value::Port(p) => Ok(u64::from(p.number)),
            _ => Err(self.wrong("count")),
        }
    }

    /// Double, time and interval all share the double representation.
    pub fn as_double(&self) -> Result<f64, ValueError> {
        match self {
            Value::Double(d) | Value::Time(d) | Value::Interval(d) => Ok(d.0),
            _ => Err(self.wrong("double")),
        }
    }

    pub fn as_str(&self) -> Result<&str, ValueError> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(self.wrong("string")),
        }
    }

    pub fn as_record(&self) -> Result<&RecordRef, ValueError> {
        match self {
            Value::Record(r) => Ok(r),
            _ => Err(self.wrong("record")),
        }
    }

    pub fn as_table(&self) -> Result<&TableRef, ValueError> {
        match self {
            Value::Table(t) => Ok(t),
            _ => Err(self.wrong("table")),
        }
    }

    pub fn as_vector(&self) -> Result<&VectorRef, ValueError> {
        match self {
            Value::Vector(v) => Ok(v),
            _ => Err(self.wrong("vector")),
        }
    }

    pub fn as_func(&self) -> Result<&Rc<FuncVal>, ValueError> {
        match self {
            Value::Func(f) => Ok(f),
            _ => Err(self.wrong("func")),
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Value::Record(_) | Value::Table(_) | Value::Vector(_))
    }

    /// Merge this value's contents into `target` (`+=` initialization).
    pub fn add_to(&self, target: &Value) -> Result<(), ValueError> {
        match (self, target) {
            (Value::Table(src), Value::Table(dst)) => {
                if Rc::ptr_eq(src, dst) {
                    return Ok(());
                }
                let src = src.borrow();
                let mut dst = dst.borrow_mut();
                for (key, yield_val) in src.entries.iter() {
                    dst.insert(key.clone(), yield_val.clone());
                }
                Ok(())
            }
            (Value::Vector(src), Value::Vector(dst)) => {
                let extra: Vec<_> = src.borrow().elements.clone();
                dst.borrow_mut().elements.extend(extra);
                Ok(())
            }
            (_, Value::Table(_) | Value::Vector(_)) => Err(ValueError::Unsupported(format!(
                "cannot add {} to {}",
                self.kind_name(),
                target.kind_name()
            ))),
            _ => Err(ValueError::Unsupported(format!(
                "{} is not a container",
                target.kind_name()
            ))),
        }
    }

    /// Remove this value's keys from `target` (`-=` initialization).
    pub fn remove_from(&self, target: &Value) -> Result<(), ValueError> {
        match (self, target) {
            (Value::Table(src), Value::Table(dst)) => {
                if Rc::ptr_eq(src, dst) {
                    dst.borrow_mut().entries.clear();
                    return Ok(());
                }
                let src = src.borrow();
                let mut dst = dst.borrow_mut();
                for key in src.entries.keys() {
                    dst.remove(key);
                }
                Ok(())
            }
            _ => Err(ValueError::Unsupported(format!(
                "cannot remove {} from {}",
                self.kind_name(),
                target.kind_name()
            ))),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Count(a), Value::Count(b)) => a == b,
            (Value::Double(a), Value::Double(b))
            | (Value::Time(a), Value::Time(b))
            | (Value::Interval(a), Value::Interval(b)) => a == b,
            (Value::String(a), Value::String(b)) | (Value::Pattern(a), Value::Pattern(b)) => {
                a == b
            }
            (Value::Port(a), Value::Port(b)) => a == b,
            (Value::Addr(a), Value::Addr(b)) => a == b,
            (Value::Subnet(a, w1), Value::Subnet(b, w2)) => a == b && w1 == w2,
            (Value::Enum { label: a, value: x }, Value::Enum { label: b, value: y }) => {
                a == b && x == y
            }
            (Value::Record(a), Value::Record(b)) => Rc::ptr_eq(a, b),
            (Value::Table(a), Value::Table(b)) => Rc::ptr_eq(a, b),
            (Value::Vector(a), Value::Vector(b)) => Rc::ptr_eq(a, b),
            (Value::Func(a), Value::Func(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Count(c) => c.hash(state),
            Value::Double(d) | Value::Time(d) | Value::Interval(d) => d.hash(state),
            Value::String(s) | Value::Pattern(s) => s.hash(state),
            Value::Port(p) => p.hash(state),
            Value::Addr(a) => a.hash(state),
            Value::Subnet(a, w) => {
                a.hash(state);
                w.hash(state);
            }
            Value::Enum { label, value } => {
                label.hash(state);
                value.hash(state);
            }
            Value::Record(r) => std::ptr::hash(Rc::as_ptr(r), state),
            Value::Table(t) => std::ptr::hash(Rc::as_ptr(t), state),
            Value::Vector(v) => std::ptr::hash(Rc::as_ptr(v), state),
            Value::Func(f) => std::ptr::hash(Rc::as_ptr(f), state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Count(c) => write!(f, "{c}"),
            Value::Double(d) | Value::Time(d) | Value::Interval(d) => write!(f, "{}", d.0),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Pattern(p) => write!(f, "/{p}/"),
            Value::Port(p) => write!(f, "{p}"),
            Value::Addr(a) => write!(f, "{a}"),
            Value::Subnet(a, w) => write!(f, "{a}/{w}"),
            Value::Enum { label, .. } => f.write_str(label),
            Value::Record(r) => write!(f, "[record with {} fields]", r.borrow().fields.len()),
            Value::Table(t) => write!(f, "{{{} entries}}", t.borrow().len()),
            Value::Vector(v) => write!(f, "[vector of {}]", v.borrow().len()),
            Value::Func(func) => f.write_str(func.name()),
        }
    }
}

// ============================================================================
// Aggregates
// ============================================================================

/// Record value. Field slots follow the record type's field order.
#[derive(Debug)]
pub struct RecordVal {
    ty: TypeRef,
    fields: Vec<Option<Value>>,
}

impl RecordVal {
    /// Fields start at their constant `&default`, or as fresh aggregates for
    /// non-optional aggregate fields, or unset.
    pub fn new(ty: &TypeRef) -> Self {
        let fields = match &ty.kind {
            TypeKind::Record(r) => r
                .fields()
                .iter()
                .map(|field| {
                    if let Some(v) = field
                        .find_attr(AttrTag::Default)
                        .and_then(|a| a.const_value())
                    {
                        return Some(v.clone());
                    }
                    if field.find_attr(AttrTag::Optional).is_some() {
                        return None;
                    }
                    Value::empty_aggregate(&field.ty, field.attrs.as_ref())
                })
                .collect(),
            _ => Vec::new(),
        };
        Self {
            ty: ty.clone(),
            fields,
        }
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, i: usize) -> Option<&Value> {
        self.fields.get(i)?.as_ref()
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        let i = self.ty.as_record().ok()?.field_index(name)?;
        self.get(i)
    }

    /// Set field `i`, growing the slot list if the type was extended.
    pub fn set(&mut self, i: usize, v: Option<Value>) {
        if i >= self.fields.len() {
            self.fields.resize(i + 1, None);
        }
        self.fields[i] = v;
    }
}

/// Table or set value. Sets store `None` yields.
#[derive(Debug)]
pub struct TableVal {
    ty: TypeRef,
    entries: IndexMap<Vec<Value>, Option<Value>>,
    attrs: Option<Attributes>,
}

impl TableVal {
    pub fn new(ty: TypeRef, attrs: Option<Attributes>) -> Self {
        Self {
            ty,
            entries: IndexMap::new(),
            attrs,
        }
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn insert(&mut self, key: Vec<Value>, yield_val: Option<Value>) {
        self.entries.insert(key, yield_val);
    }

    pub fn remove(&mut self, key: &[Value]) -> Option<Option<Value>> {
        self.entries.shift_remove(key)
    }

    pub fn contains(&self, key: &[Value]) -> bool {
        self.entries.contains_key(key)
    }

    /// Yield for `key`, falling back to a constant `&default`.
    pub fn lookup(&self, key: &[Value]) -> Option<Value> {
        match self.entries.get(key) {
            Some(v) => v.clone(),
            None => self.default_value(),
        }
    }

    pub fn default_value(&self) -> Option<Value> {
        self.attrs
            .as_ref()?
            .find(AttrTag::Default)?
            .const_value()
            .cloned()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Vec<Value>> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn attrs(&self) -> Option<&Attributes> {
        self.attrs.as_ref()
    }

    pub fn set_attrs(&mut self, attrs: Attributes) {
        self.attrs = Some(attrs);
    }

    /// Keys flattened into a list (single-index sets only keep the element).
    pub fn to_pure_list(&self) -> Vec<Value> {
        self.entries
            .keys()
            .flat_map(|k| k.iter().cloned())
            .collect()
    }
}

#[derive(Debug)]
pub struct VectorVal {
    ty: TypeRef,
    elements: Vec<Option<Value>>,
}

impl VectorVal {
    pub fn new(ty: TypeRef) -> Self {
        Self {
            ty,
            elements: Vec::new(),
        }
    }

    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn push(&mut self, v: Value) {
        self.elements.push(Some(v));
    }

    pub fn get(&self, i: usize) -> Option<&Value> {
        self.elements.get(i)?.as_ref()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.elements.iter().flatten()
    }
}

// ============================================================================
// Function values
// ============================================================================

/// One compiled body of an overload.
#[derive(Debug, Clone)]
pub struct FuncBody {
    pub stmt: Rc<Stmt>,
    /// Locals default-initialized on frame entry.
    pub inits: Vec<IdentId>,
    pub frame_size: usize,
    pub priority: i64,
}

/// The implemented side of one overload.
#[derive(Debug, Clone, Default)]
pub struct OverloadImpl {
    bodies: Vec<FuncBody>,
}

impl OverloadImpl {
    pub fn bodies(&self) -> &[FuncBody] {
        &self.bodies
    }
}

/// A callable value. Slot `i` corresponds to overload `i` of the type.
#[derive(Debug)]
pub struct FuncVal {
    name: String,
    flavor: FuncFlavor,
    overloads: RefCell<Vec<Option<OverloadImpl>>>,
    scope: RefCell<Option<Rc<Scope>>>,
}

impl FuncVal {
    /// A value with no overloads implemented.
    pub fn new(name: impl Into<String>, flavor: FuncFlavor) -> Self {
        Self {
            name: name.into(),
            flavor,
            overloads: RefCell::new(Vec::new()),
            scope: RefCell::new(None),
        }
    }

    /// Forward-declared event/hook: overload 0 exists but has no bodies.
    pub fn placeholder(name: impl Into<String>, flavor: FuncFlavor) -> Self {
        let f = Self::new(name, flavor);
        f.overloads.borrow_mut().push(Some(OverloadImpl::default()));
        f
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flavor(&self) -> FuncFlavor {
        self.flavor
    }

    pub fn num_overloads(&self) -> usize {
        self.overloads.borrow().len()
    }

    /// Whether overload `idx` has been implemented (or forward-declared).
    pub fn has_overload(&self, idx: usize) -> bool {
        matches!(self.overloads.borrow().get(idx), Some(Some(_)))
    }

    /// Whether overload `idx` has at least one body.
    pub fn has_body(&self, idx: usize) -> bool {
        self.body_count(idx) > 0
    }

    pub fn body_count(&self, idx: usize) -> usize {
        match self.overloads.borrow().get(idx) {
            Some(Some(o)) => o.bodies.len(),
            _ => 0,
        }
    }

    /// Bodies of every overload.
    pub fn total_bodies(&self) -> usize {
        self.overloads
            .borrow()
            .iter()
            .flatten()
            .map(|o| o.bodies.len())
            .sum()
    }

    pub fn overload(&self, idx: usize) -> Option<Ref<'_, OverloadImpl>> {
        Ref::filter_map(self.overloads.borrow(), |o| o.get(idx)?.as_ref()).ok()
    }

    /// Attach a body to overload `idx`.
    ///
    /// Functions replace whatever was there; events and hooks accumulate
    /// handlers ordered by descending priority.
    pub fn add_body(&self, idx: usize, body: FuncBody) {
        let mut overloads = self.overloads.borrow_mut();
        if idx >= overloads.len() {
            overloads.resize(idx + 1, None);
        }
        let slot = overloads[idx].get_or_insert_with(OverloadImpl::default);

        match self.flavor {
            FuncFlavor::Function => {
                slot.bodies.clear();
                slot.bodies.push(body);
            }
            FuncFlavor::Event | FuncFlavor::Hook => {
                slot.bodies.push(body);
                slot.bodies.sort_by(|a, b| b.priority.cmp(&a.priority));
            }
        }
    }

    pub fn scope(&self) -> Option<Rc<Scope>> {
        self.scope.borrow().clone()
    }

    pub fn set_scope(&self, scope: Rc<Scope>) {
        *self.scope.borrow_mut() = Some(scope);
    }
}
