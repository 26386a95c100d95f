//! Identifiers: named, typed, optionally valued bindings.

use std::fmt;

use bitflags::bitflags;

use crate::ast::InitClass;
use crate::attrs::{Attr, AttrTag, Attributes};
use crate::error::ValueError;
use crate::qualified_name::extract_var_name;
use crate::types::TypeRef;
use crate::value::Value;

/// Index of an identifier in the symbol table arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentId(pub u32);

impl fmt::Display for IdentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct IdentFlags: u8 {
        const CONST = 1 << 0;
        const OPTION = 1 << 1;
        const GLOBAL = 1 << 2;
        const EXPORT = 1 << 3;
        const DEPRECATED = 1 << 4;
        /// Names a type rather than a value.
        const TYPE = 1 << 5;
    }
}

#[derive(Debug)]
pub struct Identifier {
    /// Full name (`Module::name`, unqualified for GLOBAL).
    name: String,
    module: String,
    ty: Option<TypeRef>,
    value: Option<Value>,
    attrs: Option<Attributes>,
    flags: IdentFlags,
    /// Frame offset for locals.
    offset: usize,
    deprecation: Option<String>,
}

impl Identifier {
    pub fn new(full_name: impl Into<String>, module: impl Into<String>, flags: IdentFlags) -> Self {
        Self {
            name: full_name.into(),
            module: module.into(),
            ty: None,
            value: None,
            attrs: None,
            flags,
            offset: 0,
            deprecation: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without the module qualifier.
    pub fn local_name(&self) -> String {
        extract_var_name(&self.name)
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn ty(&self) -> Option<&TypeRef> {
        self.ty.as_ref()
    }

    pub fn set_type(&mut self, ty: TypeRef) {
        self.ty = Some(ty);
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn has_val(&self) -> bool {
        self.value.is_some()
    }

    pub fn set_val(&mut self, v: Option<Value>) {
        self.value = v;
    }

    /// Install `v` according to the initializer class.
    ///
    /// `Extra` and `Remove` merge into an existing aggregate; with no
    /// existing value, `v` is installed as is.
    pub fn set_val_with_class(&mut self, v: Value, class: InitClass) -> Result<(), ValueError> {
        match (class, &self.value) {
            (InitClass::Extra, Some(existing)) => v.add_to(existing),
            (InitClass::Remove, Some(existing)) => v.remove_from(existing),
            _ => {
                self.value = Some(v);
                Ok(())
            }
        }
    }

    pub fn attrs(&self) -> Option<&Attributes> {
        self.attrs.as_ref()
    }

    /// Merge attributes into the identifier's set.
    pub fn add_attrs(&mut self, attrs: &Attributes) {
        match &mut self.attrs {
            Some(existing) => existing.merge(attrs),
            None => self.attrs = Some(attrs.clone()),
        }
    }

    pub fn set_attrs(&mut self, attrs: Attributes) {
        self.attrs = Some(attrs);
    }

    pub fn find_attr(&self, tag: AttrTag) -> Option<&Attr> {
        self.attrs.as_ref()?.find(tag)
    }

    pub fn is_redefinable(&self) -> bool {
        self.find_attr(AttrTag::Redef).is_some()
    }

    pub fn flags(&self) -> IdentFlags {
        self.flags
    }

    pub fn is_const(&self) -> bool {
        self.flags.contains(IdentFlags::CONST)
    }

    pub fn set_const(&mut self) {
        self.flags.insert(IdentFlags::CONST);
    }

    pub fn is_option(&self) -> bool {
        self.flags.contains(IdentFlags::OPTION)
    }

    pub fn set_option(&mut self) {
        self.flags.insert(IdentFlags::OPTION);
    }

    pub fn is_global(&self) -> bool {
        self.flags.contains(IdentFlags::GLOBAL)
    }

    pub fn is_export(&self) -> bool {
        self.flags.contains(IdentFlags::EXPORT)
    }

    pub fn is_type(&self) -> bool {
        self.flags.contains(IdentFlags::TYPE)
    }

    pub fn make_type(&mut self) {
        self.flags.insert(IdentFlags::TYPE);
    }

    pub fn is_deprecated(&self) -> bool {
        self.flags.contains(IdentFlags::DEPRECATED)
    }

    pub fn make_deprecated(&mut self, message: Option<String>) {
        self.flags.insert(IdentFlags::DEPRECATED);
        self.deprecation = message;
    }

    /// Message shown on use of a deprecated identifier.
    pub fn deprecation_warning(&self) -> String {
        match &self.deprecation {
            Some(msg) if !msg.is_empty() => format!("deprecated ({}): {}", self.name, msg),
            _ => format!("deprecated ({})", self.name),
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    /// Push identifier attributes onto a bound table so `&default` and
    /// friends take effect on the value.
    pub fn update_val_attrs(&self) {
        if let (Some(attrs), Some(Value::Table(table))) = (&self.attrs, &self.value) {
            table.borrow_mut().set_attrs(attrs.clone());
        }
    }
}
