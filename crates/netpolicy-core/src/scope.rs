//! Lexical scope data for a function being bound.
//!
//! The binder keeps open scopes on a stack while a header and its body are
//! processed. Once the body is attached the scope is frozen behind an `Rc`
//! and retained by the function value, since nested anonymous functions need
//! it to build their closures.

use indexmap::IndexMap;

use crate::attrs::{AttrTag, Attributes};
use crate::ident::IdentId;

#[derive(Debug, Default)]
pub struct Scope {
    func_id: Option<IdentId>,
    overload_index: usize,
    attrs: Option<Attributes>,
    /// Full name to identifier, in frame-offset order.
    locals: IndexMap<String, IdentId>,
    inits: Vec<IdentId>,
}

impl Scope {
    pub fn new(func_id: Option<IdentId>, overload_index: usize, attrs: Option<Attributes>) -> Self {
        Self {
            func_id,
            overload_index,
            attrs,
            locals: IndexMap::new(),
            inits: Vec::new(),
        }
    }

    /// The identifier whose body this scope binds.
    pub fn func_id(&self) -> Option<IdentId> {
        self.func_id
    }

    pub fn overload_index(&self) -> usize {
        self.overload_index
    }

    pub fn attrs(&self) -> Option<&Attributes> {
        self.attrs.as_ref()
    }

    pub fn find_attr(&self, tag: AttrTag) -> Option<&crate::attrs::Attr> {
        self.attrs.as_ref()?.find(tag)
    }

    pub fn lookup(&self, full_name: &str) -> Option<IdentId> {
        self.locals.get(full_name).copied()
    }

    /// Insert a local; returns its frame offset.
    pub fn insert(&mut self, full_name: impl Into<String>, id: IdentId) -> usize {
        let (offset, _) = self.locals.insert_full(full_name.into(), id);
        offset
    }

    pub fn len(&self) -> usize {
        self.locals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locals.is_empty()
    }

    pub fn locals(&self) -> impl Iterator<Item = (&str, IdentId)> {
        self.locals.iter().map(|(n, id)| (n.as_str(), *id))
    }

    pub fn contains(&self, id: IdentId) -> bool {
        self.locals.values().any(|l| *l == id)
    }

    /// Register a local for default initialization on frame entry.
    pub fn add_init(&mut self, id: IdentId) {
        self.inits.push(id);
    }

    pub fn inits(&self) -> &[IdentId] {
        &self.inits
    }
}
