//! Named types and aliasing.
//!
//! Several names may resolve to one type object, and one name may collect
//! several type objects over time (a shallow clone made for a re-alias is
//! registered under the original name too). Entries are keyed by the name's
//! [`TypeHash`]; the stored name guards against hash collisions.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::trace;

use netpolicy_core::{TypeHash, TypeRef};

#[derive(Debug)]
struct AliasEntry {
    name: String,
    types: Vec<TypeRef>,
}

#[derive(Default)]
pub struct TypeRegistry {
    aliases: FxHashMap<TypeHash, AliasEntry>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `ty` under `name`. Registering the same object twice is a no-op.
    pub fn add_alias(&mut self, name: &str, ty: TypeRef) {
        let entry = self
            .aliases
            .entry(TypeHash::from_name(name))
            .or_insert_with(|| AliasEntry {
                name: name.to_string(),
                types: Vec::new(),
            });

        if entry.name != name {
            // Hash collision; keep the first owner and let lookups miss.
            tracing::warn!(existing = %entry.name, name, "type alias hash collision");
            return;
        }

        if entry.types.iter().any(|t| Rc::ptr_eq(t, &ty)) {
            return;
        }
        trace!(name, ty = %ty, "type alias registered");
        entry.types.push(ty);
    }

    /// Every type object registered under `name`, oldest first.
    pub fn aliases(&self, name: &str) -> &[TypeRef] {
        match self.aliases.get(&TypeHash::from_name(name)) {
            Some(entry) if entry.name == name => &entry.types,
            _ => &[],
        }
    }

    /// The canonical (first registered) type for `name`.
    pub fn lookup(&self, name: &str) -> Option<&TypeRef> {
        self.aliases(name).first()
    }

    pub fn contains(&self, name: &str) -> bool {
        !self.aliases(name).is_empty()
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.aliases.values().map(|e| e.name.as_str())
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("names", &self.aliases.len())
            .finish()
    }
}
