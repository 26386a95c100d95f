//! Identifier storage and the global namespace.
//!
//! Every identifier ever created (global, local, parameter or temporary)
//! lives in one arena and is addressed by [`IdentId`]. Only globals and
//! exports are entered into the namespace map; locals are reachable through
//! the binder's scope stack.

use std::fmt;

use rustc_hash::FxHashMap;

use netpolicy_core::{BindError, IdentId, Identifier, Span, Value};

#[derive(Default)]
pub struct SymbolTable {
    idents: Vec<Identifier>,
    globals: FxHashMap<String, IdentId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move an identifier into the arena without naming it anywhere.
    pub fn create(&mut self, ident: Identifier) -> IdentId {
        let id = IdentId(self.idents.len() as u32);
        self.idents.push(ident);
        id
    }

    /// Enter an arena identifier into the global namespace under its full name.
    pub fn insert_global(&mut self, id: IdentId) {
        let name = self.get(id).name().to_string();
        self.globals.insert(name, id);
    }

    pub fn lookup_global(&self, full_name: &str) -> Option<IdentId> {
        self.globals.get(full_name).copied()
    }

    /// Identifier for `id`.
    ///
    /// Ids are only handed out by [`SymbolTable::create`], so they are always
    /// in range for the table that produced them.
    pub fn get(&self, id: IdentId) -> &Identifier {
        &self.idents[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: IdentId) -> &mut Identifier {
        &mut self.idents[id.0 as usize]
    }

    /// Runtime assignment outside a declaration.
    pub fn assign(&mut self, id: IdentId, value: Value, span: Span) -> Result<(), BindError> {
        let ident = self.get_mut(id);
        if ident.is_const() {
            return Err(BindError::AssignToConst {
                name: ident.name().to_string(),
                span,
            });
        }
        ident.set_val(Some(value));
        Ok(())
    }

    /// Global identifiers in no particular order.
    pub fn globals(&self) -> impl Iterator<Item = (IdentId, &Identifier)> {
        self.globals.values().map(|id| (*id, self.get(*id)))
    }

    pub fn num_globals(&self) -> usize {
        self.globals.len()
    }

    /// Size of the arena.
    pub fn len(&self) -> usize {
        self.idents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idents.is_empty()
    }
}

impl fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolTable")
            .field("identifiers", &self.idents.len())
            .field("globals", &self.globals.len())
            .finish()
    }
}
