//! Retention of compiled function definitions.
//!
//! Every body attached by `end_function` is recorded here together with
//! the scope it was bound in. Nothing is ever removed: the runtime keeps
//! definitions addressable for as long as it exists, so the arena outlives
//! the load session that filled it.

use std::rc::Rc;

use netpolicy_core::{IdentId, Scope, Stmt};

/// Everything needed to rebuild one function body.
#[derive(Debug, Clone)]
pub struct FunctionIngredients {
    pub id: IdentId,
    pub name: String,
    pub overload_index: usize,
    pub body: Rc<Stmt>,
    pub scope: Rc<Scope>,
    pub inits: Vec<IdentId>,
    pub frame_size: usize,
    pub priority: i64,
}

#[derive(Debug, Default)]
pub struct FunctionArena {
    entries: Vec<FunctionIngredients>,
}

impl FunctionArena {
    pub(crate) fn retain(&mut self, ingredients: FunctionIngredients) {
        self.entries.push(ingredients);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionIngredients> {
        self.entries.iter()
    }

    /// Bodies bound to one identifier, in binding order.
    pub fn for_ident(&self, id: IdentId) -> impl Iterator<Item = &FunctionIngredients> {
        self.entries.iter().filter(move |e| e.id == id)
    }
}
