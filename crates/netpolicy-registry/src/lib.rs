//! Process-lifetime stores shared by every binder operation.
//!
//! - [`TypeRegistry`] - named types and their aliases
//! - [`SymbolTable`] - the identifier arena and the global namespace
//! - [`EventRegistry`] - event handlers referenced by name

mod events;
mod symbols;
mod type_registry;

pub use events::{EventHandler, EventRegistry, HandlerRef};
pub use symbols::SymbolTable;
pub use type_registry::TypeRegistry;
