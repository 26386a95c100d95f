//! BindContext - the state every binder operation threads through.
//!
//! A context owns the symbol table, the type registry, the event handler
//! registry, the open scope stack and the diagnostics channel for one load
//! session. It is created with the base environment seeded and torn down
//! with [`BindContext::finish`], which hands back the function arena.

use std::fmt;

use tracing::{debug, trace};

use netpolicy_core::qualified_name::{GLOBAL_MODULE_NAME, make_full_var_name, normalized_module_name};
use netpolicy_core::{
    BaseKind, BindError, Diagnostics, FatalError, IdentFlags, IdentId, Identifier, Scope, Type,
};
use netpolicy_registry::{EventRegistry, SymbolTable, TypeRegistry};

use crate::arena::FunctionArena;
use crate::eval::{Evaluator, LiteralEvaluator};
use crate::options::BindOptions;

/// What a finished load session produced.
#[derive(Debug)]
pub struct LoadSummary {
    pub diagnostics: Diagnostics,
    pub identifiers: usize,
    pub globals: usize,
    pub types: usize,
    pub functions_retained: usize,
}

impl LoadSummary {
    /// The policy set is usable when no errors were reported.
    pub fn is_clean(&self) -> bool {
        !self.diagnostics.has_errors()
    }
}

pub struct BindContext {
    pub(crate) symbols: SymbolTable,
    pub(crate) types: TypeRegistry,
    pub(crate) handlers: EventRegistry,
    pub(crate) diagnostics: Diagnostics,
    /// Open function scopes, innermost last. The global namespace is the
    /// implicit root below them.
    pub(crate) scopes: Vec<Scope>,
    pub(crate) functions: FunctionArena,
    pub(crate) evaluator: Box<dyn Evaluator>,
    pub(crate) options: BindOptions,
    module: String,
}

impl BindContext {
    pub fn new(options: BindOptions, evaluator: impl Evaluator + 'static) -> Self {
        let mut ctx = Self {
            symbols: SymbolTable::new(),
            types: TypeRegistry::new(),
            handlers: EventRegistry::new(),
            diagnostics: Diagnostics::new(),
            scopes: Vec::new(),
            functions: FunctionArena::default(),
            evaluator: Box::new(evaluator),
            options,
            module: GLOBAL_MODULE_NAME.to_string(),
        };
        if options.seed_builtins {
            ctx.seed_builtins();
        }
        ctx
    }

    /// Default options with the literal evaluator.
    pub fn with_defaults() -> Self {
        Self::new(BindOptions::default(), LiteralEvaluator)
    }

    fn seed_builtins(&mut self) {
        for kind in BaseKind::ALL {
            let ty = Type::base(kind);
            ty.set_name(kind.name());
            let mut ident = Identifier::new(kind.name(), GLOBAL_MODULE_NAME, IdentFlags::GLOBAL);
            ident.set_type(ty.clone());
            ident.make_type();
            let id = self.symbols.create(ident);
            self.symbols.insert_global(id);
            self.types.add_alias(kind.name(), ty);
        }
        debug!(count = BaseKind::ALL.len(), "seeded base types");
    }

    // ==========================================================================
    // Accessors
    // ==========================================================================

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn handlers(&self) -> &EventRegistry {
        &self.handlers
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn options(&self) -> &BindOptions {
        &self.options
    }

    pub fn functions(&self) -> &FunctionArena {
        &self.functions
    }

    pub fn ident(&self, id: IdentId) -> &Identifier {
        self.symbols.get(id)
    }

    /// Module new declarations default to.
    pub fn current_module(&self) -> &str {
        &self.module
    }

    pub fn set_current_module(&mut self, module: &str) {
        self.module = normalized_module_name(module);
    }

    pub(crate) fn report(&mut self, error: BindError) {
        debug!(%error, "diagnostic");
        self.diagnostics.report(error);
    }

    // ==========================================================================
    // Scopes
    // ==========================================================================

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn current_scope(&self) -> Option<&Scope> {
        self.scopes.last()
    }

    pub(crate) fn push_scope(&mut self, scope: Scope) {
        trace!(depth = self.scopes.len() + 1, "push scope");
        self.scopes.push(scope);
    }

    pub(crate) fn pop_scope(&mut self) -> Result<Scope, FatalError> {
        trace!(depth = self.scopes.len(), "pop scope");
        self.scopes.pop().ok_or(FatalError::NoOpenScope)
    }

    // ==========================================================================
    // Identifier install / lookup
    // ==========================================================================

    /// Create an identifier and enter it into the right namespace.
    ///
    /// Globals and exports go into the global namespace under their full
    /// name. Locals go into the innermost open scope and get the next frame
    /// offset.
    pub fn install_id(
        &mut self,
        name: &str,
        module: &str,
        is_global: bool,
        is_export: bool,
    ) -> Result<IdentId, FatalError> {
        if self.scopes.is_empty() && !is_global {
            return Err(FatalError::NoOpenScope);
        }

        let full_name = make_full_var_name(module, name);
        let global_scope = is_export || is_global || self.scopes.is_empty();

        let mut flags = IdentFlags::empty();
        if global_scope {
            flags |= IdentFlags::GLOBAL;
        }
        if is_export {
            flags |= IdentFlags::EXPORT;
        }

        let module_name = if module.is_empty() {
            GLOBAL_MODULE_NAME.to_string()
        } else {
            normalized_module_name(module)
        };
        let id = self
            .symbols
            .create(Identifier::new(full_name.clone(), module_name, flags));

        if global_scope {
            self.symbols.insert_global(id);
        } else if let Some(scope) = self.scopes.last_mut() {
            let offset = scope.insert(full_name, id);
            self.symbols.get_mut(id).set_offset(offset);
        }
        trace!(name, module, %id, global = global_scope, "identifier installed");
        Ok(id)
    }

    /// Resolve `name` as seen from `module`.
    ///
    /// Open scopes are searched innermost first, then the global namespace
    /// by full name, then `GLOBAL::name` unless `no_global` is set or
    /// `same_module_only` confines the search to a non-GLOBAL module.
    pub fn lookup_id(
        &self,
        name: &str,
        module: &str,
        no_global: bool,
        same_module_only: bool,
    ) -> Option<IdentId> {
        let full_name = make_full_var_name(module, name);

        for scope in self.scopes.iter().rev() {
            if let Some(id) = scope.lookup(&full_name) {
                return Some(id);
            }
        }

        if let Some(id) = self.symbols.lookup_global(&full_name) {
            return Some(id);
        }

        let in_global_module = module.is_empty() || normalized_module_name(module) == GLOBAL_MODULE_NAME;
        if !no_global && (in_global_module || !same_module_only) {
            let global_name = make_full_var_name(GLOBAL_MODULE_NAME, name);
            return self.symbols.lookup_global(&global_name);
        }
        None
    }

    /// Look up a global in the current module, installing it if absent.
    pub fn global(&mut self, name: &str) -> IdentId {
        let module = self.module.clone();
        self.global_in(&module, name)
    }

    pub(crate) fn global_in(&mut self, module: &str, name: &str) -> IdentId {
        let full_name = make_full_var_name(module, name);
        if let Some(id) = self.symbols.lookup_global(&full_name) {
            return id;
        }
        let id = self.symbols.create(Identifier::new(
            full_name,
            normalized_module_name(module),
            IdentFlags::GLOBAL,
        ));
        self.symbols.insert_global(id);
        id
    }

    /// Install a local in the innermost scope.
    pub fn local(&mut self, name: &str) -> Result<IdentId, FatalError> {
        let module = self.module.clone();
        self.install_id(name, &module, false, false)
    }

    /// A fresh identifier that no namespace can reach.
    pub fn generate_temporary(&mut self, name: &str) -> IdentId {
        let module = self.module.clone();
        self.symbols
            .create(Identifier::new(name, module, IdentFlags::empty()))
    }

    // ==========================================================================
    // Lifecycle
    // ==========================================================================

    /// End the load session.
    ///
    /// Compiled function metadata outlives the session: the arena is handed
    /// back so the runtime can keep every definition addressable.
    pub fn finish(self) -> (LoadSummary, FunctionArena) {
        if !self.scopes.is_empty() {
            tracing::warn!(open = self.scopes.len(), "load session finished with open scopes");
        }
        let summary = LoadSummary {
            identifiers: self.symbols.len(),
            globals: self.symbols.num_globals(),
            types: self.types.len(),
            functions_retained: self.functions.len(),
            diagnostics: self.diagnostics,
        };
        debug!(
            errors = summary.diagnostics.error_count(),
            warnings = summary.diagnostics.warning_count(),
            functions = summary.functions_retained,
            "load session finished"
        );
        (summary, self.functions)
    }
}

impl Default for BindContext {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for BindContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindContext")
            .field("symbols", &self.symbols)
            .field("types", &self.types)
            .field("scopes", &self.scopes.len())
            .field("diagnostics", &self.diagnostics.count())
            .field("options", &self.options)
            .finish()
    }
}
