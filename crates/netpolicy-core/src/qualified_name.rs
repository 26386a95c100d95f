//! Module-qualified identifier names.
//!
//! Policy scripts organise identifiers into modules. A fully qualified name is
//! `Module::name`; identifiers of the [`GLOBAL_MODULE_NAME`] module are stored
//! unqualified, so `GLOBAL::x` and `x` denote the same identifier.
//!
//! ```
//! use netpolicy_core::qualified_name::{make_full_var_name, GLOBAL_MODULE_NAME};
//!
//! assert_eq!(make_full_var_name("Conn", "log_policy"), "Conn::log_policy");
//! assert_eq!(make_full_var_name(GLOBAL_MODULE_NAME, "x"), "x");
//! assert_eq!(make_full_var_name("Conn", "GLOBAL::x"), "x");
//! ```

use std::fmt;

/// Name of the implicit top-level module.
pub const GLOBAL_MODULE_NAME: &str = "GLOBAL";

const SEP: &str = "::";

/// Module part of a possibly-qualified name (`GLOBAL` when unqualified).
pub fn extract_module_name(name: &str) -> String {
    match name.rfind(SEP) {
        Some(pos) => name[..pos].to_string(),
        None => GLOBAL_MODULE_NAME.to_string(),
    }
}

/// Identifier part of a possibly-qualified name.
pub fn extract_var_name(name: &str) -> String {
    match name.rfind(SEP) {
        Some(pos) => name[pos + SEP.len()..].to_string(),
        None => name.to_string(),
    }
}

/// Module name without a trailing `::`.
pub fn normalized_module_name(module_name: &str) -> String {
    module_name
        .strip_suffix(SEP)
        .unwrap_or(module_name)
        .to_string()
}

/// Concatenate `module_name::var_name` unless `var_name` is already
/// qualified, in which case it is returned unmodified (with a `GLOBAL::`
/// prefix stripped).
pub fn make_full_var_name(module_name: &str, var_name: &str) -> String {
    if module_name.is_empty()
        || normalized_module_name(module_name) == GLOBAL_MODULE_NAME
        || var_name.contains(SEP)
    {
        if extract_module_name(var_name) == GLOBAL_MODULE_NAME {
            return extract_var_name(var_name);
        }
        return var_name.to_string();
    }

    format!("{}{}{}", normalized_module_name(module_name), SEP, var_name)
}

/// A split, fully qualified identifier name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    /// Owning module (`GLOBAL` for top-level identifiers).
    pub module: String,
    /// Unqualified identifier name.
    pub name: String,
}

impl QualifiedName {
    /// Build from a module and a (possibly already qualified) name.
    pub fn new(module: &str, name: &str) -> Self {
        Self::from_full_name(&make_full_var_name(module, name))
    }

    /// Split a full name as produced by [`make_full_var_name`].
    pub fn from_full_name(full: &str) -> Self {
        Self {
            module: extract_module_name(full),
            name: extract_var_name(full),
        }
    }

    /// Whether this name lives in the GLOBAL module.
    pub fn is_global_module(&self) -> bool {
        self.module == GLOBAL_MODULE_NAME
    }

    /// The full name used as the namespace key.
    pub fn full_name(&self) -> String {
        make_full_var_name(&self.module, &self.name)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_global_module() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}{}{}", self.module, SEP, self.name)
        }
    }
}
