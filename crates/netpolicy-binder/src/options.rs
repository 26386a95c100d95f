//! Binder configuration.

/// Knobs that change how declarations are bound.
///
/// Defaults match the permissive behaviour policy scripts rely on:
///
/// ```
/// use netpolicy_binder::BindOptions;
///
/// let opts = BindOptions::default().with_strict_redef(true);
/// assert!(opts.strict_redef);
/// assert!(opts.search_inner_lambdas);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindOptions {
    /// Reject a `redef` that initializes an identifier lacking `&redef`.
    pub strict_redef: bool,
    /// Capture analysis also inspects nested anonymous-function bodies.
    pub search_inner_lambdas: bool,
    /// Warn when a redeclaration changes an identifier without `redef`.
    pub warn_missing_redef: bool,
    /// Declare the base types when the context is created.
    pub seed_builtins: bool,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            strict_redef: false,
            search_inner_lambdas: true,
            warn_missing_redef: true,
            seed_builtins: true,
        }
    }
}

impl BindOptions {
    pub fn with_strict_redef(mut self, on: bool) -> Self {
        self.strict_redef = on;
        self
    }

    pub fn with_search_inner_lambdas(mut self, on: bool) -> Self {
        self.search_inner_lambdas = on;
        self
    }

    pub fn with_warn_missing_redef(mut self, on: bool) -> Self {
        self.warn_missing_redef = on;
        self
    }

    pub fn with_seed_builtins(mut self, on: bool) -> Self {
        self.seed_builtins = on;
        self
    }

    /// Defaults overridden by `NETPOLICY_STRICT_REDEF` and
    /// `NETPOLICY_INNER_LAMBDAS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`BindOptions::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut opts = Self::default();
        if let Some(on) = lookup("NETPOLICY_STRICT_REDEF").and_then(|v| parse_flag(&v)) {
            opts.strict_redef = on;
        }
        if let Some(on) = lookup("NETPOLICY_INNER_LAMBDAS").and_then(|v| parse_flag(&v)) {
            opts.search_inner_lambdas = on;
        }
        opts
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        other => {
            tracing::warn!(value = other, "ignoring unrecognised boolean option");
            None
        }
    }
}
