//! Error types for declaration binding.
//!
//! ## Error Hierarchy
//!
//! ```text
//! BindError   - non-fatal, attached to a declaration and reported as a diagnostic
//! FatalError  - the base runtime environment is corrupt; the embedder must stop
//! ValueError  - typed accessor on a Value hit the wrong variant
//! TypeError   - typed accessor on a Type hit the wrong variant
//! EvalError   - the external evaluator failed to produce an initial value
//! ```
//!
//! Binding never unwinds across declarations: a `BindError` ends the current
//! declaration, is pushed onto the [`Diagnostics`](crate::Diagnostics)
//! channel, and the loader moves on to the next declaration.

use thiserror::Error;

use crate::Span;
use crate::attrs::AttrTag;

// ============================================================================
// Bind Errors
// ============================================================================

/// How a diagnostic should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Declaration rejected (or partially rejected).
    Error,
    /// Declaration accepted, but suspicious.
    Warning,
}

/// Errors produced while binding a single declaration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    /// A plain redeclaration of an already-typed identifier.
    #[error("at {span}: '{name}' already defined")]
    AlreadyDefined { name: String, span: Span },

    /// Redeclaration that changes an identifier without the `redef` qualifier.
    #[error("at {span}: redefinition of '{name}' requires \"redef\"")]
    MissingRedefQualifier { name: String, span: Span },

    /// A redefinition whose type is not structurally equal to the original.
    #[error("at {span}: redefinition of '{name}' changes type")]
    RedefinitionTypeMismatch { name: String, span: Span },

    /// A set with explicit elements that also received an initializer.
    #[error("at {span}: double initialization of '{name}'")]
    DoubleInitialization { name: String, span: Span },

    /// Neither a declared type nor a typeable initializer.
    #[error("at {span}: no type given for '{name}'")]
    NoTypeDerivable { name: String, span: Span },

    /// `const` without an initializer on a non-redefinable identifier.
    #[error("at {span}: const variable '{name}' must be initialized")]
    ConstWithoutInitializer { name: String, span: Span },

    /// `option` without an initializer.
    #[error("at {span}: option variable '{name}' must be initialized")]
    OptionWithoutInitializer { name: String, span: Span },

    /// A header or function-typed redeclaration with a different return type.
    #[error("at {span}: incompatible function return types for '{name}'")]
    FunctionReturnTypeMismatch { name: String, span: Span },

    /// A function type redeclaring an overload that already exists.
    #[error("at {span}: function type re-declaration of '{name}'")]
    DuplicateOverloadSignature { name: String, span: Span },

    /// A parameter name that shadows another visible non-global identifier.
    #[error("at {span}: argument name '{name}' used twice")]
    ArgumentNameCollision { name: String, span: Span },

    /// Function/event/hook flavor differs from the bound value's flavor.
    #[error("at {span}: inconsistent function flavor for '{name}'")]
    InconsistentFunctionFlavor { name: String, span: Span },

    /// `redef` of an identifier that was never declared.
    #[error("at {span}: \"redef\" used but '{name}' not previously defined")]
    RedefOfUndeclared { name: String, span: Span },

    /// An anonymous function body references an outer function's local.
    #[error("at {span}: referencing outer function identifier '{name}' not supported")]
    UnsupportedOuterCapture { name: String, span: Span },

    /// An event header declared a non-void yield type.
    #[error("at {span}: event '{name}' cannot yield a value")]
    EventYieldsValue { name: String, span: Span },

    /// `+=` / `-=` used to initialize a local.
    #[error("at {span}: can't use += / -= for initialization of local variable '{name}'")]
    LocalInitClass { name: String, span: Span },

    /// The evaluator produced no value for an initializer.
    #[error("at {span}: failed to initialize '{name}': {reason}")]
    InitializationFailed {
        name: String,
        reason: String,
        span: Span,
    },

    /// An attribute that is not valid where it was attached.
    #[error("at {span}: invalid attribute {tag} on '{name}': {reason}")]
    InvalidAttribute {
        name: String,
        tag: AttrTag,
        reason: String,
        span: Span,
    },

    /// Assignment to an identifier that became immutable.
    #[error("at {span}: cannot assign to const '{name}'")]
    AssignToConst { name: String, span: Span },

    /// An additive/subtractive update against a value that cannot take it.
    #[error("at {span}: cannot apply {op} update to '{name}': {reason}")]
    AggregateUpdate {
        name: String,
        op: &'static str,
        reason: String,
        span: Span,
    },
}

impl BindError {
    /// Severity used by the diagnostics channel.
    pub fn severity(&self) -> Severity {
        match self {
            BindError::MissingRedefQualifier { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Name of the identifier the error is attached to.
    pub fn name(&self) -> &str {
        match self {
            BindError::AlreadyDefined { name, .. }
            | BindError::MissingRedefQualifier { name, .. }
            | BindError::RedefinitionTypeMismatch { name, .. }
            | BindError::DoubleInitialization { name, .. }
            | BindError::NoTypeDerivable { name, .. }
            | BindError::ConstWithoutInitializer { name, .. }
            | BindError::OptionWithoutInitializer { name, .. }
            | BindError::FunctionReturnTypeMismatch { name, .. }
            | BindError::DuplicateOverloadSignature { name, .. }
            | BindError::ArgumentNameCollision { name, .. }
            | BindError::InconsistentFunctionFlavor { name, .. }
            | BindError::RedefOfUndeclared { name, .. }
            | BindError::UnsupportedOuterCapture { name, .. }
            | BindError::EventYieldsValue { name, .. }
            | BindError::LocalInitClass { name, .. }
            | BindError::InitializationFailed { name, .. }
            | BindError::InvalidAttribute { name, .. }
            | BindError::AssignToConst { name, .. }
            | BindError::AggregateUpdate { name, .. } => name,
        }
    }

    /// Where the error occurred.
    pub fn span(&self) -> Span {
        match self {
            BindError::AlreadyDefined { span, .. }
            | BindError::MissingRedefQualifier { span, .. }
            | BindError::RedefinitionTypeMismatch { span, .. }
            | BindError::DoubleInitialization { span, .. }
            | BindError::NoTypeDerivable { span, .. }
            | BindError::ConstWithoutInitializer { span, .. }
            | BindError::OptionWithoutInitializer { span, .. }
            | BindError::FunctionReturnTypeMismatch { span, .. }
            | BindError::DuplicateOverloadSignature { span, .. }
            | BindError::ArgumentNameCollision { span, .. }
            | BindError::InconsistentFunctionFlavor { span, .. }
            | BindError::RedefOfUndeclared { span, .. }
            | BindError::UnsupportedOuterCapture { span, .. }
            | BindError::EventYieldsValue { span, .. }
            | BindError::LocalInitClass { span, .. }
            | BindError::InitializationFailed { span, .. }
            | BindError::InvalidAttribute { span, .. }
            | BindError::AssignToConst { span, .. }
            | BindError::AggregateUpdate { span, .. } => *span,
        }
    }
}

// ============================================================================
// Fatal Errors
// ============================================================================

/// Internal-consistency failures.
///
/// These mean the base environment the rest of the runtime relies on is
/// missing or corrupt. The library returns them; the embedder terminates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalError {
    /// A mandatory built-in global is not bound.
    #[error("internal error: internal variable {name} missing")]
    RequiredGlobalMissing { name: String },

    /// A mandatory built-in global exists but is not what the runtime needs.
    #[error("internal error: internal variable {name} is not {expected}")]
    RequiredGlobalWrongKind { name: String, expected: &'static str },

    /// A mandatory built-in type is not declared.
    #[error("internal error: internal type {name} missing")]
    RequiredTypeMissing { name: String },

    /// A function-typed identifier holds a value that is not a function.
    #[error("internal error: invalid function flavor for {name}")]
    InvalidFunctionFlavor { name: String },

    /// A function header was handed a type that is not a function type.
    #[error("internal error: {name} declared with non-function type")]
    NotAFunctionType { name: String },

    /// `end_function` without a matching `begin_function`.
    #[error("internal error: no open function scope")]
    NoOpenScope,
}

// ============================================================================
// Accessor Errors
// ============================================================================

/// A typed accessor on [`Value`](crate::Value) found a different variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("expected {expected} value, found {found}")]
    WrongVariant {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{0}")]
    Unsupported(String),
}

/// A typed accessor on [`Type`](crate::Type) found a different variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("expected {expected} type, found {found}")]
    WrongVariant {
        expected: &'static str,
        found: &'static str,
    },
}

// ============================================================================
// Evaluator Errors
// ============================================================================

/// Failure reported by the external initializer evaluator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// The expression kind is not evaluable at load time.
    #[error("cannot evaluate {0} at load time")]
    Unsupported(&'static str),

    /// The value could not be coerced to the target type.
    #[error("type clash: {0}")]
    TypeClash(String),

    /// A referenced identifier has no value.
    #[error("value used but not set: {0}")]
    Unset(String),

    /// The interpreter raised an error while evaluating.
    #[error("{0}")]
    Interpreter(String),
}

impl From<ValueError> for EvalError {
    fn from(e: ValueError) -> Self {
        EvalError::TypeClash(e.to_string())
    }
}
