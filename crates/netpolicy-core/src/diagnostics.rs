//! The diagnostic channel binder errors are reported through.
//!
//! Every non-fatal [`BindError`] ends up here as a [`Diagnostic`]. The loader
//! keeps binding after an error; once the load session finishes it inspects
//! the collection to decide whether the policy set is usable.
//!
//! ```
//! use netpolicy_core::{BindError, Diagnostics, Span};
//!
//! let mut diagnostics = Diagnostics::new();
//! diagnostics.report(BindError::MissingRedefQualifier {
//!     name: "Site::local_nets".into(),
//!     span: Span::new(12, 1, 6),
//! });
//!
//! assert!(diagnostics.has_warnings());
//! assert!(!diagnostics.has_errors());
//! ```

use std::collections::VecDeque;
use std::fmt;

use crate::error::{BindError, Severity};

/// A single reported binder message.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Severity level.
    pub kind: DiagnosticKind,
    /// The underlying error, which carries the identifier and location.
    pub error: BindError,
}

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// The declaration (or part of it) was rejected.
    Error,
    /// The declaration was accepted with a caveat.
    Warning,
}

impl From<Severity> for DiagnosticKind {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Error => DiagnosticKind::Error,
            Severity::Warning => DiagnosticKind::Warning,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            DiagnosticKind::Error => "error",
            DiagnosticKind::Warning => "warning",
        };
        write!(f, "{kind}: {}", self.error)
    }
}

/// Ordered collection of binder diagnostics.
#[derive(Debug, Default)]
pub struct Diagnostics {
    diagnostics: VecDeque<Diagnostic>,
    has_errors: bool,
}

impl Diagnostics {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error with the severity its kind implies.
    pub fn report(&mut self, error: BindError) {
        let kind = DiagnosticKind::from(error.severity());
        self.add_diagnostic(Diagnostic { kind, error });
    }

    /// Adds a diagnostic to the collection.
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        if diagnostic.kind == DiagnosticKind::Error {
            self.has_errors = true;
        }
        self.diagnostics.push_back(diagnostic);
    }

    /// Returns `true` if any error was recorded.
    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    /// Returns `true` if any warning was recorded.
    pub fn has_warnings(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::Warning)
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Removes all diagnostics.
    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.has_errors = false;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::Warning)
    }

    /// Total number of diagnostics.
    pub fn count(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Diagnostics attached to one identifier, in report order.
    pub fn for_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.diagnostics
            .iter()
            .filter(move |d| d.error.name() == name)
    }

    /// Writes one line per diagnostic.
    pub fn emit<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for diagnostic in &self.diagnostics {
            writeln!(writer, "{}", diagnostic)?;
        }
        Ok(())
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::collections::vec_deque::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.iter()
    }
}
