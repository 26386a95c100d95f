//! Load-session outcome errors.

use thiserror::Error;

use netpolicy_core::{Diagnostics, FatalError};

/// Why a load session did not produce a usable policy set.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The base environment is broken; the embedder must stop.
    #[error(transparent)]
    Fatal(#[from] FatalError),

    /// At least one declaration was rejected.
    #[error("{errors} declaration error(s), {warnings} warning(s)")]
    Rejected {
        errors: usize,
        warnings: usize,
        diagnostics: Diagnostics,
    },
}

impl LoadError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, LoadError::Fatal(_))
    }

    /// Diagnostics of a rejected load.
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            LoadError::Rejected { diagnostics, .. } => Some(diagnostics),
            LoadError::Fatal(_) => None,
        }
    }
}
