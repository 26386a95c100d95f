//! Source location tracking for diagnostics.
//!
//! Provides [`Span`] so declaration errors can point back at the policy
//! script that produced the offending AST fragment.

use std::fmt;

/// Index of a loaded script file, assigned by the loader.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
pub struct FileId(pub u32);

/// A span of policy source, represented by its starting position.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// File the span belongs to.
    pub file: FileId,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, byte-based).
    pub col: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Span {
    /// Create a span in the default file.
    #[inline]
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self {
            file: FileId::default(),
            line,
            col,
            len,
        }
    }

    /// Create a zero-length span at a position.
    #[inline]
    pub fn point(line: u32, col: u32) -> Self {
        Self::new(line, col, 0)
    }

    /// Attach the span to a specific file.
    #[inline]
    pub fn in_file(mut self, file: FileId) -> Self {
        self.file = file;
        self
    }

    /// Whether this span carries no location at all (synthesized nodes).
    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.line == 0
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file.0, self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            write!(f, "<internal>")
        } else {
            write!(f, "{}:{}", self.line, self.col)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_known_and_unknown() {
        assert_eq!(Span::new(3, 7, 2).to_string(), "3:7");
        assert_eq!(Span::default().to_string(), "<internal>");
    }

    #[test]
    fn in_file_keeps_position() {
        let span = Span::point(10, 1).in_file(FileId(4));
        assert_eq!(span.file, FileId(4));
        assert_eq!(span.line, 10);
        assert!(!span.is_unknown());
    }
}
