//! Diagnostic module - Error and warning reporting infrastructure.
//!
//! Every pass reports user-facing problems through a shared [`Handler`].
//! Diagnostics carry a severity, a stable `XXX-NNNN` code, a message, and
//! optionally a source span and module attribution. Passes keep going after
//! user errors so one run surfaces as much as possible; the driver gates
//! lowering on [`Handler::has_errors`].
//!
//! # Examples
//!
//! ```
//! use l0c_util::diagnostic::{codes, Diagnostic, Handler, Severity};
//! use l0c_util::span::Span;
//!
//! let handler = Handler::new();
//! handler.emit(
//!     Diagnostic::error(codes::TYP_MISMATCH, "type mismatch")
//!         .with_span(Span::new(4, 5, 1, 5)),
//! );
//!
//! assert!(handler.has_errors());
//! assert_eq!(handler.error_count(), 1);
//! ```

pub mod codes;
mod render;

pub use codes::{DiagnosticCode, Phase};
pub use render::render;

use std::cell::RefCell;
use std::fmt;

use crate::name::DottedName;
use crate::span::Span;

/// Diagnostic severity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Prevents lowering.
    Error,
    /// Reported but does not block lowering.
    Warning,
    /// Additional context attached to another diagnostic.
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A single diagnostic message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity level.
    pub severity: Severity,
    /// Stable code of the form `XXX-NNNN`.
    pub code: DiagnosticCode,
    /// Main message text.
    pub message: String,
    /// Source location, when one exists.
    pub span: Option<Span>,
    /// Module the diagnostic belongs to, when known.
    pub module: Option<DottedName>,
}

impl Diagnostic {
    /// Create a diagnostic with an explicit severity.
    pub fn new(severity: Severity, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            span: None,
            module: None,
        }
    }

    /// Create an error diagnostic.
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, message)
    }

    /// Create a warning diagnostic.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, message)
    }

    /// Create a note diagnostic.
    pub fn note(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Severity::Note, code, message)
    }

    /// Attach a source span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Attach a module attribution.
    pub fn with_module(mut self, module: DottedName) -> Self {
        self.module = Some(module);
        self
    }

    /// Sort key used for within-pass ordering: (file, line, column, code).
    /// Spanless diagnostics sort ahead of spanned ones.
    fn sort_key(&self) -> (usize, u32, u32, u8, u16) {
        match self.span {
            Some(s) => (
                s.file_id.index(),
                s.line,
                s.column,
                self.code.phase as u8,
                self.code.number,
            ),
            None => (0, 0, 0, self.code.phase as u8, self.code.number),
        }
    }
}

/// Handler collecting diagnostics across all passes.
///
/// Uses interior mutability so the lexer, parser, and analyzers can share one
/// handler without threading `&mut` everywhere; the core is single-threaded.
#[derive(Default)]
pub struct Handler {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl Handler {
    /// Create a new empty handler.
    pub fn new() -> Self {
        Self {
            diagnostics: RefCell::new(Vec::new()),
        }
    }

    /// Record a diagnostic.
    pub fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    /// Returns true if any error-severity diagnostic has been recorded.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .borrow()
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Number of error diagnostics.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// Number of warning diagnostics.
    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count()
    }

    /// Current length of the diagnostic list. Passes take a mark before
    /// running and hand it to [`Handler::sort_tail`] when they finish.
    pub fn mark(&self) -> usize {
        self.diagnostics.borrow().len()
    }

    /// Sort the diagnostics recorded since `mark` by source position.
    ///
    /// Within a pass, diagnostics are ordered by (file, line, column, code);
    /// across passes the list stays append-only.
    pub fn sort_tail(&self, mark: usize) {
        let mut diags = self.diagnostics.borrow_mut();
        if mark < diags.len() {
            diags[mark..].sort_by_key(Diagnostic::sort_key);
        }
    }

    /// Clone out all recorded diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    /// Take ownership of the recorded diagnostics, leaving the handler empty.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.borrow_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_display() {
        assert_eq!(format!("{}", Severity::Error), "error");
        assert_eq!(format!("{}", Severity::Warning), "warning");
        assert_eq!(format!("{}", Severity::Note), "note");
    }

    #[test]
    fn test_handler_counts() {
        let handler = Handler::new();
        assert!(!handler.has_errors());

        handler.emit(Diagnostic::error(codes::TYP_MISMATCH, "bad"));
        handler.emit(Diagnostic::warning(codes::MTC_UNREACHABLE_ARM, "meh"));

        assert!(handler.has_errors());
        assert_eq!(handler.error_count(), 1);
        assert_eq!(handler.warning_count(), 1);
        assert_eq!(handler.diagnostics().len(), 2);
    }

    #[test]
    fn test_sort_tail_orders_by_position() {
        let handler = Handler::new();
        let mark = handler.mark();
        handler.emit(
            Diagnostic::error(codes::TYP_MISMATCH, "second").with_span(Span::new(9, 10, 3, 1)),
        );
        handler.emit(
            Diagnostic::error(codes::TYP_MISMATCH, "first").with_span(Span::new(2, 3, 1, 2)),
        );
        handler.sort_tail(mark);

        let diags = handler.diagnostics();
        assert_eq!(diags[0].message, "first");
        assert_eq!(diags[1].message, "second");
    }

    #[test]
    fn test_sort_tail_keeps_earlier_passes_in_place() {
        let handler = Handler::new();
        handler.emit(
            Diagnostic::error(codes::PAR_UNEXPECTED_TOKEN, "pass one")
                .with_span(Span::new(50, 51, 9, 1)),
        );

        let mark = handler.mark();
        handler.emit(
            Diagnostic::error(codes::TYP_MISMATCH, "pass two").with_span(Span::new(2, 3, 1, 2)),
        );
        handler.sort_tail(mark);

        let diags = handler.diagnostics();
        assert_eq!(diags[0].message, "pass one");
        assert_eq!(diags[1].message, "pass two");
    }

    #[test]
    fn test_take_empties_handler() {
        let handler = Handler::new();
        handler.emit(Diagnostic::error(codes::TYP_MISMATCH, "x"));
        let taken = handler.take();
        assert_eq!(taken.len(), 1);
        assert!(handler.diagnostics().is_empty());
        assert!(!handler.has_errors());
    }
}
