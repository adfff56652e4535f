use std::cell::Cell;
use std::fmt;

use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "Warning"),
            Severity::Error => write!(f, "Error"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    severity: Severity,
    message: String,
    span: Option<Span>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: String, span: Option<Span>) -> Self {
        Self {
            severity,
            message,
            span,
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn span(&self) -> Option<&Span> {
        self.span.as_ref()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(span) = &self.span {
            write!(f, "{}: {}", span, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

/// Append-only diagnostic collector shared by every stage of the pipeline.
///
/// Generalises `ParserSpecification::error`/`warning` (which wrote straight
/// to `stderr`) into a collected `Vec` so a driver can sort, filter, or
/// format before printing; the counters are kept alongside the vector so
/// `has_errors` stays O(1).
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
    error_count: Cell<u32>,
    warning_count: Cell<u32>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, span: Option<Span>, message: impl Into<String>) {
        self.error_count.set(self.error_count.get() + 1);
        self.diagnostics
            .push(Diagnostic::new(Severity::Error, message.into(), span));
    }

    pub fn warning(&mut self, span: Option<Span>, message: impl Into<String>) {
        self.warning_count.set(self.warning_count.get() + 1);
        self.diagnostics
            .push(Diagnostic::new(Severity::Warning, message.into(), span));
    }

    pub fn has_errors(&self) -> bool {
        self.error_count.get() > 0
    }

    pub fn error_count(&self) -> u32 {
        self.error_count.get()
    }

    pub fn warning_count(&self) -> u32 {
        self.warning_count.get()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Folds another sink's entries (and counts) into this one — used when
    /// a stage (e.g. the validator) builds its diagnostics independently
    /// and hands them back to the builder's sink.
    pub fn append(&mut self, other: DiagnosticSink) {
        self.error_count
            .set(self.error_count.get() + other.error_count.get());
        self.warning_count
            .set(self.warning_count.get() + other.warning_count.get());
        self.diagnostics.extend(other.diagnostics);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_track_severities() {
        let mut sink = DiagnosticSink::new();
        sink.error(None, "bad thing");
        sink.warning(None, "lesser thing");
        sink.warning(None, "another");
        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.warning_count(), 2);
        assert!(sink.has_errors());
        assert_eq!(sink.diagnostics().len(), 3);
    }

    #[test]
    fn display_with_and_without_span() {
        let with = Diagnostic::new(Severity::Error, "oops".into(), Some(Span::new("g.y", 1, 1)));
        assert_eq!(with.to_string(), "g.y:1:1: oops");
        let without = Diagnostic::new(Severity::Warning, "hmm".into(), None);
        assert_eq!(without.to_string(), "hmm");
    }
}
