use std::fmt;

/// Hard failures a driver can match on, as distinct from the warnings and
/// recoverable errors that accumulate in a `DiagnosticSink`. Grounded on
/// `symbols::Error` in the teacher's original `src/symbols.rs`: a small,
/// `Display`-only enum per fallible boundary, no `thiserror`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// `generate` was handed a grammar with no rules at all.
    EmptyGrammar,
    /// The selected start symbol is not a nonterminal.
    InvalidStartSymbol(String),
    /// `generate` was asked to tabulate a grammar that still has fatal
    /// diagnostics recorded against it.
    HasErrors,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::EmptyGrammar => write!(f, "grammar has no rules"),
            Error::InvalidStartSymbol(name) => {
                write!(f, "start symbol \"{}\" is not a nonterminal", name)
            }
            Error::HasErrors => write!(f, "grammar has unresolved fatal diagnostics"),
        }
    }
}

impl std::error::Error for Error {}
