//! Error interface for this crate.
//!
//! This module re-exports every error type of the crate
//! and defines [`Diagnostic`], the message reported to the user
//! for an error or warning at a given source line.

use std::borrow::Cow;

pub use crate::parse::lex::LexErr;
pub use crate::asm::{AsmErr, AsmErrKind, Report};
pub use crate::ast::BitsNewErr;

/// Unified error interface for all errors in this crate.
pub trait Error: std::error::Error {
    /// A help message associated with this error (if it exists).
    fn help(&self) -> Option<Cow<str>> {
        None
    }
}

/// How serious a diagnostic is.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Severity {
    /// Reported, but never blocks output.
    Warning,
    /// Fails the compilation.
    Error
}
impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Warning => f.write_str("warning"),
            Severity::Error   => f.write_str("error"),
        }
    }
}

/// A message tied to a source line.
///
/// The line text is the verbatim (trimmed) text of the line
/// so that the user can see where the problem occurred.
///
/// The `Display` implementation formats the diagnostic like so:
/// ```text
/// 3:
///     'JMP UNDEFINED'
/// error: symbol was never defined: UNDEFINED
///     help: define the label (UNDEFINED:) or constant (.UNDEFINED 1)
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Diagnostic {
    /// Whether this is a warning or an error.
    pub severity: Severity,
    /// The (1-indexed) source line. Zero if no line applies.
    pub line: usize,
    /// The text of the source line.
    pub text: String,
    /// The message.
    pub message: String,
    /// An optional help message.
    pub help: Option<String>
}
impl Diagnostic {
    /// Creates a diagnostic from an error.
    pub fn from_error<E: Error + ?Sized>(severity: Severity, err: &E, line: usize, text: &str) -> Self {
        Diagnostic {
            severity,
            line,
            text: text.to_string(),
            message: err.to_string(),
            help: err.help().map(Cow::into_owned)
        }
    }
}
impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}:", self.line)?;
        writeln!(f, "\t'{}'", self.text)?;
        write!(f, "{}: {}", self.severity, self.message)?;
        if let Some(help) = &self.help {
            write!(f, "\n\thelp: {help}")?;
        }
        Ok(())
    }
}
