//! Error types for the rule solver (`§7 ERROR HANDLING DESIGN`).
//!
//! Compilation errors (malformed terms, unresolved variables) are
//! user-visible and surfaced through the configured [`crate::diagnostics`]
//! sink with the `error: <expr>: <message>` prefix from `§7` before
//! `rule_new` returns `Err`. `Internal` is reserved for invariant
//! violations that must not fire on well-formed input — a programmer
//! error, not a user-visible one.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    /// A term had more than two arguments, or zero.
    #[error("malformed term: {0}")]
    MalformedTerm(String),

    /// A predicate/subject/object referenced a variable name that was
    /// never declared as a term argument.
    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),

    /// A subject variable occurred in more than 256 terms (`§4.2`).
    #[error("variable '{0}' occurs too many times (max 256)")]
    TooManyOccurrences(String),

    /// A subject variable is unreachable from the elected root (`§4.2`).
    #[error("unconstrained variable '{0}'")]
    UnconstrainedVariable(String),

    /// The same variable occupies all three positions of a term whose
    /// predicate is itself that variable, e.g. `P(X, X)` where `P == X`
    /// (`§9`, Open Question).
    #[error("variable '{0}' cannot be its own predicate and both arguments")]
    AmbiguousTripleVariable(String),

    /// An invariant the compiler or VM is supposed to guarantee did not
    /// hold. Indicates a bug in this crate, not in the caller's input.
    #[error("internal invariant violated: {0}")]
    Internal(&'static str),

    /// The VM exceeded its configured step budget (`SPEC_FULL §5a`).
    /// Not expected in well-formed rules over a well-formed store, but
    /// guards against runaway transitive traversal.
    #[error("rule evaluation exceeded its step budget")]
    StepBudgetExceeded,
}
