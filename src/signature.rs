//! Parsed term signature (`§6.1 External interfaces — From the parser`).
//!
//! This module consumes, but does not produce, the output of the term
//! syntax parser. The parser is out of scope (`§1`); these are the shapes
//! it hands to [`crate::program::compile`].

use crate::id::Id;

/// One identifier slot (subject, predicate, or object) of a term.
///
/// `entity == 0` means the slot is unresolved to a literal and must be
/// looked up as a variable by `name`. The implicit `this` variable is named
/// `"."` the same way the parser would have written an explicit `.` in the
/// expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub entity: Id,
    pub name: Option<String>,
}

impl Identifier {
    /// A slot resolved to a literal id.
    pub fn literal(entity: Id) -> Self {
        Identifier { entity, name: None }
    }

    /// A slot bound to a named variable.
    pub fn variable(name: impl Into<String>) -> Self {
        Identifier {
            entity: 0,
            name: Some(name.into()),
        }
    }

    /// The implicit `this` (`.`) variable.
    pub fn this() -> Self {
        Identifier::variable(".")
    }

    pub fn is_variable(&self) -> bool {
        self.entity == 0
    }
}

/// One term: `pred(argv[0])` or `pred(argv[0], argv[1])`.
///
/// `argv[0]` is always the subject; `argv[1]`, if present, is the object.
/// Terms with more than two arguments are rejected by [`crate::program`]
/// as malformed (`§4.1`).
#[derive(Debug, Clone)]
pub struct Term {
    pub pred: Identifier,
    pub argv: Vec<Identifier>,
}

impl Term {
    pub fn unary(pred: Identifier, subject: Identifier) -> Self {
        Term {
            pred,
            argv: vec![subject],
        }
    }

    pub fn binary(pred: Identifier, subject: Identifier, object: Identifier) -> Self {
        Term {
            pred,
            argv: vec![subject, object],
        }
    }

    pub fn subject(&self) -> &Identifier {
        &self.argv[0]
    }

    pub fn object(&self) -> Option<&Identifier> {
        self.argv.get(1)
    }

    pub fn argc(&self) -> usize {
        self.argv.len()
    }
}

/// A whole rule expression: an ordered list of terms (signature columns).
pub type Signature = Vec<Term>;
