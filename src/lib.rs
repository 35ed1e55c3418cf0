//! A backtracking rule/query solver for an ECS-style entity/table store.
//!
//! Compiles a term list into a linear opcode program (`program::compile`),
//! then drives that program to completion with explicit backtracking
//! (`vm::VmState::next`) against any store implementing [`store::Store`].
//! See `DESIGN.md` for how each module is grounded in prior art.

pub mod diagnostics;
pub mod error;
pub mod id;
pub mod ops;
pub mod pair;
pub mod program;
pub mod rule;
pub mod signature;
pub mod store;
pub mod variable;
pub mod vm;

pub use error::{Error, Result};
pub use rule::{Rule, RuleIter};
pub use signature::{Identifier, Signature, Term};
pub use store::{Store, TableRecord};
