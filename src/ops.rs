//! Opcode definitions (`§4.3`, `§4.4`).
//!
//! A tagged enum plus one dispatch `match` (`vm::eval::eval_op`), matching
//! the teacher's own `exec_op`/`eval_op` style rather than a vtable per
//! opcode (`§9`).

use crate::id::Id;
use crate::pair::Pair;

/// Sentinel meaning "no register" — used for `r_in`/`r_out` slots an
/// opcode does not use (e.g. `INPUT`, or `YIELD` when no `.` variable
/// exists).
pub const NO_VAR: u8 = u8::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Input,
    Select,
    With,
    Dfs,
    Each,
    Yield,
}

impl Opcode {
    /// Fixed-width mnemonic matching `original_source/src/rule_solver.c`'s
    /// disassembly column alignment (`SPEC_FULL §10`).
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Opcode::Input => "input ",
            Opcode::Select => "select",
            Opcode::With => "with  ",
            Opcode::Dfs => "dfs   ",
            Opcode::Each => "each  ",
            Opcode::Yield => "yield ",
        }
    }
}

/// Where `WITH` resolves its starting table from: an already-written
/// register, or a literal subject id baked into the op itself (`§4.3`
/// step 1, "terms with literal subjects").
#[derive(Debug, Clone, Copy)]
pub enum Subject {
    Register(u8),
    Literal(Id),
}

/// One compiled instruction (`§4.3`).
///
/// `on_ok`/`on_fail` are the next op index to visit depending on the
/// evaluator's return value (`§4.3`): `on_ok = index + 1`, `on_fail =
/// index - 1`, making backtracking an implicit one-step jump back.
#[derive(Debug, Clone)]
pub struct Operation {
    pub kind: Opcode,
    pub on_ok: i32,
    pub on_fail: i32,
    pub r_in: u8,
    pub r_out: u8,
    /// Only set for `WITH`: where to resolve the starting table from.
    pub subject: Option<Subject>,
    /// The pair this op filters on. Unused (default) for `INPUT`/`YIELD`.
    pub pair: Pair,
    /// Index into the source term list, for disassembly; `usize::MAX` if
    /// the op has no single source term (`INPUT`, post-pass `EACH`, and
    /// `YIELD` still reference one when possible).
    pub term: usize,
}

impl Operation {
    pub fn input(on_ok: i32, on_fail: i32) -> Self {
        Operation {
            kind: Opcode::Input,
            on_ok,
            on_fail,
            r_in: NO_VAR,
            r_out: NO_VAR,
            subject: None,
            pair: Pair::default(),
            term: usize::MAX,
        }
    }

    pub fn yield_op(on_ok: i32, on_fail: i32, r_in: u8) -> Self {
        Operation {
            kind: Opcode::Yield,
            on_ok,
            on_fail,
            r_in,
            r_out: NO_VAR,
            subject: None,
            pair: Pair::default(),
            term: usize::MAX,
        }
    }

    pub fn select(on_ok: i32, on_fail: i32, r_out: u8, pair: Pair, term: usize) -> Self {
        Operation {
            kind: Opcode::Select,
            on_ok,
            on_fail,
            r_in: NO_VAR,
            r_out,
            subject: None,
            pair,
            term,
        }
    }

    pub fn dfs(on_ok: i32, on_fail: i32, r_out: u8, pair: Pair, term: usize) -> Self {
        Operation {
            kind: Opcode::Dfs,
            on_ok,
            on_fail,
            r_in: NO_VAR,
            r_out,
            subject: None,
            pair,
            term,
        }
    }

    pub fn with(
        on_ok: i32,
        on_fail: i32,
        subject: Subject,
        pair: Pair,
        term: usize,
    ) -> Self {
        Operation {
            kind: Opcode::With,
            on_ok,
            on_fail,
            r_in: NO_VAR,
            r_out: NO_VAR,
            subject: Some(subject),
            pair,
            term,
        }
    }

    pub fn each(on_ok: i32, on_fail: i32, r_in: u8, r_out: u8, term: usize) -> Self {
        Operation {
            kind: Opcode::Each,
            on_ok,
            on_fail,
            r_in,
            r_out,
            subject: None,
            pair: Pair::default(),
            term,
        }
    }
}
