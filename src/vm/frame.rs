//! Per-op VM state: registers, contexts, and resource limits (`§4.6`,
//! `§9` — "frame arrays", `SPEC_FULL §5a`).
//!
//! Grounded on the teacher's `vdbe::engine::VdbeFrame` / `Vdbe` pairing:
//! one array of values that gets copied forward between steps, plus a
//! side array of per-instruction evaluator state that does not. Here the
//! "copied forward" array is the register file; the "side array" is
//! [`OpCtx`], one entry per compiled op, indexed by the iterator rather
//! than by a flat `op * stride + slot` buffer — `Vec<OpCtx<_>>` gives the
//! same per-op isolation `§4.6` requires without hand-rolled index math.

use crate::id::Id;
use crate::pair::Filter;
use crate::store::Store;

/// One variable's current value: unbound, a resolved entity, or (for a
/// `Table`-kind variable) a resolved table handle.
#[derive(Debug)]
pub enum Register<T> {
    Unbound,
    Entity(Id),
    Table(T),
}

impl<T> Clone for Register<T>
where
    T: Clone,
{
    fn clone(&self) -> Self {
        match self {
            Register::Unbound => Register::Unbound,
            Register::Entity(id) => Register::Entity(*id),
            Register::Table(t) => Register::Table(t.clone()),
        }
    }
}

impl<T: Copy> Copy for Register<T> {}

impl<T: Copy> Register<T> {
    pub fn as_entity(&self) -> Option<Id> {
        match self {
            Register::Entity(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<T> {
        match self {
            Register::Table(t) => Some(*t),
            _ => None,
        }
    }
}

/// Resumption cursor for one `SELECT` op.
#[derive(Debug, Clone, Copy)]
pub struct SelectCtx<T> {
    pub table_index: usize,
    pub table: Option<T>,
    pub column: i32,
}

impl<T> Default for SelectCtx<T> {
    fn default() -> Self {
        SelectCtx {
            table_index: 0,
            table: None,
            column: -1,
        }
    }
}

/// Resumption cursor for one `WITH` op.
#[derive(Debug, Clone, Copy)]
pub struct WithCtx<T> {
    pub table: Option<T>,
    pub column: i32,
}

impl<T> Default for WithCtx<T> {
    fn default() -> Self {
        WithCtx {
            table: None,
            column: -1,
        }
    }
}

/// One level of a `DFS` descent (`§4.4`): the filter this level is
/// searching against, the table/column currently matched within it, the
/// table-set position backing `table` (for advancing to the next table
/// once this one's columns are exhausted), and `row` — the next untried
/// row of `table` to descend through.
///
/// A matching column applies to every row of `table` alike (they share
/// one type), but the row still identifies a *distinct entity*, and
/// different entities of the same table can have different descendants
/// — descent must walk actual row entities (`examples/original_source/
/// src/rule_solver.c`'s `entities[row]`), not the type's own lane value.
#[derive(Debug, Clone, Copy)]
pub struct DfsFrame<T> {
    pub filter: Filter,
    pub table: T,
    pub table_index: usize,
    pub column: i32,
    pub row: usize,
}

/// Resumption cursor for one `DFS` op: a stack of [`DfsFrame`]s, one per
/// descent level.
#[derive(Debug, Clone, Default)]
pub struct DfsCtx<T> {
    pub stack: Vec<DfsFrame<T>>,
}

/// Resumption cursor for one `EACH` op.
#[derive(Debug, Clone, Copy, Default)]
pub struct EachCtx {
    pub row: usize,
}

/// Per-op evaluator state, not copied between frames (`§4.6`).
#[derive(Debug, Clone)]
pub enum OpCtx<S: Store> {
    None,
    Select(SelectCtx<S::Table>),
    With(WithCtx<S::Table>),
    Dfs(DfsCtx<S::Table>),
    Each(EachCtx),
}

impl<S: Store> Default for OpCtx<S> {
    fn default() -> Self {
        OpCtx::None
    }
}

/// Resource bounds for one iterator run (`SPEC_FULL §5a`), grounded on
/// the teacher's `Vdbe::max_instructions`/`instruction_count` guard.
#[derive(Debug, Clone, Copy)]
pub struct VmLimits {
    pub max_steps: u64,
}

impl Default for VmLimits {
    fn default() -> Self {
        VmLimits {
            max_steps: 1_000_000,
        }
    }
}
