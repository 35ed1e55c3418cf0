//! The entity/table store (`§6.2 External interfaces — From the store`).
//!
//! Out of scope per `§1`: the solver only ever reaches the store through
//! [`Store`]. Implementations are borrowed read-only for an iterator's
//! lifetime (`§5`); the solver never mutates them.
//!
//! [`memory`] provides a small reference implementation used by this
//! crate's own tests (`SPEC_FULL §6.2`) — it plays the same role the
//! teacher's from-scratch `storage::btree` plays behind the VDBE's cursor
//! opcodes: a concrete backing store kept behind the same trait boundary
//! the core logic consumes, not part of the solver itself.

pub mod memory;

use crate::id::Id;

/// `(table, first_column)` — a table plus the first column in its type
/// that satisfies the id the table-set was looked up under (`§ GLOSSARY`,
/// Table-record).
#[derive(Debug, Clone, Copy)]
pub struct TableRecord<T> {
    pub table: T,
    pub first_column: i32,
}

/// The external entity/table store.
///
/// `Table` is an opaque, `Copy` handle identifying one archetype table.
/// `TableSet` is an opaque set of tables sharing a queried-for id, with
/// O(1) membership and stable, ordered iteration (insertion order).
pub trait Store {
    type Table: Copy + Eq + std::fmt::Debug;
    type TableSet: ?Sized;

    /// Tables containing at least one occurrence of `id` (including
    /// wildcard forms: `pair(pred, WILDCARD)`, `pair(WILDCARD, obj)`,
    /// `pair(WILDCARD, WILDCARD)`, and bare `WILDCARD` for "any id").
    fn table_set_lookup(&self, id: Id) -> Option<&Self::TableSet>;

    fn table_set_count(&self, ts: &Self::TableSet) -> usize;

    fn table_set_get(&self, ts: &Self::TableSet, index: usize) -> Option<TableRecord<Self::Table>>;

    /// O(1) membership test: is `table` in `ts`, and if so at what column.
    fn table_set_get_by_table(
        &self,
        ts: &Self::TableSet,
        table: Self::Table,
    ) -> Option<TableRecord<Self::Table>>;

    /// The table's type: a sorted sequence of ids every row holds.
    fn table_type(&self, table: Self::Table) -> &[Id];

    fn table_count(&self, table: Self::Table) -> usize;

    /// The entity ids held by each row of the table, in row order.
    fn table_rows(&self, table: Self::Table) -> &[Id];

    /// The `(table, row)` an entity currently occupies, if it exists.
    fn record_of(&self, entity: Id) -> Option<(Self::Table, usize)>;

    /// Whether `id` carries the Transitive marker (`§ GLOSSARY`).
    fn has_transitive_marker(&self, id: Id) -> bool;
}
