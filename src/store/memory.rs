//! A small in-memory [`Store`] implementation used by this crate's own
//! tests (`SPEC_FULL §6.2`). Entities move between archetype tables the way
//! a real ECS store does: adding a component to an entity looks up (or
//! creates) the table whose type is the entity's old type plus the new id,
//! and moves the entity's row there.

use std::collections::{HashMap, HashSet};

use super::{Store, TableRecord};
use crate::id::{self, Id};

/// Opaque handle to one archetype table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableHandle(usize);

#[derive(Debug, Default)]
pub struct TableSet<T> {
    order: Vec<T>,
    by_table: HashMap<T, i32>,
}

impl<T: Copy + Eq + std::hash::Hash> TableSet<T> {
    fn register(&mut self, table: T, column: i32) {
        if !self.by_table.contains_key(&table) {
            self.order.push(table);
            self.by_table.insert(table, column);
        }
    }
}

struct TableData {
    type_ids: Vec<Id>,
    rows: Vec<Id>,
}

/// Reference [`Store`] implementation backed by plain `Vec`/`HashMap`s.
#[derive(Default)]
pub struct MemoryStore {
    tables: Vec<TableData>,
    tables_by_type: HashMap<Vec<Id>, TableHandle>,
    table_index: HashMap<Id, TableSet<TableHandle>>,
    entity_location: HashMap<Id, (TableHandle, usize)>,
    names: HashMap<String, Id>,
    transitive: HashSet<Id>,
    next_id: Id,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            next_id: 1,
            ..Default::default()
        }
    }

    /// Create or look up a named entity. Components, predicates and plain
    /// entities are all just entities, the same way they are in the ECS
    /// this store models.
    pub fn entity(&mut self, name: &str) -> Id {
        if let Some(&id) = self.names.get(name) {
            return id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.names.insert(name.to_string(), id);
        id
    }

    pub fn id_of(&self, name: &str) -> Option<Id> {
        self.names.get(name).copied()
    }

    pub fn mark_transitive(&mut self, pred: Id) {
        self.transitive.insert(pred);
    }

    /// Add a bare component to `entity`.
    pub fn add(&mut self, entity: Id, component: Id) {
        self.add_id(entity, component);
    }

    /// Add a relationship pair `(pred, obj)` to `entity`.
    pub fn add_pair(&mut self, entity: Id, pred: Id, obj: Id) {
        self.add_id(entity, id::pair(pred, obj));
    }

    fn current_type(&self, entity: Id) -> Vec<Id> {
        match self.entity_location.get(&entity) {
            Some((table, _)) => self.tables[table.0].type_ids.clone(),
            None => Vec::new(),
        }
    }

    fn add_id(&mut self, entity: Id, new_id: Id) {
        let mut ty = self.current_type(entity);
        if ty.contains(&new_id) {
            return;
        }
        ty.push(new_id);
        ty.sort_unstable();
        self.move_entity_to_type(entity, ty);
    }

    fn move_entity_to_type(&mut self, entity: Id, type_ids: Vec<Id>) {
        if let Some((old_table, old_row)) = self.entity_location.remove(&entity) {
            let rows = &mut self.tables[old_table.0].rows;
            rows.swap_remove(old_row);
            if let Some(&moved) = rows.get(old_row) {
                self.entity_location.insert(moved, (old_table, old_row));
            }
        }

        let table = self.get_or_create_table(type_ids);
        let row = self.tables[table.0].rows.len();
        self.tables[table.0].rows.push(entity);
        self.entity_location.insert(entity, (table, row));
    }

    fn get_or_create_table(&mut self, type_ids: Vec<Id>) -> TableHandle {
        if let Some(&h) = self.tables_by_type.get(&type_ids) {
            return h;
        }

        let handle = TableHandle(self.tables.len());
        self.tables.push(TableData {
            type_ids: type_ids.clone(),
            rows: Vec::new(),
        });
        self.tables_by_type.insert(type_ids.clone(), handle);
        self.register_table_index(handle, &type_ids);
        handle
    }

    fn register_table_index(&mut self, table: TableHandle, type_ids: &[Id]) {
        for (column, &type_id) in type_ids.iter().enumerate() {
            self.register(type_id, table, column as i32);

            if id::is_pair(type_id) {
                let pred = id::hi(type_id);
                let obj = id::lo(type_id);
                self.register(id::pair(pred, id::WILDCARD), table, column as i32);
                self.register(id::pair(id::WILDCARD, obj), table, column as i32);
                self.register(id::pair(id::WILDCARD, id::WILDCARD), table, column as i32);
            }
        }

        // Every non-empty table satisfies an entirely unconstrained query
        // (a bare wildcard predicate with no object).
        self.register(id::WILDCARD, table, 0);
    }

    fn register(&mut self, key: Id, table: TableHandle, column: i32) {
        self.table_index
            .entry(key)
            .or_insert_with(TableSet::default)
            .register(table, column);
    }
}

impl Store for MemoryStore {
    type Table = TableHandle;
    type TableSet = TableSet<TableHandle>;

    fn table_set_lookup(&self, id: Id) -> Option<&Self::TableSet> {
        self.table_index.get(&id)
    }

    fn table_set_count(&self, ts: &Self::TableSet) -> usize {
        ts.order.len()
    }

    fn table_set_get(&self, ts: &Self::TableSet, index: usize) -> Option<TableRecord<Self::Table>> {
        ts.order.get(index).map(|&table| TableRecord {
            table,
            first_column: ts.by_table[&table],
        })
    }

    fn table_set_get_by_table(
        &self,
        ts: &Self::TableSet,
        table: Self::Table,
    ) -> Option<TableRecord<Self::Table>> {
        ts.by_table.get(&table).map(|&first_column| TableRecord {
            table,
            first_column,
        })
    }

    fn table_type(&self, table: Self::Table) -> &[Id] {
        &self.tables[table.0].type_ids
    }

    fn table_count(&self, table: Self::Table) -> usize {
        self.tables[table.0].rows.len()
    }

    fn table_rows(&self, table: Self::Table) -> &[Id] {
        &self.tables[table.0].rows
    }

    fn record_of(&self, entity: Id) -> Option<(Self::Table, usize)> {
        self.entity_location.get(&entity).copied()
    }

    fn has_transitive_marker(&self, id: Id) -> bool {
        self.transitive.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_moves_table_on_add() {
        let mut store = MemoryStore::new();
        let alice = store.entity("alice");
        let food = store.entity("Food");
        let toy = store.entity("Toy");

        store.add(alice, food);
        let (t1, _) = store.record_of(alice).unwrap();
        assert_eq!(store.table_type(t1), &[food]);

        store.add(alice, toy);
        let (t2, _) = store.record_of(alice).unwrap();
        assert_ne!(t1, t2);
        let mut ty = store.table_type(t2).to_vec();
        ty.sort_unstable();
        let mut expect = [food, toy];
        expect.sort_unstable();
        assert_eq!(ty, expect);
    }

    #[test]
    fn table_set_lookup_finds_component() {
        let mut store = MemoryStore::new();
        let a = store.entity("a");
        let b = store.entity("b");
        let food = store.entity("Food");
        store.add(a, food);
        store.add(b, food);

        let ts = store.table_set_lookup(food).unwrap();
        assert_eq!(store.table_set_count(ts), 1);
    }

    #[test]
    fn pair_wildcards_index_correctly() {
        let mut store = MemoryStore::new();
        let alice = store.entity("alice");
        let bob = store.entity("bob");
        let child_of = store.entity("ChildOf");
        store.add_pair(alice, child_of, bob);

        let exact = store.table_set_lookup(id::pair(child_of, bob)).unwrap();
        assert_eq!(store.table_set_count(exact), 1);

        let any_obj = store
            .table_set_lookup(id::pair(child_of, id::WILDCARD))
            .unwrap();
        assert_eq!(store.table_set_count(any_obj), 1);

        let any_pred = store
            .table_set_lookup(id::pair(id::WILDCARD, bob))
            .unwrap();
        assert_eq!(store.table_set_count(any_pred), 1);
    }
}
