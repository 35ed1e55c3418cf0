//! Opcode evaluators and the dispatch table (`§4.4`, `§4.5`).
//!
//! One `match` on [`Opcode`] (`vm::eval::eval_op`) rather than a vtable per
//! opcode, matching the teacher's `vdbe::engine::exec_op` style (`§9`).

use std::collections::HashSet;

use crate::id::{self, Id};
use crate::ops::{Opcode, Operation, Subject};
use crate::pair::{self, Filter, Pair};
use crate::store::Store;

use super::frame::{DfsCtx, DfsFrame, EachCtx, OpCtx, Register, SelectCtx, WithCtx};

/// Dispatch one opcode. `prev` is the register frame as of *entering*
/// this op (read-only, `§4.1`); `out` is the frame this op may reify
/// into, already copied forward from `prev` by the caller (`push_registers`,
/// `§4.6`).
pub fn eval_op<S: Store>(
    op: &Operation,
    ctx: &mut OpCtx<S>,
    redo: bool,
    store: &S,
    prev: &[Register<S::Table>],
    out: &mut [Register<S::Table>],
) -> bool {
    match (op.kind, ctx) {
        (Opcode::Input, _) => !redo,
        (Opcode::Select, OpCtx::Select(sc)) => eval_select(op, sc, redo, store, prev, out),
        (Opcode::With, OpCtx::With(wc)) => eval_with(op, wc, redo, store, prev, out),
        (Opcode::Dfs, OpCtx::Dfs(dc)) => eval_dfs(op, dc, redo, store, prev, out),
        (Opcode::Each, OpCtx::Each(ec)) => eval_each(op, ec, redo, store, prev, out),
        (Opcode::Yield, _) => false,
        (kind, _) => unreachable!("op context kind mismatch for {kind:?}"),
    }
}

fn resolve_fn<'r, T: Copy>(prev: &'r [Register<T>]) -> impl Fn(u8) -> Id + 'r {
    move |slot: u8| prev.get(slot as usize).and_then(Register::as_entity).unwrap_or(id::WILDCARD)
}

/// Find the first table in `table_set`, at or after `start`, that is
/// non-empty and has a column matching `filter`. Uses the table-record's
/// cached first column as the scan start when the predicate lane is not
/// itself a wildcard (`§4.4`).
fn find_next_table<S: Store>(
    store: &S,
    table_set: &S::TableSet,
    filter: &Filter,
    start: usize,
) -> Option<(usize, S::Table, i32)> {
    let count = store.table_set_count(table_set);
    for i in start..count {
        let rec = store.table_set_get(table_set, i)?;
        if store.table_count(rec.table) == 0 {
            continue;
        }
        let start_col = if filter.pred_wildcard {
            0
        } else {
            rec.first_column.max(0) as usize
        };
        let ty = store.table_type(rec.table);
        if let Some(col) = pair::find_next_match(ty, start_col, filter) {
            return Some((i, rec.table, col as i32));
        }
    }
    None
}

fn bind_table_and_reify<S: Store>(
    store: &S,
    r_out: u8,
    table: S::Table,
    column: i32,
    filter: &Filter,
    out: &mut [Register<S::Table>],
) {
    out[r_out as usize] = Register::Table(table);
    let ty = store.table_type(table);
    let matched = ty[column as usize];
    pair::reify(filter, matched, |slot, val| out[slot as usize] = Register::Entity(val));
}

fn reify_only<S: Store>(
    store: &S,
    table: S::Table,
    column: i32,
    filter: &Filter,
    out: &mut [Register<S::Table>],
) {
    let ty = store.table_type(table);
    let matched = ty[column as usize];
    pair::reify(filter, matched, |slot, val| out[slot as usize] = Register::Entity(val));
}

/// `SELECT` (`§4.4`): open the table-set for the filter's mask, walk it
/// for the next non-empty, matching table.
fn eval_select<S: Store>(
    op: &Operation,
    ctx: &mut SelectCtx<S::Table>,
    redo: bool,
    store: &S,
    prev: &[Register<S::Table>],
    out: &mut [Register<S::Table>],
) -> bool {
    let filter = pair::pair_to_filter(&op.pair, resolve_fn(prev));

    if redo {
        if filter.wildcard {
            if let Some(table) = ctx.table {
                let ty = store.table_type(table);
                if let Some(col) = pair::find_next_match(ty, (ctx.column as usize) + 1, &filter) {
                    ctx.column = col as i32;
                    bind_table_and_reify(store, op.r_out, table, col as i32, &filter, out);
                    return true;
                }
            }
        }
        ctx.table_index += 1;
    } else {
        ctx.table_index = 0;
    }

    let table_set = match store.table_set_lookup(filter.mask) {
        Some(ts) => ts,
        None => return false,
    };
    match find_next_table(store, table_set, &filter, ctx.table_index) {
        Some((idx, table, col)) => {
            ctx.table_index = idx;
            ctx.table = Some(table);
            ctx.column = col;
            bind_table_and_reify(store, op.r_out, table, col, &filter, out);
            true
        }
        None => false,
    }
}

fn table_from_subject<S: Store>(
    store: &S,
    subject: &Subject,
    prev: &[Register<S::Table>],
) -> Option<S::Table> {
    match *subject {
        Subject::Literal(entity) => store.record_of(entity).map(|(t, _)| t),
        Subject::Register(slot) => match prev.get(slot as usize) {
            Some(Register::Table(t)) => Some(*t),
            Some(Register::Entity(e)) => store.record_of(*e).map(|(t, _)| t),
            _ => None,
        },
    }
}

/// `WITH` (`§4.4`): resolve the subject's current table, then find a
/// matching column in it directly, falling back to a transitive search
/// (`§4.5`) when the predicate is marked transitive and the direct
/// lookup misses.
fn eval_with<S: Store>(
    op: &Operation,
    ctx: &mut WithCtx<S::Table>,
    redo: bool,
    store: &S,
    prev: &[Register<S::Table>],
    out: &mut [Register<S::Table>],
) -> bool {
    let filter = pair::pair_to_filter(&op.pair, resolve_fn(prev));

    if redo {
        if !filter.wildcard {
            return false;
        }
        let table = match ctx.table {
            Some(t) => t,
            None => return false,
        };
        let ty = store.table_type(table);
        return match pair::find_next_match(ty, (ctx.column as usize) + 1, &filter) {
            Some(col) => {
                ctx.column = col as i32;
                reify_only(store, table, col as i32, &filter, out);
                true
            }
            None => false,
        };
    }

    let subject = op.subject.as_ref().expect("WITH op missing subject source");
    let table = match table_from_subject(store, subject, prev) {
        Some(t) => t,
        None => return false,
    };

    let record = store
        .table_set_lookup(filter.mask)
        .and_then(|ts| store.table_set_get_by_table(ts, table));

    if let Some(rec) = record {
        let ty = store.table_type(table);
        if let Some(col) = pair::find_next_match(ty, rec.first_column.max(0) as usize, &filter) {
            ctx.table = Some(table);
            ctx.column = col as i32;
            reify_only(store, table, col as i32, &filter, out);
            return true;
        }
    }

    if op.pair.transitive {
        if let Some(col) = find_transitive_column(store, table, &filter) {
            ctx.table = Some(table);
            ctx.column = col;
            reify_only(store, table, col, &filter, out);
            return true;
        }
    }

    false
}

/// `§4.5`: scan `table`'s columns for the transitive predicate, testing
/// whether each candidate object reaches the filter's required object
/// through the relation's transitive closure.
fn find_transitive_column<S: Store>(store: &S, table: S::Table, filter: &Filter) -> Option<i32> {
    if filter.obj_wildcard {
        return None;
    }
    let pred_id = id::hi(filter.mask);
    let target = id::lo(filter.mask);
    let ty = store.table_type(table);
    for (col, &type_id) in ty.iter().enumerate() {
        if !id::is_pair(type_id) || id::hi(type_id) != pred_id {
            continue;
        }
        let obj = id::lo(type_id);
        let mut visited = HashSet::new();
        if test_if_transitive(store, pred_id, obj, target, &mut visited) {
            return Some(col as i32);
        }
    }
    None
}

/// `test_if_transitive` (`§4.5`): does `obj` reach `target` through a
/// chain of `pred_id` edges? `visited` bounds the recursion against
/// cycles in the relation graph.
fn test_if_transitive<S: Store>(
    store: &S,
    pred_id: Id,
    obj: Id,
    target: Id,
    visited: &mut HashSet<Id>,
) -> bool {
    if obj == target {
        return true;
    }
    if !visited.insert(obj) {
        return false;
    }
    let Some((table, _)) = store.record_of(obj) else {
        return false;
    };
    let ty = store.table_type(table);
    for &type_id in ty {
        if id::is_pair(type_id) && id::hi(type_id) == pred_id {
            let next = id::lo(type_id);
            if test_if_transitive(store, pred_id, next, target, visited) {
                return true;
            }
        }
    }
    false
}

/// Build the filter for one descent level from the parent's filter,
/// keeping its lane-reification targets but pointing at the concrete
/// `(pred_id, obj)` edge just found.
fn descend_filter(parent: &Filter, pred_id: Id, obj: Id) -> Filter {
    let mask = id::pair(pred_id, obj);
    Filter {
        mask,
        expr_mask: id::ROLE_MASK | 0xFFFF_FFFF | (0xFFFF_FFFFu64 << 32),
        expr_match: mask,
        wildcard: false,
        pred_wildcard: false,
        obj_wildcard: false,
        same_var: false,
        hi_var: parent.hi_var,
        lo_var: parent.lo_var,
    }
}

fn push_level<S: Store>(store: &S, stack: &mut Vec<DfsFrame<S::Table>>, filter: Filter) -> bool {
    let table_set = match store.table_set_lookup(filter.mask) {
        Some(ts) => ts,
        None => return false,
    };
    match find_next_table(store, table_set, &filter, 0) {
        Some((idx, table, col)) => {
            stack.push(DfsFrame {
                filter,
                table_index: idx,
                table,
                column: col,
                row: 0,
            });
            true
        }
        None => false,
    }
}

fn advance_level<S: Store>(store: &S, frame: &mut DfsFrame<S::Table>) -> bool {
    if frame.filter.wildcard {
        let ty = store.table_type(frame.table);
        if let Some(col) = pair::find_next_match(ty, (frame.column as usize) + 1, &frame.filter) {
            frame.column = col as i32;
            frame.row = 0;
            return true;
        }
    }
    let table_set = match store.table_set_lookup(frame.filter.mask) {
        Some(ts) => ts,
        None => return false,
    };
    match find_next_table(store, table_set, &frame.filter, frame.table_index + 1) {
        Some((idx, table, col)) => {
            frame.table_index = idx;
            frame.table = table;
            frame.column = col;
            frame.row = 0;
            true
        }
        None => false,
    }
}

/// Try the next untried row of `frame`'s table as a descent seed, returning
/// the child filter to search for. Advances `frame.row` past rows already
/// tried (including reserved ids, which can't seed a descent) so repeated
/// calls walk the table's rows in order without retrying one twice.
fn try_descend<S: Store>(store: &S, frame: &mut DfsFrame<S::Table>) -> Option<Filter> {
    let rows = store.table_rows(frame.table);
    while frame.row < rows.len() {
        let entity = rows[frame.row];
        frame.row += 1;
        if entity == id::WILDCARD || entity == id::THIS_ENTITY {
            continue;
        }
        let pred_id = id::hi(frame.filter.mask);
        return Some(descend_filter(&frame.filter, pred_id, entity));
    }
    None
}

fn emit_dfs<S: Store>(store: &S, op: &Operation, ctx: &DfsCtx<S::Table>, out: &mut [Register<S::Table>]) {
    let top = ctx.stack.last().expect("dfs emit with empty stack");
    out[op.r_out as usize] = Register::Table(top.table);
    reify_only(store, top.table, top.column, &top.filter, out);
}

/// `DFS` (`§4.4`): pre-order traversal of the transitive relation graph.
/// Each visited frame is itself a valid match — direct edges (depth 0)
/// as well as every deeper descent (`§8` #6, transitive reachability).
fn eval_dfs<S: Store>(
    op: &Operation,
    ctx: &mut DfsCtx<S::Table>,
    redo: bool,
    store: &S,
    prev: &[Register<S::Table>],
    out: &mut [Register<S::Table>],
) -> bool {
    if !redo {
        ctx.stack.clear();
        let filter = pair::pair_to_filter(&op.pair, resolve_fn(prev));
        if !push_level(store, &mut ctx.stack, filter) {
            return false;
        }
        emit_dfs(store, op, ctx, out);
        return true;
    }

    loop {
        let Some(top) = ctx.stack.last_mut() else {
            return false;
        };

        if let Some(child_filter) = try_descend(store, top) {
            if push_level(store, &mut ctx.stack, child_filter) {
                emit_dfs(store, op, ctx, out);
                return true;
            }
            continue;
        }

        let top = ctx.stack.last_mut().unwrap();
        if advance_level(store, top) {
            emit_dfs(store, op, ctx, out);
            return true;
        }
        ctx.stack.pop();
    }
}

/// `EACH` (`§4.4`): iterate rows of an input table register, skipping
/// reserved ids (`WILDCARD`, `this`).
fn eval_each<S: Store>(
    op: &Operation,
    ctx: &mut EachCtx,
    redo: bool,
    store: &S,
    prev: &[Register<S::Table>],
    out: &mut [Register<S::Table>],
) -> bool {
    let table = match prev.get(op.r_in as usize).and_then(Register::as_table) {
        Some(t) => t,
        None => return false,
    };
    let rows = store.table_rows(table);
    let mut row = if redo { ctx.row + 1 } else { 0 };
    while row < rows.len() {
        let entity = rows[row];
        if entity != id::WILDCARD && entity != id::THIS_ENTITY {
            ctx.row = row;
            out[op.r_out as usize] = Register::Entity(entity);
            return true;
        }
        row += 1;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[test]
    fn select_finds_entities_with_component() {
        let mut store = MemoryStore::new();
        let food = store.entity("Food");
        let a = store.entity("a");
        let b = store.entity("b");
        store.add(a, food);
        store.add(b, food);

        let op = Operation::select(
            1,
            -1,
            0,
            Pair {
                pred: food,
                obj: 0,
                has_obj: false,
                reg_mask: Default::default(),
                transitive: false,
            },
            0,
        );
        let mut ctx = SelectCtx::default();
        let prev: Vec<Register<_>> = vec![Register::Unbound];
        let mut out: Vec<Register<_>> = vec![Register::Unbound];
        assert!(eval_select(&op, &mut ctx, false, &store, &prev, &mut out));
        assert!(out[0].as_table().is_some());
        assert!(!eval_select(&op, &mut ctx, true, &store, &prev, &mut out));
    }
}
