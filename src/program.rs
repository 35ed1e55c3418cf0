//! Program emission (`§4.3`): compile a term list into a linear opcode
//! program against a concrete store (needed only to resolve the
//! Transitive marker on literal predicates at compile time).

use crate::error::{Error, Result};
use crate::id::Id;
use crate::ops::{Operation, Subject, NO_VAR};
use crate::pair::{Pair, RegMask};
use crate::signature::{Identifier, Term};
use crate::store::Store;
use crate::variable::{self, VarKind, VariableTable, THIS_NAME};

/// Compile `terms` into a program plus the variable table program
/// registers are indexed by. `store` is consulted only for
/// [`Store::has_transitive_marker`] on literal predicates (`§4.1`).
pub fn compile<S: Store>(terms: &[Term], store: &S) -> Result<(Vec<Operation>, VariableTable)> {
    let vars = variable::analyze(terms)?;
    let mut ops = vec![Operation::input(1, -1)];
    let mut written_table = vec![false; vars.len()];
    let mut written_entity = vec![false; vars.len()];

    // Step 1: terms with a literal subject.
    for (ti, term) in terms.iter().enumerate() {
        if term.subject().is_variable() {
            continue;
        }
        splice_pred_obj(term, &vars, &mut written_table, &mut written_entity, &mut ops);
        let pair = build_pair(term, &vars, store)?;
        push_with(&mut ops, Subject::Literal(term.subject().entity), pair, ti);
    }

    // Step 2: subject variables, in the sorted order `vars` already holds.
    for slot in 0..vars.len() {
        if vars.get(slot).kind != VarKind::Table {
            continue;
        }
        for (ti, term) in terms.iter().enumerate() {
            if !term.subject().is_variable() {
                continue;
            }
            let name = term.subject().name.as_deref().unwrap();
            if vars.slot_of(name) != Some(slot) {
                continue;
            }

            splice_pred_obj(term, &vars, &mut written_table, &mut written_entity, &mut ops);
            let pair = build_pair(term, &vars, store)?;

            if written_entity[slot] {
                push_with(&mut ops, Subject::Register(slot as u8), pair, ti);
            } else if written_table[slot] {
                push_with(&mut ops, Subject::Register(slot as u8), pair, ti);
            } else if pair.transitive {
                push_dfs(&mut ops, slot as u8, pair, ti);
                written_table[slot] = true;
            } else {
                push_select(&mut ops, slot as u8, pair, ti);
                written_table[slot] = true;
            }
        }
    }

    // Step 3: remaining entity variables, resolved from their table form.
    for slot in 0..vars.len() {
        if vars.get(slot).kind == VarKind::Table && written_table[slot] && !written_entity[slot] {
            push_each(&mut ops, slot as u8, slot as u8);
            written_entity[slot] = true;
        }
    }

    // Step 4: YIELD.
    let r_in = vars.slot_of(THIS_NAME).map(|s| s as u8).unwrap_or(NO_VAR);
    let idx = ops.len() as i32;
    ops.push(Operation::yield_op(idx + 1, idx - 1, r_in));

    Ok((ops, vars))
}

fn push_with(ops: &mut Vec<Operation>, subject: Subject, pair: Pair, term: usize) {
    let idx = ops.len() as i32;
    ops.push(Operation::with(idx + 1, idx - 1, subject, pair, term));
}

fn push_select(ops: &mut Vec<Operation>, r_out: u8, pair: Pair, term: usize) {
    let idx = ops.len() as i32;
    ops.push(Operation::select(idx + 1, idx - 1, r_out, pair, term));
}

fn push_dfs(ops: &mut Vec<Operation>, r_out: u8, pair: Pair, term: usize) {
    let idx = ops.len() as i32;
    ops.push(Operation::dfs(idx + 1, idx - 1, r_out, pair, term));
}

fn push_each(ops: &mut Vec<Operation>, r_in: u8, r_out: u8) {
    let idx = ops.len() as i32;
    ops.push(Operation::each(idx + 1, idx - 1, r_in, r_out, usize::MAX));
}

/// `write_variable` (`§4.3`): if `ident` names a variable whose table
/// slot is written but whose entity slot is not, splice an `EACH` so the
/// entity form becomes available before this term is emitted.
fn maybe_splice(
    ident: &Identifier,
    vars: &VariableTable,
    written_table: &mut [bool],
    written_entity: &mut [bool],
    ops: &mut Vec<Operation>,
) {
    if !ident.is_variable() {
        return;
    }
    let Some(name) = ident.name.as_deref() else {
        return;
    };
    let Some(slot) = vars.slot_of(name) else {
        return;
    };
    if written_table[slot] && !written_entity[slot] {
        push_each(ops, slot as u8, slot as u8);
        written_entity[slot] = true;
    }
}

fn splice_pred_obj(
    term: &Term,
    vars: &VariableTable,
    written_table: &mut [bool],
    written_entity: &mut [bool],
    ops: &mut Vec<Operation>,
) {
    maybe_splice(&term.pred, vars, written_table, written_entity, ops);
    if let Some(obj) = term.object() {
        maybe_splice(obj, vars, written_table, written_entity, ops);
    }
}

/// `§4.1`: build a term's `(pred, obj)` pair, resolving variable
/// identifiers to their register slot and literal identifiers to their
/// id directly.
fn build_pair<S: Store>(term: &Term, vars: &VariableTable, store: &S) -> Result<Pair> {
    let (pred, pred_is_var) = resolve_identifier(&term.pred, vars)?;
    let has_obj = term.argc() == 2;
    let (obj, obj_is_var) = match term.object() {
        Some(o) => resolve_identifier(o, vars)?,
        None => (0, false),
    };

    let mut reg_mask = RegMask::empty();
    if pred_is_var {
        reg_mask |= RegMask::PRED_IS_VAR;
    }
    if obj_is_var {
        reg_mask |= RegMask::OBJ_IS_VAR;
    }

    let transitive = has_obj && !pred_is_var && store.has_transitive_marker(pred);

    Ok(Pair {
        pred,
        obj,
        has_obj,
        reg_mask,
        transitive,
    })
}

/// Resolve one identifier slot to either a literal id or a variable
/// register slot (encoded as an `Id` for storage in [`Pair`]).
fn resolve_identifier(ident: &Identifier, vars: &VariableTable) -> Result<(Id, bool)> {
    if ident.is_variable() {
        let name = ident
            .name
            .as_deref()
            .ok_or_else(|| Error::UnknownIdentifier("<unnamed>".to_string()))?;
        let slot = vars
            .slot_of(name)
            .ok_or_else(|| Error::UnknownIdentifier(name.to_string()))?;
        Ok((slot as Id, true))
    } else {
        Ok((ident.entity, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::Opcode;
    use crate::store::memory::MemoryStore;

    fn lit(e: Id) -> Identifier {
        Identifier::literal(e)
    }

    fn var(name: &str) -> Identifier {
        Identifier::variable(name)
    }

    #[test]
    fn ground_rule_compiles_to_with_then_yield() {
        let mut store = MemoryStore::new();
        let alice = store.entity("alice");
        let food = store.entity("Food");
        let terms = vec![Term::unary(lit(food), lit(alice))];

        let (ops, _vars) = compile(&terms, &store).unwrap();
        assert_eq!(ops[0].kind, Opcode::Input);
        assert_eq!(ops[1].kind, Opcode::With);
        assert_eq!(ops.last().unwrap().kind, Opcode::Yield);
    }

    #[test]
    fn this_variable_as_subject_uses_select_then_each() {
        let mut store = MemoryStore::new();
        let food = store.entity("Food");
        let terms = vec![Term::unary(lit(food), var("."))];

        let (ops, vars) = compile(&terms, &store).unwrap();
        let kinds: Vec<Opcode> = ops.iter().map(|o| o.kind).collect();
        assert!(kinds.contains(&Opcode::Select));
        assert!(kinds.contains(&Opcode::Each));
        let yield_op = ops.last().unwrap();
        assert_eq!(yield_op.r_in as usize, vars.slot_of(".").unwrap());
    }

    #[test]
    fn transitive_predicate_uses_dfs() {
        let mut store = MemoryStore::new();
        let child_of = store.entity("ChildOf");
        let carol = store.entity("carol");
        store.mark_transitive(child_of);
        let terms = vec![Term::binary(lit(child_of), var("."), lit(carol))];

        let (ops, _vars) = compile(&terms, &store).unwrap();
        assert!(ops.iter().any(|o| o.kind == Opcode::Dfs));
    }
}
