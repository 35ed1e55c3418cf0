//! Variable discovery and join-order assignment (`§4.2`).
//!
//! Two passes over the terms: root election + kind registration, then depth
//! assignment via a cycle-guarded recursion (`get_variable_depth`) followed
//! by a second pass (`crawl_variable`) that links variables only reachable
//! through a shared, non-subject position (`(X, Y), (Z, Y)` links `Z` to the
//! graph through `Y`).

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::signature::{Identifier, Term};

/// A subject variable drives table-level filtering (`SELECT`/`DFS`); an
/// object/predicate-only variable is resolved per-row (`EACH`). Table
/// sorts before Entity so join order puts table filtering first (`§4.2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VarKind {
    Table,
    Entity,
}

/// Sentinel meaning "not yet reachable from the root".
pub const MAX_DEPTH: u8 = u8::MAX;

/// Maximum number of terms a single subject variable may occur in (`§4.2`).
pub const MAX_OCCURS: u16 = 256;

/// Reserved name of the implicit `this` variable (`§ GLOSSARY`).
pub const THIS_NAME: &str = ".";

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
    pub occurs: u16,
    pub depth: u8,
}

/// The sorted variable table produced by [`analyze`]. Slot indices are the
/// register/column indices used throughout compilation and the VM.
#[derive(Debug, Default)]
pub struct VariableTable {
    vars: Vec<Variable>,
    slots: HashMap<String, usize>,
}

impl VariableTable {
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn get(&self, slot: usize) -> &Variable {
        &self.vars[slot]
    }

    pub fn slot_of(&self, name: &str) -> Option<usize> {
        self.slots.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.vars.iter()
    }
}

fn var_name(ident: &Identifier) -> Option<&str> {
    ident.is_variable().then(|| ident.name.as_deref().unwrap())
}

/// Run both passes of `§4.2` over `terms`, returning the sorted variable
/// table, or an error if a term is malformed or a subject variable is
/// unconstrained.
pub fn analyze(terms: &[Term]) -> Result<VariableTable> {
    let mut vars: Vec<Variable> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for term in terms {
        if term.argc() == 0 || term.argc() > 2 {
            return Err(Error::MalformedTerm(format!(
                "term has {} arguments",
                term.argc()
            )));
        }
        check_triple_variable(term)?;

        if let Some(name) = var_name(term.subject()) {
            let slot = ensure_variable(&mut vars, &mut index, name, VarKind::Table);
            vars[slot].kind = VarKind::Table;
            vars[slot].occurs += 1;
            if vars[slot].occurs > MAX_OCCURS {
                return Err(Error::TooManyOccurrences(name.to_string()));
            }
        }
        if let Some(name) = var_name(&term.pred) {
            let slot = ensure_variable(&mut vars, &mut index, name, VarKind::Entity);
            vars[slot].occurs += 1;
        }
        if let Some(obj) = term.object() {
            if let Some(name) = var_name(obj) {
                let slot = ensure_variable(&mut vars, &mut index, name, VarKind::Entity);
                vars[slot].occurs += 1;
            }
        }
    }

    if vars.iter().any(|v| v.kind == VarKind::Table) {
        assign_depths(&mut vars, &index, terms)?;
    }

    let order = sort_order(&vars);
    let (vars, slots) = reorder(vars, order);

    Ok(VariableTable { vars, slots })
}

/// Reject `P(X, X)` where `P` is itself the variable `X` (`§9`, Open
/// Question — resolved as a compile-time error).
fn check_triple_variable(term: &Term) -> Result<()> {
    if term.argc() != 2 {
        return Ok(());
    }
    let pred = var_name(&term.pred);
    let subj = var_name(term.subject());
    let obj = var_name(term.object().unwrap());
    if let (Some(p), Some(s), Some(o)) = (pred, subj, obj) {
        if p == s && s == o {
            return Err(Error::AmbiguousTripleVariable(p.to_string()));
        }
    }
    Ok(())
}

fn ensure_variable(
    vars: &mut Vec<Variable>,
    index: &mut HashMap<String, usize>,
    name: &str,
    kind: VarKind,
) -> usize {
    if let Some(&slot) = index.get(name) {
        return slot;
    }
    let slot = vars.len();
    vars.push(Variable {
        name: name.to_string(),
        kind,
        occurs: 0,
        depth: 0,
    });
    index.insert(name.to_string(), slot);
    slot
}

fn subject_slot(term: &Term, index: &HashMap<String, usize>) -> Option<usize> {
    var_name(term.subject()).and_then(|n| index.get(n).copied())
}

fn pred_slot(term: &Term, index: &HashMap<String, usize>) -> Option<usize> {
    var_name(&term.pred).and_then(|n| index.get(n).copied())
}

fn obj_slot(term: &Term, index: &HashMap<String, usize>) -> Option<usize> {
    term.object()
        .and_then(var_name)
        .and_then(|n| index.get(n).copied())
}

struct Resolver<'a> {
    vars: &'a mut [Variable],
    index: &'a HashMap<String, usize>,
    terms: &'a [Term],
    marked: Vec<bool>,
}

impl<'a> Resolver<'a> {
    /// `get_variable_depth` (`§4.2`): recursive, cycle-guarded depth
    /// assignment following only dependencies on *other subject*
    /// variables. Predicate/object variables that never occur as a
    /// subject are deliberately discarded here — `crawl_variable` links
    /// them in afterward.
    fn depth_of(&mut self, slot: usize) -> u8 {
        if self.marked[slot] {
            // Cycle back-edge: the spec directs this case to depth 0.
            return self.vars[slot].depth;
        }
        self.marked[slot] = true;

        let mut best: Option<u8> = None;
        for term in self.terms {
            if subject_slot(term, self.index) != Some(slot) {
                continue;
            }

            let pred_dep = pred_slot(term, self.index)
                .filter(|&s| s != slot && self.vars[s].kind == VarKind::Table);
            let obj_dep = obj_slot(term, self.index)
                .filter(|&s| s != slot && self.vars[s].kind == VarKind::Table);

            if pred_dep.is_none() && obj_dep.is_none() {
                // Neither lane depends on another Table-kind variable (the
                // other lane may still be a literal or a plain,
                // never-a-subject variable) — this term alone grounds
                // `slot` at depth 0.
                best = Some(0);
                continue;
            }

            // Depth of `v` is the *minimum* over `depth(dep) + 1` across
            // this term's dependencies, not the maximum (`§4.2`).
            let mut d: Option<u8> = None;
            if let Some(p) = pred_dep {
                d = Some(self.depth_of(p).saturating_add(1));
            }
            if let Some(o) = obj_dep {
                let od = self.depth_of(o).saturating_add(1);
                d = Some(d.map_or(od, |d: u8| d.min(od)));
            }
            let d = d.expect("at least one dependency present in this branch");
            best = Some(best.map_or(d, |b| b.min(d)));
        }

        let depth = best.unwrap_or(MAX_DEPTH);
        self.vars[slot].depth = depth;
        depth
    }
}

fn assign_depths(vars: &mut [Variable], index: &HashMap<String, usize>, terms: &[Term]) -> Result<()> {
    let root = elect_root(vars, index);
    let mut marked = vec![false; vars.len()];

    if let Some(root) = root {
        vars[root].depth = 0;
        marked[root] = true;
    }

    {
        let mut resolver = Resolver {
            vars,
            index,
            terms,
            marked,
        };
        for slot in 0..resolver.vars.len() {
            if resolver.vars[slot].kind == VarKind::Table && !resolver.marked[slot] {
                resolver.depth_of(slot);
            }
        }
    }

    crawl_variable(vars, index, terms);

    for v in vars.iter() {
        if v.kind == VarKind::Table && v.depth == MAX_DEPTH {
            return Err(Error::UnconstrainedVariable(v.name.clone()));
        }
    }
    Ok(())
}

fn elect_root(vars: &[Variable], index: &HashMap<String, usize>) -> Option<usize> {
    if let Some(&slot) = index.get(THIS_NAME) {
        if vars[slot].kind == VarKind::Table {
            return Some(slot);
        }
    }
    // `max_by_key` returns the *last* maximum on ties; discovery order
    // should win instead, so scan in reverse and let an earlier index
    // overwrite a later one of equal weight.
    vars.iter()
        .enumerate()
        .filter(|(_, v)| v.kind == VarKind::Table)
        .rev()
        .max_by_key(|(_, v)| v.occurs)
        .map(|(i, _)| i)
}

/// `crawl_variable` (`§4.2`): propagate depth through a shared non-subject
/// position, e.g. `(X, Y), (Z, Y)` links `Z`'s depth to `X`'s through the
/// common object `Y` even though `Y` is never itself a subject.
fn crawl_variable(vars: &mut [Variable], index: &HashMap<String, usize>, terms: &[Term]) {
    let mut changed = true;
    let mut guard = 0;
    while changed && guard <= vars.len() + 1 {
        changed = false;
        guard += 1;
        for term in terms {
            let slots: Vec<usize> = [
                subject_slot(term, index),
                pred_slot(term, index),
                obj_slot(term, index),
            ]
            .into_iter()
            .flatten()
            .collect();

            for &target in &slots {
                if vars[target].depth != MAX_DEPTH {
                    continue;
                }
                let candidate = slots
                    .iter()
                    .filter(|&&s| s != target)
                    .filter_map(|&s| (vars[s].depth != MAX_DEPTH).then_some(vars[s].depth))
                    .min();
                if let Some(c) = candidate {
                    vars[target].depth = c.saturating_add(1);
                    changed = true;
                }
            }
        }
    }
}

/// `(kind asc, depth asc, occurs desc)`, stable — ties keep discovery
/// order (`§4.2`, `§9` Open Question).
fn sort_order(vars: &[Variable]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..vars.len()).collect();
    order.sort_by(|&a, &b| {
        vars[a]
            .kind
            .cmp(&vars[b].kind)
            .then(vars[a].depth.cmp(&vars[b].depth))
            .then(vars[b].occurs.cmp(&vars[a].occurs))
    });
    order
}

fn reorder(vars: Vec<Variable>, order: Vec<usize>) -> (Vec<Variable>, HashMap<String, usize>) {
    let reordered: Vec<Variable> = order.iter().map(|&i| vars[i].clone()).collect();
    let slots = reordered
        .iter()
        .enumerate()
        .map(|(slot, v)| (v.name.clone(), slot))
        .collect();
    (reordered, slots)
}

impl Clone for Variable {
    fn clone(&self) -> Self {
        Variable {
            name: self.name.clone(),
            kind: self.kind,
            occurs: self.occurs,
            depth: self.depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::WILDCARD;

    fn lit(e: u64) -> Identifier {
        Identifier::literal(e)
    }

    fn var(name: &str) -> Identifier {
        Identifier::variable(name)
    }

    #[test]
    fn ground_rule_has_no_table_variables() {
        let terms = vec![Term::unary(lit(1), lit(2))];
        let table = analyze(&terms).unwrap();
        assert!(table.iter().all(|v| v.kind == VarKind::Entity) || table.is_empty());
    }

    #[test]
    fn this_variable_is_elected_root() {
        let terms = vec![
            Term::binary(lit(1), var("."), lit(2)),
            Term::binary(lit(1), var("X"), lit(3)),
        ];
        let table = analyze(&terms).unwrap();
        let this_slot = table.slot_of(".").unwrap();
        assert_eq!(table.get(this_slot).depth, 0);
    }

    #[test]
    fn unconstrained_subject_variable_is_rejected() {
        let terms = vec![Term::binary(lit(1), var("X"), var("Y"))];
        let err = analyze(&terms).unwrap_err();
        assert!(matches!(err, Error::UnconstrainedVariable(_)));
    }

    #[test]
    fn shared_object_links_otherwise_unconstrained_variable() {
        // (X, Y), (Z, Y) — Z reaches the graph through the shared object Y,
        // with X itself grounded directly.
        let terms = vec![
            Term::binary(lit(1), var("X"), lit(WILDCARD)),
            Term::binary(lit(2), var("X"), var("Y")),
            Term::binary(lit(3), var("Z"), var("Y")),
        ];
        let table = analyze(&terms).unwrap();
        let z = table.get(table.slot_of("Z").unwrap());
        assert_ne!(z.depth, MAX_DEPTH);
    }

    #[test]
    fn triple_variable_term_is_rejected() {
        let terms = vec![Term::binary(var("X"), var("X"), var("X"))];
        let err = analyze(&terms).unwrap_err();
        assert!(matches!(err, Error::AmbiguousTripleVariable(_)));
    }

    #[test]
    fn table_variables_sort_before_entity_variables() {
        let terms = vec![Term::binary(var("P"), var("X"), lit(1))];
        let table = analyze(&terms).unwrap();
        let x = table.slot_of("X").unwrap();
        let p = table.slot_of("P").unwrap();
        assert!(x < p);
    }
}
