//! Public API (`§6.3`): compiled rules and their backtracking iterators.

use crate::diagnostics::{self, Sink};
use crate::error::Result;
use crate::id::Id;
use crate::ops::{Operation, Subject, NO_VAR};
use crate::pair::Pair;
use crate::program;
use crate::signature::Term;
use crate::store::Store;
use crate::variable::{VarKind, VariableTable};
use crate::vm::frame::VmLimits;
use crate::vm::VmState;

/// A compiled term list (`rule_new`/`rule_free`, `§6.3`). Immutable once
/// built; any number of [`RuleIter`]s may run over it concurrently,
/// each owning its own registers and per-op contexts (`§5`, "Shared
/// state").
#[derive(Debug)]
pub struct Rule {
    ops: Vec<Operation>,
    vars: VariableTable,
    expr: String,
}

impl Rule {
    /// `rule_new`: compile `terms` against `store`. On failure, writes
    /// the `§7` diagnostic line (`error: <expr>: <message>`) to `sink`
    /// before returning the error; no partial `Rule` is ever produced.
    pub fn new<S: Store>(
        expr: impl Into<String>,
        terms: &[Term],
        store: &S,
        sink: &dyn Sink,
    ) -> Result<Rule> {
        let expr = expr.into();
        program::compile(terms, store)
            .map(|(ops, vars)| Rule { ops, vars, expr: expr.clone() })
            .map_err(|err| {
                sink.error(&diagnostics::format_error(&expr, &err.to_string()));
                err
            })
    }

    /// The source expression this rule was compiled from (`§5`,
    /// "Resource lifetimes" — the cached signature).
    pub fn expr(&self) -> &str {
        &self.expr
    }

    pub fn variable_count(&self) -> usize {
        self.vars.len()
    }

    pub fn find_variable(&self, name: &str) -> Option<usize> {
        self.vars.slot_of(name)
    }

    pub fn variable_name(&self, slot: usize) -> &str {
        &self.vars.get(slot).name
    }

    /// `rule_iter`: start a fresh backtracking iterator over `store`,
    /// with the default step budget (`VmLimits::default`).
    pub fn iter<'r, 's, S: Store>(&'r self, store: &'s S) -> RuleIter<'r, 's, S> {
        self.iter_with_limits(store, VmLimits::default())
    }

    pub fn iter_with_limits<'r, 's, S: Store>(
        &'r self,
        store: &'s S,
        limits: VmLimits,
    ) -> RuleIter<'r, 's, S> {
        RuleIter {
            rule: self,
            vm: VmState::new(&self.ops, store, self.vars.len(), limits),
        }
    }

    /// `rule_str` (`SPEC_FULL §10`): stable diagnostic disassembly, one
    /// line per op, matching the original's column layout exactly.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        for (idx, op) in self.ops.iter().enumerate() {
            out.push_str(&disassemble_op(idx, op, &self.vars));
            out.push('\n');
        }
        out
    }
}

fn var_label(vars: &VariableTable, slot: u8) -> String {
    if slot == NO_VAR {
        return "-".to_string();
    }
    let v = vars.get(slot as usize);
    match v.kind {
        VarKind::Table => format!("t{}", v.name),
        VarKind::Entity => v.name.clone(),
    }
}

fn left_label(vars: &VariableTable, op: &Operation) -> String {
    match &op.subject {
        Some(Subject::Literal(id)) => id.to_string(),
        Some(Subject::Register(slot)) => var_label(vars, *slot),
        None => var_label(vars, op.r_in),
    }
}

fn pair_label(vars: &VariableTable, pair: &Pair) -> String {
    let pred = match pair.pred_slot() {
        Some(slot) => var_label(vars, slot),
        None => pair.pred.to_string(),
    };
    let obj = if !pair.has_obj {
        "-".to_string()
    } else {
        match pair.obj_slot() {
            Some(slot) => var_label(vars, slot),
            None => pair.obj.to_string(),
        }
    };
    format!("{pred}, {obj}")
}

fn disassemble_op(idx: usize, op: &Operation, vars: &VariableTable) -> String {
    format!(
        "{idx}: [Pass:{}, Fail:{}] {} {} > {} ({})",
        op.on_ok,
        op.on_fail,
        op.kind.mnemonic(),
        left_label(vars, op),
        var_label(vars, op.r_out),
        pair_label(vars, &op.pair),
    )
}

/// A running backtracking evaluation of a [`Rule`] over one store
/// (`rule_iter`/`rule_next`, `§6.3`). Borrows the rule's compiled ops
/// and the store for its lifetime; owns its registers and per-op
/// resumption contexts.
pub struct RuleIter<'r, 's, S: Store> {
    rule: &'r Rule,
    vm: VmState<'r, 's, S>,
}

impl<'r, 's, S: Store> RuleIter<'r, 's, S> {
    /// `rule_next`: advance to the next match. `Ok(false)` means no more
    /// results and the iterator is now inert.
    pub fn next(&mut self) -> Result<bool> {
        self.vm.next()
    }

    pub fn variable_count(&self) -> usize {
        self.rule.variable_count()
    }

    pub fn find_variable(&self, name: &str) -> Option<usize> {
        self.rule.find_variable(name)
    }

    pub fn variable_name(&self, slot: usize) -> &str {
        self.rule.variable_name(slot)
    }

    /// `rule_variable_is_entity`: whether variable `slot` is bound to an
    /// entity as of the most recent successful `next()`. `program::compile`
    /// eagerly materializes every table-kind variable to its entity form
    /// before `YIELD` (`§4.3` step 3), so this is `true` for every bound
    /// variable in this implementation; see DESIGN.md.
    pub fn variable_is_entity(&self, slot: usize) -> bool {
        self.vm
            .current_registers()
            .get(slot)
            .map(|r| r.as_entity().is_some())
            .unwrap_or(false)
    }

    /// `rule_variable`: the resolved entity id for variable `slot`, if
    /// bound as of the most recent successful `next()`.
    pub fn variable(&self, slot: usize) -> Option<Id> {
        self.vm.current_registers().get(slot).and_then(|r| r.as_entity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NullSink;
    use crate::signature::Identifier;
    use crate::store::memory::MemoryStore;

    fn lit(e: Id) -> Identifier {
        Identifier::literal(e)
    }

    fn var(name: &str) -> Identifier {
        Identifier::variable(name)
    }

    #[test]
    fn disassembly_has_one_line_per_op_and_ends_in_yield() {
        let mut store = MemoryStore::new();
        let food = store.entity("Food");
        let terms = vec![Term::unary(lit(food), var("."))];
        let rule = Rule::new("Food(.)", &terms, &store, &NullSink).unwrap();

        let text = rule.disassemble();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines.last().unwrap().contains("yield"));
        assert!(lines[0].contains("input"));
    }

    #[test]
    fn iterating_yields_every_matching_entity() {
        let mut store = MemoryStore::new();
        let food = store.entity("Food");
        let a = store.entity("a");
        let b = store.entity("b");
        let c = store.entity("c");
        let toy = store.entity("Toy");
        let d = store.entity("d");
        store.add(a, food);
        store.add(b, food);
        store.add(c, food);
        store.add(d, toy);

        let terms = vec![Term::unary(lit(food), var("."))];
        let rule = Rule::new("Food(.)", &terms, &store, &NullSink).unwrap();
        let this_slot = rule.find_variable(".").unwrap();

        let mut iter = rule.iter(&store);
        let mut seen = Vec::new();
        while iter.next().unwrap() {
            seen.push(iter.variable(this_slot).unwrap());
        }
        seen.sort_unstable();
        let mut expect = [a, b, c];
        expect.sort_unstable();
        assert_eq!(seen, expect);
    }

    #[test]
    fn empty_store_yields_nothing() {
        let store = MemoryStore::new();
        let terms = vec![Term::unary(lit(1), var("."))];
        let rule = Rule::new("Missing(.)", &terms, &store, &NullSink).unwrap();
        let mut iter = rule.iter(&store);
        assert!(!iter.next().unwrap());
    }
}
