//! The backtracking virtual machine (`§4.4`–`§4.6`).

pub mod eval;
pub mod frame;

use crate::error::{Error, Result};
use crate::ops::{Opcode, Operation};
use crate::store::Store;

use frame::{DfsCtx, EachCtx, OpCtx, Register, SelectCtx, VmLimits, WithCtx};

fn initial_ctx<S: Store>(op: &Operation) -> OpCtx<S> {
    match op.kind {
        Opcode::Select => OpCtx::Select(SelectCtx::default()),
        Opcode::With => OpCtx::With(WithCtx::default()),
        Opcode::Dfs => OpCtx::Dfs(DfsCtx::default()),
        Opcode::Each => OpCtx::Each(EachCtx::default()),
        Opcode::Input | Opcode::Yield => OpCtx::None,
    }
}

/// Drives one compiled program to completion against a borrowed store
/// (`§5`, "Scheduling model"). Owns its own registers/contexts; any
/// number of `VmState`s may run concurrently over the same ops/store
/// (`§5`, "Shared state").
pub struct VmState<'r, 's, S: Store> {
    ops: &'r [Operation],
    store: &'s S,
    limits: VmLimits,
    steps: u64,
    pc: i32,
    resume_redo: bool,
    done: bool,
    /// `registers[i]` is the frame entering op `i`; `registers[i+1]` is
    /// copied forward from it before op `i` runs (`push_registers`,
    /// `§4.6`).
    registers: Vec<Vec<Register<S::Table>>>,
    ctx: Vec<OpCtx<S>>,
}

impl<'r, 's, S: Store> VmState<'r, 's, S> {
    pub fn new(ops: &'r [Operation], store: &'s S, var_count: usize, limits: VmLimits) -> Self {
        let frame_count = ops.len() + 1;
        let registers = (0..frame_count)
            .map(|_| (0..var_count).map(|_| Register::Unbound).collect())
            .collect();
        let ctx = ops.iter().map(initial_ctx).collect();

        VmState {
            ops,
            store,
            limits,
            steps: 0,
            pc: 0,
            resume_redo: false,
            done: false,
            registers,
            ctx,
        }
    }

    /// The register frame as of the most recent successful `next()` —
    /// the state just before the `YIELD` op ran.
    pub fn current_registers(&self) -> &[Register<S::Table>] {
        let idx = self.pc.max(0) as usize;
        &self.registers[idx]
    }

    /// Advance to the next match. `Ok(false)` means no more results; the
    /// `VmState` is then inert (`§6.3`, `rule_next`).
    pub fn next(&mut self) -> Result<bool> {
        if self.done {
            return Ok(false);
        }

        let mut pc = self.pc;
        let mut redo = self.resume_redo;

        loop {
            self.steps += 1;
            if self.steps > self.limits.max_steps {
                return Err(Error::StepBudgetExceeded);
            }

            if pc < 0 {
                self.done = true;
                self.pc = pc;
                return Ok(false);
            }

            let idx = pc as usize;
            let op = &self.ops[idx];

            let (before, after) = self.registers.split_at_mut(idx + 1);
            after[0].clone_from_slice(&before[idx]);
            let ok = eval::eval_op(op, &mut self.ctx[idx], redo, self.store, &before[idx], &mut after[0]);

            if op.kind == Opcode::Yield {
                if !redo {
                    self.pc = idx as i32;
                    self.resume_redo = true;
                    return Ok(true);
                }
                pc = op.on_fail;
                redo = true;
                continue;
            }

            if ok {
                pc = op.on_ok;
                redo = false;
            } else {
                pc = op.on_fail;
                redo = true;
            }
        }
    }
}
