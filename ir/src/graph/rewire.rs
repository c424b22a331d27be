//! Edge rewiring primitives.
//!
//! Each primitive updates tensors and operators together so the edge
//! invariants hold again when it returns. Any change to edges invalidates the
//! cached topological order.

use smallvec::SmallVec;
use tracing::trace;

use super::Graph;
use crate::op::Operator;
use crate::{OpId, TensorId};

impl Graph {
    pub(super) fn link(&mut self, pred: OpId, succ: OpId) {
        self.o_mut(pred).add_successor(succ);
        self.o_mut(succ).add_predecessor(pred);
    }

    fn unlink(&mut self, pred: OpId, succ: OpId) {
        self.o_mut(pred).remove_successor(succ);
        self.o_mut(succ).remove_predecessor(pred);
    }

    /// Recompute `op`'s predecessors from the sources of its inputs.
    fn refresh_predecessors(&mut self, op: OpId) {
        let mut wanted: SmallVec<[OpId; 2]> = SmallVec::new();
        for &input in self.o(op).inputs() {
            if let Some(source) = self.t(input).source()
                && !wanted.contains(&source)
            {
                wanted.push(source);
            }
        }

        for pred in self.o(op).predecessors().to_vec() {
            if !wanted.contains(&pred) {
                self.unlink(pred, op);
            }
        }
        for pred in wanted {
            self.link(pred, op);
        }
    }

    /// Make input `slot` of `op` read `new` instead of its current tensor.
    ///
    /// # Panics
    /// Panics if either handle is stale or `slot` is out of range.
    pub fn replace_input(&mut self, op: OpId, slot: usize, new: TensorId) {
        let old = self.o(op).inputs()[slot];
        if old == new {
            return;
        }
        assert!(self.contains_tensor(new), "stale tensor handle {new}");

        self.o_mut(op).inputs[slot] = new;
        if !self.o(op).inputs().contains(&old) {
            self.t_mut(old).remove_target(op);
        }
        self.t_mut(new).add_target(op);
        self.refresh_predecessors(op);
        self.sorted = false;

        trace!(op = %op, slot, old = %old, new = %new, "input replaced");
    }

    /// Make every consumer of `old` read `new` instead. Returns the number of
    /// operators rewired.
    pub fn replace_all_uses(&mut self, old: TensorId, new: TensorId) -> usize {
        if old == new {
            return 0;
        }

        let consumers = self.t(old).targets().to_vec();
        for &op in &consumers {
            let slots: SmallVec<[usize; 2]> =
                self.o(op).inputs().iter().enumerate().filter(|(_, t)| **t == old).map(|(slot, _)| slot).collect();
            for slot in slots {
                self.replace_input(op, slot, new);
            }
        }
        consumers.len()
    }

    /// Cut every edge of `op`, leaving it in the graph with no neighbours.
    ///
    /// Its input tensors no longer list it as a consumer and its outputs lose
    /// their source. The operator keeps its own input/output lists so the
    /// caller can still inspect what it was wired to.
    pub fn detach_operator(&mut self, op: OpId) {
        for input in self.o(op).inputs().to_vec() {
            self.t_mut(input).remove_target(op);
        }
        for output in self.o(op).outputs().to_vec() {
            if self.t(output).source() == Some(op) {
                self.t_mut(output).set_source(None);
            }
        }
        for pred in self.o(op).predecessors().to_vec() {
            self.unlink(pred, op);
        }
        for succ in self.o(op).successors().to_vec() {
            self.unlink(op, succ);
        }
        self.sorted = false;

        trace!(op = %op, "operator detached");
    }

    /// Detach and delete `op`, returning it.
    pub fn remove_operator(&mut self, op: OpId) -> Operator {
        self.detach_operator(op);
        self.op_order.retain(|&id| id != op);
        let removed = self.operators[op.index()].take();
        removed.unwrap_or_else(|| panic!("stale operator handle {op}"))
    }

    /// Delete tensors with neither producer nor consumers. Returns how many
    /// were removed.
    pub fn remove_dangling_tensors(&mut self) -> usize {
        let dangling: Vec<TensorId> = self.tensors().filter(|(_, t)| t.is_dangling()).map(|(id, _)| id).collect();
        for &id in &dangling {
            self.tensors[id.index()] = None;
        }
        self.tensor_order.retain(|id| !dangling.contains(id));

        if !dangling.is_empty() {
            trace!(removed = dangling.len(), "dangling tensors removed");
        }
        dangling.len()
    }
}
