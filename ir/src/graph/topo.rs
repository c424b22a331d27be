use std::collections::HashSet;

use snafu::ensure;
use tracing::debug;

use super::Graph;
use crate::error::*;
use crate::{OpId, TensorId};

impl Graph {
    /// Reorder operators so every producer precedes its consumers.
    ///
    /// Repeated passes over the remaining operators place each one whose
    /// inputs are all graph inputs or produced by already placed operators.
    /// The relative order of independent operators is kept. On a cycle the
    /// graph is left exactly as it was.
    pub fn topo_sort(&mut self) -> Result<()> {
        if self.sorted {
            return Ok(());
        }

        let mut placed: HashSet<OpId> = HashSet::with_capacity(self.op_order.len());
        let mut order: Vec<OpId> = Vec::with_capacity(self.op_order.len());
        let mut passes = 0usize;

        while order.len() < self.op_order.len() {
            passes += 1;
            let mut progressed = false;
            for &op in &self.op_order {
                if placed.contains(&op) {
                    continue;
                }
                if self.o(op).inputs().iter().all(|&input| self.is_available(input, &placed)) {
                    placed.insert(op);
                    order.push(op);
                    progressed = true;
                }
            }

            let remaining = self.op_order.len() - order.len();
            ensure!(progressed, CycleDetectedSnafu { remaining });
        }

        debug!(operators = order.len(), passes, "topological sort");
        self.op_order = order;
        self.sorted = true;
        Ok(())
    }

    fn is_available(&self, tensor: TensorId, placed: &HashSet<OpId>) -> bool {
        match self.t(tensor).source() {
            None => true,
            Some(source) => placed.contains(&source),
        }
    }

    /// Forget the cached order so the next `topo_sort` recomputes it.
    pub fn invalidate_order(&mut self) {
        self.sorted = false;
    }
}
