use std::collections::HashSet;

use smallvec::SmallVec;
use snafu::ensure;

use super::Graph;
use crate::error::*;
use crate::{OpId, TensorId};

impl Graph {
    /// Check every structural invariant, reporting the first violation.
    ///
    /// - no tensor is dangling,
    /// - tensor edges name operators in the graph, and those operators agree
    ///   (the source lists the tensor as an output, each target as an input),
    /// - operator edges name tensors in the graph, and those tensors agree,
    /// - predecessor/successor lists match the tensor edges and are symmetric,
    /// - Fuids are unique.
    pub fn validate(&self) -> Result<()> {
        let mut fuids = HashSet::with_capacity(self.num_tensors());

        for (id, tensor) in self.tensors() {
            let fuid = tensor.fuid();
            ensure!(fuids.insert(fuid), DuplicateFuidSnafu { fuid });
            ensure!(!tensor.is_dangling(), DanglingTensorSnafu { fuid });

            if let Some(source) = tensor.source() {
                let op = self.operator(source);
                ensure!(op.is_some(), MissingOperatorSnafu { fuid, op: source });
                ensure!(
                    op.is_some_and(|op| op.outputs().contains(&id)),
                    InconsistentEdgesSnafu { op: source, reason: format!("{id} names it as source but is not an output") }
                );
            }
            for &target in tensor.targets() {
                let op = self.operator(target);
                ensure!(op.is_some(), MissingOperatorSnafu { fuid, op: target });
                ensure!(
                    op.is_some_and(|op| op.inputs().contains(&id)),
                    InconsistentEdgesSnafu { op: target, reason: format!("{id} names it as target but is not an input") }
                );
            }
        }

        for (id, op) in self.operators() {
            for &input in op.inputs() {
                let tensor = self.tensor(input);
                ensure!(tensor.is_some(), MissingTensorSnafu { op: id, tensor: input });
                ensure!(
                    tensor.is_some_and(|t| t.targets().contains(&id)),
                    InconsistentEdgesSnafu { op: id, reason: format!("input {input} does not list it as a target") }
                );
            }
            for &output in op.outputs() {
                let tensor = self.tensor(output);
                ensure!(tensor.is_some(), MissingTensorSnafu { op: id, tensor: output });
                ensure!(
                    tensor.is_some_and(|t| t.source() == Some(id)),
                    InconsistentEdgesSnafu { op: id, reason: format!("output {output} has a different source") }
                );
            }

            let preds = self.expected_predecessors(op.inputs());
            ensure!(
                same_set(&preds, op.predecessors()),
                InconsistentEdgesSnafu {
                    op: id,
                    reason: format!("predecessors {:?}, expected {:?}", op.predecessors(), preds.as_slice())
                }
            );
            let succs = self.expected_successors(op.outputs());
            ensure!(
                same_set(&succs, op.successors()),
                InconsistentEdgesSnafu {
                    op: id,
                    reason: format!("successors {:?}, expected {:?}", op.successors(), succs.as_slice())
                }
            );

            for &pred in op.predecessors() {
                ensure!(
                    self.operator(pred).is_some_and(|p| p.successors().contains(&id)),
                    InconsistentEdgesSnafu { op: id, reason: format!("predecessor {pred} does not list it as successor") }
                );
            }
            for &succ in op.successors() {
                ensure!(
                    self.operator(succ).is_some_and(|s| s.predecessors().contains(&id)),
                    InconsistentEdgesSnafu { op: id, reason: format!("successor {succ} does not list it as predecessor") }
                );
            }
        }

        Ok(())
    }

    /// Assert form of [`validate`](Self::validate).
    ///
    /// # Panics
    /// Panics with the first violated invariant.
    pub fn check_valid(&self) -> bool {
        if let Err(err) = self.validate() {
            panic!("invalid graph: {err}");
        }
        true
    }

    fn expected_predecessors(&self, inputs: &[TensorId]) -> SmallVec<[OpId; 2]> {
        let mut preds = SmallVec::new();
        for &input in inputs {
            if let Some(source) = self.tensor(input).and_then(|t| t.source())
                && !preds.contains(&source)
            {
                preds.push(source);
            }
        }
        preds
    }

    fn expected_successors(&self, outputs: &[TensorId]) -> SmallVec<[OpId; 2]> {
        let mut succs = SmallVec::new();
        for &output in outputs {
            for &target in self.tensor(output).map(|t| t.targets()).unwrap_or_default() {
                if !succs.contains(&target) {
                    succs.push(target);
                }
            }
        }
        succs
    }
}

fn same_set(a: &[OpId], b: &[OpId]) -> bool {
    a.len() == b.len() && a.iter().all(|x| b.contains(x))
}
