//! The computation graph.
//!
//! Tensors and operators live in two arenas owned by the [`Graph`] and refer
//! to each other by [`TensorId`] / [`OpId`]. Removing a node empties its slot;
//! slots are never reused. Two order vectors hold the live nodes: tensors in
//! insertion order, operators in insertion order until [`Graph::topo_sort`]
//! rewrites it.
//!
//! # Edge invariants
//!
//! For every operator `op`:
//! - each input tensor lists `op` among its targets,
//! - each output tensor has `op` as its source,
//! - `op.predecessors` is exactly the set of sources of its inputs and
//!   `op.successors` is exactly the set of targets of its outputs, and both
//!   relations are symmetric.
//!
//! Edges are created only by [`Graph::add_operator_and_connect`] and changed
//! only by the rewiring primitives in this module, which preserve all of the
//! above.

mod rewire;
mod topo;
mod validate;

use std::fmt;

use smallvec::SmallVec;
use snafu::{OptionExt, ensure};
use strata_device::Buffer;
use strata_dtype::{DType, DeviceSpec};
use tracing::trace;

use crate::error::*;
use crate::op::{OpKind, Operator, OperatorContract};
use crate::shape::Shape;
use crate::{Fuid, OpId, Tensor, TensorId};

#[derive(Debug, Clone)]
pub struct Graph {
    device: DeviceSpec,
    pub(crate) tensors: Vec<Option<Tensor>>,
    pub(crate) operators: Vec<Option<Operator>>,
    pub(crate) tensor_order: Vec<TensorId>,
    pub(crate) op_order: Vec<OpId>,
    sorted: bool,
}

impl Graph {
    pub fn new(device: DeviceSpec) -> Self {
        Self {
            device,
            tensors: Vec::new(),
            operators: Vec::new(),
            tensor_order: Vec::new(),
            op_order: Vec::new(),
            sorted: false,
        }
    }

    pub fn device(&self) -> DeviceSpec {
        self.device
    }

    /// Whether the operator order is known to be topological.
    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    pub fn tensor(&self, id: TensorId) -> Option<&Tensor> {
        self.tensors.get(id.index()).and_then(Option::as_ref)
    }

    pub fn operator(&self, id: OpId) -> Option<&Operator> {
        self.operators.get(id.index()).and_then(Option::as_ref)
    }

    /// Mutable access to an operator's parameters.
    pub fn operator_mut(&mut self, id: OpId) -> Option<&mut Operator> {
        self.operators.get_mut(id.index()).and_then(Option::as_mut)
    }

    pub fn contains_tensor(&self, id: TensorId) -> bool {
        self.tensor(id).is_some()
    }

    pub fn contains_operator(&self, id: OpId) -> bool {
        self.operator(id).is_some()
    }

    /// Tensors in graph order.
    pub fn tensor_ids(&self) -> &[TensorId] {
        &self.tensor_order
    }

    /// Operators in graph order (topological after a successful `topo_sort`).
    pub fn operator_ids(&self) -> &[OpId] {
        &self.op_order
    }

    pub fn tensors(&self) -> impl Iterator<Item = (TensorId, &Tensor)> + '_ {
        self.tensor_order.iter().map(|&id| (id, self.t(id)))
    }

    pub fn operators(&self) -> impl Iterator<Item = (OpId, &Operator)> + '_ {
        self.op_order.iter().map(|&id| (id, self.o(id)))
    }

    pub fn num_tensors(&self) -> usize {
        self.tensor_order.len()
    }

    pub fn num_operators(&self) -> usize {
        self.op_order.len()
    }

    /// Tensors without a producer.
    pub fn inputs(&self) -> Vec<TensorId> {
        self.tensors().filter(|(_, t)| t.is_graph_input()).map(|(id, _)| id).collect()
    }

    /// Tensors without a consumer.
    pub fn outputs(&self) -> Vec<TensorId> {
        self.tensors().filter(|(_, t)| t.is_graph_output()).map(|(id, _)| id).collect()
    }

    /// Find the tensor carrying `fuid`.
    pub fn get_tensor(&self, fuid: Fuid) -> Option<TensorId> {
        self.tensors().find(|(_, t)| t.fuid() == fuid).map(|(id, _)| id)
    }

    pub(crate) fn t(&self, id: TensorId) -> &Tensor {
        self.tensor(id).unwrap_or_else(|| panic!("stale tensor handle {id}"))
    }

    pub(crate) fn t_mut(&mut self, id: TensorId) -> &mut Tensor {
        self.tensors.get_mut(id.index()).and_then(Option::as_mut).unwrap_or_else(|| panic!("stale tensor handle {id}"))
    }

    pub(crate) fn o(&self, id: OpId) -> &Operator {
        self.operator(id).unwrap_or_else(|| panic!("stale operator handle {id}"))
    }

    pub(crate) fn o_mut(&mut self, id: OpId) -> &mut Operator {
        self.operator_mut(id).unwrap_or_else(|| panic!("stale operator handle {id}"))
    }

    // =========================================================================
    // Tensors
    // =========================================================================

    /// Create a fresh tensor on the graph's device.
    pub fn add_tensor(&mut self, shape: &[usize], dtype: DType) -> TensorId {
        self.push_tensor(Tensor::new(Shape::from_slice(shape), dtype, self.device))
    }

    /// Copy a tensor from elsewhere into this graph.
    ///
    /// Shape, dtype, Fuid and blob are kept; the copy gets a fresh Guid and
    /// no edges.
    pub fn adopt_tensor(&mut self, tensor: &Tensor) -> Result<TensorId> {
        ensure!(tensor.device() == self.device, RuntimeMismatchSnafu { expected: self.device, actual: tensor.device() });
        ensure!(self.get_tensor(tensor.fuid()).is_none(), DuplicateFuidSnafu { fuid: tensor.fuid() });

        let mut copy = Tensor::with_fuid(tensor.fuid(), tensor.shape().clone(), tensor.dtype(), tensor.device());
        if let Some(blob) = tensor.blob() {
            copy.set_blob(blob.clone());
        }
        Ok(self.push_tensor(copy))
    }

    pub fn adopt_tensors(&mut self, tensors: &[&Tensor]) -> Result<Vec<TensorId>> {
        tensors.iter().map(|tensor| self.adopt_tensor(tensor)).collect()
    }

    pub(crate) fn push_tensor(&mut self, tensor: Tensor) -> TensorId {
        let id = TensorId(self.tensors.len() as u32);
        self.tensors.push(Some(tensor));
        self.tensor_order.push(id);
        id
    }

    /// Overwrite a tensor's shape. Downstream shapes are not touched until
    /// the next [`shape_infer`](Self::shape_infer).
    pub fn set_shape(&mut self, id: TensorId, shape: Shape) {
        self.t_mut(id).set_shape(shape);
    }

    pub fn bind_blob(&mut self, id: TensorId, blob: Buffer) {
        self.t_mut(id).set_blob(blob);
    }

    // =========================================================================
    // Operators
    // =========================================================================

    /// Add an operator reading `inputs`.
    ///
    /// With `outputs` given, those tensors must have exactly the inferred
    /// shapes and no producer yet. Without, fresh output tensors are created
    /// with the first input's dtype.
    pub fn add_operator(&mut self, mut kind: OpKind, inputs: &[TensorId], outputs: Option<&[TensorId]>) -> Result<OpId> {
        let op = kind.op_type();
        ensure!(inputs.len() == kind.num_inputs(), InputCountMismatchSnafu { op, expected: kind.num_inputs(), got: inputs.len() });

        let shapes = inputs
            .iter()
            .map(|&id| self.tensor(id).map(|t| t.shape().clone()).context(UnknownTensorSnafu { id }))
            .collect::<Result<SmallVec<[Shape; 2]>>>()?;
        let refs: SmallVec<[&Shape; 2]> = shapes.iter().collect();
        let inferred = kind.infer_shape(&refs)?;

        let outputs: SmallVec<[TensorId; 1]> = match outputs {
            Some(outputs) => {
                ensure!(outputs.len() == inferred.len(), OutputCountMismatchSnafu { op, expected: inferred.len(), got: outputs.len() });
                for (index, (&id, expected)) in outputs.iter().zip(&inferred).enumerate() {
                    let tensor = self.tensor(id).context(UnknownTensorSnafu { id })?;
                    ensure!(
                        tensor.shape() == expected,
                        OutputShapeMismatchSnafu { index, expected: expected.clone(), actual: tensor.shape().clone() }
                    );
                    ensure!(tensor.source().is_none(), OutputAlreadyProducedSnafu { tensor: id });
                }
                SmallVec::from_slice(outputs)
            }
            None => {
                let dtype = inputs.first().map(|&id| self.t(id).dtype()).unwrap_or(DType::Float32);
                inferred.iter().map(|shape| self.add_tensor(shape, dtype)).collect()
            }
        };

        Ok(self.add_operator_and_connect(Operator::new(kind, inputs, &outputs)))
    }

    /// `C = op(A) · op(B)`; returns `C`.
    pub fn matmul(&mut self, a: TensorId, b: TensorId, trans_a: bool, trans_b: bool) -> Result<TensorId> {
        let op = self.add_operator(OpKind::matmul(trans_a, trans_b), &[a, b], None)?;
        Ok(self.o(op).output())
    }

    /// Permute the axes of `x` (reverse them when `permutation` is `None`);
    /// returns the output tensor.
    pub fn transpose(&mut self, x: TensorId, permutation: Option<Vec<usize>>) -> Result<TensorId> {
        let op = self.add_operator(OpKind::transpose(permutation), &[x], None)?;
        Ok(self.o(op).output())
    }

    /// Append an operator and wire its edges in both directions.
    ///
    /// # Panics
    /// Panics if the operator names a tensor that is not in this graph.
    pub fn add_operator_and_connect(&mut self, operator: Operator) -> OpId {
        let id = OpId(self.operators.len() as u32);
        let inputs = operator.inputs.clone();
        let outputs = operator.outputs.clone();
        self.operators.push(Some(operator));
        self.op_order.push(id);
        self.sorted = false;

        for input in inputs {
            self.t_mut(input).add_target(id);
            if let Some(pred) = self.t(input).source() {
                self.link(pred, id);
            }
        }
        for output in outputs {
            self.t_mut(output).set_source(Some(id));
            for succ in self.t(output).targets().to_vec() {
                self.link(id, succ);
            }
        }

        trace!(op = %id, kind = %self.o(id).op_type(), "operator connected");
        id
    }

    // =========================================================================
    // Shape inference
    // =========================================================================

    /// Re-run shape inference over the current operator order and rewrite
    /// output shapes that changed.
    pub fn shape_infer(&mut self) -> Result<()> {
        for op in self.op_order.clone() {
            let shapes: SmallVec<[Shape; 2]> = self.o(op).inputs().iter().map(|&id| self.t(id).shape().clone()).collect();
            let refs: SmallVec<[&Shape; 2]> = shapes.iter().collect();
            let inferred = self.o_mut(op).kind_mut().infer_shape(&refs)?;

            let outputs = self.o(op).outputs.clone();
            ensure!(
                outputs.len() == inferred.len(),
                OutputCountMismatchSnafu { op: self.o(op).op_type(), expected: inferred.len(), got: outputs.len() }
            );
            for (output, shape) in outputs.into_iter().zip(inferred) {
                if self.t(output).shape() != &shape {
                    let fuid = self.t(output).fuid();
                    let target = self.get_tensor(fuid).context(UnknownTensorSnafu { id: output })?;
                    trace!(tensor = %target, old = ?self.t(target).shape().as_slice(), new = ?shape.as_slice(), "shape updated");
                    self.t_mut(target).set_shape(shape);
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Graph Tensors:")?;
        for (_, tensor) in self.tensors() {
            writeln!(f, "{tensor}")?;
        }

        writeln!(f, "Graph operators:")?;
        for (_, op) in self.operators() {
            let preds: Vec<_> = op.predecessors().iter().map(|&p| self.o(p).guid().get()).collect();
            let succs: Vec<_> = op.successors().iter().map(|&s| self.o(s).guid().get()).collect();
            writeln!(f, "OP {}, pred {preds:?}, succ {succs:?}, {op}", op.guid())?;
        }
        Ok(())
    }
}
