//! Operators and the contract every operator kind implements.
//!
//! An [`Operator`] is a graph node: an [`OpKind`] (what it computes, plus the
//! parameters shape inference records) together with its input and output
//! tensors and the derived predecessor/successor lists. Edges are only ever
//! changed through [`Graph`](crate::Graph) so the two sides stay in sync.

mod matmul;
mod transpose;

use std::fmt;

use smallvec::SmallVec;

use crate::{Guid, OpId, Result, TensorId, shape::Shape};

pub use matmul::MatMul;
pub use transpose::Transpose;

/// Operator discriminant, for dispatch and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum OpType {
    #[strum(serialize = "Matmul")]
    MatMul,
    Transpose,
}

/// Per-kind operator behavior.
pub trait OperatorContract {
    fn op_type(&self) -> OpType;

    fn num_inputs(&self) -> usize;

    fn num_outputs(&self) -> usize {
        1
    }

    /// Compute output shapes from input shapes.
    ///
    /// Takes `&mut self` because some kinds record derived parameters (the
    /// matmul `m`, `n`, `k`) while they infer.
    fn infer_shape(&mut self, inputs: &[&Shape]) -> Result<SmallVec<[Shape; 1]>>;
}

/// Closed set of operator kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpKind {
    MatMul(MatMul),
    Transpose(Transpose),
}

impl OpKind {
    pub fn matmul(trans_a: bool, trans_b: bool) -> Self {
        OpKind::MatMul(MatMul::new(trans_a, trans_b))
    }

    pub fn transpose(permutation: Option<Vec<usize>>) -> Self {
        OpKind::Transpose(Transpose::new(permutation))
    }

    fn contract(&self) -> &dyn OperatorContract {
        match self {
            OpKind::MatMul(op) => op,
            OpKind::Transpose(op) => op,
        }
    }

    fn contract_mut(&mut self) -> &mut dyn OperatorContract {
        match self {
            OpKind::MatMul(op) => op,
            OpKind::Transpose(op) => op,
        }
    }
}

impl OperatorContract for OpKind {
    fn op_type(&self) -> OpType {
        self.contract().op_type()
    }

    fn num_inputs(&self) -> usize {
        self.contract().num_inputs()
    }

    fn num_outputs(&self) -> usize {
        self.contract().num_outputs()
    }

    fn infer_shape(&mut self, inputs: &[&Shape]) -> Result<SmallVec<[Shape; 1]>> {
        self.contract_mut().infer_shape(inputs)
    }
}

impl From<MatMul> for OpKind {
    fn from(op: MatMul) -> Self {
        OpKind::MatMul(op)
    }
}

impl From<Transpose> for OpKind {
    fn from(op: Transpose) -> Self {
        OpKind::Transpose(op)
    }
}

/// Operator node.
#[derive(Debug, Clone)]
pub struct Operator {
    guid: Guid,
    kind: OpKind,
    pub(crate) inputs: SmallVec<[TensorId; 2]>,
    pub(crate) outputs: SmallVec<[TensorId; 1]>,
    pub(crate) predecessors: SmallVec<[OpId; 2]>,
    pub(crate) successors: SmallVec<[OpId; 2]>,
}

impl Operator {
    /// Unconnected operator. [`Graph::add_operator_and_connect`](crate::Graph::add_operator_and_connect)
    /// registers its edges.
    pub fn new(kind: OpKind, inputs: &[TensorId], outputs: &[TensorId]) -> Self {
        Self {
            guid: Guid::next(),
            kind,
            inputs: SmallVec::from_slice(inputs),
            outputs: SmallVec::from_slice(outputs),
            predecessors: SmallVec::new(),
            successors: SmallVec::new(),
        }
    }

    pub fn guid(&self) -> Guid {
        self.guid
    }

    pub fn op_type(&self) -> OpType {
        self.kind.op_type()
    }

    pub fn kind(&self) -> &OpKind {
        &self.kind
    }

    /// Mutable parameters. Edges are not reachable from here.
    pub fn kind_mut(&mut self) -> &mut OpKind {
        &mut self.kind
    }

    pub fn inputs(&self) -> &[TensorId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TensorId] {
        &self.outputs
    }

    pub fn output(&self) -> TensorId {
        self.outputs[0]
    }

    pub fn predecessors(&self) -> &[OpId] {
        &self.predecessors
    }

    pub fn successors(&self) -> &[OpId] {
        &self.successors
    }

    pub fn as_matmul(&self) -> Option<&MatMul> {
        match &self.kind {
            OpKind::MatMul(op) => Some(op),
            _ => None,
        }
    }

    pub fn as_matmul_mut(&mut self) -> Option<&mut MatMul> {
        match &mut self.kind {
            OpKind::MatMul(op) => Some(op),
            _ => None,
        }
    }

    pub fn as_transpose(&self) -> Option<&Transpose> {
        match &self.kind {
            OpKind::Transpose(op) => Some(op),
            _ => None,
        }
    }

    pub(crate) fn add_predecessor(&mut self, op: OpId) {
        if !self.predecessors.contains(&op) {
            self.predecessors.push(op);
        }
    }

    pub(crate) fn add_successor(&mut self, op: OpId) {
        if !self.successors.contains(&op) {
            self.successors.push(op);
        }
    }

    pub(crate) fn remove_predecessor(&mut self, op: OpId) {
        self.predecessors.retain(|p| *p != op);
    }

    pub(crate) fn remove_successor(&mut self, op: OpId) {
        self.successors.retain(|s| *s != op);
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            OpKind::MatMul(mm) => {
                let (a, b) = (self.inputs[0], self.inputs[1]);
                let lhs = if mm.trans_a() { "A^T" } else { "A" };
                let rhs = if mm.trans_b() { "B^T" } else { "B" };
                let (m, n, k) = mm.mnk();
                write!(f, "Matmul([{lhs},{rhs}],A={a},B={b},C={},mnk=[{m},{n},{k}])", self.output())
            }
            OpKind::Transpose(tr) => {
                write!(f, "Transpose[{}](input={},output={}", self.guid, self.inputs[0], self.output())?;
                match tr.permutation() {
                    Some(perm) => write!(f, ",perm={perm:?})"),
                    None => write!(f, ",perm=reversed)"),
                }
            }
        }
    }
}
