use snafu::Snafu;
use strata_dtype::DeviceSpec;

use crate::{Fuid, OpId, OpType, TensorId, shape::Shape};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    // =========================================================================
    // Shapes
    // =========================================================================
    /// Broadcasting shape mismatch.
    #[snafu(display("cannot broadcast shapes {lhs:?} and {rhs:?}"))]
    BroadcastShapeMismatch { lhs: Shape, rhs: Shape },

    /// Axis outside `[-rank, rank)`.
    #[snafu(display("axis {axis} is out of range for rank {rank}"))]
    AxisOutOfRange { axis: isize, rank: usize },

    /// Matmul operands need a matrix in their trailing two axes.
    #[snafu(display("matmul requires operands of rank >= 2, got lhs rank {lhs_rank} and rhs rank {rhs_rank}"))]
    MatMulRankTooSmall { lhs_rank: usize, rhs_rank: usize },

    /// Matmul contraction dimensions differ.
    #[snafu(display("matmul contraction mismatch: lhs {lhs_shape:?} has k={lhs_k}, rhs {rhs_shape:?} has k={rhs_k}"))]
    ContractionMismatch { lhs_k: usize, rhs_k: usize, lhs_shape: Shape, rhs_shape: Shape },

    /// Permutation length differs from the input rank.
    #[snafu(display("permutation length mismatch: expected {expected} axes, got {got}"))]
    PermutationLengthMismatch { expected: usize, got: usize },

    /// Permutation repeats an axis or names one out of range.
    #[snafu(display("invalid permutation {permutation:?}: expected permutation of 0..{rank}"))]
    InvalidPermutation { permutation: Vec<usize>, rank: usize },

    // =========================================================================
    // Graph construction
    // =========================================================================
    #[snafu(display("{op} expects {expected} inputs, got {got}"))]
    InputCountMismatch { op: OpType, expected: usize, got: usize },

    #[snafu(display("{op} produces {expected} outputs, got {got}"))]
    OutputCountMismatch { op: OpType, expected: usize, got: usize },

    #[snafu(display("output {index} has shape {actual:?} but {expected:?} was inferred"))]
    OutputShapeMismatch { index: usize, expected: Shape, actual: Shape },

    #[snafu(display("tensor {tensor} already has a producer"))]
    OutputAlreadyProduced { tensor: TensorId },

    #[snafu(display("tensor runtime mismatch: cannot add a tensor on {actual} to a graph on {expected}"))]
    RuntimeMismatch { expected: DeviceSpec, actual: DeviceSpec },

    #[snafu(display("fuid {fuid} is already present in the graph"))]
    DuplicateFuid { fuid: Fuid },

    #[snafu(display("unknown tensor {id}"))]
    UnknownTensor { id: TensorId },

    #[snafu(display("unknown operator {id}"))]
    UnknownOperator { id: OpId },

    // =========================================================================
    // Ordering
    // =========================================================================
    /// Topological sort could not place every operator.
    #[snafu(display("graph contains a cycle: {remaining} operators could not be ordered"))]
    CycleDetected { remaining: usize },

    // =========================================================================
    // Validation
    // =========================================================================
    /// Tensor with neither producer nor consumers.
    #[snafu(display("tensor {fuid} has no source and no targets"))]
    DanglingTensor { fuid: Fuid },

    /// A tensor edge names an operator that is not in the graph.
    #[snafu(display("tensor {fuid} references operator {op} which is not in the graph"))]
    MissingOperator { fuid: Fuid, op: OpId },

    /// An operator names a tensor that is not in the graph.
    #[snafu(display("operator {op} references tensor {tensor} which is not in the graph"))]
    MissingTensor { op: OpId, tensor: TensorId },

    /// Predecessor/successor lists disagree with tensor edges.
    #[snafu(display("operator {op} has inconsistent edges: {reason}"))]
    InconsistentEdges { op: OpId, reason: String },
}
