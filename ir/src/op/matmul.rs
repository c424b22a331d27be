use smallvec::{SmallVec, smallvec};
use snafu::ensure;

use crate::error::*;
use crate::shape::{Shape, broadcast_shape};

use super::{OpType, OperatorContract};

/// Batched matrix multiply `C = op(A) · op(B)`, where `op` optionally swaps
/// the last two axes.
///
/// The trailing two axes of each operand are the matrix; everything before
/// them is a batch prefix and broadcasts. `m`, `n`, `k` are recorded by the
/// most recent shape inference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatMul {
    trans_a: bool,
    trans_b: bool,
    m: usize,
    n: usize,
    k: usize,
}

impl MatMul {
    pub fn new(trans_a: bool, trans_b: bool) -> Self {
        Self { trans_a, trans_b, ..Self::default() }
    }

    pub fn trans_a(&self) -> bool {
        self.trans_a
    }

    pub fn trans_b(&self) -> bool {
        self.trans_b
    }

    pub fn set_trans_a(&mut self, trans_a: bool) {
        self.trans_a = trans_a;
    }

    pub fn set_trans_b(&mut self, trans_b: bool) {
        self.trans_b = trans_b;
    }

    /// Flip the transpose flag of input `slot` (0 = A, 1 = B).
    pub fn toggle_trans(&mut self, slot: usize) {
        match slot {
            0 => self.trans_a = !self.trans_a,
            1 => self.trans_b = !self.trans_b,
            _ => panic!("matmul has no input slot {slot}"),
        }
    }

    pub fn m(&self) -> usize {
        self.m
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn mnk(&self) -> (usize, usize, usize) {
        (self.m, self.n, self.k)
    }
}

impl OperatorContract for MatMul {
    fn op_type(&self) -> OpType {
        OpType::MatMul
    }

    fn num_inputs(&self) -> usize {
        2
    }

    fn infer_shape(&mut self, inputs: &[&Shape]) -> Result<SmallVec<[Shape; 1]>> {
        ensure!(inputs.len() == 2, InputCountMismatchSnafu { op: OpType::MatMul, expected: 2usize, got: inputs.len() });
        let (a, b) = (inputs[0], inputs[1]);
        let (rank_a, rank_b) = (a.len(), b.len());
        ensure!(rank_a >= 2 && rank_b >= 2, MatMulRankTooSmallSnafu { lhs_rank: rank_a, rhs_rank: rank_b });

        let (m, k_a) = if self.trans_a { (a[rank_a - 1], a[rank_a - 2]) } else { (a[rank_a - 2], a[rank_a - 1]) };
        let (k_b, n) = if self.trans_b { (b[rank_b - 1], b[rank_b - 2]) } else { (b[rank_b - 2], b[rank_b - 1]) };
        ensure!(
            k_a == k_b,
            ContractionMismatchSnafu { lhs_k: k_a, rhs_k: k_b, lhs_shape: a.clone(), rhs_shape: b.clone() }
        );

        let mut output = broadcast_shape(&a[..rank_a - 2], &b[..rank_b - 2])?;
        output.push(m);
        output.push(n);

        self.m = m;
        self.n = n;
        self.k = k_a;
        Ok(smallvec![output])
    }
}
