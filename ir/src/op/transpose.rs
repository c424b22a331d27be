use smallvec::{SmallVec, smallvec};
use snafu::ensure;

use crate::error::*;
use crate::shape::{Shape, reversed_permutation, validate_permutation};

use super::{OpType, OperatorContract};

/// Axis permutation: `out[i] = in[permutation[i]]`.
///
/// Without an explicit permutation the axes are reversed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transpose {
    permutation: Option<Vec<usize>>,
}

impl Transpose {
    pub fn new(permutation: Option<Vec<usize>>) -> Self {
        Self { permutation }
    }

    pub fn permutation(&self) -> Option<&[usize]> {
        self.permutation.as_deref()
    }

    /// The permutation this transpose applies to a `rank`-D input.
    pub fn effective_permutation(&self, rank: usize) -> Vec<usize> {
        match &self.permutation {
            Some(perm) => perm.clone(),
            None => reversed_permutation(rank),
        }
    }
}

impl OperatorContract for Transpose {
    fn op_type(&self) -> OpType {
        OpType::Transpose
    }

    fn num_inputs(&self) -> usize {
        1
    }

    fn infer_shape(&mut self, inputs: &[&Shape]) -> Result<SmallVec<[Shape; 1]>> {
        ensure!(inputs.len() == 1, InputCountMismatchSnafu { op: OpType::Transpose, expected: 1usize, got: inputs.len() });
        let input = inputs[0];
        let permutation = self.effective_permutation(input.len());
        validate_permutation(&permutation, input.len())?;

        let output: Shape = permutation.iter().map(|&axis| input[axis]).collect();
        Ok(smallvec![output])
    }
}
