//! Generators for property-based testing.
//!
//! Random graphs are built from a [`GraphRecipe`]: every tensor is a cube
//! `[dim; rank]`, so any permutation keeps the shape and any two tensors can
//! be multiplied. That lets a recipe wire operators freely without shape
//! errors while still exercising every rewrite pattern.

use proptest::prelude::*;

use strata_dtype::{DType, DeviceSpec};

use crate::shape::invert_permutation;
use crate::{Graph, OpKind, TensorId};

/// One step of a recipe. Input indices pick from the tensors built so far,
/// modulo their count.
#[derive(Debug, Clone)]
pub enum RecipeStep {
    MatMul { trans_a: bool, trans_b: bool, a: usize, b: usize },
    Transpose { permutation: Vec<usize>, input: usize },
    /// Transpose immediately followed by its inverse.
    TransposePair { permutation: Vec<usize>, input: usize },
    /// Swap of the last two axes, the shape matmul fusion looks for.
    SwapLastTwo { input: usize },
}

#[derive(Debug, Clone)]
pub struct GraphRecipe {
    pub dim: usize,
    pub rank: usize,
    pub dtype: DType,
    pub num_inputs: usize,
    pub steps: Vec<RecipeStep>,
    /// Rotate the operator insertion order by this much.
    pub rotate: usize,
    /// Insert operators back to front (after rotating).
    pub reverse: bool,
}

impl GraphRecipe {
    /// Materialize the recipe.
    ///
    /// All tensors are created first, then operators are added in the
    /// scrambled order with explicit outputs, so the operator list is usually
    /// not topological. Inputs no step consumed are dropped.
    pub fn build(&self) -> Graph {
        let mut graph = Graph::new(DeviceSpec::Cpu);
        let shape = vec![self.dim; self.rank];
        let mut pool: Vec<TensorId> = (0..self.num_inputs).map(|_| graph.add_tensor(&shape, self.dtype)).collect();

        let mut ops: Vec<(OpKind, Vec<TensorId>, TensorId)> = Vec::new();
        let mut push = |graph: &mut Graph, pool: &mut Vec<TensorId>, kind: OpKind, inputs: Vec<TensorId>| {
            let output = graph.add_tensor(&shape, self.dtype);
            ops.push((kind, inputs, output));
            pool.push(output);
            output
        };

        for step in &self.steps {
            match step {
                RecipeStep::MatMul { trans_a, trans_b, a, b } => {
                    let inputs = vec![pool[a % pool.len()], pool[b % pool.len()]];
                    push(&mut graph, &mut pool, OpKind::matmul(*trans_a, *trans_b), inputs);
                }
                RecipeStep::Transpose { permutation, input } => {
                    let x = pool[input % pool.len()];
                    push(&mut graph, &mut pool, OpKind::transpose(Some(permutation.clone())), vec![x]);
                }
                RecipeStep::TransposePair { permutation, input } => {
                    let x = pool[input % pool.len()];
                    let y = push(&mut graph, &mut pool, OpKind::transpose(Some(permutation.clone())), vec![x]);
                    pool.pop();
                    let inverse = invert_permutation(permutation);
                    push(&mut graph, &mut pool, OpKind::transpose(Some(inverse)), vec![y]);
                }
                RecipeStep::SwapLastTwo { input } => {
                    let x = pool[input % pool.len()];
                    let mut permutation: Vec<usize> = (0..self.rank).collect();
                    permutation.swap(self.rank - 2, self.rank - 1);
                    push(&mut graph, &mut pool, OpKind::transpose(Some(permutation)), vec![x]);
                }
            }
        }

        if !ops.is_empty() {
            let shift = self.rotate % ops.len();
            ops.rotate_left(shift);
        }
        if self.reverse {
            ops.reverse();
        }
        for (kind, inputs, output) in ops {
            // Cube shapes make every step well-formed.
            graph.add_operator(kind, &inputs, Some(&[output])).expect("recipe step is well-formed");
        }

        graph.remove_dangling_tensors();
        graph
    }
}

/// Random permutation of `0..rank`.
pub fn arb_permutation(rank: usize) -> impl Strategy<Value = Vec<usize>> {
    Just((0..rank).collect::<Vec<_>>()).prop_shuffle()
}

fn arb_step(rank: usize) -> impl Strategy<Value = RecipeStep> {
    prop_oneof![
        3 => (any::<bool>(), any::<bool>(), any::<usize>(), any::<usize>())
            .prop_map(|(trans_a, trans_b, a, b)| RecipeStep::MatMul { trans_a, trans_b, a, b }),
        2 => (arb_permutation(rank), any::<usize>())
            .prop_map(|(permutation, input)| RecipeStep::Transpose { permutation, input }),
        2 => (arb_permutation(rank), any::<usize>())
            .prop_map(|(permutation, input)| RecipeStep::TransposePair { permutation, input }),
        2 => any::<usize>().prop_map(|input| RecipeStep::SwapLastTwo { input }),
    ]
}

/// Random transpose/matmul DAG recipe.
pub fn arb_graph_recipe() -> impl Strategy<Value = GraphRecipe> {
    (1usize..4, 2usize..=3, 1usize..=3).prop_flat_map(|(dim, rank, num_inputs)| {
        (
            strata_dtype::test::generators::dtype_generator(),
            prop::collection::vec(arb_step(rank), 1..12),
            any::<usize>(),
            any::<bool>(),
        )
            .prop_map(move |(dtype, steps, rotate, reverse)| GraphRecipe {
                dim,
                rank,
                dtype,
                num_inputs,
                steps,
                rotate,
                reverse,
            })
    })
}
