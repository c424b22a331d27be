//! Transpose→Matmul fusion.
//!
//! ```text
//! x ─ Transpose(swap last two) ─ t ─ Matmul(t, b)    ⇒    x ─ Matmul(x^T, b)
//! ```
//!
//! Fires only when the transpose output feeds nothing but this matmul. The
//! matmul reads the transpose input directly and flips the matching
//! transpose flag; the transpose is deleted once nothing reads its output.

use strata_ir::shape::is_swap_last_two;
use strata_ir::{Graph, OpId, OpType};
use tracing::trace;

/// Apply the fusion everywhere it matches. Returns the number of fused slots.
pub(crate) fn fuse_transpose_matmul(graph: &mut Graph) -> usize {
    let mut fused = 0;

    for op in graph.operator_ids().to_vec() {
        if !graph.operator(op).is_some_and(|o| o.op_type() == OpType::MatMul) {
            continue;
        }
        for slot in 0..2 {
            if fuse_slot(graph, op, slot) {
                fused += 1;
            }
        }
    }

    fused
}

fn fuse_slot(graph: &mut Graph, matmul: OpId, slot: usize) -> bool {
    let Some(operator) = graph.operator(matmul) else { return false };
    let input = operator.inputs()[slot];
    let Some(tensor) = graph.tensor(input) else { return false };
    let Some(producer) = tensor.source() else { return false };

    if tensor.targets() != [matmul] {
        return false;
    }
    let Some(transpose) = graph.operator(producer) else { return false };
    let Some(params) = transpose.as_transpose() else { return false };

    let x = transpose.inputs()[0];
    let Some(rank) = graph.tensor(x).map(|t| t.rank()) else { return false };
    if !is_swap_last_two(&params.effective_permutation(rank), rank) {
        return false;
    }

    graph.replace_input(matmul, slot, x);
    if let Some(mm) = graph.operator_mut(matmul).and_then(|o| o.as_matmul_mut()) {
        mm.toggle_trans(slot);
    }
    trace!(matmul = %matmul, transpose = %producer, slot, "fused transpose into matmul");

    if graph.tensor(input).is_some_and(|t| t.targets().is_empty()) {
        graph.remove_operator(producer);
    }
    true
}
