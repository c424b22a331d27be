//! Inverse transpose pair elimination.
//!
//! ```text
//! x ─ Transpose(p) ─ y ─ Transpose(p⁻¹) ─ z ─ consumers    ⇒    x ─ consumers
//! ```
//!
//! `y` must feed only the second transpose. A `z` without consumers is a
//! graph output and keeps its identity, so such pairs are left alone.

use strata_ir::shape::is_inverse_permutation;
use strata_ir::{Graph, OpId, TensorId};
use tracing::trace;

/// Remove every matching pair. Returns the number of pairs removed.
pub(crate) fn eliminate_inverse_transposes(graph: &mut Graph) -> usize {
    let mut eliminated = 0;

    for op in graph.operator_ids().to_vec() {
        if let Some((second, x, z)) = match_pair(graph, op) {
            let rewired = graph.replace_all_uses(z, x);
            graph.remove_operator(second);
            graph.remove_operator(op);
            trace!(first = %op, second = %second, rewired, "eliminated inverse transpose pair");
            eliminated += 1;
        }
    }

    eliminated
}

/// `(second transpose, x, z)` when `op` starts an eliminable pair.
fn match_pair(graph: &Graph, op: OpId) -> Option<(OpId, TensorId, TensorId)> {
    let first = graph.operator(op)?;
    let p = first.as_transpose()?;
    let x = first.inputs()[0];
    let y = first.output();

    let [second_id] = graph.tensor(y)?.targets() else { return None };
    let second = graph.operator(*second_id)?;
    let q = second.as_transpose()?;
    let z = second.output();

    let rank = graph.tensor(x)?.rank();
    if !is_inverse_permutation(&p.effective_permutation(rank), &q.effective_permutation(rank), rank) {
        return None;
    }
    if graph.tensor(z)?.targets().is_empty() {
        return None;
    }
    Some((*second_id, x, z))
}
