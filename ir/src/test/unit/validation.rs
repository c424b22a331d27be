//! Graph validation tests.
//!
//! Each test corrupts one edge by hand and checks the reported violation.

use strata_dtype::{DType, DeviceSpec};

use crate::error::Error;
use crate::{Graph, OpId, Tensor, TensorId};

/// `x -> transpose -> t -> matmul(t, w) -> y`
fn chain() -> (Graph, TensorId, TensorId, TensorId, OpId, OpId) {
    let mut g = Graph::new(DeviceSpec::Cpu);
    let x = g.add_tensor(&[3, 3], DType::Float32);
    let w = g.add_tensor(&[3, 3], DType::Float32);
    let t = g.transpose(x, None).unwrap();
    let y = g.matmul(t, w, false, false).unwrap();
    let tr = g.tensor(t).unwrap().source().unwrap();
    let mm = g.tensor(y).unwrap().source().unwrap();
    (g, x, w, t, tr, mm)
}

#[test]
fn test_valid_graph() {
    let (g, ..) = chain();
    assert_eq!(g.validate(), Ok(()));
    assert!(g.check_valid());
}

#[test]
fn test_dangling_tensor() {
    let (mut g, ..) = chain();
    let lonely = g.add_tensor(&[1], DType::Float32);
    let fuid = g.tensor(lonely).unwrap().fuid();
    assert_eq!(g.validate(), Err(Error::DanglingTensor { fuid }));
}

#[test]
fn test_missing_target_edge() {
    let (mut g, _, _, t, tr, mm) = chain();
    g.t_mut(t).remove_target(mm);
    // The producer is checked first: its successors no longer match t's targets.
    assert!(matches!(g.validate(), Err(Error::InconsistentEdges { op, .. }) if op == tr));
}

#[test]
fn test_stale_source() {
    let (mut g, _, _, t, tr, _) = chain();
    g.t_mut(t).set_source(None);
    // t still feeds the matmul, so only the producer side is wrong.
    assert!(matches!(g.validate(), Err(Error::InconsistentEdges { op, .. }) if op == tr));
}

#[test]
fn test_missing_operator() {
    let (mut g, x, _, _, tr, _) = chain();
    g.operators[tr.index()] = None;
    g.op_order.retain(|&id| id != tr);
    let fuid = g.tensor(x).unwrap().fuid();
    assert_eq!(g.validate(), Err(Error::MissingOperator { fuid, op: tr }));
}

#[test]
fn test_missing_tensor() {
    let (mut g, x, _, _, tr, _) = chain();
    g.tensors[x.index()] = None;
    g.tensor_order.retain(|&id| id != x);
    assert_eq!(g.validate(), Err(Error::MissingTensor { op: tr, tensor: x }));
}

#[test]
fn test_predecessor_mismatch() {
    let (mut g, _, _, _, _, mm) = chain();
    g.o_mut(mm).predecessors.clear();
    assert!(matches!(g.validate(), Err(Error::InconsistentEdges { .. })));
}

#[test]
fn test_asymmetric_successor() {
    let (mut g, _, _, _, tr, mm) = chain();
    g.o_mut(mm).remove_predecessor(tr);
    g.o_mut(mm).add_predecessor(tr);
    g.o_mut(tr).successors.clear();
    assert!(matches!(g.validate(), Err(Error::InconsistentEdges { op, .. }) if op == tr));
}

#[test]
fn test_duplicate_fuid() {
    let (mut g, x, ..) = chain();
    let fuid = g.tensor(x).unwrap().fuid();
    g.push_tensor(Tensor::with_fuid(fuid, smallvec::smallvec![3, 3], DType::Float32, DeviceSpec::Cpu));
    assert_eq!(g.validate(), Err(Error::DuplicateFuid { fuid }));
}

#[test]
#[should_panic(expected = "invalid graph")]
fn test_check_valid_panics() {
    let (mut g, ..) = chain();
    g.add_tensor(&[1], DType::Float32);
    g.check_valid();
}
