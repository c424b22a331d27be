use smallvec::smallvec;

use crate::error::Error;
use crate::op::{MatMul, OpKind, OpType, OperatorContract, Transpose};
use crate::shape::Shape;

fn infer(op: &mut impl OperatorContract, inputs: &[Shape]) -> crate::Result<Shape> {
    let refs: Vec<&Shape> = inputs.iter().collect();
    Ok(op.infer_shape(&refs)?.remove(0))
}

// =========================================================================
// MatMul
// =========================================================================

#[test]
fn test_matmul_plain() {
    let mut mm = MatMul::new(false, false);
    let out = infer(&mut mm, &[smallvec![2, 3], smallvec![3, 4]]).unwrap();
    assert_eq!(out.as_slice(), &[2, 4]);
    assert_eq!(mm.mnk(), (2, 4, 3));
}

#[test]
fn test_matmul_transposed_operands() {
    let mut mm = MatMul::new(true, true);
    // A^T: [3, 2] -> m=2, k=3; B^T: [4, 3] -> k=3, n=4
    let out = infer(&mut mm, &[smallvec![3, 2], smallvec![4, 3]]).unwrap();
    assert_eq!(out.as_slice(), &[2, 4]);
    assert_eq!(mm.mnk(), (2, 4, 3));
}

#[test]
fn test_matmul_batch_broadcast() {
    let mut mm = MatMul::new(false, false);
    let out = infer(&mut mm, &[smallvec![5, 1, 2, 3], smallvec![7, 3, 4]]).unwrap();
    assert_eq!(out.as_slice(), &[5, 7, 2, 4]);
}

#[test]
fn test_matmul_rank_too_small() {
    let mut mm = MatMul::new(false, false);
    let result = infer(&mut mm, &[smallvec![3], smallvec![3, 4]]);
    assert!(matches!(result, Err(Error::MatMulRankTooSmall { lhs_rank: 1, rhs_rank: 2 })));
}

#[test]
fn test_matmul_contraction_mismatch() {
    let mut mm = MatMul::new(false, false);
    let result = infer(&mut mm, &[smallvec![2, 3], smallvec![4, 5]]);
    assert!(matches!(result, Err(Error::ContractionMismatch { lhs_k: 3, rhs_k: 4, .. })));
}

#[test]
fn test_matmul_batch_mismatch() {
    let mut mm = MatMul::new(false, false);
    let result = infer(&mut mm, &[smallvec![2, 2, 3], smallvec![5, 3, 4]]);
    assert!(matches!(result, Err(Error::BroadcastShapeMismatch { .. })));
}

#[test]
fn test_matmul_toggle_trans() {
    let mut mm = MatMul::new(false, true);
    mm.toggle_trans(0);
    mm.toggle_trans(1);
    assert!(mm.trans_a());
    assert!(!mm.trans_b());
}

// =========================================================================
// Transpose
// =========================================================================

#[test]
fn test_transpose_explicit_permutation() {
    let mut tr = Transpose::new(Some(vec![2, 0, 1]));
    let out = infer(&mut tr, &[smallvec![2, 3, 4]]).unwrap();
    assert_eq!(out.as_slice(), &[4, 2, 3]);
}

#[test]
fn test_transpose_default_reverses() {
    let mut tr = Transpose::new(None);
    let out = infer(&mut tr, &[smallvec![2, 3, 4]]).unwrap();
    assert_eq!(out.as_slice(), &[4, 3, 2]);
    assert_eq!(tr.effective_permutation(3), vec![2, 1, 0]);
}

#[test]
fn test_transpose_bad_permutation() {
    let mut tr = Transpose::new(Some(vec![0, 1]));
    assert!(matches!(infer(&mut tr, &[smallvec![2, 3, 4]]), Err(Error::PermutationLengthMismatch { .. })));

    let mut tr = Transpose::new(Some(vec![0, 0, 1]));
    assert!(matches!(infer(&mut tr, &[smallvec![2, 3, 4]]), Err(Error::InvalidPermutation { .. })));
}

// =========================================================================
// OpKind dispatch
// =========================================================================

#[test]
fn test_op_kind_dispatch() {
    let mut kind = OpKind::matmul(false, false);
    assert_eq!(kind.op_type(), OpType::MatMul);
    assert_eq!(kind.num_inputs(), 2);
    assert_eq!(kind.num_outputs(), 1);
    let out = infer(&mut kind, &[smallvec![2, 3], smallvec![3, 4]]).unwrap();
    assert_eq!(out.as_slice(), &[2, 4]);
    let OpKind::MatMul(mm) = &kind else { panic!("expected matmul") };
    assert_eq!(mm.mnk(), (2, 4, 3));

    let kind = OpKind::transpose(None);
    assert_eq!(kind.op_type(), OpType::Transpose);
    assert_eq!(kind.num_inputs(), 1);
}

#[test]
fn test_op_type_display() {
    assert_eq!(OpType::MatMul.to_string(), "Matmul");
    assert_eq!(OpType::Transpose.to_string(), "Transpose");
}
