//! Shape utilities: broadcasting, axes, flat indexing, and permutations.
//!
//! Shapes are concrete: every dimension is a known `usize`. Broadcasting
//! follows NumPy rules with trailing alignment:
//! - the result rank is the larger of the two ranks,
//! - missing leading axes behave as extent 1,
//! - per axis the extents must match, or one of them must be 1.

use smallvec::{SmallVec, smallvec};
use snafu::ensure;

use crate::error::*;

/// Shape type - sequence of concrete dimensions.
///
/// Uses SmallVec with inline capacity of 4 to avoid heap allocation for
/// common tensor ranks (1D-4D).
pub type Shape = SmallVec<[usize; 4]>;

// =========================================================================
// Shape Utilities
// =========================================================================

/// Number of elements in a tensor of this shape. A scalar (rank 0) has one.
///
/// # Examples
///
/// ```rust
/// # use strata_ir::shape::numel;
/// assert_eq!(numel(&[2, 3, 4]), 24);
/// assert_eq!(numel(&[]), 1);
/// ```
pub fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Row-major (C order) strides, in elements.
///
/// # Examples
///
/// ```rust
/// # use strata_ir::shape::row_major_strides;
/// assert_eq!(row_major_strides(&[2, 3, 4]).as_slice(), &[12, 4, 1]);
/// ```
pub fn row_major_strides(shape: &[usize]) -> Shape {
    let mut strides: Shape = smallvec![1; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

/// Convert a flat row-major offset into a multi-dimensional index.
///
/// # Examples
///
/// ```rust
/// # use strata_ir::shape::locate_index;
/// assert_eq!(locate_index(23, &[2, 3, 4]).as_slice(), &[1, 2, 3]);
/// ```
pub fn locate_index(mut flat: usize, shape: &[usize]) -> Shape {
    let mut index: Shape = smallvec![0; shape.len()];
    for (slot, &dim) in index.iter_mut().zip(shape).rev() {
        *slot = flat % dim;
        flat /= dim;
    }
    index
}

/// Convert a multi-dimensional index back into a flat offset.
///
/// Each coordinate is taken modulo its dimension, so an index into a
/// broadcast result resolves to the right element of a smaller operand whose
/// extents are 1.
///
/// # Panics
/// Panics if `index`, `shape` and `strides` do not have the same rank.
pub fn delocate_index(index: &[usize], shape: &[usize], strides: &[usize]) -> usize {
    assert_eq!(index.len(), shape.len(), "index rank does not match shape rank");
    assert_eq!(shape.len(), strides.len(), "stride rank does not match shape rank");
    index.iter().zip(shape).zip(strides).map(|((&i, &dim), &stride)| (i % dim) * stride).sum()
}

// =========================================================================
// Broadcasting
// =========================================================================

/// Compute the broadcast result shape for two shapes.
///
/// # Errors
/// Returns [`Error::BroadcastShapeMismatch`] if some aligned axis pair is
/// neither equal nor contains a 1.
///
/// # Examples
///
/// ```rust
/// # use strata_ir::shape::broadcast_shape;
/// let shape = broadcast_shape(&[8, 1, 6, 1], &[7, 1, 5]).unwrap();
/// assert_eq!(shape.as_slice(), &[8, 7, 6, 5]);
/// assert!(broadcast_shape(&[2, 3], &[4, 5]).is_err());
/// ```
pub fn broadcast_shape(lhs: &[usize], rhs: &[usize]) -> Result<Shape> {
    let rank = lhs.len().max(rhs.len());
    let mut result: Shape = smallvec![0; rank];

    for i in 0..rank {
        let l = if i < lhs.len() { lhs[lhs.len() - 1 - i] } else { 1 };
        let r = if i < rhs.len() { rhs[rhs.len() - 1 - i] } else { 1 };
        ensure!(
            l == r || l == 1 || r == 1,
            BroadcastShapeMismatchSnafu { lhs: Shape::from_slice(lhs), rhs: Shape::from_slice(rhs) }
        );
        result[rank - 1 - i] = if l == 1 { r } else { l };
    }

    Ok(result)
}

/// Broadcast any number of shapes together. An empty list yields a scalar.
pub fn broadcast_shapes(shapes: &[Shape]) -> Result<Shape> {
    shapes.iter().try_fold(Shape::new(), |acc, shape| broadcast_shape(&acc, shape))
}

/// Left-pad every shape with 1s up to the largest rank.
///
/// # Examples
///
/// ```rust
/// # use strata_ir::shape::{Shape, align_shapes_left};
/// # use smallvec::smallvec;
/// let aligned = align_shapes_left(&[smallvec![3, 4], smallvec![2, 3, 4]]);
/// assert_eq!(aligned[0].as_slice(), &[1, 3, 4]);
/// ```
pub fn align_shapes_left(shapes: &[Shape]) -> Vec<Shape> {
    let rank = shapes.iter().map(|s| s.len()).max().unwrap_or(0);
    shapes
        .iter()
        .map(|shape| {
            let mut aligned: Shape = smallvec![1; rank - shape.len()];
            aligned.extend_from_slice(shape);
            aligned
        })
        .collect()
}

// =========================================================================
// Axes
// =========================================================================

/// Resolve a possibly negative axis against `rank`.
///
/// # Errors
/// Returns [`Error::AxisOutOfRange`] unless `rank >= 1` and
/// `-rank <= axis < rank`.
///
/// # Examples
///
/// ```rust
/// # use strata_ir::shape::normalize_axis;
/// assert_eq!(normalize_axis(-1, 3).unwrap(), 2);
/// assert!(normalize_axis(3, 3).is_err());
/// ```
pub fn normalize_axis(axis: isize, rank: usize) -> Result<usize> {
    let signed_rank = rank as isize;
    ensure!(rank >= 1 && axis >= -signed_rank && axis < signed_rank, AxisOutOfRangeSnafu { axis, rank });
    Ok(if axis < 0 { (axis + signed_rank) as usize } else { axis as usize })
}

// =========================================================================
// Permutations
// =========================================================================

/// Check that `permutation` is a bijection over `0..rank`.
pub fn validate_permutation(permutation: &[usize], rank: usize) -> Result<()> {
    ensure!(permutation.len() == rank, PermutationLengthMismatchSnafu { expected: rank, got: permutation.len() });

    let mut seen: SmallVec<[bool; 8]> = smallvec![false; rank];
    for &axis in permutation {
        ensure!(
            axis < rank && !seen[axis],
            InvalidPermutationSnafu { permutation: permutation.to_vec(), rank }
        );
        seen[axis] = true;
    }
    Ok(())
}

/// `[rank-1, ..., 1, 0]`, the permutation used when none is given.
pub fn reversed_permutation(rank: usize) -> Vec<usize> {
    (0..rank).rev().collect()
}

/// Whether `permutation` swaps exactly the last two axes of a `rank`-D tensor
/// and leaves every leading axis in place.
///
/// # Examples
///
/// ```rust
/// # use strata_ir::shape::is_swap_last_two;
/// assert!(is_swap_last_two(&[0, 2, 1], 3));
/// assert!(!is_swap_last_two(&[1, 0, 2], 3));
/// assert!(!is_swap_last_two(&[0], 1));
/// ```
pub fn is_swap_last_two(permutation: &[usize], rank: usize) -> bool {
    if rank < 2 || permutation.len() != rank {
        return false;
    }
    let leading_identity = permutation[..rank - 2].iter().enumerate().all(|(i, &axis)| axis == i);
    leading_identity && permutation[rank - 2] == rank - 1 && permutation[rank - 1] == rank - 2
}

/// Inverse permutation: `inv[perm[i]] = i`.
///
/// `permutation` must already be a bijection; see [`validate_permutation`].
pub fn invert_permutation(permutation: &[usize]) -> Vec<usize> {
    let mut inverse = vec![0; permutation.len()];
    for (i, &axis) in permutation.iter().enumerate() {
        inverse[axis] = i;
    }
    inverse
}

/// Whether applying `p` then `q` to a `rank`-D tensor is the identity.
///
/// Malformed permutations are never inverses of anything.
pub fn is_inverse_permutation(p: &[usize], q: &[usize], rank: usize) -> bool {
    if validate_permutation(p, rank).is_err() || validate_permutation(q, rank).is_err() {
        return false;
    }
    invert_permutation(p) == q
}
