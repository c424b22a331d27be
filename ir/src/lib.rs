//! Graph intermediate representation for the strata middle-end.
//!
//! # Module Organization
//!
//! - [`shape`] - shapes, broadcasting, axis and permutation utilities
//! - [`op`] - operator contracts (`MatMul`, `Transpose`) and the `Operator` node
//! - [`tensor`] - tensor nodes and their producer/consumer edges
//! - [`graph`] - the graph arena: construction, topological order, shape
//!   inference, validation, and rewiring primitives
//! - [`error`] - error types and result handling

pub mod error;
pub mod graph;
pub mod ids;
pub mod op;
pub mod shape;
pub mod tensor;


pub use error::{Error, Result};
pub use graph::Graph;
pub use ids::{Fuid, Guid, OpId, TensorId};
pub use op::{MatMul, OpKind, OpType, Operator, OperatorContract, Transpose};
pub use shape::Shape;
pub use tensor::Tensor;

pub use strata_device::Buffer;
pub use strata_dtype::{DType, DeviceSpec};
