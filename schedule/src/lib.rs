//! Graph-level passes for the strata middle-end.
//!
//! # Module Organization
//!
//! - [`optimizer`] - fixed-point rewrites over the graph IR
//!   (transpose→matmul fusion, inverse transpose pair elimination)
//! - [`memory_planner`] - liveness-driven placement of every tensor in one
//!   arena allocation

pub mod error;
pub mod memory_planner;
pub mod optimizer;


pub use error::{Error, Result};
pub use memory_planner::{Allocation, MemoryPlan, PlannerConfig, data_malloc, data_malloc_on, data_malloc_with};
pub use optimizer::{OptimizeStats, OptimizerConfig, optimize, optimize_with_config};
