//! Graph optimizer.
//!
//! Runs local rewrites over a topologically sorted graph until a full pass
//! changes nothing:
//!
//! 1. [`transpose_matmul`] - fold last-two-axes transposes into matmul flags
//! 2. [`inverse_transpose`] - remove a transpose followed by its inverse
//!
//! Rules scan operators in graph order. After a pass that rewrote something,
//! the graph is re-sorted and tensors left without producer and consumers are
//! dropped.

pub mod config;
mod inverse_transpose;
mod transpose_matmul;

use snafu::ResultExt;
use strata_ir::Graph;
use tracing::{debug, warn};

use crate::error::{IrSnafu, Result};

pub use config::OptimizerConfig;

/// What an optimizer run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizeStats {
    /// Passes executed, including the final one that found nothing.
    pub passes: usize,
    pub fused_transposes: usize,
    pub eliminated_pairs: usize,
    pub removed_tensors: usize,
}

impl OptimizeStats {
    pub fn changed(&self) -> bool {
        self.fused_transposes > 0 || self.eliminated_pairs > 0
    }
}

/// Optimize a graph in place.
///
/// Uses environment variables for configuration (see `OptimizerConfig::from_env`).
///
/// # Environment Variables
///
/// * `STRATA_NOOPT=1` - Disable all rewrites (for debugging)
/// * `STRATA_OPT_MAX_PASSES=N` - Stop after N passes
pub fn optimize(graph: &mut Graph) -> Result<OptimizeStats> {
    optimize_with_config(graph, &OptimizerConfig::from_env())
}

/// Optimize a graph in place with an explicit configuration.
///
/// # Errors
/// Fails if the graph has a cycle; the graph is not modified in that case.
#[tracing::instrument(skip_all, fields(operators = graph.num_operators()))]
pub fn optimize_with_config(graph: &mut Graph, config: &OptimizerConfig) -> Result<OptimizeStats> {
    graph.topo_sort().context(IrSnafu)?;

    let mut stats = OptimizeStats::default();
    if config.is_disabled() {
        debug!("optimizer disabled");
        return Ok(stats);
    }

    while stats.passes < config.max_passes {
        stats.passes += 1;

        let fused = if config.fuse_transpose_matmul { transpose_matmul::fuse_transpose_matmul(graph) } else { 0 };
        let eliminated =
            if config.eliminate_inverse_transposes { inverse_transpose::eliminate_inverse_transposes(graph) } else { 0 };
        stats.fused_transposes += fused;
        stats.eliminated_pairs += eliminated;

        if fused == 0 && eliminated == 0 {
            debug!(passes = stats.passes, "optimizer reached fixed point");
            return Ok(stats);
        }

        graph.topo_sort().context(IrSnafu)?;
        let removed = graph.remove_dangling_tensors();
        stats.removed_tensors += removed;
        debug!(pass = stats.passes, fused, eliminated, removed, "optimizer pass");
    }

    warn!(max_passes = config.max_passes, "optimizer stopped before reaching a fixed point");
    Ok(stats)
}
