//! Optimizer configuration.
//!
//! Provides typed configuration with a bon builder and environment variable
//! fallbacks.

use bon::bon;

/// Which rewrites run and how long the fixed-point loop may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptimizerConfig {
    /// Fold a last-two-axes transpose into the consuming matmul's flag.
    pub fuse_transpose_matmul: bool,
    /// Drop a transpose followed by its inverse.
    pub eliminate_inverse_transposes: bool,
    /// Upper bound on rewrite passes.
    pub max_passes: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self { fuse_transpose_matmul: true, eliminate_inverse_transposes: true, max_passes: 64 }
    }
}

#[bon]
impl OptimizerConfig {
    /// Create an optimizer configuration with builder pattern.
    #[builder(finish_fn = build)]
    pub fn builder(
        #[builder(default = true)] fuse_transpose_matmul: bool,
        #[builder(default = true)] eliminate_inverse_transposes: bool,
        #[builder(default = 64)] max_passes: usize,
    ) -> Self {
        Self { fuse_transpose_matmul, eliminate_inverse_transposes, max_passes }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `STRATA_NOOPT` - Disable every rewrite if set
    /// * `STRATA_OPT_MAX_PASSES` - Pass limit (default: 64)
    pub fn from_env() -> Self {
        let enabled = std::env::var("STRATA_NOOPT").is_err();
        let max_passes = std::env::var("STRATA_OPT_MAX_PASSES").ok().and_then(|s| s.parse().ok()).unwrap_or(64);

        Self { fuse_transpose_matmul: enabled, eliminate_inverse_transposes: enabled, max_passes }
    }

    /// Configuration with every rewrite turned off.
    pub fn disabled() -> Self {
        Self { fuse_transpose_matmul: false, eliminate_inverse_transposes: false, ..Self::default() }
    }

    pub fn is_disabled(&self) -> bool {
        !self.fuse_transpose_matmul && !self.eliminate_inverse_transposes
    }
}
