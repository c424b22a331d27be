//! Identifiers for graph nodes.
//!
//! Two kinds of identity live side by side:
//!
//! - [`Guid`] and [`Fuid`] are process-wide and come from global counters.
//!   Every tensor and operator gets a fresh `Guid`; a tensor's `Fuid` names
//!   the logical value and is what the graph searches by.
//! - [`TensorId`] and [`OpId`] are handles into one graph's node arena. They
//!   are never reused within a graph, so a handle to a removed node stays
//!   invalid instead of silently aliasing a newer node.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// Global atomic counters for node identities.
//
// Ordering::Relaxed is sufficient since we only need uniqueness, not synchronization.
static GUID_COUNTER: AtomicU64 = AtomicU64::new(0);
static FUID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Globally unique node identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guid(u64);

impl Guid {
    pub(crate) fn next() -> Self {
        Self(GUID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Tensor "family" identity, stable across graph copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fuid(u64);

impl Fuid {
    pub(crate) fn next() -> Self {
        Self(FUID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Handle to a tensor in a [`Graph`](crate::Graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TensorId(pub(crate) u32);

/// Handle to an operator in a [`Graph`](crate::Graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpId(pub(crate) u32);

impl TensorId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl OpId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Fuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op{}", self.0)
    }
}
