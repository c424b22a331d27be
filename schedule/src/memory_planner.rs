//! Memory planner: place every tensor of a graph inside one arena buffer.
//!
//! Planning walks the operators in topological order and simulates the
//! arena while tracking how many consumers of each tensor are still pending.
//!
//! # Algorithm
//!
//! 1. **Pinning**: graph inputs (no producer) and graph outputs (no
//!    consumer) live for the whole run and are never freed
//! 2. **Inputs first**: every graph input is placed before any operator runs
//! 3. **Per operator**: place its outputs, then release each distinct input
//!    whose last consumer this was
//! 4. **Materialize**: one backend allocation of the arena's peak size, and
//!    every tensor is bound to a view at its planned offset

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bon::bon;
use smallvec::SmallVec;
use snafu::{ResultExt, ensure};
use strata_device::{Allocator, Arena, Buffer};
use strata_ir::{Fuid, Graph, TensorId};
use tracing::{debug, trace};

use crate::error::{DeviceSnafu, InvalidAlignmentSnafu, IrSnafu, Result};

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Arena alignment in bytes. `None` uses the widest element size.
    pub alignment: Option<usize>,
}

#[bon]
impl PlannerConfig {
    /// Create a planner configuration with builder pattern.
    #[builder(finish_fn = build)]
    pub fn builder(alignment: Option<usize>) -> Self {
        Self { alignment }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `STRATA_ARENA_ALIGN` - Arena alignment in bytes
    pub fn from_env() -> Self {
        let alignment = std::env::var("STRATA_ARENA_ALIGN").ok().and_then(|s| s.parse().ok());
        Self { alignment }
    }
}

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Where one tensor lives inside the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    pub tensor: TensorId,
    pub fuid: Fuid,
    /// Byte offset from the start of the arena buffer.
    pub offset: usize,
    /// Tensor size in bytes (before alignment).
    pub size: usize,
}

/// Result of planning a graph.
#[derive(Debug, Clone)]
pub struct MemoryPlan {
    /// Placements in the order they were made.
    pub allocations: Vec<Allocation>,
    /// Bytes requested from the backend.
    pub peak: usize,
    /// The arena buffer every tensor blob views into.
    pub buffer: Buffer,
}

impl MemoryPlan {
    pub fn allocation(&self, tensor: TensorId) -> Option<&Allocation> {
        self.allocations.iter().find(|a| a.tensor == tensor)
    }
}

// ============================================================================
// PLANNING
// ============================================================================

/// Tracks placements and pending uses while the arena is simulated.
struct Planner<'g> {
    graph: &'g Graph,
    arena: Arena,
    pinned: HashSet<TensorId>,
    remaining_uses: HashMap<TensorId, usize>,
    offsets: HashMap<TensorId, usize>,
    allocations: Vec<Allocation>,
}

impl<'g> Planner<'g> {
    fn new(graph: &'g Graph, arena: Arena) -> Self {
        let mut pinned = HashSet::new();
        let mut remaining_uses = HashMap::with_capacity(graph.num_tensors());
        for (id, tensor) in graph.tensors() {
            if tensor.is_graph_input() || tensor.is_graph_output() {
                pinned.insert(id);
            }
            remaining_uses.insert(id, tensor.targets().len());
        }

        Self { graph, arena, pinned, remaining_uses, offsets: HashMap::new(), allocations: Vec::new() }
    }

    fn place(&mut self, id: TensorId) {
        if self.offsets.contains_key(&id) {
            return;
        }
        let Some(tensor) = self.graph.tensor(id) else { return };

        let size = tensor.bytes();
        let offset = self.arena.alloc(size);
        self.offsets.insert(id, offset);
        self.allocations.push(Allocation { tensor: id, fuid: tensor.fuid(), offset, size });
        trace!(tensor = %id, offset, size, "tensor placed");
    }

    fn release(&mut self, id: TensorId) {
        if self.pinned.contains(&id) {
            return;
        }
        let Some(count) = self.remaining_uses.get_mut(&id) else { return };
        assert!(*count > 0, "use count underflow for tensor {id}");
        *count -= 1;
        if *count > 0 {
            return;
        }

        if let Some(&offset) = self.offsets.get(&id)
            && let Some(tensor) = self.graph.tensor(id)
        {
            self.arena.free(offset, tensor.bytes());
            trace!(tensor = %id, offset, "tensor released");
        }
    }

    fn run(&mut self) {
        for id in self.graph.inputs() {
            self.place(id);
        }

        for (_, op) in self.graph.operators() {
            for &output in op.outputs() {
                self.place(output);
            }

            let mut seen: SmallVec<[TensorId; 2]> = SmallVec::new();
            for &input in op.inputs() {
                if !seen.contains(&input) {
                    seen.push(input);
                    self.release(input);
                }
            }
        }
    }
}

/// Plan memory for a graph using configuration from the environment.
///
/// See [`PlannerConfig::from_env`].
pub fn data_malloc(graph: &mut Graph) -> Result<MemoryPlan> {
    data_malloc_with(graph, &PlannerConfig::from_env())
}

/// Plan memory on the backend registered for the graph's device.
pub fn data_malloc_with(graph: &mut Graph, config: &PlannerConfig) -> Result<MemoryPlan> {
    let backend = strata_device::registry().get(&graph.device()).context(DeviceSnafu)?;
    data_malloc_on(graph, backend, config)
}

/// Plan memory for `graph`, allocate one buffer from `backend`, and bind
/// every tensor's blob to its slice of it.
///
/// # Errors
/// Fails on a cyclic graph, an invalid alignment, or a backend allocation
/// failure. Blobs are only bound once the whole plan succeeded.
#[tracing::instrument(skip_all, fields(tensors = graph.num_tensors(), backend = backend.name()))]
pub fn data_malloc_on(graph: &mut Graph, backend: Arc<dyn Allocator>, config: &PlannerConfig) -> Result<MemoryPlan> {
    graph.topo_sort().context(IrSnafu)?;

    let arena = match config.alignment {
        Some(alignment) => {
            ensure!(alignment.is_power_of_two(), InvalidAlignmentSnafu { alignment });
            Arena::with_alignment(backend, alignment)
        }
        None => Arena::new(backend),
    };

    let mut planner = Planner::new(graph, arena);
    planner.run();
    let Planner { mut arena, allocations, .. } = planner;

    let info = arena.info();
    let buffer = arena.get_ptr().context(DeviceSnafu)?;

    let blobs =
        allocations.iter().map(|a| buffer.view(a.offset, a.size)).collect::<strata_device::Result<Vec<_>>>().context(DeviceSnafu)?;
    for (allocation, blob) in allocations.iter().zip(blobs) {
        graph.bind_blob(allocation.tensor, blob);
    }

    debug!(tensors = allocations.len(), peak = info.peak, "memory plan complete");
    Ok(MemoryPlan { allocations, peak: info.peak, buffer })
}
