//! Memory side of the strata middle-end.
//!
//! - [`allocator`] - the backend capability (`alloc` / `free` of raw bytes)
//! - [`buffer`] - reference-counted device buffers and views into them (blobs)
//! - [`arena`] - simulated linear arena with free-list reuse, materialized once
//! - [`registry`] - one cached backend per [`DeviceSpec`]

pub mod allocator;
pub mod arena;
pub mod buffer;
pub mod error;
pub mod registry;


pub use allocator::{Allocator, BufferOptions, CountingAllocator, CpuAllocator, RawBuffer};
pub use arena::{Arena, ArenaInfo};
pub use buffer::Buffer;
pub use error::{Error, Result};
pub use registry::{DeviceSpecExt, cpu, get_device, registry};

pub use strata_dtype::DeviceSpec;
