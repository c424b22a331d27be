use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::trace;

use crate::error::{OutOfMemorySnafu, Result};

/// Opaque handle to backend memory.
///
/// Uses `RefCell` for interior mutability with runtime borrow checking.
/// Safe for single-threaded use (Buffer is !Send + !Sync).
#[derive(Debug)]
pub enum RawBuffer {
    Cpu { data: RefCell<Box<[u8]>> },
}

impl RawBuffer {
    /// Get the size of the buffer in bytes.
    pub fn size(&self) -> usize {
        match self {
            RawBuffer::Cpu { data } => data.borrow().len(),
        }
    }

    /// Address of the first byte, for identity checks and diagnostics.
    pub fn base_address(&self) -> usize {
        match self {
            RawBuffer::Cpu { data } => data.borrow().as_ptr() as usize,
        }
    }
}

/// Options for buffer allocation.
#[derive(Debug, Clone, Default)]
pub struct BufferOptions {
    /// Whether to zero-initialize the buffer.
    pub zero_init: bool,
}

/// The memory backend: hands out raw byte ranges and takes them back.
///
/// The arena calls `alloc` once when it materializes and the resulting
/// buffer calls `free` once when its last handle is dropped.
pub trait Allocator: Send + Sync + std::fmt::Debug {
    fn alloc(&self, size: usize, options: &BufferOptions) -> Result<RawBuffer>;
    fn free(&self, _buffer: RawBuffer) {}
    fn name(&self) -> &str;
}

/// CPU allocator using system memory.
#[derive(Debug, Clone)]
pub struct CpuAllocator;

impl Allocator for CpuAllocator {
    fn alloc(&self, size: usize, _options: &BufferOptions) -> Result<RawBuffer> {
        let mut data = Vec::new();
        if data.try_reserve_exact(size).is_err() {
            return OutOfMemorySnafu { backend: self.name(), size }.fail();
        }
        data.resize(size, 0u8);
        Ok(RawBuffer::Cpu { data: RefCell::new(data.into_boxed_slice()) })
    }

    fn name(&self) -> &str {
        "CPU"
    }
}

/// Wrapper that counts calls into another backend.
///
/// Used to observe that an arena touches its backend exactly once for
/// materialization and exactly once for teardown.
#[derive(Debug)]
pub struct CountingAllocator {
    inner: Box<dyn Allocator>,
    allocs: AtomicUsize,
    frees: AtomicUsize,
    bytes: AtomicUsize,
    name: String,
}

impl CountingAllocator {
    pub fn new(inner: Box<dyn Allocator>) -> Self {
        let name = format!("counting({})", inner.name());
        Self { inner, allocs: AtomicUsize::new(0), frees: AtomicUsize::new(0), bytes: AtomicUsize::new(0), name }
    }

    pub fn allocs(&self) -> usize {
        self.allocs.load(Ordering::Relaxed)
    }

    pub fn frees(&self) -> usize {
        self.frees.load(Ordering::Relaxed)
    }

    /// Total bytes requested through `alloc`.
    pub fn bytes_allocated(&self) -> usize {
        self.bytes.load(Ordering::Relaxed)
    }
}

impl Allocator for CountingAllocator {
    fn alloc(&self, size: usize, options: &BufferOptions) -> Result<RawBuffer> {
        let raw = self.inner.alloc(size, options)?;
        self.allocs.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(size, Ordering::Relaxed);
        trace!(backend = %self.name, size, "backend alloc");
        Ok(raw)
    }

    fn free(&self, buffer: RawBuffer) {
        self.frees.fetch_add(1, Ordering::Relaxed);
        trace!(backend = %self.name, size = buffer.size(), "backend free");
        self.inner.free(buffer);
    }

    fn name(&self) -> &str {
        &self.name
    }
}
