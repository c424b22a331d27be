use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::{Arc, OnceLock};

use crate::allocator::{Allocator, BufferOptions, RawBuffer};
use crate::error::{InvalidViewSnafu, Result, SizeMismatchSnafu};

/// Shared buffer data that can be referenced by multiple views.
#[derive(Debug)]
struct BufferData {
    /// Lazily-initialized raw buffer.
    raw: OnceLock<RawBuffer>,
    allocator: Arc<dyn Allocator>,
    /// Total size of the underlying allocation in bytes.
    total_size: usize,
    options: BufferOptions,
}

impl BufferData {
    fn new(allocator: Arc<dyn Allocator>, size: usize, options: BufferOptions) -> Self {
        Self { raw: OnceLock::new(), allocator, total_size: size, options }
    }

    fn ensure_allocated(&self) -> Result<()> {
        if self.raw.get().is_some() {
            return Ok(());
        }

        let raw = self.allocator.alloc(self.total_size, &self.options)?;
        if let Err(raw) = self.raw.set(raw) {
            self.allocator.free(raw);
        }

        Ok(())
    }

    fn is_allocated(&self) -> bool {
        self.raw.get().is_some()
    }

    fn raw(&self) -> Result<&RawBuffer> {
        self.raw.get().ok_or(crate::Error::NotAllocated)
    }
}

impl Drop for BufferData {
    fn drop(&mut self) {
        if let Some(raw) = self.raw.take() {
            self.allocator.free(raw);
        }
    }
}

/// A device buffer, or a view (blob) into one.
///
/// Views share the base allocation by reference count; the backend memory is
/// returned when the last view is dropped. This type is `!Send + !Sync`.
#[derive(Debug, Clone)]
pub struct Buffer {
    data: Rc<BufferData>,
    /// Offset into the base buffer (in bytes).
    offset: usize,
    /// Size of this view (in bytes).
    size: usize,
    _not_send_sync: PhantomData<Rc<()>>,
}

impl Buffer {
    /// Create a new buffer with lazy allocation.
    pub fn new(allocator: Arc<dyn Allocator>, size: usize, options: BufferOptions) -> Self {
        Self { data: Rc::new(BufferData::new(allocator, size, options)), offset: 0, size, _not_send_sync: PhantomData }
    }

    /// Create a new buffer with immediate allocation.
    pub fn allocate(allocator: Arc<dyn Allocator>, size: usize, options: BufferOptions) -> Result<Self> {
        let buffer = Self::new(allocator, size, options);
        buffer.ensure_allocated()?;
        Ok(buffer)
    }

    /// Create a view of `size` bytes starting `offset` bytes into this buffer.
    pub fn view(&self, offset: usize, size: usize) -> Result<Self> {
        if offset + size > self.size {
            return InvalidViewSnafu { offset, size, buffer_size: self.size }.fail();
        }

        Ok(Self { data: Rc::clone(&self.data), offset: self.offset + offset, size, _not_send_sync: PhantomData })
    }

    pub fn ensure_allocated(&self) -> Result<()> {
        self.data.ensure_allocated()
    }

    pub fn is_allocated(&self) -> bool {
        self.data.is_allocated()
    }

    /// Size of this view in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Offset of this view from the start of the base allocation.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Size of the whole base allocation.
    pub fn base_size(&self) -> usize {
        self.data.total_size
    }

    pub fn allocator(&self) -> &dyn Allocator {
        &*self.data.allocator
    }

    /// Whether two handles refer to the same base allocation.
    pub fn shares_allocation(&self, other: &Buffer) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    /// Number of live handles on the base allocation.
    pub fn handle_count(&self) -> usize {
        Rc::strong_count(&self.data)
    }

    /// Address of the first byte of this view.
    pub fn address(&self) -> Result<usize> {
        self.ensure_allocated()?;
        Ok(self.data.raw()?.base_address() + self.offset)
    }

    /// Copy data from host memory into this buffer.
    pub fn copyin(&self, src: &[u8]) -> Result<()> {
        self.ensure_allocated()?;

        let expected = self.size;
        let actual = src.len();
        snafu::ensure!(expected == actual, SizeMismatchSnafu { expected, actual });

        match self.data.raw()? {
            RawBuffer::Cpu { data } => {
                let mut data_mut = data.borrow_mut();
                data_mut[self.offset..self.offset + self.size].copy_from_slice(src);
                Ok(())
            }
        }
    }

    /// Copy data from this buffer to host memory.
    pub fn copyout(&self, dst: &mut [u8]) -> Result<()> {
        self.ensure_allocated()?;

        let expected = self.size;
        let actual = dst.len();
        snafu::ensure!(expected == actual, SizeMismatchSnafu { expected, actual });

        match self.data.raw()? {
            RawBuffer::Cpu { data } => {
                dst.copy_from_slice(&data.borrow()[self.offset..self.offset + self.size]);
                Ok(())
            }
        }
    }
}
