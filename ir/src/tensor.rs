use std::fmt;

use smallvec::SmallVec;
use strata_device::Buffer;
use strata_dtype::{DType, DeviceSpec};

use crate::{Fuid, Guid, OpId, shape::Shape};

/// Tensor node: a value flowing between operators.
///
/// `source` is the producing operator (none for graph inputs), `targets` the
/// distinct consuming operators (none for graph outputs). The blob is bound
/// by memory planning.
#[derive(Debug, Clone)]
pub struct Tensor {
    guid: Guid,
    fuid: Fuid,
    shape: Shape,
    dtype: DType,
    device: DeviceSpec,
    source: Option<OpId>,
    targets: SmallVec<[OpId; 2]>,
    blob: Option<Buffer>,
}

impl Tensor {
    pub(crate) fn new(shape: Shape, dtype: DType, device: DeviceSpec) -> Self {
        Self::with_fuid(Fuid::next(), shape, dtype, device)
    }

    pub(crate) fn with_fuid(fuid: Fuid, shape: Shape, dtype: DType, device: DeviceSpec) -> Self {
        Self { guid: Guid::next(), fuid, shape, dtype, device, source: None, targets: SmallVec::new(), blob: None }
    }

    pub fn guid(&self) -> Guid {
        self.guid
    }

    pub fn fuid(&self) -> Fuid {
        self.fuid
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn device(&self) -> DeviceSpec {
        self.device
    }

    pub fn numel(&self) -> usize {
        crate::shape::numel(&self.shape)
    }

    /// Storage size in bytes.
    pub fn bytes(&self) -> usize {
        self.numel() * self.dtype.bytes()
    }

    pub fn source(&self) -> Option<OpId> {
        self.source
    }

    pub fn targets(&self) -> &[OpId] {
        &self.targets
    }

    pub fn blob(&self) -> Option<&Buffer> {
        self.blob.as_ref()
    }

    pub fn is_graph_input(&self) -> bool {
        self.source.is_none()
    }

    pub fn is_graph_output(&self) -> bool {
        self.targets.is_empty()
    }

    /// Neither produced nor consumed.
    pub fn is_dangling(&self) -> bool {
        self.is_graph_input() && self.is_graph_output()
    }

    pub(crate) fn set_shape(&mut self, shape: Shape) {
        self.shape = shape;
    }

    pub(crate) fn set_source(&mut self, op: Option<OpId>) {
        self.source = op;
    }

    pub(crate) fn add_target(&mut self, op: OpId) {
        if !self.targets.contains(&op) {
            self.targets.push(op);
        }
    }

    pub(crate) fn remove_target(&mut self, op: OpId) {
        self.targets.retain(|t| *t != op);
    }

    pub(crate) fn set_blob(&mut self, blob: Buffer) {
        self.blob = Some(blob);
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tensor {}, Fuid {}, shape {:?}, dtype {}", self.guid, self.fuid, self.shape.as_slice(), self.dtype)?;
        match self.source {
            Some(op) => write!(f, ", source {op}")?,
            None => write!(f, ", source None")?,
        }
        write!(f, ", targets {:?}", self.targets.iter().map(ToString::to_string).collect::<Vec<_>>())
    }
}
