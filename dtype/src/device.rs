use std::fmt;

/// Runtime a graph and its tensors are bound to.
///
/// Two graphs can only exchange tensors when their specs are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "proptest", derive(proptest_derive::Arbitrary))]
pub enum DeviceSpec {
    #[default]
    Cpu,
    Cuda {
        device_id: usize,
    },
}

impl DeviceSpec {
    pub const fn is_cpu(&self) -> bool {
        matches!(self, Self::Cpu)
    }
}

impl fmt::Display for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "CPU"),
            Self::Cuda { device_id } => write!(f, "CUDA:{device_id}"),
        }
    }
}
