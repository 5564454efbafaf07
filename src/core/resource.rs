//! Driver object identity

use std::fmt;
use std::num::NonZeroU32;

/// Name of a driver-side object (buffer, texture, program, framebuffer).
///
/// Zero is reserved by the driver for "no object", so it is not representable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(NonZeroU32);

impl ResourceId {
    /// Wrap a raw driver name. Returns `None` for zero.
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    /// The raw driver name.
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({})", self.0)
    }
}

impl From<NonZeroU32> for ResourceId {
    fn from(raw: NonZeroU32) -> Self {
        Self(raw)
    }
}
