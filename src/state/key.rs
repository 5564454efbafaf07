//! Binding point addressing
//!
//! A [`BindingKey`] names exactly one binding point. It packs losslessly into
//! a `u64`, which is what the snapshot maps hash.

use crate::core::BufferTarget;
use crate::error::StateError;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Category of a binding point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingCategory {
    /// Buffer binding point of the given target.
    Buffer(BufferTarget),
    /// Texture unit.
    Texture,
    /// Image unit.
    Image,
}

const TAG_SHIFT: u32 = 56;
const TARGET_SHIFT: u32 = 32;
const TAG_BUFFER: u64 = 0;
const TAG_TEXTURE: u64 = 1;
const TAG_IMAGE: u64 = 2;

/// Address of one binding point: category (and target for buffers) plus slot.
///
/// Layout of the packed form, most significant first:
/// 8 bits category tag, 16 bits reserved, 8 bits buffer target, 32 bits slot.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BindingKey {
    category: BindingCategory,
    slot: u32,
}

impl BindingKey {
    /// Key for `slot` of `category`.
    pub fn new(category: BindingCategory, slot: u32) -> Self {
        Self { category, slot }
    }

    /// Key for a buffer binding point.
    pub fn buffer(target: BufferTarget, slot: u32) -> Self {
        Self::new(BindingCategory::Buffer(target), slot)
    }

    /// Key for a texture unit.
    pub fn texture(unit: u32) -> Self {
        Self::new(BindingCategory::Texture, unit)
    }

    /// Key for an image unit.
    pub fn image(unit: u32) -> Self {
        Self::new(BindingCategory::Image, unit)
    }

    pub fn category(self) -> BindingCategory {
        self.category
    }

    pub fn slot(self) -> u32 {
        self.slot
    }

    /// Buffer target, for buffer keys.
    pub fn target(self) -> Option<BufferTarget> {
        match self.category {
            BindingCategory::Buffer(target) => Some(target),
            _ => None,
        }
    }

    /// Pack into a single integer.
    #[inline]
    pub fn pack(self) -> u64 {
        let (tag, target) = match self.category {
            BindingCategory::Buffer(target) => (TAG_BUFFER, target.index() as u64),
            BindingCategory::Texture => (TAG_TEXTURE, 0),
            BindingCategory::Image => (TAG_IMAGE, 0),
        };
        (tag << TAG_SHIFT) | (target << TARGET_SHIFT) | self.slot as u64
    }

    /// Decode a packed key.
    pub fn unpack(packed: u64) -> Result<Self, StateError> {
        let tag = packed >> TAG_SHIFT;
        let target = (packed >> TARGET_SHIFT) & 0x00ff_ffff;
        let slot = packed as u32;
        let category = match (tag, target) {
            (TAG_BUFFER, index) => u8::try_from(index)
                .ok()
                .and_then(BufferTarget::from_index)
                .map(BindingCategory::Buffer),
            (TAG_TEXTURE, 0) => Some(BindingCategory::Texture),
            (TAG_IMAGE, 0) => Some(BindingCategory::Image),
            _ => None,
        };
        category
            .map(|category| Self { category, slot })
            .ok_or(StateError::InvalidBindingKey(packed))
    }
}

impl Hash for BindingKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.pack());
    }
}

impl PartialOrd for BindingKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BindingKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.pack().cmp(&other.pack())
    }
}

impl fmt::Debug for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BindingKey({:?}, {})", self.category, self.slot)
    }
}
