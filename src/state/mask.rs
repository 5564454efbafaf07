//! Change masks
//!
//! One fixed-width bitset per category; bit `i` set means binding point `i`
//! has to be re-issued to the driver.

use super::key::{BindingCategory, BindingKey};
use crate::core::TargetClass;
use std::fmt;

/// Number of slots a [`SlotMask`] can track.
pub const MASK_WIDTH: u32 = u64::BITS;

/// Fixed-width set of slot indices.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SlotMask(u64);

impl SlotMask {
    pub const EMPTY: SlotMask = SlotMask(0);

    /// Mask from raw bits.
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Set bit `slot`. Returns `false` if the slot does not fit.
    #[inline]
    pub fn set(&mut self, slot: u32) -> bool {
        if slot < MASK_WIDTH {
            self.0 |= 1 << slot;
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn test(self, slot: u32) -> bool {
        slot < MASK_WIDTH && self.0 & (1 << slot) != 0
    }

    pub fn any(self) -> bool {
        self.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of set bits.
    pub fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Set slots in ascending order.
    pub fn iter(self) -> SlotIter {
        SlotIter(self.0)
    }
}

impl std::ops::BitOr for SlotMask {
    type Output = SlotMask;

    fn bitor(self, rhs: SlotMask) -> SlotMask {
        SlotMask(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for SlotMask {
    fn bitor_assign(&mut self, rhs: SlotMask) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for SlotMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl IntoIterator for SlotMask {
    type Item = u32;
    type IntoIter = SlotIter;

    fn into_iter(self) -> SlotIter {
        self.iter()
    }
}

/// Ascending iterator over the set bits of a [`SlotMask`].
#[derive(Debug, Clone)]
pub struct SlotIter(u64);

impl Iterator for SlotIter {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.0 == 0 {
            return None;
        }
        let slot = self.0.trailing_zeros();
        self.0 &= self.0 - 1;
        Some(slot)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.0.count_ones() as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for SlotIter {}

/// Per-category change masks produced by the diff engine.
///
/// Single-slot buffer targets share `other`, one bit per target (see
/// [`BufferTarget::class`](crate::BufferTarget::class)).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindingDiff {
    pub storage: SlotMask,
    pub uniform: SlotMask,
    pub atomic_counter: SlotMask,
    pub transform_feedback: SlotMask,
    pub other: SlotMask,
    pub textures: SlotMask,
    pub images: SlotMask,
}

impl BindingDiff {
    /// Whether nothing needs to be re-issued.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Total number of binding points to re-issue.
    pub fn count(&self) -> u32 {
        self.buffer_count() + self.textures.count() + self.images.count()
    }

    /// Number of buffer binding points to re-issue.
    pub fn buffer_count(&self) -> u32 {
        self.storage.count()
            + self.uniform.count()
            + self.atomic_counter.count()
            + self.transform_feedback.count()
            + self.other.count()
    }

    /// Mark the binding point at `key`. Returns `false` if it has no bit.
    pub fn mark(&mut self, key: BindingKey) -> bool {
        let (mask, bit) = self.locate_mut(key);
        mask.set(bit)
    }

    /// Whether the binding point at `key` is marked.
    pub fn contains(&self, key: BindingKey) -> bool {
        let mut copy = *self;
        let (mask, bit) = copy.locate_mut(key);
        mask.test(bit)
    }

    fn locate_mut(&mut self, key: BindingKey) -> (&mut SlotMask, u32) {
        match key.category() {
            BindingCategory::Buffer(target) => match target.class() {
                TargetClass::Storage => (&mut self.storage, key.slot()),
                TargetClass::Uniform => (&mut self.uniform, key.slot()),
                TargetClass::AtomicCounter => (&mut self.atomic_counter, key.slot()),
                TargetClass::TransformFeedback => (&mut self.transform_feedback, key.slot()),
                TargetClass::Other(bit) => (&mut self.other, bit as u32),
            },
            BindingCategory::Texture => (&mut self.textures, key.slot()),
            BindingCategory::Image => (&mut self.images, key.slot()),
        }
    }
}
