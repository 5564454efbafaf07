//! Buffer binding targets
//!
//! A closed enumeration of every buffer target the tracker knows about, with
//! total mappings to GL enumerants and to change-mask positions.

use crate::error::StateError;

/// A buffer binding target.
///
/// The first four are indexed targets with an array of binding points; the
/// rest have a single binding point (slot 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum BufferTarget {
    /// Shader storage blocks.
    ShaderStorage = 0,
    /// Uniform blocks.
    Uniform = 1,
    /// Atomic counters.
    AtomicCounter = 2,
    /// Transform feedback outputs.
    TransformFeedback = 3,
    /// Vertex attributes.
    Array = 4,
    /// Source of buffer-to-buffer copies.
    CopyRead = 5,
    /// Destination of buffer-to-buffer copies.
    CopyWrite = 6,
    /// Indirect compute dispatch arguments.
    DispatchIndirect = 7,
    /// Indirect draw arguments.
    DrawIndirect = 8,
    /// Vertex indices.
    ElementArray = 9,
    /// Pixel read-back destination.
    PixelPack = 10,
    /// Pixel upload source.
    PixelUnpack = 11,
    /// Query result destination.
    Query = 12,
    /// Texture buffer storage.
    Texture = 13,
}

/// Which change mask a target's binding points are tracked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetClass {
    /// Indexed storage buffer slots.
    Storage,
    /// Indexed uniform buffer slots.
    Uniform,
    /// Indexed atomic counter slots.
    AtomicCounter,
    /// Indexed transform feedback slots.
    TransformFeedback,
    /// Single-slot target, tracked at this bit of the shared mask.
    Other(u8),
}

/// Number of single-slot targets sharing the "other" mask.
pub const OTHER_TARGET_COUNT: u8 = 10;

const FIRST_OTHER: u8 = BufferTarget::Array as u8;

impl BufferTarget {
    /// Every target, in index order.
    pub const ALL: [BufferTarget; 14] = [
        BufferTarget::ShaderStorage,
        BufferTarget::Uniform,
        BufferTarget::AtomicCounter,
        BufferTarget::TransformFeedback,
        BufferTarget::Array,
        BufferTarget::CopyRead,
        BufferTarget::CopyWrite,
        BufferTarget::DispatchIndirect,
        BufferTarget::DrawIndirect,
        BufferTarget::ElementArray,
        BufferTarget::PixelPack,
        BufferTarget::PixelUnpack,
        BufferTarget::Query,
        BufferTarget::Texture,
    ];

    /// Dense index of this target.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Target with the given dense index.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Whether the target has an array of binding points.
    pub fn is_indexed(self) -> bool {
        !matches!(self.class(), TargetClass::Other(_))
    }

    /// Change mask this target is tracked in.
    pub fn class(self) -> TargetClass {
        match self {
            BufferTarget::ShaderStorage => TargetClass::Storage,
            BufferTarget::Uniform => TargetClass::Uniform,
            BufferTarget::AtomicCounter => TargetClass::AtomicCounter,
            BufferTarget::TransformFeedback => TargetClass::TransformFeedback,
            other => TargetClass::Other(other as u8 - FIRST_OTHER),
        }
    }

    /// Single-slot target tracked at `bit` of the shared mask.
    pub fn from_other_bit(bit: u8) -> Option<Self> {
        if bit < OTHER_TARGET_COUNT {
            Self::from_index(bit + FIRST_OTHER)
        } else {
            None
        }
    }

    /// The GL enumerant for this target.
    pub fn gl_enum(self) -> u32 {
        match self {
            BufferTarget::ShaderStorage => 0x90D2,
            BufferTarget::Uniform => 0x8A11,
            BufferTarget::AtomicCounter => 0x92C0,
            BufferTarget::TransformFeedback => 0x8C8E,
            BufferTarget::Array => 0x8892,
            BufferTarget::CopyRead => 0x8F36,
            BufferTarget::CopyWrite => 0x8F37,
            BufferTarget::DispatchIndirect => 0x90EE,
            BufferTarget::DrawIndirect => 0x8F3F,
            BufferTarget::ElementArray => 0x8893,
            BufferTarget::PixelPack => 0x88EB,
            BufferTarget::PixelUnpack => 0x88EC,
            BufferTarget::Query => 0x9192,
            BufferTarget::Texture => 0x8C2A,
        }
    }

    /// Convert a GL enumerant.
    pub fn from_gl(raw: u32) -> Result<Self, StateError> {
        Self::ALL
            .iter()
            .copied()
            .find(|target| target.gl_enum() == raw)
            .ok_or(StateError::UnknownBufferTarget(raw))
    }
}

impl TryFrom<u32> for BufferTarget {
    type Error = StateError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::from_gl(raw)
    }
}
