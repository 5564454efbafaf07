//! Core rendering vocabulary
//!
//! Resources the tracker refers to (without owning them), buffer targets and
//! the value types of the fixed-function parameter categories.

pub mod buffer;
pub mod render_states;
pub mod resource;
pub mod shader;
pub mod target;
pub mod texture;

pub use buffer::{Buffer, BufferExtent, BufferHandle, BufferRange};
pub use render_states::{
    BlendState, ColorMask, CullState, DepthState, LineState, PointState, PolygonModeState,
    PolygonOffset, PrimitiveRestart, Rect, ScissorState, StencilState, Viewport,
};
pub use resource::ResourceId;
pub use shader::{InterfaceBlock, ShaderProgram};
pub use target::{BufferTarget, TargetClass, OTHER_TARGET_COUNT};
pub use texture::{ImageAccess, Texture, TextureHandle};
