//! glscope
//!
//! Scoped, minimal-call state tracking over a stateful graphics driver.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **core** - Resource handles, buffer targets and parameter value types
//! 2. **driver** - The graphics driver collaborator and a recording implementation
//! 3. **state** - Binding snapshots, diff engine, apply step and state stacks
//! 4. **context** - `RenderingContext`, the caller-facing facade
//!
//! Binding requests are batched in a target snapshot and reach the driver
//! only at [`RenderingContext::reconcile`], as the smallest set of bind and
//! unbind calls. Fixed-function parameters reach the driver when they change.

pub mod context;
pub mod core;
pub mod driver;
pub mod error;
pub mod state;

// Re-export commonly used types
pub use context::{BindingLimits, ContextConfig, ReconcileReport, RenderingContext};

pub use crate::core::{
    BlendState, Buffer, BufferExtent, BufferHandle, BufferRange, BufferTarget, ColorMask,
    CullState, DepthState, ImageAccess, InterfaceBlock, LineState, PointState, PolygonModeState,
    PolygonOffset, PrimitiveRestart, Rect, ResourceId, ScissorState, ShaderProgram, StencilState,
    TargetClass, Texture, TextureHandle, Viewport,
};

pub use driver::{
    DriverCall, GraphicsDriver, ImageUnitBinding, PipelineCommand, RecordingDriver, UniformBlock,
};

pub use error::{DriverError, StateError};

pub use state::{
    ActiveFramebuffer, ActiveMaterial, ActiveShader, Batch, BatchError, Binding, BindingCategory,
    BindingDiff, BindingKey, BindingState, BufferBinding, CameraToClipping, FrameData,
    ImageBinding, LightKind, LightParameters, LightSet, ModelToCamera, ObjectData, Parameter,
    SlotMask, StateCategory, StateStack, TextureBinding, TextureUsage, MAX_ENABLED_LIGHTS,
};

// Re-export glam and wgpu for convenience
pub use glam;
pub use wgpu;
