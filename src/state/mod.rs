//! Binding state tracking
//!
//! - [`key`]: binding point addresses
//! - [`binding`]: binding values and the [`BindingState`] snapshot
//! - [`mask`] / [`diff`]: change masks and the diff engine
//! - [`apply`]: issuing the minimal driver calls for a diff
//! - [`stack`] / [`parameter`]: push/pop stacks per category
//! - [`frame`]: uniform blocks derived from the context state

pub mod apply;
pub mod binding;
pub mod diff;
pub mod frame;
pub mod key;
pub mod mask;
pub mod parameter;
pub mod stack;

pub use apply::{ApplyStats, Batch, BatchError};
pub use binding::{Binding, BindingState, BufferBinding, ImageBinding, TextureBinding};
pub use frame::{
    FrameData, LightKind, LightParameters, LightSet, ObjectData, TextureUsage, MAX_ENABLED_LIGHTS,
};
pub use key::{BindingCategory, BindingKey};
pub use mask::{BindingDiff, SlotIter, SlotMask, MASK_WIDTH};
pub use parameter::{
    ActiveFramebuffer, ActiveMaterial, ActiveShader, CameraToClipping, ModelToCamera, Parameter,
    ParameterStacks, PopOutcome, StateCategory,
};
pub use stack::StateStack;
