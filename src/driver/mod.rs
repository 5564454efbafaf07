//! Graphics driver collaborator
//!
//! The state tracker never talks to a graphics API directly. Every driver
//! call goes through [`GraphicsDriver`], whose methods are fire-and-forget:
//! errors only surface through [`GraphicsDriver::poll_error`].

pub mod recording;

pub use recording::{DriverCall, RecordingDriver};

use crate::core::{
    BlendState, BufferRange, BufferTarget, ColorMask, CullState, DepthState, ImageAccess,
    LineState, PointState, PolygonModeState, PolygonOffset, PrimitiveRestart, ResourceId,
    ScissorState, StencilState, Viewport,
};
use crate::error::DriverError;

/// Everything the driver needs to attach a texture level to an image unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageUnitBinding {
    pub texture: ResourceId,
    pub level: u32,
    pub layered: bool,
    pub layer: u32,
    /// Normalized to read, write or read-write.
    pub access: ImageAccess,
    /// Live format of the texture.
    pub format: wgpu::TextureFormat,
}

/// A change to one fixed-function parameter category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PipelineCommand {
    Blending(BlendState),
    ColorMask(ColorMask),
    CullFace(CullState),
    Depth(DepthState),
    Line(LineState),
    Point(PointState),
    PolygonMode(PolygonModeState),
    PolygonOffset(PolygonOffset),
    PrimitiveRestart(PrimitiveRestart),
    Scissor(ScissorState),
    Stencil(StencilState),
    Viewport(Viewport),
    /// Program to use, `None` for the fixed default.
    Program(Option<ResourceId>),
    /// Framebuffer to draw into, `None` for the default framebuffer.
    Framebuffer(Option<ResourceId>),
}

/// A uniform block whose contents the context keeps in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformBlock {
    /// Camera transforms and viewport, one element.
    FrameData,
    /// Registered light parameters, one element per light id.
    Lights,
    /// Ids of the enabled lights, one element.
    LightSet,
    /// One flag per texture unit, one element.
    TextureUsage,
}

/// Low-level driver primitives used by the state tracker.
pub trait GraphicsDriver {
    /// Attach `range` of `buffer` to `slot` of `target`.
    ///
    /// Single-slot targets are always called with slot 0.
    fn bind_buffer(
        &mut self,
        target: BufferTarget,
        slot: u32,
        buffer: ResourceId,
        range: BufferRange,
    );

    /// Detach whatever is bound at `slot` of `target`.
    fn unbind_buffer(&mut self, target: BufferTarget, slot: u32);

    /// Attach a texture to a texture unit.
    fn bind_texture(&mut self, unit: u32, texture: ResourceId);

    /// Detach the texture from a texture unit.
    fn unbind_texture(&mut self, unit: u32);

    /// Attach a texture level to an image unit.
    fn bind_image(&mut self, unit: u32, image: &ImageUnitBinding);

    /// Detach the image unit.
    fn unbind_image(&mut self, unit: u32);

    /// Change one fixed-function parameter category.
    fn apply_pipeline(&mut self, command: &PipelineCommand);

    /// Replace element `index` of a uniform block with `data`.
    fn upload_block(&mut self, block: UniformBlock, index: u32, data: &[u8]);

    /// Return (and clear) an error accumulated since the last probe.
    fn poll_error(&mut self) -> Option<DriverError>;
}

impl<T: GraphicsDriver + ?Sized> GraphicsDriver for Box<T> {
    fn bind_buffer(
        &mut self,
        target: BufferTarget,
        slot: u32,
        buffer: ResourceId,
        range: BufferRange,
    ) {
        (**self).bind_buffer(target, slot, buffer, range)
    }

    fn unbind_buffer(&mut self, target: BufferTarget, slot: u32) {
        (**self).unbind_buffer(target, slot)
    }

    fn bind_texture(&mut self, unit: u32, texture: ResourceId) {
        (**self).bind_texture(unit, texture)
    }

    fn unbind_texture(&mut self, unit: u32) {
        (**self).unbind_texture(unit)
    }

    fn bind_image(&mut self, unit: u32, image: &ImageUnitBinding) {
        (**self).bind_image(unit, image)
    }

    fn unbind_image(&mut self, unit: u32) {
        (**self).unbind_image(unit)
    }

    fn apply_pipeline(&mut self, command: &PipelineCommand) {
        (**self).apply_pipeline(command)
    }

    fn upload_block(&mut self, block: UniformBlock, index: u32, data: &[u8]) {
        (**self).upload_block(block, index, data)
    }

    fn poll_error(&mut self) -> Option<DriverError> {
        (**self).poll_error()
    }
}
