//! Stacked parameter categories
//!
//! Every category named by [`StateCategory`] has its own [`StateStack`].
//! Non-binding categories live in [`ParameterStacks`]; each of their value
//! types implements [`Parameter`], which ties the type to its stack and to
//! the driver command that makes it active.

use super::key::{BindingCategory, BindingKey};
use super::stack::StateStack;
use crate::core::{
    BlendState, BufferTarget, ColorMask, CullState, DepthState, LineState, PointState,
    PolygonModeState, PolygonOffset, PrimitiveRestart, ResourceId, ScissorState, ShaderProgram,
    StencilState, Viewport,
};
use crate::driver::PipelineCommand;
use glam::Mat4;

/// Everything that can be pushed and popped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateCategory {
    Blending,
    ColorMask,
    CullFace,
    Depth,
    Line,
    Point,
    PolygonMode,
    PolygonOffset,
    PrimitiveRestart,
    Scissor,
    Stencil,
    Viewport,
    Shader,
    Framebuffer,
    Material,
    ModelToCamera,
    CameraToClipping,
    /// A buffer binding point.
    Buffer(BufferTarget, u32),
    /// A texture unit.
    Texture(u32),
    /// An image unit.
    Image(u32),
}

impl StateCategory {
    /// All non-binding categories.
    pub const PARAMETERS: [StateCategory; 17] = [
        StateCategory::Blending,
        StateCategory::ColorMask,
        StateCategory::CullFace,
        StateCategory::Depth,
        StateCategory::Line,
        StateCategory::Point,
        StateCategory::PolygonMode,
        StateCategory::PolygonOffset,
        StateCategory::PrimitiveRestart,
        StateCategory::Scissor,
        StateCategory::Stencil,
        StateCategory::Viewport,
        StateCategory::Shader,
        StateCategory::Framebuffer,
        StateCategory::Material,
        StateCategory::ModelToCamera,
        StateCategory::CameraToClipping,
    ];

    /// The binding point, for binding categories.
    pub fn binding_key(self) -> Option<BindingKey> {
        match self {
            StateCategory::Buffer(target, slot) => Some(BindingKey::buffer(target, slot)),
            StateCategory::Texture(unit) => Some(BindingKey::texture(unit)),
            StateCategory::Image(unit) => Some(BindingKey::image(unit)),
            _ => None,
        }
    }

    pub fn is_binding(self) -> bool {
        self.binding_key().is_some()
    }
}

impl From<BindingKey> for StateCategory {
    fn from(key: BindingKey) -> Self {
        match key.category() {
            BindingCategory::Buffer(target) => StateCategory::Buffer(target, key.slot()),
            BindingCategory::Texture => StateCategory::Texture(key.slot()),
            BindingCategory::Image => StateCategory::Image(key.slot()),
        }
    }
}

/// The program in use. `None` selects the driver's default.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActiveShader(pub Option<ShaderProgram>);

/// The framebuffer drawn into. `None` is the default framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ActiveFramebuffer(pub Option<ResourceId>);

/// Index of the active material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ActiveMaterial(pub u8);

/// Model (object) space to camera space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelToCamera(pub Mat4);

impl Default for ModelToCamera {
    fn default() -> Self {
        Self(Mat4::IDENTITY)
    }
}

/// Camera space to clip space (projection).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraToClipping(pub Mat4);

impl Default for CameraToClipping {
    fn default() -> Self {
        Self(Mat4::IDENTITY)
    }
}

/// Stacks of every non-binding category.
#[derive(Debug, Clone, Default)]
pub struct ParameterStacks {
    pub blending: StateStack<BlendState>,
    pub color_mask: StateStack<ColorMask>,
    pub cull_face: StateStack<CullState>,
    pub depth: StateStack<DepthState>,
    pub line: StateStack<LineState>,
    pub point: StateStack<PointState>,
    pub polygon_mode: StateStack<PolygonModeState>,
    pub polygon_offset: StateStack<PolygonOffset>,
    pub primitive_restart: StateStack<PrimitiveRestart>,
    pub scissor: StateStack<ScissorState>,
    pub stencil: StateStack<StencilState>,
    pub viewport: StateStack<Viewport>,
    pub shader: StateStack<ActiveShader>,
    pub framebuffer: StateStack<ActiveFramebuffer>,
    pub material: StateStack<ActiveMaterial>,
    pub model_to_camera: StateStack<ModelToCamera>,
    pub camera_to_clipping: StateStack<CameraToClipping>,
}

impl ParameterStacks {
    /// Save the active value of a non-binding category.
    ///
    /// Returns `false` for binding categories, which are not stored here.
    pub fn push(&mut self, category: StateCategory) -> bool {
        self.with_stack(category, |stack| {
            stack.push();
            true
        })
        .unwrap_or(false)
    }

    /// Restore the saved value of a non-binding category.
    ///
    /// `None` on underflow or for binding categories. On a change, returns
    /// the driver command that makes the restored value active (if the
    /// category has one).
    pub fn pop(&mut self, category: StateCategory) -> Option<PopOutcome> {
        self.with_stack(category, |stack| stack.pop_outcome()).flatten()
    }

    /// Depth of the stack of `category`, zero for binding categories.
    pub fn depth(&self, category: StateCategory) -> usize {
        match category {
            StateCategory::Blending => self.blending.depth(),
            StateCategory::ColorMask => self.color_mask.depth(),
            StateCategory::CullFace => self.cull_face.depth(),
            StateCategory::Depth => self.depth.depth(),
            StateCategory::Line => self.line.depth(),
            StateCategory::Point => self.point.depth(),
            StateCategory::PolygonMode => self.polygon_mode.depth(),
            StateCategory::PolygonOffset => self.polygon_offset.depth(),
            StateCategory::PrimitiveRestart => self.primitive_restart.depth(),
            StateCategory::Scissor => self.scissor.depth(),
            StateCategory::Stencil => self.stencil.depth(),
            StateCategory::Viewport => self.viewport.depth(),
            StateCategory::Shader => self.shader.depth(),
            StateCategory::Framebuffer => self.framebuffer.depth(),
            StateCategory::Material => self.material.depth(),
            StateCategory::ModelToCamera => self.model_to_camera.depth(),
            StateCategory::CameraToClipping => self.camera_to_clipping.depth(),
            StateCategory::Buffer(..) | StateCategory::Texture(_) | StateCategory::Image(_) => 0,
        }
    }

    /// Driver commands for every active value, in [`StateCategory::PARAMETERS`] order.
    pub fn commands(&self) -> Vec<PipelineCommand> {
        [
            self.blending.active().command(),
            self.color_mask.active().command(),
            self.cull_face.active().command(),
            self.depth.active().command(),
            self.line.active().command(),
            self.point.active().command(),
            self.polygon_mode.active().command(),
            self.polygon_offset.active().command(),
            self.primitive_restart.active().command(),
            self.scissor.active().command(),
            self.stencil.active().command(),
            self.viewport.active().command(),
            self.shader.active().command(),
            self.framebuffer.active().command(),
            self.material.active().command(),
            self.model_to_camera.active().command(),
            self.camera_to_clipping.active().command(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    fn with_stack<R>(
        &mut self,
        category: StateCategory,
        f: impl FnOnce(&mut dyn ErasedStack) -> R,
    ) -> Option<R> {
        let stack: &mut dyn ErasedStack = match category {
            StateCategory::Blending => &mut self.blending,
            StateCategory::ColorMask => &mut self.color_mask,
            StateCategory::CullFace => &mut self.cull_face,
            StateCategory::Depth => &mut self.depth,
            StateCategory::Line => &mut self.line,
            StateCategory::Point => &mut self.point,
            StateCategory::PolygonMode => &mut self.polygon_mode,
            StateCategory::PolygonOffset => &mut self.polygon_offset,
            StateCategory::PrimitiveRestart => &mut self.primitive_restart,
            StateCategory::Scissor => &mut self.scissor,
            StateCategory::Stencil => &mut self.stencil,
            StateCategory::Viewport => &mut self.viewport,
            StateCategory::Shader => &mut self.shader,
            StateCategory::Framebuffer => &mut self.framebuffer,
            StateCategory::Material => &mut self.material,
            StateCategory::ModelToCamera => &mut self.model_to_camera,
            StateCategory::CameraToClipping => &mut self.camera_to_clipping,
            StateCategory::Buffer(..) | StateCategory::Texture(_) | StateCategory::Image(_) => {
                return None
            }
        };
        Some(f(stack))
    }
}

/// Result of a successful pop.
#[derive(Debug, Clone, PartialEq)]
pub struct PopOutcome {
    /// Whether the active value changed.
    pub changed: bool,
    /// Command to issue, present only when `changed` and the category has one.
    pub command: Option<PipelineCommand>,
}

// Object-safe view of a parameter stack, used for category-addressed push/pop.
trait ErasedStack {
    fn push(&mut self);
    fn pop_outcome(&mut self) -> Option<PopOutcome>;
}

impl<P: Parameter> ErasedStack for StateStack<P> {
    fn push(&mut self) {
        StateStack::push(self);
    }

    fn pop_outcome(&mut self) -> Option<PopOutcome> {
        let changed = self.pop()?;
        let command = if changed { self.active().command() } else { None };
        Some(PopOutcome { changed, command })
    }
}

/// A value type of one non-binding category.
pub trait Parameter: Clone + PartialEq + 'static {
    const CATEGORY: StateCategory;

    /// The stack this category lives in.
    fn stack(stacks: &ParameterStacks) -> &StateStack<Self>;

    fn stack_mut(stacks: &mut ParameterStacks) -> &mut StateStack<Self>;

    /// Driver command making this value active, if the category has a
    /// driver-side effect.
    fn command(&self) -> Option<PipelineCommand>;
}

macro_rules! impl_parameter {
    ($ty:ty, $category:ident, $field:ident, |$value:ident| $command:expr) => {
        impl Parameter for $ty {
            const CATEGORY: StateCategory = StateCategory::$category;

            fn stack(stacks: &ParameterStacks) -> &StateStack<Self> {
                &stacks.$field
            }

            fn stack_mut(stacks: &mut ParameterStacks) -> &mut StateStack<Self> {
                &mut stacks.$field
            }

            fn command(&self) -> Option<PipelineCommand> {
                let $value = self;
                $command
            }
        }
    };
}

impl_parameter!(BlendState, Blending, blending, |v| Some(PipelineCommand::Blending(*v)));
impl_parameter!(ColorMask, ColorMask, color_mask, |v| Some(PipelineCommand::ColorMask(*v)));
impl_parameter!(CullState, CullFace, cull_face, |v| Some(PipelineCommand::CullFace(*v)));
impl_parameter!(DepthState, Depth, depth, |v| Some(PipelineCommand::Depth(*v)));
impl_parameter!(LineState, Line, line, |v| Some(PipelineCommand::Line(*v)));
impl_parameter!(PointState, Point, point, |v| Some(PipelineCommand::Point(*v)));
impl_parameter!(PolygonModeState, PolygonMode, polygon_mode, |v| Some(
    PipelineCommand::PolygonMode(*v)
));
impl_parameter!(PolygonOffset, PolygonOffset, polygon_offset, |v| Some(
    PipelineCommand::PolygonOffset(*v)
));
impl_parameter!(PrimitiveRestart, PrimitiveRestart, primitive_restart, |v| Some(
    PipelineCommand::PrimitiveRestart(*v)
));
impl_parameter!(ScissorState, Scissor, scissor, |v| Some(PipelineCommand::Scissor(*v)));
impl_parameter!(StencilState, Stencil, stencil, |v| Some(PipelineCommand::Stencil(*v)));
impl_parameter!(Viewport, Viewport, viewport, |v| Some(PipelineCommand::Viewport(*v)));
impl_parameter!(ActiveShader, Shader, shader, |v| Some(PipelineCommand::Program(
    v.0.as_ref().map(ShaderProgram::id)
)));
impl_parameter!(ActiveFramebuffer, Framebuffer, framebuffer, |v| Some(
    PipelineCommand::Framebuffer(v.0)
));
// Material and matrices only reach the driver through the uniform blocks.
impl_parameter!(ActiveMaterial, Material, material, |_v| None);
impl_parameter!(ModelToCamera, ModelToCamera, model_to_camera, |_v| None);
impl_parameter!(CameraToClipping, CameraToClipping, camera_to_clipping, |_v| None);
