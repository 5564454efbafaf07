//! Render state configurations
//!
//! Value types for the fixed-function parameter categories. Each one is a
//! plain value with structural equality so the context can skip redundant
//! driver calls, and most convert to the matching wgpu description.

/// Integer rectangle in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    /// Create a rectangle.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Viewport rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Viewport(pub Rect);

impl Viewport {
    /// Create a viewport.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self(Rect::new(x, y, width, height))
    }

    /// Viewport as `[x, y, width, height]` floats.
    pub fn to_array(&self) -> [f32; 4] {
        [
            self.0.x as f32,
            self.0.y as f32,
            self.0.width as f32,
            self.0.height as f32,
        ]
    }
}

/// Scissor test configuration. `None` disables the test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScissorState(pub Option<Rect>);

impl ScissorState {
    /// Scissor test enabled for `rect`.
    pub fn enabled(rect: Rect) -> Self {
        Self(Some(rect))
    }

    /// Scissor test disabled.
    pub fn disabled() -> Self {
        Self(None)
    }
}

/// Blend state configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendState {
    /// No blending (opaque).
    #[default]
    Opaque,
    /// Standard alpha blending.
    Alpha,
    /// Additive blending.
    Additive,
    /// Pre-multiplied alpha blending.
    PremultipliedAlpha,
    /// Explicit factors and operations.
    Custom(wgpu::BlendState),
}

impl BlendState {
    /// Convert to wgpu blend state.
    pub fn to_wgpu(&self) -> Option<wgpu::BlendState> {
        match self {
            BlendState::Opaque => None,
            BlendState::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
            BlendState::Additive => Some(wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            }),
            BlendState::PremultipliedAlpha => Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
            BlendState::Custom(state) => Some(*state),
        }
    }

    /// Whether blending is enabled at all.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, BlendState::Opaque)
    }
}

/// Color channel write mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorMask(pub wgpu::ColorWrites);

impl Default for ColorMask {
    fn default() -> Self {
        Self(wgpu::ColorWrites::ALL)
    }
}

impl ColorMask {
    /// Disable writes to every channel.
    pub fn none() -> Self {
        Self(wgpu::ColorWrites::empty())
    }
}

/// Depth test configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthState {
    /// Whether to write to the depth buffer.
    pub write: bool,
    /// Comparison function for depth test.
    pub compare: wgpu::CompareFunction,
}

impl DepthState {
    /// Depth testing enabled with writes.
    pub fn read_write() -> Self {
        Self {
            write: true,
            compare: wgpu::CompareFunction::Less,
        }
    }

    /// Depth testing enabled without writes.
    pub fn read_only() -> Self {
        Self {
            write: false,
            compare: wgpu::CompareFunction::Less,
        }
    }

    /// Depth testing disabled.
    pub fn disabled() -> Self {
        Self {
            write: false,
            compare: wgpu::CompareFunction::Always,
        }
    }

    /// Whether the depth test has any effect.
    pub fn is_test_enabled(&self) -> bool {
        self.write || self.compare != wgpu::CompareFunction::Always
    }
}

impl Default for DepthState {
    fn default() -> Self {
        Self::read_write()
    }
}

/// Stencil test configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilState {
    /// Whether the stencil test is enabled.
    pub enabled: bool,
    /// Operations for front faces.
    pub front: wgpu::StencilFaceState,
    /// Operations for back faces.
    pub back: wgpu::StencilFaceState,
    /// Mask applied to the reference and stored value before comparing.
    pub read_mask: u32,
    /// Mask applied before writing.
    pub write_mask: u32,
    /// Reference value.
    pub reference: u32,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            enabled: false,
            front: wgpu::StencilFaceState::IGNORE,
            back: wgpu::StencilFaceState::IGNORE,
            read_mask: !0,
            write_mask: !0,
            reference: 0,
        }
    }
}

impl StencilState {
    /// Same face state for front and back faces.
    pub fn both(face: wgpu::StencilFaceState, reference: u32) -> Self {
        Self {
            enabled: true,
            front: face,
            back: face,
            reference,
            ..Self::default()
        }
    }

    /// Convert to wgpu stencil state.
    pub fn to_wgpu(&self) -> wgpu::StencilState {
        if !self.enabled {
            return wgpu::StencilState::default();
        }
        wgpu::StencilState {
            front: self.front,
            back: self.back,
            read_mask: self.read_mask,
            write_mask: self.write_mask,
        }
    }
}

/// Cull mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullState {
    /// No culling.
    None,
    /// Cull front faces.
    Front,
    /// Cull back faces.
    #[default]
    Back,
}

impl CullState {
    /// Convert to wgpu cull mode.
    pub fn to_wgpu(&self) -> Option<wgpu::Face> {
        match self {
            CullState::None => None,
            CullState::Front => Some(wgpu::Face::Front),
            CullState::Back => Some(wgpu::Face::Back),
        }
    }
}

/// Rasterized line width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineState {
    pub width: f32,
}

impl Default for LineState {
    fn default() -> Self {
        Self { width: 1.0 }
    }
}

/// Rasterized point size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointState {
    /// Size in pixels when the program does not write one.
    pub size: f32,
    /// Whether the vertex program controls the point size.
    pub program_size: bool,
}

impl Default for PointState {
    fn default() -> Self {
        Self {
            size: 1.0,
            program_size: false,
        }
    }
}

/// Polygon rasterization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PolygonModeState(pub wgpu::PolygonMode);

/// Depth offset applied to polygons.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PolygonOffset {
    pub enabled: bool,
    pub factor: f32,
    pub units: f32,
}

impl PolygonOffset {
    /// Offset enabled with the given factor and units.
    pub fn new(factor: f32, units: f32) -> Self {
        Self {
            enabled: true,
            factor,
            units,
        }
    }
}

/// Primitive restart index. `None` disables restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PrimitiveRestart(pub Option<u32>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_to_wgpu() {
        assert!(BlendState::Opaque.to_wgpu().is_none());
        assert_eq!(
            BlendState::Alpha.to_wgpu(),
            Some(wgpu::BlendState::ALPHA_BLENDING)
        );
        let custom = wgpu::BlendState::REPLACE;
        assert_eq!(BlendState::Custom(custom).to_wgpu(), Some(custom));
        assert!(BlendState::Additive.is_enabled());
    }

    #[test]
    fn test_depth_test_enabled() {
        assert!(DepthState::read_write().is_test_enabled());
        assert!(DepthState::read_only().is_test_enabled());
        assert!(!DepthState::disabled().is_test_enabled());
    }

    #[test]
    fn test_cull_to_wgpu() {
        assert_eq!(CullState::None.to_wgpu(), None);
        assert_eq!(CullState::Front.to_wgpu(), Some(wgpu::Face::Front));
        assert_eq!(CullState::default().to_wgpu(), Some(wgpu::Face::Back));
    }

    #[test]
    fn test_disabled_stencil_is_wgpu_default() {
        assert_eq!(StencilState::default().to_wgpu(), wgpu::StencilState::default());
        let face = wgpu::StencilFaceState {
            compare: wgpu::CompareFunction::Equal,
            ..wgpu::StencilFaceState::IGNORE
        };
        let state = StencilState::both(face, 1);
        assert_eq!(state.to_wgpu().front, face);
    }

    #[test]
    fn test_viewport_array() {
        assert_eq!(Viewport::new(0, 0, 640, 480).to_array(), [0.0, 0.0, 640.0, 480.0]);
    }
}
