//! Per-frame and per-object uniform data

use super::apply::{probe, Batch, BatchError};
use super::binding::BindingState;
use super::key::BindingCategory;
use super::mask::MASK_WIDTH;
use crate::core::Viewport;
use crate::driver::{GraphicsDriver, UniformBlock};
use glam::{Mat4, Vec3};

/// Lights that can be enabled at the same time.
pub const MAX_ENABLED_LIGHTS: usize = 8;

/// Per-frame uniform block: camera transforms and viewport.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameData {
    pub world_to_camera: [[f32; 4]; 4],
    pub camera_to_world: [[f32; 4]; 4],
    pub camera_to_clipping: [[f32; 4]; 4],
    pub clipping_to_camera: [[f32; 4]; 4],
    /// x, y, width, height.
    pub viewport: [f32; 4],
}

impl FrameData {
    /// Build the block; inverse matrices are derived.
    pub fn new(world_to_camera: Mat4, camera_to_clipping: Mat4, viewport: Viewport) -> Self {
        Self {
            world_to_camera: world_to_camera.to_cols_array_2d(),
            camera_to_world: world_to_camera.inverse().to_cols_array_2d(),
            camera_to_clipping: camera_to_clipping.to_cols_array_2d(),
            clipping_to_camera: camera_to_clipping.inverse().to_cols_array_2d(),
            viewport: viewport.to_array(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Per-object uniform block for draw code.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectData {
    pub model_to_camera: [[f32; 4]; 4],
    pub material: u32,
    pub _padding: [u32; 3],
}

impl ObjectData {
    pub fn new(model_to_camera: Mat4, material: u8) -> Self {
        Self {
            model_to_camera: model_to_camera.to_cols_array_2d(),
            material: material as u32,
            _padding: [0; 3],
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Light source kind, stored as `u32` in [`LightParameters::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum LightKind {
    Directional = 1,
    Point = 2,
    Spot = 3,
}

/// One element of the light data block.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightParameters {
    /// Camera space position (w = 1).
    pub position: [f32; 4],
    /// Camera space direction (w = 0).
    pub direction: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
    pub exponent: f32,
    pub cos_cutoff: f32,
    pub kind: u32,
    pub _padding: [u32; 2],
}

impl LightParameters {
    fn base(kind: LightKind, color: Vec3) -> Self {
        Self {
            position: [0.0, 0.0, 0.0, 1.0],
            direction: [0.0, 0.0, -1.0, 0.0],
            ambient: [0.0, 0.0, 0.0, 1.0],
            diffuse: color.extend(1.0).to_array(),
            specular: color.extend(1.0).to_array(),
            constant: 1.0,
            linear: 0.0,
            quadratic: 0.0,
            exponent: 0.0,
            cos_cutoff: -1.0,
            kind: kind as u32,
            _padding: [0; 2],
        }
    }

    pub fn directional(direction: Vec3, color: Vec3) -> Self {
        Self {
            direction: direction.normalize_or_zero().extend(0.0).to_array(),
            ..Self::base(LightKind::Directional, color)
        }
    }

    pub fn point(position: Vec3, color: Vec3) -> Self {
        Self {
            position: position.extend(1.0).to_array(),
            ..Self::base(LightKind::Point, color)
        }
    }

    /// Spot light with a cone half-angle of `cutoff` radians.
    pub fn spot(position: Vec3, direction: Vec3, cutoff: f32, color: Vec3) -> Self {
        Self {
            position: position.extend(1.0).to_array(),
            direction: direction.normalize_or_zero().extend(0.0).to_array(),
            cos_cutoff: cutoff.cos(),
            ..Self::base(LightKind::Spot, color)
        }
    }

    /// Set the distance attenuation factors.
    pub fn attenuation(mut self, constant: f32, linear: f32, quadratic: f32) -> Self {
        self.constant = constant;
        self.linear = linear;
        self.quadratic = quadratic;
        self
    }

    pub fn ambient(mut self, ambient: Vec3) -> Self {
        self.ambient = ambient.extend(1.0).to_array();
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Uniform block listing the enabled light ids.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightSet {
    pub count: u32,
    pub lights: [u32; MAX_ENABLED_LIGHTS],
    pub _padding: [u32; 3],
}

impl LightSet {
    /// Enabled light ids, in enabling order up to swap-removal.
    pub fn enabled(&self) -> &[u32] {
        &self.lights[..self.count as usize]
    }

    pub fn contains(&self, light: u8) -> bool {
        self.enabled().contains(&u32::from(light))
    }

    pub fn is_full(&self) -> bool {
        self.count as usize >= MAX_ENABLED_LIGHTS
    }

    /// Add `light`. Returns false if the set is full.
    pub fn insert(&mut self, light: u8) -> bool {
        if self.contains(light) {
            return true;
        }
        if self.is_full() {
            return false;
        }
        self.lights[self.count as usize] = u32::from(light);
        self.count += 1;
        true
    }

    /// Remove `light`, moving the last enabled light into its place.
    pub fn remove(&mut self, light: u8) -> bool {
        let Some(pos) = self.enabled().iter().position(|&id| id == u32::from(light)) else {
            return false;
        };
        self.count -= 1;
        self.lights.swap(pos, self.count as usize);
        true
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Uniform block with one flag per texture unit: 1 when a texture is bound.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TextureUsage {
    pub units: [u32; MASK_WIDTH as usize],
}

impl Default for TextureUsage {
    fn default() -> Self {
        bytemuck::Zeroable::zeroed()
    }
}

impl TextureUsage {
    /// Flags for every texture unit bound in `state`.
    pub fn from_state(state: &BindingState) -> Self {
        let mut usage = Self::default();
        for key in state.keys() {
            if key.category() == BindingCategory::Texture {
                if let Some(flag) = usage.units.get_mut(key.slot() as usize) {
                    *flag = 1;
                }
            }
        }
        usage
    }

    pub fn is_used(&self, unit: u32) -> bool {
        self.units.get(unit as usize).is_some_and(|&flag| flag != 0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Last uploaded contents of a single-element uniform block.
#[derive(Debug, Clone)]
pub(crate) struct SyncedBlock<T> {
    block: UniformBlock,
    batch: Batch,
    uploaded: Option<T>,
}

impl<T: bytemuck::Pod> SyncedBlock<T> {
    pub(crate) fn new(block: UniformBlock, batch: Batch) -> Self {
        Self {
            block,
            batch,
            uploaded: None,
        }
    }

    /// Upload `value` if its bytes differ from the last upload, or if
    /// `forced`. Probes once after an upload when `errors` is given.
    pub(crate) fn sync<D: GraphicsDriver + ?Sized>(
        &mut self,
        driver: &mut D,
        value: T,
        forced: bool,
        errors: Option<&mut Vec<BatchError>>,
    ) -> bool {
        let changed = self
            .uploaded
            .is_none_or(|uploaded| bytemuck::bytes_of(&uploaded) != bytemuck::bytes_of(&value));
        if !forced && !changed {
            return false;
        }
        driver.upload_block(self.block, 0, bytemuck::bytes_of(&value));
        self.uploaded = Some(value);
        if let Some(errors) = errors {
            probe(driver, self.batch, errors);
        }
        true
    }
}
