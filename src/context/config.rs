//! Context configuration
//!
//! Configuration for [`RenderingContext`](super::RenderingContext) creation.

use crate::core::{BufferTarget, TargetClass};
use crate::state::{BindingCategory, MASK_WIDTH};

/// Number of binding points per indexed category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingLimits {
    /// Shader storage buffer slots.
    pub storage_buffers: u32,
    /// Uniform buffer slots.
    pub uniform_buffers: u32,
    /// Atomic counter buffer slots.
    pub atomic_counters: u32,
    /// Transform feedback buffer slots.
    pub transform_feedback: u32,
    /// Texture units.
    pub texture_units: u32,
    /// Image units.
    pub image_units: u32,
}

impl Default for BindingLimits {
    fn default() -> Self {
        Self {
            storage_buffers: 32,
            uniform_buffers: 32,
            atomic_counters: 8,
            transform_feedback: 4,
            texture_units: 32,
            image_units: 8,
        }
    }
}

impl BindingLimits {
    /// Every limit clamped to what a change mask can track.
    pub fn clamped(self) -> Self {
        Self {
            storage_buffers: self.storage_buffers.min(MASK_WIDTH),
            uniform_buffers: self.uniform_buffers.min(MASK_WIDTH),
            atomic_counters: self.atomic_counters.min(MASK_WIDTH),
            transform_feedback: self.transform_feedback.min(MASK_WIDTH),
            texture_units: self.texture_units.min(MASK_WIDTH),
            image_units: self.image_units.min(MASK_WIDTH),
        }
    }

    /// Number of slots of `category`. Single-slot targets have one.
    pub fn slots(&self, category: BindingCategory) -> u32 {
        match category {
            BindingCategory::Buffer(target) => self.buffer_slots(target),
            BindingCategory::Texture => self.texture_units,
            BindingCategory::Image => self.image_units,
        }
    }

    fn buffer_slots(&self, target: BufferTarget) -> u32 {
        match target.class() {
            TargetClass::Storage => self.storage_buffers,
            TargetClass::Uniform => self.uniform_buffers,
            TargetClass::AtomicCounter => self.atomic_counters,
            TargetClass::TransformFeedback => self.transform_feedback,
            TargetClass::Other(_) => 1,
        }
    }
}

/// Settings for creating a rendering context.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Binding point limits, clamped on context creation.
    pub limits: BindingLimits,
    /// Whether every batch of driver calls is followed by an error probe.
    pub probe_errors: bool,
    /// Whether the frame data, light set and texture usage blocks are kept
    /// in sync by the context.
    pub uniform_blocks: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            limits: BindingLimits::default(),
            probe_errors: true,
            uniform_blocks: true,
        }
    }
}

impl ContextConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the binding point limits.
    pub fn limits(mut self, limits: BindingLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set whether batches are followed by an error probe.
    pub fn probe_errors(mut self, probe_errors: bool) -> Self {
        self.probe_errors = probe_errors;
        self
    }

    /// Set whether the context uploads its uniform blocks.
    pub fn uniform_blocks(mut self, uniform_blocks: bool) -> Self {
        self.uniform_blocks = uniform_blocks;
        self
    }
}
