//! Apply step
//!
//! Walks a [`BindingDiff`] and issues the driver calls that bring the
//! current snapshot to the target, one batch per category.

use super::binding::{BindingState, BufferBinding, TextureBinding};
use super::key::BindingKey;
use super::mask::{BindingDiff, SlotMask};
use crate::core::BufferTarget;
use crate::driver::{GraphicsDriver, ImageUnitBinding};
use crate::error::DriverError;

/// A group of driver calls bracketed by one error probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Batch {
    /// Errors already pending before reconciliation started.
    Pending,
    StorageBuffers,
    UniformBuffers,
    AtomicCounters,
    TransformFeedback,
    /// Single-slot buffer targets.
    OtherBuffers,
    Textures,
    Images,
    /// Per-frame uniform block upload.
    FrameData,
    /// Enabled light set upload.
    LightSet,
    /// Texture unit usage upload.
    TextureUsage,
}

impl Batch {
    /// Binding batches in the order they are applied.
    pub const BINDING_ORDER: [Batch; 7] = [
        Batch::StorageBuffers,
        Batch::UniformBuffers,
        Batch::AtomicCounters,
        Batch::TransformFeedback,
        Batch::OtherBuffers,
        Batch::Textures,
        Batch::Images,
    ];
}

/// A driver error attributed to the batch after which it was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchError {
    pub batch: Batch,
    pub error: DriverError,
}

/// What one apply pass sent to the driver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub binds: u32,
    pub unbinds: u32,
    pub errors: Vec<BatchError>,
}

impl ApplyStats {
    /// Total bind and unbind calls.
    pub fn calls(&self) -> u32 {
        self.binds + self.unbinds
    }
}

/// Poll the driver once and attribute any error to `batch`.
pub(crate) fn probe<D: GraphicsDriver + ?Sized>(
    driver: &mut D,
    batch: Batch,
    errors: &mut Vec<BatchError>,
) {
    if let Some(error) = driver.poll_error() {
        tracing::warn!(?batch, %error, "driver reported an error");
        errors.push(BatchError { batch, error });
    }
}

impl BindingState {
    /// Issue the driver calls for every binding point marked in `diff` and
    /// update `self` to match `target` at those points.
    ///
    /// Batches run in [`Batch::BINDING_ORDER`], slots ascending within a
    /// batch. A marked point whose target is absent or whose resource has
    /// been dropped is unbound and removed from `self`. With `probe_errors`
    /// set, every non-empty batch is followed by one error probe.
    pub fn apply<D: GraphicsDriver + ?Sized>(
        &mut self,
        target: &BindingState,
        diff: &BindingDiff,
        driver: &mut D,
        probe_errors: bool,
    ) -> ApplyStats {
        let mut stats = ApplyStats::default();
        for batch in Batch::BINDING_ORDER {
            let mask = batch_mask(diff, batch);
            if mask.is_empty() {
                continue;
            }
            for bit in mask {
                let Some(key) = batch_key(batch, bit) else {
                    continue;
                };
                let bound = match batch {
                    Batch::Textures => self.apply_texture(key, target, driver),
                    Batch::Images => self.apply_image(key, target, driver),
                    _ => self.apply_buffer(key, target, driver),
                };
                if bound {
                    stats.binds += 1;
                } else {
                    stats.unbinds += 1;
                }
            }
            if probe_errors {
                probe(driver, batch, &mut stats.errors);
            }
        }
        stats
    }

    fn apply_buffer<D: GraphicsDriver + ?Sized>(
        &mut self,
        key: BindingKey,
        target: &BindingState,
        driver: &mut D,
    ) -> bool {
        let Some(buffer_target) = key.target() else {
            return false;
        };
        let wanted = target.buffers.get(&key).and_then(BufferBinding::refreshed);
        if let Some(binding) = wanted {
            if let Some(extent) = binding.cached_extent() {
                driver.bind_buffer(buffer_target, key.slot(), extent.id, extent.range);
                self.buffers.insert(key, binding);
                return true;
            }
        }
        driver.unbind_buffer(buffer_target, key.slot());
        self.buffers.remove(&key);
        false
    }

    fn apply_texture<D: GraphicsDriver + ?Sized>(
        &mut self,
        key: BindingKey,
        target: &BindingState,
        driver: &mut D,
    ) -> bool {
        let wanted = target.textures.get(&key).and_then(TextureBinding::refreshed);
        if let Some(binding) = wanted {
            if let Some(id) = binding.cached_id() {
                driver.bind_texture(key.slot(), id);
                self.textures.insert(key, binding);
                return true;
            }
        }
        driver.unbind_texture(key.slot());
        self.textures.remove(&key);
        false
    }

    fn apply_image<D: GraphicsDriver + ?Sized>(
        &mut self,
        key: BindingKey,
        target: &BindingState,
        driver: &mut D,
    ) -> bool {
        let wanted = target.images.get(&key).and_then(|binding| {
            let texture = binding.handle().upgrade()?;
            Some((binding.refreshed()?, texture))
        });
        if let Some((binding, texture)) = wanted {
            let image = ImageUnitBinding {
                texture: texture.id(),
                level: binding.level,
                layered: binding.layered,
                layer: if binding.layered { 0 } else { binding.layer },
                access: binding.access.normalized(),
                format: texture.format(),
            };
            driver.bind_image(key.slot(), &image);
            self.images.insert(key, binding);
            return true;
        }
        driver.unbind_image(key.slot());
        self.images.remove(&key);
        false
    }
}

fn batch_mask(diff: &BindingDiff, batch: Batch) -> SlotMask {
    match batch {
        Batch::StorageBuffers => diff.storage,
        Batch::UniformBuffers => diff.uniform,
        Batch::AtomicCounters => diff.atomic_counter,
        Batch::TransformFeedback => diff.transform_feedback,
        Batch::OtherBuffers => diff.other,
        Batch::Textures => diff.textures,
        Batch::Images => diff.images,
        Batch::Pending | Batch::FrameData | Batch::LightSet | Batch::TextureUsage => {
            SlotMask::EMPTY
        }
    }
}

fn batch_key(batch: Batch, bit: u32) -> Option<BindingKey> {
    let key = match batch {
        Batch::StorageBuffers => BindingKey::buffer(BufferTarget::ShaderStorage, bit),
        Batch::UniformBuffers => BindingKey::buffer(BufferTarget::Uniform, bit),
        Batch::AtomicCounters => BindingKey::buffer(BufferTarget::AtomicCounter, bit),
        Batch::TransformFeedback => BindingKey::buffer(BufferTarget::TransformFeedback, bit),
        Batch::OtherBuffers => {
            let target = BufferTarget::from_other_bit(u8::try_from(bit).ok()?)?;
            BindingKey::buffer(target, 0)
        }
        Batch::Textures => BindingKey::texture(bit),
        Batch::Images => BindingKey::image(bit),
        Batch::Pending | Batch::FrameData | Batch::LightSet | Batch::TextureUsage => {
            return None
        }
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Buffer, BufferRange, ImageAccess, ResourceId, Texture};
    use crate::driver::{DriverCall, RecordingDriver};
    use crate::state::binding::ImageBinding;
    use std::rc::Rc;

    fn id(raw: u32) -> ResourceId {
        ResourceId::new(raw).unwrap()
    }

    fn with_buffer(state: &mut BindingState, target: BufferTarget, slot: u32, buffer: &Rc<Buffer>) {
        state
            .set(
                BindingKey::buffer(target, slot),
                BufferBinding::new(Buffer::handle(buffer)).into(),
            )
            .unwrap();
    }

    fn reconcile(
        current: &mut BindingState,
        target: &BindingState,
        driver: &mut RecordingDriver,
    ) -> ApplyStats {
        let diff = current.diff(target, false);
        current.apply(target, &diff, driver, true)
    }

    #[test]
    fn test_apply_binds_and_converges() {
        let buffer = Buffer::new(id(7), 128, None);
        let mut current = BindingState::new();
        let mut target = BindingState::new();
        with_buffer(&mut target, BufferTarget::ShaderStorage, 2, &buffer);

        let mut driver = RecordingDriver::new();
        let stats = reconcile(&mut current, &target, &mut driver);
        assert_eq!(stats.binds, 1);
        assert_eq!(
            driver.calls(),
            &[DriverCall::BindBuffer {
                target: BufferTarget::ShaderStorage,
                slot: 2,
                buffer: id(7),
                range: BufferRange::new(0, 128),
            }]
        );

        // A second pass has nothing left to do.
        driver.clear();
        assert_eq!(reconcile(&mut current, &target, &mut driver).calls(), 0);
        assert!(driver.calls().is_empty());
    }

    #[test]
    fn test_absent_target_unbinds_and_removes() {
        let texture = Texture::new(id(3), wgpu::TextureFormat::Rgba8Unorm, None);
        let mut current = BindingState::new();
        current
            .set(BindingKey::texture(1), TextureBinding::new(Texture::handle(&texture)).into())
            .unwrap();

        let mut driver = RecordingDriver::new();
        let stats = reconcile(&mut current, &BindingState::new(), &mut driver);
        assert_eq!(stats.unbinds, 1);
        assert_eq!(driver.calls(), &[DriverCall::UnbindTexture { unit: 1 }]);
        assert!(current.is_empty());
    }

    #[test]
    fn test_order_is_buffers_then_textures_then_images() {
        let buffer = Buffer::new(id(1), 16, None);
        let texture = Texture::new(id(2), wgpu::TextureFormat::R32Float, None);
        let mut target = BindingState::new();
        target
            .set(BindingKey::image(0), ImageBinding::new(Texture::handle(&texture)).into())
            .unwrap();
        target
            .set(BindingKey::texture(4), TextureBinding::new(Texture::handle(&texture)).into())
            .unwrap();
        target
            .set(BindingKey::texture(1), TextureBinding::new(Texture::handle(&texture)).into())
            .unwrap();
        with_buffer(&mut target, BufferTarget::Array, 0, &buffer);
        with_buffer(&mut target, BufferTarget::Uniform, 3, &buffer);
        with_buffer(&mut target, BufferTarget::ShaderStorage, 5, &buffer);

        let mut driver = RecordingDriver::new();
        reconcile(&mut BindingState::new(), &target, &mut driver);

        let order: Vec<&str> = driver
            .calls()
            .iter()
            .map(|call| match call {
                DriverCall::BindBuffer { target: BufferTarget::ShaderStorage, .. } => "storage",
                DriverCall::BindBuffer { target: BufferTarget::Uniform, .. } => "uniform",
                DriverCall::BindBuffer { .. } => "other",
                DriverCall::BindTexture { unit: 1, .. } => "texture1",
                DriverCall::BindTexture { .. } => "texture4",
                DriverCall::BindImage { .. } => "image",
                _ => "unexpected",
            })
            .collect();
        assert_eq!(order, vec!["storage", "uniform", "other", "texture1", "texture4", "image"]);
    }

    #[test]
    fn test_single_slot_targets_apply_independently() {
        let vertices = Buffer::new(id(1), 64, None);
        let commands = Buffer::new(id(2), 32, None);
        let mut current = BindingState::new();
        let mut target = BindingState::new();
        with_buffer(&mut target, BufferTarget::Array, 0, &vertices);
        with_buffer(&mut target, BufferTarget::DrawIndirect, 0, &commands);

        let mut driver = RecordingDriver::new();
        let stats = reconcile(&mut current, &target, &mut driver);
        assert_eq!(stats.binds, 2);
        assert_eq!(driver.calls().len(), 2);
        assert!(driver.calls().contains(&DriverCall::BindBuffer {
            target: BufferTarget::Array,
            slot: 0,
            buffer: id(1),
            range: BufferRange::new(0, 64),
        }));
        assert!(driver.calls().contains(&DriverCall::BindBuffer {
            target: BufferTarget::DrawIndirect,
            slot: 0,
            buffer: id(2),
            range: BufferRange::new(0, 32),
        }));

        // Changing one single-slot target leaves the other alone.
        let other_commands = Buffer::new(id(3), 32, None);
        with_buffer(&mut target, BufferTarget::DrawIndirect, 0, &other_commands);
        driver.clear();
        assert_eq!(reconcile(&mut current, &target, &mut driver).binds, 1);
        assert_eq!(
            driver.calls(),
            &[DriverCall::BindBuffer {
                target: BufferTarget::DrawIndirect,
                slot: 0,
                buffer: id(3),
                range: BufferRange::new(0, 32),
            }]
        );
        assert!(current.buffer(BufferTarget::Array, 0).is_some());
    }

    #[test]
    fn test_image_bind_uses_live_format_and_normalized_access() {
        let texture = Texture::new(id(9), wgpu::TextureFormat::Rgba16Float, None);
        let mut target = BindingState::new();
        target
            .set(
                BindingKey::image(2),
                ImageBinding::new(Texture::handle(&texture))
                    .level(1)
                    .layer(3)
                    .access(ImageAccess::empty())
                    .into(),
            )
            .unwrap();

        let mut driver = RecordingDriver::new();
        reconcile(&mut BindingState::new(), &target, &mut driver);
        assert_eq!(
            driver.calls(),
            &[DriverCall::BindImage {
                unit: 2,
                image: ImageUnitBinding {
                    texture: id(9),
                    level: 1,
                    layered: false,
                    layer: 3,
                    access: ImageAccess::WRITE,
                    format: wgpu::TextureFormat::Rgba16Float,
                },
            }]
        );
    }

    #[test]
    fn test_resize_rebinds_once() {
        let buffer = Buffer::with_range(id(1), BufferRange::new(0, 64), None);
        let mut current = BindingState::new();
        let mut target = BindingState::new();
        with_buffer(&mut target, BufferTarget::Uniform, 0, &buffer);

        let mut driver = RecordingDriver::new();
        reconcile(&mut current, &target, &mut driver);
        buffer.resize(512);
        driver.clear();

        assert_eq!(reconcile(&mut current, &target, &mut driver).binds, 1);
        assert_eq!(
            driver.calls(),
            &[DriverCall::BindBuffer {
                target: BufferTarget::Uniform,
                slot: 0,
                buffer: id(1),
                range: BufferRange::new(0, 512),
            }]
        );
        // The refreshed extent now lives in the current snapshot.
        driver.clear();
        assert_eq!(reconcile(&mut current, &target, &mut driver).calls(), 0);
    }

    #[test]
    fn test_dropped_resource_is_unbound() {
        let buffer = Buffer::new(id(1), 64, None);
        let mut current = BindingState::new();
        let mut target = BindingState::new();
        with_buffer(&mut target, BufferTarget::AtomicCounter, 1, &buffer);

        let mut driver = RecordingDriver::new();
        reconcile(&mut current, &target, &mut driver);
        drop(buffer);
        driver.clear();

        reconcile(&mut current, &target, &mut driver);
        assert_eq!(
            driver.calls(),
            &[DriverCall::UnbindBuffer {
                target: BufferTarget::AtomicCounter,
                slot: 1,
            }]
        );
        assert!(current.is_empty());
    }

    #[test]
    fn test_errors_are_attributed_to_their_batch() {
        let buffer = Buffer::new(id(1), 64, None);
        let texture = Texture::new(id(2), wgpu::TextureFormat::Rgba8Unorm, None);
        let mut target = BindingState::new();
        with_buffer(&mut target, BufferTarget::Uniform, 0, &buffer);
        target
            .set(BindingKey::texture(0), TextureBinding::new(Texture::handle(&texture)).into())
            .unwrap();

        let mut driver = RecordingDriver::new();
        driver.fail_on(
            |call| matches!(call, DriverCall::BindTexture { .. }),
            DriverError::new(0x0500, "invalid enum"),
        );

        let stats = reconcile(&mut BindingState::new(), &target, &mut driver);
        assert_eq!(driver.probes(), 2);
        assert_eq!(
            stats.errors,
            vec![BatchError {
                batch: Batch::Textures,
                error: DriverError::new(0x0500, "invalid enum"),
            }]
        );
    }

    #[test]
    fn test_no_probe_when_disabled_or_empty() {
        let mut driver = RecordingDriver::new();
        let mut current = BindingState::new();
        let diff = current.diff(&BindingState::new(), true);
        current.apply(&BindingState::new(), &diff, &mut driver, true);
        assert_eq!(driver.probes(), 0);

        let buffer = Buffer::new(id(1), 64, None);
        let mut target = BindingState::new();
        with_buffer(&mut target, BufferTarget::Array, 0, &buffer);
        let diff = current.diff(&target, false);
        current.apply(&target, &diff, &mut driver, false);
        assert_eq!(driver.probes(), 0);
        assert_eq!(driver.binding_calls().count(), 1);
    }
}
