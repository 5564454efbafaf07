//! RenderingContext - stateful front-end over a graphics driver
//!
//! Callers describe the state they want (bind requests, parameter stacks);
//! the context turns that into the minimal sequence of driver calls.
//! Binding requests only touch the target snapshot until [`RenderingContext::reconcile`];
//! parameter changes reach the driver immediately.

pub mod config;

pub use config::{BindingLimits, ContextConfig};

use crate::core::{BufferHandle, BufferTarget, ShaderProgram, TextureHandle};
use crate::driver::{GraphicsDriver, UniformBlock};
use crate::error::StateError;
use crate::state::apply::probe;
use crate::state::frame::SyncedBlock;
use crate::state::{
    ActiveMaterial, ActiveShader, Batch, BatchError, Binding, BindingKey, BindingState,
    BufferBinding, CameraToClipping, FrameData, ImageBinding, LightParameters, LightSet,
    ModelToCamera, ObjectData, Parameter, ParameterStacks, StateCategory, TextureBinding,
    TextureUsage,
};
use glam::Mat4;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

/// Number of light ids; `u8::MAX` is never handed out.
const LIGHT_IDS: u8 = u8::MAX;

/// Outcome of one reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Bind calls issued.
    pub binds: u32,
    /// Unbind calls issued.
    pub unbinds: u32,
    /// Requested bindings dropped because their resource is gone.
    pub pruned: usize,
    /// Whether the per-frame block was uploaded.
    pub frame_uploaded: bool,
    /// Whether the enabled light set was uploaded.
    pub light_set_uploaded: bool,
    /// Whether the texture usage flags were uploaded.
    pub texture_usage_uploaded: bool,
    /// Driver errors, attributed to the batch after which they were seen.
    pub errors: Vec<BatchError>,
}

impl ReconcileReport {
    /// Bind plus unbind calls.
    pub fn binding_calls(&self) -> u32 {
        self.binds + self.unbinds
    }

    /// No driver error was reported.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Stateful rendering context.
///
/// Owns the driver, the believed driver state (`current`), the requested
/// state (`target`) and every state stack. Single-threaded.
pub struct RenderingContext<D: GraphicsDriver> {
    driver: D,
    config: ContextConfig,
    current: BindingState,
    target: BindingState,
    parameters: ParameterStacks,
    binding_stacks: FxHashMap<BindingKey, Vec<Option<Binding>>>,
    buffers: FxHashMap<String, BufferHandle>,
    world_to_camera: Mat4,
    light_registry: FxHashMap<Vec<u8>, u8>,
    free_lights: BTreeSet<u8>,
    light_set: LightSet,
    frame_block: SyncedBlock<FrameData>,
    light_set_block: SyncedBlock<LightSet>,
    texture_usage_block: SyncedBlock<TextureUsage>,
}

impl<D: GraphicsDriver> RenderingContext<D> {
    /// Create a context with default configuration.
    ///
    /// The driver is assumed to be in its initial state: nothing bound and
    /// default parameters.
    pub fn new(driver: D) -> Self {
        Self::with_config(driver, ContextConfig::default())
    }

    /// Create a context with the given configuration.
    pub fn with_config(driver: D, mut config: ContextConfig) -> Self {
        config.limits = config.limits.clamped();
        Self {
            driver,
            config,
            current: BindingState::new(),
            target: BindingState::new(),
            parameters: ParameterStacks::default(),
            binding_stacks: FxHashMap::default(),
            buffers: FxHashMap::default(),
            world_to_camera: Mat4::IDENTITY,
            light_registry: FxHashMap::default(),
            free_lights: (0..LIGHT_IDS).collect(),
            light_set: LightSet::default(),
            frame_block: SyncedBlock::new(UniformBlock::FrameData, Batch::FrameData),
            light_set_block: SyncedBlock::new(UniformBlock::LightSet, Batch::LightSet),
            texture_usage_block: SyncedBlock::new(UniformBlock::TextureUsage, Batch::TextureUsage),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Consume the context, returning the driver.
    pub fn into_driver(self) -> D {
        self.driver
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// The state the driver is believed to be in.
    pub fn current_state(&self) -> &BindingState {
        &self.current
    }

    /// The state requested so far.
    pub fn target_state(&self) -> &BindingState {
        &self.target
    }

    // Binding requests

    /// Request `binding` at `key`, or unbind it with `None`.
    ///
    /// Takes effect at the next [`reconcile`](Self::reconcile).
    pub fn request_bind(
        &mut self,
        key: BindingKey,
        binding: Option<Binding>,
    ) -> Result<(), StateError> {
        let key = self.checked_key(key)?;
        match binding {
            Some(binding) => self.target.set(key, binding).inspect_err(|error| {
                tracing::warn!(%error, "rejected bind request");
            }),
            None => {
                self.target.remove(key);
                Ok(())
            }
        }
    }

    /// Request the whole live range of a buffer at `slot` of `target`.
    pub fn bind_buffer(
        &mut self,
        target: BufferTarget,
        slot: u32,
        buffer: &BufferHandle,
    ) -> Result<(), StateError> {
        let binding = BufferBinding::new(buffer.clone());
        self.request_bind(BindingKey::buffer(target, slot), Some(binding.into()))
    }

    /// [`bind_buffer`](Self::bind_buffer) with a raw GL target enumerant.
    pub fn bind_buffer_raw(
        &mut self,
        raw_target: u32,
        slot: u32,
        buffer: &BufferHandle,
    ) -> Result<(), StateError> {
        let target = BufferTarget::from_gl(raw_target).inspect_err(|error| {
            tracing::warn!(%error, slot, "ignoring bind request");
        })?;
        self.bind_buffer(target, slot, buffer)
    }

    pub fn unbind_buffer(&mut self, target: BufferTarget, slot: u32) -> Result<(), StateError> {
        self.request_bind(BindingKey::buffer(target, slot), None)
    }

    /// Request a texture on texture unit `unit`.
    pub fn bind_texture(&mut self, unit: u32, texture: &TextureHandle) -> Result<(), StateError> {
        let binding = TextureBinding::new(texture.clone());
        self.request_bind(BindingKey::texture(unit), Some(binding.into()))
    }

    pub fn unbind_texture(&mut self, unit: u32) -> Result<(), StateError> {
        self.request_bind(BindingKey::texture(unit), None)
    }

    /// Request an image on image unit `unit`.
    pub fn bind_image(&mut self, unit: u32, image: ImageBinding) -> Result<(), StateError> {
        self.request_bind(BindingKey::image(unit), Some(image.into()))
    }

    pub fn unbind_image(&mut self, unit: u32) -> Result<(), StateError> {
        self.request_bind(BindingKey::image(unit), None)
    }

    /// Save the requested binding at `key`, then request `binding`.
    pub fn push_and_bind(
        &mut self,
        key: BindingKey,
        binding: Option<Binding>,
    ) -> Result<(), StateError> {
        self.push(key.into())?;
        self.request_bind(key, binding)
    }

    // Reconciliation

    /// Bring the driver to the requested binding state.
    ///
    /// With `forced`, every occupied binding point (in either snapshot) is
    /// re-issued and every uniform block is uploaded even if unchanged.
    pub fn reconcile(&mut self, forced: bool) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let probe_errors = self.config.probe_errors;
        if probe_errors {
            probe(&mut self.driver, Batch::Pending, &mut report.errors);
        }

        report.pruned = self.target.prune_released();
        let diff = self.current.diff(&self.target, forced);
        let stats = self
            .current
            .apply(&self.target, &diff, &mut self.driver, probe_errors);
        report.binds = stats.binds;
        report.unbinds = stats.unbinds;
        report.errors.extend(stats.errors);

        if self.config.uniform_blocks {
            let frame = self.frame_data();
            let usage = self.texture_usage();
            let errors = &mut report.errors;
            report.frame_uploaded = self.frame_block.sync(
                &mut self.driver,
                frame,
                forced,
                probe_errors.then_some(&mut *errors),
            );
            report.light_set_uploaded = self.light_set_block.sync(
                &mut self.driver,
                self.light_set,
                forced,
                probe_errors.then_some(&mut *errors),
            );
            report.texture_usage_uploaded = self.texture_usage_block.sync(
                &mut self.driver,
                usage,
                forced,
                probe_errors.then_some(errors),
            );
        }

        tracing::trace!(
            forced,
            binds = report.binds,
            unbinds = report.unbinds,
            pruned = report.pruned,
            frame_uploaded = report.frame_uploaded,
            light_set_uploaded = report.light_set_uploaded,
            texture_usage_uploaded = report.texture_usage_uploaded,
            errors = report.errors.len(),
            "reconciled"
        );
        report
    }

    // Stacks

    /// Save the active value of `category`.
    pub fn push(&mut self, category: StateCategory) -> Result<(), StateError> {
        match category.binding_key() {
            Some(key) => {
                let key = self.checked_key(key)?;
                let saved = self.target.get(key);
                self.binding_stacks.entry(key).or_default().push(saved);
            }
            None => {
                self.parameters.push(category);
            }
        }
        Ok(())
    }

    /// Restore the most recently saved value of `category`.
    ///
    /// On an empty stack the active value is left unchanged and
    /// [`StateError::StackUnderflow`] is returned.
    pub fn pop(&mut self, category: StateCategory) -> Result<(), StateError> {
        match category.binding_key() {
            Some(key) => self.pop_binding(key, category),
            None => {
                let Some(outcome) = self.parameters.pop(category) else {
                    return Err(underflow(category));
                };
                if outcome.changed {
                    if let Some(command) = outcome.command {
                        self.driver.apply_pipeline(&command);
                    }
                    self.after_change(category);
                }
                Ok(())
            }
        }
    }

    fn pop_binding(&mut self, key: BindingKey, category: StateCategory) -> Result<(), StateError> {
        let key = self.checked_key(key)?;
        let Some(stack) = self.binding_stacks.get_mut(&key) else {
            return Err(underflow(category));
        };
        let Some(saved) = stack.pop() else {
            return Err(underflow(category));
        };
        if stack.is_empty() {
            self.binding_stacks.remove(&key);
        }
        match saved {
            Some(binding) => self.target.set(key, binding)?,
            None => {
                self.target.remove(key);
            }
        }
        Ok(())
    }

    /// Number of saved values of `category`.
    pub fn stack_depth(&self, category: StateCategory) -> usize {
        match category.binding_key() {
            Some(key) => self
                .binding_stacks
                .get(&single_slot_key(key))
                .map_or(0, Vec::len),
            None => self.parameters.depth(category),
        }
    }

    /// The active value of a parameter category.
    pub fn active<P: Parameter>(&self) -> &P {
        P::stack(&self.parameters).active()
    }

    /// Make `value` active. Returns whether anything changed.
    ///
    /// Categories with a driver-side effect issue their command only on change.
    pub fn set<P: Parameter>(&mut self, value: P) -> bool {
        let changed = P::stack_mut(&mut self.parameters).set(value);
        if changed {
            if let Some(command) = P::stack(&self.parameters).active().command() {
                self.driver.apply_pipeline(&command);
            }
            self.after_change(P::CATEGORY);
        }
        changed
    }

    /// Save the active value of `P`'s category, then make `value` active.
    pub fn push_and_set<P: Parameter>(&mut self, value: P) -> bool {
        P::stack_mut(&mut self.parameters).push();
        self.set(value)
    }

    /// Re-issue the command of every active parameter, e.g. after the driver
    /// lost its state.
    pub fn reapply_parameters(&mut self) {
        for command in self.parameters.commands() {
            self.driver.apply_pipeline(&command);
        }
    }

    fn after_change(&mut self, category: StateCategory) {
        if category == StateCategory::Shader {
            self.bind_interface_blocks();
        }
    }

    // Shader

    /// Activate `program` (or the default with `None`).
    pub fn set_shader(&mut self, program: Option<ShaderProgram>) -> bool {
        self.set(ActiveShader(program))
    }

    pub fn shader(&self) -> Option<&ShaderProgram> {
        self.parameters.shader.active().0.as_ref()
    }

    // Registered buffers of the active program's interface blocks.
    fn bind_interface_blocks(&mut self) {
        let Some(program) = self.parameters.shader.active().0.clone() else {
            return;
        };
        for block in program.blocks() {
            let Some(buffer) = self.buffers.get(&block.name).cloned() else {
                continue;
            };
            if let Err(error) = self.bind_buffer(block.target, block.slot, &buffer) {
                tracing::warn!(block = %block.name, %error, "cannot bind interface block");
            }
        }
    }

    // Named buffers

    /// Make `buffer` available under `name` for interface blocks.
    pub fn register_buffer(
        &mut self,
        name: impl Into<String>,
        buffer: BufferHandle,
    ) -> Result<(), StateError> {
        let name = name.into();
        if self.buffers.contains_key(&name) {
            let error = StateError::BufferAlreadyRegistered(name);
            tracing::warn!(%error, "cannot register buffer");
            return Err(error);
        }
        tracing::debug!(%name, "registered buffer");
        self.buffers.insert(name, buffer);
        Ok(())
    }

    /// Forget a registered buffer. Existing bindings are not touched.
    pub fn unregister_buffer(&mut self, name: &str) -> Result<BufferHandle, StateError> {
        let buffer = self.buffers.remove(name).ok_or_else(|| {
            let error = StateError::UnknownBuffer(name.to_string());
            tracing::warn!(%error, "cannot unregister buffer");
            error
        })?;
        tracing::debug!(%name, "unregistered buffer");
        Ok(buffer)
    }

    /// Look up a registered buffer.
    pub fn registered_buffer(&self, name: &str) -> Option<&BufferHandle> {
        self.buffers.get(name)
    }

    /// Request the buffer registered as `name` at `slot` of `target`.
    pub fn bind_named_buffer(
        &mut self,
        name: &str,
        target: BufferTarget,
        slot: u32,
    ) -> Result<(), StateError> {
        let Some(buffer) = self.buffers.get(name).cloned() else {
            let error = StateError::UnknownBuffer(name.to_string());
            tracing::warn!(%error, "cannot bind buffer");
            return Err(error);
        };
        self.bind_buffer(target, slot, &buffer)
    }

    // Lights

    /// Enable a light by its parameters, registering it first if these
    /// parameters were never seen. Returns the light id.
    pub fn add_light(&mut self, light: &LightParameters) -> Result<u8, StateError> {
        let id = match self.light_registry.get(light.as_bytes()) {
            Some(&id) => id,
            None => {
                let id = self.register_light(light)?;
                self.light_registry.insert(light.as_bytes().to_vec(), id);
                id
            }
        };
        self.enable_light(id);
        Ok(id)
    }

    /// Store `light` under the lowest free id. The light is not enabled.
    pub fn register_light(&mut self, light: &LightParameters) -> Result<u8, StateError> {
        let Some(id) = self.free_lights.pop_first() else {
            let error = StateError::LightIdsExhausted(usize::from(LIGHT_IDS));
            tracing::warn!(%error, "ignoring light registration");
            return Err(error);
        };
        self.upload_light(id, light);
        Ok(id)
    }

    /// Overwrite the parameters stored under `id`, claiming it if free.
    pub fn set_light(&mut self, id: u8, light: &LightParameters) {
        self.free_lights.remove(&id);
        self.light_registry.retain(|_, registered| *registered != id);
        self.upload_light(id, light);
    }

    /// Release `id` for reuse. An enabled light stays enabled.
    pub fn unregister_light(&mut self, id: u8) {
        if id == LIGHT_IDS {
            return;
        }
        self.light_registry.retain(|_, registered| *registered != id);
        self.free_lights.insert(id);
    }

    /// Add `id` to the enabled light set. Returns whether it is enabled.
    ///
    /// A full set is left unchanged with a warning.
    pub fn enable_light(&mut self, id: u8) -> bool {
        let enabled = self.light_set.insert(id);
        if !enabled {
            tracing::warn!(light = id, "light set is full, ignoring enable");
        }
        enabled
    }

    /// Remove `id` from the enabled light set; the last enabled light takes
    /// its place. Returns whether it was enabled.
    pub fn disable_light(&mut self, id: u8) -> bool {
        self.light_set.remove(id)
    }

    /// The light set as it will be uploaded at the next reconciliation.
    pub fn light_set(&self) -> &LightSet {
        &self.light_set
    }

    fn upload_light(&mut self, id: u8, light: &LightParameters) {
        if self.config.uniform_blocks {
            self.driver
                .upload_block(UniformBlock::Lights, u32::from(id), light.as_bytes());
        }
    }

    /// Texture unit usage flags for the requested bindings.
    pub fn texture_usage(&self) -> TextureUsage {
        TextureUsage::from_state(&self.target)
    }

    // Matrices

    /// Set the world-to-camera (view) matrix.
    pub fn set_camera_matrix(&mut self, world_to_camera: Mat4) {
        self.world_to_camera = world_to_camera;
    }

    pub fn camera_matrix(&self) -> Mat4 {
        self.world_to_camera
    }

    /// Post-multiply the active model-to-camera matrix.
    pub fn mult_model_matrix(&mut self, matrix: Mat4) {
        let model = self.active::<ModelToCamera>().0 * matrix;
        self.set(ModelToCamera(model));
    }

    /// Reset the model-to-camera matrix to the camera matrix (identity model).
    pub fn reset_model_matrix(&mut self) {
        self.set(ModelToCamera(self.world_to_camera));
    }

    /// The per-frame block as it would be uploaded now.
    pub fn frame_data(&self) -> FrameData {
        FrameData::new(
            self.world_to_camera,
            self.active::<CameraToClipping>().0,
            *self.parameters.viewport.active(),
        )
    }

    /// The per-object block for the active model matrix and material.
    pub fn object_data(&self) -> ObjectData {
        ObjectData::new(
            self.active::<ModelToCamera>().0,
            self.active::<ActiveMaterial>().0,
        )
    }

    // Validation

    fn checked_key(&self, key: BindingKey) -> Result<BindingKey, StateError> {
        let coerced = single_slot_key(key);
        if coerced != key {
            tracing::warn!(?key, "single-slot target, using slot 0");
        }
        let key = coerced;
        let limit = self.config.limits.slots(key.category());
        if key.slot() >= limit {
            let error = StateError::SlotOutOfRange {
                category: key.into(),
                slot: key.slot(),
                limit,
            };
            tracing::warn!(%error, "rejected request");
            return Err(error);
        }
        Ok(key)
    }
}

/// Single-slot targets only have slot 0.
fn single_slot_key(key: BindingKey) -> BindingKey {
    match key.target() {
        Some(target) if !target.is_indexed() && key.slot() != 0 => BindingKey::buffer(target, 0),
        _ => key,
    }
}

fn underflow(category: StateCategory) -> StateError {
    let error = StateError::StackUnderflow(category);
    tracing::warn!(%error, "pop ignored");
    error
}

impl<D: GraphicsDriver + std::fmt::Debug> std::fmt::Debug for RenderingContext<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderingContext")
            .field("driver", &self.driver)
            .field("current", &self.current.len())
            .field("target", &self.target.len())
            .field("buffers", &self.buffers.len())
            .field("lights", &self.light_registry.len())
            .field("light_set", &self.light_set.enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        Buffer, BufferRange, CullState, DepthState, ImageAccess, InterfaceBlock, ResourceId,
        Texture, Viewport,
    };
    use crate::driver::{DriverCall, PipelineCommand, RecordingDriver};
    use crate::error::DriverError;
    use crate::state::MAX_ENABLED_LIGHTS;
    use glam::Vec3;
    use std::rc::Rc;

    fn id(raw: u32) -> ResourceId {
        ResourceId::new(raw).unwrap()
    }

    fn context() -> RenderingContext<RecordingDriver> {
        let config = ContextConfig::new().uniform_blocks(false);
        RenderingContext::with_config(RecordingDriver::new(), config)
    }

    fn storage(slot: u32) -> BindingKey {
        BindingKey::buffer(BufferTarget::ShaderStorage, slot)
    }

    fn buffer_binding(buffer: &Rc<Buffer>) -> Option<Binding> {
        Some(BufferBinding::new(Buffer::handle(buffer)).into())
    }

    #[test]
    fn test_storage_slot_scenario() {
        let a = Buffer::new(id(1), 256, Some("a"));
        let mut ctx = context();

        ctx.request_bind(storage(2), buffer_binding(&a)).unwrap();
        let report = ctx.reconcile(false);
        assert_eq!(report.binds, 1);
        assert_eq!(
            ctx.driver().calls(),
            &[DriverCall::BindBuffer {
                target: BufferTarget::ShaderStorage,
                slot: 2,
                buffer: id(1),
                range: BufferRange::new(0, 256),
            }]
        );

        ctx.driver_mut().clear();
        ctx.request_bind(storage(2), buffer_binding(&a)).unwrap();
        assert_eq!(ctx.reconcile(false).binding_calls(), 0);
        assert!(ctx.driver().calls().is_empty());

        ctx.request_bind(storage(2), None).unwrap();
        let report = ctx.reconcile(false);
        assert_eq!(report.unbinds, 1);
        assert_eq!(
            ctx.driver().calls(),
            &[DriverCall::UnbindBuffer {
                target: BufferTarget::ShaderStorage,
                slot: 2,
            }]
        );
        assert!(ctx.current_state().get(storage(2)).is_none());
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let buffer = Buffer::new(id(1), 64, None);
        let texture = Texture::new(id(2), wgpu::TextureFormat::Rgba8Unorm, None);
        let mut ctx = RenderingContext::new(RecordingDriver::new());
        ctx.bind_buffer(BufferTarget::Uniform, 0, &Buffer::handle(&buffer)).unwrap();
        ctx.bind_texture(3, &Texture::handle(&texture)).unwrap();

        let first = ctx.reconcile(false);
        assert_eq!(first.binds, 2);
        assert!(first.frame_uploaded);

        ctx.driver_mut().clear();
        let second = ctx.reconcile(false);
        assert_eq!(second.binding_calls(), 0);
        assert!(!second.frame_uploaded);
        assert!(ctx.driver().calls().is_empty());
    }

    #[test]
    fn test_forced_reconcile_touches_every_occupied_slot_once() {
        let a = Buffer::new(id(1), 64, None);
        let b = Buffer::new(id(2), 64, None);
        let texture = Texture::new(id(3), wgpu::TextureFormat::Rgba8Unorm, None);
        let mut ctx = context();
        ctx.bind_buffer(BufferTarget::Uniform, 1, &Buffer::handle(&a)).unwrap();
        ctx.bind_texture(0, &Texture::handle(&texture)).unwrap();
        ctx.reconcile(false);

        // One slot only in current, one only in target, two in both.
        ctx.unbind_texture(0).unwrap();
        ctx.bind_buffer(BufferTarget::Array, 0, &Buffer::handle(&b)).unwrap();
        ctx.bind_image(1, ImageBinding::new(Texture::handle(&texture))).unwrap();
        ctx.driver_mut().clear();

        let report = ctx.reconcile(true);
        assert_eq!(report.binding_calls(), 4);
        assert_eq!(ctx.driver().binding_calls().count(), 4);
        assert!(ctx
            .driver()
            .calls()
            .contains(&DriverCall::UnbindTexture { unit: 0 }));
    }

    #[test]
    fn test_resized_buffer_is_rebound() {
        let buffer = Buffer::with_range(id(1), BufferRange::new(0, 64), None);
        let mut ctx = context();
        ctx.bind_buffer(BufferTarget::ShaderStorage, 0, &Buffer::handle(&buffer)).unwrap();
        ctx.reconcile(false);

        buffer.set_range(BufferRange::new(128, 64));
        ctx.driver_mut().clear();
        assert_eq!(ctx.reconcile(false).binds, 1);
        assert_eq!(
            ctx.driver().calls(),
            &[DriverCall::BindBuffer {
                target: BufferTarget::ShaderStorage,
                slot: 0,
                buffer: id(1),
                range: BufferRange::new(128, 64),
            }]
        );
    }

    #[test]
    fn test_dropped_resource_is_unbound() {
        let texture = Texture::new(id(5), wgpu::TextureFormat::Rgba8Unorm, None);
        let mut ctx = context();
        ctx.bind_texture(2, &Texture::handle(&texture)).unwrap();
        ctx.reconcile(false);

        drop(texture);
        ctx.driver_mut().clear();
        let report = ctx.reconcile(false);
        assert_eq!(report.pruned, 1);
        assert_eq!(ctx.driver().calls(), &[DriverCall::UnbindTexture { unit: 2 }]);
        assert!(ctx.current_state().is_empty());
        assert!(ctx.target_state().is_empty());
    }

    #[test]
    fn test_binding_push_pop_restores_target() {
        let a = Buffer::new(id(1), 64, None);
        let b = Buffer::new(id(2), 64, None);
        let mut ctx = context();
        ctx.request_bind(storage(0), buffer_binding(&a)).unwrap();
        ctx.reconcile(false);

        ctx.push_and_bind(storage(0), buffer_binding(&b)).unwrap();
        ctx.push_and_bind(storage(0), None).unwrap();
        assert_eq!(ctx.stack_depth(StateCategory::Buffer(BufferTarget::ShaderStorage, 0)), 2);
        ctx.pop(StateCategory::Buffer(BufferTarget::ShaderStorage, 0)).unwrap();
        ctx.pop(StateCategory::Buffer(BufferTarget::ShaderStorage, 0)).unwrap();

        // Balanced push/pop: nothing to do.
        ctx.driver_mut().clear();
        assert_eq!(ctx.reconcile(false).binding_calls(), 0);
        assert_eq!(ctx.stack_depth(StateCategory::Buffer(BufferTarget::ShaderStorage, 0)), 0);
    }

    #[test]
    fn test_pop_restores_unbound_slot() {
        let texture = Texture::new(id(1), wgpu::TextureFormat::Rgba8Unorm, None);
        let mut ctx = context();
        ctx.push(StateCategory::Texture(4)).unwrap();
        ctx.bind_texture(4, &Texture::handle(&texture)).unwrap();
        ctx.pop(StateCategory::Texture(4)).unwrap();
        assert!(ctx.target_state().texture(4).is_none());
    }

    #[test]
    fn test_underflow_is_reported_and_harmless() {
        let mut ctx = context();
        ctx.set(CullState::Front);
        assert_eq!(
            ctx.pop(StateCategory::CullFace),
            Err(StateError::StackUnderflow(StateCategory::CullFace))
        );
        assert_eq!(*ctx.active::<CullState>(), CullState::Front);

        assert_eq!(
            ctx.pop(StateCategory::Image(0)),
            Err(StateError::StackUnderflow(StateCategory::Image(0)))
        );
    }

    #[test]
    fn test_parameter_commands_only_on_change() {
        let mut ctx = context();
        assert!(ctx.set(DepthState::read_only()));
        assert!(!ctx.set(DepthState::read_only()));
        assert_eq!(
            ctx.driver().calls(),
            &[DriverCall::Pipeline(PipelineCommand::Depth(DepthState::read_only()))]
        );

        ctx.driver_mut().clear();
        ctx.push(StateCategory::Depth).unwrap();
        ctx.pop(StateCategory::Depth).unwrap();
        assert!(ctx.driver().calls().is_empty());

        ctx.push_and_set(DepthState::disabled());
        ctx.pop(StateCategory::Depth).unwrap();
        assert_eq!(
            ctx.driver().pipeline_calls().copied().collect::<Vec<_>>(),
            vec![
                PipelineCommand::Depth(DepthState::disabled()),
                PipelineCommand::Depth(DepthState::read_only()),
            ]
        );
    }

    #[test]
    fn test_reapply_parameters() {
        let mut ctx = context();
        ctx.reapply_parameters();
        assert_eq!(
            ctx.driver().pipeline_calls().count(),
            ctx.parameters.commands().len()
        );
    }

    #[test]
    fn test_unknown_raw_target_is_rejected() {
        let buffer = Buffer::new(id(1), 64, None);
        let mut ctx = context();
        assert_eq!(
            ctx.bind_buffer_raw(0x1234, 0, &Buffer::handle(&buffer)),
            Err(StateError::UnknownBufferTarget(0x1234))
        );
        assert!(ctx.target_state().is_empty());

        ctx.bind_buffer_raw(BufferTarget::Uniform.gl_enum(), 1, &Buffer::handle(&buffer))
            .unwrap();
        assert!(ctx.target_state().buffer(BufferTarget::Uniform, 1).is_some());
    }

    #[test]
    fn test_slot_out_of_range() {
        let texture = Texture::new(id(1), wgpu::TextureFormat::Rgba8Unorm, None);
        let mut ctx = context();
        let result = ctx.bind_image(8, ImageBinding::new(Texture::handle(&texture)));
        assert_eq!(
            result,
            Err(StateError::SlotOutOfRange {
                category: StateCategory::Image(8),
                slot: 8,
                limit: 8,
            })
        );
        assert!(ctx.target_state().is_empty());
    }

    #[test]
    fn test_single_slot_target_is_coerced_to_slot_zero() {
        let buffer = Buffer::new(id(1), 64, None);
        let mut ctx = context();
        ctx.bind_buffer(BufferTarget::ElementArray, 3, &Buffer::handle(&buffer))
            .unwrap();
        assert!(ctx.target_state().buffer(BufferTarget::ElementArray, 0).is_some());
        assert!(ctx.target_state().buffer(BufferTarget::ElementArray, 3).is_none());
    }

    #[test]
    fn test_driver_errors_are_attributed() {
        let buffer = Buffer::new(id(1), 64, None);
        let texture = Texture::new(id(2), wgpu::TextureFormat::R32Float, None);
        let mut ctx = context();
        ctx.driver_mut().push_error(DriverError::new(0x0501, "left over"));
        ctx.driver_mut().fail_on(
            |call| matches!(call, DriverCall::BindImage { .. }),
            DriverError::new(0x0502, "bad image"),
        );
        ctx.bind_buffer(BufferTarget::Uniform, 0, &Buffer::handle(&buffer)).unwrap();
        ctx.bind_image(0, ImageBinding::new(Texture::handle(&texture)).access(ImageAccess::READ))
            .unwrap();

        let report = ctx.reconcile(false);
        assert!(!report.is_clean());
        let batches: Vec<Batch> = report.errors.iter().map(|e| e.batch).collect();
        assert_eq!(batches, vec![Batch::Pending, Batch::Images]);
        // Both bindings still went through.
        assert_eq!(report.binds, 2);
    }

    #[test]
    fn test_shader_binds_registered_blocks() {
        let lights = Buffer::new(id(10), 1024, Some("lights"));
        let mut ctx = context();
        ctx.register_buffer("Lights", Buffer::handle(&lights)).unwrap();
        assert_eq!(
            ctx.register_buffer("Lights", Buffer::handle(&lights)),
            Err(StateError::BufferAlreadyRegistered("Lights".into()))
        );

        let program = ShaderProgram::new(
            id(7),
            vec![
                InterfaceBlock::new("Lights", BufferTarget::ShaderStorage, 3),
                InterfaceBlock::new("Unknown", BufferTarget::Uniform, 0),
            ],
        );
        assert!(ctx.set_shader(Some(program)));
        assert_eq!(
            ctx.driver().calls(),
            &[DriverCall::Pipeline(PipelineCommand::Program(Some(id(7))))]
        );
        assert!(ctx.target_state().buffer(BufferTarget::ShaderStorage, 3).is_some());
        assert!(ctx.target_state().buffer(BufferTarget::Uniform, 0).is_none());
    }

    #[test]
    fn test_named_buffers() {
        let buffer = Buffer::new(id(1), 64, None);
        let mut ctx = context();
        assert_eq!(
            ctx.bind_named_buffer("frame", BufferTarget::Uniform, 0),
            Err(StateError::UnknownBuffer("frame".into()))
        );
        ctx.register_buffer("frame", Buffer::handle(&buffer)).unwrap();
        ctx.bind_named_buffer("frame", BufferTarget::Uniform, 0).unwrap();
        assert!(ctx.registered_buffer("frame").is_some());
        assert!(ctx.unregister_buffer("frame").is_ok());
        assert!(ctx.unregister_buffer("frame").is_err());
        // Unregistering leaves the binding alone.
        assert!(ctx.target_state().buffer(BufferTarget::Uniform, 0).is_some());
    }

    #[test]
    fn test_frame_data_upload_on_change() {
        let mut ctx = RenderingContext::new(RecordingDriver::new());
        assert!(ctx.reconcile(false).frame_uploaded);
        assert!(!ctx.reconcile(false).frame_uploaded);

        ctx.set(Viewport::new(0, 0, 320, 200));
        ctx.driver_mut().clear();
        assert!(ctx.reconcile(false).frame_uploaded);
        let uploads: Vec<_> = ctx.driver().uploads(UniformBlock::FrameData).collect();
        assert_eq!(uploads, vec![(0, ctx.frame_data().as_bytes())]);

        assert!(ctx.reconcile(true).frame_uploaded);
    }

    fn light(x: f32) -> LightParameters {
        LightParameters::point(Vec3::new(x, 0.0, 0.0), Vec3::ONE)
    }

    #[test]
    fn test_light_registry_reuses_ids() {
        let mut ctx = RenderingContext::new(RecordingDriver::new());
        let first = ctx.add_light(&light(1.0)).unwrap();
        let second = ctx.add_light(&light(2.0)).unwrap();
        assert_eq!((first, second), (0, 1));
        assert_eq!(ctx.add_light(&light(1.0)).unwrap(), first);
        assert_eq!(ctx.light_set().enabled(), &[0, 1]);

        // Registered parameters reach the light block at their id.
        let uploads: Vec<_> = ctx.driver().uploads(UniformBlock::Lights).collect();
        assert_eq!(
            uploads,
            vec![(0, light(1.0).as_bytes()), (1, light(2.0).as_bytes())]
        );

        ctx.unregister_light(first);
        assert_eq!(ctx.register_light(&light(3.0)).unwrap(), first);
        ctx.set_light(7, &light(4.0));
        assert_eq!(ctx.register_light(&light(5.0)).unwrap(), 2);
    }

    #[test]
    fn test_light_ids_exhausted() {
        let mut ctx = context();
        for i in 0..LIGHT_IDS {
            ctx.register_light(&light(f32::from(i))).unwrap();
        }
        assert_eq!(
            ctx.register_light(&light(-1.0)),
            Err(StateError::LightIdsExhausted(255))
        );
    }

    #[test]
    fn test_full_light_set_ignores_enable() {
        let mut ctx = context();
        for id in 0..MAX_ENABLED_LIGHTS as u8 {
            assert!(ctx.enable_light(id));
        }
        let before = *ctx.light_set();
        assert!(!ctx.enable_light(200));
        assert_eq!(*ctx.light_set(), before);
        assert!(!ctx.light_set().contains(200));
        // Enabling an active light is not a change.
        assert!(ctx.enable_light(3));
        assert_eq!(*ctx.light_set(), before);
    }

    #[test]
    fn test_disable_light_compacts_set() {
        let mut ctx = context();
        for id in [4, 6, 9] {
            ctx.enable_light(id);
        }
        assert!(ctx.disable_light(4));
        assert_eq!(ctx.light_set().enabled(), &[9, 6]);
        assert!(!ctx.disable_light(4));
        assert!(ctx.enable_light(4));
        assert_eq!(ctx.light_set().enabled(), &[9, 6, 4]);
    }

    #[test]
    fn test_light_set_upload_on_change() {
        let mut ctx = RenderingContext::new(RecordingDriver::new());
        assert!(ctx.reconcile(false).light_set_uploaded);
        assert!(!ctx.reconcile(false).light_set_uploaded);

        let id = ctx.add_light(&light(1.0)).unwrap();
        ctx.driver_mut().clear();
        let report = ctx.reconcile(false);
        assert!(report.light_set_uploaded);
        assert!(!report.frame_uploaded);
        let uploads: Vec<_> = ctx.driver().uploads(UniformBlock::LightSet).collect();
        assert_eq!(uploads, vec![(0, ctx.light_set().as_bytes())]);
        assert_eq!(ctx.light_set().enabled(), &[u32::from(id)]);

        // Disable then re-enable before reconciling: nothing to upload.
        ctx.disable_light(id);
        ctx.enable_light(id);
        assert!(!ctx.reconcile(false).light_set_uploaded);
        assert!(ctx.reconcile(true).light_set_uploaded);
    }

    #[test]
    fn test_texture_usage_upload_on_change() {
        let texture = Texture::new(id(1), wgpu::TextureFormat::Rgba8Unorm, None);
        let mut ctx = RenderingContext::new(RecordingDriver::new());
        assert!(ctx.reconcile(false).texture_usage_uploaded);

        ctx.bind_texture(5, &Texture::handle(&texture)).unwrap();
        assert!(ctx.texture_usage().is_used(5));
        ctx.driver_mut().clear();
        assert!(ctx.reconcile(false).texture_usage_uploaded);
        let uploads: Vec<_> = ctx.driver().uploads(UniformBlock::TextureUsage).collect();
        assert_eq!(uploads, vec![(0, ctx.texture_usage().as_bytes())]);

        // Rebinding the same texture keeps the flags.
        ctx.bind_texture(5, &Texture::handle(&texture)).unwrap();
        assert!(!ctx.reconcile(false).texture_usage_uploaded);

        // A dropped texture clears its flag.
        drop(texture);
        let report = ctx.reconcile(false);
        assert!(report.texture_usage_uploaded);
        assert!(!ctx.texture_usage().is_used(5));
    }

    #[test]
    fn test_uniform_block_errors_are_attributed() {
        let mut ctx = RenderingContext::new(RecordingDriver::new());
        ctx.driver_mut().fail_on(
            |call| matches!(call, DriverCall::Upload { block: UniformBlock::LightSet, .. }),
            DriverError::new(0x0505, "out of memory"),
        );
        let report = ctx.reconcile(false);
        let batches: Vec<Batch> = report.errors.iter().map(|e| e.batch).collect();
        assert_eq!(batches, vec![Batch::LightSet]);
    }

    #[test]
    fn test_stack_depth_of_single_slot_target() {
        let buffer = Buffer::new(id(1), 64, None);
        let mut ctx = context();
        let category = StateCategory::Buffer(BufferTarget::Array, 3);
        ctx.push(category).unwrap();
        assert_eq!(ctx.stack_depth(category), 1);
        assert_eq!(ctx.stack_depth(StateCategory::Buffer(BufferTarget::Array, 0)), 1);

        ctx.bind_buffer(BufferTarget::Array, 0, &Buffer::handle(&buffer)).unwrap();
        ctx.pop(category).unwrap();
        assert_eq!(ctx.stack_depth(category), 0);
        assert!(ctx.target_state().buffer(BufferTarget::Array, 0).is_none());
    }

    #[test]
    fn test_model_matrix_and_object_data() {
        let mut ctx = context();
        let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0));
        ctx.set_camera_matrix(view);
        ctx.reset_model_matrix();
        ctx.push(StateCategory::ModelToCamera).unwrap();
        ctx.mult_model_matrix(Mat4::from_scale(Vec3::splat(2.0)));
        ctx.set(ActiveMaterial(4));

        let object = ctx.object_data();
        assert_eq!(object.material, 4);
        let expected = view * Mat4::from_scale(Vec3::splat(2.0));
        assert_eq!(object.model_to_camera, expected.to_cols_array_2d());

        ctx.pop(StateCategory::ModelToCamera).unwrap();
        assert_eq!(ctx.active::<ModelToCamera>().0, view);
        // Matrices never reach the driver as pipeline commands.
        assert_eq!(ctx.driver().calls().len(), 0);
    }
}
