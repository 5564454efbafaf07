//! Binding values and the binding state snapshot
//!
//! A [`BindingState`] is a pure in-memory model: reading or writing it never
//! talks to the driver. The context keeps two of them, the state the driver
//! is believed to be in and the state callers asked for.

use super::key::{BindingCategory, BindingKey};
use crate::core::{BufferExtent, BufferHandle, BufferTarget, ImageAccess, ResourceId, TextureHandle};
use crate::error::StateError;
use rustc_hash::FxHashMap;

/// Behaviour shared by every binding value the diff engine compares.
pub(crate) trait TrackedBinding {
    /// Whether the referenced resource still exists.
    fn is_live(&self) -> bool;

    /// Whether the live resource no longer matches what was recorded at bind time.
    fn is_stale(&self) -> bool;

    /// Structural equality of the request (resource identity plus parameters).
    fn same_request(&self, other: &Self) -> bool;
}

/// Whether two optional bindings request the same thing. Dropped resources
/// count as unbound.
pub(crate) fn same_binding<B: TrackedBinding>(a: Option<&B>, b: Option<&B>) -> bool {
    match (a.filter(|b| b.is_live()), b.filter(|b| b.is_live())) {
        (None, None) => true,
        (Some(a), Some(b)) => a.same_request(b),
        _ => false,
    }
}

/// A buffer attached to a buffer binding point.
#[derive(Debug, Clone)]
pub struct BufferBinding {
    handle: BufferHandle,
    cached: Option<BufferExtent>,
}

impl BufferBinding {
    /// Bind the buffer's whole live range.
    pub fn new(handle: BufferHandle) -> Self {
        let cached = handle.extent();
        Self { handle, cached }
    }

    pub fn handle(&self) -> &BufferHandle {
        &self.handle
    }

    /// Extent recorded when the binding was last issued.
    pub fn cached_extent(&self) -> Option<BufferExtent> {
        self.cached
    }

    /// Re-read the live extent. `None` if the buffer has been dropped.
    pub(crate) fn refreshed(&self) -> Option<Self> {
        self.handle.extent().map(|extent| Self {
            handle: self.handle.clone(),
            cached: Some(extent),
        })
    }
}

impl TrackedBinding for BufferBinding {
    fn is_live(&self) -> bool {
        self.handle.is_live()
    }

    fn is_stale(&self) -> bool {
        match self.handle.extent() {
            Some(live) => self.cached != Some(live),
            None => true,
        }
    }

    fn same_request(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl PartialEq for BufferBinding {
    fn eq(&self, other: &Self) -> bool {
        self.same_request(other)
    }
}

/// A texture attached to a texture unit.
#[derive(Debug, Clone)]
pub struct TextureBinding {
    handle: TextureHandle,
    cached: Option<ResourceId>,
}

impl TextureBinding {
    pub fn new(handle: TextureHandle) -> Self {
        let cached = handle.id();
        Self { handle, cached }
    }

    pub fn handle(&self) -> &TextureHandle {
        &self.handle
    }

    /// Driver object recorded when the binding was last issued.
    pub fn cached_id(&self) -> Option<ResourceId> {
        self.cached
    }

    pub(crate) fn refreshed(&self) -> Option<Self> {
        self.handle.id().map(|id| Self {
            handle: self.handle.clone(),
            cached: Some(id),
        })
    }
}

impl TrackedBinding for TextureBinding {
    fn is_live(&self) -> bool {
        self.handle.is_live()
    }

    fn is_stale(&self) -> bool {
        match self.handle.id() {
            Some(live) => self.cached != Some(live),
            None => true,
        }
    }

    fn same_request(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl PartialEq for TextureBinding {
    fn eq(&self, other: &Self) -> bool {
        self.same_request(other)
    }
}

/// A texture level attached to an image unit for load/store access.
#[derive(Debug, Clone)]
pub struct ImageBinding {
    handle: TextureHandle,
    /// Mip level.
    pub level: u32,
    /// Array layer, ignored when `layered` is set.
    pub layer: u32,
    /// Bind every layer of the level.
    pub layered: bool,
    /// Access the shader performs.
    pub access: ImageAccess,
    cached: Option<ResourceId>,
}

impl ImageBinding {
    /// Level 0, layer 0, read/write.
    pub fn new(handle: TextureHandle) -> Self {
        let cached = handle.id();
        Self {
            handle,
            level: 0,
            layer: 0,
            layered: false,
            access: ImageAccess::READ_WRITE,
            cached,
        }
    }

    /// Set the mip level.
    pub fn level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    /// Bind a single layer.
    pub fn layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self.layered = false;
        self
    }

    /// Bind all layers of the level.
    pub fn layered(mut self) -> Self {
        self.layered = true;
        self
    }

    /// Set the access intent.
    pub fn access(mut self, access: ImageAccess) -> Self {
        self.access = access;
        self
    }

    pub fn handle(&self) -> &TextureHandle {
        &self.handle
    }

    pub fn cached_id(&self) -> Option<ResourceId> {
        self.cached
    }

    pub(crate) fn refreshed(&self) -> Option<Self> {
        self.handle.id().map(|id| Self {
            cached: Some(id),
            ..self.clone()
        })
    }
}

impl TrackedBinding for ImageBinding {
    fn is_live(&self) -> bool {
        self.handle.is_live()
    }

    fn is_stale(&self) -> bool {
        match self.handle.id() {
            Some(live) => self.cached != Some(live),
            None => true,
        }
    }

    fn same_request(&self, other: &Self) -> bool {
        self.handle == other.handle
            && self.level == other.level
            && self.layered == other.layered
            && (self.layered || self.layer == other.layer)
            && self.access.normalized() == other.access.normalized()
    }
}

impl PartialEq for ImageBinding {
    fn eq(&self, other: &Self) -> bool {
        self.same_request(other)
    }
}

/// Any binding value.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Buffer(BufferBinding),
    Texture(TextureBinding),
    Image(ImageBinding),
}

impl Binding {
    /// Whether the referenced resource still exists.
    pub fn is_live(&self) -> bool {
        match self {
            Binding::Buffer(binding) => binding.is_live(),
            Binding::Texture(binding) => binding.is_live(),
            Binding::Image(binding) => binding.is_live(),
        }
    }

    fn fits(&self, category: BindingCategory) -> bool {
        matches!(
            (self, category),
            (Binding::Buffer(_), BindingCategory::Buffer(_))
                | (Binding::Texture(_), BindingCategory::Texture)
                | (Binding::Image(_), BindingCategory::Image)
        )
    }
}

impl From<BufferBinding> for Binding {
    fn from(binding: BufferBinding) -> Self {
        Binding::Buffer(binding)
    }
}

impl From<TextureBinding> for Binding {
    fn from(binding: TextureBinding) -> Self {
        Binding::Texture(binding)
    }
}

impl From<ImageBinding> for Binding {
    fn from(binding: ImageBinding) -> Self {
        Binding::Image(binding)
    }
}

/// Every binding point that currently has a resource attached.
///
/// At most one binding per key; absent keys are unbound.
#[derive(Debug, Clone, Default)]
pub struct BindingState {
    pub(crate) buffers: FxHashMap<BindingKey, BufferBinding>,
    pub(crate) textures: FxHashMap<BindingKey, TextureBinding>,
    pub(crate) images: FxHashMap<BindingKey, ImageBinding>,
}

impl BindingState {
    /// Create an empty (all unbound) snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the binding at `key`.
    pub fn get(&self, key: BindingKey) -> Option<Binding> {
        match key.category() {
            BindingCategory::Buffer(_) => self.buffers.get(&key).cloned().map(Binding::Buffer),
            BindingCategory::Texture => self.textures.get(&key).cloned().map(Binding::Texture),
            BindingCategory::Image => self.images.get(&key).cloned().map(Binding::Image),
        }
    }

    /// Attach `binding` at `key`, replacing whatever was there.
    pub fn set(&mut self, key: BindingKey, binding: Binding) -> Result<(), StateError> {
        if !binding.fits(key.category()) {
            return Err(StateError::BindingMismatch(key));
        }
        match binding {
            Binding::Buffer(binding) => {
                self.buffers.insert(key, binding);
            }
            Binding::Texture(binding) => {
                self.textures.insert(key, binding);
            }
            Binding::Image(binding) => {
                self.images.insert(key, binding);
            }
        }
        Ok(())
    }

    /// Detach whatever is bound at `key`.
    pub fn remove(&mut self, key: BindingKey) -> Option<Binding> {
        match key.category() {
            BindingCategory::Buffer(_) => self.buffers.remove(&key).map(Binding::Buffer),
            BindingCategory::Texture => self.textures.remove(&key).map(Binding::Texture),
            BindingCategory::Image => self.images.remove(&key).map(Binding::Image),
        }
    }

    /// Get the buffer bound at `slot` of `target`.
    pub fn buffer(&self, target: BufferTarget, slot: u32) -> Option<&BufferBinding> {
        self.buffers.get(&BindingKey::buffer(target, slot))
    }

    /// Get the texture bound to `unit`.
    pub fn texture(&self, unit: u32) -> Option<&TextureBinding> {
        self.textures.get(&BindingKey::texture(unit))
    }

    /// Get the image bound to `unit`.
    pub fn image(&self, unit: u32) -> Option<&ImageBinding> {
        self.images.get(&BindingKey::image(unit))
    }

    /// Number of occupied binding points.
    pub fn len(&self) -> usize {
        self.buffers.len() + self.textures.len() + self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every occupied key, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = BindingKey> + '_ {
        self.buffers
            .keys()
            .chain(self.textures.keys())
            .chain(self.images.keys())
            .copied()
    }

    /// Drop entries whose resource has been destroyed. Returns how many went.
    pub fn prune_released(&mut self) -> usize {
        let before = self.len();
        self.buffers.retain(|_, binding| binding.is_live());
        self.textures.retain(|_, binding| binding.is_live());
        self.images.retain(|_, binding| binding.is_live());
        before - self.len()
    }

    /// Forget every binding.
    pub fn clear(&mut self) {
        self.buffers.clear();
        self.textures.clear();
        self.images.clear();
    }
}
