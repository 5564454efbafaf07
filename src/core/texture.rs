//! Texture resources and handles
//!
//! Same ownership model as buffers: the owner keeps an `Rc<Texture>`, the
//! state tracker keeps weak [`TextureHandle`]s.

use super::resource::ResourceId;
use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

bitflags::bitflags! {
    /// How a shader accesses a texture bound to an image unit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ImageAccess: u8 {
        /// The shader reads from the image.
        const READ = 0b01;
        /// The shader writes to the image.
        const WRITE = 0b10;
        /// The shader reads and writes.
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

impl Default for ImageAccess {
    fn default() -> Self {
        ImageAccess::READ_WRITE
    }
}

impl ImageAccess {
    /// Normalize to one of the three access modes a driver understands.
    ///
    /// No read means write-only; otherwise no write means read-only.
    pub fn normalized(self) -> Self {
        if !self.contains(Self::READ) {
            Self::WRITE
        } else if !self.contains(Self::WRITE) {
            Self::READ
        } else {
            Self::READ_WRITE
        }
    }
}

/// A texture owned outside the state tracker.
pub struct Texture {
    id: Cell<ResourceId>,
    format: Cell<wgpu::TextureFormat>,
    label: Option<String>,
}

impl Texture {
    /// Create a texture backed by driver object `id`.
    pub fn new(id: ResourceId, format: wgpu::TextureFormat, label: Option<&str>) -> Rc<Self> {
        Rc::new(Self {
            id: Cell::new(id),
            format: Cell::new(format),
            label: label.map(str::to_owned),
        })
    }

    /// Create a weak handle to this texture.
    pub fn handle(this: &Rc<Self>) -> TextureHandle {
        TextureHandle(Rc::downgrade(this))
    }

    /// Get the driver object currently backing the texture.
    pub fn id(&self) -> ResourceId {
        self.id.get()
    }

    /// Get the storage format.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format.get()
    }

    /// Get the debug label.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Replace the backing driver object, e.g. after a re-upload with a new size.
    pub fn reallocate(&self, id: ResourceId, format: wgpu::TextureFormat) {
        self.id.set(id);
        self.format.set(format);
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id())
            .field("format", &self.format())
            .field("label", &self.label)
            .finish()
    }
}

/// Non-owning reference to a [`Texture`].
///
/// Equal only when both refer to the same live texture.
#[derive(Clone)]
pub struct TextureHandle(Weak<Texture>);

impl TextureHandle {
    /// Get the texture if it is still alive.
    pub fn upgrade(&self) -> Option<Rc<Texture>> {
        self.0.upgrade()
    }

    /// Whether the texture is still alive.
    pub fn is_live(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// Live driver object, or `None` once the texture has been dropped.
    pub fn id(&self) -> Option<ResourceId> {
        self.upgrade().map(|texture| texture.id())
    }
}

impl PartialEq for TextureHandle {
    fn eq(&self, other: &Self) -> bool {
        self.is_live() && Weak::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for TextureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(texture) => write!(f, "TextureHandle({:?})", texture.id()),
            None => f.write_str("TextureHandle(<dropped>)"),
        }
    }
}

impl From<&Rc<Texture>> for TextureHandle {
    fn from(texture: &Rc<Texture>) -> Self {
        Texture::handle(texture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_normalization() {
        assert_eq!(ImageAccess::empty().normalized(), ImageAccess::WRITE);
        assert_eq!(ImageAccess::WRITE.normalized(), ImageAccess::WRITE);
        assert_eq!(ImageAccess::READ.normalized(), ImageAccess::READ);
        assert_eq!(ImageAccess::READ_WRITE.normalized(), ImageAccess::READ_WRITE);
    }

    #[test]
    fn test_reallocate_keeps_handle_identity() {
        let texture = Texture::new(
            ResourceId::new(4).unwrap(),
            wgpu::TextureFormat::Rgba8Unorm,
            Some("albedo"),
        );
        let handle = Texture::handle(&texture);
        texture.reallocate(ResourceId::new(9).unwrap(), wgpu::TextureFormat::Rgba16Float);

        assert_eq!(handle, Texture::handle(&texture));
        assert_eq!(handle.id(), ResourceId::new(9));
    }
}
