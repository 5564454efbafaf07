//! Buffer resources and handles
//!
//! Buffers are owned by whoever allocated them (`Rc<Buffer>`). The state
//! tracker only ever holds [`BufferHandle`]s, which are weak: dropping the
//! last `Rc` turns every handle into "unbound".

use super::resource::ResourceId;
use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Byte range of a buffer that is exposed to a binding point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferRange {
    /// Offset in bytes from the start of the driver object.
    pub offset: u64,
    /// Size in bytes.
    pub size: u64,
}

impl BufferRange {
    /// Create a range.
    pub fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }

    /// Range covering `size` bytes from offset zero.
    pub fn whole(size: u64) -> Self {
        Self { offset: 0, size }
    }
}

/// Everything about a buffer's backing allocation that a binding depends on.
///
/// Recorded when a binding is issued to the driver and compared against the
/// live buffer later to detect out-of-band moves and resizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferExtent {
    /// Driver object backing the buffer.
    pub id: ResourceId,
    /// Bound byte range.
    pub range: BufferRange,
}

/// A buffer (or a view into a larger buffer) owned outside the state tracker.
///
/// The owner may move, resize or reallocate it at any time through a shared
/// reference.
pub struct Buffer {
    id: Cell<ResourceId>,
    range: Cell<BufferRange>,
    label: Option<String>,
}

impl Buffer {
    /// Create a buffer covering `size` bytes of driver object `id`.
    pub fn new(id: ResourceId, size: u64, label: Option<&str>) -> Rc<Self> {
        Self::with_range(id, BufferRange::whole(size), label)
    }

    /// Create a buffer view over a sub-range of driver object `id`.
    pub fn with_range(id: ResourceId, range: BufferRange, label: Option<&str>) -> Rc<Self> {
        Rc::new(Self {
            id: Cell::new(id),
            range: Cell::new(range),
            label: label.map(str::to_owned),
        })
    }

    /// Create a weak handle to this buffer.
    pub fn handle(this: &Rc<Self>) -> BufferHandle {
        BufferHandle(Rc::downgrade(this))
    }

    /// Get the driver object currently backing the buffer.
    pub fn id(&self) -> ResourceId {
        self.id.get()
    }

    /// Get the live byte range.
    pub fn range(&self) -> BufferRange {
        self.range.get()
    }

    /// Get the live offset in bytes.
    pub fn offset(&self) -> u64 {
        self.range.get().offset
    }

    /// Get the live size in bytes.
    pub fn size(&self) -> u64 {
        self.range.get().size
    }

    /// Get the debug label.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Get the live extent (object + range).
    pub fn extent(&self) -> BufferExtent {
        BufferExtent {
            id: self.id(),
            range: self.range(),
        }
    }

    /// Move the view to a different range of the same driver object.
    pub fn set_range(&self, range: BufferRange) {
        self.range.set(range);
    }

    /// Change the size, keeping the offset.
    pub fn resize(&self, size: u64) {
        let mut range = self.range.get();
        range.size = size;
        self.range.set(range);
    }

    /// Replace the backing driver object, e.g. after growing the allocation.
    pub fn reallocate(&self, id: ResourceId, range: BufferRange) {
        self.id.set(id);
        self.range.set(range);
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("id", &self.id())
            .field("range", &self.range())
            .field("label", &self.label)
            .finish()
    }
}

/// Non-owning reference to a [`Buffer`].
///
/// Two handles are equal only if both refer to the same buffer and that
/// buffer is still alive; a dead handle equals nothing, not even itself.
#[derive(Clone)]
pub struct BufferHandle(Weak<Buffer>);

impl BufferHandle {
    /// Get the buffer if it is still alive.
    pub fn upgrade(&self) -> Option<Rc<Buffer>> {
        self.0.upgrade()
    }

    /// Whether the buffer is still alive.
    pub fn is_live(&self) -> bool {
        self.0.strong_count() > 0
    }

    /// Live extent of the buffer, or `None` once it has been dropped.
    pub fn extent(&self) -> Option<BufferExtent> {
        self.upgrade().map(|buffer| buffer.extent())
    }
}

impl PartialEq for BufferHandle {
    fn eq(&self, other: &Self) -> bool {
        self.is_live() && Weak::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(buffer) => write!(f, "BufferHandle({:?})", buffer.id()),
            None => f.write_str("BufferHandle(<dropped>)"),
        }
    }
}

impl From<&Rc<Buffer>> for BufferHandle {
    fn from(buffer: &Rc<Buffer>) -> Self {
        Buffer::handle(buffer)
    }
}
