//! Per-category LIFO state stacks

/// An active value plus the values saved by `push`.
///
/// Every mutating operation reports whether the active value changed, which
/// is what callers use to decide whether the driver has to hear about it.
#[derive(Debug, Clone, Default)]
pub struct StateStack<T> {
    active: T,
    stack: Vec<T>,
}

impl<T: Clone + PartialEq> StateStack<T> {
    /// Stack with `initial` active and nothing saved.
    pub fn new(initial: T) -> Self {
        Self {
            active: initial,
            stack: Vec::new(),
        }
    }

    /// The active value.
    pub fn active(&self) -> &T {
        &self.active
    }

    /// Number of saved values.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Save a copy of the active value. The active value is unchanged.
    pub fn push(&mut self) {
        self.stack.push(self.active.clone());
    }

    /// Replace the active value.
    pub fn set(&mut self, value: T) -> bool {
        if self.active == value {
            return false;
        }
        self.active = value;
        true
    }

    /// `push` followed by `set`.
    pub fn push_and_set(&mut self, value: T) -> bool {
        self.push();
        self.set(value)
    }

    /// Restore the most recently saved value.
    ///
    /// Returns `None` when nothing is saved; the active value is then left
    /// as it is.
    pub fn pop(&mut self) -> Option<bool> {
        let saved = self.stack.pop()?;
        Some(self.set(saved))
    }

    /// Drop every saved value and make `value` active.
    pub fn reset(&mut self, value: T) -> bool {
        self.stack.clear();
        self.set(value)
    }
}
