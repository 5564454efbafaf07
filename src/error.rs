//! Error types
//!
//! Every error here is recoverable: the context logs it, leaves its state
//! consistent and keeps going.

use crate::state::{BindingKey, StateCategory};
use thiserror::Error;

/// Errors reported by state requests on a [`RenderingContext`](crate::RenderingContext).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// `pop` was called on a category whose stack is empty.
    #[error("cannot pop {0:?}: stack is empty")]
    StackUnderflow(StateCategory),
    /// A raw buffer target enumerant that has no [`BufferTarget`](crate::BufferTarget).
    #[error("unknown buffer target {0:#06x}")]
    UnknownBufferTarget(u32),
    /// A packed key that does not decode to a valid binding point.
    #[error("invalid packed binding key {0:#018x}")]
    InvalidBindingKey(u64),
    /// A slot at or above the configured limit for its category.
    #[error("{category:?} slot {slot} is out of range (limit {limit})")]
    SlotOutOfRange {
        category: StateCategory,
        slot: u32,
        limit: u32,
    },
    /// The binding value does not belong to the key's category.
    #[error("binding does not match the category of key {0:?}")]
    BindingMismatch(BindingKey),
    /// `register_buffer` with a name that is already taken.
    #[error("buffer '{0}' is already registered")]
    BufferAlreadyRegistered(String),
    /// Lookup of a buffer name that was never registered.
    #[error("buffer '{0}' is not registered")]
    UnknownBuffer(String),
    /// Every light id is in use.
    #[error("cannot register more lights: all {0} ids are in use")]
    LightIdsExhausted(usize),
}

/// An error reported by the driver's out-of-band error probe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("driver error {code:#06x}: {message}")]
pub struct DriverError {
    /// Driver-specific error code.
    pub code: u32,
    /// Human readable description.
    pub message: String,
}

impl DriverError {
    /// Create a driver error.
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
