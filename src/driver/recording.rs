//! A driver that records calls instead of executing them
//!
//! Used by tests and benchmarks to observe exactly what the state tracker
//! sends to the driver, and to inject errors into the probe.

use super::{GraphicsDriver, ImageUnitBinding, PipelineCommand, UniformBlock};
use crate::core::{BufferRange, BufferTarget, ResourceId};
use crate::error::DriverError;
use std::collections::VecDeque;
use std::fmt;

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    BindBuffer {
        target: BufferTarget,
        slot: u32,
        buffer: ResourceId,
        range: BufferRange,
    },
    UnbindBuffer {
        target: BufferTarget,
        slot: u32,
    },
    BindTexture {
        unit: u32,
        texture: ResourceId,
    },
    UnbindTexture {
        unit: u32,
    },
    BindImage {
        unit: u32,
        image: ImageUnitBinding,
    },
    UnbindImage {
        unit: u32,
    },
    Pipeline(PipelineCommand),
    Upload {
        block: UniformBlock,
        index: u32,
        data: Vec<u8>,
    },
}

impl DriverCall {
    /// Whether this call binds or unbinds a resource.
    pub fn is_binding(&self) -> bool {
        !matches!(self, DriverCall::Pipeline(_) | DriverCall::Upload { .. })
    }
}

type ErrorTrigger = Box<dyn Fn(&DriverCall) -> bool>;

/// Records every call; never touches a real graphics API.
#[derive(Default)]
pub struct RecordingDriver {
    calls: Vec<DriverCall>,
    pending: VecDeque<DriverError>,
    triggers: Vec<(ErrorTrigger, DriverError)>,
    probes: usize,
}

impl RecordingDriver {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call recorded so far, oldest first.
    pub fn calls(&self) -> &[DriverCall] {
        &self.calls
    }

    /// Take the recorded calls, leaving the recorder empty.
    pub fn take_calls(&mut self) -> Vec<DriverCall> {
        std::mem::take(&mut self.calls)
    }

    /// Bind and unbind calls only.
    pub fn binding_calls(&self) -> impl Iterator<Item = &DriverCall> {
        self.calls.iter().filter(|call| call.is_binding())
    }

    /// Fixed-function parameter changes only.
    pub fn pipeline_calls(&self) -> impl Iterator<Item = &PipelineCommand> {
        self.calls.iter().filter_map(|call| match call {
            DriverCall::Pipeline(command) => Some(command),
            _ => None,
        })
    }

    /// Data of every upload to `block`, oldest first.
    pub fn uploads(&self, block: UniformBlock) -> impl Iterator<Item = (u32, &[u8])> {
        self.calls.iter().filter_map(move |call| match call {
            DriverCall::Upload {
                block: uploaded,
                index,
                data,
            } if *uploaded == block => Some((*index, data.as_slice())),
            _ => None,
        })
    }

    /// Forget recorded calls.
    pub fn clear(&mut self) {
        self.calls.clear();
    }

    /// Number of times the error probe was polled.
    pub fn probes(&self) -> usize {
        self.probes
    }

    /// Make the next probe report `error`.
    pub fn push_error(&mut self, error: DriverError) {
        self.pending.push_back(error);
    }

    /// Report `error` at the next probe after a call matching `trigger`.
    pub fn fail_on(
        &mut self,
        trigger: impl Fn(&DriverCall) -> bool + 'static,
        error: DriverError,
    ) {
        self.triggers.push((Box::new(trigger), error));
    }

    fn record(&mut self, call: DriverCall) {
        for (trigger, error) in &self.triggers {
            if trigger(&call) {
                self.pending.push_back(error.clone());
            }
        }
        self.calls.push(call);
    }
}

impl fmt::Debug for RecordingDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingDriver")
            .field("calls", &self.calls.len())
            .field("pending", &self.pending)
            .field("triggers", &self.triggers.len())
            .field("probes", &self.probes)
            .finish()
    }
}

impl GraphicsDriver for RecordingDriver {
    fn bind_buffer(
        &mut self,
        target: BufferTarget,
        slot: u32,
        buffer: ResourceId,
        range: BufferRange,
    ) {
        self.record(DriverCall::BindBuffer {
            target,
            slot,
            buffer,
            range,
        });
    }

    fn unbind_buffer(&mut self, target: BufferTarget, slot: u32) {
        self.record(DriverCall::UnbindBuffer { target, slot });
    }

    fn bind_texture(&mut self, unit: u32, texture: ResourceId) {
        self.record(DriverCall::BindTexture { unit, texture });
    }

    fn unbind_texture(&mut self, unit: u32) {
        self.record(DriverCall::UnbindTexture { unit });
    }

    fn bind_image(&mut self, unit: u32, image: &ImageUnitBinding) {
        self.record(DriverCall::BindImage {
            unit,
            image: *image,
        });
    }

    fn unbind_image(&mut self, unit: u32) {
        self.record(DriverCall::UnbindImage { unit });
    }

    fn apply_pipeline(&mut self, command: &PipelineCommand) {
        self.record(DriverCall::Pipeline(*command));
    }

    fn upload_block(&mut self, block: UniformBlock, index: u32, data: &[u8]) {
        self.record(DriverCall::Upload {
            block,
            index,
            data: data.to_vec(),
        });
    }

    fn poll_error(&mut self) -> Option<DriverError> {
        self.probes += 1;
        self.pending.pop_front()
    }
}
