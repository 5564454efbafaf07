//! Shader program descriptions
//!
//! The context never compiles or reflects shaders. Callers hand it a linked
//! program id together with the interface blocks they already know about.

use super::resource::ResourceId;
use super::target::BufferTarget;
use std::rc::Rc;

/// A buffer-backed interface block declared by a program.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceBlock {
    /// Block name, matched against the context's registered buffers.
    pub name: String,
    /// Target the block reads from.
    pub target: BufferTarget,
    /// Binding point of the block.
    pub slot: u32,
}

impl InterfaceBlock {
    /// Create an interface block description.
    pub fn new(name: impl Into<String>, target: BufferTarget, slot: u32) -> Self {
        Self {
            name: name.into(),
            target,
            slot,
        }
    }
}

/// A linked program plus its interface blocks. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderProgram {
    id: ResourceId,
    blocks: Rc<[InterfaceBlock]>,
}

impl ShaderProgram {
    /// Create a program description.
    pub fn new(id: ResourceId, blocks: impl Into<Vec<InterfaceBlock>>) -> Self {
        let blocks: Vec<InterfaceBlock> = blocks.into();
        Self {
            id,
            blocks: blocks.into(),
        }
    }

    /// Program without interface blocks.
    pub fn bare(id: ResourceId) -> Self {
        Self::new(id, Vec::new())
    }

    /// Get the driver program object.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Get the interface blocks.
    pub fn blocks(&self) -> &[InterfaceBlock] {
        &self.blocks
    }
}
