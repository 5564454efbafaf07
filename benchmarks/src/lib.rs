//! Shared setup for the glscope benchmarks.

use glscope::{Buffer, BufferTarget, RenderingContext, RecordingDriver, ResourceId, Texture};
use std::rc::Rc;

/// Resources a benchmark context binds. Keep it alive while benchmarking.
pub struct Scene {
    pub buffers: Vec<Rc<Buffer>>,
    pub textures: Vec<Rc<Texture>>,
}

fn id(raw: u32) -> ResourceId {
    ResourceId::new(raw).unwrap()
}

/// `n` buffers and `n` textures with distinct ids.
pub fn setup_scene(n: u32) -> Scene {
    let buffers = (0..n).map(|i| Buffer::new(id(i + 1), 256, None)).collect();
    let textures = (0..n)
        .map(|i| Texture::new(id(n + i + 1), glscope::wgpu::TextureFormat::Rgba8Unorm, None))
        .collect();
    Scene { buffers, textures }
}

/// Context with the first `slots` storage buffers and texture units requested.
pub fn setup_context(scene: &Scene, slots: u32) -> RenderingContext<RecordingDriver> {
    let mut ctx = RenderingContext::new(RecordingDriver::new());
    request_all(&mut ctx, scene, slots, 0);
    ctx
}

/// Request `slots` storage buffers and texture units, rotated by `shift`.
pub fn request_all(
    ctx: &mut RenderingContext<RecordingDriver>,
    scene: &Scene,
    slots: u32,
    shift: usize,
) {
    let n = scene.buffers.len();
    for slot in 0..slots {
        let i = (slot as usize + shift) % n;
        ctx.bind_buffer(BufferTarget::ShaderStorage, slot, &Buffer::handle(&scene.buffers[i]))
            .unwrap();
        ctx.bind_texture(slot, &Texture::handle(&scene.textures[i])).unwrap();
    }
}
