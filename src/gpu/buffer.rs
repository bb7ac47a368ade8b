use crate::gpu::GpuContext;
use wgpu::BufferDescriptor;

#[derive(Clone, Debug)]
pub struct GpuBuffer {
    buffer: wgpu::Buffer,
}

impl GpuBuffer {
    /// Creates a writeable vertex buffer that is uninitialized but has fixed capacity of `size`.
    ///
    /// The size is rounded up to `wgpu::COPY_BUFFER_ALIGNMENT` so that whole-buffer writes are valid.
    pub fn create_writeable_vertex_uninit(label: &str, gpu: &GpuContext, size: u64) -> Self {
        let buffer = gpu.device().create_buffer(&BufferDescriptor {
            label: Some(label),
            size: size.next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Self { buffer }
    }

    /// Get the actual buffer.
    pub fn handle(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}
