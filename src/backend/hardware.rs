use crate::{
    backend::{InstanceBackend, StreamBindings},
    constants::VERTEX_ALIGNMENT,
    gpu::{GpuContext, buffer::GpuBuffer},
    instancing::InstanceBufferDesc,
};
use thiserror::Error;

/// A backend that mirrors the records into a GPU vertex buffer.
///
/// Unlocking uploads the whole block. Binding only records which stream slots the buffer
/// is attached to; `apply` then sets those vertex buffers on a render pass before the
/// instanced draw is issued.
pub struct WgpuBackend {
    gpu: GpuContext,
    buffer: GpuBuffer,
    /// Bytes actually covered by records; the GPU buffer may be padded past this.
    records_size: u64,
    streams: StreamBindings,
}

impl WgpuBackend {
    /// Create the GPU buffer for records described by `desc`.
    ///
    /// ## Note
    /// The size here isn't checked against the device's limits, so a `desc` that's too big
    /// for the device surfaces as a wgpu validation error. Strides that aren't a multiple of
    /// `VERTEX_ALIGNMENT` can't be drawn from, and only bind at instances whose offset is aligned.
    pub fn new(gpu: GpuContext, label: &str, desc: &InstanceBufferDesc) -> Self {
        let records_size = desc.max_instances as u64 * desc.stride as u64;
        let buffer = GpuBuffer::create_writeable_vertex_uninit(label, &gpu, records_size);
        if desc.stride as u64 % VERTEX_ALIGNMENT != 0 {
            log::warn!(
                "instance stride {} of `{label}` isn't a multiple of {VERTEX_ALIGNMENT}, wgpu won't accept it as a vertex stride",
                desc.stride
            );
        }
        log::debug!("created instance vertex buffer `{label}` ({records_size} bytes)");
        Self {
            gpu,
            buffer,
            records_size,
            streams: StreamBindings::new(),
        }
    }

    /// Get the GPU buffer.
    pub fn handle(&self) -> &GpuBuffer {
        &self.buffer
    }

    /// Get the streams this buffer is currently bound to.
    pub fn streams(&self) -> &StreamBindings {
        &self.streams
    }

    /// Set the vertex buffer for every bound stream on the render pass.
    pub fn apply(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        for binding in self.streams.iter() {
            let slice = self.buffer.handle().slice(binding.byte_offset..);
            render_pass.set_vertex_buffer(binding.stream, slice);
        }
    }
}

impl InstanceBackend for WgpuBackend {
    fn unlock(&mut self, block: &[u8]) {
        // writes must be a multiple of COPY_BUFFER_ALIGNMENT, so pad odd-sized blocks with zeroes
        let padded;
        let data = if block.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT == 0 {
            block
        } else {
            let len = (block.len() as u64).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
            let mut bytes = block.to_vec();
            bytes.resize(len as usize, 0);
            padded = bytes;
            &padded[..]
        };

        if data.len() as u64 > self.buffer.handle().size() {
            log::warn!(
                "instance block ({} bytes) is larger than its GPU buffer ({} bytes), not uploading",
                data.len(),
                self.buffer.handle().size()
            );
            return;
        }
        self.gpu.queue().write_buffer(self.buffer.handle(), 0, data);
        self.gpu.queue().submit([]);
    }

    fn bind(&mut self, stream: u32, first_instance: u32, stride: u32) {
        match stream_offset(first_instance, stride, self.records_size) {
            Ok(byte_offset) => self.streams.bind(stream, byte_offset),
            Err(reason) => log::warn!("not binding stream {stream}: {reason}"),
        }
    }

    fn unbind(&mut self, stream: u32) {
        self.streams.unbind(stream);
    }
}

/// Byte offset of `first_instance` within `records_size` bytes of records, if wgpu can bind there.
fn stream_offset(
    first_instance: u32,
    stride: u32,
    records_size: u64,
) -> Result<u64, StreamOffsetError> {
    let byte_offset = first_instance as u64 * stride as u64;
    if byte_offset >= records_size {
        return Err(StreamOffsetError::PastLastRecord {
            first_instance,
            records_size,
        });
    }
    if byte_offset % VERTEX_ALIGNMENT != 0 {
        return Err(StreamOffsetError::Unaligned {
            first_instance,
            byte_offset,
        });
    }
    Ok(byte_offset)
}

/// Why a stream couldn't be bound at an instance.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StreamOffsetError {
    #[error("instance {first_instance} is past the last record ({records_size} bytes of records)")]
    PastLastRecord { first_instance: u32, records_size: u64 },
    #[error("offset {byte_offset} of instance {first_instance} isn't 4-byte aligned")]
    Unaligned { first_instance: u32, byte_offset: u64 },
}
