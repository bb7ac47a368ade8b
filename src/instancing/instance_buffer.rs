use std::ops::{Deref, DerefMut};

use cgmath::{Matrix4, SquareMatrix, Vector3};
use thiserror::Error;
use wgpu::{VertexAttribute, VertexBufferLayout, VertexStepMode};

use crate::{
    backend::{InstanceBackend, SoftwareBackend},
    constants::TRANSFORM_STRIDE,
    instancing::layout::{LayoutError, Semantic, SemanticTable},
};

/// Everything needed to create an instance buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstanceBufferDesc {
    pub max_instances: u32,
    /// Size of one instance record, in bytes.
    pub stride: u32,
    pub semantics: SemanticTable,
}

impl InstanceBufferDesc {
    /// Check the capacity and the semantic table against the stride.
    ///
    /// Creating a buffer doesn't do this for you.
    pub fn validate(&self) -> InstanceResult<()> {
        if self.max_instances == 0 || self.stride == 0 {
            return Err(InstanceBufferError::ZeroCapacity {
                max_instances: self.max_instances,
                stride: self.stride,
            });
        }
        self.semantics.validate(self.stride)?;
        Ok(())
    }

    /// Get the per-instance vertex buffer description for these records.
    ///
    /// `attributes` should come from `self.semantics.vertex_attributes()`.
    pub fn vertex_buffer_layout<'a>(
        &self,
        attributes: &'a [VertexAttribute],
    ) -> VertexBufferLayout<'a> {
        VertexBufferLayout {
            array_stride: self.stride as wgpu::BufferAddress,
            step_mode: VertexStepMode::Instance,
            attributes,
        }
    }
}

impl Default for InstanceBufferDesc {
    fn default() -> Self {
        Self {
            max_instances: 1,
            stride: TRANSFORM_STRIDE,
            semantics: SemanticTable::transform(),
        }
    }
}

/// A flat block of `stride * max_instances` bytes of instance records, laid out by a semantic table.
///
/// Records are written through `lock`, as raw bytes at the offsets the semantic table gives.
/// The buffer never interprets them except to rebuild model matrices in `model_matrix`.
///
/// ## Note
/// The semantic table isn't checked against the stride. A semantic that doesn't fit inside
/// its record is treated as missing by `model_matrix`; overlapping semantics just read
/// whatever bytes are there.
pub struct InstanceBuffer<B: InstanceBackend = SoftwareBackend> {
    block: Option<Box<[u8]>>,
    max_instances: u32,
    stride: u32,
    semantics: SemanticTable,
    backend: B,
}

impl InstanceBuffer<SoftwareBackend> {
    /// Allocate a CPU-only instance buffer.
    pub fn new(desc: InstanceBufferDesc) -> InstanceResult<Self> {
        Self::with_backend(desc, SoftwareBackend)
    }
}

impl<B: InstanceBackend> InstanceBuffer<B> {
    /// Allocate an instance buffer that forwards locking/binding to `backend`.
    ///
    /// The records start zeroed.
    pub fn with_backend(desc: InstanceBufferDesc, backend: B) -> InstanceResult<Self> {
        let InstanceBufferDesc {
            max_instances,
            stride,
            semantics,
        } = desc;
        if max_instances == 0 || stride == 0 {
            return Err(InstanceBufferError::ZeroCapacity {
                max_instances,
                stride,
            });
        }
        let size = (stride as usize)
            .checked_mul(max_instances as usize)
            .ok_or(InstanceBufferError::SizeOverflow {
                max_instances,
                stride,
            })?;
        let block = allocate(size)?;
        log::debug!("allocated instance buffer for {max_instances} instances of {stride} bytes");

        Ok(Self {
            block: Some(block),
            max_instances,
            stride,
            semantics,
            backend,
        })
    }

    /// Free the records. Does nothing if they're already freed.
    ///
    /// Afterwards, locking fails, binding does nothing and every model matrix is the identity.
    pub fn destroy(&mut self) {
        if let Some(block) = self.block.take() {
            log::debug!("released instance buffer ({} bytes)", block.len());
        }
    }

    /// Whether the records are still allocated (ie `destroy` hasn't been called).
    pub fn is_allocated(&self) -> bool {
        self.block.is_some()
    }

    /// Begin writing records.
    ///
    /// The write session ends when the returned lock is unlocked or dropped.
    pub fn lock(&mut self) -> InstanceResult<InstanceLock<'_, B>> {
        if self.block.is_none() {
            return Err(InstanceBufferError::Released);
        }
        self.backend.lock();
        log::trace!("locked instance buffer");
        Ok(InstanceLock { buffer: self })
    }

    /// Attach the records starting at `first_instance` to `stream` for the next instanced draw.
    pub fn bind(&mut self, stream: u32, first_instance: u32) {
        if self.block.is_none() {
            log::warn!("tried to bind a destroyed instance buffer to stream {stream}");
            return;
        }
        self.backend.bind(stream, first_instance, self.stride);
    }

    /// Detach the records from `stream`.
    pub fn unbind(&mut self, stream: u32) {
        if self.block.is_none() {
            log::warn!("tried to unbind a destroyed instance buffer from stream {stream}");
            return;
        }
        self.backend.unbind(stream);
    }

    /// Rebuild the model matrix of the instance at `index` from its record.
    ///
    /// The basis columns and position are used as-is (no normalization). Returns the identity
    /// if `index` is out of range or the buffer has been destroyed. A missing basis column falls
    /// back to the matching identity column, and a missing position to the origin.
    pub fn model_matrix(&self, index: u32) -> Matrix4<f32> {
        let Some(record) = self.record(index) else {
            return Matrix4::identity();
        };
        let x = self.read_column(record, Semantic::BasisX, Vector3::unit_x());
        let y = self.read_column(record, Semantic::BasisY, Vector3::unit_y());
        let z = self.read_column(record, Semantic::BasisZ, Vector3::unit_z());
        let position = self.read_column(record, Semantic::Position, Vector3::new(0.0, 0.0, 0.0));
        Matrix4::from_cols(
            x.extend(0.0),
            y.extend(0.0),
            z.extend(0.0),
            position.extend(1.0),
        )
    }

    /// Get the bytes of the record at `index`, if it exists.
    pub fn record(&self, index: u32) -> Option<&[u8]> {
        if index >= self.max_instances {
            return None;
        }
        let start = index as usize * self.stride as usize;
        self.block.as_deref()?.get(start..start + self.stride as usize)
    }

    pub fn max_instances(&self) -> u32 {
        self.max_instances
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Size of the whole block of records, in bytes.
    pub fn size_bytes(&self) -> usize {
        self.max_instances as usize * self.stride as usize
    }

    pub fn semantics(&self) -> &SemanticTable {
        &self.semantics
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Read a 3-float column for `semantic` out of `record`, or `fallback` if it isn't there.
    fn read_column(&self, record: &[u8], semantic: Semantic, fallback: Vector3<f32>) -> Vector3<f32> {
        let Some(desc) = self.semantics.get(semantic) else {
            return fallback;
        };
        record
            .get(desc.offset as usize..)
            .and_then(|bytes| bytes.get(..size_of::<[f32; 3]>()))
            .map(|bytes| Vector3::from(bytemuck::pod_read_unaligned::<[f32; 3]>(bytes)))
            .unwrap_or(fallback)
    }

    /// Hand the written records to the backend.
    fn finish_lock(&mut self) {
        if let Some(block) = self.block.as_deref() {
            self.backend.unlock(block);
        }
        log::trace!("unlocked instance buffer");
    }
}

impl<B: InstanceBackend> Drop for InstanceBuffer<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// A write session on an instance buffer; derefs to the whole block of records.
///
/// Unlocks when dropped.
pub struct InstanceLock<'a, B: InstanceBackend> {
    buffer: &'a mut InstanceBuffer<B>,
}

impl<B: InstanceBackend> InstanceLock<'_, B> {
    /// End the write session.
    pub fn unlock(self) {
        drop(self);
    }

    /// Get the bytes of the record at `index` for writing, if it exists.
    pub fn record_mut(&mut self, index: u32) -> Option<&mut [u8]> {
        if index >= self.buffer.max_instances {
            return None;
        }
        let stride = self.buffer.stride as usize;
        let start = index as usize * stride;
        self.buffer.block.as_deref_mut()?.get_mut(start..start + stride)
    }

    /// Same as `InstanceBuffer::model_matrix`, for reading back while locked.
    pub fn model_matrix(&self, index: u32) -> Matrix4<f32> {
        self.buffer.model_matrix(index)
    }

    pub fn semantics(&self) -> &SemanticTable {
        &self.buffer.semantics
    }

    pub fn stride(&self) -> u32 {
        self.buffer.stride
    }
}

impl<B: InstanceBackend> Deref for InstanceLock<'_, B> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buffer.block.as_deref().unwrap_or_default()
    }
}

impl<B: InstanceBackend> DerefMut for InstanceLock<'_, B> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buffer.block.as_deref_mut().unwrap_or_default()
    }
}

impl<B: InstanceBackend> Drop for InstanceLock<'_, B> {
    fn drop(&mut self) {
        self.buffer.finish_lock();
    }
}

/// Allocate a zeroed block, reporting failure instead of aborting.
fn allocate(size: usize) -> InstanceResult<Box<[u8]>> {
    let mut block = Vec::new();
    block
        .try_reserve_exact(size)
        .map_err(|_| InstanceBufferError::OutOfMemory { bytes: size })?;
    block.resize(size, 0u8);
    Ok(block.into_boxed_slice())
}

/// An error from creating or using an instance buffer.
#[derive(Debug, Error)]
pub enum InstanceBufferError {
    #[error("An instance buffer needs at least 1 instance of at least 1 byte (got {max_instances} of {stride} bytes)")]
    ZeroCapacity { max_instances: u32, stride: u32 },
    #[error("{max_instances} instances of {stride} bytes is too large to address")]
    SizeOverflow { max_instances: u32, stride: u32 },
    #[error("Couldn't allocate {bytes} bytes for instance records")]
    OutOfMemory { bytes: usize },
    #[error("The instance buffer has already been destroyed")]
    Released,
    #[error("{0}")]
    Layout(#[from] LayoutError),
}

/// A result from an instance buffer.
pub type InstanceResult<T> = Result<T, InstanceBufferError>;
