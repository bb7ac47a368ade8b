//! CPU-side instance buffers for hardware instancing.
//!
//! An [`InstanceBuffer`] holds a flat block of per-instance records laid out by a
//! [`SemanticTable`]. Records are written as raw bytes through [`InstanceBuffer::lock`], and
//! each instance's model matrix can be rebuilt straight from its record. Where the records
//! go to be drawn is up to an [`InstanceBackend`]: [`SoftwareBackend`] keeps them on the CPU,
//! [`WgpuBackend`] mirrors them into a wgpu vertex buffer.

pub mod backend;
pub mod constants;
pub mod gpu;
pub mod instancing;

pub use backend::{InstanceBackend, SoftwareBackend, WgpuBackend};
pub use instancing::{
    Format, InstanceBuffer, InstanceBufferDesc, InstanceBufferError, InstanceLock,
    InstanceResult, LayoutError, Semantic, SemanticDesc, SemanticTable,
};
