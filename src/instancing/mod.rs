pub mod instance_buffer;
pub mod layout;

pub use instance_buffer::{
    InstanceBuffer, InstanceBufferDesc, InstanceBufferError, InstanceLock, InstanceResult,
};
pub use layout::{Format, LayoutError, Semantic, SemanticDesc, SemanticTable};
