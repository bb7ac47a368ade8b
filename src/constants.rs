/// The vertex buffer slot instance data is bound to by default.
pub const INSTANCE_BUFFER_SLOT: u32 = 1;

/// Shader location of the first per-instance attribute.
/// Locations below this are reserved for per-vertex data.
pub const FIRST_INSTANCE_SHADER_LOCATION: u32 = 5;

/// Stride of the packed transform layout (3 basis columns + position, all `Float3`).
pub const TRANSFORM_STRIDE: u32 = 48;

/// Vertex buffer offsets and strides must be a multiple of this for wgpu.
pub const VERTEX_ALIGNMENT: u64 = 4;
