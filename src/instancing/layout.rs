use thiserror::Error;
use wgpu::{VertexAttribute, VertexFormat};

use crate::constants::FIRST_INSTANCE_SHADER_LOCATION;

/// A named role for some bytes within an instance record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Semantic {
    Position,
    BasisX,
    BasisY,
    BasisZ,
    Color,
    UvOffset,
    LocalOffset,
    VelocityLife,
    Density,
}

impl Semantic {
    /// Number of semantics (ie the size of a `SemanticTable`).
    pub const COUNT: usize = 9;

    /// All semantics, in table order.
    pub const ALL: [Semantic; Self::COUNT] = [
        Semantic::Position,
        Semantic::BasisX,
        Semantic::BasisY,
        Semantic::BasisZ,
        Semantic::Color,
        Semantic::UvOffset,
        Semantic::LocalOffset,
        Semantic::VelocityLife,
        Semantic::Density,
    ];

    /// Index of this semantic within a `SemanticTable`.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The shader location this semantic is bound to when exported as a vertex attribute.
    pub const fn shader_location(self) -> u32 {
        FIRST_INSTANCE_SHADER_LOCATION + self as u32
    }
}

/// The element type of a semantic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Float1,
    Float2,
    Float3,
    Float4,
    UByte4,
    Short4,
    ColorBgra,
    ColorRgba,
}

impl Format {
    /// Size of one element of this format, in bytes.
    pub const fn size(self) -> u32 {
        match self {
            Format::Float1 => 4,
            Format::Float2 => 8,
            Format::Float3 => 12,
            Format::Float4 => 16,
            Format::UByte4 | Format::ColorBgra | Format::ColorRgba => 4,
            Format::Short4 => 8,
        }
    }

    /// The matching vertex format.
    ///
    /// ## Note
    /// BGRA colors are exposed as plain `Unorm8x4`, so shaders have to swizzle them.
    pub const fn vertex_format(self) -> VertexFormat {
        match self {
            Format::Float1 => VertexFormat::Float32,
            Format::Float2 => VertexFormat::Float32x2,
            Format::Float3 => VertexFormat::Float32x3,
            Format::Float4 => VertexFormat::Float32x4,
            Format::UByte4 => VertexFormat::Uint8x4,
            Format::Short4 => VertexFormat::Sint16x4,
            Format::ColorBgra | Format::ColorRgba => VertexFormat::Unorm8x4,
        }
    }
}

/// Where a semantic lives within an instance record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SemanticDesc {
    pub offset: u32,
    pub format: Format,
}

impl SemanticDesc {
    pub const fn new(offset: u32, format: Format) -> Self {
        Self { offset, format }
    }

    /// One past the last byte used by this semantic.
    pub const fn end(&self) -> u64 {
        self.offset as u64 + self.format.size() as u64
    }
}

/// Maps each semantic to its offset/format within a record, or `None` if the record doesn't have it.
///
/// The table stores whatever it is given. Offsets that overlap or run past the stride
/// aren't rejected here; use `validate` if you want to check them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SemanticTable {
    descs: [Option<SemanticDesc>; Semantic::COUNT],
}

impl SemanticTable {
    /// An empty table.
    pub const fn new() -> Self {
        Self {
            descs: [None; Semantic::COUNT],
        }
    }

    /// The packed transform layout: basis columns at 0, 12, 24 and position at 36 (48 bytes).
    pub const fn transform() -> Self {
        Self::new()
            .with(Semantic::BasisX, SemanticDesc::new(0, Format::Float3))
            .with(Semantic::BasisY, SemanticDesc::new(12, Format::Float3))
            .with(Semantic::BasisZ, SemanticDesc::new(24, Format::Float3))
            .with(Semantic::Position, SemanticDesc::new(36, Format::Float3))
    }

    /// Builder-style `set`.
    pub const fn with(mut self, semantic: Semantic, desc: SemanticDesc) -> Self {
        self.descs[semantic.index()] = Some(desc);
        self
    }

    /// Set the descriptor for a semantic, replacing any previous one.
    pub fn set(&mut self, semantic: Semantic, desc: SemanticDesc) {
        self.descs[semantic.index()] = Some(desc);
    }

    /// Get the descriptor for a semantic, if it's present.
    pub fn get(&self, semantic: Semantic) -> Option<SemanticDesc> {
        self.descs[semantic.index()]
    }

    pub fn contains(&self, semantic: Semantic) -> bool {
        self.get(semantic).is_some()
    }

    /// Iterate over the present semantics, in table order.
    pub fn iter(&self) -> impl Iterator<Item = (Semantic, SemanticDesc)> + '_ {
        Semantic::ALL
            .into_iter()
            .filter_map(|semantic| self.get(semantic).map(|desc| (semantic, desc)))
    }

    /// Check that every present semantic fits within `stride` and that no two overlap.
    pub fn validate(&self, stride: u32) -> Result<(), LayoutError> {
        for (semantic, desc) in self.iter() {
            if desc.end() > stride as u64 {
                return Err(LayoutError::OutOfBounds {
                    semantic,
                    offset: desc.offset,
                    size: desc.format.size(),
                    stride,
                });
            }
        }

        let present: Vec<_> = self.iter().collect();
        for (i, (a, a_desc)) in present.iter().enumerate() {
            for (b, b_desc) in &present[i + 1..] {
                let disjoint = a_desc.end() <= b_desc.offset as u64
                    || b_desc.end() <= a_desc.offset as u64;
                if !disjoint {
                    return Err(LayoutError::Overlap { a: *a, b: *b });
                }
            }
        }

        Ok(())
    }

    /// Get the vertex attributes for the present semantics.
    pub fn vertex_attributes(&self) -> Vec<VertexAttribute> {
        self.iter()
            .map(|(semantic, desc)| VertexAttribute {
                offset: desc.offset as wgpu::BufferAddress,
                shader_location: semantic.shader_location(),
                format: desc.format.vertex_format(),
            })
            .collect()
    }
}

/// A problem with a semantic table, found by `SemanticTable::validate`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("{semantic:?} at offset {offset} ({size} bytes) doesn't fit in a {stride} byte record")]
    OutOfBounds {
        semantic: Semantic,
        offset: u32,
        size: u32,
        stride: u32,
    },
    #[error("{a:?} and {b:?} overlap")]
    Overlap { a: Semantic, b: Semantic },
}
