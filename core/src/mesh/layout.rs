//! Vertex layout derivation for interleaved vertex records.
//!
//! A [`VertexLayout`] describes how one vertex record type is laid out in a
//! single interleaved buffer: which semantic attributes are present, where each
//! one lives inside the record, and how many bytes one vertex occupies.
//!
//! Layouts are derived from the per-field tags a vertex type declares through
//! the [`Vertex`] trait. The usual way to declare them is `#[derive(Vertex)]`:
//!
//! ```ignore
//! use beaumesh_core::mesh::Vertex;
//!
//! #[repr(C)]
//! #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Vertex)]
//! struct UiVertex {
//!     #[vertex(position)]
//!     position: [f32; 3],
//!     #[vertex(color, format = "unorm8")]
//!     color: [u8; 4],
//!     #[vertex(texcoord0)]
//!     uv: [f32; 2],
//! }
//!
//! let layout = VertexLayout::generate::<UiVertex>()?;
//! assert_eq!(layout.stride(), 24);
//! ```
//!
//! The derivation is a pure function of the type, so callers normally go
//! through a [`LayoutRegistry`](super::LayoutRegistry) which memoizes it.

use std::hash::{Hash, Hasher};

use bitflags::bitflags;

/// Semantic meaning of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VertexAttributeSemantic {
    /// Vertex position.
    Position,
    /// Vertex normal.
    Normal,
    /// Vertex tangent (w = handedness when four components are present).
    Tangent,
    /// Vertex color.
    Color,
    /// Texture coordinate set 0.
    TexCoord0,
    /// Texture coordinate set 1.
    TexCoord1,
    /// Texture coordinate set 2.
    TexCoord2,
    /// Texture coordinate set 3.
    TexCoord3,
    /// Texture coordinate set 4.
    TexCoord4,
    /// Texture coordinate set 5.
    TexCoord5,
    /// Texture coordinate set 6.
    TexCoord6,
    /// Texture coordinate set 7.
    TexCoord7,
    /// Skinning weights.
    BlendWeight,
    /// Skinning bone indices.
    BlendIndices,
}

impl VertexAttributeSemantic {
    /// Number of distinct semantics.
    pub const COUNT: usize = 14;

    /// All semantics, in ordinal order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Position,
        Self::Normal,
        Self::Tangent,
        Self::Color,
        Self::TexCoord0,
        Self::TexCoord1,
        Self::TexCoord2,
        Self::TexCoord3,
        Self::TexCoord4,
        Self::TexCoord5,
        Self::TexCoord6,
        Self::TexCoord7,
        Self::BlendWeight,
        Self::BlendIndices,
    ];

    /// Stable ordinal of this semantic.
    pub fn index(&self) -> usize {
        match self {
            Self::Position => 0,
            Self::Normal => 1,
            Self::Tangent => 2,
            Self::Color => 3,
            Self::TexCoord0 => 4,
            Self::TexCoord1 => 5,
            Self::TexCoord2 => 6,
            Self::TexCoord3 => 7,
            Self::TexCoord4 => 8,
            Self::TexCoord5 => 9,
            Self::TexCoord6 => 10,
            Self::TexCoord7 => 11,
            Self::BlendWeight => 12,
            Self::BlendIndices => 13,
        }
    }

    /// The mask bit for this semantic.
    pub fn mask(&self) -> VertexAttributeMask {
        VertexAttributeMask::from_bits_truncate(1 << self.index())
    }

    /// Texture coordinate semantic for the given channel (0..=7).
    pub fn texcoord(channel: usize) -> Option<Self> {
        Self::ALL.get(Self::TexCoord0.index() + channel).copied().filter(|_| channel < 8)
    }
}

bitflags! {
    /// Set of semantics present in a [`VertexLayout`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VertexAttributeMask: u32 {
        const POSITION = 1 << 0;
        const NORMAL = 1 << 1;
        const TANGENT = 1 << 2;
        const COLOR = 1 << 3;
        const TEXCOORD0 = 1 << 4;
        const TEXCOORD1 = 1 << 5;
        const TEXCOORD2 = 1 << 6;
        const TEXCOORD3 = 1 << 7;
        const TEXCOORD4 = 1 << 8;
        const TEXCOORD5 = 1 << 9;
        const TEXCOORD6 = 1 << 10;
        const TEXCOORD7 = 1 << 11;
        const BLEND_WEIGHT = 1 << 12;
        const BLEND_INDICES = 1 << 13;
    }
}

/// Numeric format of a single component of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttributeFormat {
    /// 32-bit float.
    Float32,
    /// 16-bit float.
    Float16,
    /// 8-bit unsigned, normalized to 0.0..=1.0.
    UNorm8,
    /// 8-bit signed, normalized to -1.0..=1.0.
    SNorm8,
    /// 16-bit unsigned, normalized to 0.0..=1.0.
    UNorm16,
    /// 16-bit signed, normalized to -1.0..=1.0.
    SNorm16,
    /// 8-bit unsigned integer.
    UInt8,
    /// 8-bit signed integer.
    SInt8,
    /// 16-bit unsigned integer.
    UInt16,
    /// 16-bit signed integer.
    SInt16,
    /// 32-bit unsigned integer.
    UInt32,
    /// 32-bit signed integer.
    SInt32,
}

impl VertexAttributeFormat {
    /// Size in bytes of one component.
    pub fn size(&self) -> usize {
        match self {
            Self::Float32 | Self::UInt32 | Self::SInt32 => 4,
            Self::Float16 | Self::UNorm16 | Self::SNorm16 | Self::UInt16 | Self::SInt16 => 2,
            Self::UNorm8 | Self::SNorm8 | Self::UInt8 | Self::SInt8 => 1,
        }
    }

    /// Parse the lowercase name used in `#[vertex(format = "...")]`.
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "float32" => Self::Float32,
            "float16" => Self::Float16,
            "unorm8" => Self::UNorm8,
            "snorm8" => Self::SNorm8,
            "unorm16" => Self::UNorm16,
            "snorm16" => Self::SNorm16,
            "uint8" => Self::UInt8,
            "sint8" => Self::SInt8,
            "uint16" => Self::UInt16,
            "sint16" => Self::SInt16,
            "uint32" => Self::UInt32,
            "sint32" => Self::SInt32,
            _ => return None,
        })
    }
}

/// One declared field of a vertex record type.
///
/// Produced by `#[derive(Vertex)]`, or written by hand for types that
/// implement [`Vertex`] manually.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexField {
    /// Field name, used in error messages.
    pub name: &'static str,
    /// Rust type of the field, used in error messages.
    pub type_name: &'static str,
    /// Byte offset of the field inside the record.
    pub offset: usize,
    /// Byte size of the field.
    pub size: usize,
    /// Semantic tag, `None` when the field is untagged.
    pub semantic: Option<VertexAttributeSemantic>,
    /// Explicit component format.
    pub format: Option<VertexAttributeFormat>,
    /// Explicit component count.
    pub dimension: Option<u8>,
    /// Format and component count inferred from the field's Rust type.
    pub inferred: Option<(VertexAttributeFormat, u8)>,
}

impl VertexField {
    /// Create an untagged field description.
    pub const fn new(name: &'static str, type_name: &'static str, offset: usize, size: usize) -> Self {
        Self {
            name,
            type_name,
            offset,
            size,
            semantic: None,
            format: None,
            dimension: None,
            inferred: None,
        }
    }

    /// Tag the field with a semantic.
    pub const fn with_semantic(mut self, semantic: VertexAttributeSemantic) -> Self {
        self.semantic = Some(semantic);
        self
    }

    /// Set an explicit component format.
    pub const fn with_format(mut self, format: VertexAttributeFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Set an explicit component count.
    pub const fn with_dimension(mut self, dimension: u8) -> Self {
        self.dimension = Some(dimension);
        self
    }

    /// Record the format inferred from the field's Rust type.
    pub const fn with_inferred(mut self, format: VertexAttributeFormat, dimension: u8) -> Self {
        self.inferred = Some((format, dimension));
        self
    }
}

/// A vertex record type with a fixed, packed, interleaved layout.
///
/// Implement through `#[derive(Vertex)]` where possible. A manual
/// implementation must list every field of the record in declaration order.
pub trait Vertex: bytemuck::Pod + 'static {
    /// The declared fields of this record type.
    fn vertex_fields() -> &'static [VertexField];
}

/// Reasons a vertex record type cannot produce a [`VertexLayout`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// A field carries no semantic tag.
    #[error("field `{field}` of `{type_name}` has no vertex attribute tag")]
    MissingAttribute {
        type_name: &'static str,
        field: &'static str,
    },
    /// Two fields carry the same semantic tag.
    #[error("field `{field}` of `{type_name}` repeats the {semantic:?} attribute")]
    DuplicateAttribute {
        type_name: &'static str,
        field: &'static str,
        semantic: VertexAttributeSemantic,
    },
    /// No explicit format and none could be inferred from the field's type.
    #[error("cannot infer a vertex format for field `{field}` of type `{field_type}`")]
    UninferrableFormat {
        field: &'static str,
        field_type: &'static str,
    },
    /// The declared format and dimension do not cover the field's bytes.
    #[error(
        "field `{field}` is {size} bytes, which does not match {format:?} x {dimension}"
    )]
    FormatMismatch {
        field: &'static str,
        size: usize,
        format: VertexAttributeFormat,
        dimension: usize,
    },
    /// The record has padding or fields out of declaration order.
    #[error("`{type_name}` is not packed: expected {expected} bytes, found {actual} at `{field}`")]
    Unpacked {
        type_name: &'static str,
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The record declares no fields at all.
    #[error("`{type_name}` declares no vertex fields")]
    Empty { type_name: &'static str },
}

/// A single attribute inside a [`VertexLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    /// Semantic meaning of this attribute.
    pub semantic: VertexAttributeSemantic,
    /// Component format.
    pub format: VertexAttributeFormat,
    /// Number of components (1..=4).
    pub dimension: u8,
    /// Byte offset within the vertex record.
    pub offset: u32,
}

impl VertexAttribute {
    /// Size of the attribute in bytes.
    pub fn size(&self) -> usize {
        self.format.size() * self.dimension as usize
    }
}

/// Binary layout of one interleaved vertex record type.
///
/// Immutable once derived. Two layouts with equal [`layout_hash`](Self::layout_hash)
/// describe the same byte layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    stride: u32,
    mask: VertexAttributeMask,
    offsets: [u32; VertexAttributeSemantic::COUNT],
    attributes: Vec<VertexAttribute>,
    hash: u64,
    label: Option<&'static str>,
}

impl VertexLayout {
    /// Derive the layout of a vertex record type.
    ///
    /// This walks the type's declared fields; prefer
    /// [`LayoutRegistry::layout_of`](super::LayoutRegistry::layout_of), which caches the result.
    pub fn generate<V: Vertex>() -> Result<Self, LayoutError> {
        Self::from_fields(
            std::any::type_name::<V>(),
            std::mem::size_of::<V>(),
            V::vertex_fields(),
        )
    }

    /// Derive a layout from an explicit field list.
    ///
    /// `type_size` is the size of the whole record; the fields must tile it
    /// exactly, in order.
    pub fn from_fields(
        type_name: &'static str,
        type_size: usize,
        fields: &[VertexField],
    ) -> Result<Self, LayoutError> {
        if fields.is_empty() {
            return Err(LayoutError::Empty { type_name });
        }

        let mut mask = VertexAttributeMask::empty();
        let mut offsets = [0u32; VertexAttributeSemantic::COUNT];
        let mut attributes = Vec::with_capacity(fields.len());
        let mut cursor = 0usize;

        for field in fields {
            let semantic = field.semantic.ok_or(LayoutError::MissingAttribute {
                type_name,
                field: field.name,
            })?;
            if mask.contains(semantic.mask()) {
                return Err(LayoutError::DuplicateAttribute {
                    type_name,
                    field: field.name,
                    semantic,
                });
            }

            if field.offset != cursor {
                return Err(LayoutError::Unpacked {
                    type_name,
                    field: field.name,
                    expected: cursor,
                    actual: field.offset,
                });
            }

            let (format, dimension) = resolve_format(field)?;

            mask |= semantic.mask();
            offsets[semantic.index()] = cursor as u32;
            attributes.push(VertexAttribute {
                semantic,
                format,
                dimension,
                offset: cursor as u32,
            });
            cursor += field.size;
        }

        if cursor != type_size {
            let last = fields.last().map_or("", |f| f.name);
            return Err(LayoutError::Unpacked {
                type_name,
                field: last,
                expected: type_size,
                actual: cursor,
            });
        }

        let stride = cursor as u32;
        let hash = layout_hash(stride, &attributes);
        log::debug!(
            "Derived vertex layout for {type_name}: stride {stride}, {} attributes, hash {hash:#018x}",
            attributes.len()
        );

        Ok(Self {
            stride,
            mask,
            offsets,
            attributes,
            hash,
            label: Some(type_name),
        })
    }

    /// Bytes per vertex.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// Semantics present in this layout.
    pub fn mask(&self) -> VertexAttributeMask {
        self.mask
    }

    /// Check if this layout has a specific semantic.
    pub fn has(&self, semantic: VertexAttributeSemantic) -> bool {
        self.mask.contains(semantic.mask())
    }

    /// Byte offset of a semantic, if present.
    pub fn offset(&self, semantic: VertexAttributeSemantic) -> Option<u32> {
        self.has(semantic).then(|| self.offsets[semantic.index()])
    }

    /// Get an attribute by semantic.
    pub fn attribute(&self, semantic: VertexAttributeSemantic) -> Option<&VertexAttribute> {
        self.attributes.iter().find(|attr| attr.semantic == semantic)
    }

    /// Attributes in declaration order.
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Change-detection hash of this layout. Not cryptographic.
    pub fn layout_hash(&self) -> u64 {
        self.hash
    }

    /// Name of the vertex type this layout was derived from.
    pub fn label(&self) -> Option<&'static str> {
        self.label
    }
}

fn resolve_format(field: &VertexField) -> Result<(VertexAttributeFormat, u8), LayoutError> {
    let (format, dimension) = match (field.format, field.dimension, field.inferred) {
        (Some(format), Some(dimension), _) => (format, dimension as usize),
        // An explicit format re-interprets the field's bytes.
        (Some(format), None, _) => (format, field.size / format.size()),
        (None, Some(dimension), Some((format, _))) => (format, dimension as usize),
        (None, None, Some((format, dimension))) => (format, dimension as usize),
        (None, _, None) => {
            return Err(LayoutError::UninferrableFormat {
                field: field.name,
                field_type: field.type_name,
            });
        }
    };

    if !(1..=4).contains(&dimension) || format.size() * dimension != field.size {
        return Err(LayoutError::FormatMismatch {
            field: field.name,
            size: field.size,
            format,
            dimension,
        });
    }

    Ok((format, dimension as u8))
}

fn layout_hash(stride: u32, attributes: &[VertexAttribute]) -> u64 {
    let mut hasher = xxhash_rust::xxh3::Xxh3::new();
    stride.hash(&mut hasher);
    attributes.hash(&mut hasher);
    hasher.finish()
}
