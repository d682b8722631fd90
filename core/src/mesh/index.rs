//! Index widths and the format ceilings that come with them.

use super::data::IndexFormat;

/// Maximum size in bytes of a single vertex or index stream.
pub const MAX_STREAM_BYTES: usize = i32::MAX as usize;

/// Maximum vertex count addressable by 16-bit indices.
pub const MAX_VERTICES_16: usize = u16::MAX as usize;

mod sealed {
    pub trait Sealed {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
}

/// An unsigned integer type usable as a mesh index.
///
/// Implemented for `u16` and `u32` only.
pub trait MeshIndex:
    bytemuck::Pod + Copy + Eq + Ord + std::fmt::Debug + Send + Sync + sealed::Sealed + 'static
{
    /// The matching index buffer format.
    const FORMAT: IndexFormat;

    /// Largest representable index value.
    const MAX_VALUE: usize;

    /// Convert a buffer position to an index value, if it fits.
    fn from_usize(value: usize) -> Option<Self>;

    /// Widen this index to a buffer position.
    fn to_usize(self) -> usize;

    /// Maximum number of vertices a buffer indexed by `Self` may hold,
    /// given the byte size of one vertex.
    fn vertex_ceiling(stride: usize) -> usize;

    /// Maximum number of indices of this width in one stream.
    fn index_ceiling() -> usize {
        MAX_STREAM_BYTES / std::mem::size_of::<Self>()
    }
}

impl MeshIndex for u16 {
    const FORMAT: IndexFormat = IndexFormat::Uint16;
    const MAX_VALUE: usize = u16::MAX as usize;

    fn from_usize(value: usize) -> Option<Self> {
        u16::try_from(value).ok()
    }

    fn to_usize(self) -> usize {
        self as usize
    }

    fn vertex_ceiling(_stride: usize) -> usize {
        MAX_VERTICES_16
    }
}

impl MeshIndex for u32 {
    const FORMAT: IndexFormat = IndexFormat::Uint32;
    const MAX_VALUE: usize = u32::MAX as usize;

    fn from_usize(value: usize) -> Option<Self> {
        u32::try_from(value).ok()
    }

    fn to_usize(self) -> usize {
        self as usize
    }

    fn vertex_ceiling(stride: usize) -> usize {
        MAX_STREAM_BYTES / stride.max(1)
    }
}
