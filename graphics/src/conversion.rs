//! Conversions from mesh types to wgpu types.

use beaumesh_core::mesh::{IndexFormat, PrimitiveTopology, VertexAttributeFormat};

/// Convert an attribute format and component count to a wgpu vertex format.
///
/// `None` for combinations wgpu cannot express, such as three 8-bit or 16-bit
/// components.
pub fn vertex_format(format: VertexAttributeFormat, dimension: u8) -> Option<wgpu::VertexFormat> {
    use VertexAttributeFormat as F;
    use wgpu::VertexFormat as W;

    Some(match (format, dimension) {
        (F::Float32, 1) => W::Float32,
        (F::Float32, 2) => W::Float32x2,
        (F::Float32, 3) => W::Float32x3,
        (F::Float32, 4) => W::Float32x4,
        (F::Float16, 1) => W::Float16,
        (F::Float16, 2) => W::Float16x2,
        (F::Float16, 4) => W::Float16x4,
        (F::UNorm8, 1) => W::Unorm8,
        (F::UNorm8, 2) => W::Unorm8x2,
        (F::UNorm8, 4) => W::Unorm8x4,
        (F::SNorm8, 1) => W::Snorm8,
        (F::SNorm8, 2) => W::Snorm8x2,
        (F::SNorm8, 4) => W::Snorm8x4,
        (F::UNorm16, 1) => W::Unorm16,
        (F::UNorm16, 2) => W::Unorm16x2,
        (F::UNorm16, 4) => W::Unorm16x4,
        (F::SNorm16, 1) => W::Snorm16,
        (F::SNorm16, 2) => W::Snorm16x2,
        (F::SNorm16, 4) => W::Snorm16x4,
        (F::UInt8, 1) => W::Uint8,
        (F::UInt8, 2) => W::Uint8x2,
        (F::UInt8, 4) => W::Uint8x4,
        (F::SInt8, 1) => W::Sint8,
        (F::SInt8, 2) => W::Sint8x2,
        (F::SInt8, 4) => W::Sint8x4,
        (F::UInt16, 1) => W::Uint16,
        (F::UInt16, 2) => W::Uint16x2,
        (F::UInt16, 4) => W::Uint16x4,
        (F::SInt16, 1) => W::Sint16,
        (F::SInt16, 2) => W::Sint16x2,
        (F::SInt16, 4) => W::Sint16x4,
        (F::UInt32, 1) => W::Uint32,
        (F::UInt32, 2) => W::Uint32x2,
        (F::UInt32, 3) => W::Uint32x3,
        (F::UInt32, 4) => W::Uint32x4,
        (F::SInt32, 1) => W::Sint32,
        (F::SInt32, 2) => W::Sint32x2,
        (F::SInt32, 3) => W::Sint32x3,
        (F::SInt32, 4) => W::Sint32x4,
        _ => return None,
    })
}

/// Convert IndexFormat to wgpu index format.
pub fn convert_index_format(format: IndexFormat) -> wgpu::IndexFormat {
    match format {
        IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
        IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
    }
}

/// Convert PrimitiveTopology to wgpu primitive topology.
pub fn convert_topology(topology: PrimitiveTopology) -> wgpu::PrimitiveTopology {
    match topology {
        PrimitiveTopology::PointList => wgpu::PrimitiveTopology::PointList,
        PrimitiveTopology::LineList => wgpu::PrimitiveTopology::LineList,
        PrimitiveTopology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
        PrimitiveTopology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
        PrimitiveTopology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
    }
}
