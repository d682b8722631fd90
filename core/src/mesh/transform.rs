//! In-place affine transform of interleaved vertex channels.

use std::ops::Range;

use crate::math::{Mat4, transform_point3, transform_vector3};

use super::layout::{VertexAttribute, VertexAttributeFormat, VertexAttributeSemantic, VertexLayout};

/// Why a layout cannot be transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    /// The layout has no position channel.
    #[error("vertex layout has no position attribute")]
    MissingPosition,
    /// A spatial channel is not stored as 3 or 4 32-bit floats.
    #[error("cannot transform {semantic:?} stored as {format:?} x {dimension}")]
    UnsupportedFormat {
        semantic: VertexAttributeSemantic,
        format: VertexAttributeFormat,
        dimension: u8,
    },
}

/// Byte offsets of the channels a transform touches.
struct Channels {
    position: usize,
    normal: Option<usize>,
    tangent: Option<usize>,
}

impl Channels {
    fn of(layout: &VertexLayout) -> Result<Self, TransformError> {
        let position = layout
            .attribute(VertexAttributeSemantic::Position)
            .ok_or(TransformError::MissingPosition)?;
        Ok(Self {
            position: spatial_offset(position)?,
            normal: layout
                .attribute(VertexAttributeSemantic::Normal)
                .map(spatial_offset)
                .transpose()?,
            tangent: layout
                .attribute(VertexAttributeSemantic::Tangent)
                .map(spatial_offset)
                .transpose()?,
        })
    }
}

fn spatial_offset(attribute: &VertexAttribute) -> Result<usize, TransformError> {
    if attribute.format != VertexAttributeFormat::Float32 || !(3..=4).contains(&attribute.dimension) {
        return Err(TransformError::UnsupportedFormat {
            semantic: attribute.semantic,
            format: attribute.format,
            dimension: attribute.dimension,
        });
    }
    Ok(attribute.offset as usize)
}

fn read3(vertex: &[u8], offset: usize) -> [f32; 3] {
    bytemuck::pod_read_unaligned(&vertex[offset..offset + 12])
}

fn write3(vertex: &mut [u8], offset: usize, value: [f32; 3]) {
    vertex[offset..offset + 12].copy_from_slice(bytemuck::bytes_of(&value));
}

/// Transform the vertices in `range` of an interleaved byte buffer.
///
/// Positions get the full affine transform; normals and tangents get only
/// the linear part and are not renormalized. A fourth component (tangent
/// handedness, homogeneous w) is left as is. The caller guarantees `range`
/// lies within the buffer.
pub(crate) fn transform_vertices(
    bytes: &mut [u8],
    layout: &VertexLayout,
    range: Range<usize>,
    matrix: &Mat4,
) -> Result<(), TransformError> {
    crate::profile_function!();

    let channels = Channels::of(layout)?;
    let stride = layout.stride() as usize;
    let region = &mut bytes[range.start * stride..range.end * stride];

    for vertex in region.chunks_exact_mut(stride) {
        let position = read3(vertex, channels.position);
        write3(vertex, channels.position, transform_point3(matrix, position));

        for offset in [channels.normal, channels.tangent].into_iter().flatten() {
            let direction = read3(vertex, offset);
            write3(vertex, offset, transform_vector3(matrix, direction));
        }
    }
    Ok(())
}
