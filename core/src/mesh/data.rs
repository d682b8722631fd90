//! CPU-side mesh data structures.
//!
//! This module provides:
//! - [`PrimitiveTopology`] - How vertices are assembled into primitives
//! - [`IndexFormat`] - Index data format (u16 or u32)
//! - [`Aabb`] - Axis-aligned bounds computed from vertex positions
//! - [`MeshDescriptor`] - Size summary of an uploaded mesh
//! - [`CpuMesh`] - In-memory upload destination holding raw vertex and index bytes

use std::sync::Arc;

use crate::math::Vec3;

use super::layout::{VertexAttributeFormat, VertexAttributeSemantic, VertexLayout};
use super::upload::{MeshResource, MeshResourceError, SubMeshDescriptor};

/// Primitive topology describing how indices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// Each index is a separate point.
    PointList,
    /// Every two indices form a line.
    LineList,
    /// Indices form a connected strip of lines.
    LineStrip,
    /// Every three indices form a triangle.
    #[default]
    TriangleList,
    /// Indices form a connected strip of triangles.
    TriangleStrip,
}

impl PrimitiveTopology {
    /// Get the number of indices per primitive (for non-strip topologies).
    pub fn vertices_per_primitive(&self) -> Option<u32> {
        match self {
            Self::PointList => Some(1),
            Self::LineList => Some(2),
            Self::TriangleList => Some(3),
            Self::LineStrip | Self::TriangleStrip => None, // Variable
        }
    }

    /// Number of primitives described by `count` indices.
    pub fn primitive_count(&self, count: u32) -> u32 {
        match self {
            Self::PointList => count,
            Self::LineList => count / 2,
            Self::LineStrip => count.saturating_sub(1),
            Self::TriangleList => count / 3,
            Self::TriangleStrip => count.saturating_sub(2),
        }
    }
}

/// Index format for indexed drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexFormat {
    /// 16-bit unsigned integers (max 65535 vertices).
    #[default]
    Uint16,
    /// 32-bit unsigned integers.
    Uint32,
}

impl IndexFormat {
    /// Get the size in bytes of each index.
    pub fn size(&self) -> usize {
        match self {
            Self::Uint16 => 2,
            Self::Uint32 => 4,
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Aabb {
    /// Bounds of a set of points. `None` for an empty set.
    pub fn from_points(points: impl IntoIterator<Item = [f32; 3]>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = Vec3::from(points.next()?);
        let (min, max) = points.fold((first, first), |(min, max), p| {
            let p = Vec3::from(p);
            (min.inf(&p), max.sup(&p))
        });
        Some(Self { min, max })
    }

    /// Bounds of the position channel of interleaved vertex bytes.
    ///
    /// `None` when the layout has no 32-bit float position or there are no vertices.
    pub fn from_vertex_bytes(layout: &VertexLayout, bytes: &[u8]) -> Option<Self> {
        let position = layout.attribute(VertexAttributeSemantic::Position)?;
        if position.format != VertexAttributeFormat::Float32 || position.dimension < 3 {
            return None;
        }
        let offset = position.offset as usize;
        Self::from_points(bytes.chunks_exact(layout.stride() as usize).map(|vertex| {
            bytemuck::pod_read_unaligned::<[f32; 3]>(&vertex[offset..offset + 12])
        }))
    }

    /// Center point.
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half of the box size along each axis.
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
}

/// Size summary of a mesh as it was last uploaded.
#[derive(Debug, Clone)]
pub struct MeshDescriptor {
    /// Vertex layout (shared via Arc).
    pub layout: Arc<VertexLayout>,
    /// Primitive topology.
    pub topology: PrimitiveTopology,
    /// Number of vertices.
    pub vertex_count: u32,
    /// Index format.
    pub index_format: IndexFormat,
    /// Number of indices.
    pub index_count: u32,
    /// Optional label for debugging.
    pub label: Option<String>,
}

impl MeshDescriptor {
    /// Required vertex buffer size in bytes.
    pub fn vertex_buffer_size(&self) -> u64 {
        self.vertex_count as u64 * self.layout.stride() as u64
    }

    /// Required index buffer size in bytes.
    pub fn index_buffer_size(&self) -> u64 {
        self.index_count as u64 * self.index_format.size() as u64
    }
}

/// An in-memory upload destination holding raw vertex and index bytes.
///
/// This is the GPU-agnostic counterpart of a GPU mesh: [`MeshData::upload`]
/// writes into it through the [`MeshResource`] trait exactly as it would
/// write into a device mesh.
///
/// [`MeshData::upload`]: super::MeshData::upload
#[derive(Clone, Default)]
pub struct CpuMesh {
    layout: Option<Arc<VertexLayout>>,
    vertex_data: Vec<u8>,
    vertex_count: u32,
    index_data: Vec<u8>,
    index_format: Option<IndexFormat>,
    index_count: u32,
    submesh: Option<SubMeshDescriptor>,
    bounds: Option<Aabb>,
    no_longer_readable: bool,
    label: Option<String>,
}

impl CpuMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Get the vertex layout, once vertex parameters have been set.
    pub fn layout(&self) -> Option<&Arc<VertexLayout>> {
        self.layout.as_ref()
    }

    /// Get the primitive topology of the submesh.
    pub fn topology(&self) -> Option<PrimitiveTopology> {
        self.submesh.map(|s| s.topology)
    }

    /// Raw vertex bytes, unless the mesh was marked no longer readable.
    pub fn vertex_data(&self) -> Option<&[u8]> {
        (!self.no_longer_readable).then_some(self.vertex_data.as_slice())
    }

    /// Raw index bytes, unless the mesh was marked no longer readable.
    pub fn index_data(&self) -> Option<&[u8]> {
        (!self.no_longer_readable).then_some(self.index_data.as_slice())
    }

    /// Indices decoded to `u32`, unless the mesh was marked no longer readable.
    pub fn indices_u32(&self) -> Option<Vec<u32>> {
        let data = self.index_data()?;
        Some(match self.index_format? {
            IndexFormat::Uint16 => data
                .chunks_exact(2)
                .map(|c| u32::from(bytemuck::pod_read_unaligned::<u16>(c)))
                .collect(),
            IndexFormat::Uint32 => data
                .chunks_exact(4)
                .map(bytemuck::pod_read_unaligned::<u32>)
                .collect(),
        })
    }

    /// Get the number of vertices.
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Get the index format.
    pub fn index_format(&self) -> Option<IndexFormat> {
        self.index_format
    }

    /// Get the number of indices.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// The submesh descriptor, once set.
    pub fn submesh(&self) -> Option<SubMeshDescriptor> {
        self.submesh
    }

    /// The bounds, once set.
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    /// Whether CPU access to the payload has been given up.
    pub fn is_readable(&self) -> bool {
        !self.no_longer_readable
    }

    /// Get the debug label.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Create a [`MeshDescriptor`] matching this mesh, once vertex parameters are set.
    pub fn to_descriptor(&self) -> Option<MeshDescriptor> {
        Some(MeshDescriptor {
            layout: self.layout.clone()?,
            topology: self.topology().unwrap_or_default(),
            vertex_count: self.vertex_count,
            index_format: self.index_format.unwrap_or_default(),
            index_count: self.index_count,
            label: self.label.clone(),
        })
    }
}

impl MeshResource for CpuMesh {
    fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    fn set_vertex_buffer_params(
        &mut self,
        layout: &Arc<VertexLayout>,
        vertex_count: u32,
    ) -> Result<(), MeshResourceError> {
        self.vertex_data
            .resize(vertex_count as usize * layout.stride() as usize, 0);
        self.vertex_count = vertex_count;
        self.layout = Some(Arc::clone(layout));
        Ok(())
    }

    fn set_vertex_buffer_data(&mut self, data: &[u8]) -> Result<(), MeshResourceError> {
        if data.len() != self.vertex_data.len() {
            return Err(MeshResourceError::SizeMismatch {
                buffer: "vertex",
                expected: self.vertex_data.len(),
                actual: data.len(),
            });
        }
        self.vertex_data.copy_from_slice(data);
        Ok(())
    }

    fn set_index_buffer_params(
        &mut self,
        format: IndexFormat,
        index_count: u32,
    ) -> Result<(), MeshResourceError> {
        self.index_data.resize(index_count as usize * format.size(), 0);
        self.index_format = Some(format);
        self.index_count = index_count;
        Ok(())
    }

    fn set_index_buffer_data(&mut self, data: &[u8]) -> Result<(), MeshResourceError> {
        if data.len() != self.index_data.len() {
            return Err(MeshResourceError::SizeMismatch {
                buffer: "index",
                expected: self.index_data.len(),
                actual: data.len(),
            });
        }
        self.index_data.copy_from_slice(data);
        Ok(())
    }

    fn set_submesh(&mut self, submesh: SubMeshDescriptor) -> Result<(), MeshResourceError> {
        let end = submesh.index_start as u64 + submesh.index_count as u64;
        if end > self.index_count as u64 {
            return Err(MeshResourceError::SubMeshOutOfRange {
                end,
                index_count: self.index_count,
            });
        }
        self.submesh = Some(submesh);
        Ok(())
    }

    fn set_bounds(&mut self, bounds: Aabb) {
        self.bounds = Some(bounds);
    }

    fn finalize(&mut self, no_longer_readable: bool) -> Result<(), MeshResourceError> {
        self.no_longer_readable |= no_longer_readable;
        Ok(())
    }
}

impl std::fmt::Debug for CpuMesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuMesh")
            .field("label", &self.label)
            .field("topology", &self.topology())
            .field("vertex_count", &self.vertex_count)
            .field("index_count", &self.index_count)
            .field("index_format", &self.index_format)
            .field("readable", &self.is_readable())
            .field("layout", &self.layout.as_ref().and_then(|l| l.label()))
            .finish()
    }
}
