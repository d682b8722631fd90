//! Interleaved mesh builder.
//!
//! [`MeshData`] accumulates vertices of one [`Vertex`] type and indices of one
//! [`MeshIndex`] width, then uploads them to a [`MeshResource`]. Use the
//! [`MeshData16`] and [`MeshData32`] aliases to pick the index width.
//!
//! # Example
//!
//! ```ignore
//! let registry = LayoutRegistry::new();
//! let mut mesh = MeshData16::<UiVertex>::new(&registry, 64, 96, PrimitiveTopology::TriangleList, true)?;
//!
//! let quad = mesh.add_quad(a, b, c, d)?;
//! mesh.transform(quad, &mat4_from_translation(offset))?;
//!
//! let mut target = UploadTarget::new();
//! mesh.upload(&mut target, &mut gpu_mesh, UploadFlags::SKIP_UNCHANGED_INDEX_PARAMS)?;
//! mesh.clear();
//! ```

use std::ops::Range;
use std::sync::Arc;

use crate::math::Mat4;

use super::buffer::{BufferError, GrowableBuffer};
use super::data::{CpuMesh, IndexFormat, MeshDescriptor, PrimitiveTopology};
use super::index::MeshIndex;
use super::layout::{LayoutError, Vertex, VertexLayout};
use super::registry::LayoutRegistry;
use super::transform::{TransformError, transform_vertices};
use super::upload::{
    MeshResource, MeshResourceError, UploadFlags, UploadPayload, UploadReport, UploadTarget,
    upload_payload,
};

/// A [`MeshData`] with 16-bit indices (at most 65535 vertices).
pub type MeshData16<V> = MeshData<V, u16>;

/// A [`MeshData`] with 32-bit indices.
pub type MeshData32<V> = MeshData<V, u32>;

/// Errors raised by [`MeshData`] operations.
///
/// All of them are caller contract violations; the builder never partially
/// applies an operation that fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MeshError {
    /// The vertex type has a malformed layout.
    #[error(transparent)]
    Layout(#[from] LayoutError),
    /// The vertex buffer cannot take the request.
    #[error("vertex buffer: {0}")]
    Vertices(BufferError),
    /// The index buffer cannot take the request.
    #[error("index buffer: {0}")]
    Indices(BufferError),
    /// An element index is past the end of its buffer.
    #[error("{buffer} {index} is out of range (count {count})")]
    OutOfRange {
        buffer: &'static str,
        index: usize,
        count: usize,
    },
    /// A vertex range reaches past the vertex count.
    #[error("vertex range {start}..{end} is out of range (count {count})")]
    RangeOutOfBounds { start: usize, end: usize, count: usize },
    /// A re-based index does not fit the index width.
    #[error("index value {value} does not fit {format:?}")]
    IndexOverflow { value: usize, format: IndexFormat },
    /// A stored index references a vertex that does not exist.
    #[error("index {value} at position {position} references past vertex count {vertex_count}")]
    IndexOutOfRange {
        position: usize,
        value: usize,
        vertex_count: usize,
    },
    /// The layout cannot be transformed.
    #[error(transparent)]
    Transform(#[from] TransformError),
    /// The destination rejected the upload.
    #[error(transparent)]
    Resource(#[from] MeshResourceError),
    /// The builder's storage has been released.
    #[error("mesh data has been released")]
    Released,
}

/// A vertex sub-range written by one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MeshRange {
    /// First vertex of the range.
    pub offset: u32,
    /// Number of vertices in the range.
    pub length: u32,
}

impl MeshRange {
    /// Create a range.
    pub fn new(offset: u32, length: u32) -> Self {
        Self { offset, length }
    }

    /// First vertex.
    pub fn start(&self) -> usize {
        self.offset as usize
    }

    /// One past the last vertex.
    pub fn end(&self) -> usize {
        self.offset as usize + self.length as usize
    }

    /// Whether the range covers no vertices.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// As a standard range.
    pub fn as_range(&self) -> Range<usize> {
        self.start()..self.end()
    }
}

/// Construction parameters for [`MeshData`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshDataDescriptor {
    /// Initial vertex capacity (rounded up to a power of two).
    pub vertex_capacity: usize,
    /// Initial index capacity (rounded up to a power of two).
    pub index_capacity: usize,
    /// Primitive topology of the indices.
    pub topology: PrimitiveTopology,
    /// Whether the buffers may grow past their initial capacity.
    pub flexible: bool,
    /// Optional label for debugging.
    pub label: Option<String>,
}

impl MeshDataDescriptor {
    /// Flexible triangle-list mesh with the given initial capacities.
    pub fn new(vertex_capacity: usize, index_capacity: usize) -> Self {
        Self {
            vertex_capacity,
            index_capacity,
            topology: PrimitiveTopology::TriangleList,
            flexible: true,
            label: None,
        }
    }

    /// Set the primitive topology.
    pub fn with_topology(mut self, topology: PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    /// Set whether the buffers may grow.
    pub fn with_flexible(mut self, flexible: bool) -> Self {
        self.flexible = flexible;
        self
    }

    /// Set a debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Accumulates interleaved vertices and indices for one mesh.
pub struct MeshData<V: Vertex, I: MeshIndex> {
    layout: Arc<VertexLayout>,
    vertices: GrowableBuffer<V>,
    indices: GrowableBuffer<I>,
    topology: PrimitiveTopology,
    label: Option<String>,
}

impl<V: Vertex, I: MeshIndex> MeshData<V, I> {
    /// Create a builder with the given initial capacities.
    ///
    /// Fails if `V` does not have a valid layout.
    pub fn new(
        registry: &LayoutRegistry,
        vertex_capacity: usize,
        index_capacity: usize,
        topology: PrimitiveTopology,
        flexible: bool,
    ) -> Result<Self, MeshError> {
        Self::from_descriptor(
            registry,
            &MeshDataDescriptor::new(vertex_capacity, index_capacity)
                .with_topology(topology)
                .with_flexible(flexible),
        )
    }

    /// Create a builder from a descriptor.
    pub fn from_descriptor(
        registry: &LayoutRegistry,
        descriptor: &MeshDataDescriptor,
    ) -> Result<Self, MeshError> {
        let layout = registry.layout_of::<V>()?;
        let vertex_ceiling = I::vertex_ceiling(layout.stride() as usize);
        Ok(Self {
            vertices: GrowableBuffer::new(
                descriptor.vertex_capacity,
                vertex_ceiling,
                descriptor.flexible,
            ),
            indices: GrowableBuffer::new(
                descriptor.index_capacity,
                I::index_ceiling(),
                descriptor.flexible,
            ),
            layout,
            topology: descriptor.topology,
            label: descriptor.label.clone(),
        })
    }

    // ---- queries ----

    /// The vertex layout.
    pub fn layout(&self) -> &Arc<VertexLayout> {
        &self.layout
    }

    /// Number of vertices written. Zero once released.
    pub fn vertex_count(&self) -> u32 {
        self.vertices.len() as u32
    }

    /// Number of indices written. Zero once released.
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// The primitive topology.
    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    /// Whether the buffers may grow past their initial capacity.
    pub fn is_flexible(&self) -> bool {
        self.vertices.is_flexible()
    }

    /// The debug label.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Whether [`release`](Self::release) has been called.
    pub fn is_released(&self) -> bool {
        self.vertices.is_released()
    }

    /// Current vertex capacity.
    pub fn vertex_capacity(&self) -> usize {
        self.vertices.capacity()
    }

    /// Current index capacity.
    pub fn index_capacity(&self) -> usize {
        self.indices.capacity()
    }

    /// Maximum vertex count for this vertex type and index width.
    pub fn vertex_ceiling(&self) -> usize {
        self.vertices.ceiling()
    }

    /// Maximum index count for this index width.
    pub fn index_ceiling(&self) -> usize {
        self.indices.ceiling()
    }

    /// Vertices written so far. Empty once released.
    pub fn vertices(&self) -> &[V] {
        self.vertices.as_slice()
    }

    /// Indices written so far. Empty once released.
    pub fn indices(&self) -> &[I] {
        self.indices.as_slice()
    }

    /// Whether adding `vertex_count` vertices and `index_count` indices would
    /// cross a format ceiling. Does not modify the builder.
    ///
    /// A released builder is measured as empty; check
    /// [`is_released`](Self::is_released) before refilling it.
    pub fn needs_flush(&self, vertex_count: usize, index_count: usize) -> bool {
        let exceeds = |len: usize, extra: usize, ceiling: usize| {
            len.checked_add(extra).is_none_or(|total| total > ceiling)
        };
        exceeds(self.vertices.len(), vertex_count, self.vertices.ceiling())
            || exceeds(self.indices.len(), index_count, self.indices.ceiling())
    }

    /// A size summary of the current contents.
    pub fn descriptor(&self) -> MeshDescriptor {
        MeshDescriptor {
            layout: Arc::clone(&self.layout),
            topology: self.topology,
            vertex_count: self.vertex_count(),
            index_format: I::FORMAT,
            index_count: self.index_count(),
            label: self.label.clone(),
        }
    }

    // ---- element access ----

    /// Get a written vertex.
    pub fn vertex(&self, index: usize) -> Result<&V, MeshError> {
        self.ensure_live()?;
        let count = self.vertices.len();
        self.vertices.get(index).ok_or(MeshError::OutOfRange {
            buffer: "vertex",
            index,
            count,
        })
    }

    /// Get a written vertex mutably.
    pub fn vertex_mut(&mut self, index: usize) -> Result<&mut V, MeshError> {
        self.ensure_live()?;
        let count = self.vertices.len();
        self.vertices.get_mut(index).ok_or(MeshError::OutOfRange {
            buffer: "vertex",
            index,
            count,
        })
    }

    /// Get a written index.
    pub fn index(&self, index: usize) -> Result<&I, MeshError> {
        self.ensure_live()?;
        let count = self.indices.len();
        self.indices.get(index).ok_or(MeshError::OutOfRange {
            buffer: "index",
            index,
            count,
        })
    }

    /// Get a written index mutably.
    pub fn index_mut(&mut self, index: usize) -> Result<&mut I, MeshError> {
        self.ensure_live()?;
        let count = self.indices.len();
        self.indices.get_mut(index).ok_or(MeshError::OutOfRange {
            buffer: "index",
            index,
            count,
        })
    }

    // ---- appending ----

    /// Append one vertex, returning its position.
    pub fn add_vertex(&mut self, vertex: V) -> Result<u32, MeshError> {
        self.reserve(1, 0)?;
        let position = self.vertex_count();
        self.vertices.push(vertex).map_err(MeshError::Vertices)?;
        Ok(position)
    }

    /// Append vertices without indices.
    pub fn add_vertices(&mut self, vertices: &[V]) -> Result<MeshRange, MeshError> {
        self.reserve(vertices.len(), 0)?;
        let range = MeshRange::new(self.vertex_count(), vertices.len() as u32);
        self.vertices
            .extend_from_slice(vertices)
            .map_err(MeshError::Vertices)?;
        Ok(range)
    }

    /// Append one raw, buffer-local index.
    pub fn add_index(&mut self, index: I) -> Result<(), MeshError> {
        self.reserve(0, 1)?;
        self.indices.push(index).map_err(MeshError::Indices)
    }

    /// Append raw, buffer-local indices.
    pub fn add_indices(&mut self, indices: &[I]) -> Result<(), MeshError> {
        self.reserve(0, indices.len())?;
        self.indices
            .extend_from_slice(indices)
            .map_err(MeshError::Indices)
    }

    /// Append a triangle with indices `0, 1, 2` relative to its first vertex.
    pub fn add_triangle(&mut self, a: V, b: V, c: V) -> Result<MeshRange, MeshError> {
        self.add_shape(&[a, b, c], &[0, 1, 2])
    }

    /// Append a quad as two triangles, `0, 1, 2` and `2, 3, 1`, sharing the 1-2 diagonal.
    pub fn add_quad(&mut self, a: V, b: V, c: V, d: V) -> Result<MeshRange, MeshError> {
        self.add_shape(&[a, b, c, d], &[0, 1, 2, 2, 3, 1])
    }

    /// Append a prepared vertex/index block.
    ///
    /// `indices` refer to positions in `vertices`; they are re-based by the
    /// current vertex count before being stored.
    pub fn add_from_buffers(&mut self, vertices: &[V], indices: &[I]) -> Result<MeshRange, MeshError> {
        self.reserve(vertices.len(), indices.len())?;
        let base = self.vertices.len();
        let rebased = indices
            .iter()
            .map(|&index| self.rebase(base, index.to_usize()))
            .collect::<Result<Vec<I>, _>>()?;
        self.commit(vertices, rebased)
    }

    fn add_shape(&mut self, vertices: &[V], local: &[usize]) -> Result<MeshRange, MeshError> {
        self.reserve(vertices.len(), local.len())?;
        let base = self.vertices.len();
        let indices = local
            .iter()
            .map(|&offset| self.rebase(base, offset))
            .collect::<Result<Vec<I>, _>>()?;
        self.commit(vertices, indices)
    }

    /// Write a block whose capacity was already reserved.
    fn commit(&mut self, vertices: &[V], indices: Vec<I>) -> Result<MeshRange, MeshError> {
        let range = MeshRange::new(self.vertex_count(), vertices.len() as u32);
        self.vertices
            .extend_from_slice(vertices)
            .map_err(MeshError::Vertices)?;
        self.indices
            .extend_exact(indices)
            .map_err(MeshError::Indices)?;
        log::trace!(
            "MeshData {:?}: appended {} vertices at {}",
            self.label,
            range.length,
            range.offset
        );
        Ok(range)
    }

    fn rebase(&self, base: usize, offset: usize) -> Result<I, MeshError> {
        let value = base + offset;
        I::from_usize(value).ok_or(MeshError::IndexOverflow {
            value,
            format: I::FORMAT,
        })
    }

    /// Make room for both buffers, or fail without touching either.
    fn reserve(&mut self, vertices: usize, indices: usize) -> Result<(), MeshError> {
        self.ensure_live()?;
        let vertex_total = self.vertices.len() + vertices;
        let index_total = self.indices.len() + indices;
        self.vertices
            .check_capacity(vertex_total)
            .map_err(MeshError::Vertices)?;
        self.indices
            .check_capacity(index_total)
            .map_err(MeshError::Indices)?;
        self.vertices
            .ensure_capacity(vertex_total)
            .map_err(MeshError::Vertices)?;
        self.indices
            .ensure_capacity(index_total)
            .map_err(MeshError::Indices)
    }

    fn ensure_live(&self) -> Result<(), MeshError> {
        if self.is_released() {
            return Err(MeshError::Released);
        }
        Ok(())
    }

    // ---- in-place edits ----

    /// Apply `matrix` to the position, normal, and tangent channels of the
    /// vertices in `range`.
    pub fn transform(&mut self, range: MeshRange, matrix: &Mat4) -> Result<(), MeshError> {
        self.ensure_live()?;
        let count = self.vertices.len();
        if range.end() > count {
            return Err(MeshError::RangeOutOfBounds {
                start: range.start(),
                end: range.end(),
                count,
            });
        }
        transform_vertices(
            self.vertices.as_bytes_mut(),
            &self.layout,
            range.as_range(),
            matrix,
        )?;
        Ok(())
    }

    // ---- output ----

    /// Push the vertex and index data to `resource`.
    ///
    /// `target` records what `resource` was last configured with; only
    /// parameters that changed are reissued (see [`UploadFlags`]).
    pub fn upload<R: MeshResource + ?Sized>(
        &self,
        target: &mut UploadTarget,
        resource: &mut R,
        flags: UploadFlags,
    ) -> Result<UploadReport, MeshError> {
        self.ensure_live()?;
        self.validate_indices()?;
        let payload = UploadPayload {
            layout: &self.layout,
            topology: self.topology,
            vertex_bytes: self.vertices.as_bytes(),
            vertex_count: self.vertex_count(),
            index_format: I::FORMAT,
            index_bytes: self.indices.as_bytes(),
            index_count: self.index_count(),
        };
        Ok(upload_payload(&payload, target, resource, flags)?)
    }

    /// Copy the current contents into a fresh [`CpuMesh`].
    pub fn to_cpu_mesh(&self) -> Result<CpuMesh, MeshError> {
        let mut mesh = CpuMesh::new();
        if let Some(label) = &self.label {
            mesh = mesh.with_label(label.clone());
        }
        self.upload(&mut UploadTarget::new(), &mut mesh, UploadFlags::empty())?;
        Ok(mesh)
    }

    fn validate_indices(&self) -> Result<(), MeshError> {
        crate::profile_scope!("validate_indices");
        let vertex_count = self.vertices.len();
        match self
            .indices
            .as_slice()
            .iter()
            .position(|index| index.to_usize() >= vertex_count)
        {
            Some(position) => Err(MeshError::IndexOutOfRange {
                position,
                value: self.indices.as_slice()[position].to_usize(),
                vertex_count,
            }),
            None => Ok(()),
        }
    }

    /// Reset both counts to zero, keeping the storage.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
    }

    /// Free the storage. Every later operation fails with [`MeshError::Released`].
    pub fn release(&mut self) {
        self.vertices.release();
        self.indices.release();
    }
}

impl<V: Vertex, I: MeshIndex> std::fmt::Debug for MeshData<V, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeshData")
            .field("label", &self.label)
            .field("topology", &self.topology)
            .field("index_format", &I::FORMAT)
            .field("vertex_count", &self.vertices.len())
            .field("index_count", &self.indices.len())
            .field("released", &self.is_released())
            .field("layout", &self.layout.label())
            .finish()
    }
}
