//! wgpu-backed mesh destination.

use std::sync::Arc;

use beaumesh_core::mesh::{
    Aabb, IndexFormat, MeshResource, MeshResourceError, SubMeshDescriptor, VertexLayout,
};

use crate::conversion::{convert_index_format, vertex_format};
use crate::context::WgpuContext;
use crate::error::GraphicsError;

/// Round a byte size up to wgpu's copy alignment.
fn align_copy(size: u64) -> u64 {
    size.div_ceil(wgpu::COPY_BUFFER_ALIGNMENT) * wgpu::COPY_BUFFER_ALIGNMENT
}

/// A GPU vertex/index buffer pair that receives [`MeshData`](beaumesh_core::mesh::MeshData) uploads.
///
/// Buffers are recreated only when a larger size is requested. Until an upload
/// marks the mesh no longer readable, the last payload is also kept on the CPU.
pub struct GpuMesh {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    label: String,
    layout: Option<Arc<VertexLayout>>,
    vertex_buffer: Option<wgpu::Buffer>,
    vertex_count: u32,
    index_buffer: Option<wgpu::Buffer>,
    index_format: Option<IndexFormat>,
    index_count: u32,
    submesh: Option<SubMeshDescriptor>,
    bounds: Option<Aabb>,
    vertex_shadow: Vec<u8>,
    index_shadow: Vec<u8>,
    readable: bool,
}

impl GpuMesh {
    /// Create an empty mesh on `context`'s device.
    pub fn new(context: &WgpuContext, label: impl Into<String>) -> Self {
        Self {
            device: Arc::clone(context.device()),
            queue: Arc::clone(context.queue()),
            label: label.into(),
            layout: None,
            vertex_buffer: None,
            vertex_count: 0,
            index_buffer: None,
            index_format: None,
            index_count: 0,
            submesh: None,
            bounds: None,
            vertex_shadow: Vec::new(),
            index_shadow: Vec::new(),
            readable: true,
        }
    }

    /// Debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Vertex layout of the last upload.
    pub fn layout(&self) -> Option<&Arc<VertexLayout>> {
        self.layout.as_ref()
    }

    /// The vertex buffer, once configured.
    pub fn vertex_buffer(&self) -> Option<&wgpu::Buffer> {
        self.vertex_buffer.as_ref()
    }

    /// The index buffer, once configured.
    pub fn index_buffer(&self) -> Option<&wgpu::Buffer> {
        self.index_buffer.as_ref()
    }

    /// Index format for `RenderPass::set_index_buffer`.
    pub fn index_format(&self) -> Option<wgpu::IndexFormat> {
        self.index_format.map(convert_index_format)
    }

    /// Number of indices.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// The submesh descriptor.
    pub fn submesh(&self) -> Option<SubMeshDescriptor> {
        self.submesh
    }

    /// Bounds of the uploaded positions.
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    /// Whether the CPU shadow of the payload is still kept.
    pub fn is_readable(&self) -> bool {
        self.readable
    }

    /// CPU copy of the vertex payload, if still readable.
    pub fn vertex_data(&self) -> Option<&[u8]> {
        self.readable.then_some(self.vertex_shadow.as_slice())
    }

    /// CPU copy of the index payload, if still readable.
    pub fn index_data(&self) -> Option<&[u8]> {
        self.readable.then_some(self.index_shadow.as_slice())
    }

    /// Bytes between consecutive vertices, for `wgpu::VertexBufferLayout::array_stride`.
    pub fn array_stride(&self) -> Option<u64> {
        self.layout.as_ref().map(|layout| layout.stride() as u64)
    }

    /// Vertex attributes for pipeline creation.
    ///
    /// Shader locations follow the semantic ordinal: position is 0, normal 1,
    /// and so on up to blend indices at 13.
    pub fn vertex_attributes(&self) -> Result<Vec<wgpu::VertexAttribute>, GraphicsError> {
        let layout = self.layout.as_ref().ok_or(GraphicsError::NotConfigured)?;
        layout
            .attributes()
            .iter()
            .map(|attribute| {
                let format = vertex_format(attribute.format, attribute.dimension).ok_or(
                    GraphicsError::UnsupportedVertexFormat {
                        semantic: attribute.semantic,
                        format: attribute.format,
                        dimension: attribute.dimension,
                    },
                )?;
                Ok(wgpu::VertexAttribute {
                    format,
                    offset: attribute.offset as u64,
                    shader_location: attribute.semantic.index() as u32,
                })
            })
            .collect()
    }

    /// Return `slot` if it holds at least `size` bytes, otherwise a new buffer.
    fn ensure_buffer(
        &self,
        slot: Option<wgpu::Buffer>,
        size: u64,
        usage: wgpu::BufferUsages,
        kind: &str,
    ) -> wgpu::Buffer {
        let size = align_copy(size).max(wgpu::COPY_BUFFER_ALIGNMENT);
        match slot {
            Some(buffer) if buffer.size() >= size => buffer,
            previous => {
                log::debug!(
                    "GpuMesh {}: allocating {kind} buffer of {size} bytes (was {:?})",
                    self.label,
                    previous.as_ref().map(wgpu::Buffer::size)
                );
                if let Some(previous) = previous {
                    previous.destroy();
                }
                let label = format!("{} {kind}", self.label);
                self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(label.as_str()),
                    size,
                    usage,
                    mapped_at_creation: false,
                })
            }
        }
    }

    fn write(&self, buffer: Option<&wgpu::Buffer>, data: &[u8]) {
        let Some(buffer) = buffer else {
            return;
        };
        if data.is_empty() {
            return;
        }
        let padded = align_copy(data.len() as u64) as usize;
        if padded == data.len() {
            self.queue.write_buffer(buffer, 0, data);
        } else {
            let mut staging = Vec::with_capacity(padded);
            staging.extend_from_slice(data);
            staging.resize(padded, 0);
            self.queue.write_buffer(buffer, 0, &staging);
        }
    }

    fn expected_vertex_bytes(&self) -> usize {
        self.layout
            .as_ref()
            .map_or(0, |layout| self.vertex_count as usize * layout.stride() as usize)
    }

    fn expected_index_bytes(&self) -> usize {
        self.index_format
            .map_or(0, |format| self.index_count as usize * format.size())
    }
}

impl MeshResource for GpuMesh {
    fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    fn set_vertex_buffer_params(
        &mut self,
        layout: &Arc<VertexLayout>,
        vertex_count: u32,
    ) -> Result<(), MeshResourceError> {
        let size = vertex_count as u64 * layout.stride() as u64;
        let previous = self.vertex_buffer.take();
        let buffer = self.ensure_buffer(
            previous,
            size,
            wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            "vertices",
        );
        self.vertex_buffer = Some(buffer);
        self.vertex_count = vertex_count;
        self.layout = Some(Arc::clone(layout));
        Ok(())
    }

    fn set_vertex_buffer_data(&mut self, data: &[u8]) -> Result<(), MeshResourceError> {
        let expected = self.expected_vertex_bytes();
        if data.len() != expected {
            return Err(MeshResourceError::SizeMismatch {
                buffer: "vertex",
                expected,
                actual: data.len(),
            });
        }
        self.write(self.vertex_buffer.as_ref(), data);
        if self.readable {
            self.vertex_shadow.clear();
            self.vertex_shadow.extend_from_slice(data);
        }
        Ok(())
    }

    fn set_index_buffer_params(
        &mut self,
        format: IndexFormat,
        index_count: u32,
    ) -> Result<(), MeshResourceError> {
        let size = index_count as u64 * format.size() as u64;
        let previous = self.index_buffer.take();
        let buffer = self.ensure_buffer(
            previous,
            size,
            wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
            "indices",
        );
        self.index_buffer = Some(buffer);
        self.index_format = Some(format);
        self.index_count = index_count;
        Ok(())
    }

    fn set_index_buffer_data(&mut self, data: &[u8]) -> Result<(), MeshResourceError> {
        let expected = self.expected_index_bytes();
        if data.len() != expected {
            return Err(MeshResourceError::SizeMismatch {
                buffer: "index",
                expected,
                actual: data.len(),
            });
        }
        self.write(self.index_buffer.as_ref(), data);
        if self.readable {
            self.index_shadow.clear();
            self.index_shadow.extend_from_slice(data);
        }
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
        if no_longer_readable && self.readable {
            log::trace!("GpuMesh {}: dropping CPU shadow", self.label);
            self.readable = false;
            self.vertex_shadow = Vec::new();
            self.index_shadow = Vec::new();
        }
        Ok(())
    }
}

impl std::fmt::Debug for GpuMesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuMesh")
            .field("label", &self.label)
            .field("vertex_count", &self.vertex_count)
            .field("index_format", &self.index_format)
            .field("index_count", &self.index_count)
            .field(
                "vertex_buffer_size",
                &self.vertex_buffer.as_ref().map(wgpu::Buffer::size),
            )
            .field(
                "index_buffer_size",
                &self.index_buffer.as_ref().map(wgpu::Buffer::size),
            )
            .field("readable", &self.readable)
            .finish()
    }
}
