//! Upload reconciliation.
//!
//! Pushing a mesh to its destination has two parts: the payload bytes, which
//! are always written, and the buffer/submesh parameters, which are expensive
//! to reissue on most backends. [`UploadTarget`] remembers what the destination
//! was last configured with so repeated uploads of the same shape only write
//! payload.

use std::sync::Arc;

use bitflags::bitflags;

use super::data::{Aabb, IndexFormat, PrimitiveTopology};
use super::layout::VertexLayout;

/// Errors reported by a destination mesh resource.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MeshResourceError {
    /// Payload size does not match the configured buffer parameters.
    #[error("{buffer} payload is {actual} bytes, buffer expects {expected}")]
    SizeMismatch {
        buffer: &'static str,
        expected: usize,
        actual: usize,
    },
    /// The submesh reaches past the configured index count.
    #[error("submesh ends at index {end}, buffer holds {index_count}")]
    SubMeshOutOfRange { end: u64, index_count: u32 },
    /// Backend-specific failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// The destination of an upload.
///
/// The builder never inspects a resource beyond [`vertex_count`](Self::vertex_count);
/// everything else goes through this fixed set of calls.
pub trait MeshResource {
    /// Vertex count the resource is currently configured for.
    fn vertex_count(&self) -> u32;

    /// Configure the vertex buffer for `vertex_count` vertices of `layout`.
    fn set_vertex_buffer_params(
        &mut self,
        layout: &Arc<VertexLayout>,
        vertex_count: u32,
    ) -> Result<(), MeshResourceError>;

    /// Write the whole vertex payload.
    fn set_vertex_buffer_data(&mut self, data: &[u8]) -> Result<(), MeshResourceError>;

    /// Configure the index buffer.
    fn set_index_buffer_params(
        &mut self,
        format: IndexFormat,
        index_count: u32,
    ) -> Result<(), MeshResourceError>;

    /// Write the whole index payload.
    fn set_index_buffer_data(&mut self, data: &[u8]) -> Result<(), MeshResourceError>;

    /// Describe the single submesh.
    fn set_submesh(&mut self, submesh: SubMeshDescriptor) -> Result<(), MeshResourceError>;

    /// Store bounds computed from the uploaded positions.
    fn set_bounds(&mut self, bounds: Aabb);

    /// Finish the upload, optionally giving up CPU-side access to the payload.
    fn finalize(&mut self, no_longer_readable: bool) -> Result<(), MeshResourceError>;
}

/// One contiguous index range and its topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubMeshDescriptor {
    /// First index of the range.
    pub index_start: u32,
    /// Number of indices in the range.
    pub index_count: u32,
    /// Value added to every index before fetching a vertex.
    pub base_vertex: u32,
    /// How the indices are assembled.
    pub topology: PrimitiveTopology,
}

bitflags! {
    /// Options for [`MeshData::upload`](super::MeshData::upload).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct UploadFlags: u32 {
        /// Skip index buffer and submesh parameters when they did not change.
        const SKIP_UNCHANGED_INDEX_PARAMS = 1 << 0;
        /// Leave the destination's bounds alone.
        const DONT_RECALCULATE_BOUNDS = 1 << 1;
        /// Give up CPU-side access to the payload after uploading.
        const MARK_NO_LONGER_READABLE = 1 << 2;
    }
}

/// What a destination was last configured with.
///
/// Owned by the caller and kept next to the destination it describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadTarget {
    layout_hash: Option<u64>,
    index_format: Option<IndexFormat>,
    index_count: u32,
    topology: Option<PrimitiveTopology>,
}

impl UploadTarget {
    /// A target that has never been uploaded to.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the recorded state so the next upload reissues everything.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Layout hash of the last upload.
    pub fn layout_hash(&self) -> Option<u64> {
        self.layout_hash
    }

    /// Index format of the last upload.
    pub fn index_format(&self) -> Option<IndexFormat> {
        self.index_format
    }

    /// Index count of the last upload.
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Topology of the last upload.
    pub fn topology(&self) -> Option<PrimitiveTopology> {
        self.topology
    }
}

/// Which parameter groups an upload reissued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadReport {
    /// Vertex buffer parameters were set.
    pub vertex_params: bool,
    /// Index buffer parameters were set.
    pub index_params: bool,
    /// The submesh descriptor was set.
    pub submesh: bool,
    /// Bounds were recomputed.
    pub bounds: bool,
}

/// Everything an upload needs from a builder, already validated.
pub(crate) struct UploadPayload<'a> {
    pub layout: &'a Arc<VertexLayout>,
    pub topology: PrimitiveTopology,
    pub vertex_bytes: &'a [u8],
    pub vertex_count: u32,
    pub index_format: IndexFormat,
    pub index_bytes: &'a [u8],
    pub index_count: u32,
}

/// Reconcile `resource` with `payload`, recording the result in `target`.
///
/// On a resource error the target is reset, and the next upload reissues
/// every parameter group.
pub(crate) fn upload_payload<R: MeshResource + ?Sized>(
    payload: &UploadPayload<'_>,
    target: &mut UploadTarget,
    resource: &mut R,
    flags: UploadFlags,
) -> Result<UploadReport, MeshResourceError> {
    crate::profile_function!();

    let report = apply_payload(payload, target, resource, flags).inspect_err(|err| {
        log::warn!("Mesh upload failed, resetting upload target: {err}");
        target.reset();
    })?;
    crate::profile_plot!("mesh_upload_bytes", payload.vertex_bytes.len() + payload.index_bytes.len());

    *target = UploadTarget {
        layout_hash: Some(payload.layout.layout_hash()),
        index_format: Some(payload.index_format),
        index_count: payload.index_count,
        topology: Some(payload.topology),
    };

    log::trace!(
        "Uploaded {} vertices / {} indices ({:?})",
        payload.vertex_count,
        payload.index_count,
        report
    );
    Ok(report)
}

fn apply_payload<R: MeshResource + ?Sized>(
    payload: &UploadPayload<'_>,
    target: &UploadTarget,
    resource: &mut R,
    flags: UploadFlags,
) -> Result<UploadReport, MeshResourceError> {
    let mut report = UploadReport::default();
    let layout_hash = payload.layout.layout_hash();
    let skip_unchanged = flags.contains(UploadFlags::SKIP_UNCHANGED_INDEX_PARAMS);

    if target.layout_hash != Some(layout_hash) || resource.vertex_count() != payload.vertex_count {
        resource.set_vertex_buffer_params(payload.layout, payload.vertex_count)?;
        report.vertex_params = true;
    }
    resource.set_vertex_buffer_data(payload.vertex_bytes)?;

    let index_changed = target.index_format != Some(payload.index_format)
        || target.index_count != payload.index_count;
    if index_changed || !skip_unchanged {
        resource.set_index_buffer_params(payload.index_format, payload.index_count)?;
        report.index_params = true;
    }
    resource.set_index_buffer_data(payload.index_bytes)?;

    let submesh_changed = index_changed || target.topology != Some(payload.topology);
    if submesh_changed || !skip_unchanged {
        resource.set_submesh(SubMeshDescriptor {
            index_start: 0,
            index_count: payload.index_count,
            base_vertex: 0,
            topology: payload.topology,
        })?;
        report.submesh = true;
    }

    if !flags.contains(UploadFlags::DONT_RECALCULATE_BOUNDS)
        && let Some(bounds) = Aabb::from_vertex_bytes(payload.layout, payload.vertex_bytes)
    {
        resource.set_bounds(bounds);
        report.bounds = true;
    }

    resource.finalize(flags.contains(UploadFlags::MARK_NO_LONGER_READABLE))?;
    Ok(report)
}
