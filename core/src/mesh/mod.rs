//! Interleaved mesh building.
//!
//! This module provides the GPU-agnostic half of the mesh pipeline:
//!
//! - [`Vertex`] / [`VertexLayout`] - Per-field attribute tags and the layout derived from them
//! - [`LayoutRegistry`] - Memoized layout per vertex type
//! - [`MeshData`] - Vertex/index accumulation, in-place transforms, and upload
//! - [`MeshResource`] - The destination an upload writes to
//! - [`CpuMesh`] - A CPU-side destination, useful for snapshots and tests
//!
//! The wgpu destination lives in `beaumesh-graphics`.

mod buffer;
mod builder;
mod data;
mod index;
mod layout;
mod registry;
mod transform;
mod upload;

pub use buffer::{BufferError, GrowableBuffer};
pub use builder::{MeshData, MeshData16, MeshData32, MeshDataDescriptor, MeshError, MeshRange};
pub use data::{Aabb, CpuMesh, IndexFormat, MeshDescriptor, PrimitiveTopology};
pub use index::{MAX_STREAM_BYTES, MAX_VERTICES_16, MeshIndex};
pub use layout::{
    LayoutError, Vertex, VertexAttribute, VertexAttributeFormat, VertexAttributeMask,
    VertexAttributeSemantic, VertexField, VertexLayout,
};
pub use registry::LayoutRegistry;
pub use transform::TransformError;
pub use upload::{
    MeshResource, MeshResourceError, SubMeshDescriptor, UploadFlags, UploadReport, UploadTarget,
};

#[cfg(feature = "derive")]
pub use beaumesh_macro::Vertex;
