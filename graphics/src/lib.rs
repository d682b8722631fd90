//! # BeauMesh Graphics
//!
//! GPU destinations for meshes built with `beaumesh-core`.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`WgpuContext`] - Instance, adapter, device, and queue in one place
//! - [`GpuMesh`] - A [`MeshResource`](beaumesh_core::mesh::MeshResource) backed by wgpu buffers
//! - [`vertex_format`] - Attribute format to `wgpu::VertexFormat` conversion
//!
//! ## Example
//!
//! ```ignore
//! let context = WgpuContext::new()?;
//! let mut gpu_mesh = GpuMesh::new(&context, "ui");
//! let mut target = UploadTarget::new();
//!
//! mesh.upload(&mut target, &mut gpu_mesh, UploadFlags::SKIP_UNCHANGED_INDEX_PARAMS)?;
//! let attributes = gpu_mesh.vertex_attributes()?;
//! ```

pub mod error;

#[cfg(feature = "wgpu-backend")]
mod context;
#[cfg(feature = "wgpu-backend")]
mod conversion;
#[cfg(feature = "wgpu-backend")]
mod gpu_mesh;

pub use beaumesh_core::mesh;
pub use error::GraphicsError;

#[cfg(feature = "wgpu-backend")]
pub use context::WgpuContext;
#[cfg(feature = "wgpu-backend")]
pub use conversion::{convert_index_format, convert_topology, vertex_format};
#[cfg(feature = "wgpu-backend")]
pub use gpu_mesh::GpuMesh;

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
