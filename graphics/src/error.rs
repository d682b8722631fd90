//! Graphics error types.

use std::fmt;

use beaumesh_core::mesh::{MeshResourceError, VertexAttributeFormat, VertexAttributeSemantic};

/// Errors that can occur in the graphics crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsError {
    /// Failed to initialize the GPU context.
    InitializationFailed(String),
    /// No mesh data has been uploaded yet.
    NotConfigured,
    /// An attribute has no wgpu vertex format equivalent.
    UnsupportedVertexFormat {
        semantic: VertexAttributeSemantic,
        format: VertexAttributeFormat,
        dimension: u8,
    },
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InitializationFailed(msg) => write!(f, "initialization failed: {msg}"),
            Self::NotConfigured => write!(f, "mesh has no vertex layout yet"),
            Self::UnsupportedVertexFormat {
                semantic,
                format,
                dimension,
            } => write!(
                f,
                "{semantic:?} stored as {format:?} x {dimension} has no wgpu vertex format"
            ),
        }
    }
}

impl std::error::Error for GraphicsError {}

impl From<GraphicsError> for MeshResourceError {
    fn from(err: GraphicsError) -> Self {
        MeshResourceError::Backend(err.to_string())
    }
}
