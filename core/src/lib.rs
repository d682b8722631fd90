//! # BeauMesh Core
//!
//! CPU-side interleaved mesh building: vertex layouts derived from tagged
//! record types, growable vertex/index buffers, and upload to a pluggable
//! [`mesh::MeshResource`].

// Lets `#[derive(Vertex)]` expand to `::beaumesh_core::...` paths inside this crate.
extern crate self as beaumesh_core;

pub mod math;
pub mod mesh;
pub mod profiling;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
