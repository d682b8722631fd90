//! GPU integration tests for `GpuMesh`.
//!
//! These tests need a wgpu adapter. When none is available they log and
//! return early instead of failing.
//!
//! ```bash
//! cargo test -p beaumesh-graphics --test gpu_mesh_tests
//! ```

use rstest::rstest;

use beaumesh_graphics::mesh::{
    LayoutRegistry, MeshData16, MeshData32, MeshResource, MeshResourceError, PrimitiveTopology,
    UploadFlags, UploadTarget, Vertex,
};
use beaumesh_graphics::{GpuMesh, GraphicsError, WgpuContext};

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Vertex)]
struct UiVertex {
    #[vertex(position)]
    position: [f32; 3],
    #[vertex(color, format = "unorm8")]
    color: [u8; 4],
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Vertex)]
struct HalfVertex {
    #[vertex(position, format = "float16")]
    position: [u16; 3],
}

fn ui(x: f32, y: f32) -> UiVertex {
    UiVertex {
        position: [x, y, 0.0],
        color: [255, 0, 0, 255],
    }
}

fn context() -> Option<WgpuContext> {
    let _ = env_logger::builder().is_test(true).try_init();
    match WgpuContext::new() {
        Ok(context) => Some(context),
        Err(err) => {
            eprintln!("No wgpu adapter ({err}), skipping");
            None
        }
    }
}

#[test]
fn test_upload_creates_buffers() {
    let Some(context) = context() else {
        return;
    };
    let registry = LayoutRegistry::new();
    let mut mesh =
        MeshData16::<UiVertex>::new(&registry, 8, 12, PrimitiveTopology::TriangleList, true)
            .unwrap();
    mesh.add_quad(ui(0.0, 0.0), ui(1.0, 0.0), ui(0.0, 1.0), ui(1.0, 1.0))
        .unwrap();

    let mut gpu = GpuMesh::new(&context, "quad");
    let mut target = UploadTarget::new();
    mesh.upload(&mut target, &mut gpu, UploadFlags::SKIP_UNCHANGED_INDEX_PARAMS)
        .unwrap();

    assert_eq!(gpu.vertex_count(), 4);
    assert_eq!(gpu.index_count(), 6);
    assert_eq!(gpu.index_format(), Some(wgpu::IndexFormat::Uint16));
    assert_eq!(gpu.vertex_buffer().unwrap().size(), 64);
    assert_eq!(gpu.index_buffer().unwrap().size(), 12);
    assert_eq!(gpu.vertex_data().unwrap().len(), 64);
    assert!(gpu.bounds().is_some());
    assert_eq!(gpu.array_stride(), Some(16));

    let attributes = gpu.vertex_attributes().unwrap();
    assert_eq!(attributes.len(), 2);
    assert_eq!(attributes[1].format, wgpu::VertexFormat::Unorm8x4);
    assert_eq!(attributes[1].offset, 12);
    assert_eq!(attributes[1].shader_location, 3);
}

#[test]
fn test_buffers_only_grow() {
    let Some(context) = context() else {
        return;
    };
    let registry = LayoutRegistry::new();
    let mut mesh =
        MeshData32::<UiVertex>::new(&registry, 8, 12, PrimitiveTopology::TriangleList, true)
            .unwrap();
    let mut gpu = GpuMesh::new(&context, "growing");
    let mut target = UploadTarget::new();

    for _ in 0..4 {
        mesh.add_quad(ui(0.0, 0.0), ui(1.0, 0.0), ui(0.0, 1.0), ui(1.0, 1.0))
            .unwrap();
    }
    mesh.upload(&mut target, &mut gpu, UploadFlags::empty()).unwrap();
    assert_eq!(gpu.vertex_buffer().unwrap().size(), 16 * 16);

    mesh.clear();
    mesh.add_triangle(ui(0.0, 0.0), ui(1.0, 0.0), ui(0.0, 1.0))
        .unwrap();
    mesh.upload(&mut target, &mut gpu, UploadFlags::empty()).unwrap();

    assert_eq!(gpu.vertex_count(), 3);
    assert_eq!(gpu.vertex_buffer().unwrap().size(), 16 * 16);
    assert_eq!(gpu.index_buffer().unwrap().size(), 24 * 4);
}

#[test]
fn test_unaligned_payload_is_padded() {
    let Some(context) = context() else {
        return;
    };
    let registry = LayoutRegistry::new();
    let mut mesh =
        MeshData16::<HalfVertex>::new(&registry, 4, 4, PrimitiveTopology::TriangleList, true)
            .unwrap();
    mesh.add_triangle(
        HalfVertex { position: [0; 3] },
        HalfVertex { position: [1; 3] },
        HalfVertex { position: [2; 3] },
    )
    .unwrap();

    let mut gpu = GpuMesh::new(&context, "half");
    mesh.upload(&mut UploadTarget::new(), &mut gpu, UploadFlags::empty())
        .unwrap();

    assert_eq!(gpu.vertex_buffer().unwrap().size(), 20);
    assert_eq!(gpu.index_buffer().unwrap().size(), 8);
    assert_eq!(gpu.vertex_data().unwrap().len(), 18);
    // Half-float positions have no computable bounds.
    assert!(gpu.bounds().is_none());
    assert!(matches!(
        gpu.vertex_attributes(),
        Err(GraphicsError::UnsupportedVertexFormat { dimension: 3, .. })
    ));
}

#[rstest]
#[case(true, false)]
#[case(false, true)]
fn test_no_longer_readable(#[case] mark: bool, #[case] readable: bool) {
    let Some(context) = context() else {
        return;
    };
    let registry = LayoutRegistry::new();
    let mut mesh =
        MeshData16::<UiVertex>::new(&registry, 4, 6, PrimitiveTopology::TriangleList, true)
            .unwrap();
    mesh.add_triangle(ui(0.0, 0.0), ui(1.0, 0.0), ui(0.0, 1.0))
        .unwrap();

    let flags = if mark {
        UploadFlags::MARK_NO_LONGER_READABLE
    } else {
        UploadFlags::empty()
    };
    let mut gpu = GpuMesh::new(&context, "readable");
    mesh.upload(&mut UploadTarget::new(), &mut gpu, flags).unwrap();

    assert_eq!(gpu.is_readable(), readable);
    assert_eq!(gpu.vertex_data().is_some(), readable);
    assert_eq!(gpu.index_data().is_some(), readable);
}

#[test]
fn test_size_mismatch_is_rejected() {
    let Some(context) = context() else {
        return;
    };
    let mut gpu = GpuMesh::new(&context, "unconfigured");

    let err = gpu.set_vertex_buffer_data(&[0u8; 16]).unwrap_err();
    assert_eq!(
        err,
        MeshResourceError::SizeMismatch {
            buffer: "vertex",
            expected: 0,
            actual: 16
        }
    );
    assert_eq!(
        gpu.vertex_attributes().unwrap_err(),
        GraphicsError::NotConfigured
    );
}
