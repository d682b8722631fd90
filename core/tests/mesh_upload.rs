//! Upload reconciliation against a resource that records every call.

use std::sync::Arc;

use beaumesh_core::math::{Vec3, mat4_from_scale_rotation_translation, quat_from_rotation_z};
use beaumesh_core::mesh::{
    Aabb, CpuMesh, IndexFormat, LayoutRegistry, MeshData16, MeshData32, MeshDataDescriptor,
    MeshError, MeshResource, MeshResourceError, PrimitiveTopology, SubMeshDescriptor, UploadFlags,
    UploadTarget, Vertex, VertexLayout,
};

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable, Vertex)]
struct LitVertex {
    #[vertex(position)]
    position: [f32; 3],
    #[vertex(normal)]
    normal: [f32; 3],
    #[vertex(tangent)]
    tangent: [f32; 4],
}

fn lit(x: f32, y: f32) -> LitVertex {
    LitVertex {
        position: [x, y, 0.0],
        normal: [0.0, 0.0, 1.0],
        tangent: [1.0, 0.0, 0.0, -1.0],
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    VertexParams(u32),
    VertexData(usize),
    IndexParams(IndexFormat, u32),
    IndexData(usize),
    SubMesh(SubMeshDescriptor),
    Bounds(Aabb),
    Finalize(bool),
}

#[derive(Default)]
struct Recorder {
    vertex_count: u32,
    calls: Vec<Call>,
    fail_index_data: bool,
}

impl Recorder {
    fn take(&mut self) -> Vec<Call> {
        std::mem::take(&mut self.calls)
    }
}

impl MeshResource for Recorder {
    fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    fn set_vertex_buffer_params(
        &mut self,
        _layout: &Arc<VertexLayout>,
        vertex_count: u32,
    ) -> Result<(), MeshResourceError> {
        self.vertex_count = vertex_count;
        self.calls.push(Call::VertexParams(vertex_count));
        Ok(())
    }

    fn set_vertex_buffer_data(&mut self, data: &[u8]) -> Result<(), MeshResourceError> {
        self.calls.push(Call::VertexData(data.len()));
        Ok(())
    }

    fn set_index_buffer_params(
        &mut self,
        format: IndexFormat,
        index_count: u32,
    ) -> Result<(), MeshResourceError> {
        self.calls.push(Call::IndexParams(format, index_count));
        Ok(())
    }

    fn set_index_buffer_data(&mut self, data: &[u8]) -> Result<(), MeshResourceError> {
        if std::mem::take(&mut self.fail_index_data) {
            return Err(MeshResourceError::Backend("device lost".into()));
        }
        self.calls.push(Call::IndexData(data.len()));
        Ok(())
    }

    fn set_submesh(&mut self, submesh: SubMeshDescriptor) -> Result<(), MeshResourceError> {
        self.calls.push(Call::SubMesh(submesh));
        Ok(())
    }

    fn set_bounds(&mut self, bounds: Aabb) {
        self.calls.push(Call::Bounds(bounds));
    }

    fn finalize(&mut self, no_longer_readable: bool) -> Result<(), MeshResourceError> {
        self.calls.push(Call::Finalize(no_longer_readable));
        Ok(())
    }
}

fn quad_mesh(registry: &LayoutRegistry) -> MeshData16<LitVertex> {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut mesh =
        MeshData16::new(registry, 16, 24, PrimitiveTopology::TriangleList, true).unwrap();
    mesh.add_quad(lit(0.0, 0.0), lit(1.0, 0.0), lit(0.0, 1.0), lit(1.0, 1.0))
        .unwrap();
    mesh
}

fn submesh(index_count: u32) -> SubMeshDescriptor {
    SubMeshDescriptor {
        index_start: 0,
        index_count,
        base_vertex: 0,
        topology: PrimitiveTopology::TriangleList,
    }
}

#[test]
fn first_upload_sets_everything_in_order() {
    let registry = LayoutRegistry::new();
    let mesh = quad_mesh(&registry);
    let mut target = UploadTarget::new();
    let mut recorder = Recorder::default();

    let report = mesh
        .upload(&mut target, &mut recorder, UploadFlags::SKIP_UNCHANGED_INDEX_PARAMS)
        .unwrap();

    assert!(report.vertex_params && report.index_params && report.submesh && report.bounds);
    assert_eq!(
        recorder.take(),
        vec![
            Call::VertexParams(4),
            Call::VertexData(4 * 40),
            Call::IndexParams(IndexFormat::Uint16, 6),
            Call::IndexData(12),
            Call::SubMesh(submesh(6)),
            Call::Bounds(Aabb {
                min: Vec3::new(0.0, 0.0, 0.0),
                max: Vec3::new(1.0, 1.0, 0.0),
            }),
            Call::Finalize(false),
        ]
    );
    assert_eq!(target.index_count(), 6);
    assert_eq!(target.index_format(), Some(IndexFormat::Uint16));
    assert_eq!(target.layout_hash(), Some(mesh.layout().layout_hash()));
}

#[test]
fn unchanged_upload_only_writes_payload() {
    let registry = LayoutRegistry::new();
    let mesh = quad_mesh(&registry);
    let mut target = UploadTarget::new();
    let mut recorder = Recorder::default();
    let flags = UploadFlags::SKIP_UNCHANGED_INDEX_PARAMS | UploadFlags::DONT_RECALCULATE_BOUNDS;

    mesh.upload(&mut target, &mut recorder, flags).unwrap();
    recorder.take();
    let report = mesh.upload(&mut target, &mut recorder, flags).unwrap();

    assert!(!report.vertex_params && !report.index_params && !report.submesh && !report.bounds);
    assert_eq!(
        recorder.take(),
        vec![
            Call::VertexData(160),
            Call::IndexData(12),
            Call::Finalize(false),
        ]
    );
}

#[test]
fn without_skip_flag_index_params_are_reissued() {
    let registry = LayoutRegistry::new();
    let mesh = quad_mesh(&registry);
    let mut target = UploadTarget::new();
    let mut recorder = Recorder::default();

    mesh.upload(&mut target, &mut recorder, UploadFlags::empty()).unwrap();
    recorder.take();
    let report = mesh
        .upload(&mut target, &mut recorder, UploadFlags::DONT_RECALCULATE_BOUNDS)
        .unwrap();

    assert!(!report.vertex_params);
    assert!(report.index_params && report.submesh);
}

#[test]
fn grown_mesh_reissues_vertex_and_index_params() {
    let registry = LayoutRegistry::new();
    let mut mesh = quad_mesh(&registry);
    let mut target = UploadTarget::new();
    let mut recorder = Recorder::default();
    let flags = UploadFlags::SKIP_UNCHANGED_INDEX_PARAMS | UploadFlags::DONT_RECALCULATE_BOUNDS;

    mesh.upload(&mut target, &mut recorder, flags).unwrap();
    recorder.take();
    mesh.add_triangle(lit(2.0, 0.0), lit(3.0, 0.0), lit(2.0, 1.0))
        .unwrap();
    mesh.upload(&mut target, &mut recorder, flags).unwrap();

    assert_eq!(
        recorder.take(),
        vec![
            Call::VertexParams(7),
            Call::VertexData(7 * 40),
            Call::IndexParams(IndexFormat::Uint16, 9),
            Call::IndexData(18),
            Call::SubMesh(submesh(9)),
            Call::Finalize(false),
        ]
    );
}

#[test]
fn new_target_forces_vertex_params() {
    let registry = LayoutRegistry::new();
    let mesh = quad_mesh(&registry);
    let mut recorder = Recorder::default();
    let flags = UploadFlags::SKIP_UNCHANGED_INDEX_PARAMS;

    let mut target = UploadTarget::new();
    mesh.upload(&mut target, &mut recorder, flags).unwrap();
    target.reset();
    let report = mesh.upload(&mut target, &mut recorder, flags).unwrap();

    assert!(report.vertex_params && report.index_params && report.submesh);
}

#[test]
fn cleared_mesh_uploads_empty_payload() {
    let registry = LayoutRegistry::new();
    let mut mesh = quad_mesh(&registry);
    let mut target = UploadTarget::new();
    let mut recorder = Recorder::default();

    mesh.upload(&mut target, &mut recorder, UploadFlags::SKIP_UNCHANGED_INDEX_PARAMS)
        .unwrap();
    recorder.take();
    mesh.clear();
    let report = mesh
        .upload(&mut target, &mut recorder, UploadFlags::SKIP_UNCHANGED_INDEX_PARAMS)
        .unwrap();

    assert!(!report.bounds);
    assert_eq!(
        recorder.take(),
        vec![
            Call::VertexParams(0),
            Call::VertexData(0),
            Call::IndexParams(IndexFormat::Uint16, 0),
            Call::IndexData(0),
            Call::SubMesh(submesh(0)),
            Call::Finalize(false),
        ]
    );
}

#[test]
fn no_longer_readable_is_sticky() {
    let registry = LayoutRegistry::new();
    let mesh = quad_mesh(&registry);
    let mut target = UploadTarget::new();
    let mut cpu = CpuMesh::new();

    mesh.upload(&mut target, &mut cpu, UploadFlags::MARK_NO_LONGER_READABLE)
        .unwrap();
    assert!(!cpu.is_readable());
    assert!(cpu.vertex_data().is_none());

    mesh.upload(&mut target, &mut cpu, UploadFlags::empty()).unwrap();
    assert!(!cpu.is_readable());
    assert_eq!(cpu.vertex_count(), 4);
}

#[test]
fn transform_then_upload_moves_bounds() {
    let registry = LayoutRegistry::new();
    let mut mesh = MeshData32::<LitVertex>::from_descriptor(
        &registry,
        &MeshDataDescriptor::new(8, 12).with_label("rotated"),
    )
    .unwrap();
    let range = mesh
        .add_quad(lit(0.0, 0.0), lit(1.0, 0.0), lit(0.0, 1.0), lit(1.0, 1.0))
        .unwrap();

    let matrix = mat4_from_scale_rotation_translation(
        Vec3::new(2.0, 2.0, 2.0),
        quat_from_rotation_z(std::f32::consts::FRAC_PI_2),
        Vec3::new(0.0, 0.0, 3.0),
    );
    mesh.transform(range, &matrix).unwrap();

    let moved = mesh.vertex(1).unwrap();
    assert!((moved.position[0] - 0.0).abs() < 1e-5);
    assert!((moved.position[1] - 2.0).abs() < 1e-5);
    assert!((moved.position[2] - 3.0).abs() < 1e-5);
    // Normals get the linear part only and are not renormalized.
    assert!((moved.normal[2] - 2.0).abs() < 1e-5);
    // Tangent handedness is untouched.
    assert_eq!(moved.tangent[3], -1.0);
    assert!((moved.tangent[1] - 2.0).abs() < 1e-5);

    let cpu = mesh.to_cpu_mesh().unwrap();
    let bounds = cpu.bounds().unwrap();
    assert!((bounds.min.x + 2.0).abs() < 1e-5);
    assert!((bounds.max.y - 2.0).abs() < 1e-5);
    assert!((bounds.min.z - 3.0).abs() < 1e-5);
}

#[test]
fn transform_rejects_non_float_position() {
    #[repr(C)]
    #[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable, Vertex)]
    struct Packed {
        #[vertex(position, format = "snorm16")]
        position: [i16; 4],
    }

    let registry = LayoutRegistry::new();
    let mut mesh = MeshData16::<Packed>::new(&registry, 4, 4, PrimitiveTopology::PointList, true)
        .unwrap();
    let range = mesh.add_vertices(&[Packed { position: [0; 4] }]).unwrap();

    let err = mesh
        .transform(range, &beaumesh_core::math::Mat4::identity())
        .unwrap_err();
    assert!(matches!(err, MeshError::Transform(_)));
}

#[test]
fn resource_vertex_count_is_compared() {
    let registry = LayoutRegistry::new();
    let mut cpu = CpuMesh::new();
    let mut target = UploadTarget::new();
    let flags = UploadFlags::SKIP_UNCHANGED_INDEX_PARAMS;

    quad_mesh(&registry).upload(&mut target, &mut cpu, flags).unwrap();

    let mut other = quad_mesh(&registry);
    other
        .add_triangle(lit(0.0, 0.0), lit(1.0, 0.0), lit(0.0, 1.0))
        .unwrap();
    let report = other.upload(&mut target, &mut cpu, flags).unwrap();

    assert!(report.vertex_params);
    assert_eq!(cpu.vertex_count(), 7);
    assert_eq!(cpu.indices_u32(), Some(vec![0, 1, 2, 2, 3, 1, 4, 5, 6]));
}

#[test]
fn resource_failure_resets_target() {
    let registry = LayoutRegistry::new();
    let mesh = quad_mesh(&registry);
    let mut target = UploadTarget::new();
    let mut recorder = Recorder::default();
    mesh.upload(&mut target, &mut recorder, UploadFlags::SKIP_UNCHANGED_INDEX_PARAMS)
        .unwrap();
    assert_ne!(target, UploadTarget::new());

    recorder.fail_index_data = true;
    let err = mesh
        .upload(&mut target, &mut recorder, UploadFlags::SKIP_UNCHANGED_INDEX_PARAMS)
        .unwrap_err();

    assert_eq!(
        err,
        MeshError::Resource(MeshResourceError::Backend("device lost".into()))
    );
    assert_eq!(target, UploadTarget::new());
}

#[test]
fn upload_after_failure_reissues_index_params() {
    let registry = LayoutRegistry::new();
    let mut mesh = quad_mesh(&registry);
    let mut target = UploadTarget::new();
    let mut recorder = Recorder::default();
    let flags = UploadFlags::SKIP_UNCHANGED_INDEX_PARAMS;
    mesh.upload(&mut target, &mut recorder, flags).unwrap();

    // 9 indices reach the resource's params, but the data write fails.
    mesh.add_triangle(lit(2.0, 0.0), lit(3.0, 0.0), lit(2.0, 1.0))
        .unwrap();
    recorder.fail_index_data = true;
    recorder.take();
    assert!(mesh.upload(&mut target, &mut recorder, flags).is_err());
    assert!(
        recorder
            .take()
            .contains(&Call::IndexParams(IndexFormat::Uint16, 9))
    );

    // Back to the shape the target last recorded before the failure.
    mesh.clear();
    mesh.add_quad(lit(0.0, 0.0), lit(1.0, 0.0), lit(0.0, 1.0), lit(1.0, 1.0))
        .unwrap();
    let report = mesh.upload(&mut target, &mut recorder, flags).unwrap();

    assert!(report.index_params);
    assert!(report.submesh);
    let calls = recorder.take();
    assert!(calls.contains(&Call::IndexParams(IndexFormat::Uint16, 6)));
    assert!(calls.contains(&Call::IndexData(12)));
    assert!(calls.contains(&Call::SubMesh(submesh(6))));
}

#[test]
fn layout_is_memoized_across_uploads() {
    let registry = LayoutRegistry::new();
    let mesh = quad_mesh(&registry);
    let mut cpu = CpuMesh::new();
    mesh.upload(&mut UploadTarget::new(), &mut cpu, UploadFlags::empty())
        .unwrap();

    let again = registry.layout_of::<LitVertex>().unwrap();
    assert!(Arc::ptr_eq(mesh.layout(), &again));
    assert!(Arc::ptr_eq(cpu.layout().unwrap(), &again));
    assert_eq!(registry.len(), 1);
}
