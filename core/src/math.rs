//! Math type aliases and the affine helpers the mesh transform pass uses.

pub use nalgebra;

/// 2D vector (f32).
pub type Vec2 = nalgebra::Vector2<f32>;

/// 3D vector (f32).
pub type Vec3 = nalgebra::Vector3<f32>;

/// 4D vector (f32).
pub type Vec4 = nalgebra::Vector4<f32>;

/// 3D point (f32).
pub type Point3 = nalgebra::Point3<f32>;

/// 4x4 matrix (f32), column vectors, translation in the last column.
pub type Mat4 = nalgebra::Matrix4<f32>;

/// Unit quaternion (f32).
pub type Quat = nalgebra::UnitQuaternion<f32>;

/// Build a 4x4 TRS matrix from scale, rotation, and translation.
pub fn mat4_from_scale_rotation_translation(scale: Vec3, rotation: Quat, translation: Vec3) -> Mat4 {
    Mat4::new_translation(&translation)
        * rotation.to_homogeneous()
        * Mat4::new_nonuniform_scaling(&scale)
}

/// Build a translation-only 4x4 matrix.
pub fn mat4_from_translation(t: Vec3) -> Mat4 {
    Mat4::new_translation(&t)
}

/// Rotation of `angle` radians around the Z axis.
pub fn quat_from_rotation_z(angle: f32) -> Quat {
    Quat::from_axis_angle(&Vec3::z_axis(), angle)
}

/// Apply the full affine transform to a point.
pub fn transform_point3(m: &Mat4, p: [f32; 3]) -> [f32; 3] {
    let out = m.transform_point(&Point3::new(p[0], p[1], p[2]));
    [out.x, out.y, out.z]
}

/// Apply only the linear part of the transform to a direction.
pub fn transform_vector3(m: &Mat4, v: [f32; 3]) -> [f32; 3] {
    let out = m.transform_vector(&Vec3::new(v[0], v[1], v[2]));
    [out.x, out.y, out.z]
}
