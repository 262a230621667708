//! Test support library
//! Provides various helper functions & utilities for tests.
#![allow(dead_code)]

use nalgebra::{Point3, Vector3};
use scenemesh::float_types::Real;
use scenemesh::mesh::Mesh;

/// Quick helper to compare floating-point results with an acceptable tolerance.
pub fn approx_eq(a: Real, b: Real, eps: Real) -> bool {
    (a - b).abs() < eps
}

pub fn approx_point(a: &Point3<Real>, b: &Point3<Real>, eps: Real) -> bool {
    (a - b).norm() <= eps
}

pub fn approx_vector(a: &Vector3<Real>, b: &Vector3<Real>, eps: Real) -> bool {
    (a - b).norm() <= eps
}

/// The mesh's bounding box as `[min_x, min_y, min_z, max_x, max_y, max_z]`.
/// Panics when the mesh is empty.
pub fn bounds(mesh: &Mesh) -> [Real; 6] {
    let aabb = mesh.bounding_box().expect("mesh has vertices");
    [
        aabb.mins.x,
        aabb.mins.y,
        aabb.mins.z,
        aabb.maxs.x,
        aabb.maxs.y,
        aabb.maxs.z,
    ]
}

/// Every face normal in group order.
pub fn face_normals(mesh: &Mesh) -> Vec<Vector3<Real>> {
    mesh.face_groups()
        .iter()
        .flat_map(|g| g.faces())
        .map(|f| f.normal())
        .collect()
}
