//! Collision testing between transformed meshes.
//!
//! Two phases: an oriented-bounding-box pre-filter, then an exact
//! triangle-pair test over lazily built collision structures. Meshes that
//! were built as whole solid primitives short-circuit through specialized
//! tests before either phase runs.

use crate::float_types::parry3d::bounding_volume::{Aabb, BoundingVolume};
use crate::float_types::parry3d::query;
use crate::float_types::parry3d::shape::Triangle;
use crate::float_types::{EPSILON, Real};
use crate::mesh::Mesh;
use crate::scene::Node;
use nalgebra::{Isometry3, Matrix3, Matrix4, Point3, Vector3};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// The solid primitive a mesh was built as, in its own local frame.
///
/// Recorded by the builder's whole-mesh primitive constructors and cleared
/// as soon as further geometry is appended; collision fast paths dispatch
/// on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Solid {
    /// An axis-aligned box.
    Box(Aabb),
    /// A sphere.
    Sphere {
        center: Point3<Real>,
        radius: Real,
    },
    /// A cylinder around the local Z axis spanning `bottom..top`.
    Cylinder {
        radius: Real,
        bottom: Real,
        top: Real,
        bottom_cap: bool,
        top_cap: bool,
    },
}

impl Solid {
    /// Whether the primitive encloses a volume: a cylinder needs both end
    /// caps before containment short-circuits may treat it as solid.
    pub fn is_closed(&self) -> bool {
        match self {
            Solid::Box(_) | Solid::Sphere { .. } => true,
            Solid::Cylinder {
                bottom_cap,
                top_cap,
                ..
            } => *bottom_cap && *top_cap,
        }
    }
}

/// The triangle-level collision structure of one mesh.
///
/// Built from the full triangulation of all face groups, each triangle
/// retaining its originating per-face vertex positions; rebuilt whenever
/// the mesh's vertex data is invalidated.
#[derive(Debug, Clone, Default)]
pub struct CollisionStructure {
    triangles: Vec<Triangle>,
    bounds: Vec<Aabb>,
}

impl CollisionStructure {
    pub fn build(mesh: &Mesh) -> Self {
        let mut triangles = Vec::new();
        let mut bounds = Vec::new();
        for group in mesh.face_groups() {
            for face in group.faces() {
                let vertices = face.vertices();
                for [a, b, c] in face.tessellation().triangles() {
                    if a >= vertices.len() || b >= vertices.len() || c >= vertices.len() {
                        continue;
                    }
                    let pa = vertices[a].position;
                    let pb = vertices[b].position;
                    let pc = vertices[c].position;
                    // Zero-area triangles cannot contribute a contact.
                    if (pb - pa).cross(&(pc - pa)).norm_squared() <= EPSILON * EPSILON {
                        continue;
                    }
                    bounds.push(triangle_aabb(&pa, &pb, &pc));
                    triangles.push(Triangle::new(pa, pb, pc));
                }
            }
        }
        CollisionStructure { triangles, bounds }
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }
}

fn triangle_aabb(a: &Point3<Real>, b: &Point3<Real>, c: &Point3<Real>) -> Aabb {
    let mins = Point3::new(
        a.x.min(b.x).min(c.x),
        a.y.min(b.y).min(c.y),
        a.z.min(b.z).min(c.z),
    );
    let maxs = Point3::new(
        a.x.max(b.x).max(c.x),
        a.y.max(b.y).max(c.y),
        a.z.max(b.z).max(c.z),
    );
    Aabb::new(mins, maxs)
}

/// Exact collision test between two meshes, given the rigid transform
/// from `b`'s frame into `a`'s frame.
pub fn meshes_collide(a: &Mesh, b_to_a: &Matrix4<Real>, b: &Mesh) -> bool {
    if let Some(decided) = primitive_fast_path(a, b_to_a, b) {
        return decided;
    }

    let (Some(bounds_a), Some(bounds_b)) = (a.bounding_box(), b.bounding_box()) else {
        return false;
    };
    if !obb_intersects(&bounds_a, b_to_a, &bounds_b) {
        return false;
    }

    triangles_collide(a.collision_structure(), b_to_a, b.collision_structure())
}

/// Collision between two scene subtrees: every mesh leaf of `a` against
/// every mesh leaf of `b` under their accumulated world transforms. The
/// same leaf reachable from both subtrees collides with itself.
pub fn subtrees_collide(a: &Node, b: &Node) -> bool {
    let leaves_a = a.collect_meshes();
    if leaves_a.is_empty() {
        return false;
    }
    let leaves_b = b.collect_meshes();
    for (mesh_a, world_a) in &leaves_a {
        let Some(a_from_world) = world_a.try_inverse() else {
            continue;
        };
        for (mesh_b, world_b) in &leaves_b {
            let b_to_a = a_from_world * world_b;
            if meshes_collide(mesh_a, &b_to_a, mesh_b) {
                return true;
            }
        }
    }
    false
}

// ----------------------------------------------------------------------
// Primitive fast paths
// ----------------------------------------------------------------------

/// Specialized tests for common primitive pairs. `Some(result)` decides
/// the query; `None` falls through to the generic mesh-vs-mesh path.
fn primitive_fast_path(a: &Mesh, b_to_a: &Matrix4<Real>, b: &Mesh) -> Option<bool> {
    let solid_a = a.solid()?;
    let solid_b = b.solid()?;
    match (solid_a, solid_b) {
        (
            Solid::Sphere {
                center: ca,
                radius: ra,
            },
            Solid::Sphere {
                center: cb,
                radius: rb,
            },
        ) => {
            let cb_in_a = b_to_a.transform_point(&cb);
            Some((cb_in_a - ca).norm() <= ra + rb)
        },
        (Solid::Box(aabb), Solid::Sphere { center, radius }) => {
            let center_in_a = b_to_a.transform_point(&center);
            Some(sphere_touches_aabb(&center_in_a, radius, &aabb))
        },
        (Solid::Sphere { center, radius }, Solid::Box(aabb)) => {
            let a_to_b = b_to_a.try_inverse()?;
            let center_in_b = a_to_b.transform_point(&center);
            Some(sphere_touches_aabb(&center_in_b, radius, &aabb))
        },
        (Solid::Box(aabb_a), Solid::Box(aabb_b)) => {
            Some(obb_intersects(&aabb_a, b_to_a, &aabb_b))
        },
        (cylinder @ Solid::Cylinder { .. }, Solid::Sphere { center, radius }) => {
            let center_in_a = b_to_a.transform_point(&center);
            Some(sphere_touches_cylinder(&center_in_a, radius, &cylinder))
        },
        (Solid::Sphere { center, radius }, cylinder @ Solid::Cylinder { .. }) => {
            let a_to_b = b_to_a.try_inverse()?;
            let center_in_b = a_to_b.transform_point(&center);
            Some(sphere_touches_cylinder(&center_in_b, radius, &cylinder))
        },
        (cyl_a @ Solid::Cylinder { .. }, cyl_b @ Solid::Cylinder { .. }) => {
            // Containment short-circuit only, both directions, and only
            // between closed solids; anything else needs the exact path.
            if cyl_a.is_closed()
                && cyl_b.is_closed()
                && (cylinder_contains_points(&cyl_a, b_to_a, b.vertex_pool().points())
                    || b_to_a.try_inverse().is_some_and(|a_to_b| {
                        cylinder_contains_points(&cyl_b, &a_to_b, a.vertex_pool().points())
                    }))
            {
                return Some(true);
            }
            None
        },
        _ => None,
    }
}

fn sphere_touches_aabb(center: &Point3<Real>, radius: Real, aabb: &Aabb) -> bool {
    let clamped = Point3::new(
        center.x.clamp(aabb.mins.x, aabb.maxs.x),
        center.y.clamp(aabb.mins.y, aabb.maxs.y),
        center.z.clamp(aabb.mins.z, aabb.maxs.z),
    );
    (clamped - center).norm_squared() <= radius * radius
}

fn sphere_touches_cylinder(center: &Point3<Real>, radius: Real, cylinder: &Solid) -> bool {
    let Solid::Cylinder {
        radius: cylinder_radius,
        bottom,
        top,
        ..
    } = *cylinder
    else {
        return false;
    };
    let radial = center.x.hypot(center.y);
    let radial_excess = (radial - cylinder_radius).max(0.0);
    let axial_excess = (bottom - center.z).max(center.z - top).max(0.0);
    radial_excess * radial_excess + axial_excess * axial_excess <= radius * radius
}

/// Whether every point, pushed through `into_cylinder`, lies inside the
/// solid cylinder. An empty point set is not contained.
fn cylinder_contains_points(
    cylinder: &Solid,
    into_cylinder: &Matrix4<Real>,
    points: &[Point3<Real>],
) -> bool {
    let Solid::Cylinder {
        radius,
        bottom,
        top,
        ..
    } = *cylinder
    else {
        return false;
    };
    if points.is_empty() {
        return false;
    }
    points.iter().all(|p| {
        let q = into_cylinder.transform_point(p);
        q.z >= bottom && q.z <= top && q.x.hypot(q.y) <= radius
    })
}

// ----------------------------------------------------------------------
// Oriented-bounding-box separating-axis test
// ----------------------------------------------------------------------

/// Separating-axis test between `a` (axis-aligned in the reference frame)
/// and `b` (axis-aligned in its own frame, carried into the reference
/// frame by `b_to_a`). 15 candidate axes: A's three, B's three, and the
/// nine cross products.
pub fn obb_intersects(a: &Aabb, b_to_a: &Matrix4<Real>, b: &Aabb) -> bool {
    let half_a = (a.maxs - a.mins) * 0.5;
    let half_b = (b.maxs - b.mins) * 0.5;
    let center_a = Point3::from((a.mins.coords + a.maxs.coords) * 0.5);
    let center_b = Point3::from((b.mins.coords + b.maxs.coords) * 0.5);

    let rotation: Matrix3<Real> = b_to_a.fixed_view::<3, 3>(0, 0).into_owned();
    // Epsilon term keeps near-parallel edge axes from producing an
    // arithmetically null cross product that misses a real overlap.
    let abs_rotation = rotation.map(|x| x.abs() + EPSILON);

    let t: Vector3<Real> = b_to_a.transform_point(&center_b) - center_a;

    let ea = [half_a.x, half_a.y, half_a.z];
    let eb = [half_b.x, half_b.y, half_b.z];

    // A's face axes
    for i in 0..3 {
        let rb = abs_rotation[(i, 0)] * eb[0]
            + abs_rotation[(i, 1)] * eb[1]
            + abs_rotation[(i, 2)] * eb[2];
        if t[i].abs() > ea[i] + rb {
            return false;
        }
    }

    // B's face axes
    for j in 0..3 {
        let ra = abs_rotation[(0, j)] * ea[0]
            + abs_rotation[(1, j)] * ea[1]
            + abs_rotation[(2, j)] * ea[2];
        let projected =
            t[0] * rotation[(0, j)] + t[1] * rotation[(1, j)] + t[2] * rotation[(2, j)];
        if projected.abs() > ra + eb[j] {
            return false;
        }
    }

    // Cross-product axes A_i x B_j
    for i in 0..3 {
        let i1 = (i + 1) % 3;
        let i2 = (i + 2) % 3;
        for j in 0..3 {
            let j1 = (j + 1) % 3;
            let j2 = (j + 2) % 3;
            let ra = ea[i1] * abs_rotation[(i2, j)] + ea[i2] * abs_rotation[(i1, j)];
            let rb = eb[j1] * abs_rotation[(i, j2)] + eb[j2] * abs_rotation[(i, j1)];
            let projected = t[i2] * rotation[(i1, j)] - t[i1] * rotation[(i2, j)];
            if projected.abs() > ra + rb {
                return false;
            }
        }
    }

    true
}

// ----------------------------------------------------------------------
// Exact triangle phase
// ----------------------------------------------------------------------

fn transformed_triangles(
    structure: &CollisionStructure,
    transform: &Matrix4<Real>,
) -> (Vec<Triangle>, Vec<Aabb>) {
    let mut triangles = Vec::with_capacity(structure.triangles.len());
    let mut bounds = Vec::with_capacity(structure.triangles.len());
    for triangle in &structure.triangles {
        let a = transform.transform_point(&triangle.a);
        let b = transform.transform_point(&triangle.b);
        let c = transform.transform_point(&triangle.c);
        bounds.push(triangle_aabb(&a, &b, &c));
        triangles.push(Triangle::new(a, b, c));
    }
    (triangles, bounds)
}

#[cfg(not(feature = "parallel"))]
fn triangles_collide(
    a: &CollisionStructure,
    b_to_a: &Matrix4<Real>,
    b: &CollisionStructure,
) -> bool {
    let identity = Isometry3::identity();
    let (b_triangles, b_bounds) = transformed_triangles(b, b_to_a);
    a.triangles.iter().zip(&a.bounds).any(|(ta, bounds_a)| {
        b_triangles
            .iter()
            .zip(&b_bounds)
            .any(|(tb, bounds_b)| {
                bounds_a.intersects(bounds_b)
                    && query::intersection_test(&identity, ta, &identity, tb)
                        .unwrap_or(false)
            })
    })
}

#[cfg(feature = "parallel")]
fn triangles_collide(
    a: &CollisionStructure,
    b_to_a: &Matrix4<Real>,
    b: &CollisionStructure,
) -> bool {
    let (b_triangles, b_bounds) = transformed_triangles(b, b_to_a);
    a.triangles
        .par_iter()
        .zip(a.bounds.par_iter())
        .any(|(ta, bounds_a)| {
            let identity = Isometry3::identity();
            b_triangles
                .iter()
                .zip(&b_bounds)
                .any(|(tb, bounds_b)| {
                    bounds_a.intersects(bounds_b)
                        && query::intersection_test(&identity, ta, &identity, tb)
                            .unwrap_or(false)
                })
        })
}
