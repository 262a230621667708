//! Planar polygon faces with cached derived geometry.

use crate::float_types::parry3d::query::Ray;
use crate::float_types::{Real, tolerance};
use crate::mesh::tessellation::{Primitive, Tessellation};
use crate::mesh::vertex::Vertex;
use nalgebra::{Point3, Vector3};
use std::sync::OnceLock;

/// The sentinel reported for faces whose leading triangle is degenerate.
/// Check with [`normal_is_valid`]; never compare against it directly.
pub fn invalid_normal() -> Vector3<Real> {
    Vector3::new(Real::NAN, 0.0, Real::NAN)
}

/// Whether `normal` is a real direction rather than the degenerate-face
/// sentinel.
pub fn normal_is_valid(normal: &Vector3<Real>) -> bool {
    normal.x.is_finite() && normal.y.is_finite() && normal.z.is_finite()
}

/// A planar (or near-planar) polygon referencing a vertex sequence plus a
/// tessellation.
///
/// The normal, plane distance, and unnormalized first-triangle cross
/// product are derived lazily and cached; mutating vertex coordinates
/// requires an explicit [`invalidate_normal`](Self::invalidate_normal).
/// A face built without a tessellation synthesizes a single fan on first
/// use.
///
/// Winding convention: corners listed counter-clockwise, seen from the side
/// the normal points toward. A unit square `(0,0,0) (1,0,0) (1,1,0)
/// (0,1,0)` has normal `+Z`.
#[derive(Debug)]
pub struct Face {
    vertices: Vec<Vertex>,
    tessellation: OnceLock<Tessellation>,
    normal: OnceLock<Vector3<Real>>,
    plane_distance: OnceLock<Real>,
    cross: OnceLock<Vector3<Real>>,
}

impl Clone for Face {
    fn clone(&self) -> Self {
        use crate::mesh::clone_cell;
        Face {
            vertices: self.vertices.clone(),
            tessellation: clone_cell(&self.tessellation),
            normal: clone_cell(&self.normal),
            plane_distance: clone_cell(&self.plane_distance),
            cross: clone_cell(&self.cross),
        }
    }
}

impl Face {
    /// Create a face over `vertices`, tessellated as a single fan on
    /// first use.
    pub fn new(vertices: Vec<Vertex>) -> Self {
        Face {
            vertices,
            tessellation: OnceLock::new(),
            normal: OnceLock::new(),
            plane_distance: OnceLock::new(),
            cross: OnceLock::new(),
        }
    }

    /// Create a face with an explicit tessellation.
    pub fn with_tessellation(vertices: Vec<Vertex>, tessellation: Tessellation) -> Self {
        let face = Face::new(vertices);
        let _ = face.tessellation.set(tessellation);
        face
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Mutable access to the vertex records. Callers that move positions
    /// must follow up with [`invalidate_normal`](Self::invalidate_normal)
    /// and the owning mesh's `invalidate`.
    pub fn vertices_mut(&mut self) -> &mut [Vertex] {
        &mut self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// The face's tessellation, synthesizing a single fan if none was
    /// supplied at construction.
    pub fn tessellation(&self) -> &Tessellation {
        self.tessellation
            .get_or_init(|| Tessellation::single_fan(self.vertices.len()))
    }

    /// Mutable tessellation access; forces the lazy fan first.
    pub fn tessellation_mut(&mut self) -> &mut Tessellation {
        self.tessellation();
        self.tessellation.get_mut().expect("initialized above")
    }

    /// The unnormalized normal of the first tessellated triangle.
    ///
    /// Its magnitude is proportional to that triangle's area, which is what
    /// the smoothing pass uses as an averaging weight. Zero when the face
    /// is degenerate.
    pub fn cross(&self) -> Vector3<Real> {
        *self.cross.get_or_init(|| {
            let Some([v0, v1, v2]) = self
                .tessellation()
                .primitives()
                .first()
                .and_then(Primitive::leading_triple)
            else {
                return Vector3::zeros();
            };
            let n = self.vertices.len();
            if v0 >= n || v1 >= n || v2 >= n {
                return Vector3::zeros();
            }
            let p0 = self.vertices[v0].position;
            let p1 = self.vertices[v1].position;
            let p2 = self.vertices[v2].position;
            (p2 - p1).cross(&(p0 - p1))
        })
    }

    /// The face normal, derived from the first tessellation primitive's
    /// leading vertex triple and cached.
    ///
    /// Degenerate faces (zero-length cross product) report the
    /// [`invalid_normal`] sentinel instead of failing; callers check with
    /// [`normal_is_valid`]. Deliberately, only the *first* primitive is
    /// consulted: a face whose first primitive is degenerate reports an
    /// invalid normal even when later primitives are sound.
    pub fn normal(&self) -> Vector3<Real> {
        *self.normal.get_or_init(|| {
            let cross = self.cross();
            let length = cross.norm();
            if length > 0.0 {
                cross / length
            } else {
                invalid_normal()
            }
        })
    }

    /// Signed distance of the face's plane from the origin along the
    /// normal; NaN for degenerate faces.
    pub fn plane_distance(&self) -> Real {
        *self.plane_distance.get_or_init(|| {
            let normal = self.normal();
            if !normal_is_valid(&normal) {
                return Real::NAN;
            }
            match self.vertices.first() {
                Some(first) => normal.dot(&first.position.coords),
                None => Real::NAN,
            }
        })
    }

    /// The normal at vertex `i`: the explicit per-vertex normal if one is
    /// set, else the face normal — which is then written back onto the
    /// vertex so later calls and renderers see a stable value.
    ///
    /// # Panics
    /// Panics if `i` is out of range.
    pub fn vertex_normal(&mut self, i: usize) -> Vector3<Real> {
        if let Some(normal) = self.vertices[i].normal {
            return normal;
        }
        let fallback = self.normal();
        self.vertices[i].normal = Some(fallback);
        fallback
    }

    /// Intersect a ray with this face.
    ///
    /// The ray is cut against the face's plane; a plane hit counts only if
    /// it lies inside at least one triangle of the expanded tessellation.
    /// Hits behind the ray origin are discarded. Cost is linear in the
    /// triangle count; callers pre-filter with bounding volumes.
    pub fn intersect(&self, ray: &Ray) -> Option<Point3<Real>> {
        let normal = self.normal();
        if !normal_is_valid(&normal) {
            return None;
        }
        let denominator = normal.dot(&ray.dir);
        if denominator.abs() < tolerance() {
            return None;
        }
        let t = (self.plane_distance() - normal.dot(&ray.origin.coords)) / denominator;
        if t < 0.0 {
            return None;
        }
        let hit = ray.origin + ray.dir * t;

        let n = self.vertices.len();
        for [a, b, c] in self.tessellation().triangles() {
            if a >= n || b >= n || c >= n {
                continue;
            }
            if point_in_triangle(
                &hit,
                &self.vertices[a].position,
                &self.vertices[b].position,
                &self.vertices[c].position,
                &normal,
            ) {
                return Some(hit);
            }
        }
        None
    }

    /// Drop the cached normal, plane distance, and cross product. Must be
    /// called after mutating vertex coordinates.
    pub fn invalidate_normal(&mut self) {
        self.normal = OnceLock::new();
        self.plane_distance = OnceLock::new();
        self.cross = OnceLock::new();
    }

    /// Reverse the face's orientation.
    ///
    /// The vertex list keeps its order; the tessellation primitives are
    /// rewound (converted to a triangle list with swapped winding), outline
    /// loops are reversed, per-vertex normals are negated, and the cached
    /// derived geometry is dropped.
    pub fn flip(&mut self) {
        let rewound: Vec<usize> = self
            .tessellation()
            .triangles()
            .into_iter()
            .flat_map(|[a, b, c]| [a, c, b])
            .collect();
        let outlines: Vec<Vec<usize>> = self
            .tessellation()
            .outlines()
            .iter()
            .map(|outline| outline.iter().rev().copied().collect())
            .collect();
        self.tessellation = OnceLock::new();
        let _ = self
            .tessellation
            .set(Tessellation::new(outlines, vec![Primitive::TriangleList(rewound)]));
        for vertex in &mut self.vertices {
            vertex.flip();
        }
        self.invalidate_normal();
    }
}

/// Point-in-triangle membership by edge sign tests projected onto the face
/// normal. Accepts either consistent orientation so flipped tessellations
/// keep working.
fn point_in_triangle(
    point: &Point3<Real>,
    a: &Point3<Real>,
    b: &Point3<Real>,
    c: &Point3<Real>,
    normal: &Vector3<Real>,
) -> bool {
    let tol = tolerance();
    let sign_ab = (b - a).cross(&(point - a)).dot(normal);
    let sign_bc = (c - b).cross(&(point - b)).dot(normal);
    let sign_ca = (a - c).cross(&(point - c)).dot(normal);
    let all_non_negative = sign_ab >= -tol && sign_bc >= -tol && sign_ca >= -tol;
    let all_non_positive = sign_ab <= tol && sign_bc <= tol && sign_ca <= tol;
    all_non_negative || all_non_positive
}
