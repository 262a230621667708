//! Per-face vertex records.

use crate::float_types::Real;
use nalgebra::{Point2, Point3, Vector3};

/// A vertex as one face sees it.
///
/// The coordinate is a copy of the pooled point, kept locally so parametric
/// deformation can move faces independently; `pool_index` ties the record
/// back to the owning mesh's [`VertexPool`](crate::mesh::VertexPool). The
/// texture coordinate defaults to NaN, meaning "unset". The normal is
/// optional; when absent the face normal stands in (see
/// [`Face::vertex_normal`](crate::mesh::Face::vertex_normal)).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<Real>,
    pub pool_index: usize,
    pub uv: Point2<Real>,
    pub normal: Option<Vector3<Real>>,
}

impl Vertex {
    /// Create a vertex with unset texture coordinates and no normal.
    pub fn new(position: Point3<Real>, pool_index: usize) -> Self {
        Vertex {
            position,
            pool_index,
            uv: Point2::new(Real::NAN, Real::NAN),
            normal: None,
        }
    }

    /// Create a vertex carrying texture coordinates.
    pub fn with_uv(position: Point3<Real>, pool_index: usize, uv: Point2<Real>) -> Self {
        Vertex {
            position,
            pool_index,
            uv,
            normal: None,
        }
    }

    /// Whether the texture coordinate has been assigned.
    pub fn has_uv(&self) -> bool {
        !self.uv.x.is_nan() && !self.uv.y.is_nan()
    }

    /// Flip the vertex normal in place, if one is set.
    pub fn flip(&mut self) {
        if let Some(normal) = self.normal.as_mut() {
            *normal = -*normal;
        }
    }
}
