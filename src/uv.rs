//! Texture-coordinate generation boundary.

use crate::appearance::Appearance;
use crate::float_types::Real;
use nalgebra::{Point2, Point3, Vector3};

/// Generates texture coordinates for points being added to a mesh.
///
/// The [`MeshBuilder`](crate::builder::MeshBuilder) calls an implementation
/// once per face, during face construction; the mapper is treated as pure
/// and never observes or mutates the mesh itself.
pub trait UvMapper {
    /// Produce one `(u, v)` pair per input point, in order.
    ///
    /// * `appearance` – the face's appearance, for its image dimensions.
    /// * `points` – the face's corner coordinates.
    /// * `indices` – the pooled vertex indices, when the caller already
    ///   resolved them.
    /// * `normal` – the face normal, when already known.
    /// * `flip` – mirror the texture direction.
    fn texture_coordinates(
        &self,
        appearance: &Appearance,
        points: &[Point3<Real>],
        indices: Option<&[usize]>,
        normal: Option<&Vector3<Real>>,
        flip: bool,
    ) -> Vec<Point2<Real>>;
}
