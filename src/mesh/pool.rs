//! Deduplicating store of vertex coordinates.

use crate::errors::GeometryError;
use crate::float_types::Real;
use hashbrown::HashMap;
use nalgebra::Point3;

/// A deduplicating store of 3D points with stable insertion-order indices.
///
/// Deduplication compares the exact bit patterns of all three components —
/// no tolerance. Callers that want two points merged must emit identical
/// floating-point values. The index space handed out here is the one every
/// per-face vertex record refers back into.
#[derive(Debug, Clone, Default)]
pub struct VertexPool {
    points: Vec<Point3<Real>>,
    index: HashMap<[u64; 3], usize>,
}

impl VertexPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `point`, inserting it if absent.
    ///
    /// The same bit-identical triplet always yields the same index; distinct
    /// triplets get strictly increasing indices in first-use order.
    pub fn index_of(&mut self, point: Point3<Real>) -> usize {
        let key = bit_key(&point);
        match self.index.get(&key) {
            Some(&existing) => existing,
            None => {
                let fresh = self.points.len();
                self.points.push(point);
                self.index.insert(key, fresh);
                fresh
            },
        }
    }

    /// Index of `point` if it is already pooled; never inserts.
    pub fn position_of(&self, point: &Point3<Real>) -> Option<usize> {
        self.index.get(&bit_key(point)).copied()
    }

    /// The point stored at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range; indices handed out by
    /// [`index_of`](Self::index_of) are always valid until a bulk replace.
    pub fn point(&self, index: usize) -> Point3<Real> {
        self.points[index]
    }

    /// All pooled points in index order.
    pub fn points(&self) -> &[Point3<Real>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Replace the whole pool.
    ///
    /// Only legal while no face references the old index space; the owning
    /// [`Mesh`](crate::mesh::Mesh) enforces that and surfaces
    /// [`GeometryError::InvalidState`] otherwise.
    pub(crate) fn set_all(&mut self, points: Vec<Point3<Real>>) {
        self.points = points;
        self.rebuild_index();
    }

    /// Replace coordinates index-for-index without changing cardinality.
    ///
    /// This is the parametric-deformation path: indices keep their meaning,
    /// only the coordinates move.
    pub(crate) fn replace_positions(
        &mut self,
        points: &[Point3<Real>],
    ) -> Result<(), GeometryError> {
        if points.len() != self.points.len() {
            return Err(GeometryError::MismatchedLength {
                expected: self.points.len(),
                got: points.len(),
            });
        }
        self.points.copy_from_slice(points);
        self.rebuild_index();
        Ok(())
    }

    /// Apply `f` to every pooled coordinate in place and rebuild the
    /// dedup index; used by whole-mesh transforms.
    pub(crate) fn map_positions(&mut self, mut f: impl FnMut(Point3<Real>) -> Point3<Real>) {
        for point in &mut self.points {
            *point = f(*point);
        }
        self.rebuild_index();
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (i, point) in self.points.iter().enumerate() {
            // First occurrence wins, preserving the dedup invariant for
            // future lookups even if a caller deformed two indices onto
            // the same coordinates.
            self.index.entry(bit_key(point)).or_insert(i);
        }
    }
}

fn bit_key(point: &Point3<Real>) -> [u64; 3] {
    [
        point.x.to_bits() as u64,
        point.y.to_bits() as u64,
        point.z.to_bits() as u64,
    ]
}
