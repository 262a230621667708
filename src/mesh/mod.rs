//! The indexed-geometry container: a shared vertex pool plus an ordered
//! list of appearance-grouped, tessellated faces, with lazily cached
//! derived state (bounding box, collision structure).

pub mod face;
pub mod group;
pub mod pool;
pub mod tessellation;
pub mod vertex;

pub use face::{Face, invalid_normal, normal_is_valid};
pub use group::FaceGroup;
pub use pool::VertexPool;
pub use tessellation::{Primitive, Tessellation};
pub use vertex::Vertex;

use crate::appearance::Appearance;
use crate::collision::{CollisionStructure, Solid};
use crate::errors::GeometryError;
use crate::float_types::Real;
use crate::float_types::parry3d::bounding_volume::Aabb;
use crate::float_types::parry3d::query::Ray;
use crate::scene::Node;
use nalgebra::{Matrix4, Point3, Vector3};
use std::sync::OnceLock;

pub(crate) fn clone_cell<T: Clone>(cell: &OnceLock<T>) -> OnceLock<T> {
    let fresh = OnceLock::new();
    if let Some(value) = cell.get() {
        let _ = fresh.set(value.clone());
    }
    fresh
}

/// A lower-detail stand-in used when a mesh's projected pixel area drops
/// below a threshold.
#[derive(Debug, Clone)]
pub struct LevelOfDetail {
    pub substitute: Box<Node>,
    pub pixel_area_threshold: Real,
}

/// One world-space ray intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Intersection point in world space.
    pub point: Point3<Real>,
    /// Distance from the ray origin.
    pub distance: Real,
    /// Index of the face group containing the hit face.
    pub group: usize,
    /// Index of the hit face within its group.
    pub face: usize,
}

/// A mesh: one [`VertexPool`] plus an ordered list of [`FaceGroup`]s.
///
/// The bounding box and collision structure are derived lazily and cached
/// together; any code that mutates vertex coordinates after construction
/// must call [`invalidate`](Self::invalidate) (the mutating methods here
/// do so themselves).
///
/// Not thread-safe for mutation: build on one thread, then share
/// read-only. Concurrent read-only queries (rays, collision) against an
/// unchanging mesh are fine.
#[derive(Debug, Default)]
pub struct Mesh {
    pool: VertexPool,
    groups: Vec<FaceGroup>,
    bounding_box: OnceLock<Option<Aabb>>,
    collision: OnceLock<CollisionStructure>,
    solid: Option<Solid>,
    level_of_detail: Option<LevelOfDetail>,
}

impl Clone for Mesh {
    fn clone(&self) -> Self {
        Mesh {
            pool: self.pool.clone(),
            groups: self.groups.clone(),
            bounding_box: clone_cell(&self.bounding_box),
            collision: clone_cell(&self.collision),
            solid: self.solid,
            level_of_detail: self.level_of_detail.clone(),
        }
    }
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Vertex pool
    // ------------------------------------------------------------------

    /// Pooled index of `point`, if it is already pooled.
    pub fn vertex_index(&self, point: &Point3<Real>) -> Option<usize> {
        self.pool.position_of(point)
    }

    /// Pooled index of `point`, inserting it if absent.
    pub fn add_vertex(&mut self, point: Point3<Real>) -> usize {
        self.invalidate();
        self.pool.index_of(point)
    }

    pub fn vertex_pool(&self) -> &VertexPool {
        &self.pool
    }

    pub fn vertex_count(&self) -> usize {
        self.pool.len()
    }

    /// Replace the vertex pool wholesale.
    ///
    /// Fails with [`GeometryError::InvalidState`] once any face references
    /// the pool; coordinates may only be bulk-replaced before geometry
    /// exists, or index-for-index through [`deform`](Self::deform).
    pub fn set_vertices(&mut self, points: Vec<Point3<Real>>) -> Result<(), GeometryError> {
        if self.has_faces() {
            return Err(GeometryError::InvalidState(
                "cannot replace pooled vertices while faces reference them".into(),
            ));
        }
        self.pool.set_all(points);
        self.invalidate();
        Ok(())
    }

    /// Parametric deformation: replace every pooled coordinate
    /// index-for-index, propagate the new coordinates into each face's
    /// vertex records, and invalidate all derived state.
    pub fn deform(&mut self, points: &[Point3<Real>]) -> Result<(), GeometryError> {
        self.pool.replace_positions(points)?;
        self.solid = None;
        let pool = &self.pool;
        for group in &mut self.groups {
            for face in group.faces_mut() {
                for vertex in face.vertices_mut() {
                    if vertex.pool_index < pool.len() {
                        vertex.position = pool.point(vertex.pool_index);
                    }
                }
                face.invalidate_normal();
            }
        }
        self.invalidate();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Face groups
    // ------------------------------------------------------------------

    /// Find or create the group matching `(appearance identity, smooth,
    /// two_sided)` and return its index.
    pub fn face_group(
        &mut self,
        appearance: &Appearance,
        smooth: bool,
        two_sided: bool,
    ) -> usize {
        if let Some(found) = self
            .groups
            .iter()
            .position(|g| g.matches(appearance, smooth, two_sided))
        {
            return found;
        }
        self.groups
            .push(FaceGroup::new(appearance.clone(), smooth, two_sided));
        self.groups.len() - 1
    }

    /// Append a group without find-or-create matching. This is the
    /// explicit-duplication path: the cylinder builder uses it to keep its
    /// two caps in separate groups.
    pub fn push_face_group(&mut self, group: FaceGroup) -> usize {
        self.groups.push(group);
        self.groups.len() - 1
    }

    /// Resolve the matching face group and append `face` to it.
    pub fn add_face(
        &mut self,
        appearance: &Appearance,
        smooth: bool,
        two_sided: bool,
        face: Face,
    ) {
        let group = self.face_group(appearance, smooth, two_sided);
        self.add_face_to_group(group, face);
    }

    /// Append `face` to the group at `group_index`.
    ///
    /// # Panics
    /// Panics if `group_index` is out of range.
    pub fn add_face_to_group(&mut self, group_index: usize, face: Face) {
        self.groups[group_index].add_face(face);
        // Extra geometry means the mesh is no longer a whole primitive;
        // the builder re-tags after it finishes a primitive construction.
        self.solid = None;
        self.invalidate();
    }

    pub fn face_groups(&self) -> &[FaceGroup] {
        &self.groups
    }

    /// Mutable group access. Callers that change geometry must follow up
    /// with [`invalidate`](Self::invalidate).
    pub fn face_groups_mut(&mut self) -> &mut Vec<FaceGroup> {
        &mut self.groups
    }

    pub fn has_faces(&self) -> bool {
        self.groups.iter().any(|g| !g.is_empty())
    }

    pub fn face_count(&self) -> usize {
        self.groups.iter().map(FaceGroup::len).sum()
    }

    // ------------------------------------------------------------------
    // Derived, cached state
    // ------------------------------------------------------------------

    /// The axis-aligned bounding box over all pooled coordinates, in the
    /// mesh's own frame. `None` when the mesh has no vertices. Cached
    /// until [`invalidate`](Self::invalidate).
    pub fn bounding_box(&self) -> Option<Aabb> {
        *self.bounding_box.get_or_init(|| {
            let mut points = self.pool.points().iter();
            let first = points.next()?;
            let mut mins = *first;
            let mut maxs = *first;
            for p in points {
                mins.x = mins.x.min(p.x);
                mins.y = mins.y.min(p.y);
                mins.z = mins.z.min(p.z);
                maxs.x = maxs.x.max(p.x);
                maxs.y = maxs.y.max(p.y);
                maxs.z = maxs.z.max(p.z);
            }
            Some(Aabb::new(mins, maxs))
        })
    }

    /// The triangle-level collision structure, built lazily from the full
    /// triangulation of all face groups and cached until
    /// [`invalidate`](Self::invalidate).
    pub fn collision_structure(&self) -> &CollisionStructure {
        self.collision.get_or_init(|| CollisionStructure::build(self))
    }

    /// Clear the cached bounding box and collision structure. Must be
    /// called by any code that mutates vertex coordinates after initial
    /// construction.
    pub fn invalidate(&mut self) {
        self.bounding_box = OnceLock::new();
        self.collision = OnceLock::new();
    }

    /// The solid-primitive tag enabling fast collision paths, when this
    /// mesh was built as a whole primitive and not extended since.
    pub const fn solid(&self) -> Option<Solid> {
        self.solid
    }

    pub fn set_solid(&mut self, solid: Option<Solid>) {
        self.solid = solid;
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Exact collision test against `other`, given the rigid transform
    /// from `other`'s frame into this mesh's frame.
    pub fn collides_with(&self, other_to_self: &Matrix4<Real>, other: &Mesh) -> bool {
        crate::collision::meshes_collide(self, other_to_self, other)
    }

    /// Intersect a world-space ray with every face.
    ///
    /// The ray is transformed into object space through the inverse of
    /// `self_to_world`, each face is tested, and hits are mapped back to
    /// world space. With `sorted`, each hit is insertion-sorted by
    /// distance from the ray origin.
    pub fn intersections_with_ray(
        &self,
        origin: &Point3<Real>,
        direction: &Vector3<Real>,
        self_to_world: &Matrix4<Real>,
        sorted: bool,
    ) -> Vec<RayHit> {
        let Some(world_to_self) = self_to_world.try_inverse() else {
            return Vec::new();
        };
        let object_ray = Ray::new(
            world_to_self.transform_point(origin),
            world_to_self.transform_vector(direction),
        );

        let mut hits: Vec<RayHit> = Vec::new();
        for (group_index, group) in self.groups.iter().enumerate() {
            for (face_index, face) in group.faces().iter().enumerate() {
                let Some(object_hit) = face.intersect(&object_ray) else {
                    continue;
                };
                let world_hit = self_to_world.transform_point(&object_hit);
                let hit = RayHit {
                    point: world_hit,
                    distance: (world_hit - origin).norm(),
                    group: group_index,
                    face: face_index,
                };
                if sorted {
                    let at = hits
                        .iter()
                        .position(|h| h.distance > hit.distance)
                        .unwrap_or(hits.len());
                    hits.insert(at, hit);
                } else {
                    hits.push(hit);
                }
            }
        }
        hits
    }

    // ------------------------------------------------------------------
    // Whole-mesh edits
    // ------------------------------------------------------------------

    /// Apply an affine transform to every pooled coordinate and per-face
    /// vertex record. Normals are carried through the inverse transpose;
    /// if the matrix is singular they are left untouched. Clears the
    /// solid-primitive tag and all caches.
    pub fn transform(&mut self, matrix: &Matrix4<Real>) {
        let normal_matrix = matrix.try_inverse().map(|inverse| inverse.transpose());

        self.pool.map_positions(|p| matrix.transform_point(&p));
        for group in &mut self.groups {
            for face in group.faces_mut() {
                for vertex in face.vertices_mut() {
                    vertex.position = matrix.transform_point(&vertex.position);
                    if let (Some(normals), Some(n)) = (&normal_matrix, vertex.normal) {
                        let moved = normals.transform_vector(&n);
                        let length = moved.norm();
                        if length > 0.0 {
                            vertex.normal = Some(moved / length);
                        }
                    }
                }
                face.invalidate_normal();
            }
        }
        self.solid = None;
        self.invalidate();
    }

    /// Invert orientation: rewind every face and negate its normals.
    pub fn flip(&mut self) {
        for group in &mut self.groups {
            for face in group.faces_mut() {
                face.flip();
            }
        }
        self.invalidate();
    }

    // ------------------------------------------------------------------
    // Measures
    // ------------------------------------------------------------------

    /// Total expanded triangle count over all face groups.
    pub fn triangle_count(&self) -> usize {
        self.groups
            .iter()
            .flat_map(|g| g.faces())
            .map(|f| f.tessellation().triangle_count())
            .sum()
    }

    /// Surface area summed over the full triangulation.
    pub fn surface_area(&self) -> Real {
        let mut area = 0.0;
        for group in &self.groups {
            for face in group.faces() {
                let vertices = face.vertices();
                for [a, b, c] in face.tessellation().triangles() {
                    if a >= vertices.len() || b >= vertices.len() || c >= vertices.len() {
                        continue;
                    }
                    let ab = vertices[b].position - vertices[a].position;
                    let ac = vertices[c].position - vertices[a].position;
                    area += ab.cross(&ac).norm() * 0.5;
                }
            }
        }
        area
    }

    /// Signed enclosed volume by the divergence theorem; meaningful for
    /// closed meshes with outward-facing normals.
    pub fn volume(&self) -> Real {
        let mut six_v = 0.0;
        for group in &self.groups {
            for face in group.faces() {
                let vertices = face.vertices();
                for [a, b, c] in face.tessellation().triangles() {
                    if a >= vertices.len() || b >= vertices.len() || c >= vertices.len() {
                        continue;
                    }
                    let pa = vertices[a].position.coords;
                    let pb = vertices[b].position.coords;
                    let pc = vertices[c].position.coords;
                    six_v += pa.dot(&pb.cross(&pc));
                }
            }
        }
        six_v / 6.0
    }

    // ------------------------------------------------------------------
    // Level of detail
    // ------------------------------------------------------------------

    pub fn level_of_detail(&self) -> Option<&LevelOfDetail> {
        self.level_of_detail.as_ref()
    }

    pub fn set_level_of_detail(&mut self, substitute: Node, pixel_area_threshold: Real) {
        self.level_of_detail = Some(LevelOfDetail {
            substitute: Box::new(substitute),
            pixel_area_threshold,
        });
    }

    pub fn clear_level_of_detail(&mut self) {
        self.level_of_detail = None;
    }

    /// The substitute node to render instead of this mesh when its
    /// projected pixel area falls below the configured threshold.
    pub fn substitute_for_projected_area(&self, pixel_area: Real) -> Option<&Node> {
        match &self.level_of_detail {
            Some(lod) if pixel_area < lod.pixel_area_threshold => Some(&lod.substitute),
            _ => None,
        }
    }
}
