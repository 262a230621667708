//! Scene-graph nodes: transforms, tags, and the depth-first tree walker.
//!
//! Only the geometry-bearing leaf matters to this crate; everything else a
//! full scene graph carries (lights, cameras, billboards) lives outside it.

use crate::float_types::Real;
use crate::float_types::parry3d::bounding_volume::Aabb;
use crate::mesh::Mesh;
use hashbrown::HashMap;
use nalgebra::{Matrix4, Point3};
use std::any::Any;
use std::sync::Arc;

/// Ad-hoc per-node payload.
///
/// Either nothing, one arbitrary caller value, or a property map — an
/// explicit tagged union so the three shapes cannot be confused at
/// runtime.
#[derive(Clone, Default)]
pub enum Tag {
    #[default]
    Empty,
    Value(Arc<dyn Any + Send + Sync>),
    Properties(HashMap<String, String>),
}

impl Tag {
    pub fn is_empty(&self) -> bool {
        matches!(self, Tag::Empty)
    }

    /// The caller value, downcast to `T`.
    pub fn value<T: Any>(&self) -> Option<&T> {
        match self {
            Tag::Value(any) => any.downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn properties(&self) -> Option<&HashMap<String, String>> {
        match self {
            Tag::Properties(map) => Some(map),
            _ => None,
        }
    }

    /// Mutable property map access. An empty tag upgrades to an empty
    /// map; a tag already holding a caller value does not silently become
    /// a map — that returns `None`.
    pub fn properties_mut(&mut self) -> Option<&mut HashMap<String, String>> {
        if self.is_empty() {
            *self = Tag::Properties(HashMap::new());
        }
        match self {
            Tag::Properties(map) => Some(map),
            _ => None,
        }
    }
}

impl core::fmt::Debug for Tag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Tag::Empty => f.write_str("Tag::Empty"),
            Tag::Value(_) => f.write_str("Tag::Value(..)"),
            Tag::Properties(map) => f.debug_tuple("Tag::Properties").field(map).finish(),
        }
    }
}

/// A scene-graph node: a transform, children, and optionally a mesh leaf.
#[derive(Debug, Clone)]
pub struct Node {
    transform: Matrix4<Real>,
    children: Vec<Node>,
    mesh: Option<Mesh>,
    tag: Tag,
    name: Option<String>,
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

impl Node {
    /// An empty node with the identity transform.
    pub fn new() -> Self {
        Node {
            transform: Matrix4::identity(),
            children: Vec::new(),
            mesh: None,
            tag: Tag::Empty,
            name: None,
        }
    }

    /// A leaf node holding `mesh`, with the identity transform.
    pub fn with_mesh(mesh: Mesh) -> Self {
        let mut node = Node::new();
        node.mesh = Some(mesh);
        node
    }

    pub fn transform(&self) -> &Matrix4<Real> {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: Matrix4<Real>) {
        self.transform = transform;
    }

    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    pub fn mesh_mut(&mut self) -> Option<&mut Mesh> {
        self.mesh.as_mut()
    }

    pub fn set_mesh(&mut self, mesh: Option<Mesh>) {
        self.mesh = mesh;
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn tag_mut(&mut self) -> &mut Tag {
        &mut self.tag
    }

    pub fn set_tag(&mut self, tag: Tag) {
        self.tag = tag;
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Depth-first traversal from this node with the identity as the
    /// parent transform. The visitor receives each node together with its
    /// fully composed world transform.
    pub fn walk(&self, visitor: &mut impl FnMut(&Node, &Matrix4<Real>)) {
        self.walk_from(&Matrix4::identity(), visitor);
    }

    /// Depth-first traversal below an explicit parent transform.
    pub fn walk_from(
        &self,
        parent: &Matrix4<Real>,
        visitor: &mut impl FnMut(&Node, &Matrix4<Real>),
    ) {
        let world = parent * self.transform;
        visitor(self, &world);
        for child in &self.children {
            child.walk_from(&world, visitor);
        }
    }

    /// Mutable depth-first traversal; the repair pass uses this.
    pub fn walk_mut(&mut self, visitor: &mut impl FnMut(&mut Node, &Matrix4<Real>)) {
        fn recurse(
            node: &mut Node,
            parent: &Matrix4<Real>,
            visitor: &mut impl FnMut(&mut Node, &Matrix4<Real>),
        ) {
            let world = parent * node.transform;
            visitor(node, &world);
            for child in &mut node.children {
                recurse(child, &world, visitor);
            }
        }
        recurse(self, &Matrix4::identity(), visitor);
    }

    /// Every mesh leaf in this subtree with its accumulated world
    /// transform, in traversal order.
    pub fn collect_meshes(&self) -> Vec<(&Mesh, Matrix4<Real>)> {
        fn recurse<'a>(
            node: &'a Node,
            parent: &Matrix4<Real>,
            out: &mut Vec<(&'a Mesh, Matrix4<Real>)>,
        ) {
            let world = parent * node.transform;
            if let Some(mesh) = &node.mesh {
                out.push((mesh, world));
            }
            for child in &node.children {
                recurse(child, &world, out);
            }
        }
        let mut out = Vec::new();
        recurse(self, &Matrix4::identity(), &mut out);
        out
    }

    /// Axis-aligned bounds of the whole subtree in this node's parent
    /// frame, from each leaf's local bounding box pushed through its
    /// accumulated transform. `None` when the subtree has no vertices.
    pub fn bounding_box(&self) -> Option<Aabb> {
        let mut mins: Option<Point3<Real>> = None;
        let mut maxs: Option<Point3<Real>> = None;
        for (mesh, world) in self.collect_meshes() {
            let Some(local) = mesh.bounding_box() else {
                continue;
            };
            for corner in aabb_corners(&local) {
                let p = world.transform_point(&corner);
                mins = Some(match mins {
                    None => p,
                    Some(m) => Point3::new(m.x.min(p.x), m.y.min(p.y), m.z.min(p.z)),
                });
                maxs = Some(match maxs {
                    None => p,
                    Some(m) => Point3::new(m.x.max(p.x), m.y.max(p.y), m.z.max(p.z)),
                });
            }
        }
        Some(Aabb::new(mins?, maxs?))
    }
}

pub(crate) fn aabb_corners(aabb: &Aabb) -> [Point3<Real>; 8] {
    let (lo, hi) = (aabb.mins, aabb.maxs);
    [
        Point3::new(lo.x, lo.y, lo.z),
        Point3::new(hi.x, lo.y, lo.z),
        Point3::new(lo.x, hi.y, lo.z),
        Point3::new(hi.x, hi.y, lo.z),
        Point3::new(lo.x, lo.y, hi.z),
        Point3::new(hi.x, lo.y, hi.z),
        Point3::new(lo.x, hi.y, hi.z),
        Point3::new(hi.x, hi.y, hi.z),
    ]
}
