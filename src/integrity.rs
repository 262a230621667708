//! Validation and repair of meshes and scene subtrees.
//!
//! Degenerate geometry is tolerated everywhere else in the crate as
//! sentinel-valued data; this is the pass that surfaces it. Fix mode
//! (the default) deletes malformed faces and the groups they empty out;
//! strict mode records detailed diagnostics and mutates nothing.

use crate::float_types::Real;
use crate::mesh::{Face, Mesh, Primitive, normal_is_valid};
use crate::scene::Node;

/// Accumulated integrity findings.
#[derive(Debug, Clone, Default)]
pub struct IntegrityReport {
    errors: Vec<String>,
}

impl IntegrityReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl core::fmt::Display for IntegrityReport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for error in &self.errors {
            writeln!(f, "{error}")?;
        }
        Ok(())
    }
}

/// Walks meshes or whole scene subtrees and validates structural
/// invariants.
#[derive(Debug, Clone, Copy)]
pub struct IntegrityChecker {
    fix: bool,
}

impl Default for IntegrityChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl IntegrityChecker {
    /// Fix mode: malformed faces are deleted, emptied groups removed.
    pub const fn new() -> Self {
        IntegrityChecker { fix: true }
    }

    /// Strict mode: every failure becomes a detailed diagnostic, nothing
    /// is mutated.
    pub const fn strict() -> Self {
        IntegrityChecker { fix: false }
    }

    /// Check a whole scene subtree: every transform for NaN components,
    /// every mesh leaf for face-level invariants.
    pub fn check_scene(&self, root: &mut Node) -> IntegrityReport {
        let mut report = IntegrityReport::default();
        let fix = self.fix;
        let mut leaf = 0usize;
        root.walk_mut(&mut |node, _world| {
            let label = match node.name() {
                Some(name) => format!("node '{name}'"),
                None => format!("node #{leaf}"),
            };
            leaf += 1;
            check_transform(node.transform(), &label, &mut report.errors);
            if let Some(mesh) = node.mesh_mut() {
                check_mesh_into(mesh, &label, fix, &mut report.errors);
            }
        });
        report
    }

    /// Check a single mesh.
    pub fn check_mesh(&self, mesh: &mut Mesh) -> IntegrityReport {
        let mut report = IntegrityReport::default();
        check_mesh_into(mesh, "mesh", self.fix, &mut report.errors);
        report
    }
}

/// Any NaN among the 12 affine components fails; the projective row is
/// not consulted.
fn check_transform(transform: &nalgebra::Matrix4<Real>, label: &str, errors: &mut Vec<String>) {
    for row in 0..3 {
        for column in 0..4 {
            if transform[(row, column)].is_nan() {
                errors.push(format!(
                    "{label}: transform component ({row},{column}) is NaN"
                ));
                return;
            }
        }
    }
}

fn check_mesh_into(mesh: &mut Mesh, label: &str, fix: bool, errors: &mut Vec<String>) {
    let pool_len = mesh.vertex_count();
    let mut mutated = false;

    for (group_index, group) in mesh.face_groups_mut().iter_mut().enumerate() {
        if fix {
            let before = group.len();
            let mut face_index = 0usize;
            group.faces_mut().retain(|face| {
                let problems = face_problems(face, pool_len, false);
                let keep = problems.is_empty();
                if !keep {
                    errors.push(format!(
                        "{label}: removed face {face_index} of group {group_index}: {}",
                        problems.join("; ")
                    ));
                }
                face_index += 1;
                keep
            });
            mutated |= group.len() != before;
        } else {
            for (face_index, face) in group.faces().iter().enumerate() {
                for problem in face_problems(face, pool_len, true) {
                    errors.push(format!(
                        "{label}: face {face_index} of group {group_index}: {problem}"
                    ));
                }
            }
        }
    }

    if fix {
        let before = mesh.face_groups().len();
        mesh.face_groups_mut().retain(|group| !group.is_empty());
        mutated |= mesh.face_groups().len() != before;
        if mutated {
            mesh.invalidate();
        }
    }
}

/// All invariant violations of one face. With `detailed`, each finding
/// carries a dump of the face's vertices, outlines, and primitives.
fn face_problems(face: &Face, pool_len: usize, detailed: bool) -> Vec<String> {
    let mut problems = Vec::new();
    let vertices = face.vertices();

    if vertices.is_empty() {
        problems.push("empty vertex list".to_string());
    }

    let face_normal = face.normal();
    if !normal_is_valid(&face_normal) {
        problems.push("degenerate face normal".to_string());
    }

    for (i, vertex) in vertices.iter().enumerate() {
        let normal = vertex.normal.unwrap_or(face_normal);
        if !normal.x.is_finite() || !normal.y.is_finite() || !normal.z.is_finite() {
            problems.push(format!("vertex {i} normal is not finite"));
        } else if normal.norm_squared() == 0.0 {
            problems.push(format!("vertex {i} normal is zero"));
        }
        if vertex.pool_index >= pool_len {
            problems.push(format!(
                "vertex {i} pool index {} out of range (pool size {pool_len})",
                vertex.pool_index
            ));
        }
    }

    let tessellation = face.tessellation();
    for (o, outline) in tessellation.outlines().iter().enumerate() {
        for &index in outline {
            if index >= vertices.len() {
                problems.push(format!(
                    "outline {o} references vertex {index} of {}",
                    vertices.len()
                ));
            }
        }
    }
    for (p, primitive) in tessellation.primitives().iter().enumerate() {
        for &index in primitive.indices() {
            if index >= vertices.len() {
                problems.push(format!(
                    "primitive {p} references vertex {index} of {}",
                    vertices.len()
                ));
            }
        }
        if !primitive_is_well_formed(primitive) {
            problems.push(format!(
                "primitive {p} expands to {} triangle indices, not a non-zero multiple of 3",
                primitive.triangle_count() * 3
            ));
        }
    }

    if detailed && !problems.is_empty() {
        let positions: Vec<_> = vertices.iter().map(|v| v.position).collect();
        let dump = format!(
            " [vertices: {:?}; outlines: {:?}; primitives: {:?}]",
            positions,
            tessellation.outlines(),
            tessellation.primitives()
        );
        for problem in &mut problems {
            problem.push_str(&dump);
        }
    }
    problems
}

/// Each primitive must expand to at least one triangle, with no leftover
/// indices.
fn primitive_is_well_formed(primitive: &Primitive) -> bool {
    let len = primitive.indices().len();
    match primitive {
        Primitive::TriangleFan(_) | Primitive::TriangleStrip(_) => len >= 3,
        Primitive::TriangleList(_) => len > 0 && len % 3 == 0,
        Primitive::QuadList(_) => len > 0 && len % 4 == 0,
    }
}
