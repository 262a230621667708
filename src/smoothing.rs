//! Smoothing: edge removal and averaged per-vertex normals.
//!
//! Operates over a mesh's smooth face groups (or an explicit subset).
//! Edges shared by two faces meeting at a shallow enough angle are removed
//! from the faces' outlines; vertices shared by faces within a smoothing
//! angle of a seed face get an area-weighted averaged normal.

use crate::float_types::Real;
use crate::mesh::{Mesh, normal_is_valid};
use hashbrown::HashMap;
use nalgebra::Vector3;

/// Configuration for one smoothing run.
///
/// Angles are in degrees. A smoothing angle `<= 0` disables normal
/// averaging; an edge angle `<= 0` disables edge removal. Comparisons use
/// cosine thresholds with `>=` semantics: a 0° threshold admits only
/// exactly parallel normals, a threshold of 180° or more merges
/// everything.
#[derive(Debug, Clone, Copy)]
pub struct SmoothingPass {
    max_smooth_angle: Real,
    max_edge_angle: Real,
    separate_appearances: bool,
}

impl SmoothingPass {
    pub fn new(max_smooth_angle: Real, max_edge_angle: Real) -> Self {
        SmoothingPass {
            max_smooth_angle,
            max_edge_angle,
            separate_appearances: false,
        }
    }

    /// Keep faces with different appearances in separate smoothing
    /// groups.
    pub fn separate_appearances(mut self, separate: bool) -> Self {
        self.separate_appearances = separate;
        self
    }

    /// Run over every face group whose smooth flag is set.
    pub fn run(&self, mesh: &mut Mesh) {
        let groups: Vec<usize> = mesh
            .face_groups()
            .iter()
            .enumerate()
            .filter(|(_, g)| g.smooth())
            .map(|(i, _)| i)
            .collect();
        self.run_on_groups(mesh, &groups);
    }

    /// Run over an explicit subset of face groups.
    pub fn run_on_groups(&self, mesh: &mut Mesh, groups: &[usize]) {
        let selection = Selection::gather(mesh, groups);
        if selection.faces.is_empty() {
            return;
        }

        if self.max_edge_angle > 0.0 {
            let cos_edge = self.max_edge_angle.to_radians().cos();
            self.remove_smooth_edges(mesh, &selection, cos_edge);
        }
        if self.max_smooth_angle > 0.0 {
            let cos_smooth = self.max_smooth_angle.to_radians().cos();
            self.average_normals(mesh, &selection, cos_smooth);
        }
    }

    /// Step 2: drop outline edges between faces meeting at a shallow
    /// angle, splitting each outline loop into the surviving fragments.
    fn remove_smooth_edges(&self, mesh: &mut Mesh, selection: &Selection, cos_edge: Real) {
        let mut replacements: Vec<(usize, Vec<Vec<usize>>)> = Vec::new();

        for (index, &(group, face)) in selection.faces.iter().enumerate() {
            let face_ref = &mesh.face_groups()[group].faces()[face];
            let vertices = face_ref.vertices();
            let outlines = face_ref.tessellation().outlines();

            let mut rebuilt: Vec<Vec<usize>> = Vec::with_capacity(outlines.len());
            let mut changed = false;

            for outline in outlines {
                if outline.len() < 2 {
                    rebuilt.push(outline.clone());
                    continue;
                }
                let edge_count = outline.len() - 1;
                let closed = outline.len() > 2 && outline.first() == outline.last();

                let kept: Vec<bool> = (0..edge_count)
                    .map(|k| {
                        let (ia, ib) = (outline[k], outline[k + 1]);
                        if ia >= vertices.len() || ib >= vertices.len() {
                            return true;
                        }
                        let pa = vertices[ia].pool_index;
                        let pb = vertices[ib].pool_index;
                        let Some(neighbor) = selection.other_face_sharing(index, pa, pb)
                        else {
                            return true;
                        };
                        let na = selection.normals[index];
                        let nb = selection.normals[neighbor];
                        if !normal_is_valid(&na) || !normal_is_valid(&nb) {
                            return true;
                        }
                        // cos >= threshold means the dihedral angle is
                        // small enough: the edge is smooth and goes.
                        na.dot(&nb) < cos_edge
                    })
                    .collect();

                if kept.iter().all(|&keep| keep) {
                    rebuilt.push(outline.clone());
                    continue;
                }
                changed = true;
                if kept.iter().all(|&keep| !keep) {
                    continue;
                }

                // Maximal runs of surviving edges become open fragments.
                let mut runs: Vec<(usize, usize)> = Vec::new();
                for (k, &keep) in kept.iter().enumerate() {
                    if !keep {
                        continue;
                    }
                    match runs.last_mut() {
                        Some(run) if run.1 + 1 == k => run.1 = k,
                        _ => runs.push((k, k)),
                    }
                }

                // A closed loop whose seam survived on both sides is one
                // fragment crossing the seam, not two.
                let wraps = closed
                    && runs.len() > 1
                    && runs.first().is_some_and(|r| r.0 == 0)
                    && runs.last().is_some_and(|r| r.1 == edge_count - 1);
                let merged_tail = if wraps { runs.pop() } else { None };

                for (run_index, &(start, end)) in runs.iter().enumerate() {
                    if run_index == 0 {
                        if let Some((tail_start, _)) = merged_tail {
                            // outline[edge_count] repeats outline[0], so
                            // the tail flows seamlessly into the head.
                            let mut fragment = outline[tail_start..=edge_count].to_vec();
                            fragment.extend_from_slice(&outline[1..=end + 1]);
                            rebuilt.push(fragment);
                            continue;
                        }
                    }
                    rebuilt.push(outline[start..=end + 1].to_vec());
                }
            }

            if changed {
                replacements.push((index, rebuilt));
            }
        }

        for (index, outlines) in replacements {
            let (group, face) = selection.faces[index];
            mesh.face_groups_mut()[group].faces_mut()[face]
                .tessellation_mut()
                .set_outlines(outlines);
        }
    }

    /// Step 3: per pooled vertex, grow smoothing groups greedily from a
    /// seed face and assign each group's cross-weighted averaged normal.
    ///
    /// Candidates are compared against the *seed* face's normal only, not
    /// transitively against accepted members; the grouping therefore
    /// depends on face visitation order for chains of faces each within
    /// the angle of their neighbor but not of the seed. That single-seed
    /// greedy behavior is deliberate and pinned by tests.
    fn average_normals(&self, mesh: &mut Mesh, selection: &Selection, cos_smooth: Real) {
        let mut updates: Vec<(usize, usize, Vector3<Real>)> = Vec::new();

        for vertex_index in 0..mesh.vertex_count() {
            let Some(faces_here) = selection.faces_by_vertex.get(&vertex_index) else {
                continue;
            };
            let mut grouped = vec![false; faces_here.len()];

            for seed_slot in 0..faces_here.len() {
                if grouped[seed_slot] {
                    continue;
                }
                grouped[seed_slot] = true;
                let seed = faces_here[seed_slot];
                let seed_normal = selection.normals[seed];
                if !normal_is_valid(&seed_normal) {
                    continue;
                }

                let mut members = vec![seed];
                for candidate_slot in seed_slot + 1..faces_here.len() {
                    if grouped[candidate_slot] {
                        continue;
                    }
                    let candidate = faces_here[candidate_slot];
                    if self.separate_appearances
                        && selection.appearances[candidate] != selection.appearances[seed]
                    {
                        continue;
                    }
                    let candidate_normal = selection.normals[candidate];
                    if !normal_is_valid(&candidate_normal) {
                        continue;
                    }
                    if seed_normal.dot(&candidate_normal) >= cos_smooth {
                        grouped[candidate_slot] = true;
                        members.push(candidate);
                    }
                }

                // Unnormalized cross products weight large faces more.
                let summed: Vector3<Real> = members
                    .iter()
                    .map(|&member| selection.crosses[member])
                    .sum();
                let length = summed.norm();
                let averaged = if length > 0.0 {
                    summed / length
                } else {
                    seed_normal
                };

                for &member in &members {
                    updates.push((member, vertex_index, averaged));
                }
            }
        }

        for (member, vertex_index, normal) in updates {
            let (group, face) = selection.faces[member];
            for vertex in mesh.face_groups_mut()[group].faces_mut()[face].vertices_mut() {
                if vertex.pool_index == vertex_index {
                    vertex.normal = Some(normal);
                }
            }
        }
    }
}

/// Immutable snapshot of the faces being processed: normals, crosses, and
/// the vertex → faces index, gathered up front so the mutation passes
/// stay simple.
struct Selection {
    faces: Vec<(usize, usize)>,
    normals: Vec<Vector3<Real>>,
    crosses: Vec<Vector3<Real>>,
    appearances: Vec<u64>,
    pool_indices: Vec<Vec<usize>>,
    faces_by_vertex: HashMap<usize, Vec<usize>>,
}

impl Selection {
    fn gather(mesh: &Mesh, groups: &[usize]) -> Self {
        let mut faces = Vec::new();
        let mut normals = Vec::new();
        let mut crosses = Vec::new();
        let mut appearances = Vec::new();
        let mut pool_indices: Vec<Vec<usize>> = Vec::new();
        let mut faces_by_vertex: HashMap<usize, Vec<usize>> = HashMap::new();

        for &group_index in groups {
            let Some(group) = mesh.face_groups().get(group_index) else {
                continue;
            };
            for (face_index, face) in group.faces().iter().enumerate() {
                let index = faces.len();
                faces.push((group_index, face_index));
                normals.push(face.normal());
                crosses.push(face.cross());
                appearances.push(group.appearance().id());
                let mut pooled: Vec<usize> =
                    face.vertices().iter().map(|v| v.pool_index).collect();
                pooled.sort_unstable();
                pooled.dedup();
                for &vertex_index in &pooled {
                    faces_by_vertex.entry(vertex_index).or_default().push(index);
                }
                pool_indices.push(pooled);
            }
        }

        Selection {
            faces,
            normals,
            crosses,
            appearances,
            pool_indices,
            faces_by_vertex,
        }
    }

    /// The first other processed face sharing both pooled vertices, if
    /// any.
    fn other_face_sharing(&self, this: usize, pa: usize, pb: usize) -> Option<usize> {
        self.faces_by_vertex
            .get(&pa)?
            .iter()
            .copied()
            .find(|&other| {
                other != this && self.pool_indices[other].binary_search(&pb).is_ok()
            })
    }
}
