//! 2D tessellator boundary consumed by extrusion and filled-shape builders.

use crate::float_types::Real;
use geo::{Coord, LineString, Polygon as GeoPolygon, TriangulateEarcut};
use nalgebra::Point2;

/// A 2D shape that knows how to decompose itself into triangles and
/// boundary contours.
///
/// Implementations expose one shared vertex list; every triangle and
/// outline index refers into it. Callers ask for a specific winding so
/// extrusions can emit correctly-oriented top and bottom faces from the
/// same shape.
pub trait TessellatedShape {
    /// The shape's vertex list. All indices below refer into this slice.
    fn vertices(&self) -> &[Point2<Real>];

    /// Filled-interior triangles as index triples. Triangles are wound
    /// counter-clockwise when `clockwise` is `false`, clockwise otherwise.
    fn triangles(&self, clockwise: bool) -> Vec<[usize; 3]>;

    /// Boundary contours, each a closed loop of vertex indices with the
    /// first index *not* repeated. The outer contour runs
    /// counter-clockwise when `clockwise` is `false`, clockwise otherwise;
    /// hole contours always run opposite the outer one, so edge-stitched
    /// extrusion walls face out of the solid on every contour.
    fn outlines(&self, clockwise: bool) -> Vec<Vec<usize>>;
}

/// A filled polygon with optional holes, triangulated by ear-cutting.
///
/// The vertex list is the outer ring followed by each hole ring, in input
/// order, which keeps outline index ranges contiguous per contour.
pub struct FilledPolygon {
    vertices: Vec<Point2<Real>>,
    /// One `(start, len)` range into `vertices` per contour, outer first.
    contours: Vec<(usize, usize)>,
    triangles: Vec<[usize; 3]>,
}

impl FilledPolygon {
    /// Triangulate `outer` with the given `holes`.
    ///
    /// Rings are passed open (first point not repeated). Degenerate rings
    /// (fewer than 3 points) yield a shape with no triangles rather than
    /// an error, mirroring how degenerate faces are handled in 3D.
    pub fn new(outer: &[Point2<Real>], holes: &[Vec<Point2<Real>>]) -> Self {
        let mut vertices: Vec<Point2<Real>> = Vec::with_capacity(
            outer.len() + holes.iter().map(Vec::len).sum::<usize>(),
        );
        let mut contours = Vec::with_capacity(1 + holes.len());

        contours.push((0, outer.len()));
        vertices.extend_from_slice(outer);
        for hole in holes {
            contours.push((vertices.len(), hole.len()));
            vertices.extend_from_slice(hole);
        }

        if outer.len() < 3 {
            return FilledPolygon {
                vertices,
                contours,
                triangles: Vec::new(),
            };
        }

        // Ear-cut triangulation on the polygon (outer + holes)
        let outer_coords: Vec<Coord<Real>> =
            outer.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
        let holes_coords: Vec<LineString<Real>> = holes
            .iter()
            .map(|hole| {
                let coords: Vec<Coord<Real>> =
                    hole.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
                LineString::new(coords)
            })
            .collect();
        let polygon = GeoPolygon::new(LineString::new(outer_coords), holes_coords);

        let triangulation = polygon.earcut_triangles_raw();
        let raw_vertices = triangulation.vertices;
        let raw_indices = triangulation.triangle_indices;

        // Ear-cutting re-emits its own vertex list; map each raw vertex
        // back to our contour-ordered list by exact coordinate match so
        // outline and triangle indices share one index space.
        let lookup: hashbrown::HashMap<(u64, u64), usize> = vertices
            .iter()
            .enumerate()
            .map(|(i, p)| ((coordinate_key(p.x), coordinate_key(p.y)), i))
            .collect();

        let mut triangles = Vec::with_capacity(raw_indices.len() / 3);
        'triangles: for tri in raw_indices.chunks_exact(3) {
            let mut mapped = [0usize; 3];
            for (slot, &raw) in mapped.iter_mut().zip(tri) {
                let x = raw_vertices[2 * raw];
                let y = raw_vertices[2 * raw + 1];
                match lookup.get(&(coordinate_key(x), coordinate_key(y))) {
                    Some(&index) => *slot = index,
                    // Ear-cutting may synthesize vertices on malformed
                    // input; drop triangles we cannot attribute.
                    None => continue 'triangles,
                }
            }
            triangles.push(mapped);
        }

        // Normalize all triangles to counter-clockwise so `triangles(cw)`
        // is a plain per-triangle swap.
        for tri in &mut triangles {
            let [a, b, c] = *tri;
            if signed_area(&vertices[a], &vertices[b], &vertices[c]) < 0.0 {
                tri.swap(1, 2);
            }
        }

        FilledPolygon {
            vertices,
            contours,
            triangles,
        }
    }
}

impl TessellatedShape for FilledPolygon {
    fn vertices(&self) -> &[Point2<Real>] {
        &self.vertices
    }

    fn triangles(&self, clockwise: bool) -> Vec<[usize; 3]> {
        self.triangles
            .iter()
            .map(|&[a, b, c]| if clockwise { [a, c, b] } else { [a, b, c] })
            .collect()
    }

    fn outlines(&self, clockwise: bool) -> Vec<Vec<usize>> {
        self.contours
            .iter()
            .enumerate()
            .map(|(contour_index, &(start, len))| {
                let mut loop_indices: Vec<usize> = (start..start + len).collect();
                let is_hole = contour_index > 0;
                let want_ccw = clockwise == is_hole;
                let ccw = contour_is_ccw(&self.vertices[start..start + len]);
                if ccw != want_ccw {
                    loop_indices.reverse();
                }
                loop_indices
            })
            .collect()
    }
}

/// Twice the signed area of triangle `(a, b, c)`; positive when
/// counter-clockwise.
fn signed_area(a: &Point2<Real>, b: &Point2<Real>, c: &Point2<Real>) -> Real {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn contour_is_ccw(ring: &[Point2<Real>]) -> bool {
    if ring.len() < 3 {
        return true;
    }
    let mut doubled_area = 0.0;
    for (i, p) in ring.iter().enumerate() {
        let q = &ring[(i + 1) % ring.len()];
        doubled_area += p.x * q.y - q.x * p.y;
    }
    doubled_area >= 0.0
}

fn coordinate_key(value: Real) -> u64 {
    // Exact bit match; ear-cutting copies input coordinates verbatim.
    value.to_bits() as u64
}
