//! Face tessellations: outline loops plus drawable primitives.

/// One drawable primitive of a face's tessellation.
///
/// The variant set is closed: renderers and collision code exhaustively
/// match on it. Indices are in-face vertex indices, not pool indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Primitive {
    /// Triangles `(v0, v[i], v[i+1])` for `i` in `1..n-1`.
    TriangleFan(Vec<usize>),
    /// Triangles over each index window of three, alternating winding so
    /// all triangles face the same way.
    TriangleStrip(Vec<usize>),
    /// Independent triangles, three indices each.
    TriangleList(Vec<usize>),
    /// Independent quads, four indices each, split into two triangles
    /// along the fixed `0-2` diagonal.
    QuadList(Vec<usize>),
}

impl Primitive {
    /// The raw index list, whatever the primitive kind.
    pub fn indices(&self) -> &[usize] {
        match self {
            Primitive::TriangleFan(indices)
            | Primitive::TriangleStrip(indices)
            | Primitive::TriangleList(indices)
            | Primitive::QuadList(indices) => indices,
        }
    }

    /// Number of triangles this primitive expands to.
    ///
    /// Fans and strips of `n` vertices expand to `n - 2` triangles; a
    /// triangle list of `n` indices to `n / 3`; a quad list of `n` indices
    /// to `n / 2` (two triangles per quad).
    pub fn triangle_count(&self) -> usize {
        match self {
            Primitive::TriangleFan(indices) | Primitive::TriangleStrip(indices) => {
                indices.len().saturating_sub(2)
            },
            Primitive::TriangleList(indices) => indices.len() / 3,
            Primitive::QuadList(indices) => indices.len() / 4 * 2,
        }
    }

    /// Expand to a flat triangle index list, appending onto `out`.
    pub fn push_triangles(&self, out: &mut Vec<[usize; 3]>) {
        match self {
            Primitive::TriangleFan(indices) => {
                for window in indices.windows(2).skip(1) {
                    out.push([indices[0], window[0], window[1]]);
                }
            },
            Primitive::TriangleStrip(indices) => {
                for (i, window) in indices.windows(3).enumerate() {
                    if i % 2 == 0 {
                        out.push([window[0], window[1], window[2]]);
                    } else {
                        out.push([window[1], window[0], window[2]]);
                    }
                }
            },
            Primitive::TriangleList(indices) => {
                for triangle in indices.chunks_exact(3) {
                    out.push([triangle[0], triangle[1], triangle[2]]);
                }
            },
            Primitive::QuadList(indices) => {
                for quad in indices.chunks_exact(4) {
                    out.push([quad[0], quad[1], quad[2]]);
                    out.push([quad[0], quad[2], quad[3]]);
                }
            },
        }
    }

    /// Expand to a fresh triangle index list.
    pub fn triangles(&self) -> Vec<[usize; 3]> {
        let mut out = Vec::with_capacity(self.triangle_count());
        self.push_triangles(&mut out);
        out
    }

    /// The first three indices, when the primitive has that many.
    /// Face normal derivation reads exactly this triple.
    pub fn leading_triple(&self) -> Option<[usize; 3]> {
        let indices = self.indices();
        if indices.len() < 3 {
            return None;
        }
        Some([indices[0], indices[1], indices[2]])
    }
}

/// How a face's vertex list decomposes into outline loops and drawable
/// primitives.
///
/// Outlines built by constructors are cyclic: the first in-face index is
/// repeated at the end. A smoothing pass may later break loops into open
/// fragments, which drop the closing repeat.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tessellation {
    outlines: Vec<Vec<usize>>,
    primitives: Vec<Primitive>,
}

impl Tessellation {
    pub fn new(outlines: Vec<Vec<usize>>, primitives: Vec<Primitive>) -> Self {
        Tessellation {
            outlines,
            primitives,
        }
    }

    /// The default tessellation of an `n`-vertex face: one closed outline
    /// around all vertices and a single triangle fan over them.
    pub fn single_fan(n: usize) -> Self {
        let mut outline: Vec<usize> = (0..n).collect();
        if n > 0 {
            outline.push(0);
        }
        Tessellation {
            outlines: vec![outline],
            primitives: vec![Primitive::TriangleFan((0..n).collect())],
        }
    }

    /// One quad over four vertices, outline closed.
    pub fn quad() -> Self {
        Tessellation {
            outlines: vec![vec![0, 1, 2, 3, 0]],
            primitives: vec![Primitive::QuadList(vec![0, 1, 2, 3])],
        }
    }

    pub fn outlines(&self) -> &[Vec<usize>] {
        &self.outlines
    }

    pub fn primitives(&self) -> &[Primitive] {
        &self.primitives
    }

    /// Replace the outline list; used by edge-removal smoothing.
    pub fn set_outlines(&mut self, outlines: Vec<Vec<usize>>) {
        self.outlines = outlines;
    }

    /// Expand every primitive to a flat triangle index list.
    pub fn triangles(&self) -> Vec<[usize; 3]> {
        let mut out =
            Vec::with_capacity(self.primitives.iter().map(Primitive::triangle_count).sum());
        for primitive in &self.primitives {
            primitive.push_triangles(&mut out);
        }
        out
    }

    /// Total expanded triangle count.
    pub fn triangle_count(&self) -> usize {
        self.primitives.iter().map(Primitive::triangle_count).sum()
    }

    /// The largest in-face index referenced by any outline or primitive.
    pub fn max_index(&self) -> Option<usize> {
        let outline_max = self.outlines.iter().flatten().copied().max();
        let primitive_max = self
            .primitives
            .iter()
            .flat_map(|p| p.indices().iter().copied())
            .max();
        outline_max.into_iter().chain(primitive_max).max()
    }
}
