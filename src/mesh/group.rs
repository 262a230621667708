//! Appearance-keyed buckets of faces.

use crate::appearance::Appearance;
use crate::mesh::face::Face;

/// An ordered list of faces sharing one appearance, smoothing flag, and
/// sidedness flag.
///
/// Purely structural: within one mesh at most one group exists per
/// distinct `(appearance identity, smooth, two_sided)` triple unless a
/// caller duplicates one on purpose (the cylinder builder does, so its two
/// caps stay separate).
#[derive(Debug, Clone)]
pub struct FaceGroup {
    faces: Vec<Face>,
    appearance: Appearance,
    smooth: bool,
    two_sided: bool,
}

impl FaceGroup {
    pub fn new(appearance: Appearance, smooth: bool, two_sided: bool) -> Self {
        FaceGroup {
            faces: Vec::new(),
            appearance,
            smooth,
            two_sided,
        }
    }

    pub fn add_face(&mut self, face: Face) {
        self.faces.push(face);
    }

    /// Remove and return the face at `index`.
    ///
    /// # Panics
    /// Panics if `index` is out of range.
    pub fn remove_face(&mut self, index: usize) -> Face {
        self.faces.remove(index)
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn faces_mut(&mut self) -> &mut Vec<Face> {
        &mut self.faces
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn appearance(&self) -> &Appearance {
        &self.appearance
    }

    /// Whether vertex normals should be interpolated across this group's
    /// faces.
    pub const fn smooth(&self) -> bool {
        self.smooth
    }

    /// Whether backface culling is disabled for this group.
    pub const fn two_sided(&self) -> bool {
        self.two_sided
    }

    /// Whether this group matches the find-or-create key.
    pub fn matches(&self, appearance: &Appearance, smooth: bool, two_sided: bool) -> bool {
        self.appearance == *appearance && self.smooth == smooth && self.two_sided == two_sided
    }
}
