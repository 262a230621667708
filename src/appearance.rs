//! Opaque appearance handles attached to face groups.

use core::sync::atomic::{AtomicU64, Ordering};

static NEXT_APPEARANCE_ID: AtomicU64 = AtomicU64::new(1);

/// An opaque, identity-compared appearance handle.
///
/// The engine never inspects an appearance beyond identity: two handles
/// denote the same appearance exactly when they descend from the same
/// [`Appearance::new`] call. Clones preserve identity, so a cloned handle
/// resolves to the same [`FaceGroup`](crate::mesh::FaceGroup) as the
/// original. The optional image size is carried through untouched for
/// UV-mapping collaborators that need texture dimensions.
#[derive(Debug, Clone)]
pub struct Appearance {
    id: u64,
    image_size: Option<(u32, u32)>,
}

impl Appearance {
    /// Create a fresh appearance with a process-unique identity.
    pub fn new() -> Self {
        Appearance {
            id: NEXT_APPEARANCE_ID.fetch_add(1, Ordering::Relaxed),
            image_size: None,
        }
    }

    /// Create a fresh appearance carrying texture image dimensions.
    pub fn with_image_size(width: u32, height: u32) -> Self {
        Appearance {
            id: NEXT_APPEARANCE_ID.fetch_add(1, Ordering::Relaxed),
            image_size: Some((width, height)),
        }
    }

    /// The interned identity key.
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Texture image dimensions, if this appearance carries any.
    pub const fn image_size(&self) -> Option<(u32, u32)> {
        self.image_size
    }
}

impl Default for Appearance {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Appearance {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Appearance {}

impl core::hash::Hash for Appearance {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
