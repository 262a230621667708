//! The geometric core of a 3D scene-description toolkit: meshes as
//! shared, indexed vertex data organized into tessellated,
//! appearance-grouped faces, plus the algorithms that operate on that
//! representation — incremental construction ([`builder`]), vertex
//! deduplication ([`mesh::VertexPool`]), smoothing ([`smoothing`]),
//! bounding-volume caching, and collision testing between transformed
//! solids ([`collision`]).
//!
//! # Features
//! #### Default
//! - **f64**: use f64 as Real
//!
//! #### Optional
//! - **f32**: use f32 as Real, this conflicts with f64
//! - **parallel**: use rayon for the exact triangle collision sweep

#![forbid(unsafe_code)]
#![warn(clippy::missing_const_for_fn, clippy::approx_constant, clippy::all)]

pub mod appearance;
pub mod builder;
pub mod collision;
pub mod errors;
pub mod float_types;
pub mod integrity;
pub mod mesh;
pub mod scene;
pub mod shape2d;
pub mod smoothing;
pub mod uv;

#[cfg(any(
    all(feature = "f64", feature = "f32"),
    not(any(feature = "f64", feature = "f32"))
))]
compile_error!("Either 'f64' or 'f32' feature must be specified, but not both");

pub use appearance::Appearance;
pub use builder::MeshBuilder;
pub use collision::{CollisionStructure, Solid, meshes_collide, subtrees_collide};
pub use errors::GeometryError;
pub use integrity::{IntegrityChecker, IntegrityReport};
pub use mesh::{Face, FaceGroup, Mesh, Primitive, RayHit, Tessellation, Vertex, VertexPool};
pub use scene::{Node, Tag};
pub use shape2d::{FilledPolygon, TessellatedShape};
pub use smoothing::SmoothingPass;
pub use uv::UvMapper;
