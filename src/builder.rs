//! Incremental mesh construction.
//!
//! A [`MeshBuilder`] is bound to one target [`Mesh`] and layers primitive
//! generators — quads, extrusions, arcs, cylinders, revolutions,
//! subdivided patches, tessellated-shape extrusions — over one low-level
//! face-adding call that pools vertices and derives texture coordinates.
//!
//! Winding everywhere follows the crate convention: corners listed
//! counter-clockwise seen from the normal side. Each generator reconciles
//! the builder's global flip-normals flag with the direction of its
//! extrusion or axis vector so the resulting cross products face outward.

use crate::appearance::Appearance;
use crate::collision::Solid;
use crate::errors::GeometryError;
use crate::float_types::parry3d::bounding_volume::Aabb;
use crate::float_types::{EPSILON, PI, Real, TAU};
use crate::mesh::{Face, FaceGroup, Mesh, Primitive, Tessellation, Vertex};
use crate::shape2d::TessellatedShape;
use crate::uv::UvMapper;
use nalgebra::{Matrix4, Point2, Point3, Vector3};

/// Stateful helper that adds primitives to one mesh.
pub struct MeshBuilder<'a> {
    mesh: &'a mut Mesh,
    uv_mapper: Option<&'a dyn UvMapper>,
    flip_texture: bool,
    flip_normals: bool,
}

impl<'a> MeshBuilder<'a> {
    pub fn new(mesh: &'a mut Mesh) -> Self {
        MeshBuilder {
            mesh,
            uv_mapper: None,
            flip_texture: false,
            flip_normals: false,
        }
    }

    /// Derive texture coordinates for every added face through `mapper`.
    pub fn uv_mapper(mut self, mapper: &'a dyn UvMapper) -> Self {
        self.uv_mapper = Some(mapper);
        self
    }

    /// Mirror the texture direction passed to the UV mapper.
    pub fn flip_texture(mut self, flip: bool) -> Self {
        self.flip_texture = flip;
        self
    }

    /// Reverse the winding of everything this builder adds.
    pub fn flip_normals(mut self, flip: bool) -> Self {
        self.flip_normals = flip;
        self
    }

    pub fn mesh(&self) -> &Mesh {
        self.mesh
    }

    // ------------------------------------------------------------------
    // Low-level face adding
    // ------------------------------------------------------------------

    /// Add one face over `points`, pooling each point and deriving texture
    /// coordinates when a UV mapper is configured. Never fails; degenerate
    /// point sets produce faces with a sentinel normal.
    pub fn add_face(
        &mut self,
        points: &[Point3<Real>],
        appearance: &Appearance,
        smooth: bool,
        two_sided: bool,
    ) {
        let face = self.build_face(points, None, None, appearance);
        self.mesh.add_face(appearance, smooth, two_sided, face);
        self.mesh.set_solid(None);
    }

    /// Like [`add_face`](Self::add_face), with explicit per-vertex
    /// normals.
    pub fn add_face_with_normals(
        &mut self,
        points: &[Point3<Real>],
        normals: &[Vector3<Real>],
        appearance: &Appearance,
        smooth: bool,
        two_sided: bool,
    ) {
        let face = self.build_face(points, None, Some(normals), appearance);
        self.mesh.add_face(appearance, smooth, two_sided, face);
        self.mesh.set_solid(None);
    }

    /// Add one face over already-pooled vertex indices.
    ///
    /// # Panics
    /// Panics if any index is outside the mesh's vertex pool.
    pub fn add_face_indexed(
        &mut self,
        indices: &[usize],
        appearance: &Appearance,
        smooth: bool,
        two_sided: bool,
    ) {
        let points: Vec<Point3<Real>> = indices
            .iter()
            .map(|&i| self.mesh.vertex_pool().point(i))
            .collect();
        let face = self.build_face(&points, None, None, appearance);
        self.mesh.add_face(appearance, smooth, two_sided, face);
        self.mesh.set_solid(None);
    }

    /// Pool `points`, derive texture coordinates, and assemble a face.
    /// The target group is chosen by the caller.
    fn build_face(
        &mut self,
        points: &[Point3<Real>],
        tessellation: Option<Tessellation>,
        normals: Option<&[Vector3<Real>]>,
        appearance: &Appearance,
    ) -> Face {
        let pool_indices: Vec<usize> =
            points.iter().map(|&p| self.mesh.add_vertex(p)).collect();

        let uvs: Option<Vec<Point2<Real>>> = self.uv_mapper.map(|mapper| {
            mapper.texture_coordinates(
                appearance,
                points,
                Some(&pool_indices),
                newell_normal(points).as_ref(),
                self.flip_texture,
            )
        });

        let vertices: Vec<Vertex> = points
            .iter()
            .zip(&pool_indices)
            .enumerate()
            .map(|(i, (&position, &pool_index))| {
                let mut vertex = match uvs.as_ref().and_then(|list| list.get(i)) {
                    Some(&uv) => Vertex::with_uv(position, pool_index, uv),
                    None => Vertex::new(position, pool_index),
                };
                if let Some(normals) = normals {
                    vertex.normal = normals.get(i).copied();
                }
                vertex
            })
            .collect();

        match tessellation {
            Some(tessellation) => Face::with_tessellation(vertices, tessellation),
            None => Face::new(vertices),
        }
    }

    /// Emit a generator face into the find-or-create group for its style.
    fn emit(
        &mut self,
        points: Vec<Point3<Real>>,
        tessellation: Option<Tessellation>,
        appearance: &Appearance,
        smooth: bool,
        two_sided: bool,
        flip: bool,
    ) {
        let points = wind(points, flip);
        let face = self.build_face(&points, tessellation, None, appearance);
        self.mesh.add_face(appearance, smooth, two_sided, face);
    }

    /// Emit a generator face into an explicitly created group.
    fn emit_to_group(
        &mut self,
        group: usize,
        points: Vec<Point3<Real>>,
        tessellation: Option<Tessellation>,
        appearance: &Appearance,
        flip: bool,
    ) {
        let points = wind(points, flip);
        let face = self.build_face(&points, tessellation, None, appearance);
        self.mesh.add_face_to_group(group, face);
    }

    /// Record or clear the solid-primitive collision tag after a
    /// generator ran. Only a primitive that built the whole mesh keeps
    /// its tag.
    fn finish_primitive(&mut self, was_empty: bool, tag: Option<Solid>) {
        self.mesh.set_solid(if was_empty { tag } else { None });
    }

    fn mesh_is_untouched(&self) -> bool {
        !self.mesh.has_faces() && self.mesh.vertex_count() == 0
    }

    // ------------------------------------------------------------------
    // Flat primitives
    // ------------------------------------------------------------------

    /// A two-point outline face with no filled interior. Reports the
    /// degenerate-normal sentinel, which is expected for wireframe
    /// decoration; the integrity checker's fix mode discards such faces.
    pub fn line(&mut self, from: Point3<Real>, to: Point3<Real>, appearance: &Appearance) {
        let tessellation = Tessellation::new(vec![vec![0, 1, 0]], Vec::new());
        let face = self.build_face(&[from, to], Some(tessellation), None, appearance);
        self.mesh.add_face(appearance, false, true, face);
        self.mesh.set_solid(None);
    }

    pub fn triangle(
        &mut self,
        corners: [Point3<Real>; 3],
        appearance: &Appearance,
        smooth: bool,
        two_sided: bool,
    ) {
        self.emit(
            corners.to_vec(),
            None,
            appearance,
            smooth,
            two_sided,
            self.flip_normals,
        );
        self.mesh.set_solid(None);
    }

    pub fn quad(
        &mut self,
        corners: [Point3<Real>; 4],
        appearance: &Appearance,
        smooth: bool,
        two_sided: bool,
    ) {
        self.emit(
            corners.to_vec(),
            Some(Tessellation::quad()),
            appearance,
            smooth,
            two_sided,
            self.flip_normals,
        );
        self.mesh.set_solid(None);
    }

    // ------------------------------------------------------------------
    // Extrusions of flat primitives
    // ------------------------------------------------------------------

    /// Extrude the segment `from → to` along `vector`. The degenerate
    /// two-corner "ring" yields one wall quad per side, facing opposite
    /// ways; the original and extruded segments become outline-only
    /// faces when `cap_appearance` is set.
    pub fn extruded_line(
        &mut self,
        from: Point3<Real>,
        to: Point3<Real>,
        vector: Vector3<Real>,
        appearance: &Appearance,
        cap_appearance: Option<&Appearance>,
    ) -> Result<(), GeometryError> {
        self.extrude_polygon(&[from, to], vector, appearance, cap_appearance, cap_appearance)
    }

    /// Extrude a triangle along `vector`: a ring of three wall quads plus
    /// the original and extruded faces (each omitted when its appearance
    /// is `None`).
    pub fn extruded_triangle(
        &mut self,
        corners: [Point3<Real>; 3],
        vector: Vector3<Real>,
        side_appearance: &Appearance,
        bottom_appearance: Option<&Appearance>,
        top_appearance: Option<&Appearance>,
    ) -> Result<(), GeometryError> {
        self.extrude_polygon(
            &corners,
            vector,
            side_appearance,
            bottom_appearance,
            top_appearance,
        )
    }

    /// Extrude a quad along `vector`: a ring of four wall quads plus the
    /// original and extruded faces.
    pub fn extruded_quad(
        &mut self,
        corners: [Point3<Real>; 4],
        vector: Vector3<Real>,
        side_appearance: &Appearance,
        bottom_appearance: Option<&Appearance>,
        top_appearance: Option<&Appearance>,
    ) -> Result<(), GeometryError> {
        self.extrude_polygon(
            &corners,
            vector,
            side_appearance,
            bottom_appearance,
            top_appearance,
        )
    }

    fn extrude_polygon(
        &mut self,
        corners: &[Point3<Real>],
        vector: Vector3<Real>,
        side_appearance: &Appearance,
        bottom_appearance: Option<&Appearance>,
        top_appearance: Option<&Appearance>,
    ) -> Result<(), GeometryError> {
        validate_extrusion_vector("extruded polygon", &vector)?;

        // Along-normal extrusion keeps the natural winding; against it,
        // every emitted face is rewound so cross products still point out.
        let along_normal = newell_normal(corners)
            .map(|n| n.dot(&vector) >= 0.0)
            .unwrap_or(true);
        let flip = self.flip_normals ^ !along_normal;

        let n = corners.len();
        for i in 0..n {
            let a = corners[i];
            let b = corners[(i + 1) % n];
            self.emit(
                vec![a, b, b + vector, a + vector],
                Some(Tessellation::quad()),
                side_appearance,
                false,
                false,
                flip,
            );
        }
        if let Some(bottom) = bottom_appearance {
            let mut reversed: Vec<Point3<Real>> = corners.to_vec();
            reversed.reverse();
            self.emit(reversed, None, bottom, false, false, flip);
        }
        if let Some(top) = top_appearance {
            let lifted: Vec<Point3<Real>> = corners.iter().map(|&p| p + vector).collect();
            self.emit(lifted, None, top, false, false, flip);
        }
        self.mesh.set_solid(None);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Arcs
    // ------------------------------------------------------------------

    /// Approximate a circular arc in the XY plane around `center`.
    ///
    /// With `width <= 0` the arc is a polyline of outline-only segments;
    /// with a positive width it is a ribbon of quads between `radius` and
    /// `radius + width`. The segment count is
    /// `max(3, round(32 · |sweep| / τ))`.
    pub fn arc(
        &mut self,
        center: Point3<Real>,
        radius: Real,
        start_angle: Real,
        sweep_angle: Real,
        width: Real,
        appearance: &Appearance,
    ) -> Result<(), GeometryError> {
        if radius <= 0.0 {
            return Err(GeometryError::NonPositive {
                primitive: "arc",
                what: "radius",
                value: radius,
            });
        }
        if sweep_angle == 0.0 {
            return Err(GeometryError::NonPositive {
                primitive: "arc",
                what: "sweep angle",
                value: sweep_angle,
            });
        }

        let segments = arc_segments(sweep_angle);
        let at = |ring_radius: Real, step: usize| {
            let angle = start_angle + sweep_angle * step as Real / segments as Real;
            Point3::new(
                center.x + ring_radius * angle.cos(),
                center.y + ring_radius * angle.sin(),
                center.z,
            )
        };

        if width <= 0.0 {
            for step in 0..segments {
                let (from, to) = (at(radius, step), at(radius, step + 1));
                self.line(from, to, appearance);
            }
            return Ok(());
        }

        // Counter-clockwise sweeps already wind ribbon quads toward +Z.
        let flip = self.flip_normals ^ (sweep_angle < 0.0);
        let outer = radius + width;
        for step in 0..segments {
            self.emit(
                vec![
                    at(radius, step),
                    at(outer, step),
                    at(outer, step + 1),
                    at(radius, step + 1),
                ],
                Some(Tessellation::quad()),
                appearance,
                false,
                false,
                flip,
            );
        }
        self.mesh.set_solid(None);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Cylinders and cones
    // ------------------------------------------------------------------

    /// A cylinder (or truncated cone) around the local Z axis from `z = 0`
    /// to `z = height`, with `segments` side slices.
    ///
    /// Caps are emitted into their own dedicated face groups, bottom and
    /// top separate, so they stay addressable even when they share an
    /// appearance. A cap whose appearance is `None` is omitted — unless
    /// *both* are `None`, in which case both caps fall back to the side
    /// appearance: a solid must keep at least one cap, and a cylinder
    /// capped at one end only would not be one.
    pub fn cylinder(
        &mut self,
        bottom_radius: Real,
        top_radius: Real,
        height: Real,
        segments: usize,
        side_appearance: &Appearance,
        bottom_appearance: Option<&Appearance>,
        top_appearance: Option<&Appearance>,
    ) -> Result<(), GeometryError> {
        if height <= 0.0 {
            return Err(GeometryError::NonPositive {
                primitive: "cylinder",
                what: "height",
                value: height,
            });
        }
        if bottom_radius < 0.0 || top_radius < 0.0 {
            return Err(GeometryError::InvalidDimensions {
                primitive: "cylinder",
                details: format!(
                    "radii must be non-negative, got {bottom_radius} and {top_radius}"
                ),
            });
        }
        if bottom_radius <= 0.0 && top_radius <= 0.0 {
            return Err(GeometryError::InvalidDimensions {
                primitive: "cylinder",
                details: "at least one radius must be positive".into(),
            });
        }
        if segments < 3 {
            return Err(GeometryError::TooFew {
                primitive: "cylinder",
                what: "edges",
                minimum: 3,
                got: segments,
            });
        }

        let was_empty = self.mesh_is_untouched();

        let (bottom_cap_appearance, top_cap_appearance) =
            match (bottom_appearance, top_appearance) {
                (None, None) => (Some(side_appearance), Some(side_appearance)),
                pair => pair,
            };
        let has_bottom = bottom_cap_appearance.is_some() && bottom_radius > 0.0;
        let has_top = top_cap_appearance.is_some() && top_radius > 0.0;

        let profile = [(bottom_radius, 0.0), (top_radius, height)];
        self.revolve_profile(&profile, segments, side_appearance, true)?;

        let ring = |radius: Real, z: Real| -> Vec<Point3<Real>> {
            (0..segments)
                .map(|i| {
                    let angle = TAU * i as Real / segments as Real;
                    Point3::new(radius * angle.cos(), radius * angle.sin(), z)
                })
                .collect()
        };

        if let (true, Some(appearance)) = (has_bottom, bottom_cap_appearance) {
            let group = self
                .mesh
                .push_face_group(FaceGroup::new(appearance.clone(), false, false));
            let mut corners = ring(bottom_radius, 0.0);
            corners.reverse();
            self.emit_to_group(group, corners, None, appearance, self.flip_normals);
        }
        if let (true, Some(appearance)) = (has_top, top_cap_appearance) {
            let group = self
                .mesh
                .push_face_group(FaceGroup::new(appearance.clone(), false, false));
            let corners = ring(top_radius, height);
            self.emit_to_group(group, corners, None, appearance, self.flip_normals);
        }

        let tag = if (bottom_radius - top_radius).abs() <= EPSILON {
            Some(Solid::Cylinder {
                radius: bottom_radius,
                bottom: 0.0,
                top: height,
                bottom_cap: has_bottom,
                top_cap: has_top,
            })
        } else {
            None
        };
        self.finish_primitive(was_empty, tag);
        Ok(())
    }

    /// A cone: a cylinder whose top radius is zero.
    pub fn cone(
        &mut self,
        radius: Real,
        height: Real,
        segments: usize,
        side_appearance: &Appearance,
        bottom_appearance: Option<&Appearance>,
    ) -> Result<(), GeometryError> {
        self.cylinder(
            radius,
            0.0,
            height,
            segments,
            side_appearance,
            bottom_appearance,
            None,
        )
    }

    // ------------------------------------------------------------------
    // Surfaces of revolution
    // ------------------------------------------------------------------

    /// Rotate a `(radius, z)` polyline around the Z axis in `segments`
    /// angular steps, stitching quads between consecutive rings and
    /// collapsing to a single apex vertex wherever the radius is
    /// (near-)zero.
    ///
    /// Surfaces wind outward when the profile is ordered by increasing
    /// `z`.
    pub fn revolve(
        &mut self,
        profile: &[(Real, Real)],
        segments: usize,
        appearance: &Appearance,
        smooth: bool,
    ) -> Result<(), GeometryError> {
        self.revolve_profile(profile, segments, appearance, smooth)?;
        self.mesh.set_solid(None);
        Ok(())
    }

    fn revolve_profile(
        &mut self,
        profile: &[(Real, Real)],
        segments: usize,
        appearance: &Appearance,
        smooth: bool,
    ) -> Result<(), GeometryError> {
        if profile.len() < 2 {
            return Err(GeometryError::TooFew {
                primitive: "revolution",
                what: "profile points",
                minimum: 2,
                got: profile.len(),
            });
        }
        if segments < 3 {
            return Err(GeometryError::TooFew {
                primitive: "revolution",
                what: "segments",
                minimum: 3,
                got: segments,
            });
        }
        if profile.iter().any(|&(radius, _)| radius < 0.0) {
            return Err(GeometryError::InvalidDimensions {
                primitive: "revolution",
                details: "profile radii must be non-negative".into(),
            });
        }

        // Precompute rings so adjacent slices emit bit-identical points
        // and the pool merges them.
        let rings: Vec<Vec<Point3<Real>>> = profile
            .iter()
            .map(|&(radius, z)| {
                if radius <= EPSILON {
                    vec![Point3::new(0.0, 0.0, z)]
                } else {
                    (0..segments)
                        .map(|i| {
                            let angle = TAU * i as Real / segments as Real;
                            Point3::new(radius * angle.cos(), radius * angle.sin(), z)
                        })
                        .collect()
                }
            })
            .collect();

        for pair in rings.windows(2) {
            let (lower, upper) = (&pair[0], &pair[1]);
            if lower.len() == 1 && upper.len() == 1 {
                continue; // two apex points span no surface
            }
            for i in 0..segments {
                let j = (i + 1) % segments;
                let mut corners: Vec<Point3<Real>> = Vec::with_capacity(4);
                if lower.len() == 1 {
                    corners.push(lower[0]);
                } else {
                    corners.push(lower[i]);
                    corners.push(lower[j]);
                }
                if upper.len() == 1 {
                    corners.push(upper[0]);
                } else {
                    corners.push(upper[j]);
                    corners.push(upper[i]);
                }
                let tessellation = if corners.len() == 4 {
                    Some(Tessellation::quad())
                } else {
                    None
                };
                self.emit(
                    corners,
                    tessellation,
                    appearance,
                    smooth,
                    false,
                    self.flip_normals,
                );
            }
        }
        Ok(())
    }

    /// A lathe-built sphere of `radius` centered at the local origin,
    /// tagged as a solid sphere for collision fast paths.
    pub fn sphere(
        &mut self,
        radius: Real,
        segments: usize,
        appearance: &Appearance,
    ) -> Result<(), GeometryError> {
        if radius <= 0.0 {
            return Err(GeometryError::NonPositive {
                primitive: "sphere",
                what: "radius",
                value: radius,
            });
        }
        if segments < 3 {
            return Err(GeometryError::TooFew {
                primitive: "sphere",
                what: "segments",
                minimum: 3,
                got: segments,
            });
        }

        let was_empty = self.mesh_is_untouched();
        let stacks = (segments / 2).max(2);
        let profile: Vec<(Real, Real)> = (0..=stacks)
            .map(|k| {
                if k == 0 {
                    (0.0, -radius)
                } else if k == stacks {
                    (0.0, radius)
                } else {
                    let latitude = -PI / 2.0 + PI * k as Real / stacks as Real;
                    (radius * latitude.cos(), radius * latitude.sin())
                }
            })
            .collect();
        self.revolve_profile(&profile, segments, appearance, true)?;

        self.finish_primitive(
            was_empty,
            Some(Solid::Sphere {
                center: Point3::origin(),
                radius,
            }),
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Subdivided quad
    // ------------------------------------------------------------------

    /// A quad subdivided into an `nx × ny` grid and emitted as a single
    /// face whose tessellation is one triangle strip; useful for smooth
    /// per-vertex lighting across large flat surfaces.
    pub fn subdivided_quad(
        &mut self,
        corners: [Point3<Real>; 4],
        nx: usize,
        ny: usize,
        appearance: &Appearance,
        smooth: bool,
        two_sided: bool,
    ) -> Result<(), GeometryError> {
        if nx == 0 || ny == 0 {
            return Err(GeometryError::TooFew {
                primitive: "subdivided quad",
                what: "subdivisions",
                minimum: 1,
                got: nx.min(ny),
            });
        }

        let flip = self.flip_normals;
        let [c0, c1, c2, c3] = corners;
        let grid_point = |row: usize, column: usize| -> Point3<Real> {
            let u = column as Real / nx as Real;
            let v = row as Real / ny as Real;
            let bottom = c0 + (c1 - c0) * u;
            let top = c3 + (c2 - c3) * u;
            bottom + (top - bottom) * v
        };

        let columns = nx + 1;
        let mut points = Vec::with_capacity(columns * (ny + 1));
        for row in 0..=ny {
            for column in 0..columns {
                points.push(grid_point(row, column));
            }
        }
        let index = |row: usize, column: usize| row * columns + column;

        // One strip over the whole grid. Rows are joined by repeating the
        // last index of one row and the first index of the next, so every
        // stitch triangle is degenerate.
        let mut strip = Vec::with_capacity(ny * (2 * columns + 2));
        for row in 0..ny {
            let row_first = if flip {
                index(row, 0)
            } else {
                index(row + 1, 0)
            };
            if row > 0 {
                let last = *strip.last().expect("previous row emitted indices");
                strip.push(last);
                strip.push(row_first);
            }
            for column in 0..columns {
                let (upper, lower) = if flip {
                    (index(row, column), index(row + 1, column))
                } else {
                    (index(row + 1, column), index(row, column))
                };
                strip.push(upper);
                strip.push(lower);
            }
        }

        let mut outline: Vec<usize> = Vec::new();
        for column in 0..=nx {
            outline.push(index(0, column));
        }
        for row in 1..=ny {
            outline.push(index(row, nx));
        }
        for column in (0..nx).rev() {
            outline.push(index(ny, column));
        }
        for row in (1..ny).rev() {
            outline.push(index(row, 0));
        }
        outline.push(index(0, 0));
        if flip {
            outline.reverse();
        }

        let tessellation =
            Tessellation::new(vec![outline], vec![Primitive::TriangleStrip(strip)]);
        let face = self.build_face(&points, Some(tessellation), None, appearance);
        self.mesh.add_face(appearance, smooth, two_sided, face);
        self.mesh.set_solid(None);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Boxes
    // ------------------------------------------------------------------

    /// An axis-aligned box with its minimum corner at `origin`.
    ///
    /// One zero extent flattens the box to a plate: a single two-sided
    /// face when `back_appearance` is absent or identical to
    /// `appearance`, else two opposite single-sided faces. Two or more
    /// zero extents are rejected.
    pub fn cuboid(
        &mut self,
        origin: Point3<Real>,
        size: Vector3<Real>,
        appearance: &Appearance,
        back_appearance: Option<&Appearance>,
    ) -> Result<(), GeometryError> {
        if size.x < 0.0 || size.y < 0.0 || size.z < 0.0 {
            return Err(GeometryError::InvalidDimensions {
                primitive: "box",
                details: format!("extents must be non-negative, got {size:?}"),
            });
        }
        let zero_extents = [size.x, size.y, size.z]
            .iter()
            .filter(|&&e| e == 0.0)
            .count();
        if zero_extents >= 2 {
            return Err(GeometryError::InvalidDimensions {
                primitive: "box",
                details: format!("{zero_extents} zero extents leave nothing to build"),
            });
        }

        let was_empty = self.mesh_is_untouched();
        let corners = [
            origin,
            origin + Vector3::new(size.x, 0.0, 0.0),
            origin + Vector3::new(size.x, size.y, 0.0),
            origin + Vector3::new(0.0, size.y, 0.0),
            origin + Vector3::new(0.0, 0.0, size.z),
            origin + Vector3::new(size.x, 0.0, size.z),
            origin + Vector3::new(size.x, size.y, size.z),
            origin + Vector3::new(0.0, size.y, size.z),
        ];
        // Outward-wound corner indices per side, -axis face then +axis
        // face for x, y, z.
        let sides = [
            ([0usize, 4, 7, 3], [1usize, 2, 6, 5]), // x
            ([0, 1, 5, 4], [3, 7, 6, 2]),           // y
            ([0, 3, 2, 1], [4, 5, 6, 7]),           // z
        ];

        if zero_extents == 1 {
            let axis = [size.x, size.y, size.z]
                .iter()
                .position(|&e| e == 0.0)
                .expect("one zero extent");
            let (back_indices, front_indices) = sides[axis];
            let front: Vec<Point3<Real>> =
                front_indices.iter().map(|&i| corners[i]).collect();
            match back_appearance {
                None => {
                    self.emit(
                        front,
                        Some(Tessellation::quad()),
                        appearance,
                        false,
                        true,
                        self.flip_normals,
                    );
                },
                Some(back) if back == appearance => {
                    self.emit(
                        front,
                        Some(Tessellation::quad()),
                        appearance,
                        false,
                        true,
                        self.flip_normals,
                    );
                },
                Some(back) => {
                    self.emit(
                        front,
                        Some(Tessellation::quad()),
                        appearance,
                        false,
                        false,
                        self.flip_normals,
                    );
                    let reversed: Vec<Point3<Real>> =
                        back_indices.iter().map(|&i| corners[i]).collect();
                    self.emit(
                        reversed,
                        Some(Tessellation::quad()),
                        back,
                        false,
                        false,
                        self.flip_normals,
                    );
                },
            }
        } else {
            for (minus, plus) in sides {
                for indices in [minus, plus] {
                    let face: Vec<Point3<Real>> =
                        indices.iter().map(|&i| corners[i]).collect();
                    self.emit(
                        face,
                        Some(Tessellation::quad()),
                        appearance,
                        false,
                        false,
                        self.flip_normals,
                    );
                }
            }
        }

        self.finish_primitive(
            was_empty,
            Some(Solid::Box(Aabb::new(origin, origin + size))),
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tessellated-shape extrusion
    // ------------------------------------------------------------------

    /// Extrude a 2D tessellated shape along `vector`: the shape's
    /// triangulation becomes the bottom and top faces, and side quads are
    /// stitched along each outline contour. Winding flips with the sign
    /// of the extrusion vector's Z component and the explicit `flip`
    /// flag.
    pub fn extrude_shape(
        &mut self,
        shape: &dyn TessellatedShape,
        vector: Vector3<Real>,
        side_appearance: &Appearance,
        bottom_appearance: Option<&Appearance>,
        top_appearance: Option<&Appearance>,
        flip: bool,
    ) -> Result<(), GeometryError> {
        validate_extrusion_vector("shape extrusion", &vector)?;
        let flip_order = self.flip_normals ^ flip ^ (vector.z < 0.0);

        let flat = shape.vertices();
        let bottom: Vec<Point3<Real>> =
            flat.iter().map(|p| Point3::new(p.x, p.y, 0.0)).collect();
        let top: Vec<Point3<Real>> = bottom.iter().map(|&p| p + vector).collect();

        let closed_outlines = |clockwise: bool| -> Vec<Vec<usize>> {
            shape
                .outlines(clockwise)
                .into_iter()
                .map(|mut contour| {
                    if let Some(&first) = contour.first() {
                        contour.push(first);
                    }
                    contour
                })
                .collect()
        };
        let as_list = |triangles: Vec<[usize; 3]>| -> Tessellation {
            let indices = triangles.into_iter().flatten().collect();
            Tessellation::new(Vec::new(), vec![Primitive::TriangleList(indices)])
        };

        // Bottom faces away from the extrusion vector, top along it.
        if let Some(appearance) = bottom_appearance {
            let mut tessellation = as_list(shape.triangles(!flip_order));
            tessellation.set_outlines(closed_outlines(!flip_order));
            let face = self.build_face(&bottom, Some(tessellation), None, appearance);
            self.mesh.add_face(appearance, false, false, face);
        }
        if let Some(appearance) = top_appearance {
            let mut tessellation = as_list(shape.triangles(flip_order));
            tessellation.set_outlines(closed_outlines(flip_order));
            let face = self.build_face(&top, Some(tessellation), None, appearance);
            self.mesh.add_face(appearance, false, false, face);
        }

        // Walls along each contour; hole contours come pre-reversed so
        // the same stitching rule faces their walls into the cavity.
        for contour in shape.outlines(flip_order) {
            let n = contour.len();
            if n < 2 {
                continue;
            }
            for i in 0..n {
                let a = contour[i];
                let b = contour[(i + 1) % n];
                self.emit(
                    vec![bottom[a], bottom[b], top[b], top[a]],
                    Some(Tessellation::quad()),
                    side_appearance,
                    false,
                    false,
                    false,
                );
            }
        }
        self.mesh.set_solid(None);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Merging
    // ------------------------------------------------------------------

    /// Append every face of `other`, transformed by `transform`, pooling
    /// vertices into this builder's mesh. Face groups are matched by
    /// appearance identity and flags. Normals are carried through the
    /// inverse transpose when the matrix is invertible.
    pub fn append_mesh(&mut self, other: &Mesh, transform: &Matrix4<Real>) {
        let normal_matrix = transform.try_inverse().map(|inverse| inverse.transpose());
        for group in other.face_groups() {
            let target = self.mesh.face_group(
                group.appearance(),
                group.smooth(),
                group.two_sided(),
            );
            for face in group.faces() {
                let vertices: Vec<Vertex> = face
                    .vertices()
                    .iter()
                    .map(|vertex| {
                        let position = transform.transform_point(&vertex.position);
                        let pool_index = self.mesh.add_vertex(position);
                        let normal = vertex.normal.and_then(|n| {
                            let normals = normal_matrix.as_ref()?;
                            let moved = normals.transform_vector(&n);
                            let length = moved.norm();
                            (length > 0.0).then(|| moved / length)
                        });
                        Vertex {
                            position,
                            pool_index,
                            uv: vertex.uv,
                            normal,
                        }
                    })
                    .collect();
                let face =
                    Face::with_tessellation(vertices, face.tessellation().clone());
                self.mesh.add_face_to_group(target, face);
            }
        }
        self.mesh.set_solid(None);
    }
}

/// Segment count for a circular arc: proportional to the swept angle,
/// never fewer than 3.
pub(crate) fn arc_segments(sweep_angle: Real) -> usize {
    ((32.0 * sweep_angle.abs() / TAU).round() as usize).max(3)
}

/// Newell's method over a polygon's corners; `None` when degenerate.
fn newell_normal(points: &[Point3<Real>]) -> Option<Vector3<Real>> {
    if points.len() < 3 {
        return None;
    }
    let mut normal: Vector3<Real> = Vector3::zeros();
    for (i, current) in points.iter().enumerate() {
        let next = &points[(i + 1) % points.len()];
        normal.x += (current.y - next.y) * (current.z + next.z);
        normal.y += (current.z - next.z) * (current.x + next.x);
        normal.z += (current.x - next.x) * (current.y + next.y);
    }
    let length = normal.norm();
    (length > EPSILON).then(|| normal / length)
}

fn wind(mut points: Vec<Point3<Real>>, flip: bool) -> Vec<Point3<Real>> {
    if flip {
        points.reverse();
    }
    points
}

fn validate_extrusion_vector(
    primitive: &'static str,
    vector: &Vector3<Real>,
) -> Result<(), GeometryError> {
    let length = vector.norm();
    if length <= EPSILON {
        return Err(GeometryError::NonPositive {
            primitive,
            what: "extrusion length",
            value: length,
        });
    }
    Ok(())
}
