use nalgebra::{Matrix4, Point3, Vector3};
use scenemesh::collision::obb_intersects;
use scenemesh::{Appearance, Mesh, MeshBuilder, Node, subtrees_collide};

mod support;

fn cube(extent: f64, origin: Point3<f64>) -> Mesh {
    let mut mesh = Mesh::new();
    let appearance = Appearance::new();
    MeshBuilder::new(&mut mesh)
        .cuboid(
            origin,
            Vector3::new(extent, extent, extent),
            &appearance,
            None,
        )
        .unwrap();
    mesh
}

fn sphere(radius: f64) -> Mesh {
    let mut mesh = Mesh::new();
    let appearance = Appearance::new();
    MeshBuilder::new(&mut mesh)
        .sphere(radius, 12, &appearance)
        .unwrap();
    mesh
}

fn translation(x: f64, y: f64, z: f64) -> Matrix4<f64> {
    Matrix4::new_translation(&Vector3::new(x, y, z))
}

#[test]
fn cube_and_distant_sphere_do_not_collide() {
    // The documented scenario: a 10-unit cube centered at the origin, a
    // unit sphere 20 units up, a radius-20 sphere at the origin.
    let cube = cube(10.0, Point3::new(-5.0, -5.0, -5.0));
    let far_sphere = sphere(1.0);
    let big_sphere = sphere(20.0);

    assert!(!cube.collides_with(&translation(0.0, 0.0, 20.0), &far_sphere));
    assert!(cube.collides_with(&Matrix4::identity(), &big_sphere));
}

#[test]
fn generic_triangle_path_finds_surface_intersections() {
    let mut cube = cube(10.0, Point3::new(-5.0, -5.0, -5.0));
    let mut far_sphere = sphere(1.0);
    // Pokes through all six cube faces, so surface triangles intersect.
    let mut poking_sphere = sphere(6.0);
    // Dropping the solid tags forces the bounding-box + triangle path.
    cube.set_solid(None);
    far_sphere.set_solid(None);
    poking_sphere.set_solid(None);

    assert!(!cube.collides_with(&translation(0.0, 0.0, 20.0), &far_sphere));
    assert!(cube.collides_with(&Matrix4::identity(), &poking_sphere));
}

#[test]
fn collision_is_symmetric_under_transform_inversion() {
    let a = cube(2.0, Point3::origin());
    let b = cube(2.0, Point3::origin());

    let transforms = [
        translation(1.0, 1.0, 0.0),
        translation(5.0, 0.0, 0.0),
        Matrix4::new_rotation(Vector3::new(0.0, 0.0, 0.7)) * translation(2.5, 0.0, 0.0),
        Matrix4::new_rotation(Vector3::new(0.4, 0.4, 0.0)) * translation(0.0, 3.5, 0.0),
    ];
    for t in transforms {
        let inverse = t.try_inverse().unwrap();
        assert_eq!(
            a.collides_with(&t, &b),
            b.collides_with(&inverse, &a),
            "A vs B must agree with B vs A under the inverse transform"
        );
    }
}

#[test]
fn touching_boxes_collide_and_separated_ones_do_not() {
    let a = cube(2.0, Point3::origin());
    let b = cube(2.0, Point3::origin());
    assert!(a.collides_with(&translation(1.9, 0.0, 0.0), &b));
    assert!(!a.collides_with(&translation(2.1, 0.0, 0.0), &b));
}

#[test]
fn rotated_box_collision_uses_the_full_separating_axis_test() {
    let a = cube(2.0, Point3::origin());
    let b = cube(2.0, Point3::origin());
    // Rotate B 45° around Z about its own center, then slide it along X.
    // Its half-diagonal grows to √2, so contact happens further out than
    // the axis-aligned 2.0.
    let spin = translation(1.0, 1.0, 0.0)
        * Matrix4::new_rotation(Vector3::new(0.0, 0.0, std::f64::consts::FRAC_PI_4))
        * translation(-1.0, -1.0, 0.0);
    let near = translation(2.2, 0.0, 0.0) * spin;
    let far = translation(3.6, 0.0, 0.0) * spin;
    assert!(a.collides_with(&near, &b));
    assert!(!a.collides_with(&far, &b));
}

#[test]
fn obb_test_rejects_clearly_separated_boxes() {
    let a = cube(2.0, Point3::origin());
    let b = cube(2.0, Point3::origin());
    let (bounds_a, bounds_b) = (a.bounding_box().unwrap(), b.bounding_box().unwrap());
    assert!(obb_intersects(
        &bounds_a,
        &translation(1.0, 0.0, 0.0),
        &bounds_b
    ));
    assert!(!obb_intersects(
        &bounds_a,
        &translation(0.0, 4.0, 0.0),
        &bounds_b
    ));
}

#[test]
fn spheres_collide_by_center_distance() {
    let a = sphere(1.0);
    let b = sphere(2.0);
    assert!(a.collides_with(&translation(2.9, 0.0, 0.0), &b));
    assert!(!a.collides_with(&translation(3.1, 0.0, 0.0), &b));
}

#[test]
fn sphere_against_cylinder_checks_the_solid_region() {
    let mut cylinder = Mesh::new();
    let appearance = Appearance::new();
    MeshBuilder::new(&mut cylinder)
        .cylinder(2.0, 2.0, 4.0, 16, &appearance, None, None)
        .unwrap();
    let ball = sphere(1.0);

    // Beside the wall, above the cap, far off the rim.
    assert!(cylinder.collides_with(&translation(2.5, 0.0, 2.0), &ball));
    assert!(cylinder.collides_with(&translation(0.0, 0.0, 4.5), &ball));
    assert!(!cylinder.collides_with(&translation(4.0, 0.0, 6.0), &ball));
    // Fully inside counts as a collision between solids.
    assert!(cylinder.collides_with(&translation(0.0, 0.0, 2.0), &ball));
}

#[test]
fn contained_cylinder_collides_via_the_containment_short_circuit() {
    let appearance = Appearance::new();
    let mut outer = Mesh::new();
    MeshBuilder::new(&mut outer)
        .cylinder(5.0, 5.0, 10.0, 16, &appearance, None, None)
        .unwrap();
    let mut inner = Mesh::new();
    MeshBuilder::new(&mut inner)
        .cylinder(1.0, 1.0, 2.0, 16, &appearance, None, None)
        .unwrap();

    // The small cylinder floats entirely inside the big one: no surface
    // triangles intersect, only the containment path can see it.
    assert!(outer.collides_with(&translation(0.0, 0.0, 4.0), &inner));
    assert!(!outer.collides_with(&translation(20.0, 0.0, 0.0), &inner));
}

#[test]
fn empty_meshes_never_collide() {
    let empty = Mesh::new();
    let solid = cube(2.0, Point3::origin());
    assert!(!empty.collides_with(&Matrix4::identity(), &solid));
    assert!(!solid.collides_with(&Matrix4::identity(), &empty));
}

#[test]
fn subtree_collision_composes_world_transforms() {
    let mut left = Node::new();
    let mut left_leaf = Node::with_mesh(cube(2.0, Point3::origin()));
    left_leaf.set_transform(translation(0.0, 0.0, 0.0));
    left.add_child(left_leaf);

    let mut right = Node::new();
    right.set_transform(translation(10.0, 0.0, 0.0));
    let mut right_leaf = Node::with_mesh(cube(2.0, Point3::origin()));
    right_leaf.set_transform(translation(-9.0, 0.0, 0.0));
    right.add_child(right_leaf);

    // World position of the right cube: 10 - 9 = 1 — overlapping.
    assert!(subtrees_collide(&left, &right));

    right.set_transform(translation(20.0, 0.0, 0.0));
    assert!(!subtrees_collide(&left, &right));
}

#[test]
fn a_subtree_collides_with_itself() {
    let mut root = Node::new();
    root.add_child(Node::with_mesh(cube(2.0, Point3::origin())));
    assert!(subtrees_collide(&root, &root));
}
