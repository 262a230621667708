use nalgebra::{Matrix4, Point3, Vector3};
use scenemesh::scene::Tag;
use scenemesh::{Appearance, Mesh, MeshBuilder, Node};

mod support;

use crate::support::{approx_eq, approx_point, bounds};

fn unit_cube() -> Mesh {
    let mut mesh = Mesh::new();
    let appearance = Appearance::new();
    MeshBuilder::new(&mut mesh)
        .cuboid(Point3::origin(), Vector3::new(1.0, 1.0, 1.0), &appearance, None)
        .unwrap();
    mesh
}

#[test]
fn face_groups_deduplicate_by_appearance_identity_and_flags() {
    let mut mesh = Mesh::new();
    let appearance = Appearance::new();
    let other = Appearance::new();

    let first = mesh.face_group(&appearance, true, false);
    let again = mesh.face_group(&appearance.clone(), true, false);
    assert_eq!(first, again, "clones keep their identity");

    assert_ne!(first, mesh.face_group(&other, true, false));
    assert_ne!(first, mesh.face_group(&appearance, false, false));
    assert_ne!(first, mesh.face_group(&appearance, true, true));
    assert_eq!(mesh.face_groups().len(), 4);
}

#[test]
fn empty_mesh_has_no_bounds() {
    let mesh = Mesh::new();
    assert!(mesh.bounding_box().is_none());
    assert!(mesh.collision_structure().is_empty());
}

#[test]
fn every_vertex_lies_inside_the_bounding_box() {
    let mut mesh = Mesh::new();
    let appearance = Appearance::new();
    {
        let mut builder = MeshBuilder::new(&mut mesh);
        builder.sphere(3.0, 10, &appearance).unwrap();
        builder
            .cylinder(1.0, 1.0, 8.0, 12, &appearance, None, None)
            .unwrap();
    }
    let aabb = mesh.bounding_box().unwrap();
    for p in mesh.vertex_pool().points() {
        assert!(p.x >= aabb.mins.x && p.x <= aabb.maxs.x);
        assert!(p.y >= aabb.mins.y && p.y <= aabb.maxs.y);
        assert!(p.z >= aabb.mins.z && p.z <= aabb.maxs.z);
    }
}

#[test]
fn ray_hits_come_back_in_world_space_sorted_by_distance() {
    let mesh = unit_cube();
    let to_world = Matrix4::new_translation(&Vector3::new(10.0, 0.0, 0.0));
    // World-space ray down the cube's middle, along +X.
    let hits = mesh.intersections_with_ray(
        &Point3::new(0.0, 0.5, 0.5),
        &Vector3::new(1.0, 0.0, 0.0),
        &to_world,
        true,
    );
    assert_eq!(hits.len(), 2, "entry and exit faces");
    assert!(approx_point(&hits[0].point, &Point3::new(10.0, 0.5, 0.5), 1e-9));
    assert!(approx_point(&hits[1].point, &Point3::new(11.0, 0.5, 0.5), 1e-9));
    assert!(hits[0].distance <= hits[1].distance);
    assert!(approx_eq(hits[0].distance, 10.0, 1e-9));

    let missing = mesh.intersections_with_ray(
        &Point3::new(0.0, 5.0, 0.5),
        &Vector3::new(1.0, 0.0, 0.0),
        &to_world,
        true,
    );
    assert!(missing.is_empty());
}

#[test]
fn transform_moves_bounds_and_keeps_measures() {
    let mut mesh = unit_cube();
    mesh.transform(&Matrix4::new_translation(&Vector3::new(2.0, 3.0, 4.0)));
    assert_eq!(bounds(&mesh), [2.0, 3.0, 4.0, 3.0, 4.0, 5.0]);
    assert!(approx_eq(mesh.volume(), 1.0, 1e-9));
    assert!(approx_eq(mesh.surface_area(), 6.0, 1e-9));
    assert!(mesh.solid().is_none(), "transforming drops the primitive tag");
}

#[test]
fn flip_negates_the_enclosed_volume() {
    let mut mesh = unit_cube();
    assert!(approx_eq(mesh.volume(), 1.0, 1e-9));
    mesh.flip();
    assert!(approx_eq(mesh.volume(), -1.0, 1e-9));
    assert!(approx_eq(mesh.surface_area(), 6.0, 1e-9));
}

#[test]
fn level_of_detail_substitutes_below_the_threshold() {
    let mut mesh = unit_cube();
    let mut substitute = Node::new();
    substitute.set_name("coarse");
    mesh.set_level_of_detail(substitute, 100.0);

    assert!(mesh.substitute_for_projected_area(200.0).is_none());
    let coarse = mesh.substitute_for_projected_area(50.0).unwrap();
    assert_eq!(coarse.name(), Some("coarse"));
}

#[test]
fn walker_composes_transforms_depth_first() {
    let mut root = Node::new();
    root.set_transform(Matrix4::new_translation(&Vector3::new(1.0, 0.0, 0.0)));
    let mut middle = Node::new();
    middle.set_transform(Matrix4::new_translation(&Vector3::new(0.0, 2.0, 0.0)));
    let mut leaf = Node::with_mesh(unit_cube());
    leaf.set_transform(Matrix4::new_translation(&Vector3::new(0.0, 0.0, 3.0)));
    middle.add_child(leaf);
    root.add_child(middle);

    let leaves = root.collect_meshes();
    assert_eq!(leaves.len(), 1);
    let world = leaves[0].1;
    let origin = world.transform_point(&Point3::origin());
    assert!(approx_point(&origin, &Point3::new(1.0, 2.0, 3.0), 1e-12));

    let mut visited = 0;
    root.walk(&mut |_, _| visited += 1);
    assert_eq!(visited, 3);
}

#[test]
fn subtree_bounds_cover_transformed_leaves() {
    let mut root = Node::new();
    let mut leaf = Node::with_mesh(unit_cube());
    leaf.set_transform(Matrix4::new_translation(&Vector3::new(5.0, 0.0, 0.0)));
    root.add_child(leaf);
    root.add_child(Node::with_mesh(unit_cube()));

    let aabb = root.bounding_box().unwrap();
    assert_eq!(aabb.mins, Point3::new(0.0, 0.0, 0.0));
    assert_eq!(aabb.maxs, Point3::new(6.0, 1.0, 1.0));
}

#[test]
fn tags_keep_their_three_shapes_distinct() {
    let mut node = Node::new();
    assert!(node.tag().is_empty());

    node.set_tag(Tag::Value(std::sync::Arc::new(42_u32)));
    assert_eq!(node.tag().value::<u32>(), Some(&42));
    assert!(node.tag().properties().is_none());
    // A value tag does not silently become a property map.
    assert!(node.tag_mut().properties_mut().is_none());

    node.set_tag(Tag::Empty);
    node.tag_mut()
        .properties_mut()
        .unwrap()
        .insert("material".into(), "oak".into());
    assert_eq!(
        node.tag().properties().unwrap().get("material").map(String::as_str),
        Some("oak")
    );
    assert!(node.tag().value::<u32>().is_none());
}

#[test]
fn collision_structure_counts_expanded_triangles() {
    let mesh = unit_cube();
    assert_eq!(mesh.collision_structure().len(), 12);
    assert_eq!(mesh.triangle_count(), 12);
}

#[test]
fn invalidate_recomputes_bounds_after_manual_mutation() {
    let mut mesh = unit_cube();
    assert_eq!(bounds(&mesh)[3], 1.0);
    let stretched: Vec<Point3<f64>> = mesh
        .vertex_pool()
        .points()
        .iter()
        .map(|p| Point3::new(p.x * 2.0, p.y, p.z))
        .collect();
    mesh.deform(&stretched).unwrap();
    assert_eq!(bounds(&mesh)[3], 2.0);
}
