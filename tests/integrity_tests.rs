use nalgebra::{Matrix4, Point3, Vector3};
use scenemesh::mesh::{Face, Mesh, Primitive, Tessellation, Vertex};
use scenemesh::{Appearance, IntegrityChecker, MeshBuilder, Node};

mod support;

fn valid_box() -> Mesh {
    let mut mesh = Mesh::new();
    let appearance = Appearance::new();
    MeshBuilder::new(&mut mesh)
        .cuboid(Point3::origin(), Vector3::new(1.0, 1.0, 1.0), &appearance, None)
        .unwrap();
    mesh
}

/// A mesh holding one sound quad and one face whose pool index points
/// past the pool.
fn mesh_with_dangling_index() -> Mesh {
    let mut mesh = Mesh::new();
    let appearance = Appearance::new();
    MeshBuilder::new(&mut mesh).quad(
        [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ],
        &appearance,
        false,
        false,
    );
    let bad = Face::new(vec![
        Vertex::new(Point3::new(0.0, 0.0, 1.0), 99),
        Vertex::new(Point3::new(1.0, 0.0, 1.0), 0),
        Vertex::new(Point3::new(1.0, 1.0, 1.0), 1),
    ]);
    mesh.add_face(&appearance, false, false, bad);
    mesh
}

#[test]
fn a_well_formed_mesh_passes() {
    let mut mesh = valid_box();
    let report = IntegrityChecker::strict().check_mesh(&mut mesh);
    assert!(report.is_ok(), "unexpected findings:\n{report}");
    assert_eq!(mesh.face_count(), 6);
}

#[test]
fn fix_mode_deletes_faces_with_dangling_pool_indices() {
    let mut mesh = mesh_with_dangling_index();
    assert_eq!(mesh.face_count(), 2);
    let report = IntegrityChecker::new().check_mesh(&mut mesh);
    assert!(!report.is_ok());
    assert_eq!(mesh.face_count(), 1, "only the malformed face is gone");
}

#[test]
fn strict_mode_records_without_mutating() {
    let mut mesh = mesh_with_dangling_index();
    let report = IntegrityChecker::strict().check_mesh(&mut mesh);
    assert_eq!(mesh.face_count(), 2, "strict mode never deletes");
    assert!(
        report.errors().iter().any(|e| e.contains("pool index 99")),
        "diagnostic names the dangling index:\n{report}"
    );
    // Strict diagnostics carry the face dump.
    assert!(report.errors().iter().any(|e| e.contains("vertices:")));
}

#[test]
fn degenerate_faces_are_flagged_and_removed() {
    let mut mesh = Mesh::new();
    let appearance = Appearance::new();
    MeshBuilder::new(&mut mesh).line(
        Point3::origin(),
        Point3::new(1.0, 0.0, 0.0),
        &appearance,
    );
    let report = IntegrityChecker::new().check_mesh(&mut mesh);
    assert!(!report.is_ok());
    assert_eq!(mesh.face_count(), 0);
    assert!(
        mesh.face_groups().is_empty(),
        "emptied groups are deleted too"
    );
}

#[test]
fn out_of_range_tessellation_indices_are_flagged() {
    let mut mesh = Mesh::new();
    let appearance = Appearance::new();
    mesh.add_vertex(Point3::origin());
    mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
    mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
    let face = Face::with_tessellation(
        vec![
            Vertex::new(Point3::origin(), 0),
            Vertex::new(Point3::new(1.0, 0.0, 0.0), 1),
            Vertex::new(Point3::new(0.0, 1.0, 0.0), 2),
        ],
        Tessellation::new(vec![vec![0, 1, 7, 0]], vec![Primitive::TriangleList(vec![0, 1, 2])]),
    );
    mesh.add_face(&appearance, false, false, face);

    let report = IntegrityChecker::strict().check_mesh(&mut mesh);
    assert!(report.errors().iter().any(|e| e.contains("outline")));
}

#[test]
fn malformed_primitives_are_flagged() {
    let mut mesh = Mesh::new();
    let appearance = Appearance::new();
    mesh.add_vertex(Point3::origin());
    mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
    mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
    // A triangle list with a dangling fourth index cannot expand to a
    // non-zero multiple of three.
    let face = Face::with_tessellation(
        vec![
            Vertex::new(Point3::origin(), 0),
            Vertex::new(Point3::new(1.0, 0.0, 0.0), 1),
            Vertex::new(Point3::new(0.0, 1.0, 0.0), 2),
        ],
        Tessellation::new(
            vec![vec![0, 1, 2, 0]],
            vec![Primitive::TriangleList(vec![0, 1, 2, 2])],
        ),
    );
    mesh.add_face(&appearance, false, false, face);

    let report = IntegrityChecker::strict().check_mesh(&mut mesh);
    assert!(!report.is_ok());
}

#[test]
fn nan_transforms_are_reported_across_the_scene() {
    let mut root = Node::new();
    root.set_name("root");
    let mut child = Node::with_mesh(valid_box());
    child.set_name("leaf");
    let mut broken = Matrix4::identity();
    broken[(1, 3)] = f64::NAN;
    child.set_transform(broken);
    root.add_child(child);

    let report = IntegrityChecker::strict().check_scene(&mut root);
    assert_eq!(report.len(), 1);
    assert!(report.errors()[0].contains("leaf"));
    assert!(report.errors()[0].contains("NaN"));
}

#[test]
fn scene_check_repairs_mesh_leaves_in_fix_mode() {
    let mut root = Node::new();
    root.add_child(Node::with_mesh(mesh_with_dangling_index()));

    let report = IntegrityChecker::new().check_scene(&mut root);
    assert!(!report.is_ok());
    let repaired = root.children()[0].mesh().unwrap();
    assert_eq!(repaired.face_count(), 1);
}

#[test]
fn explicit_zero_vertex_normals_are_flagged() {
    let mut mesh = Mesh::new();
    let appearance = Appearance::new();
    mesh.add_vertex(Point3::origin());
    mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
    mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
    let mut vertices = vec![
        Vertex::new(Point3::origin(), 0),
        Vertex::new(Point3::new(1.0, 0.0, 0.0), 1),
        Vertex::new(Point3::new(0.0, 1.0, 0.0), 2),
    ];
    vertices[1].normal = Some(Vector3::zeros());
    mesh.add_face(&appearance, false, false, Face::new(vertices));

    let report = IntegrityChecker::strict().check_mesh(&mut mesh);
    assert!(report.errors().iter().any(|e| e.contains("normal is zero")));
}
