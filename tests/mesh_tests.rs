mod support;

use meshcsg::mesh::{MeshIdx, MeshOptions, MeshSet};
use meshcsg::shapes;
use meshcsg::traits::TransformOps;
use nalgebra::{Matrix4, Point3};

use crate::support::approx_eq;

#[test]
fn cube_topology() {
    let c: MeshSet = shapes::cube(2.0, None).unwrap();
    assert_eq!(c.meshes.len(), 1);
    assert!(c.is_closed_manifold());
    assert_eq!(c.euler_characteristic(), 2);
    assert!(approx_eq(c.surface_area(), 24.0, 1e-12));
    assert!(approx_eq(c.signed_volume(), 8.0, 1e-12));

    // Every edge twinned, and twin invariants hold.
    for f in c.live_faces() {
        for e in c.face_edges(f) {
            let twin = c.edges[e.index()].twin.expect("closed cube edge");
            assert_eq!(c.edges[twin.index()].twin, Some(e));
            let (u, v) = c.edge_endpoints(e);
            let (tu, tv) = c.edge_endpoints(twin);
            assert_eq!((u, v), (tv, tu), "twin must traverse the edge backwards");
        }
    }
}

#[test]
fn invert_negates_volume() {
    let mut c: MeshSet = shapes::cube(1.0, None).unwrap();
    let v = c.signed_volume();
    c.invert();
    assert!(approx_eq(c.signed_volume(), -v, 1e-12));
    // Normals flipped too.
    for f in c.live_faces() {
        let pts = c.face_points(f);
        let plane = &c.faces[f.index()].plane;
        // The loop must wind with the plane normal.
        let newell = meshcsg::geom::Plane::from_loop(&pts).unwrap();
        assert!(newell.normal.dot(&plane.normal) > 0.99);
    }
    c.invert();
    assert!(approx_eq(c.signed_volume(), v, 1e-12));
}

#[test]
fn transform_updates_planes_and_bounds() {
    let c: MeshSet = shapes::cube(1.0, None).unwrap();
    let moved = c.transformed(&Matrix4::new_translation(&nalgebra::Vector3::new(5.0, 0.0, 0.0)));
    let bb = moved.bounding_box();
    assert!(approx_eq(bb.mins.x, 5.0, 1e-12));
    assert!(approx_eq(bb.maxs.x, 6.0, 1e-12));
    assert!(approx_eq(moved.signed_volume(), 1.0, 1e-12));

    let scaled = c.scale(2.0, 1.0, 1.0);
    assert!(approx_eq(scaled.signed_volume(), 2.0, 1e-12));
}

#[test]
fn retain_meshes_and_vertex_collection() {
    let a: MeshSet = shapes::cube(1.0, None).unwrap();
    let b: MeshSet = shapes::cube(1.0, None).unwrap().translate(3.0, 0.0, 0.0);

    // Merge the two through a combined face stream.
    let mut vertices = a.vertices.clone();
    let offset = vertices.len();
    vertices.extend(b.vertices.iter().copied());
    let mut stream = Vec::new();
    for (set, shift) in [(&a, 0), (&b, offset)] {
        for f in set.live_faces() {
            let verts = set.face_vertices(f);
            stream.push(verts.len());
            stream.extend(verts.iter().map(|v| v.index() + shift));
        }
    }
    let mut combined: MeshSet = MeshSet::from_face_stream(&vertices, &stream, None).unwrap();
    assert_eq!(combined.meshes.len(), 2);
    assert_eq!(combined.vertices.len(), 16);

    combined.retain_meshes(|m| m == 0);
    assert_eq!(combined.meshes.len(), 1);
    // Vertex storage compacted down to the surviving component.
    assert_eq!(combined.vertices.len(), 8);
    assert!(approx_eq(combined.signed_volume(), 1.0, 1e-12));
}

#[test]
fn avoid_cavities_reorients_nested_shells() {
    // Outer box plus an inverted inner box, spliced into one stream.
    let outer: MeshSet = shapes::cube(3.0, None).unwrap();
    let mut inner: MeshSet = shapes::cube(1.0, None).unwrap().translate(1.0, 1.0, 1.0);
    inner.invert();

    let mut vertices = outer.vertices.clone();
    let offset = vertices.len();
    vertices.extend(inner.vertices.iter().copied());
    let mut stream = Vec::new();
    for (set, shift) in [(&outer, 0), (&inner, offset)] {
        for f in set.live_faces() {
            let verts = set.face_vertices(f);
            stream.push(verts.len());
            stream.extend(verts.iter().map(|v| v.index() + shift));
        }
    }

    // Default: the cavity shell is preserved as given.
    let plain: MeshSet = MeshSet::from_face_stream(&vertices, &stream, None).unwrap();
    assert_eq!(plain.meshes.len(), 2);
    assert!(approx_eq(plain.signed_volume(), 27.0 - 1.0, 1e-12));

    // With the hint, the inner shell is flipped back outward.
    let fixed: MeshSet =
        MeshSet::from_face_stream_with(&vertices, &stream, &MeshOptions { avoid_cavities: true }, None)
            .unwrap();
    assert!(approx_eq(fixed.signed_volume(), 27.0 + 1.0, 1e-12));
    assert!((0..2).all(|m| fixed.mesh_signed_volume(MeshIdx(m)) > 0.0));
}

#[test]
fn face_stream_roundtrip_preserves_geometry() {
    let s: MeshSet = shapes::sphere(1.0, 12, 6, None).unwrap();
    let mut stream = Vec::new();
    for f in s.live_faces() {
        let verts = s.face_vertices(f);
        stream.push(verts.len());
        stream.extend(verts.iter().map(|v| v.index()));
    }
    let rebuilt: MeshSet = MeshSet::from_face_stream(&s.vertices, &stream, None).unwrap();
    assert_eq!(rebuilt.face_count(), s.face_count());
    assert!(approx_eq(rebuilt.signed_volume(), s.signed_volume(), 1e-12));
    assert!(rebuilt.is_closed_manifold());
}

#[test]
fn from_faces_builder() {
    let verts = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
    ];
    use meshcsg::mesh::VertIdx;
    let faces = vec![
        (vec![VertIdx(0), VertIdx(2), VertIdx(1)], None),
        (vec![VertIdx(0), VertIdx(1), VertIdx(3)], None),
        (vec![VertIdx(1), VertIdx(2), VertIdx(3)], None),
        (vec![VertIdx(2), VertIdx(0), VertIdx(3)], None),
    ];
    let tetra: MeshSet = MeshSet::from_faces(verts, faces, None).unwrap();
    assert!(tetra.is_closed_manifold());
    assert!(approx_eq(tetra.signed_volume(), 1.0 / 6.0, 1e-12));
}
