mod support;

use meshcsg::csg::{BooleanOp, ClassifyType, Csg, FaceAttr, FaceEdgeAttr, FaceVertexAttr};
use meshcsg::mesh::{FaceKey, MeshSet};
use meshcsg::shapes;
use meshcsg::traits::TransformOps;

use crate::support::approx_eq;

fn cubes() -> (MeshSet, MeshSet) {
    let a = shapes::cube(1.0, None).unwrap();
    let b = shapes::cube(1.0, None).unwrap().translate(0.5, 0.5, 0.5);
    (a, b)
}

#[test]
fn face_attributes_follow_their_origin() {
    let (a, b) = cubes();

    let tags: FaceAttr<u32> = FaceAttr::new();
    for (i, f) in a.live_faces().enumerate() {
        tags.set(a.face_key(f), i as u32);
    }
    for f in b.live_faces() {
        tags.set(b.face_key(f), 100);
    }

    let mut csg = Csg::new();
    tags.install(&mut csg.hooks);
    let out = csg.compute(&a, &b, BooleanOp::Union, ClassifyType::Normal).unwrap();

    // Every output face inherited a tag, and both inputs contributed.
    let mut from_a = 0;
    let mut from_b = 0;
    for f in out.live_faces() {
        let tag = tags.get(out.face_key(f)).expect("face lost its attribute");
        if tag == 100 {
            from_b += 1;
        } else {
            assert!(tag < 6);
            from_a += 1;
        }
    }
    assert!(from_a >= 6 && from_b >= 6, "a: {from_a}, b: {from_b}");
}

#[test]
fn face_vertex_attributes_interpolate_across_the_cut() {
    let (a, b) = cubes();

    // Attribute = the vertex's z coordinate, per (face, corner).
    let attr: FaceVertexAttr<f64> = FaceVertexAttr::new();
    for f in a.live_faces() {
        for (k, p) in a.face_points(f).iter().enumerate() {
            attr.set(a.face_key(f), k, p.z);
        }
    }

    let mut csg = Csg::new();
    attr.install(&mut csg.hooks);
    let out = csg.compute(&a, &b, BooleanOp::AMinusB, ClassifyType::Normal).unwrap();

    // Wherever the attribute is present, it must reproduce z (an affine
    // function survives barycentric interpolation exactly).
    let mut checked = 0;
    for f in out.live_faces() {
        for (k, p) in out.face_points(f).iter().enumerate() {
            if let Some(v) = attr.get(out.face_key(f), k) {
                assert!(approx_eq(v, p.z, 1e-9), "corner {k}: {v} vs {}", p.z);
                checked += 1;
            }
        }
    }
    assert!(checked > 0, "no interpolated corners seen");
}

#[test]
fn face_edge_attributes_survive_splits_but_not_cuts() {
    let (a, b) = cubes();

    let attr: FaceEdgeAttr<&'static str> = FaceEdgeAttr::new();
    for f in a.live_faces() {
        let n = a.face_vertices(f).len();
        for k in 0..n {
            attr.set(a.face_key(f), k, "original");
        }
    }

    let mut csg = Csg::new();
    attr.install(&mut csg.hooks);
    let out = csg.compute(&a, &b, BooleanOp::AMinusB, ClassifyType::Normal).unwrap();

    let eps = 1e-9;
    let mut inherited = 0;
    let mut cut_edges = 0;
    for f in out.live_faces() {
        let pts = out.face_points(f);
        let n = pts.len();
        for k in 0..n {
            let p = pts[k];
            let q = pts[(k + 1) % n];
            let tagged = attr.get(out.face_key(f), k).is_some();
            // An edge on the original cube surface lies on the boundary box
            // of A; a cut edge lies on B's boundary planes at 0.5.
            let on_a_boundary = [p, q].iter().all(|r| {
                (r.x.abs() < eps || (r.x - 1.0).abs() < eps)
                    || (r.y.abs() < eps || (r.y - 1.0).abs() < eps)
                    || (r.z.abs() < eps || (r.z - 1.0).abs() < eps)
            });
            if tagged {
                inherited += 1;
                assert!(on_a_boundary);
            } else {
                cut_edges += 1;
            }
        }
    }
    assert!(inherited > 0, "no inherited edge attributes");
    assert!(cut_edges > 0, "expected fresh cut edges without attributes");
}
