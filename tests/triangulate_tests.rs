mod support;

use meshcsg::csg::hooks::triangulate_loop;
use meshcsg::csg::{BooleanOp, ClassifyType, Csg, TriangulateOutput};
use meshcsg::geom::{signed_area_2d, Plane};
use meshcsg::shapes;
use meshcsg::traits::TransformOps;
use nalgebra::{Point2, Point3, Vector3};

use crate::support::{approx_eq, assert_well_formed};

/// A comb-shaped polygon with six reflex vertices at the notch bottoms.
fn comb() -> Vec<Point2<f64>> {
    [
        (0.0, 0.0),
        (7.0, 0.0),
        (7.0, 3.0),
        (6.0, 3.0),
        (6.0, 1.0),
        (5.0, 1.0),
        (5.0, 3.0),
        (4.0, 3.0),
        (4.0, 1.0),
        (3.0, 1.0),
        (3.0, 3.0),
        (2.0, 3.0),
        (2.0, 1.0),
        (1.0, 1.0),
        (1.0, 3.0),
        (0.0, 3.0),
    ]
    .into_iter()
    .map(|(x, y)| Point2::new(x, y))
    .collect()
}

#[test]
fn reflex_polygon_triangulates_to_n_minus_two() {
    let poly = comb();
    let n = poly.len();
    let area = signed_area_2d(&poly);
    assert!(approx_eq(area, 15.0, 1e-12), "fixture area {area}");

    let points: Vec<Point3<f64>> = poly.iter().map(|p| Point3::new(p.x, p.y, 0.0)).collect();
    let verts: Vec<u32> = (0..n as u32).collect();
    let plane = Plane::new(Vector3::z(), 0.0);

    let tris = triangulate_loop(&verts, &points, &plane);
    assert_eq!(tris.len(), n - 2);

    let total: f64 = tris
        .iter()
        .map(|t| {
            let tri: Vec<Point2<f64>> = t
                .iter()
                .map(|&i| {
                    let p = &points[i as usize];
                    Point2::new(p.x, p.y)
                })
                .collect();
            signed_area_2d(&tri)
        })
        .sum();
    assert!(approx_eq(total, area, 1e-5), "triangle area sum {total} vs {area}");
}

#[test]
fn triangulation_hook_fans_all_output_faces() {
    let a = shapes::cube(1.0, None).unwrap();
    let b = shapes::cube(1.0, None).unwrap().translate(0.5, 0.5, 0.5);

    let mut csg = Csg::new();
    TriangulateOutput::install(&mut csg.hooks);
    let out = csg.compute(&a, &b, BooleanOp::Union, ClassifyType::Normal).unwrap();

    assert_well_formed(&out, "triangulated union");
    for f in out.live_faces() {
        assert_eq!(out.face_vertices(f).len(), 3);
    }
    assert!(approx_eq(out.signed_volume(), 1.875, 1e-12));
}
