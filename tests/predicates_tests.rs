mod support;

use meshcsg::predicates::{incircle, insphere, orient2d, orient3d};
use nalgebra::{Point2, Point3};

#[test]
fn orient3d_matches_symbolic_sign_on_a_grid() {
    // All 4-point subsets of a small lattice: the predicate sign must agree
    // with the (exactly representable) integer determinant.
    let pts: Vec<Point3<f64>> = (0..3)
        .flat_map(|x| (0..3).flat_map(move |y| (0..2).map(move |z| Point3::new(x as f64, y as f64, z as f64))))
        .collect();

    let det_int = |a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>, d: &Point3<f64>| -> i64 {
        let m = [
            [(b.x - a.x) as i64, (b.y - a.y) as i64, (b.z - a.z) as i64],
            [(c.x - a.x) as i64, (c.y - a.y) as i64, (c.z - a.z) as i64],
            [(d.x - a.x) as i64, (d.y - a.y) as i64, (d.z - a.z) as i64],
        ];
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    };

    let n = pts.len();
    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                for l in 0..n {
                    let expect = det_int(&pts[i], &pts[j], &pts[k], &pts[l]).signum();
                    let got = orient3d(&pts[i], &pts[j], &pts[k], &pts[l]);
                    let got_sign = if got > 0.0 {
                        1
                    } else if got < 0.0 {
                        -1
                    } else {
                        0
                    };
                    assert_eq!(got_sign, expect, "points {i},{j},{k},{l}");
                }
            }
        }
    }
}

#[test]
fn orient2d_sign_survives_uniform_scaling() {
    let a = Point2::new(0.1, 0.7);
    let b = Point2::new(0.3, 0.2);
    let c = Point2::new(0.9, 0.4);
    let base = orient2d(&a, &b, &c).signum();
    for exp in [-60, -20, 20, 60] {
        let k = 2f64.powi(exp);
        let s = |p: &Point2<f64>| Point2::new(p.x * k, p.y * k);
        assert_eq!(orient2d(&s(&a), &s(&b), &s(&c)).signum(), base, "scale 2^{exp}");
    }
}

#[test]
fn incircle_detects_tiny_perturbations() {
    let a = Point2::new(-1.0, 0.0);
    let b = Point2::new(1.0, 0.0);
    let c = Point2::new(0.0, 1.0);
    // On the unit circle, then nudged by one ulp in each direction.
    let on = Point2::new(0.0, -1.0);
    assert_eq!(incircle(&a, &b, &c, &on), 0.0);
    let inside = Point2::new(0.0, -1.0 + 1e-15);
    assert!(incircle(&a, &b, &c, &inside) > 0.0);
    let outside = Point2::new(0.0, -1.0 - 1e-15);
    assert!(incircle(&a, &b, &c, &outside) < 0.0);
}

#[test]
fn insphere_detects_tiny_perturbations() {
    let a = Point3::new(0.0, 1.0, 0.0);
    let b = Point3::new(1.0, 0.0, 0.0);
    let c = Point3::new(0.0, 0.0, 1.0);
    let d = Point3::new(-1.0, 0.0, 0.0);
    assert!(orient3d(&a, &b, &c, &d) > 0.0);

    let on = Point3::new(0.0, -1.0, 0.0);
    assert_eq!(insphere(&a, &b, &c, &d, &on), 0.0);
    assert!(insphere(&a, &b, &c, &d, &Point3::new(0.0, -1.0 + 1e-15, 0.0)) > 0.0);
    assert!(insphere(&a, &b, &c, &d, &Point3::new(0.0, -1.0 - 1e-15, 0.0)) < 0.0);
}
