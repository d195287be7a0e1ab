//! Triangle queries: closest point, segment crossing, triangle overlap.

use nalgebra::{Point2, Point3};

use crate::float_types::Real;
use crate::geom::plane::Plane;
use crate::geom::poly2::{point_in_polygon_2d, PolygonLocation};
use crate::predicates::{orient2d, orient3d};

/// Closest point on triangle `(a, b, c)` to `p` (Voronoi-region walk).
pub fn closest_point_on_triangle(
    p: &Point3<Real>,
    a: &Point3<Real>,
    b: &Point3<Real>,
    c: &Point3<Real>,
) -> Point3<Real> {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

/// How a segment meets a triangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegTriCrossing {
    /// No contact.
    Miss,
    /// The open segment passes through the open triangle interior.
    /// The payload is `+1` when the segment runs with the triangle normal
    /// (enters from below), `-1` against it.
    Cross(i32),
    /// Contact through an edge, a vertex, an endpoint on the plane, or a
    /// coplanar segment: topologically ambiguous for a ray caster.
    Touch,
}

/// Exact segment/triangle crossing via `orient3d` signs only.
pub fn segment_triangle(
    p: &Point3<Real>,
    q: &Point3<Real>,
    a: &Point3<Real>,
    b: &Point3<Real>,
    c: &Point3<Real>,
) -> SegTriCrossing {
    let sp = orient3d(a, b, c, p);
    let sq = orient3d(a, b, c, q);

    if sp == 0.0 || sq == 0.0 {
        return SegTriCrossing::Touch;
    }
    if (sp > 0.0) == (sq > 0.0) {
        return SegTriCrossing::Miss;
    }

    let s1 = orient3d(p, q, a, b);
    let s2 = orient3d(p, q, b, c);
    let s3 = orient3d(p, q, c, a);
    if s1 == 0.0 || s2 == 0.0 || s3 == 0.0 {
        // Passes through an edge or vertex of the triangle.
        if (s1 >= 0.0 && s2 >= 0.0 && s3 >= 0.0) || (s1 <= 0.0 && s2 <= 0.0 && s3 <= 0.0) {
            return SegTriCrossing::Touch;
        }
        return SegTriCrossing::Miss;
    }
    if (s1 > 0.0) == (s2 > 0.0) && (s2 > 0.0) == (s3 > 0.0) {
        // Crossing direction relative to the triangle normal: the segment
        // starts below the plane (sp < 0) exactly when it runs with the
        // normal.
        SegTriCrossing::Cross(if sp < 0.0 { 1 } else { -1 })
    } else {
        SegTriCrossing::Miss
    }
}

/// Exact boolean triangle/triangle intersection test. Shared boundary
/// (touching edges or vertices) counts as intersecting.
pub fn tri_tri_intersect(t1: &[Point3<Real>; 3], t2: &[Point3<Real>; 3]) -> bool {
    let side = |t: &[Point3<Real>; 3], u: &[Point3<Real>; 3]| {
        let s0 = orient3d(&t[0], &t[1], &t[2], &u[0]);
        let s1 = orient3d(&t[0], &t[1], &t[2], &u[1]);
        let s2 = orient3d(&t[0], &t[1], &t[2], &u[2]);
        (s0, s1, s2)
    };

    let (a0, a1, a2) = side(t1, t2);
    if (a0 > 0.0 && a1 > 0.0 && a2 > 0.0) || (a0 < 0.0 && a1 < 0.0 && a2 < 0.0) {
        return false;
    }
    let (b0, b1, b2) = side(t2, t1);
    if (b0 > 0.0 && b1 > 0.0 && b2 > 0.0) || (b0 < 0.0 && b1 < 0.0 && b2 < 0.0) {
        return false;
    }

    if a0 == 0.0 && a1 == 0.0 && a2 == 0.0 {
        // Coplanar: test overlap in the shared plane's 2D projection.
        return coplanar_tri_tri(t1, t2);
    }

    // Each triangle must be cut by the other's supporting plane; check the
    // edges of each against the other triangle.
    let edges = |t: &[Point3<Real>; 3]| [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])];
    for (p, q) in edges(t1) {
        match segment_triangle(&p, &q, &t2[0], &t2[1], &t2[2]) {
            SegTriCrossing::Miss => {},
            _ => return true,
        }
    }
    for (p, q) in edges(t2) {
        match segment_triangle(&p, &q, &t1[0], &t1[1], &t1[2]) {
            SegTriCrossing::Miss => {},
            _ => return true,
        }
    }
    // Endpoints exactly on the other plane defeat segment_triangle's strict
    // crossing test; fall back to vertex-in-triangle checks.
    let on_tri = |s: Real, pt: &Point3<Real>, t: &[Point3<Real>; 3]| {
        s == 0.0 && vertex_in_coplanar_triangle(pt, t)
    };
    on_tri(a0, &t2[0], t1)
        || on_tri(a1, &t2[1], t1)
        || on_tri(a2, &t2[2], t1)
        || on_tri(b0, &t1[0], t2)
        || on_tri(b1, &t1[1], t2)
        || on_tri(b2, &t1[2], t2)
}

fn vertex_in_coplanar_triangle(p: &Point3<Real>, t: &[Point3<Real>; 3]) -> bool {
    let Some(plane) = Plane::from_points(&t[0], &t[1], &t[2]) else {
        return false;
    };
    let poly: Vec<Point2<Real>> = t.iter().map(|v| plane.project(v)).collect();
    point_in_polygon_2d(&plane.project(p), &poly) != PolygonLocation::Outside
}

fn coplanar_tri_tri(t1: &[Point3<Real>; 3], t2: &[Point3<Real>; 3]) -> bool {
    let Some(plane) = Plane::from_points(&t1[0], &t1[1], &t1[2]) else {
        return false;
    };
    let p1: Vec<Point2<Real>> = t1.iter().map(|v| plane.project(v)).collect();
    let p2: Vec<Point2<Real>> = t2.iter().map(|v| plane.project(v)).collect();

    for pt in &p2 {
        if point_in_polygon_2d(pt, &p1) != PolygonLocation::Outside {
            return true;
        }
    }
    for pt in &p1 {
        if point_in_polygon_2d(pt, &p2) != PolygonLocation::Outside {
            return true;
        }
    }
    // Edge/edge proper crossings.
    for i in 0..3 {
        let (a, b) = (&p1[i], &p1[(i + 1) % 3]);
        for j in 0..3 {
            let (c, d) = (&p2[j], &p2[(j + 1) % 3]);
            let d1 = orient2d(a, b, c);
            let d2 = orient2d(a, b, d);
            let d3 = orient2d(c, d, a);
            let d4 = orient2d(c, d, b);
            if ((d1 > 0.0) != (d2 > 0.0))
                && ((d3 > 0.0) != (d4 > 0.0))
                && d1 != 0.0
                && d2 != 0.0
                && d3 != 0.0
                && d4 != 0.0
            {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closest_point_regions() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(2.0, 0.0, 0.0);
        let c = Point3::new(0.0, 2.0, 0.0);
        // Above the interior: projects straight down.
        let q = closest_point_on_triangle(&Point3::new(0.5, 0.5, 3.0), &a, &b, &c);
        assert!((q - Point3::new(0.5, 0.5, 0.0)).norm() < 1e-14);
        // Beyond vertex b.
        let q = closest_point_on_triangle(&Point3::new(5.0, -1.0, 0.0), &a, &b, &c);
        assert!((q - b).norm() < 1e-14);
        // Beside edge ab.
        let q = closest_point_on_triangle(&Point3::new(1.0, -2.0, 0.0), &a, &b, &c);
        assert!((q - Point3::new(1.0, 0.0, 0.0)).norm() < 1e-14);
    }

    #[test]
    fn segment_crossing_signs() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(2.0, 0.0, 0.0);
        let c = Point3::new(0.0, 2.0, 0.0);
        let below = Point3::new(0.5, 0.5, -1.0);
        let above = Point3::new(0.5, 0.5, 1.0);
        assert_eq!(segment_triangle(&below, &above, &a, &b, &c), SegTriCrossing::Cross(1));
        assert_eq!(segment_triangle(&above, &below, &a, &b, &c), SegTriCrossing::Cross(-1));
        let outside = Point3::new(5.0, 5.0, -1.0);
        let outside2 = Point3::new(5.0, 5.0, 1.0);
        assert_eq!(segment_triangle(&outside, &outside2, &a, &b, &c), SegTriCrossing::Miss);
        // Through a vertex.
        let va = Point3::new(0.0, 0.0, -1.0);
        let vb = Point3::new(0.0, 0.0, 1.0);
        assert_eq!(segment_triangle(&va, &vb, &a, &b, &c), SegTriCrossing::Touch);
    }

    #[test]
    fn tri_tri_cases() {
        let t1 = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        // Piercing triangle.
        let t2 = [
            Point3::new(0.5, 0.5, -1.0),
            Point3::new(0.5, 0.5, 1.0),
            Point3::new(1.5, 1.5, 1.0),
        ];
        assert!(tri_tri_intersect(&t1, &t2));
        // Far away.
        let t3 = [
            Point3::new(10.0, 0.0, 5.0),
            Point3::new(12.0, 0.0, 5.0),
            Point3::new(10.0, 2.0, 5.0),
        ];
        assert!(!tri_tri_intersect(&t1, &t3));
        // Coplanar overlap.
        let t4 = [
            Point3::new(0.5, 0.5, 0.0),
            Point3::new(2.5, 0.5, 0.0),
            Point3::new(0.5, 2.5, 0.0),
        ];
        assert!(tri_tri_intersect(&t1, &t4));
        // Coplanar, disjoint.
        let t5 = [
            Point3::new(5.0, 5.0, 0.0),
            Point3::new(7.0, 5.0, 0.0),
            Point3::new(5.0, 7.0, 0.0),
        ];
        assert!(!tri_tri_intersect(&t1, &t5));
    }
}
