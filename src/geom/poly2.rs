//! 2D polygon tests in a face's dominant-axis projection.

use nalgebra::Point2;

use crate::float_types::Real;
use crate::predicates::orient2d;

/// Twice-signed-area free version: positive for counterclockwise loops.
pub fn signed_area_2d(poly: &[Point2<Real>]) -> Real {
    let mut acc = 0.0;
    for (i, p) in poly.iter().enumerate() {
        let q = &poly[(i + 1) % poly.len()];
        acc += p.x * q.y - q.x * p.y;
    }
    acc * 0.5
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PolygonLocation {
    Inside,
    Outside,
    OnBoundary,
}

/// Locate `pt` relative to a simple polygon (any winding).
///
/// On-boundary detection is exact: a point is on the boundary iff some edge
/// is collinear with it (`orient2d == 0`) and the point lies within the
/// edge's coordinate span. Interior/exterior is decided by crossing parity.
pub fn point_in_polygon_2d(pt: &Point2<Real>, poly: &[Point2<Real>]) -> PolygonLocation {
    let n = poly.len();
    let mut inside = false;
    for i in 0..n {
        let a = &poly[i];
        let b = &poly[(i + 1) % n];

        let side = orient2d(a, b, pt);
        if side == 0.0
            && pt.x >= a.x.min(b.x)
            && pt.x <= a.x.max(b.x)
            && pt.y >= a.y.min(b.y)
            && pt.y <= a.y.max(b.y)
        {
            return PolygonLocation::OnBoundary;
        }

        // Standard upward-crossing parity rule, half-open in y so shared
        // vertices are counted once.
        if (a.y <= pt.y) != (b.y <= pt.y) {
            let crosses_left = if b.y > a.y { side > 0.0 } else { side < 0.0 };
            if crosses_left {
                inside = !inside;
            }
        }
    }
    if inside {
        PolygonLocation::Inside
    } else {
        PolygonLocation::Outside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point2<Real>> {
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(0.0, 2.0),
        ]
    }

    #[test]
    fn inside_outside_boundary() {
        let sq = square();
        assert_eq!(point_in_polygon_2d(&Point2::new(1.0, 1.0), &sq), PolygonLocation::Inside);
        assert_eq!(point_in_polygon_2d(&Point2::new(3.0, 1.0), &sq), PolygonLocation::Outside);
        assert_eq!(point_in_polygon_2d(&Point2::new(2.0, 1.0), &sq), PolygonLocation::OnBoundary);
        assert_eq!(point_in_polygon_2d(&Point2::new(0.0, 0.0), &sq), PolygonLocation::OnBoundary);
    }

    #[test]
    fn winding_direction_does_not_matter() {
        let mut sq = square();
        sq.reverse();
        assert_eq!(point_in_polygon_2d(&Point2::new(1.0, 1.0), &sq), PolygonLocation::Inside);
        assert_eq!(point_in_polygon_2d(&Point2::new(-0.5, 1.0), &sq), PolygonLocation::Outside);
    }

    #[test]
    fn concave_polygon() {
        // A "C" shape; the notch must count as outside.
        let c = vec![
            Point2::new(0.0, 0.0),
            Point2::new(3.0, 0.0),
            Point2::new(3.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 2.0),
            Point2::new(3.0, 2.0),
            Point2::new(3.0, 3.0),
            Point2::new(0.0, 3.0),
        ];
        assert_eq!(point_in_polygon_2d(&Point2::new(0.5, 1.5), &c), PolygonLocation::Inside);
        assert_eq!(point_in_polygon_2d(&Point2::new(2.0, 1.5), &c), PolygonLocation::Outside);
    }
}
