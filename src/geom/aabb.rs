//! Axis-aligned bounding box helpers over parry's [`Aabb`].

use nalgebra::Point3;

use crate::float_types::{parry3d::bounding_volume::Aabb, Real};

/// Bounding box of a point cloud; a degenerate box at the origin when empty.
pub fn aabb_of_points<'a, I>(points: I) -> Aabb
where
    I: IntoIterator<Item = &'a Point3<Real>>,
{
    let mut mins = Point3::new(Real::MAX, Real::MAX, Real::MAX);
    let mut maxs = Point3::new(-Real::MAX, -Real::MAX, -Real::MAX);
    let mut any = false;
    for p in points {
        any = true;
        mins.x = mins.x.min(p.x);
        mins.y = mins.y.min(p.y);
        mins.z = mins.z.min(p.z);
        maxs.x = maxs.x.max(p.x);
        maxs.y = maxs.y.max(p.y);
        maxs.z = maxs.z.max(p.z);
    }
    if !any {
        return Aabb::new(Point3::origin(), Point3::origin());
    }
    Aabb::new(mins, maxs)
}

/// A copy of `bb` grown by `eps` on every side.
pub fn inflated(bb: &Aabb, eps: Real) -> Aabb {
    Aabb::new(
        Point3::new(bb.mins.x - eps, bb.mins.y - eps, bb.mins.z - eps),
        Point3::new(bb.maxs.x + eps, bb.maxs.y + eps, bb.maxs.z + eps),
    )
}

pub fn point_in_aabb_with_tolerance(p: &Point3<Real>, bb: &Aabb, eps: Real) -> bool {
    p.x >= bb.mins.x - eps
        && p.x <= bb.maxs.x + eps
        && p.y >= bb.mins.y - eps
        && p.y <= bb.maxs.y + eps
        && p.z >= bb.mins.z - eps
        && p.z <= bb.maxs.z + eps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::float_types::parry3d::bounding_volume::BoundingVolume;

    #[test]
    fn cloud_bounds() {
        let pts = [
            Point3::new(-1.0, 2.0, 0.5),
            Point3::new(3.0, -4.0, 0.0),
            Point3::new(0.0, 0.0, 9.0),
        ];
        let bb = aabb_of_points(pts.iter());
        assert_eq!(bb.mins, Point3::new(-1.0, -4.0, 0.0));
        assert_eq!(bb.maxs, Point3::new(3.0, 2.0, 9.0));
        assert!(point_in_aabb_with_tolerance(&Point3::new(3.0 + 1e-13, 0.0, 0.0), &bb, 1e-12));
        assert!(!point_in_aabb_with_tolerance(&Point3::new(3.1, 0.0, 0.0), &bb, 1e-12));
    }

    #[test]
    fn inflation_keeps_intersection_symmetric() {
        let a = Aabb::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0));
        let b = Aabb::new(Point3::new(1.0 + 1e-13, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        assert!(inflated(&a, 1e-12).intersects(&b));
        assert!(inflated(&b, 1e-12).intersects(&a));
    }
}
