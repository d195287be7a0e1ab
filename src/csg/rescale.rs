//! Rescaling into the canonical unit box.
//!
//! The adaptive predicates' error bounds degrade for coordinates far from
//! the origin or at wildly different scales; mapping the joint bounds of
//! both operands into `[-1, 1]^3` before evaluating and back afterwards
//! keeps them sharp.

use nalgebra::{Matrix4, Translation3};

use crate::float_types::parry3d::bounding_volume::Aabb;
use crate::float_types::Real;

/// Forward and inverse affine maps taking `bounds` into `[-1, 1]^3`
/// (uniform scale, so angles and orientation survive).
pub fn unit_box_transforms(bounds: &Aabb) -> (Matrix4<Real>, Matrix4<Real>) {
    let center = bounds.center();
    let he = bounds.half_extents();
    let radius = he.x.max(he.y).max(he.z).max(Real::MIN_POSITIVE);

    let scale = Matrix4::new_scaling(1.0 / radius);
    let unscale = Matrix4::new_scaling(radius);
    let to_origin = Translation3::from(-center.coords).to_homogeneous();
    let from_origin = Translation3::from(center.coords).to_homogeneous();

    (scale * to_origin, from_origin * unscale)
}

/// Joint bounds of two boxes.
pub fn joint_bounds(a: &Aabb, b: &Aabb) -> Aabb {
    use crate::float_types::parry3d::bounding_volume::BoundingVolume;
    let mut joint = *a;
    joint.merge(b);
    joint
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn round_trip_is_identity() {
        let bb = Aabb::new(Point3::new(10.0, -4.0, 3.0), Point3::new(18.0, 2.0, 5.0));
        let (fwd, rev) = unit_box_transforms(&bb);
        let p = Point3::new(12.5, 0.0, 4.0);
        let q = fwd.transform_point(&p);
        assert!(q.x.abs() <= 1.0 + 1e-12 && q.y.abs() <= 1.0 + 1e-12 && q.z.abs() <= 1.0 + 1e-12);
        let r = rev.transform_point(&q);
        assert!((r - p).norm() < 1e-12);
    }

    #[test]
    fn corners_map_into_unit_box() {
        let bb = Aabb::new(Point3::new(-100.0, 0.0, 0.0), Point3::new(300.0, 40.0, 2.0));
        let (fwd, _) = unit_box_transforms(&bb);
        for corner in [bb.mins, bb.maxs] {
            let q = fwd.transform_point(&corner);
            assert!(q.x.abs() <= 1.0 + 1e-12);
            assert!(q.y.abs() <= 1.0 + 1e-12);
            assert!(q.z.abs() <= 1.0 + 1e-12);
        }
    }
}
