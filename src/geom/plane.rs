//! Planes and the dominant-axis projection used for 2D tests on a face.

use nalgebra::{Point2, Point3, Vector3};

use crate::float_types::{Real, EPSILON};

/// A plane `normal · p + d = 0`, with a unit normal. The signed distance of a
/// point to the plane is `normal · p + d`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub normal: Vector3<Real>,
    pub d: Real,
}

impl Plane {
    pub const fn new(normal: Vector3<Real>, d: Real) -> Self {
        Plane { normal, d }
    }

    /// Plane through three points, or `None` when they are collinear.
    pub fn from_points(a: &Point3<Real>, b: &Point3<Real>, c: &Point3<Real>) -> Option<Plane> {
        let n = (b - a).cross(&(c - a));
        let len = n.norm();
        if len < EPSILON {
            return None;
        }
        let n = n / len;
        Some(Plane { normal: n, d: -n.dot(&a.coords) })
    }

    /// Supporting plane of a polygon loop by Newell's method. Robust for
    /// non-convex loops and loops with short edges; `None` when the loop has
    /// no usable area.
    pub fn from_loop(points: &[Point3<Real>]) -> Option<Plane> {
        if points.len() < 3 {
            return None;
        }
        let mut n = Vector3::<Real>::zeros();
        let mut centroid = Vector3::<Real>::zeros();
        for (i, p) in points.iter().enumerate() {
            let q = &points[(i + 1) % points.len()];
            n.x += (p.y - q.y) * (p.z + q.z);
            n.y += (p.z - q.z) * (p.x + q.x);
            n.z += (p.x - q.x) * (p.y + q.y);
            centroid += p.coords;
        }
        let len = n.norm();
        if len < EPSILON {
            return None;
        }
        let n = n / len;
        let centroid = centroid / points.len() as Real;
        Some(Plane { normal: n, d: -n.dot(&centroid) })
    }

    #[inline]
    pub fn signed_distance(&self, p: &Point3<Real>) -> Real {
        self.normal.dot(&p.coords) + self.d
    }

    pub fn flip(&mut self) {
        self.normal = -self.normal;
        self.d = -self.d;
    }

    #[must_use]
    pub fn flipped(&self) -> Plane {
        Plane { normal: -self.normal, d: -self.d }
    }

    /// Index (0, 1, 2) of the normal's largest-magnitude component.
    pub fn dominant_axis(&self) -> usize {
        let n = &self.normal;
        let (ax, ay, az) = (n.x.abs(), n.y.abs(), n.z.abs());
        if ax >= ay && ax >= az {
            0
        } else if ay >= az {
            1
        } else {
            2
        }
    }

    /// Project a point onto the dominant-axis 2D frame of this plane.
    ///
    /// The projection just selects two coordinates (no arithmetic), so exact
    /// 2D predicates on projected points remain exact. Axes are chosen so
    /// that the projected winding matches the 3D winding seen from the
    /// normal side of the plane.
    pub fn project(&self, p: &Point3<Real>) -> Point2<Real> {
        match self.dominant_axis() {
            0 => {
                if self.normal.x >= 0.0 {
                    Point2::new(p.y, p.z)
                } else {
                    Point2::new(p.z, p.y)
                }
            },
            1 => {
                if self.normal.y >= 0.0 {
                    Point2::new(p.z, p.x)
                } else {
                    Point2::new(p.x, p.z)
                }
            },
            _ => {
                if self.normal.z >= 0.0 {
                    Point2::new(p.x, p.y)
                } else {
                    Point2::new(p.y, p.x)
                }
            },
        }
    }
}
