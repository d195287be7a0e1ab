//! Vector/matrix kernel helpers: planes, bounding boxes, triangles and 2D
//! polygon tests shared by the intersection and classification stages.

pub mod aabb;
pub mod plane;
pub mod poly2;
pub mod tri;

pub use aabb::{aabb_of_points, inflated, point_in_aabb_with_tolerance};
pub use plane::Plane;
pub use poly2::{point_in_polygon_2d, signed_area_2d, PolygonLocation};
pub use tri::{closest_point_on_triangle, segment_triangle, tri_tri_intersect, SegTriCrossing};
