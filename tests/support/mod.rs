//! Shared helpers for the integration tests.

#![allow(dead_code)]

use meshcsg::float_types::Real;
use meshcsg::mesh::MeshSet;

pub fn approx_eq(a: Real, b: Real, eps: Real) -> bool {
    (a - b).abs() < eps
}

/// `[min_x, min_y, min_z, max_x, max_y, max_z]` of a mesh set.
pub fn bounding_box(set: &MeshSet) -> [Real; 6] {
    let bb = set.bounding_box();
    [bb.mins.x, bb.mins.y, bb.mins.z, bb.maxs.x, bb.maxs.y, bb.maxs.z]
}

/// Every component closed, consistently oriented, with outward normals
/// overall (positive total volume unless the set is empty).
pub fn assert_well_formed(set: &MeshSet, label: &str) {
    if set.is_empty() {
        return;
    }
    assert!(set.is_closed_manifold(), "{label}: expected a closed oriented manifold");
    for (m, mesh) in set.meshes.iter().enumerate() {
        assert_eq!(mesh.open_edges, 0, "{label}: component {m} has open edges");
    }
}

/// Canonical listing of the faces of a set as sorted vertex-coordinate
/// tuples, for order-insensitive comparisons.
pub fn face_signature(set: &MeshSet) -> Vec<Vec<[u64; 3]>> {
    let mut faces: Vec<Vec<[u64; 3]>> = set
        .live_faces()
        .map(|f| {
            let mut pts: Vec<[u64; 3]> = set
                .face_points(f)
                .into_iter()
                .map(|p| [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()])
                .collect();
            pts.sort_unstable();
            pts
        })
        .collect();
    faces.sort_unstable();
    faces
}
