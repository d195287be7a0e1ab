//! Closed primitive solids used as fixtures and building blocks.

use std::fmt::Debug;

use nalgebra::Point3;

use crate::errors::ValidationError;
use crate::float_types::{Real, TAU};
use crate::mesh::MeshSet;

/// Axis-aligned cube spanning `[0, size]^3`, faces wound outward.
pub fn cube<S: Clone + Send + Sync + Debug>(
    size: Real,
    metadata: Option<S>,
) -> Result<MeshSet<S>, ValidationError> {
    let s = size;
    let vertices = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(s, 0.0, 0.0),
        Point3::new(s, s, 0.0),
        Point3::new(0.0, s, 0.0),
        Point3::new(0.0, 0.0, s),
        Point3::new(s, 0.0, s),
        Point3::new(s, s, s),
        Point3::new(0.0, s, s),
    ];
    #[rustfmt::skip]
    let stream = [
        4, 0, 3, 2, 1, // bottom, -z
        4, 4, 5, 6, 7, // top, +z
        4, 0, 4, 7, 3, // -x
        4, 1, 2, 6, 5, // +x
        4, 0, 1, 5, 4, // -y
        4, 3, 7, 6, 2, // +y
    ];
    MeshSet::from_face_stream(&vertices, &stream, metadata)
}

/// UV sphere of the given radius centered at the origin.
pub fn sphere<S: Clone + Send + Sync + Debug>(
    radius: Real,
    slices: usize,
    stacks: usize,
    metadata: Option<S>,
) -> Result<MeshSet<S>, ValidationError> {
    let slices = slices.max(3);
    let stacks = stacks.max(2);

    let mut vertices = Vec::new();
    // Interior rings; poles are shared single vertices.
    let ring_base = |i: usize| 2 + (i - 1) * slices;
    vertices.push(Point3::new(0.0, 0.0, radius)); // 0: north
    vertices.push(Point3::new(0.0, 0.0, -radius)); // 1: south
    for i in 1..stacks {
        let theta = std::f64::consts::PI * i as Real / stacks as Real;
        let (sin_t, cos_t) = theta.sin_cos();
        for j in 0..slices {
            let phi = TAU * j as Real / slices as Real;
            let (sin_p, cos_p) = phi.sin_cos();
            vertices.push(Point3::new(
                radius * sin_t * cos_p,
                radius * sin_t * sin_p,
                radius * cos_t,
            ));
        }
    }

    let mut stream = Vec::new();
    for j in 0..slices {
        let j1 = (j + 1) % slices;
        // North cap.
        stream.extend_from_slice(&[3, 0, ring_base(1) + j, ring_base(1) + j1]);
        // South cap (reversed to stay outward).
        stream.extend_from_slice(&[3, 1, ring_base(stacks - 1) + j1, ring_base(stacks - 1) + j]);
    }
    for i in 1..stacks - 1 {
        for j in 0..slices {
            let j1 = (j + 1) % slices;
            stream.extend_from_slice(&[
                4,
                ring_base(i) + j,
                ring_base(i + 1) + j,
                ring_base(i + 1) + j1,
                ring_base(i) + j1,
            ]);
        }
    }
    MeshSet::from_face_stream(&vertices, &stream, metadata)
}

/// Torus around the z axis: `major_radius` to the tube center,
/// `minor_radius` of the tube itself.
pub fn torus<S: Clone + Send + Sync + Debug>(
    major_radius: Real,
    minor_radius: Real,
    slices: usize,
    stacks: usize,
    metadata: Option<S>,
) -> Result<MeshSet<S>, ValidationError> {
    let slices = slices.max(3); // around the main ring
    let stacks = stacks.max(3); // around the tube

    let mut vertices = Vec::with_capacity(slices * stacks);
    for i in 0..slices {
        let u = TAU * i as Real / slices as Real;
        let (sin_u, cos_u) = u.sin_cos();
        for j in 0..stacks {
            let v = TAU * j as Real / stacks as Real;
            let (sin_v, cos_v) = v.sin_cos();
            let ring = major_radius + minor_radius * cos_v;
            vertices.push(Point3::new(ring * cos_u, ring * sin_u, minor_radius * sin_v));
        }
    }

    let mut stream = Vec::with_capacity(slices * stacks * 5);
    let at = |i: usize, j: usize| (i % slices) * stacks + (j % stacks);
    for i in 0..slices {
        for j in 0..stacks {
            stream.extend_from_slice(&[
                4,
                at(i, j),
                at(i + 1, j),
                at(i + 1, j + 1),
                at(i, j + 1),
            ]);
        }
    }
    MeshSet::from_face_stream(&vertices, &stream, metadata)
}
