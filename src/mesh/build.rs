//! Topology builder: from raw vertices and face loops to a twinned,
//! consistently oriented [`MeshSet`].

use std::fmt::Debug;
use std::sync::OnceLock;

use hashbrown::HashMap;
use nalgebra::Point3;
use smallvec::SmallVec;

use super::{next_uid, EdgeIdx, Face, FaceIdx, HalfEdge, Mesh, MeshIdx, MeshSet, VertIdx};
use crate::errors::ValidationError;
use crate::float_types::Real;
use crate::geom::Plane;

/// Options accepted by the builder.
#[derive(Clone, Copy, Debug, Default)]
pub struct MeshOptions {
    /// Treat closed inward-oriented components nested inside a sibling
    /// component as accidental cavities and re-orient them outward. This is
    /// a hint: nesting is judged by bounding-box containment.
    pub avoid_cavities: bool,
}

/// One face of the input: a vertex loop plus caller metadata.
#[derive(Clone, Debug)]
pub struct FaceSpec<S> {
    pub verts: Vec<VertIdx>,
    pub metadata: Option<S>,
}

impl<S: Clone + Send + Sync + Debug> MeshSet<S> {
    /// Build from a vertex array and a flat face stream encoding each face
    /// as `(n, v0, v1, .., v{n-1})`. Coordinates equal bit-for-bit are
    /// de-duplicated; use [`MeshSet::weld_vertices`] for tolerance welding.
    pub fn from_face_stream(
        vertices: &[Point3<Real>],
        stream: &[usize],
        metadata: Option<S>,
    ) -> Result<Self, ValidationError> {
        Self::from_face_stream_with(vertices, stream, &MeshOptions::default(), metadata)
    }

    /// [`MeshSet::from_face_stream`] with explicit [`MeshOptions`].
    pub fn from_face_stream_with(
        vertices: &[Point3<Real>],
        stream: &[usize],
        opts: &MeshOptions,
        metadata: Option<S>,
    ) -> Result<Self, ValidationError> {
        for (i, p) in vertices.iter().enumerate() {
            if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
                return Err(ValidationError::NonFiniteCoordinate(i));
            }
        }

        // Exact-coordinate de-duplication.
        let mut canon: HashMap<[u64; 3], VertIdx> = HashMap::new();
        let mut pool: Vec<Point3<Real>> = Vec::with_capacity(vertices.len());
        let mut remap: Vec<VertIdx> = Vec::with_capacity(vertices.len());
        for p in vertices {
            let key = point_key(p);
            let idx = *canon.entry(key).or_insert_with(|| {
                pool.push(*p);
                VertIdx(pool.len() as u32 - 1)
            });
            remap.push(idx);
        }

        let mut faces = Vec::new();
        let mut offset = 0usize;
        while offset < stream.len() {
            let n = stream[offset];
            if offset + 1 + n > stream.len() {
                return Err(ValidationError::TruncatedFaceStream(offset));
            }
            let mut verts = Vec::with_capacity(n);
            for &raw in &stream[offset + 1..offset + 1 + n] {
                if raw >= vertices.len() {
                    return Err(ValidationError::IndexOutOfRange { index: raw, len: vertices.len() });
                }
                let v = remap[raw];
                // Welding can collapse consecutive vertices.
                if verts.last() != Some(&v) {
                    verts.push(v);
                }
            }
            if verts.len() > 1 && verts.first() == verts.last() {
                verts.pop();
            }
            if verts.len() < 3 {
                return Err(ValidationError::DegenerateFace(faces.len()));
            }
            faces.push(FaceSpec { verts, metadata: metadata.clone() });
            offset += 1 + n;
        }

        build_mesh_set(pool, faces, opts, None, metadata)
    }

    /// Build from pre-assembled face loops over a shared vertex pool.
    pub fn from_faces(
        vertices: Vec<Point3<Real>>,
        faces: Vec<(Vec<VertIdx>, Option<S>)>,
        metadata: Option<S>,
    ) -> Result<Self, ValidationError> {
        let specs = faces
            .into_iter()
            .map(|(verts, metadata)| FaceSpec { verts, metadata })
            .collect();
        build_mesh_set(vertices, specs, &MeshOptions::default(), None, metadata)
    }

    /// Merge vertices closer than `eps` and rebuild the topology. This is
    /// the tolerance-based sibling of the builder's exact de-duplication.
    pub fn weld_vertices(&mut self, eps: Real) {
        let mut grid: HashMap<[i64; 3], SmallVec<[u32; 4]>> = HashMap::new();
        let mut target: Vec<VertIdx> = (0..self.vertices.len() as u32).map(VertIdx).collect();
        let inv = 1.0 / eps.max(Real::EPSILON);
        for (i, p) in self.vertices.iter().enumerate() {
            let cell = [
                (p.x * inv).floor() as i64,
                (p.y * inv).floor() as i64,
                (p.z * inv).floor() as i64,
            ];
            let mut merged = None;
            'search: for dx in -1..=1i64 {
                for dy in -1..=1i64 {
                    for dz in -1..=1i64 {
                        let key = [cell[0] + dx, cell[1] + dy, cell[2] + dz];
                        if let Some(bucket) = grid.get(&key) {
                            for &j in bucket {
                                if (self.vertices[j as usize] - p).norm() <= eps {
                                    merged = Some(VertIdx(j));
                                    break 'search;
                                }
                            }
                        }
                    }
                }
            }
            match merged {
                Some(v) => target[i] = v,
                None => grid.entry(cell).or_default().push(i as u32),
            }
        }
        for e in &mut self.edges {
            e.vert = target[e.vert.index()];
        }
        self.compact();
    }
}

#[inline]
pub(crate) fn point_key(p: &Point3<Real>) -> [u64; 3] {
    let norm = |v: Real| if v == 0.0 { 0.0f64 } else { v }; // fold -0.0 into 0.0
    [norm(p.x).to_bits(), norm(p.y).to_bits(), norm(p.z).to_bits()]
}

/// Union-find over faces carrying a relative orientation parity: parity 1
/// between two faces means exactly one of them must be reversed.
struct ParityDsu {
    parent: Vec<u32>,
    parity: Vec<u8>,
}

impl ParityDsu {
    fn new(n: usize) -> Self {
        ParityDsu { parent: (0..n as u32).collect(), parity: vec![0; n] }
    }

    fn find(&mut self, x: u32) -> (u32, u8) {
        if self.parent[x as usize] == x {
            return (x, 0);
        }
        let (root, p) = self.find(self.parent[x as usize]);
        let my = self.parity[x as usize] ^ p;
        self.parent[x as usize] = root;
        self.parity[x as usize] = my;
        (root, my)
    }

    /// Join `a` and `b` with relative parity `rel`; returns false when the
    /// components were already joined with a contradictory parity.
    fn union(&mut self, a: u32, b: u32, rel: u8) -> bool {
        let (ra, pa) = self.find(a);
        let (rb, pb) = self.find(b);
        if ra == rb {
            return pa ^ pb == rel;
        }
        // Root with the smaller face index wins so component ids and face
        // orientations are reproducible.
        if ra < rb {
            self.parent[rb as usize] = ra;
            self.parity[rb as usize] = pa ^ pb ^ rel;
        } else {
            self.parent[ra as usize] = rb;
            self.parity[ra as usize] = pa ^ pb ^ rel;
        }
        true
    }
}

/// Core builder: validates faces, propagates orientation, twins edges and
/// groups faces into connected components.
pub(crate) fn build_mesh_set<S: Clone + Send + Sync + Debug>(
    vertices: Vec<Point3<Real>>,
    faces: Vec<FaceSpec<S>>,
    opts: &MeshOptions,
    uid: Option<u64>,
    metadata: Option<S>,
) -> Result<MeshSet<S>, ValidationError> {
    let n_faces = faces.len();

    // Validate loops and compute planes.
    let mut planes = Vec::with_capacity(n_faces);
    for (i, spec) in faces.iter().enumerate() {
        if spec.verts.len() < 3 {
            return Err(ValidationError::DegenerateFace(i));
        }
        for &v in &spec.verts {
            if v.index() >= vertices.len() {
                return Err(ValidationError::IndexOutOfRange { index: v.index(), len: vertices.len() });
            }
        }
        let pts: Vec<Point3<Real>> = spec.verts.iter().map(|v| vertices[v.index()]).collect();
        let plane = Plane::from_loop(&pts).ok_or(ValidationError::DegenerateFace(i))?;
        planes.push(plane);
    }

    // Undirected edge incidence over the input loops.
    type EdgeUse = (u32, u32, bool); // (face, slot, reversed relative to key)
    let mut incidence: HashMap<(VertIdx, VertIdx), SmallVec<[EdgeUse; 2]>> = HashMap::new();
    for (fi, spec) in faces.iter().enumerate() {
        let n = spec.verts.len();
        for k in 0..n {
            let u = spec.verts[k];
            let v = spec.verts[(k + 1) % n];
            let (key, reversed) = if u < v { ((u, v), false) } else { ((v, u), true) };
            incidence.entry(key).or_default().push((fi as u32, k as u32, reversed));
        }
    }

    // Orientation propagation across 2-manifold edges; edges used more than
    // twice do not connect faces, so the mesh splits there into separate
    // components.
    let mut dsu = ParityDsu::new(n_faces);
    let mut conflicted = vec![false; n_faces];
    for uses in incidence.values() {
        if uses.len() == 2 {
            let (f1, _, r1) = uses[0];
            let (f2, _, r2) = uses[1];
            // Opposite traversal directions mean consistent orientation.
            let rel = u8::from(r1 == r2);
            if !dsu.union(f1, f2, rel) {
                conflicted[f1 as usize] = true;
                conflicted[f2 as usize] = true;
            }
        }
    }

    // Resolve per-face flips against each component root.
    let mut flip = vec![false; n_faces];
    for f in 0..n_faces as u32 {
        let (_, parity) = dsu.find(f);
        flip[f as usize] = parity == 1;
    }

    // Component ids ordered by first face.
    let mut mesh_of_root: HashMap<u32, MeshIdx> = HashMap::new();
    let mut mesh_of_face = vec![MeshIdx(0); n_faces];
    let mut meshes: Vec<Mesh> = Vec::new();
    for f in 0..n_faces as u32 {
        let (root, _) = dsu.find(f);
        let mid = *mesh_of_root.entry(root).or_insert_with(|| {
            meshes.push(Mesh { faces: Vec::new(), open_edges: 0, orientable: true });
            MeshIdx(meshes.len() as u32 - 1)
        });
        mesh_of_face[f as usize] = mid;
        meshes[mid.index()].faces.push(FaceIdx(f));
    }

    // Assemble the arenas with flips applied.
    let mut set = MeshSet {
        vertices,
        edges: Vec::new(),
        faces: Vec::with_capacity(n_faces),
        meshes,
        bounding_box: OnceLock::new(),
        metadata,
        uid: uid.unwrap_or_else(next_uid),
    };
    for (fi, spec) in faces.into_iter().enumerate() {
        let mut verts = spec.verts;
        let mut plane = planes[fi];
        if flip[fi] {
            verts.reverse();
            plane.flip();
        }
        let n = verts.len();
        let base = set.edges.len() as u32;
        for (k, &v) in verts.iter().enumerate() {
            set.edges.push(HalfEdge {
                vert: v,
                face: FaceIdx(fi as u32),
                next: EdgeIdx(base + ((k + 1) % n) as u32),
                prev: EdgeIdx(base + ((k + n - 1) % n) as u32),
                twin: None,
            });
        }
        set.faces.push(Face {
            edge: EdgeIdx(base),
            n_verts: n as u32,
            plane,
            mesh: mesh_of_face[fi],
            alive: true,
            metadata: spec.metadata,
        });
    }

    // Twin pass over the final (flipped) loops. Edges shared by exactly two
    // faces twin directly; edges shared by more pair up by angular order
    // around the edge axis, the way a pinched solid's wedges nest. Anything
    // left unpaired stays open and marks its faces.
    let mut undirected: HashMap<(VertIdx, VertIdx), SmallVec<[EdgeIdx; 2]>> = HashMap::new();
    for (i, e) in set.edges.iter().enumerate() {
        let (u, v) = (e.vert, set.edges[e.next.index()].vert);
        let key = if u < v { (u, v) } else { (v, u) };
        undirected.entry(key).or_default().push(EdgeIdx(i as u32));
    }
    let mut keys: Vec<(VertIdx, VertIdx)> = undirected.keys().copied().collect();
    keys.sort_unstable();
    let mut unresolved = vec![false; n_faces];
    for key in keys {
        let members = &undirected[&key];
        match members.len() {
            1 => {},
            2 => {
                let (e1, e2) = (members[0], members[1]);
                let (u1, _) = set.edge_endpoints(e1);
                let (u2, _) = set.edge_endpoints(e2);
                if u1 != u2 {
                    set.edges[e1.index()].twin = Some(e2);
                    set.edges[e2.index()].twin = Some(e1);
                }
            },
            _ => {
                let paired = pair_edge_fan(&mut set, key, members.clone());
                if !paired {
                    for &e in members.iter() {
                        unresolved[set.edges[e.index()].face.index()] = true;
                    }
                }
            },
        }
    }

    // Per-component bookkeeping.
    for m in 0..set.meshes.len() {
        let mut open = 0usize;
        let mut orientable = true;
        for &f in &set.meshes[m].faces {
            if conflicted[f.index()] || unresolved[f.index()] {
                orientable = false;
            }
            for e in set.face_edges(f) {
                if set.edges[e.index()].twin.is_none() {
                    open += 1;
                }
            }
        }
        set.meshes[m].open_edges = open;
        set.meshes[m].orientable = orientable;
    }

    if opts.avoid_cavities {
        suppress_cavities(&mut set);
    }

    Ok(set)
}

/// Resolve an edge shared by more than two faces: sort the incident faces
/// by wing angle around the edge axis and twin each half-edge with its
/// angular neighbour of opposite direction, so the solid wedges meeting at
/// the edge close up pairwise. Returns false when the fan cannot be fully
/// paired.
fn pair_edge_fan<S: Clone + Send + Sync + Debug>(
    set: &mut MeshSet<S>,
    key: (VertIdx, VertIdx),
    members: SmallVec<[EdgeIdx; 2]>,
) -> bool {
    use crate::float_types::EPSILON;

    let pu = set.vertices[key.0.index()];
    let pv = set.vertices[key.1.index()];
    let axis = pv - pu;
    let len = axis.norm();
    if len < EPSILON || members.len() % 2 != 0 {
        return false;
    }
    let axis = axis / len;
    let mid = Point3::from((pu.coords + pv.coords) * 0.5);

    // Wing direction of each incident face, orthogonal to the edge.
    let mut wings = Vec::with_capacity(members.len());
    for &e in members.iter() {
        let face = set.edges[e.index()].face;
        let pts = set.face_points(face);
        let centroid = pts.iter().fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.coords)
            / pts.len() as Real;
        let wing = centroid - mid.coords;
        let wing = wing - axis * wing.dot(&axis);
        if wing.norm() < EPSILON {
            return false;
        }
        let (u, _) = set.edge_endpoints(e);
        wings.push((e, wing, u == key.0));
    }

    let reference = wings[0].1;
    let mut order: Vec<(Real, usize)> = wings
        .iter()
        .enumerate()
        .map(|(i, (_, w, _))| {
            let angle = reference.cross(w).dot(&axis).atan2(reference.dot(w));
            (angle, i)
        })
        .collect();
    order.sort_by(|a, b| {
        a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal).then(a.1.cmp(&b.1))
    });

    // Pair angular neighbours of opposite traversal direction, closing the
    // innermost wedges first and re-collapsing the circular order until
    // everything is matched.
    let n = order.len();
    let mut partner: Vec<Option<usize>> = vec![None; n];
    loop {
        let unpaired: Vec<usize> = order
            .iter()
            .map(|&(_, i)| i)
            .filter(|&i| partner[i].is_none())
            .collect();
        if unpaired.is_empty() {
            break;
        }
        let m = unpaired.len();
        let mut progressed = false;
        for k in 0..m {
            let a = unpaired[k];
            let b = unpaired[(k + 1) % m];
            if a != b
                && partner[a].is_none()
                && partner[b].is_none()
                && wings[a].2 != wings[b].2
            {
                partner[a] = Some(b);
                partner[b] = Some(a);
                progressed = true;
            }
        }
        if !progressed {
            return false;
        }
    }
    for (a, p) in partner.iter().enumerate() {
        let b = p.expect("fully paired fan");
        let (ea, eb) = (wings[a].0, wings[b].0);
        set.edges[ea.index()].twin = Some(eb);
        set.edges[eb.index()].twin = Some(ea);
    }
    true
}

/// Re-orient closed negative-volume components that sit inside a sibling
/// component's bounds, so they read as solids instead of cavities.
fn suppress_cavities<S: Clone + Send + Sync + Debug>(set: &mut MeshSet<S>) {
    use crate::float_types::parry3d::bounding_volume::BoundingVolume;

    let boxes: Vec<_> = (0..set.meshes.len())
        .map(|m| {
            let mut pts = Vec::new();
            for &f in &set.meshes[m].faces {
                pts.extend(set.face_points(f));
            }
            crate::geom::aabb::aabb_of_points(pts.iter())
        })
        .collect();

    let mut to_invert = Vec::new();
    for m in 0..set.meshes.len() {
        if !set.meshes[m].is_closed() {
            continue;
        }
        if set.mesh_signed_volume(MeshIdx(m as u32)) >= 0.0 {
            continue;
        }
        let nested = (0..set.meshes.len()).any(|o| o != m && boxes[o].contains(&boxes[m]));
        if nested {
            to_invert.push(MeshIdx(m as u32));
        }
    }
    set.invert_meshes(&to_invert);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_stream() -> (Vec<Point3<Real>>, Vec<usize>) {
        let verts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        (verts, vec![4, 0, 1, 2, 3])
    }

    #[test]
    fn single_face() {
        let (verts, stream) = quad_stream();
        let set: MeshSet = MeshSet::from_face_stream(&verts, &stream, None).unwrap();
        assert_eq!(set.face_count(), 1);
        assert_eq!(set.meshes.len(), 1);
        assert!(!set.meshes[0].is_closed());
        assert_eq!(set.meshes[0].open_edges, 4);
    }

    #[test]
    fn duplicate_vertices_are_welded() {
        // Two triangles sharing an edge, with the shared vertices repeated
        // in the vertex array.
        let verts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ];
        let stream = vec![3, 0, 1, 2, 3, 3, 5, 4];
        let set: MeshSet = MeshSet::from_face_stream(&verts, &stream, None).unwrap();
        assert_eq!(set.vertices.len(), 4);
        assert_eq!(set.meshes.len(), 1);
        // The shared edge is twinned, the border is open.
        let open = set.meshes[0].open_edges;
        assert_eq!(open, 4);
    }

    #[test]
    fn inconsistent_winding_is_repaired() {
        // Second triangle wound the wrong way; the builder must flip it.
        let verts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
        ];
        let stream = vec![3, 0, 1, 2, 3, 1, 3, 2];
        let good: MeshSet = MeshSet::from_face_stream(&verts, &stream, None).unwrap();
        let bad_stream = vec![3, 0, 1, 2, 3, 1, 2, 3];
        let repaired: MeshSet = MeshSet::from_face_stream(&verts, &bad_stream, None).unwrap();
        assert!(repaired.meshes[0].orientable);
        // Both faces end up with the same normal either way.
        for set in [&good, &repaired] {
            let n0 = set.faces[0].plane.normal;
            let n1 = set.faces[1].plane.normal;
            assert!((n0 - n1).norm() < 1e-12);
        }
    }

    #[test]
    fn stream_validation() {
        let (verts, _) = quad_stream();
        let r: Result<MeshSet, _> = MeshSet::from_face_stream(&verts, &[4, 0, 1, 2], None);
        assert!(matches!(r, Err(ValidationError::TruncatedFaceStream(_))));
        let r: Result<MeshSet, _> = MeshSet::from_face_stream(&verts, &[3, 0, 1, 9], None);
        assert!(matches!(r, Err(ValidationError::IndexOutOfRange { .. })));
    }

    #[test]
    fn weld_by_tolerance() {
        let verts = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(1e-9, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 1e-9),
        ];
        let stream = vec![3, 0, 1, 2, 3, 3, 4, 5];
        let mut set: MeshSet = MeshSet::from_face_stream(&verts, &stream, None).unwrap();
        assert_eq!(set.vertices.len(), 6);
        set.weld_vertices(1e-6);
        assert_eq!(set.vertices.len(), 4);
        assert_eq!(set.meshes.len(), 1);
    }
}
