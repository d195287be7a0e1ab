//! Half-edge mesh sets.
//!
//! A [`MeshSet`] owns a vertex pool, a half-edge arena, a face arena and the
//! list of connected [`Mesh`] components built over them. Faces, edges and
//! vertices refer to each other through stable `u32`-backed indices; `twin`
//! is `None` on boundary edges. All structural mutation goes through the
//! mesh set, never through individual edge records.
//!
//! Invariants maintained by the builder and every operation here:
//! - for every twinned edge, `edge.twin.twin == edge` and
//!   `edge.twin.origin == edge.next.origin`;
//! - a face's edge loop traverses its vertices consistently with the face
//!   normal (right-hand rule);
//! - a mesh is closed iff every one of its edges has a twin;
//! - along any shared edge the two incident face loops run in opposite
//!   directions (oriented manifold).

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use nalgebra::{Matrix4, Point3};

use crate::float_types::parry3d::bounding_volume::Aabb;
use crate::float_types::Real;
use crate::geom::aabb::aabb_of_points;
use crate::geom::Plane;

pub mod build;
pub mod simplify;

pub use build::MeshOptions;
pub use simplify::MeshSimplifier;

macro_rules! index_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        pub struct $name(pub u32);

        impl $name {
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

index_type!(
    /// Index into a mesh set's vertex pool.
    VertIdx
);
index_type!(
    /// Index into a mesh set's half-edge arena.
    EdgeIdx
);
index_type!(
    /// Index into a mesh set's face arena.
    FaceIdx
);
index_type!(
    /// Index into a mesh set's component list.
    MeshIdx
);

/// Stable identity of a face across mesh sets, used to key attributes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FaceKey {
    /// The owning mesh set's unique id.
    pub set: u64,
    /// Face index within that set.
    pub face: u32,
}

/// One directed edge of a face loop.
#[derive(Clone, Copy, Debug)]
pub struct HalfEdge {
    /// Origin vertex.
    pub vert: VertIdx,
    /// Owning face.
    pub face: FaceIdx,
    /// Next edge in the face loop.
    pub next: EdgeIdx,
    /// Previous edge in the face loop.
    pub prev: EdgeIdx,
    /// Matching edge on the neighbouring face, `None` at a boundary.
    pub twin: Option<EdgeIdx>,
}

/// A planar polygon face.
#[derive(Clone, Debug)]
pub struct Face<S: Clone> {
    /// Entry edge of the cyclic loop.
    pub edge: EdgeIdx,
    /// Number of vertices in the loop.
    pub n_verts: u32,
    /// Supporting plane; the normal is the face normal.
    pub plane: Plane,
    /// Connected component this face belongs to.
    pub mesh: MeshIdx,
    /// Dead faces are skipped by iteration and dropped on compaction.
    pub alive: bool,
    /// Caller metadata, copied to derived faces by the CSG composer.
    pub metadata: Option<S>,
}

/// A face-connected component of a mesh set.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub faces: Vec<FaceIdx>,
    /// Count of edges without a twin.
    pub open_edges: usize,
    /// False when orientation propagation found an inconsistency it could
    /// not repair, or an edge shared by more than two faces.
    pub orientable: bool,
}

impl Mesh {
    /// A mesh is a closed manifold iff every edge has a twin.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.open_edges == 0
    }
}

static NEXT_UID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_uid() -> u64 {
    NEXT_UID.fetch_add(1, Ordering::Relaxed)
}

/// An ordered collection of connected manifold components sharing one vertex
/// pool.
#[derive(Clone, Debug)]
pub struct MeshSet<S: Clone + Send + Sync + Debug = ()> {
    pub vertices: Vec<Point3<Real>>,
    pub edges: Vec<HalfEdge>,
    pub faces: Vec<Face<S>>,
    pub meshes: Vec<Mesh>,

    /// Lazily calculated AABB that spans all live faces.
    pub bounding_box: OnceLock<Aabb>,

    /// Metadata for the whole set.
    pub metadata: Option<S>,

    uid: u64,
}

impl<S: Clone + Send + Sync + Debug> MeshSet<S> {
    /// An empty mesh set.
    pub fn new() -> Self {
        MeshSet {
            vertices: Vec::new(),
            edges: Vec::new(),
            faces: Vec::new(),
            meshes: Vec::new(),
            bounding_box: OnceLock::new(),
            metadata: None,
            uid: next_uid(),
        }
    }

    /// Process-unique id of this set; survives cloning so attribute keys
    /// remain valid on internal copies.
    #[inline]
    pub fn uid(&self) -> u64 {
        self.uid
    }

    /// Key for `face` in attribute maps.
    #[inline]
    pub fn face_key(&self, face: FaceIdx) -> FaceKey {
        FaceKey { set: self.uid, face: face.0 }
    }

    /// Iterate live faces.
    pub fn live_faces(&self) -> impl Iterator<Item = FaceIdx> + '_ {
        self.faces
            .iter()
            .enumerate()
            .filter(|(_, f)| f.alive)
            .map(|(i, _)| FaceIdx(i as u32))
    }

    pub fn face_count(&self) -> usize {
        self.faces.iter().filter(|f| f.alive).count()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.iter().all(|f| !f.alive)
    }

    /// Edge indices of `face`'s loop, in traversal order.
    pub fn face_edges(&self, face: FaceIdx) -> Vec<EdgeIdx> {
        let f = &self.faces[face.index()];
        let mut out = Vec::with_capacity(f.n_verts as usize);
        let mut e = f.edge;
        for _ in 0..f.n_verts {
            out.push(e);
            e = self.edges[e.index()].next;
        }
        out
    }

    /// Vertex indices of `face`'s loop, in traversal order.
    pub fn face_vertices(&self, face: FaceIdx) -> Vec<VertIdx> {
        self.face_edges(face)
            .into_iter()
            .map(|e| self.edges[e.index()].vert)
            .collect()
    }

    /// Positions of `face`'s loop, in traversal order.
    pub fn face_points(&self, face: FaceIdx) -> Vec<Point3<Real>> {
        self.face_vertices(face)
            .into_iter()
            .map(|v| self.vertices[v.index()])
            .collect()
    }

    /// `(origin, destination)` vertices of a half-edge.
    #[inline]
    pub fn edge_endpoints(&self, edge: EdgeIdx) -> (VertIdx, VertIdx) {
        let e = &self.edges[edge.index()];
        let next = &self.edges[e.next.index()];
        (e.vert, next.vert)
    }

    /// Three pairwise-distinct vertices spanning the face's plane, used as
    /// the anchor triangle for exact side-of-plane tests.
    pub fn face_anchor(&self, face: FaceIdx) -> [Point3<Real>; 3] {
        let pts = self.face_points(face);
        let mut best = [pts[0], pts[1], pts[2]];
        let mut best_area = 0.0;
        for i in 1..pts.len() - 1 {
            let area = (pts[i] - pts[0]).cross(&(pts[i + 1] - pts[0])).norm_squared();
            if area > best_area {
                best_area = area;
                best = [pts[0], pts[i], pts[i + 1]];
            }
        }
        best
    }

    /// AABB of a single face.
    pub fn face_bounding_box(&self, face: FaceIdx) -> Aabb {
        aabb_of_points(self.face_vertices(face).iter().map(|v| &self.vertices[v.index()]))
    }

    /// Returns an [`Aabb`] spanning every live face of the set.
    pub fn bounding_box(&self) -> Aabb {
        *self.bounding_box.get_or_init(|| {
            let used: Vec<Point3<Real>> = self
                .live_faces()
                .flat_map(|f| self.face_points(f))
                .collect();
            aabb_of_points(used.iter())
        })
    }

    /// Reverse the orientation of every component.
    pub fn invert(&mut self) {
        let all: Vec<MeshIdx> = (0..self.meshes.len() as u32).map(MeshIdx).collect();
        self.invert_meshes(&all);
    }

    /// Reverse the orientation of the selected components: every face loop
    /// is reversed and its plane normal negated.
    pub fn invert_meshes(&mut self, selected: &[MeshIdx]) {
        for &m in selected {
            let faces = self.meshes[m.index()].faces.clone();
            for face in faces {
                if self.faces[face.index()].alive {
                    self.reverse_face(face);
                }
            }
        }
    }

    /// Reverse one face loop in place. Twin pointers stay valid: the
    /// directed edge `u -> v` becomes `v -> u`, which is exactly what its
    /// twin used to point at.
    pub(crate) fn reverse_face(&mut self, face: FaceIdx) {
        let loop_edges = self.face_edges(face);
        let verts: Vec<VertIdx> = loop_edges.iter().map(|e| self.edges[e.index()].vert).collect();
        let n = loop_edges.len();
        for (k, &e) in loop_edges.iter().enumerate() {
            let he = &mut self.edges[e.index()];
            he.vert = verts[(k + 1) % n];
            std::mem::swap(&mut he.next, &mut he.prev);
        }
        self.faces[face.index()].plane.flip();
    }

    /// Apply an affine transform to every vertex and recompute face planes.
    pub fn transform(&mut self, m: &Matrix4<Real>) {
        for v in &mut self.vertices {
            *v = m.transform_point(v);
        }
        for i in 0..self.faces.len() {
            if !self.faces[i].alive {
                continue;
            }
            let face = FaceIdx(i as u32);
            let pts = self.face_points(face);
            if let Some(plane) = Plane::from_loop(&pts) {
                self.faces[i].plane = plane;
            }
        }
        self.bounding_box = OnceLock::new();
    }

    /// A transformed copy.
    #[must_use]
    pub fn transformed(&self, m: &Matrix4<Real>) -> Self {
        let mut out = self.clone();
        out.transform(m);
        out
    }

    /// Signed volume of the whole set (sum of per-component volumes).
    pub fn signed_volume(&self) -> Real {
        (0..self.meshes.len()).map(|m| self.mesh_signed_volume(MeshIdx(m as u32))).sum()
    }

    /// Signed volume of one component via the divergence theorem: positive
    /// for an outward-oriented closed component.
    pub fn mesh_signed_volume(&self, mesh: MeshIdx) -> Real {
        let mut total = 0.0;
        for &face in &self.meshes[mesh.index()].faces {
            if !self.faces[face.index()].alive {
                continue;
            }
            let pts = self.face_points(face);
            for i in 1..pts.len() - 1 {
                total += pts[0].coords.dot(&pts[i].coords.cross(&pts[i + 1].coords));
            }
        }
        total / 6.0
    }

    /// Total surface area of live faces.
    pub fn surface_area(&self) -> Real {
        let mut total = 0.0;
        for face in self.live_faces() {
            let pts = self.face_points(face);
            for i in 1..pts.len() - 1 {
                total += (pts[i] - pts[0]).cross(&(pts[i + 1] - pts[0])).norm();
            }
        }
        total * 0.5
    }

    /// Euler characteristic `V - E + F` over live faces.
    pub fn euler_characteristic(&self) -> i64 {
        use hashbrown::HashSet;
        let mut verts: HashSet<VertIdx> = HashSet::new();
        let mut undirected: HashSet<(VertIdx, VertIdx)> = HashSet::new();
        let mut n_faces = 0i64;
        for face in self.live_faces() {
            n_faces += 1;
            for e in self.face_edges(face) {
                let (u, v) = self.edge_endpoints(e);
                verts.insert(u);
                undirected.insert(if u < v { (u, v) } else { (v, u) });
            }
        }
        verts.len() as i64 - undirected.len() as i64 + n_faces
    }

    /// True when every component is a closed oriented manifold.
    pub fn is_closed_manifold(&self) -> bool {
        !self.meshes.is_empty() && self.meshes.iter().all(|m| m.is_closed() && m.orientable)
    }

    /// Drop components not accepted by `keep`, then compact storage.
    pub fn retain_meshes(&mut self, keep: impl Fn(usize) -> bool) {
        for (i, mesh) in self.meshes.iter().enumerate() {
            if !keep(i) {
                for &face in &mesh.faces {
                    self.faces[face.index()].alive = false;
                }
            }
        }
        self.compact();
    }

    /// Compact vertex storage after face deletion, dropping unused vertices
    /// and dead faces. Face indices are renumbered.
    pub fn collect_vertices(&mut self) {
        self.compact();
    }

    /// Rebuild the arenas from the live faces. Reuses the builder so all
    /// topology invariants are re-established.
    pub(crate) fn compact(&mut self) {
        let mut specs: Vec<build::FaceSpec<S>> = Vec::new();
        for face in self.live_faces() {
            let mut verts = self.face_vertices(face);
            verts.dedup();
            while verts.len() > 1 && verts.first() == verts.last() {
                verts.pop();
            }
            if verts.len() < 3 {
                continue;
            }
            // Faces that lost their area (welded collinear loops) are dropped.
            let pts: Vec<Point3<Real>> = verts.iter().map(|v| self.vertices[v.index()]).collect();
            if Plane::from_loop(&pts).is_none() {
                continue;
            }
            specs.push(build::FaceSpec {
                verts,
                metadata: self.faces[face.index()].metadata.clone(),
            });
        }
        let rebuilt = build::build_mesh_set(
            std::mem::take(&mut self.vertices),
            specs,
            &MeshOptions::default(),
            Some(self.uid),
            self.metadata.clone(),
        );
        // Internal loops are well-formed, the builder cannot reject them.
        if let Ok(mut rebuilt) = rebuilt {
            rebuilt.prune_unused_vertices();
            *self = rebuilt;
        }
    }

    /// Drop pool vertices not referenced by any live edge.
    pub(crate) fn prune_unused_vertices(&mut self) {
        let mut used = vec![false; self.vertices.len()];
        for face in self.live_faces() {
            for v in self.face_vertices(face) {
                used[v.index()] = true;
            }
        }
        let mut remap: Vec<Option<VertIdx>> = vec![None; self.vertices.len()];
        let mut vertices = Vec::new();
        for (i, &u) in used.iter().enumerate() {
            if u {
                remap[i] = Some(VertIdx(vertices.len() as u32));
                vertices.push(self.vertices[i]);
            }
        }
        for e in &mut self.edges {
            if let Some(v) = remap[e.vert.index()] {
                e.vert = v;
            }
        }
        self.vertices = vertices;
        self.bounding_box = OnceLock::new();
    }
}

impl<S: Clone + Send + Sync + Debug> Default for MeshSet<S> {
    fn default() -> Self {
        Self::new()
    }
}
