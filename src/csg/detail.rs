//! Transient per-evaluation state: the merged vertex pool, the weld map and
//! the intersection records that later stages consume.

use std::fmt::Debug;

use hashbrown::{HashMap, HashSet};
use nalgebra::Point3;
use smallvec::SmallVec;

use crate::float_types::Real;
use crate::mesh::{EdgeIdx, FaceIdx, MeshIdx, MeshSet, VertIdx};

/// Which input a face, loop or group came from.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub enum Src {
    A,
    B,
}

impl Src {
    #[inline]
    pub fn other(self) -> Src {
        match self {
            Src::A => Src::B,
            Src::B => Src::A,
        }
    }
}

/// Id of a logical vertex in the evaluation's shared pool: the vertices of
/// both inputs (welded pairs collapsed) plus interned intersection points.
pub type NodeId = u32;

/// Undirected node pair, stored canonically.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct UEdge(pub NodeId, pub NodeId);

impl UEdge {
    #[inline]
    pub fn new(a: NodeId, b: NodeId) -> Self {
        if a <= b {
            UEdge(a, b)
        } else {
            UEdge(b, a)
        }
    }
}

/// Which opposing components an intersection-curve edge separates; used by
/// the edge-propagation classifier's toggle rule.
#[derive(Clone, Debug, Default)]
pub(crate) struct CrossInfo {
    /// Opposing component toggled when a group from side A crosses this edge.
    pub toggles_a: SmallVec<[MeshIdx; 1]>,
    /// Opposing component toggled when a group from side B crosses this edge.
    pub toggles_b: SmallVec<[MeshIdx; 1]>,
    /// Shared original edges carry no toggle information.
    pub shared_boundary: bool,
}

/// State of one CSG evaluation. Owns the shared vertex pool and every
/// transient intersection record; released when the evaluation returns.
pub struct CsgContext<'a, S: Clone + Send + Sync + Debug> {
    pub(crate) a: &'a MeshSet<S>,
    pub(crate) b: &'a MeshSet<S>,
    pub(crate) eps: Real,

    /// Positions of all nodes. A's vertices first, then B's, then interned
    /// intersection points.
    pub(crate) pool: Vec<Point3<Real>>,
    pub(crate) b_off: u32,
    /// Welded-vertex map: non-canonical node -> canonical node.
    pub(crate) weld: HashMap<NodeId, NodeId>,
    /// Tolerance grid over all nodes, for interning intersection points.
    pub(crate) grid: HashMap<[i64; 3], SmallVec<[NodeId; 4]>>,

    /// Ordered crossings along each original edge (keyed by its canonical
    /// half-edge): `(t, node)` with `t` measured along the canonical
    /// direction. Sorted at face-division time.
    pub(crate) eint: HashMap<(Src, EdgeIdx), Vec<(Real, NodeId)>>,
    /// Intersection nodes in the interior of each face.
    pub(crate) face_verts: HashMap<(Src, FaceIdx), Vec<NodeId>>,
    /// Face/face intersection segments lying on each face.
    pub(crate) ff_segs: HashMap<(Src, FaceIdx), Vec<UEdge>>,
    /// Coincident coplanar partner faces (full-boundary matches).
    pub(crate) coplanar: HashMap<(Src, FaceIdx), Vec<FaceIdx>>,
    /// Candidate endpoints per overlapping face pair `(A face, B face)`.
    pub(crate) pair_points: HashMap<(FaceIdx, FaceIdx), SmallVec<[NodeId; 4]>>,
    /// Edges lying on intersection curves; they bound loop groups.
    pub(crate) cross_edges: HashMap<UEdge, CrossInfo>,
    /// Faces with any intersection evidence.
    pub(crate) touched: HashSet<(Src, FaceIdx)>,

    /// Uid reserved for the output mesh set, so attribute hooks can key new
    /// faces before the set exists.
    pub(crate) out_uid: u64,
}

impl<'a, S: Clone + Send + Sync + Debug> CsgContext<'a, S> {
    pub(crate) fn new(a: &'a MeshSet<S>, b: &'a MeshSet<S>, eps: Real, out_uid: u64) -> Self {
        let mut pool = Vec::with_capacity(a.vertices.len() + b.vertices.len());
        pool.extend(a.vertices.iter().copied());
        pool.extend(b.vertices.iter().copied());
        CsgContext {
            a,
            b,
            eps,
            pool,
            b_off: a.vertices.len() as u32,
            weld: HashMap::new(),
            grid: HashMap::new(),
            eint: HashMap::new(),
            face_verts: HashMap::new(),
            ff_segs: HashMap::new(),
            coplanar: HashMap::new(),
            pair_points: HashMap::new(),
            cross_edges: HashMap::new(),
            touched: HashSet::new(),
            out_uid,
        }
    }

    /// The input set on the given side.
    #[inline]
    pub fn src_set(&self, src: Src) -> &MeshSet<S> {
        match src {
            Src::A => self.a,
            Src::B => self.b,
        }
    }

    /// Position of a node.
    #[inline]
    pub fn point(&self, node: NodeId) -> Point3<Real> {
        self.pool[node as usize]
    }

    /// All node positions.
    #[inline]
    pub fn pool(&self) -> &[Point3<Real>] {
        &self.pool
    }

    /// Canonical node of a source vertex, following the weld map.
    #[inline]
    pub(crate) fn node_of(&self, src: Src, v: VertIdx) -> NodeId {
        let raw = match src {
            Src::A => v.0,
            Src::B => self.b_off + v.0,
        };
        *self.weld.get(&raw).unwrap_or(&raw)
    }

    /// Canonical (loop-order) nodes of a source face.
    pub(crate) fn face_nodes(&self, src: Src, face: FaceIdx) -> Vec<NodeId> {
        self.src_set(src)
            .face_vertices(face)
            .into_iter()
            .map(|v| self.node_of(src, v))
            .collect()
    }

    #[inline]
    pub(crate) fn grid_cell(&self, p: &Point3<Real>) -> [i64; 3] {
        let inv = 1.0 / self.eps;
        [
            (p.x * inv).floor() as i64,
            (p.y * inv).floor() as i64,
            (p.z * inv).floor() as i64,
        ]
    }

    /// Insert an existing node into the lookup grid.
    pub(crate) fn grid_insert(&mut self, node: NodeId) {
        let cell = self.grid_cell(&self.pool[node as usize]);
        self.grid.entry(cell).or_default().push(node);
    }

    /// Lowest-id node within `eps` of `p`, if any. Scans the 27 neighbouring
    /// grid cells; the lowest id wins so lookups are order-independent.
    pub(crate) fn grid_find(&self, p: &Point3<Real>) -> Option<NodeId> {
        let cell = self.grid_cell(p);
        let mut best: Option<NodeId> = None;
        for dx in -1..=1i64 {
            for dy in -1..=1i64 {
                for dz in -1..=1i64 {
                    let key = [cell[0] + dx, cell[1] + dy, cell[2] + dz];
                    if let Some(bucket) = self.grid.get(&key) {
                        for &n in bucket {
                            if (self.pool[n as usize] - p).norm() <= self.eps
                                && best.is_none_or(|b| n < b)
                            {
                                best = Some(n);
                            }
                        }
                    }
                }
            }
        }
        best
    }

    /// Intern an intersection point: snap to a nearby existing node when one
    /// is within tolerance, otherwise allocate a fresh node.
    pub(crate) fn intern(&mut self, p: Point3<Real>) -> NodeId {
        if let Some(n) = self.grid_find(&p) {
            return n;
        }
        let node = self.pool.len() as NodeId;
        self.pool.push(p);
        self.grid_insert(node);
        node
    }

    /// Record an intersection node on a face, sorting it onto the face's
    /// boundary when it lies on an original edge.
    pub(crate) fn register_point_on_face(&mut self, src: Src, face: FaceIdx, node: NodeId) {
        let loop_nodes = self.face_nodes(src, face);
        if loop_nodes.contains(&node) {
            return; // already a vertex of this face
        }
        let p = self.point(node);

        // Gather the face's edges up front; mutation below invalidates
        // borrows of the source set.
        struct EdgeData {
            canon: EdgeIdx,
            pu: Point3<Real>,
            pv: Point3<Real>,
            other_face: Option<FaceIdx>,
        }
        let edges_data: Vec<EdgeData> = {
            let set = self.src_set(src);
            set.face_edges(face)
                .into_iter()
                .map(|e| {
                    let canon = self.canonical_edge(src, e);
                    let (u, v) = set.edge_endpoints(canon);
                    EdgeData {
                        canon,
                        pu: set.vertices[u.index()],
                        pv: set.vertices[v.index()],
                        other_face: set.edges[canon.index()]
                            .twin
                            .map(|t| set.edges[t.index()].face),
                    }
                })
                .collect()
        };

        self.touched.insert((src, face));

        // On an original edge?
        for ed in &edges_data {
            let dir = ed.pv - ed.pu;
            let len2 = dir.norm_squared();
            if len2 < self.eps * self.eps {
                continue;
            }
            let t = dir.dot(&(p - ed.pu)) / len2;
            if t <= 0.0 || t >= 1.0 {
                continue;
            }
            if (ed.pu + dir * t - p).norm() <= self.eps {
                let entry = self.eint.entry((src, ed.canon)).or_default();
                if !entry.iter().any(|&(_, n)| n == node) {
                    entry.push((t, node));
                }
                // The edge's other face is split there too.
                if let Some(other) = ed.other_face {
                    self.touched.insert((src, other));
                }
                return;
            }
        }

        // Interior point.
        let entry = self.face_verts.entry((src, face)).or_default();
        if !entry.contains(&node) {
            entry.push(node);
        }
    }

    /// The canonical half-edge (lower index of the twin pair) representing
    /// an undirected original edge.
    #[inline]
    pub(crate) fn canonical_edge(&self, src: Src, e: EdgeIdx) -> EdgeIdx {
        match self.src_set(src).edges[e.index()].twin {
            Some(t) if t < e => t,
            _ => e,
        }
    }
}
