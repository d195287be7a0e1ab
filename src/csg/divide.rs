//! Face divider: splits each original face along its recorded intersection
//! evidence into one or more [`FaceLoop`]s.
//!
//! Each divided face becomes an undirected planar graph in the face's
//! dominant-axis projection: nodes are original corners, edge crossings and
//! segment endpoints; edges are boundary fragments plus intersection
//! segments. Minimal counterclockwise cycles of that graph are the face
//! loops. Interior islands (closed intersection curves not touching the
//! boundary) are keyholed to the boundary with a bridge edge so holes carve
//! correctly.

use std::fmt::Debug;

use hashbrown::{HashMap, HashSet};
use nalgebra::Point2;

use super::detail::{CsgContext, NodeId, Src, UEdge};
use crate::float_types::Real;
use crate::mesh::FaceIdx;

/// A cyclic vertex list carved out of one original face; the atomic unit of
/// classification and collection.
#[derive(Clone, Debug)]
pub struct FaceLoop {
    /// Node ids in the evaluation pool, wound like the original face.
    pub verts: Vec<NodeId>,
    /// Which input the loop came from.
    pub src: Src,
    /// The face it was carved from.
    pub orig_face: FaceIdx,
}

impl<S: Clone + Send + Sync + Debug> CsgContext<'_, S> {
    /// Divide every face of both inputs. Faces without intersection
    /// evidence pass through as a single trivial loop.
    pub(crate) fn divide_faces(&mut self) -> Vec<FaceLoop> {
        let mut loops = Vec::new();
        for src in [Src::A, Src::B] {
            let faces: Vec<FaceIdx> = self.src_set(src).live_faces().collect();
            for face in faces {
                if self.touched.contains(&(src, face)) {
                    self.divide_face(src, face, &mut loops);
                } else {
                    loops.push(FaceLoop { verts: self.face_nodes(src, face), src, orig_face: face });
                }
            }
        }
        loops
    }

    fn divide_face(&mut self, src: Src, face: FaceIdx, out: &mut Vec<FaceLoop>) {
        let plane = self.src_set(src).faces[face.index()].plane;

        // Boundary cycle with crossings inserted along each original edge.
        let mut boundary: Vec<NodeId> = Vec::new();
        {
            let edge_list = self.src_set(src).face_edges(face);
            for e in edge_list {
                let he = self.src_set(src).edges[e.index()];
                let origin = self.node_of(src, he.vert);
                boundary.push(origin);
                let canon = self.canonical_edge(src, e);
                if let Some(crossings) = self.eint.get(&(src, canon)) {
                    let mut cs = crossings.clone();
                    cs.sort_by(|a, b| {
                        a.0.partial_cmp(&b.0)
                            .unwrap_or(std::cmp::Ordering::Equal)
                            .then(a.1.cmp(&b.1))
                    });
                    if canon != e {
                        // The canonical direction runs against this face's
                        // traversal.
                        cs.reverse();
                    }
                    for (_, n) in cs {
                        if boundary.last() != Some(&n) {
                            boundary.push(n);
                        }
                    }
                }
            }
        }
        while boundary.len() > 1 && boundary.first() == boundary.last() {
            boundary.pop();
        }

        // Collect the graph's undirected edges.
        let mut graph_edges: Vec<UEdge> = Vec::new();
        let mut seen: HashSet<UEdge> = HashSet::new();
        for i in 0..boundary.len() {
            let u = boundary[i];
            let v = boundary[(i + 1) % boundary.len()];
            if u == v {
                continue;
            }
            let e = UEdge::new(u, v);
            if seen.insert(e) {
                graph_edges.push(e);
            }
        }
        if let Some(segs) = self.ff_segs.get(&(src, face)) {
            for &e in segs {
                if seen.insert(e) {
                    graph_edges.push(e);
                }
            }
        }
        if graph_edges.is_empty() {
            return;
        }

        // Dense local indexing and 2D embedding.
        let mut local: HashMap<NodeId, usize> = HashMap::new();
        let mut nodes: Vec<NodeId> = Vec::new();
        let mut index_of = |n: NodeId, nodes: &mut Vec<NodeId>, local: &mut HashMap<NodeId, usize>| {
            *local.entry(n).or_insert_with(|| {
                nodes.push(n);
                nodes.len() - 1
            })
        };
        let mut edges_local: Vec<(usize, usize)> = Vec::new();
        for &UEdge(u, v) in &graph_edges {
            let ul = index_of(u, &mut nodes, &mut local);
            let vl = index_of(v, &mut nodes, &mut local);
            edges_local.push((ul, vl));
        }
        let coords: Vec<Point2<Real>> =
            nodes.iter().map(|&n| plane.project(&self.point(n))).collect();

        // Bridge interior islands to the component containing the boundary.
        bridge_islands(&mut edges_local, &coords, local[&boundary[0]]);

        // Adjacency with CCW-sorted neighbours.
        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
        for &(u, v) in &edges_local {
            adj[u].push(v);
            adj[v].push(u);
        }
        for (u, nbrs) in adj.iter_mut().enumerate() {
            nbrs.sort_by(|&a, &b| {
                let aa = angle(&coords[u], &coords[a]);
                let ab = angle(&coords[u], &coords[b]);
                aa.partial_cmp(&ab).unwrap_or(std::cmp::Ordering::Equal).then(a.cmp(&b))
            });
        }

        // Trace every dart once; keep counterclockwise (positive-area)
        // cycles.
        let mut used: HashSet<(usize, usize)> = HashSet::new();
        let mut darts: Vec<(usize, usize)> = Vec::with_capacity(edges_local.len() * 2);
        for &(u, v) in &edges_local {
            darts.push((u, v));
            darts.push((v, u));
        }
        for &(su, sv) in &darts {
            if used.contains(&(su, sv)) {
                continue;
            }
            let mut cycle: Vec<usize> = Vec::new();
            let (mut u, mut v) = (su, sv);
            loop {
                used.insert((u, v));
                cycle.push(u);
                let nbrs = &adj[v];
                let pos = nbrs.iter().position(|&w| w == u).unwrap_or(0);
                let w = nbrs[(pos + 1) % nbrs.len()];
                u = v;
                v = w;
                if (u, v) == (su, sv) {
                    break;
                }
                if cycle.len() > edges_local.len() * 2 + 2 {
                    break; // malformed graph, bail out of this trace
                }
            }
            let mut verts: Vec<NodeId> = cycle.iter().map(|&l| nodes[l]).collect();
            remove_spurs(&mut verts);
            if verts.len() < 3 {
                continue;
            }
            let poly: Vec<Point2<Real>> = verts
                .iter()
                .map(|&n| plane.project(&self.point(n)))
                .collect();
            if crate::geom::poly2::signed_area_2d(&poly) > 0.0 {
                out.push(FaceLoop { verts, src, orig_face: face });
            }
        }
    }
}

fn angle(from: &Point2<Real>, to: &Point2<Real>) -> Real {
    (to.y - from.y).atan2(to.x - from.x)
}

/// Connect graph components that do not reach the boundary to the boundary
/// component with a shortest keyhole bridge.
fn bridge_islands(edges: &mut Vec<(usize, usize)>, coords: &[Point2<Real>], boundary_node: usize) {
    let n = coords.len();
    // Union-find over current edges.
    let mut parent: Vec<usize> = (0..n).collect();
    fn find(parent: &mut Vec<usize>, x: usize) -> usize {
        if parent[x] != x {
            let r = find(parent, parent[x]);
            parent[x] = r;
        }
        parent[x]
    }
    for &(u, v) in edges.iter() {
        let (ru, rv) = (find(&mut parent, u), find(&mut parent, v));
        if ru != rv {
            parent[ru.max(rv)] = ru.min(rv);
        }
    }

    loop {
        let main = find(&mut parent, boundary_node);
        // Closest (island node, main node) pair; islands attach one at a
        // time so chained islands connect through each other.
        let mut best: Option<(Real, usize, usize)> = None;
        for u in 0..n {
            if find(&mut parent, u) == main {
                continue;
            }
            for v in 0..n {
                if find(&mut parent, v) != main {
                    continue;
                }
                let d = (coords[u] - coords[v]).norm_squared();
                if best.is_none_or(|(bd, bu, bv)| {
                    d < bd || (d == bd && (u, v) < (bu, bv))
                }) {
                    best = Some((d, u, v));
                }
            }
        }
        match best {
            Some((_, u, v)) => {
                edges.push((u, v));
                let (ru, rv) = (find(&mut parent, u), find(&mut parent, v));
                parent[ru.max(rv)] = ru.min(rv);
            },
            None => break,
        }
    }
}

/// Drop zero-width antennae (`.., x, tip, x, ..`) left by tangential
/// contacts and keyhole bridges walked out and straight back.
fn remove_spurs(verts: &mut Vec<NodeId>) {
    loop {
        let n = verts.len();
        if n < 3 {
            return;
        }
        let mut removed = false;
        let mut i = 0;
        while i < verts.len() && verts.len() >= 3 {
            let len = verts.len();
            let prev = verts[(i + len - 1) % len];
            let next = verts[(i + 1) % len];
            if prev == next {
                // Remove the tip and one duplicate of its base.
                let tip = i;
                let dup = (i + 1) % verts.len();
                if dup > tip {
                    verts.remove(dup);
                    verts.remove(tip);
                } else {
                    verts.remove(tip);
                    verts.remove(dup);
                }
                removed = true;
            } else {
                i += 1;
            }
        }
        if !removed || verts.len() == n {
            return;
        }
    }
}
