//! Mesh simplification: fin removal, low-volume component removal and
//! greedy short-edge collapse.
//!
//! Collapses run through a min-heap of candidate edges keyed by length; the
//! heap's position notifier keeps a lookup table current so edges whose
//! length changed after a neighbouring collapse can be re-keyed in place.
//! A collapse that would break the oriented-manifold invariant or exceed
//! the deviation budgets is skipped silently.

use std::fmt::Debug;

use hashbrown::{HashMap, HashSet};
use nalgebra::Point3;

use super::{EdgeIdx, FaceIdx, MeshIdx, MeshSet, VertIdx};
use crate::float_types::Real;
use crate::geom::Plane;
use crate::util::heap;

/// Post-pass simplifier over a mesh set.
#[derive(Debug, Default)]
pub struct MeshSimplifier;

impl MeshSimplifier {
    pub fn new() -> Self {
        MeshSimplifier
    }

    /// Remove fin faces: faces whose area is negligible relative to their
    /// perimeter (a doubled-back sliver), by collapsing their shortest
    /// edge. Returns the number of faces removed.
    pub fn remove_fins<S: Clone + Send + Sync + Debug>(&self, set: &mut MeshSet<S>) -> usize {
        let mut removed = 0usize;
        loop {
            let mut target: Option<EdgeIdx> = None;
            'faces: for face in set.live_faces() {
                let pts = set.face_points(face);
                let plane = &set.faces[face.index()].plane;
                let poly: Vec<_> = pts.iter().map(|p| plane.project(p)).collect();
                let area = crate::geom::poly2::signed_area_2d(&poly).abs();
                let perimeter: Real = (0..pts.len())
                    .map(|i| (pts[(i + 1) % pts.len()] - pts[i]).norm())
                    .sum();
                if perimeter <= Real::EPSILON || area > 1e-10 * perimeter * perimeter {
                    continue;
                }
                // Shortest edge of the fin.
                let mut best: Option<(Real, EdgeIdx)> = None;
                for e in set.face_edges(face) {
                    let (u, v) = set.edge_endpoints(e);
                    let len = (set.vertices[v.index()] - set.vertices[u.index()]).norm();
                    if best.is_none_or(|(bl, _)| len < bl) {
                        best = Some((len, e));
                    }
                }
                if let Some((_, e)) = best {
                    target = Some(e);
                    break 'faces;
                }
            }
            match target {
                Some(e) => {
                    if collapse_edge(set, e) {
                        removed += 1;
                    } else {
                        break;
                    }
                },
                None => break,
            }
        }
        if removed > 0 {
            set.compact();
        }
        removed
    }

    /// Drop closed components whose absolute signed volume falls below
    /// `min_volume` (typically fragments left by coplanar face splits).
    /// Returns the number of components removed.
    pub fn remove_low_volume_manifolds<S: Clone + Send + Sync + Debug>(
        &self,
        set: &mut MeshSet<S>,
        min_volume: Real,
    ) -> usize {
        let doomed: Vec<usize> = (0..set.meshes.len())
            .filter(|&m| {
                set.meshes[m].is_closed()
                    && set.mesh_signed_volume(MeshIdx(m as u32)).abs() < min_volume
            })
            .collect();
        if doomed.is_empty() {
            return 0;
        }
        let keep: HashSet<usize> =
            (0..set.meshes.len()).filter(|m| !doomed.contains(m)).collect();
        set.retain_meshes(|m| keep.contains(&m));
        doomed.len()
    }

    /// Greedy edge-collapse cleanup: collapse edges shorter than
    /// `min_edge_len`, skipping any collapse that would rotate a
    /// neighbouring face normal by more than `max_normal_dev` radians,
    /// open a dihedral of more than `max_dihedral_dev` radians across a
    /// surviving edge, or squeeze a corner angle below `min_angle`.
    /// Returns the number of collapses performed.
    pub fn simplify<S: Clone + Send + Sync + Debug>(
        &self,
        set: &mut MeshSet<S>,
        min_edge_len: Real,
        max_dihedral_dev: Real,
        min_angle: Real,
        max_normal_dev: Real,
    ) -> usize {
        #[derive(Clone, Copy, Debug)]
        struct Candidate {
            len: Real,
            edge: EdgeIdx,
        }
        // Min-heap on length, ties on edge index for reproducibility.
        let order = |a: &Candidate, b: &Candidate| {
            (b.len, b.edge) < (a.len, a.edge)
        };

        let mut heap_data: Vec<Candidate> = Vec::new();
        let mut positions: HashMap<EdgeIdx, usize> = HashMap::new();

        let mut seen: HashSet<EdgeIdx> = HashSet::new();
        for face in set.live_faces() {
            for e in set.face_edges(face) {
                let canon = canonical(set, e);
                if !seen.insert(canon) {
                    continue;
                }
                let len = edge_len(set, canon);
                if len < min_edge_len {
                    heap_data.push(Candidate { len, edge: canon });
                }
            }
        }
        heap::make_heap(&mut heap_data, order, |c: &Candidate, i| {
            positions.insert(c.edge, i);
        });

        let mut collapses = 0usize;
        while let Some(cand) = heap::pop_heap(&mut heap_data, order, |c: &Candidate, i| {
            positions.insert(c.edge, i);
        }) {
            positions.remove(&cand.edge);
            if !edge_alive(set, cand.edge) {
                continue;
            }
            let len = edge_len(set, cand.edge);
            if len >= min_edge_len {
                continue;
            }
            if !collapse_allowed(set, cand.edge, max_dihedral_dev, min_angle, max_normal_dev) {
                continue;
            }

            let (_, v) = set.edge_endpoints(cand.edge);
            if !collapse_edge(set, cand.edge) {
                continue;
            }
            collapses += 1;

            // Re-key surviving candidate edges around the merged vertex.
            let mut affected: Vec<EdgeIdx> = Vec::new();
            for face in set.live_faces() {
                if set.face_vertices(face).contains(&v) {
                    for e in set.face_edges(face) {
                        affected.push(canonical(set, e));
                    }
                }
            }
            affected.sort_unstable();
            affected.dedup();
            for e in affected {
                let len = edge_len(set, e);
                match positions.get(&e).copied() {
                    Some(pos) if pos < heap_data.len() && heap_data[pos].edge == e => {
                        heap_data[pos].len = len;
                        heap::adjust_heap(&mut heap_data, pos, order, |c: &Candidate, i| {
                            positions.insert(c.edge, i);
                        });
                    },
                    _ if len < min_edge_len => {
                        heap::push_heap(
                            &mut heap_data,
                            Candidate { len, edge: e },
                            order,
                            |c: &Candidate, i| {
                                positions.insert(c.edge, i);
                            },
                        );
                    },
                    _ => {},
                }
            }
        }

        if collapses > 0 {
            set.compact();
        }
        collapses
    }
}

fn canonical<S: Clone + Send + Sync + Debug>(set: &MeshSet<S>, e: EdgeIdx) -> EdgeIdx {
    match set.edges[e.index()].twin {
        Some(t) if t < e => t,
        _ => e,
    }
}

fn edge_alive<S: Clone + Send + Sync + Debug>(set: &MeshSet<S>, e: EdgeIdx) -> bool {
    let he = &set.edges[e.index()];
    set.faces[he.face.index()].alive
}

fn edge_len<S: Clone + Send + Sync + Debug>(set: &MeshSet<S>, e: EdgeIdx) -> Real {
    let (u, v) = set.edge_endpoints(e);
    (set.vertices[v.index()] - set.vertices[u.index()]).norm()
}

/// Destination vertices around `v` (one step out along every face loop
/// touching it).
fn vertex_neighbors<S: Clone + Send + Sync + Debug>(
    set: &MeshSet<S>,
    v: VertIdx,
) -> HashSet<VertIdx> {
    let mut out = HashSet::new();
    for face in set.live_faces() {
        let verts = set.face_vertices(face);
        let n = verts.len();
        for (k, &w) in verts.iter().enumerate() {
            if w == v {
                out.insert(verts[(k + 1) % n]);
                out.insert(verts[(k + n - 1) % n]);
            }
        }
    }
    out
}

/// Faces incident to `v`.
fn vertex_faces<S: Clone + Send + Sync + Debug>(set: &MeshSet<S>, v: VertIdx) -> Vec<FaceIdx> {
    set.live_faces()
        .filter(|&f| set.face_vertices(f).contains(&v))
        .collect()
}

/// Manifold link condition plus the deviation budgets: collapsing must not
/// pinch the surface, flip or over-rotate a surviving face, or leave a
/// sliver corner.
fn collapse_allowed<S: Clone + Send + Sync + Debug>(
    set: &MeshSet<S>,
    e: EdgeIdx,
    max_dihedral_dev: Real,
    min_angle: Real,
    max_normal_dev: Real,
) -> bool {
    let he = &set.edges[e.index()];
    let Some(twin) = he.twin else {
        return false; // keep boundaries intact
    };
    let (u, v) = set.edge_endpoints(e);

    // Link condition: the only common neighbours of u and v may be the
    // opposite corners of the two faces sharing the edge.
    let mut expected: HashSet<VertIdx> = HashSet::new();
    for (face, n_verts) in [
        (he.face, set.faces[he.face.index()].n_verts),
        (set.edges[twin.index()].face, set.faces[set.edges[twin.index()].face.index()].n_verts),
    ] {
        if n_verts == 3 {
            for w in set.face_vertices(face) {
                if w != u && w != v {
                    expected.insert(w);
                }
            }
        }
    }
    let nu = vertex_neighbors(set, u);
    let nv = vertex_neighbors(set, v);
    if nu.intersection(&nv).any(|w| !expected.contains(w)) {
        return false;
    }

    // Simulate the surviving faces: a face sharing the collapsed edge loses
    // the vertex u outright, any other face around u sees u move onto v.
    let target = set.vertices[v.index()];
    let dying = [he.face, set.edges[twin.index()].face];
    let mut new_normals: HashMap<FaceIdx, nalgebra::Vector3<Real>> = HashMap::new();
    for face in vertex_faces(set, u) {
        let edge_adjacent = dying.contains(&face);
        if edge_adjacent && set.faces[face.index()].n_verts == 3 {
            continue;
        }
        let pts: Vec<Point3<Real>> = set
            .face_vertices(face)
            .into_iter()
            .filter_map(|w| {
                if w == u {
                    if edge_adjacent {
                        None
                    } else {
                        Some(target)
                    }
                } else {
                    Some(set.vertices[w.index()])
                }
            })
            .collect();
        if pts.len() < 3 {
            return false;
        }
        let Some(new_plane) = Plane::from_loop(&pts) else {
            return false; // collapse would flatten the face
        };
        let old = set.faces[face.index()].plane.normal;
        let dot = new_plane.normal.dot(&old).clamp(-1.0, 1.0);
        if dot.acos() > max_normal_dev {
            return false;
        }
        // Corner angles of the reshaped face.
        let n = pts.len();
        for k in 0..n {
            let a = pts[(k + n - 1) % n] - pts[k];
            let b = pts[(k + 1) % n] - pts[k];
            let (la, lb) = (a.norm(), b.norm());
            if la <= Real::EPSILON || lb <= Real::EPSILON {
                return false;
            }
            if (a.dot(&b) / (la * lb)).clamp(-1.0, 1.0).acos() < min_angle {
                return false;
            }
        }
        new_normals.insert(face, new_plane.normal);
    }

    // Dihedral budget across surviving edges around the collapse.
    for (&face, normal) in &new_normals {
        for edge in set.face_edges(face) {
            let Some(t) = set.edges[edge.index()].twin else {
                continue;
            };
            let nbr = set.edges[t.index()].face;
            if dying.contains(&nbr) {
                continue;
            }
            let other = new_normals
                .get(&nbr)
                .copied()
                .unwrap_or(set.faces[nbr.index()].plane.normal);
            let dot = normal.dot(&other).clamp(-1.0, 1.0);
            if dot.acos() > max_dihedral_dev {
                return false;
            }
        }
    }
    true
}

/// Collapse `e`, merging its origin into its destination. Returns false
/// when the local topology cannot support the collapse.
fn collapse_edge<S: Clone + Send + Sync + Debug>(set: &mut MeshSet<S>, e: EdgeIdx) -> bool {
    if !edge_alive(set, e) {
        return false;
    }
    let (u, v) = set.edge_endpoints(e);
    if u == v {
        return false;
    }
    let twin = set.edges[e.index()].twin;

    // Handle the two incident faces.
    let mut sides = vec![e];
    if let Some(t) = twin {
        sides.push(t);
    }
    for side in sides {
        let face = set.edges[side.index()].face;
        if !set.faces[face.index()].alive {
            continue;
        }
        if set.faces[face.index()].n_verts == 3 {
            // The face degenerates; stitch its outer neighbours together.
            let en = set.edges[side.index()].next;
            let ep = set.edges[side.index()].prev;
            let tn = set.edges[en.index()].twin;
            let tp = set.edges[ep.index()].twin;
            if let Some(tn) = tn {
                set.edges[tn.index()].twin = tp;
            }
            if let Some(tp) = tp {
                set.edges[tp.index()].twin = tn;
            }
            set.faces[face.index()].alive = false;
        } else {
            // Drop the collapsing edge from the loop.
            let next = set.edges[side.index()].next;
            let prev = set.edges[side.index()].prev;
            set.edges[prev.index()].next = next;
            set.edges[next.index()].prev = prev;
            set.edges[side.index()].twin = None;
            let f = &mut set.faces[face.index()];
            f.n_verts -= 1;
            if f.edge == side {
                f.edge = next;
            }
        }
    }

    // Re-origin every surviving edge leaving u.
    for i in 0..set.edges.len() {
        if set.edges[i].vert == u && set.faces[set.edges[i].face.index()].alive {
            set.edges[i].vert = v;
        }
    }

    // Refresh planes around the merged vertex.
    for face in vertex_faces(set, v) {
        let pts = set.face_points(face);
        if let Some(plane) = Plane::from_loop(&pts) {
            set.faces[face.index()].plane = plane;
        }
    }
    set.bounding_box = std::sync::OnceLock::new();
    true
}
