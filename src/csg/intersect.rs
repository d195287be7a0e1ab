//! Intersection finder: vertex welding, edge/face crossings and face/face
//! segment chains between the two inputs.
//!
//! All topological branches are decided by exact predicates or by the welded
//! tolerance grid; floating-point geometry only places the resulting points.
//! New intersection points are interned through the grid, so a point computed
//! independently from both sides resolves to the same node.

use std::fmt::Debug;

use hashbrown::HashSet;
use nalgebra::Point3;

use super::detail::{CrossInfo, CsgContext, NodeId, Src, UEdge};
use crate::errors::CsgError;
use crate::float_types::Real;
use crate::geom::aabb::inflated;
use crate::geom::poly2::{point_in_polygon_2d, PolygonLocation};
use crate::predicates::orient3d;
use crate::spatial::RTree;
use crate::mesh::FaceIdx;

impl<S: Clone + Send + Sync + Debug> CsgContext<'_, S> {
    /// Run the full intersection pipeline, filling the transient records.
    pub(crate) fn find_intersections(&mut self) -> Result<(), CsgError> {
        self.weld_vertices();
        let pairs = self.broad_phase();

        let mut coplanar_pairs = Vec::new();
        let mut edge_done: HashSet<(Src, crate::mesh::EdgeIdx, FaceIdx)> = HashSet::new();
        let mut vert_done: HashSet<(Src, NodeId, FaceIdx)> = HashSet::new();

        for &(fa, fb) in &pairs {
            let anchor_a = self.a.face_anchor(fa);
            let anchor_b = self.b.face_anchor(fb);

            // Exact side-of-plane signs for each face's corners against the
            // other face's supporting plane.
            let signs_b: Vec<Real> = self
                .face_nodes(Src::B, fb)
                .iter()
                .map(|&n| orient3d(&anchor_a[0], &anchor_a[1], &anchor_a[2], &self.point(n)))
                .collect();
            if signs_b.iter().any(|s| s.is_nan()) {
                return Err(CsgError::NumericOverflow);
            }
            if signs_b.iter().all(|&s| s > 0.0) || signs_b.iter().all(|&s| s < 0.0) {
                continue;
            }
            if signs_b.iter().all(|&s| s == 0.0) {
                coplanar_pairs.push((fa, fb));
                continue;
            }
            let signs_a: Vec<Real> = self
                .face_nodes(Src::A, fa)
                .iter()
                .map(|&n| orient3d(&anchor_b[0], &anchor_b[1], &anchor_b[2], &self.point(n)))
                .collect();
            if signs_a.iter().any(|s| s.is_nan()) {
                return Err(CsgError::NumericOverflow);
            }
            if signs_a.iter().all(|&s| s > 0.0) || signs_a.iter().all(|&s| s < 0.0) {
                continue;
            }

            // Corners of one face lying on the other face.
            self.vertices_on_face(Src::A, fa, fb, &mut vert_done);
            self.vertices_on_face(Src::B, fb, fa, &mut vert_done);

            // Edge/face crossings, both directions.
            self.edge_crossings(Src::A, fa, fb, &anchor_b, &mut edge_done)?;
            self.edge_crossings(Src::B, fb, fa, &anchor_a, &mut edge_done)?;
        }

        for (fa, fb) in coplanar_pairs {
            self.handle_coplanar(fa, fb)?;
        }

        self.build_ff_segments(&pairs);
        Ok(())
    }

    /// Identify vertices of the two inputs that coincide within tolerance.
    fn weld_vertices(&mut self) {
        for v in 0..self.b_off {
            self.grid_insert(v);
        }
        for vb in 0..self.b.vertices.len() as u32 {
            let raw = self.b_off + vb;
            let p = self.pool[raw as usize];
            match self.grid_find(&p) {
                // Only cross-mesh pairs weld; near-coincident vertices within
                // one input keep their identity.
                Some(n) if n < self.b_off => {
                    self.weld.insert(raw, n);
                },
                _ => self.grid_insert(raw),
            }
        }
    }

    /// Candidate face pairs from R-tree overlap of face bounds.
    #[cfg(not(feature = "parallel"))]
    fn broad_phase(&self) -> Vec<(FaceIdx, FaceIdx)> {
        let tree = self.broad_phase_tree();
        let mut pairs = Vec::new();
        let mut hits = Vec::new();
        for fa in self.a.live_faces() {
            let query = inflated(&self.a.face_bounding_box(fa), self.eps);
            tree.query_into(&query, &mut hits);
            for &fb in &hits {
                pairs.push((fa, FaceIdx(fb)));
            }
        }
        pairs
    }

    /// Parallel candidate collection; per-face hit lists are flattened in
    /// face order, so the pair list matches the serial build exactly.
    #[cfg(feature = "parallel")]
    fn broad_phase(&self) -> Vec<(FaceIdx, FaceIdx)> {
        use rayon::prelude::*;

        let tree = self.broad_phase_tree();
        let a_faces: Vec<FaceIdx> = self.a.live_faces().collect();
        a_faces
            .par_iter()
            .map(|&fa| {
                let query = inflated(&self.a.face_bounding_box(fa), self.eps);
                tree.query(&query)
                    .into_iter()
                    .map(|fb| (fa, FaceIdx(fb)))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    }

    fn broad_phase_tree(&self) -> RTree {
        let items: Vec<_> = self
            .b
            .live_faces()
            .map(|f| (inflated(&self.b.face_bounding_box(f), self.eps), f.0))
            .collect();
        RTree::build(&items)
    }

    /// Register corners of `face` (side `src`) that lie on the opposing
    /// face `other`, within the welding tolerance. Tolerance rather than an
    /// exact zero: a corner a few ulps off the plane still snaps the
    /// crossings of its incident edges, and must anchor the segment chain.
    fn vertices_on_face(
        &mut self,
        src: Src,
        face: FaceIdx,
        other: FaceIdx,
        vert_done: &mut HashSet<(Src, NodeId, FaceIdx)>,
    ) {
        let other_plane = self.src_set(src.other()).faces[other.index()].plane;
        let nodes = self.face_nodes(src, face);
        for &node in nodes.iter() {
            let p = self.point(node);
            if other_plane.signed_distance(&p).abs() > self.eps {
                continue;
            }
            if !vert_done.insert((src, node, other)) {
                continue;
            }
            if self.locate_on_face(src.other(), other, &p) == PolygonLocation::Outside {
                continue;
            }
            self.register_point_on_face(src.other(), other, node);
            self.add_pair_points_for_vertex(src, node, other);
        }
    }

    /// 2D location of a point against a face, in the face's dominant-axis
    /// projection.
    fn locate_on_face(&self, src: Src, face: FaceIdx, p: &Point3<Real>) -> PolygonLocation {
        let set = self.src_set(src);
        let plane = set.faces[face.index()].plane;
        let poly: Vec<_> = self
            .face_nodes(src, face)
            .iter()
            .map(|&n| plane.project(&self.point(n)))
            .collect();
        point_in_polygon_2d(&plane.project(p), &poly)
    }

    /// Crossings of `from`-side edges of `face` through the opposing face
    /// `other` (whose anchor triangle is `anchor`).
    fn edge_crossings(
        &mut self,
        from: Src,
        face: FaceIdx,
        other: FaceIdx,
        anchor: &[Point3<Real>; 3],
        edge_done: &mut HashSet<(Src, crate::mesh::EdgeIdx, FaceIdx)>,
    ) -> Result<(), CsgError> {
        let edges: Vec<_> = {
            let set = self.src_set(from);
            set.face_edges(face)
                .into_iter()
                .map(|e| self.canonical_edge(from, e))
                .collect()
        };
        let other_plane = self.src_set(from.other()).faces[other.index()].plane;

        for canon in edges {
            if !edge_done.insert((from, canon, other)) {
                continue;
            }
            let (u, v) = self.src_set(from).edge_endpoints(canon);
            let (nu, nv) = (self.node_of(from, u), self.node_of(from, v));
            let (pu, pv) = (self.point(nu), self.point(nv));
            let su = orient3d(&anchor[0], &anchor[1], &anchor[2], &pu);
            let sv = orient3d(&anchor[0], &anchor[1], &anchor[2], &pv);
            if su.is_nan() || sv.is_nan() {
                return Err(CsgError::NumericOverflow);
            }
            if su == 0.0 || sv == 0.0 || (su > 0.0) == (sv > 0.0) {
                // Endpoints on the plane are handled by the vertex pass.
                continue;
            }

            let du = other_plane.signed_distance(&pu);
            let dv = other_plane.signed_distance(&pv);
            let denom = du - dv;
            let t = if denom.abs() > Real::EPSILON { (du / denom).clamp(0.0, 1.0) } else { 0.5 };
            let p = pu + (pv - pu) * t;
            if self.locate_on_face(from.other(), other, &p) == PolygonLocation::Outside {
                continue;
            }

            let node = self.intern(p);
            if node != nu && node != nv {
                let entry = self.eint.entry((from, canon)).or_default();
                if !entry.iter().any(|&(_, n)| n == node) {
                    entry.push((t, node));
                }
                self.register_point_on_face(from.other(), other, node);
                self.add_pair_points_for_edge(from, canon, other, node);
            }
        }
        Ok(())
    }

    /// Record `node` as a segment-endpoint candidate for every pair formed
    /// by the faces adjacent to the crossing edge and the opposing face.
    fn add_pair_points_for_edge(
        &mut self,
        from: Src,
        canon: crate::mesh::EdgeIdx,
        other: FaceIdx,
        node: NodeId,
    ) {
        let mut adjacent = Vec::with_capacity(2);
        {
            let set = self.src_set(from);
            adjacent.push(set.edges[canon.index()].face);
            if let Some(t) = set.edges[canon.index()].twin {
                adjacent.push(set.edges[t.index()].face);
            }
        }
        for f in adjacent {
            self.touched.insert((from, f));
            self.push_pair_point(from, f, other, node);
        }
    }

    /// Record a coincident vertex as a segment-endpoint candidate for every
    /// (adjacent face, opposing face) pair.
    fn add_pair_points_for_vertex(&mut self, src: Src, node: NodeId, other: FaceIdx) {
        let mut adjacent = Vec::new();
        {
            let set = self.src_set(src);
            for f in set.live_faces() {
                if self.face_nodes(src, f).contains(&node) {
                    adjacent.push(f);
                }
            }
        }
        for f in adjacent {
            self.push_pair_point(src, f, other, node);
        }
    }

    fn push_pair_point(&mut self, src: Src, face: FaceIdx, other: FaceIdx, node: NodeId) {
        let key = match src {
            Src::A => (face, other),
            Src::B => (other, face),
        };
        let entry = self.pair_points.entry(key).or_default();
        if !entry.contains(&node) {
            entry.push(node);
        }
    }

    /// Coplanar pair. Three resolvable shapes: full-boundary coincidence
    /// (participates in the ON rules as-is), disjoint-interior contact, and
    /// one face's region contained in the other's (the larger face is
    /// divided along the smaller one's boundary). Interiors that partially
    /// overlap with crossing boundaries are outside the documented handling
    /// and rejected.
    fn handle_coplanar(&mut self, fa: FaceIdx, fb: FaceIdx) -> Result<(), CsgError> {
        let mut na = self.face_nodes(Src::A, fa);
        let mut nb = self.face_nodes(Src::B, fb);
        na.sort_unstable();
        nb.sort_unstable();
        if na == nb {
            self.coplanar.entry((Src::A, fa)).or_default().push(fb);
            self.coplanar.entry((Src::B, fb)).or_default().push(fa);
            return Ok(());
        }

        let plane = self.a.faces[fa.index()].plane;
        let poly_a: Vec<_> = self
            .face_nodes(Src::A, fa)
            .iter()
            .map(|&n| plane.project(&self.point(n)))
            .collect();
        let poly_b: Vec<_> = self
            .face_nodes(Src::B, fb)
            .iter()
            .map(|&n| plane.project(&self.point(n)))
            .collect();

        if polygons_properly_cross(&poly_a, &poly_b) {
            return Err(CsgError::UnresolvableCoincidence {
                face_a: self.a.face_key(fa),
                face_b: self.b.face_key(fb),
            });
        }

        let centroid = |poly: &[nalgebra::Point2<Real>]| {
            let mut c = nalgebra::Vector2::zeros();
            for p in poly {
                c += p.coords;
            }
            nalgebra::Point2::from(c / poly.len() as Real)
        };
        let b_in_a = poly_b.iter().all(|p| point_in_polygon_2d(p, &poly_a) != PolygonLocation::Outside)
            && point_in_polygon_2d(&centroid(&poly_b), &poly_a) == PolygonLocation::Inside;
        let a_in_b = poly_a.iter().all(|p| point_in_polygon_2d(p, &poly_b) != PolygonLocation::Outside)
            && point_in_polygon_2d(&centroid(&poly_a), &poly_b) == PolygonLocation::Inside;

        if b_in_a {
            self.divide_along_contained(Src::A, fa, Src::B, fb);
            return Ok(());
        }
        if a_in_b {
            self.divide_along_contained(Src::B, fb, Src::A, fa);
            return Ok(());
        }

        // Disjoint interiors: any remaining vertex strictly inside the
        // other loop means a partial overlap we cannot resolve.
        let overlap = poly_b
            .iter()
            .any(|p| point_in_polygon_2d(p, &poly_a) == PolygonLocation::Inside)
            || poly_a
                .iter()
                .any(|p| point_in_polygon_2d(p, &poly_b) == PolygonLocation::Inside);
        if overlap {
            return Err(CsgError::UnresolvableCoincidence {
                face_a: self.a.face_key(fa),
                face_b: self.b.face_key(fb),
            });
        }
        Ok(())
    }

    /// Divide `outer`'s face along the boundary of the coplanar `inner`
    /// face contained in it. The inner loop's edges become barrier curves,
    /// so the contained region separates and classifies ON the inner face.
    fn divide_along_contained(
        &mut self,
        outer_src: Src,
        outer: FaceIdx,
        inner_src: Src,
        inner: FaceIdx,
    ) {
        let inner_nodes = self.face_nodes(inner_src, inner);
        for &n in &inner_nodes {
            self.register_point_on_face(outer_src, outer, n);
        }
        let n = inner_nodes.len();
        let mut edges = Vec::with_capacity(n);
        for k in 0..n {
            let e = UEdge::new(inner_nodes[k], inner_nodes[(k + 1) % n]);
            if e.0 != e.1 {
                edges.push(e);
            }
        }
        let segs = self.ff_segs.entry((outer_src, outer)).or_default();
        for &e in &edges {
            if !segs.contains(&e) {
                segs.push(e);
            }
        }
        for e in edges {
            self.cross_edges.entry(e).or_default().shared_boundary = true;
        }
        self.touched.insert((outer_src, outer));
    }

    /// Assemble face/face intersection segments from the endpoint candidates
    /// gathered per pair, ordered along the plane-intersection line.
    fn build_ff_segments(&mut self, pairs: &[(FaceIdx, FaceIdx)]) {
        for &(fa, fb) in pairs {
            let Some(points) = self.pair_points.get(&(fa, fb)).cloned() else {
                continue;
            };
            if points.len() < 2 {
                continue;
            }
            let na = self.a.faces[fa.index()].plane.normal;
            let nb = self.b.faces[fb.index()].plane.normal;
            let dir = na.cross(&nb);
            if dir.norm() < self.eps {
                continue; // coplanar pairs carry no transversal segments
            }

            let mut ordered: Vec<(Real, NodeId)> = points
                .iter()
                .map(|&n| (dir.dot(&self.point(n).coords), n))
                .collect();
            ordered.sort_by(|a, b| {
                a.0.partial_cmp(&b.0)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.1.cmp(&b.1))
            });
            ordered.dedup_by_key(|&mut (_, n)| n);

            let comp_a = self.a.faces[fa.index()].mesh;
            let comp_b = self.b.faces[fb.index()].mesh;
            for w in 0..ordered.len() - 1 {
                let (sa, np) = ordered[w];
                let (sb, nq) = ordered[w + 1];
                if np == nq || (sb - sa).abs() <= self.eps {
                    continue;
                }
                let mid = Point3::from((self.point(np).coords + self.point(nq).coords) * 0.5);
                if self.locate_on_face(Src::A, fa, &mid) == PolygonLocation::Outside
                    || self.locate_on_face(Src::B, fb, &mid) == PolygonLocation::Outside
                {
                    continue;
                }
                let edge = UEdge::new(np, nq);
                let segs = self.ff_segs.entry((Src::A, fa)).or_default();
                if !segs.contains(&edge) {
                    segs.push(edge);
                }
                let segs = self.ff_segs.entry((Src::B, fb)).or_default();
                if !segs.contains(&edge) {
                    segs.push(edge);
                }
                self.touched.insert((Src::A, fa));
                self.touched.insert((Src::B, fb));

                let info = self.cross_edges.entry(edge).or_insert_with(CrossInfo::default);
                if !info.toggles_a.contains(&comp_b) {
                    info.toggles_a.push(comp_b);
                }
                if !info.toggles_b.contains(&comp_a) {
                    info.toggles_b.push(comp_a);
                }
            }
        }
    }
}

/// Whether two coplanar 2D polygons have properly crossing edges.
fn polygons_properly_cross(
    a: &[nalgebra::Point2<Real>],
    b: &[nalgebra::Point2<Real>],
) -> bool {
    use crate::predicates::orient2d;
    for i in 0..a.len() {
        let (p, q) = (&a[i], &a[(i + 1) % a.len()]);
        for j in 0..b.len() {
            let (r, s) = (&b[j], &b[(j + 1) % b.len()]);
            let d1 = orient2d(p, q, r);
            let d2 = orient2d(p, q, s);
            let d3 = orient2d(r, s, p);
            let d4 = orient2d(r, s, q);
            if d1 != 0.0
                && d2 != 0.0
                && d3 != 0.0
                && d4 != 0.0
                && (d1 > 0.0) != (d2 > 0.0)
                && (d3 > 0.0) != (d4 > 0.0)
            {
                return true;
            }
        }
    }
    false
}
