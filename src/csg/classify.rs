//! Classification of face-loop groups against the opposing solid.
//!
//! `CLASSIFY_NORMAL` shoots a deterministic ray from a representative
//! interior point of the group and counts signed crossings against each
//! opposing component; degenerate hits retry from a fixed direction table so
//! runs are reproducible. `CLASSIFY_EDGE` seeds from groups whose state is
//! known (ON coincidences, or one ray cast per connected cluster) and
//! propagates across intersection curves with the in/out toggle rule.
//! Contradictions surface as [`CsgError::ClassifierConflict`].

use std::fmt::Debug;

use hashbrown::{HashMap, HashSet};
use nalgebra::{Point3, Vector3};

use super::detail::{CsgContext, Src, UEdge};
use super::divide::FaceLoop;
use super::group::{FaceLoopGroup, GroupClass};
use super::ClassifyType;
use crate::errors::CsgError;
use crate::float_types::Real;
use crate::geom::poly2::{point_in_polygon_2d, PolygonLocation};
use crate::mesh::{FaceIdx, MeshIdx};

/// Relation of a face-loop group to one opposing component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaceClass {
    Unclassified,
    /// Strictly inside the component.
    In,
    /// Strictly outside the component.
    Out,
    /// On the component's boundary, normals agreeing.
    OnOrientIn,
    /// On the component's boundary, normals opposed.
    OnOrientOut,
}

impl FaceClass {
    fn toggled(self) -> FaceClass {
        match self {
            FaceClass::In => FaceClass::Out,
            FaceClass::Out => FaceClass::In,
            other => other,
        }
    }
}

/// Fixed direction table for the ray caster. Unnormalized lattice
/// directions: no face of a typical mesh is parallel to all of them.
const RAY_DIRECTIONS: [[Real; 3]; 13] = [
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, 0.0, 1.0],
    [1.0, 1.0, 0.0],
    [1.0, 0.0, 1.0],
    [0.0, 1.0, 1.0],
    [1.0, -1.0, 0.0],
    [1.0, 0.0, -1.0],
    [0.0, 1.0, -1.0],
    [1.0, 1.0, 1.0],
    [1.0, 1.0, -1.0],
    [1.0, -1.0, 1.0],
    [-1.0, 1.0, 1.0],
];

impl<S: Clone + Send + Sync + Debug> CsgContext<'_, S> {
    /// Fill `classes` on every group, one entry per opposing component.
    pub(crate) fn classify_groups(
        &self,
        groups: &mut [FaceLoopGroup],
        classify: ClassifyType,
    ) -> Result<(), CsgError> {
        // Representative interior points, computed once.
        let reps: Vec<Point3<Real>> = groups
            .iter()
            .map(|g| self.loop_interior_point(&g.loops[0]))
            .collect();

        // ON detection: a group lying on a face of the other side gets its
        // orientation class for that face's component.
        let mut on_class: HashMap<(usize, MeshIdx), FaceClass> = HashMap::new();
        for (gi, group) in groups.iter().enumerate() {
            for (mesh, class) in self.detect_on(group, &reps[gi]) {
                on_class.entry((gi, mesh)).or_insert(class);
            }
        }

        match classify {
            ClassifyType::Normal => {
                for (gi, group) in groups.iter_mut().enumerate() {
                    let opposing = group.src.other();
                    let n_comp = self.src_set(opposing).meshes.len();
                    for m in 0..n_comp {
                        let mesh = MeshIdx(m as u32);
                        let class = match on_class.get(&(gi, mesh)) {
                            Some(&c) => c,
                            None => self.ray_classify(opposing, mesh, &reps[gi]).ok_or(
                                CsgError::ClassifierConflict {
                                    group: gi,
                                    left: FaceClass::Unclassified,
                                    right: FaceClass::Unclassified,
                                },
                            )?,
                        };
                        group.classes.push(GroupClass {
                            mesh,
                            closed: self.src_set(opposing).meshes[m].is_closed(),
                            class,
                        });
                    }
                }
            },
            ClassifyType::Edge => {
                self.edge_classify(groups, &reps, &on_class)?;
            },
        }
        Ok(())
    }

    /// A point in the interior of a loop, found by testing the loop
    /// centroid and then fan-triangle centroids against the loop polygon.
    pub(crate) fn loop_interior_point(&self, l: &FaceLoop) -> Point3<Real> {
        let plane = self.src_set(l.src).faces[l.orig_face.index()].plane;
        let pts: Vec<Point3<Real>> = l.verts.iter().map(|&n| self.point(n)).collect();
        let poly: Vec<_> = pts.iter().map(|p| plane.project(p)).collect();

        let centroid = Point3::from(
            pts.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / pts.len() as Real,
        );
        if point_in_polygon_2d(&plane.project(&centroid), &poly) == PolygonLocation::Inside {
            return centroid;
        }

        // Largest-area fan triangle whose centroid lands inside.
        let mut best: Option<(Real, Point3<Real>)> = None;
        for i in 1..pts.len() - 1 {
            let area = crate::geom::poly2::signed_area_2d(&[poly[0], poly[i], poly[i + 1]]);
            if area <= 0.0 {
                continue;
            }
            let c = Point3::from((pts[0].coords + pts[i].coords + pts[i + 1].coords) / 3.0);
            if point_in_polygon_2d(&plane.project(&c), &poly) == PolygonLocation::Inside
                && best.is_none_or(|(ba, _)| area > ba)
            {
                best = Some((area, c));
            }
        }
        best.map(|(_, c)| c).unwrap_or(centroid)
    }

    /// Opposing faces this group lies on, mapped to their component and the
    /// orientation class.
    fn detect_on(&self, group: &FaceLoopGroup, rep: &Point3<Real>) -> Vec<(MeshIdx, FaceClass)> {
        let l = &group.loops[0];
        let opposing = group.src.other();
        let set = self.src_set(opposing);
        let own_normal = self.src_set(l.src).faces[l.orig_face.index()].plane.normal;

        let mut out = Vec::new();
        for f in set.live_faces() {
            let plane = set.faces[f.index()].plane;
            if l.verts.iter().any(|&n| plane.signed_distance(&self.point(n)).abs() > self.eps) {
                continue;
            }
            if plane.signed_distance(rep).abs() > self.eps {
                continue;
            }
            let poly: Vec<_> = self
                .face_nodes(opposing, f)
                .iter()
                .map(|&n| plane.project(&self.point(n)))
                .collect();
            if point_in_polygon_2d(&plane.project(rep), &poly) == PolygonLocation::Outside {
                continue;
            }
            let class = if own_normal.dot(&plane.normal) > 0.0 {
                FaceClass::OnOrientIn
            } else {
                FaceClass::OnOrientOut
            };
            out.push((set.faces[f.index()].mesh, class));
        }
        out
    }

    /// Signed-crossing ray cast of `p` against one component. `None` when
    /// every direction in the table hit a degeneracy.
    pub(crate) fn ray_classify(
        &self,
        target: Src,
        comp: MeshIdx,
        p: &Point3<Real>,
    ) -> Option<FaceClass> {
        let set = self.src_set(target);
        let faces = &set.meshes[comp.index()].faces;

        'dirs: for d in &RAY_DIRECTIONS {
            let dir = Vector3::new(d[0], d[1], d[2]);
            let mut total = 0i64;
            for &f in faces {
                if !set.faces[f.index()].alive {
                    continue;
                }
                let plane = set.faces[f.index()].plane;
                let nd = plane.normal.dot(&dir);
                let dp = plane.signed_distance(p);
                if nd.abs() < 1e-14 {
                    if dp.abs() <= self.eps && self.locate_in_target_face(target, f, p) {
                        continue 'dirs; // ray runs inside the face itself
                    }
                    continue;
                }
                let t = -dp / nd;
                if t < -self.eps {
                    continue;
                }
                if t.abs() <= self.eps {
                    // Start point on the face's plane: the ray leaves the
                    // plane immediately, so the face only matters when the
                    // point sits on the face region itself.
                    if self.locate_in_target_face(target, f, p) {
                        continue 'dirs;
                    }
                    continue;
                }
                let hit = p + dir * t;
                let face_plane = plane;
                let poly: Vec<_> = self
                    .face_nodes(target, f)
                    .iter()
                    .map(|&n| face_plane.project(&self.point(n)))
                    .collect();
                match point_in_polygon_2d(&face_plane.project(&hit), &poly) {
                    PolygonLocation::Inside => total += if nd > 0.0 { 1 } else { -1 },
                    PolygonLocation::OnBoundary => continue 'dirs,
                    PolygonLocation::Outside => {},
                }
            }
            return Some(if total != 0 { FaceClass::In } else { FaceClass::Out });
        }
        None
    }

    /// Whether `p` lies inside or on the 2D region of one target face.
    fn locate_in_target_face(&self, target: Src, f: FaceIdx, p: &Point3<Real>) -> bool {
        let set = self.src_set(target);
        let plane = set.faces[f.index()].plane;
        let poly: Vec<_> = self
            .face_nodes(target, f)
            .iter()
            .map(|&n| plane.project(&self.point(n)))
            .collect();
        point_in_polygon_2d(&plane.project(p), &poly) != PolygonLocation::Outside
    }

    /// Edge-propagation classifier.
    fn edge_classify(
        &self,
        groups: &mut [FaceLoopGroup],
        reps: &[Point3<Real>],
        on_class: &HashMap<(usize, MeshIdx), FaceClass>,
    ) -> Result<(), CsgError> {
        // Loop-edge -> group incidence per side.
        let mut group_of_loop_edge: HashMap<(Src, UEdge), Vec<usize>> = HashMap::new();
        for (gi, g) in groups.iter().enumerate() {
            for l in &g.loops {
                let n = l.verts.len();
                for k in 0..n {
                    let e = UEdge::new(l.verts[k], l.verts[(k + 1) % n]);
                    let entry = group_of_loop_edge.entry((g.src, e)).or_default();
                    if entry.last() != Some(&gi) {
                        entry.push(gi);
                    }
                }
            }
        }

        for src in [Src::A, Src::B] {
            let opposing = src.other();
            let n_comp = self.src_set(opposing).meshes.len();
            let side_groups: Vec<usize> = groups
                .iter()
                .enumerate()
                .filter(|(_, g)| g.src == src)
                .map(|(i, _)| i)
                .collect();

            for m in 0..n_comp {
                let mesh = MeshIdx(m as u32);

                // Adjacency between groups across curves toggling this
                // component.
                let mut adj: HashMap<usize, Vec<usize>> = HashMap::new();
                for (edge, info) in &self.cross_edges {
                    let toggles = match src {
                        Src::A => &info.toggles_a,
                        Src::B => &info.toggles_b,
                    };
                    if !toggles.contains(&mesh) {
                        continue;
                    }
                    if let Some(members) = group_of_loop_edge.get(&(src, *edge)) {
                        let distinct: Vec<usize> = {
                            let mut d = members.clone();
                            d.sort_unstable();
                            d.dedup();
                            d
                        };
                        if distinct.len() == 2 {
                            adj.entry(distinct[0]).or_default().push(distinct[1]);
                            adj.entry(distinct[1]).or_default().push(distinct[0]);
                        }
                    }
                }

                let mut assigned: HashMap<usize, FaceClass> = HashMap::new();
                for &gi in &side_groups {
                    if let Some(&c) = on_class.get(&(gi, mesh)) {
                        assigned.insert(gi, c);
                    }
                }

                // Propagate from seeds; clusters without a seed get one ray
                // cast at their lowest group.
                let mut visited: HashSet<usize> = HashSet::new();
                for &start in &side_groups {
                    if visited.contains(&start) {
                        continue;
                    }
                    // Collect the cluster.
                    let mut cluster = vec![start];
                    let mut queue = vec![start];
                    visited.insert(start);
                    while let Some(g) = queue.pop() {
                        for &n in adj.get(&g).map(|v| v.as_slice()).unwrap_or(&[]) {
                            if visited.insert(n) {
                                cluster.push(n);
                                queue.push(n);
                            }
                        }
                    }
                    cluster.sort_unstable();

                    let seed = cluster.iter().copied().find(|g| assigned.contains_key(g));
                    let seed = match seed {
                        Some(s) => s,
                        None => {
                            let g = cluster[0];
                            let class = self.ray_classify(opposing, mesh, &reps[g]).ok_or(
                                CsgError::ClassifierConflict {
                                    group: g,
                                    left: FaceClass::Unclassified,
                                    right: FaceClass::Unclassified,
                                },
                            )?;
                            assigned.insert(g, class);
                            g
                        },
                    };

                    // BFS with the toggle rule. ON groups act as barriers.
                    let mut queue = vec![seed];
                    while let Some(g) = queue.pop() {
                        let current = assigned[&g];
                        if matches!(current, FaceClass::OnOrientIn | FaceClass::OnOrientOut) {
                            continue;
                        }
                        for &n in adj.get(&g).map(|v| v.as_slice()).unwrap_or(&[]) {
                            let expected = current.toggled();
                            match assigned.get(&n) {
                                None => {
                                    assigned.insert(n, expected);
                                    queue.push(n);
                                },
                                Some(&c)
                                    if matches!(
                                        c,
                                        FaceClass::OnOrientIn | FaceClass::OnOrientOut
                                    ) => {},
                                Some(&c) if c != expected => {
                                    return Err(CsgError::ClassifierConflict {
                                        group: n,
                                        left: c,
                                        right: expected,
                                    });
                                },
                                Some(_) => {},
                            }
                        }
                    }

                    // Anything in the cluster still unassigned sits behind
                    // an ON barrier; classify it directly.
                    for &g in &cluster {
                        if !assigned.contains_key(&g) {
                            let class = self.ray_classify(opposing, mesh, &reps[g]).ok_or(
                                CsgError::ClassifierConflict {
                                    group: g,
                                    left: FaceClass::Unclassified,
                                    right: FaceClass::Unclassified,
                                },
                            )?;
                            assigned.insert(g, class);
                        }
                    }
                }

                let closed = self.src_set(opposing).meshes[m].is_closed();
                for &gi in &side_groups {
                    let class = assigned.get(&gi).copied().unwrap_or(FaceClass::Unclassified);
                    groups[gi].classes.push(GroupClass { mesh, closed, class });
                }
            }
        }
        Ok(())
    }
}
