//! Grouping of face loops into connected regions bounded by intersection
//! curves.
//!
//! Two loops from the same input connect when they share an edge that is
//! *not* on an intersection curve (an original-edge fragment). Edges on the
//! curves, and original edges shared verbatim by both inputs, separate
//! groups: they are exactly where classification can change.

use std::fmt::Debug;

use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use super::classify::FaceClass;
use super::detail::{CrossInfo, CsgContext, Src, UEdge};
use super::divide::FaceLoop;
use crate::mesh::MeshIdx;

/// Classification of one group against one opposing mesh component.
#[derive(Clone, Copy, Debug)]
pub struct GroupClass {
    /// Component of the opposing input.
    pub mesh: MeshIdx,
    /// Whether that component is a closed manifold.
    pub closed: bool,
    pub class: FaceClass,
}

/// A maximal set of face loops from one input connected across shared
/// non-intersection edges; the unit of classification and collection.
#[derive(Clone, Debug)]
pub struct FaceLoopGroup {
    pub src: Src,
    pub loops: Vec<FaceLoop>,
    /// One entry per component of the opposing input.
    pub classes: Vec<GroupClass>,
}

impl FaceLoopGroup {
    /// Classification against a specific opposing component.
    pub fn classification_against(&self, mesh: MeshIdx) -> FaceClass {
        self.classes
            .iter()
            .find(|c| c.mesh == mesh)
            .map(|c| c.class)
            .unwrap_or(FaceClass::Unclassified)
    }

    /// Combine the per-component classifications: closed components win over
    /// open ones, ON wins over IN/OUT, and contradictory combinations
    /// (IN with OUT, or both ON orientations) yield `None`; such groups
    /// are skipped by the operator collectors.
    pub fn combined_class(&self) -> Option<FaceClass> {
        let bit = |c: FaceClass| -> u8 {
            match c {
                FaceClass::In => 1,
                FaceClass::Out => 2,
                FaceClass::OnOrientIn => 4,
                FaceClass::OnOrientOut => 8,
                FaceClass::Unclassified => 0,
            }
        };
        let mut closed_bits = 0u8;
        let mut open_bits = 0u8;
        for gc in &self.classes {
            if gc.closed {
                closed_bits |= bit(gc.class);
            } else {
                open_bits |= bit(gc.class);
            }
        }
        let bits = if closed_bits != 0 { closed_bits } else { open_bits };
        match bits {
            0 => Some(FaceClass::Out),
            _ if bits & 4 != 0 && bits & 8 != 0 => None, // touching manifolds
            _ if bits & 4 != 0 => Some(FaceClass::OnOrientIn),
            _ if bits & 8 != 0 => Some(FaceClass::OnOrientOut),
            _ if bits & 1 != 0 && bits & 2 != 0 => None, // unresolvable embedding
            _ if bits & 1 != 0 => Some(FaceClass::In),
            _ => Some(FaceClass::Out),
        }
    }
}

impl<S: Clone + Send + Sync + Debug> CsgContext<'_, S> {
    /// Partition the divided loops into groups with union-find, marking
    /// original edges shared by both inputs as group boundaries first.
    pub(crate) fn group_loops(&mut self, loops: Vec<FaceLoop>) -> Vec<FaceLoopGroup> {
        // Edge -> loops incidence, per side.
        let mut by_edge: HashMap<(Src, UEdge), SmallVec<[u32; 2]>> = HashMap::new();
        let mut side_edges: [HashSet<UEdge>; 2] = [HashSet::new(), HashSet::new()];
        for (li, l) in loops.iter().enumerate() {
            let n = l.verts.len();
            for k in 0..n {
                let e = UEdge::new(l.verts[k], l.verts[(k + 1) % n]);
                by_edge.entry((l.src, e)).or_default().push(li as u32);
                side_edges[if l.src == Src::A { 0 } else { 1 }].insert(e);
            }
        }

        // Original edges present in both refinements bound groups but carry
        // no toggle information.
        for e in side_edges[0].intersection(&side_edges[1]) {
            self.cross_edges
                .entry(*e)
                .or_insert_with(CrossInfo::default)
                .shared_boundary = true;
        }

        // Union loops across shared non-intersection edges.
        let mut parent: Vec<u32> = (0..loops.len() as u32).collect();
        fn find(parent: &mut Vec<u32>, x: u32) -> u32 {
            if parent[x as usize] != x {
                let r = find(parent, parent[x as usize]);
                parent[x as usize] = r;
            }
            parent[x as usize]
        }
        for ((_, edge), members) in by_edge.iter() {
            if members.len() < 2 || self.cross_edges.contains_key(edge) {
                continue;
            }
            for w in 1..members.len() {
                let (ra, rb) = (find(&mut parent, members[0]), find(&mut parent, members[w]));
                if ra != rb {
                    parent[ra.max(rb) as usize] = ra.min(rb);
                }
            }
        }

        // Emit groups ordered by their lowest loop index.
        let mut group_of_root: HashMap<u32, usize> = HashMap::new();
        let mut groups: Vec<FaceLoopGroup> = Vec::new();
        for (li, l) in loops.iter().enumerate() {
            let root = find(&mut parent, li as u32);
            let gid = *group_of_root.entry(root).or_insert_with(|| {
                groups.push(FaceLoopGroup { src: l.src, loops: Vec::new(), classes: Vec::new() });
                groups.len() - 1
            });
            groups[gid].loops.push(loops[li].clone());
        }
        groups
    }
}
