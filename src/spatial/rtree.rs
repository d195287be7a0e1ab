//! A static AABB R-tree bulk-loaded with Sort-Tile-Recursive packing.
//!
//! Built once over the faces of a mesh and queried for box overlap during
//! the broad phase. Leaf and interior fan-out is 4.

use smallvec::SmallVec;

use crate::float_types::parry3d::bounding_volume::{Aabb, BoundingVolume};
use crate::float_types::Real;

const FANOUT: usize = 4;

#[derive(Clone, Debug)]
enum NodeKind {
    /// Item payloads.
    Leaf(SmallVec<[u32; FANOUT]>),
    /// Child node indices.
    Inner(SmallVec<[u32; FANOUT]>),
}

#[derive(Clone, Debug)]
struct Node {
    aabb: Aabb,
    kind: NodeKind,
}

/// Static R-tree over `(Aabb, payload)` pairs.
#[derive(Clone, Debug)]
pub struct RTree {
    nodes: Vec<Node>,
    root: Option<u32>,
}

impl RTree {
    /// Bulk-load with STR packing: items are sorted into x-slabs, each slab
    /// into y-runs, each run sorted by z and chunked into leaves; the
    /// resulting nodes are packed recursively the same way.
    pub fn build(items: &[(Aabb, u32)]) -> Self {
        let mut tree = RTree { nodes: Vec::new(), root: None };
        if items.is_empty() {
            return tree;
        }

        // Pack the leaf level.
        let order = str_order(items.iter().map(|(bb, _)| center(bb)).collect());
        let mut level: Vec<u32> = Vec::with_capacity(items.len().div_ceil(FANOUT));
        for chunk in order.chunks(FANOUT) {
            let mut payloads = SmallVec::new();
            let mut bb = items[chunk[0]].0;
            for &i in chunk {
                bb.merge(&items[i].0);
                payloads.push(items[i].1);
            }
            level.push(tree.push_node(Node { aabb: bb, kind: NodeKind::Leaf(payloads) }));
        }

        // Pack upper levels until a single root remains.
        while level.len() > 1 {
            let order = str_order(level.iter().map(|&n| center(&tree.nodes[n as usize].aabb)).collect());
            let mut next: Vec<u32> = Vec::with_capacity(level.len().div_ceil(FANOUT));
            for chunk in order.chunks(FANOUT) {
                let mut children = SmallVec::new();
                let mut bb = tree.nodes[level[chunk[0]] as usize].aabb;
                for &i in chunk {
                    let child = level[i];
                    bb.merge(&tree.nodes[child as usize].aabb);
                    children.push(child);
                }
                next.push(tree.push_node(Node { aabb: bb, kind: NodeKind::Inner(children) }));
            }
            level = next;
        }
        tree.root = Some(level[0]);
        tree
    }

    fn push_node(&mut self, node: Node) -> u32 {
        let id = self.nodes.len() as u32;
        self.nodes.push(node);
        id
    }

    /// Collect payloads whose AABB overlaps `query`, in ascending payload
    /// order (so downstream iteration is deterministic).
    pub fn query(&self, query: &Aabb) -> Vec<u32> {
        let mut out = Vec::new();
        self.query_into(query, &mut out);
        out
    }

    /// Like [`RTree::query`], reusing the output buffer.
    pub fn query_into(&self, query: &Aabb, out: &mut Vec<u32>) {
        out.clear();
        let Some(root) = self.root else { return };
        let mut stack: SmallVec<[u32; 32]> = SmallVec::new();
        stack.push(root);
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id as usize];
            if !node.aabb.intersects(query) {
                continue;
            }
            match &node.kind {
                NodeKind::Leaf(items) => out.extend(items.iter().copied()),
                NodeKind::Inner(children) => stack.extend(children.iter().copied()),
            }
        }
        out.sort_unstable();
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }
}

fn center(bb: &Aabb) -> [Real; 3] {
    let c = bb.center();
    [c.x, c.y, c.z]
}

/// STR ordering: returns item indices arranged so that consecutive chunks of
/// `FANOUT` form spatially coherent tiles.
fn str_order(centers: Vec<[Real; 3]>) -> Vec<usize> {
    let n = centers.len();
    let mut idx: Vec<usize> = (0..n).collect();
    let leaves = n.div_ceil(FANOUT);
    // Number of vertical slabs along x, then runs along y inside each slab.
    let slabs = (leaves as f64).cbrt().ceil() as usize;
    let slab_len = n.div_ceil(slabs.max(1));

    sort_axis(&mut idx, &centers, 0);
    let mut slab_start = 0;
    while slab_start < n {
        let slab_end = (slab_start + slab_len).min(n);
        sort_axis(&mut idx[slab_start..slab_end], &centers, 1);

        let runs = ((slab_end - slab_start).div_ceil(FANOUT) as f64).sqrt().ceil() as usize;
        let run_len = (slab_end - slab_start).div_ceil(runs.max(1));
        let mut run_start = slab_start;
        while run_start < slab_end {
            let run_end = (run_start + run_len).min(slab_end);
            sort_axis(&mut idx[run_start..run_end], &centers, 2);
            run_start = run_end;
        }
        slab_start = slab_end;
    }
    idx
}

fn sort_axis(idx: &mut [usize], centers: &[[Real; 3]], axis: usize) {
    // Ties broken by index so builds are reproducible.
    idx.sort_unstable_by(|&a, &b| {
        centers[a][axis]
            .partial_cmp(&centers[b][axis])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(&b))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    fn unit_box_at(x: Real, y: Real, z: Real) -> Aabb {
        Aabb::new(Point3::new(x, y, z), Point3::new(x + 1.0, y + 1.0, z + 1.0))
    }

    #[test]
    fn finds_all_overlaps() {
        // A 5x5x5 grid of unit boxes.
        let mut items = Vec::new();
        let mut id = 0u32;
        for i in 0..5 {
            for j in 0..5 {
                for k in 0..5 {
                    items.push((unit_box_at(i as Real * 2.0, j as Real * 2.0, k as Real * 2.0), id));
                    id += 1;
                }
            }
        }
        let tree = RTree::build(&items);

        // Query covering exactly one box.
        let hits = tree.query(&unit_box_at(4.0, 4.0, 4.0));
        assert_eq!(hits.len(), 1);

        // Query covering everything.
        let hits = tree.query(&Aabb::new(Point3::new(-1.0, -1.0, -1.0), Point3::new(99.0, 99.0, 99.0)));
        assert_eq!(hits.len(), items.len());

        // Brute-force comparison on a partial query.
        let q = Aabb::new(Point3::new(0.5, 0.5, 0.5), Point3::new(4.5, 4.5, 4.5));
        let mut expected: Vec<u32> = items
            .iter()
            .filter(|(bb, _)| bb.intersects(&q))
            .map(|&(_, id)| id)
            .collect();
        expected.sort_unstable();
        assert_eq!(tree.query(&q), expected);
    }

    #[test]
    fn empty_tree() {
        let tree = RTree::build(&[]);
        assert!(tree.is_empty());
        assert!(tree.query(&unit_box_at(0.0, 0.0, 0.0)).is_empty());
    }
}
