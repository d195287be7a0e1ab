//! Collectors decide which classified groups survive, and the composer
//! assembles the survivors into the output mesh set.

use std::fmt::Debug;

use hashbrown::HashMap;
use nalgebra::Point3;

use super::classify::FaceClass;
use super::detail::{CsgContext, NodeId, Src};
use super::divide::FaceLoop;
use super::group::FaceLoopGroup;
use super::hooks::{HookCtx, Hooks, PendingFace};
use super::BooleanOp;
use crate::errors::CsgError;
use crate::float_types::Real;
use crate::geom::Plane;
use crate::mesh::build::{build_mesh_set, FaceSpec};
use crate::mesh::{FaceIdx, MeshOptions, MeshSet, VertIdx};

/// Receives every classified group once, then assembles the result.
pub trait Collector<S: Clone + Send + Sync + Debug> {
    /// Decide what to do with one group.
    fn collect(&mut self, group: FaceLoopGroup, ctx: &CsgContext<S>, hooks: &mut Hooks<S>);

    /// Assemble the retained regions into a fresh mesh set.
    fn done(
        &mut self,
        ctx: &CsgContext<S>,
        hooks: &mut Hooks<S>,
    ) -> Result<MeshSet<S>, CsgError>;
}

/// Keep/flip decision for one side under one operator; `None` drops the
/// group, `Some(flip)` keeps it.
pub fn keep_rule(op: BooleanOp, src: Src, class: FaceClass) -> Option<bool> {
    use BooleanOp::*;
    use FaceClass::*;
    match (op, src, class) {
        (Union, Src::A, Out) | (Union, Src::A, OnOrientIn) => Some(false),
        (Union, Src::B, Out) => Some(false),

        (Intersection, Src::A, In) | (Intersection, Src::A, OnOrientIn) => Some(false),
        (Intersection, Src::B, In) => Some(false),

        (AMinusB, Src::A, Out) | (AMinusB, Src::A, OnOrientOut) => Some(false),
        (AMinusB, Src::B, In) => Some(true),

        (BMinusA, Src::A, In) => Some(true),
        (BMinusA, Src::B, Out) | (BMinusA, Src::B, OnOrientOut) => Some(false),

        (SymmetricDifference, Src::A, Out) | (SymmetricDifference, Src::B, Out) => Some(false),
        (SymmetricDifference, Src::A, In) | (SymmetricDifference, Src::B, In) => Some(true),

        _ => None,
    }
}

/// The built-in collector implementing the Boolean operator table.
pub struct OpCollector {
    op: BooleanOp,
    kept: Vec<(FaceLoop, bool)>,
}

impl OpCollector {
    pub fn new(op: BooleanOp) -> Self {
        OpCollector { op, kept: Vec::new() }
    }
}

impl<S: Clone + Send + Sync + Debug> Collector<S> for OpCollector {
    fn collect(&mut self, group: FaceLoopGroup, _ctx: &CsgContext<S>, hooks: &mut Hooks<S>) {
        let Some(class) = group.combined_class() else {
            hooks.diagnostic(format!(
                "dropped a group of {} loops with contradictory classification",
                group.loops.len()
            ));
            return;
        };
        if let Some(flip) = keep_rule(self.op, group.src, class) {
            for l in group.loops {
                self.kept.push((l, flip));
            }
        }
    }

    fn done(
        &mut self,
        ctx: &CsgContext<S>,
        hooks: &mut Hooks<S>,
    ) -> Result<MeshSet<S>, CsgError> {
        assemble(std::mem::take(&mut self.kept), ctx, hooks)
    }
}

/// Instantiate retained loops as faces of a fresh mesh set: fire the output
/// hooks, move the needed pool vertices across, and run the topology
/// builder so the result is twinned and oriented.
pub fn assemble<S: Clone + Send + Sync + Debug>(
    kept: Vec<(FaceLoop, bool)>,
    ctx: &CsgContext<S>,
    hooks: &mut Hooks<S>,
) -> Result<MeshSet<S>, CsgError> {
    let hctx = HookCtx {
        pool: ctx.pool(),
        src_a: ctx.a,
        src_b: ctx.b,
        out_set: ctx.out_uid,
    };

    let mut remap: HashMap<NodeId, VertIdx> = HashMap::new();
    let mut points: Vec<Point3<Real>> = Vec::new();
    let mut specs: Vec<FaceSpec<S>> = Vec::new();

    for (l, flip) in kept {
        let mut verts = l.verts.clone();
        if flip {
            verts.reverse();
        }
        let src_set = ctx.src_set(l.src);
        let orig = src_set.face_key(l.orig_face);
        let metadata = src_set.faces[l.orig_face.index()].metadata.clone();

        let pending = PendingFace { verts, orig, flipped: flip };
        for emitted in hooks.run_process_output_face(&pending, &hctx) {
            let mut loop_nodes = emitted;
            loop_nodes.dedup();
            while loop_nodes.len() > 1 && loop_nodes.first() == loop_nodes.last() {
                loop_nodes.pop();
            }
            if loop_nodes.len() < 3 {
                hooks.diagnostic("dropped a degenerate output region".to_string());
                continue;
            }
            let pts: Vec<Point3<Real>> =
                loop_nodes.iter().map(|&n| ctx.point(n)).collect();
            if Plane::from_loop(&pts).is_none() {
                hooks.diagnostic("dropped a zero-area output region".to_string());
                continue;
            }

            let out_face = FaceIdx(specs.len() as u32);
            let pf = PendingFace { verts: loop_nodes.clone(), orig, flipped: flip };
            hooks.run_result_face(&pf, out_face, &hctx);

            let verts_idx: Vec<VertIdx> = loop_nodes
                .iter()
                .map(|&n| {
                    *remap.entry(n).or_insert_with(|| {
                        points.push(ctx.point(n));
                        VertIdx(points.len() as u32 - 1)
                    })
                })
                .collect();
            specs.push(FaceSpec { verts: verts_idx, metadata: metadata.clone() });
        }
    }

    build_mesh_set(
        points,
        specs,
        &MeshOptions::default(),
        Some(ctx.out_uid),
        ctx.a.metadata.clone(),
    )
    .map_err(CsgError::from)
}
