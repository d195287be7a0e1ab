//! The CSG evaluator.
//!
//! [`Csg::compute`] is a pure function from two input mesh sets to one
//! output mesh set: it intersects the two surfaces into a shared
//! refinement, classifies every resulting face region against the opposing
//! solid, applies the operator's selection table and assembles the result.
//! No engine state survives a call except the tunables on [`Csg`] itself
//! (rescale flag, tolerance override, hook registry).

use std::fmt::Debug;

use crate::errors::CsgError;
use crate::float_types::{tolerance, Real};
use crate::mesh::{next_uid, MeshSet};

pub mod classify;
pub mod collect;
pub mod detail;
pub mod divide;
pub mod group;
pub mod hooks;
pub mod interpolate;
pub mod intersect;
pub mod rescale;
pub mod tree;

pub use classify::FaceClass;
pub use collect::{assemble, keep_rule, Collector, OpCollector};
pub use detail::{CsgContext, NodeId, Src};
pub use divide::FaceLoop;
pub use group::{FaceLoopGroup, GroupClass};
pub use hooks::{FaceHook, HookCtx, HookPoint, Hooks, PendingFace, TriangulateOutput};
pub use interpolate::{Blend, FaceAttr, FaceEdgeAttr, FaceVertexAttr};
pub use tree::Tree;

/// The Boolean operators.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BooleanOp {
    Union,
    Intersection,
    AMinusB,
    BMinusA,
    SymmetricDifference,
}

/// How face-loop groups are classified against the opposing solid.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ClassifyType {
    /// Ray casting with signed crossing counts.
    #[default]
    Normal,
    /// Propagation across intersection curves from known seeds.
    Edge,
}

/// The CSG engine. Holds only tunables; inputs are borrowed read-only for
/// the duration of a call (cloned internally when rescaling is on), and the
/// output is freshly owned.
pub struct Csg<S: Clone + Send + Sync + Debug = ()> {
    /// Hook registry fired by the composer.
    pub hooks: hooks::Hooks<S>,
    /// Evaluate in the canonical `[-1, 1]^3` box.
    pub rescale: bool,
    /// Override of the crate-wide geometric tolerance.
    pub tolerance: Option<Real>,
}

impl<S: Clone + Send + Sync + Debug> Csg<S> {
    pub fn new() -> Self {
        Csg { hooks: hooks::Hooks::new(), rescale: false, tolerance: None }
    }

    /// Evaluate `op` over `a` and `b` with the built-in operator collector.
    pub fn compute(
        &mut self,
        a: &MeshSet<S>,
        b: &MeshSet<S>,
        op: BooleanOp,
        classify: ClassifyType,
    ) -> Result<MeshSet<S>, CsgError> {
        // The operator tables assume solids: everything but union needs
        // closed oriented manifolds on both sides.
        if op != BooleanOp::Union {
            for (name, set) in [("A", a), ("B", b)] {
                if !set.meshes.is_empty() && !set.is_closed_manifold() {
                    return Err(CsgError::MalformedInput(format!(
                        "operand {name} is not a closed oriented manifold"
                    )));
                }
            }
        }
        let mut collector = OpCollector::new(op);
        self.compute_with(a, b, &mut collector, classify)
    }

    /// Evaluate with a caller-supplied collector (arbitrary selection).
    pub fn compute_with(
        &mut self,
        a: &MeshSet<S>,
        b: &MeshSet<S>,
        collector: &mut dyn Collector<S>,
        classify: ClassifyType,
    ) -> Result<MeshSet<S>, CsgError> {
        if self.rescale {
            let bounds = rescale::joint_bounds(&a.bounding_box(), &b.bounding_box());
            let (fwd, rev) = rescale::unit_box_transforms(&bounds);
            let a_scaled = a.transformed(&fwd);
            let b_scaled = b.transformed(&fwd);
            let mut result = self.compute_core(&a_scaled, &b_scaled, collector, classify)?;
            result.transform(&rev);
            Ok(result)
        } else {
            self.compute_core(a, b, collector, classify)
        }
    }

    fn compute_core(
        &mut self,
        a: &MeshSet<S>,
        b: &MeshSet<S>,
        collector: &mut dyn Collector<S>,
        classify: ClassifyType,
    ) -> Result<MeshSet<S>, CsgError> {
        let eps = self.tolerance.unwrap_or_else(tolerance);
        let out_uid = next_uid();

        let mut ctx = CsgContext::new(a, b, eps, out_uid);
        ctx.find_intersections()?;
        let loops = ctx.divide_faces();
        let mut groups = ctx.group_loops(loops);
        ctx.classify_groups(&mut groups, classify)?;

        for group in groups {
            collector.collect(group, &ctx, &mut self.hooks);
        }
        collector.done(&ctx, &mut self.hooks)
    }
}

impl<S: Clone + Send + Sync + Debug> Default for Csg<S> {
    fn default() -> Self {
        Self::new()
    }
}
