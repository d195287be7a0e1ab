//! Lazily evaluated operation trees over mesh sets.
//!
//! Interior nodes clone their input only when the child handed back a
//! borrowed (non-temporary) set; the `Cow` return models the original
//! temporary-result flag without a separate boolean.

use std::borrow::Cow;
use std::fmt::Debug;

use nalgebra::Matrix4;

use super::{BooleanOp, ClassifyType, Csg};
use crate::errors::CsgError;
use crate::float_types::Real;
use crate::mesh::{MeshIdx, MeshSet};

/// A CSG expression: primitives combined by transforms, inversions,
/// selections and Boolean operations.
pub enum Tree<S: Clone + Send + Sync + Debug = ()> {
    /// A leaf mesh set, borrowed by evaluation until an ancestor needs to
    /// mutate it.
    Primitive(MeshSet<S>),
    /// Affine transform of the child.
    Transform(Matrix4<Real>, Box<Tree<S>>),
    /// Invert the listed components of the child, or all of them when the
    /// selection is `None`.
    Invert(Option<Vec<MeshIdx>>, Box<Tree<S>>),
    /// Keep only the listed components of the child, then compact storage.
    Select(Vec<MeshIdx>, Box<Tree<S>>),
    /// Boolean combination of two subtrees.
    Op {
        left: Box<Tree<S>>,
        right: Box<Tree<S>>,
        op: BooleanOp,
        rescale: bool,
        classify: ClassifyType,
    },
}

impl<S: Clone + Send + Sync + Debug> Tree<S> {
    /// Convenience constructor for [`Tree::Op`] with default evaluation
    /// settings.
    pub fn op(left: Tree<S>, right: Tree<S>, op: BooleanOp) -> Tree<S> {
        Tree::Op {
            left: Box::new(left),
            right: Box::new(right),
            op,
            rescale: false,
            classify: ClassifyType::Normal,
        }
    }

    /// Evaluate the tree bottom-up, returning an owned result.
    pub fn eval(&self, csg: &mut Csg<S>) -> Result<MeshSet<S>, CsgError> {
        Ok(self.eval_lazy(csg)?.into_owned())
    }

    /// Postorder evaluation. `Cow::Borrowed` marks a non-temporary result
    /// (a primitive handed through untouched); everything else is owned.
    fn eval_lazy(&self, csg: &mut Csg<S>) -> Result<Cow<'_, MeshSet<S>>, CsgError> {
        match self {
            Tree::Primitive(mesh) => Ok(Cow::Borrowed(mesh)),
            Tree::Transform(m, child) => {
                let mut result = child.eval_lazy(csg)?.into_owned();
                result.transform(m);
                Ok(Cow::Owned(result))
            },
            Tree::Invert(selection, child) => {
                let mut result = child.eval_lazy(csg)?.into_owned();
                match selection {
                    None => result.invert(),
                    Some(meshes) => result.invert_meshes(meshes),
                }
                Ok(Cow::Owned(result))
            },
            Tree::Select(selection, child) => {
                let mut result = child.eval_lazy(csg)?.into_owned();
                result.retain_meshes(|m| selection.contains(&MeshIdx(m as u32)));
                result.collect_vertices();
                Ok(Cow::Owned(result))
            },
            Tree::Op { left, right, op, rescale, classify } => {
                let l = left.eval_lazy(csg)?;
                let r = right.eval_lazy(csg)?;
                let saved = csg.rescale;
                csg.rescale = *rescale;
                let result = csg.compute(&l, &r, *op, *classify);
                csg.rescale = saved;
                Ok(Cow::Owned(result?))
            },
        }
    }
}
