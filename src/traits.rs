//! Convenience traits layering the Boolean operators and common affine
//! transforms over [`MeshSet`].

use std::fmt::Debug;

use nalgebra::{Matrix4, Rotation3, Translation3, Vector3};

use crate::csg::{BooleanOp, ClassifyType, Csg};
use crate::errors::CsgError;
use crate::float_types::parry3d::bounding_volume::Aabb;
use crate::float_types::Real;
use crate::mesh::MeshSet;

/// Boolean operations.
pub trait BooleanOps<Other = Self> {
    type Output;

    fn union(&self, other: &Other) -> Result<Self::Output, CsgError>;
    fn difference(&self, other: &Other) -> Result<Self::Output, CsgError>;
    fn intersection(&self, other: &Other) -> Result<Self::Output, CsgError>;
    fn xor(&self, other: &Other) -> Result<Self::Output, CsgError>;
}

impl<S: Clone + Send + Sync + Debug> BooleanOps for MeshSet<S> {
    type Output = MeshSet<S>;

    fn union(&self, other: &MeshSet<S>) -> Result<MeshSet<S>, CsgError> {
        Csg::new().compute(self, other, BooleanOp::Union, ClassifyType::Normal)
    }

    fn difference(&self, other: &MeshSet<S>) -> Result<MeshSet<S>, CsgError> {
        Csg::new().compute(self, other, BooleanOp::AMinusB, ClassifyType::Normal)
    }

    fn intersection(&self, other: &MeshSet<S>) -> Result<MeshSet<S>, CsgError> {
        Csg::new().compute(self, other, BooleanOp::Intersection, ClassifyType::Normal)
    }

    fn xor(&self, other: &MeshSet<S>) -> Result<MeshSet<S>, CsgError> {
        Csg::new().compute(self, other, BooleanOp::SymmetricDifference, ClassifyType::Normal)
    }
}

/// Affine transformations.
pub trait TransformOps: Sized + Clone {
    fn transformed(&self, matrix: &Matrix4<Real>) -> Self;
    fn bounding_box(&self) -> Aabb;

    /// Returns a copy translated by `vector`.
    fn translate_vector(&self, vector: Vector3<Real>) -> Self {
        self.transformed(&Translation3::from(vector).to_homogeneous())
    }

    /// Returns a copy translated by x, y, and z.
    fn translate(&self, x: Real, y: Real, z: Real) -> Self {
        self.translate_vector(Vector3::new(x, y, z))
    }

    /// Returns a copy translated so that its bounding-box center is at the
    /// origin.
    fn center(&self) -> Self {
        let aabb = self.bounding_box();
        let c = aabb.center();
        self.translate(-c.x, -c.y, -c.z)
    }

    /// Rotates by the given degrees about x, then y, then z.
    fn rotate(&self, x_deg: Real, y_deg: Real, z_deg: Real) -> Self {
        let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), x_deg.to_radians());
        let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), y_deg.to_radians());
        let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), z_deg.to_radians());
        self.transformed(&(rz * ry * rx).to_homogeneous())
    }

    /// Scales by the given factors per axis.
    fn scale(&self, sx: Real, sy: Real, sz: Real) -> Self {
        self.transformed(&Matrix4::new_nonuniform_scaling(&Vector3::new(sx, sy, sz)))
    }
}

impl<S: Clone + Send + Sync + Debug> TransformOps for MeshSet<S> {
    fn transformed(&self, matrix: &Matrix4<Real>) -> Self {
        MeshSet::transformed(self, matrix)
    }

    fn bounding_box(&self) -> Aabb {
        MeshSet::bounding_box(self)
    }
}
