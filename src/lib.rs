#![forbid(unsafe_code)]

//! Constructive solid geometry over polygon meshes.
//!
//! `meshcsg` computes Boolean combinations (union, intersection, difference,
//! symmetric difference) of polyhedral surfaces. Rather than clipping against
//! a spatial partition, it intersects the two surfaces directly: the faces of
//! each input are refined along the intersection curves, every resulting face
//! region is classified against the opposing solid with robust geometric
//! predicates, and the regions required by the requested operator are stitched
//! into a fresh, consistently oriented mesh.
//!
//! The main entry points are [`csg::Csg::compute`] for a single Boolean and
//! [`csg::Tree`] for lazily evaluated operation trees. Meshes are built with
//! [`mesh::MeshSet::from_face_stream`] and friends.

pub mod errors;
pub mod exact;
pub mod float_types;
pub mod geom;
pub mod mesh;
pub mod predicates;
pub mod shapes;
pub mod spatial;
pub mod traits;
pub mod util;

pub mod csg;

pub use csg::{BooleanOp, ClassifyType, Csg, Tree};
pub use errors::{CsgError, ValidationError};
pub use mesh::{MeshOptions, MeshSet};
