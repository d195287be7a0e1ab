use crate::csg::classify::FaceClass;
use crate::mesh::FaceKey;

/// Problems detected while building a mesh from caller-supplied data.
#[derive(Clone, Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    /// A face references a vertex index outside the vertex array
    #[error("face index {} is out of range (vertices.len = {})", .index, .len)]
    IndexOutOfRange { index: usize, len: usize },
    /// A face has fewer than three distinct vertices, or its vertices are collinear
    #[error("face {} is degenerate", .0)]
    DegenerateFace(usize),
    /// A coordinate is NaN or infinite
    #[error("vertex {} has a non-finite coordinate", .0)]
    NonFiniteCoordinate(usize),
    /// The face stream ended in the middle of a face record
    #[error("face stream truncated at offset {}", .0)]
    TruncatedFaceStream(usize),
}

/// All the ways a CSG evaluation can fail. Errors are surfaced from
/// [`Csg::compute`](crate::csg::Csg::compute); the engine never produces
/// partial output.
#[derive(Clone, Debug, thiserror::Error, PartialEq)]
pub enum CsgError {
    /// Two coplanar faces overlap in their interiors in a way the on-face
    /// rules cannot resolve (partial overlap with crossing boundaries).
    #[error("coplanar faces {face_a:?} and {face_b:?} overlap without a resolvable shared boundary")]
    UnresolvableCoincidence { face_a: FaceKey, face_b: FaceKey },

    /// The ray-cast and edge-propagation classifiers disagree, or propagation
    /// derived contradictory labels for the same face-loop group.
    #[error("classifiers disagree on group {group}: {left:?} vs {right:?}")]
    ClassifierConflict {
        group: usize,
        left: FaceClass,
        right: FaceClass,
    },

    /// The requested operation needs a closed oriented manifold and the
    /// input does not satisfy that.
    #[error("operation requires a closed oriented manifold: {}", .0)]
    MalformedInput(String),

    /// Invalid caller-supplied mesh data.
    #[error(transparent)]
    InvalidMesh(#[from] ValidationError),

    /// A predicate's exact tier reported exhaustion: an expansion hit the
    /// length ceiling, or coordinate products overflowed the double range.
    /// Surfaced when the intersection finder sees a non-finite predicate
    /// result; it does not occur for inputs with finite coordinates of
    /// ordinary magnitude.
    #[error("exact arithmetic expansion exceeded the supported length")]
    NumericOverflow,
}
