//! Spatial acceleration structures for the broad phase.

pub mod rtree;

pub use rtree::RTree;
