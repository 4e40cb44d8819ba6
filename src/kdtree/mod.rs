//! An implementation of an immutable, balanced K-D Tree over opaque records.
//!
//! Axis ordering and distances are supplied through [`AxisComparator`] and
//! [`SquaredDistanceMetric`], bundled together in a [`ParamBlock`].

#![warn(missing_docs)]

mod builder;
pub mod constants;
mod distance;
mod index;
mod params;
mod r#trait;
mod traversal;

pub use builder::KDTreeBuilder;
pub use constants::{INTEGRAL, NOT_EQUAL, SINGLE_PREC};
pub use distance::{DistanceFns, SquaredDistanceMetric, SquaredEuclidean};
pub use index::{KDTree, NodeData};
pub use params::{ArrayComparator, AxisComparator, ParamBlock};
pub use r#trait::KDTreeIndex;
pub use traversal::{InOrder, Node};

#[cfg(test)]
mod test;
