use std::fmt::Debug;
use thiserror::Error;

/// Enum with all errors in this crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KDTreeError {
    /// Malformed configuration: zero dimensionality, zero or mismatched item size, or unrecognized
    /// flag bits.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Node storage for the given number of items could not be allocated.
    #[error("Out of memory: could not allocate {0} nodes")]
    OutOfMemory(usize),
}

/// Error returned from [`KDTreeIndex::walk`][crate::kdtree::KDTreeIndex::walk].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalkError<E: Debug> {
    /// The walk was rejected before visiting any node.
    #[error(transparent)]
    Tree(#[from] KDTreeError),

    /// A callback halted the walk. The error is passed through untouched.
    #[error("Walk halted by callback: {0:?}")]
    Callback(E),
}

pub type Result<T> = std::result::Result<T, KDTreeError>;
