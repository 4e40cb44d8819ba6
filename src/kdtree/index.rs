use std::fmt;

use bytemuck::Pod;

use crate::error::{KDTreeError, Result};
use crate::kdtree::builder::build_tree;
use crate::kdtree::distance::SquaredDistanceMetric;
use crate::kdtree::params::{AxisComparator, ParamBlock};

/// A single stored node: one copy of an item plus the positions of its children.
///
/// Children are positions into the tree's node slice. Every node is owned by exactly one parent
/// (or is the root), and children are always stored before their parent.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData<T> {
    pub(crate) item: T,
    pub(crate) left: Option<usize>,
    pub(crate) right: Option<usize>,
}

impl<T> NodeData<T> {
    /// The item held by this node.
    pub fn item(&self) -> &T {
        &self.item
    }

    /// Position of the left child, if any.
    pub fn left(&self) -> Option<usize> {
        self.left
    }

    /// Position of the right child, if any.
    pub fn right(&self) -> Option<usize> {
        self.right
    }
}

/// An owned, immutable, balanced KD-tree.
///
/// Usually this will be created via [`KDTree::try_new`] or
/// [`KDTreeBuilder`][crate::kdtree::KDTreeBuilder]. All nodes live in a single allocation that is
/// released when the tree is dropped.
#[derive(Clone)]
pub struct KDTree<T, C, D> {
    pub(crate) nodes: Vec<NodeData<T>>,
    pub(crate) root: Option<usize>,
    pub(crate) height: usize,
    pub(crate) params: ParamBlock<T, C, D>,
}

impl<T, C, D> KDTree<T, C, D>
where
    T: Pod,
    C: AxisComparator<T>,
    D: SquaredDistanceMetric<T>,
{
    /// Build a balanced tree from `items`.
    ///
    /// `items` is reordered in place while building; its contents are copied into the tree, so
    /// the slice can be reused afterwards.
    pub fn try_new(items: &mut [T], params: ParamBlock<T, C, D>) -> Result<Self> {
        build_tree(items, params)
    }

    /// Build a balanced tree from a flat buffer of `item_size`-byte records.
    ///
    /// The buffer does not need to be aligned for `T`.
    pub fn from_bytes(bytes: &[u8], params: ParamBlock<T, C, D>) -> Result<Self> {
        params.validate()?;

        let item_size = params.item_size();
        if bytes.len() % item_size != 0 {
            return Err(KDTreeError::InvalidArgument(format!(
                "Buffer of {} bytes is not a whole number of {}-byte items.",
                bytes.len(),
                item_size
            )));
        }

        let num_items = bytes.len() / item_size;
        let mut items: Vec<T> = Vec::new();
        items
            .try_reserve_exact(num_items)
            .map_err(|_| KDTreeError::OutOfMemory(num_items))?;
        items.extend(
            bytes
                .chunks_exact(item_size)
                .map(bytemuck::pod_read_unaligned::<T>),
        );

        build_tree(&mut items, params)
    }
}

impl<T, C, D> KDTree<T, C, D> {
    /// Consume the tree, returning the param block it was built with.
    pub fn into_params(self) -> ParamBlock<T, C, D> {
        self.params
    }
}

impl<T, C, D> fmt::Debug for KDTree<T, C, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KDTree")
            .field("num_items", &self.nodes.len())
            .field("height", &self.height)
            .field("params", &self.params)
            .finish()
    }
}
