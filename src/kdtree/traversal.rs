//! Utilities to traverse the KDTree structure.

use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;

use bytemuck::Pod;
use tinyvec::TinyVec;

use crate::kdtree::index::NodeData;
use crate::kdtree::KDTreeIndex;

/// A node in the KDTree.
pub struct Node<'a, T: Pod, I: KDTreeIndex<T>> {
    /// The tree that this node is a reference onto
    tree: &'a I,

    /// Position of this node in the tree's node storage
    index: usize,

    /// Distance from the root, which is at depth 0
    depth: usize,

    phantom: PhantomData<T>,
}

impl<'a, T: Pod, I: KDTreeIndex<T>> Node<'a, T, I> {
    pub(crate) fn from_root(tree: &'a I) -> Option<Self> {
        tree.root_index().map(|index| Self::new(tree, index, 0))
    }

    fn new(tree: &'a I, index: usize, depth: usize) -> Self {
        Self {
            tree,
            index,
            depth,
            phantom: PhantomData,
        }
    }

    #[inline]
    fn data(&self) -> &'a NodeData<T> {
        &self.tree.nodes()[self.index]
    }

    /// The item stored in this node.
    pub fn item(&self) -> &'a T {
        &self.data().item
    }

    /// Distance from the root.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The axis this node splits its children over.
    pub fn axis(&self) -> usize {
        self.tree.params().axis(self.depth)
    }

    /// The child holding items that compare less than or equal to this one along
    /// [`axis`][Self::axis].
    pub fn left_child(&self) -> Option<Node<'a, T, I>> {
        self.data()
            .left
            .map(|index| Node::new(self.tree, index, self.depth + 1))
    }

    /// The child holding items that compare greater than or equal to this one along
    /// [`axis`][Self::axis].
    pub fn right_child(&self) -> Option<Node<'a, T, I>> {
        self.data()
            .right
            .map(|index| Node::new(self.tree, index, self.depth + 1))
    }

    /// Returns `true` if this is a leaf node without children.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        let data = self.data();
        data.left.is_none() && data.right.is_none()
    }

    /// Returns `true` if this is an intermediate node with children.
    #[inline]
    pub fn is_parent(&self) -> bool {
        !self.is_leaf()
    }

    /// An in-order iterator over the subtree rooted at this node.
    ///
    /// Depths are reported relative to the tree's root, not to this node.
    pub fn iter(&self) -> InOrder<'a, T> {
        InOrder::starting_at(self.tree.nodes(), Some(self.index), self.depth)
    }
}

impl<T: Pod, I: KDTreeIndex<T>> Clone for Node<'_, T, I> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Pod, I: KDTreeIndex<T>> Copy for Node<'_, T, I> {}

impl<T: Pod + fmt::Debug, I: KDTreeIndex<T>> fmt::Debug for Node<'_, T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("item", self.item())
            .field("depth", &self.depth)
            .field("is_leaf", &self.is_leaf())
            .finish()
    }
}

/// In-order iterator over `(depth, item)` pairs of a KDTree.
///
/// Created by [`KDTreeIndex::iter`] or [`Node::iter`].
#[derive(Debug, Clone)]
pub struct InOrder<'a, T> {
    nodes: &'a [NodeData<T>],

    /// Ancestors whose left subtree is being visited. Use TinyVec to avoid heap allocations for
    /// any realistically balanced tree.
    stack: TinyVec<[(usize, usize); 32]>,

    /// Next subtree to descend into, with its depth
    pending: Option<(usize, usize)>,
}

impl<'a, T> InOrder<'a, T> {
    pub(crate) fn new(nodes: &'a [NodeData<T>], root: Option<usize>) -> Self {
        Self::starting_at(nodes, root, 0)
    }

    pub(crate) fn starting_at(
        nodes: &'a [NodeData<T>],
        start: Option<usize>,
        depth: usize,
    ) -> Self {
        Self {
            nodes,
            stack: TinyVec::new(),
            pending: start.map(|index| (index, depth)),
        }
    }
}

impl<'a, T> Iterator for InOrder<'a, T> {
    type Item = (usize, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        // walk down to the leftmost unvisited node
        while let Some((index, depth)) = self.pending.take() {
            self.stack.push((index, depth));
            self.pending = self.nodes[index].left.map(|left| (left, depth + 1));
        }

        let (index, depth) = self.stack.pop()?;
        let node = &self.nodes[index];
        self.pending = node.right.map(|right| (right, depth + 1));
        Some((depth, &node.item))
    }
}

impl<T> FusedIterator for InOrder<'_, T> {}
