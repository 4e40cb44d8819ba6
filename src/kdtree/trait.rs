use std::cmp::Ordering;
use std::fmt::Debug;

use bytemuck::Pod;
use log::trace;

use crate::error::{KDTreeError, Result, WalkError};
use crate::kdtree::constants::{NOT_EQUAL, VALID_SEARCH_FLAGS};
use crate::kdtree::distance::SquaredDistanceMetric;
use crate::kdtree::index::{KDTree, NodeData};
use crate::kdtree::params::{AxisComparator, ParamBlock};
use crate::kdtree::traversal::{InOrder, Node};

/// A trait for searching and accessing data out of a KDTree.
pub trait KDTreeIndex<T: Pod>: Sized {
    /// The axis comparator this tree was built with
    type Comparator: AxisComparator<T>;

    /// The distance metric this tree was built with
    type Metric: SquaredDistanceMetric<T>;

    /// The parameters used to create this tree
    fn params(&self) -> &ParamBlock<T, Self::Comparator, Self::Metric>;

    /// The underlying node storage of this tree. Children are stored before their parents.
    fn nodes(&self) -> &[NodeData<T>];

    /// Position of the root within [`KDTreeIndex::nodes`], or `None` for an empty tree.
    fn root_index(&self) -> Option<usize>;

    /// The number of levels of this tree. Zero when empty.
    fn height(&self) -> usize;

    /// The number of items in this KDTree
    fn num_items(&self) -> usize {
        self.nodes().len()
    }

    /// Returns `true` if this tree holds no items.
    fn is_empty(&self) -> bool {
        self.root_index().is_none()
    }

    /// Find the item nearest to `key`.
    ///
    /// An item equal to `key` is a valid result at distance zero. Returns `None` if the tree is
    /// empty.
    ///
    /// ```
    /// use kd_index::kdtree::{KDTree, KDTreeIndex, ParamBlock};
    ///
    /// let mut items = [[1, 2], [3, 4], [5, 5]];
    /// let tree = KDTree::try_new(&mut items, ParamBlock::<[i32; 2], _, _>::euclidean()).unwrap();
    ///
    /// assert_eq!(tree.nearest(&[3, 3]), Some(&[3, 4]));
    /// assert_eq!(tree.nearest(&[1, 2]), Some(&[1, 2]));
    /// ```
    fn nearest(&self, key: &T) -> Option<&T> {
        nearest_item(self, key, false)
    }

    /// Find the item nearest to `key`, with search flags.
    ///
    /// With [`NOT_EQUAL`] set, an item equal to `key` along every axis is never returned, so a
    /// tree holding only items equal to `key` yields `None`.
    ///
    /// Returns an error for any flag bit other than [`NOT_EQUAL`].
    fn nearest_ex(&self, key: &T, flags: u32) -> Result<Option<&T>> {
        if flags & !VALID_SEARCH_FLAGS != 0 {
            return Err(KDTreeError::InvalidArgument(format!(
                "Unrecognized search flags {:#x}.",
                flags & !VALID_SEARCH_FLAGS
            )));
        }

        Ok(nearest_item(self, key, flags & NOT_EQUAL != 0))
    }

    /// Find the item nearest to `key` that is not equal to it.
    ///
    /// ```
    /// use kd_index::kdtree::{KDTree, KDTreeIndex, ParamBlock};
    ///
    /// let mut items = [[1, 2], [3, 4], [5, 5]];
    /// let tree = KDTree::try_new(&mut items, ParamBlock::<[i32; 2], _, _>::euclidean()).unwrap();
    ///
    /// assert_eq!(tree.nearest_excluding(&[1, 2]), Some(&[3, 4]));
    /// assert_eq!(tree.nearest_excluding(&[3, 4]), Some(&[5, 5]));
    /// ```
    fn nearest_excluding(&self, key: &T) -> Option<&T> {
        nearest_item(self, key, true)
    }

    /// Walk the tree in order, invoking `callback` with each item and its depth (the root is at
    /// depth 0).
    ///
    /// The first error returned by `callback` halts the walk and is returned as
    /// [`WalkError::Callback`]. Walking an empty tree, or passing any non-zero `flags`, is
    /// rejected with [`WalkError::Tree`].
    fn walk<E, F>(&self, mut callback: F, flags: u32) -> std::result::Result<(), WalkError<E>>
    where
        E: Debug,
        F: FnMut(usize, &T) -> std::result::Result<(), E>,
    {
        if self.is_empty() {
            let err = KDTreeError::InvalidArgument("Cannot walk an empty tree.".to_string());
            return Err(err.into());
        }

        if flags != 0 {
            return Err(KDTreeError::InvalidArgument(format!(
                "Unrecognized walk flags {:#x}.",
                flags
            ))
            .into());
        }

        for (depth, item) in self.iter() {
            callback(depth, item).map_err(WalkError::Callback)?;
        }
        Ok(())
    }

    /// An in-order iterator over `(depth, item)` pairs.
    fn iter(&self) -> InOrder<'_, T> {
        InOrder::new(self.nodes(), self.root_index())
    }

    /// Access the root node of the KDTree for manual traversal.
    fn root(&self) -> Option<Node<'_, T, Self>> {
        Node::from_root(self)
    }
}

impl<T, C, D> KDTreeIndex<T> for KDTree<T, C, D>
where
    T: Pod,
    C: AxisComparator<T>,
    D: SquaredDistanceMetric<T>,
{
    type Comparator = C;
    type Metric = D;

    fn params(&self) -> &ParamBlock<T, C, D> {
        &self.params
    }

    fn nodes(&self) -> &[NodeData<T>] {
        &self.nodes
    }

    fn root_index(&self) -> Option<usize> {
        self.root
    }

    fn height(&self) -> usize {
        self.height
    }
}

fn nearest_item<'a, T: Pod, I: KDTreeIndex<T>>(
    tree: &'a I,
    key: &T,
    exclude_exact: bool,
) -> Option<&'a T> {
    let root = tree.root_index()?;
    let nodes = tree.nodes();
    let mut search = NearestSearch {
        params: tree.params(),
        nodes,
        key,
        exclude_exact,
        visited: 0,
    };
    let found = search.visit(root, 0);
    trace!(
        "nearest search (exclude_exact = {}) visited {} of {} nodes",
        exclude_exact,
        search.visited,
        nodes.len()
    );

    found.map(|index| &nodes[index].item)
}

/// State threaded through one branch-and-bound nearest-neighbor descent.
struct NearestSearch<'a, T, C, D> {
    params: &'a ParamBlock<T, C, D>,
    nodes: &'a [NodeData<T>],
    key: &'a T,
    exclude_exact: bool,
    visited: usize,
}

impl<'a, T, C, D> NearestSearch<'a, T, C, D>
where
    T: Pod,
    C: AxisComparator<T>,
    D: SquaredDistanceMetric<T>,
{
    #[inline]
    fn dist(&self, index: usize) -> D::Num {
        self.params
            .metric
            .squared_distance(&self.nodes[index].item, self.key)
    }

    /// Nearest node to the key in the subtree at `index`, which sits at `depth`.
    fn visit(&mut self, index: usize, depth: usize) -> Option<usize> {
        self.visited += 1;

        let nodes: &'a [NodeData<T>] = self.nodes;
        let node = &nodes[index];
        let axis = self.params.axis(depth);

        // A node equal to the key still routes the descent, it just can't be the answer.
        let mut excluded = false;
        let (near, far) = match self.params.comparator.compare(axis, self.key, &node.item) {
            Ordering::Less => (node.left, node.right),
            Ordering::Greater => (node.right, node.left),
            Ordering::Equal => {
                excluded = self.exclude_exact && self.params.items_equal(self.key, &node.item);
                (node.right, node.left)
            }
        };

        let mut best = index;
        if let Some(near) = near {
            if let Some(candidate) = self.visit(near, depth + 1) {
                if excluded || self.dist(candidate) <= self.dist(index) {
                    best = candidate;
                }
            }
        }

        if let Some(far) = far {
            // Nothing past the splitting plane can beat `best` once the plane itself is as far.
            let pruned = (!excluded || best != index)
                && self
                    .params
                    .metric
                    .axis_squared_distance(&node.item, self.key, axis)
                    >= self.dist(best);

            if !pruned {
                if let Some(candidate) = self.visit(far, depth + 1) {
                    if (excluded && best == index) || self.dist(candidate) < self.dist(best) {
                        best = candidate;
                    }
                }
            }
        }

        if excluded && best == index {
            return None;
        }

        debug_assert!(
            !self.exclude_exact || !self.params.items_equal(&self.nodes[best].item, self.key),
            "nearest search returned an item equal to the excluded key"
        );
        Some(best)
    }
}
