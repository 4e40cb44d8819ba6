use bytemuck::Pod;
use log::debug;

use crate::error::{KDTreeError, Result};
use crate::kdtree::distance::SquaredDistanceMetric;
use crate::kdtree::index::{KDTree, NodeData};
use crate::kdtree::params::{AxisComparator, ParamBlock};
use crate::r#type::MetricNum;

/// A builder to create a [`KDTree`].
///
/// ```
/// use kd_index::kdtree::{KDTreeBuilder, KDTreeIndex, ParamBlock};
///
/// let mut builder = KDTreeBuilder::new(ParamBlock::<[i32; 2], _, _>::euclidean());
/// builder.add([1, 2]);
/// builder.add([3, 4]);
/// builder.add([5, 5]);
/// let tree = builder.finish().unwrap();
///
/// assert_eq!(tree.nearest(&[3, 3]), Some(&[3, 4]));
/// ```
pub struct KDTreeBuilder<T, C, D> {
    items: Vec<T>,
    params: ParamBlock<T, C, D>,
}

impl<T, C, D> KDTreeBuilder<T, C, D>
where
    T: Pod,
    C: AxisComparator<T>,
    D: SquaredDistanceMetric<T>,
{
    /// Create a new, empty builder.
    pub fn new(params: ParamBlock<T, C, D>) -> Self {
        Self::with_capacity(params, 0)
    }

    /// Create a new builder with space reserved for `num_items` items.
    pub fn with_capacity(params: ParamBlock<T, C, D>, num_items: usize) -> Self {
        Self {
            items: Vec::with_capacity(num_items),
            params,
        }
    }

    /// Access the param block the tree will be built with.
    pub fn params(&self) -> &ParamBlock<T, C, D> {
        &self.params
    }

    /// The number of items added so far.
    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    /// Add an item to the index.
    ///
    /// This returns the insertion index.
    #[inline]
    pub fn add(&mut self, item: T) -> usize {
        self.items.push(item);
        self.items.len() - 1
    }

    /// Add every item of a slice to the index.
    ///
    /// This returns the insertion index of the first item.
    pub fn add_slice(&mut self, items: &[T]) -> usize {
        let start = self.items.len();
        self.items.extend_from_slice(items);
        start
    }

    /// Consume this builder, performing the k-d sort and generating a [`KDTree`] ready for
    /// queries.
    pub fn finish(mut self) -> Result<KDTree<T, C, D>> {
        build_tree(&mut self.items, self.params)
    }
}

/// Validate `params` and build a balanced tree out of `items`.
pub(crate) fn build_tree<T, C, D>(
    items: &mut [T],
    params: ParamBlock<T, C, D>,
) -> Result<KDTree<T, C, D>>
where
    T: Pod,
    C: AxisComparator<T>,
    D: SquaredDistanceMetric<T>,
{
    if let Err(err) = params.validate() {
        debug!("rejected param block {:?}: {}", params, err);
        return Err(err);
    }

    // Reserve every node up front so that a failed allocation leaves nothing half built.
    let mut nodes = Vec::new();
    nodes
        .try_reserve_exact(items.len())
        .map_err(|_| KDTreeError::OutOfMemory(items.len()))?;

    let mut height = 0;
    let root = build_node(items, 0, &params, &mut nodes, &mut height);
    debug_assert_eq!(nodes.len(), items.len());

    debug!(
        "built kd-tree: {} items, k = {}, {:?} distances, height {}",
        nodes.len(),
        params.k(),
        <D::Num as MetricNum>::DOMAIN,
        height
    );

    Ok(KDTree {
        nodes,
        root,
        height,
        params,
    })
}

/// Recursively sort `items` on the axis for `depth`, store the median and build both halves
/// beneath it. Returns the position of the new node.
fn build_node<T, C, D>(
    items: &mut [T],
    depth: usize,
    params: &ParamBlock<T, C, D>,
    nodes: &mut Vec<NodeData<T>>,
    height: &mut usize,
) -> Option<usize>
where
    T: Pod,
    C: AxisComparator<T>,
{
    if items.is_empty() {
        return None;
    }
    *height = (*height).max(depth + 1);

    // A stable sort keeps the shape deterministic when items tie on this axis
    let axis = params.axis(depth);
    items.sort_by(|a, b| params.comparator.compare(axis, a, b));

    // lower median when the length is even
    let middle = items.len() / 2;
    let (left_items, rest) = items.split_at_mut(middle);
    let (middle_item, right_items) = rest.split_at_mut(1);

    let left = build_node(left_items, depth + 1, params, nodes, height);
    let right = build_node(right_items, depth + 1, params, nodes, height);

    debug_assert!(nodes.len() < nodes.capacity());
    nodes.push(NodeData {
        item: middle_item[0],
        left,
        right,
    });
    Some(nodes.len() - 1)
}
