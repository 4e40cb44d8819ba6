//! The configuration a tree is built with: dimensionality, item size, axis ordering and distance
//! metric.

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;

use bytemuck::Pod;
use num_traits::{Bounded, Num, NumCast};

use crate::kdtree::constants::VALID_CREATE_FLAGS;
use crate::kdtree::distance::{SquaredDistanceMetric, SquaredEuclidean};
use crate::r#type::{MetricDomain, MetricNum};
use crate::{KDTreeError, Result};

/// A total order over items along a single axis.
pub trait AxisComparator<T> {
    /// Compare `a` to `b` along `axis`. `axis` is always in `[0, k)`.
    fn compare(&self, axis: usize, a: &T, b: &T) -> Ordering;
}

impl<T, F> AxisComparator<T> for F
where
    F: Fn(usize, &T, &T) -> Ordering,
{
    #[inline]
    fn compare(&self, axis: usize, a: &T, b: &T) -> Ordering {
        self(axis, a, b)
    }
}

/// Compares fixed-size arrays by their `axis`-th element.
///
/// Incomparable values (NaN) are treated as equal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArrayComparator;

impl<N: PartialOrd, const D: usize> AxisComparator<[N; D]> for ArrayComparator {
    #[inline]
    fn compare(&self, axis: usize, a: &[N; D], b: &[N; D]) -> Ordering {
        a[axis].partial_cmp(&b[axis]).unwrap_or(Ordering::Equal)
    }
}

/// The parameters a KD-tree is built with.
///
/// A copy is stored inside the tree and can be read back with
/// [`KDTreeIndex::params`][crate::kdtree::KDTreeIndex::params].
///
/// ```
/// use kd_index::kdtree::{ArrayComparator, ParamBlock, SquaredEuclidean};
///
/// let params =
///     ParamBlock::<[f32; 3], _, _>::new(3, ArrayComparator, SquaredEuclidean::<f32>::new());
/// assert_eq!(params.item_size(), 12);
/// assert!(params.validate().is_ok());
/// ```
#[derive(Clone)]
pub struct ParamBlock<T, C, D> {
    pub(crate) k: usize,
    pub(crate) item_size: usize,
    pub(crate) flags: u32,
    pub(crate) comparator: C,
    pub(crate) metric: D,
    phantom: PhantomData<T>,
}

impl<T, C, D> ParamBlock<T, C, D>
where
    T: Pod,
    C: AxisComparator<T>,
    D: SquaredDistanceMetric<T>,
{
    /// Create a new param block with `k` axes.
    ///
    /// The item size defaults to the size of `T` and the flags default to the ones selecting the
    /// metric's numeric domain.
    pub fn new(k: usize, comparator: C, metric: D) -> Self {
        Self {
            k,
            item_size: size_of::<T>(),
            flags: <D::Num as MetricNum>::DOMAIN.flags(),
            comparator,
            metric,
            phantom: PhantomData,
        }
    }

    /// Override the creation flags.
    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// Override the declared item size.
    pub fn with_item_size(mut self, item_size: usize) -> Self {
        self.item_size = item_size;
        self
    }

    /// Check that this configuration can be used to build a tree.
    pub fn validate(&self) -> Result<()> {
        if self.item_size == 0 {
            return Err(KDTreeError::InvalidArgument(
                "Item size must be non-zero.".to_string(),
            ));
        }

        if self.item_size != size_of::<T>() {
            return Err(KDTreeError::InvalidArgument(format!(
                "Declared item size {} does not match record size {}.",
                self.item_size,
                size_of::<T>()
            )));
        }

        if self.k == 0 {
            return Err(KDTreeError::InvalidArgument(
                "Dimensionality must be at least 1.".to_string(),
            ));
        }

        if self.flags & !VALID_CREATE_FLAGS != 0 {
            return Err(KDTreeError::InvalidArgument(format!(
                "Unrecognized creation flags {:#x}.",
                self.flags & !VALID_CREATE_FLAGS
            )));
        }

        let domain = MetricDomain::from_flags(self.flags)?;
        if domain != <D::Num as MetricNum>::DOMAIN {
            return Err(KDTreeError::InvalidArgument(format!(
                "Flags select {:?} distances but the metric computes {:?}.",
                domain,
                <D::Num as MetricNum>::DOMAIN
            )));
        }

        Ok(())
    }
}

impl<T, C, D> ParamBlock<T, C, D> {
    /// The number of axes.
    pub fn k(&self) -> usize {
        self.k
    }

    /// The size, in bytes, of one item.
    pub fn item_size(&self) -> usize {
        self.item_size
    }

    /// The creation flags.
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// The axis comparator.
    pub fn comparator(&self) -> &C {
        &self.comparator
    }

    /// The distance metric.
    pub fn metric(&self) -> &D {
        &self.metric
    }

    /// The axis that splits nodes at `depth`.
    #[inline]
    pub fn axis(&self, depth: usize) -> usize {
        depth % self.k
    }
}

impl<T: Pod, C: AxisComparator<T>, D> ParamBlock<T, C, D> {
    /// Whether `a` and `b` are the same record: byte-identical, or equal along every axis.
    pub(crate) fn items_equal(&self, a: &T, b: &T) -> bool {
        if bytemuck::bytes_of(a) == bytemuck::bytes_of(b) {
            return true;
        }

        (0..self.k).all(|axis| self.comparator.compare(axis, a, b) == Ordering::Equal)
    }
}

impl<N, const K: usize> ParamBlock<[N; K], ArrayComparator, SquaredEuclidean<f64>>
where
    N: Num + NumCast + PartialOrd + Bounded + Copy,
    [N; K]: Pod,
{
    /// Param block for `K`-dimensional points under squared Euclidean distance in `f64`.
    ///
    /// Other numeric domains are available through [`ParamBlock::new`] with a
    /// [`SquaredEuclidean`] of the desired type.
    pub fn euclidean() -> Self {
        Self::new(K, ArrayComparator, SquaredEuclidean::new())
    }
}

impl<T, C, D> fmt::Debug for ParamBlock<T, C, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamBlock")
            .field("k", &self.k)
            .field("item_size", &self.item_size)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}
