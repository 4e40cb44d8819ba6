//! Distance metrics for nearest-neighbor queries.
//!
//! The search only ever compares distances, so every metric works in squared units and never
//! takes a square root.

use std::marker::PhantomData;

use num_traits::{Bounded, Num, NumCast, ToPrimitive};

use crate::r#type::MetricNum;

/// A squared distance between two items, and its restriction to a single axis.
///
/// Implementations must uphold `axis_squared_distance(a, b, axis) <= squared_distance(a, b)` for
/// every axis; nearest-neighbor pruning relies on it.
pub trait SquaredDistanceMetric<T> {
    /// The numeric domain distances are computed in.
    type Num: MetricNum;

    /// Squared distance between `a` and `b`. Symmetric, non-negative and zero when the items
    /// coincide.
    fn squared_distance(&self, a: &T, b: &T) -> Self::Num;

    /// Squared distance between `a` and `b` along `axis` only.
    fn axis_squared_distance(&self, a: &T, b: &T, axis: usize) -> Self::Num;
}

/// A metric made of a pair of functions.
///
/// ```
/// use kd_index::kdtree::{DistanceFns, SquaredDistanceMetric};
///
/// let metric = DistanceFns::new(
///     |a: &[i32; 2], b: &[i32; 2]| {
///         let dx = (a[0] - b[0]) as f64;
///         let dy = (a[1] - b[1]) as f64;
///         dx * dx + dy * dy
///     },
///     |a: &[i32; 2], b: &[i32; 2], axis: usize| {
///         let d = (a[axis] - b[axis]) as f64;
///         d * d
///     },
/// );
/// assert_eq!(metric.squared_distance(&[0, 0], &[3, 4]), 25.0);
/// assert_eq!(metric.axis_squared_distance(&[0, 0], &[3, 4], 1), 16.0);
/// ```
pub struct DistanceFns<N, F, G> {
    squared: F,
    axis_squared: G,
    phantom: PhantomData<fn() -> N>,
}

impl<N, F, G> DistanceFns<N, F, G> {
    /// Create a metric from a full and an axis-restricted squared distance function.
    pub fn new(squared: F, axis_squared: G) -> Self {
        Self {
            squared,
            axis_squared,
            phantom: PhantomData,
        }
    }
}

impl<N, F: Clone, G: Clone> Clone for DistanceFns<N, F, G> {
    fn clone(&self) -> Self {
        Self::new(self.squared.clone(), self.axis_squared.clone())
    }
}

impl<T, N, F, G> SquaredDistanceMetric<T> for DistanceFns<N, F, G>
where
    N: MetricNum,
    F: Fn(&T, &T) -> N,
    G: Fn(&T, &T, usize) -> N,
{
    type Num = N;

    #[inline]
    fn squared_distance(&self, a: &T, b: &T) -> N {
        (self.squared)(a, b)
    }

    #[inline]
    fn axis_squared_distance(&self, a: &T, b: &T, axis: usize) -> N {
        (self.axis_squared)(a, b, axis)
    }
}

/// Squared Euclidean distance between fixed-size arrays, computed in `M`.
///
/// Per-axis differences are taken in the coordinate type and then cast to `M`, so unsigned
/// domains work for any coordinate type. Signed coordinates further apart than the coordinate
/// type can represent are subtracted in `f64` instead. Integer domains saturate at
/// `M::max_value()` instead of overflowing, and round fractional differences up so that distinct
/// coordinates are never at distance zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredEuclidean<M> {
    phantom: PhantomData<M>,
}

impl<M> SquaredEuclidean<M> {
    /// Create a new metric.
    pub fn new() -> Self {
        Self {
            phantom: PhantomData,
        }
    }
}

impl<N, M, const D: usize> SquaredDistanceMetric<[N; D]> for SquaredEuclidean<M>
where
    N: Num + NumCast + PartialOrd + Bounded + Copy,
    M: MetricNum,
{
    type Num = M;

    #[inline]
    fn squared_distance(&self, a: &[N; D], b: &[N; D]) -> M {
        (0..D).fold(M::zero(), |acc, axis| {
            acc.saturating_add(self.axis_squared_distance(a, b, axis))
        })
    }

    #[inline]
    fn axis_squared_distance(&self, a: &[N; D], b: &[N; D], axis: usize) -> M {
        match axis_dist::<N, M>(a[axis], b[axis]) {
            Some(d) => d.saturating_mul(d),
            None => M::max_value(),
        }
    }
}

/// 1D absolute difference in the distance domain, or `None` when `M` cannot represent it.
///
/// Safe for unsigned types, and for signed types whose difference exceeds their own range.
#[inline]
fn axis_dist<N, M>(a: N, b: N) -> Option<M>
where
    N: Num + NumCast + PartialOrd + Bounded + Copy,
    M: MetricNum,
{
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };

    // hi - lo > MAX, rearranged so that neither side overflows
    if lo < N::zero() && hi > N::max_value() + lo {
        return to_metric(hi.to_f64()? - lo.to_f64()?);
    }
    to_metric(hi - lo)
}

/// Cast a non-negative difference into `M`, rounding fractions up for integral domains.
#[inline]
fn to_metric<X: ToPrimitive, M: MetricNum>(d: X) -> Option<M> {
    if M::DOMAIN.is_integral() {
        let f = d.to_f64()?;
        if f.fract() != 0.0 {
            return <M as NumCast>::from(f.ceil());
        }
    }
    <M as NumCast>::from(d)
}
