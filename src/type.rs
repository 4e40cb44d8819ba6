use std::fmt::Debug;

use num_traits::{Bounded, Num, NumCast, ToPrimitive};

use crate::kdtree::constants::{INTEGRAL, SINGLE_PREC, VALID_CREATE_FLAGS};
use crate::KDTreeError;

/// A trait for the numeric types distances can be computed in.
///
/// This trait is sealed and cannot be implemented for external types. Exactly four domains are
/// supported, and each one corresponds to a combination of creation flags (see [`MetricDomain`]).
pub trait MetricNum:
    private::Sealed
    + Num
    + NumCast
    + ToPrimitive
    + PartialOrd
    + Debug
    + Send
    + Sync
    + bytemuck::Pod
    + Bounded
{
    /// The domain this type computes distances in
    const DOMAIN: MetricDomain;

    /// Addition clamped to `max_value()`. Plain addition for floats.
    fn saturating_add(self, rhs: Self) -> Self;

    /// Multiplication clamped to `max_value()`. Plain multiplication for floats.
    fn saturating_mul(self, rhs: Self) -> Self;
}

macro_rules! impl_float_metric {
    ($t:ty, $domain:expr) => {
        impl MetricNum for $t {
            const DOMAIN: MetricDomain = $domain;

            #[inline]
            fn saturating_add(self, rhs: Self) -> Self {
                self + rhs
            }

            #[inline]
            fn saturating_mul(self, rhs: Self) -> Self {
                self * rhs
            }
        }
    };
}

macro_rules! impl_integral_metric {
    ($t:ty, $domain:expr) => {
        impl MetricNum for $t {
            const DOMAIN: MetricDomain = $domain;

            #[inline]
            fn saturating_add(self, rhs: Self) -> Self {
                <$t>::saturating_add(self, rhs)
            }

            #[inline]
            fn saturating_mul(self, rhs: Self) -> Self {
                <$t>::saturating_mul(self, rhs)
            }
        }
    };
}

impl_float_metric!(f64, MetricDomain::Double);
impl_float_metric!(f32, MetricDomain::Single);
impl_integral_metric!(u64, MetricDomain::UInt64);
impl_integral_metric!(u32, MetricDomain::UInt32);

/// An enum over the numeric domains a distance metric may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricDomain {
    /// `f64`, no flags
    Double,
    /// `f32`
    Single,
    /// `u64`
    UInt64,
    /// `u32`
    UInt32,
}

impl MetricDomain {
    /// The creation flags selecting this domain.
    pub fn flags(&self) -> u32 {
        match self {
            MetricDomain::Double => 0,
            MetricDomain::Single => SINGLE_PREC,
            MetricDomain::UInt64 => INTEGRAL,
            MetricDomain::UInt32 => INTEGRAL | SINGLE_PREC,
        }
    }

    /// Whether distances in this domain are unsigned integers.
    pub fn is_integral(&self) -> bool {
        matches!(self, MetricDomain::UInt64 | MetricDomain::UInt32)
    }

    /// Infer the domain from a set of creation flags.
    pub fn from_flags(flags: u32) -> Result<Self, KDTreeError> {
        if flags & !VALID_CREATE_FLAGS != 0 {
            return Err(KDTreeError::InvalidArgument(format!(
                "Unrecognized creation flags {:#x}.",
                flags & !VALID_CREATE_FLAGS
            )));
        }

        let result = match (flags & INTEGRAL != 0, flags & SINGLE_PREC != 0) {
            (false, false) => MetricDomain::Double,
            (false, true) => MetricDomain::Single,
            (true, false) => MetricDomain::UInt64,
            (true, true) => MetricDomain::UInt32,
        };
        Ok(result)
    }
}

// https://rust-lang.github.io/api-guidelines/future-proofing.html#sealed-traits-protect-against-downstream-implementations-c-sealed
mod private {
    pub trait Sealed {}

    impl Sealed for f64 {}
    impl Sealed for f32 {}
    impl Sealed for u64 {}
    impl Sealed for u32 {}
}
