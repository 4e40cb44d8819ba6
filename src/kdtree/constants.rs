//! Flag bits accepted at creation, search and walk time.

/// Creation flag: distances are computed in single precision (`f32`), or in 32-bit integers when
/// combined with [`INTEGRAL`].
pub const SINGLE_PREC: u32 = 0x1;

/// Creation flag: distances are computed in unsigned integers (`u64`), or `u32` when combined
/// with [`SINGLE_PREC`].
pub const INTEGRAL: u32 = 0x2;

/// Every creation flag this crate understands.
pub const VALID_CREATE_FLAGS: u32 = SINGLE_PREC | INTEGRAL;

/// Search flag: never return an item equal to the query key.
pub const NOT_EQUAL: u32 = 0x1;

/// Every search flag this crate understands.
pub const VALID_SEARCH_FLAGS: u32 = NOT_EQUAL;
