//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod coupon;

pub use coupon::{
    // Commands
    ValidateCouponCommand,
    ValidateCouponHandler,
    DEFAULT_DEADLINE,
    // Queries
    ListApplicableCouponsHandler,
    ListApplicableCouponsQuery,
    ListApplicableCouponsResult,
};
