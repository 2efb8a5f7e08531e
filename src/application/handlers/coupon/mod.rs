//! Coupon handlers.
//!
//! ## Commands
//! - Validating a coupon and consuming one use
//!
//! ## Queries
//! - Listing the coupons a cart could use

mod list_applicable_coupons;
mod validate_coupon;

// Commands
pub use validate_coupon::{
    ValidateCouponCommand, ValidateCouponHandler, DEFAULT_DEADLINE,
};

// Queries
pub use list_applicable_coupons::{
    ListApplicableCouponsHandler, ListApplicableCouponsQuery, ListApplicableCouponsResult,
};
