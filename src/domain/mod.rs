//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `coupon` - Coupons, carts, eligibility rules and discount arithmetic

pub mod coupon;
pub mod foundation;
