//! Coupon domain module.
//!
//! Pure types and rules for validating a coupon against a cart.
//!
//! # Module Structure
//!
//! - `definition` - Coupon, its enums, and the `CouponMeta` read model
//! - `cart` - Cart line items
//! - `eligibility` - Static and per-user usage gates
//! - `discount` - Per-line contribution and aggregation policy
//! - `validation` - Request, rejection reasons, and response
//! - `usage` - Usage ledger record
//! - `errors` - Operational failures

mod cart;
mod definition;
mod discount;
mod eligibility;
mod errors;
mod usage;
mod validation;

pub use cart::CartItem;
pub use definition::{Coupon, CouponMeta, DiscountType, TargetType, UsageType};
pub use discount::{aggregate_discount, item_contribution, DiscountOverflow};
pub use eligibility::{check_static, check_usage};
pub use errors::CouponError;
pub use usage::{UsageKey, UsageRecord};
pub use validation::{RejectionReason, ValidationRequest, ValidationResponse, COUPON_APPLIED};

#[cfg(test)]
pub(crate) use definition::test_support;
