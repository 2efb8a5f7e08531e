//! Discount arithmetic.
//!
//! `item_contribution` is what each evaluator worker computes per cart line;
//! `aggregate_discount` turns the summed contributions into the final amount.
//! All arithmetic is checked; a result outside the `Decimal` range is a
//! [`DiscountOverflow`], never a panic.

use rust_decimal::Decimal;
use thiserror::Error;

use super::cart::CartItem;
use super::definition::{Coupon, CouponMeta, DiscountType, TargetType};

/// A discount amount that does not fit in a `Decimal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("discount arithmetic overflowed")]
pub struct DiscountOverflow;

/// Contribution of a single cart line.
///
/// Only percentage inventory coupons discount per line. Flat inventory
/// coupons are applied once per order by [`aggregate_discount`].
pub fn item_contribution(
    meta: &CouponMeta,
    item: &CartItem,
) -> Result<Decimal, DiscountOverflow> {
    let coupon = &meta.coupon;
    match (coupon.target_type, coupon.discount_type) {
        (TargetType::Inventory, DiscountType::Percentage) if meta.applies_to(item) => {
            let line_total = item.line_total().ok_or(DiscountOverflow)?;
            percent_of(line_total, coupon.discount_value)
        }
        _ => Ok(Decimal::ZERO),
    }
}

/// Final discount for the order.
pub fn aggregate_discount(
    coupon: &Coupon,
    total_item_discount: Decimal,
    order_total: Decimal,
) -> Result<Decimal, DiscountOverflow> {
    match (coupon.target_type, coupon.discount_type) {
        (TargetType::Inventory, DiscountType::Percentage) => Ok(total_item_discount),
        (TargetType::Inventory, DiscountType::Flat) => Ok(coupon.discount_value),
        (TargetType::Charges, DiscountType::Percentage) => {
            percent_of(order_total, coupon.discount_value)
        }
        (TargetType::Charges, DiscountType::Flat) => Ok(coupon.discount_value),
    }
}

/// `amount × (percent / 100)`.
fn percent_of(amount: Decimal, percent: Decimal) -> Result<Decimal, DiscountOverflow> {
    percent
        .checked_div(Decimal::ONE_HUNDRED)
        .and_then(|rate| amount.checked_mul(rate))
        .ok_or(DiscountOverflow)
}
