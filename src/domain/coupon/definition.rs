//! Coupon definition and its validation read model.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CouponId, Timestamp, ValidationError};

use super::cart::CartItem;

/// How often a single user may consume a coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageType {
    /// At most one successful use per user, regardless of `max_usage_per_user`.
    OneTime,
    /// Bounded by `max_usage_per_user` (0 = unlimited).
    MultiUse,
    /// Bounded by the validity window and `max_usage_per_user`.
    TimeBased,
}

/// How the discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// Absolute amount off.
    Flat,
    /// Percentage (0-100) off.
    Percentage,
}

/// What the coupon discounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    /// Cart line items.
    Inventory,
    /// Order-level charges.
    Charges,
}

macro_rules! str_enum {
    ($ty:ident, $field:literal, { $($variant:ident => $s:literal),+ $(,)? }) => {
        impl $ty {
            /// Returns the storage representation.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $s),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($s => Ok($ty::$variant),)+
                    other => Err(ValidationError::invalid_format(
                        $field,
                        format!("unknown value '{}'", other),
                    )),
                }
            }
        }
    };
}

str_enum!(UsageType, "usage_type", {
    OneTime => "one_time",
    MultiUse => "multi_use",
    TimeBased => "time_based",
});

str_enum!(DiscountType, "discount_type", {
    Flat => "flat",
    Percentage => "percentage",
});

str_enum!(TargetType, "target_type", {
    Inventory => "inventory",
    Charges => "charges",
});

/// A discount-granting rule identified by a unique code.
///
/// Immutable once published; edits are an authoring concern outside this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    /// Exclusive upper bound: the coupon is expired at this instant.
    pub expiry_date: Timestamp,
    pub usage_type: UsageType,
    pub min_order_value: Decimal,
    /// Inclusive window start. Only enforced when `valid_to` is also set.
    pub valid_from: Option<Timestamp>,
    /// Inclusive window end. Only enforced when `valid_from` is also set.
    pub valid_to: Option<Timestamp>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    /// Per-user consumption bound; 0 means unlimited.
    pub max_usage_per_user: u32,
    pub target_type: TargetType,
    #[serde(default)]
    pub terms_and_conditions: Option<String>,
}

impl Coupon {
    /// Checks structural invariants of a coupon loaded from storage.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.code.trim().is_empty() {
            return Err(ValidationError::empty_field("coupon_code"));
        }
        if self.discount_value <= Decimal::ZERO {
            return Err(ValidationError::invalid_format(
                "discount_value",
                "must be greater than zero",
            ));
        }
        if self.min_order_value.is_sign_negative() {
            return Err(ValidationError::negative("min_order_value"));
        }
        Ok(())
    }

    /// Effective per-user bound, if any.
    ///
    /// `one_time` coupons are bounded to one use even when the configured
    /// `max_usage_per_user` is larger or unlimited.
    pub fn usage_bound(&self) -> Option<u32> {
        let configured = (self.max_usage_per_user > 0).then_some(self.max_usage_per_user);
        match self.usage_type {
            UsageType::OneTime => Some(configured.map_or(1, |max| max.min(1))),
            UsageType::MultiUse | UsageType::TimeBased => configured,
        }
    }
}

/// Coupon plus its applicability sets, as needed for validation.
///
/// Shared as `Arc<CouponMeta>` between concurrent validations and never
/// mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponMeta {
    pub coupon: Coupon,
    applicable_items: HashSet<String>,
    applicable_categories: HashSet<String>,
}

impl CouponMeta {
    pub fn new(
        coupon: Coupon,
        applicable_items: impl IntoIterator<Item = String>,
        applicable_categories: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            coupon,
            applicable_items: applicable_items.into_iter().collect(),
            applicable_categories: applicable_categories.into_iter().collect(),
        }
    }

    /// Convenience constructor for a coupon that applies to the whole cart.
    pub fn unrestricted(coupon: Coupon) -> Self {
        Self::new(coupon, Vec::new(), Vec::new())
    }

    pub fn applicable_items(&self) -> &HashSet<String> {
        &self.applicable_items
    }

    pub fn applicable_categories(&self) -> &HashSet<String> {
        &self.applicable_categories
    }

    /// True when neither set narrows the coupon.
    pub fn is_unrestricted(&self) -> bool {
        self.applicable_items.is_empty() && self.applicable_categories.is_empty()
    }

    /// Whether the coupon applies to a single cart line.
    pub fn applies_to(&self, item: &CartItem) -> bool {
        self.is_unrestricted()
            || self.applicable_items.contains(&item.id)
            || self.applicable_categories.contains(&item.category)
    }

    /// Whether the coupon applies to at least one line of the cart.
    pub fn applies_to_any(&self, items: &[CartItem]) -> bool {
        self.is_unrestricted() || items.iter().any(|item| self.applies_to(item))
    }
}
