//! Validation request and response types.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::UserId;

use super::cart::CartItem;

/// Message carried by an accepted validation.
pub const COUPON_APPLIED: &str = "coupon_applied";

/// Input to a single validate-and-consume attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRequest {
    pub user_id: UserId,
    pub coupon_code: String,
    pub cart_items: Vec<CartItem>,
    pub order_total: Decimal,
}

/// Business reason for rejecting a coupon.
///
/// These are normal outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    CouponNotFound,
    CouponExpired,
    MinOrderValueNotMet,
    NotInValidWindow,
    CouponAlreadyUsed,
    UsageLimitReached,
}

impl RejectionReason {
    /// Wire code for the reason.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::CouponNotFound => "coupon_not_found",
            RejectionReason::CouponExpired => "coupon_expired",
            RejectionReason::MinOrderValueNotMet => "min_order_value_not_met",
            RejectionReason::NotInValidWindow => "not_in_valid_window",
            RejectionReason::CouponAlreadyUsed => "coupon_already_used",
            RejectionReason::UsageLimitReached => "usage_limit_reached",
        }
    }

    /// True for reasons produced by the usage ledger.
    pub fn is_usage_related(&self) -> bool {
        matches!(
            self,
            RejectionReason::CouponAlreadyUsed | RejectionReason::UsageLimitReached
        )
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a validation that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ValidationResponse {
    /// One usage unit was consumed; the discount may be applied.
    Accepted { discount: Decimal },
    /// Nothing was consumed.
    Rejected { reason: RejectionReason },
}

impl ValidationResponse {
    pub fn accepted(discount: Decimal) -> Self {
        ValidationResponse::Accepted { discount }
    }

    pub fn rejected(reason: RejectionReason) -> Self {
        ValidationResponse::Rejected { reason }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResponse::Accepted { .. })
    }

    /// Discount granted, if accepted.
    pub fn discount(&self) -> Option<Decimal> {
        match self {
            ValidationResponse::Accepted { discount } => Some(*discount),
            ValidationResponse::Rejected { .. } => None,
        }
    }

    /// Rejection reason, if rejected.
    pub fn reason(&self) -> Option<RejectionReason> {
        match self {
            ValidationResponse::Accepted { .. } => None,
            ValidationResponse::Rejected { reason } => Some(*reason),
        }
    }

    /// `coupon_applied` or the rejection code.
    pub fn message(&self) -> &'static str {
        match self {
            ValidationResponse::Accepted { .. } => COUPON_APPLIED,
            ValidationResponse::Rejected { reason } => reason.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn accepted_reports_discount_and_message() {
        let resp = ValidationResponse::accepted(dec!(20));
        assert!(resp.is_valid());
        assert_eq!(resp.discount(), Some(dec!(20)));
        assert_eq!(resp.reason(), None);
        assert_eq!(resp.message(), "coupon_applied");
    }

    #[test]
    fn rejected_reports_reason_code() {
        let resp = ValidationResponse::rejected(RejectionReason::MinOrderValueNotMet);
        assert!(!resp.is_valid());
        assert_eq!(resp.discount(), None);
        assert_eq!(resp.message(), "min_order_value_not_met");
    }

    #[test]
    fn reason_serializes_as_wire_code() {
        for reason in [
            RejectionReason::CouponNotFound,
            RejectionReason::CouponExpired,
            RejectionReason::MinOrderValueNotMet,
            RejectionReason::NotInValidWindow,
            RejectionReason::CouponAlreadyUsed,
            RejectionReason::UsageLimitReached,
        ] {
            let json = serde_json::to_string(&reason).unwrap();
            assert_eq!(json, format!("\"{}\"", reason.as_str()));
        }
    }

    #[test]
    fn usage_related_reasons() {
        assert!(RejectionReason::CouponAlreadyUsed.is_usage_related());
        assert!(RejectionReason::UsageLimitReached.is_usage_related());
        assert!(!RejectionReason::CouponExpired.is_usage_related());
    }

    #[test]
    fn response_serializes_with_outcome_tag() {
        let json = serde_json::to_value(ValidationResponse::rejected(
            RejectionReason::CouponExpired,
        ))
        .unwrap();
        assert_eq!(json["outcome"], "rejected");
        assert_eq!(json["reason"], "coupon_expired");
    }
}
