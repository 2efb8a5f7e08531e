//! Eligibility gates that need no I/O.
//!
//! Static checks run before any discount work; usage checks run inside the
//! ledger transaction against the locked count.

use rust_decimal::Decimal;

use crate::domain::foundation::Timestamp;

use super::definition::{Coupon, UsageType};
use super::validation::RejectionReason;

/// Expiry, minimum order value and validity window, in that order.
///
/// - expired when `now >= expiry_date`
/// - the window is inclusive at both ends and only applies when both bounds are set
pub fn check_static(
    coupon: &Coupon,
    order_total: Decimal,
    now: Timestamp,
) -> Result<(), RejectionReason> {
    if now >= coupon.expiry_date {
        return Err(RejectionReason::CouponExpired);
    }
    if coupon.min_order_value > order_total {
        return Err(RejectionReason::MinOrderValueNotMet);
    }
    if let (Some(from), Some(to)) = (coupon.valid_from, coupon.valid_to) {
        if now < from || now > to {
            return Err(RejectionReason::NotInValidWindow);
        }
    }
    Ok(())
}

/// Per-user limits against the count observed under lock.
pub fn check_usage(coupon: &Coupon, usage_count: u32) -> Result<(), RejectionReason> {
    if coupon.usage_type == UsageType::OneTime && usage_count >= 1 {
        return Err(RejectionReason::CouponAlreadyUsed);
    }
    if coupon.max_usage_per_user > 0 && usage_count >= coupon.max_usage_per_user {
        return Err(RejectionReason::UsageLimitReached);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::coupon::definition::test_support::coupon;
    use rust_decimal_macros::dec;

    fn t(s: &str) -> Timestamp {
        Timestamp::parse_rfc3339(s).unwrap()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Static checks
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn passes_for_live_coupon() {
        assert_eq!(check_static(&coupon("OK"), dec!(100), Timestamp::now()), Ok(()));
    }

    #[test]
    fn expiry_instant_is_already_expired() {
        let mut c = coupon("EXP");
        c.expiry_date = t("2026-05-01T00:00:00Z");

        assert_eq!(
            check_static(&c, dec!(100), t("2026-05-01T00:00:00Z")),
            Err(RejectionReason::CouponExpired)
        );
        assert_eq!(
            check_static(&c, dec!(100), t("2026-05-01T00:00:00Z").plus_nanos(-1)),
            Ok(())
        );
    }

    #[test]
    fn min_order_value_must_be_met() {
        let mut c = coupon("MIN");
        c.min_order_value = dec!(500);

        assert_eq!(
            check_static(&c, dec!(499.99), Timestamp::now()),
            Err(RejectionReason::MinOrderValueNotMet)
        );
        assert_eq!(check_static(&c, dec!(500), Timestamp::now()), Ok(()));
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let t0 = t("2026-06-01T00:00:00Z");
        let t1 = t("2026-06-30T23:59:59Z");
        let mut c = coupon("WIN");
        c.expiry_date = t("2027-01-01T00:00:00Z");
        c.valid_from = Some(t0);
        c.valid_to = Some(t1);

        assert_eq!(check_static(&c, dec!(10), t0), Ok(()));
        assert_eq!(check_static(&c, dec!(10), t1), Ok(()));
        assert_eq!(
            check_static(&c, dec!(10), t1.plus_nanos(1)),
            Err(RejectionReason::NotInValidWindow)
        );
        assert_eq!(
            check_static(&c, dec!(10), t0.plus_nanos(-1)),
            Err(RejectionReason::NotInValidWindow)
        );
    }

    #[test]
    fn half_open_window_is_ignored() {
        let mut c = coupon("HALF");
        c.valid_from = Some(Timestamp::now().add_days(10));
        assert_eq!(check_static(&c, dec!(10), Timestamp::now()), Ok(()));
    }

    #[test]
    fn expiry_is_checked_before_min_order() {
        let mut c = coupon("BOTH");
        c.expiry_date = Timestamp::now().add_days(-1);
        c.min_order_value = dec!(1000);
        assert_eq!(
            check_static(&c, dec!(1), Timestamp::now()),
            Err(RejectionReason::CouponExpired)
        );
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Usage checks
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn one_time_rejects_after_first_use() {
        let mut c = coupon("ONCE");
        c.usage_type = UsageType::OneTime;
        assert_eq!(check_usage(&c, 0), Ok(()));
        assert_eq!(check_usage(&c, 1), Err(RejectionReason::CouponAlreadyUsed));
    }

    #[test]
    fn one_time_reason_wins_over_limit() {
        let mut c = coupon("ONCE");
        c.usage_type = UsageType::OneTime;
        c.max_usage_per_user = 1;
        assert_eq!(check_usage(&c, 1), Err(RejectionReason::CouponAlreadyUsed));
    }

    #[test]
    fn max_usage_bounds_multi_use() {
        let mut c = coupon("THRICE");
        c.max_usage_per_user = 3;
        assert_eq!(check_usage(&c, 2), Ok(()));
        assert_eq!(check_usage(&c, 3), Err(RejectionReason::UsageLimitReached));
    }

    #[test]
    fn zero_max_usage_is_unlimited() {
        let c = coupon("FOREVER");
        assert_eq!(check_usage(&c, 10_000), Ok(()));
    }
}
