//! Per-(coupon, user) consumption counter.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CouponId, Timestamp, UserId};

/// Ledger key.
pub type UsageKey = (CouponId, UserId);

/// Consumption counter owned by the usage ledger.
///
/// Created lazily with `usage_count = 0` the first time a pair is locked;
/// the count only ever grows, by one per committed consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub coupon_id: CouponId,
    pub user_id: UserId,
    pub usage_count: u32,
    pub last_used: Timestamp,
}

impl UsageRecord {
    /// Fresh record for a pair that has never been locked.
    pub fn new(coupon_id: CouponId, user_id: UserId) -> Self {
        Self {
            coupon_id,
            user_id,
            usage_count: 0,
            last_used: Timestamp::now(),
        }
    }

    pub fn key(&self) -> UsageKey {
        (self.coupon_id, self.user_id.clone())
    }

    /// Consumes one unit.
    pub fn increment(&mut self, at: Timestamp) {
        self.usage_count = self.usage_count.saturating_add(1);
        self.last_used = at;
    }
}
