//! ListApplicableCouponsHandler - Query handler for coupons a cart could use.
//!
//! Read-only: counts come from a non-locking read and nothing is consumed, so
//! a listed coupon may still be rejected by a later validation.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::domain::coupon::{check_static, check_usage, CartItem, Coupon};
use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::ports::{Clock, CouponCatalog, CouponMetadataProvider, UsageReader};

/// Query for coupons applicable to a cart.
#[derive(Debug, Clone)]
pub struct ListApplicableCouponsQuery {
    pub user_id: UserId,
    pub cart_items: Vec<CartItem>,
    pub order_total: Decimal,
    /// Evaluation instant; the clock's current time when absent.
    pub at: Option<Timestamp>,
}

/// Codes of the applicable coupons, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListApplicableCouponsResult {
    pub applicable_coupons: Vec<String>,
}

/// Handler for the applicable-coupons query.
pub struct ListApplicableCouponsHandler {
    catalog: Arc<dyn CouponCatalog>,
    metadata: Arc<dyn CouponMetadataProvider>,
    usage: Arc<dyn UsageReader>,
    clock: Arc<dyn Clock>,
}

impl ListApplicableCouponsHandler {
    pub fn new(
        catalog: Arc<dyn CouponCatalog>,
        metadata: Arc<dyn CouponMetadataProvider>,
        usage: Arc<dyn UsageReader>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            metadata,
            usage,
            clock,
        }
    }

    /// Scans the catalog sequentially.
    ///
    /// Failure to list the catalog fails the query; failure to read a single
    /// coupon's usage or metadata skips that coupon.
    pub async fn handle(
        &self,
        query: ListApplicableCouponsQuery,
    ) -> Result<ListApplicableCouponsResult, DomainError> {
        let at = query.at.unwrap_or_else(|| self.clock.now());
        let coupons = self.catalog.list_coupons().await?;

        let mut applicable_coupons = Vec::new();
        for coupon in coupons {
            if self.is_applicable(&coupon, &query, at).await {
                applicable_coupons.push(coupon.code);
            }
        }

        tracing::debug!(
            user_id = %query.user_id,
            count = applicable_coupons.len(),
            "Listed applicable coupons"
        );
        Ok(ListApplicableCouponsResult { applicable_coupons })
    }

    async fn is_applicable(
        &self,
        coupon: &Coupon,
        query: &ListApplicableCouponsQuery,
        at: Timestamp,
    ) -> bool {
        if check_static(coupon, query.order_total, at).is_err() {
            return false;
        }

        let count = match self.usage.usage_count(coupon.id, &query.user_id).await {
            Ok(count) => count,
            Err(err) => {
                tracing::warn!(coupon_code = %coupon.code, "Skipping coupon, usage read failed: {}", err);
                return false;
            }
        };
        if check_usage(coupon, count).is_err() {
            return false;
        }

        match self.metadata.lookup(&coupon.code).await {
            Ok(Some(meta)) => meta.applies_to_any(&query.cart_items),
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(coupon_code = %coupon.code, "Skipping coupon, metadata read failed: {}", err);
                false
            }
        }
    }
}
