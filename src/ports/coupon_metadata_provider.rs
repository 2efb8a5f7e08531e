//! Coupon metadata lookup port.
//!
//! Resolves a coupon code to its rules and applicability sets. Results are
//! shared as `Arc<CouponMeta>` and must be treated as immutable by every
//! consumer, which is what makes them safe to cache.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::coupon::{Coupon, CouponMeta};
use crate::domain::foundation::DomainError;

/// Port for resolving coupon codes.
///
/// Implementations must be safe to call from many validations at once.
#[async_trait]
pub trait CouponMetadataProvider: Send + Sync {
    /// Looks up a coupon by code.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(meta))` - Coupon exists
    /// - `Ok(None)` - No coupon with this code
    /// - `Err(DomainError)` - Infrastructure error occurred
    async fn lookup(&self, code: &str) -> Result<Option<Arc<CouponMeta>>, DomainError>;
}

/// Port for scanning every published coupon.
///
/// Backs the read-only applicable-coupons query; it has no consistency
/// requirement beyond returning what storage held at the time of the call.
#[async_trait]
pub trait CouponCatalog: Send + Sync {
    /// Returns all coupons, in storage order.
    async fn list_coupons(&self) -> Result<Vec<Coupon>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coupon_metadata_provider_is_object_safe() {
        fn _accepts_dyn(_provider: &dyn CouponMetadataProvider) {}
    }

    #[test]
    fn coupon_catalog_is_object_safe() {
        fn _accepts_dyn(_catalog: &dyn CouponCatalog) {}
    }
}
