//! Caching decorators for read ports.

mod coupon_meta_cache;

pub use coupon_meta_cache::CachedCouponMetadataProvider;
