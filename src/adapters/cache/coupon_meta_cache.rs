//! Read-through cache in front of a CouponMetadataProvider.
//!
//! Coupon metadata is immutable once published, so hits never go stale for
//! the purposes of validation. Misses are not cached: a coupon published
//! after a miss becomes visible on the next lookup.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::domain::coupon::CouponMeta;
use crate::domain::foundation::DomainError;
use crate::ports::CouponMetadataProvider;

/// Caching decorator for a metadata provider.
///
/// Safe for concurrent readers and writers; two concurrent misses for the
/// same code may both reach the inner provider, and the later insert wins
/// with an equal value.
///
/// # Panics
///
/// Every method panics if the entries lock is poisoned.
pub struct CachedCouponMetadataProvider {
    inner: Arc<dyn CouponMetadataProvider>,
    entries: RwLock<HashMap<String, Arc<CouponMeta>>>,
}

impl CachedCouponMetadataProvider {
    pub fn new(inner: Arc<dyn CouponMetadataProvider>) -> Self {
        Self {
            inner,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Drops the cached entry for `code`, if any.
    pub fn invalidate(&self, code: &str) {
        self.entries
            .write()
            .expect("CachedCouponMetadataProvider: entries lock poisoned")
            .remove(code);
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.entries
            .write()
            .expect("CachedCouponMetadataProvider: entries lock poisoned")
            .clear();
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .expect("CachedCouponMetadataProvider: entries lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CouponMetadataProvider for CachedCouponMetadataProvider {
    async fn lookup(&self, code: &str) -> Result<Option<Arc<CouponMeta>>, DomainError> {
        let cached = self
            .entries
            .read()
            .expect("CachedCouponMetadataProvider: entries lock poisoned")
            .get(code)
            .cloned();
        if cached.is_some() {
            return Ok(cached);
        }

        let found = self.inner.lookup(code).await?;
        if let Some(meta) = &found {
            tracing::debug!(coupon_code = code, "Caching coupon metadata");
            self.entries
                .write()
                .expect("CachedCouponMetadataProvider: entries lock poisoned")
                .insert(code.to_string(), meta.clone());
        }
        Ok(found)
    }
}
