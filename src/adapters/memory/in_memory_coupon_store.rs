//! In-memory coupon store.
//!
//! Implements `CouponMetadataProvider` and `CouponCatalog` over a map held in
//! memory. Catalog order is insertion order.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::domain::coupon::{Coupon, CouponMeta};
use crate::domain::foundation::{DomainError, ValidationError};
use crate::ports::{CouponCatalog, CouponMetadataProvider};

#[derive(Default)]
struct Catalog {
    by_code: HashMap<String, Arc<CouponMeta>>,
    order: Vec<String>,
}

/// In-memory implementation of the coupon read ports.
///
/// # Panics
///
/// Every method panics if the catalog lock is poisoned.
#[derive(Default)]
pub struct InMemoryCouponStore {
    catalog: RwLock<Catalog>,
}

impl InMemoryCouponStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given coupons.
    pub fn with_coupons(
        coupons: impl IntoIterator<Item = CouponMeta>,
    ) -> Result<Self, ValidationError> {
        let store = Self::new();
        for meta in coupons {
            store.insert(meta)?;
        }
        Ok(store)
    }

    /// Publishes a coupon, replacing any coupon with the same code.
    pub fn insert(&self, meta: CouponMeta) -> Result<(), ValidationError> {
        meta.coupon.validate()?;
        let code = meta.coupon.code.clone();
        let mut catalog = self.write_catalog();
        if catalog.by_code.insert(code.clone(), Arc::new(meta)).is_none() {
            catalog.order.push(code);
        }
        Ok(())
    }

    /// Returns the number of coupons held.
    pub fn len(&self) -> usize {
        self.read_catalog().order.len()
    }

    /// Returns true if the store holds no coupons.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_catalog(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.read().expect("InMemoryCouponStore: catalog lock poisoned")
    }

    fn write_catalog(&self) -> RwLockWriteGuard<'_, Catalog> {
        self.catalog.write().expect("InMemoryCouponStore: catalog lock poisoned")
    }
}

#[async_trait]
impl CouponMetadataProvider for InMemoryCouponStore {
    async fn lookup(&self, code: &str) -> Result<Option<Arc<CouponMeta>>, DomainError> {
        Ok(self.read_catalog().by_code.get(code).cloned())
    }
}

#[async_trait]
impl CouponCatalog for InMemoryCouponStore {
    async fn list_coupons(&self) -> Result<Vec<Coupon>, DomainError> {
        let catalog = self.read_catalog();
        Ok(catalog
            .order
            .iter()
            .filter_map(|code| catalog.by_code.get(code))
            .map(|meta| meta.coupon.clone())
            .collect())
    }
}
