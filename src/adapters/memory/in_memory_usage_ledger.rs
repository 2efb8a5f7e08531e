//! In-memory usage ledger implementation.
//!
//! This adapter provides an in-memory implementation of the `UsageLedger` and
//! `UsageReader` ports. Useful for:
//! - Development and testing environments
//! - Single-process deployments where usage need not survive restarts
//!
//! Each key has its own async lock, held by a transaction from
//! `get_and_lock` until it commits, rolls back or is dropped. A key's lock
//! entry is removed once no transaction holds or awaits it. Writes are
//! staged in the transaction and only reach the committed table on commit.
//! The lock only coordinates within one process; multi-instance deployments
//! need the PostgreSQL ledger.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::coupon::{UsageKey, UsageRecord};
use crate::domain::foundation::{CouponId, DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::{LedgerTransaction, UsageLedger, UsageReader};

#[derive(Default)]
struct LedgerState {
    locks: Mutex<HashMap<UsageKey, Arc<AsyncMutex<()>>>>,
    records: Mutex<HashMap<UsageKey, UsageRecord>>,
}

impl LedgerState {
    fn lock_for(&self, key: &UsageKey) -> Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .expect("InMemoryUsageLedger: locks lock poisoned")
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Drops the lock entries of `keys` that nobody holds or awaits.
    ///
    /// Runs from `Drop`, so a poisoned map is recovered rather than
    /// propagated.
    fn release(&self, keys: impl IntoIterator<Item = UsageKey>) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            if locks
                .get(&key)
                .is_some_and(|lock| Arc::strong_count(lock) == 1)
            {
                locks.remove(&key);
            }
        }
    }

    fn committed(&self, key: &UsageKey) -> Option<UsageRecord> {
        self.records
            .lock()
            .expect("InMemoryUsageLedger: records lock poisoned")
            .get(key)
            .cloned()
    }
}

/// In-memory implementation of the UsageLedger port.
#[derive(Clone, Default)]
pub struct InMemoryUsageLedger {
    state: Arc<LedgerState>,
}

impl InMemoryUsageLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the committed count for a pair, bypassing transactions.
    ///
    /// Intended for test setup.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn seed(&self, coupon_id: CouponId, user_id: UserId, usage_count: u32) {
        let mut record = UsageRecord::new(coupon_id, user_id);
        record.usage_count = usage_count;
        self.state
            .records
            .lock()
            .expect("InMemoryUsageLedger: records lock poisoned")
            .insert(record.key(), record);
    }

    /// Returns the committed record for a pair, if any.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn record(&self, coupon_id: CouponId, user_id: &UserId) -> Option<UsageRecord> {
        self.state.committed(&(coupon_id, user_id.clone()))
    }

    /// Returns every committed record.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn records(&self) -> Vec<UsageRecord> {
        self.state
            .records
            .lock()
            .expect("InMemoryUsageLedger: records lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Number of keys with a live lock entry, i.e. held or awaited by some
    /// transaction.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn locked_keys(&self) -> usize {
        self.state
            .locks
            .lock()
            .expect("InMemoryUsageLedger: locks lock poisoned")
            .len()
    }
}

struct Locked {
    key: UsageKey,
    _guard: OwnedMutexGuard<()>,
    /// Count observed under the lock.
    observed: Option<UsageRecord>,
    /// Pending write, applied on commit.
    staged: Option<UsageRecord>,
}

/// Transaction over the in-memory ledger. Dropping it discards staged writes.
struct InMemoryLedgerTransaction {
    state: Arc<LedgerState>,
    held: Vec<Locked>,
}

impl InMemoryLedgerTransaction {
    fn held_mut(&mut self, key: &UsageKey) -> Option<&mut Locked> {
        self.held.iter_mut().find(|locked| &locked.key == key)
    }
}

impl Drop for InMemoryLedgerTransaction {
    fn drop(&mut self) {
        // Each guard is released as its `Locked` is consumed, before pruning.
        let keys: Vec<UsageKey> = self.held.drain(..).map(|locked| locked.key).collect();
        self.state.release(keys);
    }
}

#[async_trait]
impl UsageLedger for InMemoryUsageLedger {
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, DomainError> {
        Ok(Box::new(InMemoryLedgerTransaction {
            state: self.state.clone(),
            held: Vec::new(),
        }))
    }
}

#[async_trait]
impl LedgerTransaction for InMemoryLedgerTransaction {
    async fn get_and_lock(
        &mut self,
        coupon_id: CouponId,
        user_id: &UserId,
    ) -> Result<u32, DomainError> {
        let key = (coupon_id, user_id.clone());
        if let Some(locked) = self.held_mut(&key) {
            let current = locked.staged.as_ref().or(locked.observed.as_ref());
            return Ok(current.map_or(0, |record| record.usage_count));
        }

        let guard = self.state.lock_for(&key).lock_owned().await;
        let observed = self.state.committed(&key);
        let count = observed.as_ref().map_or(0, |record| record.usage_count);
        self.held.push(Locked {
            key,
            _guard: guard,
            observed,
            staged: None,
        });
        Ok(count)
    }

    async fn increment(
        &mut self,
        coupon_id: CouponId,
        user_id: &UserId,
    ) -> Result<(), DomainError> {
        let key = (coupon_id, user_id.clone());
        let locked = self.held_mut(&key).ok_or_else(|| {
            DomainError::new(
                ErrorCode::InternalError,
                "Usage record not locked; get_and_lock must precede increment",
            )
        })?;

        let mut record = locked
            .staged
            .clone()
            .or_else(|| locked.observed.clone())
            .unwrap_or_else(|| UsageRecord::new(coupon_id, user_id.clone()));
        record.increment(Timestamp::now());
        locked.staged = Some(record);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let mut records = self
            .state
            .records
            .lock()
            .expect("InMemoryUsageLedger: records lock poisoned");
        for locked in &self.held {
            if let Some(record) = &locked.staged {
                records.insert(locked.key.clone(), record.clone());
            }
        }
        // Guards are released when `self` drops, after the writes above.
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        Ok(())
    }
}

#[async_trait]
impl UsageReader for InMemoryUsageLedger {
    async fn usage_count(&self, coupon_id: CouponId, user_id: &UserId) -> Result<u32, DomainError> {
        Ok(self
            .record(coupon_id, user_id)
            .map_or(0, |record| record.usage_count))
    }
}
