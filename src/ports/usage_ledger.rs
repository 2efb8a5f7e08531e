//! Usage ledger port.
//!
//! The ledger is the only component allowed to read-then-write a usage
//! record, and it does so inside a transaction whose lifecycle belongs to the
//! caller:
//!
//! ```ignore
//! let mut tx = ledger.begin().await?;
//! let count = tx.get_and_lock(coupon_id, &user_id).await?;
//! if count < limit {
//!     tx.increment(coupon_id, &user_id).await?;
//!     tx.commit().await?;
//! } else {
//!     tx.rollback().await?;
//! }
//! ```
//!
//! # Concurrency contract
//!
//! - Two transactions that lock the same `(coupon_id, user_id)` are fully
//!   serialized: the second `get_and_lock` waits until the first transaction
//!   commits or rolls back, then observes the updated count.
//! - Transactions on different keys never wait on each other.
//! - Dropping a transaction without committing rolls it back. This covers
//!   deadline expiry and cancellation, where the owning future is dropped.
//! - No implicit retries.

use async_trait::async_trait;

use crate::domain::foundation::{CouponId, DomainError, UserId};

/// Opens ledger transactions.
///
/// Implementations must use an isolation level that prevents write skew on
/// the usage record key (serializable, or row locks with equivalent effect).
#[async_trait]
pub trait UsageLedger: Send + Sync {
    /// Begins a new transaction.
    async fn begin(&self) -> Result<Box<dyn LedgerTransaction>, DomainError>;
}

/// A single open ledger transaction.
#[async_trait]
pub trait LedgerTransaction: Send {
    /// Locks the usage record for the rest of the transaction and returns
    /// its current count, creating it with count 0 if absent.
    async fn get_and_lock(
        &mut self,
        coupon_id: CouponId,
        user_id: &UserId,
    ) -> Result<u32, DomainError>;

    /// Increments the locked record by one and refreshes `last_used`.
    ///
    /// Must be preceded by `get_and_lock` on the same key.
    async fn increment(&mut self, coupon_id: CouponId, user_id: &UserId)
        -> Result<(), DomainError>;

    /// Makes all writes visible and releases locks.
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;

    /// Discards all writes and releases locks.
    async fn rollback(self: Box<Self>) -> Result<(), DomainError>;
}

/// Non-locking read of usage counts.
///
/// Used by read-only queries; never use it to decide a consumption.
#[async_trait]
pub trait UsageReader: Send + Sync {
    /// Returns the committed count, or 0 if the pair has no record.
    async fn usage_count(&self, coupon_id: CouponId, user_id: &UserId)
        -> Result<u32, DomainError>;
}
