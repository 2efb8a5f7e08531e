//! PostgreSQL adapters - Database implementations for coupon ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresCouponRepository` - Coupon metadata lookup and catalog scan
//! - `PostgresUsageLedger` - Serializable, row-locked usage consumption

mod coupon_repository;
mod usage_ledger;

pub use coupon_repository::PostgresCouponRepository;
pub use usage_ledger::PostgresUsageLedger;
