//! In-memory adapters for development and tests.

mod in_memory_coupon_store;
mod in_memory_usage_ledger;

pub use in_memory_coupon_store::InMemoryCouponStore;
pub use in_memory_usage_ledger::InMemoryUsageLedger;
