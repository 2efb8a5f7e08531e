//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Coupon Ports
//!
//! - `CouponMetadataProvider` - Resolve a code to its rules (cacheable)
//! - `CouponCatalog` - Scan all coupons for read-only queries
//!
//! ## Usage Ports
//!
//! - `UsageLedger` / `LedgerTransaction` - Transactional lock-read-increment
//! - `UsageReader` - Non-locking count reads
//!
//! ## Misc
//!
//! - `Clock` - Current time

mod clock;
mod coupon_metadata_provider;
mod usage_ledger;

pub use clock::Clock;
pub use coupon_metadata_provider::{CouponCatalog, CouponMetadataProvider};
pub use usage_ledger::{LedgerTransaction, UsageLedger, UsageReader};
