//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - Coupon catalog and usage ledger on PostgreSQL
//! - `memory` - In-memory catalog and ledger for development and tests
//! - `cache` - Read-through metadata cache
//! - `clock` - System clock
//! - `http` - Axum REST API

pub mod cache;
pub mod clock;
pub mod http;
pub mod memory;
pub mod postgres;

pub use cache::CachedCouponMetadataProvider;
pub use clock::SystemClock;
pub use memory::{InMemoryCouponStore, InMemoryUsageLedger};
pub use postgres::{PostgresCouponRepository, PostgresUsageLedger};
