//! Coupon Service - coupon validation with atomic per-user usage consumption
//!
//! A request names a user, a coupon code, a cart, and an order total. The
//! service checks the coupon's static rules, computes the discount over the
//! cart with a bounded worker pool, and records one use per user inside a
//! serializable, row-locked transaction, all under a per-request deadline.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
