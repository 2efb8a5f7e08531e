//! HTTP adapter for coupon endpoints.
//!
//! Exposes coupon validation via REST API:
//! - `POST /coupons/validate` - Validate a coupon and consume one use
//! - `GET /coupons/applicable` - List coupons a cart could use
//! - `POST /coupons/applicable` - Same, with a JSON body
//! - `GET /health` - Liveness probe

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{CouponApiError, CouponAppState};
pub use routes::{coupon_router, coupon_routes};
