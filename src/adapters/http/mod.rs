//! HTTP adapters - REST API implementations.

pub mod coupon;

use std::time::Duration;

use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use coupon::{coupon_router, CouponAppState};

/// Builds the service router with request tracing and an outer timeout.
///
/// The outer timeout is a backstop for the whole request. Validation carries
/// its own deadline and should finish well inside it.
pub fn build_router(state: CouponAppState, request_timeout: Duration) -> Router {
    coupon_router()
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}
