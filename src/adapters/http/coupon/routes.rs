//! Axum router configuration for coupon endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    health, list_applicable_coupons, list_applicable_coupons_json, validate_coupon,
    CouponAppState,
};

/// Create the coupon API router.
///
/// # Routes
///
/// - `POST /validate` - Validate a coupon and consume one use
/// - `GET /applicable` - Applicable coupons, cart in the query string
/// - `POST /applicable` - Applicable coupons, cart in a JSON body
pub fn coupon_routes() -> Router<CouponAppState> {
    Router::new()
        .route("/validate", post(validate_coupon))
        .route(
            "/applicable",
            get(list_applicable_coupons).post(list_applicable_coupons_json),
        )
}

/// Create the complete coupon module router, mounted under `/coupons`,
/// plus the `/health` probe.
pub fn coupon_router() -> Router<CouponAppState> {
    Router::new()
        .nest("/coupons", coupon_routes())
        .route("/health", get(health))
}
