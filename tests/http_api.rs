//! HTTP API integration tests.
//!
//! Drives the full router (tracing and timeout layers included) through
//! `tower::ServiceExt::oneshot` with in-memory adapters.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

use coupon_service::adapters::http::{build_router, CouponAppState};
use coupon_service::adapters::{
    CachedCouponMetadataProvider, InMemoryCouponStore, InMemoryUsageLedger, SystemClock,
};
use coupon_service::application::{ListApplicableCouponsHandler, ValidateCouponHandler};
use coupon_service::domain::coupon::{
    Coupon, CouponMeta, DiscountType, TargetType, UsageType,
};
use coupon_service::domain::foundation::{CouponId, Timestamp};

fn coupon(id: i64, code: &str) -> Coupon {
    Coupon {
        id: CouponId::new(id),
        code: code.to_string(),
        expiry_date: Timestamp::now().add_days(30),
        usage_type: UsageType::MultiUse,
        min_order_value: Decimal::ZERO,
        valid_from: None,
        valid_to: None,
        discount_type: DiscountType::Percentage,
        discount_value: dec!(10),
        max_usage_per_user: 2,
        target_type: TargetType::Inventory,
        terms_and_conditions: None,
    }
}

fn app() -> Router {
    let store = Arc::new(
        InMemoryCouponStore::with_coupons([
            CouponMeta::new(coupon(1, "PAIN10"), Vec::new(), vec!["pain".to_string()]),
            CouponMeta::unrestricted(Coupon {
                discount_type: DiscountType::Flat,
                discount_value: dec!(5),
                target_type: TargetType::Charges,
                ..coupon(2, "SHIP5")
            }),
        ])
        .unwrap(),
    );
    let metadata = Arc::new(CachedCouponMetadataProvider::new(store.clone()));
    let ledger = Arc::new(InMemoryUsageLedger::new());
    let clock = Arc::new(SystemClock);

    let state = CouponAppState {
        validate_handler: Arc::new(ValidateCouponHandler::new(
            metadata.clone(),
            ledger.clone(),
            clock.clone(),
        )),
        list_applicable_handler: Arc::new(ListApplicableCouponsHandler::new(
            store, metadata, ledger, clock,
        )),
    };
    build_router(state, Duration::from_secs(15))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn validate(user_id: &str, code: &str) -> Request<Body> {
    let body = json!({
        "user_id": user_id,
        "coupon_code": code,
        "cart_items": [
            {"id": "ibuprofen", "category": "pain", "price": 8, "qty": 5},
            {"id": "vit-c", "category": "vitamins", "price": 12, "qty": 1}
        ],
        "order_total": 52
    });
    Request::builder()
        .method("POST")
        .uri("/coupons/validate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn category_coupon_is_consumed_up_to_limit() {
    let app = app();

    for _ in 0..2 {
        let (status, body) = send(&app, validate("alice", "PAIN10")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_valid"], true);
        assert_eq!(body["discount"].as_f64(), Some(4.0));
    }

    let (status, body) = send(&app, validate("alice", "PAIN10")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_valid"], false);
    assert_eq!(body["message"], "usage_limit_reached");

    let (_, body) = send(&app, validate("bob", "PAIN10")).await;
    assert_eq!(body["is_valid"], true);
}

#[tokio::test]
async fn flat_charges_coupon_returns_fixed_discount() {
    let app = app();
    let (_, body) = send(&app, validate("alice", "SHIP5")).await;

    assert_eq!(body["is_valid"], true);
    assert_eq!(body["discount"].as_f64(), Some(5.0));
}

#[tokio::test]
async fn applicable_reflects_consumed_usage() {
    let app = app();
    let query = "/coupons/applicable?user=alice&order_total=52&items=ibuprofen%7Cpain%7C8%7C5";

    let (status, body) = send(&app, Request::builder().uri(query).body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applicable_coupons"], json!(["PAIN10", "SHIP5"]));

    send(&app, validate("alice", "PAIN10")).await;
    send(&app, validate("alice", "PAIN10")).await;

    let (_, body) = send(&app, Request::builder().uri(query).body(Body::empty()).unwrap()).await;
    assert_eq!(body["applicable_coupons"], json!(["SHIP5"]));
}

#[tokio::test]
async fn unknown_route_is_404() {
    let app = app();
    let response = app
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
