//! Integration tests for validate-and-consume over the in-memory adapters.
//!
//! These drive `ValidateCouponHandler` end to end: metadata lookup, static
//! gates, parallel item evaluation, and the locked usage transaction.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use coupon_service::adapters::{InMemoryCouponStore, InMemoryUsageLedger};
use coupon_service::application::{
    DiscountEvaluator, RequestContext, ValidateCouponCommand, ValidateCouponHandler,
};
use coupon_service::domain::coupon::{
    CartItem, Coupon, CouponError, CouponMeta, DiscountType, RejectionReason, TargetType,
    UsageType, ValidationRequest, ValidationResponse,
};
use coupon_service::domain::foundation::{CouponId, Timestamp, UserId};
use coupon_service::ports::{Clock, UsageLedger};

// ════════════════════════════════════════════════════════════════════════════════
// Fixtures
// ════════════════════════════════════════════════════════════════════════════════

struct FixedClock(Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

fn now() -> Timestamp {
    Timestamp::parse_rfc3339("2025-06-15T12:00:00Z").unwrap()
}

fn coupon(id: i64, code: &str) -> Coupon {
    Coupon {
        id: CouponId::new(id),
        code: code.to_string(),
        expiry_date: now().add_days(30),
        usage_type: UsageType::MultiUse,
        min_order_value: Decimal::ZERO,
        valid_from: None,
        valid_to: None,
        discount_type: DiscountType::Percentage,
        discount_value: dec!(10),
        max_usage_per_user: 0,
        target_type: TargetType::Inventory,
        terms_and_conditions: None,
    }
}

fn limited(id: i64, code: &str, max: u32) -> Coupon {
    Coupon {
        max_usage_per_user: max,
        ..coupon(id, code)
    }
}

struct Harness {
    handler: Arc<ValidateCouponHandler>,
    ledger: Arc<InMemoryUsageLedger>,
}

fn harness_at(at: Timestamp, metas: Vec<CouponMeta>) -> Harness {
    let store = Arc::new(InMemoryCouponStore::with_coupons(metas).unwrap());
    let ledger = Arc::new(InMemoryUsageLedger::new());
    let handler = ValidateCouponHandler::new(store, ledger.clone(), Arc::new(FixedClock(at)));
    Harness {
        handler: Arc::new(handler),
        ledger,
    }
}

fn harness(coupons: Vec<Coupon>) -> Harness {
    harness_at(now(), coupons.into_iter().map(CouponMeta::unrestricted).collect())
}

fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

fn request(user_id: &str, code: &str, items: Vec<CartItem>, total: Decimal) -> ValidateCouponCommand {
    ValidateCouponCommand::from(ValidationRequest {
        user_id: user(user_id),
        coupon_code: code.to_string(),
        cart_items: items,
        order_total: total,
    })
}

fn simple(user_id: &str, code: &str) -> ValidateCouponCommand {
    request(user_id, code, Vec::new(), dec!(100))
}

fn count(harness: &Harness, coupon_id: i64, user_id: &str) -> u32 {
    harness
        .ledger
        .record(CouponId::new(coupon_id), &user(user_id))
        .map(|r| r.usage_count)
        .unwrap_or(0)
}

// ════════════════════════════════════════════════════════════════════════════════
// Discount Computation
// ════════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn percentage_inventory_discounts_only_applicable_lines() {
    let meta = CouponMeta::new(
        coupon(1, "SAVE10"),
        vec!["med-1".to_string()],
        Vec::new(),
    );
    let h = harness_at(now(), vec![meta]);
    let items = vec![
        CartItem::new("med-1", "pain", dec!(100), 2).unwrap(),
        CartItem::new("med-2", "pain", dec!(50), 1).unwrap(),
    ];

    let response = h
        .handler
        .handle(request("u1", "SAVE10", items, dec!(250)))
        .await
        .unwrap();

    assert_eq!(response, ValidationResponse::accepted(dec!(20)));
    assert_eq!(count(&h, 1, "u1"), 1);
}

#[tokio::test]
async fn percentage_charges_discounts_order_total() {
    let h = harness(vec![Coupon {
        target_type: TargetType::Charges,
        ..coupon(1, "CHARGES10")
    }]);

    let response = h.handler.handle(simple_total("u1", "CHARGES10", dec!(500))).await.unwrap();

    assert_eq!(response.discount(), Some(dec!(50)));
}

#[tokio::test]
async fn flat_inventory_applies_once_per_order() {
    let h = harness(vec![Coupon {
        discount_type: DiscountType::Flat,
        discount_value: dec!(15),
        ..coupon(1, "FLAT15")
    }]);
    let items = (0..5)
        .map(|i| CartItem::new(format!("med-{i}"), "pain", dec!(10), 3).unwrap())
        .collect();

    let response = h
        .handler
        .handle(request("u1", "FLAT15", items, dec!(150)))
        .await
        .unwrap();

    assert_eq!(response.discount(), Some(dec!(15)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn large_cart_is_summed_exactly() {
    let h = harness(vec![coupon(1, "SAVE10")]);
    let items = (0..500)
        .map(|i| CartItem::new(format!("med-{i}"), "pain", dec!(1.10), 1).unwrap())
        .collect();

    let response = h
        .handler
        .handle(request("u1", "SAVE10", items, dec!(550)))
        .await
        .unwrap();

    assert_eq!(response.discount(), Some(dec!(55)));
    assert_eq!(h.handler.evaluator().live_tasks(), 0);
}

fn simple_total(user_id: &str, code: &str, total: Decimal) -> ValidateCouponCommand {
    request(user_id, code, Vec::new(), total)
}

// ════════════════════════════════════════════════════════════════════════════════
// Static Gates
// ════════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn expiry_is_exclusive() {
    let at_expiry = harness_at(
        now(),
        vec![CouponMeta::unrestricted(Coupon {
            expiry_date: now(),
            ..coupon(1, "EDGE")
        })],
    );
    let response = at_expiry.handler.handle(simple("u1", "EDGE")).await.unwrap();
    assert_eq!(response.reason(), Some(RejectionReason::CouponExpired));
    assert_eq!(count(&at_expiry, 1, "u1"), 0);

    let just_before = harness_at(
        now(),
        vec![CouponMeta::unrestricted(Coupon {
            expiry_date: now().plus_nanos(1),
            ..coupon(1, "EDGE")
        })],
    );
    let response = just_before.handler.handle(simple("u1", "EDGE")).await.unwrap();
    assert!(response.is_valid());
}

#[tokio::test]
async fn validity_window_is_inclusive_at_both_ends() {
    let window = |at: Timestamp| {
        harness_at(
            at,
            vec![CouponMeta::unrestricted(Coupon {
                usage_type: UsageType::TimeBased,
                valid_from: Some(now()),
                valid_to: Some(now().add_days(1)),
                ..coupon(1, "WINDOW")
            })],
        )
    };

    for at in [now(), now().add_days(1)] {
        let response = window(at).handler.handle(simple("u1", "WINDOW")).await.unwrap();
        assert!(response.is_valid(), "expected acceptance at {}", at.to_rfc3339());
    }
    for at in [now().plus_nanos(-1), now().add_days(1).plus_nanos(1)] {
        let response = window(at).handler.handle(simple("u1", "WINDOW")).await.unwrap();
        assert_eq!(response.reason(), Some(RejectionReason::NotInValidWindow));
    }
}

#[tokio::test]
async fn min_order_value_is_inclusive() {
    let h = harness(vec![Coupon {
        min_order_value: dec!(50),
        ..coupon(1, "MIN50")
    }]);

    let below = h.handler.handle(simple_total("u1", "MIN50", dec!(49.99))).await.unwrap();
    assert_eq!(below.reason(), Some(RejectionReason::MinOrderValueNotMet));

    let exact = h.handler.handle(simple_total("u1", "MIN50", dec!(50))).await.unwrap();
    assert!(exact.is_valid());
}

#[tokio::test]
async fn codes_are_case_sensitive() {
    let h = harness(vec![coupon(1, "SAVE10")]);
    let response = h.handler.handle(simple("u1", "save10")).await.unwrap();
    assert_eq!(response.reason(), Some(RejectionReason::CouponNotFound));
}

// ════════════════════════════════════════════════════════════════════════════════
// Usage Bound
// ════════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn one_time_coupon_is_single_use_even_with_larger_limit() {
    let h = harness(vec![Coupon {
        usage_type: UsageType::OneTime,
        max_usage_per_user: 5,
        ..coupon(1, "ONCE")
    }]);

    assert!(h.handler.handle(simple("u1", "ONCE")).await.unwrap().is_valid());
    let second = h.handler.handle(simple("u1", "ONCE")).await.unwrap();

    assert_eq!(second.reason(), Some(RejectionReason::CouponAlreadyUsed));
    assert_eq!(count(&h, 1, "u1"), 1);
}

#[tokio::test]
async fn seeded_usage_counts_toward_limit() {
    let h = harness(vec![limited(1, "THREE", 3)]);
    h.ledger.seed(CouponId::new(1), user("u1"), 2);

    assert!(h.handler.handle(simple("u1", "THREE")).await.unwrap().is_valid());
    let over = h.handler.handle(simple("u1", "THREE")).await.unwrap();

    assert_eq!(over.reason(), Some(RejectionReason::UsageLimitReached));
    assert_eq!(count(&h, 1, "u1"), 3);
}

#[tokio::test]
async fn rejection_before_consumption_leaves_ledger_untouched() {
    let h = harness(vec![Coupon {
        min_order_value: dec!(1000),
        ..limited(1, "BIG", 1)
    }]);

    h.handler.handle(simple("u1", "BIG")).await.unwrap();

    assert!(h.ledger.records().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_requests_never_exceed_limit() {
    let h = harness(vec![limited(1, "LIMITED", 3)]);

    let results = join_all((0..40).map(|_| {
        let handler = h.handler.clone();
        tokio::spawn(async move { handler.handle(simple("u1", "LIMITED")).await })
    }))
    .await;

    let responses: Vec<ValidationResponse> = results
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();
    let accepted = responses.iter().filter(|r| r.is_valid()).count();
    let limited_out = responses
        .iter()
        .filter(|r| r.reason() == Some(RejectionReason::UsageLimitReached))
        .count();

    assert_eq!(accepted, 3);
    assert_eq!(limited_out, 37);
    assert_eq!(count(&h, 1, "u1"), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn single_use_race_has_exactly_one_winner() {
    let h = harness(vec![Coupon {
        usage_type: UsageType::OneTime,
        ..coupon(1, "ONCE")
    }]);

    let results = join_all((0..25).map(|_| {
        let handler = h.handler.clone();
        tokio::spawn(async move { handler.handle(simple("u1", "ONCE")).await })
    }))
    .await;

    let accepted = results
        .into_iter()
        .filter(|r| r.as_ref().unwrap().as_ref().unwrap().is_valid())
        .count();
    assert_eq!(accepted, 1);
    assert_eq!(count(&h, 1, "u1"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn limits_are_independent_per_user_and_coupon() {
    let h = harness(vec![limited(1, "A", 1), limited(2, "B", 1)]);

    let mut tasks = Vec::new();
    for user_id in ["u1", "u2", "u3"] {
        for code in ["A", "B"] {
            for _ in 0..3 {
                let handler = h.handler.clone();
                tasks.push(tokio::spawn(async move {
                    handler.handle(simple(user_id, code)).await
                }));
            }
        }
    }
    let accepted = join_all(tasks)
        .await
        .into_iter()
        .filter(|r| r.as_ref().unwrap().as_ref().unwrap().is_valid())
        .count();

    assert_eq!(accepted, 6);
    for user_id in ["u1", "u2", "u3"] {
        assert_eq!(count(&h, 1, user_id), 1);
        assert_eq!(count(&h, 2, user_id), 1);
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Deadline and Cancellation
// ════════════════════════════════════════════════════════════════════════════════

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancellation_while_waiting_for_lock_consumes_nothing() {
    let h = harness(vec![limited(1, "SAVE10", 5)]);

    // Hold the row lock so the validation parks in consumption.
    let mut blocker = h.ledger.begin().await.unwrap();
    blocker.get_and_lock(CouponId::new(1), &user("u1")).await.unwrap();

    let (ctx, cancel) = RequestContext::with_timeout(Duration::from_secs(30));
    let handler = h.handler.clone();
    let task = tokio::spawn(async move {
        handler
            .handle_with_context(simple("u1", "SAVE10"), &ctx)
            .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();
    let result = task.await.unwrap();
    blocker.rollback().await.unwrap();

    assert_eq!(result, Err(CouponError::Cancelled));
    assert_eq!(count(&h, 1, "u1"), 0);
    assert_eq!(h.handler.evaluator().live_tasks(), 0);

    // The abandoned transaction released its lock.
    assert!(h.handler.handle(simple("u1", "SAVE10")).await.unwrap().is_valid());
    assert_eq!(count(&h, 1, "u1"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn deadline_while_waiting_for_lock_is_internal_error() {
    let store = Arc::new(
        InMemoryCouponStore::with_coupons([CouponMeta::unrestricted(limited(1, "SAVE10", 5))])
            .unwrap(),
    );
    let ledger = Arc::new(InMemoryUsageLedger::new());
    let handler = ValidateCouponHandler::new(store, ledger.clone(), Arc::new(FixedClock(now())))
        .with_deadline(Duration::from_millis(100));

    let mut blocker = ledger.begin().await.unwrap();
    blocker.get_and_lock(CouponId::new(1), &user("u1")).await.unwrap();

    let result = handler.handle(simple("u1", "SAVE10")).await;
    blocker.rollback().await.unwrap();

    let err = result.unwrap_err();
    assert_eq!(err.message(), "internal_error");
    assert!(!err.is_retryable());
    assert!(ledger.record(CouponId::new(1), &user("u1")).map_or(true, |r| r.usage_count == 0));
}

#[tokio::test]
async fn cancelled_before_start_does_no_work() {
    let h = harness(vec![limited(1, "SAVE10", 5)]);
    let (ctx, cancel) = RequestContext::with_timeout(Duration::from_secs(5));
    cancel.cancel();

    let result = h
        .handler
        .handle_with_context(simple("u1", "SAVE10"), &ctx)
        .await;

    assert_eq!(result, Err(CouponError::Cancelled));
    assert!(h.ledger.records().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_worker_evaluator_still_completes() {
    let store = Arc::new(
        InMemoryCouponStore::with_coupons([CouponMeta::unrestricted(coupon(1, "SAVE10"))]).unwrap(),
    );
    let handler = ValidateCouponHandler::new(
        store,
        Arc::new(InMemoryUsageLedger::new()),
        Arc::new(FixedClock(now())),
    )
    .with_evaluator(DiscountEvaluator::new(1));
    let items = (0..50)
        .map(|i| CartItem::new(format!("med-{i}"), "pain", dec!(2), 1).unwrap())
        .collect();

    let response = handler
        .handle(request("u1", "SAVE10", items, dec!(100)))
        .await
        .unwrap();

    assert_eq!(response.discount(), Some(dec!(10)));
}
