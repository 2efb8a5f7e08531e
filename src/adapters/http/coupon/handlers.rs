//! HTTP handlers for coupon endpoints.
//!
//! These handlers connect Axum routes to the application layer. A client
//! disconnect drops the handler future, which cancels an in-flight
//! validation and rolls back its ledger transaction.

use std::sync::Arc;

use axum::extract::{Json, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use rust_decimal::Decimal;

use crate::application::handlers::coupon::{
    ListApplicableCouponsHandler, ListApplicableCouponsQuery, ValidateCouponCommand,
    ValidateCouponHandler,
};
use crate::domain::coupon::{CartItem, CouponError, ValidationRequest};
use crate::domain::foundation::{DomainError, Timestamp, UserId, ValidationError};

use super::dto::{
    parse_amount, parse_items_param, parse_optional_timestamp, ApplicableCouponsParams,
    ApplicableCouponsRequest, ApplicableCouponsResponse, CartItemDto, ErrorResponse,
    ValidateCouponRequest, ValidateCouponResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for coupon routes.
///
/// Handlers are built once at startup; the validation handler owns the
/// discount evaluator and its worker cap.
#[derive(Clone)]
pub struct CouponAppState {
    pub validate_handler: Arc<ValidateCouponHandler>,
    pub list_applicable_handler: Arc<ListApplicableCouponsHandler>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /coupons/validate - Validate a coupon and consume one use
pub async fn validate_coupon(
    State(state): State<CouponAppState>,
    Json(request): Json<ValidateCouponRequest>,
) -> Result<impl IntoResponse, CouponApiError> {
    let user_id = UserId::new(request.user_id)?;
    if request.order_total < Decimal::ZERO {
        return Err(ValidationError::negative("order_total").into());
    }
    let cart_items = to_cart(request.cart_items)?;

    let cmd = ValidateCouponCommand::from(ValidationRequest {
        user_id,
        coupon_code: request.coupon_code,
        cart_items,
        order_total: request.order_total,
    });

    let response = state.validate_handler.handle(cmd).await?;
    Ok(Json(ValidateCouponResponse::from(response)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// GET /coupons/applicable - Coupons a cart could use (query-string form)
pub async fn list_applicable_coupons(
    State(state): State<CouponAppState>,
    Query(params): Query<ApplicableCouponsParams>,
) -> Result<impl IntoResponse, CouponApiError> {
    let user = params
        .user
        .ok_or_else(|| ValidationError::empty_field("user"))?;
    let query = ListApplicableCouponsQuery {
        user_id: UserId::new(user)?,
        cart_items: parse_items_param(params.items.as_deref().unwrap_or_default())?,
        order_total: parse_amount("order_total", params.order_total.as_deref())?,
        at: parse_optional_timestamp(params.timestamp.as_deref())?,
    };

    run_applicable_query(&state, query).await
}

/// POST /coupons/applicable - Coupons a cart could use (JSON form)
pub async fn list_applicable_coupons_json(
    State(state): State<CouponAppState>,
    Json(request): Json<ApplicableCouponsRequest>,
) -> Result<impl IntoResponse, CouponApiError> {
    if request.order_total < Decimal::ZERO {
        return Err(ValidationError::negative("order_total").into());
    }
    let query = ListApplicableCouponsQuery {
        user_id: UserId::new(request.user_id)?,
        cart_items: to_cart(request.cart_items)?,
        order_total: request.order_total,
        at: parse_optional_timestamp(request.timestamp.as_deref())?,
    };

    run_applicable_query(&state, query).await
}

async fn run_applicable_query(
    state: &CouponAppState,
    query: ListApplicableCouponsQuery,
) -> Result<Json<ApplicableCouponsResponse>, CouponApiError> {
    let result = state.list_applicable_handler.handle(query).await?;
    Ok(Json(ApplicableCouponsResponse {
        applicable_coupons: result.applicable_coupons,
    }))
}

/// GET /health - Liveness probe
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "time": Timestamp::now().to_rfc3339(),
    }))
}

fn to_cart(items: Vec<CartItemDto>) -> Result<Vec<CartItem>, ValidationError> {
    items.into_iter().map(CartItem::try_from).collect()
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error wrapper that converts application errors to HTTP responses.
///
/// Business rejections never reach this type; they are 200 responses with
/// `is_valid = false`.
#[derive(Debug)]
pub enum CouponApiError {
    BadRequest(ValidationError),
    Coupon(CouponError),
    Infrastructure(DomainError),
}

impl From<ValidationError> for CouponApiError {
    fn from(err: ValidationError) -> Self {
        Self::BadRequest(err)
    }
}

impl From<CouponError> for CouponApiError {
    fn from(err: CouponError) -> Self {
        Self::Coupon(err)
    }
}

impl From<DomainError> for CouponApiError {
    fn from(err: DomainError) -> Self {
        Self::Infrastructure(err)
    }
}

impl IntoResponse for CouponApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match &self {
            CouponApiError::BadRequest(err) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("invalid_request").with_detail(err.to_string()),
            ),
            CouponApiError::Coupon(err) => {
                let status = match err {
                    CouponError::Timeout => StatusCode::GATEWAY_TIMEOUT,
                    CouponError::Cancelled | CouponError::Internal { .. } => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                if let CouponError::Internal { message, .. } = err {
                    tracing::error!("Coupon validation failed: {}", message);
                }
                (status, ErrorResponse::from(err))
            }
            CouponApiError::Infrastructure(err) => {
                tracing::error!("Coupon query failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        retryable: err.is_retryable(),
                        ..ErrorResponse::new("internal_error")
                    },
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
